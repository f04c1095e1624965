mod config;
mod dryrun;
mod error;
mod files;
mod gemini;
mod orchestrator;
mod parts;
mod session;
mod upstream;

pub use config::{ConfigOverrides, EngineConfig, ReferencePolicy};
pub use dryrun::DryrunUpstream;
pub use error::EditError;
pub use files::{decode_image_bytes, decode_image_file, write_image_file};
pub use gemini::{GeminiUpstream, DEFAULT_API_BASE};
pub use orchestrator::{GenerationRequest, GenerationResult, Orchestrator};
pub use parts::{candidates_from_response, Candidate, Part};
pub use session::{
    default_download_name, new_session_id, Session, CANVAS_CLEARED_TEXT, NO_OUTPUT_TEXT,
    RESULT_FALLBACK_TEXT,
};
pub use upstream::{ContentUpstream, Credential};

/// Upstream chosen at runtime: the real Gemini transport or the offline one.
pub type DynUpstream = Box<dyn ContentUpstream>;

pub fn upstream_from_config(config: &EngineConfig, dryrun: bool) -> DynUpstream {
    if dryrun {
        Box::new(DryrunUpstream::new())
    } else {
        Box::new(GeminiUpstream::new(&config.api_base, config.request_timeout))
    }
}

/// Builds an orchestrator from resolved configuration.
pub fn orchestrator_from_config(
    config: &EngineConfig,
    upstream: DynUpstream,
) -> Orchestrator<DynUpstream> {
    Orchestrator::new(
        upstream,
        config.credential.clone(),
        config.image_model.clone(),
        config.text_model.clone(),
    )
}
