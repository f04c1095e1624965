use std::env;
use std::str::FromStr;
use std::time::Duration;

use imageedi_contracts::models::{ModelSelector, CAPABILITY_EDIT, CAPABILITY_TEXT};

use crate::gemini::DEFAULT_API_BASE;
use crate::upstream::Credential;

const DEFAULT_TIMEOUT_S: f64 = 90.0;
const MIN_TIMEOUT_S: f64 = 15.0;
const MAX_TIMEOUT_S: f64 = 300.0;

/// How a chat-attached image is combined with the image on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// The attachment, when present, replaces the canvas image as the only
    /// image sent.
    #[default]
    PrimarySubject,
    /// The canvas image is sent first and the attachment second.
    DualImage,
}

impl ReferencePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferencePolicy::PrimarySubject => "primary",
            ReferencePolicy::DualImage => "dual",
        }
    }
}

impl FromStr for ReferencePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "primary" | "single" | "primary_subject" => Ok(ReferencePolicy::PrimarySubject),
            "dual" | "both" | "dual_image" => Ok(ReferencePolicy::DualImage),
            other => Err(format!(
                "unknown reference policy '{other}' (expected 'primary' or 'dual')"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub credential: Credential,
    pub api_base: String,
    pub image_model: String,
    pub text_model: String,
    pub request_timeout: Duration,
    pub reference_policy: ReferencePolicy,
    /// Reasons recorded when a requested model was replaced by a default.
    pub warnings: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::resolve(ConfigOverrides::default())
    }
}

/// Raw values before model resolution; unset fields fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub image_model: Option<String>,
    pub text_model: Option<String>,
    pub request_timeout_s: Option<String>,
    pub reference_policy: Option<String>,
}

impl ConfigOverrides {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_env("GEMINI_API_KEY")
                .or_else(|| non_empty_env("GOOGLE_API_KEY"))
                .or_else(|| non_empty_env("API_KEY")),
            api_base: non_empty_env("GEMINI_API_BASE"),
            image_model: non_empty_env("IMAGEEDI_IMAGE_MODEL"),
            text_model: non_empty_env("IMAGEEDI_TEXT_MODEL"),
            request_timeout_s: non_empty_env("IMAGEEDI_REQUEST_TIMEOUT"),
            reference_policy: non_empty_env("IMAGEEDI_REFERENCE_POLICY"),
        }
    }

    /// Values set on `other` win.
    pub fn merge(mut self, other: ConfigOverrides) -> Self {
        self.api_key = other.api_key.or(self.api_key);
        self.api_base = other.api_base.or(self.api_base);
        self.image_model = other.image_model.or(self.image_model);
        self.text_model = other.text_model.or(self.text_model);
        self.request_timeout_s = other.request_timeout_s.or(self.request_timeout_s);
        self.reference_policy = other.reference_policy.or(self.reference_policy);
        self
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::resolve(ConfigOverrides::from_env())
    }

    pub fn resolve(overrides: ConfigOverrides) -> Self {
        let mut warnings = Vec::new();
        let selector = ModelSelector::new(None);
        let image_model = resolve_model(
            &selector,
            overrides.image_model.as_deref(),
            CAPABILITY_EDIT,
            &mut warnings,
        );
        let text_model = resolve_model(
            &selector,
            overrides.text_model.as_deref(),
            CAPABILITY_TEXT,
            &mut warnings,
        );

        let reference_policy = match overrides.reference_policy.as_deref() {
            Some(raw) => raw.parse().unwrap_or_else(|err: String| {
                warnings.push(err);
                ReferencePolicy::default()
            }),
            None => ReferencePolicy::default(),
        };

        Self {
            credential: Credential::new(overrides.api_key.unwrap_or_default()),
            api_base: overrides
                .api_base
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            image_model,
            text_model,
            request_timeout: Duration::from_secs_f64(timeout_seconds(
                overrides.request_timeout_s.as_deref(),
            )),
            reference_policy,
            warnings,
        }
    }
}

fn resolve_model(
    selector: &ModelSelector,
    requested: Option<&str>,
    capability: &str,
    warnings: &mut Vec<String>,
) -> String {
    let resolution = selector.resolve(requested, capability);
    warnings.extend(resolution.warning);
    resolution.name
}

fn timeout_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(DEFAULT_TIMEOUT_S)
        .clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S)
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
