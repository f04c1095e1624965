use std::path::Path;

use anyhow::bail;
use imageedi_contracts::canvas::{CanvasController, DropOutcome};
use imageedi_contracts::chat::{Message, Role, Transcript};
use imageedi_contracts::events::{kind, EventWriter};
use imageedi_contracts::image::EncodedImage;
use serde_json::json;

use crate::config::ReferencePolicy;
use crate::error::EditError;
use crate::files::{decode_image_file, write_image_file};
use crate::orchestrator::{GenerationRequest, Orchestrator};
use crate::upstream::ContentUpstream;

pub const RESULT_FALLBACK_TEXT: &str = "Here is the result.";
pub const NO_OUTPUT_TEXT: &str = "I processed that, but produced no visible output.";
pub const CANVAS_CLEARED_TEXT: &str = "Canvas cleared.";

/// One chat session: transcript, displayed canvas image, pending chat
/// attachment, and the orchestrator used for every turn.
pub struct Session<U: ContentUpstream> {
    orchestrator: Orchestrator<U>,
    canvas: CanvasController,
    transcript: Transcript,
    reference_policy: ReferencePolicy,
    pending_reference: Option<EncodedImage>,
    events: Option<EventWriter>,
}

impl<U: ContentUpstream> Session<U> {
    pub fn new(orchestrator: Orchestrator<U>, reference_policy: ReferencePolicy) -> Self {
        Self {
            orchestrator,
            canvas: CanvasController::new(),
            transcript: Transcript::new(),
            reference_policy,
            pending_reference: None,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator<U> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<U> {
        &mut self.orchestrator
    }

    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    /// Pan and zoom gestures. Use [`Session::set_image`] to change the image.
    pub fn canvas_mut(&mut self) -> &mut CanvasController {
        &mut self.canvas
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    pub fn reference_policy(&self) -> ReferencePolicy {
        self.reference_policy
    }

    pub fn set_reference_policy(&mut self, policy: ReferencePolicy) {
        self.reference_policy = policy;
    }

    pub fn pending_reference(&self) -> Option<&EncodedImage> {
        self.pending_reference.as_ref()
    }

    pub fn attach_reference(&mut self, path: &Path) -> Result<(), EditError> {
        let image = decode_image_file(path).inspect_err(|err| self.decode_failed(path, err))?;
        self.pending_reference = Some(image);
        Ok(())
    }

    pub fn detach_reference(&mut self) -> Option<EncodedImage> {
        self.pending_reference.take()
    }

    /// Upload path: decode a file and show it on the canvas.
    pub fn load_image(&mut self, path: &Path) -> Result<(), EditError> {
        let image = decode_image_file(path).inspect_err(|err| self.decode_failed(path, err))?;
        self.set_image(Some(image));
        Ok(())
    }

    /// Drag-and-drop path. Failures are logged and leave the canvas as is.
    pub fn drop_image(&mut self, path: &Path) -> DropOutcome {
        let mut replacement = None;
        let outcome = self
            .canvas
            .on_drop(path, decode_image_file, |image| replacement = Some(image));
        match &outcome {
            DropOutcome::Replaced => self.set_image(replacement),
            DropOutcome::Ignored(reason) => {
                log::info!("ignored drop of {}: {reason}", path.display());
            }
            DropOutcome::Failed(err) => self.decode_failed(path, err),
        }
        outcome
    }

    pub fn set_image(&mut self, image: Option<EncodedImage>) {
        let mime_type = image.as_ref().map(|image| image.mime_type.clone());
        if self.canvas.on_image_identity_changed(image) {
            self.emit(kind::CANVAS_IMAGE_CHANGED, json!({ "mime_type": mime_type }));
        }
    }

    pub fn clear(&mut self) {
        self.set_image(None);
        self.emit(kind::CANVAS_CLEARED, json!({}));
        self.push(Message::new(Role::System, CANVAS_CLEARED_TEXT));
    }

    pub fn save_image(&self, path: &Path) -> anyhow::Result<()> {
        let Some(image) = self.canvas.image() else {
            bail!("no image on the canvas to save");
        };
        write_image_file(image, path)
    }

    pub fn enhance(&self, prompt: &str) -> String {
        self.orchestrator.enhance(prompt)
    }

    /// Runs one chat turn and returns the model's reply. Upstream failures
    /// become an error reply in the transcript; only requests that never
    /// reached the upstream (busy, empty) return `Err`.
    pub fn send(&mut self, text: &str) -> Result<&Message, EditError> {
        if self.is_busy() {
            return Err(EditError::Busy);
        }
        let request = self.build_request(text);
        if request.instruction_text.trim().is_empty() && request.image_count() == 0 {
            return Err(EditError::EmptyRequest);
        }

        let reference = self.pending_reference.take();
        self.push(Message::new(Role::User, text).with_reference(reference));

        let reply = match self.orchestrator.submit(&request) {
            Ok(result) => {
                let text = result.response_text.unwrap_or_else(|| {
                    if result.produced_image.is_some() {
                        RESULT_FALLBACK_TEXT.to_string()
                    } else {
                        NO_OUTPUT_TEXT.to_string()
                    }
                });
                if result.produced_image.is_some() {
                    self.set_image(result.produced_image.clone());
                }
                Message::new(Role::Model, text).with_image(result.produced_image)
            }
            Err(err) => {
                log::error!("chat turn failed: {err}");
                Message::error(err.user_message())
            }
        };
        Ok(self.push(reply))
    }

    fn build_request(&self, text: &str) -> GenerationRequest {
        let canvas_image = self.canvas.image().cloned();
        let reference = self.pending_reference.clone();
        let request = GenerationRequest::new(text);
        match self.reference_policy {
            ReferencePolicy::PrimarySubject => request.with_primary(reference.or(canvas_image)),
            ReferencePolicy::DualImage => match canvas_image {
                Some(canvas_image) => request
                    .with_primary(Some(canvas_image))
                    .with_reference(reference),
                None => request.with_primary(reference),
            },
        }
    }

    fn push(&mut self, message: Message) -> &Message {
        self.emit(
            kind::MESSAGE_APPENDED,
            json!({
                "id": message.id,
                "role": message.role.as_str(),
                "has_image": message.image.is_some(),
                "has_reference": message.reference_image.is_some(),
                "is_error": message.is_error,
            }),
        );
        self.transcript.push(message)
    }

    fn decode_failed(&self, path: &Path, err: &impl std::fmt::Display) {
        log::warn!("could not decode {}: {err}", path.display());
        self.emit(
            kind::IMAGE_DECODE_FAILED,
            json!({
                "path": path.to_string_lossy().to_string(),
                "error": err.to_string(),
            }),
        );
    }

    fn emit(&self, event_type: &str, body: serde_json::Value) {
        if let Some(events) = &self.events {
            events.record(event_type, body);
        }
    }
}

pub fn new_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4().simple())
}

/// File name used when the canvas is saved without an explicit path.
pub fn default_download_name() -> String {
    format!("image-edi-edit-{}.png", chrono::Utc::now().timestamp_millis())
}
