use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use imageedi_contracts::events::{kind, EventWriter};
use imageedi_contracts::image::EncodedImage;
use serde_json::json;

use crate::error::EditError;
use crate::parts::{Candidate, Part};
use crate::upstream::{ContentUpstream, Credential};

const ENHANCE_INSTRUCTION: &str = "You are an AI image generation expert. Rewrite the user prompt in the next part to be highly detailed, artistic, and improved for an image generator (like Flux or Midjourney).

Rules:
1. Keep the core intent.
2. Add details about lighting, texture, composition, and style.
3. Do NOT add preamble like \"Here is the prompt\". Just return the prompt text.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub instruction_text: String,
    pub primary_image: Option<EncodedImage>,
    pub secondary_reference_image: Option<EncodedImage>,
}

impl GenerationRequest {
    pub fn new(instruction_text: impl Into<String>) -> Self {
        Self {
            instruction_text: instruction_text.into(),
            ..Self::default()
        }
    }

    pub fn with_primary(mut self, image: Option<EncodedImage>) -> Self {
        self.primary_image = image;
        self
    }

    pub fn with_reference(mut self, image: Option<EncodedImage>) -> Self {
        self.secondary_reference_image = image;
        self
    }

    pub fn image_count(&self) -> usize {
        usize::from(self.primary_image.is_some())
            + usize::from(self.secondary_reference_image.is_some())
    }

    /// Ordered parts: primary image, secondary reference, then the text.
    pub fn to_parts(&self) -> Vec<Part> {
        let mut parts = Vec::with_capacity(3);
        for image in [&self.primary_image, &self.secondary_reference_image]
            .into_iter()
            .flatten()
        {
            parts.push(Part::InlineImage(image.clone()));
        }
        parts.push(Part::Text(self.instruction_text.clone()));
        parts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub response_text: Option<String>,
    pub produced_image: Option<EncodedImage>,
}

impl GenerationResult {
    pub fn is_empty(&self) -> bool {
        self.response_text.is_none() && self.produced_image.is_none()
    }

    /// Folds the first candidate's parts: the last image and the last
    /// non-empty text win, images are re-tagged as PNG.
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let mut result = GenerationResult::default();
        let Some(candidate) = candidates.first() else {
            return result;
        };
        for part in &candidate.parts {
            match part {
                Part::InlineImage(image) => {
                    result.produced_image = Some(EncodedImage::png(image.data.clone()));
                }
                Part::Text(text) if !text.is_empty() => {
                    result.response_text = Some(text.clone());
                }
                Part::Text(_) => {}
            }
        }
        result
    }
}

/// Turns one user turn into one upstream call.
///
/// Only one call may be in flight at a time; overlapping calls are rejected
/// with [`EditError::Busy`] instead of being queued.
pub struct Orchestrator<U: ContentUpstream> {
    upstream: U,
    credential: Credential,
    image_model: String,
    text_model: String,
    in_flight: AtomicBool,
    events: Option<EventWriter>,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<U: ContentUpstream> Orchestrator<U> {
    pub fn new(
        upstream: U,
        credential: Credential,
        image_model: impl Into<String>,
        text_model: impl Into<String>,
    ) -> Self {
        Self {
            upstream,
            credential,
            image_model: image_model.into(),
            text_model: text_model.into(),
            in_flight: AtomicBool::new(false),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn set_image_model(&mut self, model: impl Into<String>) {
        self.image_model = model.into();
    }

    pub fn set_text_model(&mut self, model: impl Into<String>) {
        self.text_model = model.into();
    }

    pub fn upstream_name(&self) -> &str {
        self.upstream.name()
    }

    fn begin(&self) -> Result<InFlightGuard<'_>, EditError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EditError::Busy)?;
        Ok(InFlightGuard(&self.in_flight))
    }

    pub fn submit(&self, request: &GenerationRequest) -> Result<GenerationResult, EditError> {
        if request.instruction_text.trim().is_empty() && request.image_count() == 0 {
            return Err(EditError::EmptyRequest);
        }
        let _guard = self.begin()?;

        let parts = request.to_parts();
        self.emit(
            kind::GENERATION_REQUESTED,
            json!({
                "model": self.image_model,
                "upstream": self.upstream.name(),
                "image_parts": request.image_count(),
                "part_count": parts.len(),
                "instruction_chars": request.instruction_text.chars().count(),
            }),
        );

        let started = Instant::now();
        let candidates = match self
            .upstream
            .generate_content(&self.image_model, &self.credential, &parts)
        {
            Ok(candidates) => candidates,
            Err(err) => {
                log::error!("generation failed on {}: {err:#}", self.image_model);
                let err = EditError::upstream(err);
                self.emit(
                    kind::GENERATION_FAILED,
                    json!({
                        "model": self.image_model,
                        "error": err.to_string(),
                        "elapsed_s": started.elapsed().as_secs_f64(),
                    }),
                );
                return Err(err);
            }
        };

        let result = GenerationResult::from_candidates(&candidates);
        self.emit(
            kind::GENERATION_COMPLETED,
            json!({
                "model": self.image_model,
                "candidates": candidates.len(),
                "has_text": result.response_text.is_some(),
                "has_image": result.produced_image.is_some(),
                "elapsed_s": started.elapsed().as_secs_f64(),
            }),
        );
        Ok(result)
    }

    /// Rewrites a short prompt into a detailed one. Any failure returns the
    /// input unchanged.
    pub fn enhance(&self, short_prompt: &str) -> String {
        match self.try_enhance(short_prompt) {
            Ok(Some(text)) => text,
            Ok(None) => short_prompt.to_string(),
            Err(err) => {
                log::warn!("prompt enhancement failed: {err}");
                self.emit(
                    kind::PROMPT_ENHANCE_FAILED,
                    json!({
                        "model": self.text_model,
                        "error": err.to_string(),
                    }),
                );
                short_prompt.to_string()
            }
        }
    }

    fn try_enhance(&self, short_prompt: &str) -> Result<Option<String>, EditError> {
        let _guard = self.begin()?;
        let parts = [
            Part::Text(ENHANCE_INSTRUCTION.to_string()),
            Part::Text(short_prompt.to_string()),
        ];
        let candidates = self
            .upstream
            .generate_content(&self.text_model, &self.credential, &parts)
            .map_err(EditError::upstream)?;
        let first_text = candidates
            .first()
            .and_then(|candidate| candidate.parts.first())
            .and_then(|part| match part {
                Part::Text(text) => Some(text.trim().to_string()),
                Part::InlineImage(_) => None,
            })
            .filter(|text| !text.is_empty());
        Ok(first_text)
    }

    fn emit(&self, event_type: &str, body: serde_json::Value) {
        if let Some(events) = &self.events {
            events.record(event_type, body);
        }
    }
}
