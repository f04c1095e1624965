use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client as HttpClient, Request as HttpRequest, Response as HttpResponse};
use serde_json::{json, Value};

use crate::parts::{candidates_from_response, Candidate, Part};
use crate::upstream::{ContentUpstream, Credential};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// `generateContent` over HTTPS. One attempt per call; failures are returned
/// to the caller untouched.
pub struct GeminiUpstream {
    api_base: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiUpstream {
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        let trimmed = api_base.trim().trim_end_matches('/');
        Self {
            api_base: if trimmed.is_empty() {
                DEFAULT_API_BASE.to_string()
            } else {
                trimmed.to_string()
            },
            timeout,
            http: HttpClient::new(),
        }
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    // The key travels in a header so it never shows up in URLs quoted by
    // transport errors.
    fn build_request(
        &self,
        endpoint: &str,
        credential: &Credential,
        parts: &[Part],
    ) -> reqwest::Result<HttpRequest> {
        self.http
            .post(endpoint)
            .header(API_KEY_HEADER, credential.as_str())
            .timeout(self.timeout)
            .json(&Self::build_payload(parts))
            .build()
    }

    pub fn build_payload(parts: &[Part]) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": parts.iter().map(Part::to_wire).collect::<Vec<Value>>(),
            }]
        })
    }
}

impl ContentUpstream for GeminiUpstream {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate_content(
        &self,
        model: &str,
        credential: &Credential,
        parts: &[Part],
    ) -> Result<Vec<Candidate>> {
        let endpoint = self.endpoint_for_model(model);
        let request = self
            .build_request(&endpoint, credential, parts)
            .context("Gemini request could not be built")?;
        let response = self
            .http
            .execute(request)
            .map_err(|err| err.without_url())
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Ok(candidates_from_response(&response_payload))
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
