use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Event types written by an editing session.
pub mod kind {
    pub const GENERATION_REQUESTED: &str = "generation_requested";
    pub const GENERATION_COMPLETED: &str = "generation_completed";
    pub const GENERATION_FAILED: &str = "generation_failed";
    pub const PROMPT_ENHANCE_FAILED: &str = "prompt_enhance_failed";
    pub const MESSAGE_APPENDED: &str = "message_appended";
    pub const CANVAS_IMAGE_CHANGED: &str = "canvas_image_changed";
    pub const CANVAS_CLEARED: &str = "canvas_cleared";
    pub const IMAGE_DECODE_FAILED: &str = "image_decode_failed";
}

/// Append-only writer for a session's `events.jsonl`.
///
/// - default fields are `type`, `session_id`, `ts`
/// - caller payload is merged last and can override defaults
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }
}

impl EventWriter {
    /// Best-effort variant of [`EventWriter::emit`] for session bookkeeping:
    /// a failed write is logged and never interrupts the edit in progress.
    pub fn record(&self, event_type: &str, body: Value) {
        if let Err(err) = self.emit(event_type, payload(body)) {
            log::warn!(
                "failed to record {event_type} event in {}: {err:#}",
                self.inner.path.display()
            );
        }
    }
}

/// Converts a `json!({...})` literal into an event payload.
pub fn payload(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
