use imageedi_contracts::image::EncodedImage;
use serde_json::{json, Value};

/// One segment of a multipart request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    InlineImage(EncodedImage),
    Text(String),
}

impl Part {
    pub fn to_wire(&self) -> Value {
        match self {
            Part::InlineImage(image) => json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.data,
                }
            }),
            Part::Text(text) => json!({ "text": text }),
        }
    }

    /// Reads a response part. Shapes other than inline data or text yield
    /// `None`; both camelCase and snake_case field names are accepted.
    pub fn from_wire(value: &Value) -> Option<Part> {
        let inline = value
            .get("inlineData")
            .or_else(|| value.get("inline_data"))
            .and_then(Value::as_object);
        if let Some(inline) = inline {
            let data = inline
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !data.is_empty() {
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .unwrap_or(imageedi_contracts::image::DEFAULT_MIME_TYPE);
                return Some(Part::InlineImage(EncodedImage::new(mime_type, data)));
            }
        }
        value
            .get("text")
            .and_then(Value::as_str)
            .map(|text| Part::Text(text.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

/// Pulls `candidates[].content.parts[]` out of a `generateContent` payload.
/// Missing or oddly shaped fields produce empty lists rather than errors.
pub fn candidates_from_response(payload: &Value) -> Vec<Candidate> {
    payload
        .get("candidates")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|candidate| Candidate {
                    parts: candidate
                        .get("content")
                        .and_then(|content| content.get("parts"))
                        .and_then(Value::as_array)
                        .map(|parts| parts.iter().filter_map(Part::from_wire).collect())
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}
