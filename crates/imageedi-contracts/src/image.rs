use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIME_TYPE: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read image: {0}")]
    Read(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("not an image: {0}")]
    NotAnImage(String),
}

/// Image payload with its declared mime type.
///
/// `data` always holds the base64 payload without any data-URI envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(mime_type, BASE64.encode(bytes))
    }

    /// Splits a `data:image/<kind>;base64,` string. Anything without a
    /// recognised envelope is taken whole as payload and tagged `image/png`.
    pub fn from_data_uri(raw: &str) -> Self {
        match split_data_uri(raw) {
            Some((mime_type, data)) => Self::new(mime_type, data),
            None => Self::new(DEFAULT_MIME_TYPE, raw),
        }
    }

    /// Wraps upstream bytes the way generated output is displayed: always PNG.
    pub fn png(data: impl Into<String>) -> Self {
        Self::new(DEFAULT_MIME_TYPE, data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, ImageError> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|err| ImageError::Decode(err.to_string()))
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

pub fn strip_data_uri_prefix(raw: &str) -> &str {
    split_data_uri(raw).map(|(_, data)| data).unwrap_or(raw)
}

pub fn mime_type_of(raw: &str) -> &str {
    split_data_uri(raw)
        .map(|(mime_type, _)| mime_type)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

fn split_data_uri(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    let kind = mime_type.strip_prefix("image/")?;
    if kind.is_empty() || !kind.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return None;
    }
    Some((mime_type, data))
}

#[cfg(test)]
mod tests {
    use super::{mime_type_of, strip_data_uri_prefix, EncodedImage};

    #[test]
    fn strips_jpeg_envelope() {
        let raw = "data:image/jpeg;base64,QUJD";
        assert_eq!(strip_data_uri_prefix(raw), "QUJD");
        assert_eq!(mime_type_of(raw), "image/jpeg");

        let image = EncodedImage::from_data_uri(raw);
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "QUJD");
    }

    #[test]
    fn bare_payload_defaults_to_png() {
        assert_eq!(strip_data_uri_prefix("QUJD"), "QUJD");
        assert_eq!(mime_type_of("QUJD"), "image/png");

        let image = EncodedImage::from_data_uri("QUJD");
        assert_eq!(image, EncodedImage::new("image/png", "QUJD"));
    }

    #[test]
    fn non_image_or_punctuated_envelopes_are_not_stripped() {
        let text = "data:text/plain;base64,QUJD";
        assert_eq!(strip_data_uri_prefix(text), text);
        assert_eq!(mime_type_of(text), "image/png");

        let svg = "data:image/svg+xml;base64,QUJD";
        assert_eq!(strip_data_uri_prefix(svg), svg);
    }

    #[test]
    fn data_uri_and_bytes_agree() -> anyhow::Result<()> {
        let image = EncodedImage::from_bytes("image/webp", b"ABC");
        assert_eq!(image.to_data_uri(), "data:image/webp;base64,QUJD");
        assert_eq!(image.decode_bytes()?, b"ABC".to_vec());
        assert_eq!(image.extension(), "webp");
        Ok(())
    }
}
