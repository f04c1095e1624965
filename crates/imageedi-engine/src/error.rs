use imageedi_contracts::image::ImageError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Network or API failure while talking to the upstream model.
    #[error("upstream generation failed: {message}")]
    Upstream {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("a generation request is already in flight")]
    Busy,

    #[error("request needs instruction text or at least one image")]
    EmptyRequest,

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl EditError {
    pub(crate) fn upstream(err: anyhow::Error) -> Self {
        Self::Upstream {
            message: format!("{err:#}"),
            source: err.into(),
        }
    }

    /// Text shown in the transcript when a turn fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            EditError::Busy => "Still working on the previous request. Please wait for it to finish.",
            EditError::EmptyRequest => "Type an instruction or attach an image first.",
            EditError::Upstream { .. } | EditError::Image(_) => {
                "Sorry, I encountered an error processing your request. Please try again."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::EditError;

    #[test]
    fn upstream_keeps_the_cause_chain() {
        let err = EditError::upstream(
            anyhow::anyhow!("connection reset").context("Gemini request failed"),
        );
        let text = err.to_string();
        assert!(text.contains("Gemini request failed"));
        assert!(text.contains("connection reset"));
        assert!(err.source().is_some());
        assert_eq!(
            err.user_message(),
            "Sorry, I encountered an error processing your request. Please try again."
        );
    }
}
