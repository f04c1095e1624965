use std::fmt;

use anyhow::Result;

use crate::parts::{Candidate, Part};

/// Opaque API key handed to the upstream on every call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// A generative content service reachable by one request/response call.
pub trait ContentUpstream: Send + Sync {
    fn name(&self) -> &str;

    fn generate_content(
        &self,
        model: &str,
        credential: &Credential,
        parts: &[Part],
    ) -> Result<Vec<Candidate>>;
}

impl<T: ContentUpstream + ?Sized> ContentUpstream for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate_content(
        &self,
        model: &str,
        credential: &Credential,
        parts: &[Part],
    ) -> Result<Vec<Candidate>> {
        (**self).generate_content(model, credential, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::Credential;

    #[test]
    fn debug_never_prints_the_key() {
        let shown = format!("{:?}", Credential::new("secret-key"));
        assert!(!shown.contains("secret"));
        assert_eq!(format!("{:?}", Credential::default()), "Credential(<empty>)");
    }
}
