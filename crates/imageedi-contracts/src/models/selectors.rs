use super::registry::{ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

/// Outcome of resolving a configured model name for one role (image edit or
/// prompt rewrite).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResolution {
    pub name: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let (fallback_reason, requested_text) = if let Some(requested_value) = requested {
            if let Some(model) = self.registry.ensure(requested_value, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(requested_value.to_string()),
                    fallback_reason: None,
                });
            }
            (
                Some(format!(
                    "Requested model '{requested_value}' unavailable for capability '{capability}'."
                )),
                Some(requested_value.to_string()),
            )
        } else {
            (Some("No model specified; using default.".to_string()), None)
        };

        let candidates = self.registry.by_capability(capability);
        let Some(model) = candidates.first().cloned() else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        Ok(ModelSelection {
            model,
            requested: requested_text,
            fallback_reason,
        })
    }

    /// Like [`ModelSelector::select`], but names the registry does not know
    /// are passed through untouched so newer Gemini models work without a
    /// release. Only a known model lacking `capability` falls back, and only
    /// an explicit request produces a warning.
    pub fn resolve(&self, requested: Option<&str>, capability: &str) -> ModelResolution {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        if let Some(name) = requested {
            if self.registry.get(name).is_none() {
                return ModelResolution {
                    name: name.to_string(),
                    warning: None,
                };
            }
        }
        match self.select(requested, capability) {
            Ok(selection) => ModelResolution {
                name: selection.model.name,
                warning: selection.fallback_reason.filter(|_| requested.is_some()),
            },
            Err(reason) => ModelResolution {
                name: requested.unwrap_or_default().to_string(),
                warning: Some(reason),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::super::registry::{CAPABILITY_EDIT, CAPABILITY_TEXT};
    use super::{ModelRegistry, ModelResolution, ModelSelector, ModelSpec};

    fn edit_model(name: &str) -> ModelSpec {
        ModelSpec {
            name: name.to_string(),
            provider: "dryrun".to_string(),
            capabilities: vec!["image".to_string(), "edit".to_string()],
            context_window: None,
        }
    }

    #[test]
    fn falls_back_when_requested_model_unavailable() {
        let mut models = IndexMap::new();
        models.insert("edit-fallback".to_string(), edit_model("edit-fallback"));
        let selection = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("missing"), CAPABILITY_EDIT)
            .unwrap();
        assert_eq!(selection.model.name, "edit-fallback");
        assert_eq!(selection.requested.as_deref(), Some("missing"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'missing' unavailable for capability 'edit'.")
        );
    }

    #[test]
    fn no_request_uses_default_with_explanation() {
        let selection = ModelSelector::new(None)
            .select(None, CAPABILITY_EDIT)
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-flash-image");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model specified; using default.")
        );
    }

    #[test]
    fn requested_model_with_capability_is_kept() {
        let selection = ModelSelector::new(None)
            .select(Some("gemini-2.5-flash"), "text")
            .unwrap();
        assert_eq!(selection.model.name, "gemini-2.5-flash");
        assert!(selection.fallback_reason.is_none());
    }

    #[test]
    fn errors_when_no_models_for_capability() {
        let mut models = IndexMap::new();
        models.insert(
            "text-only".to_string(),
            ModelSpec {
                name: "text-only".to_string(),
                provider: "dryrun".to_string(),
                capabilities: vec!["text".to_string()],
                context_window: None,
            },
        );
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("gemini-2.5-flash-image"), CAPABILITY_EDIT)
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'edit'.");
    }

    #[test]
    fn resolve_passes_unknown_names_through() {
        let resolution =
            ModelSelector::new(None).resolve(Some(" gemini-9-ultra "), CAPABILITY_TEXT);
        assert_eq!(
            resolution,
            ModelResolution {
                name: "gemini-9-ultra".to_string(),
                warning: None,
            }
        );
    }

    #[test]
    fn resolve_warns_only_for_explicit_mismatch() {
        let selector = ModelSelector::new(None);
        let mismatch = selector.resolve(Some("gemini-2.0-flash-exp"), CAPABILITY_EDIT);
        assert_eq!(mismatch.name, "gemini-2.5-flash-image");
        assert_eq!(
            mismatch.warning.as_deref(),
            Some("Requested model 'gemini-2.0-flash-exp' unavailable for capability 'edit'.")
        );

        let default = selector.resolve(Some("  "), CAPABILITY_TEXT);
        assert_eq!(default.name, "gemini-2.0-flash-exp");
        assert!(default.warning.is_none());
    }
}
