//! Model capability registry: which optional generation parameters each model accepts.
//!
//! Provider APIs reject unknown parameters outright, so every outbound request
//! is filtered here. Unsupported keys are dropped silently; that is the
//! contract, not an error path.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;

/// Requested or filtered generation parameters, keyed by API parameter name.
pub type RequestParams = serde_json::Map<String, Value>;

/// Every parameter name the registry knows about.
pub const RECOGNIZED_PARAMS: &[&str] = &[
    "temperature",
    "top_p",
    "presence_penalty",
    "frequency_penalty",
    "max_tokens",
];

const FULL_SAMPLING: &[&str] = &[
    "temperature",
    "top_p",
    "presence_penalty",
    "frequency_penalty",
    "max_tokens",
];
const TEMPERATURE_ONLY: &[&str] = &["temperature"];

#[derive(Debug, Clone)]
pub struct ModelCapabilityRegistry {
    models: HashMap<String, HashSet<String>>,
    /// Applied to unregistered models. Empty: no optional parameters.
    fallback: HashSet<String>,
}

impl Default for ModelCapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCapabilityRegistry {
    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
            fallback: HashSet::new(),
        }
    }

    /// Registry pre-populated with the models the generator is run against.
    pub fn builtin() -> Self {
        let entries: [(&str, &[&str]); 6] = [
            ("gpt-5", FULL_SAMPLING),
            ("gpt-4o", FULL_SAMPLING),
            ("grok-3", FULL_SAMPLING),
            ("gemini-2.5-pro-preview-06-05", FULL_SAMPLING),
            ("gpt-5-mini", TEMPERATURE_ONLY),
            ("gpt-5-nano", TEMPERATURE_ONLY),
        ];
        let models = entries
            .into_iter()
            .map(|(model, params)| {
                (
                    model.to_string(),
                    params.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect();
        Self {
            models,
            ..Self::empty()
        }
    }

    /// Adds or replaces a model entry. Unknown parameter names are rejected so
    /// that a typo in configuration cannot silently disable a parameter.
    pub fn register<I, S>(&mut self, model: &str, params: I) -> Result<(), AppError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if model.trim().is_empty() {
            return Err(AppError::configuration("model id must not be empty"));
        }
        let params: HashSet<String> = params.into_iter().map(Into::into).collect();
        if let Some(unknown) = params
            .iter()
            .find(|p| !RECOGNIZED_PARAMS.contains(&p.as_str()))
        {
            return Err(AppError::configuration(format!(
                "model '{model}' lists unrecognised parameter '{unknown}'"
            )));
        }
        self.models.insert(model.to_string(), params);
        Ok(())
    }

    /// Merges entries from a JSON file shaped `{"model": ["temperature", ...]}`.
    pub fn load_overrides(&mut self, path: &Path) -> Result<(), AppError> {
        let text = std::fs::read_to_string(path)?;
        let entries: HashMap<String, Vec<String>> = serde_json::from_str(&text).map_err(|e| {
            AppError::configuration(format!(
                "capability overrides {} are malformed: {e}",
                path.display()
            ))
        })?;
        let count = entries.len();
        for (model, params) in entries {
            self.register(&model, params)?;
        }
        info!(
            "Loaded {} capability override(s) from {}",
            count,
            path.display()
        );
        Ok(())
    }

    pub fn is_registered(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    pub fn supported_params(&self, model: &str) -> &HashSet<String> {
        self.models.get(model).unwrap_or(&self.fallback)
    }

    /// Returns the subset of `requested` the model accepts.
    pub fn build_request_params(&self, model: &str, requested: &RequestParams) -> RequestParams {
        let supported = self.supported_params(model);
        let mut params = RequestParams::new();
        for (key, value) in requested {
            if supported.contains(key) {
                params.insert(key.clone(), value.clone());
            } else {
                debug!("Dropping parameter '{}' unsupported by model '{}'", key, model);
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn requested(value: Value) -> RequestParams {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_temperature_only_model_drops_top_p() {
        let registry = ModelCapabilityRegistry::builtin();
        let params = registry.build_request_params(
            "gpt-5-mini",
            &requested(json!({"temperature": 1.0, "top_p": 0.9})),
        );
        assert_eq!(Value::Object(params), json!({"temperature": 1.0}));
    }

    #[test]
    fn test_full_model_keeps_all_sampling_params() {
        let registry = ModelCapabilityRegistry::builtin();
        let input = requested(json!({
            "temperature": 1.0,
            "top_p": 0.9,
            "presence_penalty": 0.3,
            "frequency_penalty": 0.4
        }));
        let params = registry.build_request_params("gpt-4o", &input);
        assert_eq!(params, input);
    }

    #[test]
    fn test_unregistered_model_gets_no_optional_params() {
        let registry = ModelCapabilityRegistry::builtin();
        assert!(!registry.is_registered("llama-3-70b"));
        let params = registry.build_request_params(
            "llama-3-70b",
            &requested(json!({"temperature": 0.7, "top_p": 0.9})),
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_filtered_params_are_always_supported() {
        let registry = ModelCapabilityRegistry::builtin();
        let input = requested(json!({
            "temperature": 1.0,
            "top_p": 0.9,
            "presence_penalty": 0.3,
            "frequency_penalty": 0.4,
            "max_tokens": 512,
            "logit_bias": {}
        }));
        for model in ["gpt-5", "gpt-5-mini", "gpt-5-nano", "grok-3", "unknown"] {
            let supported = registry.supported_params(model);
            for key in registry.build_request_params(model, &input).keys() {
                assert!(supported.contains(key), "{model} returned unsupported {key}");
            }
        }
    }

    #[test]
    fn test_register_rejects_unknown_parameter() {
        let mut registry = ModelCapabilityRegistry::empty();
        let err = registry.register("custom", ["temperature", "tempreature"]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(!registry.is_registered("custom"));
    }

    #[test]
    fn test_register_replaces_entry() {
        let mut registry = ModelCapabilityRegistry::builtin();
        registry.register("gpt-5-mini", ["temperature", "top_p"]).unwrap();
        let params = registry.build_request_params(
            "gpt-5-mini",
            &requested(json!({"temperature": 1.0, "top_p": 0.9})),
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_load_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"local-model": ["temperature", "max_tokens"]}}"#).unwrap();

        let mut registry = ModelCapabilityRegistry::builtin();
        registry.load_overrides(file.path()).unwrap();
        assert!(registry.is_registered("local-model"));
        assert!(registry.supported_params("local-model").contains("max_tokens"));
    }

    #[test]
    fn test_load_overrides_malformed_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let mut registry = ModelCapabilityRegistry::builtin();
        let err = registry.load_overrides(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
