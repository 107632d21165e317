use serde::Serialize;
use thiserror::Error;

/// One base field whose value changed between the sampled persona and the
/// completed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: serde_json::Value,
    pub actual: serde_json::Value,
}

/// Application-level error type shared by every pipeline stage.
#[derive(Debug, Error)]
pub enum AppError {
    /// A persona record is malformed. Non-recoverable for that record only.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A distribution table, capability registry, question set or environment
    /// value is invalid. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The completion step changed one or more base fields.
    #[error("Base fields of persona {persona_id} were modified: {}", field_names(.fields))]
    FieldIntegrity {
        persona_id: String,
        fields: Vec<FieldMismatch>,
    },

    /// A backend call failed after the caller's bounded retries.
    #[error("Generation failed ({context}) after {attempts} attempt(s): {message}")]
    Generation {
        context: String,
        attempts: u32,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn schema(message: impl Into<String>) -> Self {
        AppError::Schema(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration(message.into())
    }
}

fn field_names(fields: &[FieldMismatch]) -> String {
    fields
        .iter()
        .map(|f| f.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_integrity_message_lists_fields() {
        let err = AppError::FieldIntegrity {
            persona_id: "p001".to_string(),
            fields: vec![
                FieldMismatch {
                    field: "age".to_string(),
                    expected: json!(72),
                    actual: json!(73),
                },
                FieldMismatch {
                    field: "gender".to_string(),
                    expected: json!("Female"),
                    actual: json!("Male"),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Base fields of persona p001 were modified: age, gender"
        );
    }

    #[test]
    fn test_generation_error_message() {
        let err = AppError::Generation {
            context: "persona p001 / gpt-4o / q3".to_string(),
            attempts: 3,
            message: "HTTP 503".to_string(),
        };
        assert!(err.to_string().contains("after 3 attempt(s)"));
        assert!(err.to_string().contains("q3"));
    }
}
