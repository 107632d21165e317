//! Persona Completion Engine: asks a model to fill in the non-base fields of
//! sampled personas, then independently verifies that the base fields came
//! back untouched.
//!
//! A persona whose base fields were altered is rejected, never repaired.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{strip_json_fences, ChatMessage, GenerationSettings, LlmClient, LlmError};
use crate::models::persona::{BaseFields, Persona};
use crate::persona::prompts::{completion_system_prompt, completion_user_prompt};

/// A persona that could not be completed, and why.
#[derive(Debug)]
pub struct RejectedPersona {
    pub persona_id: String,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct CompletionOutcome {
    pub completed: Vec<Persona>,
    pub rejected: Vec<RejectedPersona>,
}

pub struct PersonaCompletionEngine {
    llm: LlmClient,
    retry: RetryPolicy,
    settings: GenerationSettings,
    batch_size: usize,
}

impl PersonaCompletionEngine {
    pub fn new(
        llm: LlmClient,
        retry: RetryPolicy,
        settings: GenerationSettings,
        batch_size: usize,
    ) -> Self {
        Self {
            llm,
            retry,
            settings,
            batch_size: batch_size.max(1),
        }
    }

    /// Completes every base persona. Only errors that make the whole run
    /// meaningless are returned as `Err`; per-persona failures land in
    /// `CompletionOutcome::rejected`.
    pub async fn complete(
        &self,
        bases: &[BaseFields],
        model: &str,
    ) -> Result<CompletionOutcome, AppError> {
        let requested = self.settings.requested_params();
        let batches = bases.len().div_ceil(self.batch_size);
        let mut outcome = CompletionOutcome::default();

        for (index, chunk) in bases.chunks(self.batch_size).enumerate() {
            info!(
                "Completing persona batch {}/{} ({} persona(s)) with {}",
                index + 1,
                batches,
                chunk.len(),
                model
            );

            let messages = vec![
                ChatMessage::system(completion_system_prompt(chunk)?),
                ChatMessage::user(completion_user_prompt(chunk.len())),
            ];
            let context = format!("persona completion batch {}/{} / {}", index + 1, batches, model);

            let llm = &self.llm;
            let messages = &messages;
            let requested = &requested;
            let result = self
                .retry
                .run(&context, || async move {
                    let text = llm.complete(messages, model, requested).await?;
                    parse_records(&text)
                })
                .await;

            match result {
                Ok(records) => {
                    for (base, record) in pair_records(chunk, records) {
                        match record
                            .ok_or_else(|| {
                                AppError::schema(format!(
                                    "model output has no record for persona {}",
                                    base.id
                                ))
                            })
                            .and_then(|r| check_record(base, &r))
                        {
                            Ok(persona) => outcome.completed.push(persona),
                            Err(error) => {
                                warn!("Rejected persona {}: {}", base.id, error);
                                outcome.rejected.push(RejectedPersona {
                                    persona_id: base.id.clone(),
                                    error,
                                });
                            }
                        }
                    }
                }
                Err(AppError::Generation {
                    context,
                    attempts,
                    message,
                }) => {
                    warn!("{} failed after {} attempt(s): {}", context, attempts, message);
                    for base in chunk {
                        outcome.rejected.push(RejectedPersona {
                            persona_id: base.id.clone(),
                            error: AppError::Generation {
                                context: context.clone(),
                                attempts,
                                message: message.clone(),
                            },
                        });
                    }
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            "Persona completion finished: {} completed, {} rejected",
            outcome.completed.len(),
            outcome.rejected.len()
        );
        Ok(outcome)
    }
}

/// Output that is not a JSON array is treated as a transient model failure.
fn parse_records(text: &str) -> Result<Vec<Value>, LlmError> {
    Ok(serde_json::from_str(strip_json_fences(text))?)
}

/// Pairs output records with inputs by `id`. If no record carries an id and
/// the counts match, pairs positionally and stamps the input id on each record.
fn pair_records(chunk: &[BaseFields], records: Vec<Value>) -> Vec<(&BaseFields, Option<Value>)> {
    let has_id = |r: &Value| r.get("id").and_then(Value::as_str).is_some();

    if !records.iter().any(has_id) && records.len() == chunk.len() {
        return chunk
            .iter()
            .zip(records)
            .map(|(base, mut record)| {
                if let Value::Object(map) = &mut record {
                    map.insert("id".to_string(), Value::String(base.id.clone()));
                }
                (base, Some(record))
            })
            .collect();
    }

    let mut by_id: HashMap<String, Value> = HashMap::new();
    for record in records {
        let Some(id) = record.get("id").and_then(Value::as_str).map(str::to_string) else {
            warn!("Ignoring completion record without an id");
            continue;
        };
        if by_id.contains_key(&id) {
            warn!("Ignoring duplicate completion record for persona {}", id);
            continue;
        }
        by_id.insert(id, record);
    }

    chunk
        .iter()
        .map(|base| (base, by_id.remove(&base.id)))
        .collect()
}

/// Schema check, then exact base-field comparison, then domain check.
fn check_record(base: &BaseFields, record: &Value) -> Result<Persona, AppError> {
    let persona = Persona::from_mapping(record)?;
    let mismatches = base.diff(&persona.base_fields());
    if !mismatches.is_empty() {
        return Err(AppError::FieldIntegrity {
            persona_id: base.id.clone(),
            fields: mismatches,
        });
    }
    persona.validate_domains()?;
    Ok(persona)
}
