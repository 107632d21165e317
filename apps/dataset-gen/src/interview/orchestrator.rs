//! Dataset Orchestrator: runs the interview for every (persona, model) pair.
//!
//! Pairs run sequentially. Each pair writes to its own output unit, so one
//! pair's failure never touches another pair's data. Stopping (the error
//! budget) only happens between pairs.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::interview::engine::InterviewEngine;
use crate::interview::pacing::Pacer;
use crate::interview::questions::QuestionSet;
use crate::models::interview::Interaction;
use crate::models::persona::Persona;
use crate::storage::InteractionStore;

#[derive(Debug, Clone, Serialize)]
pub struct FailedPair {
    pub persona_id: String,
    pub model: String,
    pub failed_question: Option<String>,
    pub records_written: usize,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct DatasetReport {
    pub pairs_attempted: usize,
    pub pairs_completed: usize,
    pub pairs_failed: usize,
    pub total_interactions: usize,
    pub interactions: Vec<Interaction>,
    pub failures: Vec<FailedPair>,
    pub stopped_early: bool,
}

pub struct DatasetOrchestrator {
    engine: InterviewEngine,
    store: Box<dyn InteractionStore>,
    /// The run stops once more than this many pairs have failed.
    max_failed_pairs: Option<usize>,
}

impl DatasetOrchestrator {
    pub fn new(
        engine: InterviewEngine,
        store: Box<dyn InteractionStore>,
        max_failed_pairs: Option<usize>,
    ) -> Self {
        Self {
            engine,
            store,
            max_failed_pairs,
        }
    }

    pub async fn generate_dataset(
        &mut self,
        personas: &[Persona],
        models: &[String],
        question_set: &QuestionSet,
        inter_call_delay: Duration,
    ) -> Result<DatasetReport, AppError> {
        question_set.validate()?;
        let questions = question_set.questions();
        let pacer = Pacer::new(inter_call_delay);
        let total = personas.len() * models.len();
        let mut report = DatasetReport::default();

        info!(
            "Generating dataset: {} persona(s) x {} model(s), {} questions each",
            personas.len(),
            models.len(),
            questions.len()
        );

        'pairs: for persona in personas {
            for model in models {
                if self
                    .max_failed_pairs
                    .is_some_and(|limit| report.pairs_failed > limit)
                {
                    warn!(
                        "Stopping after {} failed pair(s); {} of {} pair(s) attempted",
                        report.pairs_failed, report.pairs_attempted, total
                    );
                    report.stopped_early = true;
                    break 'pairs;
                }

                report.pairs_attempted += 1;
                info!(
                    "Pair {}/{}: persona {} with {}",
                    report.pairs_attempted, total, persona.id, model
                );

                let mut writer = match self.store.open_pair(&persona.id, model) {
                    Ok(writer) => writer,
                    Err(e) => {
                        error!(
                            "Could not open output for persona={}, model={}: {}",
                            persona.id, model, e
                        );
                        report.pairs_failed += 1;
                        report.failures.push(FailedPair {
                            persona_id: persona.id.clone(),
                            model: model.clone(),
                            failed_question: None,
                            records_written: 0,
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                let outcome = self
                    .engine
                    .run_interview(persona, model, &questions, &pacer, writer.as_mut())
                    .await;
                if let Err(e) = writer.finish() {
                    warn!(
                        "Closing output for persona={}, model={} failed: {}",
                        persona.id, model, e
                    );
                }

                report.total_interactions += outcome.interactions.len();
                if outcome.is_complete() {
                    report.pairs_completed += 1;
                } else {
                    report.pairs_failed += 1;
                    report.failures.push(FailedPair {
                        persona_id: outcome.persona_id.clone(),
                        model: outcome.model.clone(),
                        failed_question: outcome.failed_question.clone(),
                        records_written: outcome.interactions.len(),
                        error: outcome
                            .error
                            .as_ref()
                            .map(|e| e.to_string())
                            .unwrap_or_default(),
                    });
                }
                report.interactions.extend(outcome.interactions);
            }
        }

        info!(
            "Dataset run finished: {} completed, {} failed, {} interaction(s)",
            report.pairs_completed, report.pairs_failed, report.total_interactions
        );
        for failure in &report.failures {
            error!(
                "Failed pair: persona={}, model={}, question={}: {}",
                failure.persona_id,
                failure.model,
                failure.failed_question.as_deref().unwrap_or("-"),
                failure.error
            );
        }
        Ok(report)
    }
}
