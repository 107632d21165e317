//! Offline validation pass: checks that a collection of final personas kept
//! the base fields of the collection they were completed from.
//!
//! Records are matched by id. Final records without a base counterpart and
//! base records without a final counterpart are reported separately. A base
//! record with no final counterpart is normal after a completion run that
//! rejected personas, so it does not fail the check on its own.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{AppError, FieldMismatch};
use crate::models::fields::BASE_FIELDS;
use crate::models::persona::BaseFields;

#[derive(Debug, Clone, Serialize)]
pub struct PersonaComparison {
    pub persona_id: String,
    pub mismatches: Vec<FieldMismatch>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub total_personas: usize,
    pub compared: usize,
    pub total_field_comparisons: usize,
    pub total_mismatches: usize,
    pub match_percentage: f64,
    pub perfect_matches: usize,
    pub missing_in_final: Vec<String>,
    pub unexpected_in_final: Vec<String>,
    /// Mismatch count per field name.
    pub field_mismatch_counts: BTreeMap<String, usize>,
    pub personas_with_mismatches: Vec<PersonaComparison>,
}

impl ValidationSummary {
    /// Every final record has a base counterpart and kept its base fields.
    pub fn passed(&self) -> bool {
        self.total_mismatches == 0 && self.unexpected_in_final.is_empty()
    }

    /// Every base record has a final counterpart.
    pub fn is_complete(&self) -> bool {
        self.missing_in_final.is_empty()
    }

    pub fn log(&self) {
        info!(
            "Compared {}/{} persona(s) over {} base field(s)",
            self.compared,
            self.total_personas,
            BASE_FIELDS.len()
        );
        info!(
            "Field comparisons: {}, mismatches: {}, match rate: {:.2}%",
            self.total_field_comparisons, self.total_mismatches, self.match_percentage
        );
        info!(
            "Perfect matches: {}/{}",
            self.perfect_matches, self.compared
        );
        for comparison in &self.personas_with_mismatches {
            for m in &comparison.mismatches {
                warn!(
                    "Persona {}: {} base={} final={}",
                    comparison.persona_id, m.field, m.expected, m.actual
                );
            }
        }
        for (field, count) in &self.field_mismatch_counts {
            warn!("Field {}: {} mismatch(es)", field, count);
        }
        if !self.missing_in_final.is_empty() {
            warn!(
                "{} persona(s) missing from final collection: {:?}",
                self.missing_in_final.len(),
                self.missing_in_final
            );
        }
        if !self.unexpected_in_final.is_empty() {
            warn!("Not in base collection: {:?}", self.unexpected_in_final);
        }
    }

    pub fn write_report(&self, path: &Path) -> Result<(), AppError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Validation report written to {}", path.display());
        Ok(())
    }
}

/// Compares base fields of `finals` against `bases`, matching by id.
pub fn compare_collections(bases: &[BaseFields], finals: &[BaseFields]) -> ValidationSummary {
    let final_by_id: HashMap<&str, &BaseFields> =
        finals.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut summary = ValidationSummary {
        total_personas: bases.len(),
        ..Default::default()
    };

    for base in bases {
        let Some(actual) = final_by_id.get(base.id.as_str()) else {
            summary.missing_in_final.push(base.id.clone());
            continue;
        };
        summary.compared += 1;
        let mismatches = base.diff(actual);
        if mismatches.is_empty() {
            summary.perfect_matches += 1;
            continue;
        }
        summary.total_mismatches += mismatches.len();
        for m in &mismatches {
            *summary.field_mismatch_counts.entry(m.field.clone()).or_default() += 1;
        }
        summary.personas_with_mismatches.push(PersonaComparison {
            persona_id: base.id.clone(),
            mismatches,
        });
    }

    let base_ids: std::collections::HashSet<&str> = bases.iter().map(|b| b.id.as_str()).collect();
    summary.unexpected_in_final = finals
        .iter()
        .filter(|f| !base_ids.contains(f.id.as_str()))
        .map(|f| f.id.clone())
        .collect();

    summary.total_field_comparisons = summary.compared * BASE_FIELDS.len();
    summary.match_percentage = if summary.total_field_comparisons == 0 {
        0.0
    } else {
        let matches = summary.total_field_comparisons - summary.total_mismatches;
        matches as f64 / summary.total_field_comparisons as f64 * 100.0
    };
    summary
}
