// Prompts for the constrained persona completion step.
// The field list is rendered from the field table so the prompt and the
// schema can never drift apart.

use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ARRAY_ONLY;
use crate::models::fields::{completion_fields, describe_domain};
use crate::models::persona::BaseFields;

const COMPLETION_SYSTEM_INTRO: &str = "\
You are completing fictional but realistic Iranian elderly personas for a research dataset.
Each persona already has a set of FIXED base fields drawn from population statistics.
Your task is to fill in every remaining field so that the whole persona is coherent:
health, personality, social life, economy and life story must be plausible for the given
age, gender, family situation, ethnicity and religion.

Rules:
- Reactions and attitudes do not need to be \"correct\" or \"moral\"; they may be shaped by
  culture, personal experience, or limitations.
- Use only the permitted values listed for each enumerated field, spelled exactly as shown.
- Do not omit any field and do not add fields that are not listed.";

/// Builds the system prompt: fixed base values verbatim, then every field to
/// complete with its permitted domain.
pub fn completion_system_prompt(bases: &[BaseFields]) -> Result<String, AppError> {
    let fixed = serde_json::to_string_pretty(bases)?;

    let mut fields = String::new();
    let mut current_group = None;
    for spec in completion_fields() {
        if current_group != Some(spec.group) {
            current_group = Some(spec.group);
            fields.push_str(&format!("\n{}:\n", spec.group.title()));
        }
        fields.push_str(&format!("- {}: {}\n", spec.name, describe_domain(&spec.kind)));
    }

    Ok(format!(
        "{COMPLETION_SYSTEM_INTRO}

BASE PERSONAS (these values are FIXED, DO NOT change them, copy them verbatim
into your output, including the \"id\"):
{fixed}

FIELDS TO COMPLETE (output them flat, alongside the base fields):
{fields}
Output one JSON object per base persona, in the same order, each containing
\"id\", every base field unchanged, and every field listed above.

{JSON_ARRAY_ONLY}"
    ))
}

pub fn completion_user_prompt(count: usize) -> String {
    format!(
        "Complete all {count} persona(s) above. Return a JSON array of exactly {count} object(s)."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::FIELD_SPECS;
    use crate::models::persona::fixtures;

    #[test]
    fn test_system_prompt_lists_base_values_verbatim() {
        let prompt = completion_system_prompt(&[fixtures::base("p001")]).unwrap();
        assert!(prompt.contains("DO NOT change"));
        assert!(prompt.contains("\"id\": \"p001\""));
        assert!(prompt.contains("\"age\": 72"));
        assert!(prompt.contains("\"religion_and_sect\": \"Shia Muslim\""));
    }

    #[test]
    fn test_system_prompt_enumerates_every_completion_field() {
        let prompt = completion_system_prompt(&[fixtures::base("p001")]).unwrap();
        for spec in FIELD_SPECS.iter().filter(|s| !s.base) {
            assert!(
                prompt.contains(&format!("- {}: ", spec.name)),
                "{} missing from prompt",
                spec.name
            );
        }
        // Base fields are shown as values, never as fields to fill.
        assert!(!prompt.contains("- gender: "));
        assert!(prompt.contains("economic_decile: integer 1–10"));
    }

    #[test]
    fn test_user_prompt_states_count() {
        assert!(completion_user_prompt(3).contains("exactly 3 object(s)"));
    }
}
