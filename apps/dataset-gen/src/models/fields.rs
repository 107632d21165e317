//! Persona field table: the single source of truth for field names, groups,
//! kinds and permitted value domains.
//!
//! The table drives schema validation, tabular (CSV) conversion, and the
//! field list rendered into the persona completion prompt.

use serde::{Deserialize, Serialize};

/// Attribute group a field belongs to. Also the key used for the nested
/// ("grouped") mapping shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    Identity,
    Demographic,
    Biological,
    Psychological,
    Social,
    Economic,
    CulturalValue,
    Contextual,
}

impl FieldGroup {
    /// Groups that appear as nested objects in the grouped mapping shape.
    /// `Identity` stays at the top level.
    pub const NESTED: [FieldGroup; 7] = [
        FieldGroup::Demographic,
        FieldGroup::Biological,
        FieldGroup::Psychological,
        FieldGroup::Social,
        FieldGroup::Economic,
        FieldGroup::CulturalValue,
        FieldGroup::Contextual,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FieldGroup::Identity => "identity",
            FieldGroup::Demographic => "demographic",
            FieldGroup::Biological => "biological",
            FieldGroup::Psychological => "psychological",
            FieldGroup::Social => "social",
            FieldGroup::Economic => "economic",
            FieldGroup::CulturalValue => "cultural_value",
            FieldGroup::Contextual => "contextual",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FieldGroup::Identity => "Identity",
            FieldGroup::Demographic => "Demographic Component",
            FieldGroup::Biological => "Biological Component",
            FieldGroup::Psychological => "Psychological Component",
            FieldGroup::Social => "Social Component",
            FieldGroup::Economic => "Economic Component",
            FieldGroup::CulturalValue => "Cultural-Value Component",
            FieldGroup::Contextual => "Contextual Component",
        }
    }
}

/// Primitive kind and value domain of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Inclusive integer range.
    Integer { min: i64, max: i64 },
    /// One of a closed set of strings.
    Enumerated(&'static [&'static str]),
    /// One of a closed set of strings, or null.
    OptionalEnumerated(&'static [&'static str]),
    /// Short free text. `examples` are offered to the model as suggestions.
    FreeText { examples: &'static [&'static str] },
    /// Ordered list of short strings with an inclusive length range.
    TextList { min_len: usize, max_len: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub group: FieldGroup,
    pub kind: FieldKind,
    /// Base fields are sampled statistically and must never be changed downstream.
    pub base: bool,
}

pub const GENDERS: &[&str] = &["Female", "Male"];
pub const MARITAL_STATUSES: &[&str] = &["Married", "Single", "Divorced", "Widowed"];
pub const CHILDREN: &[&str] = &["None", "1", "2-3", "4+"];
pub const LIVING_SITUATIONS: &[&str] = &["Living with Family", "Living Alone", "Shared Housing"];
pub const ETHNICITIES: &[&str] = &[
    "Persian",
    "Azeri",
    "Kurdish",
    "Lur",
    "Baloch",
    "Arab",
    "Turkmen",
    "Gilaki",
    "Mazandarani",
    "Qashqai",
];
pub const LANGUAGES: &[&str] = &[
    "Persian",
    "Azeri",
    "Kurdish",
    "Luri",
    "Balochi",
    "Arabic",
    "Turkmen",
    "Gilaki",
    "Mazandarani",
    "Qashqai",
];
pub const RELIGIONS: &[&str] = &[
    "Shia Muslim",
    "Sunni Muslim",
    "Zoroastrian",
    "Christian",
    "Jewish",
];

const LEVELS: &[&str] = &["Low", "Average", "High"];
const HEALTH: &[&str] = &["Good", "Average", "Poor"];

const CHRONIC_DISEASES: &[&str] = &[
    "High Blood Pressure",
    "Cardiovascular Diseases",
    "Type 2 Diabetes",
    "Arthritis and Joint Pain",
    "Osteoporosis",
    "Alzheimer's and Dementia",
    "Chronic Kidney Disease",
    "Chronic Obstructive Pulmonary Disease",
    "Chronic Depression and Anxiety",
    "Vision and Hearing Problems",
    "Chronic Liver Failure",
    "Parkinson's",
    "Chronic Sleep Disorders",
    "Chronic Gastrointestinal Issues",
];

const PERSONALITY_TYPES: &[&str] = &[
    "INTJ", "INTP", "ENTJ", "ENTP", "INFJ", "INFP", "ENFJ", "ENFP", "ISTJ", "ISFJ", "ESTJ",
    "ESFJ", "ISTP", "ISFP", "ESTP", "ESFP",
];

const PERSONAL_EXPERIENCES: &[&str] = &[
    "Immigration",
    "Career Success",
    "Loss of Loved Ones",
    "War Experience",
    "Economic Hardship",
    "Educational Achievement",
    "Battle with Serious Illness",
];

pub const AGE_MIN: i64 = 65;
pub const AGE_MAX: i64 = 95;

use FieldGroup::*;
use FieldKind::*;

pub const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec { name: "id", group: Identity, kind: FreeText { examples: &[] }, base: true },
    FieldSpec { name: "age", group: Demographic, kind: Integer { min: AGE_MIN, max: AGE_MAX }, base: true },
    FieldSpec { name: "gender", group: Demographic, kind: Enumerated(GENDERS), base: true },
    FieldSpec { name: "marital_status", group: Demographic, kind: Enumerated(MARITAL_STATUSES), base: true },
    FieldSpec { name: "children", group: Demographic, kind: Enumerated(CHILDREN), base: true },
    FieldSpec { name: "living_situation", group: Demographic, kind: Enumerated(LIVING_SITUATIONS), base: true },
    FieldSpec { name: "general_health", group: Biological, kind: Enumerated(HEALTH), base: false },
    FieldSpec { name: "chronic_disease", group: Biological, kind: OptionalEnumerated(CHRONIC_DISEASES), base: false },
    FieldSpec {
        name: "mobility",
        group: Biological,
        kind: Enumerated(&["Independent", "With Cane or Walker", "In Wheelchair", "Dependent"]),
        base: false,
    },
    FieldSpec { name: "hearing_senses", group: Biological, kind: Enumerated(HEALTH), base: false },
    FieldSpec { name: "vision_senses", group: Biological, kind: Enumerated(HEALTH), base: false },
    FieldSpec { name: "daily_energy", group: Biological, kind: Enumerated(LEVELS), base: false },
    FieldSpec { name: "personality_type", group: Psychological, kind: Enumerated(PERSONALITY_TYPES), base: false },
    FieldSpec {
        name: "cognitive_status",
        group: Psychological,
        kind: Enumerated(&["Healthy Memory", "Mild Forgetfulness", "Alzheimer's"]),
        base: false,
    },
    FieldSpec {
        name: "dominant_emotion",
        group: Psychological,
        kind: Enumerated(&["Happy", "Sad", "Anxious", "Calm"]),
        base: false,
    },
    FieldSpec { name: "emotional_intelligence", group: Psychological, kind: Enumerated(LEVELS), base: false },
    FieldSpec { name: "iq", group: Psychological, kind: Enumerated(LEVELS), base: false },
    FieldSpec {
        name: "attitude_toward_aging",
        group: Psychological,
        kind: Enumerated(&["Acceptance", "Resistance", "Meaning-Seeking", "Denial"]),
        base: false,
    },
    FieldSpec {
        name: "main_social_role",
        group: Social,
        kind: Enumerated(&["Grandfather", "Grandmother", "Retired", "Social Activist"]),
        base: false,
    },
    FieldSpec {
        name: "social_support",
        group: Social,
        kind: Enumerated(&["Large Family", "Alone", "Supportive Friends", "Government Support"]),
        base: false,
    },
    FieldSpec { name: "social_participation", group: Social, kind: Enumerated(&["Active", "Inactive"]), base: false },
    FieldSpec {
        name: "income",
        group: Economic,
        kind: Enumerated(&["Independent", "Retirement Pension", "Dependent on Children", "No Income"]),
        base: false,
    },
    FieldSpec { name: "economic_decile", group: Economic, kind: Integer { min: 1, max: 10 }, base: false },
    FieldSpec {
        name: "housing",
        group: Economic,
        kind: Enumerated(&["Own Home", "Rented", "Nursing Home"]),
        base: false,
    },
    FieldSpec { name: "religion_and_sect", group: CulturalValue, kind: Enumerated(RELIGIONS), base: true },
    FieldSpec {
        name: "internalized_moral_traits",
        group: CulturalValue,
        kind: TextList { min_len: 2, max_len: 4 },
        base: false,
    },
    FieldSpec { name: "religiosity_level", group: CulturalValue, kind: Enumerated(LEVELS), base: false },
    FieldSpec { name: "ethnicity", group: CulturalValue, kind: Enumerated(ETHNICITIES), base: true },
    FieldSpec { name: "language", group: CulturalValue, kind: Enumerated(LANGUAGES), base: true },
    FieldSpec {
        name: "important_personal_experiences",
        group: Contextual,
        kind: FreeText { examples: PERSONAL_EXPERIENCES },
        base: false,
    },
    FieldSpec {
        name: "life_satisfaction",
        group: Contextual,
        kind: Enumerated(&["Satisfied", "Dissatisfied", "Neutral"]),
        base: false,
    },
    FieldSpec {
        name: "meaning_and_purpose_in_old_age",
        group: Contextual,
        kind: Enumerated(&["Helping Family", "Spiritual Activities", "Waiting for Death", "Pleasure-Seeking"]),
        base: false,
    },
];

/// The statistically sampled demographic fields. `id` is carried alongside
/// them as the record identity but is not a sampled attribute.
pub const BASE_FIELDS: [&str; 8] = [
    "age",
    "gender",
    "marital_status",
    "children",
    "living_situation",
    "ethnicity",
    "language",
    "religion_and_sect",
];

pub fn spec_for(name: &str) -> Option<&'static FieldSpec> {
    FIELD_SPECS.iter().find(|s| s.name == name)
}

/// Fields the completion step must fill in.
pub fn completion_fields() -> impl Iterator<Item = &'static FieldSpec> {
    FIELD_SPECS.iter().filter(|s| !s.base)
}

/// Renders a field's permitted domain as a short human-readable string for prompts.
pub fn describe_domain(kind: &FieldKind) -> String {
    let quoted = |values: &[&str]| {
        values
            .iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };
    match kind {
        Integer { min, max } => format!("integer {min}–{max}"),
        Enumerated(values) => format!("[{}]", quoted(values)),
        OptionalEnumerated(values) => format!("[null, {}]", quoted(values)),
        FreeText { examples } if examples.is_empty() => "short free text".to_string(),
        FreeText { examples } => format!("short free text, e.g. [{}]", quoted(examples)),
        TextList { min_len, max_len } => {
            format!("list of {min_len}–{max_len} short traits (positive or negative)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = FIELD_SPECS.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), FIELD_SPECS.len());
    }

    #[test]
    fn test_every_base_field_is_marked_base_in_table() {
        for name in BASE_FIELDS {
            let spec = spec_for(name).unwrap_or_else(|| panic!("{name} missing from table"));
            assert!(spec.base, "{name} must be flagged as base");
        }
        let flagged: Vec<_> = FIELD_SPECS
            .iter()
            .filter(|s| s.base && s.name != "id")
            .map(|s| s.name)
            .collect();
        assert_eq!(flagged.len(), BASE_FIELDS.len());
    }

    #[test]
    fn test_completion_fields_exclude_base_and_id() {
        let names: Vec<_> = completion_fields().map(|s| s.name).collect();
        assert!(!names.contains(&"id"));
        assert!(!names.contains(&"age"));
        assert!(names.contains(&"internalized_moral_traits"));
        assert_eq!(names.len(), FIELD_SPECS.len() - BASE_FIELDS.len() - 1);
    }

    #[test]
    fn test_describe_domain_formats() {
        assert_eq!(describe_domain(&Integer { min: 1, max: 10 }), "integer 1–10");
        assert_eq!(
            describe_domain(&Enumerated(&["Active", "Inactive"])),
            "[\"Active\", \"Inactive\"]"
        );
        assert!(describe_domain(&OptionalEnumerated(&["Osteoporosis"])).starts_with("[null, "));
    }
}
