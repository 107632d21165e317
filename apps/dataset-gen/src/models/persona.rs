//! Persona records: the closed schema for base (sampled) and completed personas.
//!
//! Both shapes accept either a flat mapping (`{"age": 72, ...}`) or the grouped
//! shape (`{"id": ..., "demographic": {"age": 72, ...}, ...}`) and reject
//! unknown keys, missing keys, and values of the wrong primitive kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{AppError, FieldMismatch};
use crate::models::fields::{spec_for, FieldGroup, FieldKind, BASE_FIELDS, FIELD_SPECS};

/// The statistically sampled subset of a persona, plus its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseFields {
    pub id: String,
    pub age: u8,
    pub gender: String,
    pub marital_status: String,
    pub children: String,
    pub living_situation: String,
    pub ethnicity: String,
    pub language: String,
    pub religion_and_sect: String,
}

/// A complete synthetic elderly persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Persona {
    pub id: String,

    // Demographic
    pub age: u8,
    pub gender: String,
    pub marital_status: String,
    pub children: String,
    pub living_situation: String,

    // Biological
    pub general_health: String,
    pub chronic_disease: Option<String>,
    pub mobility: String,
    pub hearing_senses: String,
    pub vision_senses: String,
    pub daily_energy: String,

    // Psychological
    pub personality_type: String,
    pub cognitive_status: String,
    pub dominant_emotion: String,
    pub emotional_intelligence: String,
    pub iq: String,
    pub attitude_toward_aging: String,

    // Social
    pub main_social_role: String,
    pub social_support: String,
    pub social_participation: String,

    // Economic
    pub income: String,
    pub economic_decile: u8,
    pub housing: String,

    // Cultural-value
    pub religion_and_sect: String,
    pub internalized_moral_traits: Vec<String>,
    pub religiosity_level: String,
    pub ethnicity: String,
    pub language: String,

    // Contextual
    pub important_personal_experiences: String,
    pub life_satisfaction: String,
    pub meaning_and_purpose_in_old_age: String,
}

impl BaseFields {
    pub fn to_mapping(&self) -> Map<String, Value> {
        object_of(serde_json::to_value(self))
    }

    #[allow(dead_code)]
    pub fn to_serialized_text(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_mapping(value: &Value) -> Result<Self, AppError> {
        let flat = flatten_mapping(value)?;
        check_required(&flat, &base_columns())?;
        let base: BaseFields = serde_json::from_value(Value::Object(flat))
            .map_err(|e| AppError::schema(format!("base persona record: {e}")))?;
        check_identity(&base.id)?;
        check_integer_bounds(&base.to_mapping())?;
        Ok(base)
    }

    /// Compares every base field (and the id) with exact equality.
    /// Returns the fields whose values differ; empty means identical.
    pub fn diff(&self, actual: &BaseFields) -> Vec<FieldMismatch> {
        let expected_map = self.to_mapping();
        let actual_map = actual.to_mapping();
        std::iter::once("id")
            .chain(BASE_FIELDS)
            .filter_map(|field| {
                let expected = expected_map.get(field).cloned().unwrap_or(Value::Null);
                let actual = actual_map.get(field).cloned().unwrap_or(Value::Null);
                (expected != actual).then(|| FieldMismatch {
                    field: field.to_string(),
                    expected,
                    actual,
                })
            })
            .collect()
    }
}

impl Persona {
    /// Flat key→value mapping whose keys are the field names.
    pub fn to_mapping(&self) -> Map<String, Value> {
        object_of(serde_json::to_value(self))
    }

    /// Nested mapping with one object per attribute group; `id` stays top-level.
    pub fn to_grouped_mapping(&self) -> Map<String, Value> {
        let mut grouped = Map::new();
        for (key, value) in self.to_mapping() {
            match spec_for(&key).map(|s| s.group) {
                Some(group) if group != FieldGroup::Identity => {
                    let slot = grouped
                        .entry(group.key())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(inner) = slot {
                        inner.insert(key, value);
                    }
                }
                _ => {
                    grouped.insert(key, value);
                }
            }
        }
        grouped
    }

    /// Canonical JSON text of the flat mapping.
    #[allow(dead_code)]
    pub fn to_serialized_text(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_mapping(value: &Value) -> Result<Self, AppError> {
        let flat = flatten_mapping(value)?;
        check_required(&flat, &persona_columns())?;
        let persona: Persona = serde_json::from_value(Value::Object(flat))
            .map_err(|e| AppError::schema(format!("persona record: {e}")))?;
        check_identity(&persona.id)?;
        check_integer_bounds(&persona.to_mapping())?;
        Ok(persona)
    }

    pub fn base_fields(&self) -> BaseFields {
        BaseFields {
            id: self.id.clone(),
            age: self.age,
            gender: self.gender.clone(),
            marital_status: self.marital_status.clone(),
            children: self.children.clone(),
            living_situation: self.living_situation.clone(),
            ethnicity: self.ethnicity.clone(),
            language: self.language.clone(),
            religion_and_sect: self.religion_and_sect.clone(),
        }
    }

    /// Checks every enumerated / list / free-text field against the field table.
    /// All violations are reported together.
    pub fn validate_domains(&self) -> Result<(), AppError> {
        let mapping = self.to_mapping();
        let mut violations = Vec::new();

        for spec in FIELD_SPECS {
            let value = mapping.get(spec.name).unwrap_or(&Value::Null);
            let ok = match spec.kind {
                FieldKind::Integer { .. } => true, // enforced by from_mapping
                FieldKind::Enumerated(values) => {
                    value.as_str().map(|v| values.contains(&v)).unwrap_or(false)
                }
                FieldKind::OptionalEnumerated(values) => {
                    value.is_null()
                        || value.as_str().map(|v| values.contains(&v)).unwrap_or(false)
                }
                FieldKind::FreeText { .. } => {
                    value.as_str().map(|v| !v.trim().is_empty()).unwrap_or(false)
                }
                FieldKind::TextList { min_len, max_len } => value
                    .as_array()
                    .map(|items| {
                        (min_len..=max_len).contains(&items.len())
                            && items
                                .iter()
                                .all(|i| i.as_str().map(|s| !s.trim().is_empty()).unwrap_or(false))
                    })
                    .unwrap_or(false),
            };
            if !ok {
                violations.push(format!("{}={}", spec.name, value));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::schema(format!(
                "persona {} has values outside their domain: {}",
                self.id,
                violations.join("; ")
            )))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mapping helpers
// ────────────────────────────────────────────────────────────────────────────

fn object_of(value: Result<Value, serde_json::Error>) -> Map<String, Value> {
    // Records are plain structs of strings, integers and string lists, which
    // always serialise to a JSON object.
    match value {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Accepts the flat or grouped shape and returns a flat mapping.
/// A key appearing both at the top level and inside a group is a schema error.
pub fn flatten_mapping(value: &Value) -> Result<Map<String, Value>, AppError> {
    let object = value
        .as_object()
        .ok_or_else(|| AppError::schema(format!("expected a JSON object, got {}", kind_of(value))))?;

    let mut flat = Map::new();
    for (key, value) in object {
        let is_group = key == FieldGroup::Identity.key()
            || FieldGroup::NESTED.iter().any(|g| g.key() == key);
        match value {
            Value::Object(inner) if is_group => {
                for (inner_key, inner_value) in inner {
                    insert_unique(&mut flat, inner_key, inner_value.clone())?;
                }
            }
            _ => insert_unique(&mut flat, key, value.clone())?,
        }
    }
    Ok(flat)
}

fn insert_unique(flat: &mut Map<String, Value>, key: &str, value: Value) -> Result<(), AppError> {
    if flat.insert(key.to_string(), value).is_some() {
        return Err(AppError::schema(format!("field '{key}' appears more than once")));
    }
    Ok(())
}

/// Every column must be present; an explicit null is not the same as absent.
fn check_required(flat: &Map<String, Value>, columns: &[&str]) -> Result<(), AppError> {
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| !flat.contains_key(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::schema(format!("missing field(s): {}", missing.join(", "))))
    }
}

fn check_identity(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::schema("persona id must not be empty"));
    }
    Ok(())
}

fn check_integer_bounds(mapping: &Map<String, Value>) -> Result<(), AppError> {
    for (key, value) in mapping {
        if let Some(FieldKind::Integer { min, max }) = spec_for(key).map(|s| s.kind) {
            let n = value
                .as_i64()
                .ok_or_else(|| AppError::schema(format!("field '{key}' must be an integer")))?;
            if n < min || n > max {
                return Err(AppError::schema(format!(
                    "field '{key}' = {n} is outside {min}..={max}"
                )));
            }
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tabular (CSV) conversion
// ────────────────────────────────────────────────────────────────────────────

/// Renders one cell: lists are comma-joined, null is empty.
pub fn tabular_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(tabular_cell)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Renders a mapping as a row in the given column order.
pub fn to_tabular_row(mapping: &Map<String, Value>, columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .map(|c| mapping.get(*c).map(tabular_cell).unwrap_or_default())
        .collect()
}

/// Rebuilds a typed mapping from a text row, parsing each column according to
/// the field table. Unknown columns pass through as strings so that the schema
/// check can reject them.
pub fn mapping_from_tabular_row(
    headers: &[String],
    row: &[String],
) -> Result<Map<String, Value>, AppError> {
    if headers.len() != row.len() {
        return Err(AppError::schema(format!(
            "row has {} cells but header has {} columns",
            row.len(),
            headers.len()
        )));
    }

    let mut mapping = Map::new();
    for (header, cell) in headers.iter().zip(row) {
        let value = match spec_for(header).map(|s| s.kind) {
            Some(FieldKind::Integer { .. }) => {
                let n: i64 = cell.trim().parse().map_err(|_| {
                    AppError::schema(format!("column '{header}': '{cell}' is not an integer"))
                })?;
                Value::from(n)
            }
            Some(FieldKind::OptionalEnumerated(_)) if cell.trim().is_empty() => Value::Null,
            Some(FieldKind::TextList { .. }) => Value::Array(
                cell.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            _ => Value::String(cell.clone()),
        };
        mapping.insert(header.clone(), value);
    }
    Ok(mapping)
}

pub fn persona_columns() -> Vec<&'static str> {
    FIELD_SPECS.iter().map(|s| s.name).collect()
}

pub fn base_columns() -> Vec<&'static str> {
    std::iter::once("id").chain(BASE_FIELDS).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_mapping_round_trip() {
        let persona = fixtures::persona("p001");
        let recovered = Persona::from_mapping(&Value::Object(persona.to_mapping())).unwrap();
        assert_eq!(recovered, persona);
    }

    #[test]
    fn test_grouped_mapping_round_trip() {
        let persona = fixtures::persona("p001");
        let grouped = persona.to_grouped_mapping();
        assert!(grouped.contains_key("demographic"));
        assert!(grouped.contains_key("cultural_value"));
        assert_eq!(grouped.get("id"), Some(&json!("p001")));
        assert!(!grouped.contains_key("age"), "age belongs under demographic");

        let recovered = Persona::from_mapping(&Value::Object(grouped)).unwrap();
        assert_eq!(recovered, persona);
    }

    #[test]
    fn test_serialized_text_round_trip_keeps_unicode() {
        let mut persona = fixtures::persona("p001");
        persona.important_personal_experiences = "از دست دادن همسر".to_string();
        let text = persona.to_serialized_text().unwrap();
        assert!(text.contains("از دست دادن همسر"));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(Persona::from_mapping(&value).unwrap(), persona);
    }

    #[test]
    fn test_string_age_is_rejected_not_coerced() {
        let mut mapping = fixtures::persona("p001").to_mapping();
        mapping.insert("age".to_string(), json!("72"));
        let err = Persona::from_mapping(&Value::Object(mapping)).unwrap_err();
        assert!(matches!(err, AppError::Schema(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut mapping = fixtures::persona("p001").to_mapping();
        mapping.remove("housing");
        let err = Persona::from_mapping(&Value::Object(mapping)).unwrap_err();
        assert!(err.to_string().contains("housing"), "got {err}");
    }

    #[test]
    fn test_absent_chronic_disease_is_rejected_but_null_is_accepted() {
        let mut mapping = fixtures::persona("p001").to_mapping();
        mapping.insert("chronic_disease".to_string(), Value::Null);
        let persona = Persona::from_mapping(&Value::Object(mapping.clone())).unwrap();
        assert_eq!(persona.chronic_disease, None);

        mapping.remove("chronic_disease");
        let err = Persona::from_mapping(&Value::Object(mapping)).unwrap_err();
        assert!(matches!(err, AppError::Schema(_)), "got {err:?}");
        assert!(err.to_string().contains("chronic_disease"), "got {err}");
    }

    #[test]
    fn test_base_record_missing_field_is_rejected() {
        let mut mapping = fixtures::base("p001").to_mapping();
        mapping.remove("language");
        let err = BaseFields::from_mapping(&Value::Object(mapping)).unwrap_err();
        assert!(err.to_string().contains("language"), "got {err}");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut mapping = fixtures::persona("p001").to_mapping();
        mapping.insert("favourite_colour".to_string(), json!("blue"));
        assert!(Persona::from_mapping(&Value::Object(mapping)).is_err());
    }

    #[test]
    fn test_out_of_range_integers_are_rejected() {
        let mut mapping = fixtures::persona("p001").to_mapping();
        mapping.insert("economic_decile".to_string(), json!(11));
        assert!(Persona::from_mapping(&Value::Object(mapping)).is_err());

        let mut mapping = fixtures::base("p001").to_mapping();
        mapping.insert("age".to_string(), json!(40));
        assert!(BaseFields::from_mapping(&Value::Object(mapping)).is_err());
    }

    #[test]
    fn test_duplicate_key_across_shapes_is_rejected() {
        let value = json!({
            "id": "p001",
            "age": 72,
            "demographic": {"age": 73}
        });
        let err = flatten_mapping(&value).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = Persona::from_mapping(&json!([1, 2, 3])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_validate_domains_accepts_fixture() {
        fixtures::persona("p001").validate_domains().unwrap();
    }

    #[test]
    fn test_validate_domains_reports_every_violation() {
        let mut persona = fixtures::persona("p001");
        persona.mobility = "Flying".to_string();
        persona.internalized_moral_traits = vec!["Honesty".to_string()];
        let err = persona.validate_domains().unwrap_err().to_string();
        assert!(err.contains("mobility"));
        assert!(err.contains("internalized_moral_traits"));
    }

    #[test]
    fn test_null_chronic_disease_is_in_domain() {
        let mut persona = fixtures::persona("p001");
        persona.chronic_disease = None;
        persona.validate_domains().unwrap();
    }

    #[test]
    fn test_base_fields_projection_and_diff() {
        let base = fixtures::base("p001");
        let mut persona = fixtures::persona_from(&base);
        assert!(base.diff(&persona.base_fields()).is_empty());

        persona.age = 73;
        persona.religion_and_sect = "Sunni Muslim".to_string();
        let diff = base.diff(&persona.base_fields());
        let fields: Vec<_> = diff.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(fields, vec!["age", "religion_and_sect"]);
        assert_eq!(diff[0].expected, json!(72));
        assert_eq!(diff[0].actual, json!(73));
    }

    #[test]
    fn test_tabular_row_round_trip() {
        let persona = fixtures::persona("p001");
        let columns = persona_columns();
        let row = to_tabular_row(&persona.to_mapping(), &columns);
        let traits_idx = columns
            .iter()
            .position(|c| *c == "internalized_moral_traits")
            .unwrap();
        assert_eq!(row[traits_idx], "Patience, Generosity");

        let headers: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let mapping = mapping_from_tabular_row(&headers, &row).unwrap();
        assert_eq!(Persona::from_mapping(&Value::Object(mapping)).unwrap(), persona);
    }

    #[test]
    fn test_tabular_non_numeric_age_is_schema_error() {
        let headers = vec!["id".to_string(), "age".to_string()];
        let row = vec!["p001".to_string(), "seventy".to_string()];
        let err = mapping_from_tabular_row(&headers, &row).unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn test_tabular_empty_chronic_disease_is_null() {
        let headers = vec!["chronic_disease".to_string()];
        let mapping = mapping_from_tabular_row(&headers, &[String::new()]).unwrap();
        assert_eq!(mapping.get("chronic_disease"), Some(&Value::Null));
    }
}
