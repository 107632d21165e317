//! Loading and writing persona collections (JSON array, JSON Lines, CSV).
//!
//! Loading is lenient per record: a record that fails the schema is skipped
//! and reported, the rest of the file still loads.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::models::persona::{
    base_columns, mapping_from_tabular_row, persona_columns, to_tabular_row, BaseFields, Persona,
};

/// Record types that can be read from any persona file.
pub trait PersonaRecord: Sized {
    fn from_mapping(value: &Value) -> Result<Self, AppError>;
}

impl PersonaRecord for Persona {
    fn from_mapping(value: &Value) -> Result<Self, AppError> {
        Persona::from_mapping(value)
    }
}

impl PersonaRecord for BaseFields {
    fn from_mapping(value: &Value) -> Result<Self, AppError> {
        BaseFields::from_mapping(value)
    }
}

#[derive(Debug)]
pub struct RejectedRecord {
    /// 1-based record position in the file (array index, line or data row).
    pub position: usize,
    pub error: AppError,
}

#[derive(Debug)]
pub struct LoadReport<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    JsonLines,
    Csv,
}

fn format_of(path: &Path) -> Result<FileFormat, AppError> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => Ok(FileFormat::Json),
        Some("jsonl") | Some("ndjson") => Ok(FileFormat::JsonLines),
        Some("csv") => Ok(FileFormat::Csv),
        _ => Err(AppError::configuration(format!(
            "unsupported persona file {} (expected .json, .jsonl or .csv)",
            path.display()
        ))),
    }
}

/// Loads persona records; the format is picked from the file extension.
pub fn load_records<T: PersonaRecord>(path: &Path) -> Result<LoadReport<T>, AppError> {
    let raw: Vec<Result<Value, AppError>> = match format_of(path)? {
        FileFormat::Json => {
            let text = std::fs::read_to_string(path)?;
            match serde_json::from_str::<Value>(&text)? {
                Value::Array(items) => items.into_iter().map(Ok).collect(),
                other => vec![Ok(other)],
            }
        }
        FileFormat::JsonLines => std::fs::read_to_string(path)?
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str::<Value>(l).map_err(AppError::from))
            .collect(),
        FileFormat::Csv => read_csv_mappings(path)?,
    };

    let mut report = LoadReport {
        records: Vec::new(),
        rejected: Vec::new(),
    };
    for (i, item) in raw.into_iter().enumerate() {
        match item.and_then(|value| T::from_mapping(&value)) {
            Ok(record) => report.records.push(record),
            Err(error) => {
                report.rejected.push(RejectedRecord {
                    position: i + 1,
                    error,
                });
            }
        }
    }

    info!(
        "Loaded {} record(s) from {} ({} rejected)",
        report.records.len(),
        path.display(),
        report.rejected.len()
    );
    Ok(report)
}

fn read_csv_mappings(path: &Path) -> Result<Vec<Result<Value, AppError>>, AppError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut out = Vec::new();
    for row in reader.records() {
        let item = row.map_err(AppError::from).and_then(|record| {
            let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            mapping_from_tabular_row(&headers, &cells).map(Value::Object)
        });
        out.push(item);
    }
    Ok(out)
}

/// Paths of one collection written in both formats.
#[derive(Debug, Clone)]
pub struct WrittenCollection {
    pub csv: PathBuf,
    pub json: PathBuf,
}

pub fn write_base_personas(
    dir: &Path,
    run_id: &str,
    bases: &[BaseFields],
) -> Result<WrittenCollection, AppError> {
    let mappings: Vec<_> = bases.iter().map(BaseFields::to_mapping).collect();
    write_collection(dir, &format!("base_personas_{run_id}"), &base_columns(), &mappings)
}

pub fn write_final_personas(
    dir: &Path,
    run_id: &str,
    personas: &[Persona],
) -> Result<WrittenCollection, AppError> {
    let mappings: Vec<_> = personas.iter().map(Persona::to_mapping).collect();
    write_collection(dir, &format!("final_personas_{run_id}"), &persona_columns(), &mappings)
}

fn write_collection(
    dir: &Path,
    stem: &str,
    columns: &[&str],
    mappings: &[Map<String, Value>],
) -> Result<WrittenCollection, AppError> {
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join(format!("{stem}.csv"));
    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(columns)?;
    for mapping in mappings {
        writer.write_record(to_tabular_row(mapping, columns))?;
    }
    writer.flush()?;

    // Keep the field-table order in JSON output too.
    let ordered: Vec<Value> = mappings
        .iter()
        .map(|m| {
            Value::Object(
                columns
                    .iter()
                    .filter_map(|c| m.get(*c).map(|v| (c.to_string(), v.clone())))
                    .collect(),
            )
        })
        .collect();
    let json_path = dir.join(format!("{stem}.json"));
    std::fs::write(&json_path, serde_json::to_string_pretty(&ordered)?)?;

    info!(
        "Wrote {} record(s) to {} and {}",
        mappings.len(),
        csv_path.display(),
        json_path.display()
    );
    Ok(WrittenCollection {
        csv: csv_path,
        json: json_path,
    })
}
