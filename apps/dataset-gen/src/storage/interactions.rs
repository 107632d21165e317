//! Interview transcripts as one CSV file per (persona, model) pair.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::interview::Interaction;
use crate::storage::{sanitize_for_filename, InteractionStore, InteractionWriter};

/// Column order of every transcript file; matches `Interaction`'s fields.
pub const INTERACTION_COLUMNS: [&str; 10] = [
    "interaction_id",
    "persona_id",
    "model",
    "subject",
    "question_id",
    "question_type",
    "sequence",
    "question",
    "answer",
    "created_at",
];

/// Writes `synthetic_elder_fa_{session}_{model}_{persona_id}.csv` files into
/// one directory. `session` is fixed when the store is created.
pub struct CsvInteractionStore {
    dir: PathBuf,
    session: String,
}

impl CsvInteractionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        Self::with_session(dir, Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn with_session(dir: impl Into<PathBuf>, session: impl Into<String>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            session: session.into(),
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn path_for(&self, persona_id: &str, model: &str) -> PathBuf {
        self.dir.join(format!(
            "synthetic_elder_fa_{}_{}_{}.csv",
            self.session,
            sanitize_for_filename(model),
            sanitize_for_filename(persona_id)
        ))
    }

    /// Creates the transcript file for a pair without ever truncating an
    /// existing one. Pairs whose names collide after sanitising get a
    /// numbered suffix (`..._2.csv`, `..._3.csv`).
    fn create_unique(&self, persona_id: &str, model: &str) -> Result<(PathBuf, File), AppError> {
        let base = self.path_for(persona_id, model);
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut path = base.clone();
        let mut attempt = 1;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    if attempt > 1 {
                        warn!(
                            "Transcript name {} already taken, writing pair ({}, {}) to {}",
                            base.display(),
                            persona_id,
                            model,
                            path.display()
                        );
                    }
                    return Ok((path, file));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                    path = self.dir.join(format!("{stem}_{attempt}.csv"));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl InteractionStore for CsvInteractionStore {
    fn open_pair(
        &mut self,
        persona_id: &str,
        model: &str,
    ) -> Result<Box<dyn InteractionWriter>, AppError> {
        let (path, file) = self.create_unique(persona_id, model)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(INTERACTION_COLUMNS)?;
        writer.flush()?;
        debug!("Opened transcript {}", path.display());
        Ok(Box::new(CsvInteractionWriter {
            path,
            writer,
            written: 0,
        }))
    }
}

pub struct CsvInteractionWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    written: usize,
}

impl InteractionWriter for CsvInteractionWriter {
    fn append(&mut self, interaction: &Interaction) -> Result<(), AppError> {
        self.writer.serialize(interaction)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AppError> {
        self.writer.flush()?;
        info!("Saved {} row(s) to {}", self.written, self.path.display());
        Ok(())
    }
}

/// Reads a transcript file back.
#[allow(dead_code)]
pub fn read_interactions(path: &Path) -> Result<Vec<Interaction>, AppError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut out = Vec::new();
    for row in reader.deserialize() {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
pub mod memory {
    //! In-memory store for engine and orchestrator tests.

    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, Default)]
    pub struct StoredPair {
        pub persona_id: String,
        pub model: String,
        pub records: Vec<Interaction>,
        pub finished: bool,
    }

    #[derive(Clone, Default)]
    pub struct MemoryInteractionStore {
        pub pairs: Arc<Mutex<Vec<StoredPair>>>,
        /// Appends fail once a pair holds this many records.
        pub fail_after: Option<usize>,
    }

    impl MemoryInteractionStore {
        pub fn snapshot(&self) -> Vec<StoredPair> {
            self.pairs.lock().unwrap().clone()
        }
    }

    impl InteractionStore for MemoryInteractionStore {
        fn open_pair(
            &mut self,
            persona_id: &str,
            model: &str,
        ) -> Result<Box<dyn InteractionWriter>, AppError> {
            let mut pairs = self.pairs.lock().unwrap();
            pairs.push(StoredPair {
                persona_id: persona_id.to_string(),
                model: model.to_string(),
                ..Default::default()
            });
            Ok(Box::new(MemoryWriter {
                pairs: self.pairs.clone(),
                index: pairs.len() - 1,
                fail_after: self.fail_after,
            }))
        }
    }

    pub struct MemoryWriter {
        pairs: Arc<Mutex<Vec<StoredPair>>>,
        index: usize,
        fail_after: Option<usize>,
    }

    impl MemoryWriter {
        pub fn standalone() -> (Self, Arc<Mutex<Vec<StoredPair>>>) {
            let pairs = Arc::new(Mutex::new(vec![StoredPair::default()]));
            (
                Self {
                    pairs: pairs.clone(),
                    index: 0,
                    fail_after: None,
                },
                pairs,
            )
        }

        pub fn failing_after(mut self, count: usize) -> Self {
            self.fail_after = Some(count);
            self
        }
    }

    impl InteractionWriter for MemoryWriter {
        fn append(&mut self, interaction: &Interaction) -> Result<(), AppError> {
            let mut pairs = self.pairs.lock().unwrap();
            let pair = &mut pairs[self.index];
            if self.fail_after.is_some_and(|n| pair.records.len() >= n) {
                return Err(AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            pair.records.push(interaction.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<(), AppError> {
            self.pairs.lock().unwrap()[self.index].finished = true;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::interview::{QuestionType, Subject};

    fn interaction(sequence: usize, subject: Option<Subject>) -> Interaction {
        Interaction {
            interaction_id: Uuid::new_v4(),
            persona_id: "p001".to_string(),
            model: "gpt-4o".to_string(),
            subject,
            question_id: format!("q{sequence}"),
            question_type: QuestionType::Main,
            sequence,
            question: "آیا بازنشسته شده اید؟".to_string(),
            answer: "بله، ده سال پیش.\nحالا بیشتر در خانه هستم، \"آرام\".".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_file_name_contains_session_model_and_persona() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvInteractionStore::with_session(dir.path(), "20250101_120000").unwrap();
        let path = store.path_for("p001", "openai/gpt-4o");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "synthetic_elder_fa_20250101_120000_openai_gpt-4o_p001.csv"
        );
    }

    #[test]
    fn test_records_are_readable_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvInteractionStore::with_session(dir.path(), "s1").unwrap();
        let mut writer = store.open_pair("p001", "gpt-4o").unwrap();

        let first = interaction(0, None);
        writer.append(&first).unwrap();
        // Flushed per record: visible without finish().
        let read = read_interactions(&store.path_for("p001", "gpt-4o")).unwrap();
        assert_eq!(read, vec![first.clone()]);

        let second = interaction(1, Some(Subject::LossOfIncome));
        writer.append(&second).unwrap();
        writer.finish().unwrap();
        let read = read_interactions(&store.path_for("p001", "gpt-4o")).unwrap();
        assert_eq!(read, vec![first, second]);
    }

    #[test]
    fn test_colliding_pair_names_never_overwrite_a_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvInteractionStore::with_session(dir.path(), "s1").unwrap();
        let first_path = store.path_for("p001", "openai/gpt-4o");
        assert_eq!(first_path, store.path_for("p001", "openai_gpt-4o"));

        let mut first = store.open_pair("p001", "openai/gpt-4o").unwrap();
        let record = interaction(0, None);
        first.append(&record).unwrap();
        first.finish().unwrap();

        let mut second = store.open_pair("p001", "openai_gpt-4o").unwrap();
        second.append(&interaction(0, None)).unwrap();
        second.finish().unwrap();
        store.open_pair("p001", "openai:gpt-4o").unwrap();

        assert_eq!(read_interactions(&first_path).unwrap(), vec![record]);
        let second_path = dir.path().join("synthetic_elder_fa_s1_openai_gpt-4o_p001_2.csv");
        assert_eq!(read_interactions(&second_path).unwrap().len(), 1);
        assert!(dir
            .path()
            .join("synthetic_elder_fa_s1_openai_gpt-4o_p001_3.csv")
            .exists());
    }

    #[test]
    fn test_empty_pair_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvInteractionStore::with_session(dir.path(), "s1").unwrap();
        store.open_pair("p002", "grok-3").unwrap();
        let text = std::fs::read_to_string(store.path_for("p002", "grok-3")).unwrap();
        assert_eq!(text.trim_end(), INTERACTION_COLUMNS.join(","));
    }

    #[test]
    fn test_header_matches_serialized_field_order() {
        let value = serde_json::to_value(interaction(0, None)).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        let mut expected: Vec<String> = INTERACTION_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut keys_sorted = keys.clone();
        keys_sorted.sort();
        expected.sort();
        assert_eq!(keys_sorted, expected);
    }
}
