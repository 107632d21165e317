//! Persistence for persona collections and interview transcripts.
//!
//! Interview output is written incrementally: each (persona, model) pair gets
//! its own output unit and every record is flushed as soon as it exists.

pub mod interactions;
pub mod personas;

use crate::errors::AppError;
use crate::models::interview::Interaction;

/// Append-only sink for one (persona, model) pair.
pub trait InteractionWriter: Send {
    /// Persists one record. Returns only after the record is durable.
    fn append(&mut self, interaction: &Interaction) -> Result<(), AppError>;

    /// Closes the unit. Records already appended stay valid even if this is
    /// never called.
    fn finish(&mut self) -> Result<(), AppError>;
}

/// Hands out one writer per (persona, model) pair.
pub trait InteractionStore: Send {
    fn open_pair(
        &mut self,
        persona_id: &str,
        model: &str,
    ) -> Result<Box<dyn InteractionWriter>, AppError>;
}

/// Replaces characters that are unsafe in file names.
pub fn sanitize_for_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_filename() {
        assert_eq!(sanitize_for_filename("gpt-5-mini"), "gpt-5-mini");
        assert_eq!(sanitize_for_filename("openai/gpt-4o:latest"), "openai_gpt-4o_latest");
        assert_eq!(sanitize_for_filename("a b"), "a_b");
    }
}
