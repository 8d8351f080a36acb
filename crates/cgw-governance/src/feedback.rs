//! # Feedback Log
//!
//! Append-only. Entries are never edited or removed.

use serde::{Deserialize, Serialize};

use cgw_core::{FeedbackId, Timestamp, ValidationError};

use crate::error::GovernanceError;

/// Longest accepted feedback message, in characters.
pub const MAX_FEEDBACK_CHARS: usize = 2_000;

const MAX_AUTHOR_CHARS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Process,
    Tooling,
    Policy,
    #[default]
    Other,
}

impl std::fmt::Display for FeedbackCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Process => "process",
            Self::Tooling => "tooling",
            Self::Policy => "policy",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: FeedbackId,
    pub author: String,
    pub message: String,
    pub category: FeedbackCategory,
    pub submitted_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackLog {
    entries: Vec<FeedbackEntry>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append an entry.
    pub fn submit(
        &mut self,
        author: &str,
        message: &str,
        category: FeedbackCategory,
    ) -> Result<&FeedbackEntry, GovernanceError> {
        let author = bounded("author", author, MAX_AUTHOR_CHARS)?;
        let message = bounded("message", message, MAX_FEEDBACK_CHARS)?;
        let entry = FeedbackEntry {
            id: FeedbackId::new(),
            author,
            message,
            category,
            submitted_at: Timestamp::now(),
        };
        tracing::info!(feedback_id = %entry.id, %category, "feedback submitted");
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        Ok(&self.entries[last])
    }

    /// Entries in submission order.
    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value.to_string())
}
