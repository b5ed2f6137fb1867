//! crates/journal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format,
//! except where a type is itself part of a wire protocol.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// The processing state of a diary entry.
///
/// An entry starts `Processing`, becomes `Completed` once every expected
/// analysis field is present, and `Failed` when a pass could not produce
/// everything that was still missing. Re-analysis moves a terminal entry
/// back to `Processing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Processing => "processing",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
        }
    }

    /// True for `completed` and `failed`, the two states a re-analysis
    /// resets before dispatching new work.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Failed)
    }
}

/// Error returned when a stored status string is not a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown entry status: {0}")]
pub struct InvalidStatus(pub String);

impl FromStr for EntryStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(EntryStatus::Processing),
            "completed" => Ok(EntryStatus::Completed),
            "failed" => Ok(EntryStatus::Failed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// One voice-diary record.
///
/// The encrypted text fields (`transcript`, `ai_summary`, `reflections`,
/// `suggestions`, `goals`) hold ciphertext as stored; decryption happens at
/// the read path. `mood_labels` is always derived from `mood_scores`, never
/// set independently.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub audio_path: String,
    pub transcript: Option<String>,
    pub ai_summary: Option<String>,
    pub reflections: Option<String>,
    pub suggestions: Option<String>,
    pub goals: Option<String>,
    pub tags: Vec<String>,
    pub mood_scores: BTreeMap<String, f64>,
    pub mood_labels: Vec<String>,
    pub status: EntryStatus,
    pub is_goal_added: bool,
    pub created_at: DateTime<Utc>,
}

/// The slim row shape returned by the paginated list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    #[serde(rename = "entryId")]
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A user goal, optionally promoted out of a diary entry's analysis.
#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    #[serde(rename = "goalId")]
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "targetDate")]
    pub target_date: NaiveDate,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    /// Backlink to the entry whose analysis surfaced this goal, if any.
    #[serde(rename = "entryId")]
    pub entry_id: Option<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// The fields required to insert a new goal.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: NaiveDate,
    pub entry_id: Option<Uuid>,
}

/// The mutable fields of an existing goal.
#[derive(Debug, Clone)]
pub struct GoalUpdate {
    pub title: String,
    pub description: Option<String>,
    pub target_date: NaiveDate,
    pub is_completed: bool,
}

/// Per-user aggregation over the entry table.
#[derive(Debug, Clone, Serialize)]
pub struct MoodInsights {
    /// Average score per mood over the last 30 days.
    #[serde(rename = "averageMoodScores")]
    pub average_mood_scores: BTreeMap<String, f64>,
    /// Number of entries recorded over the last 7 days.
    #[serde(rename = "entriesLastWeek")]
    pub entries_last_week: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_text() {
        for status in [
            EntryStatus::Processing,
            EntryStatus::Completed,
            EntryStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<EntryStatus>().unwrap(), status);
        }
        assert!("pending".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!EntryStatus::Processing.is_terminal());
        assert!(EntryStatus::Completed.is_terminal());
        assert!(EntryStatus::Failed.is_terminal());
    }
}
