//! crates/journal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::analysis::{AnalysisRequest, EntryUpdate, StagedUpdate};
use crate::domain::{
    Entry, EntryStatus, EntrySummary, Goal, GoalUpdate, MoodInsights, NewGoal,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// One page of entry summaries plus the look-ahead flag.
#[derive(Debug, Clone)]
pub struct EntryPage {
    pub entries: Vec<EntrySummary>,
    /// True iff the store held at least one row beyond this page.
    pub has_next: bool,
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Diary Entries ---
    /// Inserts a fresh entry row with `status = processing` and the default
    /// title, returning the generated id.
    async fn create_entry(&self, user_id: &str, audio_path: &str) -> PortResult<Uuid>;

    async fn get_entry(&self, entry_id: Uuid, user_id: &str) -> PortResult<Entry>;

    /// Newest first. `page` is 1-based; the adapter fetches `page_size + 1`
    /// rows to compute `has_next`.
    async fn list_entries(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> PortResult<EntryPage>;

    async fn update_title(
        &self,
        entry_id: Uuid,
        user_id: &str,
        new_title: &str,
    ) -> PortResult<()>;

    async fn set_entry_status(
        &self,
        entry_id: Uuid,
        user_id: &str,
        status: EntryStatus,
    ) -> PortResult<()>;

    /// Applies a staged merge in a single update scoped to
    /// (entry_id, user_id), filling only the staged fields. Returns the
    /// number of rows affected; zero means the entry was deleted
    /// concurrently and the result must be discarded.
    async fn apply_analysis(
        &self,
        entry_id: Uuid,
        user_id: &str,
        staged: &StagedUpdate,
    ) -> PortResult<u64>;

    /// Deletes the row; returns the number of rows affected. Removal of the
    /// stored audio object is a database-side trigger concern, not
    /// orchestrated here.
    async fn delete_entry(&self, entry_id: Uuid, user_id: &str) -> PortResult<u64>;

    // --- Goals ---
    async fn create_goal(&self, goal: NewGoal) -> PortResult<Goal>;

    /// Ordered by target date ascending.
    async fn list_goals(&self, user_id: &str) -> PortResult<Vec<Goal>>;

    async fn update_goal(
        &self,
        goal_id: Uuid,
        user_id: &str,
        update: GoalUpdate,
    ) -> PortResult<()>;

    async fn delete_goal(&self, goal_id: Uuid, user_id: &str) -> PortResult<()>;

    /// Marks the entry's detected goal as promoted into the goal list.
    async fn mark_goal_promoted(&self, entry_id: Uuid, user_id: &str) -> PortResult<()>;

    // --- Insights ---
    async fn mood_insights(&self, user_id: &str) -> PortResult<MoodInsights>;
}

/// Durable object storage for the recorded audio.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Uploads the object and returns the stored path.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> PortResult<String>;

    async fn remove(&self, path: &str) -> PortResult<()>;

    /// Creates a time-limited, credential-free read link to the object.
    async fn signed_url(&self, path: &str, expires_in_secs: u32) -> PortResult<String>;
}

/// The external analysis worker. One-way: the synchronous response only
/// acknowledges receipt, the real result arrives later through the webhook.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn submit_analysis(&self, request: &AnalysisRequest) -> PortResult<()>;
}

/// Resolves a bearer credential into a stable user identifier.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn resolve_user(&self, bearer_token: &str) -> PortResult<String>;
}

/// Reversible symmetric cipher for the sensitive text fields.
pub trait FieldCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> String;

    /// Tolerant of malformed ciphertext: returns an empty string rather
    /// than failing, so one bad field never aborts a whole response.
    fn decrypt(&self, ciphertext: &str) -> String;
}

/// The live status channel: fire-and-forget publication into the room named
/// by the entry id. Events published to an empty room are lost.
pub trait StatusPublisher: Send + Sync {
    fn publish(&self, entry_id: Uuid, update: EntryUpdate);
}
