//! services/api/src/web/analysis_task.rs
//!
//! The analysis dispatcher: works out which analysis fields an entry still
//! lacks and asks the external worker to produce exactly those. Runs as a
//! spawned background task so the HTTP caller never waits on it.

use crate::web::state::AppState;
use journal_core::analysis::{AnalysisGaps, AnalysisRequest};
use journal_core::domain::EntryStatus;
use journal_core::ports::PortResult;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Dispatches an analysis pass for one entry.
///
/// Errors are caught and reported only as a `false` return: the dispatcher
/// never writes a terminal status itself. An entry whose dispatch failed
/// stays `processing` until the user re-analyzes it; the webhook path owns
/// the terminal transitions.
pub async fn dispatch_analysis(state: Arc<AppState>, entry_id: Uuid, user_id: String) -> bool {
    info!("Starting analysis dispatch for entry {entry_id}");
    match try_dispatch(&state, entry_id, &user_id).await {
        Ok(()) => {
            info!("Analysis task dispatched for entry {entry_id}");
            true
        }
        Err(e) => {
            error!("Analysis dispatch failed for entry {entry_id}: {e}");
            false
        }
    }
}

async fn try_dispatch(state: &AppState, entry_id: Uuid, user_id: &str) -> PortResult<()> {
    let entry = state.db.get_entry(entry_id, user_id).await?;

    // Re-analysis semantics: a terminal entry goes back to processing
    // before new work is requested.
    if entry.status.is_terminal() {
        state
            .db
            .set_entry_status(entry_id, user_id, EntryStatus::Processing)
            .await?;
    }

    let gaps = AnalysisGaps::of_entry(&entry);

    // The worker only needs the audio when it has to transcribe.
    let audio_url = if !gaps.has_transcript && !entry.audio_path.is_empty() {
        state
            .storage
            .signed_url(&entry.audio_path, state.config.signed_url_ttl_secs)
            .await?
    } else {
        String::new()
    };

    let request = AnalysisRequest {
        gaps,
        audio_url,
        transcript: entry.transcript.unwrap_or_default(),
        user_id: user_id.to_string(),
        entry_id,
        is_goal_added: entry.is_goal_added,
    };

    state.analysis.submit_analysis(&request).await
}
