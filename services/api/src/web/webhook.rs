//! services/api/src/web/webhook.rs
//!
//! The analysis-result webhook: the single write path for AI-produced entry
//! fields. The worker calls back here with whatever it produced; this handler
//! merges the output into the row (fill-only), settles the entry status, and
//! pushes the decrypted result to any live watcher.

use crate::error::ApiError;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use journal_core::analysis::{merge_pass, AnalysisOutput, AnalysisPayload, WebhookEnvelope};
use journal_core::analysis::EntryUpdate;
use journal_core::domain::EntryStatus;
use tracing::{error, info, warn};
use uuid::Uuid;

enum ApplyOutcome {
    Applied(EntryStatus),
    /// The entry row no longer exists; the user deleted it mid-flight.
    Discarded,
}

/// Handles `POST /webhooks/handleAiResult`.
///
/// The worker delivers at least once, so anything that cannot be attributed
/// to an entry is acknowledged with 200 rather than provoking a retry. Only a
/// genuine internal failure returns 500.
pub async fn handle_ai_result(
    State(app_state): State<std::sync::Arc<AppState>>,
    Json(envelope): Json<WebhookEnvelope>,
) -> Response {
    // A worker-reported failure carries no output to merge. The entry keeps
    // whatever status it had; the user can re-analyze.
    if let Some(AnalysisPayload::Verdict(verdict)) = &envelope.analysis {
        if verdict == "failed" {
            warn!("Analysis worker reported a failed pass; nothing to merge");
            return (StatusCode::OK, "OK").into_response();
        }
    }

    let Some(echo) = envelope.status.clone() else {
        info!("Webhook payload carried no dispatch echo; acknowledging");
        return (StatusCode::OK, "OK").into_response();
    };
    let (Some(user_id), Some(entry_id)) = (echo.user_id.clone(), echo.entry_id) else {
        info!("Webhook payload missing user or entry id; acknowledging");
        return (StatusCode::OK, "OK").into_response();
    };

    match apply_result(&app_state, &user_id, entry_id, &envelope).await {
        Ok(ApplyOutcome::Applied(status)) => {
            info!(
                "Analysis results merged for entry {entry_id}, status now {}",
                status.as_str()
            );
            (StatusCode::OK, "OK").into_response()
        }
        Ok(ApplyOutcome::Discarded) => {
            info!("Entry {entry_id} was deleted while analyzing; results discarded");
            (StatusCode::OK, "Discarded").into_response()
        }
        Err(e) => {
            error!("Webhook processing failed for entry {entry_id}: {e}");
            // Best effort: settle the row as failed and tell any watcher.
            if let Err(e) = app_state
                .db
                .set_entry_status(entry_id, &user_id, EntryStatus::Failed)
                .await
            {
                error!("Could not record failed status for entry {entry_id}: {e}");
            }
            app_state
                .publisher
                .publish(entry_id, EntryUpdate::status_only(EntryStatus::Failed));
            (StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response()
        }
    }
}

async fn apply_result(
    app_state: &AppState,
    user_id: &str,
    entry_id: Uuid,
    envelope: &WebhookEnvelope,
) -> Result<ApplyOutcome, ApiError> {
    let echo = envelope
        .status
        .as_ref()
        .ok_or_else(|| ApiError::Internal("dispatch echo vanished".to_string()))?;

    let output = match &envelope.analysis {
        Some(AnalysisPayload::Output(output)) => output.clone(),
        Some(AnalysisPayload::Verdict(v)) => {
            return Err(ApiError::Internal(format!(
                "unrecognized analysis verdict: {v}"
            )))
        }
        None => AnalysisOutput::default(),
    };

    let staged = merge_pass(&echo.gaps, &output).map_err(|e| ApiError::Internal(e.to_string()))?;

    let rows = app_state.db.apply_analysis(entry_id, user_id, &staged).await?;
    if rows == 0 {
        return Ok(ApplyOutcome::Discarded);
    }

    let status = staged.status;
    // A pass that staged nothing (every field already present) only needs
    // to tell watchers about the transition.
    let update = if staged.is_status_only() {
        EntryUpdate::status_only(status)
    } else {
        EntryUpdate {
            status,
            result: Some(staged.to_broadcast(|cipher| app_state.cipher.decrypt(cipher))),
        }
    };
    app_state.publisher.publish(entry_id, update);
    Ok(ApplyOutcome::Applied(status))
}
