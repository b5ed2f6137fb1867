//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the diary-entry REST endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::analysis_task::dispatch_analysis;
use crate::web::middleware::AuthedUser;
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use journal_core::analysis::EntryUpdate;
use journal_core::domain::{EntryStatus, EntrySummary};
use journal_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_entry_handler,
    ),
    components(
        schemas(CreateEntryResponse, StatusMessage)
    ),
    tags(
        (name = "Voice Journal API", description = "API endpoints for the voice-journaling backend.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The uniform `{status, message}` body used for every plain acknowledgement
/// and every rejection.
#[derive(Serialize, ToSchema)]
pub struct StatusMessage {
    pub status: bool,
    pub message: String,
}

/// The rejection type shared by all handlers.
pub type Rejection = (StatusCode, Json<StatusMessage>);

pub(crate) fn fail(code: StatusCode, message: &str) -> Rejection {
    (
        code,
        Json(StatusMessage {
            status: false,
            message: message.to_string(),
        }),
    )
}

/// The response payload sent after successfully creating an entry.
#[derive(Serialize, ToSchema)]
pub struct CreateEntryResponse {
    status: bool,
    message: String,
    #[serde(rename = "entryId")]
    entry_id: Uuid,
}

#[derive(Deserialize)]
pub struct EntryIdParams {
    #[serde(rename = "entryId")]
    pub entry_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub pagesize: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateTitleBody {
    #[serde(rename = "newTitle")]
    pub new_title: String,
}

/// An entry with its text fields decrypted and the audio path replaced by a
/// freshly signed URL.
#[derive(Serialize)]
pub struct EntryDetails {
    pub title: String,
    pub transcript: String,
    pub ai_summary: String,
    pub tags: Vec<String>,
    pub mood_labels: Vec<String>,
    pub reflections: String,
    pub suggestions: String,
    pub mood_scores: BTreeMap<String, f64>,
    pub goals: String,
    pub status: EntryStatus,
    #[serde(rename = "audioUrl")]
    pub audio_url: String,
    #[serde(rename = "isGoalAdded")]
    pub is_goal_added: bool,
}

#[derive(Serialize)]
pub struct GetEntryResponse {
    pub status: bool,
    #[serde(rename = "entryDetails")]
    pub entry_details: EntryDetails,
}

#[derive(Serialize)]
pub struct ListEntriesResponse {
    pub status: bool,
    pub entries: Vec<EntrySummary>,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a new diary entry from an uploaded audio recording.
///
/// Accepts a multipart/form-data request with an `audio` part. The audio is
/// stored, a `processing` row is inserted, and analysis is dispatched in the
/// background; the response returns as soon as the row exists.
#[utoipa::path(
    post,
    path = "/entries/createEntry",
    request_body(content_type = "multipart/form-data", description = "The audio recording to analyze."),
    responses(
        (status = 200, description = "Entry created, analysis started", body = CreateEntryResponse),
        (status = 400, description = "Bad request (e.g., missing audio part)", body = StatusMessage),
        (status = 500, description = "Internal server error", body = StatusMessage)
    )
)]
pub async fn create_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Rejection> {
    let mut audio: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Failed to read multipart data: {}", e),
        )
    })? {
        if field.name() == Some("audio") {
            let data = field.bytes().await.map_err(|e| {
                fail(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("Failed to read audio bytes: {}", e),
                )
            })?;
            audio = Some(data.to_vec());
            break;
        }
    }
    let Some(audio) = audio else {
        return Err(fail(StatusCode::BAD_REQUEST, "Audio file is required"));
    };

    // Per-user namespaced storage key.
    let audio_path = format!("{}/{}-audio.wav", user_id, Utc::now().timestamp_millis());

    info!("Saving audio to object storage at {audio_path}");
    app_state
        .storage
        .upload(&audio_path, audio)
        .await
        .map_err(|e| {
            error!("Audio upload failed: {e:?}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Storage Error!")
        })?;

    let entry_id = match app_state.db.create_entry(&user_id, &audio_path).await {
        Ok(entry_id) => entry_id,
        Err(e) => {
            error!("Entry insert failed: {e:?}");
            // Rollback: no transaction spans storage and the row, so delete
            // the uploaded object by hand.
            if let Err(e) = app_state.storage.remove(&audio_path).await {
                error!("Rollback of uploaded audio failed: {e:?}");
            }
            return Err(fail(StatusCode::INTERNAL_SERVER_ERROR, "Database Error!"));
        }
    };

    info!("Audio saved and entry {entry_id} created; dispatching analysis");
    // Fire and forget: the response must not wait on the analysis worker.
    tokio::spawn(dispatch_analysis(app_state.clone(), entry_id, user_id));

    Ok(Json(CreateEntryResponse {
        status: true,
        message: "Save success, analyzing".to_string(),
        entry_id,
    }))
}

/// Fetch one entry with decrypted text fields and a signed audio URL.
pub async fn get_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Query(params): Query<EntryIdParams>,
) -> Result<impl IntoResponse, Rejection> {
    let entry = app_state
        .db
        .get_entry(params.entry_id, &user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => fail(StatusCode::NOT_FOUND, "Entry not found"),
            _ => {
                error!("Entry fetch failed: {e:?}");
                fail(StatusCode::INTERNAL_SERVER_ERROR, "Fetch Error!")
            }
        })?;

    let audio_url = if entry.audio_path.is_empty() {
        String::new()
    } else {
        app_state
            .storage
            .signed_url(&entry.audio_path, app_state.config.signed_url_ttl_secs)
            .await
            .map_err(|e| {
                error!("Signed URL generation failed: {e:?}");
                fail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error!")
            })?
    };

    // Decryption failures are isolated per field: a bad field comes back as
    // an empty string rather than aborting the response.
    let decrypt = |field: &Option<String>| {
        field
            .as_deref()
            .map(|c| app_state.cipher.decrypt(c))
            .unwrap_or_default()
    };

    Ok(Json(GetEntryResponse {
        status: true,
        entry_details: EntryDetails {
            title: entry.title,
            transcript: decrypt(&entry.transcript),
            ai_summary: decrypt(&entry.ai_summary),
            tags: entry.tags,
            mood_labels: entry.mood_labels,
            reflections: decrypt(&entry.reflections),
            suggestions: decrypt(&entry.suggestions),
            mood_scores: entry.mood_scores,
            goals: decrypt(&entry.goals),
            status: entry.status,
            audio_url,
            is_goal_added: entry.is_goal_added,
        },
    }))
}

/// List one page of entries, newest first.
pub async fn list_entries_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, Rejection> {
    let page = params.page.unwrap_or(1);
    let page_size = params.pagesize.unwrap_or(5);

    let result = app_state
        .db
        .list_entries(&user_id, page, page_size)
        .await
        .map_err(|e| {
            error!("Entry list fetch failed: {e:?}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Database Fetch Error!")
        })?;

    Ok(Json(ListEntriesResponse {
        status: true,
        entries: result.entries,
        has_next: result.has_next,
    }))
}

/// Rename an entry.
pub async fn update_title_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Query(params): Query<EntryIdParams>,
    Json(body): Json<UpdateTitleBody>,
) -> Result<impl IntoResponse, Rejection> {
    if body.new_title.trim().is_empty() {
        warn!("Title update rejected: empty title");
        return Err(fail(StatusCode::BAD_REQUEST, "Missing data"));
    }

    app_state
        .db
        .update_title(params.entry_id, &user_id, body.new_title.trim())
        .await
        .map_err(|e| {
            error!("Title update failed: {e:?}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Update failed")
        })?;

    info!("Updated title for entry {}", params.entry_id);
    Ok(Json(StatusMessage {
        status: true,
        message: "Title updated".to_string(),
    }))
}

/// Re-trigger analysis for an entry's still-missing fields.
///
/// Publishes an optimistic `processing` transition to any watcher, then
/// dispatches in the background; dispatch failure is only observable via the
/// eventual webhook (or not at all).
pub async fn reanalyze_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Query(params): Query<EntryIdParams>,
) -> Result<impl IntoResponse, Rejection> {
    // Ownership check before anything is published: only the entry's owner
    // may push events into its room.
    app_state
        .db
        .get_entry(params.entry_id, &user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => fail(StatusCode::NOT_FOUND, "Entry not found"),
            _ => {
                error!("Entry fetch failed: {e:?}");
                fail(StatusCode::INTERNAL_SERVER_ERROR, "Fetch Error!")
            }
        })?;

    app_state.publisher.publish(
        params.entry_id,
        EntryUpdate::status_only(EntryStatus::Processing),
    );
    tokio::spawn(dispatch_analysis(
        app_state.clone(),
        params.entry_id,
        user_id,
    ));

    Ok(Json(StatusMessage {
        status: true,
        message: "Re-analysis started".to_string(),
    }))
}

/// Delete an entry. The stored audio object is removed by a storage-side
/// trigger on the row delete, not orchestrated here.
pub async fn delete_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Query(params): Query<EntryIdParams>,
) -> Result<impl IntoResponse, Rejection> {
    let deleted = app_state
        .db
        .delete_entry(params.entry_id, &user_id)
        .await
        .map_err(|e| {
            error!("Entry delete failed: {e:?}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete entry")
        })?;

    if deleted == 0 {
        return Err(fail(StatusCode::NOT_FOUND, "Entry not found"));
    }

    Ok(Json(StatusMessage {
        status: true,
        message: "Entry and audio deleted successfully".to_string(),
    }))
}
