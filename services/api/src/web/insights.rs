//! services/api/src/web/insights.rs
//!
//! Handler for the mood-insights endpoint: per-user aggregates computed by
//! the database over the recent entry history.

use crate::web::middleware::AuthedUser;
use crate::web::rest::{fail, Rejection};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use journal_core::domain::MoodInsights;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

#[derive(Serialize)]
pub struct InsightsResponse {
    pub status: bool,
    pub insights: MoodInsights,
}

pub async fn get_insights_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
) -> Result<impl IntoResponse, Rejection> {
    let insights = app_state.db.mood_insights(&user_id).await.map_err(|e| {
        error!("Mood insight query failed: {e:?}");
        fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch insights")
    })?;

    Ok(Json(InsightsResponse {
        status: true,
        insights,
    }))
}
