//! services/api/src/web/goals.rs
//!
//! Handlers for the goal CRUD endpoints. A goal can be free-standing or
//! promoted out of an entry's analysis; promotion flips the entry's
//! `is_goal_added` flag so the client stops offering the prompt.

use crate::web::middleware::AuthedUser;
use crate::web::rest::{fail, Rejection, StatusMessage};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{NaiveDate, Utc};
use journal_core::domain::{Goal, GoalUpdate, NewGoal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct AddGoalBody {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "targetDate")]
    pub target_date: NaiveDate,
    /// Present when the goal is being promoted out of an entry's analysis.
    #[serde(rename = "entryId")]
    pub entry_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateGoalBody {
    #[serde(rename = "goalId")]
    pub goal_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "targetDate")]
    pub target_date: NaiveDate,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

#[derive(Deserialize)]
pub struct GoalIdParams {
    #[serde(rename = "goalId")]
    pub goal_id: Uuid,
}

#[derive(Serialize)]
pub struct GoalListResponse {
    pub status: bool,
    pub message: String,
    #[serde(rename = "goalEntries")]
    pub goal_entries: Vec<Goal>,
}

/// Add a new goal, optionally promoting it from an entry.
pub async fn add_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Json(body): Json<AddGoalBody>,
) -> Result<impl IntoResponse, Rejection> {
    if body.title.trim().is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Title is required"));
    }
    if body.target_date < Utc::now().date_naive() {
        warn!("Goal rejected: target date {} is in the past", body.target_date);
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "The target date cannot be in the past",
        ));
    }

    let new_goal = NewGoal {
        user_id: user_id.clone(),
        title: body.title.trim().to_string(),
        description: body.description,
        target_date: body.target_date,
        entry_id: body.entry_id,
    };
    let goal = app_state.db.create_goal(new_goal).await.map_err(|e| {
        error!("Goal insert failed: {e:?}");
        fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add goal")
    })?;

    // Promotion is best effort: the goal exists even if the flag write fails.
    if let Some(entry_id) = body.entry_id {
        if let Err(e) = app_state.db.mark_goal_promoted(entry_id, &user_id).await {
            error!("Could not mark entry {entry_id} as goal-promoted: {e:?}");
        }
    }

    info!("Goal {} added for user {user_id}", goal.id);
    Ok((
        StatusCode::CREATED,
        Json(StatusMessage {
            status: true,
            message: "Goal has been added successfully!".to_string(),
        }),
    ))
}

/// List all goals for the authenticated user, newest first.
pub async fn get_goals_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
) -> Result<impl IntoResponse, Rejection> {
    let goals = app_state.db.list_goals(&user_id).await.map_err(|e| {
        error!("Goal list fetch failed: {e:?}");
        fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch goals")
    })?;

    Ok(Json(GoalListResponse {
        status: true,
        message: "Goals fetched successfully".to_string(),
        goal_entries: goals,
    }))
}

/// Update a goal's mutable fields.
pub async fn update_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Json(body): Json<UpdateGoalBody>,
) -> Result<impl IntoResponse, Rejection> {
    if body.title.trim().is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Title is required"));
    }
    // Completing a goal is always allowed, even when its date has passed.
    if !body.is_completed && body.target_date < Utc::now().date_naive() {
        return Err(fail(
            StatusCode::BAD_REQUEST,
            "The target date cannot be in the past",
        ));
    }

    let update = GoalUpdate {
        title: body.title.trim().to_string(),
        description: body.description,
        target_date: body.target_date,
        is_completed: body.is_completed,
    };
    app_state
        .db
        .update_goal(body.goal_id, &user_id, update)
        .await
        .map_err(|e| {
            error!("Goal update failed: {e:?}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update goal")
        })?;

    Ok(Json(StatusMessage {
        status: true,
        message: "Goal updated successfully".to_string(),
    }))
}

/// Delete a goal.
pub async fn delete_goal_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(AuthedUser(user_id)): Extension<AuthedUser>,
    Query(params): Query<GoalIdParams>,
) -> Result<impl IntoResponse, Rejection> {
    app_state
        .db
        .delete_goal(params.goal_id, &user_id)
        .await
        .map_err(|e| {
            error!("Goal delete failed: {e:?}");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete goal")
        })?;

    Ok(Json(StatusMessage {
        status: true,
        message: "Goal deleted successfully".to_string(),
    }))
}
