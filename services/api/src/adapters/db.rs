//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use journal_core::analysis::StagedUpdate;
use journal_core::domain::{
    Entry, EntryStatus, EntrySummary, Goal, GoalUpdate, MoodInsights, NewGoal,
};
use journal_core::ports::{DatabaseService, EntryPage, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Look-ahead pagination: callers fetch `page_size + 1` rows; the extra row
/// only signals that another page exists and is never returned.
fn split_page<T>(mut rows: Vec<T>, page_size: usize) -> (Vec<T>, bool) {
    let has_next = rows.len() > page_size;
    rows.truncate(page_size);
    (rows, has_next)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct EntryRecord {
    entry_id: Uuid,
    user_id: String,
    title: String,
    audio_path: String,
    transcript: Option<String>,
    ai_summary: Option<String>,
    reflections: Option<String>,
    suggestions: Option<String>,
    goals: Option<String>,
    tags: Option<Vec<String>>,
    mood_scores: Option<Json<BTreeMap<String, f64>>>,
    mood_labels: Option<Vec<String>>,
    status: String,
    is_goal_added: bool,
    created_at: DateTime<Utc>,
}

impl EntryRecord {
    fn to_domain(self) -> PortResult<Entry> {
        let status = self
            .status
            .parse::<EntryStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Entry {
            id: self.entry_id,
            user_id: self.user_id,
            title: self.title,
            audio_path: self.audio_path,
            transcript: self.transcript,
            ai_summary: self.ai_summary,
            reflections: self.reflections,
            suggestions: self.suggestions,
            goals: self.goals,
            tags: self.tags.unwrap_or_default(),
            mood_scores: self.mood_scores.map(|j| j.0).unwrap_or_default(),
            mood_labels: self.mood_labels.unwrap_or_default(),
            status,
            is_goal_added: self.is_goal_added,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct EntrySummaryRecord {
    entry_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
}

impl EntrySummaryRecord {
    fn to_domain(self) -> EntrySummary {
        EntrySummary {
            id: self.entry_id,
            title: self.title,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct GoalRecord {
    goal_id: Uuid,
    user_id: String,
    title: String,
    description: Option<String>,
    target_date: NaiveDate,
    is_completed: bool,
    entry_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl GoalRecord {
    fn to_domain(self) -> Goal {
        Goal {
            id: self.goal_id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            target_date: self.target_date,
            is_completed: self.is_completed,
            entry_id: self.entry_id,
            created_at: self.created_at,
        }
    }
}

const ENTRY_COLUMNS: &str = "entry_id, user_id, title, audio_path, transcript, ai_summary, \
     reflections, suggestions, goals, tags, mood_scores, mood_labels, status, is_goal_added, \
     created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_entry(&self, user_id: &str, audio_path: &str) -> PortResult<Uuid> {
        let entry_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO entries (entry_id, user_id, audio_path, title, status) \
             VALUES ($1, $2, $3, 'Untitled', 'processing')",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(audio_path)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(entry_id)
    }

    async fn get_entry(&self, entry_id: Uuid, user_id: &str) -> PortResult<Entry> {
        let record = sqlx::query_as::<_, EntryRecord>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = $1 AND user_id = $2"
        ))
        .bind(entry_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Entry {} not found", entry_id))
            }
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn list_entries(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
    ) -> PortResult<EntryPage> {
        let page = page.max(1) as i64;
        let page_size = page_size.max(1) as i64;

        // Fetch one extra row to learn whether another page exists.
        let records = sqlx::query_as::<_, EntrySummaryRecord>(
            "SELECT entry_id, title, created_at FROM entries \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page_size + 1)
        .bind((page - 1) * page_size)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let (records, has_next) = split_page(records, page_size as usize);

        Ok(EntryPage {
            entries: records.into_iter().map(|r| r.to_domain()).collect(),
            has_next,
        })
    }

    async fn update_title(
        &self,
        entry_id: Uuid,
        user_id: &str,
        new_title: &str,
    ) -> PortResult<()> {
        sqlx::query("UPDATE entries SET title = $1 WHERE entry_id = $2 AND user_id = $3")
            .bind(new_title)
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn set_entry_status(
        &self,
        entry_id: Uuid,
        user_id: &str,
        status: EntryStatus,
    ) -> PortResult<()> {
        sqlx::query("UPDATE entries SET status = $1 WHERE entry_id = $2 AND user_id = $3")
            .bind(status.as_str())
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn apply_analysis(
        &self,
        entry_id: Uuid,
        user_id: &str,
        staged: &StagedUpdate,
    ) -> PortResult<u64> {
        // COALESCE keeps the stored value wherever nothing was staged, so a
        // single static statement covers every gap combination.
        let result = sqlx::query(
            "UPDATE entries SET \
                transcript    = COALESCE($3, transcript), \
                ai_summary    = COALESCE($4, ai_summary), \
                tags          = COALESCE($5, tags), \
                mood_scores   = COALESCE($6, mood_scores), \
                mood_labels   = COALESCE($7, mood_labels), \
                reflections   = COALESCE($8, reflections), \
                suggestions   = COALESCE($9, suggestions), \
                goals         = COALESCE($10, goals), \
                is_goal_added = COALESCE($11, is_goal_added), \
                status        = $12 \
             WHERE entry_id = $1 AND user_id = $2",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(staged.transcript.as_deref())
        .bind(staged.ai_summary.as_deref())
        .bind(staged.tags.as_deref())
        .bind(staged.mood_scores.as_ref().map(Json))
        .bind(staged.mood_labels.as_deref())
        .bind(staged.reflections.as_deref())
        .bind(staged.suggestions.as_deref())
        .bind(staged.goals.as_deref())
        .bind(if staged.reset_goal_added {
            Some(false)
        } else {
            None
        })
        .bind(staged.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn delete_entry(&self, entry_id: Uuid, user_id: &str) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM entries WHERE entry_id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn create_goal(&self, goal: NewGoal) -> PortResult<Goal> {
        let record = sqlx::query_as::<_, GoalRecord>(
            "INSERT INTO goals (goal_id, user_id, title, description, target_date, entry_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING goal_id, user_id, title, description, target_date, is_completed, \
                       entry_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&goal.user_id)
        .bind(&goal.title)
        .bind(goal.description.as_deref())
        .bind(goal.target_date)
        .bind(goal.entry_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_goals(&self, user_id: &str) -> PortResult<Vec<Goal>> {
        let records = sqlx::query_as::<_, GoalRecord>(
            "SELECT goal_id, user_id, title, description, target_date, is_completed, \
                    entry_id, created_at \
             FROM goals WHERE user_id = $1 ORDER BY target_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_goal(
        &self,
        goal_id: Uuid,
        user_id: &str,
        update: GoalUpdate,
    ) -> PortResult<()> {
        sqlx::query(
            "UPDATE goals SET title = $1, description = $2, target_date = $3, \
             is_completed = $4 WHERE goal_id = $5 AND user_id = $6",
        )
        .bind(&update.title)
        .bind(update.description.as_deref())
        .bind(update.target_date)
        .bind(update.is_completed)
        .bind(goal_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_goal(&self, goal_id: Uuid, user_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM goals WHERE goal_id = $1 AND user_id = $2")
            .bind(goal_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_goal_promoted(&self, entry_id: Uuid, user_id: &str) -> PortResult<()> {
        sqlx::query(
            "UPDATE entries SET is_goal_added = TRUE WHERE entry_id = $1 AND user_id = $2",
        )
        .bind(entry_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn mood_insights(&self, user_id: &str) -> PortResult<MoodInsights> {
        let averages = sqlx::query_as::<_, (String, f64)>(
            "SELECT mood.key AS mood, AVG((mood.value)::float8) AS avg_score \
             FROM entries, jsonb_each_text(mood_scores) AS mood \
             WHERE user_id = $1 AND created_at >= NOW() - INTERVAL '30 days' \
             GROUP BY mood.key",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let entries_last_week = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM entries \
             WHERE user_id = $1 AND created_at >= NOW() - INTERVAL '7 days'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(MoodInsights {
            average_mood_scores: averages.into_iter().collect(),
            entries_last_week,
        })
    }
}
