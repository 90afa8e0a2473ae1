//! Click-session repository: the session lifecycle state machine
//!
//! A session is opened at entry time with a freshly minted masked token
//! and closed exactly once by an outcome callback. The terminal update
//! is guarded on `status = 'pending'` in SQL, so concurrent callbacks
//! for the same token resolve first-write-wins and a session never
//! leaves a terminal state.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use common::database::is_unique_violation;

use crate::models::{ClickSession, Mode, OutcomeKind, Project, SessionStatus};
use crate::token::{GenerationCollision, MAX_GENERATE_ATTEMPTS, visit_token};

const SESSION_COLUMNS: &str = "id, project_id, project_uid, mode, user_id, masked_id, \
     entry_time, entry_ip, entry_country, exit_time, exit_ip, status";

/// Click-session repository for database operations
#[derive(Clone)]
pub struct ClickSessionRepository {
    pool: PgPool,
}

impl ClickSessionRepository {
    /// Create a new click-session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pending session for a respondent visit, minting a fresh
    /// masked token. The unique index on `masked_id` re-checks
    /// uniqueness at insertion time; a collision regenerates the token
    /// up to the attempt cap.
    pub async fn open(
        &self,
        project: &Project,
        mode: Mode,
        user_id: &str,
        entry_ip: &str,
        entry_country: &str,
    ) -> Result<ClickSession> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let masked_id = visit_token();

            let row = sqlx::query(&format!(
                r#"
                INSERT INTO click_sessions (
                    project_id, project_uid, mode, user_id, masked_id,
                    entry_time, entry_ip, entry_country, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
                RETURNING {SESSION_COLUMNS}
                "#
            ))
            .bind(project.id)
            .bind(&project.project_uid)
            .bind(mode.as_str())
            .bind(user_id)
            .bind(&masked_id)
            .bind(Utc::now())
            .bind(entry_ip)
            .bind(entry_country)
            .fetch_one(&self.pool)
            .await;

            match row {
                Ok(row) => return session_from_row(&row),
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(GenerationCollision {
            attempts: MAX_GENERATE_ATTEMPTS,
        }
        .into())
    }

    /// Primary correlation: exact masked-token match.
    pub async fn find_by_masked_id(&self, masked_id: &str) -> Result<Option<ClickSession>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM click_sessions WHERE masked_id = $1"
        ))
        .bind(masked_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    /// Fallback correlation for providers that strip query parameters:
    /// the most recently opened pending session for this project UID and
    /// external user id. Lower-confidence by construction; it cannot
    /// disambiguate two concurrent pending sessions for the same user.
    pub async fn find_latest_pending(
        &self,
        project_uid: &str,
        user_id: &str,
    ) -> Result<Option<ClickSession>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM click_sessions
            WHERE project_uid = $1 AND user_id = $2 AND status = 'pending'
            ORDER BY entry_time DESC
            LIMIT 1
            "#
        ))
        .bind(project_uid)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    /// Apply the terminal transition. Returns false when the session was
    /// no longer pending, in which case nothing was written; callers
    /// surface that as a conflict rather than re-stamping the exit.
    pub async fn close(&self, id: i64, outcome: OutcomeKind, exit_ip: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE click_sessions
            SET status = $1, exit_time = $2, exit_ip = $3
            WHERE id = $4 AND status = 'pending'
            "#,
        )
        .bind(outcome.as_str())
        .bind(Utc::now())
        .bind(exit_ip)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recent sessions for a project, newest first.
    pub async fn list_for_project(&self, project_id: i64, limit: i64) -> Result<Vec<ClickSession>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM click_sessions
            WHERE project_id = $1
            ORDER BY entry_time DESC
            LIMIT $2
            "#
        ))
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(session_from_row).collect()
    }
}

pub(crate) fn session_from_row(row: &PgRow) -> Result<ClickSession> {
    let mode: String = row.get("mode");
    let mode = Mode::parse(&mode)
        .ok_or_else(|| anyhow!("unknown session mode in store: {mode}"))
        .context("reading click-session row")?;

    let status: String = row.get("status");
    let status = SessionStatus::parse(&status)
        .ok_or_else(|| anyhow!("unknown session status in store: {status}"))
        .context("reading click-session row")?;

    Ok(ClickSession {
        id: row.get("id"),
        project_id: row.get("project_id"),
        project_uid: row.get("project_uid"),
        mode,
        user_id: row.get("user_id"),
        masked_id: row.get("masked_id"),
        entry_time: row.get("entry_time"),
        entry_ip: row.get("entry_ip"),
        entry_country: row.get("entry_country"),
        exit_time: row.get("exit_time"),
        exit_ip: row.get("exit_ip"),
        status,
    })
}
