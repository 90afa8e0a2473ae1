//! Repositories for database operations

use anyhow::Result;
use sqlx::PgPool;

pub mod project;
pub mod session;

pub use project::ProjectRepository;
pub use session::ClickSessionRepository;

/// Ensure the tracker schema exists.
///
/// Runs at startup, mirroring the service's migrate-at-boot behavior.
/// The unique indexes are what make the collision-retry loops in the
/// repositories safe under concurrent inserts: generation is re-checked
/// at the moment of insertion, not only at generation time.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id BIGSERIAL PRIMARY KEY,
            project_number BIGINT NOT NULL UNIQUE,
            project_uid TEXT NOT NULL UNIQUE,
            project_link_uid TEXT NOT NULL UNIQUE,
            project_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            client_live_link TEXT,
            client_test_link TEXT,
            redirect_complete_url TEXT NOT NULL,
            redirect_terminate_url TEXT NOT NULL,
            redirect_quotafull_url TEXT NOT NULL,
            redirect_securityterminate_url TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS click_sessions (
            id BIGSERIAL PRIMARY KEY,
            project_id BIGINT NOT NULL REFERENCES projects(id),
            project_uid TEXT NOT NULL,
            mode TEXT NOT NULL,
            user_id TEXT NOT NULL,
            masked_id TEXT NOT NULL UNIQUE,
            entry_time TIMESTAMPTZ NOT NULL,
            entry_ip TEXT NOT NULL,
            entry_country TEXT NOT NULL,
            exit_time TIMESTAMPTZ,
            exit_ip TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Serves the fallback correlation path (no mid in the callback).
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_click_sessions_fallback
        ON click_sessions (project_uid, user_id, status, entry_time DESC)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
