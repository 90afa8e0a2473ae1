//! Project repository for database operations

use anyhow::{Context, Result, anyhow};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use url::Url;

use common::database::is_unique_violation;

use crate::models::{CreateProjectRequest, OutcomeKind, Project, ProjectStatus};
use crate::redirect;
use crate::token::{GenerationCollision, MAX_GENERATE_ATTEMPTS, short_token};

const PROJECT_COLUMNS: &str = "id, project_number, project_uid, project_link_uid, project_name, \
     status, client_live_link, client_test_link, redirect_complete_url, redirect_terminate_url, \
     redirect_quotafull_url, redirect_securityterminate_url, created_at";

/// Project repository for database operations
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Create a new project repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a project: next sequence number, freshly minted unique
    /// project UID and link UID, and the four redirect templates
    /// defaulted to their normalized fallback form against `base`.
    pub async fn create(&self, payload: &CreateProjectRequest, base: &Url) -> Result<Project> {
        let status = payload.status.unwrap_or(ProjectStatus::Pending);

        let redirects: Vec<String> = OutcomeKind::all()
            .iter()
            .map(|outcome| redirect::normalize(*outcome, "", base))
            .collect();

        // Sequence numbers are monotonic but gap-tolerant; a lost race
        // on the number surfaces as a unique violation and is retried
        // together with the token mint.
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let project_uid = self.unused_uid("project_uid").await?;
            let project_link_uid = self.unused_uid("project_link_uid").await?;

            let row = sqlx::query(&format!(
                r#"
                INSERT INTO projects (
                    project_number, project_uid, project_link_uid, project_name, status,
                    redirect_complete_url, redirect_terminate_url,
                    redirect_quotafull_url, redirect_securityterminate_url
                )
                SELECT COALESCE(MAX(project_number), 100) + 1, $1, $2, $3, $4, $5, $6, $7, $8
                FROM projects
                RETURNING {PROJECT_COLUMNS}
                "#
            ))
            .bind(&project_uid)
            .bind(&project_link_uid)
            .bind(&payload.project_name)
            .bind(status.as_str())
            .bind(&redirects[0])
            .bind(&redirects[1])
            .bind(&redirects[2])
            .bind(&redirects[3])
            .fetch_one(&self.pool)
            .await;

            match row {
                Ok(row) => return project_from_row(&row),
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(GenerationCollision {
            attempts: MAX_GENERATE_ATTEMPTS,
        }
        .into())
    }

    /// Find a project by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    /// Resolve an entry link by its current link UID.
    ///
    /// Link UIDs rotate and are never reused, so a stale link resolves
    /// to nothing permanently rather than to an old project.
    pub async fn find_by_link_uid(&self, link_uid: &str) -> Result<Option<Project>> {
        let row = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE project_link_uid = $1"
        ))
        .bind(link_uid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    /// Store new client survey links and rotate the link UID, implicitly
    /// invalidating every previously distributed entry link.
    pub async fn update_client_links(
        &self,
        id: i64,
        client_live_link: Option<&str>,
        client_test_link: Option<&str>,
    ) -> Result<Option<Project>> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let project_link_uid = self.unused_uid("project_link_uid").await?;

            let row = sqlx::query(&format!(
                r#"
                UPDATE projects
                SET client_live_link = $1, client_test_link = $2, project_link_uid = $3
                WHERE id = $4
                RETURNING {PROJECT_COLUMNS}
                "#
            ))
            .bind(client_live_link)
            .bind(client_test_link)
            .bind(&project_link_uid)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

            match row {
                Ok(row) => return row.as_ref().map(project_from_row).transpose(),
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(GenerationCollision {
            attempts: MAX_GENERATE_ATTEMPTS,
        }
        .into())
    }

    /// Store the four outcome redirect templates. Callers normalize the
    /// values first; this is a plain write.
    pub async fn update_redirects(
        &self,
        id: i64,
        templates: &[String; 4],
    ) -> Result<Option<Project>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE projects
            SET redirect_complete_url = $1, redirect_terminate_url = $2,
                redirect_quotafull_url = $3, redirect_securityterminate_url = $4
            WHERE id = $5
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(&templates[0])
        .bind(&templates[1])
        .bind(&templates[2])
        .bind(&templates[3])
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(project_from_row).transpose()
    }

    /// Mint a short token unused in `column`. The existence check keeps
    /// the hot path collision-free; the unique index catches the
    /// remaining insert race, which callers retry.
    async fn unused_uid(&self, column: &str) -> Result<String> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let candidate = short_token();
            let taken = sqlx::query(&format!(
                "SELECT 1 FROM projects WHERE {column} = $1"
            ))
            .bind(&candidate)
            .fetch_optional(&self.pool)
            .await?;

            if taken.is_none() {
                return Ok(candidate);
            }
        }

        Err(GenerationCollision {
            attempts: MAX_GENERATE_ATTEMPTS,
        }
        .into())
    }
}

pub(crate) fn project_from_row(row: &PgRow) -> Result<Project> {
    let status: String = row.get("status");
    let status = ProjectStatus::parse(&status)
        .ok_or_else(|| anyhow!("unknown project status in store: {status}"))
        .context("reading project row")?;

    Ok(Project {
        id: row.get("id"),
        project_number: row.get("project_number"),
        project_uid: row.get("project_uid"),
        project_link_uid: row.get("project_link_uid"),
        project_name: row.get("project_name"),
        status,
        client_live_link: row.get("client_live_link"),
        client_test_link: row.get("client_test_link"),
        redirect_complete_url: row.get("redirect_complete_url"),
        redirect_terminate_url: row.get("redirect_terminate_url"),
        redirect_quotafull_url: row.get("redirect_quotafull_url"),
        redirect_securityterminate_url: row.get("redirect_securityterminate_url"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::ensure_schema;
    use common::database::{DatabaseConfig, init_pool};

    async fn pool() -> PgPool {
        let config = DatabaseConfig::from_env().expect("database config");
        let pool = init_pool(&config).await.expect("database pool");
        ensure_schema(&pool).await.expect("schema");
        pool
    }

    fn base() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    fn request(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            project_name: name.to_string(),
            status: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn create_assigns_distinct_identifiers_and_default_redirects() {
        let repository = ProjectRepository::new(pool().await);

        let first = repository.create(&request("First"), &base()).await.unwrap();
        let second = repository.create(&request("Second"), &base()).await.unwrap();

        assert!(second.project_number > first.project_number);
        assert_ne!(first.project_uid, second.project_uid);
        assert_ne!(first.project_link_uid, second.project_link_uid);
        assert_ne!(first.project_uid, first.project_link_uid);
        assert_eq!(first.status, ProjectStatus::Pending);

        for outcome in OutcomeKind::all() {
            let template = first.redirect_template(outcome);
            assert!(template.contains(&format!("/redirect/{}", outcome.as_str())));
            assert!(template.contains("mid={MASKED_ID}"));
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn updating_links_rotates_the_link_uid_permanently() {
        let repository = ProjectRepository::new(pool().await);

        let project = repository.create(&request("Rotation"), &base()).await.unwrap();
        let old_link_uid = project.project_link_uid.clone();

        assert!(
            repository
                .find_by_link_uid(&old_link_uid)
                .await
                .unwrap()
                .is_some()
        );

        let updated = repository
            .update_client_links(
                project.id,
                Some("https://surveys.example.com/run?m={MASKED_ID}"),
                None,
            )
            .await
            .unwrap()
            .expect("project exists");

        assert_ne!(updated.project_link_uid, old_link_uid);
        assert_eq!(
            updated.client_live_link.as_deref(),
            Some("https://surveys.example.com/run?m={MASKED_ID}")
        );

        // The old respondent-visible routing key never resolves again.
        assert!(
            repository
                .find_by_link_uid(&old_link_uid)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repository
                .find_by_link_uid(&updated.project_link_uid)
                .await
                .unwrap()
                .is_some()
        );
    }
}
