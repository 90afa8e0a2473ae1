//! Application state shared across handlers

use sqlx::PgPool;

use crate::{
    config::TrackerConfig,
    repositories::{ClickSessionRepository, ProjectRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: TrackerConfig,
    pub project_repository: ProjectRepository,
    pub session_repository: ClickSessionRepository,
}
