use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod geo;
mod middleware;
mod models;
mod redirect;
mod repositories;
mod routes;
mod state;
mod template;
mod token;
mod views;

use std::net::SocketAddr;

use common::database::{DatabaseConfig, init_pool};
use tokio::net::TcpListener;

use crate::{
    config::TrackerConfig,
    repositories::{ClickSessionRepository, ProjectRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting tracker service");

    let config = TrackerConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Ensure the tracker schema before taking traffic
    repositories::ensure_schema(&pool).await?;

    info!("Tracker service initialized successfully");

    // Initialize repositories
    let project_repository = ProjectRepository::new(pool.clone());
    let session_repository = ClickSessionRepository::new(pool.clone());

    let app_state = AppState {
        db_pool: pool,
        config: config.clone(),
        project_repository,
        session_repository,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Tracker service listening on {}", config.bind_addr);

    // ConnectInfo gives handlers the peer address for entry/exit IPs
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
