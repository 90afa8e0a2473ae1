//! Service configuration from environment variables

use std::env;

use anyhow::{Context, Result};
use url::Url;

/// Tracker service configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Public base URL of this deployment; redirect templates and entry
    /// links are built against it
    pub public_base_url: Url,
    /// Bearer token granting the editor capability on admin endpoints.
    /// When unset, every admin mutation is refused.
    pub editor_token: Option<String>,
}

impl TrackerConfig {
    /// Create a new TrackerConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let public_base_url = Url::parse(&public_base_url)
            .with_context(|| format!("invalid PUBLIC_BASE_URL: {public_base_url}"))?;

        let editor_token = env::var("EDITOR_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            bind_addr,
            public_base_url,
            editor_token,
        })
    }
}
