//! Project model and admin request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{Mode, OutcomeKind};

/// Project lifecycle status. Entry links only resolve while `Live`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Live,
    Pending,
    Paused,
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(ProjectStatus::Live),
            "pending" => Some(ProjectStatus::Pending),
            "paused" => Some(ProjectStatus::Paused),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Live => "live",
            ProjectStatus::Pending => "pending",
            ProjectStatus::Paused => "paused",
        }
    }
}

/// Project entity
///
/// Carries three identifiers with different lifetimes: the sequence
/// number (human-facing, monotonic), the project UID (stable, tags
/// sessions for their whole life) and the link UID (respondent-visible
/// routing key, rotated whenever the client survey links are edited so
/// previously distributed entry links stop resolving).
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub project_number: i64,
    pub project_uid: String,
    pub project_link_uid: String,
    pub project_name: String,
    pub status: ProjectStatus,
    pub client_live_link: Option<String>,
    pub client_test_link: Option<String>,
    pub redirect_complete_url: String,
    pub redirect_terminate_url: String,
    pub redirect_quotafull_url: String,
    pub redirect_securityterminate_url: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// The client survey link for a mode, when one has been configured.
    pub fn client_link(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Live => self.client_live_link.as_deref(),
            Mode::Test => self.client_test_link.as_deref(),
        }
    }

    /// The stored redirect template for an outcome.
    pub fn redirect_template(&self, outcome: OutcomeKind) -> &str {
        match outcome {
            OutcomeKind::Complete => &self.redirect_complete_url,
            OutcomeKind::Terminate => &self.redirect_terminate_url,
            OutcomeKind::QuotaFull => &self.redirect_quotafull_url,
            OutcomeKind::SecurityTerminate => &self.redirect_securityterminate_url,
        }
    }
}

/// Request to create a project
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub project_name: String,
    /// Defaults to `pending`; going live is a deliberate second step.
    pub status: Option<ProjectStatus>,
}

/// Request to update the client survey links.
///
/// Saving this rotates the project link UID, which permanently
/// invalidates every previously distributed entry link.
#[derive(Debug, Deserialize)]
pub struct UpdateLinksRequest {
    pub client_live_link: Option<String>,
    pub client_test_link: Option<String>,
}

/// Request to update the per-outcome redirect templates. Each value is
/// normalized onto this host before it is stored.
#[derive(Debug, Deserialize)]
pub struct UpdateRedirectsRequest {
    pub redirect_complete_url: Option<String>,
    pub redirect_terminate_url: Option<String>,
    pub redirect_quotafull_url: Option<String>,
    pub redirect_securityterminate_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_values() {
        assert_eq!(ProjectStatus::parse("live"), Some(ProjectStatus::Live));
        assert_eq!(ProjectStatus::parse("pending"), Some(ProjectStatus::Pending));
        assert_eq!(ProjectStatus::parse("paused"), Some(ProjectStatus::Paused));
        assert_eq!(ProjectStatus::parse("archived"), None);
    }
}
