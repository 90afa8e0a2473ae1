//! Tracker service models

pub mod project;
pub mod session;

// Re-export for convenience
pub use project::{
    CreateProjectRequest, Project, ProjectStatus, UpdateLinksRequest, UpdateRedirectsRequest,
};
pub use session::{ClickSession, Mode, OutcomeKind, SessionResponse, SessionStatus};
