//! Click-session model: one row per respondent visit
//!
//! A session is created when a respondent follows an entry link and is
//! mutated exactly once when the survey provider reports a terminal
//! outcome through a redirect callback. Rows are never deleted; the
//! table is an append-only audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which of the project's client survey links a visit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Test,
}

impl Mode {
    /// Parse the path segment of an entry link. Anything other than the
    /// two exact values is a caller input error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(Mode::Live),
            "test" => Some(Mode::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Live => "live",
            Mode::Test => "test",
        }
    }
}

/// Terminal classification of a respondent's survey attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "terminate")]
    Terminate,
    #[serde(rename = "quotafull")]
    QuotaFull,
    #[serde(rename = "securityTerminate")]
    SecurityTerminate,
}

impl OutcomeKind {
    /// Parse a callback path segment. Matching is exact; the callback is
    /// rejected before any session lookup when this fails.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "complete" => Some(OutcomeKind::Complete),
            "terminate" => Some(OutcomeKind::Terminate),
            "quotafull" => Some(OutcomeKind::QuotaFull),
            "securityTerminate" => Some(OutcomeKind::SecurityTerminate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Complete => "complete",
            OutcomeKind::Terminate => "terminate",
            OutcomeKind::QuotaFull => "quotafull",
            OutcomeKind::SecurityTerminate => "securityTerminate",
        }
    }

    pub fn all() -> [OutcomeKind; 4] {
        [
            OutcomeKind::Complete,
            OutcomeKind::Terminate,
            OutcomeKind::QuotaFull,
            OutcomeKind::SecurityTerminate,
        ]
    }
}

/// Session lifecycle status: `Pending` from entry until the provider
/// reports an outcome, then exactly one terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Closed(OutcomeKind),
}

impl Serialize for SessionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl SessionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        if s == "pending" {
            return Some(SessionStatus::Pending);
        }
        OutcomeKind::parse(s).map(SessionStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Closed(outcome) => outcome.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Closed(_))
    }
}

/// Click-session entity
#[derive(Debug, Clone, Serialize)]
pub struct ClickSession {
    pub id: i64,
    pub project_id: i64,
    /// Denormalized from the project so fallback correlation survives
    /// link-UID rotation.
    pub project_uid: String,
    pub mode: Mode,
    /// Provider-controlled identifier; never forwarded to the survey.
    pub user_id: String,
    /// The only identifier ever exposed externally.
    pub masked_id: String,
    pub entry_time: DateTime<Utc>,
    pub entry_ip: String,
    pub entry_country: String,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_ip: Option<String>,
    pub status: SessionStatus,
}

/// Click session as returned by the admin listing, with the time spent
/// in the survey formatted as hh:mm:ss when the session is closed.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: ClickSession,
    pub total_time: Option<String>,
}

impl From<ClickSession> for SessionResponse {
    fn from(session: ClickSession) -> Self {
        let total_time = session
            .exit_time
            .map(|exit| exit - session.entry_time)
            .filter(|elapsed| elapsed.num_seconds() >= 0)
            .map(|elapsed| {
                let secs = elapsed.num_seconds();
                format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
            });
        SessionResponse {
            session,
            total_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mode_parses_exactly_two_values() {
        assert_eq!(Mode::parse("live"), Some(Mode::Live));
        assert_eq!(Mode::parse("test"), Some(Mode::Test));
        assert_eq!(Mode::parse("Live"), None);
        assert_eq!(Mode::parse(""), None);
    }

    #[test]
    fn outcome_parse_is_exact() {
        assert_eq!(OutcomeKind::parse("complete"), Some(OutcomeKind::Complete));
        assert_eq!(
            OutcomeKind::parse("securityTerminate"),
            Some(OutcomeKind::SecurityTerminate)
        );
        // wrong casing is rejected, not coerced
        assert_eq!(OutcomeKind::parse("securityterminate"), None);
        assert_eq!(OutcomeKind::parse("done"), None);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for outcome in OutcomeKind::all() {
            let status = SessionStatus::Closed(outcome);
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
            assert!(status.is_terminal());
        }
        assert_eq!(SessionStatus::parse("pending"), Some(SessionStatus::Pending));
        assert!(!SessionStatus::Pending.is_terminal());
    }

    #[test]
    fn total_time_is_formatted_for_closed_sessions() {
        let entry = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let session = ClickSession {
            id: 1,
            project_id: 1,
            project_uid: "AAAA1111".to_string(),
            mode: Mode::Live,
            user_id: "u1".to_string(),
            masked_id: "m".to_string(),
            entry_time: entry,
            entry_ip: "127.0.0.1".to_string(),
            entry_country: "Unknown".to_string(),
            exit_time: Some(entry + chrono::Duration::seconds(3725)),
            exit_ip: Some("127.0.0.1".to_string()),
            status: SessionStatus::Closed(OutcomeKind::Complete),
        };
        let response = SessionResponse::from(session);
        assert_eq!(response.total_time.as_deref(), Some("01:02:05"));
    }

    #[test]
    fn total_time_is_absent_while_pending() {
        let entry = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let session = ClickSession {
            id: 1,
            project_id: 1,
            project_uid: "AAAA1111".to_string(),
            mode: Mode::Test,
            user_id: "u1".to_string(),
            masked_id: "m".to_string(),
            entry_time: entry,
            entry_ip: "127.0.0.1".to_string(),
            entry_country: "Unknown".to_string(),
            exit_time: None,
            exit_ip: None,
            status: SessionStatus::Pending,
        };
        let response = SessionResponse::from(session);
        assert_eq!(response.total_time, None);
    }
}
