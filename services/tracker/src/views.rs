//! Minimal respondent-facing HTML pages
//!
//! The service is an API first; these two pages exist because a
//! respondent's browser is the caller on the entry and redirect
//! endpoints and deserves something readable.

use axum::response::Html;

use crate::models::{Mode, OutcomeKind, Project};

/// Shown at entry when no client survey link is configured for the
/// requested mode. Exposes the assigned masked token so the visit can
/// still be exercised end to end.
pub fn entry_diagnostic(
    project: &Project,
    mode: Mode,
    user_id: &str,
    masked_id: &str,
) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>Entry recorded</title></head><body>\
         <h1>Entry recorded</h1>\
         <p>No {mode} survey link is configured for project {number} ({name}).</p>\
         <p>The visit was recorded with masked id <code>{masked}</code>.</p>\
         <p>Respondent id <code>{user}</code> stays internal and is never \
         forwarded to the survey.</p>\
         </body></html>",
        mode = mode.as_str(),
        number = project.project_number,
        name = escape(&project.project_name),
        masked = escape(masked_id),
        user = escape(user_id),
    ))
}

/// Shown to the respondent after an outcome callback was applied.
pub fn outcome_confirmation(outcome: OutcomeKind, masked_id: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>Survey finished</title></head><body>\
         <h1>Thank you</h1>\
         <p>Your survey attempt was recorded as <strong>{outcome}</strong>.</p>\
         <p>Reference: <code>{masked}</code></p>\
         </body></html>",
        outcome = outcome.as_str(),
        masked = escape(masked_id),
    ))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape("<script>\"&\""), "&lt;script&gt;&quot;&amp;&quot;");
    }
}
