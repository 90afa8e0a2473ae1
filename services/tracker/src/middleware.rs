//! Editor capability check for admin endpoints
//!
//! Project mutations (create, client-link edits, redirect edits) require
//! the editor capability. The check is a plain bearer-token comparison
//! against the configured token; when no token is configured the
//! deployment has no editors and every admin request is refused.

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{error::TrackerError, state::AppState};

/// Whether the request carries the editor credential.
pub fn is_editor<B>(req: &Request<B>, expected_token: Option<&str>) -> bool {
    let Some(expected) = expected_token else {
        return false;
    };

    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

/// Middleware guarding the admin routes.
pub async fn editor_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, TrackerError> {
    if !is_editor(&req, state.config.editor_token.as_deref()) {
        return Err(TrackerError::Unauthorized);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn request(auth: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/projects");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn matching_bearer_token_is_editor() {
        assert!(is_editor(&request(Some("Bearer s3cret")), Some("s3cret")));
    }

    #[test]
    fn wrong_or_missing_token_is_not_editor() {
        assert!(!is_editor(&request(Some("Bearer nope")), Some("s3cret")));
        assert!(!is_editor(&request(Some("s3cret")), Some("s3cret")));
        assert!(!is_editor(&request(None), Some("s3cret")));
    }

    #[test]
    fn no_configured_token_means_no_editors() {
        assert!(!is_editor(&request(Some("Bearer s3cret")), None));
    }
}
