//! Tracker service routes
//!
//! Two public endpoints carry the whole respondent protocol: `/entry`
//! opens a pending session and forwards to the client survey, and
//! `/redirect` receives the provider's outcome callback and closes it.
//! Everything under the admin group requires the editor capability.

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tracing::{error, info};

use crate::{
    error::TrackerError,
    geo,
    middleware::editor_middleware,
    models::{
        CreateProjectRequest, Mode, OutcomeKind, Project, ProjectStatus, SessionResponse,
        UpdateLinksRequest, UpdateRedirectsRequest,
    },
    redirect,
    state::AppState,
    template::{Bindings, append_param, substitute},
    views,
};

/// Create the router for the tracker service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/projects", post(create_project))
        .route("/projects/:id", get(get_project))
        .route("/projects/:id/links", put(update_links))
        .route("/projects/:id/redirects", put(update_redirects))
        .route("/projects/:id/sessions", get(list_sessions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            editor_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/entry/:project_link_uid/:mode", get(entry))
        .route("/redirect/:outcome", get(redirect_callback))
        .merge(admin_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "tracker-service"
    }))
}

#[derive(Deserialize)]
pub struct EntryQuery {
    /// External respondent id assigned by the survey provider
    pub id: Option<String>,
}

/// Entry endpoint: resolve the link, gate on live status, open a
/// pending session and forward the respondent to the client survey.
pub async fn entry(
    State(state): State<AppState>,
    Path((project_link_uid, mode)): Path<(String, String)>,
    Query(query): Query<EntryQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, TrackerError> {
    let mode = Mode::parse(&mode)
        .ok_or_else(|| TrackerError::BadRequest("Invalid mode".to_string()))?;

    let user_id = query.id.as_deref().unwrap_or("").trim().to_string();
    if user_id.is_empty() {
        return Err(TrackerError::BadRequest("Missing id (user id)".to_string()));
    }

    let project = state
        .project_repository
        .find_by_link_uid(&project_link_uid)
        .await
        .map_err(|e| {
            error!("Failed to resolve entry link: {}", e);
            TrackerError::InternalServerError
        })?
        .ok_or_else(|| TrackerError::NotFound("Project not found".to_string()))?;

    // The business gate: valid links still refuse entry until an
    // administrator sets the project live.
    ensure_live(&project)?;

    let entry_ip = geo::client_ip(&headers, peer);
    let entry_country = geo::client_country(&headers);

    let session = state
        .session_repository
        .open(&project, mode, &user_id, &entry_ip, &entry_country)
        .await
        .map_err(|e| {
            error!("Failed to open click session: {}", e);
            TrackerError::InternalServerError
        })?;

    info!(
        "Opened session {} for project {} ({})",
        session.masked_id,
        project.project_number,
        mode.as_str()
    );

    let Some(link) = project.client_link(mode) else {
        // No destination configured: surface the masked token instead
        // of failing, so the flow can be exercised before links exist.
        return Ok(
            views::entry_diagnostic(&project, mode, &user_id, &session.masked_id).into_response(),
        );
    };

    // The external user id is deliberately not forwarded; providers see
    // the masked token only.
    let dest = substitute(
        link,
        &Bindings {
            user_id: None,
            masked_id: Some(&session.masked_id),
            project_uid: Some(&project.project_uid),
        },
    );
    let dest = append_param(&dest, "mid", &session.masked_id);

    Ok((StatusCode::FOUND, [(header::LOCATION, dest)]).into_response())
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    /// Masked token, the exact correlation key
    pub mid: Option<String>,
    /// Project UID, used with `id` for fallback correlation
    pub project: Option<String>,
    /// External respondent id, used with `project` for fallback correlation
    pub id: Option<String>,
}

/// Redirect callback: the survey provider reports a terminal outcome.
///
/// Correlation prefers the masked token; the (project, id) fallback
/// exists for providers that strip query parameters and picks the most
/// recent pending session, which cannot disambiguate concurrent visits
/// by the same respondent. Sessions close exactly once; a repeated
/// callback is rejected with a conflict.
pub async fn redirect_callback(
    State(state): State<AppState>,
    Path(outcome): Path<String>,
    Query(query): Query<CallbackQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, TrackerError> {
    let outcome = OutcomeKind::parse(&outcome)
        .ok_or_else(|| TrackerError::BadRequest("Invalid outcome kind".to_string()))?;

    let mid = query.mid.as_deref().unwrap_or("").trim().to_string();
    let project_uid = query.project.as_deref().unwrap_or("").trim().to_string();
    let user_id = query.id.as_deref().unwrap_or("").trim().to_string();

    let session = if !mid.is_empty() {
        state.session_repository.find_by_masked_id(&mid).await
    } else if !project_uid.is_empty() && !user_id.is_empty() {
        state
            .session_repository
            .find_latest_pending(&project_uid, &user_id)
            .await
    } else {
        Ok(None)
    }
    .map_err(|e| {
        error!("Failed to correlate callback: {}", e);
        TrackerError::InternalServerError
    })?
    .ok_or_else(|| {
        TrackerError::NotFound(
            "Session not found. Pass the mid parameter for exact matching.".to_string(),
        )
    })?;

    if session.status.is_terminal() {
        return Err(TrackerError::Conflict(
            "Session already closed".to_string(),
        ));
    }

    let exit_ip = geo::client_ip(&headers, peer);
    let closed = state
        .session_repository
        .close(session.id, outcome, &exit_ip)
        .await
        .map_err(|e| {
            error!("Failed to close click session: {}", e);
            TrackerError::InternalServerError
        })?;

    // Lost a race against a concurrent callback for the same token;
    // first write wins.
    if !closed {
        return Err(TrackerError::Conflict(
            "Session already closed".to_string(),
        ));
    }

    info!(
        "Closed session {} as {}",
        session.masked_id,
        outcome.as_str()
    );

    Ok(views::outcome_confirmation(outcome, &session.masked_id).into_response())
}

/// Project plus the entry links derived from its current link UID.
#[derive(Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: Project,
    pub entry_live_link: String,
    pub entry_test_link: String,
}

impl ProjectResponse {
    fn new(project: Project, state: &AppState) -> Self {
        let base = state.config.public_base_url.as_str().trim_end_matches('/');
        let entry_live_link = format!(
            "{base}/entry/{}/live?id={{USER_ID}}",
            project.project_link_uid
        );
        let entry_test_link = format!(
            "{base}/entry/{}/test?id={{USER_ID}}",
            project.project_link_uid
        );
        ProjectResponse {
            project,
            entry_live_link,
            entry_test_link,
        }
    }
}

/// Create a project (editor only)
pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    if payload.project_name.trim().is_empty() {
        return Err(TrackerError::BadRequest(
            "Missing project_name".to_string(),
        ));
    }

    let project = state
        .project_repository
        .create(&payload, &state.config.public_base_url)
        .await
        .map_err(|e| {
            error!("Failed to create project: {}", e);
            TrackerError::InternalServerError
        })?;

    info!(
        "Created project {} ({})",
        project.project_number, project.project_uid
    );

    let response = ProjectResponse::new(project, &state);
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get a project with its entry links (editor only)
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, TrackerError> {
    let project = state
        .project_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get project: {}", e);
            TrackerError::InternalServerError
        })?
        .ok_or_else(|| TrackerError::NotFound("Project not found".to_string()))?;

    Ok(Json(ProjectResponse::new(project, &state)))
}

/// Update the client survey links, rotating the link UID (editor only)
pub async fn update_links(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLinksRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let live = non_empty(payload.client_live_link.as_deref());
    let test = non_empty(payload.client_test_link.as_deref());

    let project = state
        .project_repository
        .update_client_links(id, live, test)
        .await
        .map_err(|e| {
            error!("Failed to update client links: {}", e);
            TrackerError::InternalServerError
        })?
        .ok_or_else(|| TrackerError::NotFound("Project not found".to_string()))?;

    info!(
        "Rotated link UID for project {} to {}",
        project.project_number, project.project_link_uid
    );

    Ok(Json(ProjectResponse::new(project, &state)))
}

/// Update the outcome redirect templates (editor only)
///
/// Whatever the administrator pasted is normalized onto this host
/// before being stored; a malformed value degrades to the fallback
/// template instead of erroring.
pub async fn update_redirects(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRedirectsRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let base = &state.config.public_base_url;
    let supplied = [
        payload.redirect_complete_url.as_deref(),
        payload.redirect_terminate_url.as_deref(),
        payload.redirect_quotafull_url.as_deref(),
        payload.redirect_securityterminate_url.as_deref(),
    ];

    let mut templates: [String; 4] = Default::default();
    for (slot, (outcome, raw)) in templates
        .iter_mut()
        .zip(OutcomeKind::all().into_iter().zip(supplied))
    {
        *slot = redirect::normalize(outcome, raw.unwrap_or(""), base);
    }

    let project = state
        .project_repository
        .update_redirects(id, &templates)
        .await
        .map_err(|e| {
            error!("Failed to update redirect templates: {}", e);
            TrackerError::InternalServerError
        })?
        .ok_or_else(|| TrackerError::NotFound("Project not found".to_string()))?;

    Ok(Json(ProjectResponse::new(project, &state)))
}

#[derive(Deserialize)]
pub struct ListSessionsQuery {
    pub limit: Option<i64>,
}

/// Recent click sessions for a project, newest first (editor only)
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, TrackerError> {
    let project = state
        .project_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get project: {}", e);
            TrackerError::InternalServerError
        })?
        .ok_or_else(|| TrackerError::NotFound("Project not found".to_string()))?;

    let limit = query.limit.unwrap_or(200).clamp(1, 1000);
    let sessions = state
        .session_repository
        .list_for_project(project.id, limit)
        .await
        .map_err(|e| {
            error!("Failed to list sessions: {}", e);
            TrackerError::InternalServerError
        })?;

    let sessions: Vec<SessionResponse> = sessions.into_iter().map(SessionResponse::from).collect();
    Ok(Json(sessions))
}

/// The live gate: existence is not enough, the project must be live.
fn ensure_live(project: &Project) -> Result<(), TrackerError> {
    if project.status != ProjectStatus::Live {
        return Err(TrackerError::Forbidden(
            "Project is not live; ask an editor to set status live".to_string(),
        ));
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn project(status: ProjectStatus) -> Project {
        Project {
            id: 1,
            project_number: 101,
            project_uid: "AAAA1111".to_string(),
            project_link_uid: "BBBB2222".to_string(),
            project_name: "Consumer study".to_string(),
            status,
            client_live_link: None,
            client_test_link: None,
            redirect_complete_url: String::new(),
            redirect_terminate_url: String::new(),
            redirect_quotafull_url: String::new(),
            redirect_securityterminate_url: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn live_gate_refuses_pending_and_paused() {
        assert!(ensure_live(&project(ProjectStatus::Live)).is_ok());
        assert!(matches!(
            ensure_live(&project(ProjectStatus::Pending)),
            Err(TrackerError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_live(&project(ProjectStatus::Paused)),
            Err(TrackerError::Forbidden(_))
        ));
    }

    #[test]
    fn non_empty_trims_and_filters() {
        assert_eq!(non_empty(Some("  https://a  ")), Some("https://a"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
