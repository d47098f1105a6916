//! Routes for the logged-in model's own profile

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::auth::SessionSnapshot;
use crate::auth::errors::ProfileError;
use crate::routes::{JsonReply, backend_failure, failure};
use crate::server::AppState;

fn require_model(snapshot: &SessionSnapshot) -> Result<(), JsonReply> {
    if snapshot.is_model {
        Ok(())
    } else {
        Err(failure(StatusCode::FORBIDDEN, "Only models have a profile"))
    }
}

fn profile_failure(err: &ProfileError) -> JsonReply {
    match err {
        ProfileError::Api(e) => backend_failure(e),
        ProfileError::NotFoundByEmail | ProfileError::NoIdentifier => {
            failure(StatusCode::NOT_FOUND, err.to_string())
        }
        ProfileError::Superseded => failure(StatusCode::CONFLICT, err.to_string()),
    }
}

/// `GET /api/profile`
pub async fn show(Extension(snapshot): Extension<SessionSnapshot>) -> JsonReply {
    if let Err(reply) = require_model(&snapshot) {
        return reply;
    }
    (
        StatusCode::OK,
        Json(json!({
            "profile": snapshot.profile,
            "modelId": snapshot.model_id,
            "profileError": snapshot.profile_error,
            "profileLoading": snapshot.profile_loading,
        })),
    )
}

/// `POST /api/profile/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
) -> JsonReply {
    if let Err(reply) = require_model(&snapshot) {
        return reply;
    }
    match state.session.refresh_profile().await {
        Ok(record) => (StatusCode::OK, Json(json!(record))),
        Err(e) => profile_failure(&e),
    }
}

/// `PUT /api/profile`
pub async fn update(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
    Json(body): Json<Value>,
) -> JsonReply {
    if let Err(reply) = require_model(&snapshot) {
        return reply;
    }
    match state.session.update_profile(&body).await {
        Ok(Some(record)) => (StatusCode::OK, Json(json!(record))),
        Ok(None) => failure(
            StatusCode::CONFLICT,
            "Profile is not loaded yet; refresh and try again",
        ),
        Err(e) => profile_failure(&e),
    }
}

/// `GET /api/profile/jobs`
pub async fn jobs(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
) -> JsonReply {
    if let Err(reply) = require_model(&snapshot) {
        return reply;
    }
    let jobs = state.session.profile_jobs().await;
    (
        StatusCode::OK,
        Json(json!({
            "jobs": jobs,
            "modelId": state.session.resolved_model_id(),
            "profileError": state.session.profile_error(),
        })),
    )
}
