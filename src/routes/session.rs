//! Session routes: login, logout and the capability view

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::Redirect,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::SessionSnapshot;
use crate::routes::{JsonReply, failure};
use crate::server::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `GET /api/session`
pub async fn current(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// `POST /api/session/login`
///
/// 200 with the new session view, or 401 with the readable login error.
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> JsonReply {
    if state.session.login(&payload.email, &payload.password).await {
        (StatusCode::OK, Json(json!(state.session.snapshot())))
    } else {
        let message = state
            .session
            .auth_error()
            .unwrap_or_else(|| "Login failed. Please check your credentials and try again.".to_string());
        failure(StatusCode::UNAUTHORIZED, message)
    }
}

/// `POST /api/session/logout`, always redirects to the login page.
pub async fn logout(State(state): State<AppState>) -> Redirect {
    Redirect::to(state.session.logout())
}

/// `DELETE /api/session/errors`
pub async fn clear_errors(State(state): State<AppState>) -> StatusCode {
    state.session.clear_auth_error();
    state.session.clear_profile_error();
    StatusCode::NO_CONTENT
}
