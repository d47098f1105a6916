// # Routes Module
//
// - HTTP handlers for the local console surface, grouped by concern.
// - Register new modules here and wire them in `server.rs`.

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

use crate::api::ApiError;
use crate::api::error::status_title;
use crate::auth::errors::PermissionError;

/// Health check endpoint
pub mod health;

/// Login, logout and the session view
pub mod session;

/// The logged-in model's own profile and jobs
pub mod profile;

/// Expense listings gated by role
pub mod expenses;

pub type JsonReply = (StatusCode, Json<Value>);

pub fn failure(status: StatusCode, message: impl Into<String>) -> JsonReply {
    (status, Json(json!({ "error": message.into() })))
}

/// Relay a backend failure. Transport problems become 502.
pub fn backend_failure(err: &ApiError) -> JsonReply {
    let status = err
        .status()
        .and_then(|s| StatusCode::from_u16(s).ok())
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        Json(json!({ "error": err.to_string(), "title": status_title(status.as_u16()) })),
    )
}

pub fn denied(err: PermissionError) -> JsonReply {
    let status = match err {
        PermissionError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        _ => StatusCode::FORBIDDEN,
    };
    failure(status, err.to_string())
}
