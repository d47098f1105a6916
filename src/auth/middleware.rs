//! Session Middleware
//!
//! Axum middleware that applies route guards against the current session
//! and injects a [`SessionSnapshot`] for downstream handlers.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::permissions::{Access, RouteGuard};
use crate::auth::session::LOGIN_PATH;
use crate::server::AppState;

pub struct SessionGuard;

impl SessionGuard {
    /// Any logged-in user.
    pub async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
        Self::enforce(RouteGuard::Authenticated, state, req, next).await
    }

    /// Managers only.
    pub async fn require_manager(State(state): State<AppState>, req: Request, next: Next) -> Response {
        Self::enforce(RouteGuard::ManagerOnly, state, req, next).await
    }

    async fn enforce(guard: RouteGuard, state: AppState, mut req: Request, next: Next) -> Response {
        let snapshot = state.session.snapshot();

        match snapshot.guard(guard) {
            Access::Allow => {
                req.extensions_mut().insert(snapshot);
                next.run(req).await
            }
            Access::Redirect(to) => {
                tracing::info!("[SessionGuard] {} {} redirected to {}", req.method(), req.uri(), to);
                let (status, message) = if to == LOGIN_PATH {
                    (StatusCode::UNAUTHORIZED, "Please log in to continue")
                } else {
                    (StatusCode::FORBIDDEN, "This page is only available to managers")
                };
                (status, Json(json!({ "error": message, "redirect": to }))).into_response()
            }
        }
    }
}
