//! # Server Module
//!
//! Local HTTP surface for the browser console and its route configuration.

use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::api::{AgencyBackend, ApiClient};
use crate::auth::SessionResolver;
use crate::auth::middleware::SessionGuard;
use crate::auth::store::{FileTokenStore, TokenStore};
use crate::config::Config;
use crate::routes::{expenses, health::ping, profile, session};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionResolver>,
    pub backend: Arc<dyn AgencyBackend>,
}

/// Build the console router around `state`.
pub fn build_router(state: AppState, console_origin: Option<axum::http::HeaderValue>) -> Router {
    let model_routes = Router::new()
        .route("/api/profile", get(profile::show).put(profile::update))
        .route("/api/profile/refresh", post(profile::refresh))
        .route("/api/profile/jobs", get(profile::jobs))
        .route(
            "/api/models/{id}/expenses",
            get(expenses::for_model).post(expenses::create),
        )
        .route(
            "/api/models/{id}/expenses/{expense_id}",
            put(expenses::update).delete(expenses::remove),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            SessionGuard::require_session,
        ));

    let manager_routes = Router::new()
        .route("/api/expenses", get(expenses::all))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            SessionGuard::require_manager,
        ));

    let mut cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::ORIGIN,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ]);
    if let Some(origin) = console_origin {
        cors = cors.allow_origin(origin).allow_credentials(true);
    }

    Router::new()
        .route("/ping", get(ping))
        .route("/api/session", get(session::current))
        .route("/api/session/login", post(session::login))
        .route("/api/session/logout", post(session::logout))
        .route("/api/session/errors", delete(session::clear_errors))
        .merge(model_routes)
        .merge(manager_routes)
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

/// Restore the session from disk and serve the console until terminated.
pub async fn start(config: Config) -> Result<()> {
    let store = FileTokenStore::new(&config.token_path);
    tracing::info!("Token store at {}", store.path().display());
    let tokens: Arc<dyn TokenStore> = Arc::new(store);
    let backend: Arc<dyn AgencyBackend> = Arc::new(
        ApiClient::new(config.api.base_url.clone(), config.api.timeout, tokens.clone())
            .context("Failed to build HTTP client")?,
    );

    let session = Arc::new(SessionResolver::new(backend.clone(), tokens));
    session.initialize();

    let origin = match config.server.console_origin.parse() {
        Ok(origin) => Some(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CONSOLE_ORIGIN {}: {}", config.server.console_origin, e);
            None
        }
    };
    let app = build_router(AppState { session, backend }, origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} - port may already be in use", addr))?;

    tracing::info!("Agency console listening on http://{}", addr);
    tracing::info!("Backend API at {}", config.api.base_url);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
