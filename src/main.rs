//! # Agency Console
//!
//! Local host for the staffing agency's administrative console. It owns the
//! operator's session against the agency REST API: it keeps the bearer
//! token, derives who the operator is (manager or model) from the token's
//! claims, reconciles model identities with their backend profile, and gates
//! what the browser UI may fetch.
//!
//! ## Architecture
//! - `config`: environment driven settings
//! - `api`: REST client for the agency backend
//! - `auth`: token storage and decoding, the session resolver, permissions
//! - `routes`: HTTP handlers for the console UI
//! - `server`: router assembly and startup
//!
//! ## Running
//! ```bash
//! AGENCY_API_URL=http://localhost:8080/api cargo run
//! ```

mod api;
mod auth;
mod config;
mod routes;
mod server;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    tracing::info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env()?;
    server::start(config).await
}
