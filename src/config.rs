//! Configuration module for environment variables and application settings

use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    /// Agency backend configuration
    pub api: ApiConfig,

    /// File holding the bearer token between runs
    pub token_path: PathBuf,

    /// Local console server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin of the browser UI allowed through CORS
    pub console_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_url = var("AGENCY_API_URL")
            .unwrap_or_else(|| "http://localhost:8080/api".to_string());
        let base_url = Url::parse(&raw_url)
            .with_context(|| format!("AGENCY_API_URL is not a valid URL: {}", raw_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("AGENCY_API_URL must be a hierarchical URL: {}", raw_url));
        }

        let timeout_secs: u64 = parse_or(&var, "AGENCY_API_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(anyhow!("AGENCY_API_TIMEOUT_SECS must be greater than zero"));
        }

        let port = match var("PORT") {
            Some(_) => parse_or(&var, "PORT", 3000)?,
            None => parse_or(&var, "SERVER_PORT", 3000)?,
        };

        Ok(Self {
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },

            token_path: var("AGENCY_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".agency-console/token")),

            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port,
                console_origin: var("CONSOLE_ORIGIN")
                    .unwrap_or_else(|| "http://localhost:5173".to_string()),
            },
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
