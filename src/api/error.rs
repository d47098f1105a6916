//! Backend API errors
//!
//! Every failure coming back from the agency REST API is folded into
//! [`ApiError`], whose `Display` output is already user-presentable text.

use serde_json::Value;
use thiserror::Error;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    #[error("Request timed out. Please try again later.")]
    Timeout,

    #[error("Network error. Please check your connection.")]
    Network(#[source] reqwest::Error),

    /// The backend answered 2xx but the body did not have the expected shape.
    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build an HTTP failure with no response body.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
            data: None,
        }
    }

    /// Status code as the console reports it: 408 for timeouts, 0 for
    /// connection failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Timeout => Some(408),
            ApiError::Network(_) => Some(0),
            ApiError::Decode(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }

    /// Map an error response onto the console's wording for that status.
    /// `operation` names what was being attempted, e.g. "retrieving model 7".
    pub fn from_status(status: u16, data: Option<Value>, operation: &str) -> Self {
        let detail = data.as_ref().and_then(extract_message);
        let message = match status {
            400 => format!(
                "Invalid request: {}",
                detail.as_deref().unwrap_or("Bad request")
            ),
            401 => "Unauthorized: Please login again".to_string(),
            403 => "Forbidden: You do not have permission to perform this action".to_string(),
            404 => format!("Resource not found for this {}", operation),
            409 => "Conflict: This operation conflicts with the current state".to_string(),
            422 => format!(
                "Validation error: {}",
                detail.as_deref().unwrap_or("Invalid data provided")
            ),
            500 => "Server error: Please try again later".to_string(),
            _ => format!(
                "Error ({}): {}",
                status,
                detail.as_deref().unwrap_or("Unknown error")
            ),
        };

        ApiError::Http {
            status,
            message,
            data,
        }
    }
}

/// Pull a human readable message out of an error body.
///
/// Looks at `message`, then `error`, then the values of a validation
/// `errors` map, then accepts a bare JSON string.
pub fn extract_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => {
            for key in ["message", "error"] {
                if let Some(Value::String(s)) = map.get(key) {
                    if !s.is_empty() {
                        return Some(s.clone());
                    }
                }
            }

            let errors = map.get("errors")?.as_object()?;
            let joined = errors
                .values()
                .flat_map(|v| match v {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(|i| i.as_str().map(str::to_string))
                        .collect::<Vec<_>>(),
                    Value::String(s) => vec![s.clone()],
                    _ => Vec::new(),
                })
                .collect::<Vec<_>>()
                .join(", ");

            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// Short heading for an HTTP status, used above error banners.
pub fn status_title(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized - Please log in again",
        403 => "Access Denied",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Validation Error",
        500 => "Server Error",
        503 => "Service Unavailable",
        400..=499 => "Request Error",
        s if s >= 500 => "Server Error",
        _ => "Unknown Error",
    }
}
