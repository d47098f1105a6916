use thiserror::Error;

use crate::api::ApiError;

/// Failure of a login attempt or of reading stored credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token expired")]
    Expired,

    #[error(transparent)]
    Rejected(#[from] ApiError),

    #[error("failed to persist token: {0}")]
    Storage(#[from] std::io::Error),
}

impl AuthError {
    /// Text shown on the login screen.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidTokenFormat => {
                "Authentication failed: Invalid response from server".to_string()
            }
            AuthError::MalformedToken(_) | AuthError::Expired => {
                "Authentication failed: Invalid token".to_string()
            }
            AuthError::Rejected(e) => e.to_string(),
            AuthError::Storage(_) => {
                "Login failed. Please check your credentials and try again.".to_string()
            }
        }
    }
}

/// Failure to locate the profile record of a model identity. Never ends the
/// session.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Model not found by email")]
    NotFoundByEmail,

    #[error("no model identifier available")]
    NoIdentifier,

    /// The session changed while the lookup was in flight; its result was
    /// dropped.
    #[error("session changed before the profile arrived")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A request the current identity is not allowed to make. Advisory only; the
/// backend enforces the real rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("You must be logged in to view this page")]
    NotAuthenticated,

    #[error("Only managers can perform this action")]
    ManagerOnly,

    #[error("You do not have permission to view this model's data")]
    ForeignModel { requested: String },

    #[error("Only the model itself can modify these expenses")]
    NotOwner { requested: String },
}
