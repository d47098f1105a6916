//! Wire records exchanged with the agency backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Credentials posted to `/Account/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body returned by `/Account/login`.
///
/// Depending on the backend build the token comes back either as a bare JSON
/// string or wrapped in an object.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LoginResponse {
    Token(String),
    Wrapped { jwt: String },
    Other(Value),
}

impl LoginResponse {
    /// The bearer token, if the response carried one in either shape.
    pub fn into_token(self) -> Option<String> {
        match self {
            LoginResponse::Token(token) | LoginResponse::Wrapped { jwt: token } => {
                (!token.is_empty()).then_some(token)
            }
            LoginResponse::Other(_) => None,
        }
    }
}

/// A model's profile as stored by the backend.
///
/// Only the fields the console reasons about are typed; everything else is
/// carried through untouched so an update round-trips the full record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelRecord {
    pub fn email_matches(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(email))
    }
}

/// How a model profile is looked up on `/Models/{...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLookup {
    Id(i64),
    Email(String),
}

impl fmt::Display for ModelLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelLookup::Id(id) => write!(f, "{}", id),
            ModelLookup::Email(email) => f.write_str(email),
        }
    }
}
