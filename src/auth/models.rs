//! Authentication Models
//!
//! Canonical claims decoded from the bearer token, the identity derived from
//! them, and the identifier the console uses to scope model requests.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::api::models::ModelLookup;

const EMAIL_URI: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
const ROLE_URI: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";
const NAME_ID_URI: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

pub const MANAGER_ROLE: &str = "manager";
pub const MODEL_ROLE: &str = "model";

/// Token claims normalized into one shape, whatever key names the issuer used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub email: String,
    pub role: String,
    pub sub: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub model_reference: Option<i64>,
    /// Expiry as seconds since the epoch, when the token carries one
    pub exp: Option<i64>,
}

impl Claims {
    /// Normalize a raw decoded payload. This is the only place raw claim
    /// keys are looked at.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            email: first_text(payload, &[EMAIL_URI, "email"]),
            role: first_text(payload, &[ROLE_URI, "role"]),
            sub: first_text(payload, &["sub", NAME_ID_URI]),
            first_name: first_text(payload, &["firstName", "given_name"]),
            last_name: first_text(payload, &["lastName", "family_name"]),
            name: first_text(payload, &["name"]),
            model_reference: ["ModelId", "modelId"]
                .iter()
                .find_map(|key| payload.get(*key).and_then(numeric_id)),
            exp: payload.get("exp").and_then(|v| {
                v.as_i64()
                    .or_else(|| v.as_f64().map(|f| f as i64))
                    .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            }),
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now)
    }
}

/// First non-empty string among `keys`. A role array contributes its first
/// entry.
fn first_text(payload: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match payload.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(items) => items
                .iter()
                .find_map(|i| i.as_str().filter(|s| !s.is_empty()))
                .map(str::to_string),
            _ => None,
        })
        .unwrap_or_default()
}

fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Who the current user is, as far as the token says.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    /// Token subject, kept for log correlation with the backend
    pub subject: String,
    pub first_name: String,
    pub last_name: String,
    /// Issuer supplied display name, used when no first or last name is set
    pub name: String,
    pub role: String,
    pub is_manager: bool,
    pub model_reference: Option<i64>,
}

impl Identity {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            email: claims.email.clone(),
            subject: claims.sub.clone(),
            first_name: claims.first_name.clone(),
            last_name: claims.last_name.clone(),
            name: claims.name.clone(),
            role: claims.role.clone(),
            is_manager: claims.role.eq_ignore_ascii_case(MANAGER_ROLE),
            model_reference: claims.model_reference,
        }
    }

    pub fn has_model_role(&self) -> bool {
        self.role.eq_ignore_ascii_case(MODEL_ROLE)
    }

    /// Model-flavored identities get a profile record resolved for them.
    pub fn is_model(&self) -> bool {
        self.has_model_role() || self.model_reference.is_some()
    }

    /// Best identifier to find this identity's profile record by.
    pub fn preferred_lookup(&self) -> Option<ModelLookup> {
        match self.model_reference {
            Some(id) => Some(ModelLookup::Id(id)),
            None if !self.email.is_empty() => Some(ModelLookup::Email(self.email.clone())),
            None => None,
        }
    }

    /// Whether `lookup` is one of this identity's own identifiers.
    pub fn answers_to(&self, lookup: &ModelLookup) -> bool {
        match lookup {
            ModelLookup::Id(id) => self.model_reference == Some(*id),
            ModelLookup::Email(email) => {
                !self.email.is_empty() && self.email.eq_ignore_ascii_case(email)
            }
        }
    }

    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        match full.trim() {
            "" => self.name.clone(),
            trimmed => trimmed.to_string(),
        }
    }
}

/// Identifier used to scope model requests.
///
/// A model that has no numeric id yet is provisionally identified by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModelId {
    Id(i64),
    Email(String),
}

impl ModelId {
    pub fn numeric(&self) -> Option<i64> {
        match self {
            ModelId::Id(id) => Some(*id),
            ModelId::Email(_) => None,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelId::Id(id) => write!(f, "{}", id),
            ModelId::Email(email) => f.write_str(email),
        }
    }
}
