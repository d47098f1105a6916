//! Capability checks derived from the session.
//!
//! These gate what the console fetches and renders. They are advisory: the
//! backend enforces its own rules on every call.

use crate::auth::errors::PermissionError;
use crate::auth::models::Identity;
use crate::auth::session::{LOGIN_PATH, SessionSnapshot};

pub const DASHBOARD_PATH: &str = "/dashboard";

/// What a protected view demands of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    Authenticated,
    ManagerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

impl SessionSnapshot {
    pub fn guard(&self, guard: RouteGuard) -> Access {
        if !self.authenticated {
            return Access::Redirect(LOGIN_PATH);
        }
        match guard {
            RouteGuard::ManagerOnly if !self.is_manager => Access::Redirect(DASHBOARD_PATH),
            _ => Access::Allow,
        }
    }

    pub fn require_authenticated(&self) -> Result<&Identity, PermissionError> {
        self.identity.as_ref().ok_or(PermissionError::NotAuthenticated)
    }

    pub fn require_manager(&self) -> Result<(), PermissionError> {
        self.require_authenticated()?;
        if self.is_manager {
            Ok(())
        } else {
            Err(PermissionError::ManagerOnly)
        }
    }

    /// Whether `requested` (a model id or email from a URL) names the
    /// current model.
    fn owns_model(&self, requested: &str) -> bool {
        let Some(identity) = self.identity.as_ref() else {
            return false;
        };
        if !self.is_model {
            return false;
        }

        let id_matches = self
            .model_id
            .as_ref()
            .is_some_and(|id| id.to_string() == requested);
        let email_matches =
            !identity.email.is_empty() && identity.email.eq_ignore_ascii_case(requested);

        id_matches || email_matches
    }

    /// Managers see every model; a model sees only itself.
    pub fn can_view_model(&self, requested: &str) -> bool {
        self.is_manager || self.owns_model(requested)
    }

    pub fn require_model_access(&self, requested: &str) -> Result<(), PermissionError> {
        self.require_authenticated()?;
        if self.can_view_model(requested) {
            Ok(())
        } else {
            tracing::debug!("Denied access to model {}", requested);
            Err(PermissionError::ForeignModel {
                requested: requested.to_string(),
            })
        }
    }

    /// Only the model itself may change its expenses.
    pub fn can_modify_model_expenses(&self, requested: &str) -> bool {
        self.owns_model(requested)
    }

    pub fn require_expense_owner(&self, requested: &str) -> Result<(), PermissionError> {
        self.require_authenticated()?;
        if self.can_modify_model_expenses(requested) {
            Ok(())
        } else {
            Err(PermissionError::NotOwner {
                requested: requested.to_string(),
            })
        }
    }
}
