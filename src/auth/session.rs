//! Session Resolver
//!
//! Owns the bearer token lifecycle and answers "who is calling" for every
//! route and outbound request. The identity comes from token claims; for
//! model identities the backend profile record is resolved in the background
//! and its id becomes authoritative once known.
//!
//! Every credential change (initialize, login, logout) starts a new session
//! epoch. Profile results are applied only if their epoch is still current,
//! so a resolution that finishes after a logout cannot resurrect the old
//! session's data.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::models::{ModelLookup, ModelRecord};
use crate::api::AgencyBackend;
use crate::auth::errors::{AuthError, ProfileError};
use crate::auth::jwt::TokenDecoder;
use crate::auth::models::{Identity, ModelId};
use crate::auth::store::TokenStore;

/// Unauthenticated entry point of the console.
pub const LOGIN_PATH: &str = "/login";

const PROFILE_LOAD_FALLBACK: &str = "Failed to load model information.";

#[derive(Debug, Default)]
struct SessionState {
    epoch: u64,
    identity: Option<Identity>,
    profile: Option<ModelRecord>,
    auth_error: Option<String>,
    profile_error: Option<String>,
    profile_loading: bool,
}

impl SessionState {
    /// A background result may land only in the session that asked for it.
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.identity.is_some()
    }

    fn model_id(&self) -> Option<ModelId> {
        let identity = self.identity.as_ref()?;

        if let Some(reference) = identity.model_reference {
            return Some(ModelId::Id(reference));
        }
        if let Some(profile) = &self.profile {
            return Some(ModelId::Id(profile.id));
        }
        if identity.has_model_role() && !identity.email.is_empty() {
            return Some(ModelId::Email(identity.email.clone()));
        }
        None
    }
}

/// Read-only view of the session handed to the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub is_manager: bool,
    pub is_model: bool,
    pub identity: Option<Identity>,
    pub profile: Option<ModelRecord>,
    pub model_id: Option<ModelId>,
    pub full_name: String,
    pub auth_error: Option<String>,
    pub profile_error: Option<String>,
    pub profile_loading: bool,
}

pub struct SessionResolver {
    backend: Arc<dyn AgencyBackend>,
    tokens: Arc<dyn TokenStore>,
    decoder: TokenDecoder,
    state: RwLock<SessionState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SessionResolver {
    pub fn new(backend: Arc<dyn AgencyBackend>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            tokens,
            decoder: TokenDecoder::new(),
            state: RwLock::new(SessionState::default()),
            pending: Mutex::new(None),
        }
    }

    /// Restore the session from the stored token.
    ///
    /// A missing token leaves the session unauthenticated. A token that does
    /// not decode or has expired is purged. A model identity gets its profile
    /// resolved in the background; this call does not wait for it.
    pub fn initialize(self: &Arc<Self>) {
        let Some(token) = self.tokens.load() else {
            tracing::info!("No stored token, session starts unauthenticated");
            return;
        };

        match self.trust(&token) {
            Ok(identity) => {
                tracing::info!("Restored session for {} (subject {:?})", identity.email, identity.subject);
                self.establish(identity);
            }
            Err(e) => {
                tracing::warn!("Discarding stored token: {}", e);
                self.tokens.clear();
            }
        }
    }

    /// Exchange credentials for a token and establish a session.
    ///
    /// Returns `false` on any failure; the reason is readable through
    /// [`auth_error`](Self::auth_error).
    pub async fn login(self: &Arc<Self>, email: &str, password: &str) -> bool {
        tracing::info!("Login attempt for {}", email);
        self.state.write().auth_error = None;

        match self.try_login(email, password).await {
            Ok(identity) => {
                tracing::info!("Login successful for {} (subject {:?})", identity.email, identity.subject);
                self.establish(identity);
                true
            }
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", email, e);
                self.state.write().auth_error = Some(e.user_message());
                false
            }
        }
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let response = self.backend.login(email, password).await?;
        let token = response
            .into_token()
            .ok_or(AuthError::InvalidTokenFormat)?;

        self.tokens.save(&token)?;

        self.trust(&token).inspect_err(|_| {
            // never leave a token that decodes to garbage persisted
            self.tokens.clear();
        })
    }

    /// Drop the session. Returns where the caller should navigate next.
    ///
    /// An in-flight profile resolution is left to finish; its result is
    /// discarded.
    pub fn logout(&self) -> &'static str {
        self.tokens.clear();

        let mut state = self.state.write();
        if let Some(identity) = state.identity.take() {
            tracing::info!("Logged out {}", identity.email);
        }
        state.epoch += 1;
        state.profile = None;
        state.profile_error = None;
        state.profile_loading = false;

        LOGIN_PATH
    }

    /// Decode and expiry-check a token.
    fn trust(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.decoder.decode(token)?;
        if claims.is_expired_at(Utc::now().timestamp()) {
            return Err(AuthError::Expired);
        }
        Ok(Identity::from_claims(&claims))
    }

    /// Install a fresh identity as a new epoch and kick off profile
    /// resolution for model identities.
    fn establish(self: &Arc<Self>, identity: Identity) {
        let lookup = if identity.is_model() {
            identity.preferred_lookup()
        } else {
            None
        };

        {
            let mut state = self.state.write();
            state.epoch += 1;
            state.identity = Some(identity);
            state.profile = None;
            state.profile_error = None;
            state.profile_loading = lookup.is_some();
        }

        if let Some(lookup) = lookup {
            let this = Arc::clone(self);
            let handle = tokio::spawn(async move {
                let _ = this.resolve_profile(lookup).await;
            });
            *self.pending.lock() = Some(handle);
        }
    }

    /// Wait for the outstanding background profile resolution, if any.
    pub async fn wait_for_profile(&self) {
        let handle = self.pending.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Profile resolution task failed: {}", e);
            }
        }
    }

    /// Locate the profile record for `lookup` and make it the session's
    /// profile.
    ///
    /// `lookup` must be one of the current identity's own identifiers; a
    /// lookup left over from an earlier session is refused. Tries the direct
    /// lookup first; on a 404 searches the full model list for the identity's
    /// email. On success the identity's model reference is patched to the
    /// record's id. Failures are recorded as the profile error and never end
    /// the session.
    pub async fn resolve_profile(&self, lookup: ModelLookup) -> Result<ModelRecord, ProfileError> {
        let (epoch, email) = {
            let mut state = self.state.write();
            let email = match state.identity.as_ref() {
                None => return Err(ProfileError::NoIdentifier),
                Some(identity) if !identity.answers_to(&lookup) => {
                    tracing::debug!("Refusing lookup {} for a different identity", lookup);
                    return Err(ProfileError::Superseded);
                }
                Some(identity) => identity.email.clone(),
            };
            (Self::begin_profile_call(&mut state), email)
        };
        self.run_resolution(epoch, &email, lookup).await
    }

    /// Re-run resolution with the best identifier the identity offers.
    /// Waits for the background resolution first so the two never overlap.
    pub async fn refresh_profile(&self) -> Result<ModelRecord, ProfileError> {
        self.wait_for_profile().await;

        let lookup = self
            .state
            .read()
            .identity
            .as_ref()
            .and_then(Identity::preferred_lookup);

        match lookup {
            Some(lookup) => self.resolve_profile(lookup).await,
            None => Err(ProfileError::NoIdentifier),
        }
    }

    fn begin_profile_call(state: &mut SessionState) -> u64 {
        state.profile_loading = true;
        state.profile_error = None;
        state.epoch
    }

    async fn run_resolution(&self, epoch: u64, email: &str, lookup: ModelLookup) -> Result<ModelRecord, ProfileError> {
        let outcome = self.fetch_profile(&lookup, email).await;

        let mut state = self.state.write();
        if !state.is_current(epoch) {
            tracing::debug!("Discarding profile result for superseded session");
            return Err(ProfileError::Superseded);
        }
        state.profile_loading = false;

        match outcome {
            Ok(record) => {
                if let Some(identity) = state.identity.as_mut() {
                    if identity.model_reference != Some(record.id) {
                        tracing::info!("Model reference for {} resolved to {}", identity.email, record.id);
                        identity.model_reference = Some(record.id);
                    }
                }
                state.profile = Some(record.clone());
                Ok(record)
            }
            Err(e) => {
                tracing::warn!("Failed to resolve model profile via {}: {}", lookup, e);
                let message = e.to_string();
                state.profile_error = Some(if message.is_empty() {
                    PROFILE_LOAD_FALLBACK.to_string()
                } else {
                    message
                });
                Err(e)
            }
        }
    }

    async fn fetch_profile(&self, lookup: &ModelLookup, email: &str) -> Result<ModelRecord, ProfileError> {
        tracing::debug!("Fetching model profile by {}", lookup);
        match self.backend.get_model(lookup).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_not_found() && !email.is_empty() => {
                tracing::debug!("Model {} not found, searching by email", lookup);
                self.backend
                    .list_models()
                    .await?
                    .into_iter()
                    .find(|model| model.email_matches(email))
                    .ok_or(ProfileError::NotFoundByEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the profile record with the backend's answer to an update.
    ///
    /// Returns `Ok(None)` without calling the backend when no numeric model
    /// id is known yet.
    pub async fn update_profile(&self, body: &Value) -> Result<Option<ModelRecord>, ProfileError> {
        let (epoch, id) = {
            let mut state = self.state.write();
            let Some(id) = state.model_id().and_then(|id| id.numeric()) else {
                return Ok(None);
            };
            (Self::begin_profile_call(&mut state), id)
        };

        let result = self.backend.update_model(id, body).await;

        let mut state = self.state.write();
        if !state.is_current(epoch) {
            tracing::debug!("Discarding profile update for superseded session");
            return Err(ProfileError::Superseded);
        }
        state.profile_loading = false;

        match result {
            Ok(record) => {
                tracing::info!("Updated model profile {}", record.id);
                state.profile = Some(record.clone());
                Ok(Some(record))
            }
            Err(e) => {
                tracing::warn!("Failed to update model profile {}: {}", id, e);
                state.profile_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Jobs of the current model. Failures are recorded as the profile error
    /// and read as an empty list.
    pub async fn profile_jobs(&self) -> Vec<Value> {
        let (epoch, id) = {
            let state = self.state.read();
            match state.model_id().and_then(|id| id.numeric()) {
                Some(id) => (state.epoch, id),
                None => return Vec::new(),
            }
        };

        match self.backend.get_model_jobs(id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!("Failed to load jobs for model {}: {}", id, e);
                let mut state = self.state.write();
                if state.is_current(epoch) {
                    state.profile_error = Some(e.to_string());
                }
                Vec::new()
            }
        }
    }

    /// Best available model identifier, in priority order: the identity's
    /// model reference, the loaded profile's id, the email of a model-role
    /// identity. Never waits on resolution.
    pub fn resolved_model_id(&self) -> Option<ModelId> {
        self.state.read().model_id()
    }

    pub fn auth_error(&self) -> Option<String> {
        self.state.read().auth_error.clone()
    }

    pub fn clear_auth_error(&self) {
        self.state.write().auth_error = None;
    }

    pub fn profile_error(&self) -> Option<String> {
        self.state.read().profile_error.clone()
    }

    pub fn clear_profile_error(&self) {
        self.state.write().profile_error = None;
    }

    /// Capability view of the session, taken under a single read lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        let identity = state.identity.clone();

        SessionSnapshot {
            authenticated: identity.is_some(),
            is_manager: identity.as_ref().is_some_and(|i| i.is_manager),
            is_model: identity.as_ref().is_some_and(Identity::is_model),
            full_name: identity.as_ref().map(Identity::full_name).unwrap_or_default(),
            model_id: state.model_id(),
            identity,
            profile: state.profile.clone(),
            auth_error: state.auth_error.clone(),
            profile_error: state.profile_error.clone(),
            profile_loading: state.profile_loading,
        }
    }
}
