//! Shared fixtures for unit tests: token minting and an in-memory backend.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::api::models::{LoginResponse, ModelLookup, ModelRecord};
use crate::api::{AgencyBackend, ApiError};

/// Sign `claims` as an HS256 token. The console never checks the signature,
/// so the secret is arbitrary.
pub fn mint_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test_secret"),
    )
    .unwrap()
}

pub fn future_exp() -> i64 {
    (Utc::now() + Duration::hours(1)).timestamp()
}

pub fn expired_exp() -> i64 {
    (Utc::now() - Duration::hours(1)).timestamp()
}

pub fn model(id: i64, email: &str) -> ModelRecord {
    ModelRecord {
        id,
        email: Some(email.to_string()),
        first_name: None,
        last_name: None,
        extra: Map::new(),
    }
}

pub enum LoginScript {
    Raw(String),
    Wrapped(String),
    Body(Value),
    Fail(u16, String),
}

/// Backend double holding a model table in memory.
pub struct FakeBackend {
    models: Mutex<Vec<ModelRecord>>,
    login: Mutex<LoginScript>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    get_model_calls: AtomicUsize,
    list_models_calls: AtomicUsize,
    update_calls: AtomicUsize,
    jobs_calls: AtomicUsize,
    expense_writes: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::with_models(Vec::new())
    }
}

impl FakeBackend {
    pub fn with_models(models: Vec<ModelRecord>) -> Self {
        Self {
            models: Mutex::new(models),
            login: Mutex::new(LoginScript::Fail(400, "Invalid email or password".into())),
            gate: Mutex::new(None),
            get_model_calls: AtomicUsize::new(0),
            list_models_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            jobs_calls: AtomicUsize::new(0),
            expense_writes: AtomicUsize::new(0),
        }
    }

    pub fn script_login(&self, script: LoginScript) {
        *self.login.lock() = script;
    }

    pub fn add_model(&self, record: ModelRecord) {
        self.models.lock().push(record);
    }

    /// Make profile reads, profile updates and job listings block until
    /// [`release_requests`](Self::release_requests). Call counters move before
    /// the wait, so tests can tell when a request is parked.
    pub fn hold_requests(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_requests(&self) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn get_model_calls(&self) -> usize {
        self.get_model_calls.load(Ordering::SeqCst)
    }

    pub fn list_models_calls(&self) -> usize {
        self.list_models_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn jobs_calls(&self) -> usize {
        self.jobs_calls.load(Ordering::SeqCst)
    }

    pub fn expense_writes(&self) -> usize {
        self.expense_writes.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
    }

    fn find(&self, id: i64) -> Option<ModelRecord> {
        self.models.lock().iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl AgencyBackend for FakeBackend {
    async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        match &*self.login.lock() {
            LoginScript::Raw(token) => Ok(LoginResponse::Token(token.clone())),
            LoginScript::Wrapped(token) => Ok(LoginResponse::Wrapped { jwt: token.clone() }),
            LoginScript::Body(body) => Ok(LoginResponse::Other(body.clone())),
            LoginScript::Fail(status, message) => Err(ApiError::http(*status, message.clone())),
        }
    }

    async fn get_model(&self, lookup: &ModelLookup) -> Result<ModelRecord, ApiError> {
        self.get_model_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        let found = match lookup {
            ModelLookup::Id(id) => self.find(*id),
            ModelLookup::Email(_) => None,
        };
        found.ok_or_else(|| ApiError::from_status(404, None, &format!("retrieving model {}", lookup)))
    }

    async fn list_models(&self) -> Result<Vec<ModelRecord>, ApiError> {
        self.list_models_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.models.lock().clone())
    }

    async fn update_model(&self, id: i64, body: &Value) -> Result<ModelRecord, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        let mut record: ModelRecord = serde_json::from_value(body.clone())
            .map_err(|e| ApiError::http(400, e.to_string()))?;
        record.id = id;

        let mut models = self.models.lock();
        models.retain(|m| m.id != id);
        models.push(record.clone());
        Ok(record)
    }

    async fn get_model_jobs(&self, id: i64) -> Result<Vec<Value>, ApiError> {
        self.jobs_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        match self.find(id) {
            Some(_) => Ok(vec![
                json!({ "jobId": 1, "customer": "Vogue" }),
                json!({ "jobId": 2, "customer": "Elle" }),
            ]),
            None => Err(ApiError::http(404, format!("Model with ID {} not found", id))),
        }
    }

    async fn get_model_expenses(&self, model: &str) -> Result<Vec<Value>, ApiError> {
        Ok(vec![json!({ "expenseId": 1, "modelId": model, "amount": 120.5 })])
    }

    async fn list_expenses(&self) -> Result<Vec<Value>, ApiError> {
        Ok(vec![
            json!({ "expenseId": 1, "modelId": 7, "amount": 120.5 }),
            json!({ "expenseId": 2, "modelId": 9, "amount": 40.0 }),
        ])
    }

    async fn create_expense(&self, body: &Value) -> Result<Value, ApiError> {
        self.expense_writes.fetch_add(1, Ordering::SeqCst);
        let mut created = body.clone();
        created["expenseId"] = json!(3);
        Ok(created)
    }

    async fn update_expense(&self, id: i64, body: &Value) -> Result<Value, ApiError> {
        self.expense_writes.fetch_add(1, Ordering::SeqCst);
        let mut updated = body.clone();
        updated["expenseId"] = json!(id);
        Ok(updated)
    }

    async fn delete_expense(&self, id: i64) -> Result<(), ApiError> {
        self.expense_writes.fetch_add(1, Ordering::SeqCst);
        match id {
            1 | 2 => Ok(()),
            _ => Err(ApiError::from_status(404, None, &format!("deleting expense {}", id))),
        }
    }
}
