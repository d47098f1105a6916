use async_trait::async_trait;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::models::{LoginResponse, ModelLookup, ModelRecord};

/// The remote agency REST API as seen by the session layer and the routes.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait AgencyBackend: Send + Sync {
    /// `POST /Account/login`
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// `GET /Models/{id}`; 404 when no such model exists.
    async fn get_model(&self, lookup: &ModelLookup) -> Result<ModelRecord, ApiError>;

    /// `GET /Models`
    async fn list_models(&self) -> Result<Vec<ModelRecord>, ApiError>;

    /// `PUT /Models/{id}`
    async fn update_model(&self, id: i64, body: &Value) -> Result<ModelRecord, ApiError>;

    /// `GET /Models/{id}/jobs`
    async fn get_model_jobs(&self, id: i64) -> Result<Vec<Value>, ApiError>;

    /// `GET /Expenses/model/{id}`
    async fn get_model_expenses(&self, model: &str) -> Result<Vec<Value>, ApiError>;

    /// `GET /Expenses`, manager only on the backend side.
    async fn list_expenses(&self) -> Result<Vec<Value>, ApiError>;

    /// `POST /Expenses`; the body names the owning model.
    async fn create_expense(&self, body: &Value) -> Result<Value, ApiError>;

    /// `PUT /Expenses/{id}`
    async fn update_expense(&self, id: i64, body: &Value) -> Result<Value, ApiError>;

    /// `DELETE /Expenses/{id}`
    async fn delete_expense(&self, id: i64) -> Result<(), ApiError>;
}
