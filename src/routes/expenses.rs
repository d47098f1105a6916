use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::auth::SessionSnapshot;
use crate::routes::{JsonReply, backend_failure, denied, failure};
use crate::server::AppState;

/// `GET /api/models/{id}/expenses`: managers, or the model itself.
pub async fn for_model(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
    Path(id): Path<String>,
) -> JsonReply {
    if let Err(e) = snapshot.require_model_access(&id) {
        return denied(e);
    }

    match state.backend.get_model_expenses(&id).await {
        Ok(expenses) => (
            StatusCode::OK,
            Json(json!({
                "expenses": expenses,
                "canModify": snapshot.can_modify_model_expenses(&id),
            })),
        ),
        Err(e) => backend_failure(&e),
    }
}

/// `GET /api/expenses`, behind the manager guard.
pub async fn all(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
) -> JsonReply {
    if let Err(e) = snapshot.require_manager() {
        return denied(e);
    }

    match state.backend.list_expenses().await {
        Ok(expenses) => (StatusCode::OK, Json(json!({ "expenses": expenses }))),
        Err(e) => backend_failure(&e),
    }
}

/// Stamp the owning model onto an expense body. The backend identifies the
/// expense by the URL, so a client supplied `expenseId` is dropped.
fn owned_expense(snapshot: &SessionSnapshot, body: Value) -> Result<Value, JsonReply> {
    let Value::Object(mut fields) = body else {
        return Err(failure(StatusCode::BAD_REQUEST, "Expense must be a JSON object"));
    };
    fields.remove("expenseId");
    fields.insert("modelId".to_string(), json!(snapshot.model_id));
    Ok(Value::Object(fields))
}

/// `POST /api/models/{id}/expenses`: the model itself only.
pub async fn create(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> JsonReply {
    if let Err(e) = snapshot.require_expense_owner(&id) {
        return denied(e);
    }
    let body = match owned_expense(&snapshot, body) {
        Ok(body) => body,
        Err(reply) => return reply,
    };

    match state.backend.create_expense(&body).await {
        Ok(expense) => {
            tracing::info!("Model {} added an expense", id);
            (StatusCode::CREATED, Json(json!({ "expense": expense })))
        }
        Err(e) => backend_failure(&e),
    }
}

/// `PUT /api/models/{id}/expenses/{expense_id}`
pub async fn update(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
    Path((id, expense_id)): Path<(String, i64)>,
    Json(body): Json<Value>,
) -> JsonReply {
    if let Err(e) = snapshot.require_expense_owner(&id) {
        return denied(e);
    }
    let body = match owned_expense(&snapshot, body) {
        Ok(body) => body,
        Err(reply) => return reply,
    };

    match state.backend.update_expense(expense_id, &body).await {
        Ok(expense) => (StatusCode::OK, Json(json!({ "expense": expense }))),
        Err(e) => backend_failure(&e),
    }
}

/// `DELETE /api/models/{id}/expenses/{expense_id}`
pub async fn remove(
    State(state): State<AppState>,
    Extension(snapshot): Extension<SessionSnapshot>,
    Path((id, expense_id)): Path<(String, i64)>,
) -> Result<StatusCode, JsonReply> {
    snapshot.require_expense_owner(&id).map_err(denied)?;

    state
        .backend
        .delete_expense(expense_id)
        .await
        .map_err(|e| backend_failure(&e))?;
    tracing::info!("Model {} deleted expense {}", id, expense_id);
    Ok(StatusCode::NO_CONTENT)
}
