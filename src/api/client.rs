//! REST client for the agency backend
//!
//! Every request carries the stored bearer token (when there is one), a
//! client version header and a fresh request id. Path parameters are escaped
//! segment by segment, so an email or a route parameter can never reshape the
//! backend URL.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::api::backend::AgencyBackend;
use crate::api::error::ApiError;
use crate::api::models::{LoginRequest, LoginResponse, ModelLookup, ModelRecord};
use crate::auth::store::TokenStore;

const CLIENT_VERSION: &str = "1.0.0";

pub struct ApiClient {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Duration, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;

        tracing::info!("API client initialized with base URL {}", base_url);

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request<I>(&self, method: Method, segments: I) -> RequestBuilder
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let builder = self
            .client
            .request(method, self.endpoint(segments))
            .header("X-Client-Version", CLIENT_VERSION)
            .header("X-Request-ID", Uuid::new_v4().to_string());

        match self.tokens.load() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and fail on a non-success status, leaving the body unread.
    async fn dispatch(&self, builder: RequestBuilder, operation: &str) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("Request failed while {}: {}", operation, e);
            ApiError::from_transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let data = if text.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
            };
            tracing::warn!("Backend returned {} while {}", status, operation);
            return Err(ApiError::from_status(status.as_u16(), data, operation));
        }

        Ok(response)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &str,
    ) -> Result<T, ApiError> {
        self.dispatch(builder, operation)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::from_transport)
    }
}

#[async_trait]
impl AgencyBackend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        tracing::debug!("Posting credentials for {}", email);
        let builder = self
            .request(Method::POST, ["Account", "login"])
            .json(&LoginRequest { email, password });

        match self.send(builder, "login").await {
            Err(ApiError::Http { status: 400, .. }) => {
                Err(ApiError::http(400, "Invalid email or password"))
            }
            other => other,
        }
    }

    async fn get_model(&self, lookup: &ModelLookup) -> Result<ModelRecord, ApiError> {
        let builder = self.request(Method::GET, ["Models".to_string(), lookup.to_string()]);
        self.send(builder, &format!("retrieving model {}", lookup)).await
    }

    async fn list_models(&self) -> Result<Vec<ModelRecord>, ApiError> {
        let builder = self.request(Method::GET, ["Models"]);
        self.send(builder, "retrieving models").await
    }

    async fn update_model(&self, id: i64, body: &Value) -> Result<ModelRecord, ApiError> {
        let builder = self
            .request(Method::PUT, ["Models".to_string(), id.to_string()])
            .json(body);
        self.send(builder, &format!("updating model {}", id)).await
    }

    async fn get_model_jobs(&self, id: i64) -> Result<Vec<Value>, ApiError> {
        let builder = self.request(
            Method::GET,
            ["Models".to_string(), id.to_string(), "jobs".to_string()],
        );
        match self
            .send(builder, &format!("retrieving jobs for model {}", id))
            .await
        {
            Err(ApiError::Http { status: 404, .. }) => Err(ApiError::http(
                404,
                format!("Model with ID {} not found", id),
            )),
            Err(ApiError::Http { status: 401, .. }) => Err(ApiError::http(
                401,
                "You are not authorized to view these jobs",
            )),
            other => other,
        }
    }

    async fn get_model_expenses(&self, model: &str) -> Result<Vec<Value>, ApiError> {
        let builder = self.request(Method::GET, ["Expenses", "model", model]);
        self.send(builder, &format!("retrieving expenses for model {}", model))
            .await
    }

    async fn list_expenses(&self) -> Result<Vec<Value>, ApiError> {
        let builder = self.request(Method::GET, ["Expenses"]);
        self.send(builder, "retrieving expenses").await
    }

    async fn create_expense(&self, body: &Value) -> Result<Value, ApiError> {
        let builder = self.request(Method::POST, ["Expenses"]).json(body);
        self.send(builder, "creating expense").await
    }

    async fn update_expense(&self, id: i64, body: &Value) -> Result<Value, ApiError> {
        let builder = self
            .request(Method::PUT, ["Expenses".to_string(), id.to_string()])
            .json(body);
        self.send(builder, &format!("updating expense {}", id)).await
    }

    async fn delete_expense(&self, id: i64) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, ["Expenses".to_string(), id.to_string()]);
        self.dispatch(builder, &format!("deleting expense {}", id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryTokenStore;
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn client(base: String, store: Arc<dyn TokenStore>) -> ApiClient {
        ApiClient::new(Url::parse(&base).unwrap(), Duration::from_secs(5), store).unwrap()
    }

    #[tokio::test]
    async fn test_login_accepts_both_shapes() {
        let router = Router::new()
            .route(
                "/api/Account/login",
                post(|Json(body): Json<Value>| async move {
                    if body["email"] == "wrapped@x.com" {
                        Json(json!({ "jwt": "h.p.s" }))
                    } else {
                        Json(json!("h.p.s"))
                    }
                }),
            );
        let api = client(serve(router).await, Arc::new(MemoryTokenStore::default()));

        let raw = api.login("raw@x.com", "pw").await.unwrap();
        let wrapped = api.login("wrapped@x.com", "pw").await.unwrap();
        assert_eq!(raw.into_token(), wrapped.into_token());
    }

    #[tokio::test]
    async fn test_login_bad_request_reads_as_bad_credentials() {
        let router = Router::new().route(
            "/api/Account/login",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "message": "nope" }))) }),
        );
        let api = client(serve(router).await, Arc::new(MemoryTokenStore::default()));

        let err = api.login("a@b.com", "wrong").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_bearer_token_and_not_found() {
        let router = Router::new()
            .route(
                "/api/Models",
                get(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    if auth == "Bearer stored.token.value" && headers.contains_key("x-request-id") {
                        Ok(Json(json!([{ "id": 7, "email": "m@x.com" }])))
                    } else {
                        Err(StatusCode::UNAUTHORIZED)
                    }
                }),
            )
            .route(
                "/api/Models/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "7" {
                        Ok(Json(json!({ "id": 7, "email": "m@x.com" })))
                    } else {
                        Err(StatusCode::NOT_FOUND)
                    }
                }),
            );
        let base = serve(router).await;

        let anonymous = client(base.clone(), Arc::new(MemoryTokenStore::default()));
        assert_eq!(anonymous.list_models().await.unwrap_err().status(), Some(401));

        let api = client(base, Arc::new(MemoryTokenStore::with_token("stored.token.value")));
        let models = api.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, 7);

        let found = api.get_model(&ModelLookup::Id(7)).await.unwrap();
        assert!(found.email_matches("M@X.COM"));

        let missing = api
            .get_model(&ModelLookup::Email("m@x.com".into()))
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(
            format!("http://{}/api", addr),
            Arc::new(MemoryTokenStore::default()),
        );
        let err = api.list_expenses().await.unwrap_err();
        assert_eq!(err.status(), Some(0));
        assert_eq!(err.to_string(), "Network error. Please check your connection.");
    }

    #[tokio::test]
    async fn test_path_parameters_are_escaped() {
        let router = Router::new()
            .route(
                "/api/Models/{id}",
                get(|Path(id): Path<String>| async move { Json(json!({ "id": 1, "email": id })) }),
            )
            .route(
                "/api/Expenses/model/{model}",
                get(|Path(model): Path<String>| async move { Json(json!([{ "modelId": model }])) }),
            );
        let api = client(serve(router).await, Arc::new(MemoryTokenStore::default()));

        let record = api
            .get_model(&ModelLookup::Email("a#b?c@x.com".into()))
            .await
            .unwrap();
        assert_eq!(record.email.as_deref(), Some("a#b?c@x.com"));

        let expenses = api.get_model_expenses("%2F..").await.unwrap();
        assert_eq!(expenses[0]["modelId"], json!("%2F.."));
        let expenses = api.get_model_expenses("../Models").await.unwrap();
        assert_eq!(expenses[0]["modelId"], json!("../Models"));
    }

    #[tokio::test]
    async fn test_expense_writes() {
        let router = Router::new()
            .route(
                "/api/Expenses",
                post(|Json(mut body): Json<Value>| async move {
                    body["expenseId"] = json!(12);
                    (StatusCode::CREATED, Json(body))
                }),
            )
            .route(
                "/api/Expenses/{id}",
                axum::routing::put(|Path(id): Path<i64>, Json(mut body): Json<Value>| async move {
                    body["expenseId"] = json!(id);
                    Json(body)
                })
                .delete(|Path(id): Path<i64>| async move {
                    if id == 12 {
                        StatusCode::NO_CONTENT
                    } else {
                        StatusCode::NOT_FOUND
                    }
                }),
            );
        let api = client(serve(router).await, Arc::new(MemoryTokenStore::default()));

        let created = api
            .create_expense(&json!({ "modelId": 7, "amount": 50.0 }))
            .await
            .unwrap();
        assert_eq!(created["expenseId"], json!(12));

        let updated = api.update_expense(12, &json!({ "amount": 60.0 })).await.unwrap();
        assert_eq!(updated["amount"], json!(60.0));

        api.delete_expense(12).await.unwrap();
        let missing = api.delete_expense(13).await.unwrap_err();
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "Resource not found for this deleting expense 13");
    }
}
