use anyhow::Context;
use reqwest::{Client, Method, Request, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::models::ApiEnvelope;

/// Empty query string for GET requests without parameters
pub const NO_QUERY: &[(&str, &str)] = &[];

/// HTTP client for the event planner API
///
/// Knows the base URL and how to turn responses into `ClientError`s.
/// It never looks at session state; auth is layered on top by
/// [`AuthPipeline`](crate::auth::AuthPipeline).
#[derive(Clone)]
pub struct ApiClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Base URL every path is appended to, always ending in '/'
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        base_url: &str,
        max_connections: usize,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .user_agent(concat!("event-planner-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Self::with_client(client, base_url)
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: &str) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path such as `/tasks/42` against the base URL
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Internal(format!("Invalid path {}: {}", path, e)))
    }

    fn build<F>(&self, method: Method, path: &str, f: F) -> Result<Request>
    where
        F: FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        let url = self.url(path)?;
        f(self.client.request(method, url))
            .build()
            .map_err(|e| ClientError::Internal(format!("Failed to build request: {}", e)))
    }

    // === Request builders (undecorated) ===

    pub fn build_get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Request> {
        self.build(Method::GET, path, |b| b.query(query))
    }

    pub fn build_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Request> {
        self.build(Method::POST, path, |b| b.json(body))
    }

    pub fn build_put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Request> {
        self.build(Method::PUT, path, |b| b.json(body))
    }

    pub fn build_delete(&self, path: &str) -> Result<Request> {
        self.build(Method::DELETE, path, |b| b)
    }

    // === Unauthenticated verbs ===

    pub async fn get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Response> {
        self.send(self.build_get(path, query)?).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.build_post(path, body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        self.send(self.build_put(path, body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send(self.build_delete(path)?).await
    }

    /// Transmit a request
    ///
    /// 2xx responses are returned as-is. Anything else becomes
    /// `ClientError::HttpStatus` carrying the status and response body.
    pub async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = ClientError::from_transport(&e);
                tracing::warn!(
                    error = %e,
                    error_debug = ?e,
                    url = %url,
                    "HTTP request error"
                );
                return Err(err);
            }
        };

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 {
            tracing::warn!(url = %url, "Request rejected with 401");
        } else {
            tracing::error!(
                status = status.as_u16(),
                url = %url,
                response_body = %body,
                "HTTP request failed with error response"
            );
        }

        Err(ClientError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

/// Decode the `data` field of a successful envelope
pub async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_transport(&e))?;
    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes)?;

    if !envelope.success {
        return Err(ClientError::Api {
            message: envelope
                .message
                .unwrap_or_else(|| "Request was not successful".to_string()),
        });
    }

    envelope
        .data
        .ok_or_else(|| ClientError::Decode("Response does not contain data".to_string()))
}

/// Check an envelope without a payload, returning its message
pub async fn read_ack(response: Response) -> Result<Option<String>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_transport(&e))?;
    let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_slice(&bytes)?;

    if !envelope.success {
        return Err(ClientError::Api {
            message: envelope
                .message
                .unwrap_or_else(|| "Request was not successful".to_string()),
        });
    }

    Ok(envelope.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/api", 4, 5, 5).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            client.url("/tasks/42").unwrap().as_str(),
            "http://localhost:5000/api/tasks/42"
        );
        assert_eq!(
            client.url("tasks").unwrap().as_str(),
            "http://localhost:5000/api/tasks"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url", 4, 5, 5).is_err());
    }

    #[test]
    fn test_build_get_serializes_query() {
        let client = ApiClient::new("http://localhost:5000/api", 4, 5, 5).unwrap();
        let req = client
            .build_get("/users", &[("search", "ada lovelace")])
            .unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.url().query(), Some("search=ada+lovelace"));
        assert!(req.headers().get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tasks")
            .match_body(Matcher::Json(json!({"title": "Book venue"})))
            .with_status(201)
            .with_body(r#"{"success": true, "data": {"ok": true}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url()), 4, 5, 5).unwrap();
        let response = client
            .post("/tasks", &json!({"title": "Book venue"}))
            .await
            .unwrap();
        let data: serde_json::Value = read_data(response).await.unwrap();

        mock.assert_async().await;
        assert_eq!(data, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tasks/9")
            .with_status(404)
            .with_body("Task not found")
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url()), 4, 5, 5).unwrap();
        let err = client.get("/tasks/9", NO_QUERY).await.unwrap_err();

        assert_eq!(
            err,
            ClientError::HttpStatus {
                status: 404,
                body: "Task not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on port 9 of localhost
        let client = ApiClient::new("http://127.0.0.1:9/api", 4, 1, 1).unwrap();
        let err = client.delete("/tasks/1").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_envelope_failure_maps_to_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/rsvps/1")
            .with_status(200)
            .with_body(r#"{"success": false, "message": "Event is full"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url()), 4, 5, 5).unwrap();
        let response = client.put("/rsvps/1", &json!({})).await.unwrap();
        let err = read_data::<serde_json::Value>(response).await.unwrap_err();

        assert_eq!(
            err,
            ClientError::Api {
                message: "Event is full".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_read_ack_returns_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/forgot-password")
            .with_status(200)
            .with_body(r#"{"success": true, "message": "Reset email sent"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&format!("{}/api", server.url()), 4, 5, 5).unwrap();
        let response = client
            .post("/auth/forgot-password", &json!({"email": "a@b.c"}))
            .await
            .unwrap();

        assert_eq!(
            read_ack(response).await.unwrap().as_deref(),
            Some("Reset email sent")
        );
    }
}
