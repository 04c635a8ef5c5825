//! HTTP access to the Instana REST API.

use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Message used for every 404 answer of the API.
pub const ENTITY_NOT_FOUND_MESSAGE: &str =
    "failed to get resource from Instana API. 404 - Resource not found";

/// Minimum spacing between two write requests (5 per second).
pub const WRITE_INTERVAL: Duration = Duration::from_millis(200);

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Low level operations against the Instana REST API.
///
/// Bodies are exchanged as JSON values; `Value::Null` stands for an empty
/// response body.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// `GET {path}`
    async fn get(&self, resource_path: &str) -> Result<Value, ProviderError>;

    /// `GET {path}/{id}`
    async fn get_one(&self, id: &str, resource_path: &str) -> Result<Value, ProviderError>;

    /// `POST {path}` with body.
    async fn post(&self, data: &Value, resource_path: &str) -> Result<Value, ProviderError>;

    /// `POST {path}/{id}` with body.
    async fn post_with_id(
        &self,
        id: &str,
        data: &Value,
        resource_path: &str,
    ) -> Result<Value, ProviderError>;

    /// `PUT {path}/{id}` with body.
    async fn put(&self, id: &str, data: &Value, resource_path: &str)
        -> Result<Value, ProviderError>;

    /// `DELETE {path}/{id}`
    async fn delete(&self, id: &str, resource_path: &str) -> Result<(), ProviderError>;

    /// `POST {path}?{query}` without body.
    async fn post_by_query(
        &self,
        resource_path: &str,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError>;

    /// `PUT {path}/{id}?{query}` without body.
    async fn put_by_query(
        &self,
        resource_path: &str,
        id: &str,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError>;
}

/// [`RestClient`] backed by `reqwest`.
///
/// Write requests (POST, PUT, DELETE) are spaced by [`WRITE_INTERVAL`].
/// Failed requests are reported, never retried.
#[derive(Debug)]
pub struct HttpRestClient {
    client: reqwest::Client,
    base_url: String,
    next_write: Mutex<Option<Instant>>,
}

impl HttpRestClient {
    /// Build a client for `https://{endpoint}` authenticated with `api_token`.
    pub fn new(
        api_token: &str,
        endpoint: &str,
        skip_tls_verification: bool,
    ) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("apiToken {}", api_token)).map_err(|_| {
            ProviderError::Configuration("api_token contains invalid characters".to_string())
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                "terraform-provider-instana/",
                env!("CARGO_PKG_VERSION")
            )),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(skip_tls_verification)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url(endpoint),
            next_write: Mutex::new(None),
        })
    }

    /// The resolved base URL, e.g. `https://tenant.instana.io`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource_path: &str) -> String {
        join_url(&self.base_url, resource_path)
    }

    fn resource_url(&self, resource_path: &str, id: &str) -> String {
        join_url(&self.base_url, &format!("{}/{}", resource_path.trim_end_matches('/'), id))
    }

    async fn throttle_write(&self) {
        let mut next = self.next_write.lock().await;
        if let Some(at) = *next {
            if at > Instant::now() {
                tokio::time::sleep_until(at).await;
            }
        }
        *next = Some(Instant::now() + WRITE_INTERVAL);
    }

    async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError> {
        if method != Method::GET {
            self.throttle_write().await;
        }

        debug!(method = %method, url = %url, "Calling Instana API");
        let mut request = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        info!(method = %method, url = %url, status = status.as_u16(), "Instana API responded");

        interpret_response(status, &text)
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn get(&self, resource_path: &str) -> Result<Value, ProviderError> {
        self.execute(Method::GET, self.url(resource_path), None, &[])
            .await
    }

    async fn get_one(&self, id: &str, resource_path: &str) -> Result<Value, ProviderError> {
        self.execute(Method::GET, self.resource_url(resource_path, id), None, &[])
            .await
    }

    async fn post(&self, data: &Value, resource_path: &str) -> Result<Value, ProviderError> {
        self.execute(Method::POST, self.url(resource_path), Some(data), &[])
            .await
    }

    async fn post_with_id(
        &self,
        id: &str,
        data: &Value,
        resource_path: &str,
    ) -> Result<Value, ProviderError> {
        self.execute(
            Method::POST,
            self.resource_url(resource_path, id),
            Some(data),
            &[],
        )
        .await
    }

    async fn put(
        &self,
        id: &str,
        data: &Value,
        resource_path: &str,
    ) -> Result<Value, ProviderError> {
        self.execute(
            Method::PUT,
            self.resource_url(resource_path, id),
            Some(data),
            &[],
        )
        .await
    }

    async fn delete(&self, id: &str, resource_path: &str) -> Result<(), ProviderError> {
        self.execute(Method::DELETE, self.resource_url(resource_path, id), None, &[])
            .await
            .map(|_| ())
    }

    async fn post_by_query(
        &self,
        resource_path: &str,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError> {
        self.execute(Method::POST, self.url(resource_path), None, query)
            .await
    }

    async fn put_by_query(
        &self,
        resource_path: &str,
        id: &str,
        query: &[(String, String)],
    ) -> Result<Value, ProviderError> {
        self.execute(Method::PUT, self.resource_url(resource_path, id), None, query)
            .await
    }
}

fn base_url(endpoint: &str) -> String {
    let host = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    format!("https://{}", host)
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn interpret_response(status: StatusCode, body: &str) -> Result<Value, ProviderError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(ENTITY_NOT_FOUND_MESSAGE.to_string()));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::PermissionDenied(format!(
            "status code = {}; body = {}",
            status.as_u16(),
            body
        )));
    }
    if !status.is_success() {
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(base_url("tenant.instana.io"), "https://tenant.instana.io");
        assert_eq!(base_url("tenant.instana.io/"), "https://tenant.instana.io");
        assert_eq!(
            base_url("https://tenant.instana.io"),
            "https://tenant.instana.io"
        );
    }

    #[test]
    fn test_join_url_has_no_double_slash() {
        assert_eq!(
            join_url("https://h", "/api/settings/slo"),
            "https://h/api/settings/slo"
        );
        assert_eq!(join_url("https://h", "api"), "https://h/api");
    }

    #[test]
    fn test_client_urls() {
        let client = HttpRestClient::new("token", "tenant.instana.io/", false).unwrap();
        assert_eq!(
            client.resource_url("/api/settings/rbac/roles/", "r1"),
            "https://tenant.instana.io/api/settings/rbac/roles/r1"
        );
    }

    #[test]
    fn test_interpret_not_found() {
        let err = interpret_response(StatusCode::NOT_FOUND, "").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), ENTITY_NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_interpret_errors_and_bodies() {
        assert!(matches!(
            interpret_response(StatusCode::FORBIDDEN, "nope"),
            Err(ProviderError::PermissionDenied(_))
        ));
        assert!(matches!(
            interpret_response(StatusCode::BAD_REQUEST, "bad"),
            Err(ProviderError::Api { status: 400, .. })
        ));
        assert_eq!(interpret_response(StatusCode::NO_CONTENT, "").unwrap(), Value::Null);
        assert_eq!(
            interpret_response(StatusCode::OK, r#"{"id":"1"}"#).unwrap(),
            json!({"id": "1"})
        );
        assert!(matches!(
            interpret_response(StatusCode::OK, "{"),
            Err(ProviderError::Serialization(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_throttling_spaces_requests() {
        let client = HttpRestClient::new("token", "localhost", false).unwrap();
        let start = Instant::now();
        client.throttle_write().await;
        client.throttle_write().await;
        client.throttle_write().await;
        assert!(Instant::now() - start >= WRITE_INTERVAL * 2);
    }
}
