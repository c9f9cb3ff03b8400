//! Transport primitive: one HTTP exchange with the upstream API.
//!
//! The pipeline only sees [`Upstream`], so retry and classification logic can
//! be exercised without a network.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::{ApiError, ApiResult};

/// Default timeout applied by [`ReqwestUpstream`] to every exchange.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP methods used against the Apple Music API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Delete,
}

impl Method {
    /// Only reads are idempotent enough to cache.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Get)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully prepared outbound request.
#[derive(Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

/// Header values carry credentials, so only their names are printed.
impl std::fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("UpstreamRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &names)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl UpstreamRequest {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw upstream answer.
#[derive(Debug, Clone, Default)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = body.to_string().into_bytes();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a single HTTP request. Implementations must not retry.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> ApiResult<UpstreamResponse>;
}

/// [`Upstream`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new() -> ApiResult<Self> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apple-music-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for ReqwestUpstream {
    async fn send(&self, request: UpstreamRequest) -> ApiResult<UpstreamResponse> {
        debug!("{} {}", request.method.as_str(), request.url);

        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Transport("Request timed out".to_string())
            } else if e.is_connect() {
                ApiError::Transport("Connection failed".to_string())
            } else {
                ApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("Failed to read response body: {e}")))?
            .to_vec();

        debug!("Upstream answered {} ({} bytes)", status, body.len());
        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{DELETE, GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn request(method: Method, url: String) -> UpstreamRequest {
        UpstreamRequest {
            method,
            url,
            headers: vec![("Authorization".to_string(), "Bearer dev".to_string())],
            body: None,
        }
    }

    #[tokio::test]
    async fn test_get_carries_headers_and_returns_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1/catalog/us/search")
                    .query_param("term", "daft")
                    .header("Authorization", "Bearer dev");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({ "results": {} }));
            })
            .await;

        let upstream = ReqwestUpstream::new().unwrap();
        let url = format!("{}/v1/catalog/us/search?term=daft", server.base_url());
        let response = upstream.send(request(Method::Get, url)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "results": {} }));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/me/library/playlists")
                    .json_body(json!({ "attributes": { "name": "Mix" } }));
                then.status(201).json_body(json!({ "data": [] }));
            })
            .await;

        let upstream = ReqwestUpstream::new().unwrap();
        let mut req = request(
            Method::Post,
            format!("{}/v1/me/library/playlists", server.base_url()),
        );
        req.body = Some(json!({ "attributes": { "name": "Mix" } }));
        let response = upstream.send(req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn test_status_and_headers_are_passed_through() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/me/library/playlists/p.1/tracks");
                then.status(429).header("Retry-After", "3");
            })
            .await;

        let upstream = ReqwestUpstream::new().unwrap();
        let url = format!("{}/v1/me/library/playlists/p.1/tracks", server.base_url());
        let response = upstream.send(request(Method::Delete, url)).await.unwrap();

        assert_eq!(response.status, 429);
        assert_eq!(response.header("Retry-After"), Some("3"));
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let upstream = ReqwestUpstream::with_timeout(Duration::from_secs(2)).unwrap();
        // Port 9 (discard) on localhost is expected to refuse connections.
        let result = upstream
            .send(request(Method::Get, "http://127.0.0.1:9/v1".to_string()))
            .await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[test]
    fn test_request_debug_hides_header_values() {
        let req = request(Method::Get, "https://example.test".to_string());
        let debug = format!("{:?}", req);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("Bearer dev"));
        assert_eq!(req.header("authorization"), Some("Bearer dev"));
    }

    #[test]
    fn test_method_is_read() {
        assert!(Method::Get.is_read());
        assert!(!Method::Post.is_read());
        assert!(!Method::Delete.is_read());
        assert_eq!(Method::default(), Method::Get);
    }
}
