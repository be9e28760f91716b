//! The HTTP client seam.
//!
//! The engine only ever sees [`HttpClient`], an already-authenticated
//! request capability. [`ReqwestClient`] is the production implementation;
//! tests substitute an in-memory mock.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tabula_core::QueryError;
use tracing::debug;

/// Request method for a remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A completed HTTP exchange: status plus raw body text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An authenticated HTTP capability.
///
/// Implementations own base URL and credentials; callers pass a relative
/// path. Transport failures map to `RemoteRequest` with `status: None`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(String, String)],
        json_body: Option<&serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, QueryError>;
}

/// Production [`HttpClient`] backed by `reqwest`.
#[derive(Debug)]
pub struct ReqwestClient {
    base_url: url::Url,
    headers: BTreeMap<String, String>,
    client: reqwest::Client,
}

impl ReqwestClient {
    /// `base_url` must end where relative endpoint paths begin; a trailing
    /// slash is appended if missing so `Url::join` keeps the last segment.
    pub fn new(base_url: &str, headers: BTreeMap<String, String>) -> Result<Self, QueryError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = url::Url::parse(&normalized).map_err(|e| QueryError::RemoteRequest {
            status: None,
            body: format!("invalid base url '{}': {}", base_url, e),
        })?;
        Ok(Self {
            base_url,
            headers,
            client: reqwest::Client::new(),
        })
    }

    /// A client sending `Authorization: <token>` on every request.
    pub fn with_token(base_url: &str, token: &str) -> Result<Self, QueryError> {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), token.to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self::new(base_url, headers)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &[(String, String)],
        json_body: Option<&serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, QueryError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| QueryError::RemoteRequest {
                status: None,
                body: format!("invalid endpoint path '{}': {}", path, e),
            })?;

        let mut request = match method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
        };
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(body) = json_body {
            request = request.json(body);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        debug!("{:?} {} ({} params)", method, url, params.len());

        let response = request.send().await.map_err(|e| QueryError::RemoteRequest {
            status: None,
            body: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| QueryError::RemoteRequest {
            status: Some(status),
            body: format!("failed to read response body: {}", e),
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let client = ReqwestClient::with_token("https://svc.example.com/org/tenant", "tok").unwrap();
        let url = client.base_url.join("api/Entity").unwrap();
        assert_eq!(url.as_str(), "https://svc.example.com/org/tenant/api/Entity");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ReqwestClient::with_token("not a url", "tok").unwrap_err();
        assert!(matches!(err, QueryError::RemoteRequest { status: None, .. }));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse { status: 200, body: String::new() }.is_success());
        assert!(HttpResponse { status: 204, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 404, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 500, body: String::new() }.is_success());
    }
}
