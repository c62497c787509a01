//! Verbatim request forwarding to backend collaborators.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;

/// A backend response captured for verbatim relay.
///
/// Status and body are passed through unchanged, 4xx/5xx included — the
/// gateway masks nothing and adds nothing. Only transport-level failures
/// (unreachable, timed out) become a distinct `UpstreamUnavailable`.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let content_type = self
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
        response
    }
}

/// HTTP client for one backend collaborator.
///
/// Every call is single-shot: the gateway performs no retries, since a
/// repeated reserve or invoice call would duplicate a non-idempotent side
/// effect. Retry policy belongs to the caller.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl UpstreamClient {
    /// Creates a client for the collaborator at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Forwards a GET with the given query parameters.
    pub async fn get(
        &self,
        path: &str,
        query: &HashMap<String, String>,
    ) -> Result<UpstreamResponse, GatewayError> {
        let request = self.client.get(self.url(path)).query(query);
        self.execute(request).await
    }

    /// Forwards a POST carrying a JSON body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamResponse, GatewayError> {
        let request = self.client.post(self.url(path)).json(body);
        self.execute(request).await
    }

    /// Forwards a PATCH carrying a JSON body.
    pub async fn patch_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamResponse, GatewayError> {
        let request = self.client.patch(self.url(path)).json(body);
        self.execute(request).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<UpstreamResponse, GatewayError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| GatewayError::UpstreamUnavailable(err.to_string()))?;

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|err| GatewayError::UpstreamUnavailable(err.to_string()))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
