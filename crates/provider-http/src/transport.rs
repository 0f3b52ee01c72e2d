//! Transport seam between adapters and provider APIs.
//!
//! Adapters never touch `reqwest` directly; they go through [`HttpTransport`] so tests can swap in
//! a no-network double and assert on the exact calls an operation made (or did not make).

use crate::redact::{redact_url, sanitize_reqwest_error};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default per-call timeout for provider requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on provider response bodies (8 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProviderHttpError {
    #[error("http transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0}ms")]
    Timeout(u128),
    #[error("response too large: {0}")]
    TooLarge(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, ProviderHttpError>;

impl From<reqwest::Error> for ProviderHttpError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Text { content_type: String, body: String },
}

/// One outbound provider call.
#[derive(Clone)]
pub struct ProviderRequest {
    pub method: Method,
    pub url: Url,
    pub bearer_token: Option<String>,
    pub body: RequestBody,
}

impl ProviderRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            bearer_token: None,
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post_json(url: Url, body: Value) -> Self {
        Self {
            body: RequestBody::Json(body),
            ..Self::new(Method::POST, url)
        }
    }

    #[must_use]
    pub fn put_text(url: Url, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            body: RequestBody::Text {
                content_type: content_type.into(),
                body: body.into(),
            },
            ..Self::new(Method::PUT, url)
        }
    }

    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

// Hand-written so the bearer token never lands in a `{:?}` log line.
impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("method", &self.method)
            .field("url", &redact_url(&self.url))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .field("body", &self.body)
            .finish()
    }
}

/// A provider response with the body decoded as JSON when possible (otherwise a JSON string).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

impl ProviderResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Short human-readable description of a non-2xx response.
    #[must_use]
    pub fn error_summary(&self) -> String {
        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        format!("API returned {} {reason}: {}", self.status, self.body)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request and return the provider's response, whatever its status code.
    ///
    /// # Errors
    ///
    /// Returns an error only when no usable response was received (connect failure, timeout,
    /// oversized body).
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
    max_response_bytes: Option<usize>,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration, max_response_bytes: Option<usize>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("unrelated-deploy-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_response_bytes,
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse> {
        let ProviderRequest {
            method,
            url,
            bearer_token,
            body,
        } = request;

        tracing::debug!(method = %method, url = %redact_url(&url), "provider request");

        let mut builder = self.client.request(method, url).timeout(self.timeout);
        if let Some(token) = bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(v) => builder.json(&v),
            RequestBody::Text { content_type, body } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderHttpError::Timeout(self.timeout.as_millis())
            } else {
                ProviderHttpError::from(e)
            }
        })?;
        let status = response.status().as_u16();
        let bytes = read_response_body_limited_bytes(response, self.max_response_bytes).await?;
        Ok(ProviderResponse {
            status,
            body: decode_body(&bytes),
        })
    }
}

async fn read_response_body_limited_bytes(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>> {
    let Some(max) = max_bytes else {
        let bytes = response.bytes().await?;
        return Ok(bytes.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(ProviderHttpError::TooLarge(format!(
            "{len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(ProviderHttpError::TooLarge(format!(
                "exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => serde_json::from_str(s).unwrap_or_else(|_| json!(s)),
        Err(_) => json!({ "encoding": "binary", "length": bytes.len() }),
    }
}
