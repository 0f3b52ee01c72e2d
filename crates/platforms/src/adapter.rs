//! The uniform adapter contract plus the HTTP helper every adapter builds on.

use crate::analytics::{self, PricingModel};
use crate::credentials::Credentials;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentConfig, DeploymentResult, Platform, PlatformAnalytics};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use unrelated_provider_http::redact::{redact_secrets, redact_url};
use unrelated_provider_http::{HttpTransport, ProviderRequest, ProviderResponse};
use url::Url;

/// One deployment platform behind the uniform contract.
///
/// Implementations own their credential state. Callers normally go through
/// [`crate::registry::AdapterHandle`], which adds the authentication gate, per-adapter call
/// serialization and the failure policy from [`crate::policy`].
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn pricing(&self) -> PricingModel;

    /// True iff authentication succeeded and every required credential field is non-empty.
    fn is_authenticated(&self) -> bool;

    /// Verify `credentials` against the provider and keep them on success.
    async fn authenticate(&self, credentials: Credentials) -> Result<bool>;

    /// Drop stored credentials.
    fn logout(&self);

    async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentResult>;

    async fn get_status(&self, deployment_id: &str) -> Result<DeploymentResult>;

    async fn get_deployments(&self) -> Result<Vec<DeploymentResult>>;

    async fn get_cost(&self, deployment_id: &str) -> Result<f64> {
        let snapshot = self.get_status(deployment_id).await?;
        Ok(self.pricing().price(&snapshot))
    }

    async fn get_analytics(&self, project_name: &str) -> Result<PlatformAnalytics> {
        let deployments = self.get_deployments().await?;
        Ok(analytics::aggregate(
            self.platform(),
            project_name,
            &deployments,
            self.pricing(),
        ))
    }

    /// Platforms without team semantics report "not shared".
    async fn share_with_team(&self, _deployment_id: &str, _team_id: &str) -> Result<bool> {
        Ok(false)
    }

    /// Platforms without team semantics return the caller's own deployments.
    async fn get_team_deployments(&self, _team_id: &str) -> Result<Vec<DeploymentResult>> {
        self.get_deployments().await
    }
}

/// Base URL + transport for one provider, with error mapping and secret redaction.
#[derive(Clone)]
pub struct ProviderClient {
    platform: Platform,
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
}

impl ProviderClient {
    #[must_use]
    pub fn new(platform: Platform, base_url: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            platform,
            base_url,
            transport,
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Base URL with `segments` appended (each one percent-encoded).
    ///
    /// # Errors
    ///
    /// Returns a provider error if the base URL cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DeployError::provider(
                    self.platform,
                    format!("base URL '{}' cannot be a base", redact_url(&self.base_url)),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// The base URL itself (GraphQL endpoints).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send a request. Transport failures become provider errors; the status code is left for
    /// the caller to interpret.
    ///
    /// # Errors
    ///
    /// Returns a provider error (with `secrets` redacted) if no response was received.
    pub async fn send<S: AsRef<str>>(
        &self,
        request: ProviderRequest,
        secrets: &[S],
    ) -> Result<ProviderResponse> {
        self.transport
            .send(request)
            .await
            .map_err(|e| self.error(&e.to_string(), secrets))
    }

    /// Send a request and require a 2xx status.
    ///
    /// # Errors
    ///
    /// Returns a provider error for transport failures and non-2xx responses.
    pub async fn send_ok<S: AsRef<str>>(
        &self,
        request: ProviderRequest,
        secrets: &[S],
    ) -> Result<Value> {
        let resp = self.send(request, secrets).await?;
        if resp.is_success() {
            Ok(resp.body)
        } else {
            Err(self.error(&resp.error_summary(), secrets))
        }
    }

    /// Provider error with `secrets` redacted from `message`.
    pub fn error<S: AsRef<str>>(&self, message: &str, secrets: &[S]) -> DeployError {
        DeployError::provider(self.platform, redact_secrets(message, secrets))
    }
}

/// Re-label a failed verification call as an authentication error for `platform`.
///
/// The provider message is kept (callers have already redacted it); validation errors pass
/// through untouched.
#[must_use]
pub fn authentication_failure(platform: Platform, error: DeployError) -> DeployError {
    match error {
        DeployError::ProviderRequest { message, .. } => DeployError::authentication(platform, message),
        other => other,
    }
}

/// First `errors[].message` (REST or GraphQL style), if any.
#[must_use]
pub fn first_error_message(body: &Value) -> Option<String> {
    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errs| errs.first())
        .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.get("message").and_then(Value::as_str).or_else(|| e.as_str()))
        })
        .map(str::to_string)
}

/// Prefix `https://` onto provider URLs that come back bare (`my-app.vercel.app`).
#[must_use]
pub fn ensure_https(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unrelated_test_support::RecordingTransport;

    #[test]
    fn endpoint_appends_encoded_segments() {
        let client = ProviderClient::new(
            Platform::Cloudflare,
            Url::parse("https://api.example.com/client/v4/").expect("url"),
            Arc::new(RecordingTransport::new()),
        );
        let url = client.endpoint(&["accounts", "a b", "workers"]).expect("endpoint");
        assert_eq!(url.as_str(), "https://api.example.com/client/v4/accounts/a%20b/workers");
    }

    #[test]
    fn first_error_message_handles_rest_and_graphql_shapes() {
        assert_eq!(
            first_error_message(&json!({"errors": [{"code": 1, "message": "bad"}]})).as_deref(),
            Some("bad")
        );
        assert_eq!(
            first_error_message(&json!({"error": {"message": "nope"}})).as_deref(),
            Some("nope")
        );
        assert_eq!(first_error_message(&json!({"errors": []})), None);
    }

    #[test]
    fn ensure_https_only_prefixes_bare_hosts() {
        assert_eq!(ensure_https("x.vercel.app"), "https://x.vercel.app");
        assert_eq!(ensure_https("http://localhost:1"), "http://localhost:1");
    }

    #[tokio::test]
    async fn non_success_responses_are_redacted_provider_errors() {
        let transport = RecordingTransport::new().on(
            unrelated_provider_http::Method::GET,
            "/v2/user",
            401,
            json!({"error": {"message": "token tok_secret_1 is invalid"}}),
        );
        let client = ProviderClient::new(
            Platform::Vercel,
            Url::parse("https://api.example.com").expect("url"),
            Arc::new(transport),
        );
        let url = client.endpoint(&["v2", "user"]).expect("endpoint");
        let err = client
            .send_ok(ProviderRequest::get(url), &["tok_secret_1"])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(!msg.contains("tok_secret_1"));
    }
}
