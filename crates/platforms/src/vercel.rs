//! Vercel REST adapter.

use crate::adapter::{
    PlatformAdapter, ProviderClient, authentication_failure, ensure_https, first_error_message,
};
use crate::analytics::PricingModel;
use crate::credentials::Credentials;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentConfig, DeploymentResult, DeploymentStatus, Environment, Platform};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use unrelated_provider_http::{HttpTransport, ProviderRequest};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.vercel.com";

pub const PRICING: PricingModel = PricingModel {
    base_monthly: 20.0,
    per_build_minute: 0.014,
};

const LIST_LIMIT: &str = "100";

#[derive(Clone)]
struct VercelCredentials {
    api_token: String,
    team_id: Option<String>,
}

impl VercelCredentials {
    fn from_credentials(mut raw: Credentials) -> Result<Self> {
        let api_token = raw.take_required(Platform::Vercel, "apiToken")?;
        let team_id = raw.take_optional("teamId");
        raw.finish(Platform::Vercel)?;
        Ok(Self { api_token, team_id })
    }
}

impl fmt::Debug for VercelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VercelCredentials")
            .field("api_token", &"[REDACTED]")
            .field("team_id", &self.team_id)
            .finish()
    }
}

/// Total mapping from Vercel `readyState` / `state` values.
#[must_use]
pub fn map_status(raw: &str) -> DeploymentStatus {
    match raw.to_ascii_uppercase().as_str() {
        "QUEUED" | "INITIALIZING" => DeploymentStatus::Pending,
        "BUILDING" => DeploymentStatus::Building,
        "READY" => DeploymentStatus::Ready,
        "ERROR" => DeploymentStatus::Error,
        "CANCELED" => DeploymentStatus::Canceled,
        _ => DeploymentStatus::Pending,
    }
}

pub struct VercelAdapter {
    client: ProviderClient,
    credentials: RwLock<Option<VercelCredentials>>,
}

impl VercelAdapter {
    #[must_use]
    pub fn new(base_url: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            client: ProviderClient::new(Platform::Vercel, base_url, transport),
            credentials: RwLock::new(None),
        }
    }

    fn credentials(&self) -> Result<VercelCredentials> {
        self.credentials
            .read()
            .clone()
            .filter(|c| !c.api_token.is_empty())
            .ok_or_else(|| DeployError::not_authenticated(Platform::Vercel))
    }

    /// Endpoint URL scoped to `team_id` (when given) plus any extra query pairs.
    fn url(&self, segments: &[&str], team_id: Option<&str>, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.client.endpoint(segments)?;
        if team_id.is_some() || !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            if let Some(team) = team_id {
                pairs.append_pair("teamId", team);
            }
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn call(&self, request: ProviderRequest, creds: &VercelCredentials) -> Result<Value> {
        let secrets = [creds.api_token.as_str()];
        let resp = self
            .client
            .send(request.bearer(creds.api_token.clone()), &secrets)
            .await?;
        if resp.is_success() {
            return Ok(resp.body);
        }
        let message = first_error_message(&resp.body).unwrap_or_else(|| resp.error_summary());
        Err(self.client.error(&format!("{} ({})", message, resp.status), &secrets))
    }

    async fn list(&self, creds: &VercelCredentials, team_id: Option<&str>) -> Result<Vec<DeploymentResult>> {
        let url = self.url(&["v6", "deployments"], team_id, &[("limit", LIST_LIMIT)])?;
        let body = self.call(ProviderRequest::get(url), creds).await?;
        Ok(body
            .get("deployments")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(from_listing)
            .collect())
    }

    async fn attach_domains(&self, config: &DeploymentConfig, creds: &VercelCredentials) {
        let name = config.project_name.as_str();
        for domain in &config.custom_domains {
            let attached = match self.url(&["v10", "projects", name, "domains"], creds.team_id.as_deref(), &[]) {
                Ok(url) => self
                    .call(ProviderRequest::post_json(url, json!({ "name": domain })), creds)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = attached {
                tracing::warn!(project = name, domain = %domain, error = %e, "failed to attach custom domain");
            }
        }
    }
}

fn target(environment: Environment) -> Option<&'static str> {
    match environment {
        Environment::Production => Some("production"),
        Environment::Staging => Some("staging"),
        Environment::Development => None,
    }
}

fn deploy_body(config: &DeploymentConfig) -> Value {
    let mut body = Map::new();
    body.insert("name".into(), json!(config.project_name.as_str()));
    body.insert("files".into(), json!([]));
    if let Some(t) = target(config.environment) {
        body.insert("target".into(), json!(t));
    }
    let mut settings = Map::new();
    if let Some(cmd) = &config.build_command {
        settings.insert("buildCommand".into(), json!(cmd));
    }
    if let Some(dir) = &config.output_directory {
        settings.insert("outputDirectory".into(), json!(dir));
    }
    if !settings.is_empty() {
        body.insert("projectSettings".into(), Value::Object(settings));
    }
    if !config.environment_variables.is_empty() {
        body.insert("env".into(), json!(config.environment_variables));
    }
    if let Some(region) = &config.region {
        body.insert("regions".into(), json!([region]));
    }
    Value::Object(body)
}

fn millis(v: Option<&Value>) -> Option<DateTime<Utc>> {
    v.and_then(Value::as_i64).and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn build_time(body: &Value) -> Option<u64> {
    let start = body.get("buildingAt").and_then(Value::as_i64)?;
    let end = body.get("ready").and_then(Value::as_i64)?;
    u64::try_from(end - start).ok()
}

fn snapshot(body: &Value, id_field: &str, state_fields: &[&str], created_field: &str) -> Option<DeploymentResult> {
    let id = body.get(id_field).and_then(Value::as_str)?;
    let status = state_fields
        .iter()
        .find_map(|f| body.get(*f).and_then(Value::as_str))
        .map_or(DeploymentStatus::Pending, map_status);
    Some(DeploymentResult {
        platform: Platform::Vercel,
        deployment_id: id.to_string(),
        url: body
            .get("url")
            .and_then(Value::as_str)
            .map(ensure_https)
            .unwrap_or_default(),
        status,
        project: body.get("name").and_then(Value::as_str).map(str::to_string),
        build_time_ms: build_time(body),
        cost: None,
        region: body
            .get("regions")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .and_then(Value::as_str)
            .map(str::to_string),
        timestamp: millis(body.get(created_field)).unwrap_or_else(Utc::now),
    })
}

fn from_detail(body: &Value) -> Option<DeploymentResult> {
    snapshot(body, "id", &["readyState", "status"], "createdAt")
}

fn from_listing(body: &Value) -> Option<DeploymentResult> {
    snapshot(body, "uid", &["state", "readyState"], "created")
}

#[async_trait]
impl PlatformAdapter for VercelAdapter {
    fn platform(&self) -> Platform {
        Platform::Vercel
    }

    fn pricing(&self) -> PricingModel {
        PRICING
    }

    fn is_authenticated(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<bool> {
        let secrets = credentials.secret_values();
        let creds = VercelCredentials::from_credentials(credentials)?;
        let url = self.url(&["v2", "user"], creds.team_id.as_deref(), &[])?;
        let resp = self
            .client
            .send(ProviderRequest::get(url).bearer(creds.api_token.clone()), &secrets)
            .await
            .map_err(|e| authentication_failure(Platform::Vercel, e))?;
        if !resp.is_success() || !resp.body.is_object() {
            let message = first_error_message(&resp.body).unwrap_or_else(|| resp.error_summary());
            return Err(authentication_failure(
                Platform::Vercel,
                self.client.error(&message, &secrets),
            ));
        }
        *self.credentials.write() = Some(creds);
        tracing::info!(platform = %Platform::Vercel, "authenticated");
        Ok(true)
    }

    fn logout(&self) {
        *self.credentials.write() = None;
    }

    async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentResult> {
        let creds = self.credentials()?;
        let started = Instant::now();
        let url = self.url(&["v13", "deployments"], creds.team_id.as_deref(), &[])?;
        let body = self
            .call(ProviderRequest::post_json(url, deploy_body(config)), &creds)
            .await?;
        let mut result = from_detail(&body)
            .ok_or_else(|| DeployError::provider(Platform::Vercel, "deployment response has no id"))?;
        self.attach_domains(config, &creds).await;

        result.project = Some(config.project_name.to_string());
        result.build_time_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        if config.region.is_some() {
            result.region.clone_from(&config.region);
        }
        Ok(result)
    }

    async fn get_status(&self, deployment_id: &str) -> Result<DeploymentResult> {
        let creds = self.credentials()?;
        let url = self.url(&["v13", "deployments", deployment_id], creds.team_id.as_deref(), &[])?;
        let body = self.call(ProviderRequest::get(url), &creds).await?;
        from_detail(&body)
            .ok_or_else(|| DeployError::provider(Platform::Vercel, "deployment response has no id"))
    }

    async fn get_deployments(&self) -> Result<Vec<DeploymentResult>> {
        let creds = self.credentials()?;
        self.list(&creds, creds.team_id.as_deref()).await
    }

    async fn share_with_team(&self, deployment_id: &str, team_id: &str) -> Result<bool> {
        let creds = self.credentials()?;
        let url = self.url(&["v13", "deployments", deployment_id], Some(team_id), &[])?;
        let secrets = [creds.api_token.as_str()];
        let resp = self
            .client
            .send(ProviderRequest::get(url).bearer(creds.api_token.clone()), &secrets)
            .await?;
        match resp.status {
            s if (200..300).contains(&s) => Ok(true),
            403 | 404 => Ok(false),
            _ => Err(self.client.error(&resp.error_summary(), &secrets)),
        }
    }

    async fn get_team_deployments(&self, team_id: &str) -> Result<Vec<DeploymentResult>> {
        let creds = self.credentials()?;
        self.list(&creds, Some(team_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unrelated_provider_http::Method;
    use unrelated_test_support::RecordingTransport;

    fn adapter(transport: &RecordingTransport) -> VercelAdapter {
        VercelAdapter::new(Url::parse("https://vercel.test").expect("url"), Arc::new(transport.clone()))
    }

    fn creds(extra: Value) -> Credentials {
        let mut v = json!({"apiToken": "vc-token-abc"});
        if let (Some(obj), Some(more)) = (v.as_object_mut(), extra.as_object()) {
            obj.extend(more.clone());
        }
        Credentials::from_json(&v).expect("creds")
    }

    fn authed() -> RecordingTransport {
        RecordingTransport::new().on(Method::GET, "/v2/user", 200, json!({"user": {"id": "u1"}}))
    }

    #[test]
    fn status_mapping_is_total_and_case_insensitive() {
        assert_eq!(map_status("queued"), DeploymentStatus::Pending);
        assert_eq!(map_status("INITIALIZING"), DeploymentStatus::Pending);
        assert_eq!(map_status("Building"), DeploymentStatus::Building);
        assert_eq!(map_status("READY"), DeploymentStatus::Ready);
        assert_eq!(map_status("error"), DeploymentStatus::Error);
        assert_eq!(map_status("CANCELED"), DeploymentStatus::Canceled);
        assert_eq!(map_status("SOMETHING_NEW"), DeploymentStatus::Pending);
    }

    #[test]
    fn deploy_body_maps_environment_to_target() {
        let mut config = DeploymentConfig::new(Platform::Vercel, "web").expect("config");
        config.build_command = Some("npm run build".into());
        assert_eq!(deploy_body(&config)["target"], "production");
        assert_eq!(deploy_body(&config)["projectSettings"]["buildCommand"], "npm run build");

        config.environment = Environment::Development;
        assert!(deploy_body(&config).get("target").is_none());
    }

    #[tokio::test]
    async fn unauthenticated_calls_never_reach_the_provider() {
        let transport = RecordingTransport::new();
        let vc = adapter(&transport);
        assert!(vc.get_deployments().await.is_err());
        assert!(vc.get_status("dpl_1").await.is_err());
        assert!(vc.share_with_team("dpl_1", "team_1").await.is_err());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn deploy_then_status() {
        let transport = authed()
            .on(
                Method::POST,
                "/v13/deployments",
                200,
                json!({"id": "dpl_1", "url": "web-abc.vercel.app", "readyState": "QUEUED", "name": "web"}),
            )
            .on(
                Method::GET,
                "/v13/deployments/dpl_1",
                200,
                json!({"id": "dpl_1", "url": "web-abc.vercel.app", "readyState": "READY", "name": "web",
                       "createdAt": 1_700_000_000_000_i64, "buildingAt": 1_700_000_001_000_i64, "ready": 1_700_000_031_000_i64}),
            );
        let vc = adapter(&transport);
        vc.authenticate(creds(json!({}))).await.expect("auth");

        let deployed = vc
            .deploy(&DeploymentConfig::new(Platform::Vercel, "web").expect("config"))
            .await
            .expect("deploy");
        assert_eq!(deployed.deployment_id, "dpl_1");
        assert_eq!(deployed.url, "https://web-abc.vercel.app");
        assert_eq!(deployed.status, DeploymentStatus::Pending);

        let a = vc.get_status("dpl_1").await.expect("status");
        let b = vc.get_status("dpl_1").await.expect("status");
        assert_eq!(a.status, DeploymentStatus::Ready);
        assert_eq!((a.status, &a.deployment_id), (b.status, &b.deployment_id));
        assert_eq!(a.build_time_ms, Some(30_000));
    }

    #[tokio::test]
    async fn team_id_scopes_every_call() {
        let transport = authed().on(
            Method::GET,
            "/v6/deployments",
            200,
            json!({"deployments": [{"uid": "dpl_9", "name": "web", "url": "w.vercel.app", "state": "BUILDING", "created": 1_700_000_000_000_i64}]}),
        );
        let vc = adapter(&transport);
        vc.authenticate(creds(json!({"teamId": "team_42"}))).await.expect("auth");

        let listed = vc.get_deployments().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, DeploymentStatus::Building);

        for req in transport.requests() {
            assert!(req.url.query().unwrap_or_default().contains("teamId=team_42"), "{req:?}");
        }
    }

    #[tokio::test]
    async fn share_reports_visibility_in_team_scope() {
        let transport = authed()
            .on(Method::GET, "/v13/deployments/dpl_1", 200, json!({"id": "dpl_1"}))
            .on(Method::GET, "/v13/deployments/dpl_2", 404, json!({"error": {"message": "not found"}}));
        let vc = adapter(&transport);
        vc.authenticate(creds(json!({}))).await.expect("auth");

        assert!(vc.share_with_team("dpl_1", "team_1").await.expect("share"));
        assert!(!vc.share_with_team("dpl_2", "team_1").await.expect("share"));
    }

    #[tokio::test]
    async fn rejected_token_is_an_authentication_error() {
        let transport = RecordingTransport::new().on(
            Method::GET,
            "/v2/user",
            403,
            json!({"error": {"code": "forbidden", "message": "Not authorized: vc-token-abc"}}),
        );
        let vc = adapter(&transport);
        let err = vc.authenticate(creds(json!({}))).await.unwrap_err();
        assert!(matches!(err, DeployError::Authentication { platform: Platform::Vercel, .. }));
        assert!(!err.to_string().contains("vc-token-abc"));
        assert!(!vc.is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_credentials() {
        let vc = adapter(&authed());
        vc.authenticate(creds(json!({}))).await.expect("auth");
        vc.logout();
        assert!(!vc.is_authenticated());
    }
}
