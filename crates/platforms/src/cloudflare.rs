//! Cloudflare Workers + Pages adapter (`/client/v4` REST API).
//!
//! Cloudflare has no deployment object for Workers scripts, so this adapter issues its own ids
//! (`{name}-{timestamp_ms}-{seq}`) and keeps an explicit id -> edge resource map, bounded to the
//! most recent [`MAX_TRACKED_DEPLOYMENTS`] ids. Ids learned from listing are registered too
//! (script name for Workers, provider id for Pages). Status is binary: the resource exists
//! (ready) or it does not (error).

use crate::adapter::{PlatformAdapter, ProviderClient, authentication_failure, first_error_message};
use crate::analytics::PricingModel;
use crate::credentials::Credentials;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentConfig, DeploymentResult, DeploymentStatus, Environment, Platform};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use unrelated_provider_http::{HttpTransport, ProviderRequest, ProviderResponse};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Oldest ids are forgotten (and report "unknown deployment") past this many.
pub const MAX_TRACKED_DEPLOYMENTS: usize = 1024;

pub const PRICING: PricingModel = PricingModel {
    base_monthly: 5.0,
    per_build_minute: 0.0,
};

#[derive(Clone)]
struct CloudflareCredentials {
    api_token: String,
    account_id: String,
}

impl CloudflareCredentials {
    fn from_credentials(mut raw: Credentials) -> Result<Self> {
        let api_token = raw.take_required(Platform::Cloudflare, "apiToken")?;
        let account_id = raw.take_required(Platform::Cloudflare, "accountId")?;
        raw.finish(Platform::Cloudflare)?;
        Ok(Self {
            api_token,
            account_id,
        })
    }

    fn is_complete(&self) -> bool {
        !self.api_token.is_empty() && !self.account_id.is_empty()
    }

    fn workers_subdomain(&self) -> String {
        self.account_id.chars().take(8).collect()
    }
}

impl fmt::Debug for CloudflareCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareCredentials")
            .field("api_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EdgeResource {
    Script { name: String },
    Pages { project: String, deployment_id: String },
}

impl EdgeResource {
    fn project(&self) -> &str {
        match self {
            EdgeResource::Script { name } => name,
            EdgeResource::Pages { project, .. } => project,
        }
    }
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    resource: EdgeResource,
    created_at: DateTime<Utc>,
    region: Option<String>,
}

/// Id -> record map that forgets the oldest id once full.
#[derive(Debug, Default)]
struct EdgeIndex {
    records: HashMap<String, EdgeRecord>,
    order: VecDeque<String>,
}

impl EdgeIndex {
    fn insert(&mut self, id: &str, record: EdgeRecord) {
        if self.records.insert(id.to_string(), record).is_some() {
            return;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > MAX_TRACKED_DEPLOYMENTS {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
            }
        }
    }

    fn get(&self, id: &str) -> Option<&EdgeRecord> {
        self.records.get(id)
    }

    fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.records.len()
    }
}

pub struct CloudflareAdapter {
    client: ProviderClient,
    credentials: RwLock<Option<CloudflareCredentials>>,
    resources: RwLock<EdgeIndex>,
    sequence: AtomicU64,
}

impl CloudflareAdapter {
    #[must_use]
    pub fn new(base_url: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            client: ProviderClient::new(Platform::Cloudflare, base_url, transport),
            credentials: RwLock::new(None),
            resources: RwLock::new(EdgeIndex::default()),
            sequence: AtomicU64::new(0),
        }
    }

    fn credentials(&self) -> Result<CloudflareCredentials> {
        self.credentials
            .read()
            .clone()
            .filter(CloudflareCredentials::is_complete)
            .ok_or_else(|| DeployError::not_authenticated(Platform::Cloudflare))
    }

    fn account_endpoint(&self, creds: &CloudflareCredentials, rest: &[&str]) -> Result<Url> {
        let mut segments = vec!["accounts", creds.account_id.as_str()];
        segments.extend_from_slice(rest);
        self.client.endpoint(&segments)
    }

    /// Unwrap the `{ success, errors, result }` envelope.
    fn envelope(&self, resp: ProviderResponse, creds: &CloudflareCredentials) -> Result<Value> {
        let flagged_ok = resp.body.get("success").and_then(Value::as_bool) != Some(false);
        if resp.is_success() && flagged_ok {
            return Ok(resp.body.get("result").cloned().unwrap_or(Value::Null));
        }
        let message = first_error_message(&resp.body).unwrap_or_else(|| resp.error_summary());
        Err(self.client.error(&message, &[creds.api_token.as_str()]))
    }

    async fn call(&self, request: ProviderRequest, creds: &CloudflareCredentials) -> Result<Value> {
        let resp = self
            .client
            .send(request.bearer(creds.api_token.clone()), &[creds.api_token.as_str()])
            .await?;
        self.envelope(resp, creds)
    }

    fn workers_url(name: &str, creds: &CloudflareCredentials) -> String {
        format!("https://{name}.{}.workers.dev", creds.workers_subdomain())
    }

    fn pages_url(project: &str, result: &Value) -> String {
        result
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map_or_else(|| format!("https://{project}.pages.dev"), str::to_string)
    }

    fn remember(&self, id: &str, record: EdgeRecord) {
        self.resources.write().insert(id, record);
    }

    async fn deploy_script(
        &self,
        config: &DeploymentConfig,
        creds: &CloudflareCredentials,
    ) -> Result<(EdgeResource, String)> {
        let name = config.project_name.as_str();
        if !config.environment_variables.is_empty() {
            tracing::warn!(
                project = name,
                "environment variables are not attached to Workers script uploads"
            );
        }
        let url = self.account_endpoint(creds, &["workers", "scripts", name])?;
        self.call(
            ProviderRequest::put_text(url, "application/javascript", worker_script(name)),
            creds,
        )
        .await?;
        Ok((
            EdgeResource::Script {
                name: name.to_string(),
            },
            Self::workers_url(name, creds),
        ))
    }

    async fn deploy_pages(
        &self,
        config: &DeploymentConfig,
        creds: &CloudflareCredentials,
    ) -> Result<(EdgeResource, String)> {
        let name = config.project_name.as_str();
        let project_url = self.account_endpoint(creds, &["pages", "projects", name])?;
        let existing = self
            .client
            .send(
                ProviderRequest::get(project_url).bearer(creds.api_token.clone()),
                &[creds.api_token.as_str()],
            )
            .await?;
        if existing.status == 404 {
            let create_url = self.account_endpoint(creds, &["pages", "projects"])?;
            let body = json!({
                "name": name,
                "production_branch": "main",
                "build_config": {
                    "build_command": config.build_command,
                    "destination_dir": config.output_directory,
                },
            });
            self.call(ProviderRequest::post_json(create_url, body), creds)
                .await?;
            tracing::debug!(project = name, "created Pages project");
        } else {
            self.envelope(existing, creds)?;
        }

        let deploy_url = self.account_endpoint(creds, &["pages", "projects", name, "deployments"])?;
        let result = self
            .call(
                ProviderRequest::post_json(deploy_url, json!({ "branch": branch(config.environment) })),
                creds,
            )
            .await?;
        let deployment_id = result
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DeployError::provider(Platform::Cloudflare, "Pages deployment response has no id")
            })?
            .to_string();

        for domain in &config.custom_domains {
            let domains_url = self.account_endpoint(creds, &["pages", "projects", name, "domains"])?;
            if let Err(e) = self
                .call(ProviderRequest::post_json(domains_url, json!({ "name": domain })), creds)
                .await
            {
                tracing::warn!(project = name, domain = %domain, error = %e, "failed to attach custom domain");
            }
        }

        let url = Self::pages_url(name, &result);
        Ok((
            EdgeResource::Pages {
                project: name.to_string(),
                deployment_id,
            },
            url,
        ))
    }

    async fn list_scripts(&self, creds: &CloudflareCredentials) -> Result<Vec<DeploymentResult>> {
        let url = self.account_endpoint(creds, &["workers", "scripts"])?;
        let result = self.call(ProviderRequest::get(url), creds).await?;
        let mut out = Vec::new();
        for script in result.as_array().into_iter().flatten() {
            let Some(name) = script.get("id").and_then(Value::as_str) else {
                continue;
            };
            let created_at = parse_time(script.get("modified_on").or_else(|| script.get("created_on")));
            let record = EdgeRecord {
                resource: EdgeResource::Script {
                    name: name.to_string(),
                },
                created_at,
                region: None,
            };
            out.push(self.snapshot(name, &record, Self::workers_url(name, creds), DeploymentStatus::Ready));
            self.remember(name, record);
        }
        Ok(out)
    }

    async fn list_pages(&self, creds: &CloudflareCredentials) -> Result<Vec<DeploymentResult>> {
        let url = self.account_endpoint(creds, &["pages", "projects"])?;
        let result = self.call(ProviderRequest::get(url), creds).await?;
        let mut out = Vec::new();
        for project in result.as_array().into_iter().flatten() {
            let Some(name) = project.get("name").and_then(Value::as_str) else {
                continue;
            };
            let Some(latest) = project.get("latest_deployment").filter(|v| v.is_object()) else {
                continue;
            };
            let Some(id) = latest.get("id").and_then(Value::as_str) else {
                continue;
            };
            let record = EdgeRecord {
                resource: EdgeResource::Pages {
                    project: name.to_string(),
                    deployment_id: id.to_string(),
                },
                created_at: parse_time(latest.get("created_on")),
                region: None,
            };
            out.push(self.snapshot(id, &record, Self::pages_url(name, latest), DeploymentStatus::Ready));
            self.remember(id, record);
        }
        Ok(out)
    }

    fn snapshot(
        &self,
        id: &str,
        record: &EdgeRecord,
        url: String,
        status: DeploymentStatus,
    ) -> DeploymentResult {
        DeploymentResult {
            platform: Platform::Cloudflare,
            deployment_id: id.to_string(),
            url,
            status,
            project: Some(record.resource.project().to_string()),
            build_time_ms: None,
            cost: None,
            region: record.region.clone(),
            timestamp: record.created_at,
        }
    }
}

#[async_trait]
impl PlatformAdapter for CloudflareAdapter {
    fn platform(&self) -> Platform {
        Platform::Cloudflare
    }

    fn pricing(&self) -> PricingModel {
        PRICING
    }

    fn is_authenticated(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<bool> {
        let secrets = credentials.secret_values();
        let creds = CloudflareCredentials::from_credentials(credentials)?;
        let url = self.account_endpoint(&creds, &[])?;
        let verified = self
            .client
            .send(ProviderRequest::get(url).bearer(creds.api_token.clone()), &secrets)
            .await
            .and_then(|resp| self.envelope(resp, &creds));
        match verified {
            Ok(_) => {
                *self.credentials.write() = Some(creds);
                tracing::info!(platform = %Platform::Cloudflare, "authenticated");
                Ok(true)
            }
            Err(e) => Err(authentication_failure(Platform::Cloudflare, e)),
        }
    }

    fn logout(&self) {
        *self.credentials.write() = None;
        self.resources.write().clear();
    }

    async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentResult> {
        let creds = self.credentials()?;
        let started = Instant::now();
        let (resource, url) = if config.has_build_step() {
            self.deploy_pages(config, &creds).await?
        } else {
            self.deploy_script(config, &creds).await?
        };
        let created_at = Utc::now();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{}-{seq}", config.project_name, created_at.timestamp_millis());
        let record = EdgeRecord {
            resource,
            created_at,
            region: config.region.clone(),
        };
        let mut result = self.snapshot(&id, &record, url, DeploymentStatus::Ready);
        result.build_time_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        self.remember(&id, record);
        Ok(result)
    }

    async fn get_status(&self, deployment_id: &str) -> Result<DeploymentResult> {
        let creds = self.credentials()?;
        let record = self
            .resources
            .read()
            .get(deployment_id)
            .cloned()
            .ok_or_else(|| {
                DeployError::provider(
                    Platform::Cloudflare,
                    format!("unknown deployment '{deployment_id}'"),
                )
            })?;

        let (url, fallback) = match &record.resource {
            EdgeResource::Script { name } => (
                self.account_endpoint(&creds, &["workers", "scripts", name])?,
                Self::workers_url(name, &creds),
            ),
            EdgeResource::Pages {
                project,
                deployment_id,
            } => (
                self.account_endpoint(
                    &creds,
                    &["pages", "projects", project, "deployments", deployment_id],
                )?,
                format!("https://{project}.pages.dev"),
            ),
        };
        let resp = self
            .client
            .send(ProviderRequest::get(url).bearer(creds.api_token.clone()), &[creds.api_token.as_str()])
            .await?;
        if resp.status == 404 {
            return Ok(self.snapshot(deployment_id, &record, fallback, DeploymentStatus::Error));
        }
        let result = self.envelope(resp, &creds)?;
        let url = match &record.resource {
            EdgeResource::Script { .. } => fallback,
            EdgeResource::Pages { project, .. } => Self::pages_url(project, &result),
        };
        Ok(self.snapshot(deployment_id, &record, url, DeploymentStatus::Ready))
    }

    async fn get_deployments(&self) -> Result<Vec<DeploymentResult>> {
        let creds = self.credentials()?;
        let mut out = self.list_scripts(&creds).await?;
        out.extend(self.list_pages(&creds).await?);
        Ok(out)
    }
}

fn branch(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "main",
        other => other.as_str(),
    }
}

fn parse_time(v: Option<&Value>) -> DateTime<Utc> {
    v.and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(Utc::now, |d| d.with_timezone(&Utc))
}

/// Minimal worker that answers every request; the name is already restricted to `[A-Za-z0-9_-]`.
fn worker_script(name: &str) -> String {
    format!(
        "addEventListener('fetch', (event) => {{\n  event.respondWith(new Response('{name} is deployed', {{ headers: {{ 'content-type': 'text/plain' }} }}));\n}});\n"
    )
}
