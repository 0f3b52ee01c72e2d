//! Railway GraphQL adapter.

use crate::adapter::{
    PlatformAdapter, ProviderClient, authentication_failure, ensure_https, first_error_message,
};
use crate::analytics::PricingModel;
use crate::credentials::Credentials;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentConfig, DeploymentResult, DeploymentStatus, Platform};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use unrelated_provider_http::{HttpTransport, ProviderRequest};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://backboard.railway.app/graphql/v2";

/// $0.0005 per vCPU-second, billed here per build minute.
pub const PRICING: PricingModel = PricingModel {
    base_monthly: 5.0,
    per_build_minute: 0.0005 * 60.0,
};

const ME: &str = "query { me { id email } }";
const PROJECTS: &str = "query { projects { edges { node { id name environments { edges { node { id name } } } services { edges { node { id name } } } } } } }";
const PROJECT_CREATE: &str = "mutation($input: ProjectCreateInput!) { projectCreate(input: $input) { id name environments { edges { node { id name } } } } }";
const SERVICE_CREATE: &str =
    "mutation($input: ServiceCreateInput!) { serviceCreate(input: $input) { id name } }";
const VARIABLES_UPSERT: &str = "mutation($input: VariableCollectionUpsertInput!) { variableCollectionUpsert(input: $input) }";
const INSTANCE_UPDATE: &str = "mutation($serviceId: String!, $environmentId: String!, $input: ServiceInstanceUpdateInput!) { serviceInstanceUpdate(serviceId: $serviceId, environmentId: $environmentId, input: $input) }";
const INSTANCE_DEPLOY: &str = "mutation($serviceId: String!, $environmentId: String!) { serviceInstanceDeployV2(serviceId: $serviceId, environmentId: $environmentId) }";
const DOMAIN_CREATE: &str = "mutation($input: CustomDomainCreateInput!) { customDomainCreate(input: $input) { id } }";
const DEPLOYMENT: &str = "query($id: String!) { deployment(id: $id) { id status staticUrl url createdAt service { name } } }";
const DEPLOYMENTS: &str = "query($first: Int!) { deployments(first: $first, input: {}) { edges { node { id status staticUrl url createdAt service { name } } } } }";

#[derive(Clone)]
struct RailwayCredentials {
    api_token: String,
}

impl RailwayCredentials {
    fn from_credentials(mut raw: Credentials) -> Result<Self> {
        let api_token = raw.take_required(Platform::Railway, "apiToken")?;
        raw.finish(Platform::Railway)?;
        Ok(Self { api_token })
    }
}

impl fmt::Debug for RailwayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RailwayCredentials")
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Total mapping from Railway deployment statuses.
#[must_use]
pub fn map_status(raw: &str) -> DeploymentStatus {
    match raw.to_ascii_uppercase().as_str() {
        "INITIALIZING" | "QUEUED" | "WAITING" => DeploymentStatus::Pending,
        "BUILDING" | "DEPLOYING" => DeploymentStatus::Building,
        "SUCCESS" | "RUNNING" => DeploymentStatus::Ready,
        "FAILED" | "CRASHED" => DeploymentStatus::Error,
        "REMOVED" | "REMOVING" => DeploymentStatus::Canceled,
        _ => DeploymentStatus::Pending,
    }
}

pub struct RailwayAdapter {
    client: ProviderClient,
    credentials: RwLock<Option<RailwayCredentials>>,
}

impl RailwayAdapter {
    #[must_use]
    pub fn new(base_url: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            client: ProviderClient::new(Platform::Railway, base_url, transport),
            credentials: RwLock::new(None),
        }
    }

    fn credentials(&self) -> Result<RailwayCredentials> {
        self.credentials
            .read()
            .clone()
            .filter(|c| !c.api_token.is_empty())
            .ok_or_else(|| DeployError::not_authenticated(Platform::Railway))
    }

    /// Run one GraphQL operation and return its `data` object.
    async fn graphql(&self, token: &str, query: &str, variables: Value) -> Result<Value> {
        let secrets = [token];
        let request = ProviderRequest::post_json(
            self.client.base_url().clone(),
            json!({ "query": query, "variables": variables }),
        )
        .bearer(token);
        let resp = self.client.send(request, &secrets).await?;
        if let Some(message) = first_error_message(&resp.body) {
            return Err(self.client.error(&message, &secrets));
        }
        if !resp.is_success() {
            return Err(self.client.error(&resp.error_summary(), &secrets));
        }
        Ok(resp.body.get("data").cloned().unwrap_or(Value::Null))
    }

    async fn fetch_deployment(&self, creds: &RailwayCredentials, id: &str) -> Result<DeploymentResult> {
        let data = self
            .graphql(&creds.api_token, DEPLOYMENT, json!({ "id": id }))
            .await?;
        data.get("deployment")
            .and_then(snapshot)
            .ok_or_else(|| DeployError::provider(Platform::Railway, format!("deployment '{id}' not found")))
    }

    /// Reuse the project (and service) named after `config.project_name`, creating what is
    /// missing.
    async fn ensure_service(&self, token: &str, config: &DeploymentConfig) -> Result<ServiceIds> {
        let name = config.project_name.as_str();
        let data = self.graphql(token, PROJECTS, json!({})).await?;
        let existing = data
            .pointer("/projects/edges")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|e| e.get("node"))
            .find(|p| str_at(p, "/name") == Some(name))
            .cloned();

        let project = match existing {
            Some(project) => project,
            None => {
                let data = self
                    .graphql(token, PROJECT_CREATE, json!({ "input": { "name": name } }))
                    .await?;
                data.get("projectCreate").cloned().ok_or_else(|| {
                    DeployError::provider(Platform::Railway, "projectCreate returned no project")
                })?
            }
        };
        let project_id = str_at(&project, "/id")
            .ok_or_else(|| DeployError::provider(Platform::Railway, "project has no id"))?
            .to_string();
        let environment = environment_id(&project, config.environment.as_str())
            .ok_or_else(|| DeployError::provider(Platform::Railway, "project has no environments"))?;

        let service = match service_id(&project, name) {
            Some(id) => id,
            None => {
                let data = self
                    .graphql(
                        token,
                        SERVICE_CREATE,
                        json!({ "input": { "projectId": project_id, "name": name } }),
                    )
                    .await?;
                str_at(&data, "/serviceCreate/id")
                    .ok_or_else(|| DeployError::provider(Platform::Railway, "service has no id"))?
                    .to_string()
            }
        };
        Ok(ServiceIds {
            project: project_id,
            environment,
            service,
        })
    }

    async fn attach_domains(
        &self,
        config: &DeploymentConfig,
        creds: &RailwayCredentials,
        ids: &ServiceIds,
    ) {
        for domain in &config.custom_domains {
            let input = json!({
                "input": {
                    "domain": domain,
                    "projectId": ids.project,
                    "environmentId": ids.environment,
                    "serviceId": ids.service,
                }
            });
            if let Err(e) = self.graphql(&creds.api_token, DOMAIN_CREATE, input).await {
                tracing::warn!(project = %config.project_name, domain = %domain, error = %e, "failed to attach custom domain");
            }
        }
    }
}

struct ServiceIds {
    project: String,
    environment: String,
    service: String,
}

fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer).and_then(Value::as_str)
}

fn snapshot(node: &Value) -> Option<DeploymentResult> {
    let id = node.get("id").and_then(Value::as_str)?;
    let service = str_at(node, "/service/name").map(str::to_string);
    let url = ["staticUrl", "url"]
        .iter()
        .find_map(|k| node.get(*k).and_then(Value::as_str).filter(|u| !u.is_empty()))
        .map(ensure_https)
        .or_else(|| service.as_ref().map(|s| format!("https://{s}.up.railway.app")))
        .unwrap_or_default();
    Some(DeploymentResult {
        platform: Platform::Railway,
        deployment_id: id.to_string(),
        url,
        status: node
            .get("status")
            .and_then(Value::as_str)
            .map_or(DeploymentStatus::Pending, map_status),
        project: service,
        build_time_ms: None,
        cost: None,
        region: None,
        timestamp: node
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or_else(Utc::now, |d| d.with_timezone(&Utc)),
    })
}

/// Pick the environment whose name matches the requested one, else the project's first.
fn environment_id(project: &Value, wanted: &str) -> Option<String> {
    let edges = project.pointer("/environments/edges")?.as_array()?;
    edges
        .iter()
        .find(|e| str_at(e, "/node/name").is_some_and(|n| n.eq_ignore_ascii_case(wanted)))
        .or_else(|| edges.first())
        .and_then(|e| str_at(e, "/node/id"))
        .map(str::to_string)
}

fn service_id(project: &Value, name: &str) -> Option<String> {
    project
        .pointer("/services/edges")?
        .as_array()?
        .iter()
        .find(|e| str_at(e, "/node/name") == Some(name))
        .and_then(|e| str_at(e, "/node/id"))
        .map(str::to_string)
}

#[async_trait]
impl PlatformAdapter for RailwayAdapter {
    fn platform(&self) -> Platform {
        Platform::Railway
    }

    fn pricing(&self) -> PricingModel {
        PRICING
    }

    fn is_authenticated(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<bool> {
        let creds = RailwayCredentials::from_credentials(credentials)?;
        let data = self
            .graphql(&creds.api_token, ME, json!({}))
            .await
            .map_err(|e| authentication_failure(Platform::Railway, e))?;
        if !data.get("me").is_some_and(Value::is_object) {
            return Err(DeployError::authentication(
                Platform::Railway,
                "token did not resolve to a user",
            ));
        }
        *self.credentials.write() = Some(creds);
        tracing::info!(platform = %Platform::Railway, "authenticated");
        Ok(true)
    }

    fn logout(&self) {
        *self.credentials.write() = None;
    }

    async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentResult> {
        let creds = self.credentials()?;
        let token = creds.api_token.as_str();
        let started = Instant::now();
        let name = config.project_name.as_str();

        let ids = self.ensure_service(token, config).await?;
        tracing::debug!(project = name, project_id = %ids.project, service_id = %ids.service, "resolved Railway service");

        if !config.environment_variables.is_empty() {
            self.graphql(
                token,
                VARIABLES_UPSERT,
                json!({
                    "input": {
                        "projectId": ids.project,
                        "environmentId": ids.environment,
                        "serviceId": ids.service,
                        "variables": config.environment_variables,
                    }
                }),
            )
            .await?;
        }

        if config.region.is_some() || config.build_command.is_some() {
            let mut input = serde_json::Map::new();
            if let Some(region) = &config.region {
                input.insert("region".into(), json!(region));
            }
            if let Some(cmd) = &config.build_command {
                input.insert("buildCommand".into(), json!(cmd));
            }
            self.graphql(
                token,
                INSTANCE_UPDATE,
                json!({ "serviceId": ids.service, "environmentId": ids.environment, "input": input }),
            )
            .await?;
        }

        let data = self
            .graphql(
                token,
                INSTANCE_DEPLOY,
                json!({ "serviceId": ids.service, "environmentId": ids.environment }),
            )
            .await?;
        let deployment_id = data
            .get("serviceInstanceDeployV2")
            .and_then(Value::as_str)
            .ok_or_else(|| DeployError::provider(Platform::Railway, "deploy returned no deployment id"))?
            .to_string();

        self.attach_domains(config, &creds, &ids).await;

        let mut result = self.fetch_deployment(&creds, &deployment_id).await?;
        result.project = Some(name.to_string());
        if result.url.is_empty() {
            result.url = format!("https://{name}.up.railway.app");
        }
        result.region.clone_from(&config.region);
        result.build_time_ms = Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        Ok(result)
    }

    async fn get_status(&self, deployment_id: &str) -> Result<DeploymentResult> {
        let creds = self.credentials()?;
        self.fetch_deployment(&creds, deployment_id).await
    }

    async fn get_deployments(&self) -> Result<Vec<DeploymentResult>> {
        let creds = self.credentials()?;
        let data = self
            .graphql(&creds.api_token, DEPLOYMENTS, json!({ "first": 100 }))
            .await?;
        Ok(data
            .pointer("/deployments/edges")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|edge| edge.get("node").and_then(snapshot))
            .collect())
    }
}
