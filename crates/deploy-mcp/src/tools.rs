//! The tool set: schemas, annotations and handlers.
//!
//! Handlers validate their own arguments, route through the [`AdapterRegistry`] and render text
//! with [`crate::format`]. Multi-platform tools fan out with `join_all` and report each
//! platform's failure inline.

use crate::dispatcher::{ToolDefinition, ToolHandler, ToolOutcome, mutating, read_only};
use crate::format::{self, CostLine};
use futures::future::{BoxFuture, join_all};
use rmcp::model::JsonObject;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use unrelated_deploy_platforms::validation::{
    self, optional_platforms, required_str, validate_identifier, validate_limit,
};
use unrelated_deploy_platforms::{
    AdapterHandle, AdapterRegistry, Credentials, DeployError, DeploymentResult, Platform,
    PlatformAnalytics, ProjectName, Settled,
};

/// Shared state behind every handler.
#[derive(Debug)]
pub struct Tools {
    registry: AdapterRegistry,
    server_name: String,
    version: String,
}

impl Tools {
    #[must_use]
    pub fn new(registry: AdapterRegistry, server_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            registry,
            server_name: server_name.into(),
            version: version.into(),
        }
    }
}

fn handler<F, Fut>(tools: &Arc<Tools>, f: F) -> ToolHandler
where
    F: Fn(Arc<Tools>, JsonObject) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolOutcome> + Send + 'static,
{
    let tools = Arc::clone(tools);
    Arc::new(move |args: JsonObject| -> BoxFuture<'static, ToolOutcome> {
        Box::pin(f(Arc::clone(&tools), args))
    })
}

fn platform_enum() -> Value {
    json!({
        "type": "string",
        "enum": Platform::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        "description": "Target platform"
    })
}

fn platforms_array() -> Value {
    json!({
        "type": "array",
        "items": platform_enum(),
        "description": "Platforms to include (default: all enabled platforms)"
    })
}

fn config_properties(with_platform: bool) -> Value {
    let mut props = json!({
        "projectName": {
            "type": "string",
            "pattern": "^[A-Za-z0-9_-]{1,100}$",
            "description": "Project name (letters, digits, '-' and '_')"
        },
        "environment": {
            "type": "string",
            "enum": ["development", "staging", "production"],
            "default": "production"
        },
        "buildCommand": {"type": "string"},
        "outputDirectory": {"type": "string"},
        "environmentVariables": {
            "type": "object",
            "additionalProperties": {"type": "string"}
        },
        "customDomains": {"type": "array", "items": {"type": "string"}},
        "region": {"type": "string"}
    });
    if with_platform && let Some(obj) = props.as_object_mut() {
        obj.insert("platform".into(), platform_enum());
    }
    props
}

fn limit_schema() -> Value {
    json!({"type": "integer", "minimum": 1, "maximum": 100, "default": 20})
}

/// Every tool, in listing order.
#[must_use]
pub fn definitions(tools: &Arc<Tools>) -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "ping",
            description: "Check that the server is alive",
            input_schema: json!({"type": "object", "properties": {}}),
            annotations: read_only(),
            handler: handler(tools, ping),
        },
        ToolDefinition {
            name: "authenticate",
            description: "Authenticate with a deployment platform. Credentials are held in memory for this session only.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform_enum(),
                    "credentials": {
                        "type": "object",
                        "description": "Cloudflare: apiToken, accountId. Vercel: apiToken, optional teamId. Railway: apiToken.",
                        "additionalProperties": {"type": "string"}
                    }
                },
                "required": ["platform", "credentials"]
            }),
            annotations: mutating(false, true, true),
            handler: handler(tools, authenticate),
        },
        ToolDefinition {
            name: "deploy",
            description: "Deploy a project to a platform",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "config": {
                        "type": "object",
                        "properties": config_properties(true),
                        "required": ["platform", "projectName"]
                    }
                },
                "required": ["config"]
            }),
            annotations: mutating(false, false, true),
            handler: handler(tools, deploy),
        },
        ToolDefinition {
            name: "deployment-status",
            description: "Get the current status of a deployment",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform_enum(),
                    "deploymentId": {"type": "string"}
                },
                "required": ["platform", "deploymentId"]
            }),
            annotations: read_only(),
            handler: handler(tools, deployment_status),
        },
        ToolDefinition {
            name: "cost-compare",
            description: "Compare cost, performance, build time and success rate of a project across platforms",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "config": {
                        "type": "object",
                        "properties": config_properties(false),
                        "required": ["projectName"]
                    },
                    "platforms": platforms_array()
                },
                "required": ["config"]
            }),
            annotations: read_only(),
            handler: handler(tools, cost_compare),
        },
        ToolDefinition {
            name: "list-deployments",
            description: "List recent deployments, newest first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform_enum(),
                    "limit": limit_schema()
                }
            }),
            annotations: read_only(),
            handler: handler(tools, list_deployments),
        },
        ToolDefinition {
            name: "platform-analytics",
            description: "Deployment analytics for a project across platforms",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "projectName": {"type": "string"},
                    "platforms": platforms_array()
                },
                "required": ["projectName"]
            }),
            annotations: read_only(),
            handler: handler(tools, platform_analytics),
        },
        ToolDefinition {
            name: "logout",
            description: "Forget the stored credentials for a platform",
            input_schema: json!({
                "type": "object",
                "properties": {"platform": platform_enum()},
                "required": ["platform"]
            }),
            annotations: mutating(false, true, false),
            handler: handler(tools, logout),
        },
        ToolDefinition {
            name: "share-deployment",
            description: "Share a deployment with a team (platforms without team support report 'not shared')",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform_enum(),
                    "deploymentId": {"type": "string"},
                    "teamId": {"type": "string"}
                },
                "required": ["platform", "deploymentId", "teamId"]
            }),
            annotations: mutating(false, true, true),
            handler: handler(tools, share_deployment),
        },
        ToolDefinition {
            name: "team-deployments",
            description: "List a team's deployments on a platform",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "platform": platform_enum(),
                    "teamId": {"type": "string"},
                    "limit": limit_schema()
                },
                "required": ["platform", "teamId"]
            }),
            annotations: read_only(),
            handler: handler(tools, team_deployments),
        },
    ]
}

fn handle_for(tools: &Tools, args: &JsonObject) -> Result<Arc<AdapterHandle>, DeployError> {
    let raw = required_str(args, "platform")?;
    tools.registry.get(&validation::sanitize_string(raw))
}

/// `config` when present, otherwise the arguments themselves minus `strip` keys.
fn config_value(args: &JsonObject, strip: &[&str]) -> Value {
    match args.get("config") {
        Some(v) => v.clone(),
        None => {
            let mut flat = args.clone();
            for key in strip {
                flat.remove(*key);
            }
            Value::Object(flat)
        }
    }
}

fn newest_first(mut deployments: Vec<DeploymentResult>, limit: usize) -> Vec<DeploymentResult> {
    deployments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    deployments.truncate(limit);
    deployments
}

async fn ping(tools: Arc<Tools>, _args: JsonObject) -> ToolOutcome {
    Ok(format!("pong ({} {})", tools.server_name, tools.version))
}

async fn authenticate(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let handle = handle_for(&tools, &args)?;
    let credentials = Credentials::from_json(
        args.get("credentials")
            .ok_or_else(|| DeployError::validation("credentials", "is required"))?,
    )?;
    let platform = handle.platform();
    if handle.authenticate(credentials).await? {
        tracing::info!(platform = %platform, "authenticated");
        Ok(format!("Successfully authenticated with {}", platform.display_name()))
    } else {
        Err(DeployError::authentication(platform, "credentials were not accepted"))
    }
}

/// Attach the platform's cost estimate; a degraded estimate is left out rather than shown as $0.
async fn with_cost(handle: &AdapterHandle, mut result: DeploymentResult) -> Result<DeploymentResult, DeployError> {
    if result.cost.is_none() {
        result.cost = handle.get_cost(&result.deployment_id).await?.into_result().ok();
    }
    Ok(result)
}

async fn deploy(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let config = validation::deployment_config(&config_value(&args, &[]))?;
    let handle = tools.registry.get_platform(config.platform)?;
    let result = with_cost(&handle, handle.deploy(&config).await?).await?;
    Ok(format::deployment_summary("Deployment successful!", &result))
}

async fn deployment_status(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let handle = handle_for(&tools, &args)?;
    let id = validate_identifier("deploymentId", required_str(&args, "deploymentId")?)?;
    let result = with_cost(&handle, handle.get_status(&id).await?).await?;
    Ok(format::deployment_summary("Deployment status:", &result))
}

async fn cost_compare(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let template = validation::deployment_template(&config_value(&args, &["platforms"]))?;
    let requested = optional_platforms(&args, "platforms")?;
    let handles = tools.registry.resolve(requested.as_deref())?;
    let project = template.project_name.as_str();

    let outcomes = join_all(handles.iter().map(|h| async move {
        let analytics = h.get_analytics(project).await.and_then(Settled::into_result);
        (h.platform(), h.pricing(), analytics)
    }))
    .await;

    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for (platform, pricing, outcome) in outcomes {
        match outcome {
            Ok(analytics) => {
                let estimated = analytics.total_deployments == 0;
                lines.push(CostLine {
                    platform,
                    monthly_cost: if estimated { pricing.base_monthly } else { analytics.total_cost },
                    estimated,
                    analytics,
                });
            }
            Err(e) => errors.push((platform, e)),
        }
    }
    Ok(format::cost_comparison(project, &lines, &errors))
}

async fn list_deployments(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let limit = validate_limit(args.get("limit"))?;
    let handles = match args.get("platform").filter(|v| !v.is_null()) {
        Some(_) => vec![handle_for(&tools, &args)?],
        None => tools.registry.resolve(None)?,
    };

    let outcomes = join_all(
        handles
            .iter()
            .map(|h| async move { (h.platform(), h.get_deployments().await) }),
    )
    .await;

    let mut all = Vec::new();
    let mut errors = Vec::new();
    for (platform, outcome) in outcomes {
        match outcome {
            Ok(mut list) => all.append(&mut list),
            Err(e) => errors.push((platform, e)),
        }
    }
    Ok(format::deployment_list("Deployments", &newest_first(all, limit), &errors))
}

async fn platform_analytics(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let project = ProjectName::parse(required_str(&args, "projectName")?)?;
    let requested = optional_platforms(&args, "platforms")?;
    let handles = tools.registry.resolve(requested.as_deref())?;
    let name = project.as_str();

    let outcomes = join_all(
        handles
            .iter()
            .map(|h| async move {
                (h.platform(), h.get_analytics(name).await.and_then(Settled::into_result))
            }),
    )
    .await;

    let mut analytics: Vec<PlatformAnalytics> = Vec::new();
    let mut errors = Vec::new();
    for (platform, outcome) in outcomes {
        match outcome {
            Ok(a) => analytics.push(a),
            Err(e) => errors.push((platform, e)),
        }
    }
    Ok(format::analytics_report(project.as_str(), &analytics, &errors))
}

async fn logout(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let handle = handle_for(&tools, &args)?;
    handle.logout().await;
    Ok(format!("Logged out of {}", handle.platform().display_name()))
}

async fn share_deployment(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let handle = handle_for(&tools, &args)?;
    let id = validate_identifier("deploymentId", required_str(&args, "deploymentId")?)?;
    let team = validate_identifier("teamId", required_str(&args, "teamId")?)?;
    let platform = handle.platform().display_name();
    Ok(if handle.share_with_team(&id, &team).await? {
        format!("Deployment {id} is shared with team {team} on {platform}")
    } else {
        format!("Deployment {id} was not shared with team {team} on {platform}")
    })
}

async fn team_deployments(tools: Arc<Tools>, args: JsonObject) -> ToolOutcome {
    let handle = handle_for(&tools, &args)?;
    let team = validate_identifier("teamId", required_str(&args, "teamId")?)?;
    let limit = validate_limit(args.get("limit"))?;
    let list = handle.get_team_deployments(&team).await?;
    Ok(format::deployment_list(
        &format!("Team {team} deployments"),
        &newest_first(list, limit),
        &[],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::rate_limit::RateLimiter;
    use rmcp::model::CallToolResult;
    use unrelated_deploy_platforms::ProviderEndpoints;
    use unrelated_provider_http::{HttpTransport, Method};
    use unrelated_test_support::RecordingTransport;

    fn dispatcher(transport: &RecordingTransport) -> Dispatcher {
        let shared: Arc<dyn HttpTransport> = Arc::new(transport.clone());
        let registry = AdapterRegistry::with_defaults(&ProviderEndpoints::default(), &shared, &Platform::ALL);
        let tools = Arc::new(Tools::new(registry, "unrelated-deploy-mcp", "0.0.0-test"));
        Dispatcher::new(definitions(&tools), Arc::new(RateLimiter::default()))
    }

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    fn vercel_listing() -> Value {
        json!({"deployments": [
            {"uid": "dpl_old", "name": "web", "state": "READY", "created": 1_700_000_000_000_i64,
             "buildingAt": 1_700_000_000_000_i64, "ready": 1_700_000_030_000_i64},
            {"uid": "dpl_new", "name": "web", "state": "ERROR", "created": 1_700_000_500_000_i64},
            {"uid": "dpl_api", "name": "api", "state": "READY", "created": 1_700_000_100_000_i64}
        ]})
    }

    async fn authenticate_vercel(d: &Dispatcher) {
        let r = d
            .call(
                "c",
                "authenticate",
                args(json!({"platform": "vercel", "credentials": {"apiToken": "tok"}})),
            )
            .await;
        assert_eq!(r.is_error, Some(false), "{}", text(&r));
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let d = dispatcher(&RecordingTransport::new());
        let r = d.call("c", "ping", None).await;
        assert_eq!(r.is_error, Some(false));
        assert_eq!(text(&r), "pong (unrelated-deploy-mcp 0.0.0-test)");
    }

    #[tokio::test]
    async fn invalid_project_name_is_rejected_before_any_provider_call() {
        let transport = RecordingTransport::new();
        let d = dispatcher(&transport);
        let r = d
            .call(
                "c",
                "deploy",
                args(json!({"config": {"platform": "cloudflare", "projectName": "bad name!"}})),
            )
            .await;
        assert_eq!(r.is_error, Some(true));
        assert!(text(&r).contains("project name"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_platforms_fail_every_tool_without_traffic() {
        let transport = RecordingTransport::new();
        let d = dispatcher(&transport);
        let calls = [
            ("authenticate", json!({"platform": "heroku", "credentials": {"apiToken": "x"}})),
            ("deploy", json!({"config": {"platform": "heroku", "projectName": "app"}})),
            ("deployment-status", json!({"platform": "heroku", "deploymentId": "d1"})),
            ("cost-compare", json!({"config": {"projectName": "app"}, "platforms": ["heroku"]})),
            ("list-deployments", json!({"platform": "heroku"})),
            ("platform-analytics", json!({"projectName": "app", "platforms": ["heroku"]})),
            ("logout", json!({"platform": "heroku"})),
            ("share-deployment", json!({"platform": "heroku", "deploymentId": "d", "teamId": "t"})),
            ("team-deployments", json!({"platform": "heroku", "teamId": "t"})),
        ];
        for (tool, arguments) in calls {
            let r = d.call("c", tool, args(arguments)).await;
            assert_eq!(r.is_error, Some(true), "{tool}");
            assert!(text(&r).contains("not supported"), "{tool}: {}", text(&r));
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn cost_compare_reports_failing_platform_inline() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({"user": {"id": "u1"}}))
            .on(Method::GET, "/v6/deployments", 200, vercel_listing());
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;

        // Cloudflare was never authenticated, so its analytics call fails.
        let r = d
            .call(
                "c",
                "cost-compare",
                args(json!({"config": {"projectName": "web"}, "platforms": ["vercel", "cloudflare"]})),
            )
            .await;
        let out = text(&r);
        assert_eq!(r.is_error, Some(false), "{out}");
        assert!(out.contains("Vercel: $"), "{out}");
        assert!(out.contains("Deployments: 2"), "{out}");
        assert!(out.contains("Cloudflare: error - Authentication failed for cloudflare"), "{out}");
        assert!(out.contains("Cheapest: Vercel"), "{out}");
    }

    #[tokio::test]
    async fn provider_outage_is_an_inline_error_not_an_estimate() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({}))
            .on(Method::GET, "/v6/deployments", 500, json!({"error": {"message": "internal"}}));
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;

        let r = d
            .call("c", "cost-compare", args(json!({"config": {"projectName": "web"}, "platforms": ["vercel"]})))
            .await;
        let out = text(&r);
        assert_eq!(r.is_error, Some(false), "{out}");
        assert!(out.contains("Vercel: error - vercel request failed"), "{out}");
        assert!(!out.contains("estimated"), "{out}");
        assert!(!out.contains("Cheapest"), "{out}");

        let r = d
            .call("c", "platform-analytics", args(json!({"projectName": "web", "platforms": ["vercel"]})))
            .await;
        let out = text(&r);
        assert_eq!(r.is_error, Some(false), "{out}");
        assert!(out.contains("Vercel: error - vercel request failed"), "{out}");
    }

    #[tokio::test]
    async fn cost_compare_accepts_flat_arguments() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({}))
            .on(Method::GET, "/v6/deployments", 200, json!({"deployments": []}));
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;
        let r = d
            .call("c", "cost-compare", args(json!({"projectName": "web", "platforms": ["vercel"]})))
            .await;
        assert_eq!(r.is_error, Some(false), "{}", text(&r));
        assert!(text(&r).contains("Vercel: $20.00/month (estimated, no deployments yet)"));
    }

    #[tokio::test]
    async fn list_deployments_is_newest_first_with_errors_appended() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({}))
            .on(Method::GET, "/v6/deployments", 200, vercel_listing());
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;

        let r = d.call("c", "list-deployments", args(json!({"limit": 2}))).await;
        let out = text(&r);
        assert_eq!(r.is_error, Some(false), "{out}");
        assert!(out.starts_with("Deployments (2):"), "{out}");
        let newest = out.find("dpl_new").expect("newest listed");
        let next = out.find("dpl_api").expect("second listed");
        assert!(newest < next);
        assert!(!out.contains("dpl_old"));
        assert!(out.contains("- cloudflare: Authentication failed"), "{out}");
        assert!(out.contains("- railway: Authentication failed"), "{out}");
    }

    #[tokio::test]
    async fn list_deployments_rejects_out_of_range_limit() {
        let d = dispatcher(&RecordingTransport::new());
        let r = d.call("c", "list-deployments", args(json!({"limit": 0}))).await;
        assert_eq!(r.is_error, Some(true));
        assert!(text(&r).contains("limit"));
    }

    #[tokio::test]
    async fn analytics_without_data_is_not_an_error() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({}))
            .on(Method::GET, "/v6/deployments", 200, vercel_listing());
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;

        let r = d
            .call("c", "platform-analytics", args(json!({"projectName": "shop", "platforms": ["vercel"]})))
            .await;
        assert_eq!(r.is_error, Some(false));
        assert_eq!(text(&r), "No analytics data found for project 'shop'");

        let r = d
            .call("c", "platform-analytics", args(json!({"projectName": "web", "platforms": ["vercel"]})))
            .await;
        let out = text(&r);
        assert!(out.contains("Deployments: 2"), "{out}");
        assert!(out.contains("Success rate: 50.0%"), "{out}");
        assert!(out.contains("Best performer: Vercel"), "{out}");
    }

    #[tokio::test]
    async fn deploy_requires_authentication() {
        let transport = RecordingTransport::new();
        let d = dispatcher(&transport);
        let r = d
            .call("c", "deploy", args(json!({"config": {"platform": "railway", "projectName": "api"}})))
            .await;
        assert_eq!(r.is_error, Some(true));
        assert!(text(&r).contains("Authentication failed for railway"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn status_carries_the_cost_estimate() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({}))
            .on(
                Method::GET,
                "/v13/deployments/dpl_1",
                200,
                json!({"id": "dpl_1", "url": "web-abc.vercel.app", "readyState": "READY", "name": "web",
                       "createdAt": 1_700_000_000_000_i64, "buildingAt": 1_700_000_000_000_i64,
                       "ready": 1_700_000_060_000_i64}),
            );
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;

        let r = d
            .call("c", "deployment-status", args(json!({"platform": "vercel", "deploymentId": "dpl_1"})))
            .await;
        let out = text(&r);
        assert_eq!(r.is_error, Some(false), "{out}");
        assert!(out.contains("Status: ready"), "{out}");
        assert!(out.contains("Cost: $20.01"), "{out}");
    }

    #[tokio::test]
    async fn status_omits_cost_when_the_estimate_fails() {
        let transport = RecordingTransport::new()
            .on(Method::GET, "/v2/user", 200, json!({}))
            .on(
                Method::GET,
                "/v13/deployments/dpl_1",
                200,
                json!({"id": "dpl_1", "url": "web-abc.vercel.app", "readyState": "BUILDING"}),
            )
            .on(Method::GET, "/v13/deployments/dpl_1", 503, json!({}));
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;

        let r = d
            .call("c", "deployment-status", args(json!({"platform": "vercel", "deploymentId": "dpl_1"})))
            .await;
        let out = text(&r);
        assert_eq!(r.is_error, Some(false), "{out}");
        assert!(out.contains("Status: building"), "{out}");
        assert!(!out.contains("Cost:"), "{out}");
    }

    #[tokio::test]
    async fn logout_drops_the_session() {
        let transport = RecordingTransport::new().on(Method::GET, "/v2/user", 200, json!({}));
        let d = dispatcher(&transport);
        authenticate_vercel(&d).await;
        let r = d.call("c", "logout", args(json!({"platform": "vercel"}))).await;
        assert_eq!(text(&r), "Logged out of Vercel");

        let calls_before = transport.call_count();
        let r = d.call("c", "list-deployments", args(json!({"platform": "vercel"}))).await;
        assert!(text(&r).contains("Authentication failed for vercel"));
        assert_eq!(transport.call_count(), calls_before);
    }

    #[tokio::test]
    async fn share_on_platform_without_teams_reports_not_shared() {
        let transport = RecordingTransport::new().on(
            Method::POST,
            "/graphql/v2",
            200,
            json!({"data": {"me": {"id": "u1"}}}),
        );
        let d = dispatcher(&transport);
        let share = json!({"platform": "railway", "deploymentId": "d1", "teamId": "t1"});

        let r = d.call("c", "share-deployment", args(share.clone())).await;
        assert_eq!(r.is_error, Some(true));
        assert_eq!(transport.call_count(), 0);

        let r = d
            .call("c", "authenticate", args(json!({"platform": "railway", "credentials": {"apiToken": "tok"}})))
            .await;
        assert_eq!(r.is_error, Some(false), "{}", text(&r));

        let r = d.call("c", "share-deployment", args(share)).await;
        assert_eq!(r.is_error, Some(false));
        assert_eq!(text(&r), "Deployment d1 was not shared with team t1 on Railway");
        assert_eq!(transport.call_count(), 1);
    }
}
