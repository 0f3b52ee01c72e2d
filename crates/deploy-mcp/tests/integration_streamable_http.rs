mod common;
mod common_mcp;

use anyhow::Context as _;
use axum::Router;
use axum::extract::Path;
use axum::routing::get;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;

use common::{KillOnDrop, MockServer, pick_unused_port, spawn_server, wait_http_ok};
use common_mcp::McpSession;

const ACCOUNT: &str = "abcdef0123456789";

fn cloudflare_api() -> Router {
    Router::new()
        .route(
            "/client/v4/accounts/{account}",
            get(|Path(account): Path<String>| async move {
                axum::Json(json!({"success": true, "result": {"id": account}}))
            }),
        )
        .route(
            "/client/v4/accounts/{account}/workers/scripts/{name}",
            get(|| async { "export default {}" }).put(
                |Path((_account, name)): Path<(String, String)>| async move {
                    axum::Json(json!({"success": true, "result": {"id": name}}))
                },
            ),
        )
}

struct Running {
    _server: KillOnDrop,
    _dir: TempDir,
    _mock: MockServer,
    base_url: String,
}

async fn start(extra_args: &[&str]) -> anyhow::Result<Running> {
    let mock = MockServer::spawn(cloudflare_api()).await?;
    let dir = tempfile::tempdir().context("create temp dir")?;
    let cfg_path = dir.path().join("config.yaml");
    std::fs::write(
        &cfg_path,
        format!(
            "endpoints:\n  cloudflare: {}/client/v4\nhttp:\n  timeoutMs: 5000\n",
            mock.base_url
        ),
    )?;

    let port = pick_unused_port()?;
    let server = KillOnDrop(spawn_server(&cfg_path, port, extra_args)?);
    let base_url = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(20)).await?;

    Ok(Running {
        _server: server,
        _dir: dir,
        _mock: mock,
        base_url,
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn lists_tools_and_answers_ping() -> anyhow::Result<()> {
    let running = start(&[]).await?;
    let session = McpSession::connect(&running.base_url).await?;

    let listed = session.request("tools/list", json!({})).await?;
    let names: Vec<&str> = listed["result"]["tools"]
        .as_array()
        .context("tools array")?
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str))
        .collect();
    for expected in [
        "ping",
        "authenticate",
        "deploy",
        "deployment-status",
        "cost-compare",
        "list-deployments",
        "platform-analytics",
        "logout",
        "share-deployment",
        "team-deployments",
    ] {
        assert!(names.contains(&expected), "missing {expected} in {names:?}");
    }

    let (is_error, text) = session.call_tool("ping", json!({})).await?;
    assert!(!is_error);
    assert!(text.starts_with("pong (unrelated-deploy-mcp "), "{text}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn domain_errors_are_tool_results() -> anyhow::Result<()> {
    let running = start(&[]).await?;
    let session = McpSession::connect(&running.base_url).await?;

    let (is_error, text) = session
        .call_tool("deploy", json!({"config": {"platform": "heroku", "projectName": "app"}}))
        .await?;
    assert!(is_error);
    assert!(text.contains("not supported"), "{text}");

    let (is_error, text) = session
        .call_tool("deploy", json!({"config": {"platform": "cloudflare", "projectName": "bad name!"}}))
        .await?;
    assert!(is_error);
    assert!(text.contains("project name"), "{text}");

    let (is_error, text) = session
        .call_tool("deployment-status", json!({"platform": "cloudflare", "deploymentId": "x"}))
        .await?;
    assert!(is_error);
    assert!(text.contains("Authentication failed for cloudflare"), "{text}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cloudflare_worker_deploy_roundtrip() -> anyhow::Result<()> {
    let running = start(&[]).await?;
    let session = McpSession::connect(&running.base_url).await?;

    let (is_error, text) = session
        .call_tool(
            "authenticate",
            json!({"platform": "cloudflare", "credentials": {"apiToken": "cf-token", "accountId": ACCOUNT}}),
        )
        .await?;
    assert!(!is_error, "{text}");
    assert!(!text.contains("cf-token"));

    let (is_error, text) = session
        .call_tool("deploy", json!({"config": {"platform": "cloudflare", "projectName": "my-app"}}))
        .await?;
    assert!(!is_error, "{text}");
    assert!(text.contains("URL: https://my-app.abcdef01.workers.dev"), "{text}");
    assert!(text.contains("Status: ready"), "{text}");

    let id = text
        .lines()
        .find_map(|l| l.strip_prefix("Deployment ID: "))
        .context("deployment id line")?
        .to_string();
    let (is_error, status) = session
        .call_tool("deployment-status", json!({"platform": "cloudflare", "deploymentId": id}))
        .await?;
    assert!(!is_error, "{status}");
    assert!(status.contains("Status: ready"), "{status}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_applies_per_session() -> anyhow::Result<()> {
    let running = start(&["--rate-limit-max", "2", "--rate-limit-window-ms", "60000"]).await?;
    let first = McpSession::connect(&running.base_url).await?;

    for _ in 0..2 {
        let (is_error, _) = first.call_tool("ping", json!({})).await?;
        assert!(!is_error);
    }
    let (is_error, text) = first.call_tool("ping", json!({})).await?;
    assert!(is_error);
    assert_eq!(text, "Rate limit exceeded. Please try again later.");

    let second = McpSession::connect(&running.base_url).await?;
    let (is_error, _) = second.call_tool("ping", json!({})).await?;
    assert!(!is_error, "a new session has its own budget");
    Ok(())
}
