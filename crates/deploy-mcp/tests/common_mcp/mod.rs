use anyhow::Context as _;
use futures::StreamExt as _;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::AsyncBufReadExt as _;
use tokio_util::io::StreamReader;

/// Just enough of an MCP client to drive `/mcp` from tests.
pub struct McpSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
    next_id: std::sync::atomic::AtomicU64,
}

impl McpSession {
    /// `initialize` + `notifications/initialized`.
    pub async fn connect(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let init = post_mcp(
            &client,
            &base_url,
            None,
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "deploy-mcp-integration-tests", "version": "0" }
                }
            }),
        )
        .await?;

        let session_id = init
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|h| h.to_str().ok())
            .context("missing Mcp-Session-Id header")?
            .to_string();

        let init_msg = first_event_json(init).await?;
        anyhow::ensure!(init_msg.get("id") == Some(&json!(0)), "unexpected init id");

        let initialized = post_mcp(
            &client,
            &base_url,
            Some(&session_id),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await?;
        anyhow::ensure!(
            initialized.status().as_u16() == 202,
            "notifications/initialized returned {}",
            initialized.status()
        );

        Ok(Self {
            client,
            base_url,
            session_id,
            next_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    pub async fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let resp = post_mcp(
            &self.client,
            &self.base_url,
            Some(&self.session_id),
            json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}),
        )
        .await?;
        tokio::time::timeout(Duration::from_secs(10), first_event_json(resp))
            .await
            .context("timeout waiting for event-stream response")?
    }

    /// `tools/call`, returning `(is_error, first text block)`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> anyhow::Result<(bool, String)> {
        let msg = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        let result = msg.get("result").context("tools/call missing result")?;
        let text = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .context("tools/call missing result.content[0].text")?
            .to_string();
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok((is_error, text))
    }
}

async fn post_mcp(
    client: &reqwest::Client,
    base_url: &str,
    session_id: Option<&str>,
    body: Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(format!("{base_url}/mcp"))
        .header("Accept", "application/json, text/event-stream")
        .header("Content-Type", "application/json")
        .json(&body);
    if let Some(session_id) = session_id {
        req = req.header("Mcp-Session-Id", session_id);
    }
    req.send()
        .await
        .context("POST /mcp")?
        .error_for_status()
        .context("POST /mcp status")
}

async fn first_event_json(resp: reqwest::Response) -> anyhow::Result<Value> {
    let mut stream = resp.bytes_stream();
    let bytes = futures::stream::poll_fn(move |cx| stream.poll_next_unpin(cx))
        .map(|r| r.map_err(std::io::Error::other));
    let mut lines = tokio::io::BufReader::new(StreamReader::new(bytes)).lines();

    let mut data: Vec<String> = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end();
        if line.is_empty() {
            if data.is_empty() {
                continue;
            }
            return serde_json::from_str(&data.join("\n")).context("parse event-stream data");
        }
        if let Some(v) = line.strip_prefix("data:") {
            let v = v.trim();
            // Priming events carry an empty payload.
            if !v.is_empty() {
                data.push(v.to_string());
            }
        }
    }
    anyhow::bail!("event-stream ended without a JSON message")
}
