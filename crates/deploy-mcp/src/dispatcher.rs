//! Tool table + the wrapper every tool call goes through.
//!
//! Order per call: rate limit, lookup, handler. Handlers validate their own arguments. Every
//! failure comes back as an error-flagged text result; nothing escapes to the transport.

use crate::rate_limit::RateLimiter;
use futures::future::BoxFuture;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool, ToolAnnotations};
use serde_json::Value;
use std::sync::Arc;
use unrelated_deploy_platforms::DeployError;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

pub type ToolOutcome = Result<String, DeployError>;
pub type ToolHandler = Arc<dyn Fn(JsonObject) -> BoxFuture<'static, ToolOutcome> + Send + Sync>;

/// One exposed tool.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
    pub handler: ToolHandler,
}

impl ToolDefinition {
    #[must_use]
    pub fn to_tool(&self) -> Tool {
        let schema = self.input_schema.as_object().cloned().unwrap_or_default();
        let mut tool = Tool::new(self.name, self.description, Arc::new(schema));
        tool.annotations = Some(self.annotations.clone());
        tool
    }
}

pub struct Dispatcher {
    tools: Vec<ToolDefinition>,
    limiter: Arc<RateLimiter>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(tools: Vec<ToolDefinition>, limiter: Arc<RateLimiter>) -> Self {
        Self { tools, limiter }
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_tool).collect()
    }

    /// Run `name` for `client`.
    pub async fn call(&self, client: &str, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        if !self.limiter.is_allowed(client) {
            tracing::warn!(tool = %name, client = %client, "rate limit exceeded");
            return error_result(RATE_LIMIT_MESSAGE);
        }

        let Some(tool) = self.tools.iter().find(|t| t.name == name) else {
            tracing::warn!(tool = %name, "unknown tool");
            return error_result(&format!("Unknown tool: {name}"));
        };

        let arguments = arguments.unwrap_or_default();
        let keys: Vec<&str> = arguments.keys().map(String::as_str).collect();
        tracing::info!(tool = %name, argument_keys = ?keys, "tool call");

        match (tool.handler)(arguments).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                error_result(&e.to_string())
            }
        }
    }
}

fn error_result(message: &str) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(message.to_string())],
        structured_content: None,
        is_error: Some(true),
        meta: None,
    }
}

/// Annotations for a tool that only reads provider state.
#[must_use]
pub fn read_only() -> ToolAnnotations {
    ToolAnnotations {
        title: None,
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(true),
    }
}

/// Annotations for a tool that changes provider (or session) state.
#[must_use]
pub fn mutating(destructive: bool, idempotent: bool, open_world: bool) -> ToolAnnotations {
    ToolAnnotations {
        title: None,
        read_only_hint: Some(false),
        destructive_hint: Some(destructive),
        idempotent_hint: Some(idempotent),
        open_world_hint: Some(open_world),
    }
}
