//! rmcp `ServerHandler` over the [`Dispatcher`].

use crate::dispatcher::Dispatcher;
use crate::rate_limit::DEFAULT_CLIENT;
use rmcp::ErrorData;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Extensions, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use std::sync::Arc;

const SESSION_HEADER: &str = "mcp-session-id";

const INSTRUCTIONS: &str = "Deploy projects to Cloudflare, Vercel and Railway.\n\
1) Call `authenticate` once per platform with its credentials.\n\
2) Use `deploy`, then `deployment-status` to follow a deployment.\n\
3) `cost-compare`, `list-deployments` and `platform-analytics` work across every authenticated platform; \
platforms that fail are reported inline.";

#[derive(Clone)]
pub struct DeployServer {
    dispatcher: Arc<Dispatcher>,
    name: String,
    version: String,
}

impl DeployServer {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            dispatcher,
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Rate-limit identity for a request: the streamable HTTP session id, else the shared default.
pub fn client_id(extensions: &Extensions) -> String {
    extensions
        .get::<axum::http::request::Parts>()
        .and_then(|parts| parts.headers.get(SESSION_HEADER))
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map_or_else(|| DEFAULT_CLIENT.to_string(), str::to_string)
}

impl ServerHandler for DeployServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                title: Some("Deploy MCP".to_string()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.dispatcher.list_tools())))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let client = client_id(&context.extensions);
        Ok(self
            .dispatcher
            .call(&client, &request.name, request.arguments)
            .await)
    }
}
