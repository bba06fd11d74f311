/*!
server.rs - MCP surface (rmcp `ServerHandler`).

  list_tools -> discovery snapshot -> catalog -> rmcp Tool
  call_tool  -> Dispatcher::call -> rendered text (success / error result)

Dispatch failures never become protocol errors; the caller always gets a
`CallToolResult`, flagged as an error where appropriate.
*/

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ErrorData as McpError;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer, ServiceExt};
use rmcp::transport::io::stdio;
use tracing::{info, warn};

use crate::dispatch::{Dispatched, Dispatcher};
use crate::render::{render, render_error};
use crate::schema::{JsonObject, ReservedTool, ToolSchema};

pub fn to_rmcp_tool(schema: ToolSchema) -> Tool {
    Tool::new(schema.name, schema.description, Arc::new(schema.input_schema))
}

#[derive(Clone)]
pub struct BridgeServer {
    dispatcher: Arc<Dispatcher>,
    server_name: String,
}

impl BridgeServer {
    pub fn new(dispatcher: Arc<Dispatcher>, server_name: impl Into<String>) -> Self {
        Self {
            dispatcher,
            server_name: server_name.into(),
        }
    }

    /// Run discovery once up front so the first `tools/list` is cheap.
    pub async fn prewarm(&self) {
        let snapshot = self.dispatcher.cache().get_snapshot().await;
        if snapshot.is_empty() {
            warn!(
                "Initial {} command discovery found nothing; raw and help tools remain available",
                self.dispatcher.program()
            );
        } else {
            info!("{} command discovery completed", self.dispatcher.program());
        }
    }

    pub async fn tool_list(&self) -> Vec<Tool> {
        self.dispatcher
            .tools()
            .await
            .into_iter()
            .map(to_rmcp_tool)
            .collect()
    }

    /// Dispatch + render. The flag reports whether the command set was rebuilt.
    pub async fn handle_call(&self, name: &str, arguments: Option<&JsonObject>) -> (CallToolResult, bool) {
        let program = self.dispatcher.program();
        match self.dispatcher.call(name, arguments).await {
            Ok(outcome) => {
                let help_tool = self.dispatcher.naming().reserved_name(ReservedTool::Help);
                let text = render(&outcome, program, &help_tool);
                let rediscovered = matches!(outcome, Dispatched::Rediscovered { .. });
                let result = if outcome.succeeded() {
                    CallToolResult::success(vec![Content::text(text)])
                } else {
                    CallToolResult::error(vec![Content::text(text)])
                };
                (result, rediscovered)
            }
            Err(e) => {
                warn!(tool = name, "tool call rejected: {e}");
                (
                    CallToolResult::error(vec![Content::text(render_error(name, &e))]),
                    false,
                )
            }
        }
    }

    fn instructions(&self) -> String {
        let naming = self.dispatcher.naming();
        let program = self.dispatcher.program();
        format!(
            "Structured access to the `{program}` command line, discovered from its help output.\n\n\
             Every top-level command is a tool named {prefix}_<command>.\n\
             - {raw}: run any {program} command with explicit args\n\
             - {help}: show help for a command path (e.g. 'issue list')\n\
             - {discover}: rebuild the command list",
            prefix = naming.prefix(),
            raw = naming.reserved_name(ReservedTool::Raw),
            help = naming.reserved_name(ReservedTool::Help),
            discover = naming.reserved_name(ReservedTool::Discover),
        )
    }
}

impl rmcp::ServerHandler for BridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .build(),
            server_info: Implementation {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(self.instructions()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_list().await))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let (result, rediscovered) = self
            .handle_call(&request.name, request.arguments.as_ref())
            .await;
        if rediscovered && let Err(e) = context.peer.notify_tool_list_changed().await {
            warn!("failed to send tool list change notification: {e}");
        }
        Ok(result)
    }
}

/// Serve on stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: BridgeServer, prewarm: bool) -> Result<()> {
    if prewarm {
        server.prewarm().await;
    }

    info!("Serving on stdio");
    let service = server
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;
    let reason = service.waiting().await?;
    info!(?reason, "server shut down");
    Ok(())
}

/* ---- Tests ---- */
