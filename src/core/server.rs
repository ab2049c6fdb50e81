//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to the tool domain.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/` with one file per tool.
//! Each tool defines:
//! - Parameters struct (for rmcp)
//! - `execute()` method (core logic)
//! - `create_route()` method (rmcp routing with cancellation)
//!
//! The ToolRouter is built in `domains/tools/router.rs`. Calls that do not
//! come through a transport go through the [`ToolRegistry`].

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use std::sync::Arc;
use tracing::info;

use super::config::Config;
use crate::domains::tools::{ToolRegistry, ToolServices, build_tool_router};

/// The main MCP server handler.
///
/// Cloned once per connection by the TCP transport; all clones share the
/// same vocabulary and query client.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// In-process dispatch for the same tools the router exposes.
    registry: Arc<ToolRegistry>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Loads the vocabulary and prepares the Kusto client. No network
    /// traffic happens until the first query.
    pub fn new(config: Config) -> Self {
        info!("Initializing tool services");
        let services = ToolServices::from_config(&config);
        Self::with_services(config, services)
    }

    /// Create a server around already-built tool services.
    pub fn with_services(config: Config, services: ToolServices) -> Self {
        Self {
            tool_router: build_tool_router::<Self>(services.clone()),
            registry: Arc::new(ToolRegistry::new(services)),
            config: Arc::new(config),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// List all registered tools.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    /// Call a tool by name without going through a transport.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> crate::Result<CallToolResult> {
        Ok(self.registry.call_tool(name, arguments).await?)
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Word utilities (echo, random word, sub-words) and read-only Kusto telemetry queries."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::domains::kusto::{KustoError, QueryPolicy, QueryResult};
    use crate::domains::tools::ToolError;
    use crate::domains::tools::testing::{FakeExecutor, services_with, text_of};
    use std::time::{Duration, Instant};

    fn server_with(executor: FakeExecutor) -> McpServer {
        McpServer::with_services(
            Config::default(),
            services_with(Arc::new(executor), QueryPolicy::Free),
        )
    }

    #[test]
    fn test_server_lists_all_tools() {
        let server = server_with(FakeExecutor::echoing());
        assert_eq!(server.list_tools().len(), 7);
        assert_eq!(server.name(), Config::default().server.name);
    }

    #[test]
    fn test_server_info_enables_tools_only() {
        let server = server_with(FakeExecutor::echoing());
        let info = server.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_none());
        assert!(info.capabilities.prompts.is_none());
    }

    #[tokio::test]
    async fn test_failed_query_does_not_poison_server() {
        let server = server_with(FakeExecutor::new(|query| {
            if query.contains("wher ") {
                Err(KustoError::Query {
                    code: "General_BadRequest".to_string(),
                    message: "Syntax error".to_string(),
                })
            } else {
                Ok(QueryResult::default())
            }
        }));

        let result = server
            .call_tool(
                "QueryKusto",
                serde_json::json!({ "query": "StormEvents | wher x" }),
            )
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(payload["errorKind"], "QueryError");

        let result = server
            .call_tool("Echo", serde_json::json!({ "message": "again" }))
            .await
            .unwrap();
        assert_eq!(text_of(&result), "hello again");

        let result = server
            .call_tool("QueryKusto", serde_json::json!({ "query": "StormEvents" }))
            .await
            .unwrap();
        assert_eq!(text_of(&result), "[]");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_word_tools_do_not_wait_for_queries() {
        let server = server_with(FakeExecutor::echoing().with_delay(Duration::from_millis(300)));

        let started = Instant::now();
        let slow = server.call_tool("QueryKusto", serde_json::json!({ "query": "StormEvents" }));
        let fast = async {
            let result = server
                .call_tool("RandomWord", serde_json::json!({}))
                .await
                .unwrap();
            (result, started.elapsed())
        };

        let (slow_result, (fast_result, fast_elapsed)) = tokio::join!(slow, fast);
        assert!(slow_result.is_ok());
        assert!(!text_of(&fast_result).is_empty());
        assert!(fast_elapsed < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = server_with(FakeExecutor::echoing());
        let result = server.call_tool("Nope", serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::Tool(ToolError::NotFound(_)))));
    }
}
