//! Tool Registry - central registration and in-process dispatch for all tools.
//!
//! This module provides:
//! - The list of available tools and their metadata
//! - Name-based dispatch of tool calls without going through a transport

use rmcp::model::{CallToolResult, JsonObject, Tool};
use tracing::{info, warn};

use super::definitions::{
    CommonErrorsTool, EchoLengthTool, EchoTool, QueryKustoTool, RandomWordTool, SubWordsTool,
    TelemetryTool,
};
use super::{ToolError, ToolServices};

/// Tool registry - manages all available tools.
pub struct ToolRegistry {
    services: ToolServices,
}

impl ToolRegistry {
    /// Create a new tool registry.
    pub fn new(services: ToolServices) -> Self {
        Self { services }
    }

    /// Get all tool names.
    pub fn tool_names() -> Vec<&'static str> {
        vec![
            EchoTool::NAME,
            EchoLengthTool::NAME,
            RandomWordTool::NAME,
            SubWordsTool::NAME,
            TelemetryTool::NAME,
            CommonErrorsTool::NAME,
            QueryKustoTool::NAME,
        ]
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            EchoTool::to_tool(),
            EchoLengthTool::to_tool(),
            RandomWordTool::to_tool(),
            SubWordsTool::to_tool(),
            TelemetryTool::to_tool(),
            CommonErrorsTool::to_tool(),
            QueryKustoTool::to_tool(),
        ]
    }

    /// Dispatch a tool call by name.
    ///
    /// `arguments` must be a JSON object or null.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, ToolError> {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => JsonObject::new(),
            other => {
                return Err(ToolError::invalid_arguments(format!(
                    "arguments must be a JSON object, got {}",
                    other
                )));
            }
        };

        info!("Dispatching tool call: {}", name);
        let services = &self.services;

        match name {
            EchoTool::NAME => EchoTool::call(arguments),
            EchoLengthTool::NAME => EchoLengthTool::call(arguments),
            RandomWordTool::NAME => RandomWordTool::call(arguments, &services.vocabulary),
            SubWordsTool::NAME => SubWordsTool::call(arguments, &services.vocabulary),
            TelemetryTool::NAME => TelemetryTool::call(arguments, services).await,
            CommonErrorsTool::NAME => CommonErrorsTool::call(arguments, services).await,
            QueryKustoTool::NAME => QueryKustoTool::call(arguments, services).await,
            _ => {
                warn!("Unknown tool requested: {}", name);
                Err(ToolError::not_found(name))
            }
        }
    }
}
