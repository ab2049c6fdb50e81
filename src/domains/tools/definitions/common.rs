//! Common utilities shared across tool definitions.
//!
//! Argument binding, result helpers, and the read-only annotations every
//! tool in this server carries.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content, JsonObject, ToolAnnotations},
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::domains::tools::ToolError;

/// Bind raw call arguments to a tool's parameter struct.
pub fn parse_params<T: DeserializeOwned>(arguments: JsonObject) -> Result<T, ToolError> {
    serde_json::from_value(serde_json::Value::Object(arguments))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// Annotations for tools without side effects.
///
/// `open_world` marks tools that reach out to an external system.
pub fn read_only_annotations(open_world: bool) -> ToolAnnotations {
    ToolAnnotations {
        title: None,
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(open_world),
    }
}

/// Create an error result with a formatted message.
pub fn error_result(message: &str) -> CallToolResult {
    warn!("{}", message);
    CallToolResult::error(vec![Content::text(message.to_string())])
}

/// Create a success result with text content.
pub fn success_result(content: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(content)])
}

/// Run blocking tool work off the async runtime.
pub async fn run_blocking<F>(work: F) -> Result<CallToolResult, ToolError>
where
    F: FnOnce() -> CallToolResult + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ToolError::internal(format!("Task execution failed: {}", e)))
}

/// Error returned when the client cancels an in-flight call.
pub fn cancelled_error(tool: &str) -> McpError {
    McpError::internal_error(format!("{} cancelled by client", tool), None)
}

/// Race tool work against client cancellation.
///
/// Routes pass the request token's `cancelled()` future. A blocking worker
/// already running keeps going until its HTTP timeout; only the wait ends.
pub async fn until_cancelled<W, C>(tool: &str, work: W, cancelled: C) -> Result<CallToolResult, McpError>
where
    W: Future<Output = Result<CallToolResult, ToolError>>,
    C: Future<Output = ()>,
{
    tokio::select! {
        result = work => result.map_err(McpError::from),
        _ = cancelled => {
            info!("{} cancelled by client", tool);
            Err(cancelled_error(tool))
        }
    }
}
