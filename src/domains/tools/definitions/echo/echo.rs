//! Echo tool definition.
//!
//! Greets the caller with the message it sent.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    parse_params, read_only_annotations, success_result,
};

/// Parameters for the echo tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EchoParams {
    /// The message to echo back.
    #[schemars(description = "The message to echo back")]
    pub message: String,
}

/// Echo tool - returns `hello {message}`.
pub struct EchoTool;

impl EchoTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "Echo";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Echoes the message back to the client.";

    /// Execute the tool logic.
    pub fn execute(params: &EchoParams) -> CallToolResult {
        info!("Echo tool called");
        success_result(format!("hello {}", params.message))
    }

    /// Bind arguments and execute.
    pub fn call(arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: EchoParams = parse_params(arguments)?;
        Ok(Self::execute(&params))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<EchoParams>(),
            annotations: Some(read_only_annotations(false)),
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>() -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            async move { Self::call(args).map_err(McpError::from) }.boxed()
        })
    }
}
