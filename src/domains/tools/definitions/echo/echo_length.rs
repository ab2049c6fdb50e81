//! Echo length tool definition.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use tracing::info;

use super::echo::EchoParams;
use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    parse_params, read_only_annotations, success_result,
};

/// Echo length tool - returns `hello {length}` where length counts UTF-16
/// code units, so characters outside the BMP (emoji) count as two.
pub struct EchoLengthTool;

impl EchoLengthTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "EchoLength";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Echoes the message length (in UTF-16 code units) back to the client.";

    pub fn execute(params: &EchoParams) -> CallToolResult {
        let length = params.message.encode_utf16().count();
        info!("EchoLength tool called ({} UTF-16 units)", length);
        success_result(format!("hello {}", length))
    }

    pub fn call(arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: EchoParams = parse_params(arguments)?;
        Ok(Self::execute(&params))
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::testing::text_of;

    #[test]
    fn test_echo_length_counts_utf16_units() {
        for (message, expected) in [
            ("", "hello 0"),
            ("abc", "hello 3"),
            ("héllo", "hello 5"),
            ("😀", "hello 2"),
            ("a😀b", "hello 4"),
        ] {
            let params = EchoParams {
                message: message.to_string(),
            };
            assert_eq!(text_of(&EchoLengthTool::execute(&params)), expected);
        }
    }
}
