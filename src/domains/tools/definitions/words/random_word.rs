//! Random word tool definition.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    error_result, parse_params, read_only_annotations, success_result,
};
use crate::domains::words::Vocabulary;

/// The random word tool takes no parameters.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RandomWordParams {}

/// Random word tool - returns one word from the vocabulary.
pub struct RandomWordTool;

impl RandomWordTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "RandomWord";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Gets a random english word";

    pub fn execute(vocabulary: &Vocabulary) -> CallToolResult {
        match vocabulary.random_word() {
            Ok(word) => {
                debug!("Random word: {}", word);
                success_result(word.to_string())
            }
            Err(e) => error_result(&e.to_string()),
        }
    }

    pub fn call(arguments: JsonObject, vocabulary: &Vocabulary) -> Result<CallToolResult, ToolError> {
        let _params: RandomWordParams = parse_params(arguments)?;
        Ok(Self::execute(vocabulary))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<RandomWordParams>(),
            annotations: Some(read_only_annotations(false)),
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>(vocabulary: Arc<Vocabulary>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let vocabulary = vocabulary.clone();
            async move { Self::call(args, &vocabulary).map_err(McpError::from) }.boxed()
        })
    }
}
