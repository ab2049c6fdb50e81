//! Sub-word lookup tool definition.
//!
//! Lists every vocabulary word that can be spelled with the letters of the
//! given word, each letter used at most as often as it appears.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domains::tools::ToolError;
use crate::domains::tools::definitions::common::{
    error_result, parse_params, read_only_annotations, success_result,
};
use crate::domains::words::Vocabulary;

/// Parameters for the sub-word tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SubWordsParams {
    /// The word whose letters are used.
    #[schemars(
        description = "Word whose letters are used. Case is ignored and non-letters are stripped."
    )]
    pub word: String,
}

/// Sub-word tool - returns a JSON array of words.
pub struct SubWordsTool;

impl SubWordsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "GetSubWords";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Gets all english words that can be formed from the letters of the given word. Returns a JSON array ordered longest first.";

    #[instrument(skip_all, fields(word = %params.word))]
    pub fn execute(params: &SubWordsParams, vocabulary: &Vocabulary) -> CallToolResult {
        let words = vocabulary.sub_words(&params.word);
        info!("Found {} sub-words", words.len());

        match serde_json::to_string(&words) {
            Ok(json) => success_result(json),
            Err(e) => error_result(&format!("Failed to serialize sub-words: {}", e)),
        }
    }

    pub fn call(arguments: JsonObject, vocabulary: &Vocabulary) -> Result<CallToolResult, ToolError> {
        let params: SubWordsParams = parse_params(arguments)?;
        Ok(Self::execute(&params, vocabulary))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<SubWordsParams>(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::testing::text_of;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_words(["listen", "silent", "list", "tin", "stone"])
    }

    #[test]
    fn test_sub_words_json() {
        let params = SubWordsParams {
            word: "Silent!".to_string(),
        };
        let result = SubWordsTool::execute(&params, &vocabulary());
        let words: Vec<String> = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(words, vec!["listen", "silent", "list", "tin"]);
    }

    #[test]
    fn test_sub_words_empty_word() {
        let params = SubWordsParams {
            word: String::new(),
        };
        let result = SubWordsTool::execute(&params, &vocabulary());
        assert_eq!(result.is_error, Some(false));
        assert_eq!(text_of(&result), "[]");
    }

    #[test]
    fn test_sub_words_wrong_argument_type() {
        let mut args = JsonObject::new();
        args.insert("word".to_string(), 42.into());
        let result = SubWordsTool::call(args, &vocabulary());
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
