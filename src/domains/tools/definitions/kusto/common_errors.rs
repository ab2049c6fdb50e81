//! Most common errors tool.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::rows_result;
use crate::domains::kusto::query::{
    COMMON_ERRORS_LIMIT, COMMON_ERRORS_LOOKBACK_DAYS, common_errors_query,
};
use crate::domains::tools::definitions::common::{
    parse_params, read_only_annotations, run_blocking, until_cancelled,
};
use crate::domains::tools::{ToolError, ToolServices};

/// The common errors tool takes no parameters.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CommonErrorsParams {}

/// Common errors tool - top error signatures by occurrence count.
pub struct CommonErrorsTool;

impl CommonErrorsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "GetFabricCommonErrors";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Gets the 50 most common Fabric errors of the last 7 days, ordered by count descending. Returns a JSON array of rows.";

    pub fn execute(services: &ToolServices) -> CallToolResult {
        info!("Running common errors query");
        let query = common_errors_query(COMMON_ERRORS_LIMIT, COMMON_ERRORS_LOOKBACK_DAYS);
        rows_result(services.executor.execute(&query))
    }

    pub async fn call(
        arguments: JsonObject,
        services: &ToolServices,
    ) -> Result<CallToolResult, ToolError> {
        let _params: CommonErrorsParams = parse_params(arguments)?;
        let services = services.clone();
        run_blocking(move || Self::execute(&services)).await
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<CommonErrorsParams>(),
            annotations: Some(read_only_annotations(true)),
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>(services: ToolServices) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let ct = ctx.request_context.ct.clone();
            let services = services.clone();
            async move {
                until_cancelled(Self::NAME, Self::call(args, &services), ct.cancelled()).await
            }
            .boxed()
        })
    }
}
