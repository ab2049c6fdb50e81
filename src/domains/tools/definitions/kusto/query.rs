//! Free-form KQL tool.
//!
//! Forwards the caller's query text verbatim. Whether that is acceptable is
//! decided by the configured [`QueryPolicy`]: free mode forwards anything,
//! restricted mode only allow-listed tables and no control commands.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::rows_result;
use crate::domains::kusto::QueryPolicy;
use crate::domains::tools::definitions::common::{
    error_result, parse_params, read_only_annotations, run_blocking, until_cancelled,
};
use crate::domains::tools::{ToolError, ToolServices};

/// Parameters for the free-form query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryKustoParams {
    /// KQL query text.
    #[schemars(description = "KQL query to run against the telemetry database")]
    pub query: String,
}

/// Free-form query tool.
pub struct QueryKustoTool;

impl QueryKustoTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "QueryKusto";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Runs a KQL query against the telemetry database and returns the rows as a JSON array. Failed queries return an object with errorMessage and errorKind.";

    #[instrument(skip_all)]
    pub fn execute(params: &QueryKustoParams, services: &ToolServices) -> CallToolResult {
        let query = match services.policy.check(&params.query) {
            Ok(q) => q,
            Err(e) => return error_result(&e.to_string()),
        };

        info!(
            "Running caller-supplied query ({} chars, policy: {})",
            query.as_str().len(),
            policy_name(&services.policy)
        );
        rows_result(services.executor.execute(&query))
    }

    pub async fn call(
        arguments: JsonObject,
        services: &ToolServices,
    ) -> Result<CallToolResult, ToolError> {
        let params: QueryKustoParams = parse_params(arguments)?;
        let services = services.clone();
        run_blocking(move || Self::execute(&params, &services)).await
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<QueryKustoParams>(),
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

fn policy_name(policy: &QueryPolicy) -> &'static str {
    match policy {
        QueryPolicy::Free => "free",
        QueryPolicy::Restricted { .. } => "restricted",
    }
}
