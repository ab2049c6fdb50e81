//! Telemetry summary tool.
//!
//! Builds the telemetry query from typed parameters and runs it against the
//! configured cluster.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, instrument};

use super::rows_result;
use crate::domains::kusto::query::{parse_timestamp, parse_version_list};
use crate::domains::kusto::{KustoError, QueryPolicy, QueryText, TelemetryQuery};
use crate::domains::tools::definitions::common::{
    error_result, parse_params, read_only_annotations, run_blocking, until_cancelled,
};
use crate::domains::tools::{ToolError, ToolServices};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the telemetry tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryParams {
    /// Start of the window.
    #[schemars(description = "Start of the time window, ISO-8601 (e.g. 2024-01-01T00:00:00Z)")]
    pub start_date: String,

    /// End of the window.
    #[schemars(description = "End of the time window, ISO-8601 (e.g. 2024-01-02T00:00:00Z)")]
    pub end_date: String,

    /// Core extension version(s), comma-separated.
    #[schemars(description = "Optional core extension version filter, comma-separated")]
    #[serde(default)]
    pub core_version: Option<String>,

    /// UDF extension version(s), comma-separated.
    #[schemars(description = "Optional UDF extension version filter, comma-separated")]
    #[serde(default)]
    pub udf_version: Option<String>,

    /// Extra KQL predicate.
    #[schemars(
        description = "Optional extra KQL predicate appended as '| where <filter>' (disabled in restricted mode)"
    )]
    #[serde(default)]
    pub filter: Option<String>,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Telemetry tool - event counts per extension, version and event name.
pub struct TelemetryTool;

impl TelemetryTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "LogIntoKustoAndGetTelemetry";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Logs into Kusto and gets telemetry event counts between startDate and endDate, optionally filtered by core and UDF extension versions. Returns a JSON array of rows.";

    /// Render the query for the given parameters.
    pub fn build_query(
        params: &TelemetryParams,
        policy: &QueryPolicy,
    ) -> Result<QueryText, KustoError> {
        let start = parse_timestamp(&params.start_date)?;
        let end = parse_timestamp(&params.end_date)?;

        let has_filter = params
            .filter
            .as_deref()
            .is_some_and(|f| !f.trim().is_empty());
        if has_filter && !policy.allows_raw_filters() {
            return Err(KustoError::policy(
                "raw filters are disabled in restricted query mode",
            ));
        }

        TelemetryQuery::new(start, end)
            .core_versions(parse_version_list(params.core_version.as_deref())?)
            .udf_versions(parse_version_list(params.udf_version.as_deref())?)
            .raw_filter(params.filter.clone())
            .build()
    }

    /// Execute the tool logic. Blocks on the network.
    #[instrument(skip_all, fields(start = %params.start_date, end = %params.end_date))]
    pub fn execute(params: &TelemetryParams, services: &ToolServices) -> CallToolResult {
        let query = match Self::build_query(params, &services.policy) {
            Ok(q) => q,
            Err(e) => return error_result(&e.to_string()),
        };

        info!("Running telemetry query");
        rows_result(services.executor.execute(&query))
    }

    pub async fn call(
        arguments: JsonObject,
        services: &ToolServices,
    ) -> Result<CallToolResult, ToolError> {
        let params: TelemetryParams = parse_params(arguments)?;
        let services = services.clone();
        run_blocking(move || Self::execute(&params, &services)).await
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<TelemetryParams>(),
            annotations: Some(read_only_annotations(true)),
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::testing::{FakeExecutor, is_error, services_with, text_of};
    use std::sync::Arc;

    fn params(start: &str, end: &str) -> TelemetryParams {
        TelemetryParams {
            start_date: start.to_string(),
            end_date: end.to_string(),
            core_version: None,
            udf_version: None,
            filter: None,
        }
    }

    #[test]
    fn test_params_deserialization() {
        let json = r#"{"startDate": "2024-01-01T00:00:00Z", "endDate": "2024-01-02T00:00:00Z", "coreVersion": null}"#;
        let params: TelemetryParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.start_date, "2024-01-01T00:00:00Z");
        assert!(params.core_version.is_none());
        assert!(params.udf_version.is_none());
    }

    #[test]
    fn test_build_query_null_filters() {
        let query = TelemetryTool::build_query(
            &params("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"),
            &QueryPolicy::Free,
        )
        .unwrap();
        let text = query.as_str();
        assert_eq!(text.matches("dynamic(null)").count(), 2);
        assert!(text.contains("datetime(2024-01-01T00:00:00Z)"));
        assert!(text.contains("datetime(2024-01-02T00:00:00Z)"));
    }

    #[test]
    fn test_build_query_filter_blocked_in_restricted_mode() {
        let mut p = params("2024-01-01", "2024-01-02");
        p.filter = Some("EventName == 'x'".to_string());
        let restricted = QueryPolicy::Restricted {
            allowed_tables: vec![],
        };
        assert!(matches!(
            TelemetryTool::build_query(&p, &restricted),
            Err(KustoError::PolicyViolation(_))
        ));
        assert!(TelemetryTool::build_query(&p, &QueryPolicy::Free).is_ok());
    }

    #[test]
    fn test_invalid_dates_fail_before_network() {
        let executor = Arc::new(FakeExecutor::echoing());
        let services = services_with(executor.clone(), QueryPolicy::Free);

        for (start, end) in [("not-a-date", "2024-01-02"), ("2024-02-01", "2024-01-01")] {
            let result = TelemetryTool::execute(&params(start, end), &services);
            assert!(is_error(&result), "{start}..{end} should be rejected");
        }
        assert!(executor.recorded().is_empty());
    }

    #[test]
    fn test_execute_runs_query() {
        let executor = Arc::new(FakeExecutor::echoing());
        let services = services_with(executor.clone(), QueryPolicy::Free);

        let mut p = params("2024-01-01", "2024-01-02");
        p.core_version = Some("1.0.0,1.1.0".to_string());
        let result = TelemetryTool::execute(&p, &services);
        assert!(!is_error(&result));

        let rows: Vec<serde_json::Value> = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(rows.len(), 1);
        let recorded = executor.recorded();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].contains(r#"dynamic(["1.0.0", "1.1.0"])"#));
    }

    #[tokio::test]
    async fn test_call_binds_camel_case_arguments() {
        let executor = Arc::new(FakeExecutor::echoing());
        let services = services_with(executor.clone(), QueryPolicy::Free);

        let args = serde_json::json!({
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-02T00:00:00Z",
            "udfVersion": "2.0.0"
        });
        let serde_json::Value::Object(args) = args else {
            unreachable!()
        };
        let result = TelemetryTool::call(args, &services).await.unwrap();
        assert!(!is_error(&result));
        assert!(executor.recorded()[0].contains(r#"let udfVersions = dynamic(["2.0.0"]);"#));
    }
}
