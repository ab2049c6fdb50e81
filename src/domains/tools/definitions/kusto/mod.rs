//! Kusto telemetry tools.
//!
//! - `telemetry`: parameterized telemetry summary over a time window
//! - `common_errors`: most frequent error signatures
//! - `query`: free-form KQL, subject to the configured query policy
//!
//! Remote failures come back as a successful result whose text is an
//! `{"errorMessage", "errorKind"}` object, so a failed query never turns into
//! a protocol-level fault. Parameter and policy problems are detected before
//! any request is sent and are reported as tool errors.

pub mod common_errors;
pub mod query;
pub mod telemetry;

pub use common_errors::CommonErrorsTool;
pub use query::{QueryKustoParams, QueryKustoTool};
pub use telemetry::{TelemetryParams, TelemetryTool};

use rmcp::model::CallToolResult;
use tracing::warn;

use super::common::{error_result, success_result};
use crate::domains::kusto::{KustoError, QueryResult, RemoteErrorPayload};

/// Turn a query outcome into a tool result.
pub fn rows_result(result: Result<QueryResult, KustoError>) -> CallToolResult {
    match result {
        Ok(result) => match result.rows_json() {
            Ok(json) => success_result(json),
            Err(e) => error_result(&format!("Failed to serialize rows: {}", e)),
        },
        Err(e) if e.is_local() => error_result(&e.to_string()),
        Err(e) => {
            warn!("Remote query failed: {}", e);
            payload_result(&e.to_payload())
        }
    }
}

fn payload_result(payload: &RemoteErrorPayload) -> CallToolResult {
    match serde_json::to_string(payload) {
        Ok(json) => success_result(json),
        Err(e) => error_result(&format!("{} ({})", payload.error_message, e)),
    }
}
