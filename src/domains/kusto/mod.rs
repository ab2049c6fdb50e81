//! Kusto domain module.
//!
//! Everything needed to talk to the telemetry cluster:
//!
//! - `query` - KQL templates, literal rendering and the free-query policy
//! - `client` - the REST client and the [`QueryExecutor`] seam used by tools
//! - `error` - error type and the `{errorMessage, errorKind}` payload

mod client;
mod error;
pub mod query;

pub use client::{KustoClient, QueryExecutor, QueryResult, QueryRow};
pub use error::{KustoError, RemoteErrorPayload};
pub use query::{QueryPolicy, QueryText, TelemetryQuery};
