//! STDIO transport implementation.
//!
//! JSON-RPC framing over stdin/stdout is handled by rmcp. Logs go to stderr
//! so they never interleave with protocol messages.

use rmcp::ServiceExt;
use tracing::{info, warn};

use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// STDIO transport handler.
pub struct StdioTransport;

impl StdioTransport {
    /// Serve a single client on stdin/stdout until it disconnects.
    pub async fn run(server: McpServer) -> TransportResult<()> {
        info!("Ready - communicating via stdin/stdout");

        let service = server
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| TransportError::init(e.to_string()))?;

        tokio::select! {
            result = service.waiting() => {
                result.map_err(|e| TransportError::service(e.to_string()))?;
                info!("Client closed stdin");
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, shutting down");
            }
        }

        info!("STDIO transport finished");
        Ok(())
    }
}
