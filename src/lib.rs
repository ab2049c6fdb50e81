//! Kusto Words MCP Server Library
//!
//! A Model Context Protocol server exposing a small set of read-only tools:
//! greeting echoes, random words and sub-word lookup over an in-memory
//! vocabulary, and telemetry queries against an Azure Data Explorer (Kusto)
//! cluster.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the server handler and transports
//! - **domains**: business logic organized by bounded contexts
//!   - **words**: vocabulary loading, random pick and sub-word search
//!   - **kusto**: KQL templates, query policy and the REST client
//!   - **tools**: one file per MCP tool plus the router and registry
//!
//! # Example
//!
//! ```rust,no_run
//! use kusto_words_mcp_server::{core::Config, core::McpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = McpServer::new(Config::from_env());
//!     let result = server
//!         .call_tool("GetSubWords", serde_json::json!({ "word": "listen" }))
//!         .await?;
//!     println!("{:?}", result.content);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
