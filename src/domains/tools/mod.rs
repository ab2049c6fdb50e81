//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `router.rs` - ToolRouter builder for STDIO/TCP transport
//! - `registry.rs` - Tool metadata and in-process dispatch
//! - `services.rs` - Shared vocabulary, query executor and query policy
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/`
//! 2. Define params, `execute()`, `call()`, `to_tool()` and `create_route()`
//! 3. Export in `definitions/mod.rs`
//! 4. Add the route in `router.rs`
//! 5. Add the name and dispatch arm in `registry.rs`

pub mod definitions;
mod error;
mod registry;
pub mod router;
mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ToolError;
pub use registry::ToolRegistry;
pub use router::build_tool_router;
pub use services::ToolServices;
