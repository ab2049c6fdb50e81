//! Domains module containing business logic organized by bounded contexts.
//!
//! - **words**: the in-memory vocabulary behind the word tools
//! - **kusto**: KQL templates, query policy and the Kusto REST client
//! - **tools**: the MCP tool surface built on the two domains above

pub mod kusto;
pub mod tools;
pub mod words;
