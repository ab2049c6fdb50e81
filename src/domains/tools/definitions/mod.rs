//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file for better maintainability.

pub mod common;
pub mod echo;
pub mod kusto;
pub mod words;

pub use echo::{EchoLengthTool, EchoParams, EchoTool};
pub use kusto::{
    CommonErrorsTool, QueryKustoParams, QueryKustoTool, TelemetryParams, TelemetryTool,
};
pub use words::{RandomWordTool, SubWordsParams, SubWordsTool};
