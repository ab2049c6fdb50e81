//! Tool Router - builds the rmcp ToolRouter from the tool definitions.
//!
//! This is the registration table used by the STDIO/TCP transports. Each
//! tool knows how to create its own route.

use rmcp::handler::server::tool::ToolRouter;

use super::ToolServices;
use super::definitions::{
    CommonErrorsTool, EchoLengthTool, EchoTool, QueryKustoTool, RandomWordTool, SubWordsTool,
    TelemetryTool,
};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(services: ToolServices) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(EchoTool::create_route())
        .with_route(EchoLengthTool::create_route())
        .with_route(RandomWordTool::create_route(services.vocabulary.clone()))
        .with_route(SubWordsTool::create_route(services.vocabulary.clone()))
        .with_route(TelemetryTool::create_route(services.clone()))
        .with_route(CommonErrorsTool::create_route(services.clone()))
        .with_route(QueryKustoTool::create_route(services))
}
