//! Test doubles shared by the tool tests.

use rmcp::model::{CallToolResult, RawContent};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::ToolServices;
use crate::domains::kusto::{KustoError, QueryExecutor, QueryPolicy, QueryResult, QueryText};
use crate::domains::words::Vocabulary;

/// Executor that records every query and answers from a closure.
pub struct FakeExecutor {
    pub queries: Mutex<Vec<String>>,
    respond: Box<dyn Fn(&str) -> Result<QueryResult, KustoError> + Send + Sync>,
    delay: Duration,
}

impl FakeExecutor {
    pub fn new(
        respond: impl Fn(&str) -> Result<QueryResult, KustoError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay: Duration::ZERO,
        }
    }

    /// Answer every query with one row `{"query": <text>}`.
    pub fn echoing() -> Self {
        Self::new(|query| {
            let mut row = serde_json::Map::new();
            row.insert("query".to_string(), query.into());
            Ok(QueryResult {
                columns: vec!["query".to_string()],
                rows: vec![row],
            })
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn recorded(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl QueryExecutor for FakeExecutor {
    fn execute(&self, query: &QueryText) -> Result<QueryResult, KustoError> {
        self.queries.lock().unwrap().push(query.as_str().to_string());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        (self.respond)(query.as_str())
    }
}

pub fn services_with(executor: Arc<FakeExecutor>, policy: QueryPolicy) -> ToolServices {
    ToolServices::new(
        Vocabulary::from_words(["listen", "silent", "list", "tin", "net"]),
        executor,
        policy,
    )
}

/// Text of the first content item.
pub fn text_of(result: &CallToolResult) -> String {
    match &result.content[0].raw {
        RawContent::Text(text) => text.text.clone(),
        _ => panic!("Expected text content"),
    }
}

pub fn is_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}
