//! Shared dependencies handed to every tool route.

use std::sync::Arc;

use crate::core::config::Config;
use crate::domains::kusto::{KustoClient, QueryExecutor, QueryPolicy};
use crate::domains::words::{Vocabulary, load_vocabulary};

/// Read-only state the tools operate on.
///
/// Built once at startup. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct ToolServices {
    pub vocabulary: Arc<Vocabulary>,
    pub executor: Arc<dyn QueryExecutor>,
    pub policy: Arc<QueryPolicy>,
}

impl ToolServices {
    pub fn new(
        vocabulary: Vocabulary,
        executor: Arc<dyn QueryExecutor>,
        policy: QueryPolicy,
    ) -> Self {
        Self {
            vocabulary: Arc::new(vocabulary),
            executor,
            policy: Arc::new(policy),
        }
    }

    /// Load the vocabulary and set up the Kusto client from configuration.
    pub fn from_config(config: &Config) -> Self {
        let vocabulary = load_vocabulary(&config.words);
        let client = KustoClient::new(config.kusto.clone(), config.credentials.clone());
        Self::new(
            vocabulary,
            Arc::new(client),
            QueryPolicy::from_config(&config.kusto),
        )
    }
}
