//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (including a `.env` file) or defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Word list configuration.
    pub words: WordsConfig,

    /// Kusto cluster configuration.
    pub kusto: KustoConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Credentials for the Kusto cluster.
    pub credentials: CredentialsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Configuration for the words domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordsConfig {
    /// Newline-separated word list. The embedded list is used when unset.
    pub wordlist_path: Option<PathBuf>,
}

/// How the free-form `QueryKusto` tool treats caller-supplied text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Forward any query or control command.
    #[default]
    Free,

    /// Only allow-listed tables, no control commands or raw filters.
    Restricted,
}

impl QueryMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "restricted" | "allowlist" | "allow-list" => Some(Self::Restricted),
            _ => None,
        }
    }
}

/// Upper bound for `MCP_KUSTO_MAX_RETRIES`.
pub const MAX_KUSTO_RETRIES: u32 = 5;

/// Kusto cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KustoConfig {
    /// Cluster URL, e.g. `https://help.kusto.windows.net`.
    pub cluster_url: String,

    /// Database queries run against.
    pub database: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Extra attempts for failed queries (never applied to control commands).
    /// At most [`MAX_KUSTO_RETRIES`].
    pub max_retries: u32,

    /// Trust mode for free-form queries.
    pub query_mode: QueryMode,

    /// Tables reachable from `QueryKusto` in restricted mode.
    pub allowed_tables: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Credentials for the Kusto cluster.
///
/// Either a pre-issued bearer token, or an app registration used with the
/// client credentials grant. With neither, requests are sent anonymously
/// (useful against a local emulator).
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(skip_serializing)]
    pub kusto_access_token: Option<String>,
    pub kusto_tenant_id: Option<String>,
    pub kusto_client_id: Option<String>,
    #[serde(skip_serializing)]
    pub kusto_client_secret: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field(
                "kusto_access_token",
                &self.kusto_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("kusto_tenant_id", &self.kusto_tenant_id)
            .field("kusto_client_id", &self.kusto_client_id)
            .field(
                "kusto_client_secret",
                &self.kusto_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for KustoConfig {
    fn default() -> Self {
        Self {
            cluster_url: "https://help.kusto.windows.net".to_string(),
            database: "Samples".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            query_mode: QueryMode::Free,
            allowed_tables: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "kusto-words-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            words: WordsConfig::default(),
            kusto: KustoConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_KUSTO_CLUSTER_URL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(value) = std::env::var("MCP_LOG_TIMESTAMPS") {
            config.logging.with_timestamps = parse_bool(&value).unwrap_or(true);
        }

        if let Ok(path) = std::env::var("MCP_WORDLIST_PATH") {
            config.words.wordlist_path = Some(PathBuf::from(path));
        }

        config.transport = TransportConfig::from_env();
        config.kusto = KustoConfig::from_env();
        config.credentials = CredentialsConfig::from_env();

        config
    }
}

impl KustoConfig {
    /// Read `MCP_KUSTO_*` variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MCP_KUSTO_CLUSTER_URL") {
            config.cluster_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(database) = std::env::var("MCP_KUSTO_DATABASE") {
            config.database = database;
        }

        if let Some(timeout) = env_parse::<u64>("MCP_KUSTO_TIMEOUT_SECS") {
            config.timeout_secs = timeout.max(1);
        }

        if let Some(retries) = env_parse::<u32>("MCP_KUSTO_MAX_RETRIES") {
            if retries > MAX_KUSTO_RETRIES {
                warn!(
                    "MCP_KUSTO_MAX_RETRIES={} exceeds the limit, using {}",
                    retries, MAX_KUSTO_RETRIES
                );
            }
            config.max_retries = retries.min(MAX_KUSTO_RETRIES);
        }

        if let Ok(mode) = std::env::var("MCP_KUSTO_QUERY_MODE") {
            match QueryMode::parse(&mode) {
                Some(mode) => config.query_mode = mode,
                None => warn!("Unknown MCP_KUSTO_QUERY_MODE '{}', using free mode", mode),
            }
        }

        if let Ok(tables) = std::env::var("MCP_KUSTO_ALLOWED_TABLES") {
            config.allowed_tables = tables
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        if config.query_mode == QueryMode::Free {
            warn!(
                "QueryKusto runs in free mode - any query text is forwarded. \
                 Set MCP_KUSTO_QUERY_MODE=restricted to limit it to MCP_KUSTO_ALLOWED_TABLES."
            );
        } else {
            info!(
                "QueryKusto restricted to tables: {:?}",
                config.allowed_tables
            );
        }

        config
    }
}

impl CredentialsConfig {
    /// Read `MCP_KUSTO_ACCESS_TOKEN` or the client credentials triple.
    pub fn from_env() -> Self {
        let credentials = Self {
            kusto_access_token: std::env::var("MCP_KUSTO_ACCESS_TOKEN").ok(),
            kusto_tenant_id: std::env::var("MCP_KUSTO_TENANT_ID").ok(),
            kusto_client_id: std::env::var("MCP_KUSTO_CLIENT_ID").ok(),
            kusto_client_secret: std::env::var("MCP_KUSTO_CLIENT_SECRET").ok(),
        };

        if credentials.kusto_access_token.is_some() {
            info!("Kusto access token loaded from environment");
        } else if credentials.has_client_credentials() {
            info!("Kusto client credentials loaded from environment");
        } else {
            warn!(
                "No Kusto credentials configured. Set MCP_KUSTO_ACCESS_TOKEN, or \
                 MCP_KUSTO_TENANT_ID, MCP_KUSTO_CLIENT_ID and MCP_KUSTO_CLIENT_SECRET"
            );
        }

        credentials
    }

    /// Whether the full client credentials triple is present.
    pub fn has_client_credentials(&self) -> bool {
        self.kusto_tenant_id.is_some()
            && self.kusto_client_id.is_some()
            && self.kusto_client_secret.is_some()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid value for {}: '{}'", name, value);
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
