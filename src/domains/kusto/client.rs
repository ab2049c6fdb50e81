//! Kusto REST client.
//!
//! Each call to [`KustoClient::execute`] opens its own [`KustoSession`]
//! (HTTP client plus bearer token), runs the query, and drops the session on
//! return. Nothing is shared between concurrent calls.

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::error::KustoError;
use super::query::QueryText;
use crate::core::config::{CredentialsConfig, KustoConfig, MAX_KUSTO_RETRIES};

// ============================================================================
// Configuration & Constants
// ============================================================================

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const CLIENT_APP_NAME: &str = "kusto-words-mcp";
const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 8_000;

// ============================================================================
// Results
// ============================================================================

/// One result row: column name to scalar value.
pub type QueryRow = serde_json::Map<String, Value>;

/// Primary result table of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<QueryRow>,
}

impl QueryResult {
    /// Parse a V1 REST response body. The first table is the primary result.
    pub fn from_v1_body(body: &[u8]) -> Result<Self, KustoError> {
        let response: V1Response = serde_json::from_slice(body)
            .map_err(|e| KustoError::InvalidResponse(format!("JSON parse error: {e}")))?;

        let Some(table) = response.tables.into_iter().next() else {
            return Ok(Self::default());
        };

        debug!(
            "Primary table '{}': {} columns, {} rows",
            table.table_name,
            table.columns.len(),
            table.rows.len()
        );

        let columns: Vec<String> = table.columns.into_iter().map(|c| c.column_name).collect();
        let rows = table
            .rows
            .into_iter()
            .map(|row| Self::zip_row(&columns, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { columns, rows })
    }

    fn zip_row(columns: &[String], row: Value) -> Result<QueryRow, KustoError> {
        match row {
            Value::Array(values) => {
                if values.len() != columns.len() {
                    return Err(KustoError::InvalidResponse(format!(
                        "row has {} values but the table has {} columns",
                        values.len(),
                        columns.len()
                    )));
                }
                Ok(columns.iter().cloned().zip(values).collect())
            }
            // Failures after streaming started are reported in-band
            Value::Object(obj) if obj.contains_key("Exceptions") => {
                let message = match &obj["Exceptions"] {
                    Value::Array(items) => items
                        .iter()
                        .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                        .collect::<Vec<_>>()
                        .join("; "),
                    other => other.to_string(),
                };
                Err(KustoError::Query {
                    code: "PartialQueryFailure".to_string(),
                    message,
                })
            }
            other => Err(KustoError::InvalidResponse(format!(
                "unexpected row shape: {other}"
            ))),
        }
    }

    /// Serialize the rows as a JSON array of objects.
    pub fn rows_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.rows)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    db: &'a str,
    csl: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Response {
    #[serde(default)]
    tables: Vec<V1Table>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Table {
    #[serde(default)]
    table_name: String,
    columns: Vec<V1Column>,
    #[serde(default)]
    rows: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct V1Column {
    column_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(rename = "@message", default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ============================================================================
// Executor Trait
// ============================================================================

/// Runs a query and returns its primary result.
///
/// Implementations must be safe to call from several blocking workers at
/// once; the tools share one executor behind an `Arc`.
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, query: &QueryText) -> Result<QueryResult, KustoError>;
}

// ============================================================================
// Client
// ============================================================================

/// Client for a single cluster and database.
#[derive(Debug, Clone)]
pub struct KustoClient {
    config: KustoConfig,
    credentials: CredentialsConfig,
}

impl KustoClient {
    pub fn new(config: KustoConfig, credentials: CredentialsConfig) -> Self {
        Self {
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &KustoConfig {
        &self.config
    }

    fn backoff(attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS))
    }
}

impl QueryExecutor for KustoClient {
    #[instrument(skip_all, fields(database = %self.config.database))]
    fn execute(&self, query: &QueryText) -> Result<QueryResult, KustoError> {
        let session = KustoSession::open(&self.config, &self.credentials)?;

        // Control commands may have side effects, so they run exactly once
        let attempts = if query.is_control_command() {
            1
        } else {
            self.config.max_retries.min(MAX_KUSTO_RETRIES) + 1
        };

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = Self::backoff(attempt);
                debug!(
                    "Retrying (attempt {}/{}) after {:?}",
                    attempt + 1,
                    attempts,
                    delay
                );
                std::thread::sleep(delay);
            }

            match session.run(query) {
                Ok(result) => {
                    info!("Query returned {} rows", result.rows.len());
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    warn!("Query attempt {} failed: {}", attempt + 1, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// An authenticated connection scoped to one `execute` call.
struct KustoSession<'a> {
    http: Client,
    token: Option<String>,
    config: &'a KustoConfig,
}

impl<'a> KustoSession<'a> {
    fn open(config: &'a KustoConfig, credentials: &CredentialsConfig) -> Result<Self, KustoError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KustoError::transport(format!("Failed to create HTTP client: {e}")))?;

        let token = Self::acquire_token(&http, config, credentials)?;
        debug!("Kusto session opened for {}", config.cluster_url);

        Ok(Self {
            http,
            token,
            config,
        })
    }

    fn acquire_token(
        http: &Client,
        config: &KustoConfig,
        credentials: &CredentialsConfig,
    ) -> Result<Option<String>, KustoError> {
        if let Some(token) = &credentials.kusto_access_token {
            return Ok(Some(token.clone()));
        }

        let (Some(tenant), Some(client_id), Some(secret)) = (
            credentials.kusto_tenant_id.as_deref(),
            credentials.kusto_client_id.as_deref(),
            credentials.kusto_client_secret.as_deref(),
        ) else {
            warn!("No Kusto credentials configured - sending unauthenticated request");
            return Ok(None);
        };

        let url = format!("{AUTHORITY_HOST}/{tenant}/oauth2/v2.0/token");
        let scope = format!("{}/.default", config.cluster_url.trim_end_matches('/'));

        let response = http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", secret),
                ("scope", scope.as_str()),
            ])
            .send()
            .map_err(|e| KustoError::authentication(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(KustoError::authentication(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| KustoError::authentication(format!("Invalid token response: {e}")))?;

        debug!("Acquired access token for {}", scope);
        Ok(Some(token.access_token))
    }

    fn endpoint(&self, query: &QueryText) -> String {
        let kind = if query.is_control_command() {
            "mgmt"
        } else {
            "query"
        };
        format!(
            "{}/v1/rest/{}",
            self.config.cluster_url.trim_end_matches('/'),
            kind
        )
    }

    fn run(&self, query: &QueryText) -> Result<QueryResult, KustoError> {
        let url = self.endpoint(query);
        debug!("POST {}", url);

        let mut request = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("x-ms-app", CLIENT_APP_NAME)
            .json(&QueryRequest {
                db: &self.config.database,
                csl: query.as_str(),
            });

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(Self::status_error(status, response));
        }

        let body = response.bytes().map_err(|e| self.map_send_error(e))?;
        debug!("Response received: {} bytes", body.len());
        QueryResult::from_v1_body(&body)
    }

    fn map_send_error(&self, e: reqwest::Error) -> KustoError {
        if e.is_timeout() {
            KustoError::Timeout(self.config.timeout_secs)
        } else if e.is_connect() {
            KustoError::transport(format!("Connection failed: {e}"))
        } else {
            KustoError::transport(e.to_string())
        }
    }

    fn status_error(status: StatusCode, response: Response) -> KustoError {
        let body = response.text().unwrap_or_default();
        let api_error = serde_json::from_str::<ApiErrorBody>(&body).ok().map(|b| b.error);
        let message = api_error
            .as_ref()
            .map(|e| e.detail.clone().unwrap_or_else(|| e.message.clone()))
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                KustoError::authentication(format!("{status}: {message}"))
            }
            StatusCode::TOO_MANY_REQUESTS => KustoError::transport(format!("Throttled: {message}")),
            s if s.is_server_error() => {
                KustoError::transport(format!("Server error ({status}): {message}"))
            }
            _ => KustoError::Query {
                code: api_error
                    .map(|e| e.code)
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| status.as_u16().to_string()),
                message,
            },
        }
    }
}

impl Drop for KustoSession<'_> {
    fn drop(&mut self) {
        debug!("Kusto session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QueryMode;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    const SAMPLE_BODY: &str = r#"{
        "Tables": [
            {
                "TableName": "Table_0",
                "Columns": [
                    {"ColumnName": "State", "DataType": "String", "ColumnType": "string"},
                    {"ColumnName": "Count", "DataType": "Int64", "ColumnType": "long"},
                    {"ColumnName": "LastSeen", "DataType": "DateTime", "ColumnType": "datetime"}
                ],
                "Rows": [
                    ["TEXAS", 4701, "2007-12-31T23:53:00Z"],
                    ["KANSAS", 3166, null]
                ]
            },
            {
                "TableName": "Table_1",
                "Columns": [{"ColumnName": "Value", "DataType": "String"}],
                "Rows": [["ignored"]]
            }
        ]
    }"#;

    /// Serve one canned HTTP response per connection and return the raw
    /// requests that were received.
    fn serve(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request = String::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                    request.push_str(&line);
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                }
                let mut body_buf = vec![0u8; content_length];
                reader.read_exact(&mut body_buf).unwrap();
                request.push_str(&String::from_utf8_lossy(&body_buf));
                requests.push(request);

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            requests
        });

        (url, handle)
    }

    fn client_for(url: &str, max_retries: u32) -> KustoClient {
        let config = KustoConfig {
            cluster_url: url.to_string(),
            database: "Samples".to_string(),
            timeout_secs: 5,
            max_retries,
            query_mode: QueryMode::Free,
            allowed_tables: Vec::new(),
        };
        let credentials = CredentialsConfig {
            kusto_access_token: Some("test-token".to_string()),
            ..Default::default()
        };
        KustoClient::new(config, credentials)
    }

    #[test]
    fn test_parse_v1_body() {
        let result = QueryResult::from_v1_body(SAMPLE_BODY.as_bytes()).unwrap();
        assert_eq!(result.columns, vec!["State", "Count", "LastSeen"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0]["State"], "TEXAS");
        assert_eq!(result.rows[0]["Count"], 4701);
        assert!(result.rows[1]["LastSeen"].is_null());
    }

    #[test]
    fn test_parse_v1_empty_tables() {
        let result = QueryResult::from_v1_body(br#"{"Tables": []}"#).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.rows_json().unwrap(), "[]");
    }

    #[test]
    fn test_parse_v1_exception_row() {
        let body = r#"{"Tables": [{"TableName": "Table_0",
            "Columns": [{"ColumnName": "x"}],
            "Rows": [[1], {"Exceptions": ["Query execution has exceeded the allowed limits"]}]}]}"#;
        let result = QueryResult::from_v1_body(body.as_bytes());
        match result {
            Err(KustoError::Query { code, message }) => {
                assert_eq!(code, "PartialQueryFailure");
                assert!(message.contains("exceeded"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_v1_invalid() {
        assert!(matches!(
            QueryResult::from_v1_body(b"<html>"),
            Err(KustoError::InvalidResponse(_))
        ));
        let mismatched = r#"{"Tables": [{"TableName": "t", "Columns": [{"ColumnName": "a"}], "Rows": [[1, 2]]}]}"#;
        assert!(matches!(
            QueryResult::from_v1_body(mismatched.as_bytes()),
            Err(KustoError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_execute_success() {
        let (url, server) = serve(vec![("200 OK", SAMPLE_BODY.to_string())]);
        let client = client_for(&url, 0);

        let result = client
            .execute(&QueryText::new("StormEvents | summarize Count = count() by State"))
            .unwrap();
        assert_eq!(result.rows.len(), 2);

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /v1/rest/query "));
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer test-token"));
        assert!(requests[0].contains(r#""db":"Samples""#));
    }

    #[test]
    fn test_control_command_uses_mgmt_endpoint() {
        let (url, server) = serve(vec![("200 OK", r#"{"Tables": []}"#.to_string())]);
        let client = client_for(&url, 3);

        client.execute(&QueryText::new(".show tables")).unwrap();
        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /v1/rest/mgmt "));
    }

    #[test]
    fn test_execute_syntax_error() {
        let body = r#"{"error": {"code": "General_BadRequest", "message": "Request is invalid and cannot be executed.", "@message": "Syntax error: Query could not be parsed"}}"#;
        let (url, server) = serve(vec![("400 Bad Request", body.to_string())]);
        let client = client_for(&url, 2);

        match client.execute(&QueryText::new("StormEvents | wher x")) {
            Err(KustoError::Query { code, message }) => {
                assert_eq!(code, "General_BadRequest");
                assert!(message.contains("Syntax error"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // Syntax errors are not retried
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn test_execute_unauthorized() {
        let (url, server) = serve(vec![("401 Unauthorized", String::new())]);
        let client = client_for(&url, 2);

        let result = client.execute(&QueryText::new("StormEvents | take 1"));
        assert!(matches!(result, Err(KustoError::Authentication(_))));
        server.join().unwrap();
    }

    #[test]
    fn test_execute_retries_server_errors() {
        let (url, server) = serve(vec![
            ("503 Service Unavailable", "busy".to_string()),
            ("200 OK", SAMPLE_BODY.to_string()),
        ]);
        let client = client_for(&url, 1);

        let result = client.execute(&QueryText::new("StormEvents | take 2")).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_backoff_is_bounded() {
        assert_eq!(KustoClient::backoff(1), Duration::from_millis(500));
        assert_eq!(KustoClient::backoff(3), Duration::from_millis(2_000));
        assert_eq!(KustoClient::backoff(5), Duration::from_millis(MAX_DELAY_MS));
        assert_eq!(KustoClient::backoff(u32::MAX), Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn test_execute_connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = client_for(&format!("http://127.0.0.1:{port}"), 0);

        let result = client.execute(&QueryText::new("StormEvents | take 1"));
        let err = result.unwrap_err();
        assert_eq!(err.to_payload().error_kind, "TransportError");
    }

    // Integration test (requires network and credentials, run with: cargo test -- --ignored)
    #[ignore]
    #[test]
    fn test_help_cluster_query() {
        let config = crate::core::Config::from_env();
        let client = KustoClient::new(config.kusto, config.credentials);
        let result = client
            .execute(&QueryText::new("StormEvents | take 3"))
            .unwrap();
        assert_eq!(result.rows.len(), 3);
    }
}
