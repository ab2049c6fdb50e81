//! KQL query construction.
//!
//! Templates substitute typed values as KQL literals: timestamps as
//! `datetime(...)`, strings as escaped double-quoted literals, and optional
//! lists as `dynamic([...])` or the `dynamic(null)` sentinel. Raw filter text
//! and free-form queries are the only values passed through verbatim, and
//! both go through [`QueryPolicy`] first.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

use super::error::KustoError;
use crate::core::config::{KustoConfig, QueryMode};

/// Table holding the function host telemetry events.
pub const TELEMETRY_TABLE: &str = "FunctionsTelemetry";

/// Number of rows returned by the common errors query.
pub const COMMON_ERRORS_LIMIT: usize = 50;

/// Look-back window for the common errors query.
pub const COMMON_ERRORS_LOOKBACK_DAYS: u32 = 7;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ============================================================================
// Query Text
// ============================================================================

/// A complete query, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText(String);

impl QueryText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Control commands (`.show tables`, ...) go to the management endpoint.
    pub fn is_control_command(&self) -> bool {
        self.0.trim_start().starts_with('.')
    }
}

impl fmt::Display for QueryText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Literals
// ============================================================================

/// Render a string as a KQL double-quoted literal.
pub fn kql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render a UTC timestamp as a KQL `datetime` literal.
pub fn kql_datetime(value: &DateTime<Utc>) -> String {
    format!("datetime({})", value.format(TIMESTAMP_FORMAT))
}

/// Render an optional list as `dynamic([...])`, or `dynamic(null)` when absent.
pub fn kql_dynamic_list(values: Option<&[String]>) -> String {
    match values {
        None => "dynamic(null)".to_string(),
        Some(values) => {
            let items: Vec<String> = values.iter().map(|v| kql_string(v)).collect();
            format!("dynamic([{}])", items.join(", "))
        }
    }
}

/// Parse a caller-supplied timestamp.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`), a naive date-time which is
/// taken as UTC (`2024-01-01T00:00:00`), or a bare date (`2024-01-01`,
/// midnight UTC).
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, KustoError> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            KustoError::invalid_parameter(format!(
                "'{}' is not a valid timestamp (expected e.g. 2024-01-01T00:00:00Z)",
                text
            ))
        })
}

/// Parse a comma-separated version filter.
///
/// `None`, an empty string, or a list of only blanks means "no filter".
pub fn parse_version_list(raw: Option<&str>) -> Result<Option<Vec<String>>, KustoError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let versions: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    if versions.is_empty() {
        return Ok(None);
    }

    if let Some(bad) = versions.iter().find(|v| !is_valid_version(v)) {
        return Err(KustoError::invalid_parameter(format!(
            "'{}' is not a valid version",
            bad
        )));
    }

    Ok(Some(versions))
}

fn is_valid_version(version: &str) -> bool {
    version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '*'))
}

// ============================================================================
// Templates
// ============================================================================

/// Parameters of the telemetry query.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub core_versions: Option<Vec<String>>,
    pub udf_versions: Option<Vec<String>>,
    pub raw_filter: Option<String>,
}

impl TelemetryQuery {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            core_versions: None,
            udf_versions: None,
            raw_filter: None,
        }
    }

    pub fn core_versions(mut self, versions: Option<Vec<String>>) -> Self {
        self.core_versions = versions;
        self
    }

    pub fn udf_versions(mut self, versions: Option<Vec<String>>) -> Self {
        self.udf_versions = versions;
        self
    }

    /// Extra `where` predicate appended verbatim. Blank text is ignored.
    pub fn raw_filter(mut self, filter: Option<String>) -> Self {
        self.raw_filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Render the query.
    pub fn build(&self) -> Result<QueryText, KustoError> {
        if self.start > self.end {
            return Err(KustoError::invalid_parameter(format!(
                "startDate ({}) is after endDate ({})",
                self.start.format(TIMESTAMP_FORMAT),
                self.end.format(TIMESTAMP_FORMAT)
            )));
        }

        for versions in [&self.core_versions, &self.udf_versions].into_iter().flatten() {
            if let Some(bad) = versions.iter().find(|v| !is_valid_version(v)) {
                return Err(KustoError::invalid_parameter(format!(
                    "'{}' is not a valid version",
                    bad
                )));
            }
        }

        let mut query = format!(
            "let startDate = {start};\n\
             let endDate = {end};\n\
             let coreVersions = {core};\n\
             let udfVersions = {udf};\n\
             {table}\n\
             | where Timestamp between (startDate .. endDate)\n\
             | extend ExtensionName = tostring(Properties[\"extensionName\"]), \
             ExtensionVersion = tostring(Properties[\"extensionVersion\"])\n\
             | where case(\n    \
             ExtensionName == \"core\", isnull(coreVersions) or ExtensionVersion in (coreVersions),\n    \
             ExtensionName == \"udf\", isnull(udfVersions) or ExtensionVersion in (udfVersions),\n    \
             true)\n",
            start = kql_datetime(&self.start),
            end = kql_datetime(&self.end),
            core = kql_dynamic_list(self.core_versions.as_deref()),
            udf = kql_dynamic_list(self.udf_versions.as_deref()),
            table = TELEMETRY_TABLE,
        );

        if let Some(filter) = &self.raw_filter {
            query.push_str(&format!("| where {}\n", filter.trim()));
        }

        query.push_str(
            "| summarize EventCount = count(), FirstSeen = min(Timestamp), LastSeen = max(Timestamp) \
             by ExtensionName, ExtensionVersion, EventName\n\
             | order by EventCount desc",
        );

        Ok(QueryText::new(query))
    }
}

/// Most frequent error signatures over the last `lookback_days`, by count.
pub fn common_errors_query(limit: usize, lookback_days: u32) -> QueryText {
    QueryText::new(format!(
        "{table}\n\
         | where Timestamp > ago({days}d)\n\
         | where Level == \"Error\"\n\
         | extend ErrorCode = tostring(Properties[\"errorCode\"]), \
         ErrorMessage = tostring(Properties[\"errorMessage\"])\n\
         | summarize Count = count(), LastSeen = max(Timestamp) by ErrorCode, ErrorMessage\n\
         | top {limit} by Count desc",
        table = TELEMETRY_TABLE,
        days = lookback_days,
        limit = limit,
    ))
}

// ============================================================================
// Query Policy
// ============================================================================

/// Which caller-supplied query text is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPolicy {
    /// Any query or control command is forwarded as-is.
    Free,

    /// Only single-statement queries whose one source table is
    /// allow-listed. Operators and functions that can pull in another table
    /// are refused, as are control commands and raw filters.
    Restricted { allowed_tables: Vec<String> },
}

impl QueryPolicy {
    pub fn from_config(config: &KustoConfig) -> Self {
        match config.query_mode {
            QueryMode::Free => Self::Free,
            QueryMode::Restricted => Self::Restricted {
                allowed_tables: config.allowed_tables.clone(),
            },
        }
    }

    /// Whether raw filter text may be appended to templates.
    pub fn allows_raw_filters(&self) -> bool {
        matches!(self, Self::Free)
    }

    /// Validate a free-form query.
    pub fn check(&self, query: &str) -> Result<QueryText, KustoError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(KustoError::invalid_parameter("query must not be empty"));
        }

        if let Self::Restricted { allowed_tables } = self {
            if trimmed.starts_with('.') {
                return Err(KustoError::policy(
                    "control commands are not allowed in restricted mode",
                ));
            }

            let masked = mask_literals(trimmed)?;
            if let Some(reason) = restricted_violation(&masked) {
                return Err(KustoError::policy(reason));
            }

            let table = source_table(trimmed).ok_or_else(|| {
                KustoError::policy("could not determine the source table of the query")
            })?;

            if !allowed_tables.iter().any(|t| t == table) {
                return Err(KustoError::policy(format!(
                    "table '{}' is not in the allow-list",
                    table
                )));
            }
        }

        Ok(QueryText::new(trimmed))
    }
}

/// Operators that read from a table other than the piped input.
const FOREIGN_SOURCE_OPERATORS: &[&str] = &[
    "union",
    "join",
    "lookup",
    "find",
    "search",
    "evaluate",
    "invoke",
    "partition",
    "fork",
    "externaldata",
    "external_data",
];

/// Functions that resolve a table, a remote entity or a sub-query result.
const FOREIGN_SOURCE_FUNCTIONS: &[&str] = &[
    "table",
    "cluster",
    "database",
    "materialized_view",
    "external_table",
    "toscalar",
    "materialize",
];

/// Membership operators whose right-hand side may be a tabular expression.
const SET_OPERATORS: &[&str] = &["in", "has_any", "has_all"];

/// Scalar constructors accepted as the first item of a membership list.
const LITERAL_CONSTRUCTORS: &[&str] = &[
    "dynamic", "datetime", "timespan", "guid", "int", "long", "real", "bool", "decimal",
];

/// Blank out string literal contents and `//` comments so keywords inside
/// them are not mistaken for operators. Quotes are kept in place.
fn mask_literals(query: &str) -> Result<String, KustoError> {
    let chars: Vec<char> = query.chars().collect();
    let mut out = String::with_capacity(query.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '`' => {
                return Err(KustoError::policy(
                    "multi-line string literals are not allowed in restricted mode",
                ));
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            quote @ ('\'' | '"') => {
                // @"..." is verbatim: backslash is not an escape there
                let verbatim = i > 0 && chars[i - 1] == '@';
                out.push(quote);
                i += 1;
                loop {
                    match chars.get(i).copied() {
                        None => {
                            return Err(KustoError::policy("unterminated string literal"));
                        }
                        Some(c) if c == quote => {
                            out.push(quote);
                            i += 1;
                            break;
                        }
                        Some('\\') if !verbatim => {
                            out.push_str("  ");
                            i += 2;
                        }
                        Some(_) => {
                            out.push(' ');
                            i += 1;
                        }
                    }
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// First construct in a literal-free query that could read a table other
/// than the leading source.
fn restricted_violation(masked: &str) -> Option<String> {
    let chars: Vec<char> = masked.to_ascii_lowercase().chars().collect();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let next = skip_whitespace(&chars, i);

            if FOREIGN_SOURCE_OPERATORS.contains(&word.as_str()) {
                return Some(format!(
                    "operator '{}' is not allowed in restricted mode",
                    word
                ));
            }
            if FOREIGN_SOURCE_FUNCTIONS.contains(&word.as_str()) && chars.get(next) == Some(&'(') {
                return Some(format!(
                    "function '{}()' is not allowed in restricted mode",
                    word
                ));
            }
            if SET_OPERATORS.contains(&word.as_str()) && !is_literal_list(&chars, next) {
                return Some(format!(
                    "'{}' may only be used with a list of literals in restricted mode",
                    word
                ));
            }
            continue;
        }

        match c {
            ';' => {
                return Some("only a single statement is allowed in restricted mode".to_string());
            }
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth > 0 => {
                return Some("sub-queries are not allowed in restricted mode".to_string());
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

/// Whether the membership list starting at `i` (after `in`, `in~`, ...)
/// begins with a literal rather than something that could name a table.
fn is_literal_list(chars: &[char], i: usize) -> bool {
    let mut i = i;
    if chars.get(i) == Some(&'~') {
        i = skip_whitespace(chars, i + 1);
    }
    if chars.get(i) != Some(&'(') {
        // not a membership test
        return true;
    }

    let first = skip_whitespace(chars, i + 1);
    match chars.get(first).copied() {
        None => true,
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            let mut end = first;
            while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            let word: String = chars[first..end].iter().collect();
            LITERAL_CONSTRUCTORS.contains(&word.as_str())
                && chars.get(skip_whitespace(chars, end)) == Some(&'(')
        }
        Some('[') => false,
        Some(_) => true,
    }
}

/// Leading identifier of the query, i.e. the table it reads from. Handles
/// `['Name']` quoting.
fn source_table(query: &str) -> Option<&str> {
    let query = query.trim_start();

    if let Some(rest) = query.strip_prefix("['").or_else(|| query.strip_prefix("[\"")) {
        let end = rest.find(['\'', '"'])?;
        return Some(&rest[..end]);
    }

    let end = query
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(query.len());
    (end > 0).then(|| &query[..end])
}
