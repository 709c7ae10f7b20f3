//! ClickHouse analytics store, spoken to over its HTTP interface.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use propscope_core::config::ClickHouseConfig;

pub mod values;

pub use values::ClickHouseBackend;

/// HTTP client wrapper for ClickHouse.
///
/// Uses ClickHouse's HTTP API: SQL is posted as the request body; named
/// parameters are passed as `param_<name>` query-string entries, allowing
/// ClickHouse to substitute them safely (no SQL injection).
#[derive(Clone)]
pub struct ClickHouseClient {
    client: Client,
    url: String,
    user: String,
    password: String,
    database: String,
}

impl ClickHouseClient {
    pub fn new(config: &ClickHouseConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Execute a ClickHouse SELECT query and return the `data` array.
    ///
    /// `named_params` maps `{name:Type}` placeholder name → value string.
    pub async fn query(&self, sql: &str, named_params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut url = reqwest::Url::parse(&self.url).context("Invalid ClickHouse URL")?;
        {
            let mut qs = url.query_pairs_mut();
            qs.append_pair("default_format", "JSON");
            qs.append_pair("database", &self.database);
            for (k, v) in named_params {
                qs.append_pair(&format!("param_{k}"), v);
            }
        }

        let resp = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .body(sql.to_string())
            .send()
            .await
            .context("ClickHouse HTTP request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse error {status}: {body}");
        }

        let json: Value = resp
            .json()
            .await
            .context("ClickHouse response parse failed")?;
        Ok(json
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Execute a statement that returns no rows (DDL, `SELECT 1` pings).
    pub async fn execute(&self, sql: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .body(sql.to_string())
            .send()
            .await
            .context("ClickHouse request failed")?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse statement error: {body}");
        }
        Ok(())
    }
}

/// Database names are spliced into DDL, so only plain identifiers pass.
fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Apply the ClickHouse schema on startup.
///
/// Safe to call on every startup; all statements use `IF NOT EXISTS`.
pub async fn clickhouse_migrate(client: &ClickHouseClient) -> Result<()> {
    let database = client.database();
    if !is_plain_identifier(database) {
        anyhow::bail!("invalid ClickHouse database name: {database:?}");
    }
    info!(database, "Running ClickHouse schema migration");

    client
        .execute(&format!("CREATE DATABASE IF NOT EXISTS {database}"))
        .await?;

    // event_name is denormalised onto every property row so value queries
    // need no join.
    client
        .execute(&format!(
            "CREATE TABLE IF NOT EXISTS {database}.event_data (
                event_data_id    UUID,
                website_id       LowCardinality(String),
                website_event_id String,
                event_name       LowCardinality(String),
                data_key         LowCardinality(String),
                string_value     Nullable(String),
                number_value     Nullable(Float64),
                date_value       Nullable(DateTime64(3, 'UTC')),
                data_type        UInt8,
                created_at       DateTime64(3, 'UTC')
            ) ENGINE = MergeTree()
            PARTITION BY toYYYYMM(created_at)
            ORDER BY (website_id, event_name, data_key, created_at)"
        ))
        .await?;

    info!("ClickHouse schema migration complete");
    Ok(())
}

/// Read an integer column. ClickHouse's JSON format quotes 64-bit integers
/// by default, so both `"12"` and `12` are accepted.
pub(crate) fn json_i64(row: &Value, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn integers_parse_from_strings_and_numbers() {
        let row = json!({ "a": "42", "b": 7, "c": "x", "d": null });
        assert_eq!(json_i64(&row, "a"), Some(42));
        assert_eq!(json_i64(&row, "b"), Some(7));
        assert_eq!(json_i64(&row, "c"), None);
        assert_eq!(json_i64(&row, "d"), None);
        assert_eq!(json_i64(&row, "missing"), None);
    }

    #[test]
    fn only_plain_identifiers_are_valid_database_names() {
        assert!(is_plain_identifier("propscope"));
        assert!(is_plain_identifier("analytics_2"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("2fast"));
        assert!(!is_plain_identifier("prod; DROP TABLE x"));
    }
}
