use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use propscope_core::event::EventDataRecord;

use crate::schema::init_sql;

/// Timestamp text DuckDB parameters are bound with (`CAST(? AS TIMESTAMP)`).
pub(crate) fn ts_param(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Random lowercase alphanumeric id with the given prefix, e.g. `site_x1y2z3a4b5`.
pub(crate) fn random_id(prefix: &str) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let chars: String = (0..10)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();
    format!("{prefix}_{chars}")
}

/// Embedded DuckDB store for event data and metadata.
///
/// DuckDB is single-writer: concurrent reads are fine, but concurrent writes
/// cause contention. The connection sits in `Arc<Mutex<_>>` so every query
/// is serialised while the struct stays cheap to share across handlers.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Runs the schema init SQL so all tables and indexes exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests only; data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Store a batch of event properties in a single transaction.
    ///
    /// The owning `website_event` row is created on first sight of its
    /// `event_id`; later properties of the same event reuse it.
    /// Returns immediately (no-op) if `records` is empty.
    pub async fn insert_event_data(&self, records: &[EventDataRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        for record in records {
            let created_at = ts_param(&record.created_at);
            tx.execute(
                r#"INSERT OR IGNORE INTO website_event (event_id, website_id, event_name, created_at)
                   VALUES (?1, ?2, ?3, CAST(?4 AS TIMESTAMP))"#,
                duckdb::params![
                    record.event_id,
                    record.website_id,
                    record.event_name,
                    created_at,
                ],
            )?;
            tx.execute(
                r#"INSERT INTO event_data (
                    event_data_id, website_id, website_event_id, data_key,
                    string_value, number_value, date_value, data_type, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4,
                    ?5, ?6, CAST(?7 AS TIMESTAMP), ?8, CAST(?9 AS TIMESTAMP)
                )"#,
                duckdb::params![
                    uuid::Uuid::new_v4().to_string(),
                    record.website_id,
                    record.event_id,
                    record.data_key,
                    record.value.string_value(),
                    record.value.number_value(),
                    record.value.date_value().map(|at| ts_param(&at)),
                    record.value.data_type().code(),
                    created_at,
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!("Inserted {} event data rows into DuckDB", records.len());
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    ///
    /// Called by the `/health` endpoint. Returns an error if the connection
    /// is unavailable (file locked, disk full, etc.).
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Insert or replace a website row with a caller-chosen id.
    ///
    /// Intended for test fixtures and first-start seeding. Safe to call
    /// repeatedly with the same `id`.
    pub async fn seed_website(&self, id: &str, domain: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO websites (id, name, domain, created_at)
               VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
               ON CONFLICT (id) DO UPDATE SET domain = EXCLUDED.domain"#,
            duckdb::params![id, domain, domain],
        )?;
        Ok(())
    }
}
