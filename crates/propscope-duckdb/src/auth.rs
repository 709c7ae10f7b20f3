use anyhow::Result;
pub use propscope_metadata::{ApiKeyRecord, CreateApiKeyParams};

use crate::DuckDbBackend;

impl DuckDbBackend {
    /// Create an API key record and its website grants in one transaction.
    ///
    /// An empty `website_ids` list issues a key for every website.
    pub async fn create_api_key(&self, params: CreateApiKeyParams) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO api_keys (id, name, key_hash, key_prefix, all_websites, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)",
            duckdb::params![
                params.id,
                params.name,
                params.key_hash,
                params.key_prefix,
                params.website_ids.is_empty(),
            ],
        )?;
        for website_id in &params.website_ids {
            tx.execute(
                "INSERT OR IGNORE INTO api_key_websites (key_id, website_id) VALUES (?1, ?2)",
                duckdb::params![params.id, website_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Look up an API key by its hash. Returns None if not found or revoked.
    pub async fn lookup_api_key(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, key_prefix, all_websites, \
             CAST(created_at AS VARCHAR), \
             CAST(last_used_at AS VARCHAR), \
             CAST(revoked_at AS VARCHAR) \
             FROM api_keys WHERE key_hash = ?1 AND revoked_at IS NULL",
        )?;
        let mut rows = stmt.query_map(duckdb::params![key_hash], |row| {
            Ok(ApiKeyRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                key_prefix: row.get(2)?,
                all_websites: row.get(3)?,
                created_at: row.get(4)?,
                last_used_at: row.get(5)?,
                revoked_at: row.get(6)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    /// Update last_used_at for an API key.
    pub async fn touch_api_key(&self, key_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE api_keys SET last_used_at = CURRENT_TIMESTAMP WHERE id = ?1",
            duckdb::params![key_id],
        )?;
        Ok(())
    }

    /// Revoke a key. Returns false when no active key has that id.
    pub async fn revoke_api_key(&self, key_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE api_keys SET revoked_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND revoked_at IS NULL",
            duckdb::params![key_id],
        )?;
        Ok(changed > 0)
    }

    pub async fn api_key_has_grant(&self, key_id: &str, website_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare(
                "SELECT COUNT(*) FROM api_key_websites WHERE key_id = ?1 AND website_id = ?2",
            )?
            .query_row(duckdb::params![key_id, website_id], |row| row.get(0))?;
        Ok(count > 0)
    }
}
