use anyhow::Result;
pub use propscope_metadata::{CreateWebsiteParams, Website};

use crate::backend::random_id;
use crate::DuckDbBackend;

impl DuckDbBackend {
    pub async fn create_website(&self, params: CreateWebsiteParams) -> Result<Website> {
        let conn = self.conn.lock().await;
        let id = random_id("site");

        conn.execute(
            "INSERT INTO websites (id, name, domain, created_at) \
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
            duckdb::params![id, params.name, params.domain],
        )?;

        // Read back the created row to get the timestamp.
        let mut stmt = conn.prepare(
            "SELECT id, name, domain, CAST(created_at AS VARCHAR) FROM websites WHERE id = ?1",
        )?;
        let website = stmt.query_row(duckdb::params![id], |row| {
            Ok(Website {
                id: row.get(0)?,
                name: row.get(1)?,
                domain: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        Ok(website)
    }

    pub async fn get_website(&self, id: &str) -> Result<Option<Website>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, domain, CAST(created_at AS VARCHAR) FROM websites WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(duckdb::params![id], |row| {
            Ok(Website {
                id: row.get(0)?,
                name: row.get(1)?,
                domain: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    /// Return `true` if a website with the given id exists.
    pub async fn website_exists(&self, website_id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM websites WHERE id = ?1")?;
        let count: i64 = stmt.query_row(duckdb::params![website_id], |row| row.get(0))?;
        Ok(count > 0)
    }
}
