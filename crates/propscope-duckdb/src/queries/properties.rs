use anyhow::Result;
use chrono::{DateTime, Utc};

use propscope_core::analytics::{EventPropertyRow, EVENT_PROPERTIES_LIMIT};

use crate::backend::ts_param;
use crate::DuckDbBackend;

/// Distinct (event, property) pairs recorded in the window, busiest first.
pub async fn get_event_properties_inner(
    db: &DuckDbBackend,
    website_id: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<Vec<EventPropertyRow>> {
    let conn = db.conn.lock().await;

    let sql = format!(
        r#"
        SELECT
            e.event_name,
            d.data_key,
            COUNT(*) AS total
        FROM event_data d
        JOIN website_event e ON e.event_id = d.website_event_id
        WHERE d.website_id = ?1
          AND d.created_at BETWEEN CAST(?2 AS TIMESTAMP) AND CAST(?3 AS TIMESTAMP)
        GROUP BY e.event_name, d.data_key
        ORDER BY total DESC, e.event_name ASC, d.data_key ASC
        LIMIT {EVENT_PROPERTIES_LIMIT}
        "#
    );

    let mut stmt = conn.prepare(&sql)?;
    let mapped = stmt.query_map(
        duckdb::params![website_id, ts_param(&start_date), ts_param(&end_date)],
        |row| {
            Ok(EventPropertyRow {
                event_name: row.get(0)?,
                property_name: row.get(1)?,
                total: row.get(2)?,
            })
        },
    )?;

    let mut rows = Vec::new();
    for row in mapped {
        rows.push(row?);
    }
    Ok(rows)
}
