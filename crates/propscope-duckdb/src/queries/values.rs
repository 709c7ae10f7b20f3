use std::collections::HashMap;

use anyhow::Result;
use chrono::{TimeZone, Utc};

use propscope_core::analytics::{EventDataFilter, PageParams, PageResult, ValueRow};
use propscope_core::bucket::{bucket_value, compare_rows, matches_search, DataType};

use crate::backend::ts_param;
use crate::DuckDbBackend;

/// Occurrence count of one raw stored value before bucketing.
#[derive(Debug, Clone)]
pub(crate) struct RawValueCount {
    pub data_type: i32,
    pub string_value: Option<String>,
    pub date_ms: Option<i64>,
    pub total: i64,
}

/// One page of bucketed values for an (event, property) selection.
///
/// DuckDB pre-aggregates by raw stored value; bucketing (timezone-aware for
/// dates), search, ordering and slicing then run on that much smaller set so
/// the result matches the reference rules in `propscope_core::bucket`
/// exactly.
pub async fn get_values_paged_inner(
    db: &DuckDbBackend,
    filter: &EventDataFilter,
    page: &PageParams,
) -> Result<PageResult<ValueRow>> {
    let raw = {
        let conn = db.conn.lock().await;

        let sql = r#"
            SELECT
                d.data_type,
                d.string_value,
                epoch_ms(d.date_value) AS date_ms,
                COUNT(*) AS total
            FROM event_data d
            JOIN website_event e ON e.event_id = d.website_event_id
            WHERE d.website_id = ?1
              AND d.created_at BETWEEN CAST(?2 AS TIMESTAMP) AND CAST(?3 AS TIMESTAMP)
              AND d.data_key = ?4
              AND e.event_name = ?5
            GROUP BY 1, 2, 3
        "#;

        let mut stmt = conn.prepare(sql)?;
        let mapped = stmt.query_map(
            duckdb::params![
                filter.website_id,
                ts_param(&filter.start_date),
                ts_param(&filter.end_date),
                filter.property_name,
                filter.event_name,
            ],
            |row| {
                Ok(RawValueCount {
                    data_type: row.get(0)?,
                    string_value: row.get(1)?,
                    date_ms: row.get(2)?,
                    total: row.get(3)?,
                })
            },
        )?;

        let mut raw = Vec::new();
        for row in mapped {
            raw.push(row?);
        }
        raw
    };

    tracing::debug!(
        website_id = %filter.website_id,
        raw_groups = raw.len(),
        "event data values pre-aggregated"
    );

    Ok(rollup_values(raw, filter, page))
}

pub(crate) fn rollup_values(
    raw: Vec<RawValueCount>,
    filter: &EventDataFilter,
    page: &PageParams,
) -> PageResult<ValueRow> {
    let search = page.search_term();
    let mut totals: HashMap<String, i64> = HashMap::new();

    for row in raw {
        let date_value = row
            .date_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        let Some(value) = bucket_value(
            DataType::from_code(row.data_type),
            row.string_value.as_deref(),
            date_value,
            filter.unit,
            filter.timezone,
        ) else {
            continue;
        };
        if search.is_some_and(|needle| !matches_search(&value, needle)) {
            continue;
        }
        *totals.entry(value).or_insert(0) += row.total;
    }

    let (order, descending) = page.ordering();
    let mut rows: Vec<ValueRow> = totals
        .into_iter()
        .map(|(value, total)| ValueRow { value, total })
        .collect();
    rows.sort_by(|a, b| compare_rows(a, b, order, descending));

    PageResult::from_ordered(rows, page)
}
