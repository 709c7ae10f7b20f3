use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use propscope_core::{
    analytics::{
        DateUnit, EventDataBackend, EventDataFilter, EventPropertyRow, PageParams, PageResult,
        ValueOrder, ValueRow, EVENT_PROPERTIES_LIMIT,
    },
    bucket::DataType,
    error::QueryError,
};

use super::{json_i64, ClickHouseClient};

/// ClickHouse-backed [`EventDataBackend`]. Bucketing, search, ordering and
/// slicing all run inside ClickHouse.
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: ClickHouseClient,
}

impl ClickHouseBackend {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }
}

fn ts_to_ch(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn start_of_unit(unit: DateUnit) -> &'static str {
    match unit {
        DateUnit::Minute => "toStartOfMinute",
        DateUnit::Hour => "toStartOfHour",
        DateUnit::Day => "toStartOfDay",
        DateUnit::Week => "toMonday",
        DateUnit::Month => "toStartOfMonth",
        DateUnit::Year => "toStartOfYear",
    }
}

/// Display value of one stored row, matching `propscope_core::bucket`.
pub(crate) fn bucket_expr(unit: DateUnit) -> String {
    let number = DataType::Number.code();
    let date = DataType::Date.code();
    let start_of = start_of_unit(unit);
    format!(
        r"multiIf(
            data_type = {number}, replaceRegexpOne(assumeNotNull(string_value), '\\.0000$', ''),
            data_type = {date}, formatDateTime(
                toDateTime({start_of}(assumeNotNull(date_value), {{timezone:String}}), {{timezone:String}}),
                '%Y-%m-%d %H:%i:%S',
                {{timezone:String}}
            ),
            assumeNotNull(string_value)
        )"
    )
}

/// Bucketed values of the selection, one row per stored property.
fn bucketed_rows_sql(filter: &EventDataFilter, page: &PageParams) -> String {
    let date = DataType::Date.code();
    let bucket = bucket_expr(filter.unit);
    let search = if page.search_term().is_some() {
        "WHERE positionCaseInsensitiveUTF8(value, {search:String}) > 0"
    } else {
        ""
    };
    format!(
        "SELECT value FROM (
            SELECT {bucket} AS value
            FROM event_data
            WHERE website_id = {{website_id:String}}
              AND created_at BETWEEN {{start:DateTime64(3)}} AND {{end:DateTime64(3)}}
              AND data_key = {{property_name:String}}
              AND event_name = {{event_name:String}}
              AND if(data_type = {date}, date_value IS NOT NULL, string_value IS NOT NULL)
        )
        {search}"
    )
}

/// `ORDER BY` matching `propscope_core::bucket::compare_rows`.
pub(crate) fn order_clause(page: &PageParams) -> &'static str {
    match page.ordering() {
        (ValueOrder::Total, true) => "ORDER BY total DESC, value ASC",
        (ValueOrder::Total, false) => "ORDER BY total ASC, value ASC",
        (ValueOrder::Value, true) => "ORDER BY value DESC, total DESC",
        (ValueOrder::Value, false) => "ORDER BY value ASC, total DESC",
    }
}

pub(crate) fn values_page_sql(filter: &EventDataFilter, page: &PageParams) -> String {
    let rows = bucketed_rows_sql(filter, page);
    let order = order_clause(page);
    format!(
        "SELECT value, count() AS total
         FROM ({rows})
         GROUP BY value
         {order}
         LIMIT {{limit:UInt32}} OFFSET {{offset:UInt64}}"
    )
}

pub(crate) fn values_count_sql(filter: &EventDataFilter, page: &PageParams) -> String {
    let rows = bucketed_rows_sql(filter, page);
    format!("SELECT uniqExact(value) AS total FROM ({rows})")
}

/// Named parameters shared by the page and count queries.
pub(crate) fn values_params(filter: &EventDataFilter, page: &PageParams) -> Vec<(String, String)> {
    let mut params = vec![
        ("website_id".to_string(), filter.website_id.clone()),
        ("start".to_string(), ts_to_ch(&filter.start_date)),
        ("end".to_string(), ts_to_ch(&filter.end_date)),
        ("property_name".to_string(), filter.property_name.clone()),
        ("event_name".to_string(), filter.event_name.clone()),
        ("timezone".to_string(), filter.timezone_name().to_string()),
        ("limit".to_string(), page.page_size.to_string()),
        ("offset".to_string(), page.offset().to_string()),
    ];
    if let Some(search) = page.search_term() {
        params.push(("search".to_string(), search.to_string()));
    }
    params
}

fn parse_value_row(row: &Value) -> Result<ValueRow, QueryError> {
    let value = row
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::Malformed("value column missing".to_string()))?;
    let total = json_i64(row, "total")
        .ok_or_else(|| QueryError::Malformed("total column missing".to_string()))?;
    Ok(ValueRow {
        value: value.to_string(),
        total,
    })
}

#[async_trait]
impl EventDataBackend for ClickHouseBackend {
    async fn values_paged(
        &self,
        filter: &EventDataFilter,
        page: &PageParams,
    ) -> Result<PageResult<ValueRow>, QueryError> {
        let owned = values_params(filter, page);
        let named: Vec<(&str, &str)> = owned
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let rows = self
            .client
            .query(&values_page_sql(filter, page), &named)
            .await?;
        let data = rows
            .iter()
            .map(parse_value_row)
            .collect::<Result<Vec<_>, _>>()?;

        let count_rows = self
            .client
            .query(&values_count_sql(filter, page), &named)
            .await?;
        let count = count_rows
            .first()
            .and_then(|row| json_i64(row, "total"))
            .unwrap_or(0);

        tracing::debug!(
            website_id = %filter.website_id,
            rows = data.len(),
            count,
            "ClickHouse values page fetched"
        );

        Ok(PageResult {
            data,
            count,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn event_properties(
        &self,
        website_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Vec<EventPropertyRow>, QueryError> {
        let sql = format!(
            "SELECT event_name, data_key, count() AS total
             FROM event_data
             WHERE website_id = {{website_id:String}}
               AND created_at BETWEEN {{start:DateTime64(3)}} AND {{end:DateTime64(3)}}
             GROUP BY event_name, data_key
             ORDER BY total DESC, event_name ASC, data_key ASC
             LIMIT {EVENT_PROPERTIES_LIMIT}"
        );
        let start = ts_to_ch(&start_date);
        let end = ts_to_ch(&end_date);
        let rows = self
            .client
            .query(
                &sql,
                &[
                    ("website_id", website_id),
                    ("start", start.as_str()),
                    ("end", end.as_str()),
                ],
            )
            .await?;

        rows.iter()
            .map(|row| -> Result<EventPropertyRow, QueryError> {
                let text = |column: &str| {
                    row.get(column)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .with_context(|| format!("{column} column missing"))
                };
                Ok(EventPropertyRow {
                    event_name: text("event_name")?,
                    property_name: text("data_key")?,
                    total: json_i64(row, "total").unwrap_or(0),
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Ok(self.client.execute("SELECT 1").await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn filter(unit: DateUnit, timezone: Option<chrono_tz::Tz>) -> EventDataFilter {
        EventDataFilter {
            website_id: "site_1".to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().expect("ts"),
            end_date: Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).single().expect("ts"),
            event_name: "signup".to_string(),
            property_name: "plan".to_string(),
            unit,
            timezone,
        }
    }

    #[test]
    fn order_clause_mirrors_reference_ordering() {
        let default = PageParams::default();
        assert_eq!(order_clause(&default), "ORDER BY total DESC, value ASC");

        let by_value = PageParams::default().with_order(Some(ValueOrder::Value), false);
        assert_eq!(order_clause(&by_value), "ORDER BY value ASC, total DESC");

        let by_total_asc = PageParams::default().with_order(Some(ValueOrder::Total), false);
        assert_eq!(order_clause(&by_total_asc), "ORDER BY total ASC, value ASC");
    }

    fn squash(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn week_bucket_expression_is_exact() {
        assert_eq!(
            squash(&bucket_expr(DateUnit::Week)),
            concat!(
                "multiIf( ",
                r"data_type = 2, replaceRegexpOne(assumeNotNull(string_value), '\\.0000$', ''), ",
                "data_type = 4, formatDateTime( ",
                "toDateTime(toMonday(assumeNotNull(date_value), {timezone:String}), {timezone:String}), ",
                "'%Y-%m-%d %H:%i:%S', {timezone:String} ), ",
                "assumeNotNull(string_value) )"
            )
        );
    }

    #[test]
    fn day_bucket_expression_is_exact() {
        assert_eq!(
            squash(&bucket_expr(DateUnit::Day)),
            concat!(
                "multiIf( ",
                r"data_type = 2, replaceRegexpOne(assumeNotNull(string_value), '\\.0000$', ''), ",
                "data_type = 4, formatDateTime( ",
                "toDateTime(toStartOfDay(assumeNotNull(date_value), {timezone:String}), {timezone:String}), ",
                "'%Y-%m-%d %H:%i:%S', {timezone:String} ), ",
                "assumeNotNull(string_value) )"
            )
        );
        assert!(bucket_expr(DateUnit::Minute).contains("toStartOfMinute(assumeNotNull(date_value)"));
    }

    #[test]
    fn search_adds_clause_and_param_only_when_present() {
        let f = filter(DateUnit::Hour, None);
        let plain = PageParams::default();
        assert!(!values_page_sql(&f, &plain).contains("positionCaseInsensitiveUTF8"));
        assert!(!values_params(&f, &plain).iter().any(|(k, _)| k == "search"));

        let searching = PageParams::default().with_search(Some("pro".to_string()));
        assert!(values_page_sql(&f, &searching).contains("positionCaseInsensitiveUTF8"));
        assert!(values_count_sql(&f, &searching).contains("positionCaseInsensitiveUTF8"));
        assert!(values_params(&f, &searching)
            .iter()
            .any(|(k, v)| k == "search" && v == "pro"));
    }

    #[test]
    fn params_carry_paging_and_timezone() {
        let f = filter(DateUnit::Day, Some(chrono_tz::Asia::Tokyo));
        let page = PageParams::new(3, 25).expect("params");
        let params = values_params(&f, &page);
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("limit"), Some("25"));
        assert_eq!(get("offset"), Some("50"));
        assert_eq!(get("timezone"), Some("Asia/Tokyo"));
        assert_eq!(get("start"), Some("2024-06-01 00:00:00.000"));
    }

    #[test]
    fn value_rows_accept_quoted_totals() {
        let row = parse_value_row(&json!({ "value": "pro", "total": "10" })).expect("row");
        assert_eq!(row, ValueRow { value: "pro".into(), total: 10 });
        assert!(parse_value_row(&json!({ "total": 1 })).is_err());
    }
}
