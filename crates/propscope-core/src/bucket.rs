//! Reference bucketing rules shared by every analytics store.
//!
//! A stored property value is turned into the display value it is grouped
//! under. DuckDB applies these functions directly; the ClickHouse query
//! reproduces them in SQL (`multiIf` over `data_type`), and the backend
//! tests check both against the same expectations.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::analytics::{DateUnit, ValueOrder, ValueRow};

/// Format every temporal bucket is rendered with.
pub const BUCKET_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Suffix numeric values carry in storage (`12.0000`).
pub const ZERO_FRACTION: &str = ".0000";

/// Storage type tag of an `event_data` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Array,
}

impl DataType {
    pub fn code(self) -> i32 {
        match self {
            Self::String => 1,
            Self::Number => 2,
            Self::Boolean => 3,
            Self::Date => 4,
            Self::Array => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::String),
            2 => Some(Self::Number),
            3 => Some(Self::Boolean),
            4 => Some(Self::Date),
            5 => Some(Self::Array),
            _ => None,
        }
    }
}

pub fn strip_zero_fraction(raw: &str) -> &str {
    raw.strip_suffix(ZERO_FRACTION).unwrap_or(raw)
}

/// Truncate `at` to the start of its `unit` in `timezone` (UTC when `None`)
/// and render it as local wall-clock time. Weeks start on Monday.
pub fn truncate_date(at: DateTime<Utc>, unit: DateUnit, timezone: Option<Tz>) -> String {
    let local = at.with_timezone(&timezone.unwrap_or(chrono_tz::UTC)).naive_local();
    truncate_naive(local, unit).format(BUCKET_DATE_FORMAT).to_string()
}

fn truncate_naive(local: NaiveDateTime, unit: DateUnit) -> NaiveDateTime {
    let date = local.date();
    let midnight = |d: chrono::NaiveDate| d.and_hms_opt(0, 0, 0).unwrap_or(local);
    match unit {
        DateUnit::Minute => date
            .and_hms_opt(local.hour(), local.minute(), 0)
            .unwrap_or(local),
        DateUnit::Hour => date.and_hms_opt(local.hour(), 0, 0).unwrap_or(local),
        DateUnit::Day => midnight(date),
        DateUnit::Week => {
            let back = i64::from(date.weekday().num_days_from_monday());
            midnight(date - Duration::days(back))
        }
        DateUnit::Month => midnight(date.with_day(1).unwrap_or(date)),
        DateUnit::Year => midnight(date.with_ordinal(1).unwrap_or(date)),
    }
}

/// Display value a stored row is grouped under, or `None` when the row has
/// nothing to show (missing text, or a date row without a timestamp).
pub fn bucket_value(
    data_type: Option<DataType>,
    string_value: Option<&str>,
    date_value: Option<DateTime<Utc>>,
    unit: DateUnit,
    timezone: Option<Tz>,
) -> Option<String> {
    match data_type {
        Some(DataType::Number) => string_value.map(|s| strip_zero_fraction(s).to_string()),
        Some(DataType::Date) => date_value.map(|at| truncate_date(at, unit, timezone)),
        _ => string_value.map(str::to_string),
    }
}

/// Case-insensitive substring match used by the `search` page parameter.
pub fn matches_search(value: &str, needle: &str) -> bool {
    value.to_lowercase().contains(&needle.to_lowercase())
}

/// Row ordering for a values page. The secondary key keeps pages stable
/// between identical requests.
pub fn compare_rows(a: &ValueRow, b: &ValueRow, order: ValueOrder, descending: bool) -> Ordering {
    let primary = match order {
        ValueOrder::Total => a.total.cmp(&b.total),
        ValueOrder::Value => a.value.cmp(&b.value),
    };
    let primary = if descending { primary.reverse() } else { primary };
    primary.then_with(|| match order {
        ValueOrder::Total => a.value.cmp(&b.value),
        ValueOrder::Value => b.total.cmp(&a.total),
    })
}
