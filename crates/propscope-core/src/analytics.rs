//! Analytics backend abstraction for event-data exploration.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, QueryError};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound on rows returned by the distinct-properties listing.
pub const EVENT_PROPERTIES_LIMIT: usize = 500;

/// Granularity used when bucketing date-typed property values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateUnit {
    Minute,
    #[default]
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl DateUnit {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some("minute") => Ok(Self::Minute),
            Some("hour") => Ok(Self::Hour),
            Some("day") => Ok(Self::Day),
            Some("week") => Ok(Self::Week),
            Some("month") => Ok(Self::Month),
            Some("year") => Ok(Self::Year),
            Some(other) => Err(CoreError::InvalidValue {
                field: "unit",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Column a values page can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrder {
    Value,
    Total,
}

impl ValueOrder {
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, CoreError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some("value") => Ok(Some(Self::Value)),
            Some("total") => Ok(Some(Self::Total)),
            Some(other) => Err(CoreError::InvalidValue {
                field: "orderBy",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Total => "total",
        }
    }
}

/// Filter criteria for one (event, property) values query.
#[derive(Debug, Clone)]
pub struct EventDataFilter {
    pub website_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub event_name: String,
    pub property_name: String,
    pub unit: DateUnit,
    /// `None` buckets dates in UTC.
    pub timezone: Option<Tz>,
}

impl EventDataFilter {
    pub fn timezone_name(&self) -> &'static str {
        self.timezone.map(|tz| tz.name()).unwrap_or("UTC")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub order_by: Option<ValueOrder>,
    pub sort_descending: bool,
}

impl PageParams {
    pub fn new(page: u32, page_size: u32) -> Result<Self, CoreError> {
        if page == 0 {
            return Err(CoreError::InvalidPaging("page must be 1 or greater".to_string()));
        }
        if page_size == 0 {
            return Err(CoreError::InvalidPaging(
                "pageSize must be 1 or greater".to_string(),
            ));
        }
        Ok(Self {
            page,
            page_size,
            search: None,
            order_by: None,
            sort_descending: false,
        })
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_order(mut self, order_by: Option<ValueOrder>, sort_descending: bool) -> Self {
        self.order_by = order_by;
        self.sort_descending = sort_descending;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Effective sort column and direction. Without an explicit `order_by`
    /// rows come back by total, largest first.
    pub fn ordering(&self) -> (ValueOrder, bool) {
        match self.order_by {
            None => (ValueOrder::Total, true),
            Some(order) => (order, self.sort_descending),
        }
    }

    /// Non-empty search needle, if any.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            order_by: None,
            sort_descending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRow {
    pub value: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub data: Vec<T>,
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PageResult<T> {
    pub fn empty(params: &PageParams) -> Self {
        Self {
            data: Vec::new(),
            count: 0,
            page: params.page,
            page_size: params.page_size,
        }
    }

    /// Cut the page described by `params` out of a fully ordered row set.
    pub fn from_ordered(rows: Vec<T>, params: &PageParams) -> Self {
        let count = rows.len() as i64;
        let offset = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let data = rows
            .into_iter()
            .skip(offset)
            .take(params.page_size as usize)
            .collect();
        Self {
            data,
            count,
            page: params.page,
            page_size: params.page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPropertyRow {
    pub event_name: String,
    pub property_name: String,
    pub total: i64,
}

/// Store-facing query interface. One implementation per analytics store,
/// chosen at startup; both must bucket values identically (see
/// [`crate::bucket`]).
#[async_trait::async_trait]
pub trait EventDataBackend: Send + Sync + 'static {
    async fn values_paged(
        &self,
        filter: &EventDataFilter,
        page: &PageParams,
    ) -> Result<PageResult<ValueRow>, QueryError>;

    async fn event_properties(
        &self,
        website_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Vec<EventPropertyRow>, QueryError>;

    async fn ping(&self) -> Result<(), QueryError>;
}
