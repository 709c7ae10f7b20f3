use chrono::{DateTime, Utc};

use propscope_core::analytics::{DateUnit, ValueOrder, DEFAULT_PAGE_SIZE};

/// The (event, property) pair being explored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    pub event_name: String,
    pub property_name: String,
}

impl Selection {
    pub fn new(event_name: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            property_name: property_name.into(),
        }
    }

    /// Both names present; nothing is fetched otherwise.
    pub fn is_complete(&self) -> bool {
        !self.event_name.trim().is_empty() && !self.property_name.trim().is_empty()
    }
}

/// Query inputs shared by every page of one exploration. Changing any of
/// them starts the listing over from page 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValuesQuery {
    pub website_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub unit: Option<DateUnit>,
    /// IANA zone name, e.g. `Europe/Berlin`.
    pub timezone: Option<String>,
    pub page_size: u32,
    pub search: Option<String>,
    pub order_by: Option<ValueOrder>,
    pub sort_descending: bool,
}

impl ValuesQuery {
    pub fn new(website_id: impl Into<String>, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            website_id: website_id.into(),
            start_at,
            end_at,
            unit: None,
            timezone: None,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            order_by: None,
            sort_descending: false,
        }
    }
}

/// One page request, fully specified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesRequest {
    pub query: ValuesQuery,
    pub selection: Selection,
    /// 1-based.
    pub page: u32,
}

/// Stable identity of a page request, for caches layered over the fetcher.
/// Two requests share a key exactly when they would return the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub website_id: String,
    pub event_name: String,
    pub property_name: String,
    pub start_at_ms: i64,
    pub end_at_ms: i64,
    pub unit: Option<DateUnit>,
    pub timezone: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub order_by: Option<ValueOrder>,
    pub sort_descending: bool,
}

impl ValuesRequest {
    pub fn key(&self) -> RequestKey {
        RequestKey {
            website_id: self.query.website_id.clone(),
            event_name: self.selection.event_name.clone(),
            property_name: self.selection.property_name.clone(),
            start_at_ms: self.query.start_at.timestamp_millis(),
            end_at_ms: self.query.end_at.timestamp_millis(),
            unit: self.query.unit,
            timezone: self.query.timezone.clone(),
            page: self.page,
            page_size: self.query.page_size,
            search: self.search_term().map(str::to_string),
            order_by: self.query.order_by,
            sort_descending: self.query.sort_descending,
        }
    }

    fn search_term(&self) -> Option<&str> {
        self.query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Query-string pairs for `GET …/event-data/values-paged`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("startAt", self.query.start_at.timestamp_millis().to_string()),
            ("endAt", self.query.end_at.timestamp_millis().to_string()),
            ("eventName", self.selection.event_name.clone()),
            ("propertyName", self.selection.property_name.clone()),
        ];
        if let Some(unit) = self.query.unit {
            pairs.push(("unit", unit.as_str().to_string()));
        }
        if let Some(timezone) = &self.query.timezone {
            pairs.push(("timezone", timezone.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("pageSize", self.query.page_size.to_string()));
        if let Some(order_by) = self.query.order_by {
            pairs.push(("orderBy", order_by.as_str().to_string()));
        }
        if self.query.sort_descending {
            pairs.push(("sortDescending", "true".to_string()));
        }
        if let Some(search) = self.search_term() {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}
