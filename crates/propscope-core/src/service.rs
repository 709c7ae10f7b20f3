use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::analytics::{
    DateUnit, EventDataBackend, EventDataFilter, EventPropertyRow, PageParams, PageResult,
    ValueRow,
};
use crate::error::QueryError;

/// Values request as it arrives from the HTTP layer, already validated.
#[derive(Debug, Clone)]
pub struct ValuesFilters {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub event_name: Option<String>,
    pub property_name: Option<String>,
    pub unit: Option<DateUnit>,
    pub timezone: Option<Tz>,
}

/// Turns validated request filters into store queries.
#[derive(Clone)]
pub struct ValuesQueryService {
    backend: Arc<dyn EventDataBackend>,
}

impl ValuesQueryService {
    pub fn new(backend: Arc<dyn EventDataBackend>) -> Self {
        Self { backend }
    }

    /// One page of bucketed values for an (event, property) selection.
    ///
    /// Without both an event name and a property name there is nothing to
    /// select, so an empty page comes back and the store is not queried.
    pub async fn get_values(
        &self,
        website_id: &str,
        filters: ValuesFilters,
        page: PageParams,
    ) -> Result<PageResult<ValueRow>, QueryError> {
        let (Some(event_name), Some(property_name)) = (
            non_empty(filters.event_name),
            non_empty(filters.property_name),
        ) else {
            debug!(website_id, "values query without full selection, skipping store");
            return Ok(PageResult::empty(&page));
        };

        let filter = EventDataFilter {
            website_id: website_id.to_string(),
            start_date: filters.start_date,
            end_date: filters.end_date,
            event_name,
            property_name,
            unit: filters.unit.unwrap_or_default(),
            timezone: filters.timezone,
        };
        debug!(
            website_id,
            event_name = %filter.event_name,
            property_name = %filter.property_name,
            page = page.page,
            page_size = page.page_size,
            "querying event data values"
        );
        self.backend.values_paged(&filter, &page).await
    }

    pub async fn get_properties(
        &self,
        website_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Vec<EventPropertyRow>, QueryError> {
        self.backend
            .event_properties(website_id, start_date, end_date)
            .await
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
