use async_trait::async_trait;
use chrono::{DateTime, Utc};

use propscope_core::analytics::{
    EventDataBackend, EventDataFilter, EventPropertyRow, PageParams, PageResult, ValueRow,
};
use propscope_core::error::QueryError;

use crate::DuckDbBackend;

#[async_trait]
impl EventDataBackend for DuckDbBackend {
    async fn values_paged(
        &self,
        filter: &EventDataFilter,
        page: &PageParams,
    ) -> Result<PageResult<ValueRow>, QueryError> {
        Ok(crate::queries::values::get_values_paged_inner(self, filter, page).await?)
    }

    async fn event_properties(
        &self,
        website_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Vec<EventPropertyRow>, QueryError> {
        Ok(
            crate::queries::properties::get_event_properties_inner(
                self, website_id, start_date, end_date,
            )
            .await?,
        )
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Ok(DuckDbBackend::ping(self).await?)
    }
}
