use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use propscope_core::{
    analytics::{DateUnit, PageParams, ValueOrder, DEFAULT_PAGE_SIZE},
    service::ValuesFilters,
};

use crate::{
    auth::AuthContext,
    error::AppError,
    routes::query::{
        normalize_optional_filter, parse_optional_bool, parse_optional_timezone,
        parse_positive_u32, parse_time_range, MAX_FILTER_LEN,
    },
    state::AppState,
};

/// Raw query string of the values endpoint. Every field is kept as text so
/// malformed input surfaces as a `validation_error` rather than an extractor
/// rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesPagedQuery {
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub event_name: Option<String>,
    pub property_name: Option<String>,
    pub unit: Option<String>,
    pub timezone: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub order_by: Option<String>,
    pub sort_descending: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesQuery {
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}

fn build_values_request(
    query: ValuesPagedQuery,
    max_page_size: u32,
) -> Result<(ValuesFilters, PageParams), AppError> {
    let (start_date, end_date) =
        parse_time_range(query.start_at.as_deref(), query.end_at.as_deref())?;

    let page = parse_positive_u32(query.page.as_deref(), "page", 1, None)?;
    let page_size = parse_positive_u32(
        query.page_size.as_deref(),
        "pageSize",
        DEFAULT_PAGE_SIZE.min(max_page_size),
        Some(max_page_size),
    )?;
    let order_by = ValueOrder::parse(query.order_by.as_deref())?;
    let sort_descending =
        parse_optional_bool(query.sort_descending.as_deref(), "sortDescending")?.unwrap_or(false);
    let search = normalize_optional_filter("search", query.search, MAX_FILTER_LEN)?;

    let filters = ValuesFilters {
        start_date,
        end_date,
        event_name: normalize_optional_filter("eventName", query.event_name, MAX_FILTER_LEN)?,
        property_name: normalize_optional_filter(
            "propertyName",
            query.property_name,
            MAX_FILTER_LEN,
        )?,
        unit: Some(DateUnit::parse(query.unit.as_deref())?),
        timezone: parse_optional_timezone(query.timezone.as_deref())?,
    };
    let params = PageParams::new(page, page_size)?
        .with_search(search)
        .with_order(order_by, sort_descending);

    Ok((filters, params))
}

/// `GET /api/websites/{website_id}/event-data/values-paged`: one page of
/// bucketed values for an (event, property) selection.
#[tracing::instrument(skip(state, auth, query))]
pub async fn get_values_paged(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(website_id): Path<String>,
    Query(query): Query<ValuesPagedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (filters, params) = build_values_request(query, state.config.max_page_size)?;

    if !state.can_view_website(&auth, &website_id).await {
        return Err(AppError::Unauthorized);
    }

    let result = state.values.get_values(&website_id, filters, params).await?;
    Ok(Json(result))
}

/// `GET /api/websites/{website_id}/event-data/properties`: distinct
/// (event, property) pairs recorded in the window.
#[tracing::instrument(skip(state, auth, query))]
pub async fn get_event_properties(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(website_id): Path<String>,
    Query(query): Query<PropertiesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (start_date, end_date) =
        parse_time_range(query.start_at.as_deref(), query.end_at.as_deref())?;

    if !state.can_view_website(&auth, &website_id).await {
        return Err(AppError::Unauthorized);
    }

    let rows = state
        .values
        .get_properties(&website_id, start_date, end_date)
        .await?;
    Ok(Json(json!({ "data": rows })))
}
