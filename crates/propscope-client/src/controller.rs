//! Pagination state machine for one values listing.
//!
//! The controller never performs I/O. Every transition that needs a page
//! hands back a [`PendingFetch`] ticket; the caller fetches it and reports
//! the outcome through [`PagedFetchController::complete`]. Tickets carry the
//! generation they were issued under, so a response that arrives after the
//! selection (or any other query input) changed is recognised and dropped.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use propscope_core::analytics::{PageResult, ValueOrder, ValueRow};

use crate::error::FetchError;
use crate::request::{Selection, ValuesQuery, ValuesRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// No complete selection; nothing to show.
    Idle,
    /// A page request is outstanding. Load-more is ignored until it settles.
    Loading,
    /// Last page was full; more may exist.
    Ready,
    /// Last page was short; the listing is complete.
    Exhausted,
    /// Last request failed. Accumulated rows are kept.
    Error(String),
}

/// A page the caller must fetch, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub generation: u64,
    pub request: ValuesRequest,
}

#[derive(Debug)]
pub struct PagedFetchController {
    query: ValuesQuery,
    selection: Selection,
    state: FetchState,
    rows: Vec<ValueRow>,
    seen: HashSet<String>,
    /// Last page merged into `rows`; 0 before the first.
    page: u32,
    /// Group count reported with the last merged page.
    count: i64,
    generation: u64,
    in_flight: Option<u32>,
}

impl PagedFetchController {
    pub fn new(query: ValuesQuery) -> Self {
        Self {
            query,
            selection: Selection::default(),
            state: FetchState::Idle,
            rows: Vec::new(),
            seen: HashSet::new(),
            page: 0,
            count: 0,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Accumulated rows, in the order they were first seen.
    pub fn rows(&self) -> &[ValueRow] {
        &self.rows
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn query(&self) -> &ValuesQuery {
        &self.query
    }

    pub fn has_more(&self) -> bool {
        self.state == FetchState::Ready
    }

    /// Switch to `selection`. A complete selection starts over at page 1;
    /// an incomplete one clears everything and goes idle.
    ///
    /// Re-selecting the current selection only does something after a
    /// failure (or while idle), which makes it a way to recover.
    pub fn select(&mut self, selection: Selection) -> Option<PendingFetch> {
        if selection == self.selection
            && !matches!(self.state, FetchState::Idle | FetchState::Error(_))
        {
            return None;
        }
        self.selection = selection;
        self.reset()
    }

    /// Replace the query inputs. Unchanged inputs are a no-op.
    pub fn set_query(&mut self, query: ValuesQuery) -> Option<PendingFetch> {
        if query == self.query {
            return None;
        }
        self.query = query;
        self.reset()
    }

    pub fn set_search(&mut self, search: Option<String>) -> Option<PendingFetch> {
        let search = search.filter(|s| !s.trim().is_empty());
        let query = ValuesQuery {
            search,
            ..self.query.clone()
        };
        self.set_query(query)
    }

    pub fn set_order(
        &mut self,
        order_by: Option<ValueOrder>,
        sort_descending: bool,
    ) -> Option<PendingFetch> {
        let query = ValuesQuery {
            order_by,
            sort_descending,
            ..self.query.clone()
        };
        self.set_query(query)
    }

    pub fn set_range(
        &mut self,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Option<PendingFetch> {
        let query = ValuesQuery {
            start_at,
            end_at,
            ..self.query.clone()
        };
        self.set_query(query)
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Option<PendingFetch> {
        let query = ValuesQuery {
            page_size: page_size.max(1),
            ..self.query.clone()
        };
        self.set_query(query)
    }

    /// Request the next page. Only acts from `Ready`, or from `Error` where
    /// it re-requests the page that failed.
    pub fn load_more(&mut self) -> Option<PendingFetch> {
        match self.state {
            FetchState::Ready | FetchState::Error(_) if self.selection.is_complete() => {
                Some(self.issue(self.page + 1))
            }
            _ => None,
        }
    }

    /// Settle the request behind `ticket`. Returns `false` when the ticket
    /// is stale and the outcome was discarded.
    pub fn complete(
        &mut self,
        ticket: &PendingFetch,
        result: Result<PageResult<ValueRow>, FetchError>,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket_generation = ticket.generation,
                generation = self.generation,
                page = ticket.request.page,
                "discarding stale page response"
            );
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                let page_len = page.data.len();
                self.merge(ticket.request.page, page.data);
                self.page = ticket.request.page;
                self.count = page.count;
                self.state = if page_len < ticket.request.query.page_size as usize {
                    FetchState::Exhausted
                } else {
                    FetchState::Ready
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, page = ticket.request.page, "values page failed");
                self.state = FetchState::Error(err.to_string());
            }
        }
        true
    }

    /// Give up on the request behind `ticket` without an outcome, e.g. when
    /// the caller dropped the fetch. The controller moves to `Error` so
    /// `load_more` or re-selecting can retry. Stale tickets are ignored.
    pub fn abandon(&mut self, ticket: &PendingFetch) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        tracing::debug!(page = ticket.request.page, "values page request abandoned");
        self.in_flight = None;
        self.state = FetchState::Error("cancelled".to_string());
        true
    }

    fn is_current(&self, ticket: &PendingFetch) -> bool {
        ticket.generation == self.generation && self.in_flight == Some(ticket.request.page)
    }

    fn reset(&mut self) -> Option<PendingFetch> {
        self.generation += 1;
        self.rows.clear();
        self.seen.clear();
        self.page = 0;
        self.count = 0;
        self.in_flight = None;

        if self.selection.is_complete() {
            Some(self.issue(1))
        } else {
            self.state = FetchState::Idle;
            None
        }
    }

    fn issue(&mut self, page: u32) -> PendingFetch {
        self.state = FetchState::Loading;
        self.in_flight = Some(page);
        PendingFetch {
            generation: self.generation,
            request: ValuesRequest {
                query: self.query.clone(),
                selection: self.selection.clone(),
                page,
            },
        }
    }

    /// Page 1 replaces; later pages append values not seen yet.
    fn merge(&mut self, page: u32, data: Vec<ValueRow>) {
        if page == 1 {
            self.rows.clear();
            self.seen.clear();
        }
        for row in data {
            if self.seen.insert(row.value.clone()) {
                self.rows.push(row);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn query(page_size: u32) -> ValuesQuery {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().expect("ts");
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).single().expect("ts");
        let mut q = ValuesQuery::new("site_1", start, end);
        q.page_size = page_size;
        q
    }

    fn row(value: &str, total: i64) -> ValueRow {
        ValueRow {
            value: value.to_string(),
            total,
        }
    }

    fn page(n: u32, size: u32, rows: Vec<ValueRow>) -> Result<PageResult<ValueRow>, FetchError> {
        Ok(PageResult {
            count: rows.len() as i64,
            data: rows,
            page: n,
            page_size: size,
        })
    }

    fn signup_plan() -> Selection {
        Selection::new("signup", "plan")
    }

    #[test]
    fn incomplete_selection_stays_idle() {
        let mut c = PagedFetchController::new(query(2));
        assert!(c.select(Selection::new("signup", "")).is_none());
        assert_eq!(c.state(), &FetchState::Idle);
        assert!(c.load_more().is_none());
    }

    #[test]
    fn scenario_signup_plan_with_page_size_two() {
        let mut c = PagedFetchController::new(query(2));

        let first = c.select(signup_plan()).expect("page 1 request");
        assert_eq!(first.request.page, 1);
        assert_eq!(c.state(), &FetchState::Loading);

        assert!(c.complete(&first, page(1, 2, vec![row("pro", 10), row("free", 5)])));
        assert_eq!(c.rows(), &[row("pro", 10), row("free", 5)]);
        assert_eq!(c.state(), &FetchState::Ready);
        assert!(c.has_more());

        let second = c.load_more().expect("page 2 request");
        assert_eq!(second.request.page, 2);
        assert!(c.complete(&second, page(2, 2, vec![row("free", 5)])));
        assert_eq!(c.rows(), &[row("pro", 10), row("free", 5)]);
        assert_eq!(c.state(), &FetchState::Exhausted);
        assert!(c.load_more().is_none());
    }

    #[test]
    fn merge_keeps_first_occurrence_and_never_sums() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, page(1, 2, vec![row("a", 9), row("b", 8)]));

        let second = c.load_more().expect("request");
        c.complete(&second, page(2, 2, vec![row("b", 100), row("c", 7)]));

        assert_eq!(c.rows(), &[row("a", 9), row("b", 8), row("c", 7)]);
        assert_eq!(c.page(), 2);
    }

    #[test]
    fn load_more_while_loading_is_ignored() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        assert!(c.load_more().is_none());
        assert!(c.select(signup_plan()).is_none());
        assert!(c.complete(&first, page(1, 2, vec![row("a", 1), row("b", 1)])));
    }

    #[test]
    fn short_first_page_is_exhausted() {
        let mut c = PagedFetchController::new(query(20));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, page(1, 20, vec![row("a", 1)]));
        assert_eq!(c.state(), &FetchState::Exhausted);

        let mut empty = PagedFetchController::new(query(20));
        let first = empty.select(signup_plan()).expect("request");
        empty.complete(&first, page(1, 20, vec![]));
        assert_eq!(empty.state(), &FetchState::Exhausted);
        assert!(empty.rows().is_empty());
    }

    #[test]
    fn stale_response_after_selection_change_is_discarded() {
        let mut c = PagedFetchController::new(query(2));
        let old = c.select(signup_plan()).expect("request");
        let new = c
            .select(Selection::new("signup", "method"))
            .expect("request");
        assert!(new.generation > old.generation);

        assert!(!c.complete(&old, page(1, 2, vec![row("pro", 10), row("free", 5)])));
        assert!(c.rows().is_empty());
        assert_eq!(c.state(), &FetchState::Loading);

        assert!(c.complete(&new, page(1, 2, vec![row("google", 3)])));
        assert_eq!(c.rows(), &[row("google", 3)]);
    }

    #[test]
    fn clearing_the_selection_drops_rows_and_in_flight_requests() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, page(1, 2, vec![row("a", 2), row("b", 1)]));
        let more = c.load_more().expect("request");

        assert!(c.select(Selection::new("", "plan")).is_none());
        assert_eq!(c.state(), &FetchState::Idle);
        assert!(c.rows().is_empty());
        assert!(!c.complete(&more, page(2, 2, vec![row("c", 1)])));
        assert!(c.rows().is_empty());
    }

    #[test]
    fn failure_keeps_rows_and_load_more_retries_the_same_page() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, page(1, 2, vec![row("a", 2), row("b", 1)]));

        let second = c.load_more().expect("request");
        assert!(c.complete(&second, Err(FetchError::Server { status: 500 })));
        assert!(matches!(c.state(), FetchState::Error(_)));
        assert_eq!(c.rows().len(), 2);

        let retry = c.load_more().expect("retry");
        assert_eq!(retry.request.page, 2);
        assert_eq!(retry.generation, second.generation);
        c.complete(&retry, page(2, 2, vec![row("c", 1)]));
        assert_eq!(c.rows().len(), 3);
        assert_eq!(c.state(), &FetchState::Exhausted);
    }

    #[test]
    fn reselecting_after_failure_starts_over() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, Err(FetchError::Unauthorized));

        let again = c.select(signup_plan()).expect("recovery request");
        assert_eq!(again.request.page, 1);
        assert!(again.generation > first.generation);
    }

    #[test]
    fn query_changes_reset_like_a_new_selection() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, page(1, 2, vec![row("a", 2), row("b", 1)]));

        assert!(c.set_search(Some("  ".to_string())).is_none());
        let searched = c.set_search(Some("a".to_string())).expect("request");
        assert_eq!(searched.request.page, 1);
        assert_eq!(searched.request.query.search.as_deref(), Some("a"));
        assert!(c.rows().is_empty());

        let ordered = c
            .set_order(Some(ValueOrder::Value), true)
            .expect("request");
        assert!(ordered.generation > searched.generation);
        assert!(!c.complete(&searched, page(1, 2, vec![row("a", 2)])));
        assert!(c.set_order(Some(ValueOrder::Value), true).is_none());
    }

    #[test]
    fn abandoned_request_releases_the_guard() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        assert!(c.load_more().is_none());

        assert!(c.abandon(&first));
        assert_eq!(c.state(), &FetchState::Error("cancelled".to_string()));
        assert!(!c.complete(&first, page(1, 2, vec![row("late", 1)])));

        let retry = c.load_more().expect("retry");
        assert_eq!(retry.request.page, 1);
        assert!(c.complete(&retry, page(1, 2, vec![row("a", 2), row("b", 1)])));
        assert_eq!(c.state(), &FetchState::Ready);
    }

    #[test]
    fn abandoning_a_stale_ticket_changes_nothing() {
        let mut c = PagedFetchController::new(query(2));
        let old = c.select(signup_plan()).expect("request");
        let current = c
            .select(Selection::new("signup", "method"))
            .expect("request");

        assert!(!c.abandon(&old));
        assert_eq!(c.state(), &FetchState::Loading);
        assert!(c.complete(&current, page(1, 2, vec![row("email", 3)])));
        assert_eq!(c.state(), &FetchState::Exhausted);
    }

    #[test]
    fn page_size_change_restarts_at_page_one() {
        let mut c = PagedFetchController::new(query(2));
        let first = c.select(signup_plan()).expect("request");
        c.complete(&first, page(1, 2, vec![row("a", 2), row("b", 1)]));

        assert!(c.set_page_size(2).is_none());
        let resized = c.set_page_size(0).expect("request");
        assert_eq!(resized.request.page, 1);
        assert_eq!(resized.request.query.page_size, 1);
        assert!(c.rows().is_empty());
    }
}
