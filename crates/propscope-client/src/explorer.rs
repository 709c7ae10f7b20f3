use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use propscope_core::analytics::{ValueOrder, ValueRow};

use crate::controller::{FetchState, PagedFetchController, PendingFetch};
use crate::fetcher::PageFetcher;
use crate::request::{Selection, ValuesQuery};

/// Point-in-time copy of what a view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerSnapshot {
    pub state: FetchState,
    pub selection: Selection,
    pub rows: Vec<ValueRow>,
    pub page: u32,
    pub count: i64,
}

/// Drives a [`PagedFetchController`] with a [`PageFetcher`].
///
/// The controller lock covers only the state transitions, never the fetch,
/// so a second trigger during a fetch sees `Loading` and returns at once.
/// Dropping one of the returned futures mid-fetch abandons that request
/// and leaves the controller in `Error`. Cloning shares the same controller.
pub struct ValuesExplorer<F: PageFetcher> {
    controller: Arc<Mutex<PagedFetchController>>,
    fetcher: Arc<F>,
}

impl<F: PageFetcher> Clone for ValuesExplorer<F> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<F: PageFetcher> ValuesExplorer<F> {
    pub fn new(fetcher: F, query: ValuesQuery) -> Self {
        Self {
            controller: Arc::new(Mutex::new(PagedFetchController::new(query))),
            fetcher: Arc::new(fetcher),
        }
    }

    pub async fn select(&self, selection: Selection) -> FetchState {
        let pending = self.controller.lock().await.select(selection);
        self.run(pending).await
    }

    pub async fn load_more(&self) -> FetchState {
        let pending = self.controller.lock().await.load_more();
        self.run(pending).await
    }

    pub async fn set_search(&self, search: Option<String>) -> FetchState {
        let pending = self.controller.lock().await.set_search(search);
        self.run(pending).await
    }

    pub async fn set_order(&self, order_by: Option<ValueOrder>, sort_descending: bool) -> FetchState {
        let pending = self
            .controller
            .lock()
            .await
            .set_order(order_by, sort_descending);
        self.run(pending).await
    }

    pub async fn set_range(&self, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> FetchState {
        let pending = self.controller.lock().await.set_range(start_at, end_at);
        self.run(pending).await
    }

    pub async fn set_page_size(&self, page_size: u32) -> FetchState {
        let pending = self.controller.lock().await.set_page_size(page_size);
        self.run(pending).await
    }

    pub async fn snapshot(&self) -> ExplorerSnapshot {
        let controller = self.controller.lock().await;
        ExplorerSnapshot {
            state: controller.state().clone(),
            selection: controller.selection().clone(),
            rows: controller.rows().to_vec(),
            page: controller.page(),
            count: controller.count(),
        }
    }

    async fn run(&self, pending: Option<PendingFetch>) -> FetchState {
        let Some(pending) = pending else {
            return self.controller.lock().await.state().clone();
        };

        let request = pending.request.clone();
        let mut in_flight = AbandonOnDrop {
            controller: Arc::clone(&self.controller),
            ticket: Some(pending),
        };
        let result = self.fetcher.fetch_page(&request).await;

        let mut controller = self.controller.lock().await;
        if let Some(ticket) = in_flight.ticket.take() {
            controller.complete(&ticket, result);
        }
        controller.state().clone()
    }
}

/// Abandons its ticket unless `run` settled it first.
struct AbandonOnDrop {
    controller: Arc<Mutex<PagedFetchController>>,
    ticket: Option<PendingFetch>,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        if let Ok(mut controller) = self.controller.try_lock() {
            controller.abandon(&ticket);
            return;
        }
        // Someone holds the lock; settle from a task once it is released.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let controller = Arc::clone(&self.controller);
                handle.spawn(async move {
                    controller.lock().await.abandon(&ticket);
                });
            }
            Err(_) => tracing::warn!(
                page = ticket.request.page,
                "values page request dropped outside a runtime; controller left loading"
            ),
        }
    }
}
