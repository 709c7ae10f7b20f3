//! Client side of event-data values browsing: a paged fetch state machine
//! and an async driver that fetches pages over HTTP.

pub mod controller;
pub mod error;
pub mod explorer;
pub mod fetcher;
pub mod request;

pub use controller::{FetchState, PagedFetchController, PendingFetch};
pub use error::FetchError;
pub use explorer::{ExplorerSnapshot, ValuesExplorer};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use request::{RequestKey, Selection, ValuesQuery, ValuesRequest};
