use std::sync::Arc;

use tracing::error;

use propscope_core::{analytics::EventDataBackend, config::Config, service::ValuesQueryService};
use propscope_duckdb::DuckDbBackend;

use crate::auth::AuthContext;
use crate::metadata::{duckdb::DuckDbMetadataStore, MetadataStore};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// All fields are cheap to clone; heavy resources sit behind `Arc`.
pub struct AppState {
    /// Embedded DuckDB file. Always holds metadata; holds event data too
    /// unless ClickHouse is configured.
    pub db: Arc<DuckDbBackend>,

    /// Analytics store chosen at startup (`PROPSCOPE_ANALYTICS_STORE`).
    pub analytics: Arc<dyn EventDataBackend>,

    pub metadata: Arc<dyn MetadataStore>,

    pub values: ValuesQueryService,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,
}

impl AppState {
    /// State backed entirely by DuckDB.
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        let analytics: Arc<dyn EventDataBackend> = db.clone();
        Self::with_analytics(db, analytics, config)
    }

    /// State with a separate analytics store; metadata stays in `db`.
    pub fn with_analytics(
        db: Arc<DuckDbBackend>,
        analytics: Arc<dyn EventDataBackend>,
        config: Config,
    ) -> Self {
        let metadata: Arc<dyn MetadataStore> = Arc::new(DuckDbMetadataStore::new(db.clone()));
        Self {
            db,
            values: ValuesQueryService::new(Arc::clone(&analytics)),
            analytics,
            metadata,
            config: Arc::new(config),
        }
    }

    /// Return `true` if the authenticated caller may view `website_id`.
    ///
    /// Unknown websites are never viewable. Lookup failures are logged and
    /// treated as a denial.
    pub async fn can_view_website(&self, auth: &AuthContext, website_id: &str) -> bool {
        match self.metadata.website_exists(website_id).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                error!(website_id, error = %e, "website_exists lookup failed");
                return false;
            }
        }

        if auth.all_websites {
            return true;
        }
        let Some(key_id) = auth.api_key_id.as_deref() else {
            return false;
        };
        match self.metadata.api_key_has_grant(key_id, website_id).await {
            Ok(granted) => granted,
            Err(e) => {
                error!(website_id, key_id, error = %e, "API key grant lookup failed");
                false
            }
        }
    }
}
