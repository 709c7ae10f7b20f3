use std::sync::Arc;

use async_trait::async_trait;

use propscope_duckdb::{
    auth::{ApiKeyRecord, CreateApiKeyParams},
    website::{CreateWebsiteParams, Website},
    DuckDbBackend,
};

use super::MetadataStore;

/// Metadata kept in the embedded DuckDB file, whichever analytics store is
/// configured.
pub struct DuckDbMetadataStore {
    db: Arc<DuckDbBackend>,
}

impl DuckDbMetadataStore {
    pub fn new(db: Arc<DuckDbBackend>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for DuckDbMetadataStore {
    async fn create_website(&self, params: CreateWebsiteParams) -> anyhow::Result<Website> {
        self.db.create_website(params).await
    }

    async fn get_website(&self, id: &str) -> anyhow::Result<Option<Website>> {
        self.db.get_website(id).await
    }

    async fn website_exists(&self, id: &str) -> anyhow::Result<bool> {
        self.db.website_exists(id).await
    }

    async fn create_api_key(&self, params: CreateApiKeyParams) -> anyhow::Result<()> {
        self.db.create_api_key(params).await
    }

    async fn lookup_api_key(&self, key_hash: &str) -> anyhow::Result<Option<ApiKeyRecord>> {
        self.db.lookup_api_key(key_hash).await
    }

    async fn touch_api_key(&self, key_id: &str) -> anyhow::Result<()> {
        self.db.touch_api_key(key_id).await
    }

    async fn revoke_api_key(&self, key_id: &str) -> anyhow::Result<bool> {
        self.db.revoke_api_key(key_id).await
    }

    async fn api_key_has_grant(&self, key_id: &str, website_id: &str) -> anyhow::Result<bool> {
        self.db.api_key_has_grant(key_id, website_id).await
    }
}
