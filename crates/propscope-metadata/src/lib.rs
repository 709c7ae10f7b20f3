use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub name: String,
    pub key_prefix: String,
    /// Key was issued without website grants and may view every website.
    pub all_websites: bool,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub revoked_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Website {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateWebsiteParams {
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone)]
pub struct CreateApiKeyParams {
    pub id: String,
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    /// Websites the key may view. Empty grants every website.
    pub website_ids: Vec<String>,
}

/// Storage interface for websites and API-key access control.
///
/// Kept apart from the analytics store so the ClickHouse deployment can
/// keep its metadata in DuckDB while events live in ClickHouse.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn create_website(&self, params: CreateWebsiteParams) -> anyhow::Result<Website>;
    async fn get_website(&self, id: &str) -> anyhow::Result<Option<Website>>;
    async fn website_exists(&self, id: &str) -> anyhow::Result<bool>;

    async fn create_api_key(&self, params: CreateApiKeyParams) -> anyhow::Result<()>;
    /// Active (non-revoked) key for a SHA-256 hex hash.
    async fn lookup_api_key(&self, key_hash: &str) -> anyhow::Result<Option<ApiKeyRecord>>;
    async fn touch_api_key(&self, key_id: &str) -> anyhow::Result<()>;
    async fn revoke_api_key(&self, key_id: &str) -> anyhow::Result<bool>;
    /// Whether the key holds a grant for `website_id`. Does not consider
    /// `all_websites`.
    async fn api_key_has_grant(&self, key_id: &str, website_id: &str) -> anyhow::Result<bool>;
}
