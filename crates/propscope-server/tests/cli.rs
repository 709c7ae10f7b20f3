use std::sync::Arc;

use propscope_duckdb::DuckDbBackend;
use propscope_server::auth::api_keys::hash_api_key;
use propscope_server::cli::{self, DEFAULT_WEBSITE_ID};
use propscope_server::metadata::{duckdb::DuckDbMetadataStore, MetadataStore};

fn fresh_store() -> (Arc<DuckDbBackend>, DuckDbMetadataStore) {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("in-memory DuckDB"));
    let metadata = DuckDbMetadataStore::new(Arc::clone(&db));
    (db, metadata)
}

#[tokio::test]
async fn keygen_for_default_website_works_on_a_fresh_store() {
    let (db, metadata) = fresh_store();
    cli::seed_default_website(&db).await;

    let issued = cli::issue_api_key(&metadata, vec![DEFAULT_WEBSITE_ID.to_string()])
        .await
        .expect("key for site_default");

    let record = metadata
        .lookup_api_key(&hash_api_key(&issued.raw_key))
        .await
        .expect("lookup")
        .expect("active key");
    assert_eq!(record.id, issued.id);
    assert!(!record.all_websites);
    assert!(metadata
        .api_key_has_grant(&issued.id, DEFAULT_WEBSITE_ID)
        .await
        .expect("grant"));
}

#[tokio::test]
async fn keygen_rejects_unknown_websites() {
    let (db, metadata) = fresh_store();
    cli::seed_default_website(&db).await;

    let err = cli::issue_api_key(
        &metadata,
        vec![DEFAULT_WEBSITE_ID.to_string(), "site_missing".to_string()],
    )
    .await
    .expect_err("unknown website");
    assert!(err.to_string().contains("site_missing"));
}

#[tokio::test]
async fn added_website_can_be_granted_to_a_key() {
    let (_db, metadata) = fresh_store();

    let website = cli::add_website(&metadata, " docs.example.com ", None)
        .await
        .expect("website");
    assert!(website.id.starts_with("site_"));
    assert_eq!(website.domain, "docs.example.com");
    assert_eq!(website.name, "docs.example.com");

    let loaded = metadata
        .get_website(&website.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(loaded.domain, "docs.example.com");

    let issued = cli::issue_api_key(&metadata, vec![website.id.clone()])
        .await
        .expect("scoped key");
    assert!(metadata
        .api_key_has_grant(&issued.id, &website.id)
        .await
        .expect("grant"));

    assert!(cli::add_website(&metadata, "   ", None).await.is_err());
}

#[tokio::test]
async fn revoked_key_no_longer_authenticates() {
    let (_db, metadata) = fresh_store();
    let issued = cli::issue_api_key(&metadata, vec![]).await.expect("key");
    let hash = hash_api_key(&issued.raw_key);

    cli::revoke_api_key(&metadata, &issued.id)
        .await
        .expect("revoke");
    assert!(metadata.lookup_api_key(&hash).await.expect("lookup").is_none());

    assert!(cli::revoke_api_key(&metadata, &issued.id).await.is_err());
    assert!(cli::revoke_api_key(&metadata, "key_unknown").await.is_err());
}
