//! Admin subcommands of the `propscope` binary.
//!
//! ```text
//! propscope                              serve
//! propscope health                       check /health, exit 0 or 1
//! propscope keygen [website_id…]         issue an API key, print it once
//! propscope website add <domain> [name]  register a website, print its id
//! propscope revoke <key_id>              revoke an API key
//! ```

use anyhow::{bail, Result};
use tracing::info;

use propscope_duckdb::DuckDbBackend;
use propscope_metadata::{CreateApiKeyParams, CreateWebsiteParams, MetadataStore, Website};

use crate::auth::api_keys;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    Health,
    Keygen { website_ids: Vec<String> },
    AddWebsite { domain: String, name: Option<String> },
    Revoke { key_id: String },
}

const USAGE: &str =
    "usage: propscope [health | keygen [website_id...] | website add <domain> [name] | revoke <key_id>]";

pub const DEFAULT_WEBSITE_ID: &str = "site_default";

/// Make sure `site_default` (localhost) exists. Failure is logged, not fatal.
pub async fn seed_default_website(db: &DuckDbBackend) {
    match db.seed_website(DEFAULT_WEBSITE_ID, "localhost").await {
        Ok(()) => info!("Default website '{DEFAULT_WEBSITE_ID}' (localhost) ready"),
        Err(e) => tracing::warn!(error = %e, "Failed to seed default website"),
    }
}

/// Parse the arguments after the program name.
pub fn parse_command(args: &[String]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match args.as_slice() {
        [] => Command::Serve,
        ["health"] => Command::Health,
        ["keygen", ids @ ..] => Command::Keygen {
            website_ids: ids.iter().map(|s| s.to_string()).collect(),
        },
        ["website", "add", domain] => Command::AddWebsite {
            domain: domain.to_string(),
            name: None,
        },
        ["website", "add", domain, name] => Command::AddWebsite {
            domain: domain.to_string(),
            name: Some(name.to_string()),
        },
        ["revoke", key_id] => Command::Revoke {
            key_id: key_id.to_string(),
        },
        _ => bail!(USAGE),
    };
    Ok(command)
}

/// A freshly issued key. `raw_key` exists only here; the store keeps its hash.
#[derive(Debug)]
pub struct IssuedKey {
    pub id: String,
    pub raw_key: String,
}

/// Issue a key for `website_ids`, or for every website when empty.
pub async fn issue_api_key(
    metadata: &dyn MetadataStore,
    website_ids: Vec<String>,
) -> Result<IssuedKey> {
    for website_id in &website_ids {
        let Some(website) = metadata.get_website(website_id).await? else {
            bail!("unknown website: {website_id}");
        };
        info!(website_id, domain = %website.domain, "Granting key access");
    }

    let key = api_keys::generate_api_key();
    let id = api_keys::generate_key_id();
    metadata
        .create_api_key(CreateApiKeyParams {
            id: id.clone(),
            name: "cli".to_string(),
            key_hash: key.hash,
            key_prefix: key.prefix,
            website_ids,
        })
        .await?;

    info!(key_id = %id, "API key created");
    Ok(IssuedKey {
        id,
        raw_key: key.raw_key,
    })
}

pub async fn add_website(
    metadata: &dyn MetadataStore,
    domain: &str,
    name: Option<String>,
) -> Result<Website> {
    let domain = domain.trim();
    if domain.is_empty() {
        bail!("domain must not be empty");
    }
    let website = metadata
        .create_website(CreateWebsiteParams {
            name: name.unwrap_or_else(|| domain.to_string()),
            domain: domain.to_string(),
        })
        .await?;
    info!(website_id = %website.id, domain = %website.domain, "Website created");
    Ok(website)
}

/// Revoke an active key. An unknown or already revoked id is an error.
pub async fn revoke_api_key(metadata: &dyn MetadataStore, key_id: &str) -> Result<()> {
    if !metadata.revoke_api_key(key_id).await? {
        bail!("no active API key with id {key_id}");
    }
    info!(key_id, "API key revoked");
    Ok(())
}
