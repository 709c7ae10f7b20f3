use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use propscope_core::{
    analytics::EventDataBackend,
    config::{AnalyticsStore, AuthMode, Config},
};
use propscope_duckdb::DuckDbBackend;
use propscope_server::{
    cli::{self, Command},
    metadata::duckdb::DuckDbMetadataStore,
    state::AppState,
};

/// `propscope health`: liveness check for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$PROPSCOPE_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("PROPSCOPE_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{port}/health");
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

fn open_duckdb(cfg: &Config) -> Result<DuckDbBackend> {
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/propscope.db", cfg.data_dir);
    DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)
}

#[cfg(feature = "clickhouse")]
async fn clickhouse_backend(
    ch: &propscope_core::config::ClickHouseConfig,
) -> Result<Arc<dyn EventDataBackend>> {
    use propscope_server::clickhouse::{clickhouse_migrate, ClickHouseBackend, ClickHouseClient};

    let client = ClickHouseClient::new(ch);
    clickhouse_migrate(&client).await?;
    Ok(Arc::new(ClickHouseBackend::new(client)))
}

#[cfg(not(feature = "clickhouse"))]
async fn clickhouse_backend(
    _ch: &propscope_core::config::ClickHouseConfig,
) -> Result<Arc<dyn EventDataBackend>> {
    anyhow::bail!("this build has no ClickHouse support (enable the `clickhouse` feature)")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_command(&args)?;
    if command == Command::Health {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("propscope=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Arc::new(open_duckdb(&cfg)?);

    // Seeded before any admin command so `keygen site_default` works on a
    // fresh data directory.
    cli::seed_default_website(&db).await;

    let metadata = DuckDbMetadataStore::new(Arc::clone(&db));
    match command {
        Command::Serve | Command::Health => {}
        Command::Keygen { website_ids } => {
            let issued = cli::issue_api_key(&metadata, website_ids).await?;
            println!("{}", issued.raw_key);
            return Ok(());
        }
        Command::AddWebsite { domain, name } => {
            let website = cli::add_website(&metadata, &domain, name).await?;
            println!("{}", website.id);
            return Ok(());
        }
        Command::Revoke { key_id } => {
            cli::revoke_api_key(&metadata, &key_id).await?;
            return Ok(());
        }
    }

    match cfg.auth_mode {
        AuthMode::ApiKey => info!("API key auth enabled; run `propscope keygen` to issue a key"),
        AuthMode::None => info!("Auth disabled (PROPSCOPE_AUTH=none); all websites open"),
    }

    let state = match &cfg.analytics_store {
        AnalyticsStore::DuckDb => {
            let analytics: Arc<dyn EventDataBackend> = db.clone();
            AppState::with_analytics(db, analytics, cfg.clone())
        }
        AnalyticsStore::ClickHouse(ch) => {
            info!(url = %ch.url, database = %ch.database, "Using ClickHouse analytics store");
            let analytics = clickhouse_backend(ch).await?;
            AppState::with_analytics(db, analytics, cfg.clone())
        }
    };
    let state = Arc::new(state);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = propscope_server::app::build_app(state);

    let store = match cfg.analytics_store {
        AnalyticsStore::DuckDb => "duckdb",
        AnalyticsStore::ClickHouse(_) => "clickhouse",
    };
    info!(port = cfg.port, store, "propscope listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
