/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// Every statement uses `IF NOT EXISTS`, so re-running on each startup is
/// safe.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `PROPSCOPE_DUCKDB_MEMORY`, default `"1GB"`) and must always be set.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- WEBSITES
-- ===========================================
CREATE TABLE IF NOT EXISTS websites (
    id              VARCHAR PRIMARY KEY,           -- 'site_' + 10 random chars
    name            VARCHAR NOT NULL,
    domain          VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- WEBSITE EVENTS (one row per custom event)
-- ===========================================
CREATE TABLE IF NOT EXISTS website_event (
    event_id        VARCHAR PRIMARY KEY,
    website_id      VARCHAR NOT NULL,
    event_name      VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_website_event_name
    ON website_event(website_id, event_name);

-- ===========================================
-- EVENT DATA (one row per custom property)
-- ===========================================
-- data_type: 1 string, 2 number, 3 boolean, 4 date, 5 array.
-- Numbers are kept in string_value with four fraction digits ('12.0000').
CREATE TABLE IF NOT EXISTS event_data (
    event_data_id    VARCHAR PRIMARY KEY,          -- UUID v4
    website_id       VARCHAR NOT NULL,
    website_event_id VARCHAR NOT NULL,
    data_key         VARCHAR NOT NULL,
    string_value     VARCHAR,
    number_value     DOUBLE,
    date_value       TIMESTAMP,
    data_type        INTEGER NOT NULL,
    created_at       TIMESTAMP NOT NULL
);
-- Primary query pattern: website + property + date range
CREATE INDEX IF NOT EXISTS idx_event_data_website_key_time
    ON event_data(website_id, data_key, created_at);
CREATE INDEX IF NOT EXISTS idx_event_data_event
    ON event_data(website_event_id);

-- ===========================================
-- API KEYS
-- ===========================================
CREATE TABLE IF NOT EXISTS api_keys (
    id              VARCHAR PRIMARY KEY,           -- 'key_' + 10 random chars
    name            VARCHAR NOT NULL,
    key_hash        VARCHAR(64) NOT NULL UNIQUE,   -- sha256(raw_key); never stored raw
    key_prefix      VARCHAR(16) NOT NULL,          -- display prefix of the raw key
    all_websites    BOOLEAN NOT NULL DEFAULT false,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    last_used_at    TIMESTAMP,                     -- NULL until first use
    revoked_at      TIMESTAMP                      -- NULL = active
);
CREATE INDEX IF NOT EXISTS idx_api_keys_hash ON api_keys(key_hash);

CREATE TABLE IF NOT EXISTS api_key_websites (
    key_id          VARCHAR NOT NULL,
    website_id      VARCHAR NOT NULL,
    PRIMARY KEY (key_id, website_id)
);
"#
    )
}
