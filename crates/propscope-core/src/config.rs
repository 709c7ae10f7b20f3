#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    pub auth_mode: AuthMode,
    pub analytics_store: AnalyticsStore,
    pub cors_origins: Vec<String>,
    /// Largest `pageSize` the values endpoint accepts.
    pub max_page_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    None,
    ApiKey,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsStore {
    DuckDb,
    ClickHouse(ClickHouseConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickHouseConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: var("PROPSCOPE_PORT", "3000")
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: var("PROPSCOPE_DATA_DIR", "./data"),
            duckdb_memory_limit: var("PROPSCOPE_DUCKDB_MEMORY", "1GB"),
            auth_mode: match var("PROPSCOPE_AUTH", "api_key").as_str() {
                "none" => AuthMode::None,
                _ => AuthMode::ApiKey,
            },
            analytics_store: match var("PROPSCOPE_ANALYTICS_STORE", "duckdb").as_str() {
                "clickhouse" => {
                    let url = lookup("PROPSCOPE_CLICKHOUSE_URL").ok_or_else(|| {
                        "PROPSCOPE_CLICKHOUSE_URL required when ANALYTICS_STORE=clickhouse"
                            .to_string()
                    })?;
                    AnalyticsStore::ClickHouse(ClickHouseConfig {
                        url,
                        user: var("PROPSCOPE_CLICKHOUSE_USER", "default"),
                        password: var("PROPSCOPE_CLICKHOUSE_PASSWORD", ""),
                        database: var("PROPSCOPE_CLICKHOUSE_DATABASE", "propscope"),
                    })
                }
                "duckdb" => AnalyticsStore::DuckDb,
                other => return Err(format!("unknown analytics store: {other}")),
            },
            cors_origins: lookup("PROPSCOPE_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            max_page_size: var("PROPSCOPE_MAX_PAGE_SIZE", "500")
                .parse::<u32>()
                .unwrap_or(500)
                .max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_select_duckdb_with_api_keys() {
        let cfg = config_from(&[]).expect("config");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.auth_mode, AuthMode::ApiKey);
        assert_eq!(cfg.analytics_store, AnalyticsStore::DuckDb);
        assert_eq!(cfg.max_page_size, 500);
        assert!(cfg.cors_origins.is_empty());
    }

    #[test]
    fn clickhouse_requires_url() {
        let err = config_from(&[("PROPSCOPE_ANALYTICS_STORE", "clickhouse")]).unwrap_err();
        assert!(err.contains("PROPSCOPE_CLICKHOUSE_URL"));

        let cfg = config_from(&[
            ("PROPSCOPE_ANALYTICS_STORE", "clickhouse"),
            ("PROPSCOPE_CLICKHOUSE_URL", "http://ch:8123"),
        ])
        .expect("config");
        match cfg.analytics_store {
            AnalyticsStore::ClickHouse(ch) => {
                assert_eq!(ch.url, "http://ch:8123");
                assert_eq!(ch.database, "propscope");
            }
            other => panic!("unexpected store {other:?}"),
        }
    }

    #[test]
    fn unknown_store_and_bad_port_are_rejected() {
        assert!(config_from(&[("PROPSCOPE_ANALYTICS_STORE", "sqlite")]).is_err());
        assert!(config_from(&[("PROPSCOPE_PORT", "eighty")]).is_err());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let cfg = config_from(&[(
            "PROPSCOPE_CORS_ORIGINS",
            "https://a.example, https://b.example,",
        )])
        .expect("config");
        assert_eq!(
            cfg.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
