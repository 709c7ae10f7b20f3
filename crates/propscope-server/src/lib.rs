pub mod app;
pub mod auth;
pub mod cli;
pub mod error;
pub mod metadata;
pub mod routes;
pub mod state;

#[cfg(feature = "clickhouse")]
pub mod clickhouse;
