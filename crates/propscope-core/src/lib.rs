pub mod analytics;
pub mod bucket;
pub mod config;
pub mod error;
pub mod event;
pub mod service;
