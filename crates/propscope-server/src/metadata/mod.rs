pub mod duckdb;

pub use propscope_metadata::MetadataStore;
