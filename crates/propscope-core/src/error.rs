use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid paging: {0}")]
    InvalidPaging(String),

    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Failure raised by an analytics store while running a query.
///
/// Store implementations work in `anyhow` internally and convert at the
/// trait boundary. Nothing retries on this error.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("analytics store failure: {0}")]
    Store(#[from] anyhow::Error),

    #[error("malformed query: {0}")]
    Malformed(String),
}
