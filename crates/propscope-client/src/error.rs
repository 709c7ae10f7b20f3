use thiserror::Error;

/// Why a page could not be fetched. Any of these moves the controller to
/// its error state; nothing retries automatically.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not authorized to view this website")]
    Unauthorized,

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status})")]
    Server { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}
