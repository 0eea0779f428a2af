use thiserror::Error;

use crate::comparison::ComparisonError;

mod client;
pub mod path;
pub mod retry;
mod transport;

pub use client::ApiClient;
pub use path::{resolve_api_path, resolve_target, ApiTarget};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, PreparedRequest, Transport};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
    #[error("admin key required for {0}")]
    AdminRequired(&'static str),
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

impl ApiError {
    /// Whether a caller may reasonably try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => retry::is_retryable_http_error(*status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
