//! Provider error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API error: {0}")]
    Api(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Title service error: {0}")]
    Title(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Cancelled")]
    Cancelled,
}
