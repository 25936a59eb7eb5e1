//! Error type definitions.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// A `Result` alias where the `Err` case is `userdesk::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the userdesk crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid URL: {0}")]
    InvalidUrl(url::ParseError),
    #[error("Failed to setup HTTP client: {0}")]
    HttpClientSetup(reqwest::Error),
    #[error("Failed to deserialize response: {0}")]
    Deserialize(reqwest::Error),
    #[error("Http error: {0}")]
    Http(reqwest::Error),
    #[error(transparent)]
    Api(ApiError),
    #[error("Invalid user record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("{0}")]
    Validation(String),
    #[error("Unknown user field: {0}")]
    UnknownField(String),
    #[error("A fetch is in flight")]
    FetchInFlight,
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// An error returned by the remote users API.
///
/// The API has no documented error body, so `message` is only filled when the
/// response happens to carry a JSON object with a `message` field.
#[derive(Deserialize, Debug)]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    #[serde(skip)]
    pub method: http::Method,
    #[serde(skip)]
    pub path: String,
    pub message: Option<String>,
}

impl ApiError {
    pub(crate) fn new(
        status: u16,
        method: http::Method,
        path: String,
        message: Option<String>,
    ) -> Self {
        Self {
            status,
            method,
            path,
            message,
        }
    }
}

impl std::error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(msg) = self.message.as_ref() {
            write!(
                f,
                "Received {} on {} {}: {}",
                self.status, self.method, self.path, msg
            )
        } else {
            write!(f, "Received {} on {} {}", self.status, self.method, self.path)
        }
    }
}
