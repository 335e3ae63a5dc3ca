//! Application error types

use thiserror::Error;

/// Fixed message surfaced whenever the provider (or the local limiter)
/// signals that the call budget is exhausted.
pub const RATE_LIMIT_MESSAGE: &str = "API call frequency limit reached. Please try again later.";

/// Application-wide error type
///
/// The `Display` output of each variant is the exact text handed to callers
/// in `ApiResponse::error`, so the formats below are part of the contract.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport failure; carries the transport's own message.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// Error text embedded by the provider in an otherwise successful body.
    #[error("{0}")]
    Upstream(String),

    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited,

    /// Well-formed payload without the expected data block.
    #[error("{0}")]
    NoData(String),

    /// Response body that is not valid JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Short machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Http(_) => "HTTP_ERROR",
            AppError::Status(_) => "HTTP_STATUS",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::NoData(_) => "NO_DATA",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
