//! Common error types for orgID

use thiserror::Error;

/// Common result type for orgID operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across orgID crates
#[derive(Error, Debug)]
pub enum Error {
    /// CSV reading error (registry rows, labeled test sheets)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Outbound HTTP request error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
