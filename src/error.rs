//! Error types for the TeamCity client core

use thiserror::Error;

/// Result type alias for the TeamCity client core
pub type Result<T> = std::result::Result<T, TeamCityError>;

/// Main error type for the TeamCity client core
#[derive(Debug, Error)]
pub enum TeamCityError {
    /// Network-level failure (connection refused, DNS, reset)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request timed out before the server responded
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// The server answered 429 and asked us to slow down
    #[error("Rate limited by server")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A 4xx response other than 429
    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    /// A 5xx response
    #[error("Server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Raised without a remote call when the circuit breaker is open
    #[error("Circuit breaker is open; call rejected")]
    CircuitOpen,

    /// A node turned out to be its own transitive ancestor
    #[error("Cycle detected in project hierarchy at '{id}'")]
    Cycle { id: String },

    /// Malformed locator input that could not be degraded gracefully
    #[error("Invalid locator: {message}")]
    Locator { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl TeamCityError {
    /// Build the right taxonomy variant for an HTTP status code.
    pub fn from_status(
        status: u16,
        message: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        match status {
            429 => TeamCityError::RateLimited { retry_after_secs },
            400..=499 => TeamCityError::Client {
                status,
                message: message.into(),
            },
            _ => TeamCityError::Server {
                status,
                message: message.into(),
                retry_after_secs,
            },
        }
    }

    /// HTTP status code, when this error came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TeamCityError::Client { status, .. } | TeamCityError::Server { status, .. } => {
                Some(*status)
            }
            TeamCityError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Server-supplied retry-after hint in seconds, if the response carried one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            TeamCityError::RateLimited { retry_after_secs }
            | TeamCityError::Server {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// True when the failed lookup means the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TeamCityError::Client { status: 404, .. })
    }
}
