//! Unified error types.
//!
//! Every public operation either returns a normalized value or fails with
//! exactly one of these kinds. Nothing is retried and nothing is swallowed.

use thiserror::Error;

use crate::vendors::Vendor;

/// Configuration problems, raised when a client is constructed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("client '{client}': missing required setting '{field}'")]
    MissingField { client: String, field: &'static str },

    #[error("client '{client}': invalid setting '{field}': {reason}")]
    InvalidField {
        client: String,
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    /// Name of the offending setting.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::MissingField { field, .. } => field,
            ConfigError::InvalidField { field, .. } => field,
        }
    }
}

/// Failures below the vendor protocol: status codes, timeouts, sockets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("upstream error {code}: {message}")]
    Upstream { code: i64, message: String },

    #[error("unsupported content type '{0}', cannot choose a file extension")]
    UnsupportedContentType(String),

    #[error("failed to persist asset: {0}")]
    Persistence(String),

    #[error("{operation} is not offered by {vendor}")]
    UnsupportedOperation {
        vendor: Vendor,
        operation: &'static str,
    },

    #[error("credential store error: {0}")]
    Store(String),

    #[error("unexpected upstream response: {0}")]
    Decode(String),
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
