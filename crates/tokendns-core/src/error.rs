//! Error types for the token directory
//!
//! Every outcome of [`Directory::lookup`](crate::Directory::lookup) and
//! [`Directory::register`](crate::Directory::register) that is not a success
//! is one of these variants, so a request layer can map them to responses
//! without string matching.

use thiserror::Error;

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why an endpoint string was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointError {
    /// Port segment is not an integer in `0..=65535`
    #[error("invalid port number")]
    BadPort,

    /// Address segment is not an IPv4 or IPv6 literal
    #[error("invalid IP address format")]
    BadAddress,
}

/// Core error type for the token directory
#[derive(Error, Debug)]
pub enum Error {
    /// Token is not part of the provisioned set
    #[error("Invalid token")]
    InvalidToken,

    /// Token requires a secret and the supplied one is missing or wrong
    #[error("Forbidden: secret missing or incorrect")]
    Forbidden,

    /// Neither an explicit endpoint nor an origin hint was supplied
    #[error("Missing endpoint")]
    MissingEndpoint,

    /// Endpoint failed validation
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    /// Durable write failed after validation succeeded
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Durable store could not be read or parsed
    #[error("Directory store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stable, payload-free tag for an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidToken,
    Forbidden,
    MissingEndpoint,
    InvalidEndpoint,
    Persistence,
    Store,
    Config,
}

impl Error {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a directory store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidToken => ErrorKind::InvalidToken,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::MissingEndpoint => ErrorKind::MissingEndpoint,
            Error::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
            Error::Persistence(_) => ErrorKind::Persistence,
            Error::Store(_) => ErrorKind::Store,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the error was caused by the caller's input
    ///
    /// Persistence, store and configuration failures are server-side faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidToken
                | Error::Forbidden
                | Error::MissingEndpoint
                | Error::InvalidEndpoint(_)
        )
    }
}
