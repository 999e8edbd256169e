//! Error types for service bootstrap, credential validation and persistence
//!
//! Call-level failures reported to gRPC clients are always `tonic::Status`
//! values built by the handlers and interceptors. This type covers everything
//! underneath them: loading configuration and key material, validating tokens,
//! talking to the record store and running the transport.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// JWT decoding or validation error
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// gRPC transport error
    #[error("Transport error: {0}")]
    Transport(Box<tonic::transport::Error>),

    /// Record store error
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a configuration error from a plain message
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(Box::new(figment::Error::from(message.into())))
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreError, StoreOperation};

    #[test]
    fn test_config_error_message() {
        let err = Error::config("missing issuer");
        assert!(err.to_string().starts_with("Configuration error:"));
        assert!(err.to_string().contains("missing issuer"));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: Error = StoreError::query_failed(StoreOperation::Insert, "disk full").into();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_jwt_error_conversion() {
        let jwt_err = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::ExpiredSignature,
        );
        let err: Error = jwt_err.into();
        assert!(matches!(err, Error::Jwt(_)));
    }
}
