//! # greeter-service
//!
//! Authenticated gRPC service storing greeting records.
//!
//! ## Features
//!
//! - **Six RPCs**: create-or-welcome, lookup, streamed listing, partial update, delete, farewell
//! - **Interceptor pipeline**: request/response logging around JWT bearer authentication
//! - **Pluggable storage**: in-memory by default, PostgreSQL with the `database` feature
//! - **Operations**: gRPC health and reflection services, graceful shutdown
//! - **Configuration**: layered TOML files and `GREETER_` environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use greeter_service::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let validator = JwtValidator::new(&config.jwt)?;
//!     let pipeline = Pipeline::standard(validator, &config.auth);
//!     let service = GreeterService::new(Arc::new(MemoryGreetingStore::new()), pipeline);
//!
//!     GreeterServer::new(&config).serve(service).await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod grpc;
pub mod observability;
pub mod service;
pub mod store;

/// Generated protobuf types for package `greet`
pub mod proto {
    tonic::include_proto!("greet");

    /// Encoded file descriptor set used by the reflection service
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("greeter_descriptor");
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{AuthenticatedIdentity, Claims, JwtValidator, TokenValidator};
    pub use crate::config::{AuthConfig, Config, GrpcConfig, JwtConfig, LogFormat};
    pub use crate::error::{Error, Result};
    pub use crate::grpc::{
        AuthInterceptor, CallContext, GreeterServer, Interceptor, LoggingInterceptor, Pipeline,
    };
    pub use crate::observability::init_tracing;
    pub use crate::service::{GreeterService, GreetingHandlers};
    pub use crate::store::{GreetingRecord, GreetingStore, MemoryGreetingStore, StoreError};

    #[cfg(feature = "database")]
    pub use crate::config::DatabaseConfig;

    #[cfg(feature = "database")]
    pub use crate::store::PgGreetingStore;

    pub use tonic::{Code, Request, Response, Status};
}
