//! Built-in pipeline stages
//!
//! - [`LoggingInterceptor`]: outermost, records caller, payloads, timing and failures
//! - [`AuthInterceptor`]: validates the bearer credential and binds the caller identity

mod auth;
mod logging;

pub use auth::AuthInterceptor;
pub use logging::LoggingInterceptor;
