//! gRPC plumbing for the greeter service
//!
//! Calls flow through an explicit interceptor [`Pipeline`] before reaching a
//! handler:
//!
//! ```text
//! transport -> LoggingInterceptor -> AuthInterceptor -> handler -> store
//! ```
//!
//! Stages see the type-erased request payload and a per-call [`CallContext`],
//! which is how the auth stage hands the caller identity to the logging stage
//! and to handlers.
//!
//! ## Example
//!
//! ```ignore
//! use greeter_service::grpc::{CallContext, Pipeline};
//!
//! let pipeline = Pipeline::standard(validator, &config.auth);
//! let ctx = CallContext::from_request("/greet.Greeter/Farewell", &request);
//! let reply = pipeline
//!     .call(ctx, request.into_inner(), |ctx, req| handlers.farewell(ctx, req))
//!     .await?;
//! ```

pub mod context;
pub mod interceptors;
pub mod middleware;
pub mod server;

pub use context::{CallContext, REQUEST_ID_HEADER};
pub use interceptors::{AuthInterceptor, LoggingInterceptor};
pub use middleware::{CallOutcome, Interceptor, Next, Payload, Pipeline};
pub use server::GreeterServer;
