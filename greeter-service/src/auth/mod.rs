//! Credential validation
//!
//! Only validation lives here; tokens are issued by an external identity
//! provider. The auth interceptor in [`crate::grpc::interceptors`] drives
//! these types for every non-exempt call.

pub mod jwt;
pub mod token;

pub use jwt::JwtValidator;
pub use token::{AuthenticatedIdentity, Claims, TokenValidator, ANONYMOUS};
