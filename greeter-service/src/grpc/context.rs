//! Per-call context threaded through every pipeline stage

use tonic::metadata::{KeyAndValueRef, MetadataMap};
use uuid::Uuid;

use crate::auth::{AuthenticatedIdentity, ANONYMOUS};

/// Request ID metadata key
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything a stage may know about the call in flight
///
/// The context is an owned value passed from stage to stage. Stages that bind
/// information (the auth interceptor binding the caller identity) return an
/// updated copy to the next stage instead of mutating shared state.
#[derive(Debug, Clone)]
pub struct CallContext {
    method: String,
    metadata: MetadataMap,
    request_id: String,
    identity: Option<AuthenticatedIdentity>,
}

impl CallContext {
    /// Create a context for `method` (full path, e.g. `/greet.Greeter/GetById`)
    ///
    /// The request ID is taken from `x-request-id` metadata or generated.
    pub fn new(method: impl Into<String>, metadata: MetadataMap) -> Self {
        let request_id = metadata
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            method: method.into(),
            metadata,
            request_id,
            identity: None,
        }
    }

    /// Create a context from an inbound tonic request
    pub fn from_request<T>(method: impl Into<String>, request: &tonic::Request<T>) -> Self {
        Self::new(method, request.metadata().clone())
    }

    /// Full method path
    pub fn method(&self) -> &str {
        &self.method
    }

    /// First ASCII metadata value whose key equals `key`, ignoring case
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.iter().find_map(|entry| match entry {
            KeyAndValueRef::Ascii(k, v) if k.as_str().eq_ignore_ascii_case(key) => v.to_str().ok(),
            _ => None,
        })
    }

    /// Correlation ID for log lines belonging to this call
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Identity bound by the auth interceptor, if any
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        self.identity.as_ref()
    }

    /// Caller principal name, or `"Anonymous"`
    pub fn identity_name(&self) -> &str {
        self.identity
            .as_ref()
            .map(AuthenticatedIdentity::display_name)
            .unwrap_or(ANONYMOUS)
    }

    /// Return the context with `identity` bound for the rest of the call
    pub fn with_identity(mut self, identity: AuthenticatedIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}
