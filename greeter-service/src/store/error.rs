//! Record store error types
//!
//! Store errors carry the operation that failed and a coarse category so that
//! handlers can log the full detail while returning a generic status to the
//! caller.
//!
//! ```rust
//! use greeter_service::store::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::not_found(StoreOperation::Update, 42);
//! assert_eq!(error.kind, StoreErrorKind::NotFound);
//! assert_eq!(error.record_id, Some(42));
//! ```

use std::fmt;

use super::GreetingId;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Inserting a new record
    Insert,
    /// Point lookup by identifier
    FindById,
    /// Lookup by name
    FindByName,
    /// Bounded scan in store order
    Scan,
    /// Persisting changed fields
    Update,
    /// Removing a record
    Delete,
    /// Counting records
    Count,
    /// Establishing a connection or preparing the schema
    Connect,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::FindById => write!(f, "find_by_id"),
            Self::FindByName => write!(f, "find_by_name"),
            Self::Scan => write!(f, "scan"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Count => write!(f, "count"),
            Self::Connect => write!(f, "connect"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Record was not found
    NotFound,
    /// Failed to connect to the backing engine
    ConnectionFailed,
    /// Query or write failed
    QueryFailed,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The record involved, when known
    pub record_id: Option<GreetingId>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            record_id: None,
        }
    }

    /// Create a "not found" error for a record id
    pub fn not_found(operation: StoreOperation, id: GreetingId) -> Self {
        Self {
            operation,
            kind: StoreErrorKind::NotFound,
            message: "Record not found".to_string(),
            record_id: Some(id),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(StoreOperation::Connect, StoreErrorKind::ConnectionFailed, message)
    }

    /// Create a query failed error
    pub fn query_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::QueryFailed, message)
    }

    /// Check whether the error reports a missing record
    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let Some(id) = self.record_id {
            write!(f, " [id: {}]", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

#[cfg(feature = "database")]
impl StoreError {
    /// Classify a sqlx error raised during `operation`
    pub fn from_sqlx(operation: StoreOperation, err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        let kind = match &err {
            E::PoolTimedOut | E::PoolClosed | E::Io(_) | E::Tls(_) | E::WorkerCrashed => {
                StoreErrorKind::ConnectionFailed
            }
            E::RowNotFound => StoreErrorKind::NotFound,
            E::Database(_) | E::Protocol(_) | E::ColumnDecode { .. } | E::Decode(_) => {
                StoreErrorKind::QueryFailed
            }
            _ => StoreErrorKind::Other,
        };
        Self::new(operation, kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_operation_display() {
        assert_eq!(StoreOperation::Insert.to_string(), "insert");
        assert_eq!(StoreOperation::FindByName.to_string(), "find_by_name");
        assert_eq!(StoreOperation::Scan.to_string(), "scan");
    }

    #[test]
    fn test_not_found_display_includes_id() {
        let error = StoreError::not_found(StoreOperation::Delete, 7);
        assert!(error.is_not_found());
        assert_eq!(
            error.to_string(),
            "Store not_found error during delete: Record not found [id: 7]"
        );
    }

    #[test]
    fn test_query_failed_convenience() {
        let error = StoreError::query_failed(StoreOperation::Update, "deadlock detected");
        assert_eq!(error.kind, StoreErrorKind::QueryFailed);
        assert_eq!(error.operation, StoreOperation::Update);
        assert!(!error.is_not_found());
        assert!(error.record_id.is_none());
    }

    #[test]
    fn test_connection_failed_convenience() {
        let error = StoreError::connection_failed("refused");
        assert_eq!(error.kind, StoreErrorKind::ConnectionFailed);
        assert_eq!(error.operation, StoreOperation::Connect);
    }
}
