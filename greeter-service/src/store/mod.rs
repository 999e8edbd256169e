//! Record store abstraction for greeting records
//!
//! The greeting service only talks to persistence through [`GreetingStore`].
//! Each operation is independently atomic; read-modify-write sequences are
//! composed by the caller from a point lookup followed by [`GreetingStore::update`].
//!
//! Two engines ship with the crate:
//!
//! - [`MemoryGreetingStore`]: process-local, used by default and in tests
//! - `PgGreetingStore`: PostgreSQL via sqlx (requires the `database` feature)

use std::future::Future;

use serde::{Deserialize, Serialize};

mod error;
mod memory;

#[cfg(feature = "database")]
mod postgres;

pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use memory::MemoryGreetingStore;

#[cfg(feature = "database")]
pub use postgres::PgGreetingStore;

/// Store-assigned record identifier
pub type GreetingId = i32;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A persisted greeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingRecord {
    /// Assigned on insert, never reused
    pub id: GreetingId,
    pub name: String,
    pub age: i32,
    pub city: String,
    /// Greeting text composed when the record was created
    pub message: String,
}

/// Fields for a record that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGreeting {
    pub name: String,
    pub age: i32,
    pub city: String,
    pub message: String,
}

/// Abstract persistence for greeting records
///
/// "Store order" is ascending id for every engine in this crate.
pub trait GreetingStore: Send + Sync + 'static {
    /// Insert a record and return it with its assigned id
    fn insert(&self, record: NewGreeting) -> impl Future<Output = StoreResult<GreetingRecord>> + Send;

    /// Point lookup by identifier
    fn find_by_id(
        &self,
        id: GreetingId,
    ) -> impl Future<Output = StoreResult<Option<GreetingRecord>>> + Send;

    /// First record in store order whose name equals `name`
    ///
    /// Names are not unique; callers must not treat the match as canonical.
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<Option<GreetingRecord>>> + Send;

    /// Up to `limit` records in store order
    fn scan(&self, limit: usize) -> impl Future<Output = StoreResult<Vec<GreetingRecord>>> + Send;

    /// Persist all mutable fields of an existing record
    ///
    /// Fails with a `NotFound` kind if the record no longer exists.
    fn update(
        &self,
        record: &GreetingRecord,
    ) -> impl Future<Output = StoreResult<GreetingRecord>> + Send;

    /// Remove a record, returning whether it existed
    fn delete(&self, id: GreetingId) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Number of stored records
    fn count(&self) -> impl Future<Output = StoreResult<u64>> + Send;
}
