//! Code Mapping Store
//!
//! Durable code-to-asset mappings. SQLite is the production backend; the
//! in-memory store exists so the layers above can be exercised without a
//! database file.

mod memory;
mod sqlite;

use async_trait::async_trait;
use kg_common::{Code, CodeMapping};
pub use memory::MemoryCodeStore;
pub use sqlite::SqliteCodeStore;

/// The backing database could not complete the operation. The caller
/// cannot tell whether the write applied and must not claim success.
#[derive(Debug, thiserror::Error)]
#[error("code store unavailable: {0}")]
pub struct StoreError(#[from] sqlx::Error);

/// Durable code-to-asset mappings.
///
/// `insert` and `remove` report whether they changed anything, so callers
/// can tell a conflict or a missing row apart from success without a
/// separate read.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// The mapping registered under `code`, if any.
    async fn lookup(&self, code: &Code) -> Result<Option<CodeMapping>, StoreError>;

    /// Register `mapping` unless its code is already taken. Returns
    /// whether the row was written; an existing mapping is never
    /// overwritten.
    async fn insert(&self, mapping: &CodeMapping) -> Result<bool, StoreError>;

    /// Drop the mapping under `code`. Returns whether a row existed.
    async fn remove(&self, code: &Code) -> Result<bool, StoreError>;
}
