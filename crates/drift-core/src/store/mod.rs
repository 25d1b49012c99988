use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Persistent per-environment drift state, one hash-like record per
/// `repository:environment` key.
///
/// `increment_drift` must be atomic; every other write is last-write-wins.
/// Connectivity and timeout failures surface as `StoreUnavailable`. Records
/// never expire.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Create the record for `key` with its identity fields unless it
    /// already exists. Returns true when a new record was written; an
    /// existing record is left untouched.
    async fn initialize_if_absent(
        &self,
        key: &str,
        tier: &str,
        project_id: &str,
        threshold: &str,
    ) -> Result<bool>;

    /// Overwrite the record's operation log.
    async fn record_operation(&self, key: &str, timestamp: &str, operation: &str) -> Result<()>;

    /// Atomically bump the drift counter, returning the new count.
    async fn increment_drift(&self, key: &str) -> Result<i64>;

    /// Zero the drift counter.
    async fn reset_drift(&self, key: &str) -> Result<()>;

    /// Read the whole record. A wholly missing key is `NotFound`.
    async fn read_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Set one field.
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Read one field; `None` when the field (or the key) is absent.
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Overwrite the captured plan output.
    async fn store_plan_output(&self, key: &str, output: &str) -> Result<()>;

    /// Connectivity probe for readiness checks.
    async fn ping(&self) -> Result<()>;
}
