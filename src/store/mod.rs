//! Backing store client
//!
//! The narrow capability set the rest of the adapter consumes, behind an
//! object-safe trait so the engine and tests can run against either the
//! Redis client or the in-memory implementation.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use tracing::error;

use crate::error::{AdapterError, AdapterResult};

/// Key/value operations the adapter needs from the backing store
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value at `key`
    async fn get(&self, key: &str) -> AdapterResult<Option<String>>;

    /// Atomically read and remove the value at `key`
    async fn get_del(&self, key: &str) -> AdapterResult<Option<String>>;

    /// One cursor step over keys matching `pattern`; a returned cursor of 0
    /// means the iteration is complete
    async fn scan(&self, pattern: &str, cursor: u64, count: usize)
        -> AdapterResult<(u64, Vec<String>)>;

    /// Increment the integer at `key`, creating it at 1
    async fn incr(&self, key: &str) -> AdapterResult<i64>;

    /// Set a TTL in seconds on `key`
    async fn expire(&self, key: &str, seconds: u64) -> AdapterResult<()>;

    /// Liveness probe
    async fn ping(&self) -> AdapterResult<()>;
}

/// Emit the standard store-failure event
pub(crate) fn log_error(operation: &str, err: &AdapterError) {
    error!(operation = operation, error = %err, "redis_connection_error");
}
