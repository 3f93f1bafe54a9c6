//! Backing store capability contract
//!
//! The core holds no authoritative state of its own: events, indexes, and
//! catalogs all live in a remote key-value store reached through the
//! [`EventStore`] trait. The trait is the full capability contract the core
//! consumes — string values, unordered sets, a sorted set scored by
//! timestamp, and one atomic conditional write.
//!
//! Implementations: [`crate::redis::RedisStore`] for production,
//! [`MemoryStore`] as the in-process backend for tests and development.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Capability contract over the remote key-value store
///
/// Every method is one store round-trip, atomic at the store-operation
/// granularity, and bounded by the implementation's command timeout.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Read a string value; `None` if the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a string value, overwriting any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Add a member to an unordered set (created on first add)
    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// All members of an unordered set; empty if the key is absent
    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError>;

    /// Union of the named sets, computed server-side where the store
    /// supports it; absent keys contribute nothing
    async fn set_union(&self, keys: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Add a member to a sorted set with the given score, updating the
    /// score if the member already exists
    async fn sorted_add(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError>;

    /// Members of a sorted set with `min <= score <= max`, both inclusive
    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError>;

    /// Atomic conditional write: apply `new` only if the current value
    /// equals `expected` (`None` meaning the key must be absent). Returns
    /// whether the write was applied; a mismatch has no side effects.
    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError>;
}
