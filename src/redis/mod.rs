//! Redis backend for the event store
//!
//! Implements the [`crate::store::EventStore`] capability against Redis:
//! string values for payloads and catalog entries, SETs for the per-tag
//! inverted indexes, a ZSET scored by timestamp for the time index, and a
//! Lua script for the atomic check-and-set that Redis has no native
//! command for.
//!
//! # Redis Schema
//!
//! ```text
//! ev:metrics                      → string (metric catalog)
//! ev:{metric}:tagkeys             → string (tag-key catalog)
//! ev:{metric}:tag:{key}:values    → string (observed-value catalog)
//! ev:{metric}:idx:{key}:{value}   → SET of event keys
//! ev:{metric}:index               → ZSET(timestamp → event key)
//! ev:{metric}:event:{event key}   → string (event JSON)
//! ```

pub mod connection;
pub mod scripts;
pub mod store;

pub use connection::{RedisConfig, RedisPool};
pub use scripts::LuaScripts;
pub use store::RedisStore;
