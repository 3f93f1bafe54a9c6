//! rill-tsdb - Time-series event store over a remote key-value store
//!
//! Indexes timestamped, tagged events under named metrics and answers
//! range queries that filter by tag predicates, with optional hourly or
//! minutely aggregation. The store holds all authoritative state; the
//! core is a consistent, race-free indexing scheme built from primitive
//! key-value and sorted-set operations plus one atomic check-and-set
//! script.
//!
//! # Example
//!
//! ```rust
//! use rill_tsdb::{MemoryStore, Tsdb};
//! use rill_tsdb::types::TagSet;
//! use std::sync::Arc;
//!
//! # async fn example() -> rill_tsdb::Result<()> {
//! let tsdb = Tsdb::new(Arc::new(MemoryStore::new()));
//!
//! let mut tags = TagSet::new();
//! tags.insert("region".to_string(), "georgia".to_string());
//! tsdb.write_event("temperature", 1_700_000_000_000, &tags, 21.5.into())
//!     .await?;
//!
//! let events = tsdb
//!     .get_events(
//!         "temperature",
//!         "region=georgia,turkey",
//!         1_700_000_000_000 - 300_000,
//!         1_700_000_000_000,
//!         Some('h'),
//!     )
//!     .await?;
//! assert_eq!(events.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod keys;
pub mod mutator;
pub mod query;
pub mod service;
pub mod types;
pub mod writer;

/// Backing store capability contract and the in-memory implementation
pub mod store;

/// Redis backend: connection handling, Lua scripts, store implementation
pub mod redis;

// Re-export main types
pub use aggregate::Reducer;
pub use config::Config;
pub use error::{Error, Result, StoreError};
pub use filter::TagFilter;
pub use mutator::{AtomicMutator, RetryPolicy};
pub use service::Tsdb;
pub use store::{EventStore, MemoryStore};
pub use types::{Event, Granularity, TagSet, TimeRange};
