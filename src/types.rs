//! Core data types used throughout the event store
//!
//! # Key Types
//!
//! - **`Event`**: A single timestamped, tagged measurement under a metric
//! - **`TimeRange`**: Inclusive time window for queries (start, end)
//! - **`Granularity`**: Aggregation bucket size for query results
//!
//! # Example
//!
//! ```rust
//! use rill_tsdb::types::{Event, TimeRange, Granularity};
//! use std::collections::BTreeMap;
//!
//! let mut tags = BTreeMap::new();
//! tags.insert("region".to_string(), "georgia".to_string());
//!
//! let event = Event::new("temperature", 1_700_000_000_000, tags, 21.5.into());
//!
//! let range = TimeRange::new(1_700_000_000_000, 1_700_000_300_000).unwrap();
//! assert!(range.contains(event.timestamp));
//!
//! assert_eq!(Granularity::from_char(Some('h')), Granularity::Hour);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag set attached to an event: tag key to single value for that event.
///
/// A `BTreeMap` rather than a `HashMap` so iteration order is deterministic,
/// which the event-key digest and the JSON persisted form both rely on.
pub type TagSet = BTreeMap<String, String>;

/// A single stored event: the atomic unit of data
///
/// Identity is the (metric, timestamp, tags) triple; re-writing the same
/// triple overwrites the payload rather than creating a second event.
/// Events are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Owning metric name (e.g. "temperature")
    pub metric: String,

    /// Unix timestamp in milliseconds since epoch
    pub timestamp: i64,

    /// Tag key → value pairs used for filtering
    #[serde(default)]
    pub tags: TagSet,

    /// Opaque payload; numeric payloads participate in aggregation
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event
    pub fn new(
        metric: impl Into<String>,
        timestamp: i64,
        tags: TagSet,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            metric: metric.into(),
            timestamp,
            tags,
            payload,
        }
    }

    /// Payload as a float, if it is numeric
    pub fn numeric_payload(&self) -> Option<f64> {
        self.payload.as_f64()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.metric, self.timestamp, self.payload)
    }
}

/// Inclusive time window for range queries
///
/// Both bounds are in milliseconds since epoch and both are included:
/// a query over `[start, end]` returns events with
/// `start <= timestamp <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive), milliseconds since epoch
    pub start: i64,

    /// End timestamp (inclusive), milliseconds since epoch
    pub end: i64,
}

impl TimeRange {
    /// Create a validated time range
    ///
    /// Returns an error message if `start > end`.
    pub fn new(start: i64, end: i64) -> Result<Self, String> {
        if start > end {
            return Err(format!("Invalid time range: start {} > end {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// Whether a timestamp falls inside the range (inclusive on both ends)
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Aggregation bucket size for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Raw events, no aggregation
    None,
    /// One bucket per minute
    Minute,
    /// One bucket per hour
    Hour,
}

impl Granularity {
    /// Parse the wire-level granularity character: `'h'` hourly, `'m'`
    /// minutely, anything else (including absent) means raw events.
    pub fn from_char(c: Option<char>) -> Self {
        match c {
            Some('h') => Granularity::Hour,
            Some('m') => Granularity::Minute,
            _ => Granularity::None,
        }
    }

    /// Bucket width in milliseconds, if aggregating
    pub fn bucket_ms(&self) -> Option<i64> {
        match self {
            Granularity::None => None,
            Granularity::Minute => Some(60_000),
            Granularity::Hour => Some(3_600_000),
        }
    }

    /// Truncate a timestamp to its bucket boundary
    ///
    /// Returns the timestamp unchanged when not aggregating.
    pub fn truncate(&self, timestamp: i64) -> i64 {
        match self.bucket_ms() {
            Some(width) => timestamp - timestamp.rem_euclid(width),
            None => timestamp,
        }
    }
}
