//! Store key schema
//!
//! Pure functions mapping logical coordinates (metric, tag key/value,
//! timestamp) to store keys. No state, no side effects; every other
//! component goes through these.
//!
//! # Key Schema
//!
//! ```text
//! ev:metrics                      → string: catalog of metric names
//! ev:{metric}:tagkeys             → string: catalog of tag keys for metric
//! ev:{metric}:tag:{key}:values    → string: catalog of observed values
//! ev:{metric}:idx:{key}:{value}   → SET of event keys with that tag value
//! ev:{metric}:index               → ZSET(timestamp → event key)
//! ev:{metric}:event:{event key}   → string: event JSON document
//! ```
//!
//! Event keys are `{millis}:{digest}` where the digest is the CRC-64 of the
//! canonical sorted `k=v` tag string. The digest keeps events written at the
//! same instant with different tag sets distinct, while identical
//! (metric, timestamp, tags) writes land on the same key and overwrite.
//!
//! Injectivity rests on metric names and tag keys/values never containing
//! the reserved characters `:`, `,`, `=`, or whitespace; the writer enforces
//! this before anything reaches the store.

use crate::types::TagSet;
use crc::{Crc, CRC_64_ECMA_182};

const NAMESPACE: &str = "ev";

const EVENT_DIGEST: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Key of the global metric catalog
pub fn metric_catalog_key() -> String {
    format!("{}:metrics", NAMESPACE)
}

/// Key of the tag-key catalog for a metric
pub fn tag_key_catalog_key(metric: &str) -> String {
    format!("{}:{}:tagkeys", NAMESPACE, metric)
}

/// Key of the observed-value catalog for a (metric, tag key)
pub fn tag_value_catalog_key(metric: &str, tag_key: &str) -> String {
    format!("{}:{}:tag:{}:values", NAMESPACE, metric, tag_key)
}

/// Key of the inverted index set for a (metric, tag key, tag value)
pub fn tag_index_key(metric: &str, tag_key: &str, tag_value: &str) -> String {
    format!("{}:{}:idx:{}:{}", NAMESPACE, metric, tag_key, tag_value)
}

/// Key of the time-ordered index for a metric
pub fn time_index_key(metric: &str) -> String {
    format!("{}:{}:index", NAMESPACE, metric)
}

/// Event key for a (timestamp, tag set) pair, unique within a metric
///
/// Stable across processes and runs: the same inputs always produce the
/// same key, which is what makes re-writes idempotent.
pub fn event_key(timestamp: i64, tags: &TagSet) -> String {
    format!("{}:{:016x}", timestamp, tag_digest(tags))
}

/// Key under which an event's JSON document is stored
pub fn event_payload_key(metric: &str, event_key: &str) -> String {
    format!("{}:{}:event:{}", NAMESPACE, metric, event_key)
}

/// Parse the millisecond timestamp back out of an event key
pub fn event_key_timestamp(event_key: &str) -> Option<i64> {
    event_key.split(':').next()?.parse().ok()
}

/// CRC-64 digest of the canonical sorted `k=v` tag string
///
/// `TagSet` is a `BTreeMap`, so iteration order is already canonical.
fn tag_digest(tags: &TagSet) -> u64 {
    let mut digest = EVENT_DIGEST.digest();
    for (i, (key, value)) in tags.iter().enumerate() {
        if i > 0 {
            digest.update(b",");
        }
        digest.update(key.as_bytes());
        digest.update(b"=");
        digest.update(value.as_bytes());
    }
    digest.finalize()
}
