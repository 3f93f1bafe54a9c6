//! Event writer
//!
//! Persists one event and brings every derived index up to date: the
//! payload document, the per-tag inverted indexes, the time-ordered index,
//! and the catalogs.
//!
//! Ordering: the payload write completes before any index update starts,
//! so an event key never appears in an index while its payload is
//! unreadable. A failure partway through leaves the event either payload-
//! present-but-partially-indexed or (never) indexed-without-payload; both
//! heal on a retry of the same write, because every step is idempotent
//! under the deterministic event key.

use crate::catalog;
use crate::error::{Error, Result};
use crate::keys;
use crate::mutator::{AtomicMutator, RetryPolicy};
use crate::store::EventStore;
use crate::types::{Event, TagSet};
use std::sync::Arc;
use tracing::debug;

/// Characters that may not appear in metric names, tag keys, or tag
/// values: they are key/catalog/filter-grammar separators.
const RESERVED: [char; 3] = [':', ',', '='];

/// Writes events and maintains the derived indexes
pub struct EventWriter<S: EventStore + ?Sized> {
    store: Arc<S>,
    retry_policy: RetryPolicy,
}

impl<S: EventStore + ?Sized> EventWriter<S> {
    /// Create a writer with the given catalog retry policy
    pub fn new(store: Arc<S>, retry_policy: RetryPolicy) -> Self {
        Self {
            store,
            retry_policy,
        }
    }

    /// Persist one event and update all derived indexes
    ///
    /// Re-writing the same (metric, timestamp, tags) overwrites the stored
    /// payload; this is accepted last-write-wins semantics, not an error.
    /// Returns the event key the event is stored and indexed under.
    pub async fn write_event(
        &self,
        metric: &str,
        timestamp: i64,
        tags: &TagSet,
        payload: serde_json::Value,
    ) -> Result<String> {
        validate_name("metric", metric)?;
        for (key, value) in tags {
            validate_name("tag key", key)?;
            validate_name("tag value", value)?;
        }

        let event_key = keys::event_key(timestamp, tags);

        // Payload first: the event must be retrievable before any index
        // can make it visible.
        let event = Event::new(metric, timestamp, tags.clone(), payload);
        let document =
            serde_json::to_string(&event).map_err(|e| Error::Serialization(e.to_string()))?;
        self.store
            .set(&keys::event_payload_key(metric, &event_key), &document)
            .await?;

        // Time index, scored by the millisecond timestamp
        self.store
            .sorted_add(&keys::time_index_key(metric), timestamp, &event_key)
            .await?;

        // Per-tag inverted indexes plus first-seen catalog registration
        let mutator = AtomicMutator::new(self.store.as_ref(), self.retry_policy.clone());
        for (tag_key, tag_value) in tags {
            self.store
                .set_add(&keys::tag_index_key(metric, tag_key, tag_value), &event_key)
                .await?;

            mutator
                .update(&keys::tag_key_catalog_key(metric), |current| {
                    catalog::add_member(current, tag_key)
                })
                .await?;
            mutator
                .update(&keys::tag_value_catalog_key(metric, tag_key), |current| {
                    catalog::add_member(current, tag_value)
                })
                .await?;
        }

        // Metric registration in the global catalog
        mutator
            .update(&keys::metric_catalog_key(), |current| {
                catalog::add_member(current, metric)
            })
            .await?;

        debug!(metric, %event_key, tag_count = tags.len(), "event written");
        Ok(event_key)
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", kind)));
    }
    if name.contains(|c: char| RESERVED.contains(&c) || c.is_whitespace()) {
        return Err(Error::Validation(format!(
            "{} '{}' contains a reserved character (':', ',', '=', or whitespace)",
            kind, name
        )));
    }
    Ok(())
}
