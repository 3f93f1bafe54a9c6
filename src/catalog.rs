//! Metric catalog
//!
//! Discovery surface over the registrations the event writer makes: which
//! metrics exist, and per metric which tag keys and tag values have been
//! observed. Entries grow monotonically and are never removed.
//!
//! Catalog entries are plain string values holding a comma-joined sorted
//! member list. The encoding is deliberately not a native store set: the
//! read-modify-write growth of these values is exactly what the atomic
//! mutator's check-and-set protects, so concurrent first-seen registrations
//! cannot lose entries. The catalog itself is read-only from the query
//! side; only the writer mutates it, and only through the mutator.

use crate::error::Result;
use crate::keys;
use crate::store::EventStore;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Separator inside catalog values. Member names are validated by the
/// writer to never contain it.
const SEPARATOR: char = ',';

/// Decode a catalog value into its member set
///
/// Absent values and empty strings decode to the empty set.
pub fn decode_members(value: Option<&str>) -> BTreeSet<String> {
    value
        .unwrap_or_default()
        .split(SEPARATOR)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encode a member set back into a catalog value
pub fn encode_members(members: &BTreeSet<String>) -> String {
    members
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Apply-closure body for registering one member via the atomic mutator
///
/// Returns the updated encoding, or `None` when the member is already
/// present and no write is needed.
pub fn add_member(current: Option<&str>, member: &str) -> Option<String> {
    let mut members = decode_members(current);
    if members.insert(member.to_string()) {
        Some(encode_members(&members))
    } else {
        None
    }
}

/// Read side of the catalog
pub struct MetricCatalog<S: EventStore + ?Sized> {
    store: Arc<S>,
}

impl<S: EventStore + ?Sized> MetricCatalog<S> {
    /// Create a catalog view over a store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All known metric names
    pub async fn metrics(&self) -> Result<BTreeSet<String>> {
        let value = self.store.get(&keys::metric_catalog_key()).await?;
        Ok(decode_members(value.as_deref()))
    }

    /// Known tag keys and their observed values for one metric
    ///
    /// Unknown metrics yield an empty map, not an error.
    pub async fn metric_tags(&self, metric: &str) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let tag_keys = self.store.get(&keys::tag_key_catalog_key(metric)).await?;

        let mut tags = BTreeMap::new();
        for tag_key in decode_members(tag_keys.as_deref()) {
            let values = self
                .store
                .get(&keys::tag_value_catalog_key(metric, &tag_key))
                .await?;
            tags.insert(tag_key, decode_members(values.as_deref()));
        }
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_codec_round_trip() {
        let members: BTreeSet<String> = ["turkey", "georgia", "azerbaijan"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let encoded = encode_members(&members);
        // Sorted, comma-joined
        assert_eq!(encoded, "azerbaijan,georgia,turkey");
        assert_eq!(decode_members(Some(&encoded)), members);
    }

    #[test]
    fn test_decode_absent_and_empty() {
        assert!(decode_members(None).is_empty());
        assert!(decode_members(Some("")).is_empty());
    }

    #[test]
    fn test_add_member_semantics() {
        assert_eq!(add_member(None, "georgia"), Some("georgia".to_string()));
        assert_eq!(
            add_member(Some("georgia"), "turkey"),
            Some("georgia,turkey".to_string())
        );
        // Already present: no write needed
        assert_eq!(add_member(Some("georgia,turkey"), "georgia"), None);
    }

    #[tokio::test]
    async fn test_unknown_metric_reads_empty() {
        let store = Arc::new(MemoryStore::new());
        let catalog = MetricCatalog::new(store);

        assert!(catalog.metrics().await.unwrap().is_empty());
        assert!(catalog.metric_tags("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_follow_catalog_keys() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(&keys::metric_catalog_key(), "pressure,temperature")
            .await
            .unwrap();
        store
            .set(&keys::tag_key_catalog_key("temperature"), "region,well")
            .await
            .unwrap();
        store
            .set(
                &keys::tag_value_catalog_key("temperature", "region"),
                "azerbaijan,georgia,turkey",
            )
            .await
            .unwrap();
        store
            .set(&keys::tag_value_catalog_key("temperature", "well"), "a3,e6")
            .await
            .unwrap();

        let catalog = MetricCatalog::new(store);
        let metrics = catalog.metrics().await.unwrap();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.contains("temperature"));

        let tags = catalog.metric_tags("temperature").await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["region"].len(), 3);
        assert!(tags["well"].contains("a3"));
    }
}
