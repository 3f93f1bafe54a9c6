//! Query engine
//!
//! Resolves a metric + time range + optional tag filter into matching
//! events. Clause candidate sets come from server-side unions of the tag
//! indexes; clause intersection and time bounding are plain set algebra on
//! the returned key sets. Payloads are only fetched for keys that survive
//! every set operation.

use crate::aggregate::{self, Reducer};
use crate::catalog::MetricCatalog;
use crate::error::{Error, Result};
use crate::filter::TagFilter;
use crate::keys;
use crate::store::EventStore;
use crate::types::{Event, Granularity, TimeRange};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Read side of the event store
pub struct QueryEngine<S: EventStore + ?Sized> {
    store: Arc<S>,
    catalog: MetricCatalog<S>,
}

impl<S: EventStore + ?Sized> QueryEngine<S> {
    /// Create a query engine over a store
    pub fn new(store: Arc<S>) -> Self {
        let catalog = MetricCatalog::new(Arc::clone(&store));
        Self { store, catalog }
    }

    /// All known metric names
    pub async fn get_metrics(&self) -> Result<BTreeSet<String>> {
        self.catalog.metrics().await
    }

    /// Known tag keys and observed values for one metric
    ///
    /// Unknown metrics yield an empty map, not an error.
    pub async fn get_metric_tags(
        &self,
        metric: &str,
    ) -> Result<BTreeMap<String, BTreeSet<String>>> {
        self.catalog.metric_tags(metric).await
    }

    /// Event keys for a metric whose timestamp lies in the range,
    /// inclusive on both ends
    ///
    /// Unknown metrics and empty ranges yield the empty set, not an error.
    pub async fn get_event_keys(
        &self,
        metric: &str,
        range: TimeRange,
    ) -> Result<BTreeSet<String>> {
        let members = self
            .store
            .sorted_range_by_score(&keys::time_index_key(metric), range.start, range.end)
            .await?;
        Ok(members.into_iter().collect())
    }

    /// Fetch a single event by its key
    ///
    /// This is an explicit single-entity lookup, so a missing key is
    /// [`Error::NotFound`].
    pub async fn retrieve_event(&self, metric: &str, event_key: &str) -> Result<Event> {
        let document = self
            .store
            .get(&keys::event_payload_key(metric, event_key))
            .await?
            .ok_or_else(|| Error::NotFound(format!("{}/{}", metric, event_key)))?;

        serde_json::from_str(&document).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Bulk-fetch events for a set of keys
    ///
    /// Keys whose payload is missing (a degraded write that has not been
    /// retried yet) are skipped with a warning rather than failing the
    /// whole query.
    pub async fn retrieve_events<I>(&self, metric: &str, event_keys: I) -> Result<Vec<Event>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let fetches: Vec<_> = event_keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref().to_string();
                async move {
                    let document = self
                        .store
                        .get(&keys::event_payload_key(metric, &key))
                        .await?;
                    Ok::<_, Error>((key, document))
                }
            })
            .collect();

        let mut events = Vec::new();
        for result in join_all(fetches).await {
            let (key, document) = result?;
            match document {
                Some(json) => {
                    let event: Event = serde_json::from_str(&json)
                        .map_err(|e| Error::Serialization(e.to_string()))?;
                    events.push(event);
                }
                None => warn!(metric, %key, "indexed event has no payload, skipping"),
            }
        }
        Ok(events)
    }

    /// Resolve a full query: tag filter, time bounds, optional aggregation
    ///
    /// The filter expression is parsed before any store access; a parse
    /// failure aborts with [`Error::MalformedFilter`] and no partial
    /// execution. Aggregation uses the average reducer.
    pub async fn get_events(
        &self,
        metric: &str,
        filter_expression: &str,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<Event>> {
        self.get_events_reduced(
            metric,
            filter_expression,
            range,
            granularity,
            Reducer::default(),
        )
        .await
    }

    /// [`Self::get_events`] with an explicit bucket reducer
    pub async fn get_events_reduced(
        &self,
        metric: &str,
        filter_expression: &str,
        range: TimeRange,
        granularity: Granularity,
        reducer: Reducer,
    ) -> Result<Vec<Event>> {
        let filter = TagFilter::parse(filter_expression)?;

        let in_range = self.get_event_keys(metric, range).await?;
        if in_range.is_empty() {
            return Ok(Vec::new());
        }

        let surviving: Vec<&String> = if filter.is_match_all() {
            in_range.iter().collect()
        } else {
            let filtered = self.filter_candidates(metric, &filter).await?;
            in_range.iter().filter(|k| filtered.contains(k.as_str())).collect()
        };

        debug!(
            metric,
            in_range = in_range.len(),
            surviving = surviving.len(),
            clauses = filter.clauses.len(),
            "query resolved"
        );

        let events = self.retrieve_events(metric, surviving).await?;
        Ok(aggregate::aggregate(events, granularity, reducer))
    }

    /// Evaluate the tag filter to a candidate key set: union within each
    /// clause (server-side), intersection across clauses (client-side)
    async fn filter_candidates(
        &self,
        metric: &str,
        filter: &TagFilter,
    ) -> Result<HashSet<String>> {
        let mut candidates: Option<HashSet<String>> = None;

        for clause in &filter.clauses {
            let index_keys: Vec<String> = clause
                .values
                .iter()
                .map(|value| keys::tag_index_key(metric, &clause.key, value))
                .collect();

            let clause_set = self.store.set_union(&index_keys).await?;

            candidates = Some(match candidates {
                None => clause_set,
                Some(current) => current
                    .into_iter()
                    .filter(|k| clause_set.contains(k))
                    .collect(),
            });

            // Intersection can only shrink; stop early once empty
            if candidates.as_ref().is_some_and(HashSet::is_empty) {
                break;
            }
        }

        Ok(candidates.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutator::RetryPolicy;
    use crate::store::MemoryStore;
    use crate::types::TagSet;
    use crate::writer::EventWriter;

    fn tags(pairs: &[(&str, &str)]) -> TagSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let writer = EventWriter::new(Arc::clone(&store), RetryPolicy::default());

        for (ts, region, well, value) in [
            (1_000, "georgia", "a3", 20.0),
            (2_000, "georgia", "a4", 21.0),
            (3_000, "turkey", "b4", 22.0),
            (4_000, "azerbaijan", "e6", 23.0),
            (5_000, "georgia", "e6", 24.0),
        ] {
            writer
                .write_event(
                    "temperature",
                    ts,
                    &tags(&[("region", region), ("well", well)]),
                    value.into(),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_event_keys_time_bounded() {
        let engine = QueryEngine::new(seeded_store().await);
        let range = TimeRange::new(2_000, 4_000).unwrap();

        let keys = engine.get_event_keys("temperature", range).await.unwrap();
        assert_eq!(keys.len(), 3);

        let all = engine
            .get_event_keys("temperature", TimeRange::new(0, 10_000).unwrap())
            .await
            .unwrap();
        assert_eq!(all.len(), 5);

        let none = engine
            .get_event_keys("temperature", TimeRange::new(6_000, 10_000).unwrap())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_metric_is_empty_not_error() {
        let engine = QueryEngine::new(Arc::new(MemoryStore::new()));
        let range = TimeRange::new(0, 1_000).unwrap();

        assert!(engine.get_metrics().await.unwrap().is_empty());
        assert!(engine.get_metric_tags("nope").await.unwrap().is_empty());
        assert!(engine.get_event_keys("nope", range).await.unwrap().is_empty());
        assert!(engine
            .get_events("nope", "", range, Granularity::None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_event_round_trip_and_not_found() {
        let store = seeded_store().await;
        let engine = QueryEngine::new(Arc::clone(&store));

        let key = keys::event_key(1_000, &tags(&[("region", "georgia"), ("well", "a3")]));
        let event = engine.retrieve_event("temperature", &key).await.unwrap();
        assert_eq!(event.timestamp, 1_000);
        assert_eq!(event.tags["region"], "georgia");
        assert_eq!(event.numeric_payload(), Some(20.0));

        let missing = engine.retrieve_event("temperature", "9:deadbeef").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_single_clause_filter() {
        let engine = QueryEngine::new(seeded_store().await);
        let range = TimeRange::new(0, 10_000).unwrap();

        let events = engine
            .get_events("temperature", "region=georgia", range, Granularity::None)
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.tags["region"] == "georgia"));
    }

    #[tokio::test]
    async fn test_multi_value_clauses_intersect() {
        let engine = QueryEngine::new(seeded_store().await);
        let range = TimeRange::new(0, 10_000).unwrap();

        // (region ∈ {georgia, turkey}) AND (well ∈ {a3, a4, b4})
        let events = engine
            .get_events(
                "temperature",
                "region=georgia,turkey well=a3,a4,b4",
                range,
                Granularity::None,
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 3);
        for event in &events {
            assert!(matches!(event.tags["region"].as_str(), "georgia" | "turkey"));
            assert!(matches!(event.tags["well"].as_str(), "a3" | "a4" | "b4"));
        }
    }

    #[tokio::test]
    async fn test_filter_and_time_bound_combine() {
        let engine = QueryEngine::new(seeded_store().await);

        // georgia events are at 1s, 2s, 5s; bound to [1500, 4500]
        let events = engine
            .get_events(
                "temperature",
                "region=georgia",
                TimeRange::new(1_500, 4_500).unwrap(),
                Granularity::None,
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 2_000);
    }

    #[tokio::test]
    async fn test_malformed_filter_rejected_before_execution() {
        let engine = QueryEngine::new(seeded_store().await);
        let result = engine
            .get_events(
                "temperature",
                "region",
                TimeRange::new(0, 10_000).unwrap(),
                Granularity::None,
            )
            .await;
        assert!(matches!(result, Err(Error::MalformedFilter(_))));
    }

    #[tokio::test]
    async fn test_aggregation_buckets_filtered_events() {
        let engine = QueryEngine::new(seeded_store().await);

        // All five events land in minute bucket 0
        let events = engine
            .get_events(
                "temperature",
                "region=georgia",
                TimeRange::new(0, 10_000).unwrap(),
                Granularity::Minute,
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 0);
        // Average of 20.0, 21.0, 24.0
        let avg = events[0].numeric_payload().unwrap();
        assert!((avg - 65.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_contradictory_clauses_yield_nothing() {
        let engine = QueryEngine::new(seeded_store().await);
        let events = engine
            .get_events(
                "temperature",
                "region=georgia region=turkey",
                TimeRange::new(0, 10_000).unwrap(),
                Granularity::None,
            )
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
