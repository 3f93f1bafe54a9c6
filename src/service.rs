//! Service facade
//!
//! [`Tsdb`] composes the event writer and the query engine over one shared
//! store handle and exposes the full service API. The facade is stateless
//! between calls: any number of concurrent readers and writers may share
//! one instance (or separate instances over the same store), coordinated
//! only through the backing store.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mutator::RetryPolicy;
use crate::query::QueryEngine;
use crate::redis::{RedisConfig, RedisStore};
use crate::store::EventStore;
use crate::types::{Event, Granularity, TagSet, TimeRange};
use crate::writer::EventWriter;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Time-series event store service
pub struct Tsdb<S: EventStore + ?Sized> {
    writer: EventWriter<S>,
    query: QueryEngine<S>,
}

impl<S: EventStore + ?Sized> Tsdb<S> {
    /// Create a service over a store with the default retry policy
    pub fn new(store: Arc<S>) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    /// Create a service with an explicit catalog retry policy
    pub fn with_retry_policy(store: Arc<S>, policy: RetryPolicy) -> Self {
        Self {
            writer: EventWriter::new(Arc::clone(&store), policy),
            query: QueryEngine::new(store),
        }
    }

    /// Persist one event and update all derived indexes
    ///
    /// Returns the event key. Re-writing the same (metric, timestamp,
    /// tags) overwrites the payload; a write that failed partway is safe
    /// to retry as-is.
    pub async fn write_event(
        &self,
        metric: &str,
        timestamp: i64,
        tags: &TagSet,
        payload: serde_json::Value,
    ) -> Result<String> {
        self.writer.write_event(metric, timestamp, tags, payload).await
    }

    /// All known metric names
    pub async fn get_metrics(&self) -> Result<BTreeSet<String>> {
        self.query.get_metrics().await
    }

    /// Known tag keys and observed values for one metric; empty for
    /// unknown metrics
    pub async fn get_metric_tags(
        &self,
        metric: &str,
    ) -> Result<BTreeMap<String, BTreeSet<String>>> {
        self.query.get_metric_tags(metric).await
    }

    /// Event keys with `start <= timestamp <= end`; empty for unknown
    /// metrics or empty ranges
    pub async fn get_event_keys(
        &self,
        metric: &str,
        start: i64,
        end: i64,
    ) -> Result<BTreeSet<String>> {
        self.query.get_event_keys(metric, range(start, end)?).await
    }

    /// Fetch a single event by key; [`Error::NotFound`] if absent
    pub async fn retrieve_event(&self, metric: &str, event_key: &str) -> Result<Event> {
        self.query.retrieve_event(metric, event_key).await
    }

    /// Resolve a tag-filtered, time-bounded query, optionally aggregated
    /// into hour (`'h'`) or minute (`'m'`) buckets
    pub async fn get_events(
        &self,
        metric: &str,
        filter_expression: &str,
        start: i64,
        end: i64,
        granularity: Option<char>,
    ) -> Result<Vec<Event>> {
        self.query
            .get_events(
                metric,
                filter_expression,
                range(start, end)?,
                Granularity::from_char(granularity),
            )
            .await
    }
}

impl Tsdb<RedisStore> {
    /// Connect to Redis per the configuration and return a ready service
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate().map_err(Error::Validation)?;
        let store = RedisStore::new(RedisConfig::from(&config.store)).await?;
        Ok(Self::with_retry_policy(
            Arc::new(store),
            config.retry_policy(),
        ))
    }
}

fn range(start: i64, end: i64) -> Result<TimeRange> {
    TimeRange::new(start, end).map_err(Error::Validation)
}
