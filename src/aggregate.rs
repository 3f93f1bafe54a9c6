//! Bucketed aggregation of query results
//!
//! Groups events by truncating their timestamp to the granularity's bucket
//! boundary and combines each bucket with a [`Reducer`]. Every reducer is
//! commutative and associative over its bucket, so the result never
//! depends on retrieval order; `Last` is made order-insensitive by
//! tie-breaking on the total (timestamp, event key) order.

use crate::keys;
use crate::types::{Event, Granularity, TagSet};
use std::collections::BTreeMap;

/// How to combine the events that fall into one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    /// Arithmetic mean of numeric payloads (the default)
    #[default]
    Average,
    /// Sum of numeric payloads
    Sum,
    /// Minimum numeric payload
    Min,
    /// Maximum numeric payload
    Max,
    /// Number of events in the bucket
    Count,
    /// Payload of the greatest (timestamp, event key) event
    Last,
}

/// Aggregate events into one event per bucket
///
/// With `Granularity::None` the input is returned unchanged (sorted by
/// timestamp). Numeric reducers skip events whose payload is not a
/// number; a bucket with no numeric payloads falls back to the `Last`
/// event so data is never silently dropped.
///
/// Aggregated events carry the bucket start as their timestamp and an
/// empty tag set.
pub fn aggregate(mut events: Vec<Event>, granularity: Granularity, reducer: Reducer) -> Vec<Event> {
    if granularity == Granularity::None {
        events.sort_by_key(|e| e.timestamp);
        return events;
    }

    let mut buckets: BTreeMap<i64, Vec<Event>> = BTreeMap::new();
    for event in events {
        buckets
            .entry(granularity.truncate(event.timestamp))
            .or_default()
            .push(event);
    }

    buckets
        .into_iter()
        .map(|(bucket_start, members)| reduce_bucket(bucket_start, members, reducer))
        .collect()
}

fn reduce_bucket(bucket_start: i64, members: Vec<Event>, reducer: Reducer) -> Event {
    debug_assert!(!members.is_empty());
    let metric = members[0].metric.clone();

    let payload = match reducer {
        Reducer::Count => (members.len() as u64).into(),
        Reducer::Last => last_event(&members).payload.clone(),
        numeric => {
            let values: Vec<f64> = members.iter().filter_map(Event::numeric_payload).collect();
            if values.is_empty() {
                last_event(&members).payload.clone()
            } else {
                let reduced = match numeric {
                    Reducer::Average => values.iter().sum::<f64>() / values.len() as f64,
                    Reducer::Sum => values.iter().sum(),
                    Reducer::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
                    Reducer::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                    Reducer::Count | Reducer::Last => unreachable!(),
                };
                serde_json::Number::from_f64(reduced)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
    };

    Event::new(metric, bucket_start, TagSet::new(), payload)
}

/// The bucket member greatest in the total (timestamp, event key) order
fn last_event(members: &[Event]) -> &Event {
    members
        .iter()
        .max_by_key(|e| (e.timestamp, keys::event_key(e.timestamp, &e.tags)))
        .expect("bucket is never empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: i64, payload: serde_json::Value) -> Event {
        Event::new("temperature", timestamp, TagSet::new(), payload)
    }

    #[test]
    fn test_none_granularity_passes_through_sorted() {
        let events = vec![event(2000, 2.0.into()), event(1000, 1.0.into())];
        let out = aggregate(events, Granularity::None, Reducer::Average);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 1000);
        assert_eq!(out[1].timestamp, 2000);
    }

    #[test]
    fn test_minute_buckets_average() {
        // Three events in one minute, one in the next
        let events = vec![
            event(60_000, 1.0.into()),
            event(90_000, 2.0.into()),
            event(119_999, 3.0.into()),
            event(120_000, 10.0.into()),
        ];

        let out = aggregate(events, Granularity::Minute, Reducer::Average);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 60_000);
        assert_eq!(out[0].numeric_payload(), Some(2.0));
        assert_eq!(out[1].timestamp, 120_000);
        assert_eq!(out[1].numeric_payload(), Some(10.0));
        assert!(out[0].tags.is_empty());
    }

    #[test]
    fn test_average_is_order_insensitive() {
        let forward = vec![event(0, 1.0.into()), event(1, 2.0.into()), event(2, 6.0.into())];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregate(forward, Granularity::Hour, Reducer::Average);
        let b = aggregate(reversed, Granularity::Hour, Reducer::Average);
        assert_eq!(a, b);
        assert_eq!(a[0].numeric_payload(), Some(3.0));
    }

    #[test]
    fn test_sum_min_max_count() {
        let events = || vec![event(0, 1.0.into()), event(1, 5.0.into()), event(2, 3.0.into())];

        let sum = aggregate(events(), Granularity::Hour, Reducer::Sum);
        assert_eq!(sum[0].numeric_payload(), Some(9.0));

        let min = aggregate(events(), Granularity::Hour, Reducer::Min);
        assert_eq!(min[0].numeric_payload(), Some(1.0));

        let max = aggregate(events(), Granularity::Hour, Reducer::Max);
        assert_eq!(max[0].numeric_payload(), Some(5.0));

        let count = aggregate(events(), Granularity::Hour, Reducer::Count);
        assert_eq!(count[0].numeric_payload(), Some(3.0));
    }

    #[test]
    fn test_non_numeric_payloads_fall_back_to_last() {
        let events = vec![event(0, "cold".into()), event(5, "warm".into())];
        let out = aggregate(events, Granularity::Hour, Reducer::Average);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload, serde_json::Value::from("warm"));
    }

    #[test]
    fn test_mixed_payloads_average_numeric_only() {
        let events = vec![
            event(0, 2.0.into()),
            event(1, "offline".into()),
            event(2, 4.0.into()),
        ];
        let out = aggregate(events, Granularity::Hour, Reducer::Average);
        assert_eq!(out[0].numeric_payload(), Some(3.0));
    }

    #[test]
    fn test_buckets_ordered_by_time() {
        let events = vec![
            event(7_200_000, 1.0.into()),
            event(0, 2.0.into()),
            event(3_600_000, 3.0.into()),
        ];
        let out = aggregate(events, Granularity::Hour, Reducer::Average);
        let stamps: Vec<i64> = out.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![0, 3_600_000, 7_200_000]);
    }
}
