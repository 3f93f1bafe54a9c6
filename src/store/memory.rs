//! In-memory backing store
//!
//! Implements the full [`EventStore`] contract against process-local maps.
//! Used as the fake store for unit-testing the check-and-set machinery and
//! as the backend for the integration suite; also handy for local
//! development without a Redis instance.
//!
//! Every operation takes the store lock once, so each call is atomic
//! exactly like the corresponding single store command would be.

use super::EventStore;
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// One keyed entry; the store is typed per key like Redis is
#[derive(Debug, Clone)]
enum Entry {
    Value(String),
    Set(HashSet<String>),
    Sorted(HashMap<String, i64>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Value(_) => "string",
            Entry::Set(_) => "set",
            Entry::Sorted(_) => "sorted set",
        }
    }
}

/// In-process [`EventStore`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn wrong_kind(key: &str, want: &str, got: &str) -> StoreError {
        StoreError::Response(format!("key '{}' holds a {}, expected {}", key, got, want))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entries.read().get(key) {
            None => Ok(None),
            Some(Entry::Value(v)) => Ok(Some(v.clone())),
            Some(other) => Err(Self::wrong_kind(key, "string", other.kind())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), Entry::Value(value.to_string()));
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(HashSet::new()))
        {
            Entry::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            other => Err(Self::wrong_kind(key, "set", other.kind())),
        }
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        match self.entries.read().get(key) {
            None => Ok(HashSet::new()),
            Some(Entry::Set(set)) => Ok(set.clone()),
            Some(other) => Err(Self::wrong_kind(key, "set", other.kind())),
        }
    }

    async fn set_union(&self, keys: &[String]) -> Result<HashSet<String>, StoreError> {
        let entries = self.entries.read();
        let mut union = HashSet::new();
        for key in keys {
            match entries.get(key.as_str()) {
                None => {}
                Some(Entry::Set(set)) => union.extend(set.iter().cloned()),
                Some(other) => return Err(Self::wrong_kind(key, "set", other.kind())),
            }
        }
        Ok(union)
    }

    async fn sorted_add(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Sorted(HashMap::new()))
        {
            Entry::Sorted(scored) => {
                scored.insert(member.to_string(), score);
                Ok(())
            }
            other => Err(Self::wrong_kind(key, "sorted set", other.kind())),
        }
    }

    async fn sorted_range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
    ) -> Result<Vec<String>, StoreError> {
        match self.entries.read().get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Sorted(scored)) => {
                let mut hits: Vec<(i64, String)> = scored
                    .iter()
                    .filter(|(_, score)| **score >= min && **score <= max)
                    .map(|(member, score)| (*score, member.clone()))
                    .collect();
                hits.sort();
                Ok(hits.into_iter().map(|(_, member)| member).collect())
            }
            Some(other) => Err(Self::wrong_kind(key, "sorted set", other.kind())),
        }
    }

    async fn check_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        let current = match entries.get(key) {
            None => None,
            Some(Entry::Value(v)) => Some(v.as_str()),
            Some(other) => return Err(Self::wrong_kind(key, "string", other.kind())),
        };

        if current == expected {
            entries.insert(key.to_string(), Entry::Value(new.to_string()));
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v1".to_string()));

        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_set_semantics_dedupe() {
        let store = MemoryStore::new();
        store.set_add("s", "a").await.unwrap();
        store.set_add("s", "a").await.unwrap();
        store.set_add("s", "b").await.unwrap();

        let members = store.set_members("s").await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_set_union_skips_absent_keys() {
        let store = MemoryStore::new();
        store.set_add("a", "1").await.unwrap();
        store.set_add("b", "2").await.unwrap();

        let union = store
            .set_union(&["a".to_string(), "b".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(union.len(), 2);
    }

    #[tokio::test]
    async fn test_sorted_range_inclusive_and_ordered() {
        let store = MemoryStore::new();
        store.sorted_add("z", 30, "c").await.unwrap();
        store.sorted_add("z", 10, "a").await.unwrap();
        store.sorted_add("z", 20, "b").await.unwrap();

        let range = store.sorted_range_by_score("z", 10, 20).await.unwrap();
        assert_eq!(range, vec!["a".to_string(), "b".to_string()]);

        let all = store.sorted_range_by_score("z", i64::MIN, i64::MAX).await.unwrap();
        assert_eq!(all.len(), 3);

        let none = store.sorted_range_by_score("z", 31, 40).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_sorted_add_updates_score() {
        let store = MemoryStore::new();
        store.sorted_add("z", 10, "a").await.unwrap();
        store.sorted_add("z", 50, "a").await.unwrap();

        assert!(store.sorted_range_by_score("z", 0, 20).await.unwrap().is_empty());
        assert_eq!(
            store.sorted_range_by_score("z", 40, 60).await.unwrap(),
            vec!["a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_check_and_set_absent_key() {
        let store = MemoryStore::new();
        assert!(store.check_and_set("k", None, "v1").await.unwrap());
        // Second create-if-absent must fail now that the key exists
        assert!(!store.check_and_set("k", None, "v2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn test_check_and_set_mismatch_has_no_effect() {
        let store = MemoryStore::new();
        store.set("k", "v1").await.unwrap();

        assert!(!store.check_and_set("k", Some("stale"), "v2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("v1".to_string()));

        assert!(store.check_and_set("k", Some("v1"), "v2").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let store = MemoryStore::new();
        store.set_add("s", "a").await.unwrap();
        assert!(store.get("s").await.is_err());
        assert!(store.check_and_set("s", None, "v").await.is_err());
    }
}
