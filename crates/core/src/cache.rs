//! Injectable cache provider.
//!
//! Two kinds of entries live here:
//! - content-addressed entries (reference lookups, Z-scores) whose key fully determines the value;
//!   they never need invalidation and are only bounded by capacity
//! - per-patient analytics (trends, velocity, projection, comparison), tagged `patient:<id>` and
//!   invalidated whenever that patient's measurements change
//!
//! Values are stored as `serde_json::Value` so the trait stays object-safe; [`get_or_compute`]
//! handles the typed round trip.
//!
//! Each tag also carries a generation that [`CacheProvider::invalidate`] bumps. Callers that
//! read the generation before loading their inputs and put it in the key never see a result
//! computed from data that changed while they were computing it.

use crate::{GrowthError, GrowthResult};
use growth_types::PatientId;
use moka::sync::Cache as MokaInner;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Lifetime and invalidation tags for one cache entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// `None` keeps the entry until capacity pressure evicts it.
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

impl CachePolicy {
    /// Policy for pure lookups keyed by their full input.
    pub fn immutable() -> Self {
        Self::default()
    }

    /// Policy for results derived from one patient's measurement history.
    pub fn patient(patient_id: &PatientId, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            tags: vec![patient_tag(patient_id)],
        }
    }
}

pub fn patient_tag(patient_id: &PatientId) -> String {
    format!("patient:{patient_id}")
}

pub trait CacheProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn put(&self, key: &str, value: serde_json::Value, policy: &CachePolicy);

    /// Drops every entry carrying any of `tags` and bumps their generations.
    fn invalidate(&self, tags: &[String]);

    /// Number of times `tag` has been invalidated.
    fn generation(&self, tag: &str) -> u64;
}

/// Returns the cached value for `key`, or computes, stores and returns it.
///
/// Errors from `compute` are returned as-is and never cached. An entry that no longer decodes as
/// `T` is treated as a miss.
pub fn get_or_compute<T, F>(
    cache: &dyn CacheProvider,
    key: &str,
    policy: &CachePolicy,
    compute: F,
) -> GrowthResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> GrowthResult<T>,
{
    if let Some(payload) = cache.get(key) {
        match serde_json::from_value::<T>(payload) {
            Ok(hit) => {
                tracing::trace!(key, "cache hit");
                return Ok(hit);
            }
            Err(e) => tracing::warn!(key, error = %e, "discarding undecodable cache entry"),
        }
    }

    tracing::trace!(key, "cache miss");
    let value = compute()?;
    let payload = serde_json::to_value(&value).map_err(GrowthError::Serialization)?;
    cache.put(key, payload, policy);
    Ok(value)
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: serde_json::Value,
    ttl: Option<Duration>,
    tags: Arc<[String]>,
}

struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Bounded in-memory cache with per-entry TTL and tag invalidation.
#[derive(Clone)]
pub struct MokaCache {
    inner: MokaInner<String, CacheEntry>,
    generations: Arc<RwLock<HashMap<String, u64>>>,
}

impl MokaCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: MokaInner::builder()
                .max_capacity(capacity)
                .expire_after(EntryExpiry)
                .build(),
            generations: Arc::default(),
        }
    }
}

impl CacheProvider for MokaCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.get(key).map(|entry| entry.value)
    }

    fn put(&self, key: &str, value: serde_json::Value, policy: &CachePolicy) {
        self.inner.insert(
            key.to_string(),
            CacheEntry {
                value,
                ttl: policy.ttl,
                tags: policy.tags.clone().into(),
            },
        );
    }

    fn invalidate(&self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        {
            let mut generations = self
                .generations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for tag in tags {
                *generations.entry(tag.clone()).or_default() += 1;
            }
        }
        let doomed: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(_, entry)| entry.tags.iter().any(|t| tags.contains(t)))
            .map(|(key, _)| key)
            .collect();
        tracing::debug!(?tags, entries = doomed.len(), "invalidating cache tags");
        for key in doomed {
            self.inner.invalidate(key.as_str());
        }
    }

    fn generation(&self, tag: &str) -> u64 {
        self.generations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .copied()
            .unwrap_or(0)
    }
}

/// Cache that stores nothing. Every lookup recomputes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

impl CacheProvider for NoopCache {
    fn get(&self, _key: &str) -> Option<serde_json::Value> {
        None
    }

    fn put(&self, _key: &str, _value: serde_json::Value, _policy: &CachePolicy) {}

    fn invalidate(&self, _tags: &[String]) {}

    fn generation(&self, _tag: &str) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn computes_once_then_hits() {
        let cache = MokaCache::new(100);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(42u32)
        };

        let first: u32 = get_or_compute(&cache, "k", &CachePolicy::immutable(), compute).unwrap();
        let second: u32 = get_or_compute(&cache, "k", &CachePolicy::immutable(), || {
            calls.set(calls.get() + 1);
            Ok(0u32)
        })
        .unwrap();

        assert_eq!((first, second), (42, 42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = MokaCache::new(100);
        let result: GrowthResult<u32> = get_or_compute(&cache, "k", &CachePolicy::immutable(), || {
            Err(GrowthError::InvalidInput("boom".into()))
        });
        assert!(result.is_err());
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn invalidate_drops_only_tagged_entries() {
        let cache = MokaCache::new(100);
        let a = PatientId::new();
        let b = PatientId::new();
        let ttl = Duration::from_secs(60);

        cache.put("trends:a", serde_json::json!(1), &CachePolicy::patient(&a, ttl));
        cache.put("trends:b", serde_json::json!(2), &CachePolicy::patient(&b, ttl));
        cache.put("z:1", serde_json::json!(3), &CachePolicy::immutable());

        cache.invalidate(&[patient_tag(&a)]);

        assert!(cache.get("trends:a").is_none());
        assert_eq!(cache.get("trends:b"), Some(serde_json::json!(2)));
        assert_eq!(cache.get("z:1"), Some(serde_json::json!(3)));
    }

    #[test]
    fn invalidate_bumps_tag_generation() {
        let cache = MokaCache::new(100);
        let a = patient_tag(&PatientId::new());
        let b = patient_tag(&PatientId::new());
        assert_eq!(cache.generation(&a), 0);

        cache.invalidate(&[a.clone()]);
        cache.invalidate(&[a.clone()]);

        assert_eq!(cache.generation(&a), 2);
        assert_eq!(cache.generation(&b), 0);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = MokaCache::new(100);
        let policy = CachePolicy {
            ttl: Some(Duration::from_millis(50)),
            tags: vec![],
        };
        cache.put("short", serde_json::json!("v"), &policy);
        std::thread::sleep(Duration::from_millis(150));
        assert!(cache.get("short").is_none());
    }

    #[test]
    fn none_results_are_cached_as_null() {
        let cache = MokaCache::new(100);
        let calls = Cell::new(0);
        for _ in 0..2 {
            let v: Option<u32> = get_or_compute(&cache, "n", &CachePolicy::immutable(), || {
                calls.set(calls.get() + 1);
                Ok(None)
            })
            .unwrap();
            assert!(v.is_none());
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn noop_cache_always_recomputes() {
        let calls = Cell::new(0);
        for _ in 0..3 {
            let _: u32 = get_or_compute(&NoopCache, "k", &CachePolicy::immutable(), || {
                calls.set(calls.get() + 1);
                Ok(1)
            })
            .unwrap();
        }
        assert_eq!(calls.get(), 3);
    }
}
