//! Key/value caching with explicit expiry.
//!
//! Callers go through [`Cache::get_or_load`], passing the key, an [`Expiry`]
//! policy and a loader that produces the value on a miss. The storage itself
//! sits behind [`CacheBackend`] so tests and alternative deployments can swap
//! it out; [`MemoryBackend`] is the in-process default.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;

use crate::error::Result;

/// How long a cached value stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    After(Duration),
}

/// Storage for cached values.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<Bytes>;
    fn set(&self, key: &str, value: Bytes, expiry: Expiry);
    fn remove(&self, key: &str) -> bool;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    /// None = never expires.
    deadline: Option<Instant>,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| now < deadline)
    }
}

/// In-process backend. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Entry>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let fresh = self
            .entries
            .get(key)
            .map(|entry| entry.is_fresh(now).then(|| entry.value.clone()))?;

        if fresh.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_fresh(now));
        }
        fresh
    }

    fn set(&self, key: &str, value: Bytes, expiry: Expiry) {
        // A deadline past what Instant can represent never arrives.
        let deadline = match expiry {
            Expiry::Never => None,
            Expiry::After(ttl) => Instant::now().checked_add(ttl),
        };
        self.entries
            .insert(key.to_string(), Entry { value, deadline });
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Returns the cached value for `key`, or runs `loader` and caches its output.
    /// Loader errors are returned as-is and nothing is cached.
    pub fn get_or_load<F>(&self, key: &str, expiry: Expiry, loader: F) -> Result<Bytes>
    where
        F: FnOnce() -> Result<Bytes>,
    {
        if let Some(value) = self.backend.get(key) {
            tracing::debug!(key, "Cache hit");
            return Ok(value);
        }

        let value = loader()?;
        self.backend.set(key, value.clone(), expiry);
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.backend.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    use crate::error::Error;

    #[test]
    fn test_loader_runs_once_without_expiry() {
        let cache = Cache::in_memory();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(Bytes::from_static(b"[1,2]"))
        };

        assert_eq!(cache.get_or_load("k", Expiry::Never, load).unwrap(), "[1,2]");
        assert_eq!(cache.get_or_load("k", Expiry::Never, load).unwrap(), "[1,2]");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_expired_entry_is_reloaded() {
        let cache = Cache::in_memory();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(Bytes::from(calls.get().to_string()))
        };

        let ttl = Expiry::After(Duration::ZERO);
        assert_eq!(cache.get_or_load("k", ttl, load).unwrap(), "1");
        assert_eq!(cache.get_or_load("k", ttl, load).unwrap(), "2");
    }

    #[test]
    fn test_loader_error_is_not_cached() {
        let cache = Cache::in_memory();
        let result = cache.get_or_load("k", Expiry::Never, || Err(Error::NotFound));
        assert!(matches!(result, Err(Error::NotFound)));

        let value = cache
            .get_or_load("k", Expiry::Never, || Ok(Bytes::from_static(b"ok")))
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[test]
    fn test_unrepresentable_deadline_never_expires() {
        let cache = Cache::in_memory();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(Bytes::from_static(b"v"))
        };

        let ttl = Expiry::After(Duration::MAX);
        cache.get_or_load("k", ttl, load).unwrap();
        cache.get_or_load("k", ttl, load).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let backend = MemoryBackend::new();
        backend.set("k", Bytes::from_static(b"v"), Expiry::After(Duration::ZERO));

        assert_eq!(backend.get("k"), None);
        assert!(!backend.remove("k"));
    }

    #[test]
    fn test_invalidate() {
        let cache = Cache::in_memory();
        cache
            .get_or_load("k", Expiry::Never, || Ok(Bytes::from_static(b"v1")))
            .unwrap();
        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));

        let value = cache
            .get_or_load("k", Expiry::Never, || Ok(Bytes::from_static(b"v2")))
            .unwrap();
        assert_eq!(value, "v2");
    }

    /// Backend stub that records writes, to check the policy handed through.
    #[derive(Default)]
    struct RecordingBackend {
        writes: Mutex<Vec<(String, Expiry)>>,
    }

    impl CacheBackend for RecordingBackend {
        fn get(&self, _key: &str) -> Option<Bytes> {
            None
        }

        fn set(&self, key: &str, _value: Bytes, expiry: Expiry) {
            self.writes.lock().unwrap().push((key.to_string(), expiry));
        }

        fn remove(&self, _key: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_expiry_policy_reaches_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let cache = Cache::new(backend.clone());
        let ttl = Expiry::After(Duration::from_secs(30));

        cache
            .get_or_load("public", ttl, || Ok(Bytes::from_static(b"[]")))
            .unwrap();

        assert_eq!(
            backend.writes.lock().unwrap().as_slice(),
            &[("public".to_string(), ttl)]
        );
    }
}
