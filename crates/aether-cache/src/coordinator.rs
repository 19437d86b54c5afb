//! Per-module caching and page cache time negotiation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aether_core::ModuleSpec;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{CacheBackend, CacheError, CacheResult, CacheStatus};
use crate::key::{CacheKey, CacheKeyBuilder};

/// Page-level cache time.
///
/// Starts from the rule's cache time and only ever decreases: every cacheable
/// module folds its TTL in with `min`, and an uncacheable module forces 0.
/// `None` means no page cache time was configured or negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageCacheTime(Option<u64>);

impl PageCacheTime {
    /// Start from the rule's cache time.
    pub fn new(initial: Option<u64>) -> Self {
        Self(initial)
    }

    /// Fold a module TTL in.
    pub fn fold(&mut self, ttl: u64) {
        self.0 = Some(self.0.map_or(ttl, |current| current.min(ttl)));
    }

    /// Force the page to be uncacheable.
    pub fn mark_uncacheable(&mut self) {
        self.0 = Some(0);
    }

    pub fn get(&self) -> Option<u64> {
        self.0
    }

    /// Value for `Cache-Control`, only for a positive time.
    pub fn cache_control(&self) -> Option<String> {
        self.0
            .filter(|seconds| *seconds > 0)
            .map(|seconds| format!("s-maxage={}", seconds))
    }
}

/// Reads and writes module output through the cache backend.
///
/// Backend failures are logged and treated as misses; they never reach the
/// caller.
#[derive(Clone)]
pub struct CacheCoordinator {
    backend: Option<Arc<dyn CacheBackend>>,
    namespace: String,
    cache_name: String,
    timeout: Option<Duration>,
}

impl CacheCoordinator {
    /// Create a coordinator for one page.
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        namespace: impl Into<String>,
        cache_name: impl Into<String>,
    ) -> Self {
        Self {
            backend: Some(backend),
            namespace: namespace.into(),
            cache_name: cache_name.into(),
            timeout: None,
        }
    }

    /// A coordinator with caching turned off.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            namespace: String::new(),
            cache_name: String::new(),
            timeout: None,
        }
    }

    /// Bound every backend call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Cache key of a module on this page.
    pub fn key_for(&self, spec: &ModuleSpec) -> CacheKey {
        CacheKeyBuilder::new(self.namespace.as_str(), self.cache_name.as_str())
            .spec(spec)
            .build()
    }

    /// Settle a module's TTL and fold it into the page cache time.
    ///
    /// The TTL the module declares wins over the one configured on its spec.
    /// A module with neither, or with 0, is uncacheable and forces the page
    /// cache time to 0. Does nothing when caching is disabled.
    pub fn preload(
        &self,
        spec: &mut ModuleSpec,
        declared: Option<u64>,
        page: &mut PageCacheTime,
    ) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }

        match declared.or(spec.cache).filter(|ttl| *ttl > 0) {
            Some(ttl) => {
                spec.cache = Some(ttl);
                page.fold(ttl);
                Some(ttl)
            }
            None => {
                spec.cache = None;
                page.mark_uncacheable();
                None
            }
        }
    }

    /// Return the cached output of a module, or run it and cache the result.
    ///
    /// Errors from `run` are returned as-is and nothing is written.
    pub async fn load_or_run<T, E, F, Fut>(
        &self,
        spec: &ModuleSpec,
        page: &mut PageCacheTime,
        run: F,
    ) -> Result<(T, CacheStatus), E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl = match (self.is_enabled(), spec.cache.filter(|ttl| *ttl > 0)) {
            (true, Some(ttl)) => ttl,
            (enabled, _) => {
                if enabled {
                    page.mark_uncacheable();
                }
                return Ok((run().await?, CacheStatus::Bypass));
            }
        };

        let key = self.key_for(spec);
        let status = match self.read(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(output) => {
                    tracing::debug!(module = %spec.name, key = %key, "module cache hit");
                    return Ok((output, CacheStatus::Hit));
                }
                Err(e) => {
                    tracing::warn!(module = %spec.name, key = %key, error = %e, "undecodable cache entry, treating as miss");
                    CacheStatus::Miss
                }
            },
            Ok(None) => CacheStatus::Miss,
            Err(e) => {
                tracing::warn!(module = %spec.name, key = %key, error = %e, "cache read failed, treating as miss");
                CacheStatus::Error
            }
        };

        let output = run().await?;

        match serde_json::to_string(&output) {
            Ok(raw) => {
                if let Err(e) = self.write(key.as_str(), raw, Duration::from_secs(ttl)).await {
                    tracing::warn!(module = %spec.name, key = %key, error = %e, "cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(module = %spec.name, error = %e, "module output is not cacheable");
            }
        }

        Ok((output, status))
    }

    async fn read(&self, key: &str) -> CacheResult<Option<String>> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, backend.get(key))
                .await
                .map_err(|_| CacheError::Timeout)?,
            None => backend.get(key).await,
        }
    }

    async fn write(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, backend.set(key, value, ttl))
                .await
                .map_err(|_| CacheError::Timeout)?,
            None => backend.set(key, value, ttl).await,
        }
    }
}

impl std::fmt::Debug for CacheCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoordinator")
            .field("enabled", &self.is_enabled())
            .field("namespace", &self.namespace)
            .field("cache_name", &self.cache_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
