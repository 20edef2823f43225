// Settings configuration store
//
// Loads the typed settings snapshot from the SettingsStore and caches it.
// The cache lives for 12 hours and is invalidated by every settings write.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{BookingError, BookingResult};
use crate::metrics::PerformanceMetrics;
use crate::settings::{SettingsSnapshot, SettingsStore};

/// Time-to-live for the cached snapshot (12 hours)
const CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Default)]
struct ConfigCache {
    snapshot: Option<Arc<SettingsSnapshot>>,
    last_updated: Option<Instant>,
}

impl ConfigCache {
    fn is_stale(&self, ttl: Duration) -> bool {
        match (&self.snapshot, self.last_updated) {
            (Some(_), Some(last_update)) => last_update.elapsed() > ttl,
            _ => true,
        }
    }

    fn store(&mut self, snapshot: Arc<SettingsSnapshot>) {
        self.snapshot = Some(snapshot);
        self.last_updated = Some(Instant::now());
    }
}

/// Cached, validated view of the business settings
pub struct ConfigStore {
    store: Arc<dyn SettingsStore>,
    cache: Arc<RwLock<ConfigCache>>,
    cache_ttl: Duration,
    metrics: Option<Arc<PerformanceMetrics>>,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            cache: Arc::new(RwLock::new(ConfigCache::default())),
            cache_ttl: CACHE_TTL,
            metrics: None,
        }
    }

    /// Create a ConfigStore that reports cache hits and misses
    pub fn with_metrics(store: Arc<dyn SettingsStore>, metrics: Arc<PerformanceMetrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(store)
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn record_cache_hit(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_hit();
        }
    }

    fn record_cache_miss(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_miss();
        }
    }

    /// Current settings snapshot, reloaded when the cache is stale
    pub async fn snapshot(&self) -> BookingResult<Arc<SettingsSnapshot>> {
        // Fast path under the read lock
        {
            let cache = self.cache.read().await;
            if !cache.is_stale(self.cache_ttl) {
                if let Some(snapshot) = cache.snapshot.as_ref() {
                    self.record_cache_hit();
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        self.record_cache_miss();

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the write lock
        if !cache.is_stale(self.cache_ttl) {
            if let Some(snapshot) = cache.snapshot.as_ref() {
                return Ok(Arc::clone(snapshot));
            }
        }

        let values = self.store.all().await?;
        let snapshot = Arc::new(SettingsSnapshot::from_values(&values)?);
        cache.store(Arc::clone(&snapshot));
        debug!("Settings snapshot loaded ({} stored keys)", values.len());

        Ok(snapshot)
    }

    /// Raw stored value for `key`, bypassing the cache
    pub async fn get_setting(&self, key: &str) -> BookingResult<Option<serde_json::Value>> {
        self.store.get(key).await
    }

    /// Validate and write a setting, then invalidate the cache so the next
    /// read sees the new value.
    pub async fn update_setting(&self, key: &str, value: serde_json::Value) -> BookingResult<bool> {
        let mut values = self.store.all().await?;
        values.insert(key.to_string(), value.clone());
        if let Err(err) = SettingsSnapshot::from_values(&values) {
            let message = match err {
                BookingError::InvalidConfiguration(message) => message,
                other => return Err(other),
            };
            return Err(BookingError::field(key, message));
        }

        let changed = self.store.update(key, value).await?;
        self.invalidate_cache().await;
        info!("Setting '{}' updated (changed: {})", key, changed);

        Ok(changed)
    }

    /// Drop the cached snapshot
    pub async fn invalidate_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.snapshot = None;
        cache.last_updated = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemorySettingsStore;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_config_cache_is_stale() {
        let mut cache = ConfigCache::default();
        assert!(cache.is_stale(CACHE_TTL));

        cache.store(Arc::new(SettingsSnapshot::default()));
        assert!(!cache.is_stale(CACHE_TTL));
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_until_invalidated() {
        let store = Arc::new(MemorySettingsStore::default());
        let metrics = Arc::new(PerformanceMetrics::new());
        let config = ConfigStore::with_metrics(store.clone(), metrics.clone());

        let first = config.snapshot().await.unwrap();
        assert_eq!(first.pricing.default_rates.base_rate, dec!(20));

        // Written behind the config store's back: not visible until invalidation
        store.update("base_rate", json!(45)).await.unwrap();
        let cached = config.snapshot().await.unwrap();
        assert_eq!(cached.pricing.default_rates.base_rate, dec!(20));

        config.invalidate_cache().await;
        let fresh = config.snapshot().await.unwrap();
        assert_eq!(fresh.pricing.default_rates.base_rate, dec!(45));

        let summary = metrics.summary();
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.cache_misses, 2);
    }

    #[tokio::test]
    async fn test_update_setting_invalidates_cache() {
        let store = Arc::new(MemorySettingsStore::default());
        let config = ConfigStore::new(store);

        assert_eq!(config.snapshot().await.unwrap().pricing.tax_rate, dec!(21));

        let changed = config.update_setting("tax_rate", json!(6)).await.unwrap();
        assert!(changed);
        assert_eq!(config.snapshot().await.unwrap().pricing.tax_rate, dec!(6));
        assert_eq!(config.get_setting("tax_rate").await.unwrap(), Some(json!(6)));
    }

    #[tokio::test]
    async fn test_update_setting_rejects_invalid_value() {
        let store = Arc::new(MemorySettingsStore::default());
        let config = ConfigStore::new(store);

        let result = config.update_setting("tax_rate", json!(250)).await;
        match result {
            Err(BookingError::Validation { errors, .. }) => assert!(errors.contains_key("tax_rate")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(config.get_setting("tax_rate").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_ttl_reloads() {
        let store = Arc::new(MemorySettingsStore::default());
        let config = ConfigStore::new(store.clone()).with_ttl(Duration::ZERO);

        config.snapshot().await.unwrap();
        store.update("minimum_quote_value", json!(250)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let snapshot = config.snapshot().await.unwrap();
        assert_eq!(snapshot.pricing.minimum_quote_value, dec!(250));
    }
}
