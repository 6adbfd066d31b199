/// short-term, process-wide cache.
///
/// `CacheProvider` is the pluggable, object safe side: raw JSON strings in and
/// out. `CacheProviderExt` layers typed access on top of any provider, so
/// `cache.get::<Vec<String>>("key")` works on an `Arc<dyn CacheProvider>`.
///
use anyhow::Result;
use async_trait::async_trait;
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;

use crate::config::Config;
use crate::store::supervisor::Supervisor;
use crate::worker::{JsonString, WorkerStatus};

/// Storage for short-term information shared by every request.
#[async_trait]
pub trait CacheProvider: Send + Sync + Debug {
    /// Store `value` under `id`, replacing any existing entry.
    async fn set_raw(&self, id: &str, value: JsonString) -> Result<()>;

    /// The stored value, or `None` when absent or expired.
    async fn get_raw(&self, id: &str) -> Option<JsonString>;

    /// Drop the entry; answers whether one was present.
    async fn remove(&self, id: &str) -> Result<bool>;
}

/// Typed access for every [`CacheProvider`].
#[async_trait]
pub trait CacheProviderExt: CacheProvider {
    /// Serialize `item` and store it under `id`.
    async fn set<T>(&self, item: &T, id: &str) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let js = serde_json::to_string(item)?;
        self.set_raw(id, js).await
    }

    /// The value stored under `id`, or `T::default()` when it is missing or
    /// cannot be read back as a `T`.
    async fn get<T>(&self, id: &str) -> T
    where
        T: DeserializeOwned + Default + Send,
    {
        match self.get_raw(id).await {
            Some(js) => serde_json::from_str(&js).unwrap_or_else(|e| {
                warn!("cache entry {} is not the requested type: {}", id, e);
                T::default()
            }),
            None => T::default(),
        }
    }
}

#[async_trait]
impl<P: CacheProvider + ?Sized> CacheProviderExt for P {}

/// The built-in cache: a pool of in-memory store workers with a sliding expiration.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    store: Supervisor,
}

impl MemoryCacheProvider {
    pub async fn new(pool_size: usize, sliding_expiration: Duration) -> Result<MemoryCacheProvider> {
        let store = Supervisor::new(pool_size, sliding_expiration).await?;
        Ok(MemoryCacheProvider { store })
    }

    pub async fn from_config(config: &Config) -> Result<MemoryCacheProvider> {
        MemoryCacheProvider::new(config.cache_pool_size, config.cache_ttl()).await
    }

    pub fn sliding_expiration(&self) -> Duration {
        self.store.ttl
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.store.keys().await
    }

    /// drop expired entries now rather than on their next access
    pub async fn purge(&self) -> Result<usize> {
        self.store.purge().await
    }

    pub async fn status(&self) -> Vec<WorkerStatus> {
        self.store.status().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.store.shutdown().await
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn set_raw(&self, id: &str, value: JsonString) -> Result<()> {
        if self.store.set(id, value).await?.is_some() {
            debug!("cache entry {} replaced", id);
        }
        Ok(())
    }

    async fn get_raw(&self, id: &str) -> Option<JsonString> {
        match self.store.get(id).await {
            Ok(value) => value,
            Err(e) => {
                error!("cache get {} failed: {}", id, e);
                None
            }
        }
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.store.remove(id).await?.is_some())
    }
}
