/// cache helpers for data-access types.
///
/// A data-access type for entity `T` implements `DataAccess<T>` against its
/// real store and holds an `AccessCache<T>` for the cached List/Get paths.
/// Cache names derive from the entity's type name:
///
/// * list results: `<Type>ListCache` followed by the name and query identifier
/// * single results: `<Type>GetCustom<name><query identifier>Cache`
///
/// The name always precedes the query identifier, so a value written with
/// `(name, query)` is read back with the identifier `name + query`.
///
use anyhow::Result;
use async_trait::async_trait;
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::app::ApplicationLogic;
use crate::caching::{CacheProvider, CacheProviderExt};
use crate::error::Error;

/// Handle to the external data store. Data-access types downcast it to the
/// concrete connection they work with.
pub trait DatabaseProvider: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// The type's own name: module path and generic arguments are dropped.
/// `T` is expected to be a named type; for references, slices, arrays and
/// tuples the first named type inside is used.
pub fn cache_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let mut base = full.trim_start_matches(['&', '[', '(', '*', ' ']);
    for qualifier in ["mut ", "const ", "dyn "] {
        base = base.trim_start_matches(qualifier);
    }
    let base = base
        .split(['<', ',', ';', ')', ']'])
        .next()
        .unwrap_or(base)
        .trim();
    base.rsplit("::").next().unwrap_or(base)
}

pub fn list_cache_name<T: ?Sized>() -> String {
    format!("{}ListCache", cache_type_name::<T>())
}

pub fn get_cache_name<T: ?Sized>(query_identifier: &str) -> String {
    format!("{}GetCustom{}Cache", cache_type_name::<T>(), query_identifier)
}

pub struct AccessCache<T> {
    cache: Arc<dyn CacheProvider>,
    use_cache: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Debug for AccessCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCache")
            .field("entity", &cache_type_name::<T>())
            .field("use_cache", &self.use_cache)
            .finish()
    }
}

impl<T> Clone for AccessCache<T> {
    fn clone(&self) -> Self {
        AccessCache {
            cache: self.cache.clone(),
            use_cache: self.use_cache,
            _entity: PhantomData,
        }
    }
}

impl<T> AccessCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// use the application's cache provider; fails before initialization
    pub fn new(app: &ApplicationLogic, use_cache: bool) -> Result<AccessCache<T>, Error> {
        Ok(AccessCache::with_provider(app.cache_provider()?, use_cache))
    }

    pub fn with_provider(cache: Arc<dyn CacheProvider>, use_cache: bool) -> AccessCache<T> {
        AccessCache {
            cache,
            use_cache,
            _entity: PhantomData,
        }
    }

    /// with caching off every read misses and every write is skipped
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn list_cache_name(&self) -> String {
        list_cache_name::<T>()
    }

    pub fn get_cache_name(&self, query_identifier: &str) -> String {
        get_cache_name::<T>(query_identifier)
    }

    async fn read<V>(&self, id: String) -> Option<V>
    where
        V: DeserializeOwned + Send,
    {
        if !self.use_cache {
            return None;
        }

        let value: Option<V> = self.cache.get(&id).await;
        debug!("{} {}", if value.is_some() { "hit" } else { "miss" }, id);
        value
    }

    async fn write<V>(&self, value: &V, id: String) -> Result<()>
    where
        V: Serialize + Sync + ?Sized,
    {
        if !self.use_cache {
            return Ok(());
        }

        debug!("caching {}", id);
        self.cache.set(value, &id).await
    }

    pub async fn list_from_cache(&self) -> Option<Vec<T>> {
        self.read(self.list_cache_name()).await
    }

    pub async fn list_from_cache_by(&self, query_identifier: &str) -> Option<Vec<T>> {
        self.read(format!("{}{}", self.list_cache_name(), query_identifier))
            .await
    }

    pub async fn get_from_cache(&self, query_identifier: &str) -> Option<T> {
        self.read(self.get_cache_name(query_identifier)).await
    }

    pub async fn add_list_to_cache(&self, items: &[T], name: &str) -> Result<()> {
        self.write(items, format!("{}{}", self.list_cache_name(), name))
            .await
    }

    pub async fn add_list_to_cache_by(
        &self,
        items: &[T],
        name: &str,
        query_identifier: &str,
    ) -> Result<()> {
        let id = format!("{}{}{}", self.list_cache_name(), name, query_identifier);
        self.write(items, id).await
    }

    pub async fn add_get_to_cache(&self, item: &T, name: &str, query_identifier: &str) -> Result<()> {
        let id = self.get_cache_name(&format!("{}{}", name, query_identifier));
        self.write(item, id).await
    }

    /// forget a cached list, e.g. after a write to the underlying store
    pub async fn invalidate_list(&self, name: &str) -> Result<bool> {
        self.cache
            .remove(&format!("{}{}", self.list_cache_name(), name))
            .await
    }

    pub async fn invalidate_get(&self, query_identifier: &str) -> Result<bool> {
        self.cache.remove(&self.get_cache_name(query_identifier)).await
    }
}

/// Store operations for entity `T`. Failures come back as `Err` with the
/// underlying detail; `Ok(false)` means the store did nothing (e.g. no such row).
#[async_trait]
pub trait DataAccess<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn list(&self) -> Result<Vec<T>>;

    async fn get(&self, id: i64) -> Result<Option<T>>;

    async fn insert(&self, item: &T) -> Result<bool>;

    async fn update(&self, item: &T) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;

    fn access_cache(&self) -> &AccessCache<T>;

    /// the full list, from the cache when present, otherwise from the store
    async fn list_cached(&self) -> Result<Vec<T>> {
        let cache = self.access_cache();
        if let Some(items) = cache.list_from_cache().await {
            return Ok(items);
        }

        let items = self.list().await?;
        if let Err(e) = cache.add_list_to_cache(&items, "").await {
            warn!("could not cache {}: {}", cache.list_cache_name(), e);
        }
        Ok(items)
    }

    /// one item, from the cache when present, otherwise from the store
    async fn get_cached(&self, id: i64) -> Result<Option<T>> {
        let cache = self.access_cache();
        let query = id.to_string();
        if let Some(item) = cache.get_from_cache(&query).await {
            return Ok(Some(item));
        }

        let item = self.get(id).await?;
        if let Some(item) = item.as_ref() {
            if let Err(e) = cache.add_get_to_cache(item, "", &query).await {
                warn!("could not cache {}: {}", cache.get_cache_name(&query), e);
            }
        }
        Ok(item)
    }
}
