/// the application logic context: one place that owns the four providers.
///
/// Construct an `ApplicationLogic` at startup (or use the process-wide
/// `ApplicationLogic::current`), call `initialize` once the concrete providers
/// are known, then build a `RequestContext` per request.
///
use anyhow::Result;
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::caching::{CacheProvider, CacheProviderExt, MemoryCacheProvider};
use crate::config::Config;
use crate::data_access::DatabaseProvider;
use crate::error::Error;
use crate::session::{MemorySessionProvider, Session, SessionProvider, SessionProviderExt};
use crate::settings::SettingsProvider;

static CURRENT: OnceLock<ApplicationLogic> = OnceLock::new();

#[derive(Debug, Clone)]
struct Providers {
    session: Arc<dyn SessionProvider>,
    cache: Arc<dyn CacheProvider>,
    database: Option<Arc<dyn DatabaseProvider>>,
    settings: Option<Arc<dyn SettingsProvider>>,
}

#[derive(Debug, Default)]
pub struct ApplicationLogic {
    config: Config,
    providers: RwLock<Option<Providers>>,
}

impl ApplicationLogic {
    /// an uninitialized context with the default configuration
    pub fn new() -> ApplicationLogic {
        ApplicationLogic::with_config(Config::default())
    }

    /// an uninitialized context; `config` sizes the built-in providers
    pub fn with_config(config: Config) -> ApplicationLogic {
        ApplicationLogic {
            config,
            providers: RwLock::new(None),
        }
    }

    /// the process-wide instance
    pub fn current() -> &'static ApplicationLogic {
        CURRENT.get_or_init(ApplicationLogic::new)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Wire the providers. `None` for the session or cache provider selects the
    /// built-in in-memory implementation; database and settings are kept as given.
    /// Calling this again replaces all four.
    pub async fn initialize(
        &self,
        session: Option<Arc<dyn SessionProvider>>,
        cache: Option<Arc<dyn CacheProvider>>,
        database: Option<Arc<dyn DatabaseProvider>>,
        settings: Option<Arc<dyn SettingsProvider>>,
    ) -> Result<()> {
        let session: Arc<dyn SessionProvider> = match session {
            Some(provider) => provider,
            None => Arc::new(MemorySessionProvider::from_config(&self.config).await?),
        };

        let cache: Arc<dyn CacheProvider> = match cache {
            Some(provider) => provider,
            None => Arc::new(MemoryCacheProvider::from_config(&self.config).await?),
        };

        let providers = Providers {
            session,
            cache,
            database,
            settings,
        };

        info!("application logic initialized: {:?}", providers);

        let mut guard = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        if guard.replace(providers).is_some() {
            warn!("application logic re-initialized, previous providers replaced");
        }

        Ok(())
    }

    fn providers(&self, name: &'static str) -> Result<Providers, Error> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NotInitialized(name))
    }

    /// used for storing information in the user's session
    pub fn session_provider(&self) -> Result<Arc<dyn SessionProvider>, Error> {
        Ok(self.providers("session")?.session)
    }

    /// used for storing short-term information shared by all requests
    pub fn cache_provider(&self) -> Result<Arc<dyn CacheProvider>, Error> {
        Ok(self.providers("cache")?.cache)
    }

    /// used for accessing data in an external store; `None` when none was configured
    pub fn database_provider(&self) -> Result<Option<Arc<dyn DatabaseProvider>>, Error> {
        Ok(self.providers("database")?.database)
    }

    /// used for user and system settings; `None` when none was configured
    pub fn settings_provider(&self) -> Result<Option<Arc<dyn SettingsProvider>>, Error> {
        Ok(self.providers("settings")?.settings)
    }

    /// the providers a single request works with, bound to its session
    pub fn context(&self, session: Option<Session>) -> Result<RequestContext, Error> {
        let providers = self.providers("session")?;
        Ok(RequestContext::new(session, providers.session, providers.cache))
    }
}

/// What request-time code needs: the active session (if any) plus the session
/// and cache providers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    session: Option<Session>,
    session_provider: Arc<dyn SessionProvider>,
    cache_provider: Arc<dyn CacheProvider>,
}

impl RequestContext {
    pub fn new(
        session: Option<Session>,
        session_provider: Arc<dyn SessionProvider>,
        cache_provider: Arc<dyn CacheProvider>,
    ) -> RequestContext {
        RequestContext {
            session,
            session_provider,
            cache_provider,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_provider(&self) -> &Arc<dyn SessionProvider> {
        &self.session_provider
    }

    pub fn cache_provider(&self) -> &Arc<dyn CacheProvider> {
        &self.cache_provider
    }

    pub async fn session_get<T>(&self, id: &str) -> T
    where
        T: DeserializeOwned + Default + Send,
    {
        self.session_provider.get(self.session(), id).await
    }

    pub async fn session_set<T>(&self, id: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.session_provider.set(self.session(), id, value).await
    }

    pub async fn cache_get<T>(&self, id: &str) -> T
    where
        T: DeserializeOwned + Default + Send,
    {
        self.cache_provider.get(id).await
    }

    pub async fn cache_set<T>(&self, item: &T, id: &str) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.cache_provider.set(item, id).await
    }
}
