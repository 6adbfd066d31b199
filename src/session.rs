/// per-user session state.
///
/// There is no ambient request context: the caller hands the active session to
/// every call, and `None` means "no session", in which case writes are dropped
/// and reads answer the default value.
///
use anyhow::Result;
use async_trait::async_trait;
use domain_keys::keys::RouteKey;
use hashbrown::HashMap;
use log::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::time::Duration;

use crate::config::Config;
use crate::store::supervisor::Supervisor;
use crate::worker::{JsonString, WorkerStatus};

/// Handle for one user session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    id: String,
}

impl Session {
    /// start a session with a fresh id
    pub fn new() -> Session {
        Session {
            id: RouteKey::create(),
        }
    }

    /// resume a session whose id came back from the client
    pub fn from_id(id: impl Into<String>) -> Session {
        Session { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Storage for values scoped to one user session.
#[async_trait]
pub trait SessionProvider: Send + Sync + Debug {
    /// Store `value` under `id`; a no-op without a session.
    async fn set_raw(&self, session: Option<&Session>, id: &str, value: JsonString) -> Result<()>;

    /// The stored value; `None` without a session or when unset.
    async fn get_raw(&self, session: Option<&Session>, id: &str) -> Option<JsonString>;
}

/// Typed access for every [`SessionProvider`].
#[async_trait]
pub trait SessionProviderExt: SessionProvider {
    async fn set<T>(&self, session: Option<&Session>, id: &str, value: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        if session.is_none() {
            return Ok(());
        }

        let js = serde_json::to_string(value)?;
        self.set_raw(session, id, js).await
    }

    async fn get<T>(&self, session: Option<&Session>, id: &str) -> T
    where
        T: DeserializeOwned + Default + Send,
    {
        match self.get_raw(session, id).await {
            Some(js) => serde_json::from_str(&js).unwrap_or_else(|e| {
                warn!("session entry {} is not the requested type: {}", id, e);
                T::default()
            }),
            None => T::default(),
        }
    }
}

#[async_trait]
impl<P: SessionProvider + ?Sized> SessionProviderExt for P {}

/// The values of one session, stored as a single store entry.
type SessionData = HashMap<String, JsonString>;

/// The built-in session store. Each session is one store entry keyed by the
/// exact session id, so every read or write in the session refreshes its
/// timeout and the whole session expires together after the timeout of
/// inactivity. Writes within one session are read-modify-write and are not
/// synchronized across concurrent requests of that session.
#[derive(Debug, Clone)]
pub struct MemorySessionProvider {
    store: Supervisor,
}

impl MemorySessionProvider {
    pub async fn new(pool_size: usize, timeout: Duration) -> Result<MemorySessionProvider> {
        let store = Supervisor::new(pool_size, timeout).await?;
        Ok(MemorySessionProvider { store })
    }

    pub async fn from_config(config: &Config) -> Result<MemorySessionProvider> {
        MemorySessionProvider::new(config.session_pool_size, config.session_ttl()).await
    }

    async fn load(&self, session: &Session) -> Result<SessionData> {
        match self.store.get(session.id()).await? {
            Some(js) => Ok(serde_json::from_str(&js)?),
            None => Ok(SessionData::new()),
        }
    }

    /// drop the session and all of its values; returns the number of values removed
    pub async fn abandon(&self, session: &Session) -> Result<usize> {
        let removed = match self.store.remove(session.id()).await? {
            Some(js) => serde_json::from_str::<SessionData>(&js)?.len(),
            None => 0,
        };

        info!("session {} abandoned, {} entries removed", session, removed);
        Ok(removed)
    }

    /// the number of live sessions
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

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
impl SessionProvider for MemorySessionProvider {
    async fn set_raw(&self, session: Option<&Session>, id: &str, value: JsonString) -> Result<()> {
        let Some(session) = session else {
            debug!("no active session, dropping {}", id);
            return Ok(());
        };

        let mut data = self.load(session).await?;
        data.insert(id.to_string(), value);
        self.store
            .set(session.id(), serde_json::to_string(&data)?)
            .await?;
        Ok(())
    }

    async fn get_raw(&self, session: Option<&Session>, id: &str) -> Option<JsonString> {
        let session = session?;

        match self.load(session).await {
            Ok(mut data) => data.remove(id),
            Err(e) => {
                error!("session get {} failed: {}", id, e);
                None
            }
        }
    }
}
