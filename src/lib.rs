#![doc = include_str!("../README.md")]

pub mod app;
pub mod caching;
pub mod config;
pub mod data_access;
pub mod error;
pub mod logging;
pub mod session;
pub mod settings;
pub mod store;
pub mod worker;

pub use app::{ApplicationLogic, RequestContext};
pub use caching::{CacheProvider, CacheProviderExt, MemoryCacheProvider};
pub use config::Config;
pub use data_access::{AccessCache, DataAccess, DatabaseProvider};
pub use error::Error;
pub use session::{MemorySessionProvider, Session, SessionProvider, SessionProviderExt};
pub use settings::{SettingsBase, SettingsList, SettingsProvider, StaticSettingsProvider};
pub use worker::JsonString;

/// the current app version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
