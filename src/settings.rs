/// key/value settings at two scopes.
///
/// System settings are shared by every user and live in the cache provider;
/// user settings belong to one session and live in the session provider. Both
/// are persisted as a `SettingsList`, an ordered list of `"key=value"` strings
/// stored under a single slot (`SystemSettings` or `UserSettings`).
///
/// Concrete providers implement `SettingsBase` (the two initialization hooks
/// plus `store_user_setting`) and get the full `SettingsProvider` for free.
/// Read-modify-write cycles are not synchronized, so two concurrent writers of
/// the same scope can lose one update.
///
use anyhow::Result;
use async_trait::async_trait;
use hashbrown::HashMap;
use log::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::app::RequestContext;
use crate::config::Config;

pub const SYSTEM_SETTINGS: &str = "SystemSettings";
pub const USER_SETTINGS: &str = "UserSettings";

/// Ordered `"key=value"` entries with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsList(Vec<String>);

impl SettingsList {
    pub fn new() -> SettingsList {
        SettingsList(vec![])
    }

    fn entry_key(entry: &str) -> &str {
        entry.split_once('=').map_or(entry, |(k, _)| k)
    }

    fn entry_value(entry: &str) -> &str {
        entry.split_once('=').map_or("", |(_, v)| v)
    }

    /// the value after the first `=` of the entry whose key is exactly `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| Self::entry_key(entry) == key)
            .map(|entry| Self::entry_value(entry))
    }

    /// replace any entry for `key` with `key=value`, appended at the end
    pub fn upsert(&mut self, key: &str, value: &str) {
        self.0.retain(|entry| Self::entry_key(entry) != key);
        self.0.push(format!("{}={}", key, value));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|entry| Self::entry_key(entry) != key);
        before != self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// the raw `key=value` entries in stored order
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|entry| (Self::entry_key(entry), Self::entry_value(entry)))
    }

    /// fold `initial` in: stored non-blank values win, blank or missing keys take
    /// the initial value
    fn merge_initial(&mut self, initial: &SettingsList) {
        for (key, value) in initial.iter() {
            if lookup_value(self, key).is_none() {
                self.upsert(key, value);
            }
        }
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for SettingsList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = SettingsList::new();
        for (key, value) in iter {
            list.upsert(key.as_ref(), value.as_ref());
        }
        list
    }
}

// a blank value counts as not set
fn lookup_value(list: &SettingsList, key: &str) -> Option<String> {
    list.get(key)
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    System,
    User,
}

impl Scope {
    fn slot(self) -> &'static str {
        match self {
            Scope::System => SYSTEM_SETTINGS,
            Scope::User => USER_SETTINGS,
        }
    }

    async fn load(self, ctx: &RequestContext) -> Option<SettingsList> {
        match self {
            Scope::System => ctx.cache_get(self.slot()).await,
            Scope::User => ctx.session_get(self.slot()).await,
        }
    }

    async fn store(self, ctx: &RequestContext, list: &SettingsList) -> Result<()> {
        match self {
            Scope::System => ctx.cache_set(list, self.slot()).await,
            Scope::User => ctx.session_set(self.slot(), list).await,
        }
    }

    // fold the hook's list into whatever is stored and write it back
    async fn initialize(self, ctx: &RequestContext, initial: SettingsList) -> Result<SettingsList> {
        let list = match self.load(ctx).await {
            Some(mut stored) => {
                stored.merge_initial(&initial);
                stored
            }
            None => initial,
        };

        info!("{} initialized with {} entries", self.slot(), list.len());
        self.store(ctx, &list).await?;
        Ok(list)
    }
}

/// The public settings surface.
#[async_trait]
pub trait SettingsProvider: Send + Sync + Debug {
    /// A user-specific setting, or an empty string when it has none.
    async fn get_user_setting(&self, ctx: &RequestContext, key: &str) -> Result<String>;

    async fn set_user_setting(&self, ctx: &RequestContext, key: &str, value: &str) -> Result<()>;

    /// A system-wide setting, or an empty string when it has none.
    async fn get_system_setting(&self, ctx: &RequestContext, key: &str) -> Result<String>;

    /// Set a system-wide setting, replacing any existing value for `key`.
    async fn set_system_setting(&self, ctx: &RequestContext, key: &str, value: &str)
        -> Result<()>;
}

/// The hooks a concrete settings provider supplies.
#[async_trait]
pub trait SettingsBase: Send + Sync + Debug {
    /// The initial system-wide settings.
    async fn init_global_settings(&self) -> Result<SettingsList>;

    /// The initial settings for the user behind `ctx`.
    async fn init_user_settings(&self, ctx: &RequestContext) -> Result<SettingsList>;

    /// Persist a user setting; backs `SettingsProvider::set_user_setting`.
    async fn store_user_setting(&self, ctx: &RequestContext, key: &str, value: &str)
        -> Result<()>;
}

#[async_trait]
impl<B: SettingsBase> SettingsProvider for B {
    async fn get_user_setting(&self, ctx: &RequestContext, key: &str) -> Result<String> {
        if let Some(list) = Scope::User.load(ctx).await {
            if let Some(value) = lookup_value(&list, key) {
                return Ok(value);
            }
        }

        debug!("user setting {} not found, initializing user settings", key);
        let initial = self.init_user_settings(ctx).await?;
        let list = Scope::User.initialize(ctx, initial).await?;

        Ok(lookup_value(&list, key).unwrap_or_default())
    }

    async fn set_user_setting(&self, ctx: &RequestContext, key: &str, value: &str) -> Result<()> {
        self.store_user_setting(ctx, key, value).await
    }

    async fn get_system_setting(&self, ctx: &RequestContext, key: &str) -> Result<String> {
        if let Some(list) = Scope::System.load(ctx).await {
            if let Some(value) = lookup_value(&list, key) {
                return Ok(value);
            }
        }

        debug!("system setting {} not found, initializing system settings", key);
        let initial = self.init_global_settings().await?;
        let list = Scope::System.initialize(ctx, initial).await?;

        Ok(lookup_value(&list, key).unwrap_or_default())
    }

    async fn set_system_setting(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut list = match Scope::System.load(ctx).await {
            Some(list) => list,
            None => self.init_global_settings().await?,
        };

        list.upsert(key, value);
        Scope::System.store(ctx, &list).await
    }
}

/// Upsert a user setting into the session; the usual body of
/// [`SettingsBase::store_user_setting`].
pub async fn write_user_setting<B>(
    base: &B,
    ctx: &RequestContext,
    key: &str,
    value: &str,
) -> Result<()>
where
    B: SettingsBase + ?Sized,
{
    let mut list = match Scope::User.load(ctx).await {
        Some(list) => list,
        None => base.init_user_settings(ctx).await?,
    };

    list.upsert(key, value);
    Scope::User.store(ctx, &list).await
}

/// Settings seeded from fixed maps, typically the `system_settings` and
/// `user_settings` sections of the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticSettingsProvider {
    system: HashMap<String, String>,
    user: HashMap<String, String>,
}

impl StaticSettingsProvider {
    pub fn new(system: HashMap<String, String>, user: HashMap<String, String>) -> Self {
        StaticSettingsProvider { system, user }
    }

    pub fn from_config(config: &Config) -> Self {
        StaticSettingsProvider::new(config.system_settings.clone(), config.user_settings.clone())
    }

    // sorted so the stored list does not depend on map iteration order
    fn to_list(map: &HashMap<String, String>) -> SettingsList {
        let mut pairs: Vec<(&String, &String)> = map.iter().collect();
        pairs.sort();
        pairs.into_iter().collect()
    }
}

#[async_trait]
impl SettingsBase for StaticSettingsProvider {
    async fn init_global_settings(&self) -> Result<SettingsList> {
        Ok(Self::to_list(&self.system))
    }

    async fn init_user_settings(&self, _ctx: &RequestContext) -> Result<SettingsList> {
        Ok(Self::to_list(&self.user))
    }

    async fn store_user_setting(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: &str,
    ) -> Result<()> {
        write_user_setting(self, ctx, key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_key_match() {
        let mut list: SettingsList = [("PageSize", "20"), ("Page", "3")].into_iter().collect();

        assert_eq!(list.get("Page"), Some("3"));
        assert_eq!(list.get("PageSize"), Some("20"));
        assert_eq!(list.get("Pa"), None);

        list.upsert("Page", "4");
        assert_eq!(list.get("PageSize"), Some("20"));
        assert_eq!(list.entries(), &["PageSize=20".to_string(), "Page=4".to_string()]);
    }

    #[test]
    fn value_after_first_equals() {
        let mut list = SettingsList::new();
        list.upsert("Filter", "name=ada");
        list.upsert("Empty", "");

        assert_eq!(list.get("Filter"), Some("name=ada"));
        assert_eq!(list.get("Empty"), Some(""));
        assert_eq!(lookup_value(&list, "Empty"), None);
    }

    #[test]
    fn upsert_replaces() {
        let mut list = SettingsList::new();
        list.upsert("Theme", "light");
        list.upsert("Theme", "dark");

        assert_eq!(list.len(), 1);
        assert_eq!(list.get("Theme"), Some("dark"));
        assert!(list.remove("Theme"));
        assert!(!list.remove("Theme"));
        assert!(list.is_empty());
    }

    #[test]
    fn merge_keeps_stored_values() {
        let mut stored: SettingsList = [("Theme", "dark"), ("Lang", " ")].into_iter().collect();
        let initial: SettingsList = [("Theme", "light"), ("Lang", "en"), ("Tz", "UTC")]
            .into_iter()
            .collect();

        stored.merge_initial(&initial);
        assert_eq!(stored.get("Theme"), Some("dark"));
        assert_eq!(stored.get("Lang"), Some("en"));
        assert_eq!(stored.get("Tz"), Some("UTC"));
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn serialized_form() {
        let list: SettingsList = [("a", "1"), ("b", "2")].into_iter().collect();
        let js = serde_json::to_string(&list).expect("should serialize");
        assert_eq!(js, r#"["a=1","b=2"]"#);
    }

    #[test]
    fn static_lists_are_sorted() {
        let mut system = HashMap::new();
        system.insert("b".to_string(), "2".to_string());
        system.insert("a".to_string(), "1".to_string());

        let list = StaticSettingsProvider::to_list(&system);
        assert_eq!(list.entries(), &["a=1".to_string(), "b=2".to_string()]);
    }
}
