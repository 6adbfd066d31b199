/// application configuration, read from a JSON file at startup
///
use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// the default cache policy: a 30 minute sliding expiration
pub const DEFAULT_CACHE_SLIDING_EXPIRATION_SECS: u64 = 30 * 60;

/// sessions idle for 20 minutes are abandoned
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 20 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// number of store workers behind the default cache provider
    pub cache_pool_size: usize,
    pub cache_sliding_expiration_secs: u64,
    /// number of store workers behind the default session provider
    pub session_pool_size: usize,
    pub session_timeout_secs: u64,
    /// one of off, error, warn, info, debug, trace
    pub log_level: String,
    /// initial system-wide settings
    pub system_settings: HashMap<String, String>,
    /// initial settings for every new user session
    pub user_settings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_pool_size: 2,
            cache_sliding_expiration_secs: DEFAULT_CACHE_SLIDING_EXPIRATION_SECS,
            session_pool_size: 1,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            log_level: "info".to_string(),
            system_settings: HashMap::new(),
            user_settings: HashMap::new(),
        }
    }
}

impl Config {
    /// read the config from a json file; missing fields take their defaults
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        Config::from_json(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(text)?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_sliding_expiration_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.session_ttl(), Duration::from_secs(1200));
        assert_eq!(config.log_level, "info");
        assert!(config.system_settings.is_empty());
    }

    #[test]
    fn partial_json() {
        let js = r#"{"cache_pool_size":4,"system_settings":{"Theme":"dark"}}"#;
        let config = Config::from_json(js).expect("should parse partial config");

        assert_eq!(config.cache_pool_size, 4);
        assert_eq!(config.session_pool_size, 1);
        assert_eq!(config.system_settings.get("Theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn read_file() {
        let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
        writeln!(file, r#"{{"session_timeout_secs":60,"log_level":"debug"}}"#)
            .expect("should write config");

        let config = Config::read(file.path()).expect("should read config file");
        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_file() {
        let result = Config::read("/no/such/dir/provider-config.json");
        assert!(result.is_err());
    }
}
