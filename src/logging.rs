/// log4rs setup for applications that use the providers
///
use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;
use std::str::FromStr;

use crate::config::Config;

pub const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l} {t} - {m}{n}";

/// parse the configured level; unknown names fall back to info
pub fn level_filter(config: &Config) -> LevelFilter {
    LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Info)
}

/// the console logging config built from the application config
pub fn log_config(config: &Config) -> Result<LogConfig> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level_filter(config)))?;

    Ok(log_config)
}

/// install a console logger; fails if a logger is already installed
pub fn init(config: &Config) -> Result<()> {
    log4rs::init_config(log_config(config)?)?;
    log::info!("logging started at level {}", level_filter(config));
    Ok(())
}

/// install the logger described by a log4rs yaml file
pub fn init_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    log4rs::init_file(path, Default::default())
        .with_context(|| format!("loading log config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        let mut config = Config::default();
        assert_eq!(level_filter(&config), LevelFilter::Info);

        config.log_level = "debug".to_string();
        assert_eq!(level_filter(&config), LevelFilter::Debug);

        config.log_level = "chatty".to_string();
        assert_eq!(level_filter(&config), LevelFilter::Info);
    }

    #[test]
    fn console_config() {
        let config = Config::default();
        let log_config = log_config(&config).expect("should build the log config");
        assert_eq!(log_config.root().level(), LevelFilter::Info);
        assert_eq!(log_config.appenders().len(), 1);
    }
}
