//! Bot configuration management.
//!
//! Configuration is stored at `~/.config/caravan-bot/config.json`, or
//! wherever `CARAVAN_CONFIG` points. A missing file means defaults; the
//! catalog path and both channel filters can be overridden from the
//! environment (including a `.env` file).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use caravan_core::view::grammar::MIN_MESSAGE_LIMIT;
use caravan_core::CaravanSettings;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Application name used for the config directory path
const APP_NAME: &str = "caravan-bot";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable naming an explicit config file
const CONFIG_PATH_VAR: &str = "CARAVAN_CONFIG";

const CATALOG_VAR: &str = "CARAVAN_CATALOG";
const CHANNEL_FILTER_VAR: &str = "CARAVAN_CHANNEL_FILTER";
const GROUP_FILTER_VAR: &str = "CARAVAN_GROUP_FILTER";

/// Only channels with "caravan" in their name are coordinated by default.
const DEFAULT_CHANNEL_FILTER: &str = ".*caravan.*";
const DEFAULT_GROUP_FILTER: &str = ".*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// JSON file of waypoint names, locations and aliases.
    pub catalog_path: Option<PathBuf>,
    pub channel_filter: String,
    pub group_filter: String,
    /// When set, logs are also written to a daily rolling file here.
    pub log_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub settings: CaravanSettings,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            channel_filter: DEFAULT_CHANNEL_FILTER.to_string(),
            group_filter: DEFAULT_GROUP_FILTER.to_string(),
            log_dir: None,
            settings: CaravanSettings::default(),
        }
    }
}

impl BotConfig {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Config file {} is not valid", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var(CATALOG_VAR) {
            self.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(pattern) = var(CHANNEL_FILTER_VAR) {
            self.channel_filter = pattern;
        }
        if let Some(pattern) = var(GROUP_FILTER_VAR) {
            self.group_filter = pattern;
        }
    }

    /// Settings handed to the core, with the message limit kept usable.
    pub fn caravan_settings(&self) -> CaravanSettings {
        let mut settings = self.settings.clone();
        if settings.message_limit < MIN_MESSAGE_LIMIT {
            warn!(
                configured = settings.message_limit,
                minimum = MIN_MESSAGE_LIMIT,
                "message_limit too small, raising it"
            );
            settings.message_limit = MIN_MESSAGE_LIMIT;
        }
        settings
    }
}

/// Which channels the bot coordinates.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    group: Regex,
    channel: Regex,
}

impl ChannelFilter {
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        Ok(Self {
            group: compile(&config.group_filter).context("Invalid group_filter")?,
            channel: compile(&config.channel_filter).context("Invalid channel_filter")?,
        })
    }

    pub fn matches(&self, group: &str, channel: &str) -> bool {
        self.group.is_match(group) && self.channel.is_match(channel)
    }
}

/// Patterns must match from the start of the name, case-insensitively.
fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(&format!("^(?:{})", pattern))
        .case_insensitive(true)
        .build()?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, BotConfig::default());
        assert_eq!(config.channel_filter, ".*caravan.*");
        assert_eq!(config.settings.message_limit, 2000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"catalog_path": "/srv/waypoints.json", "max_guests": 4, "retry": {"max_retries": 5}}"#,
        )
        .unwrap();

        let config = BotConfig::load_from(&path).unwrap();
        assert_eq!(config.catalog_path, Some(PathBuf::from("/srv/waypoints.json")));
        assert_eq!(config.settings.max_guests, 4);
        assert_eq!(config.settings.headcount_warning, 20);
        assert_eq!(config.settings.retry.max_retries, 5);
        assert_eq!(config.settings.retry.initial_backoff_ms, 1000);
        assert_eq!(config.group_filter, ".*");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(BotConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CARAVAN_CATALOG", "gyms.json"),
            ("CARAVAN_CHANNEL_FILTER", "raid-.*"),
        ]
        .into_iter()
        .collect();
        let mut config = BotConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.catalog_path, Some(PathBuf::from("gyms.json")));
        assert_eq!(config.channel_filter, "raid-.*");
        assert_eq!(config.group_filter, ".*");
    }

    #[test]
    fn test_message_limit_is_raised_to_minimum() {
        let mut config = BotConfig::default();
        config.settings.message_limit = 100;
        assert_eq!(config.caravan_settings().message_limit, MIN_MESSAGE_LIMIT);
    }

    #[test]
    fn test_channel_filter() {
        let filter = ChannelFilter::from_config(&BotConfig::default()).unwrap();
        assert!(filter.matches("Downtown", "morning-caravan"));
        assert!(filter.matches("Downtown", "CARAVAN"));
        assert!(!filter.matches("Downtown", "general"));

        let config = BotConfig {
            group_filter: "downtown".to_string(),
            ..BotConfig::default()
        };
        let filter = ChannelFilter::from_config(&config).unwrap();
        assert!(filter.matches("Downtown Walkers", "caravan"));
        assert!(!filter.matches("Uptown", "caravan"));
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = BotConfig {
            channel_filter: "(unclosed".to_string(),
            ..BotConfig::default()
        };
        assert!(ChannelFilter::from_config(&config).is_err());
    }
}
