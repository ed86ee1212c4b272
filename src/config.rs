use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("couldn't find a home directory")]
    NoHomeDir,

    #[error("couldn't read config file: {0}")]
    Read(std::io::Error),

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("couldn't write config file: {0}")]
    Write(std::io::Error),
}

/// Text and icon of the persistent foreground notification.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ForegroundNotification {
    pub title: String,
    pub message: String,
    pub icon: String,
}

impl Default for ForegroundNotification {
    fn default() -> Self {
        Self {
            title: "Background service is running".to_string(),
            message: "Background service is running".to_string(),
            icon: "@mipmap/ic_launcher".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub notification: ForegroundNotification,
    #[serde(default = "ServiceConfig::default_location_channel")]
    pub location_channel: Channel,
    #[serde(default = "ServiceConfig::default_alarm_channel")]
    pub alarm_channel: Channel,
    /// used for alarm notifications that don't name an icon
    #[serde(default = "ServiceConfig::default_alarm_icon")]
    pub alarm_icon: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            notification: ForegroundNotification::default(),
            location_channel: Self::default_location_channel(),
            alarm_channel: Self::default_alarm_channel(),
            alarm_icon: Self::default_alarm_icon(),
        }
    }
}

pub(crate) fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
    directories::ProjectDirs::from("", "", "background_location").ok_or(ConfigError::NoHomeDir)
}

impl ServiceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn default_location_channel() -> Channel {
        Channel {
            id: "channel_01".to_string(),
            name: "Application Name".to_string(),
        }
    }

    fn default_alarm_channel() -> Channel {
        Channel {
            id: "alarm_plugin_channel".to_string(),
            name: "Alarm Notification".to_string(),
        }
    }

    fn default_alarm_icon() -> String {
        "@mipmap/ic_launcher".to_string()
    }

    /// Load the config at `path`, falling back to defaults when there is no file.
    ///
    /// # Errors
    /// If the file exists but can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(toml::from_str(&config)?)
    }

    /// # Errors
    /// If the config can't be serialized or written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        std::fs::write(path, config).map_err(ConfigError::Write)
    }

    /// # Errors
    /// If no home directory can be found.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().is_ok_and(|path| path.exists())
    }
}

/// Options the embedding application binds with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct BindOptions {
    /// meters, `None` is 0
    #[serde(default)]
    pub distance_filter: Option<f64>,
    /// always use the fallback location provider
    #[serde(default)]
    pub force_location_manager: bool,
}
