use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    config::ConfigError,
    platform::{PlatformError, PlatformResult, Preferences},
};

pub const KEY_REQUESTING_LOCATION_UPDATES: &str = "requesting_location_updates";

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, bool>,
}

impl Preferences for MemoryPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) -> PlatformResult {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Preferences kept in a toml file, rewritten on every change.
#[derive(Debug)]
pub struct TomlPreferences {
    path: PathBuf,
    values: BTreeMap<String, bool>,
}

impl TomlPreferences {
    /// Open the store at `path`; a missing file is an empty store.
    ///
    /// # Errors
    /// If the file exists but can't be read or parsed.
    pub fn open(path: PathBuf) -> Result<Self, ConfigError> {
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(ConfigError::Read)?;
            toml::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    /// `preferences.toml` in the data directory.
    ///
    /// # Errors
    /// If no home directory can be found.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(crate::config::project_dirs()?
            .data_dir()
            .join("preferences.toml"))
    }

    fn save(&self) -> PlatformResult {
        let contents =
            toml::to_string(&self.values).map_err(|e| PlatformError::Other(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl Preferences for TomlPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).copied()
    }

    fn set_bool(&mut self, key: &str, value: bool) -> PlatformResult {
        self.values.insert(key.to_string(), value);
        self.save()
    }
}
