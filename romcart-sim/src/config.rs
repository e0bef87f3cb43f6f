// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

//! Settings persisted as a JSON document.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use romcart_common::args::parse_config_key;
use romcart_common::types::ConfigKey;
use romcart_core::error::StorageError;
use romcart_core::hal::ConfigStore;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    settings: BTreeMap<String, String>,
}

/// Configuration store written to a JSON file on save.  Unset keys read as
/// their default, except that an empty default reads as unset.
pub struct JsonConfig {
    path: PathBuf,
    values: HashMap<ConfigKey, String>,
}

impl JsonConfig {
    /// Loads `path`, starting from defaults if it does not exist.  Unknown
    /// keys in the file are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let mut values = HashMap::new();
        if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file: SettingsFile = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            for (name, value) in file.settings {
                match parse_config_key(&name) {
                    Ok(key) => {
                        values.insert(key, value);
                    }
                    Err(e) => warn!("Ignoring setting in {}: {}", path.display(), e),
                }
            }
        }
        debug!("Loaded {} settings from {}", values.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    fn write(&self) -> Result<()> {
        let file = SettingsFile {
            settings: self
                .values
                .iter()
                .map(|(key, value)| (key.name().to_string(), value.clone()))
                .collect(),
        };
        let text = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl ConfigStore for JsonConfig {
    fn get(&self, key: ConfigKey) -> Option<String> {
        match self.values.get(&key) {
            Some(value) => Some(value.clone()),
            None => {
                let default = key.default_value();
                (!default.is_empty()).then(|| default.to_string())
            }
        }
    }

    fn put_string(&mut self, key: ConfigKey, value: &str) {
        self.values.insert(key, value.to_string());
    }

    fn put_integer(&mut self, key: ConfigKey, value: i64) {
        self.values.insert(key, value.to_string());
    }

    fn save(&mut self, commit: bool) -> Result<(), StorageError> {
        if !commit {
            return Ok(());
        }
        self.write()
            .map_err(|e| StorageError::Write(format!("{:#}", e)))
    }

    fn entries(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::iter()
            .map(|key| (key, self.get(key).unwrap_or_default()))
            .collect()
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}
