//! Global config file and the on-disk layout of the config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_ORDER_QUANTITY: u32 = 2;
pub const DEFAULT_RETURN_JARS: u32 = 2;
pub const DEFAULT_SCHEDULE: &str = "twice-weekly";
pub const DEFAULT_TIMESLOT: &str = "08:00 AM - 02:00 PM";

const CONFIG_FILE: &str = "config.json";
const PROFILES_DIR: &str = "profiles";
const DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default)]
    pub order_quantity: u32,
    #[serde(default)]
    pub return_jars: u32,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub timeslot: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            order_quantity: DEFAULT_ORDER_QUANTITY,
            return_jars: DEFAULT_RETURN_JARS,
            schedule: DEFAULT_SCHEDULE.to_string(),
            timeslot: DEFAULT_TIMESLOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub current_profile: String,
    #[serde(default)]
    pub defaults: Defaults,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            current_profile: DEFAULT_PROFILE.to_string(),
            defaults: Defaults::default(),
        }
    }
}

impl GlobalConfig {
    /// Back-fills zero or empty fields read from an older or hand-edited file.
    pub fn fill_missing(&mut self) {
        if self.current_profile.trim().is_empty() {
            self.current_profile = DEFAULT_PROFILE.to_string();
        }
        let d = &mut self.defaults;
        if d.order_quantity == 0 {
            d.order_quantity = DEFAULT_ORDER_QUANTITY;
        }
        if d.return_jars == 0 {
            d.return_jars = DEFAULT_RETURN_JARS;
        }
        if d.schedule.trim().is_empty() {
            d.schedule = DEFAULT_SCHEDULE.to_string();
        }
        if d.timeslot.trim().is_empty() {
            d.timeslot = DEFAULT_TIMESLOT.to_string();
        }
    }
}

/// Rejects names that could escape the profiles directory.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidProfileName`] for empty names and names
/// containing `..`, `/` or `\`.
pub fn validate_profile_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() || name.contains("..") || name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidProfileName(name.to_string()));
    }
    Ok(())
}

/// File layout under the config directory:
///
/// ```text
/// <root>/config.json
/// <root>/profiles/<name>.json
/// <root>/data/orders_<name>.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    root: PathBuf,
}

impl ConfigPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(PROFILES_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProfileName`] if `name` fails validation.
    pub fn profile_file(&self, name: &str) -> Result<PathBuf, ConfigError> {
        validate_profile_name(name)?;
        Ok(self.profiles_dir().join(format!("{name}.json")))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProfileName`] if `name` fails validation.
    pub fn orders_file(&self, name: &str) -> Result<PathBuf, ConfigError> {
        validate_profile_name(name)?;
        Ok(self.data_dir().join(format!("orders_{name}.json")))
    }
}
