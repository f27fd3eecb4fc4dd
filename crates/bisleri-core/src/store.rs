//! File-per-entity JSON persistence under the config directory.
//!
//! Directories are created owner-only (`0700`) and files written `0600` on
//! unix. There is no locking: concurrent runs against one profile may lose
//! updates.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ConfigPaths, GlobalConfig, OrderHistory, Profile, SavedOrder, StoreError};

#[derive(Debug, Clone)]
pub struct ProfileStore {
    paths: ConfigPaths,
}

impl ProfileStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            paths: ConfigPaths::new(root),
        }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Creates the config, profiles and data directories if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        create_private_dir(self.paths.root())?;
        create_private_dir(&self.paths.profiles_dir())?;
        create_private_dir(&self.paths.data_dir())
    }

    /// Loads `config.json`, writing the defaults when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O failure or malformed JSON.
    pub fn load_config(&self) -> Result<GlobalConfig, StoreError> {
        self.ensure_dirs()?;
        let path = self.paths.config_file();
        match read_json::<GlobalConfig>(&path)? {
            Some(mut cfg) => {
                cfg.fill_missing();
                Ok(cfg)
            }
            None => {
                let cfg = GlobalConfig::default();
                self.save_config(&cfg)?;
                Ok(cfg)
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O or serialization failure.
    pub fn save_config(&self, cfg: &GlobalConfig) -> Result<(), StoreError> {
        self.ensure_dirs()?;
        write_json(&self.paths.config_file(), cfg)
    }

    /// Picks the explicit `--profile` value when given, else the config's
    /// current profile.
    #[must_use]
    pub fn resolve_profile_name(flag: Option<&str>, cfg: &GlobalConfig) -> String {
        flag.map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| cfg.current_profile.clone(), str::to_string)
    }

    /// Loads a profile, creating and persisting an empty one on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an invalid name, [`StoreError::MissingName`]
    /// for a file without a name, or I/O and JSON errors.
    pub fn load_or_create_profile(&self, name: &str) -> Result<Profile, StoreError> {
        self.ensure_dirs()?;
        let path = self.paths.profile_file(name)?;
        if let Some(profile) = read_json::<Profile>(&path)? {
            if profile.name.trim().is_empty() {
                return Err(StoreError::MissingName { path });
            }
            return Ok(profile);
        }
        let profile = Profile::new(name);
        write_json(&path, &profile)?;
        tracing::debug!(profile = name, "created profile");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] on an invalid name or I/O failure.
    pub fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.ensure_dirs()?;
        let path = self.paths.profile_file(&profile.name)?;
        write_json(&path, profile)
    }

    /// Names of every `*.json` file in the profiles directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be read.
    pub fn list_profiles(&self) -> Result<Vec<String>, StoreError> {
        self.ensure_dirs()?;
        let dir = self.paths.profiles_dir();
        let entries = fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NoHistory`] if the profile was never synced.
    pub fn load_history(&self, name: &str) -> Result<OrderHistory, StoreError> {
        let path = self.paths.orders_file(name)?;
        read_json::<OrderHistory>(&path)?.ok_or_else(|| StoreError::NoHistory {
            profile: name.to_string(),
        })
    }

    /// Replaces the cached history for `name`, stamping it with `synced_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on an invalid name or I/O failure.
    pub fn save_history(
        &self,
        name: &str,
        orders: Vec<SavedOrder>,
        synced_at: DateTime<Utc>,
    ) -> Result<OrderHistory, StoreError> {
        self.ensure_dirs()?;
        let path = self.paths.orders_file(name)?;
        let history = OrderHistory {
            last_synced: synced_at,
            orders,
        };
        write_json(&path, &history)?;
        Ok(history)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut data = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
    data.push(b'\n');
    write_private(path, &data)
}

/// Writes `bytes` to `path` with owner-only permissions.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on failure.
pub fn write_private(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(|e| StoreError::io(path, e))?;
    file.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| StoreError::io(path, e))?;
    }
    Ok(())
}

fn create_private_dir(path: &Path) -> Result<(), StoreError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path).map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
