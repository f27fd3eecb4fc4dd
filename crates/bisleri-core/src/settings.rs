use std::path::PathBuf;

use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://www.bisleri.com";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

pub const DEFAULT_LOG_FILTER: &str = "bislericli=warn,bisleri_client=warn,bisleri_checkout=info";

const APP_DIR: &str = "bislericli";

/// Process-level settings, resolved once at startup from the environment.
///
/// Everything persisted per user (current profile, order defaults) lives in
/// the JSON config file under [`Settings::config_dir`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub config_dir: PathBuf,
    pub user_agent: String,
    pub log_filter: String,
    pub throttle_ms: u64,
    pub request_timeout_secs: u64,
    pub order_deadline_secs: u64,
}

/// Load settings from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric value is malformed or no config
/// directory can be determined.
pub fn load_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    load_settings_from_env()
}

/// Load settings from the variables already present in the process.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric value is malformed or no config
/// directory can be determined.
pub fn load_settings_from_env() -> Result<Settings, ConfigError> {
    build_settings(|key| std::env::var(key))
}

/// Builds [`Settings`] from an env-var lookup so tests can drive it with a
/// plain `HashMap`.
fn build_settings<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let base_url = or_default("BISLERI_BASE_URL", DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::InvalidEnvVar {
            var: "BISLERI_BASE_URL".to_string(),
            reason: format!("\"{base_url}\" is not an http(s) URL"),
        });
    }

    let config_dir = match lookup("BISLERI_CONFIG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => default_config_dir(&lookup)?,
    };

    let user_agent = or_default("BISLERI_USER_AGENT", DEFAULT_USER_AGENT);
    let log_filter = or_default("BISLERI_LOG", DEFAULT_LOG_FILTER);
    let throttle_ms = parse_u64("BISLERI_THROTTLE_MS", "900")?;
    let request_timeout_secs = parse_u64("BISLERI_REQUEST_TIMEOUT_SECS", "40")?;
    let order_deadline_secs = parse_u64("BISLERI_ORDER_DEADLINE_SECS", "300")?;

    Ok(Settings {
        base_url,
        config_dir,
        user_agent,
        log_filter,
        throttle_ms,
        request_timeout_secs,
        order_deadline_secs,
    })
}

/// `$XDG_CONFIG_HOME/bislericli` on Linux when set, otherwise the platform
/// config directory (`~/.config`, `~/Library/Application Support`, `%APPDATA%`).
fn default_config_dir<F>(lookup: &F) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    if cfg!(target_os = "linux") {
        if let Ok(xdg) = lookup("XDG_CONFIG_HOME") {
            if !xdg.trim().is_empty() {
                return Ok(PathBuf::from(xdg).join(APP_DIR));
            }
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
