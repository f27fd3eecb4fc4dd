use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("could not determine a config directory; set BISLERI_CONFIG_DIR")]
    NoConfigDir,

    #[error("invalid profile name \"{0}\"")]
    InvalidProfileName(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("profile file {path} is missing a name")]
    MissingName { path: PathBuf },

    #[error("no synced data found for profile {profile}; run `bislericli sync` first")]
    NoHistory { profile: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input closed before an answer was given")]
    Closed,

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no scripted answer left for \"{0}\"")]
    Exhausted(String),
}
