use bisleri_core::PromptError;
use thiserror::Error;

/// A required value could not be pulled out of a page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{field} not found on page")]
    NotFound { field: &'static str },

    #[error("invalid amount \"{raw}\"")]
    InvalidAmount { raw: String },
}

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server bounced the request to a login-like page.
    #[error("session expired; please run 'bislericli auth login'")]
    NotAuthenticated,

    /// Landed somewhere that is neither the expected page nor a login page.
    #[error("unexpected redirect to {path}")]
    UnexpectedRedirect { path: String },

    #[error("{path} request failed: HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("{path} returned an empty response")]
    EmptyResponse { path: String },

    #[error("{path} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        path: String,
        attempts: u32,
        #[source]
        last: Box<StorefrontError>,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("order deadline exceeded")]
    DeadlineExceeded,

    #[error("order placement failed: {reason}")]
    OrderNotPlaced { reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("logout failed")]
    LogoutFailed,

    #[error("login failed: {0}")]
    Login(String),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl StorefrontError {
    #[must_use]
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }

    /// 5xx, 429, timeouts and connect failures; the only errors worth
    /// retrying. Body and decode failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Self::DeadlineExceeded => true,
            Self::RetriesExhausted { last, .. } => last.is_deadline_exceeded(),
            _ => false,
        }
    }

    /// HTTP status behind this error, looking through exhausted retries.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
