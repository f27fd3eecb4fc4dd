//! Consent-gated session refresh.
//!
//! When an order run finds its session gone, the operator is asked whether
//! to log in again. Silence within the window counts as no. A yes triggers
//! one credential refresh whose cookies replace the profile's session.

use std::time::Duration;

use bisleri_client::auth::{login_with_otp, normalize_phone};
use bisleri_client::{ClientSettings, Deadline, StorefrontClient, StorefrontError};
use bisleri_core::{PromptError, Prompter, StoredCookie};

/// Cookies from a fresh login, plus the phone used when there was one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedSession {
    pub cookies: Vec<StoredCookie>,
    pub phone: Option<String>,
}

/// Produces a new session on demand.
#[allow(async_fn_in_trait)]
pub trait CredentialRefresher {
    /// Logs in again, reusing `saved_phone` when the profile has one.
    async fn refresh(&self, saved_phone: Option<&str>) -> Result<RefreshedSession, StorefrontError>;
}

/// Refreshes by SMS code on a fresh, cookie-less client.
pub struct OtpRefresher<'a, P> {
    settings: ClientSettings,
    prompter: &'a P,
    deadline: Deadline,
}

impl<'a, P: Prompter> OtpRefresher<'a, P> {
    #[must_use]
    pub fn new(settings: ClientSettings, prompter: &'a P) -> Self {
        Self {
            settings,
            prompter,
            deadline: Deadline::unbounded(),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }
}

impl<P: Prompter> CredentialRefresher for OtpRefresher<'_, P> {
    async fn refresh(&self, saved_phone: Option<&str>) -> Result<RefreshedSession, StorefrontError> {
        let raw = match saved_phone.map(str::trim).filter(|p| !p.is_empty()) {
            Some(phone) => phone.to_string(),
            None => self.prompter.ask("Phone number (10 digits)").await?,
        };
        let phone = normalize_phone(&raw)?;
        let client =
            StorefrontClient::new(self.settings.clone(), &[])?.with_deadline(self.deadline);
        let cookies = login_with_otp(&client, self.prompter, &phone).await?;
        Ok(RefreshedSession {
            cookies,
            phone: Some(phone),
        })
    }
}

/// The operator's answer to the re-login question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Accepted,
    Declined,
    TimedOut,
}

/// Asks whether to log in again, waiting at most `window` and never past
/// `deadline`. Closed input counts as a decline.
///
/// # Errors
///
/// [`StorefrontError::DeadlineExceeded`] when the run deadline passes
/// first; other prompt failures.
pub async fn ask_consent<P: Prompter>(
    prompter: &P,
    window: Duration,
    deadline: &Deadline,
) -> Result<Consent, StorefrontError> {
    let question = format!(
        "Session expired. Log in again now? (no answer in {} cancels)",
        window_label(window)
    );
    let answer = deadline
        .run(tokio::time::timeout(window, prompter.confirm(&question)))
        .await?;
    match answer {
        Ok(Ok(true)) => Ok(Consent::Accepted),
        Ok(Ok(false) | Err(PromptError::Closed)) => Ok(Consent::Declined),
        Ok(Err(err)) => Err(err.into()),
        Err(_elapsed) => Ok(Consent::TimedOut),
    }
}

fn window_label(window: Duration) -> String {
    if window.subsec_millis() == 0 && window.as_secs() > 0 {
        format!("{}s", window.as_secs())
    } else {
        format!("{}ms", window.as_millis())
    }
}
