//! HTTP session client for the storefront.
//!
//! Every request waits out the fixed throttle first, then races the shared
//! [`Deadline`]. Page loads classify where the redirect chain landed so a
//! bounce to a login page surfaces as [`StorefrontError::NotAuthenticated`]
//! rather than as a parse failure further down.

mod cart;
mod checkout;
mod logout;

use std::sync::Arc;
use std::time::Duration;

use bisleri_core::{Settings, StoredCookie};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, RequestBuilder, Response, Url};

use crate::retry::retry_linear;
use crate::session::{export_cookies, jar_from_cookies};
use crate::{Deadline, StorefrontError};

pub(crate) use cart::form_body;
pub use checkout::{order_id_from_redirect, PaymentSubmission, ShippingSubmission};

pub(crate) const SITE_PREFIX: &str = "/on/demandware.store/Sites-Bis-Site/default";

/// Transport knobs for one [`StorefrontClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    pub throttle: Duration,
    pub request_timeout: Duration,
    /// Attempts for idempotent page loads (cart, shipping, payment).
    pub page_attempts: u32,
    /// Linear back-off unit: attempt `n` waits `n * backoff_step`.
    pub backoff_step: Duration,
}

impl ClientSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: bisleri_core::settings::DEFAULT_USER_AGENT.to_string(),
            throttle: Duration::from_millis(900),
            request_timeout: Duration::from_secs(40),
            page_attempts: 3,
            backoff_step: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            throttle: Duration::from_millis(settings.throttle_ms),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            ..Self::new(settings.base_url.clone())
        }
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }
}

/// A page body plus where the redirect chain ended.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub landed_path: String,
    pub body: String,
}

/// Classifies the final path of a followed redirect chain.
///
/// # Errors
///
/// [`StorefrontError::NotAuthenticated`] for `/`, an empty path, or any path
/// mentioning login, account or home; [`StorefrontError::UnexpectedRedirect`]
/// for anything else outside `expected_prefix`.
pub fn validate_landed_path(landed: &str, expected_prefix: &str) -> Result<(), StorefrontError> {
    if expected_prefix.is_empty() || landed.starts_with(expected_prefix) {
        return Ok(());
    }
    let lower = landed.to_ascii_lowercase();
    if landed.is_empty()
        || landed == "/"
        || ["login", "account", "home"].iter().any(|w| lower.contains(w))
    {
        return Err(StorefrontError::NotAuthenticated);
    }
    Err(StorefrontError::UnexpectedRedirect {
        path: landed.to_string(),
    })
}

/// Cookie-bearing client for one session against the storefront.
pub struct StorefrontClient {
    http: reqwest::Client,
    no_redirect: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    base_str: String,
    settings: ClientSettings,
    deadline: Deadline,
}

impl StorefrontClient {
    /// Builds a client whose jar starts with `cookies`.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::InvalidUrl`] for a malformed base URL, or
    /// [`StorefrontError::Http`] if the TLS stack cannot be initialised.
    pub fn new(settings: ClientSettings, cookies: &[StoredCookie]) -> Result<Self, StorefrontError> {
        let base_str = settings.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_str).map_err(|e| StorefrontError::InvalidUrl {
            url: base_str.clone(),
            reason: e.to_string(),
        })?;
        let jar = jar_from_cookies(cookies, &base);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let builder = || {
            reqwest::Client::builder()
                .user_agent(settings.user_agent.clone())
                .default_headers(headers.clone())
                .cookie_provider(Arc::clone(&jar))
                .timeout(settings.request_timeout)
        };
        let http = builder().build()?;
        let no_redirect = builder().redirect(redirect::Policy::none()).build()?;

        Ok(Self {
            http,
            no_redirect,
            jar,
            base,
            base_str,
            settings,
            deadline: Deadline::unbounded(),
        })
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_str
    }

    /// Cookies currently held for the storefront, in persisted form.
    #[must_use]
    pub fn export_cookies(&self) -> Vec<StoredCookie> {
        export_cookies(&self.jar, &self.base)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_str)
    }

    /// Absolute URL for a scraped action: absolute URLs pass through,
    /// relative ones are joined onto the base.
    pub(crate) fn resolve(&self, action: &str) -> String {
        let action = action.trim();
        if action.starts_with("http://") || action.starts_with("https://") {
            action.to_string()
        } else if action.starts_with('/') {
            self.url(action)
        } else {
            self.url(&format!("/{action}"))
        }
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    pub(crate) fn raw(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn no_redirect(&self) -> &reqwest::Client {
        &self.no_redirect
    }

    /// Throttles, logs and sends one request under the deadline.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, StorefrontError> {
        self.deadline.sleep(self.settings.throttle).await?;
        let (client, request) = builder.build_split();
        let request = request?;
        tracing::debug!(method = %request.method(), url = %request.url(), "storefront request");
        let response = self.deadline.run(client.execute(request)).await??;
        tracing::debug!(status = response.status().as_u16(), url = %response.url(), "storefront response");
        Ok(response)
    }

    pub(crate) async fn read_body(&self, response: Response) -> Result<String, StorefrontError> {
        Ok(self.deadline.run(response.text()).await??)
    }

    /// Sends a state-changing request and fails on any status of 400 or above.
    pub(crate) async fn send_checked(
        &self,
        label: &str,
        builder: RequestBuilder,
    ) -> Result<Response, StorefrontError> {
        let response = self.send(builder).await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(StorefrontError::Status {
                path: label.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// One GET, following redirects.
    ///
    /// # Errors
    ///
    /// Transport failures and deadline expiry.
    pub async fn fetch_page(&self, path: &str) -> Result<FetchedPage, StorefrontError> {
        let response = self.send(self.get(path)).await?;
        let status = response.status().as_u16();
        let landed_path = response.url().path().to_string();
        let body = self.read_body(response).await?;
        Ok(FetchedPage {
            status,
            landed_path,
            body,
        })
    }

    /// GET with linear back-off on transient failures. The landed path is
    /// checked before the status so a login bounce is never retried.
    async fn fetch_page_with_retry(
        &self,
        path: &str,
        expected_prefix: &str,
    ) -> Result<String, StorefrontError> {
        retry_linear(
            path,
            self.settings.page_attempts,
            self.settings.backoff_step,
            &self.deadline,
            || async move {
                let page = self.fetch_page(path).await?;
                validate_landed_path(&page.landed_path, expected_prefix)?;
                if page.status >= 400 {
                    return Err(StorefrontError::Status {
                        path: path.to_string(),
                        status: page.status,
                    });
                }
                Ok(page.body)
            },
        )
        .await
    }

    /// # Errors
    ///
    /// See [`validate_landed_path`]; 4xx fails at once, 5xx/429 after retries.
    pub async fn fetch_cart_page(&self) -> Result<String, StorefrontError> {
        self.fetch_page_with_retry("/mycart", "/mycart").await
    }

    /// # Errors
    ///
    /// See [`StorefrontClient::fetch_cart_page`].
    pub async fn fetch_shipping_page(&self) -> Result<String, StorefrontError> {
        self.fetch_page_with_retry("/checkout?stage=shipping", "/checkout")
            .await
    }

    /// # Errors
    ///
    /// See [`StorefrontClient::fetch_cart_page`].
    pub async fn fetch_payment_page(&self) -> Result<String, StorefrontError> {
        self.fetch_page_with_retry("/checkout?stage=payment", "/checkout")
            .await
    }

    /// Loads the order history page; any landing outside it means the
    /// session is gone.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::NotAuthenticated`] on a bounce, plus transport and
    /// status failures.
    pub async fn fetch_orders_page(&self) -> Result<String, StorefrontError> {
        let page = self.fetch_page("/my-orders").await?;
        if !page.landed_path.contains("/my-orders") {
            return Err(StorefrontError::NotAuthenticated);
        }
        if page.status >= 400 {
            return Err(StorefrontError::Status {
                path: "/my-orders".into(),
                status: page.status,
            });
        }
        Ok(page.body)
    }

    /// Confirms the session by loading the account's order page once.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::NotAuthenticated`] when bounced to a login page,
    /// [`StorefrontError::Status`] or [`StorefrontError::EmptyResponse`]
    /// otherwise.
    pub async fn verify_authenticated(&self) -> Result<(), StorefrontError> {
        let page = self.fetch_page("/my-orders").await?;
        if page.status >= 400 {
            return Err(StorefrontError::Status {
                path: "/my-orders".into(),
                status: page.status,
            });
        }
        validate_landed_path(&page.landed_path, "/my-orders")?;
        if page.body.is_empty() {
            return Err(StorefrontError::EmptyResponse {
                path: "/my-orders".into(),
            });
        }
        Ok(())
    }
}
