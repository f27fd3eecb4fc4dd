use super::{StorefrontClient, SITE_PREFIX};
use crate::extract::{logout_link, Page};
use crate::StorefrontError;

const FALLBACK_ENDPOINTS: [&str; 4] = [
    "/Account-Logout",
    "/Login-Logout",
    "/Logout-Logout",
    "/logout",
];

impl StorefrontClient {
    /// Ends the remote session: the page's own logout link first, then the
    /// known endpoints in order. Any 2xx or 3xx answer counts.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::LogoutFailed`] if every attempt was refused.
    pub async fn logout(&self) -> Result<(), StorefrontError> {
        let discovered = match self.fetch_page("/my-orders").await {
            Ok(page) => logout_link(&Page::parse(&page.body)),
            Err(err) => {
                tracing::debug!(error = %err, "logout link discovery failed");
                None
            }
        };

        let fallbacks = FALLBACK_ENDPOINTS.iter().map(|path| {
            if *path == "/logout" {
                self.url(path)
            } else {
                self.url(&format!("{SITE_PREFIX}{path}"))
            }
        });
        for url in discovered.map(|href| self.resolve(&href)).into_iter().chain(fallbacks) {
            match self.send(self.raw().get(&url)).await {
                Ok(response) if (200..400).contains(&response.status().as_u16()) => {
                    tracing::debug!(url = %url, "logged out");
                    return Ok(());
                }
                Ok(response) => {
                    tracing::debug!(url = %url, status = response.status().as_u16(), "logout refused");
                }
                Err(err) if err.is_deadline_exceeded() => return Err(err),
                Err(err) => tracing::debug!(url = %url, error = %err, "logout request failed"),
            }
        }
        Err(StorefrontError::LogoutFailed)
    }
}
