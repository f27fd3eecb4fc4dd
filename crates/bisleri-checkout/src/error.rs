use bisleri_client::{ExtractError, StorefrontError};
use bisleri_core::{PromptError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("no cookies in profile; run 'bislericli auth login'")]
    NoSession,

    #[error("{0}")]
    InvalidRequest(String),

    /// The page advertises items but none could be parsed.
    #[error("unable to parse cart items; please clear cart or try again")]
    CartUnreadable,

    #[error("cart contains other items; clear cart or pass --allow-extra (items: {})", .items.join(", "))]
    ExtraItems { items: Vec<String> },

    #[error("cart is not empty; clear cart or pass --allow-extra")]
    CartNotEmpty,

    #[error("unable to confirm cart quantity after add: {reason}")]
    CartNotConfirmed { reason: String },

    #[error("failed to parse csrf token (session expired?): {0}")]
    MissingCsrf(#[source] ExtractError),

    #[error("failed to parse shipment UUID: {0}")]
    MissingShipmentUuid(#[source] ExtractError),

    #[error("no address found in account; set a default address on bisleri.com and retry")]
    NoAddress,

    /// The shipping page could not be loaded after checkout initialisation
    /// had already failed.
    #[error("{source} (checkout init error: {init})")]
    CheckoutInit {
        #[source]
        source: StorefrontError,
        init: String,
    },

    #[error("failed to detect order total on payment page")]
    TotalMissing,

    #[error("failed to parse order total amount: {raw}")]
    TotalUnparseable { raw: String },

    #[error("invalid order total detected ({raw}); check debug html")]
    InvalidTotal { raw: String },

    #[error("insufficient wallet balance ({balance}) for order total ({total})")]
    InsufficientBalance { balance: String, total: String },

    #[error("session expired; run 'bislericli auth login --profile {profile}' and retry the order")]
    ReauthDeclined { profile: String },

    #[error("re-login failed: {0}")]
    ReauthFailed(#[source] StorefrontError),
}

impl CheckoutError {
    /// True when the storefront bounced a request to a login page, looking
    /// through wrapped shipping failures.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        match self {
            Self::Storefront(e) | Self::CheckoutInit { source: e, .. } => e.is_not_authenticated(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Self::Storefront(e) | Self::CheckoutInit { source: e, .. } => e.is_deadline_exceeded(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_items_are_all_named() {
        let err = CheckoutError::ExtraItems {
            items: vec!["BIS-1LTR".into(), "unknown-item".into()],
        };
        assert_eq!(
            err.to_string(),
            "cart contains other items; clear cart or pass --allow-extra (items: BIS-1LTR, unknown-item)"
        );
    }

    #[test]
    fn session_expiry_is_seen_through_checkout_init() {
        let wrapped = CheckoutError::CheckoutInit {
            source: StorefrontError::NotAuthenticated,
            init: "checkout_form not found on page".into(),
        };
        assert!(wrapped.is_session_expired());
        assert!(CheckoutError::from(StorefrontError::NotAuthenticated).is_session_expired());
        assert!(!CheckoutError::CartUnreadable.is_session_expired());
    }

    #[test]
    fn deadline_is_not_session_expiry() {
        let err = CheckoutError::from(StorefrontError::DeadlineExceeded);
        assert!(err.is_deadline_exceeded());
        assert!(!err.is_session_expired());
    }
}
