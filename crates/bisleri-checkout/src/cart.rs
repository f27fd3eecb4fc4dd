//! Cart reconciliation: get the target product to the requested quantity
//! without ever adding a duplicate line or buying something else.

use std::time::Duration;

use bisleri_client::extract::{cart_count, cart_items, find_cart_item, CartItem};
use bisleri_client::{Page, StorefrontClient};
use bisleri_core::Prompter;

use crate::CheckoutError;

/// The 20L jar.
pub const PRODUCT_20L: &str = "BIS-20LTR01-90";
/// Returned-jar line the site adds next to the jar.
pub const EMPTY_JAR_PRODUCT: &str = "Bis-20LTREmpty-Product";
/// Deposit line the site adds next to the jar.
pub const DEPOSIT_PRODUCT: &str = "Bis-20LTRDeposit-Amount-Product";

const UNKNOWN_ITEM: &str = "unknown-item";
const CONFIRM_ATTEMPTS: u32 = 4;

/// What one cart page says, parsed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub count: Option<u32>,
}

impl CartState {
    #[must_use]
    pub fn parse(html: &str) -> Self {
        let page = Page::parse(html);
        Self {
            items: cart_items(&page),
            count: cart_count(&page),
        }
    }

    /// The page advertises items but none could be parsed out of it.
    #[must_use]
    pub fn is_unreadable(&self) -> bool {
        self.count.is_some_and(|n| n > 0) && self.items.is_empty()
    }

    /// The target line, if it carries a usable uuid.
    #[must_use]
    pub fn target(&self, product_id: &str) -> Option<&CartItem> {
        find_cart_item(&self.items, product_id).filter(|item| !item.uuid.is_empty())
    }
}

/// Lines other than the product and its jar/deposit companions. Lines
/// without a product id are reported as `unknown-item`.
#[must_use]
pub fn filter_extra_items(items: &[CartItem], product_id: &str) -> Vec<String> {
    let allowed = [product_id, EMPTY_JAR_PRODUCT, DEPOSIT_PRODUCT];
    items
        .iter()
        .filter_map(|item| {
            let id = item.product_id.trim();
            if id.is_empty() {
                Some(UNKNOWN_ITEM.to_string())
            } else if allowed.iter().any(|a| a.eq_ignore_ascii_case(id)) {
                None
            } else {
                Some(item.product_id.clone())
            }
        })
        .collect()
}

/// The single change a cart needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Keep,
    Update { uuid: String, from: u32 },
    Add,
}

/// Decides what to do with a readable cart. Every refusal happens here,
/// before any write is issued.
///
/// # Errors
///
/// [`CheckoutError::CartUnreadable`], [`CheckoutError::ExtraItems`] or
/// [`CheckoutError::CartNotEmpty`].
pub fn plan_cart(
    state: &CartState,
    product_id: &str,
    quantity: u32,
    allow_extra: bool,
) -> Result<CartAction, CheckoutError> {
    if state.is_unreadable() {
        return Err(CheckoutError::CartUnreadable);
    }
    let extras = filter_extra_items(&state.items, product_id);
    if !extras.is_empty() && !allow_extra {
        return Err(CheckoutError::ExtraItems { items: extras });
    }
    match state.target(product_id) {
        Some(item) if item.quantity == quantity => Ok(CartAction::Keep),
        Some(item) => Ok(CartAction::Update {
            uuid: item.uuid.clone(),
            from: item.quantity,
        }),
        None if !state.items.is_empty() && !allow_extra => Err(CheckoutError::CartNotEmpty),
        None => Ok(CartAction::Add),
    }
}

/// Applies [`plan_cart`] to an already-fetched cart page.
///
/// # Errors
///
/// Planning refusals and storefront failures.
pub async fn reconcile_cart<P: Prompter>(
    client: &StorefrontClient,
    prompter: &P,
    cart_html: &str,
    product_id: &str,
    quantity: u32,
    allow_extra: bool,
    confirm_step: Duration,
) -> Result<(), CheckoutError> {
    let state = CartState::parse(cart_html);
    match plan_cart(&state, product_id, quantity, allow_extra)? {
        CartAction::Keep => {
            prompter.notify("Cart already at desired quantity.");
        }
        CartAction::Update { uuid, from } => {
            tracing::info!(from, to = quantity, "updating cart quantity");
            prompter.notify("Updating cart quantity...");
            client.update_quantity(product_id, &uuid, quantity).await?;
        }
        CartAction::Add => {
            add_and_confirm(client, prompter, product_id, quantity, allow_extra, confirm_step).await?;
        }
    }
    Ok(())
}

/// Adds a new line and waits for the cart to show it.
///
/// # Errors
///
/// Storefront failures and [`CheckoutError::CartNotConfirmed`].
pub async fn add_and_confirm<P: Prompter>(
    client: &StorefrontClient,
    prompter: &P,
    product_id: &str,
    quantity: u32,
    allow_extra: bool,
    confirm_step: Duration,
) -> Result<(), CheckoutError> {
    prompter.notify("Adding product to cart...");
    client.add_product(product_id, quantity).await?;
    confirm_cart_quantity(client, product_id, quantity, allow_extra, confirm_step).await
}

/// Re-polls the cart until the product shows at `quantity`.
///
/// Cart writes are eventually consistent, so each miss waits
/// `attempt × step` before the next look. A line whose quantity reads as
/// zero is accepted once a quantity update for it goes through, since the
/// quantity markup is the least reliable part of the page.
///
/// # Errors
///
/// Session loss, extra items and deadline expiry abort at once; anything
/// else becomes [`CheckoutError::CartNotConfirmed`] after the last attempt.
pub async fn confirm_cart_quantity(
    client: &StorefrontClient,
    product_id: &str,
    quantity: u32,
    allow_extra: bool,
    step: Duration,
) -> Result<(), CheckoutError> {
    let mut last = String::from("unknown cart verification error");
    for attempt in 1..=CONFIRM_ATTEMPTS {
        match client.fetch_cart_page().await {
            Err(err) if err.is_not_authenticated() || err.is_deadline_exceeded() => {
                return Err(err.into());
            }
            Err(err) => last = err.to_string(),
            Ok(html) => {
                let state = CartState::parse(&html);
                if check_confirmation(client, &state, product_id, quantity, allow_extra, &mut last)
                    .await?
                {
                    return Ok(());
                }
            }
        }
        tracing::debug!(attempt, reason = %last, "cart quantity not confirmed yet");
        if attempt < CONFIRM_ATTEMPTS {
            client.deadline().sleep(step * attempt).await?;
        }
    }
    Err(CheckoutError::CartNotConfirmed { reason: last })
}

/// One confirmation look. `Ok(true)` ends the poll; `Ok(false)` records
/// why in `last` and asks for another.
async fn check_confirmation(
    client: &StorefrontClient,
    state: &CartState,
    product_id: &str,
    quantity: u32,
    allow_extra: bool,
    last: &mut String,
) -> Result<bool, CheckoutError> {
    if state.is_unreadable() {
        *last = "unable to parse cart items".into();
        return Ok(false);
    }
    let extras = filter_extra_items(&state.items, product_id);
    if !extras.is_empty() && !allow_extra {
        return Err(CheckoutError::ExtraItems { items: extras });
    }
    let Some(item) = state.target(product_id) else {
        *last = if state.count == Some(0) {
            "cart still empty".into()
        } else {
            "product not yet visible in cart".into()
        };
        return Ok(false);
    };
    if item.quantity == quantity {
        return Ok(true);
    }
    match client.update_quantity(product_id, &item.uuid, quantity).await {
        Ok(()) if item.quantity == 0 => Ok(true),
        Ok(()) => {
            *last = format!("cart quantity was {}, updated to {quantity}", item.quantity);
            Ok(false)
        }
        Err(err) if err.is_deadline_exceeded() => Err(err.into()),
        Err(err) => {
            *last = err.to_string();
            Ok(false)
        }
    }
}
