//! One order, end to end.
//!
//! The stages run strictly in sequence: verify session, reconcile city and
//! cart, set return jars and the saved-address location, begin checkout,
//! resolve the address, submit shipping, check totals against the wallet,
//! submit payment, place the order, persist the result. A session loss
//! anywhere in the first run may trigger one consent-gated re-login and one
//! full retry.

use std::time::Duration;

use bisleri_client::extract::{
    address_candidates, city_options, csrf_token, order_total, selected_city, shipment_uuid,
    wallet_balance, AddressCandidate,
};
use bisleri_client::{
    ClientSettings, Deadline, Page, PaymentSubmission, ShippingSubmission, StorefrontClient,
};
use bisleri_core::{
    Defaults, LastOrder, Profile, ProfileStore, Prompter, ADDRESS_SOURCE_SHIPPING_PAGE,
};
use chrono::Utc;

use crate::address::{ensure_complete, location_address, select_address};
use crate::cart::{add_and_confirm, reconcile_cart, PRODUCT_20L};
use crate::city::resolve_city;
use crate::guard::{check_totals, PaymentTotals};
use crate::reauth::{ask_consent, Consent, CredentialRefresher};
use crate::snapshot::{describe, DebugSnapshots, SnapshotKind};
use crate::CheckoutError;

const BEGIN_ATTEMPTS: u32 = 2;

/// What to order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub product_id: String,
    pub quantity: u32,
    pub return_jars: u32,
    pub allow_extra: bool,
    pub timeslot: String,
}

impl OrderRequest {
    /// Applies command-line values over config defaults. A quantity of zero
    /// means "use the default"; omitted return jars match the quantity.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidRequest`] for a non-positive quantity or more
    /// return jars than jars ordered.
    pub fn from_args(
        quantity: u32,
        return_jars: Option<u32>,
        allow_extra: bool,
        defaults: &Defaults,
    ) -> Result<Self, CheckoutError> {
        let quantity = if quantity == 0 {
            defaults.order_quantity
        } else {
            quantity
        };
        if quantity == 0 {
            return Err(CheckoutError::InvalidRequest(
                "quantity must be a positive number".into(),
            ));
        }
        let return_jars = return_jars.unwrap_or(quantity);
        if return_jars > quantity {
            return Err(CheckoutError::InvalidRequest(format!(
                "return jars ({return_jars}) cannot exceed order quantity ({quantity})"
            )));
        }
        Ok(Self {
            product_id: PRODUCT_20L.to_string(),
            quantity,
            return_jars,
            allow_extra,
            timeslot: defaults.timeslot.clone(),
        })
    }
}

/// Fixed waits inserted for the site's eventual consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutTimings {
    /// After the cart and jar updates.
    pub settle: Duration,
    /// Before checkout begins.
    pub stabilize: Duration,
    pub begin_retry: Duration,
    /// Cart confirmation attempt `n` waits `n * confirm_step`.
    pub confirm_step: Duration,
    pub consent_window: Duration,
}

impl Default for CheckoutTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(500),
            stabilize: Duration::from_millis(300),
            begin_retry: Duration::from_secs(1),
            confirm_step: Duration::from_millis(500),
            consent_window: Duration::from_secs(10),
        }
    }
}

impl CheckoutTimings {
    /// No fixed delays and a short consent window.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            stabilize: Duration::ZERO,
            begin_retry: Duration::ZERO,
            confirm_step: Duration::ZERO,
            consent_window: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub order_id: String,
    /// Raw total as shown on the payment page.
    pub total: String,
    pub balance_after: Option<String>,
    pub reauthenticated: bool,
}

struct ShippingPage {
    csrf: String,
    shipment_uuid: String,
    candidates: Vec<AddressCandidate>,
}

pub struct Orchestrator<'a, P, R> {
    store: &'a ProfileStore,
    client_settings: ClientSettings,
    prompter: &'a P,
    refresher: &'a R,
    timings: CheckoutTimings,
    snapshots: DebugSnapshots,
    deadline: Deadline,
}

impl<'a, P: Prompter, R: CredentialRefresher> Orchestrator<'a, P, R> {
    pub fn new(
        store: &'a ProfileStore,
        client_settings: ClientSettings,
        prompter: &'a P,
        refresher: &'a R,
    ) -> Self {
        Self {
            store,
            client_settings,
            prompter,
            refresher,
            timings: CheckoutTimings::default(),
            snapshots: DebugSnapshots::disabled(),
            deadline: Deadline::unbounded(),
        }
    }

    #[must_use]
    pub fn with_timings(mut self, timings: CheckoutTimings) -> Self {
        self.timings = timings;
        self
    }

    #[must_use]
    pub fn with_snapshots(mut self, snapshots: DebugSnapshots) -> Self {
        self.snapshots = snapshots;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Places one order for `profile`, persisting every change to it.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoSession`] without cookies; the failing stage's
    /// error otherwise. A second session loss after re-login is returned
    /// as is.
    pub async fn run(
        &self,
        profile: &mut Profile,
        request: &OrderRequest,
    ) -> Result<OrderOutcome, CheckoutError> {
        if !profile.has_session() {
            return Err(CheckoutError::NoSession);
        }
        match self.attempt(profile, request).await {
            Err(err) if err.is_session_expired() => {
                tracing::warn!(profile = %profile.name, error = %err, "session lost during order");
                self.reauthenticate(profile).await?;
                tracing::info!(profile = %profile.name, "retrying order with refreshed session");
                let mut outcome = self.attempt(profile, request).await?;
                outcome.reauthenticated = true;
                Ok(outcome)
            }
            other => other,
        }
    }

    fn say(&self, message: &str) {
        self.prompter.notify(message);
    }

    async fn reauthenticate(&self, profile: &mut Profile) -> Result<(), CheckoutError> {
        let declined = || CheckoutError::ReauthDeclined {
            profile: profile.name.clone(),
        };
        match ask_consent(self.prompter, self.timings.consent_window, &self.deadline).await? {
            Consent::Accepted => {}
            Consent::Declined => return Err(declined()),
            Consent::TimedOut => {
                self.say("No answer; not logging in.");
                return Err(declined());
            }
        }

        let saved_phone = Some(profile.phone_number.trim().to_string()).filter(|p| !p.is_empty());
        let session = self
            .deadline
            .run(self.refresher.refresh(saved_phone.as_deref()))
            .await?
            .map_err(|err| {
                if err.is_deadline_exceeded() {
                    CheckoutError::Storefront(err)
                } else {
                    CheckoutError::ReauthFailed(err)
                }
            })?;
        profile.replace_session(session.cookies, session.phone.as_deref(), Utc::now());
        self.store.save_profile(profile)?;
        self.say("Session refreshed; retrying order...");
        Ok(())
    }

    async fn attempt(
        &self,
        profile: &mut Profile,
        request: &OrderRequest,
    ) -> Result<OrderOutcome, CheckoutError> {
        let client = StorefrontClient::new(self.client_settings.clone(), &profile.cookies)?
            .with_deadline(self.deadline);

        self.say("Checking session...");
        client.verify_authenticated().await?;

        self.say("Preparing cart...");
        self.prepare_cart(&client, profile, request).await?;

        self.say("Setting return jars...");
        client.update_jar_quantity(request.return_jars).await?;
        self.deadline.sleep(self.timings.settle).await?;

        self.set_saved_location(&client, profile).await?;
        self.deadline.sleep(self.timings.stabilize).await?;

        self.say("Fetching shipping details...");
        let shipping_html = self.open_shipping(&client).await?;
        let shipping = self.read_shipping(&shipping_html)?;
        self.resolve_address(profile, shipping.candidates).await?;
        let address = profile.address.clone().ok_or(CheckoutError::NoAddress)?;

        self.say("Submitting shipping info...");
        client
            .submit_shipping(&ShippingSubmission {
                shipment_uuid: &shipping.shipment_uuid,
                csrf_token: &shipping.csrf,
                timeslot: &request.timeslot,
                address: &address,
                address_id: &profile.address_id,
            })
            .await?;

        self.say("Fetching payment page...");
        let payment_html = client.fetch_payment_page().await?;
        let (totals, payment_csrf) = self.read_payment(&payment_html)?;
        let payment_csrf = payment_csrf.unwrap_or_else(|| shipping.csrf.clone());

        self.say("Submitting payment (Bisleri Wallet)...");
        client
            .submit_payment(&PaymentSubmission {
                shipment_uuid: &shipping.shipment_uuid,
                csrf_token: &payment_csrf,
                address: &address,
            })
            .await?;

        self.say("Placing order...");
        let order_id = client.place_order().await?;
        profile.last_order = Some(LastOrder {
            order_id: order_id.clone(),
            placed_at: Utc::now(),
            total_price: totals.total_raw.clone(),
        });
        if let Err(err) = self.store.save_profile(profile) {
            tracing::warn!(error = %err, "order placed but profile not saved");
            self.say(&format!("Warning: failed to save order info: {err}"));
        }

        let balance_after = balance_after(&client).await;
        Ok(OrderOutcome {
            order_id,
            total: totals.total_raw,
            balance_after,
            reauthenticated: false,
        })
    }

    async fn prepare_cart(
        &self,
        client: &StorefrontClient,
        profile: &mut Profile,
        request: &OrderRequest,
    ) -> Result<(), CheckoutError> {
        match client.fetch_cart_page().await {
            Ok(html) => {
                let html = self.ensure_city(client, profile, html).await?;
                reconcile_cart(
                    client,
                    self.prompter,
                    &html,
                    &request.product_id,
                    request.quantity,
                    request.allow_extra,
                    self.timings.confirm_step,
                )
                .await
            }
            Err(err) if err.is_not_authenticated() || err.is_deadline_exceeded() => Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %err, "cart unavailable; adding product without reconciling");
                self.say(&format!(
                    "Warning: unable to fetch cart; proceeding to add product: {err}"
                ));
                add_and_confirm(
                    client,
                    self.prompter,
                    &request.product_id,
                    request.quantity,
                    request.allow_extra,
                    self.timings.confirm_step,
                )
                .await
            }
        }
    }

    /// Selects a delivery city when the cart has none and returns the cart
    /// page to reconcile against.
    async fn ensure_city(
        &self,
        client: &StorefrontClient,
        profile: &mut Profile,
        cart_html: String,
    ) -> Result<String, CheckoutError> {
        let (selected, options) = {
            let page = Page::parse(&cart_html);
            (selected_city(&page), city_options(&page))
        };
        if selected.is_some() {
            return Ok(cart_html);
        }
        let city = resolve_city(self.prompter, profile, &options).await?;
        if city.trim().is_empty() {
            return Ok(cart_html);
        }

        self.say(&format!("Setting delivery city: {city}"));
        client.set_city_location(&city).await?;
        profile.preferred_city = city;
        if let Err(err) = self.store.save_profile(profile) {
            self.say(&format!("Warning: failed to save preferred city: {err}"));
        }
        Ok(client.fetch_cart_page().await?)
    }

    async fn set_saved_location(
        &self,
        client: &StorefrontClient,
        profile: &Profile,
    ) -> Result<(), CheckoutError> {
        let Some((address, id)) = location_address(profile) else {
            if profile.saved_address().is_some() {
                tracing::debug!("saved address location skipped (missing fields)");
            }
            return Ok(());
        };
        match client.set_saved_address_location(&address, &id).await {
            Ok(()) => tracing::debug!(address_id = %id, "saved address location set"),
            Err(err) if err.is_deadline_exceeded() => return Err(err.into()),
            Err(err) => tracing::warn!(error = %err, "set saved address location failed"),
        }
        Ok(())
    }

    /// Begins checkout and loads the shipping stage. A shipping page that
    /// answers 500 gets one more checkout initialisation.
    async fn open_shipping(&self, client: &StorefrontClient) -> Result<String, CheckoutError> {
        let mut begin_err = None;
        for attempt in 1..=BEGIN_ATTEMPTS {
            match client.begin_checkout().await {
                Ok(()) => {
                    begin_err = None;
                    break;
                }
                Err(err) if err.is_deadline_exceeded() => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "checkout init failed");
                    begin_err = Some(err);
                    if attempt < BEGIN_ATTEMPTS {
                        self.deadline.sleep(self.timings.begin_retry).await?;
                    }
                }
            }
        }

        let first = match client.fetch_shipping_page().await {
            Ok(html) => return Ok(html),
            Err(err) => err,
        };
        let result = if first.status() == Some(500) {
            self.say("Shipping page returned 500. Initializing checkout and retrying...");
            match client.begin_checkout().await {
                Err(err) if err.is_deadline_exceeded() => return Err(err.into()),
                Err(err) => tracing::warn!(error = %err, "checkout re-init failed"),
                Ok(()) => {}
            }
            client.fetch_shipping_page().await
        } else {
            Err(first)
        };
        result.map_err(|source| match begin_err {
            Some(init) => CheckoutError::CheckoutInit {
                source,
                init: init.to_string(),
            },
            None => source.into(),
        })
    }

    fn read_shipping(&self, html: &str) -> Result<ShippingPage, CheckoutError> {
        let page = Page::parse(html);
        let csrf = csrf_token(&page).map_err(CheckoutError::MissingCsrf)?;
        let shipment_uuid = match shipment_uuid(&page) {
            Ok(uuid) => uuid,
            Err(err) => {
                self.snapshot(SnapshotKind::ShippingPage, html, "Shipping");
                return Err(CheckoutError::MissingShipmentUuid(err));
            }
        };
        Ok(ShippingPage {
            csrf,
            shipment_uuid,
            candidates: address_candidates(&page),
        })
    }

    async fn resolve_address(
        &self,
        profile: &mut Profile,
        candidates: Vec<AddressCandidate>,
    ) -> Result<(), CheckoutError> {
        if profile.saved_address().is_none() {
            if candidates.is_empty() {
                return Err(CheckoutError::NoAddress);
            }
            let choice = select_address(self.prompter, &candidates).await?;
            let mut address = choice.address;
            ensure_complete(self.prompter, &mut address).await?;
            profile.address_id = choice.id;
            profile.address = Some(address);
            profile.address_source = ADDRESS_SOURCE_SHIPPING_PAGE.to_string();
            self.store.save_profile(profile)?;
            tracing::info!(address_id = %profile.address_id, "address captured from shipping page");
        }
        if let Some(address) = profile.address.as_mut().filter(|a| !a.is_complete()) {
            ensure_complete(self.prompter, address).await?;
            self.store.save_profile(profile)?;
        }
        Ok(())
    }

    /// Reads the totals and token off the payment page and applies the
    /// wallet guard.
    fn read_payment(&self, html: &str) -> Result<(PaymentTotals, Option<String>), CheckoutError> {
        let page = Page::parse(html);
        let total = order_total(&page);
        let balance = wallet_balance(&page);
        let csrf = csrf_token(&page).ok();

        if let Some(balance) = &balance {
            self.say(&format!("Wallet balance: {balance}"));
        }
        if let Some(total) = &total {
            self.say(&format!("Order total: {total}"));
        }
        match check_totals(total.as_deref(), balance.as_deref()) {
            Ok(totals) => {
                if balance.is_none() {
                    self.say("Warning: could not detect wallet balance");
                }
                Ok((totals, csrf))
            }
            Err(err) => {
                match err {
                    CheckoutError::TotalMissing => {
                        self.snapshot(SnapshotKind::PaymentNoTotal, html, "Payment");
                    }
                    CheckoutError::InvalidTotal { .. } => {
                        self.snapshot(SnapshotKind::PaymentFailTotal, html, "Payment");
                    }
                    _ => {}
                }
                Err(err)
            }
        }
    }

    fn snapshot(&self, kind: SnapshotKind, html: &str, what: &str) {
        if let Some(path) = self.snapshots.save(kind, html) {
            self.say(&describe(&path, what));
        }
    }
}

/// Remaining wallet balance after placement. Best effort.
async fn balance_after(client: &StorefrontClient) -> Option<String> {
    let html = match client.fetch_payment_page().await {
        Ok(html) => html,
        Err(err) => {
            tracing::debug!(error = %err, "post-order balance unavailable");
            return None;
        }
    };
    wallet_balance(&Page::parse(&html))
}
