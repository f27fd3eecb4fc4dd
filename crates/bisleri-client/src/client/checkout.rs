//! Checkout submission endpoints.

use std::sync::LazyLock;

use bisleri_core::Address;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, LOCATION, ORIGIN, REFERER};

use super::cart::form_body;
use super::{StorefrontClient, SITE_PREFIX};
use crate::extract::{checkout_candidates, find_checkout_form, CheckoutForm, Page};
use crate::StorefrontError;

const FORM_UTF8: &str = "application/x-www-form-urlencoded; charset=UTF-8";

static ORDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"orderID=([^&]+)").expect("valid regex"));

/// Inputs for the shipping-stage submission.
#[derive(Debug, Clone, Copy)]
pub struct ShippingSubmission<'a> {
    pub shipment_uuid: &'a str,
    pub csrf_token: &'a str,
    /// Delivery window; omitted from the form when empty.
    pub timeslot: &'a str,
    pub address: &'a Address,
    /// Saved-address id; omitted from the form when empty.
    pub address_id: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub struct PaymentSubmission<'a> {
    pub shipment_uuid: &'a str,
    pub csrf_token: &'a str,
    pub address: &'a Address,
}

/// Reads the order id out of the place-order redirect.
///
/// Only a 302/303 to an `/orderplaced` location with a non-empty `orderID`
/// query parameter counts as a placed order.
///
/// # Errors
///
/// [`StorefrontError::OrderNotPlaced`] describing which condition failed.
pub fn order_id_from_redirect(status: u16, location: Option<&str>) -> Result<String, StorefrontError> {
    let fail = |reason: String| Err(StorefrontError::OrderNotPlaced { reason });
    if status != 302 && status != 303 {
        return fail(format!("place order returned HTTP {status} instead of a redirect"));
    }
    let location = location.map(str::trim).unwrap_or_default();
    if location.is_empty() {
        return fail("no redirect location from wallet place order".into());
    }
    if !location.contains("/orderplaced") {
        return fail(format!("unexpected redirect location: {location}"));
    }
    match ORDER_ID
        .captures(location)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
    {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => fail(
            "order placement did not return a valid order ID; check wallet or order history"
                .into(),
        ),
    }
}

fn require_ids(shipment_uuid: &str, csrf_token: &str) -> Result<(), StorefrontError> {
    if shipment_uuid.is_empty() || csrf_token.is_empty() {
        return Err(StorefrontError::InvalidInput(
            "missing shipment UUID or CSRF token".into(),
        ));
    }
    Ok(())
}

impl StorefrontClient {
    /// Resubmits a scraped form. GET forms carry their fields in the query.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::InvalidInput`] for a form without an action;
    /// [`StorefrontError::Status`] for a 4xx/5xx answer.
    pub async fn submit_checkout_form(&self, form: &CheckoutForm) -> Result<(), StorefrontError> {
        let action = form.action.trim();
        if action.is_empty() {
            return Err(StorefrontError::InvalidInput(
                "checkout form action missing".into(),
            ));
        }
        let url = self.resolve(action);
        let method = form.method.trim().to_ascii_uppercase();
        let mut request = if method == "GET" {
            self.raw().get(&url).query(&form.fields)
        } else {
            self.raw().post(&url).form(&form.fields)
        };
        if url.starts_with(self.base_url()) {
            request = request
                .header(ORIGIN, self.base_url())
                .header(REFERER, self.url("/mycart"));
        }
        self.send_checked(action, request).await?;
        Ok(())
    }

    /// Starts checkout from the cart page: the best-scoring form if there is
    /// one, otherwise each discovered checkout endpoint in turn until one is
    /// accepted.
    ///
    /// # Errors
    ///
    /// Cart fetch failures, or the form-discovery error when nothing worked.
    pub async fn begin_checkout(&self) -> Result<(), StorefrontError> {
        let cart = self.fetch_cart_page().await?;
        let (form, candidates) = {
            let page = Page::parse(&cart);
            match find_checkout_form(&page) {
                Ok(form) => (Ok(form), Vec::new()),
                Err(err) => (Err(err), checkout_candidates(&page)),
            }
        };

        match form {
            Ok(form) => {
                tracing::debug!(
                    action = %form.action,
                    method = %form.method,
                    fields = form.fields.len(),
                    has_csrf = form.field("csrf_token").is_some(),
                    "submitting checkout form"
                );
                self.submit_checkout_form(&form).await
            }
            Err(form_err) => {
                tracing::debug!(candidates = candidates.len(), "checkout form not found");
                for candidate in candidates {
                    tracing::debug!(
                        method = %candidate.method,
                        action = %candidate.action,
                        source = %candidate.source,
                        "trying checkout candidate"
                    );
                    let attempt = CheckoutForm {
                        action: candidate.action,
                        method: candidate.method,
                        fields: Vec::new(),
                    };
                    match self.submit_checkout_form(&attempt).await {
                        Ok(()) => return Ok(()),
                        Err(err) if err.is_deadline_exceeded() => return Err(err),
                        Err(err) => tracing::debug!(error = %err, "checkout candidate rejected"),
                    }
                }
                Err(form_err.into())
            }
        }
    }

    /// # Errors
    ///
    /// [`StorefrontError::InvalidInput`] without a shipment id or token;
    /// transport and status failures otherwise.
    pub async fn submit_shipping(&self, submission: &ShippingSubmission<'_>) -> Result<(), StorefrontError> {
        require_ids(submission.shipment_uuid, submission.csrf_token)?;
        let a = submission.address;
        let mut fields: Vec<(&str, &str)> = vec![
            ("originalShipmentUUID", submission.shipment_uuid),
            ("shipmentUUID", submission.shipment_uuid),
        ];
        if !submission.address_id.is_empty() {
            fields.push(("shipmentSelector", submission.address_id));
        }
        let prefix = "dwfrm_shipping_shippingAddress_addressFields_";
        let named = [
            ("firstName", a.first_name.as_str()),
            ("lastName", a.last_name.as_str()),
            ("floor", a.floor.as_str()),
            ("address1", a.address1.as_str()),
            ("address2", a.address2.as_str()),
            ("nearByLandMark", a.near_by_landmark.as_str()),
            ("country", a.country.as_str()),
            ("states_stateCode", a.state_code.as_str()),
            ("city", a.city.as_str()),
            ("postalCode", a.postal_code.as_str()),
            ("sector", ""),
            ("phone", a.phone.as_str()),
        ];
        let keys: Vec<String> = named.iter().map(|(k, _)| format!("{prefix}{k}")).collect();
        fields.extend(keys.iter().map(String::as_str).zip(named.iter().map(|(_, v)| *v)));
        fields.push(("dwfrm_shipping_shippingAddress_shippingMethodID", "001"));
        fields.push(("dwfrm_shipping_shippingAddress_giftMessage", ""));
        fields.push(("csrf_token", submission.csrf_token));
        if !submission.timeslot.is_empty() {
            fields.push(("timeslot", submission.timeslot));
        }
        if !a.latitude.is_empty() {
            fields.push(("latitude", a.latitude.as_str()));
        }
        if !a.longitude.is_empty() {
            fields.push(("longitude", a.longitude.as_str()));
        }

        let request = self
            .post("/submit-shipping-address")
            .header(CONTENT_TYPE, FORM_UTF8)
            .header("X-Requested-With", "XMLHttpRequest")
            .body(form_body(&fields));
        let response = self.send_checked("submit shipping", request).await?;
        self.read_body(response).await?;
        Ok(())
    }

    /// Selects the wallet as payment method.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::InvalidInput`] without a shipment id or token;
    /// transport and status failures otherwise.
    pub async fn submit_payment(&self, submission: &PaymentSubmission<'_>) -> Result<(), StorefrontError> {
        require_ids(submission.shipment_uuid, submission.csrf_token)?;
        let a = submission.address;
        let fields = [
            ("addressSelector", submission.shipment_uuid),
            ("dwfrm_billing_addressFields_firstName", a.first_name.as_str()),
            ("dwfrm_billing_addressFields_lastName", a.last_name.as_str()),
            ("dwfrm_billing_addressFields_address1", a.address1.as_str()),
            ("dwfrm_billing_addressFields_address2", a.address2.as_str()),
            ("dwfrm_billing_addressFields_country", a.country.as_str()),
            ("dwfrm_billing_addressFields_states_stateCode", a.state_code.as_str()),
            ("dwfrm_billing_addressFields_city", a.city.as_str()),
            ("dwfrm_billing_addressFields_postalCode", a.postal_code.as_str()),
            ("csrf_token", submission.csrf_token),
            ("localizedNewAddressTitle", "New Address"),
            ("dwfrm_billing_paymentMethod", "WALLET"),
        ];
        let request = self
            .post(&format!("{SITE_PREFIX}/CheckoutServices-SubmitPayment"))
            .header(CONTENT_TYPE, FORM_UTF8)
            .header("X-Requested-With", "XMLHttpRequest")
            .body(form_body(&fields));
        let response = self.send_checked("submit payment", request).await?;
        self.read_body(response).await?;
        Ok(())
    }

    /// Places the order on the wallet and returns the new order id. The
    /// redirect is inspected, never followed.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::OrderNotPlaced`] unless the answer is a redirect
    /// to the order-placed page carrying an id.
    pub async fn place_order(&self) -> Result<String, StorefrontError> {
        let request = self
            .no_redirect()
            .get(self.url(&format!("{SITE_PREFIX}/Wallet-WalletPlaceOrder")));
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let order_id = order_id_from_redirect(status, location.as_deref())?;
        tracing::info!(order_id = %order_id, "order placed");
        Ok(order_id)
    }
}
