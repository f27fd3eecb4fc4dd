//! Cart and delivery-location endpoints.

use bisleri_core::Address;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;

use super::{StorefrontClient, SITE_PREFIX};
use crate::extract::csrf_token_from_json;
use crate::StorefrontError;

const FORM_UTF8: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const AJAX: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

impl StorefrontClient {
    /// Adds `quantity` units of `product_id` as a new cart line.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::InvalidInput`] for a zero quantity, otherwise
    /// transport and status failures.
    pub async fn add_product(&self, product_id: &str, quantity: u32) -> Result<(), StorefrontError> {
        if quantity == 0 {
            return Err(StorefrontError::InvalidInput(
                "quantity must be positive".into(),
            ));
        }
        let form = [
            ("pid", product_id.to_string()),
            ("quantity", quantity.to_string()),
            ("options", "[]".to_string()),
        ];
        let request = self.post("/add-product").header(AJAX.0, AJAX.1).form(&form);
        self.send_checked("add product", request).await?;
        Ok(())
    }

    /// Sets how many empty jars go back with the delivery.
    ///
    /// # Errors
    ///
    /// Transport and status failures.
    pub async fn update_jar_quantity(&self, quantity: u32) -> Result<(), StorefrontError> {
        let request = self
            .get(&format!("{SITE_PREFIX}/Cart-UpdateJarQuantity"))
            .query(&[("jarQuantity", quantity.to_string())])
            .header(AJAX.0, AJAX.1);
        self.send_checked("update jar quantity", request).await?;
        Ok(())
    }

    /// Changes the quantity of an existing cart line.
    ///
    /// # Errors
    ///
    /// Transport and status failures.
    pub async fn update_quantity(
        &self,
        product_id: &str,
        uuid: &str,
        quantity: u32,
    ) -> Result<(), StorefrontError> {
        let request = self
            .get(&format!("{SITE_PREFIX}/Cart-UpdateQuantity"))
            .query(&[
                ("pid", product_id.to_string()),
                ("quantity", quantity.to_string()),
                ("uuid", uuid.to_string()),
            ])
            .header(AJAX.0, AJAX.1);
        self.send_checked("update quantity", request).await?;
        Ok(())
    }

    /// Selects the delivery city for the session.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::InvalidInput`] for a blank city, otherwise
    /// transport and status failures.
    pub async fn set_city_location(&self, city: &str) -> Result<(), StorefrontError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(StorefrontError::InvalidInput(
                "city is required to set location".into(),
            ));
        }
        let body = form_body(&[("city", city)]);
        let request = self
            .post(&format!("{SITE_PREFIX}/LocationSelector-SetCityLocation"))
            .header(CONTENT_TYPE, FORM_UTF8)
            .header(AJAX.0, AJAX.1)
            .body(body);
        self.send_checked("LocationSelector-SetCityLocation", request)
            .await?;
        Ok(())
    }

    /// Points the delivery location at a saved address. A rejected first
    /// attempt whose JSON body carries a fresh CSRF token is retried once
    /// with that token.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::InvalidInput`] without an address id, a failure
    /// reading the rejection body (including the run deadline), otherwise
    /// the status of the final attempt.
    pub async fn set_saved_address_location(
        &self,
        address: &Address,
        address_id: &str,
    ) -> Result<(), StorefrontError> {
        const LABEL: &str = "LocationSelector-SetSavedAddressLocation";
        if address_id.trim().is_empty() {
            return Err(StorefrontError::InvalidInput(
                "address ID is required to set saved address location".into(),
            ));
        }
        let full_name = address.full_name();
        let fields = [
            ("address1", address.address1.as_str()),
            ("address2", address.address2.as_str()),
            ("city", address.city.as_str()),
            ("stateCode", address.state_code.as_str()),
            ("countryCode", address.country.as_str()),
            ("postalCode", address.postal_code.as_str()),
            ("addressID", address_id),
            ("fullName", full_name.as_str()),
        ];
        let path = format!("{SITE_PREFIX}/{LABEL}");
        let build = |fields: &[(&str, &str)]| {
            self.post(&path)
                .header(CONTENT_TYPE, FORM_UTF8)
                .header(AJAX.0, AJAX.1)
                .body(form_body(fields))
        };

        let response = self.send(build(&fields)).await?;
        let status = response.status().as_u16();
        if status < 400 {
            return Ok(());
        }
        let body = self.read_body(response).await?;
        let Some(token) = csrf_token_from_json(&body) else {
            return Err(StorefrontError::Status {
                path: LABEL.into(),
                status,
            });
        };
        tracing::debug!(status, "saved-address location rejected, retrying with fresh csrf token");
        let retry: Vec<(&str, &str)> = fields
            .iter()
            .copied()
            .chain([("csrf_token", token.as_str())])
            .collect();
        self.send_checked(LABEL, build(&retry)).await?;
        Ok(())
    }
}

const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'*');

/// Urlencoded body for endpoints that want an explicit UTF-8 charset, which
/// `RequestBuilder::form` does not send.
pub(crate) fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, FORM_VALUE),
                utf8_percent_encode(v, FORM_VALUE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
