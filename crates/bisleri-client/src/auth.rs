//! OTP credential acquisition.
//!
//! The flow runs on a fresh [`StorefrontClient`] so the session cookies the
//! site hands out land in its jar, from where they are exported into the
//! profile.

use bisleri_core::{Prompter, StoredCookie};
use reqwest::header::{ACCEPT, CONTENT_TYPE, ORIGIN, REFERER};
use serde_json::Value;

use crate::client::SITE_PREFIX;
use crate::extract::{csrf_token_from_json, login_csrf_token};
use crate::{StorefrontClient, StorefrontError};

const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const FORM_UTF8: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const RESEND: &str = "r";

/// Reduces user input to the 10-digit national number: spaces and dashes
/// are dropped, and a `+91`/`91` prefix only when the input is too long to
/// be a bare number.
///
/// # Errors
///
/// [`StorefrontError::InvalidInput`] unless exactly 10 digits remain.
pub fn normalize_phone(raw: &str) -> Result<String, StorefrontError> {
    let mut phone: String = raw.chars().filter(|c| *c != ' ' && *c != '-').collect();
    if phone.len() == 13 && phone.starts_with("+91") {
        phone.drain(..3);
    } else if phone.len() == 12 && phone.starts_with("91") {
        phone.drain(..2);
    }
    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StorefrontError::InvalidInput(format!(
            "invalid phone number: must be 10 digits, got {}",
            phone.chars().count()
        )));
    }
    Ok(phone)
}

fn snippet(body: &str) -> &str {
    let end = (200..=body.len())
        .find(|&i| body.is_char_boundary(i))
        .unwrap_or(body.len());
    body[..end].trim()
}

impl StorefrontClient {
    fn ajax(&self, path: &str) -> reqwest::RequestBuilder {
        self.post(path)
            .header(CONTENT_TYPE, FORM_UTF8)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ACCEPT, JSON_ACCEPT)
            .header(ORIGIN, self.base_url())
            .header(REFERER, self.url("/"))
    }

    /// Token needed by the OTP endpoints: scraped from the home page, else
    /// from the login popup's JSON, else from that popup's markup.
    ///
    /// # Errors
    ///
    /// [`StorefrontError::Login`] when no source carries a token.
    pub async fn login_csrf_token(&self) -> Result<String, StorefrontError> {
        let home = self.send(self.get("/home").header(ACCEPT, HTML_ACCEPT)).await?;
        let body = self.read_body(home).await?;
        if let Some(token) = login_csrf_token(&body) {
            return Ok(token);
        }

        let popup = self
            .get(&format!("{SITE_PREFIX}/Account-ShowLoginPopUp"))
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ACCEPT, JSON_ACCEPT);
        let popup = self.send(popup).await?;
        let body = self.read_body(popup).await?;
        csrf_token_from_json(&body)
            .or_else(|| login_csrf_token(&body))
            .ok_or_else(|| StorefrontError::Login("could not find CSRF token".into()))
    }

    /// # Errors
    ///
    /// [`StorefrontError::Login`] when the site refuses to send the code.
    pub async fn send_otp(&self, phone: &str, csrf_token: &str) -> Result<(), StorefrontError> {
        let request = self
            .ajax(&format!("{SITE_PREFIX}/Account-SendOTP"))
            .body(crate::client::form_body(&[
                ("mobileNumber", phone),
                ("csrf_token", csrf_token),
            ]));
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = self.read_body(response).await?;
        if status >= 400 {
            return Err(StorefrontError::Login(format!(
                "server returned HTTP {status}: {}",
                snippet(&body)
            )));
        }
        if let Ok(json) = serde_json::from_str::<Value>(&body) {
            let result = json
                .pointer("/response/Status")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if result != "Success" {
                return Err(StorefrontError::Login(format!("OTP send failed: {result}")));
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`StorefrontError::Login`] for a rejected code.
    pub async fn verify_otp(&self, phone: &str, otp: &str, csrf_token: &str) -> Result<(), StorefrontError> {
        let request = self
            .ajax(&format!("{SITE_PREFIX}/Account-CheckCustomer"))
            .body(crate::client::form_body(&[
                ("mobileNumber", phone),
                ("OTP", otp),
                ("csrf_token", csrf_token),
            ]));
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = self.read_body(response).await?;
        if status >= 400 {
            return Err(StorefrontError::Login(format!("verification failed: HTTP {status}")));
        }
        if let Ok(json) = serde_json::from_str::<Value>(&body) {
            if json.get("error").and_then(Value::as_bool) == Some(true) {
                let message = json.get("message").and_then(Value::as_str).unwrap_or_default();
                return Err(StorefrontError::Login(format!(
                    "OTP verification failed: {message}"
                )));
            }
        }
        Ok(())
    }
}

/// Logs in by SMS code and returns the session cookies, already verified
/// against the account page. Answering `r` at the code prompt requests a
/// new code.
///
/// # Errors
///
/// [`StorefrontError::Login`] for any refused step,
/// [`StorefrontError::Prompt`] if input ends.
pub async fn login_with_otp<P: Prompter>(
    client: &StorefrontClient,
    prompter: &P,
    phone: &str,
) -> Result<Vec<StoredCookie>, StorefrontError> {
    prompter.notify("Connecting to Bisleri...");
    let csrf = client.login_csrf_token().await?;

    prompter.notify(&format!("Sending OTP to +91{phone}..."));
    client.send_otp(phone, &csrf).await?;
    prompter.notify("OTP sent successfully!");

    let otp = loop {
        let answer = prompter.ask("Enter OTP (or 'r' to resend)").await?;
        if answer.eq_ignore_ascii_case(RESEND) {
            client.send_otp(phone, &csrf).await?;
            prompter.notify("OTP re-sent.");
            continue;
        }
        break answer;
    };
    if otp.len() != 6 || !otp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StorefrontError::Login("OTP must be 6 digits".into()));
    }

    prompter.notify("Verifying OTP...");
    client.verify_otp(phone, &otp, &csrf).await?;

    let cookies = client.export_cookies();
    if cookies.is_empty() {
        return Err(StorefrontError::Login(
            "no session cookies received after login".into(),
        ));
    }
    client.verify_authenticated().await.map_err(|e| {
        StorefrontError::Login(format!("login succeeded but session invalid: {e}"))
    })?;
    prompter.notify("Login successful!");
    tracing::info!(cookies = cookies.len(), "OTP login complete");
    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalisation() {
        assert_eq!(normalize_phone("98765 43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("+91-98765-43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("919876543210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("9198765432").unwrap(), "9198765432");
    }

    #[test]
    fn phone_wrong_length_reports_count() {
        let err = normalize_phone("12345").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: invalid phone number: must be 10 digits, got 5"
        );
        assert!(normalize_phone("98765abcde").is_err());
    }
}
