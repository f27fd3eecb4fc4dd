use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

use super::{attr, css, first_match, Page, Strategy};
use crate::ExtractError;

static CSRF_INPUT: LazyLock<Selector> = LazyLock::new(|| css("input[name=csrf_token]"));
static CSRF_NAME_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name=["']csrf_token["']\s+value=["']([^"']+)["']"#).expect("valid regex")
});
static CSRF_VALUE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"value=["']([^"']+)["']\s+name=["']csrf_token["']"#).expect("valid regex")
});

static SHIPMENT_INPUT: LazyLock<Selector> =
    LazyLock::new(|| css("input[name=shipmentUUID][type=hidden]"));
static SHIPMENT_DATA: LazyLock<Selector> = LazyLock::new(|| css("[data-shipment-uuid]"));
static SHIPMENT_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"shipmentUUID["']?[^"'\w]*["']?([a-f0-9]{16,})"#).expect("valid regex")
});
static HEX_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{16,}$").expect("valid regex"));

static LOGIN_CSRF: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r#"name="csrf_token"\s+value="([^"]+)""#,
        r#"value="([^"]+)"\s+name="csrf_token""#,
        r#"data-csrf="([^"]+)""#,
        r#""csrf_token":"([^"]+)""#,
        r#"csrf_token=([^&"'\s]+)"#,
    ]
    .map(|p| Regex::new(p).expect("valid regex"))
});

const CSRF_STRATEGIES: &[Strategy<String>] = &[
    ("hidden-input", csrf_from_input),
    ("markup-name-value", csrf_name_value),
    ("markup-value-name", csrf_value_name),
];

const SHIPMENT_STRATEGIES: &[Strategy<String>] = &[
    ("hidden-input", shipment_from_input),
    ("data-attribute", shipment_from_data),
    ("markup-regex", shipment_from_markup),
];

/// The page's anti-forgery token: hidden input first, raw markup second.
///
/// # Errors
///
/// [`ExtractError::NotFound`] when no strategy yields a value.
pub fn csrf_token(page: &Page<'_>) -> Result<String, ExtractError> {
    first_match("csrf_token", page, CSRF_STRATEGIES)
        .ok_or(ExtractError::NotFound { field: "csrf_token" })
}

/// The in-progress shipment id. Only hex strings of 16+ characters are
/// accepted so an address id sitting in a similar field is never picked up.
///
/// # Errors
///
/// [`ExtractError::NotFound`] when no strategy yields a hex id.
pub fn shipment_uuid(page: &Page<'_>) -> Result<String, ExtractError> {
    first_match("shipment_uuid", page, SHIPMENT_STRATEGIES).ok_or(ExtractError::NotFound {
        field: "shipment_uuid",
    })
}

/// Token embedded in the home page or login popup, which use looser markup
/// than the checkout pages.
#[must_use]
pub fn login_csrf_token(raw: &str) -> Option<String> {
    LOGIN_CSRF.iter().find_map(|re| capture(re, raw))
}

/// `csrf.token` from a JSON error or popup payload.
#[must_use]
pub fn csrf_token_from_json(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/csrf/token")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn csrf_from_input(page: &Page<'_>) -> Option<String> {
    page.document()
        .select(&CSRF_INPUT)
        .find_map(|el| attr(el, "value"))
        .map(str::to_string)
}

fn csrf_name_value(page: &Page<'_>) -> Option<String> {
    capture(&CSRF_NAME_VALUE, page.raw())
}

fn csrf_value_name(page: &Page<'_>) -> Option<String> {
    capture(&CSRF_VALUE_NAME, page.raw())
}

fn shipment_from_input(page: &Page<'_>) -> Option<String> {
    hex_attr(page, &SHIPMENT_INPUT, "value")
}

fn shipment_from_data(page: &Page<'_>) -> Option<String> {
    hex_attr(page, &SHIPMENT_DATA, "data-shipment-uuid")
}

fn shipment_from_markup(page: &Page<'_>) -> Option<String> {
    capture(&SHIPMENT_MARKUP, page.raw())
}

fn hex_attr(page: &Page<'_>, selector: &Selector, name: &str) -> Option<String> {
    page.document()
        .select(selector)
        .filter_map(|el| attr(el, name))
        .find(|v| HEX_ID.is_match(v))
        .map(str::to_string)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
