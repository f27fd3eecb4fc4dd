use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{attr, collapsed_text, css, tokens, Page};
use crate::ExtractError;

static FORM: LazyLock<Selector> = LazyLock::new(|| css("form"));
static CSRF_INPUT: LazyLock<Selector> = LazyLock::new(|| css("input[name=csrf_token]"));
static CONTROLS: LazyLock<Selector> = LazyLock::new(|| css("input, button"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| css("input"));
static BUTTON: LazyLock<Selector> = LazyLock::new(|| css("button"));
static LINK: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));

static ENDPOINTS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        r#"(?i)(/on/demandware\.store/[^"'\s]*Checkout-[A-Za-z]+[^"'\s]*)"#,
        r#"(?i)(/checkout[^"'\s]*)"#,
    ]
    .map(|p| Regex::new(p).expect("valid regex"))
});

const DATA_ATTRS: [&str; 4] = ["data-url", "data-action", "formaction", "href"];

/// A form scraped from the cart page, ready to resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutForm {
    pub action: String,
    pub method: String,
    pub fields: Vec<(String, String)>,
}

impl CheckoutForm {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Form,
    Link,
    DataAttribute,
    Markup,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Form => "form",
            Self::Link => "link",
            Self::DataAttribute => "data-attr",
            Self::Markup => "regex",
        })
    }
}

/// A checkout endpoint found without a usable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCandidate {
    pub action: String,
    pub method: String,
    pub source: CandidateSource,
}

fn is_checkout_action(action: &str) -> bool {
    let lower = action.trim().to_ascii_lowercase();
    lower.contains("checkout") || lower.contains("cart-submitform")
}

fn score(form: ElementRef<'_>) -> i32 {
    let mut score = 0;
    if attr(form, "action").is_some_and(is_checkout_action) {
        score += 2;
    }
    let named_checkout = ["id", "name"]
        .iter()
        .filter_map(|a| attr(form, a))
        .any(|v| v.to_ascii_lowercase().contains("checkout"));
    if named_checkout {
        score += 1;
    }
    if form.select(&CSRF_INPUT).next().is_some() {
        score += 1;
    }
    let checkout_control = form.select(&CONTROLS).any(|el| {
        attr(el, "name").is_some_and(|n| n.to_ascii_lowercase().contains("checkout"))
            || collapsed_text(el).to_lowercase().contains("checkout")
    });
    if checkout_control {
        score += 3;
    }
    score
}

/// Picks the best-scoring form on the cart page.
///
/// # Errors
///
/// [`ExtractError::NotFound`] if no form scores above zero.
pub fn find_checkout_form(page: &Page<'_>) -> Result<CheckoutForm, ExtractError> {
    let not_found = ExtractError::NotFound {
        field: "checkout_form",
    };
    let mut best: Option<(i32, ElementRef<'_>)> = None;
    for form in page.document().select(&FORM) {
        let s = score(form);
        if best.is_none_or(|(top, _)| s > top) {
            best = Some((s, form));
        }
    }
    let (top, form) = best.ok_or(not_found.clone())?;
    if top <= 0 {
        return Err(not_found);
    }
    tracing::debug!(score = top, "checkout form selected");

    let mut fields = Vec::new();
    for input in form.select(&INPUT) {
        let Some(name) = attr(input, "name") else {
            continue;
        };
        let kind = attr(input, "type").unwrap_or("text").to_ascii_lowercase();
        if kind == "checkbox" && input.value().attr("checked").is_none() {
            continue;
        }
        if kind == "submit" && !name.to_ascii_lowercase().contains("checkout") {
            continue;
        }
        let value = input.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }
    for button in form.select(&BUTTON) {
        let Some(name) = attr(button, "name") else {
            continue;
        };
        if name.to_ascii_lowercase().contains("checkout")
            || collapsed_text(button).to_lowercase().contains("checkout")
        {
            let value = button.value().attr("value").unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }
    }

    let form_csrf = fields
        .iter()
        .any(|(k, v)| k == "csrf_token" && !v.is_empty());
    if !form_csrf {
        if let Ok(token) = tokens::csrf_token(page) {
            fields.retain(|(k, _)| k != "csrf_token");
            fields.push(("csrf_token".to_string(), token));
        }
    }

    Ok(CheckoutForm {
        action: attr(form, "action").unwrap_or_default().to_string(),
        method: attr(form, "method")
            .unwrap_or("POST")
            .to_ascii_uppercase(),
        fields,
    })
}

/// Every other checkout-looking endpoint on the page, in discovery order
/// and de-duplicated by method and URL.
#[must_use]
pub fn checkout_candidates(page: &Page<'_>) -> Vec<CheckoutCandidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut add = |action: &str, method: Option<&str>, source: CandidateSource| {
        let action = action.trim();
        if action.is_empty() {
            return;
        }
        let method = method
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("GET")
            .to_ascii_uppercase();
        if seen.insert(format!("{method} {action}")) {
            out.push(CheckoutCandidate {
                action: action.to_string(),
                method,
                source,
            });
        }
    };

    let doc = page.document();
    for form in doc.select(&FORM) {
        if let Some(action) = attr(form, "action").filter(|a| is_checkout_action(a)) {
            add(action, attr(form, "method"), CandidateSource::Form);
        }
    }
    for link in doc.select(&LINK) {
        if let Some(href) = attr(link, "href").filter(|h| h.to_ascii_lowercase().contains("checkout")) {
            add(href, None, CandidateSource::Link);
        }
    }
    for control in doc.select(&CONTROLS) {
        for name in DATA_ATTRS {
            if let Some(url) = attr(control, name).filter(|u| u.to_ascii_lowercase().contains("checkout")) {
                add(url, attr(control, "data-method"), CandidateSource::DataAttribute);
            }
        }
    }
    for re in ENDPOINTS.iter() {
        for caps in re.captures_iter(page.raw()) {
            if let Some(m) = caps.get(1) {
                add(&m.as_str().replace("&amp;", "&"), None, CandidateSource::Markup);
            }
        }
    }
    out
}
