use std::collections::HashSet;
use std::sync::LazyLock;

use bisleri_core::Address;
use regex::Regex;
use scraper::Selector;

use super::{attr, collapsed_text, css, Page};

const CARD_SELECTORS: [&str; 7] = [
    "[data-address-id]",
    "[data-addressid]",
    "[data-address_id]",
    ".address-card",
    ".addressCard",
    ".address-book-card",
    ".address-book",
];
const ID_ATTRS: [&str; 3] = ["data-address-id", "data-addressid", "data-address_id"];

static CARDS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| CARD_SELECTORS.iter().map(|s| css(s)).collect());
static ADDRESS_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"addressId["']?\s*[:=]\s*["']([^"']+)["']"#).expect("valid regex")
});
static POSTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{6})\b").expect("valid regex"));
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{10})\b").expect("valid regex"));

/// An address offered by the site, parsed as far as the markup allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCandidate {
    pub id: String,
    pub address: Address,
    pub is_default: bool,
    pub raw_text: String,
}

impl AddressCandidate {
    /// Menu label: the card text, or the id when the card had none.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.raw_text.is_empty() {
            &self.id
        } else {
            &self.raw_text
        }
    }
}

/// Address cards on the shipping page, each element reported once even if
/// several selectors hit it. Falls back to bare `addressId` values in
/// embedded script data.
#[must_use]
pub fn address_candidates(page: &Page<'_>) -> Vec<AddressCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for selector in CARDS.iter() {
        for card in page.document().select(selector) {
            if !seen.insert(card.id()) {
                continue;
            }
            let raw_text = collapsed_text(card);
            candidates.push(AddressCandidate {
                id: ID_ATTRS
                    .iter()
                    .find_map(|a| attr(card, a))
                    .unwrap_or_default()
                    .to_string(),
                address: parse_address_from_text(&raw_text),
                is_default: raw_text.to_lowercase().contains("default"),
                raw_text,
            });
        }
    }
    if candidates.is_empty() {
        candidates = ADDRESS_ID
            .captures_iter(page.raw())
            .filter_map(|c| c.get(1))
            .map(|m| AddressCandidate {
                id: m.as_str().to_string(),
                address: Address::default(),
                is_default: false,
                raw_text: String::new(),
            })
            .collect();
    }
    tracing::debug!(count = candidates.len(), "address candidates");
    candidates
}

/// Best-effort split of a free-text address card. The 10-digit phone and
/// 6-digit postal code anchor the split; anything still missing is left
/// empty for the caller to fill in.
#[must_use]
pub fn parse_address_from_text(text: &str) -> Address {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut address = Address::default();

    if let Some(m) = PHONE.captures(&text).and_then(|c| c.get(1)) {
        address.phone = m.as_str().to_string();
    }
    if let Some(m) = POSTAL.captures(&text).and_then(|c| c.get(1)) {
        address.postal_code = m.as_str().to_string();
    }

    let name_and_lines = if address.phone.is_empty() {
        text.as_str()
    } else {
        text.split(address.phone.as_str()).next().unwrap_or_default().trim()
    };
    let mut words = name_and_lines.split_whitespace();
    if let (Some(first), Some(last)) = (words.next(), words.next()) {
        address.first_name = first.trim_matches(',').to_string();
        address.last_name = last.trim_matches(',').to_string();
    }
    address.address1 = name_and_lines.to_string();

    if !address.postal_code.is_empty() {
        if let Some(idx) = text.find(address.postal_code.as_str()).filter(|&i| i > 0) {
            let parts: Vec<&str> = text[..idx].trim().split(',').collect();
            if parts.len() >= 2 {
                address.city = parts[parts.len() - 2].trim().to_string();
                if let Some(state) = parts[parts.len() - 1].split_whitespace().next() {
                    address.state_code = state.to_string();
                }
            }
        }
    }
    address.country = "IN".to_string();
    address
}
