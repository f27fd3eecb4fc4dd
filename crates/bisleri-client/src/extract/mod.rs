//! Page extractor.
//!
//! Each extraction is an ordered list of named strategies tried against one
//! parsed page until one yields a value. Strategies are independent of each
//! other, so each one can be exercised against a fixture on its own.

pub mod address;
pub mod cart;
pub mod checkout_form;
pub mod city;
pub mod links;
pub mod money;
pub mod orders;
pub mod tokens;

use scraper::{ElementRef, Html, Selector};

pub use address::{address_candidates, parse_address_from_text, AddressCandidate};
pub use cart::{cart_count, cart_items, find_cart_item, CartItem};
pub use checkout_form::{
    checkout_candidates, find_checkout_form, CandidateSource, CheckoutCandidate, CheckoutForm,
};
pub use city::{city_options, selected_city};
pub use links::logout_link;
pub use money::{format_inr, order_total, parse_inr_amount, wallet_balance};
pub use orders::{order_summaries, OrderSummary};
pub use tokens::{csrf_token, csrf_token_from_json, login_csrf_token, shipment_uuid};

/// A response body parsed once, with the raw markup kept for regex
/// strategies.
///
/// `Html` is not `Send`; build a `Page` after the last `.await` that needs
/// the body and drop it before the next one.
pub struct Page<'a> {
    raw: &'a str,
    doc: Html,
}

impl<'a> Page<'a> {
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            doc: Html::parse_document(raw),
        }
    }

    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    #[must_use]
    pub fn document(&self) -> &Html {
        &self.doc
    }
}

/// One named extraction strategy.
pub type Strategy<T> = (&'static str, fn(&Page<'_>) -> Option<T>);

/// Runs `strategies` in order and returns the first hit.
pub fn first_match<T>(field: &'static str, page: &Page<'_>, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|(name, strategy)| {
        let value = strategy(page)?;
        tracing::debug!(field, strategy = *name, "extracted");
        Some(value)
    })
}

/// Compiles a selector literal. Only called from `LazyLock` initialisers.
pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn attr<'e>(el: ElementRef<'e>, name: &str) -> Option<&'e str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Byte window `[pos - radius, end + radius]` around a match, snapped
/// outward-in to UTF-8 char boundaries.
pub(crate) fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let candidate_start = start.saturating_sub(radius);
    let from = (candidate_start..=start)
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(start);
    let candidate_end = (end + radius).min(text.len());
    let to = (candidate_end..=text.len())
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(text.len());
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &Page<'_>) -> Option<u32> {
        None
    }

    fn seven(_: &Page<'_>) -> Option<u32> {
        Some(7)
    }

    fn nine(_: &Page<'_>) -> Option<u32> {
        Some(9)
    }

    #[test]
    fn first_match_skips_misses_and_stops_at_first_hit() {
        let page = Page::parse("<p>x</p>");
        let strategies: [Strategy<u32>; 3] = [("none", none), ("seven", seven), ("nine", nine)];
        assert_eq!(first_match("n", &page, &strategies), Some(7));
        assert_eq!(first_match("n", &page, &strategies[..1]), None);
    }

    #[test]
    fn window_snaps_to_char_boundaries() {
        let text = "₹₹₹abc₹₹₹";
        let pos = text.find("abc").unwrap();
        let w = window(text, pos, pos + 3, 4);
        assert!(w.contains("abc"));
        assert!(w.len() <= 3 + 2 * 4 + 4);
    }

    #[test]
    fn collapsed_text_joins_nested_nodes() {
        let page = Page::parse("<div id='a'>  Hello\n <b>big</b>   world </div>");
        let sel = Selector::parse("#a").unwrap();
        let el = page.document().select(&sel).next().unwrap();
        assert_eq!(collapsed_text(el), "Hello big world");
    }
}
