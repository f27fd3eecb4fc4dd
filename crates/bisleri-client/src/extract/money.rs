use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::Selector;

use super::{collapsed_text, css, first_match, Page, Strategy};
use crate::ExtractError;

static GRAND_TOTAL: LazyLock<Selector> = LazyLock::new(|| css(".grand-total-sum"));
static WALLET_CLASS: LazyLock<Selector> =
    LazyLock::new(|| css(".wallet-balance, .wallet-amount, .bisleri-wallet-balance"));
static PRICE_CONTAINERS: LazyLock<Selector> = LazyLock::new(|| css("div, span, p, label"));

static WALLET_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Bisleri Wallet.*?₹\s*([0-9][0-9.,]*)").expect("valid regex")
});
static TOTAL_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Total\s*:?\s*₹\s*([0-9][0-9.,]*)").expect("valid regex"));
static PAYABLE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Payable\s*:?\s*₹\s*([0-9][0-9.,]*)").expect("valid regex")
});
static AMOUNT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Amount\s*:?\s*₹\s*([0-9][0-9.,]*)").expect("valid regex"));
static RUPEE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"₹\s*([0-9][0-9.,]*)").expect("valid regex"));

const WALLET_STRATEGIES: &[Strategy<String>] = &[
    ("wallet-class", wallet_from_class),
    ("wallet-label", wallet_from_label),
];

const TOTAL_STRATEGIES: &[Strategy<String>] = &[
    ("grand-total-class", total_from_class),
    ("total-label", total_from_total_label),
    ("payable-label", total_from_payable_label),
    ("amount-label", total_from_amount_label),
    ("labelled-element", total_from_labelled_element),
];

/// Parses a rupee string such as `₹1,234.50` or `Rs. 99`.
///
/// # Errors
///
/// [`ExtractError::InvalidAmount`] for empty, negative or non-numeric
/// input. Nothing is ever coerced to zero.
pub fn parse_inr_amount(value: &str) -> Result<Decimal, ExtractError> {
    let invalid = || ExtractError::InvalidAmount {
        raw: value.to_string(),
    };
    let trimmed = value.trim();
    let trimmed = trimmed
        .strip_prefix('₹')
        .or_else(|| trimmed.strip_prefix("Rs."))
        .or_else(|| trimmed.strip_prefix("INR"))
        .unwrap_or(trimmed);
    let clean: String = trimmed.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    let clean = clean.trim_end_matches('.');

    let well_formed = !clean.is_empty()
        && clean.chars().any(|c| c.is_ascii_digit())
        && clean.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !well_formed {
        return Err(invalid());
    }
    Decimal::from_str(clean).map_err(|_| invalid())
}

/// Renders an amount the way the site does: `₹250`, `₹99.5`.
#[must_use]
pub fn format_inr(amount: Decimal) -> String {
    format!("₹{}", amount.round_dp(2).normalize())
}

/// Raw wallet balance text (`₹…`) if the page shows one.
#[must_use]
pub fn wallet_balance(page: &Page<'_>) -> Option<String> {
    first_match("wallet_balance", page, WALLET_STRATEGIES)
}

/// Raw order total text (`₹…`) if the page shows one.
#[must_use]
pub fn order_total(page: &Page<'_>) -> Option<String> {
    first_match("order_total", page, TOTAL_STRATEGIES)
}

fn rupees(amount: &str) -> String {
    format!("₹{amount}")
}

fn class_amount(page: &Page<'_>, selector: &Selector) -> Option<String> {
    page.document()
        .select(selector)
        .map(collapsed_text)
        .find(|text| text.chars().any(|c| c.is_ascii_digit()))
}

fn labelled(re: &Regex, raw: &str) -> Option<String> {
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| rupees(m.as_str()))
}

fn wallet_from_class(page: &Page<'_>) -> Option<String> {
    class_amount(page, &WALLET_CLASS)
}

fn wallet_from_label(page: &Page<'_>) -> Option<String> {
    labelled(&WALLET_LABEL, page.raw())
}

fn total_from_class(page: &Page<'_>) -> Option<String> {
    class_amount(page, &GRAND_TOTAL)
}

fn total_from_total_label(page: &Page<'_>) -> Option<String> {
    labelled(&TOTAL_LABEL, page.raw())
}

fn total_from_payable_label(page: &Page<'_>) -> Option<String> {
    labelled(&PAYABLE_LABEL, page.raw())
}

fn total_from_amount_label(page: &Page<'_>) -> Option<String> {
    labelled(&AMOUNT_LABEL, page.raw())
}

/// The tightest element whose text mentions both a rupee amount and
/// "total"/"payable".
fn total_from_labelled_element(page: &Page<'_>) -> Option<String> {
    page.document()
        .select(&PRICE_CONTAINERS)
        .map(collapsed_text)
        .filter(|text| {
            let lower = text.to_lowercase();
            text.contains('₹') && (lower.contains("total") || lower.contains("payable"))
        })
        .min_by_key(String::len)
        .and_then(|text| labelled(&RUPEE_AMOUNT, &text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn parses_common_shapes() {
        assert_eq!(parse_inr_amount("₹250").unwrap(), dec("250"));
        assert_eq!(parse_inr_amount(" ₹ 1,234.50 ").unwrap(), dec("1234.50"));
        assert_eq!(parse_inr_amount("Rs. 99").unwrap(), dec("99"));
        assert_eq!(parse_inr_amount("120.").unwrap(), dec("120"));
    }

    #[test]
    fn rejects_empty_negative_and_text() {
        for raw in ["", "₹", "  ", "₹-20", "free", "₹12abc", "₹.", "1.2.3"] {
            assert!(
                parse_inr_amount(raw).is_err(),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn formatted_amounts_parse_back() {
        for raw in ["250", "99.5", "1234.56", "0.01"] {
            let amount = dec(raw);
            assert_eq!(parse_inr_amount(&format_inr(amount)).unwrap(), amount);
        }
    }

    #[test]
    fn order_total_prefers_grand_total_class() {
        let html = r#"<div>Subtotal: ₹180</div><span class="grand-total-sum">₹200.00</span>"#;
        assert_eq!(order_total(&Page::parse(html)).as_deref(), Some("₹200.00"));
    }

    #[test]
    fn order_total_from_payable_label() {
        let html = "<p>Amount Payable: ₹ 1,150</p>";
        assert_eq!(order_total(&Page::parse(html)).as_deref(), Some("₹1,150"));
    }

    #[test]
    fn order_total_from_labelled_element() {
        let html = r#"<div><label>Grand total</label> <b>₹ 300</b></div>"#;
        assert_eq!(order_total(&Page::parse(html)).as_deref(), Some("₹300"));
    }

    #[test]
    fn order_total_absent() {
        assert!(order_total(&Page::parse("<p>Your cart</p>")).is_none());
    }

    #[test]
    fn wallet_balance_from_label() {
        let html = r#"<div class="pay-option"><span>Bisleri Wallet</span><span class="bal">₹ 1,020.00</span></div>"#;
        assert_eq!(wallet_balance(&Page::parse(html)).as_deref(), Some("₹1,020.00"));
        assert!(wallet_balance(&Page::parse("<p>UPI</p>")).is_none());
    }
}
