use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Selector};

use super::{attr, collapsed_text, css, first_match, window, Page, Strategy};

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: String,
    pub uuid: String,
    /// Zero means the quantity could not be read, not an empty line.
    pub quantity: u32,
}

const WINDOW_RADIUS: usize = 800;
const PRODUCT_ID_ATTRS: [&str; 5] = [
    "data-pid",
    "data-product-id",
    "data-productid",
    "data-itemid",
    "data-product",
];

static LINE_ITEM: LazyLock<Selector> = LazyLock::new(|| css("[data-uuid]"));
static LINK: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| css("input"));

static PRODUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BIS-[A-Z0-9-]+").expect("valid regex"));
static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)quantity[^0-9]{0,6}([0-9]{1,2})").expect("valid regex"));
static UUID_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(data-uuid|uuid)[^a-z0-9]{0,10}([a-f0-9]{10,})").expect("valid regex")
});
static UPDATE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Cart-UpdateQuantity\?[^"'\s]+"#).expect("valid regex"));
static COUNT_CART_ITEMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Cart\s*(\d+)\s*Items").expect("valid regex"));
static COUNT_ITEMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*Item\(s\)").expect("valid regex"));

/// Ordered from most to least reliable.
const ITEM_STRATEGIES: &[Strategy<Vec<CartItem>>] = &[
    ("line-item-elements", items_from_elements),
    ("update-quantity-urls", items_from_update_urls),
    ("windowed-regex", items_from_windows),
];

/// Parses cart lines, falling back to weaker strategies when a stronger one
/// finds nothing. An empty result does not mean an empty cart; compare with
/// [`cart_count`].
#[must_use]
pub fn cart_items(page: &Page<'_>) -> Vec<CartItem> {
    first_match("cart_items", page, ITEM_STRATEGIES).unwrap_or_default()
}

/// The item count the page advertises, if it advertises one.
#[must_use]
pub fn cart_count(page: &Page<'_>) -> Option<u32> {
    [&*COUNT_CART_ITEMS, &*COUNT_ITEMS].iter().find_map(|re| {
        re.captures(page.raw())
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

#[must_use]
pub fn find_cart_item<'i>(items: &'i [CartItem], product_id: &str) -> Option<&'i CartItem> {
    items
        .iter()
        .find(|item| item.product_id.eq_ignore_ascii_case(product_id))
}

fn items_from_elements(page: &Page<'_>) -> Option<Vec<CartItem>> {
    let items: Vec<CartItem> = page
        .document()
        .select(&LINE_ITEM)
        .filter_map(|el| {
            let uuid = attr(el, "data-uuid")?.to_string();
            Some(CartItem {
                product_id: element_product_id(el).unwrap_or_default(),
                uuid,
                quantity: element_quantity(el),
            })
        })
        .collect();
    (!items.is_empty()).then_some(items)
}

fn element_product_id(el: ElementRef<'_>) -> Option<String> {
    if let Some(id) = PRODUCT_ID_ATTRS.iter().find_map(|name| attr(el, name)) {
        return Some(id.to_string());
    }
    let from_link = el
        .select(&LINK)
        .filter_map(|link| attr(link, "href"))
        .find_map(|href| PRODUCT_ID.find(href));
    if let Some(m) = from_link {
        return Some(m.as_str().to_string());
    }
    PRODUCT_ID
        .find(&el.inner_html())
        .map(|m| m.as_str().to_string())
}

fn element_quantity(el: ElementRef<'_>) -> u32 {
    let from_input = el
        .select(&INPUT)
        .next()
        .and_then(|input| attr(input, "value"))
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&q| q > 0);
    if let Some(quantity) = from_input {
        return quantity;
    }
    [el.inner_html(), collapsed_text(el).to_lowercase()]
        .iter()
        .find_map(|text| quantity_near(text))
        .unwrap_or(0)
}

fn quantity_near(text: &str) -> Option<u32> {
    QUANTITY
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn items_from_update_urls(page: &Page<'_>) -> Option<Vec<CartItem>> {
    let items: Vec<CartItem> = UPDATE_URL
        .find_iter(page.raw())
        .filter_map(|m| {
            let (_, query) = m.as_str().split_once('?')?;
            let query = query.replace("&amp;", "&");
            let url = Url::parse(&format!("http://cart.invalid/?{query}")).ok()?;
            let mut pid = String::new();
            let mut uuid = String::new();
            let mut quantity = 0;
            for (key, value) in url.query_pairs() {
                match key.as_ref() {
                    "pid" => pid = value.into_owned(),
                    "uuid" => uuid = value.into_owned(),
                    "quantity" => quantity = value.parse().unwrap_or(0),
                    _ => {}
                }
            }
            (!pid.is_empty() && !uuid.is_empty()).then_some(CartItem {
                product_id: pid,
                uuid,
                quantity,
            })
        })
        .collect();
    (!items.is_empty()).then_some(items)
}

fn items_from_windows(page: &Page<'_>) -> Option<Vec<CartItem>> {
    let raw = page.raw();
    let items: Vec<CartItem> = UUID_TOKEN
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let uuid = caps.get(2)?.as_str().to_string();
            let near = window(raw, whole.start(), whole.end(), WINDOW_RADIUS);
            Some(CartItem {
                product_id: PRODUCT_ID
                    .find(near)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                uuid,
                quantity: quantity_near(near).unwrap_or(0),
            })
        })
        .collect();
    (!items.is_empty()).then_some(items)
}
