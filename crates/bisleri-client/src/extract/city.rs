use std::sync::LazyLock;

use scraper::Selector;

use super::{attr, css, Page};

static SELECTED: LazyLock<Selector> = LazyLock::new(|| css("select#citySelect option[selected]"));
static OPTIONS: LazyLock<Selector> = LazyLock::new(|| css("select#citySelect option"));

/// The delivery city the cart page has already selected, if any.
#[must_use]
pub fn selected_city(page: &Page<'_>) -> Option<String> {
    page.document()
        .select(&SELECTED)
        .next()
        .and_then(|opt| attr(opt, "value"))
        .map(str::to_string)
}

/// Cities offered by the location selector, in page order without repeats.
#[must_use]
pub fn city_options(page: &Page<'_>) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for value in page.document().select(&OPTIONS).filter_map(|o| attr(o, "value")) {
        if !options.iter().any(|o| o == value) {
            options.push(value.to_string());
        }
    }
    options
}
