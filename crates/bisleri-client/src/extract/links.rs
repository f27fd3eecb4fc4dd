use std::sync::LazyLock;

use scraper::Selector;

use super::{attr, collapsed_text, css, Page};

static LINKS: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));

/// The first link whose text or target mentions logging out.
#[must_use]
pub fn logout_link(page: &Page<'_>) -> Option<String> {
    page.document().select(&LINKS).find_map(|a| {
        let href = attr(a, "href")?;
        let hit = href.to_ascii_lowercase().contains("logout")
            || collapsed_text(a).to_lowercase().contains("logout");
        hit.then(|| href.to_string())
    })
}
