use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{collapsed_text, css, Page};

static ORDER_BLOCK: LazyLock<Selector> = LazyLock::new(|| css(".all-order"));
static ORDER_SECTION: LazyLock<Selector> = LazyLock::new(|| css(".order-section"));
static ORDER_DATE: LazyLock<Selector> = LazyLock::new(|| css(".order-date"));
static DIV: LazyLock<Selector> = LazyLock::new(|| css("div"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| css("span"));
static ROW_COLUMN: LazyLock<Selector> = LazyLock::new(|| css(".row div"));
static ITEMS: LazyLock<Selector> = LazyLock::new(|| css(".one-time-order"));
static ORDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BS-[A-Z0-9-]+").expect("valid regex"));

/// One row of the order-history page, as displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSummary {
    pub order_id: String,
    pub date: String,
    pub status: String,
    pub total: String,
    pub items: String,
}

/// Orders shown on `/my-orders`, newest first as the site lists them.
/// Blocks without a recognisable order id are skipped.
#[must_use]
pub fn order_summaries(page: &Page<'_>) -> Vec<OrderSummary> {
    page.document()
        .select(&ORDER_BLOCK)
        .filter_map(|block| {
            let section = joined_text(block, &ORDER_SECTION);
            let order_id = ORDER_ID.find(&section)?.as_str().to_string();
            Some(OrderSummary {
                order_id,
                date: order_date(block),
                status: order_status(block),
                total: order_total(block),
                items: joined_text(block, &ITEMS),
            })
        })
        .collect()
}

fn joined_text(el: ElementRef<'_>, selector: &Selector) -> String {
    el.select(selector)
        .map(collapsed_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn order_date(block: ElementRef<'_>) -> String {
    let date = joined_text(block, &ORDER_DATE);
    if !date.is_empty() {
        return date;
    }
    block
        .select(&DIV)
        .filter(|div| collapsed_text(*div).contains("Order Placed"))
        .min_by_key(|div| collapsed_text(*div).len())
        .map(|div| joined_text(div, &SPAN))
        .unwrap_or_default()
}

fn order_total(block: ElementRef<'_>) -> String {
    block
        .select(&ROW_COLUMN)
        .filter(|col| collapsed_text(*col).to_lowercase().contains("total price"))
        .last()
        .map(|col| joined_text(col, &SPAN))
        .unwrap_or_default()
}

fn order_status(block: ElementRef<'_>) -> String {
    block
        .select(&DIV)
        .find(|div| {
            div.value()
                .attr("class")
                .is_some_and(|c| c.contains("order-status-"))
        })
        .map(collapsed_text)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = r#"
        <div class="all-order">
          <div class="order-section">Order No: BS-1234-ABCD</div>
          <div class="order-date">12/01/2026, 09:15 AM</div>
          <div class="row">
            <div class="col">Total Price <span>₹ 200</span></div>
          </div>
          <div class="order-status-delivered">Delivered</div>
          <div class="one-time-order">2 x 20L Jar</div>
        </div>
        <div class="all-order">
          <div class="order-section">Order No: BS-5678</div>
          <div class="meta"><div>Order Placed <span>03/02/2026</span></div></div>
          <div class="order-status-pending">Pending</div>
        </div>
        <div class="all-order">
          <div class="order-section">Draft</div>
        </div>"#;

    #[test]
    fn parses_blocks_with_ids_only() {
        let orders = order_summaries(&Page::parse(ORDERS));
        assert_eq!(orders.len(), 2);
        assert_eq!(
            orders[0],
            OrderSummary {
                order_id: "BS-1234-ABCD".into(),
                date: "12/01/2026, 09:15 AM".into(),
                status: "Delivered".into(),
                total: "₹ 200".into(),
                items: "2 x 20L Jar".into(),
            }
        );
        assert_eq!(orders[1].order_id, "BS-5678");
        assert_eq!(orders[1].date, "03/02/2026");
        assert_eq!(orders[1].status, "Pending");
        assert!(orders[1].total.is_empty());
    }
}
