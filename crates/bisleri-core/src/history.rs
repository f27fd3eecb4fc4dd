//! Locally cached order history, refreshed by `sync`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedOrder {
    pub order_id: String,
    /// Date exactly as the orders page rendered it.
    pub date: String,
    #[serde(default)]
    pub parsed_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: String,
    /// Total as displayed, e.g. `₹200`.
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub items: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistory {
    pub last_synced: DateTime<Utc>,
    #[serde(default)]
    pub orders: Vec<SavedOrder>,
}

/// Parses the orders page date.
///
/// The page renders `05/01/2026, 11:49 AM` (day first); the part before the
/// comma is tried first, then a handful of full-string layouts.
#[must_use]
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let head = raw.split(',').next().unwrap_or(raw).trim();
    if let Ok(date) = NaiveDate::parse_from_str(head, "%d/%m/%Y") {
        return Some(date);
    }
    for layout in ["%d/%m/%Y, %I:%M %p", "%d/%m/%Y %I:%M %p"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(dt.date());
        }
    }
    for layout in ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, layout) {
            return Some(date);
        }
    }
    None
}
