//! Small text helpers for terminal output.

use bisleri_core::parse_order_date;
use chrono::{DateTime, SecondsFormat, Utc};

pub(crate) fn key_value(key: &str, value: &str) -> String {
    format!("{key}: {value}")
}

/// RFC 3339, or `-` for a missing time.
pub(crate) fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |t| t.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

/// Cuts `value` to `width` characters, ending in `...` when shortened.
pub(crate) fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let keep = width.saturating_sub(3);
    format!("{}...", value.chars().take(keep).collect::<String>())
}

/// `05/01/2026, 11:49 AM` becomes `05 Jan 2026`; unparseable dates pass
/// through unchanged.
pub(crate) fn order_date(raw: &str) -> String {
    parse_order_date(raw).map_or_else(|| raw.trim().to_string(), |d| d.format("%d %b %Y").to_string())
}
