//! Aggregation over the cached order history.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::SavedOrder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRow {
    /// First day of the month; used for ordering.
    pub month: NaiveDate,
    pub count: usize,
    pub total: Decimal,
}

impl MonthRow {
    #[must_use]
    pub fn label(&self) -> String {
        self.month.format("%b %Y").to_string()
    }

    #[must_use]
    pub fn average(&self) -> Decimal {
        average(self.total, self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlySummary {
    pub rows: Vec<MonthRow>,
    pub count: usize,
    pub total: Decimal,
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl MonthlySummary {
    #[must_use]
    pub fn average(&self) -> Decimal {
        average(self.total, self.count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayShare {
    pub weekday: Weekday,
    pub count: usize,
    /// Percentage of dated orders, 0.0..=100.0.
    pub share: f64,
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(count)).round_dp(2)
}

/// Groups dated orders by calendar month. Orders without a parsed date are
/// skipped. Returns `None` when no order carries a date.
#[must_use]
pub fn monthly_summary(orders: &[SavedOrder]) -> Option<MonthlySummary> {
    let mut months: BTreeMap<NaiveDate, MonthRow> = BTreeMap::new();
    let mut earliest: Option<NaiveDate> = None;
    let mut latest: Option<NaiveDate> = None;
    let mut count = 0usize;
    let mut total = Decimal::ZERO;

    for order in orders {
        let Some(date) = order.parsed_date else {
            continue;
        };
        let Some(month) = date.with_day(1) else {
            continue;
        };
        let row = months.entry(month).or_insert_with(|| MonthRow {
            month,
            count: 0,
            total: Decimal::ZERO,
        });
        row.count += 1;
        row.total += order.amount;
        count += 1;
        total += order.amount;
        earliest = Some(earliest.map_or(date, |e| e.min(date)));
        latest = Some(latest.map_or(date, |l| l.max(date)));
    }

    Some(MonthlySummary {
        rows: months.into_values().collect(),
        count,
        total,
        earliest: earliest?,
        latest: latest?,
    })
}

/// Order counts per weekday, Monday first. Empty when no order is dated.
#[must_use]
pub fn weekday_pattern(orders: &[SavedOrder]) -> Vec<WeekdayShare> {
    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    let mut counts = [0usize; 7];
    for date in orders.iter().filter_map(|o| o.parsed_date) {
        counts[date.weekday().num_days_from_monday() as usize] += 1;
    }
    let dated: usize = counts.iter().sum();
    if dated == 0 {
        return Vec::new();
    }
    WEEK.iter()
        .zip(counts)
        .map(|(weekday, count)| {
            #[allow(clippy::cast_precision_loss)]
            let share = count as f64 / dated as f64 * 100.0;
            WeekdayShare {
                weekday: *weekday,
                count,
                share,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(date: Option<(i32, u32, u32)>, amount: i64) -> SavedOrder {
        SavedOrder {
            order_id: "BS-X".into(),
            date: String::new(),
            parsed_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            status: String::new(),
            total: String::new(),
            amount: Decimal::from(amount),
            items: String::new(),
        }
    }

    #[test]
    fn groups_by_month_in_calendar_order() {
        let orders = vec![
            order(Some((2026, 2, 3)), 200),
            order(Some((2026, 1, 5)), 100),
            order(Some((2026, 1, 20)), 150),
            order(None, 999),
        ];
        let summary = monthly_summary(&orders).unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0].label(), "Jan 2026");
        assert_eq!(summary.rows[0].count, 2);
        assert_eq!(summary.rows[0].total, Decimal::from(250));
        assert_eq!(summary.rows[0].average(), Decimal::from(125));
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total, Decimal::from(450));
        assert_eq!(summary.earliest, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(summary.latest, NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
    }

    #[test]
    fn undated_history_has_no_summary() {
        assert!(monthly_summary(&[order(None, 100)]).is_none());
        assert!(weekday_pattern(&[order(None, 100)]).is_empty());
    }

    #[test]
    fn weekday_shares_sum_to_one_hundred() {
        // 2026-01-05 is a Monday, 2026-01-10 a Saturday.
        let orders = vec![
            order(Some((2026, 1, 5)), 100),
            order(Some((2026, 1, 12)), 100),
            order(Some((2026, 1, 10)), 100),
            order(Some((2026, 1, 17)), 100),
        ];
        let pattern = weekday_pattern(&orders);
        assert_eq!(pattern.len(), 7);
        assert_eq!(pattern[0].weekday, Weekday::Mon);
        assert_eq!(pattern[0].count, 2);
        assert_eq!(pattern[5].count, 2);
        let total: f64 = pattern.iter().map(|d| d.share).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
