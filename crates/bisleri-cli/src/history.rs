//! Order history: the live `orders` listing, `sync` into the local cache,
//! and `stats` over that cache.

use std::fmt::Write as _;

use anyhow::Context as _;
use bisleri_client::extract::{order_summaries, parse_inr_amount, OrderSummary};
use bisleri_client::{Page, StorefrontClient};
use bisleri_core::stats::{monthly_summary, weekday_pattern, MonthlySummary, WeekdayShare};
use bisleri_core::{parse_order_date, SavedOrder, StoreError};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::context::AppContext;
use crate::format::{order_date, truncate};

const RULE_WIDTH: usize = 80;
const ITEMS_INLINE_MAX: usize = 60;

async fn fetch_summaries(client: &StorefrontClient) -> anyhow::Result<Vec<OrderSummary>> {
    let html = client
        .fetch_orders_page()
        .await
        .context("failed to fetch orders")?;
    Ok(order_summaries(&Page::parse(&html)))
}

pub(crate) async fn run_orders(
    ctx: &AppContext,
    profile_flag: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let (_, profile) = ctx.load_profile(profile_flag)?;
    let client = ctx.session_client(&profile)?;

    println!("Fetching order history...");
    let mut orders = fetch_summaries(&client).await?;
    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }
    if limit > 0 {
        orders.truncate(limit);
    }
    print!("{}", render_orders(&orders));
    Ok(())
}

fn render_orders(orders: &[OrderSummary]) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\nOrder History (showing {} order(s)):\n", orders.len());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:<20}  {:<12}  {:<20}  {:<15}", "Order ID", "Date", "Status", "Total");
    let _ = writeln!(out, "{rule}");
    for order in orders {
        let _ = writeln!(
            out,
            "{:<20}  {:<12}  {:<20}  {:<15}",
            truncate(&order.order_id, 20),
            truncate(&order_date(&order.date), 12),
            truncate(&order.status, 20),
            truncate(&order.total, 15),
        );
        if !order.items.is_empty() && order.items.chars().count() < ITEMS_INLINE_MAX {
            let _ = writeln!(out, "  └─ {}", order.items);
        }
    }
    let _ = writeln!(out, "{rule}");
    if let Some(latest) = orders.first() {
        let _ = writeln!(out, "\nMost recent order: {}", latest.order_id);
    }
    out
}

/// Unparseable totals are kept as zero; unparseable dates stay unset and
/// drop out of the stats.
fn to_saved(summary: OrderSummary) -> SavedOrder {
    let amount = parse_inr_amount(&summary.total).unwrap_or(Decimal::ZERO);
    SavedOrder {
        parsed_date: parse_order_date(&summary.date),
        amount,
        order_id: summary.order_id,
        date: summary.date,
        status: summary.status,
        total: summary.total,
        items: summary.items,
    }
}

pub(crate) async fn sync_orders(ctx: &AppContext, profile_flag: Option<&str>) -> anyhow::Result<usize> {
    let (_, profile) = ctx.load_profile(profile_flag)?;
    let client = ctx.session_client(&profile)?;

    println!("Syncing orders for profile '{}'...", profile.name);
    let summaries = fetch_summaries(&client).await?;
    println!("Found {} orders on server.", summaries.len());

    let orders: Vec<SavedOrder> = summaries.into_iter().map(to_saved).collect();
    let count = orders.len();
    ctx.store
        .save_history(&profile.name, orders, Utc::now())
        .context("failed to save history")?;
    tracing::info!(profile = %profile.name, orders = count, "order history synced");
    Ok(count)
}

pub(crate) async fn run_sync(ctx: &AppContext, profile_flag: Option<&str>) -> anyhow::Result<()> {
    sync_orders(ctx, profile_flag).await?;
    println!("Sync complete.");
    Ok(())
}

pub(crate) fn run_stats(
    ctx: &AppContext,
    profile_flag: Option<&str>,
    view_patterns: bool,
) -> anyhow::Result<()> {
    let (_, profile) = ctx.load_profile(profile_flag)?;
    let history = match ctx.store.load_history(&profile.name) {
        Ok(history) => history,
        Err(StoreError::NoHistory { .. }) => {
            anyhow::bail!("no synced data found; run 'bislericli sync' first")
        }
        Err(err) => return Err(anyhow::Error::new(err).context("failed to load history")),
    };
    if history.orders.is_empty() {
        println!("No orders found in local history.");
        return Ok(());
    }

    println!(
        "Analyzing {} orders (last synced: {})",
        history.orders.len(),
        history.last_synced.format("%Y-%m-%d %H:%M")
    );
    if view_patterns {
        let pattern = weekday_pattern(&history.orders);
        if pattern.is_empty() {
            println!("No valid dates found for pattern analysis.");
        } else {
            print!("{}", render_patterns(&pattern));
        }
    } else if let Some(summary) = monthly_summary(&history.orders) {
        print!("{}", render_monthly(&summary));
    } else {
        println!("No valid dates found for monthly analysis.");
    }
    Ok(())
}

fn render_monthly(summary: &MonthlySummary) -> String {
    let month_rule = "+----------------+----------+---------------+---------------+";
    let total_rule = "+----------+---------------+---------------+--------------+--------------+";
    let mut out = String::new();
    let _ = writeln!(out, "\n{month_rule}");
    let _ = writeln!(out, "| {:<14} | {:<8} | {:<13} | {:<13} |", "Period", "Orders", "Total", "Average");
    let _ = writeln!(out, "{month_rule}");
    for row in &summary.rows {
        let _ = writeln!(
            out,
            "| {:<14} | {:<8} | {:<13} | {:<13} |",
            row.label(),
            row.count,
            format!("₹{:.2}", row.total),
            format!("₹{:.2}", row.average()),
        );
    }
    let _ = writeln!(out, "{month_rule}");

    let _ = writeln!(out, "\n{total_rule}");
    let _ = writeln!(
        out,
        "| {:<8} | {:<13} | {:<13} | {:<12} | {:<12} |",
        "Orders", "Total", "Average", "Earliest", "Latest"
    );
    let _ = writeln!(out, "{total_rule}");
    let _ = writeln!(
        out,
        "| {:<8} | {:<13} | {:<13} | {:<12} | {:<12} |",
        summary.count,
        format!("₹{:.2}", summary.total),
        format!("₹{:.2}", summary.average()),
        summary.earliest.format("%Y-%m-%d").to_string(),
        summary.latest.format("%Y-%m-%d").to_string(),
    );
    let _ = writeln!(out, "{total_rule}\n");
    out
}

fn render_patterns(pattern: &[WeekdayShare]) -> String {
    let rule = "+-----------+----------+----------+";
    let mut out = String::from("Ordering patterns\n");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "| {:<9} | {:<8} | {:<8} |", "Day", "Orders", "Share");
    let _ = writeln!(out, "{rule}");
    for day in pattern {
        let _ = writeln!(
            out,
            "| {:<9} | {:<8} | {:<8} |",
            weekday_name(day.weekday),
            day.count,
            format!("{:.1}%", day.share),
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

fn weekday_name(day: chrono::Weekday) -> &'static str {
    use chrono::Weekday::{Fri, Mon, Sat, Sun, Thu, Tue, Wed};
    match day {
        Mon => "Monday",
        Tue => "Tuesday",
        Wed => "Wednesday",
        Thu => "Thursday",
        Fri => "Friday",
        Sat => "Saturday",
        Sun => "Sunday",
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
