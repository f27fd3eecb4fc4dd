//! `order`: one checkout run on the selected profile.

use std::time::Duration;

use bisleri_checkout::{DebugSnapshots, Orchestrator, OrderRequest, OtpRefresher};
use bisleri_client::Deadline;

use crate::context::AppContext;
use crate::prompt::TerminalPrompter;

#[derive(Debug)]
pub(crate) struct OrderArgs {
    pub profile: Option<String>,
    pub qty: u32,
    pub return_jars: Option<u32>,
    pub allow_extra: bool,
    pub debug: bool,
}

/// Validates the request against config defaults, then hands it to the
/// orchestrator under the configured run deadline.
pub(crate) async fn run_order(ctx: &AppContext, args: OrderArgs) -> anyhow::Result<()> {
    let (cfg, mut profile) = ctx.load_profile(args.profile.as_deref())?;
    let request =
        OrderRequest::from_args(args.qty, args.return_jars, args.allow_extra, &cfg.defaults)?;
    println!(
        "Placing order: {} jar(s), returning {} jar(s)",
        request.quantity, request.return_jars
    );

    let deadline = Deadline::after(Duration::from_secs(ctx.settings.order_deadline_secs));
    let prompter = TerminalPrompter::new();
    let refresher =
        OtpRefresher::new(ctx.client_settings(), &prompter).with_deadline(deadline);
    let snapshots = if args.debug {
        DebugSnapshots::in_tmp()
    } else {
        DebugSnapshots::disabled()
    };

    let outcome = Orchestrator::new(&ctx.store, ctx.client_settings(), &prompter, &refresher)
        .with_snapshots(snapshots)
        .with_deadline(deadline)
        .run(&mut profile, &request)
        .await?;

    tracing::info!(
        profile = %profile.name,
        order_id = %outcome.order_id,
        total = %outcome.total,
        reauthenticated = outcome.reauthenticated,
        "order complete"
    );
    println!("Order placed: {}", outcome.order_id);
    if let Some(balance) = outcome.balance_after {
        println!("Wallet balance (post-order): {balance}");
    }
    Ok(())
}
