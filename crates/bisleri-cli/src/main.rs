mod auth;
mod context;
mod format;
mod history;
mod order;
mod profile;
mod prompt;
mod show;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::auth::AuthCommands;
use crate::context::AppContext;
use crate::profile::ProfileCommands;
use crate::show::ConfigCommands;

const DEBUG_FILTER: &str =
    "bislericli=debug,bisleri_core=debug,bisleri_client=debug,bisleri_checkout=debug";

#[derive(Debug, Parser)]
#[command(name = "bislericli")]
#[command(about = "Bisleri customer CLI: order 20L water jars from the terminal")]
#[command(version)]
struct Cli {
    /// Verbose logging; `order` also saves offending pages under /tmp
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in, log out, or inspect the saved session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List or switch profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Place a new water jar order
    Order {
        /// Profile name to use (default: current profile)
        #[arg(long)]
        profile: Option<String>,
        /// Number of 20L jars to order (0 uses the configured default)
        #[arg(long, default_value_t = 0)]
        qty: u32,
        /// Number of empty jars to return (default: matches the order quantity)
        #[arg(long = "return")]
        return_jars: Option<u32>,
        /// Proceed even if the cart contains other items
        #[arg(long)]
        allow_extra: bool,
    },
    /// Show recent orders from the site
    Orders {
        #[arg(long)]
        profile: Option<String>,
        /// Maximum number of recent orders to display (0 shows all)
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Fetch order history and cache it locally
    Sync {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Spending summary from the cached order history
    Stats {
        #[arg(long)]
        profile: Option<String>,
        /// Orders by weekday instead of by month
        #[arg(long)]
        view_patterns: bool,
    },
    /// Show where configuration lives
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show the configured order schedule and defaults
    Schedule,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = bisleri_core::load_settings()?;
    init_tracing(&settings.log_filter, cli.debug)?;
    let ctx = AppContext::new(settings);

    match cli.command {
        Commands::Auth { command } => auth::run_auth(&ctx, command).await,
        Commands::Profile { command } => profile::run_profile(&ctx, command),
        Commands::Order {
            profile,
            qty,
            return_jars,
            allow_extra,
        } => {
            let args = order::OrderArgs {
                profile,
                qty,
                return_jars,
                allow_extra,
                debug: cli.debug,
            };
            order::run_order(&ctx, args).await
        }
        Commands::Orders { profile, limit } => {
            history::run_orders(&ctx, profile.as_deref(), limit).await
        }
        Commands::Sync { profile } => history::run_sync(&ctx, profile.as_deref()).await,
        Commands::Stats {
            profile,
            view_patterns,
        } => history::run_stats(&ctx, profile.as_deref(), view_patterns),
        Commands::Config { command } => show::run_config(&ctx, command),
        Commands::Schedule => show::run_schedule(&ctx),
    }
}

/// `RUST_LOG` wins; otherwise the configured filter, or the debug filter
/// when `--debug` is set. Logs go to stderr so table output stays clean.
fn init_tracing(configured: &str, debug: bool) -> anyhow::Result<()> {
    let fallback = if debug { DEBUG_FILTER } else { configured };
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests;
