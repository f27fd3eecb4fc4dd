use clap::Subcommand;

use crate::context::AppContext;

/// Sub-commands available under `profile`.
#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    /// List saved profiles
    List,
    /// Make a profile current, creating it if needed
    Use {
        /// Profile name
        name: String,
    },
}

pub(crate) fn run_profile(ctx: &AppContext, command: ProfileCommands) -> anyhow::Result<()> {
    match command {
        ProfileCommands::List => {
            let names = ctx.store.list_profiles()?;
            if names.is_empty() {
                println!("No profiles found. Run: bislericli auth login");
            }
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
        ProfileCommands::Use { name } => {
            switch_profile(ctx, &name)?;
            println!("Current profile set to: {name}");
            Ok(())
        }
    }
}

fn switch_profile(ctx: &AppContext, name: &str) -> anyhow::Result<()> {
    ctx.store.load_or_create_profile(name)?;
    let mut cfg = ctx.load_config()?;
    cfg.current_profile = name.to_string();
    ctx.store.save_config(&cfg)?;
    Ok(())
}
