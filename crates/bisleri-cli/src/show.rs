//! Read-only `config` and `schedule` views.

use clap::Subcommand;

use crate::context::AppContext;
use crate::format::key_value;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the config directory, config file and profiles directory
    Show,
}

pub(crate) fn run_config(ctx: &AppContext, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let paths = ctx.store.paths();
            println!("{}", key_value("Config dir", &paths.root().display().to_string()));
            println!(
                "{}",
                key_value("Config file", &paths.config_file().display().to_string())
            );
            println!(
                "{}",
                key_value("Profiles", &paths.profiles_dir().display().to_string())
            );
            Ok(())
        }
    }
}

pub(crate) fn run_schedule(ctx: &AppContext) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    println!("Schedule: {}", cfg.defaults.schedule);
    println!("Default quantity: {}", cfg.defaults.order_quantity);
    println!("Default return jars: {}", cfg.defaults.return_jars);
    println!("Delivery timeslot: {}", cfg.defaults.timeslot);
    Ok(())
}
