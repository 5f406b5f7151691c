use std::path::Path;

use clap::Parser;
use delegate_core::core::logging::log_init;
use eyre::{Result, WrapErr};
use multicast_delegate::{
    app::{config::ApplicationConfig, scenario::run_scenario},
    cli::{Cli, Commands},
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config_path {
        Some(path) => ApplicationConfig::load(Path::new(path))
            .wrap_err_with(|| format!("Failed to load configuration from {}", path))?,
        None => ApplicationConfig::default(),
    };

    config.apply_cli_overrides(&cli);
    config.validate()?;

    log_init(
        config.log_filter(),
        config.logging.file_path.clone(),
        !config.logging.disable_terminal,
    );

    match cli.command {
        Commands::Run => {
            let report = run_scenario(&config)?;
            tracing::info!(
                listeners = report.listeners,
                selected = ?report.selected,
                restored = report.original_restored,
                "Scenario report"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
