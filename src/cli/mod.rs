use clap::{Parser, Subcommand};

/// Command line interface definition
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, short)]
    pub config_path: Option<String>,

    /// Log level override
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log file directory override
    #[arg(long, short)]
    pub log_path: Option<String>,

    /// Disable terminal logging
    #[arg(long, short)]
    pub term_log_off: bool,

    /// Do not forward to the delegate found in the slot
    #[arg(long)]
    pub no_original: bool,

    /// Keep handles of released listeners until pruned explicitly
    #[arg(long)]
    pub keep_released: bool,

    /// Do not reassign the proxy after listeners change
    #[arg(long)]
    pub no_reassign: bool,

    /// Number of rows in the demo list
    #[arg(long, short)]
    pub rows: Option<usize>,

    /// Distance of the scripted drag
    #[arg(long, short)]
    pub drag_distance: Option<f64>,

    /// Row selected during the scenario
    #[arg(long, short)]
    pub selected_row: Option<usize>,
}

/// Available application commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the scripted scroll view scenario
    Run,
    /// Print the effective configuration as JSON
    ShowConfig,
}
