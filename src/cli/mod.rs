use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub mod commands;
pub mod output;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "skillio",
    version,
    about = "Match a statement of intent to the skills that can fulfil it"
)]
pub struct Cli {
    /// Emit JSON envelopes on stdout
    #[arg(long, global = true, visible_alias = "json")]
    pub robot: bool,

    /// Catalog file (YAML or JSON)
    #[arg(long, global = true, env = "SKILLIO_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Configuration file, replacing the global and project files
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}
