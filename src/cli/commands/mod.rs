//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod categories;
pub mod info;
pub mod list;
pub mod search;
pub mod validate;

use crate::app::AppContext;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args),
        Commands::Info(args) => info::run(ctx, args),
        Commands::List(args) => list::run(ctx, args),
        Commands::Categories(args) => categories::run(ctx, args),
        Commands::Validate(args) => validate::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find skills that can fulfil a statement of intent
    Search(search::SearchArgs),

    /// Show one skill in detail
    Info(info::InfoArgs),

    /// List catalog skills
    List(list::ListArgs),

    /// Show categories with skill counts
    Categories(categories::CategoriesArgs),

    /// Ingest the catalog and report rejected records
    Validate(validate::ValidateArgs),
}
