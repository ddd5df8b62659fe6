//! skillio categories - category counts

use clap::Args;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct CategoriesArgs {}

pub fn run(ctx: &AppContext, _args: &CategoriesArgs) -> Result<()> {
    let categories = ctx.index.snapshot().categories();
    debug!(target: "skillio::categories", count = categories.len(), "categories collected");

    if ctx.robot_mode() {
        return emit_robot(robot_ok(categories), ctx.robot_style());
    }

    let mut layout = HumanLayout::new();
    layout.title("Categories");
    if categories.is_empty() {
        layout.push_line("No categorized skills.");
    }
    for category in &categories {
        layout.kv(
            &category.name,
            &format!("{} ({})", category.count, category.examples.join(", ")),
        );
    }
    emit_human(layout);
    Ok(())
}
