//! skillio validate - ingest the catalog and report what was rejected

use clap::Args;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok, robot_partial};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ValidateArgs {}

pub fn run(ctx: &AppContext, _args: &ValidateArgs) -> Result<()> {
    let report = &ctx.ingest;
    debug!(
        target: "skillio::validate",
        catalog = %ctx.catalog_path.display(),
        indexed = report.indexed_count,
        rejected = report.rejected_count,
        "catalog validated"
    );

    if ctx.robot_mode() {
        let response = if report.rejected_count == 0 {
            robot_ok(report)
        } else {
            robot_partial(report, report.indexed_count, report.rejected_count)
        };
        return emit_robot(response, ctx.robot_style());
    }

    let mut layout = HumanLayout::new();
    layout
        .title(&format!("Catalog {}", ctx.catalog_path.display()))
        .kv("Indexed", &report.indexed_count.to_string())
        .kv("Rejected", &report.rejected_count.to_string())
        .kv("Warnings", &report.warning_count.to_string())
        .kv("Generation", &report.generation.to_string());
    if !report.rejections.is_empty() {
        layout.blank().section("Rejected records");
        for rejection in &report.rejections {
            layout.bullet(&format!("{}: {}", rejection.id, rejection.reason));
        }
    }
    emit_human(layout);
    Ok(())
}
