//! skillio list - list catalog skills

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::app::AppContext;
use crate::catalog::SkillRecord;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only skills in this category
    #[arg(long, short)]
    pub category: Option<String>,
}

#[derive(Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    version: String,
    description: &'a str,
    categories: &'a [String],
    quality: f64,
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<()> {
    let snapshot = ctx.index.snapshot();
    let skills: Vec<Arc<SkillRecord>> = match &args.category {
        Some(category) => snapshot.by_category(category),
        None => snapshot.records().cloned().collect(),
    };
    debug!(target: "skillio::list", category = ?args.category, count = skills.len(), "listing skills");

    if ctx.robot_mode() {
        let entries: Vec<ListEntry<'_>> = skills
            .iter()
            .map(|skill| ListEntry {
                name: &skill.name,
                version: skill.version.to_string(),
                description: &skill.description,
                categories: &skill.categories,
                quality: skill.quality,
            })
            .collect();
        return emit_robot(robot_ok(entries), ctx.robot_style());
    }

    let mut layout = HumanLayout::new();
    match &args.category {
        Some(category) => layout.title(&format!("Skills in {category} ({})", skills.len())),
        None => layout.title(&format!("Skills ({})", skills.len())),
    };
    if skills.is_empty() {
        layout.push_line("No skills found.");
    }
    for skill in &skills {
        layout.push_line(format!("{} v{}", skill.name, skill.version));
        if !skill.description.is_empty() {
            layout.push_line(format!("    {}", skill.description));
        }
    }
    emit_human(layout);
    Ok(())
}
