//! skillio info - show one skill

use std::sync::Arc;

use clap::Args;
use tracing::debug;

use crate::app::AppContext;
use crate::catalog::SkillRecord;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::{Result, SkillioError};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Skill name
    pub skill: String,
}

pub fn run(ctx: &AppContext, args: &InfoArgs) -> Result<()> {
    let snapshot = ctx.index.snapshot();
    let wanted = args.skill.trim();
    let skill = snapshot
        .record(wanted)
        .or_else(|| {
            snapshot
                .records()
                .find(|record| record.id.eq_ignore_ascii_case(wanted))
        })
        .cloned()
        .ok_or_else(|| SkillioError::SkillNotFound(wanted.to_string()))?;
    debug!(target: "skillio::info", skill_id = %skill.id, "skill resolved");

    if ctx.robot_mode() {
        emit_robot(robot_ok(&*skill), ctx.robot_style())
    } else {
        emit_human(human_layout(&skill));
        Ok(())
    }
}

fn human_layout(skill: &Arc<SkillRecord>) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&format!("{} v{}", skill.name, skill.version));
    if !skill.description.is_empty() {
        layout.push_line(skill.description.clone()).blank();
    }
    for (locale, text) in &skill.localized_descriptions {
        layout.kv(&format!("Description ({locale})"), text);
    }

    let source = match &skill.source.locator {
        Some(locator) => format!("{} {locator}", skill.source.kind.as_str()),
        None => skill.source.kind.as_str().to_string(),
    };
    layout
        .kv("Source", &source)
        .kv("Quality", &format!("{:.2}", skill.quality))
        .kv("Popularity", &format!("{:.2}", skill.popularity));
    if !skill.categories.is_empty() {
        layout.kv("Categories", &skill.categories.join(", "));
    }
    if let Some(updated) = skill.updated_at.or(skill.created_at) {
        layout.kv("Updated", &updated.format("%Y-%m-%d").to_string());
    }

    layout.blank().section("Capabilities");
    for tag in &skill.capabilities {
        layout.bullet(tag);
    }
    if !skill.scenarios.is_empty() {
        layout.blank().section("Scenarios");
        for scenario in &skill.scenarios {
            layout.bullet(scenario);
        }
    }
    if !skill.dependencies.is_empty() {
        layout.blank().section("Dependencies");
        for dependency in &skill.dependencies {
            layout.bullet(dependency);
        }
    }
    layout
}
