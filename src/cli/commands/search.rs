//! skillio search - resolve an intent to ranked skills

use clap::Args;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::error::Result;
use crate::search::{MatchTier, SearchOptions, SearchOutcome};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Statement of intent, e.g. "download a bilibili video"
    pub query: String,

    /// Treat the query as one literal keyword
    #[arg(long, short)]
    pub keyword: bool,

    /// Maximum number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Query locale (en, de, fr, es, zh, ja)
    #[arg(long)]
    pub locale: Option<String>,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let options = SearchOptions {
        keyword_mode: args.keyword,
        limit: args.limit.unwrap_or(ctx.config.search.default_limit).max(1),
        locale: args.locale.clone(),
    };
    debug!(target: "skillio::search", query = %args.query, ?options, "search requested");

    let outcome = ctx.engine.search(&ctx.index, &args.query, &options)?;
    debug!(
        target: "skillio::search",
        results = outcome.matches.len(),
        generation = outcome.generation,
        "search complete"
    );

    if ctx.robot_mode() {
        let warnings = outcome
            .suggestion
            .iter()
            .map(|tag| format!("no skill matched; did you mean \"{tag}\"?"))
            .collect();
        emit_robot(robot_ok(&outcome).with_warnings(warnings), ctx.robot_style())
    } else {
        emit_human(human_layout(&outcome));
        Ok(())
    }
}

fn human_layout(outcome: &SearchOutcome) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&format!("Search: {}", outcome.query));

    if outcome.matches.is_empty() {
        layout.push_line("No matching skills.");
        if let Some(tag) = &outcome.suggestion {
            layout.push_line(format!("Did you mean \"{tag}\"?"));
        }
        return layout;
    }

    for (rank, skill) in outcome.matches.iter().enumerate() {
        layout.push_line(format!(
            "{:>2}. {} v{}  score {:.3}{}",
            rank + 1,
            skill.name,
            skill.version,
            skill.score,
            tier_note(skill.tier)
        ));
        if !skill.description.is_empty() {
            layout.push_line(format!("    {}", skill.description));
        }
        if !skill.matched_tags.is_empty() {
            let tags: Vec<String> = skill
                .matched_tags
                .iter()
                .map(|m| format!("{} ({})", m.tag, m.strategy.as_str()))
                .collect();
            layout.push_line(format!("    matched: {}", tags.join(", ")));
        }
    }
    layout
}

const fn tier_note(tier: MatchTier) -> &'static str {
    match tier {
        MatchTier::Tag => "",
        MatchTier::Keyword => "  [keyword]",
        MatchTier::FullText => "  [text]",
    }
}
