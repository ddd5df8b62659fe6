//! Skill catalog records
//!
//! The catalog is external data: the engine receives an already-materialized
//! snapshot of wire records, validates them into [`SkillRecord`]s and derives
//! its index from them. Nothing here owns or persists the catalog.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

pub mod loader;
pub mod validation;

pub use loader::{CatalogSnapshot, load_catalog, parse_catalog};
pub use validation::{Validated, ValidationWarning, validate};

/// Where a skill's content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A source repository (`type: github` on the wire)
    Github,
    /// Generated from published documentation
    Docs,
    /// Hand-written
    Manual,
}

impl SourceKind {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "github" | "git" | "repository" | "repo" => Some(Self::Github),
            "docs" | "documentation" => Some(Self::Docs),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Docs => "docs",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSource {
    pub kind: SourceKind,
    /// Repository slug or documentation URL
    pub locator: Option<String>,
}

/// A validated catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: String,
    pub name: String,
    pub version: semver::Version,
    pub source: SkillSource,
    pub description: String,
    /// Language code -> description
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub localized_descriptions: BTreeMap<String, String>,
    /// Canonical capability tags, first-seen order, never empty
    pub capabilities: Vec<String>,
    pub scenarios: Vec<String>,
    pub dependencies: Vec<String>,
    /// Category labels used for browsing
    pub categories: Vec<String>,
    /// Static quality score in [0, 1]
    pub quality: f64,
    /// Externally maintained popularity in [0, 1]
    pub popularity: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SkillRecord {
    /// Whether the skill carries the canonical form of `tag`
    #[must_use]
    pub fn has_capability(&self, tag: &str) -> bool {
        let tag = canonicalize(tag);
        self.capabilities.iter().any(|c| *c == tag)
    }

    /// Lowercased text searched by the full-text fallback
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str(), self.description.as_str()];
        parts.extend(self.localized_descriptions.values().map(String::as_str));
        parts.extend(self.scenarios.iter().map(String::as_str));
        canonicalize(&parts.join("\n"))
    }
}

/// Wire-format source descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSource {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A record as supplied by the external catalog. Every field is optional at
/// this layer so a single bad record fails validation instead of the whole
/// document failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSkillRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub source: Option<RawSource>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_zh: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub scenarios: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RawSkillRecord {
    /// Identifier used in rejection reports before validation succeeds
    #[must_use]
    pub fn display_id(&self, position: usize) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| format!("#{position}"), str::to_string)
    }
}

/// A record excluded from the index, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub id: String,
    pub reason: String,
}

/// Canonical form for tags and matchable text: NFKC, lowercase, trimmed,
/// inner whitespace collapsed to single spaces.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_collapses_and_lowercases() {
        assert_eq!(canonicalize("  Video   Download "), "video download");
        assert_eq!(canonicalize("YouTube"), "youtube");
    }

    #[test]
    fn test_canonicalize_fullwidth_forms() {
        // NFKC folds fullwidth Latin letters
        assert_eq!(canonicalize("ＧＩＦ"), "gif");
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!(SourceKind::parse("GitHub"), Some(SourceKind::Github));
        assert_eq!(SourceKind::parse("docs"), Some(SourceKind::Docs));
        assert_eq!(SourceKind::parse("ftp"), None);
    }

    #[test]
    fn test_display_id_falls_back_to_position() {
        let raw = RawSkillRecord::default();
        assert_eq!(raw.display_id(3), "#3");

        let raw = RawSkillRecord {
            name: Some("  pdf-tools ".into()),
            ..RawSkillRecord::default()
        };
        assert_eq!(raw.display_id(3), "pdf-tools");
    }
}
