//! Synonym table
//!
//! Maps aliases (other spellings, abbreviations, other languages) to a
//! canonical term. The built-in table ships in `data/synonyms.yaml`; a user
//! file with the same layout can be merged on top of it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use super::normalize::Lexicon;
use crate::catalog::canonicalize;
use crate::error::{Result, SkillioError};

const BUILTIN_SYNONYMS: &str = include_str!("../../data/synonyms.yaml");

/// Confidence assigned to alias hits when a file does not say otherwise
pub const DEFAULT_SYNONYM_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq)]
pub struct Synonym {
    pub target: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SynonymEntry {
    Aliases(Vec<String>),
    Weighted {
        aliases: Vec<String>,
        #[serde(default)]
        confidence: Option<f64>,
    },
}

#[derive(Debug, Deserialize)]
struct SynonymFile {
    #[serde(default)]
    default_confidence: Option<f64>,
    #[serde(default)]
    synonyms: BTreeMap<String, SynonymEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    aliases: HashMap<String, Synonym>,
}

impl SynonymTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The table compiled into the binary
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_yaml(BUILTIN_SYNONYMS).unwrap_or_else(|err| {
            warn!(error = %err, "built-in synonym table is unreadable, continuing without it");
            Self::default()
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: SynonymFile = serde_yaml::from_str(raw)?;
        let default_confidence = file
            .default_confidence
            .unwrap_or(DEFAULT_SYNONYM_CONFIDENCE);
        if !(0.0..=1.0).contains(&default_confidence) {
            return Err(SkillioError::Config(format!(
                "synonym default_confidence must be in [0, 1], got {default_confidence}"
            )));
        }

        let mut table = Self::default();
        for (target, entry) in file.synonyms {
            let (aliases, confidence) = match entry {
                SynonymEntry::Aliases(aliases) => (aliases, default_confidence),
                SynonymEntry::Weighted {
                    aliases,
                    confidence,
                } => (aliases, confidence.unwrap_or(default_confidence)),
            };
            for alias in aliases {
                table.insert(&alias, &target, confidence);
            }
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SkillioError::Config(format!("read synonyms {}: {err}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// Add or replace one alias. Aliases equal to their target are ignored.
    pub fn insert(&mut self, alias: &str, target: &str, confidence: f64) {
        let alias = canonicalize(alias);
        let target = canonicalize(target);
        if alias.is_empty() || target.is_empty() || alias == target {
            return;
        }
        self.aliases.insert(
            alias,
            Synonym {
                target,
                confidence: confidence.clamp(0.0, 1.0),
            },
        );
    }

    /// Entries from `other` win over existing ones
    pub fn merge(&mut self, other: Self) {
        self.aliases.extend(other.aliases);
    }

    #[must_use]
    pub fn resolve(&self, term: &str) -> Option<&Synonym> {
        self.aliases.get(term)
    }

    /// Segmentation lexicon of every alias and target written in a
    /// non-space-delimited script
    #[must_use]
    pub fn lexicon(&self) -> Lexicon {
        self.aliases
            .iter()
            .flat_map(|(alias, synonym)| [alias.as_str(), synonym.target.as_str()])
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
