//! Capability tag extraction
//!
//! Resolves a normalized query against the tag vocabulary. Strategies, in
//! order: exact tag, synonym, composition of multi-word tags from their
//! words, then fuzzy matching for whatever is still unresolved. Terms that
//! resolve to nothing are handed to the full-text fallback.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::fuzzy::FuzzyMatcher;
use super::normalize::{NormalizedQuery, is_segmented_script};
use super::synonyms::SynonymTable;
use super::vocabulary::TagVocabulary;

/// How a query term reached a tag. Ordered weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    FullText,
    Fuzzy,
    Composite,
    Synonym,
    Exact,
}

impl MatchStrategy {
    /// Maximum confidence a match of this kind may contribute. Full-text
    /// relevance is capped separately by the ranker's fallback ceiling.
    #[must_use]
    pub const fn ceiling(self) -> f64 {
        match self {
            Self::Exact | Self::Synonym | Self::FullText => 1.0,
            Self::Composite => 0.9,
            Self::Fuzzy => 0.85,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullText => "full_text",
            Self::Fuzzy => "fuzzy",
            Self::Composite => "composite",
            Self::Synonym => "synonym",
            Self::Exact => "exact",
        }
    }
}

/// A candidate tag for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagMatch {
    pub tag: String,
    /// In (0, 1]
    pub confidence: f64,
    pub strategy: MatchStrategy,
    /// Query text that produced the match
    pub term: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// One entry per distinct tag, sorted by tag
    pub tags: Vec<TagMatch>,
    /// Unresolved tokens and phrases, in query order
    pub fallback: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractorSettings {
    pub fuzzy_threshold: f64,
    pub max_fuzzy_candidates: usize,
    pub min_fuzzy_len: usize,
    /// Longest token window tried as a multi-word tag
    pub max_ngram: usize,
    /// Applied to the weakest word confidence of a composed tag
    pub composite_factor: f64,
    pub suggestion_threshold: f64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            max_fuzzy_candidates: 256,
            min_fuzzy_len: 4,
            max_ngram: 3,
            composite_factor: 0.9,
            suggestion_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
struct WordHit {
    confidence: f64,
    positions: Vec<usize>,
}

#[derive(Default)]
struct Found {
    tags: BTreeMap<String, TagMatch>,
    words: BTreeMap<String, WordHit>,
}

impl Found {
    fn add_tag(&mut self, tag: &str, confidence: f64, strategy: MatchStrategy, term: &str) {
        let candidate = TagMatch {
            tag: tag.to_string(),
            confidence,
            strategy,
            term: term.to_string(),
        };
        match self.tags.get(tag) {
            Some(existing)
                if existing.confidence > confidence
                    || (existing.confidence == confidence && existing.strategy >= strategy) => {}
            _ => {
                self.tags.insert(tag.to_string(), candidate);
            }
        }
    }

    fn add_word(&mut self, word: &str, confidence: f64, position: usize) {
        let hit = self.words.entry(word.to_string()).or_insert(WordHit {
            confidence,
            positions: Vec::new(),
        });
        hit.confidence = hit.confidence.max(confidence);
        if !hit.positions.contains(&position) {
            hit.positions.push(position);
        }
    }
}

pub struct TagExtractor {
    synonyms: SynonymTable,
    settings: ExtractorSettings,
    fuzzy: FuzzyMatcher,
}

impl TagExtractor {
    #[must_use]
    pub const fn new(synonyms: SynonymTable, settings: ExtractorSettings) -> Self {
        Self {
            synonyms,
            fuzzy: FuzzyMatcher {
                max_candidates: settings.max_fuzzy_candidates,
                min_len: settings.min_fuzzy_len,
            },
            settings,
        }
    }

    #[must_use]
    pub const fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    #[must_use]
    pub fn extract(&self, query: &NormalizedQuery, vocab: &TagVocabulary) -> Extraction {
        let tokens = &query.tokens;
        let mut found = Found::default();
        let mut used = vec![false; tokens.len()];
        let mut fallback: Vec<String> = Vec::new();

        for phrase in &query.phrases {
            match self.resolve_tag(phrase, vocab) {
                Some((tag, confidence, strategy)) => {
                    found.add_tag(&tag, confidence, strategy, phrase);
                }
                None => fallback.push(phrase.clone()),
            }
        }

        let widest = self.settings.max_ngram.min(tokens.len());
        for width in (2..=widest).rev() {
            for start in 0..=tokens.len() - width {
                let term = join_window(&tokens[start..start + width]);
                if let Some((tag, confidence, strategy)) = self.resolve_tag(&term, vocab) {
                    found.add_tag(&tag, confidence, strategy, &term);
                    used[start..start + width].fill(true);
                }
            }
        }

        for (position, token) in tokens.iter().enumerate() {
            let mut resolved = false;
            if vocab.is_tag(token) {
                found.add_tag(token, 1.0, MatchStrategy::Exact, token);
                used[position] = true;
                resolved = true;
            }
            if vocab.is_word(token) {
                found.add_word(token, 1.0, position);
                resolved = true;
            }
            if let Some(synonym) = self.synonyms.resolve(token) {
                if vocab.is_tag(&synonym.target) {
                    found.add_tag(
                        &synonym.target,
                        synonym.confidence,
                        MatchStrategy::Synonym,
                        token,
                    );
                    used[position] = true;
                    resolved = true;
                }
                if vocab.is_word(&synonym.target) {
                    found.add_word(&synonym.target, synonym.confidence, position);
                    resolved = true;
                }
            }
            if resolved {
                continue;
            }
            if let Some(hit) =
                self.fuzzy
                    .best_match(token, vocab.terms(), self.settings.fuzzy_threshold)
            {
                if vocab.is_tag(hit.term) {
                    let confidence = hit.similarity.min(MatchStrategy::Fuzzy.ceiling());
                    found.add_tag(hit.term, confidence, MatchStrategy::Fuzzy, token);
                    used[position] = true;
                }
                if vocab.is_word(hit.term) {
                    found.add_word(hit.term, hit.similarity, position);
                }
            }
        }

        for (tag, confidence, positions) in self.compose(&found, vocab) {
            let term = positions
                .iter()
                .map(|&p| tokens[p].as_str())
                .collect::<Vec<_>>()
                .join(" ");
            found.add_tag(&tag, confidence, MatchStrategy::Composite, &term);
            for position in positions {
                used[position] = true;
            }
        }

        for (token, used) in tokens.iter().zip(&used) {
            if !used && !fallback.contains(token) {
                fallback.push(token.clone());
            }
        }

        Extraction {
            tags: found.tags.into_values().collect(),
            fallback,
        }
    }

    /// Closest tag to any of `terms`, for "did you mean" hints
    #[must_use]
    pub fn suggest(&self, terms: &[String], vocab: &TagVocabulary) -> Option<String> {
        let mut best: Option<(&str, f64)> = None;
        for term in terms {
            let Some(hit) = self.fuzzy.best_match(
                term,
                vocab.tag_terms(),
                self.settings.suggestion_threshold,
            ) else {
                continue;
            };
            let better = best.is_none_or(|(tag, score)| {
                hit.similarity > score || (hit.similarity == score && hit.term < tag)
            });
            if better {
                best = Some((hit.term, hit.similarity));
            }
        }
        best.map(|(tag, _)| tag.to_string())
    }

    fn resolve_tag(&self, term: &str, vocab: &TagVocabulary) -> Option<(String, f64, MatchStrategy)> {
        if vocab.is_tag(term) {
            return Some((term.to_string(), 1.0, MatchStrategy::Exact));
        }
        self.synonyms
            .resolve(term)
            .filter(|synonym| vocab.is_tag(&synonym.target))
            .map(|synonym| {
                (
                    synonym.target.clone(),
                    synonym.confidence,
                    MatchStrategy::Synonym,
                )
            })
    }

    /// Multi-word tags whose every content word was found
    fn compose(&self, found: &Found, vocab: &TagVocabulary) -> Vec<(String, f64, Vec<usize>)> {
        let candidates: BTreeSet<&str> = found
            .words
            .keys()
            .flat_map(|word| vocab.tags_with_word(word))
            .collect();

        let mut composed = Vec::new();
        for tag in candidates {
            let Some(words) = vocab.tag_words(tag) else {
                continue;
            };
            let mut confidence = 1.0_f64;
            let mut positions: Vec<usize> = Vec::new();
            let complete = words.iter().all(|word| {
                found.words.get(word).is_some_and(|hit| {
                    confidence = confidence.min(hit.confidence);
                    positions.extend(&hit.positions);
                    true
                })
            });
            if !complete {
                continue;
            }
            positions.sort_unstable();
            positions.dedup();
            let confidence = (self.settings.composite_factor * confidence)
                .min(MatchStrategy::Composite.ceiling());
            composed.push((tag.to_string(), confidence, positions));
        }
        composed
    }
}

/// Join adjacent tokens; no space where either side is CJK so that
/// `b` + `站` forms `b站`
fn join_window(tokens: &[String]) -> String {
    let mut out = String::new();
    for token in tokens {
        let glue = !out.is_empty()
            && !out.chars().last().is_some_and(is_segmented_script)
            && !token.chars().next().is_some_and(is_segmented_script);
        if glue {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}
