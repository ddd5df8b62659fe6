//! Ranking of index candidates
//!
//! `relevance = sum(weight * confidence) / distinct query tags` and
//! `score = w_r * relevance + w_q * quality + w_p * popularity`. Results are
//! ordered by tier, then score descending, then skill id ascending, so equal
//! inputs always rank identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::extract::{Extraction, MatchStrategy};
use super::index::IndexSnapshot;
use crate::catalog::{SkillRecord, canonicalize};
use crate::error::{Result, SkillioError};

/// Latin fallback terms shorter than this many chars are not searched
const MIN_FALLBACK_CHARS: usize = 3;

/// Minimum for terms with non-ASCII chars such as CJK
const MIN_FALLBACK_CHARS_WIDE: usize = 2;

/// Keyword-mode relevance counts tag, name and description hits
const KEYWORD_FIELDS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub relevance: f64,
    pub quality: f64,
    pub popularity: f64,
    /// Relevance cap for full-text fallback results
    pub fallback_ceiling: f64,
    /// Results scoring below this are dropped
    pub min_score: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            relevance: 0.7,
            quality: 0.2,
            popularity: 0.1,
            fallback_ceiling: 0.25,
            min_score: 0.05,
        }
    }
}

/// Which pass produced a result; earlier tiers always rank first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Tag,
    Keyword,
    FullText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedTag {
    pub tag: String,
    pub strategy: MatchStrategy,
    pub confidence: f64,
    pub weight: f64,
}

/// One ranked result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillMatch {
    pub skill_id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub score: f64,
    pub relevance: f64,
    pub tier: MatchTier,
    pub matched_tags: Vec<MatchedTag>,
}

#[derive(Debug, Default)]
struct Candidate {
    sum: f64,
    matched: Vec<MatchedTag>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker {
    weights: RankingWeights,
}

impl Ranker {
    #[must_use]
    pub const fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub const fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Rank tag candidates, or run the full-text fallback when there are none
    pub fn rank(
        &self,
        snapshot: &IndexSnapshot,
        extraction: &Extraction,
        limit: usize,
    ) -> Result<Vec<SkillMatch>> {
        if extraction.tags.is_empty() {
            return self.rank_full_text(snapshot, &extraction.fallback, limit);
        }

        let mut candidates: BTreeMap<&str, Candidate> = BTreeMap::new();
        for tag_match in &extraction.tags {
            let confidence = tag_match.confidence.min(tag_match.strategy.ceiling());
            for posting in snapshot.lookup(&tag_match.tag) {
                let candidate = candidates.entry(posting.skill_id.as_str()).or_default();
                candidate.sum += posting.weight * confidence;
                candidate.matched.push(MatchedTag {
                    tag: tag_match.tag.clone(),
                    strategy: tag_match.strategy,
                    confidence,
                    weight: posting.weight,
                });
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let query_tags = extraction.tags.len() as f64;
        let mut results = Vec::with_capacity(candidates.len());
        for (id, candidate) in candidates {
            let record = resolve(snapshot, id)?;
            let relevance = (candidate.sum / query_tags).min(1.0);
            results.push(self.build(record, relevance, MatchTier::Tag, candidate.matched));
        }
        Ok(self.finish(results, limit))
    }

    /// Substring search of unresolved terms over record text
    pub fn rank_full_text(
        &self,
        snapshot: &IndexSnapshot,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<SkillMatch>> {
        let mut searched: Vec<&str> = Vec::new();
        for term in terms {
            if long_enough(term) && !searched.contains(&term.as_str()) {
                searched.push(term);
            }
        }
        if searched.is_empty() {
            return Ok(Vec::new());
        }
        debug!(target: "skillio::rank", terms = ?searched, "full-text fallback");

        #[allow(clippy::cast_precision_loss)]
        let total = searched.len() as f64;
        let ceiling = self.weights.fallback_ceiling;
        let mut results = Vec::new();
        for record in snapshot.records() {
            let haystack = snapshot.haystack(&record.id).ok_or_else(|| {
                SkillioError::IndexInconsistency(format!("no searchable text for {}", record.id))
            })?;
            let hits: Vec<&str> = searched
                .iter()
                .copied()
                .filter(|term| haystack.contains(term))
                .collect();
            if hits.is_empty() {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let relevance = ceiling * hits.len() as f64 / total;
            let matched = hits
                .into_iter()
                .map(|term| MatchedTag {
                    tag: term.to_string(),
                    strategy: MatchStrategy::FullText,
                    confidence: ceiling,
                    weight: 1.0 / total,
                })
                .collect();
            results.push(self.build(record, relevance, MatchTier::FullText, matched));
        }
        Ok(self.finish(results, limit))
    }

    /// Literal keyword match. Skills carrying the keyword as a tag qualify;
    /// name and description substrings count only when no skill does.
    pub fn rank_keyword(
        &self,
        snapshot: &IndexSnapshot,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<SkillMatch>> {
        let keyword = canonicalize(keyword);
        if keyword.is_empty() {
            return Err(SkillioError::InvalidQuery(
                "keyword query is empty".to_string(),
            ));
        }

        let field_hits = |record: &SkillRecord| {
            let name = canonicalize(&record.name.replace(['-', '_'], " "));
            let in_name = name.contains(&keyword) || canonicalize(&record.name).contains(&keyword);
            let in_description = canonicalize(&record.description).contains(&keyword)
                || record
                    .localized_descriptions
                    .values()
                    .any(|text| canonicalize(text).contains(&keyword));
            usize::from(in_name) + usize::from(in_description)
        };

        let mut results = Vec::new();
        let postings = snapshot.lookup(&keyword);
        if postings.is_empty() {
            for record in snapshot.records() {
                let hits = field_hits(record);
                if hits == 0 {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let relevance = hits as f64 / KEYWORD_FIELDS;
                let matched = vec![MatchedTag {
                    tag: keyword.clone(),
                    strategy: MatchStrategy::FullText,
                    confidence: 1.0,
                    weight: relevance,
                }];
                results.push(self.build(record, relevance, MatchTier::Keyword, matched));
            }
        } else {
            for posting in postings {
                let record = resolve(snapshot, &posting.skill_id)?;
                #[allow(clippy::cast_precision_loss)]
                let relevance = (1 + field_hits(record)) as f64 / KEYWORD_FIELDS;
                let matched = vec![MatchedTag {
                    tag: keyword.clone(),
                    strategy: MatchStrategy::Exact,
                    confidence: 1.0,
                    weight: posting.weight,
                }];
                results.push(self.build(record, relevance, MatchTier::Keyword, matched));
            }
        }
        Ok(self.finish(results, limit))
    }

    fn build(
        &self,
        record: &SkillRecord,
        relevance: f64,
        tier: MatchTier,
        mut matched_tags: Vec<MatchedTag>,
    ) -> SkillMatch {
        matched_tags.sort_by(|a, b| {
            (b.weight * b.confidence)
                .total_cmp(&(a.weight * a.confidence))
                .then_with(|| a.tag.cmp(&b.tag))
        });
        SkillMatch {
            skill_id: record.id.clone(),
            name: record.name.clone(),
            version: record.version.to_string(),
            description: record.description.clone(),
            score: self.score(relevance, record),
            relevance,
            tier,
            matched_tags,
        }
    }

    #[must_use]
    pub fn score(&self, relevance: f64, record: &SkillRecord) -> f64 {
        self.weights.relevance * relevance
            + self.weights.quality * record.quality
            + self.weights.popularity * record.popularity
    }

    fn finish(&self, mut results: Vec<SkillMatch>, limit: usize) -> Vec<SkillMatch> {
        results.retain(|m| m.relevance > 0.0 && m.score >= self.weights.min_score);
        results.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| a.skill_id.cmp(&b.skill_id))
        });
        results.truncate(limit);
        results
    }
}

fn long_enough(term: &str) -> bool {
    let min = if term.is_ascii() {
        MIN_FALLBACK_CHARS
    } else {
        MIN_FALLBACK_CHARS_WIDE
    };
    term.chars().count() >= min
}

fn resolve<'a>(snapshot: &'a IndexSnapshot, id: &str) -> Result<&'a SkillRecord> {
    snapshot.record(id).map(|record| &**record).ok_or_else(|| {
        SkillioError::IndexInconsistency(format!("posting references unknown skill {id}"))
    })
}
