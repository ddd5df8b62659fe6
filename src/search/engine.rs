//! Match engine: ingest and search over an explicit [`ReverseIndex`] handle

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::cache::QueryCache;
use super::extract::{ExtractorSettings, TagExtractor};
use super::index::{IndexSnapshot, ReverseIndex};
use super::normalize::IntentNormalizer;
use super::rank::{Ranker, RankingWeights, SkillMatch};
use super::synonyms::SynonymTable;
use crate::catalog::{CatalogSnapshot, Rejection, SkillRecord, canonicalize, validate};
use crate::config::Config;
use crate::error::{Result, SkillioError};

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub extractor: ExtractorSettings,
    pub ranking: RankingWeights,
    /// Upper bound on waiting for the first index publish
    pub ready_timeout: Duration,
    pub default_locale: Option<String>,
    /// Query cache capacity; None disables caching
    pub cache_entries: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            extractor: ExtractorSettings::default(),
            ranking: RankingWeights::default(),
            ready_timeout: Duration::from_millis(2000),
            default_locale: None,
            cache_entries: None,
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let search = &config.search;
        Self {
            extractor: ExtractorSettings {
                fuzzy_threshold: search.fuzzy_threshold,
                max_fuzzy_candidates: search.max_fuzzy_candidates,
                min_fuzzy_len: search.min_fuzzy_len,
                max_ngram: search.max_ngram,
                suggestion_threshold: search.suggestion_threshold,
                ..ExtractorSettings::default()
            },
            ranking: RankingWeights {
                relevance: config.ranking.relevance_weight,
                quality: config.ranking.quality_weight,
                popularity: config.ranking.popularity_weight,
                fallback_ceiling: config.ranking.fallback_ceiling,
                min_score: search.min_score,
            },
            ready_timeout: Duration::from_millis(search.ready_timeout_ms),
            default_locale: search.default_locale.clone(),
            cache_entries: config.cache.enabled.then_some(config.cache.max_entries),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchOptions {
    /// Treat the query as one literal keyword
    pub keyword_mode: bool,
    pub limit: usize,
    pub locale: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            keyword_mode: false,
            limit: DEFAULT_LIMIT,
            locale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub matches: Vec<SkillMatch>,
    /// Nearest known tag when nothing matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Index generation the results were computed against
    pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub indexed_count: usize,
    pub rejected_count: usize,
    pub rejected_ids: Vec<String>,
    pub rejections: Vec<Rejection>,
    pub warning_count: usize,
    pub generation: u64,
}

pub struct MatchEngine {
    normalizer: IntentNormalizer,
    extractor: TagExtractor,
    ranker: Ranker,
    settings: EngineSettings,
    cache: Option<QueryCache>,
}

impl MatchEngine {
    /// Engine with the built-in synonym table
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_synonyms(settings, SynonymTable::builtin())
    }

    #[must_use]
    pub fn with_synonyms(settings: EngineSettings, synonyms: SynonymTable) -> Self {
        let normalizer = IntentNormalizer::new(synonyms.lexicon());
        let cache = settings.cache_entries.map(QueryCache::new);
        Self {
            normalizer,
            extractor: TagExtractor::new(synonyms, settings.extractor),
            ranker: Ranker::new(settings.ranking),
            settings,
            cache,
        }
    }

    /// Build from configuration, merging a user synonyms file when one is
    /// configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut synonyms = SynonymTable::builtin();
        if let Some(path) = config.catalog.synonyms_path.as_deref() {
            let user = SynonymTable::load(std::path::Path::new(path))?;
            debug!(path, aliases = user.len(), "user synonyms merged");
            synonyms.merge(user);
        }
        Ok(Self::with_synonyms(
            EngineSettings::from_config(config),
            synonyms,
        ))
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    /// Validate a catalog snapshot and publish it as the new index.
    ///
    /// Invalid records are reported, never fatal. The first record with a
    /// given name wins; later duplicates are rejected.
    pub fn ingest(&self, index: &ReverseIndex, snapshot: CatalogSnapshot) -> IngestReport {
        let started = Instant::now();
        let validated: Vec<_> = snapshot
            .records
            .par_iter()
            .enumerate()
            .map(|(position, raw)| validate(raw, position))
            .collect();

        let mut report = IngestReport::default();
        let mut rejections = snapshot.malformed;
        let mut seen = HashSet::new();
        let mut records: Vec<Arc<SkillRecord>> = Vec::with_capacity(validated.len());

        for (position, outcome) in validated.into_iter().enumerate() {
            match outcome {
                Ok(validated) => {
                    for warning in &validated.warnings {
                        debug!(
                            target: "skillio::ingest",
                            skill = %validated.record.id,
                            field = %warning.field,
                            "{}",
                            warning.message
                        );
                    }
                    report.warning_count += validated.warnings.len();
                    if seen.insert(validated.record.id.clone()) {
                        records.push(Arc::new(validated.record));
                    } else {
                        rejections.push(Rejection {
                            id: validated.record.id,
                            reason: "duplicate skill name".to_string(),
                        });
                    }
                }
                Err(SkillioError::SchemaValidation { id, reason }) => {
                    rejections.push(Rejection { id, reason });
                }
                Err(other) => rejections.push(Rejection {
                    id: snapshot.records[position].display_id(position),
                    reason: other.to_string(),
                }),
            }
        }

        for rejection in &rejections {
            warn!(target: "skillio::ingest", skill = %rejection.id, reason = %rejection.reason, "record rejected");
        }

        let published = index.rebuild_shared(records);
        report.indexed_count = published.len();
        report.rejected_count = rejections.len();
        report.rejected_ids = rejections.iter().map(|r| r.id.clone()).collect();
        report.rejections = rejections;
        report.generation = published.generation();

        info!(
            target: "skillio::ingest",
            indexed = report.indexed_count,
            rejected = report.rejected_count,
            generation = report.generation,
            elapsed_ms = started.elapsed().as_millis(),
            "catalog ingested"
        );
        report
    }

    /// Resolve a query to ranked skills.
    ///
    /// Waits up to the configured ready timeout for the first index publish.
    /// An inconsistent snapshot is rebuilt and the query retried once.
    pub fn search(
        &self,
        index: &ReverseIndex,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let snapshot = index.wait_ready(self.settings.ready_timeout)?;
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(snapshot.generation(), query, options))
        {
            return Ok(cached);
        }

        let outcome = self.query_snapshot(index, &snapshot, query, options)?;
        if let Some(cache) = &self.cache {
            cache.put(outcome.generation, query, options, outcome.clone());
        }
        Ok(outcome)
    }

    /// Run `query` against `snapshot`. On inconsistency the snapshot is
    /// rebuilt only if it is still the published one; otherwise the query
    /// moves to the newer snapshot. Either way it is retried once.
    fn query_snapshot(
        &self,
        index: &ReverseIndex,
        snapshot: &IndexSnapshot,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        match self.run_query(snapshot, query, options) {
            Err(SkillioError::IndexInconsistency(detail)) => {
                warn!(
                    target: "skillio::search",
                    generation = snapshot.generation(),
                    %detail,
                    "inconsistent index snapshot, rebuilding"
                );
                let retry = index
                    .rebuild_if_current(snapshot.generation())
                    .unwrap_or_else(|| index.snapshot());
                self.run_query(&retry, query, options)
            }
            other => other,
        }
    }

    fn run_query(
        &self,
        snapshot: &IndexSnapshot,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let vocabulary = snapshot.vocabulary();
        let (matches, unresolved) = if options.keyword_mode {
            let matches = self.ranker.rank_keyword(snapshot, query, options.limit)?;
            (matches, vec![canonicalize(query)])
        } else {
            let locale = options
                .locale
                .as_deref()
                .or(self.settings.default_locale.as_deref());
            let normalized =
                self.normalizer
                    .normalize_with(query, locale, Some(vocabulary.lexicon()))?;
            let extraction = self.extractor.extract(&normalized, vocabulary);
            debug!(
                target: "skillio::search",
                tokens = ?normalized.tokens,
                tags = extraction.tags.len(),
                fallback = ?extraction.fallback,
                "query resolved"
            );
            let matches = self.ranker.rank(snapshot, &extraction, options.limit)?;
            (matches, extraction.fallback)
        };

        let suggestion = if matches.is_empty() {
            self.extractor.suggest(&unresolved, vocabulary)
        } else {
            None
        };

        Ok(SearchOutcome {
            query: query.to_string(),
            matches,
            suggestion,
            generation: snapshot.generation(),
        })
    }
}
