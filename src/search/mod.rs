//! Capability matching
//!
//! Query -> [`normalize`] -> [`extract`] (tags + fallback terms) ->
//! [`index`] lookup -> [`rank`]. [`engine`] ties the stages together over
//! a shared [`ReverseIndex`].

pub mod cache;
pub mod engine;
pub mod extract;
pub mod fuzzy;
pub mod index;
pub mod normalize;
pub mod rank;
pub mod synonyms;
pub mod vocabulary;

pub use cache::{CacheStats, QueryCache};
pub use engine::{EngineSettings, IngestReport, MatchEngine, SearchOptions, SearchOutcome};
pub use extract::{Extraction, MatchStrategy, TagExtractor, TagMatch};
pub use index::{CategorySummary, IndexSnapshot, IndexState, Posting, ReverseIndex, TagIndexEntry};
pub use normalize::{IntentNormalizer, Lexicon, Locale, NormalizedQuery};
pub use rank::{MatchTier, MatchedTag, Ranker, RankingWeights, SkillMatch};
pub use synonyms::SynonymTable;
pub use vocabulary::TagVocabulary;
