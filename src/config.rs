use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillioError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub robot: RobotConfig,
}

impl Config {
    /// Load configuration: explicit path (or `SKILLIO_CONFIG`), otherwise the
    /// global file then the project file; environment overrides last.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SKILLIO_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                SkillioError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(project_root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(raw: &str) -> Result<Self> {
        let patch: ConfigPatch = toml::from_str(raw)
            .map_err(|err| SkillioError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("skillio/config.toml"))
    }

    fn load_project(project_root: &Path) -> Result<Option<ConfigPatch>> {
        let path = project_root.join(".skillio/config.toml");
        Self::load_patch(&path)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path).map_err(|err| {
            SkillioError::Config(format!("read config {}: {err}", path.display()))
        })?;
        let patch = toml::from_str(&raw).map_err(|err| {
            SkillioError::Config(format!("parse config {}: {err}", path.display()))
        })?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.catalog {
            self.catalog.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.ranking {
            self.ranking.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
        if let Some(patch) = patch.robot {
            self.robot.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `SKILLIO_*` overrides read through `lookup`
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        if let Some(value) = env.string("SKILLIO_CATALOG_PATH") {
            self.catalog.path = Some(value);
        }
        if let Some(value) = env.string("SKILLIO_SYNONYMS_PATH") {
            self.catalog.synonyms_path = Some(value);
        }

        if let Some(value) = env.usize("SKILLIO_SEARCH_DEFAULT_LIMIT")? {
            self.search.default_limit = value;
        }
        if let Some(value) = env.f64("SKILLIO_SEARCH_MIN_SCORE")? {
            self.search.min_score = value;
        }
        if let Some(value) = env.f64("SKILLIO_SEARCH_FUZZY_THRESHOLD")? {
            self.search.fuzzy_threshold = value;
        }
        if let Some(value) = env.usize("SKILLIO_SEARCH_MAX_FUZZY_CANDIDATES")? {
            self.search.max_fuzzy_candidates = value;
        }
        if let Some(value) = env.usize("SKILLIO_SEARCH_MAX_NGRAM")? {
            self.search.max_ngram = value;
        }
        if let Some(value) = env.u64("SKILLIO_SEARCH_READY_TIMEOUT_MS")? {
            self.search.ready_timeout_ms = value;
        }
        if let Some(value) = env.string("SKILLIO_LOCALE") {
            self.search.default_locale = Some(value);
        }

        if let Some(value) = env.f64("SKILLIO_RANKING_RELEVANCE_WEIGHT")? {
            self.ranking.relevance_weight = value;
        }
        if let Some(value) = env.f64("SKILLIO_RANKING_QUALITY_WEIGHT")? {
            self.ranking.quality_weight = value;
        }
        if let Some(value) = env.f64("SKILLIO_RANKING_POPULARITY_WEIGHT")? {
            self.ranking.popularity_weight = value;
        }

        if env.bool("SKILLIO_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(value) = env.usize("SKILLIO_CACHE_MAX_ENTRIES")? {
            self.cache.max_entries = value;
        }

        if env.bool("SKILLIO_ROBOT").unwrap_or(false) {
            self.robot.enabled = true;
        }
        if let Some(value) = env.bool("SKILLIO_ROBOT_PRETTY") {
            self.robot.pretty = value;
        }

        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(SkillioError::Config(format!(
                    "{name} must be in (0, 1], got {value}"
                )))
            }
        };
        unit("search.fuzzy_threshold", self.search.fuzzy_threshold)?;
        unit("search.suggestion_threshold", self.search.suggestion_threshold)?;
        unit("ranking.fallback_ceiling", self.ranking.fallback_ceiling)?;
        if !(0.0..=1.0).contains(&self.search.min_score) {
            return Err(SkillioError::Config(format!(
                "search.min_score must be in [0, 1], got {}",
                self.search.min_score
            )));
        }

        let weights = [
            ("ranking.relevance_weight", self.ranking.relevance_weight),
            ("ranking.quality_weight", self.ranking.quality_weight),
            ("ranking.popularity_weight", self.ranking.popularity_weight),
        ];
        if let Some((name, value)) = weights
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(SkillioError::Config(format!(
                "{name} must be a non-negative number, got {value}"
            )));
        }
        if weights.iter().all(|(_, value)| *value == 0.0) {
            return Err(SkillioError::Config(
                "at least one ranking weight must be positive".to_string(),
            ));
        }

        if self.search.default_limit == 0 {
            return Err(SkillioError::Config(
                "search.default_limit must be at least 1".to_string(),
            ));
        }
        if self.search.max_ngram == 0 {
            return Err(SkillioError::Config(
                "search.max_ngram must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog file; defaults to `<root>/index/skills.yaml`
    #[serde(default)]
    pub path: Option<String>,
    /// Extra synonyms merged over the built-in table
    #[serde(default)]
    pub synonyms_path: Option<String>,
}

impl CatalogConfig {
    fn merge(&mut self, patch: CatalogPatch) {
        if let Some(value) = patch.path {
            self.path = Some(value);
        }
        if let Some(value) = patch.synonyms_path {
            self.synonyms_path = Some(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub default_limit: usize,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default)]
    pub fuzzy_threshold: f64,
    #[serde(default)]
    pub max_fuzzy_candidates: usize,
    #[serde(default)]
    pub min_fuzzy_len: usize,
    #[serde(default)]
    pub max_ngram: usize,
    #[serde(default)]
    pub suggestion_threshold: f64,
    #[serde(default)]
    pub ready_timeout_ms: u64,
    #[serde(default)]
    pub default_locale: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            min_score: 0.05,
            fuzzy_threshold: 0.8,
            max_fuzzy_candidates: 256,
            min_fuzzy_len: 4,
            max_ngram: 3,
            suggestion_threshold: 0.5,
            ready_timeout_ms: 2000,
            default_locale: None,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_limit {
            self.default_limit = value;
        }
        if let Some(value) = patch.min_score {
            self.min_score = value;
        }
        if let Some(value) = patch.fuzzy_threshold {
            self.fuzzy_threshold = value;
        }
        if let Some(value) = patch.max_fuzzy_candidates {
            self.max_fuzzy_candidates = value;
        }
        if let Some(value) = patch.min_fuzzy_len {
            self.min_fuzzy_len = value;
        }
        if let Some(value) = patch.max_ngram {
            self.max_ngram = value;
        }
        if let Some(value) = patch.suggestion_threshold {
            self.suggestion_threshold = value;
        }
        if let Some(value) = patch.ready_timeout_ms {
            self.ready_timeout_ms = value;
        }
        if let Some(value) = patch.default_locale {
            self.default_locale = Some(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub relevance_weight: f64,
    #[serde(default)]
    pub quality_weight: f64,
    #[serde(default)]
    pub popularity_weight: f64,
    #[serde(default)]
    pub fallback_ceiling: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            relevance_weight: 0.7,
            quality_weight: 0.2,
            popularity_weight: 0.1,
            fallback_ceiling: 0.25,
        }
    }
}

impl RankingConfig {
    fn merge(&mut self, patch: RankingPatch) {
        if let Some(value) = patch.relevance_weight {
            self.relevance_weight = value;
        }
        if let Some(value) = patch.quality_weight {
            self.quality_weight = value;
        }
        if let Some(value) = patch.popularity_weight {
            self.popularity_weight = value;
        }
        if let Some(value) = patch.fallback_ceiling {
            self.fallback_ceiling = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 128,
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.max_entries {
            self.max_entries = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Emit JSON even without `--robot`
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub pretty: bool,
    /// Include timestamp and version in the envelope
    #[serde(default)]
    pub include_metadata: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pretty: false,
            include_metadata: true,
        }
    }
}

impl RobotConfig {
    fn merge(&mut self, patch: RobotPatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.pretty {
            self.pretty = value;
        }
        if let Some(value) = patch.include_metadata {
            self.include_metadata = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub catalog: Option<CatalogPatch>,
    pub search: Option<SearchPatch>,
    pub ranking: Option<RankingPatch>,
    pub cache: Option<CachePatch>,
    pub robot: Option<RobotPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogPatch {
    pub path: Option<String>,
    pub synonyms_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_limit: Option<usize>,
    pub min_score: Option<f64>,
    pub fuzzy_threshold: Option<f64>,
    pub max_fuzzy_candidates: Option<usize>,
    pub min_fuzzy_len: Option<usize>,
    pub max_ngram: Option<usize>,
    pub suggestion_threshold: Option<f64>,
    pub ready_timeout_ms: Option<u64>,
    pub default_locale: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RankingPatch {
    pub relevance_weight: Option<f64>,
    pub quality_weight: Option<f64>,
    pub popularity_weight: Option<f64>,
    pub fallback_ceiling: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RobotPatch {
    pub enabled: Option<bool>,
    pub pretty: Option<bool>,
    pub include_metadata: Option<bool>,
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn bool(&self, key: &str) -> Option<bool> {
        (self.0)(key).map(|value| {
            matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn usize(&self, key: &str) -> Result<Option<usize>> {
        self.parsed(key)
    }

    fn u64(&self, key: &str) -> Result<Option<u64>> {
        self.parsed(key)
    }

    fn f64(&self, key: &str) -> Result<Option<f64>> {
        self.parsed(key)
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(key) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
                SkillioError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }
}
