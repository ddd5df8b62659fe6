//! Reverse index: capability tag -> weighted skill postings
//!
//! Readers clone an `Arc` of the current [`IndexSnapshot`] and never observe
//! a half-applied update. Writers build a new snapshot off to the side and
//! swap it in; writers are serialized among themselves.
//!
//! A posting's weight is `centrality * rarity`. Centrality reflects where the
//! tag shows up in the record (name, description, scenarios); rarity is
//! `1 / (1 + ln df)` and depends only on how many skills carry the tag, so
//! an incremental update that recomputes just the touched tags produces the
//! same postings as a full rebuild.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, info};

use super::vocabulary::TagVocabulary;
use crate::catalog::{SkillRecord, canonicalize};
use crate::error::{Result, SkillioError};

const BASE_CENTRALITY: f64 = 0.5;
const NAME_BONUS: f64 = 0.2;
const DESCRIPTION_BONUS: f64 = 0.15;
const SCENARIO_BONUS: f64 = 0.15;

/// Number of example skills listed per category
const CATEGORY_EXAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Posting {
    pub skill_id: String,
    /// In (0, 1]
    pub weight: f64,
}

/// Flattened view of one posting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagIndexEntry {
    pub tag: String,
    pub skill_id: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Empty,
    Building,
    Ready,
}

impl IndexState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Building => "building",
            Self::Ready => "ready",
        }
    }
}

/// Immutable, published state of the index
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    generation: u64,
    records: BTreeMap<String, Arc<SkillRecord>>,
    haystacks: BTreeMap<String, String>,
    postings: BTreeMap<String, Vec<Posting>>,
    vocabulary: TagVocabulary,
}

impl IndexSnapshot {
    fn build(generation: u64, records: BTreeMap<String, Arc<SkillRecord>>) -> Self {
        let mut members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for record in records.values() {
            for tag in &record.capabilities {
                members
                    .entry(tag.clone())
                    .or_default()
                    .insert(record.id.clone());
            }
        }

        let postings = members
            .into_iter()
            .map(|(tag, ids)| {
                let list = postings_for(&tag, &ids, &records);
                (tag, list)
            })
            .collect::<BTreeMap<_, _>>();
        let haystacks = records
            .iter()
            .map(|(id, record)| (id.clone(), record.searchable_text()))
            .collect();
        let vocabulary = TagVocabulary::from_tags(postings.keys().map(String::as_str));

        Self {
            generation,
            records,
            haystacks,
            postings,
            vocabulary,
        }
    }

    /// Copy of `self` with `record` inserted or replaced
    fn with_record(&self, generation: u64, record: Arc<SkillRecord>) -> Self {
        let mut next = self.clone();
        next.generation = generation;
        let id = record.id.clone();

        let mut touched: BTreeSet<String> = record.capabilities.iter().cloned().collect();
        if let Some(previous) = next.records.get(&id) {
            touched.extend(previous.capabilities.iter().cloned());
        }
        next.haystacks.insert(id.clone(), record.searchable_text());
        next.records.insert(id.clone(), record);
        next.restage(&touched, &id);
        next
    }

    /// Copy of `self` without `id`, or None if it is not indexed
    fn without_record(&self, generation: u64, id: &str) -> Option<Self> {
        let previous = self.records.get(id)?;
        let touched: BTreeSet<String> = previous.capabilities.iter().cloned().collect();
        let mut next = self.clone();
        next.generation = generation;
        next.records.remove(id);
        next.haystacks.remove(id);
        next.restage(&touched, id);
        Some(next)
    }

    /// Recompute the postings of `tags` after `changed` was added, replaced
    /// or removed
    fn restage(&mut self, tags: &BTreeSet<String>, changed: &str) {
        let carries = self
            .records
            .get(changed)
            .map(|record| record.capabilities.clone())
            .unwrap_or_default();
        for tag in tags {
            let mut ids: BTreeSet<String> = self
                .postings
                .get(tag)
                .map(|list| list.iter().map(|p| p.skill_id.clone()).collect())
                .unwrap_or_default();
            ids.remove(changed);
            if carries.contains(tag) {
                ids.insert(changed.to_string());
            }
            if ids.is_empty() {
                self.postings.remove(tag);
            } else {
                let list = postings_for(tag, &ids, &self.records);
                self.postings.insert(tag.clone(), list);
            }
        }
        self.vocabulary = TagVocabulary::from_tags(self.postings.keys().map(String::as_str));
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Postings for an exact canonical tag, weight descending then id ascending
    #[must_use]
    pub fn lookup(&self, tag: &str) -> &[Posting] {
        self.postings.get(tag).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn record(&self, id: &str) -> Option<&Arc<SkillRecord>> {
        self.records.get(id)
    }

    /// Records in id order
    pub fn records(&self) -> impl Iterator<Item = &Arc<SkillRecord>> {
        self.records.values()
    }

    /// Lowercased full text of a record, used by the full-text fallback
    #[must_use]
    pub fn haystack(&self, id: &str) -> Option<&str> {
        self.haystacks.get(id).map(String::as_str)
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &TagVocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.postings.len()
    }

    /// Every posting as a flat entry, ordered by tag then posting order
    #[must_use]
    pub fn entries(&self) -> Vec<TagIndexEntry> {
        self.postings
            .iter()
            .flat_map(|(tag, list)| {
                list.iter().map(move |posting| TagIndexEntry {
                    tag: tag.clone(),
                    skill_id: posting.skill_id.clone(),
                    weight: posting.weight,
                })
            })
            .collect()
    }

    /// Check that postings and records agree
    pub fn verify(&self) -> Result<()> {
        for (tag, list) in &self.postings {
            if list.is_empty() {
                return Err(SkillioError::IndexInconsistency(format!(
                    "tag {tag} has an empty posting list"
                )));
            }
            for posting in list {
                let record = self.records.get(&posting.skill_id).ok_or_else(|| {
                    SkillioError::IndexInconsistency(format!(
                        "tag {tag} references unknown skill {}",
                        posting.skill_id
                    ))
                })?;
                if !record.capabilities.contains(tag) {
                    return Err(SkillioError::IndexInconsistency(format!(
                        "skill {} is posted under {tag} but does not carry it",
                        posting.skill_id
                    )));
                }
                if !(posting.weight > 0.0 && posting.weight <= 1.0) {
                    return Err(SkillioError::IndexInconsistency(format!(
                        "weight {} out of range for {tag}/{}",
                        posting.weight, posting.skill_id
                    )));
                }
            }
        }
        for record in self.records.values() {
            for tag in &record.capabilities {
                let posted = self
                    .lookup(tag)
                    .iter()
                    .any(|posting| posting.skill_id == record.id);
                if !posted {
                    return Err(SkillioError::IndexInconsistency(format!(
                        "skill {} carries {tag} but is not posted under it",
                        record.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Category counts with a few example skill ids each, sorted by name
    #[must_use]
    pub fn categories(&self) -> Vec<CategorySummary> {
        let mut by_name: BTreeMap<&str, CategorySummary> = BTreeMap::new();
        for record in self.records.values() {
            for category in &record.categories {
                let summary = by_name
                    .entry(category.as_str())
                    .or_insert_with(|| CategorySummary {
                        name: category.clone(),
                        count: 0,
                        examples: Vec::new(),
                    });
                summary.count += 1;
                if summary.examples.len() < CATEGORY_EXAMPLES {
                    summary.examples.push(record.id.clone());
                }
            }
        }
        by_name.into_values().collect()
    }

    /// Records labelled with `category`, in id order
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<Arc<SkillRecord>> {
        let category = canonicalize(category);
        self.records
            .values()
            .filter(|record| record.categories.contains(&category))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn drop_record_keep_postings(&mut self, id: &str) {
        self.records.remove(id);
        self.haystacks.remove(id);
    }
}

fn postings_for(
    tag: &str,
    ids: &BTreeSet<String>,
    records: &BTreeMap<String, Arc<SkillRecord>>,
) -> Vec<Posting> {
    let rarity = rarity(ids.len());
    let mut list: Vec<Posting> = ids
        .iter()
        .filter_map(|id| {
            records.get(id).map(|record| Posting {
                skill_id: id.clone(),
                weight: centrality(record, tag) * rarity,
            })
        })
        .collect();
    list.sort_by(|a, b| {
        b.weight
            .total_cmp(&a.weight)
            .then_with(|| a.skill_id.cmp(&b.skill_id))
    });
    list
}

#[allow(clippy::cast_precision_loss)]
fn rarity(document_frequency: usize) -> f64 {
    1.0 / (1.0 + (document_frequency.max(1) as f64).ln())
}

fn centrality(record: &SkillRecord, tag: &str) -> f64 {
    let name = canonicalize(&record.name.replace(['-', '_'], " "));
    let mut score = BASE_CENTRALITY;
    if name.contains(tag) {
        score += NAME_BONUS;
    }
    if canonicalize(&record.description).contains(tag) {
        score += DESCRIPTION_BONUS;
    }
    if record
        .scenarios
        .iter()
        .any(|scenario| canonicalize(scenario).contains(tag))
    {
        score += SCENARIO_BONUS;
    }
    score.min(1.0)
}

struct Published {
    snapshot: Option<Arc<IndexSnapshot>>,
    building: bool,
}

/// Handle to the index shared by the engine's callers
pub struct ReverseIndex {
    published: Mutex<Published>,
    ready: Condvar,
    /// Serializes writers; holds the last generation handed out
    writer: Mutex<u64>,
}

impl Default for ReverseIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Published {
                snapshot: None,
                building: false,
            }),
            ready: Condvar::new(),
            writer: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn state(&self) -> IndexState {
        let published = self.published.lock();
        if published.snapshot.is_some() {
            IndexState::Ready
        } else if published.building {
            IndexState::Building
        } else {
            IndexState::Empty
        }
    }

    /// Current snapshot, if one has been published
    #[must_use]
    pub fn try_snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.published.lock().snapshot.clone()
    }

    /// Current snapshot, blocking until the first one is published
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        let mut published = self.published.lock();
        loop {
            if let Some(snapshot) = &published.snapshot {
                return Arc::clone(snapshot);
            }
            self.ready.wait(&mut published);
        }
    }

    /// Current snapshot, waiting at most `timeout` for the first publish
    pub fn wait_ready(&self, timeout: Duration) -> Result<Arc<IndexSnapshot>> {
        let mut published = self.published.lock();
        if published.snapshot.is_none() {
            let _ = self
                .ready
                .wait_while_for(&mut published, |p| p.snapshot.is_none(), timeout);
        }
        published.snapshot.clone().ok_or_else(|| {
            SkillioError::IndexNotReady(format!(
                "no index snapshot published within {}ms",
                timeout.as_millis()
            ))
        })
    }

    /// Postings for `tag` in the current snapshot (empty before the first
    /// publish)
    #[must_use]
    pub fn lookup(&self, tag: &str) -> Vec<Posting> {
        self.try_snapshot()
            .map(|snapshot| snapshot.lookup(&canonicalize(tag)).to_vec())
            .unwrap_or_default()
    }

    /// Replace the whole index. Later records win on duplicate ids.
    pub fn rebuild(&self, records: Vec<SkillRecord>) -> Arc<IndexSnapshot> {
        self.rebuild_shared(records.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn rebuild_shared(&self, records: Vec<Arc<SkillRecord>>) -> Arc<IndexSnapshot> {
        let mut generation = self.writer.lock();
        self.set_building();
        *generation += 1;
        let map: BTreeMap<String, Arc<SkillRecord>> = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        let snapshot = Arc::new(IndexSnapshot::build(*generation, map));
        info!(
            target: "skillio::index",
            generation = *generation,
            skills = snapshot.len(),
            tags = snapshot.tag_count(),
            "index rebuilt"
        );
        self.publish(Arc::clone(&snapshot));
        snapshot
    }

    /// Rebuild the published snapshot from its own records, provided it is
    /// still `generation`. None when a newer snapshot has been published.
    pub(crate) fn rebuild_if_current(&self, generation: u64) -> Option<Arc<IndexSnapshot>> {
        let mut current = self.writer.lock();
        let base = self
            .try_snapshot()
            .filter(|snapshot| snapshot.generation() == generation)?;
        *current += 1;
        let snapshot = Arc::new(IndexSnapshot::build(*current, base.records.clone()));
        info!(
            target: "skillio::index",
            stale = generation,
            generation = *current,
            skills = snapshot.len(),
            "inconsistent snapshot rebuilt"
        );
        self.publish(Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Insert or replace one record
    pub fn add(&self, record: SkillRecord) -> Arc<IndexSnapshot> {
        let mut generation = self.writer.lock();
        let base = self.try_snapshot().unwrap_or_default();
        *generation += 1;
        let id = record.id.clone();
        let snapshot = Arc::new(base.with_record(*generation, Arc::new(record)));
        debug!(target: "skillio::index", generation = *generation, skill = %id, "skill indexed");
        self.publish(Arc::clone(&snapshot));
        snapshot
    }

    /// Remove one record; None when it was not indexed
    pub fn remove(&self, id: &str) -> Option<Arc<IndexSnapshot>> {
        let mut generation = self.writer.lock();
        let base = self.try_snapshot()?;
        let next = base.without_record(*generation + 1, id)?;
        *generation += 1;
        let snapshot = Arc::new(next);
        debug!(target: "skillio::index", generation = *generation, skill = %id, "skill removed");
        self.publish(Arc::clone(&snapshot));
        Some(snapshot)
    }

    fn set_building(&self) {
        let mut published = self.published.lock();
        if published.snapshot.is_none() {
            published.building = true;
        }
    }

    fn publish(&self, snapshot: Arc<IndexSnapshot>) {
        let mut published = self.published.lock();
        published.snapshot = Some(snapshot);
        published.building = false;
        drop(published);
        self.ready.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn publish_for_test(&self, snapshot: IndexSnapshot) {
        self.publish(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::catalog::{SkillSource, SourceKind};

    fn record(id: &str, caps: &[&str]) -> SkillRecord {
        SkillRecord {
            id: id.to_string(),
            name: id.to_string(),
            version: semver::Version::new(1, 0, 0),
            source: SkillSource {
                kind: SourceKind::Manual,
                locator: None,
            },
            description: format!("{id} does {}", caps.join(" and ")),
            localized_descriptions: BTreeMap::new(),
            capabilities: caps.iter().map(|c| (*c).to_string()).collect(),
            scenarios: Vec::new(),
            dependencies: Vec::new(),
            categories: vec!["media".to_string()],
            quality: 0.5,
            popularity: 0.0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_rarity_is_bounded() {
        assert!((rarity(1) - 1.0).abs() < 1e-12);
        assert!(rarity(2) < rarity(1));
        assert!(rarity(100) > 0.0);
    }

    #[test]
    fn test_lookup_orders_by_weight_then_id() {
        let index = ReverseIndex::new();
        let mut central = record("zz-gif", &["gif"]);
        central.scenarios = vec!["make a gif".into()];
        index.rebuild(vec![record("aa", &["gif"]), record("bb", &["gif"]), central]);
        let ids: Vec<String> = index.lookup("GIF").into_iter().map(|p| p.skill_id).collect();
        assert_eq!(ids, vec!["zz-gif", "aa", "bb"]);
    }

    #[test]
    fn test_weights_in_unit_interval() {
        let index = ReverseIndex::new();
        let snapshot = index.rebuild(vec![
            record("video-download", &["video download", "youtube"]),
            record("b", &["youtube"]),
        ]);
        for entry in snapshot.entries() {
            assert!(entry.weight > 0.0 && entry.weight <= 1.0, "{entry:?}");
        }
        snapshot.verify().unwrap();
    }

    #[test]
    fn test_incremental_matches_rebuild() {
        let a = record("a", &["gif", "video"]);
        let b = record("b", &["gif"]);
        let c = record("c", &["video", "pdf"]);

        let incremental = ReverseIndex::new();
        incremental.rebuild(vec![a.clone(), b.clone()]);
        incremental.add(c.clone());
        let after_add = incremental.snapshot();

        let full = ReverseIndex::new();
        let rebuilt = full.rebuild(vec![a.clone(), b.clone(), c]);
        assert_eq!(after_add.entries(), rebuilt.entries());

        let after_remove = incremental.remove("c").unwrap();
        let rebuilt = full.rebuild(vec![a, b]);
        assert_eq!(after_remove.entries(), rebuilt.entries());
        assert!(after_remove.lookup("pdf").is_empty());
        after_remove.verify().unwrap();
    }

    #[test]
    fn test_replace_record_drops_old_tags() {
        let index = ReverseIndex::new();
        index.rebuild(vec![record("a", &["gif"])]);
        let snapshot = index.add(record("a", &["png"]));
        assert!(snapshot.lookup("gif").is_empty());
        assert_eq!(snapshot.lookup("png").len(), 1);
        assert!(!snapshot.vocabulary().is_tag("gif"));
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let index = ReverseIndex::new();
        assert!(index.remove("nope").is_none());
        index.rebuild(vec![record("a", &["gif"])]);
        assert!(index.remove("nope").is_none());
        assert_eq!(index.snapshot().generation(), 1);
    }

    #[test]
    fn test_state_transitions() {
        let index = ReverseIndex::new();
        assert_eq!(index.state(), IndexState::Empty);
        assert!(index.try_snapshot().is_none());
        assert!(index.wait_ready(Duration::from_millis(10)).is_err());
        index.rebuild(Vec::new());
        assert_eq!(index.state(), IndexState::Ready);
        assert!(index.wait_ready(Duration::from_millis(10)).unwrap().is_empty());
    }

    #[test]
    fn test_readers_wait_for_first_publish() {
        let index = Arc::new(ReverseIndex::new());
        let reader = {
            let index = Arc::clone(&index);
            thread::spawn(move || index.wait_ready(Duration::from_secs(5)).map(|s| s.len()))
        };
        index.rebuild(vec![record("a", &["gif"])]);
        assert_eq!(reader.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_old_snapshot_survives_update() {
        let index = ReverseIndex::new();
        let before = index.rebuild(vec![record("a", &["gif"])]);
        index.add(record("b", &["gif"]));
        assert_eq!(before.lookup("gif").len(), 1);
        assert_eq!(index.snapshot().lookup("gif").len(), 2);
        assert!(index.snapshot().generation() > before.generation());
    }

    #[test]
    fn test_verify_detects_dangling_posting() {
        let index = ReverseIndex::new();
        let snapshot = index.rebuild(vec![record("a", &["gif"]), record("b", &["gif"])]);
        let mut broken = (*snapshot).clone();
        broken.drop_record_keep_postings("b");
        let err = broken.verify().unwrap_err();
        assert!(matches!(err, SkillioError::IndexInconsistency(_)));
    }

    #[test]
    fn test_rebuild_if_current_skips_superseded_generation() {
        let index = ReverseIndex::new();
        let stale = index.rebuild(vec![record("a", &["gif"]), record("b", &["gif"])]);
        index.rebuild(vec![record("a", &["gif"])]);

        assert!(index.rebuild_if_current(stale.generation()).is_none());
        let current = index.snapshot();
        assert_eq!(current.generation(), 2);
        assert!(current.record("b").is_none());

        let rebuilt = index.rebuild_if_current(2).unwrap();
        assert_eq!(rebuilt.generation(), 3);
        assert_eq!(rebuilt.len(), 1);
        rebuilt.verify().unwrap();
    }

    #[test]
    fn test_categories() {
        let index = ReverseIndex::new();
        let mut doc = record("pdf", &["pdf"]);
        doc.categories = vec!["documents".into()];
        let snapshot = index.rebuild(vec![record("a", &["gif"]), record("b", &["png"]), doc]);
        let categories = snapshot.categories();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "documents");
        assert_eq!(categories[1].count, 2);
        assert_eq!(categories[1].examples, vec!["a", "b"]);
        assert_eq!(snapshot.by_category("Media").len(), 2);
    }
}
