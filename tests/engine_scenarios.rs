//! End-to-end matching scenarios over the sample catalog

use skillio::SkillioError;
use skillio::catalog::{CatalogSnapshot, load_catalog, parse_catalog};
use skillio::search::{
    EngineSettings, IndexState, MatchEngine, MatchStrategy, MatchTier, ReverseIndex,
    SearchOptions, SearchOutcome,
};
use skillio::test_utils::sample_catalog;

fn engine_and_index() -> (MatchEngine, ReverseIndex) {
    let engine = MatchEngine::new(EngineSettings::default());
    let index = ReverseIndex::new();
    let report = engine.ingest(&index, sample_catalog().unwrap());
    assert_eq!(report.indexed_count, 8, "rejections: {:?}", report.rejections);
    (engine, index)
}

fn search(engine: &MatchEngine, index: &ReverseIndex, query: &str) -> SearchOutcome {
    engine
        .search(index, query, &SearchOptions::default())
        .unwrap_or_else(|err| panic!("query {query:?} failed: {err}"))
}

fn ids(outcome: &SearchOutcome) -> Vec<&str> {
    outcome.matches.iter().map(|m| m.skill_id.as_str()).collect()
}

#[test]
fn every_scenario_finds_its_skill_in_top_five() {
    let (engine, index) = engine_and_index();
    let snapshot = index.snapshot();
    for record in snapshot.records() {
        for scenario in &record.scenarios {
            let outcome = search(&engine, &index, scenario);
            let top: Vec<&str> = ids(&outcome).into_iter().take(5).collect();
            println!("[TEST] {scenario:?} -> {top:?}");
            assert!(
                top.contains(&record.id.as_str()),
                "{} not in top 5 for {scenario:?}: {top:?}",
                record.id
            );
        }
    }
}

#[test]
fn english_download_intent_ranks_downloader_first() {
    let (engine, index) = engine_and_index();
    let outcome = search(&engine, &index, "I want to download a YouTube video");
    assert_eq!(outcome.matches[0].skill_id, "video-downloader");
    assert_eq!(outcome.matches[0].tier, MatchTier::Tag);

    let tags: Vec<&str> = outcome.matches[0]
        .matched_tags
        .iter()
        .map(|m| m.tag.as_str())
        .collect();
    assert!(tags.contains(&"youtube"));
    assert!(tags.contains(&"video download"));
}

#[test]
fn chinese_bilibili_intent_ranks_downloader_first() {
    let (engine, index) = engine_and_index();
    let outcome = search(&engine, &index, "下载 B 站视频");
    assert_eq!(outcome.matches[0].skill_id, "video-downloader");

    let bilibili = outcome.matches[0]
        .matched_tags
        .iter()
        .find(|m| m.tag == "bilibili")
        .expect("bilibili tag matched");
    assert_eq!(bilibili.strategy, MatchStrategy::Synonym);
}

#[test]
fn chinese_locale_hint_gives_same_top_result() {
    let (engine, index) = engine_and_index();
    let options = SearchOptions {
        locale: Some("zh-CN".to_string()),
        ..SearchOptions::default()
    };
    let outcome = engine.search(&index, "我想下载B站视频", &options).unwrap();
    assert_eq!(outcome.matches[0].skill_id, "video-downloader");
}

#[test]
fn repeated_queries_are_deterministic() {
    let (engine, index) = engine_and_index();
    for query in ["convert video to GIF", "下载 B 站视频", "review my pull request"] {
        let first = search(&engine, &index, query);
        for _ in 0..5 {
            assert_eq!(search(&engine, &index, query), first);
        }
    }
}

#[test]
fn separately_built_indexes_agree() {
    let (engine_a, index_a) = engine_and_index();
    let (engine_b, index_b) = engine_and_index();
    let query = "compress images and convert pdf to word";
    let a = search(&engine_a, &index_a, query);
    let b = search(&engine_b, &index_b, query);
    assert_eq!(a.matches, b.matches);
}

#[test]
fn removed_skill_is_never_returned_after_reingest() {
    let (engine, index) = engine_and_index();
    let mut catalog = sample_catalog().unwrap();
    catalog
        .records
        .retain(|raw| raw.name.as_deref() != Some("video-downloader"));
    let report = engine.ingest(&index, catalog);
    assert_eq!(report.indexed_count, 7);
    assert_eq!(report.generation, 2);

    for query in [
        "download video",
        "I want to download a YouTube video",
        "下载 B 站视频",
        "batch download a playlist",
    ] {
        let outcome = search(&engine, &index, query);
        assert!(
            !ids(&outcome).contains(&"video-downloader"),
            "removed skill returned for {query:?}"
        );
    }
}

#[test]
fn incremental_remove_matches_reingest() {
    let (engine, index) = engine_and_index();
    assert!(index.remove("video-downloader").is_some());
    assert!(index.remove("video-downloader").is_none());
    index.snapshot().verify().unwrap();

    let outcome = search(&engine, &index, "download video");
    assert!(!ids(&outcome).contains(&"video-downloader"));
    assert!(outcome.matches.iter().all(|m| m.tier == MatchTier::FullText));
}

#[test]
fn keyword_mode_requires_exact_tag() {
    let (engine, index) = engine_and_index();
    let options = SearchOptions {
        keyword_mode: true,
        ..SearchOptions::default()
    };
    let outcome = engine.search(&index, "video download", &options).unwrap();
    // video-to-gif mentions "video download" in its description only
    assert_eq!(ids(&outcome), vec!["video-downloader"]);
    assert!(outcome.matches.iter().all(|m| m.tier == MatchTier::Keyword));
}

#[test]
fn keyword_mode_falls_back_to_names_and_descriptions() {
    let (engine, index) = engine_and_index();
    let options = SearchOptions {
        keyword_mode: true,
        ..SearchOptions::default()
    };
    let outcome = engine.search(&index, "pull requests", &options).unwrap();
    assert_eq!(ids(&outcome), vec!["git-helper"]);
}

#[test]
fn keyword_mode_searches_localized_descriptions() {
    let (engine, index) = engine_and_index();
    let options = SearchOptions {
        keyword_mode: true,
        ..SearchOptions::default()
    };
    let outcome = engine.search(&index, "下载B站", &options).unwrap();
    assert_eq!(ids(&outcome), vec!["video-downloader"]);
}

#[test]
fn two_letter_latin_query_does_not_match_inside_words() {
    let (engine, index) = engine_and_index();
    for query in ["ed", "vi"] {
        let outcome = search(&engine, &index, query);
        assert!(outcome.matches.is_empty(), "{query:?}: {:?}", ids(&outcome));
    }
}

#[test]
fn punctuation_only_query_is_invalid() {
    let (engine, index) = engine_and_index();
    for query in ["?!...", "   ", "—,。！"] {
        let err = engine
            .search(&index, query, &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, SkillioError::InvalidQuery(_)), "{query:?}: {err}");
    }
}

#[test]
fn unknown_intent_returns_empty_list() {
    let (engine, index) = engine_and_index();
    let outcome = search(&engine, &index, "quantum entanglement simulator");
    assert!(outcome.matches.is_empty());
}

#[test]
fn limit_truncates_results() {
    let (engine, index) = engine_and_index();
    let options = SearchOptions {
        limit: 1,
        ..SearchOptions::default()
    };
    let outcome = engine
        .search(&index, "convert video to gif and pdf to word", &options)
        .unwrap();
    assert_eq!(outcome.matches.len(), 1);
}

#[test]
fn scores_are_sorted_within_tier() {
    let (engine, index) = engine_and_index();
    let outcome = search(&engine, &index, "convert video, pdf and images");
    for pair in outcome.matches.windows(2) {
        assert!(pair[0].tier <= pair[1].tier);
        if pair[0].tier == pair[1].tier {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}

#[test]
fn rejected_records_are_reported_not_indexed() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/catalog/with_rejections.yaml");
    let snapshot: CatalogSnapshot = load_catalog(&path).unwrap();
    let engine = MatchEngine::new(EngineSettings::default());
    let index = ReverseIndex::new();
    assert_eq!(index.state(), IndexState::Empty);

    let report = engine.ingest(&index, snapshot);
    assert_eq!(index.state(), IndexState::Ready);
    assert_eq!(report.indexed_count, 1);
    assert_eq!(report.rejected_count, 5);
    assert_eq!(
        report.rejected_ids,
        vec!["#5", "no-version", "bad-version", "no-capabilities", "gif-maker"]
    );
    // the duplicate's tag never reaches the index
    assert!(index.lookup("spam").is_empty());
    assert_eq!(index.lookup("gif").len(), 1);
}

#[test]
fn empty_catalog_publishes_empty_ready_index() {
    let engine = MatchEngine::new(EngineSettings::default());
    let index = ReverseIndex::new();
    let report = engine.ingest(&index, parse_catalog("skills: []").unwrap());
    assert_eq!(report.indexed_count, 0);
    assert_eq!(index.state(), IndexState::Ready);

    let outcome = search(&engine, &index, "download video");
    assert!(outcome.matches.is_empty());
    assert!(outcome.suggestion.is_none());
}

#[test]
fn concurrent_queries_during_reingest() {
    let (engine, index) = engine_and_index();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..20 {
                    let outcome = search(&engine, &index, "convert video to GIF");
                    assert_eq!(outcome.matches[0].skill_id, "video-to-gif");
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..5 {
                engine.ingest(&index, sample_catalog().unwrap());
            }
        });
    });
    assert_eq!(index.snapshot().generation(), 6);
}
