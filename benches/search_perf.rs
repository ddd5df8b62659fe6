//! Criterion benchmarks for the matching pipeline.
//!
//! Targets on the sample catalog:
//! - Intent query: < 1ms
//! - Keyword query: < 100us
//! - Full ingest: < 10ms

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use skillio::search::{
    EngineSettings, IntentNormalizer, MatchEngine, ReverseIndex, SearchOptions, SynonymTable,
};
use skillio::test_utils::sample_catalog;

const QUERIES: &[&str] = &[
    "I want to download a YouTube video",
    "下载 B 站视频",
    "convert video to GIF",
    "review my pull request",
    "yuotube",
];

fn setup() -> (MatchEngine, ReverseIndex) {
    let engine = MatchEngine::new(EngineSettings::default());
    let index = ReverseIndex::new();
    engine.ingest(&index, sample_catalog().expect("sample catalog parses"));
    (engine, index)
}

fn search_benchmarks(c: &mut Criterion) {
    let (engine, index) = setup();
    let mut group = c.benchmark_group("search");

    for query in QUERIES {
        group.bench_with_input(BenchmarkId::new("intent", query), query, |b, query| {
            let options = SearchOptions::default();
            b.iter(|| engine.search(&index, black_box(query), &options));
        });
    }

    group.bench_function("keyword", |b| {
        let options = SearchOptions {
            keyword_mode: true,
            ..SearchOptions::default()
        };
        b.iter(|| engine.search(&index, black_box("video download"), &options));
    });

    group.finish();
}

fn normalize_benchmarks(c: &mut Criterion) {
    let normalizer = IntentNormalizer::new(SynonymTable::builtin().lexicon());
    c.bench_function("normalize_mixed_script", |b| {
        b.iter(|| normalizer.normalize(black_box("我想把这个视频转成动图 please"), None));
    });
}

fn ingest_benchmarks(c: &mut Criterion) {
    let engine = MatchEngine::new(EngineSettings::default());
    let index = ReverseIndex::new();
    let catalog = sample_catalog().expect("sample catalog parses");
    c.bench_function("ingest_sample_catalog", |b| {
        b.iter(|| engine.ingest(&index, black_box(catalog.clone())));
    });
}

criterion_group!(
    benches,
    search_benchmarks,
    normalize_benchmarks,
    ingest_benchmarks
);
criterion_main!(benches);
