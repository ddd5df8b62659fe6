//! Bounded fuzzy term matching
//!
//! Optimal string alignment distance (Damerau-Levenshtein restricted to
//! non-overlapping transpositions) over chars, with candidates bucketed by
//! length so only lengths that can still reach the threshold are compared.

use std::collections::BTreeMap;

/// Edit distance counting insertion, deletion, substitution and adjacent
/// transposition as one edit each
#[must_use]
pub fn osa_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len() + 1;
    let mut before: Vec<usize> = vec![0; width];
    let mut prev: Vec<usize> = (0..width).collect();
    let mut row: Vec<usize> = vec![0; width];

    for i in 1..=a.len() {
        row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(before[j - 2] + 1);
            }
            row[j] = best;
        }
        std::mem::swap(&mut before, &mut prev);
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// `1 - distance / max_len`, in [0, 1]
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    similarity_chars(&a, &b)
}

#[allow(clippy::cast_precision_loss)]
fn similarity_chars(a: &[char], b: &[char]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - osa_distance(a, b) as f64 / longest as f64
}

/// Candidate terms keyed by char length, each bucket sorted
#[derive(Debug, Clone, Default)]
pub struct LengthBuckets {
    buckets: BTreeMap<usize, Vec<String>>,
}

impl LengthBuckets {
    /// Build from arbitrary terms; duplicates collapse
    pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a str>) -> Self {
        let mut buckets: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for term in terms {
            buckets
                .entry(term.chars().count())
                .or_default()
                .push(term.to_string());
        }
        for bucket in buckets.values_mut() {
            bucket.sort();
            bucket.dedup();
        }
        Self { buckets }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit<'a> {
    pub term: &'a str,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    /// Upper bound on candidate comparisons per lookup
    pub max_candidates: usize,
    /// Terms shorter than this (in chars) are never fuzzy matched
    pub min_len: usize,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            max_candidates: 256,
            min_len: 4,
        }
    }
}

impl FuzzyMatcher {
    /// Best candidate at or above `threshold`; ties go to the lexically
    /// smallest term. Lengths closest to the query's are compared first.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn best_match<'a>(
        &self,
        term: &str,
        candidates: &'a LengthBuckets,
        threshold: f64,
    ) -> Option<FuzzyHit<'a>> {
        let query: Vec<char> = term.chars().collect();
        let n = query.len();
        if n < self.min_len || threshold <= 0.0 {
            return None;
        }

        // |n - m| / max(n, m) <= 1 - threshold bounds the reachable lengths
        let shortest = ((n as f64) * threshold - 1e-9).ceil() as usize;
        let longest = ((n as f64) / threshold + 1e-9).floor() as usize;
        let mut lengths: Vec<usize> = candidates
            .buckets
            .range(shortest.max(1)..=longest)
            .map(|(len, _)| *len)
            .collect();
        lengths.sort_by_key(|len| (len.abs_diff(n), *len));

        let mut best: Option<FuzzyHit<'a>> = None;
        let mut compared = 0usize;
        'outer: for len in lengths {
            let Some(bucket) = candidates.buckets.get(&len) else {
                continue;
            };
            for candidate in bucket {
                if compared >= self.max_candidates {
                    break 'outer;
                }
                compared += 1;
                if candidate == term {
                    continue;
                }
                let other: Vec<char> = candidate.chars().collect();
                let score = similarity_chars(&query, &other);
                if score < threshold {
                    continue;
                }
                let better = best.as_ref().is_none_or(|current| {
                    score > current.similarity
                        || (score == current.similarity && candidate.as_str() < current.term)
                });
                if better {
                    best = Some(FuzzyHit {
                        term: candidate,
                        similarity: score,
                    });
                }
            }
        }
        best
    }
}
