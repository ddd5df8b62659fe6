//! Tag vocabulary derived from an index snapshot

use std::collections::{BTreeMap, BTreeSet};

use super::fuzzy::LengthBuckets;
use super::normalize::{Lexicon, is_stopword};

/// Every indexed tag, plus the word structure of multi-word tags
#[derive(Debug, Clone, Default)]
pub struct TagVocabulary {
    tags: BTreeSet<String>,
    /// word -> multi-word tags containing it
    word_tags: BTreeMap<String, BTreeSet<String>>,
    /// multi-word tag -> its content words (stopwords dropped)
    tag_words: BTreeMap<String, Vec<String>>,
    terms: LengthBuckets,
    tag_terms: LengthBuckets,
    lexicon: Lexicon,
}

impl TagVocabulary {
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        let tags: BTreeSet<String> = tags.into_iter().map(str::to_string).collect();
        let mut word_tags: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut tag_words = BTreeMap::new();

        for tag in &tags {
            let mut words: Vec<String> = Vec::new();
            for word in tag.split(' ') {
                if word.is_empty() || is_stopword(word) || words.iter().any(|w| w == word) {
                    continue;
                }
                words.push(word.to_string());
            }
            if tag.contains(' ') && !words.is_empty() {
                for word in &words {
                    word_tags
                        .entry(word.clone())
                        .or_default()
                        .insert(tag.clone());
                }
                tag_words.insert(tag.clone(), words);
            }
        }

        let terms = LengthBuckets::from_terms(
            tags.iter()
                .map(String::as_str)
                .chain(word_tags.keys().map(String::as_str)),
        );
        let tag_terms = LengthBuckets::from_terms(tags.iter().map(String::as_str));
        let lexicon = tags
            .iter()
            .map(String::as_str)
            .chain(word_tags.keys().map(String::as_str))
            .collect();

        Self {
            tags,
            word_tags,
            tag_words,
            terms,
            tag_terms,
            lexicon,
        }
    }

    #[must_use]
    pub fn is_tag(&self, term: &str) -> bool {
        self.tags.contains(term)
    }

    /// Whether `term` is a word of some multi-word tag
    #[must_use]
    pub fn is_word(&self, term: &str) -> bool {
        self.word_tags.contains_key(term)
    }

    pub fn tags_with_word<'a>(&'a self, word: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.word_tags
            .get(word)
            .into_iter()
            .flat_map(|tags| tags.iter().map(String::as_str))
    }

    /// Content words of a multi-word tag
    #[must_use]
    pub fn tag_words(&self, tag: &str) -> Option<&[String]> {
        self.tag_words.get(tag).map(Vec::as_slice)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Fuzzy candidates: tags and tag words
    #[must_use]
    pub const fn terms(&self) -> &LengthBuckets {
        &self.terms
    }

    /// Tags only, for "did you mean" suggestions
    #[must_use]
    pub const fn tag_terms(&self) -> &LengthBuckets {
        &self.tag_terms
    }

    /// Segmentation lexicon for CJK tags and tag words
    #[must_use]
    pub const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
