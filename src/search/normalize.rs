//! Intent normalization
//!
//! Turns a raw query into an ordered, deduplicated token list plus the quoted
//! phrases it contained. Space-delimited scripts are split on
//! non-alphanumerics; Han, kana and Thai runs are segmented by forward
//! maximum matching against a [`Lexicon`], falling back to single characters.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::catalog::canonicalize;
use crate::error::{Result, SkillioError};

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|“([^”]*)”|「([^」]*)」"#).expect("quoted phrase pattern is valid")
});

const EN_STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "by", "can", "could", "do",
    "for", "from", "get", "help", "how", "i", "im", "in", "into", "is", "it",
    "its", "let", "me", "my", "need", "of", "on", "or", "our", "please", "should", "so",
    "some", "that", "the", "them", "there", "these", "this", "those", "to", "us", "we",
    "what", "which", "with", "would", "you", "your",
];

const DE_STOPWORDS: &[&str] = &[
    "bitte", "das", "dem", "den", "der", "die", "ein", "eine", "einen", "für", "ich", "in",
    "ist", "mein", "meine", "mit", "möchte", "und", "von", "will", "zu",
];

const FR_STOPWORDS: &[&str] = &[
    "au", "aux", "de", "des", "du", "en", "est", "et", "je", "la", "le", "les", "ma", "mes",
    "mon", "pour", "un", "une", "veux", "voudrais",
];

const ES_STOPWORDS: &[&str] = &[
    "al", "con", "de", "del", "el", "en", "es", "la", "las", "los", "mi", "mis", "para",
    "por", "quiero", "un", "una", "y", "yo",
];

const ZH_STOPWORDS: &[&str] = &[
    "的", "了", "我", "你", "他", "她", "它", "我们", "想", "要", "想要", "我想", "把", "一个",
    "一下", "请", "帮", "帮我", "用", "在", "和", "与", "或", "是", "吗", "呢", "吧", "啊",
    "个", "些", "这", "那", "这个", "那个", "如何", "怎么", "怎样", "能", "可以", "给",
];

const JA_STOPWORDS: &[&str] = &[
    "の", "は", "が", "を", "に", "で", "と", "も", "です", "ます", "する", "して", "した",
    "たい", "ください", "から", "まで", "この", "その",
];

/// Query language hint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    De,
    Fr,
    Es,
    Zh,
    Ja,
}

impl Locale {
    /// Parse a BCP 47-ish tag (`zh-CN`, `de_DE`, `en`); unknown tags yield None
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_lowercase();
        match primary.as_str() {
            "en" => Some(Self::En),
            "de" => Some(Self::De),
            "fr" => Some(Self::Fr),
            "es" => Some(Self::Es),
            "zh" => Some(Self::Zh),
            "ja" => Some(Self::Ja),
            _ => None,
        }
    }

    const fn latin_stopwords(self) -> &'static [&'static str] {
        match self {
            Self::De => DE_STOPWORDS,
            Self::Fr => FR_STOPWORDS,
            Self::Es => ES_STOPWORDS,
            Self::En | Self::Zh | Self::Ja => EN_STOPWORDS,
        }
    }
}

/// Normalized form of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    /// Tokens in query order, duplicates removed
    pub tokens: Vec<String>,
    /// Quoted substrings, matched only as exact phrases
    pub phrases: Vec<String>,
    pub locale: Locale,
}

impl NormalizedQuery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.phrases.is_empty()
    }
}

/// Known words of non-space-delimited scripts, used for segmentation
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    words: HashSet<String>,
    max_chars: usize,
}

impl Lexicon {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a word; words that are not entirely segmented-script are ignored
    pub fn insert(&mut self, word: &str) {
        let word = canonicalize(word);
        let chars = word.chars().count();
        if chars < 2 || !word.chars().all(is_segmented_script) {
            return;
        }
        self.max_chars = self.max_chars.max(chars);
        self.words.insert(word);
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    #[must_use]
    pub const fn max_chars(&self) -> usize {
        self.max_chars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Lexicon {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut lexicon = Self::new();
        for word in iter {
            lexicon.insert(word);
        }
        lexicon
    }
}

/// Scripts written without spaces between words
#[must_use]
pub const fn is_segmented_script(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'     // hiragana, katakana
        | '\u{31F0}'..='\u{31FF}'   // katakana phonetic extensions
        | '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
        | '\u{F900}'..='\u{FAFF}'   // CJK compatibility ideographs
        | '\u{0E00}'..='\u{0E7F}'   // Thai
        | '\u{20000}'..='\u{2A6DF}' // CJK extension B
    )
}

/// Whether `word` is a stopword in any supported language
#[must_use]
pub fn is_stopword(word: &str) -> bool {
    [
        EN_STOPWORDS,
        DE_STOPWORDS,
        FR_STOPWORDS,
        ES_STOPWORDS,
        ZH_STOPWORDS,
        JA_STOPWORDS,
    ]
    .iter()
    .any(|list| list.contains(&word))
}

enum Segment {
    Word(String),
    Run(Vec<char>),
}

pub struct IntentNormalizer {
    lexicon: Lexicon,
}

impl Default for IntentNormalizer {
    fn default() -> Self {
        Self::new(Lexicon::new())
    }
}

impl IntentNormalizer {
    #[must_use]
    pub const fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    #[must_use]
    pub const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Normalize a query with the normalizer's own lexicon
    pub fn normalize(&self, query: &str, locale: Option<&str>) -> Result<NormalizedQuery> {
        self.normalize_with(query, locale, None)
    }

    /// Normalize a query, also segmenting against an extra lexicon (the
    /// current tag vocabulary)
    pub fn normalize_with(
        &self,
        query: &str,
        locale: Option<&str>,
        extra: Option<&Lexicon>,
    ) -> Result<NormalizedQuery> {
        let locale = locale.and_then(Locale::parse).unwrap_or_default();
        let folded: String = query.nfkc().collect::<String>().to_lowercase();

        let mut phrases = Vec::new();
        for caps in QUOTED.captures_iter(&folded) {
            let inner = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str());
            let phrase = canonicalize(inner);
            if !phrase.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }
        let remainder = QUOTED.replace_all(&folded, " ");

        let latin_stop = locale.latin_stopwords();
        let mut seen = HashSet::new();
        let mut tokens = Vec::new();
        let mut push = |token: String| {
            if seen.insert(token.clone()) {
                tokens.push(token);
            }
        };

        for segment in segment(&remainder) {
            match segment {
                Segment::Word(word) => {
                    if latin_stop.contains(&word.as_str()) || EN_STOPWORDS.contains(&word.as_str()) {
                        continue;
                    }
                    push(word);
                }
                Segment::Run(chars) => {
                    for token in self.split_run(&chars, extra) {
                        if ZH_STOPWORDS.contains(&token.as_str())
                            || JA_STOPWORDS.contains(&token.as_str())
                        {
                            continue;
                        }
                        push(token);
                    }
                }
            }
        }

        let normalized = NormalizedQuery {
            tokens,
            phrases,
            locale,
        };
        if normalized.is_empty() {
            return Err(SkillioError::InvalidQuery(format!(
                "query {query:?} has no meaningful terms"
            )));
        }
        Ok(normalized)
    }

    /// Forward maximum matching over a run of segmented-script characters
    fn split_run(&self, chars: &[char], extra: Option<&Lexicon>) -> Vec<String> {
        let max_chars = self
            .lexicon
            .max_chars()
            .max(extra.map_or(0, Lexicon::max_chars))
            .max(stopword_max_chars());
        let known = |word: &str| {
            self.lexicon.contains(word)
                || extra.is_some_and(|lexicon| lexicon.contains(word))
                || ZH_STOPWORDS.contains(&word)
                || JA_STOPWORDS.contains(&word)
        };

        let mut out = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let longest = max_chars.min(chars.len() - start);
            let mut taken = 1;
            for len in (2..=longest).rev() {
                let candidate: String = chars[start..start + len].iter().collect();
                if known(&candidate) {
                    taken = len;
                    break;
                }
            }
            out.push(chars[start..start + taken].iter().collect());
            start += taken;
        }
        out
    }
}

fn stopword_max_chars() -> usize {
    ZH_STOPWORDS
        .iter()
        .chain(JA_STOPWORDS)
        .map(|word| word.chars().count())
        .max()
        .unwrap_or(1)
}

fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut word = String::new();
    let mut run: Vec<char> = Vec::new();

    let flush_word = |word: &mut String, segments: &mut Vec<Segment>| {
        if !word.is_empty() {
            segments.push(Segment::Word(std::mem::take(word)));
        }
    };
    let flush_run = |run: &mut Vec<char>, segments: &mut Vec<Segment>| {
        if !run.is_empty() {
            segments.push(Segment::Run(std::mem::take(run)));
        }
    };

    let chars: Vec<char> = text.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if is_segmented_script(c) {
            flush_word(&mut word, &mut segments);
            run.push(c);
        } else if c.is_alphanumeric() {
            flush_run(&mut run, &mut segments);
            word.push(c);
        } else if (c == '+' || c == '#') && !word.is_empty() {
            // c++, c#, f#
            word.push(c);
        } else if c == '\'' && !word.is_empty() && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric()) {
            // don't -> dont
        } else {
            flush_word(&mut word, &mut segments);
            flush_run(&mut run, &mut segments);
        }
    }
    flush_word(&mut word, &mut segments);
    flush_run(&mut run, &mut segments);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> IntentNormalizer {
        IntentNormalizer::new(["下载", "视频", "哔哩哔哩"].into_iter().collect())
    }

    #[test]
    fn test_english_stopwords_removed() {
        let query = normalizer()
            .normalize("I want to download a YouTube video", None)
            .unwrap();
        assert_eq!(query.tokens, vec!["want", "download", "youtube", "video"]);
        assert!(query.phrases.is_empty());
    }

    #[test]
    fn test_chinese_segmentation() {
        let query = normalizer().normalize("下载 B 站视频", Some("zh-CN")).unwrap();
        assert_eq!(query.tokens, vec!["下载", "b", "站", "视频"]);
        assert_eq!(query.locale, Locale::Zh);
    }

    #[test]
    fn test_chinese_stopwords_removed() {
        let query = normalizer().normalize("我想下载一个视频", None).unwrap();
        assert_eq!(query.tokens, vec!["下载", "视频"]);
    }

    #[test]
    fn test_extra_lexicon_used_for_segmentation() {
        let extra: Lexicon = ["动图"].into_iter().collect();
        let query = normalizer()
            .normalize_with("视频转动图", None, Some(&extra))
            .unwrap();
        assert_eq!(query.tokens, vec!["视频", "转", "动图"]);
    }

    #[test]
    fn test_quoted_phrases_kept_verbatim() {
        let query = normalizer()
            .normalize(r#"find "Video  Download" tools"#, None)
            .unwrap();
        assert_eq!(query.phrases, vec!["video download"]);
        assert_eq!(query.tokens, vec!["find", "tools"]);
    }

    #[test]
    fn test_quoted_phrase_alone_is_valid() {
        let query = normalizer().normalize("“batch download”", None).unwrap();
        assert!(query.tokens.is_empty());
        assert_eq!(query.phrases, vec!["batch download"]);
    }

    #[test]
    fn test_punctuation_only_is_invalid() {
        let err = normalizer().normalize("?!... ---", None).unwrap_err();
        assert!(matches!(err, SkillioError::InvalidQuery(_)));
    }

    #[test]
    fn test_stopwords_only_is_invalid() {
        assert!(normalizer().normalize("the a of to", None).is_err());
        assert!(normalizer().normalize("我想要", None).is_err());
    }

    #[test]
    fn test_locale_specific_stopwords() {
        let query = normalizer()
            .normalize("ich möchte ein Video herunterladen", Some("de"))
            .unwrap();
        assert_eq!(query.tokens, vec!["video", "herunterladen"]);

        // without the hint German function words survive
        let query = normalizer()
            .normalize("ich möchte ein Video herunterladen", None)
            .unwrap();
        assert!(query.tokens.contains(&"ich".to_string()));
    }

    #[test]
    fn test_symbols_and_duplicates() {
        let query = normalizer().normalize("C++ and c++ builds; pdf-to-word", None).unwrap();
        assert_eq!(query.tokens, vec!["c++", "builds", "pdf", "word"]);
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("zh_TW"), Some(Locale::Zh));
        assert_eq!(Locale::parse("EN-us"), Some(Locale::En));
        assert_eq!(Locale::parse("tlh"), None);
    }

    #[test]
    fn test_lexicon_ignores_mixed_script_words() {
        let lexicon: Lexicon = ["b站", "视频", "x"].into_iter().collect();
        assert!(lexicon.contains("视频"));
        assert!(!lexicon.contains("b站"));
        assert_eq!(lexicon.len(), 1);
        assert_eq!(lexicon.max_chars(), 2);
    }
}
