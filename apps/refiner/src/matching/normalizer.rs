//! Text normalization: text → deterministic, deduplicated canonical token sequence.
//!
//! Pipeline (English):
//! 1. NFKD + diacritic stripping, case folding
//! 2. punctuation unification (em/en dash and `--`/`---` → `-`, curly quotes → straight)
//! 3. word split with edge-punctuation trimming that keeps technical terms intact
//! 4. phrase-level synonym canonicalization, longest phrase first
//! 5. sub-tokenization of non-technical words, stop-word removal
//! 6. suffix stemming, skipping the technical-term whitelist
//! 7. first-seen-order deduplication
//!
//! Scoring and gap analysis depend only on the `TextNormalizer` trait, so a deployment
//! can register a different instance per language.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Longest synonym phrase, in words.
const MAX_PHRASE_WORDS: usize = 6;
/// Upper bound on stemming rounds; each round shortens the token.
const MAX_STEM_ROUNDS: usize = 8;

pub trait TextNormalizer: Send + Sync {
    /// ISO 639-1 code this instance handles.
    fn language(&self) -> &str;

    fn normalize(&self, text: &str) -> Vec<String>;

    /// Canonical form of a short phrase (a keyword or skill): its tokens joined by spaces.
    fn canonical_phrase(&self, text: &str) -> String {
        self.normalize(text).join(" ")
    }
}

/// Technical terms that are never split on internal punctuation and never stemmed.
const TECH_TERMS: &[&str] = &[
    ".net", "a/b", "airflow", "ansible", "asp.net", "aws", "azure", "c#", "c++", "ci/cd", "css",
    "django", "docker", "elasticsearch", "express.js", "f#", "flask", "gcp", "git", "golang",
    "graphql", "grpc", "hadoop", "html", "i/o", "java", "javascript", "jenkins", "kafka",
    "kubernetes", "linux", "mongodb", "mysql", "next.js", "node.js", "nosql", "numpy", "pandas",
    "postgresql", "python", "pytorch", "rails", "react", "redis", "rust", "s3", "scikit-learn",
    "spark", "sql", "tcp/ip", "tensorflow", "terraform", "typescript", "ui/ux", "vue.js", "windows",
];

/// Phrase → canonical form. Keys and values are lowercase; values are never keys.
const SYNONYMS: &[(&str, &str)] = &[
    ("amazon web services", "aws"),
    ("google cloud platform", "gcp"),
    ("google cloud", "gcp"),
    ("microsoft azure", "azure"),
    ("continuous integration and continuous delivery", "ci/cd"),
    ("continuous integration and continuous deployment", "ci/cd"),
    ("continuous integration/continuous delivery", "ci/cd"),
    ("continuous integration/continuous deployment", "ci/cd"),
    ("ci cd", "ci/cd"),
    ("ci-cd", "ci/cd"),
    ("cicd", "ci/cd"),
    ("k8s", "kubernetes"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("postgres", "postgresql"),
    ("psql", "postgresql"),
    ("mongo", "mongodb"),
    ("nodejs", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("vuejs", "vue.js"),
    ("vue", "vue.js"),
    ("sklearn", "scikit-learn"),
    ("ml", "machine learning"),
    ("ai", "artificial intelligence"),
    ("nlp", "natural language processing"),
    ("sre", "site reliability engineering"),
    ("restful", "rest"),
    ("py", "python"),
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "into",
    "is", "it", "its", "of", "on", "or", "our", "that", "the", "their", "this", "to", "was",
    "we", "were", "will", "with", "you", "your", "other", "others", "etc",
];

static TECH_TERM_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| TECH_TERMS.iter().copied().collect());

static STOP_WORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOP_WORDS.iter().copied().collect());

/// Synonym keys split into words, sorted longest first.
static SYNONYM_PHRASES: Lazy<Vec<(Vec<&'static str>, &'static str)>> = Lazy::new(|| {
    let mut phrases: Vec<(Vec<&'static str>, &'static str)> = SYNONYMS
        .iter()
        .map(|(from, to)| (from.split_whitespace().collect(), *to))
        .collect();
    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(b.0.concat().len().cmp(&a.0.concat().len())));
    phrases
});

static DASH_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{2014}\u{2013}\u{2012}]|-{2,}").expect("valid dash regex"));

pub fn is_tech_term(token: &str) -> bool {
    TECH_TERM_SET.contains(token)
}

/// English normalizer with the default technical-term whitelist.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishNormalizer;

impl TextNormalizer for EnglishNormalizer {
    fn language(&self) -> &str {
        "en"
    }

    fn normalize(&self, text: &str) -> Vec<String> {
        let folded = fold_text(text);
        let words: Vec<String> = folded
            .split_whitespace()
            .filter_map(clean_word)
            .collect();
        let canonical = canonicalize_synonyms(&words);

        let mut seen = HashSet::new();
        let mut tokens = Vec::new();
        for word in canonical {
            for piece in split_word(&word) {
                if STOP_WORD_SET.contains(piece.as_str()) {
                    continue;
                }
                let token = stem(&piece);
                if token.is_empty() || STOP_WORD_SET.contains(token.as_str()) {
                    continue;
                }
                if seen.insert(token.clone()) {
                    tokens.push(token);
                }
            }
        }
        tokens
    }
}

/// Unicode canonicalization, diacritic stripping, case folding, dash/quote unification.
fn fold_text(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201c}', '\u{201d}'], "\"");
    DASH_RUN.replace_all(&stripped, "-").into_owned()
}

/// Trims edge punctuation, keeping leading `.` and trailing `+`/`#` when the
/// result is a known technical term (`.net`, `c++`, `c#`).
fn clean_word(raw: &str) -> Option<String> {
    let lenient = raw
        .trim_start_matches(|c: char| !c.is_alphanumeric() && c != '.')
        .trim_end_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#');
    if is_tech_term(lenient) {
        return Some(lenient.to_string());
    }
    let strict = raw.trim_matches(|c: char| !c.is_alphanumeric());
    if strict.is_empty() {
        None
    } else {
        Some(strict.to_string())
    }
}

/// Greedy longest-match synonym replacement over the word sequence.
fn canonicalize_synonyms(words: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(words.len());
    let mut i = 0;
    'outer: while i < words.len() {
        for (phrase, canonical) in SYNONYM_PHRASES.iter() {
            let n = phrase.len();
            if n > MAX_PHRASE_WORDS || i + n > words.len() {
                continue;
            }
            if phrase
                .iter()
                .zip(&words[i..i + n])
                .all(|(p, w)| *p == w.as_str())
            {
                out.extend(canonical.split_whitespace().map(str::to_string));
                i += n;
                continue 'outer;
            }
        }
        out.push(words[i].clone());
        i += 1;
    }
    out
}

/// Technical terms stay whole; anything else splits on non-alphanumerics.
fn split_word(word: &str) -> Vec<String> {
    if is_tech_term(word) {
        return vec![word.to_string()];
    }
    word.split(|c: char| !c.is_alphanumeric())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Light suffix stemmer, iterated to a fixpoint so stemming is idempotent.
pub fn stem(token: &str) -> String {
    if is_tech_term(token) || token.chars().count() <= 3 || token.chars().any(|c| !c.is_alphabetic()) {
        return token.to_string();
    }
    let mut current = token.to_string();
    for _ in 0..MAX_STEM_ROUNDS {
        let next = stem_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn stem_once(word: &str) -> String {
    let len = word.len();
    if let Some(base) = word.strip_suffix("ies") {
        if len > 4 {
            return format!("{base}y");
        }
    }
    if let Some(base) = word.strip_suffix("sses") {
        return format!("{base}ss");
    }
    for suffix in ["ches", "shes", "xes"] {
        if word.ends_with(suffix) {
            return word[..len - 2].to_string();
        }
    }
    if let Some(base) = word.strip_suffix("ing") {
        if base.len() >= 4 {
            return base.to_string();
        }
    }
    if let Some(base) = word.strip_suffix("ed") {
        if base.len() >= 4 {
            return base.to_string();
        }
    }
    if word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
        && len >= 4
    {
        return word[..len - 1].to_string();
    }
    if word.ends_with('e') && len > 4 {
        return word[..len - 1].to_string();
    }
    word.to_string()
}

/// Per-language normalizer selection with an English fallback.
#[derive(Clone)]
pub struct NormalizerRegistry {
    fallback: Arc<dyn TextNormalizer>,
    by_language: HashMap<String, Arc<dyn TextNormalizer>>,
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        let english: Arc<dyn TextNormalizer> = Arc::new(EnglishNormalizer);
        let mut registry = Self {
            fallback: Arc::clone(&english),
            by_language: HashMap::new(),
        };
        registry.register(english);
        registry
    }
}

impl NormalizerRegistry {
    pub fn register(&mut self, normalizer: Arc<dyn TextNormalizer>) {
        self.by_language
            .insert(normalizer.language().to_lowercase(), normalizer);
    }

    /// Returns the normalizer for `language`, or the English fallback.
    pub fn for_language(&self, language: &str) -> Arc<dyn TextNormalizer> {
        self.by_language
            .get(&language.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}
