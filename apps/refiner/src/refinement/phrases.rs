//! AI phrase normalization: rewrites generic, machine-sounding phrasing in resume prose.
//!
//! Matching is case-insensitive on whole phrases, longest phrase first. Em-dashes and
//! `--`/`---` become commas. The rewrite runs to a fixpoint under a small cap, so applying
//! it to its own output changes nothing. Text with no blacklisted phrase and no dash run is
//! returned untouched.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::resume::StructuredResume;

const MAX_ROUNDS: usize = 5;

/// Blacklisted phrase → replacement. Keys are lowercase; no value contains a key.
const AI_PHRASE_REPLACEMENTS: &[(&str, &str)] = &[
    ("in today's fast-paced world", ""),
    ("think outside the box", "solve problems creatively"),
    ("proven track record", "record"),
    ("a testament to", "evidence of"),
    ("passionate about", "focused on"),
    ("delve into", "examine"),
    ("team player", "collaborator"),
    ("results-driven", ""),
    ("detail-oriented", ""),
    ("self-starter", "independent worker"),
    ("go-getter", "motivated"),
    ("synergy", "collaboration"),
    ("synergize", "collaborate"),
    ("spearheaded", "led"),
    ("spearheading", "leading"),
    ("leveraged", "used"),
    ("leveraging", "using"),
    ("leverage", "use"),
    ("utilized", "used"),
    ("utilizing", "using"),
    ("utilize", "use"),
    ("harnessed", "used"),
    ("cutting-edge", "modern"),
    ("state-of-the-art", "modern"),
    ("best-in-class", "leading"),
    ("world-class", "strong"),
    ("game-changing", "significant"),
    ("impactful", "effective"),
    ("seamlessly", "smoothly"),
    ("robust", "reliable"),
];

static REPLACEMENTS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| AI_PHRASE_REPLACEMENTS.iter().copied().collect());

static AI_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    let mut phrases: Vec<&str> = AI_PHRASE_REPLACEMENTS.iter().map(|(p, _)| *p).collect();
    phrases.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alt = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alt})\b")).expect("valid AI phrase regex")
});

static DASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]*(?:\u{2014}|-{2,})[ \t]*").expect("valid dash regex"));

static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));
static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+([,.;:!?])").expect("valid regex"));
static COMMA_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",(?:[ \t]*,)+").expect("valid regex"));
static COMMA_BEFORE_STOP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",[ \t]*([.;:!?])").expect("valid regex"));
static EDGE_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*[,;:][ \t]*|[ \t]*,[ \t]*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct PhraseScrub {
    pub text: String,
    /// Blacklist entries that matched, lowercase, in first-seen order.
    pub removed: Vec<String>,
}

fn match_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().is_some_and(char::is_uppercase);
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) if starts_upper => first.to_uppercase().chain(chars).collect(),
        _ => replacement.to_string(),
    }
}

fn tidy(text: &str) -> String {
    let text = SPACE_RUN_RE.replace_all(text, " ");
    let text = COMMA_RUN_RE.replace_all(&text, ",");
    let text = SPACE_BEFORE_PUNCT_RE.replace_all(&text, "$1");
    let text = COMMA_BEFORE_STOP_RE.replace_all(&text, "$1");
    let text = EDGE_COMMA_RE.replace_all(&text, "");
    text.trim().to_string()
}

fn capitalize_like(original: &str, text: String) -> String {
    let starts_upper = original
        .chars()
        .find(|c| c.is_alphabetic())
        .is_some_and(char::is_uppercase);
    if !starts_upper {
        return text;
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text,
    }
}

/// One rewrite round; `None` when nothing matched.
fn rewrite_once(text: &str, removed: &mut Vec<String>) -> Option<String> {
    let mut changed = false;

    let replaced = AI_PHRASE_RE.replace_all(text, |caps: &Captures| {
        let matched = &caps[0];
        let key = matched.to_lowercase();
        match REPLACEMENTS.get(key.as_str()) {
            Some(replacement) => {
                changed = true;
                if !removed.contains(&key) {
                    removed.push(key);
                }
                match_case(matched, replacement)
            }
            // Case-folded outside ASCII; leave it alone.
            None => matched.to_string(),
        }
    });

    let dashed = DASH_RE.replace_all(&replaced, ", ");
    if !changed && !DASH_RE.is_match(&replaced) {
        return None;
    }

    Some(capitalize_like(text, tidy(&dashed)))
}

/// Rewrites `text`, returning the new text and the blacklist entries it removed.
pub fn scrub(text: &str) -> PhraseScrub {
    let mut removed = Vec::new();
    let mut current = text.to_string();
    for _ in 0..MAX_ROUNDS {
        match rewrite_once(&current, &mut removed) {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    PhraseScrub {
        text: current,
        removed,
    }
}

/// Scrubs every prose field of a resume. Names, skills and other factual fields are untouched.
pub fn scrub_resume(resume: &StructuredResume) -> (StructuredResume, Vec<String>) {
    let mut removed: Vec<String> = Vec::new();
    let scrubbed = resume.map_prose(|text| {
        let result = scrub(text);
        for phrase in result.removed {
            if !removed.contains(&phrase) {
                removed.push(phrase);
            }
        }
        result.text
    });
    (scrubbed, removed)
}
