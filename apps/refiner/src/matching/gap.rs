//! Keyword gap analysis: which missing job keywords can be truthfully added.
//!
//! `injectable ∪ non_injectable == missing` and the two are disjoint, for every input.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGapAnalysis {
    pub missing_keywords: Vec<String>,
    /// Missing from the current resume but backed by the master resume.
    pub injectable_keywords: Vec<String>,
    pub non_injectable_keywords: Vec<String>,
    pub current_match_percentage: f64,
    pub potential_match_percentage: f64,
}

/// A phrase is present when every one of its space-separated tokens is in `tokens`.
pub fn phrase_present(phrase: &str, tokens: &HashSet<String>) -> bool {
    if tokens.contains(phrase) {
        return true;
    }
    let mut parts = phrase.split(' ').filter(|p| !p.is_empty()).peekable();
    parts.peek().is_some() && parts.all(|p| tokens.contains(p))
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        (100.0 * count as f64 / total as f64).clamp(0.0, 100.0)
    }
}

/// Partitions job keywords missing from `resume_tokens` by presence in `master_tokens`.
///
/// Keywords are expected in canonical form; duplicates count once.
pub fn analyze_keyword_gap(
    job_keywords: &[String],
    resume_tokens: &HashSet<String>,
    master_tokens: &HashSet<String>,
) -> KeywordGapAnalysis {
    let mut seen = HashSet::new();
    let keywords: Vec<&String> = job_keywords
        .iter()
        .filter(|k| !k.is_empty() && seen.insert(k.as_str()))
        .collect();

    let mut present = 0usize;
    let mut missing_keywords = Vec::new();
    let mut injectable_keywords = Vec::new();
    let mut non_injectable_keywords = Vec::new();

    for keyword in &keywords {
        if phrase_present(keyword, resume_tokens) {
            present += 1;
            continue;
        }
        missing_keywords.push((*keyword).clone());
        if phrase_present(keyword, master_tokens) {
            injectable_keywords.push((*keyword).clone());
        } else {
            non_injectable_keywords.push((*keyword).clone());
        }
    }

    KeywordGapAnalysis {
        current_match_percentage: percentage(present, keywords.len()),
        potential_match_percentage: percentage(present + injectable_keywords.len(), keywords.len()),
        missing_keywords,
        injectable_keywords,
        non_injectable_keywords,
    }
}
