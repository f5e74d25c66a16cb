//! Similarity scoring: combines normalized resume/job signals into a bounded match score.
//!
//! Every component lies in [0, 1]. The weighted sum is rescaled onto [0, 100] by clamping
//! to `[0, positive_total]` and dividing by `positive_total`, so the mapping is monotone in
//! each positive component and the penalty can only pull the score down to zero.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;
use crate::errors::AppError;
use crate::matching::gap::phrase_present;
use crate::matching::signals::{JobSignals, ResumeSignals};

/// Fraction of a required qualification's tokens that must appear for it to count as met.
const QUALIFICATION_PRESENCE_THRESHOLD: f64 = 0.5;

const EDUCATION_FULL: f64 = 1.0;
const EDUCATION_PARTIAL: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Weight table
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill_overlap: f64,
    pub keyword_coverage: f64,
    pub experience_relevance: f64,
    pub project_relevance: f64,
    pub education_bonus: f64,
    pub semantic_similarity: f64,
    /// Subtracted once when every required qualification is missing.
    pub penalty_missing_critical: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill_overlap: 0.30,
            keyword_coverage: 0.25,
            experience_relevance: 0.20,
            project_relevance: 0.05,
            education_bonus: 0.05,
            semantic_similarity: 0.15,
            penalty_missing_critical: 0.20,
        }
    }
}

impl ScoringWeights {
    fn lexical_total(&self) -> f64 {
        self.skill_overlap
            + self.keyword_coverage
            + self.experience_relevance
            + self.project_relevance
            + self.education_bonus
    }

    /// Sum of all positive component weights, the theoretical maximum raw score.
    pub fn positive_total(&self) -> f64 {
        self.lexical_total() + self.semantic_similarity
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let all = [
            ("skill_overlap", self.skill_overlap),
            ("keyword_coverage", self.keyword_coverage),
            ("experience_relevance", self.experience_relevance),
            ("project_relevance", self.project_relevance),
            ("education_bonus", self.education_bonus),
            ("semantic_similarity", self.semantic_similarity),
            ("penalty_missing_critical", self.penalty_missing_critical),
        ];
        for (name, weight) in all {
            if !weight.is_finite() || weight < 0.0 {
                return Err(AppError::Validation(format!(
                    "scoring weight {name} must be a finite non-negative number, got {weight}"
                )));
            }
        }
        if self.lexical_total() <= 0.0 {
            return Err(AppError::Validation(
                "at least one non-semantic scoring weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Weights actually applied. Without a semantic signal its weight is spread over the
    /// remaining positive components in proportion to their own weights.
    fn effective(&self, semantic_present: bool) -> ScoringWeights {
        if semantic_present {
            return *self;
        }
        let scale = self.positive_total() / self.lexical_total();
        ScoringWeights {
            skill_overlap: self.skill_overlap * scale,
            keyword_coverage: self.keyword_coverage * scale,
            experience_relevance: self.experience_relevance * scale,
            project_relevance: self.project_relevance * scale,
            education_bonus: self.education_bonus * scale,
            semantic_similarity: 0.0,
            penalty_missing_critical: self.penalty_missing_critical,
        }
    }

    /// Folds component values into a full breakdown with derived scores.
    pub fn combine(&self, components: ComponentScores) -> MatchBreakdown {
        let w = self.effective(components.semantic_similarity.is_some());
        let raw_weighted_score = w.skill_overlap * components.skill_overlap
            + w.keyword_coverage * components.keyword_coverage
            + w.experience_relevance * components.experience_relevance
            + w.project_relevance * components.project_relevance
            + w.education_bonus * components.education_bonus
            + w.semantic_similarity * components.semantic_similarity.unwrap_or(0.0)
            - w.penalty_missing_critical * components.penalty_missing_critical;

        let total = self.positive_total();
        let normalized_score = raw_weighted_score.clamp(0.0, total) / total * 100.0;
        let final_score = normalized_score.round().clamp(0.0, 100.0) as u32;

        MatchBreakdown {
            skill_overlap: components.skill_overlap,
            keyword_coverage: components.keyword_coverage,
            experience_relevance: components.experience_relevance,
            project_relevance: components.project_relevance,
            education_bonus: components.education_bonus,
            penalty_missing_critical: components.penalty_missing_critical,
            semantic_similarity: components.semantic_similarity,
            raw_weighted_score,
            normalized_score,
            final_score,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// Per-signal values, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentScores {
    pub skill_overlap: f64,
    pub keyword_coverage: f64,
    pub experience_relevance: f64,
    pub project_relevance: f64,
    pub education_bonus: f64,
    pub penalty_missing_critical: f64,
    pub semantic_similarity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub skill_overlap: f64,
    pub keyword_coverage: f64,
    pub experience_relevance: f64,
    pub project_relevance: f64,
    pub education_bonus: f64,
    pub penalty_missing_critical: f64,
    /// Absent when either embedding could not be obtained.
    pub semantic_similarity: Option<f64>,
    pub raw_weighted_score: f64,
    pub normalized_score: f64,
    pub final_score: u32, // 0 – 100
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// A match scorer. `MatchService` holds an `Arc<dyn MatchScorer>` so alternative scoring
/// backends can be swapped in without touching callers.
pub trait MatchScorer: Send + Sync {
    fn backend(&self) -> &'static str;

    /// `embeddings` are the whole-document vectors for (resume, job) when both were obtained.
    fn score(
        &self,
        resume: &ResumeSignals,
        job: &JobSignals,
        embeddings: Option<(&[f32], &[f32])>,
    ) -> Result<MatchBreakdown, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// WeightedMatchScorer: default implementation
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic weighted-sum scorer over set overlaps.
#[derive(Debug, Clone, Default)]
pub struct WeightedMatchScorer {
    weights: ScoringWeights,
}

impl WeightedMatchScorer {
    pub fn new(weights: ScoringWeights) -> Result<Self, AppError> {
        weights.validate()?;
        Ok(Self { weights })
    }

}

impl MatchScorer for WeightedMatchScorer {
    fn backend(&self) -> &'static str {
        "weighted"
    }

    fn score(
        &self,
        resume: &ResumeSignals,
        job: &JobSignals,
        embeddings: Option<(&[f32], &[f32])>,
    ) -> Result<MatchBreakdown, AppError> {
        let components = ComponentScores {
            skill_overlap: skill_overlap(resume, job),
            keyword_coverage: keyword_coverage(resume, job),
            experience_relevance: overlap_ratio(&job.relevance_tokens, &resume.experience_tokens),
            project_relevance: overlap_ratio(&job.relevance_tokens, &resume.project_tokens),
            education_bonus: education_bonus(resume, job),
            penalty_missing_critical: missing_critical_penalty(resume, job),
            semantic_similarity: semantic_similarity(embeddings),
        };
        Ok(self.weights.combine(components))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Components
// ────────────────────────────────────────────────────────────────────────────

fn ratio(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (hits as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Empty job skill set scores 0.0.
fn skill_overlap(resume: &ResumeSignals, job: &JobSignals) -> f64 {
    let hits = job
        .skills
        .iter()
        .filter(|s| phrase_present(s, &resume.skill_tokens))
        .count();
    ratio(hits, job.skills.len())
}

/// Empty job keyword set is vacuously fully covered.
fn keyword_coverage(resume: &ResumeSignals, job: &JobSignals) -> f64 {
    if job.keywords.is_empty() {
        return 1.0;
    }
    let hits = job
        .keywords
        .iter()
        .filter(|k| phrase_present(k, &resume.tokens))
        .count();
    ratio(hits, job.keywords.len())
}

fn overlap_ratio(job_side: &HashSet<String>, resume_side: &HashSet<String>) -> f64 {
    ratio(job_side.intersection(resume_side).count(), job_side.len())
}

fn education_bonus(resume: &ResumeSignals, job: &JobSignals) -> f64 {
    let Some(requirement) = job.education else {
        return 0.0;
    };
    if !resume.has_education {
        return 0.0;
    }
    match (requirement.level, resume.highest_education) {
        // A requirement naming no recognizable degree is met by any education.
        (None, _) => EDUCATION_FULL,
        (Some(required), Some(held)) if held >= required => EDUCATION_FULL,
        _ => EDUCATION_PARTIAL,
    }
}

fn qualification_met(qualification: &HashSet<String>, tokens: &HashSet<String>) -> bool {
    let hits = qualification.intersection(tokens).count();
    hits as f64 >= QUALIFICATION_PRESENCE_THRESHOLD * qualification.len() as f64
}

/// 1.0 only when the job lists required qualifications and none of them is met.
fn missing_critical_penalty(resume: &ResumeSignals, job: &JobSignals) -> f64 {
    if job.required_qualifications.is_empty() {
        return 0.0;
    }
    let any_met = job
        .required_qualifications
        .iter()
        .any(|q| qualification_met(q, &resume.tokens));
    if any_met {
        0.0
    } else {
        1.0
    }
}

/// Absent unless both vectors exist and share a dimension. Non-finite or zero-norm vectors
/// give no usable cosine, so they are absent too.
fn semantic_similarity(embeddings: Option<(&[f32], &[f32])>) -> Option<f64> {
    let (resume, job) = embeddings?;
    // Anti-correlated documents score as unrelated.
    cosine_similarity(resume, job).map(|c| c.clamp(0.0, 1.0))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
