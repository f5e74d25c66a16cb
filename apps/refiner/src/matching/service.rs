//! Match service: normalize → embed via cache → score → report.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedding::CachedEmbedder;
use crate::errors::AppError;
use crate::matching::gap::{analyze_keyword_gap, KeywordGapAnalysis};
use crate::matching::normalizer::TextNormalizer;
use crate::matching::scorer::{MatchBreakdown, MatchScorer};
use crate::matching::signals::{JobSignals, ResumeSignals};
use crate::models::job::StructuredJob;
use crate::models::resume::StructuredResume;

/// Full match report returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub breakdown: MatchBreakdown,
    pub keyword_gap: KeywordGapAnalysis,
    pub recommendation: String,
    pub scorer_backend: String,
}

pub struct MatchService {
    normalizer: Arc<dyn TextNormalizer>,
    scorer: Arc<dyn MatchScorer>,
    embedder: Option<Arc<CachedEmbedder>>,
}

impl MatchService {
    pub fn new(
        normalizer: Arc<dyn TextNormalizer>,
        scorer: Arc<dyn MatchScorer>,
        embedder: Option<Arc<CachedEmbedder>>,
    ) -> Self {
        Self {
            normalizer,
            scorer,
            embedder,
        }
    }

    pub fn resume_signals(&self, resume: &StructuredResume) -> ResumeSignals {
        ResumeSignals::extract(resume, self.normalizer.as_ref())
    }

    pub fn job_signals(&self, job: &StructuredJob) -> JobSignals {
        JobSignals::extract(job, self.normalizer.as_ref())
    }

    /// Scores a resume against a job. Missing embeddings never fail the call.
    pub async fn breakdown(
        &self,
        resume: &StructuredResume,
        job: &StructuredJob,
    ) -> Result<MatchBreakdown, AppError> {
        let resume_signals = self.resume_signals(resume);
        let job_signals = self.job_signals(job);
        self.score_signals(resume, job, &resume_signals, &job_signals)
            .await
    }

    async fn score_signals(
        &self,
        resume: &StructuredResume,
        job: &StructuredJob,
        resume_signals: &ResumeSignals,
        job_signals: &JobSignals,
    ) -> Result<MatchBreakdown, AppError> {
        let embeddings = match &self.embedder {
            Some(embedder) => {
                embedder
                    .embed_pair(&resume.full_text(), &job.full_text())
                    .await
            }
            None => None,
        };
        if embeddings.is_none() {
            debug!("Scoring without semantic similarity");
        }

        self.scorer.score(
            resume_signals,
            job_signals,
            embeddings
                .as_ref()
                .map(|(r, j)| (r.as_slice(), j.as_slice())),
        )
    }

    /// Breakdown plus keyword gap and a recommendation. Without a master resume nothing is
    /// injectable.
    pub async fn evaluate(
        &self,
        resume: &StructuredResume,
        job: &StructuredJob,
        master: Option<&StructuredResume>,
    ) -> Result<MatchReport, AppError> {
        let resume_signals = self.resume_signals(resume);
        let job_signals = self.job_signals(job);
        let master_tokens = master
            .map(|m| self.resume_signals(m).tokens)
            .unwrap_or_else(HashSet::new);

        let breakdown = self
            .score_signals(resume, job, &resume_signals, &job_signals)
            .await?;
        let keyword_gap =
            analyze_keyword_gap(&job_signals.keywords, &resume_signals.tokens, &master_tokens);
        let recommendation = build_recommendation(breakdown.final_score, &keyword_gap);

        info!(
            "Scored resume against '{}': {} ({} missing keywords)",
            job.title,
            breakdown.final_score,
            keyword_gap.missing_keywords.len()
        );

        Ok(MatchReport {
            breakdown,
            keyword_gap,
            recommendation,
            scorer_backend: self.scorer.backend().to_string(),
        })
    }
}

/// Builds a human-readable recommendation from the final score and missing keywords.
fn build_recommendation(score: u32, gap: &KeywordGapAnalysis) -> String {
    let top_missing: Vec<&str> = gap
        .missing_keywords
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();

    if score >= 80 {
        "Strong fit. The resume directly covers the key job requirements.".to_string()
    } else if score >= 60 {
        format!(
            "Moderate fit ({score}/100). Consider addressing: {}.",
            top_missing.join(", ")
        )
    } else if gap.injectable_keywords.is_empty() {
        format!(
            "Low fit ({score}/100). Significant gaps: {}.",
            top_missing.join(", ")
        )
    } else {
        format!(
            "Low fit ({score}/100). Significant gaps: {}. {} can be added from the master resume.",
            top_missing.join(", "),
            gap.injectable_keywords.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::cache::EmbeddingCache;
    use crate::embedding::provider::EmbeddingProvider;
    use crate::matching::normalizer::EnglishNormalizer;
    use crate::matching::scorer::WeightedMatchScorer;
    use crate::models::job::Qualifications;

    struct ConstantProvider;

    #[async_trait]
    impl EmbeddingProvider for ConstantProvider {
        fn provider_id(&self) -> &str {
            "const"
        }

        fn model_id(&self) -> &str {
            "v1"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AppError> {
            Ok(vec![1.0, 2.0, 3.0])
        }
    }

    /// NaN vectors, or a shorter vector for one chosen text.
    enum BrokenProvider {
        NotANumber,
        ShortFor(String),
    }

    #[async_trait]
    impl EmbeddingProvider for BrokenProvider {
        fn provider_id(&self) -> &str {
            "broken"
        }

        fn model_id(&self) -> &str {
            "v1"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
            Ok(match self {
                BrokenProvider::NotANumber => vec![f32::NAN, 1.0],
                BrokenProvider::ShortFor(short) if short == text => vec![1.0],
                BrokenProvider::ShortFor(_) => vec![1.0, 0.0],
            })
        }
    }

    fn job() -> StructuredJob {
        StructuredJob {
            title: "Platform Engineer".to_string(),
            company: None,
            employment_type: None,
            remote_status: None,
            qualifications: Qualifications {
                required: vec!["Python".to_string()],
                preferred: vec![],
            },
            responsibilities: vec!["Operate Kubernetes clusters".to_string()],
            keywords: vec![
                "Kubernetes".to_string(),
                "Python".to_string(),
                "CI/CD".to_string(),
            ],
            education_requirement: None,
        }
    }

    fn resume(skills: &[&str]) -> StructuredResume {
        StructuredResume {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn service(embedder: Option<Arc<CachedEmbedder>>) -> MatchService {
        MatchService::new(
            Arc::new(EnglishNormalizer),
            Arc::new(WeightedMatchScorer::default()),
            embedder,
        )
    }

    #[tokio::test]
    async fn test_evaluate_reports_gap_against_master() {
        let report = service(None)
            .evaluate(
                &resume(&["Python"]),
                &job(),
                Some(&resume(&["Python", "Kubernetes"])),
            )
            .await
            .unwrap();

        assert_eq!(report.keyword_gap.injectable_keywords, vec!["kubernetes"]);
        assert_eq!(report.keyword_gap.non_injectable_keywords, vec!["ci/cd"]);
        assert!(report.breakdown.semantic_similarity.is_none());
        assert_eq!(report.scorer_backend, "weighted");
        assert!(report.recommendation.contains("kubernetes"));
    }

    #[tokio::test]
    async fn test_without_master_nothing_injectable() {
        let report = service(None)
            .evaluate(&resume(&["Python"]), &job(), None)
            .await
            .unwrap();
        assert!(report.keyword_gap.injectable_keywords.is_empty());
        assert_eq!(report.keyword_gap.missing_keywords.len(), 2);
    }

    #[tokio::test]
    async fn test_embeddings_routed_through_cache() {
        let cache = Arc::new(EmbeddingCache::new(Duration::from_secs(60), 8));
        let embedder = Arc::new(CachedEmbedder::new(
            Arc::new(ConstantProvider),
            Arc::clone(&cache),
            Duration::from_secs(1),
        ));
        let svc = service(Some(embedder));

        let first = svc.breakdown(&resume(&["Python"]), &job()).await.unwrap();
        let second = svc.breakdown(&resume(&["Python"]), &job()).await.unwrap();

        assert!((first.semantic_similarity.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_unusable_embeddings_score_without_semantic() {
        let plain = service(None)
            .breakdown(&resume(&["Python"]), &job())
            .await
            .unwrap();

        for provider in [
            BrokenProvider::NotANumber,
            BrokenProvider::ShortFor(job().full_text()),
        ] {
            let embedder = Arc::new(CachedEmbedder::new(
                Arc::new(provider),
                Arc::new(EmbeddingCache::new(Duration::from_secs(60), 8)),
                Duration::from_secs(1),
            ));
            let breakdown = service(Some(embedder))
                .breakdown(&resume(&["Python"]), &job())
                .await
                .unwrap();
            assert!(breakdown.semantic_similarity.is_none());
            assert_eq!(breakdown, plain);
        }
    }

    #[tokio::test]
    async fn test_skill_order_does_not_change_score() {
        let svc = service(None);
        let a = svc
            .breakdown(&resume(&["Python", "Kubernetes", "Go"]), &job())
            .await
            .unwrap();
        let b = svc
            .breakdown(&resume(&["Go", "Kubernetes", "Python"]), &job())
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_recommendation_strong() {
        let gap = analyze_keyword_gap(&[], &HashSet::new(), &HashSet::new());
        assert!(build_recommendation(85, &gap).contains("Strong fit"));
    }

    #[test]
    fn test_recommendation_moderate_lists_missing() {
        let gap = analyze_keyword_gap(&["kafka".to_string()], &HashSet::new(), &HashSet::new());
        let rec = build_recommendation(65, &gap);
        assert!(rec.contains("65"));
        assert!(rec.contains("kafka"));
    }
}
