//! Refinement: bounded multi-pass rewrite loop.
//!
//! Flow per pass: keyword gap → rewrite (timeout-bounded) → AI phrase scrub →
//!       master alignment (revert once, re-validate) → accept.
//!
//! Passes are strictly sequential: each consumes the previous pass's accepted resume. A
//! collaborator failure aborts only the in-flight pass; the last accepted resume is returned.
//!
//! A pass that skips the rewrite still scrubs phrases and runs the corrective merge on the
//! current resume, so the input can change without collaborator output. Such a pass is logged
//! as `NormalizedOnly`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::gap::{analyze_keyword_gap, KeywordGapAnalysis};
use crate::matching::scorer::MatchBreakdown;
use crate::matching::service::MatchService;
use crate::models::job::StructuredJob;
use crate::models::resume::StructuredResume;
use crate::refinement::alignment::{revert_fields, AlignmentReport, AlignmentValidator, FieldRevert};
use crate::refinement::phrases::scrub_resume;
use crate::refinement::rewriter::{ResumeRewriter, RewriteRequest};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementConfig {
    pub enable_keyword_injection: bool,
    pub enable_ai_phrase_removal: bool,
    pub enable_master_alignment_check: bool,
    pub max_refinement_passes: u32,
}

impl RefinementConfig {
    pub const MIN_PASSES: u32 = 1;
    pub const MAX_PASSES: u32 = 5;

    pub fn validate(&self) -> Result<(), AppError> {
        if !(Self::MIN_PASSES..=Self::MAX_PASSES).contains(&self.max_refinement_passes) {
            return Err(AppError::Validation(format!(
                "max_refinement_passes must be between {} and {}, got {}",
                Self::MIN_PASSES,
                Self::MAX_PASSES,
                self.max_refinement_passes
            )));
        }
        Ok(())
    }
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enable_keyword_injection: true,
            enable_ai_phrase_removal: true,
            enable_master_alignment_check: true,
            max_refinement_passes: 3,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Loop state. `Pass(n)` as a final state means the pass cap stopped the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementState {
    Initial,
    Pass(u32),
    Converged,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    MaxPassesReached,
    /// No injectable keywords remain and no critical violation is present.
    Converged,
    /// A pass could not change the accepted resume.
    NoProgress,
    CollaboratorFailed { code: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Accepted,
    /// No rewrite was requested; only phrase scrubbing and the corrective merge ran.
    NormalizedOnly,
    /// Critical violations survived the corrective merge; the prior resume was kept.
    RejectedCritical,
    CollaboratorFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    pub pass: u32,
    pub outcome: PassOutcome,
    pub rewrite_requested: bool,
    pub injectable_keywords: Vec<String>,
    pub removed_phrases: Vec<String>,
    pub reverted_fields: Vec<FieldRevert>,
    /// Keyword match of the accepted resume after this pass.
    pub match_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinementResult {
    pub run_id: Uuid,
    pub refined_resume: StructuredResume,
    pub passes_completed: u32,
    pub final_state: RefinementState,
    pub stop_reason: StopReason,
    pub pass_log: Vec<PassRecord>,
    pub keyword_analysis: KeywordGapAnalysis,
    /// Present when the alignment check is enabled.
    pub alignment_report: Option<AlignmentReport>,
    pub removed_ai_phrases: Vec<String>,
    pub final_match_percentage: f64,
    pub final_breakdown: MatchBreakdown,
}

/// What a single pass decided.
enum PassVerdict {
    Accepted {
        resume: StructuredResume,
        alignment: Option<AlignmentReport>,
    },
    Rejected {
        alignment: AlignmentReport,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct RefinementOrchestrator {
    matcher: Arc<MatchService>,
    rewriter: Arc<dyn ResumeRewriter>,
    validator: AlignmentValidator,
    rewrite_timeout: Duration,
}

impl RefinementOrchestrator {
    pub fn new(
        matcher: Arc<MatchService>,
        rewriter: Arc<dyn ResumeRewriter>,
        validator: AlignmentValidator,
        rewrite_timeout: Duration,
    ) -> Self {
        Self {
            matcher,
            rewriter,
            validator,
            rewrite_timeout,
        }
    }

    fn tokens(&self, resume: &StructuredResume) -> HashSet<String> {
        self.matcher.resume_signals(resume).tokens
    }

    async fn request_rewrite(
        &self,
        request: RewriteRequest<'_>,
    ) -> Result<StructuredResume, AppError> {
        match tokio::time::timeout(self.rewrite_timeout, self.rewriter.rewrite(request)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                operation: "resume rewrite".to_string(),
                seconds: self.rewrite_timeout.as_secs(),
            }),
        }
    }

    /// Alignment check with one corrective merge against `last_accepted`.
    fn check_alignment(
        &self,
        candidate: StructuredResume,
        last_accepted: &StructuredResume,
        master: Option<&StructuredResume>,
        reverted: &mut Vec<FieldRevert>,
    ) -> PassVerdict {
        let report = self.validator.validate(&candidate, master);
        if !report.has_critical() {
            return PassVerdict::Accepted {
                resume: candidate,
                alignment: Some(report),
            };
        }

        let (merged, audit) = revert_fields(&candidate, last_accepted, &report.violations);
        debug!("Corrective merge reverted {} fields", audit.len());
        reverted.extend(audit);

        let report = self.validator.validate(&merged, master);
        if report.has_critical() {
            PassVerdict::Rejected { alignment: report }
        } else {
            PassVerdict::Accepted {
                resume: merged,
                alignment: Some(report),
            }
        }
    }

    /// Runs the refinement loop. Only an invalid configuration is an error: collaborator
    /// failures are reported in the result's `stop_reason`.
    pub async fn refine(
        &self,
        resume: &StructuredResume,
        job: &StructuredJob,
        master: Option<&StructuredResume>,
        config: &RefinementConfig,
    ) -> Result<RefinementResult, AppError> {
        config.validate()?;

        let run_id = Uuid::new_v4();
        let job_keywords = self.matcher.job_signals(job).keywords;
        let master_tokens = master.map(|m| self.tokens(m)).unwrap_or_default();
        // Ground truth for the rewrite prompt; without a master the input is its own source.
        let ground_truth = master.unwrap_or(resume);

        info!(
            "Refinement {run_id}: up to {} passes, {} job keywords, master={}",
            config.max_refinement_passes,
            job_keywords.len(),
            master.is_some()
        );

        let mut current = resume.clone();
        let mut state = RefinementState::Initial;
        let mut stop_reason = StopReason::MaxPassesReached;
        let mut pass_log: Vec<PassRecord> = Vec::new();
        let mut removed_ai_phrases: Vec<String> = Vec::new();
        let mut last_alignment: Option<AlignmentReport> = None;

        for pass in 1..=config.max_refinement_passes {
            state = RefinementState::Pass(pass);

            // Step 1: keyword gap
            let injectable = if config.enable_keyword_injection {
                analyze_keyword_gap(&job_keywords, &self.tokens(&current), &master_tokens)
                    .injectable_keywords
            } else {
                Vec::new()
            };
            let rewrite_requested = !(config.enable_keyword_injection && injectable.is_empty());
            info!(
                "Refinement {run_id} pass {pass}: {} injectable keywords, rewrite={rewrite_requested}",
                injectable.len()
            );

            // Step 2: rewrite
            let candidate = if rewrite_requested {
                let request = RewriteRequest {
                    current: &current,
                    injectable_keywords: &injectable,
                    master: ground_truth,
                    job,
                };
                let response = self.request_rewrite(request).await;
                match response {
                    Ok(rewritten) => rewritten,
                    Err(e) if !e.is_collaborator_failure() => return Err(e),
                    Err(e) => {
                        warn!("Refinement {run_id} pass {pass}: rewrite failed: {e}");
                        pass_log.push(PassRecord {
                            pass,
                            outcome: PassOutcome::CollaboratorFailed,
                            rewrite_requested,
                            injectable_keywords: injectable,
                            removed_phrases: Vec::new(),
                            reverted_fields: Vec::new(),
                            match_percentage: self.match_percentage(&job_keywords, &current),
                        });
                        stop_reason = StopReason::CollaboratorFailed {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        };
                        state = RefinementState::Aborted;
                        break;
                    }
                }
            } else {
                current.clone()
            };

            // Step 3: AI phrase removal
            let (candidate, removed_phrases) = if config.enable_ai_phrase_removal {
                scrub_resume(&candidate)
            } else {
                (candidate, Vec::new())
            };
            for phrase in &removed_phrases {
                if !removed_ai_phrases.contains(phrase) {
                    removed_ai_phrases.push(phrase.clone());
                }
            }

            // Step 4: master alignment
            let mut reverted_fields = Vec::new();
            let verdict = if config.enable_master_alignment_check {
                self.check_alignment(candidate, &current, master, &mut reverted_fields)
            } else {
                PassVerdict::Accepted {
                    resume: candidate,
                    alignment: None,
                }
            };

            // Step 5: accept or keep the prior state
            let (outcome, changed, critical) = match verdict {
                PassVerdict::Accepted { resume, alignment } => {
                    let changed = resume != current;
                    current = resume;
                    last_alignment = alignment;
                    let outcome = if rewrite_requested {
                        PassOutcome::Accepted
                    } else {
                        PassOutcome::NormalizedOnly
                    };
                    (outcome, changed, false)
                }
                PassVerdict::Rejected { alignment } => {
                    warn!(
                        "Refinement {run_id} pass {pass}: critical violations remain after revert, keeping prior resume"
                    );
                    last_alignment = Some(alignment);
                    (PassOutcome::RejectedCritical, false, true)
                }
            };

            let gap = analyze_keyword_gap(&job_keywords, &self.tokens(&current), &master_tokens);
            pass_log.push(PassRecord {
                pass,
                outcome,
                rewrite_requested,
                injectable_keywords: injectable,
                removed_phrases,
                reverted_fields,
                match_percentage: gap.current_match_percentage,
            });
            info!(
                "Refinement {run_id} pass {pass}: {outcome:?}, match {:.1}%",
                gap.current_match_percentage
            );

            let nothing_to_inject =
                !config.enable_keyword_injection || gap.injectable_keywords.is_empty();
            if nothing_to_inject && !critical {
                stop_reason = StopReason::Converged;
                state = RefinementState::Converged;
                break;
            }
            if !changed && (outcome == PassOutcome::Accepted || !rewrite_requested) {
                stop_reason = StopReason::NoProgress;
                break;
            }
        }

        self.finish(FinishInput {
            run_id,
            resume: current,
            job,
            master,
            job_keywords: &job_keywords,
            master_tokens: &master_tokens,
            config,
            state,
            stop_reason,
            pass_log,
            removed_ai_phrases,
            last_alignment,
        })
        .await
    }

    fn match_percentage(&self, job_keywords: &[String], resume: &StructuredResume) -> f64 {
        analyze_keyword_gap(job_keywords, &self.tokens(resume), &HashSet::new())
            .current_match_percentage
    }

    /// Re-scores the accepted resume and assembles the result.
    async fn finish(&self, input: FinishInput<'_>) -> Result<RefinementResult, AppError> {
        let keyword_analysis = analyze_keyword_gap(
            input.job_keywords,
            &self.tokens(&input.resume),
            input.master_tokens,
        );
        let final_breakdown = self.matcher.breakdown(&input.resume, input.job).await?;
        let alignment_report = if input.config.enable_master_alignment_check {
            match input.last_alignment {
                Some(report) if !report.has_critical() => Some(report),
                _ => Some(self.validator.validate(&input.resume, input.master)),
            }
        } else {
            None
        };

        info!(
            "Refinement {} finished after {} passes: {:?}, final score {}",
            input.run_id,
            input.pass_log.len(),
            input.stop_reason,
            final_breakdown.final_score
        );

        Ok(RefinementResult {
            run_id: input.run_id,
            refined_resume: input.resume,
            passes_completed: input.pass_log.len() as u32,
            final_state: input.state,
            stop_reason: input.stop_reason,
            pass_log: input.pass_log,
            final_match_percentage: keyword_analysis.current_match_percentage,
            keyword_analysis,
            alignment_report,
            removed_ai_phrases: input.removed_ai_phrases,
            final_breakdown,
        })
    }
}

struct FinishInput<'a> {
    run_id: Uuid,
    resume: StructuredResume,
    job: &'a StructuredJob,
    master: Option<&'a StructuredResume>,
    job_keywords: &'a [String],
    master_tokens: &'a HashSet<String>,
    config: &'a RefinementConfig,
    state: RefinementState,
    stop_reason: StopReason,
    pass_log: Vec<PassRecord>,
    removed_ai_phrases: Vec<String>,
    last_alignment: Option<AlignmentReport>,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::embedding::cache::EmbeddingCache;
    use crate::embedding::provider::EmbeddingProvider;
    use crate::embedding::CachedEmbedder;
    use crate::matching::normalizer::EnglishNormalizer;
    use crate::matching::scorer::WeightedMatchScorer;
    use crate::models::job::Qualifications;

    /// Adds the first injectable keyword to the skill list, plus optional extras.
    struct KeywordAppender {
        calls: AtomicU32,
        extra_skill: Option<&'static str>,
        summary: Option<&'static str>,
        fail_on_call: Option<u32>,
        delay: Duration,
    }

    impl KeywordAppender {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                extra_skill: None,
                summary: None,
                fail_on_call: None,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ResumeRewriter for KeywordAppender {
        async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<StructuredResume, AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail_on_call == Some(call) {
                return Err(AppError::Llm("model overloaded".to_string()));
            }
            let mut next = request.current.clone();
            if let Some(keyword) = request.injectable_keywords.first() {
                next.skills.push(keyword.clone());
            }
            if let Some(extra) = self.extra_skill {
                next.skills.push(extra.to_string());
            }
            if let Some(summary) = self.summary {
                next.summary = Some(summary.to_string());
            }
            Ok(next)
        }
    }

    struct NanProvider;

    #[async_trait]
    impl EmbeddingProvider for NanProvider {
        fn provider_id(&self) -> &str {
            "nan"
        }

        fn model_id(&self) -> &str {
            "v1"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AppError> {
            Ok(vec![f32::NAN, 0.5])
        }
    }

    const KEYWORDS: &[&str] = &["Python", "Rust", "Kafka", "Redis", "Docker", "Terraform", "Kubernetes"];

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn job(keywords: &[&str]) -> StructuredJob {
        StructuredJob {
            title: "Platform Engineer".to_string(),
            company: None,
            employment_type: None,
            remote_status: None,
            qualifications: Qualifications::default(),
            responsibilities: vec![],
            keywords: strings(keywords),
            education_requirement: None,
        }
    }

    fn resume(skills: &[&str]) -> StructuredResume {
        StructuredResume {
            skills: strings(skills),
            ..Default::default()
        }
    }

    fn orchestrator(rewriter: Arc<dyn ResumeRewriter>) -> RefinementOrchestrator {
        orchestrator_with_embedder(rewriter, None)
    }

    fn orchestrator_with_embedder(
        rewriter: Arc<dyn ResumeRewriter>,
        embedder: Option<Arc<CachedEmbedder>>,
    ) -> RefinementOrchestrator {
        let matcher = Arc::new(MatchService::new(
            Arc::new(EnglishNormalizer),
            Arc::new(WeightedMatchScorer::default()),
            embedder,
        ));
        RefinementOrchestrator::new(
            matcher,
            rewriter,
            AlignmentValidator::new(Arc::new(EnglishNormalizer)),
            Duration::from_secs(5),
        )
    }

    fn config(max: u32) -> RefinementConfig {
        RefinementConfig {
            max_refinement_passes: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_pass_bounds() {
        assert!(config(0).validate().is_err());
        assert!(config(1).validate().is_ok());
        assert!(config(5).validate().is_ok());
        assert!(matches!(config(6).validate(), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_any_pass() {
        let rewriter = Arc::new(KeywordAppender::new());
        let result = orchestrator(rewriter.clone())
            .refine(&resume(&["Python"]), &job(&["Python"]), None, &config(9))
            .await;
        assert!(result.is_err());
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_converges_once_nothing_injectable() {
        let rewriter = Arc::new(KeywordAppender::new());
        let master = resume(&["Python", "Kubernetes"]);
        let result = orchestrator(rewriter.clone())
            .refine(
                &resume(&["Python"]),
                &job(&["Kubernetes", "Python", "CI/CD"]),
                Some(&master),
                &config(5),
            )
            .await
            .unwrap();

        assert_eq!(result.stop_reason, StopReason::Converged);
        assert_eq!(result.final_state, RefinementState::Converged);
        assert_eq!(result.passes_completed, 1);
        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 1);
        assert!(result.refined_resume.skills.contains(&"kubernetes".to_string()));
        assert_eq!(result.keyword_analysis.non_injectable_keywords, vec!["ci/cd"]);
        assert!((result.final_match_percentage - 66.667).abs() < 0.01);
        assert!(result.alignment_report.unwrap().is_aligned);
    }

    #[tokio::test]
    async fn test_never_exceeds_pass_cap() {
        let master = resume(KEYWORDS);
        for max in 1..=5 {
            let rewriter = Arc::new(KeywordAppender::new());
            let result = orchestrator(rewriter.clone())
                .refine(&resume(&["Python"]), &job(KEYWORDS), Some(&master), &config(max))
                .await
                .unwrap();
            assert_eq!(result.passes_completed, max);
            assert_eq!(rewriter.calls.load(Ordering::SeqCst), max);
            assert_eq!(result.stop_reason, StopReason::MaxPassesReached);
            assert_eq!(result.final_state, RefinementState::Pass(max));
            assert_eq!(result.refined_resume.skills.len(), 1 + max as usize);
        }
    }

    #[tokio::test]
    async fn test_failure_on_first_pass_returns_original() {
        let rewriter = Arc::new(KeywordAppender {
            fail_on_call: Some(1),
            ..KeywordAppender::new()
        });
        let original = resume(&["Python"]);
        let result = orchestrator(rewriter)
            .refine(&original, &job(KEYWORDS), Some(&resume(KEYWORDS)), &config(3))
            .await
            .unwrap();

        assert_eq!(result.refined_resume, original);
        assert_eq!(result.final_state, RefinementState::Aborted);
        assert_eq!(result.pass_log[0].outcome, PassOutcome::CollaboratorFailed);
        match result.stop_reason {
            StopReason::CollaboratorFailed { code, message } => {
                assert_eq!(code, "LLM_ERROR");
                assert!(message.contains("model overloaded"));
            }
            other => panic!("unexpected stop reason {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_on_later_pass_keeps_last_accepted() {
        let rewriter = Arc::new(KeywordAppender {
            fail_on_call: Some(2),
            ..KeywordAppender::new()
        });
        let result = orchestrator(rewriter)
            .refine(&resume(&["Python"]), &job(KEYWORDS), Some(&resume(KEYWORDS)), &config(4))
            .await
            .unwrap();

        assert_eq!(result.passes_completed, 2);
        assert_eq!(result.refined_resume.skills.len(), 2);
        assert!(matches!(result.stop_reason, StopReason::CollaboratorFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_timeout_aborts_pass() {
        let rewriter = Arc::new(KeywordAppender {
            delay: Duration::from_secs(3600),
            ..KeywordAppender::new()
        });
        let original = resume(&["Python"]);
        let result = orchestrator(rewriter)
            .refine(&original, &job(KEYWORDS), Some(&resume(KEYWORDS)), &config(3))
            .await
            .unwrap();

        assert_eq!(result.refined_resume, original);
        assert!(matches!(
            result.stop_reason,
            StopReason::CollaboratorFailed { ref code, .. } if code == "TIMEOUT"
        ));
    }

    #[tokio::test]
    async fn test_fabricated_skill_reverted_and_audited() {
        let rewriter = Arc::new(KeywordAppender {
            extra_skill: Some("Haskell"),
            ..KeywordAppender::new()
        });
        let master = resume(&["Python", "Kubernetes"]);
        let result = orchestrator(rewriter)
            .refine(&resume(&["Python"]), &job(&["Kubernetes"]), Some(&master), &config(3))
            .await
            .unwrap();

        assert_eq!(result.refined_resume.skills, vec!["Python", "kubernetes"]);
        let record = &result.pass_log[0];
        assert_eq!(record.outcome, PassOutcome::Accepted);
        assert_eq!(record.reverted_fields.len(), 1);
        assert_eq!(record.reverted_fields[0].field_path.to_string(), "skills[2]");
        assert_eq!(record.reverted_fields[0].from.as_deref(), Some("Haskell"));
        assert_eq!(result.stop_reason, StopReason::Converged);
    }

    #[tokio::test]
    async fn test_fabrication_kept_when_alignment_disabled() {
        let rewriter = Arc::new(KeywordAppender {
            extra_skill: Some("Haskell"),
            ..KeywordAppender::new()
        });
        let cfg = RefinementConfig {
            enable_master_alignment_check: false,
            ..config(1)
        };
        let result = orchestrator(rewriter)
            .refine(
                &resume(&["Python"]),
                &job(&["Kubernetes"]),
                Some(&resume(&["Python", "Kubernetes"])),
                &cfg,
            )
            .await
            .unwrap();
        assert!(result.refined_resume.skills.contains(&"Haskell".to_string()));
        assert!(result.alignment_report.is_none());
    }

    #[tokio::test]
    async fn test_removed_phrases_deduplicated_across_passes() {
        let rewriter = Arc::new(KeywordAppender {
            summary: Some("Spearheaded platform work — leveraging Kafka"),
            ..KeywordAppender::new()
        });
        let result = orchestrator(rewriter)
            .refine(&resume(&["Python"]), &job(KEYWORDS), Some(&resume(KEYWORDS)), &config(3))
            .await
            .unwrap();

        assert_eq!(result.removed_ai_phrases, vec!["spearheaded", "leveraging"]);
        assert_eq!(
            result.refined_resume.summary.as_deref(),
            Some("Led platform work, using Kafka")
        );
    }

    #[tokio::test]
    async fn test_nothing_injectable_skips_rewrite() {
        let rewriter = Arc::new(KeywordAppender::new());
        let result = orchestrator(rewriter.clone())
            .refine(&resume(&["Python"]), &job(&["Python", "Go"]), None, &config(3))
            .await
            .unwrap();

        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
        assert!(!result.pass_log[0].rewrite_requested);
        assert_eq!(result.stop_reason, StopReason::Converged);
        assert_eq!(result.refined_resume, resume(&["Python"]));
    }

    #[tokio::test]
    async fn test_injection_disabled_runs_single_polish_pass() {
        let rewriter = Arc::new(KeywordAppender {
            summary: Some("Results-driven engineer"),
            ..KeywordAppender::new()
        });
        let cfg = RefinementConfig {
            enable_keyword_injection: false,
            ..config(5)
        };
        let result = orchestrator(rewriter.clone())
            .refine(&resume(&["Python"]), &job(KEYWORDS), Some(&resume(KEYWORDS)), &cfg)
            .await
            .unwrap();

        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.refined_resume.summary.as_deref(), Some("Engineer"));
        assert_eq!(result.refined_resume.skills, vec!["Python"]);
        assert_eq!(result.stop_reason, StopReason::Converged);
    }

    #[tokio::test]
    async fn test_unusable_embeddings_keep_accepted_passes() {
        let embedder = Arc::new(CachedEmbedder::new(
            Arc::new(NanProvider),
            Arc::new(EmbeddingCache::new(Duration::from_secs(60), 8)),
            Duration::from_secs(1),
        ));
        let master = resume(&["Python", "Kafka"]);
        let result = orchestrator_with_embedder(Arc::new(KeywordAppender::new()), Some(embedder))
            .refine(&resume(&["Python"]), &job(&["Kafka"]), Some(&master), &config(3))
            .await
            .unwrap();

        assert_eq!(result.refined_resume.skills, vec!["Python", "kafka"]);
        assert_eq!(result.stop_reason, StopReason::Converged);
        assert!(result.final_breakdown.semantic_similarity.is_none());
    }

    #[tokio::test]
    async fn test_pass_without_rewrite_logged_as_normalized_only() {
        let rewriter = Arc::new(KeywordAppender::new());
        let original = StructuredResume {
            summary: Some("Results-driven engineer".to_string()),
            ..resume(&["Python"])
        };
        let result = orchestrator(rewriter.clone())
            .refine(&original, &job(&["Python"]), None, &config(3))
            .await
            .unwrap();

        assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);
        let record = &result.pass_log[0];
        assert!(!record.rewrite_requested);
        assert_eq!(record.outcome, PassOutcome::NormalizedOnly);
        assert_eq!(record.removed_phrases, vec!["results-driven"]);
        assert_eq!(result.refined_resume.summary.as_deref(), Some("Engineer"));
    }
}
