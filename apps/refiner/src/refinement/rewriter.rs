//! Generative rewrite collaborator: returns a complete resume or a failure, never a partial one.
//!
//! `RefinementOrchestrator` holds an `Arc<dyn ResumeRewriter>`, so tests and alternative
//! backends plug in without touching the refinement loop.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, PLAIN_LANGUAGE_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::job::StructuredJob;
use crate::models::resume::StructuredResume;
use crate::refinement::prompts::{REWRITE_PROMPT_TEMPLATE, REWRITE_SYSTEM};

/// Everything the collaborator may use. Keywords are already known to be backed by `master`.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    pub current: &'a StructuredResume,
    pub injectable_keywords: &'a [String],
    pub master: &'a StructuredResume,
    pub job: &'a StructuredJob,
}

#[async_trait]
pub trait ResumeRewriter: Send + Sync {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<StructuredResume, AppError>;
}

/// Rewriter backed by Claude through `LlmClient`.
pub struct LlmResumeRewriter(pub LlmClient);

#[async_trait]
impl ResumeRewriter for LlmResumeRewriter {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<StructuredResume, AppError> {
        let prompt = build_rewrite_prompt(&request)?;
        debug!(
            "Requesting rewrite with {} injectable keywords",
            request.injectable_keywords.len()
        );

        // Deserializing into StructuredResume rejects partial responses.
        self.0
            .call_json::<StructuredResume>(&prompt, REWRITE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Rewrite LLM call failed: {e}")))
    }
}

fn to_json<T: serde::Serialize>(what: &str, value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize {what}: {e}")))
}

fn build_rewrite_prompt(request: &RewriteRequest<'_>) -> Result<String, AppError> {
    let keywords_json = to_json("keywords", &request.injectable_keywords)?;
    let current_json = to_json("current resume", request.current)?;
    let master_json = to_json("master resume", request.master)?;
    let job_json = to_json("job", request.job)?;

    Ok(REWRITE_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{plain_language_instruction}", PLAIN_LANGUAGE_INSTRUCTION)
        .replace("{keywords_json}", &keywords_json)
        .replace("{current_json}", &current_json)
        .replace("{master_json}", &master_json)
        .replace("{job_json}", &job_json))
}
