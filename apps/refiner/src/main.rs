mod cli;
mod config;
mod embedding;
mod errors;
mod llm_client;
mod matching;
mod models;
mod refinement;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{refinement_config, Cli, Commands};
use crate::config::Config;
use crate::embedding::cache::EmbeddingCache;
use crate::embedding::provider::HttpEmbeddingProvider;
use crate::embedding::CachedEmbedder;
use crate::llm_client::LlmClient;
use crate::matching::normalizer::NormalizerRegistry;
use crate::matching::scorer::{ScoringWeights, WeightedMatchScorer};
use crate::matching::service::MatchService;
use crate::models::job::StructuredJob;
use crate::models::load_document;
use crate::models::resume::StructuredResume;
use crate::refinement::alignment::AlignmentValidator;
use crate::refinement::orchestrator::RefinementOrchestrator;
use crate::refinement::rewriter::LlmResumeRewriter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so stdout stays machine-readable JSON.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting refiner v{}", env!("CARGO_PKG_VERSION"));

    let normalizer = NormalizerRegistry::default().for_language(&cli.language);
    let embedder = build_embedder(&config)?;
    let matcher = Arc::new(MatchService::new(
        Arc::clone(&normalizer),
        Arc::new(WeightedMatchScorer::new(ScoringWeights::default())?),
        embedder.clone(),
    ));

    match cli.command {
        Commands::Score {
            resume,
            job,
            master,
        } => {
            let resume: StructuredResume = load_document("resume", &resume)?;
            let job: StructuredJob = load_document("job", &job)?;
            let master = load_optional_master(master.as_deref())?;

            let report = matcher.evaluate(&resume, &job, master.as_ref()).await?;
            print_json(&report)?;
        }
        Commands::Refine {
            resume,
            job,
            master,
            max_passes,
            no_keyword_injection,
            no_ai_phrase_removal,
            no_alignment_check,
        } => {
            let refine_config = refinement_config(
                max_passes,
                no_keyword_injection,
                no_ai_phrase_removal,
                no_alignment_check,
            );
            refine_config.validate()?;

            let resume: StructuredResume = load_document("resume", &resume)?;
            let job: StructuredJob = load_document("job", &job)?;
            let master = load_optional_master(master.as_deref())?;

            let llm = LlmClient::new(
                config.require_anthropic_key()?.to_string(),
                config.llm_timeout,
            )?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);

            let orchestrator = RefinementOrchestrator::new(
                matcher,
                Arc::new(LlmResumeRewriter(llm)),
                AlignmentValidator::new(normalizer),
                config.llm_timeout,
            );
            let result = orchestrator
                .refine(&resume, &job, master.as_ref(), &refine_config)
                .await?;
            print_json(&result)?;
        }
    }

    if let Some(embedder) = &embedder {
        let stats = embedder.cache().stats();
        debug!(
            "Embedding cache: {} hits, {} misses, {} evictions, {} entries",
            stats.hits, stats.misses, stats.evictions, stats.size
        );
    }

    Ok(())
}

/// Embeddings are optional: without an API key semantic similarity is skipped.
fn build_embedder(config: &Config) -> Result<Option<Arc<CachedEmbedder>>> {
    let Some(provider) = HttpEmbeddingProvider::from_config(&config.embedding)? else {
        info!("No embedding API key configured; scoring without semantic similarity");
        return Ok(None);
    };
    let cache = Arc::new(EmbeddingCache::new(
        config.embedding.cache_ttl,
        config.embedding.cache_max_size,
    ));
    info!(
        "Embedding provider {}/{} initialized (cache max {} entries)",
        config.embedding.provider, config.embedding.model, config.embedding.cache_max_size
    );
    Ok(Some(Arc::new(CachedEmbedder::new(
        Arc::new(provider),
        cache,
        config.embedding.timeout,
    ))))
}

fn load_optional_master(path: Option<&Path>) -> Result<Option<StructuredResume>> {
    Ok(path
        .map(|p| load_document::<StructuredResume>("master resume", p))
        .transpose()?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
