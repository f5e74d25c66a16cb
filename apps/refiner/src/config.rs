use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_EMBEDDING_API_URL: &str = "https://api.openai.com/v1/embeddings";

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Only required by `refine`; `score` runs without the generative collaborator.
    pub anthropic_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub embedding: EmbeddingConfig,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    /// Semantic similarity is skipped entirely when no key is configured.
    pub api_key: Option<String>,
    pub provider: String,
    pub model: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_max_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120)?),
            embedding: EmbeddingConfig {
                api_url: optional_env("EMBEDDING_API_URL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_API_URL.to_string()),
                api_key: optional_env("EMBEDDING_API_KEY"),
                provider: optional_env("EMBEDDING_PROVIDER")
                    .unwrap_or_else(|| "openai".to_string()),
                model: optional_env("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "text-embedding-3-small".to_string()),
                timeout: Duration::from_secs(parse_env("EMBEDDING_TIMEOUT_SECS", 30)?),
                cache_ttl: Duration::from_secs(parse_env("EMBEDDING_CACHE_TTL_SECS", 86_400)?),
                cache_max_size: parse_env("EMBEDDING_CACHE_MAX_SIZE", 1_000)?,
            },
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Returns the API key for the rewrite collaborator, failing if it is not configured.
    pub fn require_anthropic_key(&self) -> Result<&str> {
        self.anthropic_api_key
            .as_deref()
            .context("Required environment variable 'ANTHROPIC_API_KEY' is not set")
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
