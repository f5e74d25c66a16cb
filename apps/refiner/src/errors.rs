use thiserror::Error;

/// Application-level error type.
/// Every fallible operation in the engine returns `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown value '{value}' for field '{field}'")]
    Schema { field: &'static str, value: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, surfaced in refinement reports and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Schema { .. } => "SCHEMA_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Embedding(_) => "EMBEDDING_ERROR",
            AppError::Timeout { .. } => "TIMEOUT",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Collaborator failures that abort a refinement pass rather than the whole request.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_) | AppError::Embedding(_) | AppError::Timeout { .. }
        )
    }
}
