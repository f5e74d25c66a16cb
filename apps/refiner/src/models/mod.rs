pub mod job;
pub mod resume;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// Parses a structured document, reporting a missing or malformed field as a
/// validation error that names the document kind.
pub fn parse_document<T: DeserializeOwned>(kind: &str, json: &str) -> Result<T, AppError> {
    serde_json::from_str(json).map_err(|e| AppError::Validation(format!("{kind}: {e}")))
}

/// Reads and parses a structured document from a JSON file.
pub fn load_document<T: DeserializeOwned>(kind: &str, path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_document(kind, &raw)
}
