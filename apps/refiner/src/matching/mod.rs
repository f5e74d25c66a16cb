//! Matching: normalization, signal extraction, scoring and keyword gap analysis.

pub mod gap;
pub mod normalizer;
pub mod scorer;
pub mod service;
pub mod signals;
