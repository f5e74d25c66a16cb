use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::refinement::orchestrator::RefinementConfig;

#[derive(Parser)]
#[command(name = "refiner")]
#[command(about = "Score a resume against a job and refine it without fabricating", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Normalizer language (ISO 639-1); unknown codes fall back to English
    #[arg(long, default_value = "en", global = true)]
    pub language: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a resume against a job and print the match report as JSON
    Score {
        /// StructuredResume JSON file
        #[arg(long)]
        resume: PathBuf,

        /// StructuredJob JSON file
        #[arg(long)]
        job: PathBuf,

        /// Master resume JSON file, used to split missing keywords into injectable or not
        #[arg(long)]
        master: Option<PathBuf>,
    },

    /// Refine a resume toward a job and print the refinement result as JSON
    Refine {
        /// StructuredResume JSON file
        #[arg(long)]
        resume: PathBuf,

        /// StructuredJob JSON file
        #[arg(long)]
        job: PathBuf,

        /// Master resume JSON file (ground truth). Without it alignment runs warning-only
        #[arg(long)]
        master: Option<PathBuf>,

        /// Maximum refinement passes (1-5)
        #[arg(long, default_value_t = 3)]
        max_passes: u32,

        #[arg(long)]
        no_keyword_injection: bool,

        #[arg(long)]
        no_ai_phrase_removal: bool,

        #[arg(long)]
        no_alignment_check: bool,
    },
}

pub fn refinement_config(
    max_passes: u32,
    no_keyword_injection: bool,
    no_ai_phrase_removal: bool,
    no_alignment_check: bool,
) -> RefinementConfig {
    RefinementConfig {
        enable_keyword_injection: !no_keyword_injection,
        enable_ai_phrase_removal: !no_ai_phrase_removal,
        enable_master_alignment_check: !no_alignment_check,
        max_refinement_passes: max_passes,
    }
}
