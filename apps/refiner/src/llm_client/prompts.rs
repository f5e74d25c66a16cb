// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Common instruction appended to every rewrite prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every skill, certification, company, and technology in your output must already \
    appear in the MASTER RESUME. Do NOT infer, interpolate, or invent details. \
    If the master resume does not support a claim, omit it entirely.";

/// Instruction against generic filler phrasing.
pub const PLAIN_LANGUAGE_INSTRUCTION: &str = "\
    Write plainly. Avoid buzzwords and filler such as 'spearheaded', 'leveraged', \
    'results-driven', 'passionate about', or 'in today's fast-paced world'. \
    Do NOT use em-dashes.";
