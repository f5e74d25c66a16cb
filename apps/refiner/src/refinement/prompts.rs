// All LLM prompt constants for the refinement module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for resume rewriting: enforces JSON-only output.
pub const REWRITE_SYSTEM: &str = "You are an expert resume editor tailoring a resume to a job \
    without adding any claim the candidate cannot back up. \
    You MUST respond with valid JSON only — a single resume object in the input schema. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Resume rewrite prompt template.
/// Replace: {grounding_instruction}, {plain_language_instruction}, {keywords_json},
///          {current_json}, {master_json}, {job_json}
pub const REWRITE_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

{plain_language_instruction}

KEYWORDS to work in (each one is backed by the master resume):
{keywords_json}

CURRENT RESUME (edit this):
{current_json}

MASTER RESUME (source of truth — ONLY use facts from this):
{master_json}

TARGET JOB:
{job_json}

Return the COMPLETE current resume as one JSON object with exactly the same schema and the same
work_experience entries in the same order.

HARD RULES:
1. Keep every company name, job title, date, and institution exactly as in the current resume
2. Add a keyword only where the master resume shows the candidate actually has it
3. Do NOT add skills, certifications, or technologies absent from the master resume
4. Rephrase summary and bullets to surface the keywords naturally — never keyword-stuff
5. Never drop a section or return a partial resume"#;
