// Resume refinement: bounded rewrite passes that inject truthful keywords,
// scrub generic phrasing and revert anything the master resume cannot back.
// All LLM calls go through llm_client via the rewriter.

pub mod alignment;
pub mod orchestrator;
pub mod phrases;
pub mod prompts;
pub mod rewriter;
