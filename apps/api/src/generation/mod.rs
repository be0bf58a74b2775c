// Content generation: prompt assembly, generation, engagement scoring and the
// flows that chain them for one user action.
// All LLM calls go through llm_client — no direct HTTP calls here.

pub mod assembler;
pub mod generator;
pub mod handlers;
pub mod pipeline;
pub mod presets;
pub mod prompts;
pub mod scoring;
