//! Conversational search agent for carlot.
//!
//! This crate drives the filter-accumulation dialogue:
//! 1. **Entry analysis** (`analyzer`) - one utterance plus the current
//!    filters goes to the LLM, which replies with filter deltas and a
//!    continue/search decision.
//! 2. **Dialogue loop** (`dialogue`) - merges deltas, decides when to hit
//!    the inventory store, renders results, resets for the next cycle.
//!
//! # Safety principle
//!
//! The LLM is strictly a translator from free text to a filter mapping. It
//! never touches the store, and nothing it returns can fail the loop: every
//! malformed or missing reply degrades to a fallback question.

pub mod analyzer;
pub mod dialogue;
pub mod llm;

pub use analyzer::{AnalyzerOutcome, EntryAnalyzer};
pub use dialogue::{Console, DialogueLoop, Inventory, EXIT_PHRASES};
pub use llm::{LlmClient, OllamaClient};
