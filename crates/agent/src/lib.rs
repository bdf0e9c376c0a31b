//! Answer runtime: LLM-backed extraction and drafting around the deterministic core.
//!
//! The model is strictly a translator. It reads the question into a structured intent
//! and phrases the final sentence; confidence, missing fields, and every engine outcome
//! are decided by `answer-core`.
//!
//! - `llm` / `openai`: pluggable JSON-completion client and its OpenAI-compatible
//!   implementation (OpenAI or a local Ollama endpoint).
//! - `prompts`: extraction and drafting prompts rendered from templates.
//! - `extraction` / `drafting`: schema-checked model calls with deterministic fallbacks.
//! - `service`: the single-shot `/answer` pipeline.
//! - `conversation`: per-conversation engine turns with stored state.

pub mod conversation;
pub mod drafting;
pub mod extraction;
pub mod llm;
pub mod openai;
pub mod prompts;
pub mod service;

pub use conversation::{TurnOutcome, TurnService};
pub use llm::{LlmClient, LlmRequest, ModelSettings};
pub use openai::OpenAiCompatibleClient;
pub use prompts::PromptLibrary;
pub use service::{AnswerService, AnswerSettings};
