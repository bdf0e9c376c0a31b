use tracing::warn;

use answer_core::answer::{AnswerContext, AnswerDraft, ConfidenceLevel};

use crate::llm::{LlmClient, LlmRequest, ModelSettings};
use crate::prompts::{PromptLibrary, DRAFT_SYSTEM_PROMPT};

/// Phrases the answer for an already decided confidence level, or falls back to the
/// deterministic draft.
pub async fn draft_answer(
    llm: &dyn LlmClient,
    prompts: &PromptLibrary,
    question: &str,
    entities: Option<&AnswerContext>,
    confidence: ConfidenceLevel,
    missing_fields: &[String],
    settings: ModelSettings,
) -> AnswerDraft {
    let user_prompt = match prompts.draft_prompt(question, entities, confidence, missing_fields) {
        Ok(prompt) => prompt,
        Err(error) => {
            warn!(event_name = "answer.draft.prompt_failed", error = %error, "draft prompt failed to render");
            return AnswerDraft::fallback(confidence, missing_fields);
        }
    };

    let request = LlmRequest::new(DRAFT_SYSTEM_PROMPT, user_prompt, settings);
    let value = match llm.complete_json(&request).await {
        Ok(value) => value,
        Err(error) => {
            warn!(
                event_name = "answer.draft.provider_failed",
                model = llm.model(),
                error = %error,
                "draft call failed"
            );
            return AnswerDraft::fallback(confidence, missing_fields);
        }
    };

    serde_json::from_value(value).unwrap_or_else(|error| {
        warn!(event_name = "answer.draft.schema_mismatch", error = %error, "draft reply did not match schema");
        AnswerDraft::fallback(confidence, missing_fields)
    })
}
