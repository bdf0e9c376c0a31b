use tracing::warn;

use answer_core::answer::{AnswerContext, IntentExtraction};

use crate::llm::{LlmClient, LlmRequest, ModelSettings};
use crate::prompts::{PromptLibrary, EXTRACTION_SYSTEM_PROMPT};

/// Reads intent and entities out of a normalized question. Never fails: a provider
/// error or an off-schema reply yields [`IntentExtraction::invalid`].
pub async fn extract_intent(
    llm: &dyn LlmClient,
    prompts: &PromptLibrary,
    question: &str,
    context: Option<&AnswerContext>,
    settings: ModelSettings,
) -> IntentExtraction {
    let user_prompt = match prompts.extraction_prompt(question, context) {
        Ok(prompt) => prompt,
        Err(error) => {
            warn!(event_name = "answer.extraction.prompt_failed", error = %error, "extraction prompt failed to render");
            return IntentExtraction::invalid();
        }
    };

    let request = LlmRequest::new(EXTRACTION_SYSTEM_PROMPT, user_prompt, settings);
    match llm.complete_json(&request).await {
        Ok(value) => IntentExtraction::from_model_output(value),
        Err(error) => {
            warn!(
                event_name = "answer.extraction.provider_failed",
                model = llm.model(),
                error = %error,
                "intent extraction call failed"
            );
            IntentExtraction::invalid()
        }
    }
}
