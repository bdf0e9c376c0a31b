//! Single-shot answer pipeline behind `POST /answer`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use answer_core::answer::{
    compute_missing_required_fields, evaluate_confidence, merge_missing_fields, normalize_context,
    normalize_question, request_fingerprint, AnswerRequest, AnswerResponse, AnswerTrace,
    ProviderTrace,
};
use answer_core::ApplicationError;
use answer_db::{AnswerLogRepository, NewAnswerLog, ResponseCache};

use crate::drafting::draft_answer;
use crate::extraction::extract_intent;
use crate::llm::{LlmClient, ModelSettings};
use crate::prompts::PromptLibrary;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnswerSettings {
    pub model: ModelSettings,
    pub cache_ttl: Duration,
}

pub struct AnswerService {
    llm: Arc<dyn LlmClient>,
    answer_log: Arc<dyn AnswerLogRepository>,
    cache: Arc<dyn ResponseCache>,
    prompts: PromptLibrary,
    settings: AnswerSettings,
}

impl AnswerService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        answer_log: Arc<dyn AnswerLogRepository>,
        cache: Arc<dyn ResponseCache>,
        settings: AnswerSettings,
    ) -> Result<Self, ApplicationError> {
        let prompts = PromptLibrary::new().map_err(|error| {
            ApplicationError::Configuration(format!("prompt templates failed to compile: {error}"))
        })?;
        Ok(Self { llm, answer_log, cache, prompts, settings })
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    pub async fn handle_answer_request(
        &self,
        request: &AnswerRequest,
    ) -> Result<AnswerResponse, ApplicationError> {
        request.validate()?;

        let normalized_question = normalize_question(&request.question);
        let normalized_context = normalize_context(request.context.as_ref());
        let cache_key = request_fingerprint(&normalized_question, normalized_context.as_ref());

        if let Some(cached) = self.cache.get(&cache_key).await {
            let response = cached.replayed(Uuid::new_v4().to_string());
            info!(
                event_name = "answer.cache_hit",
                request_id = %response.trace.request_id,
                confidence = response.confidence.as_str(),
                "answer served from cache"
            );
            return Ok(response);
        }

        let settings = self.settings.model;
        let started = Instant::now();
        let extraction = extract_intent(
            self.llm.as_ref(),
            &self.prompts,
            &normalized_question,
            normalized_context.as_ref(),
            settings,
        )
        .await;
        let extraction_latency = elapsed_ms(started);

        let entities = Some(extraction.entities);
        let computed = compute_missing_required_fields(extraction.intent, entities.as_ref());
        let missing_fields = merge_missing_fields(&extraction.missing_required_fields, &computed);
        let confidence = evaluate_confidence(
            extraction.intent,
            entities.as_ref(),
            &normalized_question,
            &missing_fields,
        );
        debug!(
            event_name = "answer.confidence_evaluated",
            intent = extraction.intent.as_str(),
            confidence = confidence.confidence.as_str(),
            missing_fields = %missing_fields.join(","),
            "confidence evaluated"
        );

        let started = Instant::now();
        let draft = draft_answer(
            self.llm.as_ref(),
            &self.prompts,
            &normalized_question,
            entities.as_ref(),
            confidence.confidence,
            &missing_fields,
            settings,
        )
        .await;
        let draft_latency = elapsed_ms(started);

        let response = AnswerResponse {
            answer: draft.answer,
            confidence: confidence.confidence,
            reason: draft.reason,
            next_action: draft.next_action,
            intent: extraction.intent,
            entities,
            trace: AnswerTrace {
                request_id: Uuid::new_v4().to_string(),
                normalized_question,
                missing_fields,
                rules_applied: confidence.rule_codes(),
                provider: ProviderTrace {
                    llm_model: self.llm.model().to_owned(),
                    latency_ms: extraction_latency.saturating_add(draft_latency),
                },
            },
        };

        self.answer_log
            .create(NewAnswerLog::from_response(
                request.question.clone(),
                normalized_context,
                &response,
            ))
            .await
            .map_err(|error| {
                warn!(
                    event_name = "answer.log_failed",
                    request_id = %response.trace.request_id,
                    error = %error,
                    "answer log write failed"
                );
                ApplicationError::Persistence(error.to_string())
            })?;

        self.cache.set(&cache_key, &response, self.settings.cache_ttl).await;

        info!(
            event_name = "answer.completed",
            request_id = %response.trace.request_id,
            intent = response.intent.as_str(),
            confidence = response.confidence.as_str(),
            latency_ms = response.trace.provider.latency_ms,
            "answer completed"
        );
        Ok(response)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
