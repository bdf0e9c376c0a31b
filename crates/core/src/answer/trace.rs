use serde::{Deserialize, Serialize};

use crate::answer::intent::Intent;
use crate::answer::request::AnswerContext;
use crate::answer::rules::ConfidenceLevel;

/// The three sentences a drafted answer consists of.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub answer: String,
    pub reason: String,
    pub next_action: String,
}

impl AnswerDraft {
    /// Deterministic draft used when the drafting model fails or answers off-schema.
    pub fn fallback(confidence: ConfidenceLevel, missing_fields: &[String]) -> Self {
        if confidence != ConfidenceLevel::Unknown {
            return Self {
                answer: "I can't confirm yet.".to_owned(),
                reason: "Additional information is required.".to_owned(),
                next_action: "Provide more details to continue.".to_owned(),
            };
        }

        if missing_fields.is_empty() {
            return Self {
                answer: "Unknown".to_owned(),
                reason: "Missing required details.".to_owned(),
                next_action: "Provide the missing required details to confirm.".to_owned(),
            };
        }

        let listed = missing_fields.join(", ");
        Self {
            answer: "Unknown".to_owned(),
            reason: format!("Missing: {listed}."),
            next_action: format!("Provide {listed} to confirm."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTrace {
    pub llm_model: String,
    pub latency_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerTrace {
    pub request_id: String,
    pub normalized_question: String,
    pub missing_fields: Vec<String>,
    pub rules_applied: Vec<String>,
    pub provider: ProviderTrace,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub confidence: ConfidenceLevel,
    pub reason: String,
    pub next_action: String,
    pub intent: Intent,
    pub entities: Option<AnswerContext>,
    pub trace: AnswerTrace,
}

impl AnswerResponse {
    /// Copy of a cached response re-stamped for a new request.
    pub fn replayed(&self, request_id: impl Into<String>) -> Self {
        let mut replay = self.clone();
        replay.trace.request_id = request_id.into();
        replay.trace.provider.latency_ms = 0;
        replay
    }
}

#[cfg(test)]
mod tests {
    use super::{AnswerDraft, AnswerResponse, AnswerTrace, ProviderTrace};
    use crate::answer::intent::Intent;
    use crate::answer::rules::ConfidenceLevel;

    #[test]
    fn unknown_fallback_lists_missing_fields() {
        let draft = AnswerDraft::fallback(
            ConfidenceLevel::Unknown,
            &["part.name".to_owned(), "location.postal_code".to_owned()],
        );
        assert_eq!(draft.answer, "Unknown");
        assert_eq!(draft.reason, "Missing: part.name, location.postal_code.");
        assert_eq!(draft.next_action, "Provide part.name, location.postal_code to confirm.");
    }

    #[test]
    fn unknown_fallback_without_fields_is_generic() {
        let draft = AnswerDraft::fallback(ConfidenceLevel::Unknown, &[]);
        assert_eq!(draft.reason, "Missing required details.");
        assert_eq!(draft.next_action, "Provide the missing required details to confirm.");
    }

    #[test]
    fn known_confidence_fallback_cannot_confirm() {
        let draft = AnswerDraft::fallback(ConfidenceLevel::Medium, &[]);
        assert_eq!(draft.answer, "I can't confirm yet.");
        assert_eq!(draft.reason, "Additional information is required.");
    }

    #[test]
    fn replay_resets_request_id_and_latency() {
        let response = AnswerResponse {
            answer: "Yes".to_owned(),
            confidence: ConfidenceLevel::High,
            reason: "In stock.".to_owned(),
            next_action: "Call ahead.".to_owned(),
            intent: Intent::PartAvailabilityLocal,
            entities: None,
            trace: AnswerTrace {
                request_id: "first".to_owned(),
                normalized_question: "q".to_owned(),
                missing_fields: Vec::new(),
                rules_applied: vec!["R01_INTENT_CLASSIFIED".to_owned()],
                provider: ProviderTrace { llm_model: "llama3.1".to_owned(), latency_ms: 812 },
            },
        };

        let replay = response.replayed("second");
        assert_eq!(replay.trace.request_id, "second");
        assert_eq!(replay.trace.provider.latency_ms, 0);
        assert_eq!(replay.answer, response.answer);

        let value = serde_json::to_value(&replay).expect("serialize response");
        assert_eq!(value["confidence"], "high");
        assert_eq!(value["intent"], "PART_AVAILABILITY_LOCAL");
        assert_eq!(value["trace"]["provider"]["llm_model"], "llama3.1");
    }
}
