//! Single-shot answer pipeline: request model, normalization, intent extraction
//! schema, confidence rules, and the traced response.

pub mod fingerprint;
pub mod intent;
pub mod normalize;
pub mod request;
pub mod rules;
pub mod trace;

pub use fingerprint::request_fingerprint;
pub use intent::{Intent, IntentExtraction, INVALID_EXTRACTION_NOTE};
pub use normalize::{normalize_context, normalize_question, MAX_QUESTION_CHARS};
pub use request::{
    AnswerContext, AnswerMode, AnswerRequest, LocationContext, PartContext, VehicleContext,
};
pub use rules::{
    compute_missing_required_fields, evaluate_confidence, ConfidenceLevel, ConfidenceResult,
    ConfidenceRule,
};
pub use trace::{AnswerDraft, AnswerResponse, AnswerTrace, ProviderTrace};

/// Model-reported fields first, then computed ones, without repeats.
pub fn merge_missing_fields(reported: &[String], computed: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(reported.len() + computed.len());
    for field in reported.iter().chain(computed) {
        if !merged.contains(field) {
            merged.push(field.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::merge_missing_fields;

    #[test]
    fn merge_keeps_first_occurrence_order() {
        let reported = vec!["intent".to_owned(), "part.name".to_owned()];
        let computed = vec!["part.name".to_owned(), "location.postal_code".to_owned()];

        assert_eq!(
            merge_missing_fields(&reported, &computed),
            vec!["intent", "part.name", "location.postal_code"]
        );
    }
}
