use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answer::request::AnswerContext;

pub const INVALID_EXTRACTION_NOTE: &str = "Invalid intent extraction response.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    PartAvailabilityLocal,
    PartEligibility,
    PartAvailabilityAndEligibility,
    ClarifyRequest,
    UnknownIntent,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::PartAvailabilityLocal,
        Intent::PartEligibility,
        Intent::PartAvailabilityAndEligibility,
        Intent::ClarifyRequest,
        Intent::UnknownIntent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartAvailabilityLocal => "PART_AVAILABILITY_LOCAL",
            Self::PartEligibility => "PART_ELIGIBILITY",
            Self::PartAvailabilityAndEligibility => "PART_AVAILABILITY_AND_ELIGIBILITY",
            Self::ClarifyRequest => "CLARIFY_REQUEST",
            Self::UnknownIntent => "UNKNOWN_INTENT",
        }
    }
}

/// Structured reading of a question as returned by the extraction model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentExtraction {
    pub intent: Intent,
    pub entities: AnswerContext,
    #[serde(default)]
    pub missing_required_fields: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IntentExtraction {
    /// Stand-in used whenever the model's output does not fit the expected shape.
    pub fn invalid() -> Self {
        Self {
            intent: Intent::UnknownIntent,
            entities: AnswerContext::default(),
            missing_required_fields: vec!["intent".to_owned()],
            notes: Some(INVALID_EXTRACTION_NOTE.to_owned()),
        }
    }

    /// Accepts only a payload that matches the schema; anything else, including an
    /// intent outside [`Intent::ALL`], degrades to [`IntentExtraction::invalid`].
    pub fn from_model_output(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|_| Self::invalid())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Intent, IntentExtraction, INVALID_EXTRACTION_NOTE};

    #[test]
    fn well_formed_output_is_kept() {
        let extraction = IntentExtraction::from_model_output(json!({
            "intent": "PART_ELIGIBILITY",
            "entities": {
                "vehicle": { "year": 2017, "make": "Ford", "model": "F-150" },
                "part": { "name": "starter", "oem_part_number": null },
                "location": null
            },
            "missing_required_fields": [],
            "notes": null
        }));

        assert_eq!(extraction.intent, Intent::PartEligibility);
        assert_eq!(
            extraction.entities.part.and_then(|part| part.name).as_deref(),
            Some("starter")
        );
        assert!(extraction.missing_required_fields.is_empty());
    }

    #[test]
    fn missing_field_list_defaults_to_empty() {
        let extraction = IntentExtraction::from_model_output(json!({
            "intent": "CLARIFY_REQUEST",
            "entities": {}
        }));
        assert_eq!(extraction.intent, Intent::ClarifyRequest);
        assert!(extraction.missing_required_fields.is_empty());
    }

    #[test]
    fn unknown_intent_label_falls_back() {
        let extraction = IntentExtraction::from_model_output(json!({
            "intent": "ORDER_PIZZA",
            "entities": {}
        }));

        assert_eq!(extraction, IntentExtraction::invalid());
        assert_eq!(extraction.missing_required_fields, vec!["intent".to_owned()]);
        assert_eq!(extraction.notes.as_deref(), Some(INVALID_EXTRACTION_NOTE));
    }

    #[test]
    fn non_object_output_falls_back() {
        assert_eq!(
            IntentExtraction::from_model_output(json!("hello")).intent,
            Intent::UnknownIntent
        );
        assert_eq!(
            IntentExtraction::from_model_output(json!({ "intent": "PART_ELIGIBILITY" })).intent,
            Intent::UnknownIntent
        );
    }

    #[test]
    fn labels_round_trip_through_serde() {
        for intent in Intent::ALL {
            let value = serde_json::to_value(intent).expect("serialize intent");
            assert_eq!(value, json!(intent.as_str()));
        }
    }
}
