//! Confidence gating for drafted answers.
//!
//! The model never decides how sure an answer is. Required fields come from the intent,
//! and a small fixed rule set caps the confidence the draft is allowed to express.

use serde::{Deserialize, Serialize};

use crate::answer::intent::Intent;
use crate::answer::request::AnswerContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceRule {
    #[serde(rename = "R01_INTENT_CLASSIFIED")]
    IntentClassified,
    #[serde(rename = "R02_MISSING_REQUIRED_FIELDS")]
    MissingRequiredFields,
    #[serde(rename = "R03_UNKNOWN_INTENT")]
    UnknownIntent,
    #[serde(rename = "R10_CONFIDENCE_GATED")]
    ConfidenceGated,
    #[serde(rename = "R11_MISSING_DETAIL_CAP")]
    MissingDetailCap,
    #[serde(rename = "R12_GUARANTEE_NEEDS_VIN")]
    GuaranteeNeedsVin,
    #[serde(rename = "R12_EXACT_FITMENT_NEEDS_VIN")]
    ExactFitmentNeedsVin,
}

impl ConfidenceRule {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IntentClassified => "R01_INTENT_CLASSIFIED",
            Self::MissingRequiredFields => "R02_MISSING_REQUIRED_FIELDS",
            Self::UnknownIntent => "R03_UNKNOWN_INTENT",
            Self::ConfidenceGated => "R10_CONFIDENCE_GATED",
            Self::MissingDetailCap => "R11_MISSING_DETAIL_CAP",
            Self::GuaranteeNeedsVin => "R12_GUARANTEE_NEEDS_VIN",
            Self::ExactFitmentNeedsVin => "R12_EXACT_FITMENT_NEEDS_VIN",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfidenceResult {
    pub confidence: ConfidenceLevel,
    pub missing_required_fields: Vec<String>,
    pub rules_applied: Vec<ConfidenceRule>,
}

impl ConfidenceResult {
    pub fn rule_codes(&self) -> Vec<String> {
        self.rules_applied.iter().map(|rule| rule.code().to_owned()).collect()
    }
}

const PART_NAME: &str = "part.name";
const PART_NUMBER: &str = "part.oem_part_number";
const POSTAL_CODE: &str = "location.postal_code";
const VEHICLE_YEAR: &str = "vehicle.year";
const VEHICLE_MAKE: &str = "vehicle.make";
const VEHICLE_MODEL: &str = "vehicle.model";

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

/// Fields the intent needs that the entities do not supply. Either part identifier is
/// enough to satisfy both part fields.
pub fn compute_missing_required_fields(
    intent: Intent,
    entities: Option<&AnswerContext>,
) -> Vec<String> {
    let part = entities.and_then(|context| context.part.as_ref());
    let vehicle = entities.and_then(|context| context.vehicle.as_ref());
    let location = entities.and_then(|context| context.location.as_ref());

    let has_part_name = part.is_some_and(|part| has_text(&part.name));
    let has_part_number = part.is_some_and(|part| has_text(&part.oem_part_number));
    let has_year = vehicle.is_some_and(|vehicle| vehicle.year.is_some());
    let has_make = vehicle.is_some_and(|vehicle| has_text(&vehicle.make));
    let has_model = vehicle.is_some_and(|vehicle| has_text(&vehicle.model));
    let has_postal = location.is_some_and(|location| has_text(&location.postal_code));

    let (needs_location, needs_vehicle) = match intent {
        Intent::PartAvailabilityLocal => (true, false),
        Intent::PartEligibility => (false, true),
        Intent::PartAvailabilityAndEligibility => (true, true),
        Intent::ClarifyRequest | Intent::UnknownIntent => return Vec::new(),
    };

    let mut missing = Vec::new();
    if !(has_part_name || has_part_number) {
        missing.push(PART_NAME);
        missing.push(PART_NUMBER);
    }
    if needs_location && !has_postal {
        missing.push(POSTAL_CODE);
    }
    if needs_vehicle {
        if !has_year {
            missing.push(VEHICLE_YEAR);
        }
        if !has_make {
            missing.push(VEHICLE_MAKE);
        }
        if !has_model {
            missing.push(VEHICLE_MODEL);
        }
    }

    missing.into_iter().map(str::to_owned).collect()
}

pub fn evaluate_confidence(
    intent: Intent,
    entities: Option<&AnswerContext>,
    question: &str,
    missing_required_fields: &[String],
) -> ConfidenceResult {
    let mut rules = vec![ConfidenceRule::IntentClassified];
    let gated = |confidence, mut rules: Vec<ConfidenceRule>| {
        rules.push(ConfidenceRule::ConfidenceGated);
        ConfidenceResult {
            confidence,
            missing_required_fields: missing_required_fields.to_vec(),
            rules_applied: rules,
        }
    };

    if intent == Intent::UnknownIntent {
        rules.push(ConfidenceRule::UnknownIntent);
        return gated(ConfidenceLevel::Unknown, rules);
    }

    if !missing_required_fields.is_empty() {
        rules.push(ConfidenceRule::MissingRequiredFields);
        return gated(ConfidenceLevel::Unknown, rules);
    }

    let vehicle = entities.and_then(|context| context.vehicle.as_ref());
    let has_vin = vehicle.is_some_and(|vehicle| has_text(&vehicle.vin));
    let mut confidence = ConfidenceLevel::High;

    let missing_detail = intent == Intent::PartAvailabilityAndEligibility
        && !vehicle.is_some_and(|vehicle| {
            has_text(&vehicle.trim) && has_text(&vehicle.engine) && has_text(&vehicle.vin)
        });
    if missing_detail {
        confidence = ConfidenceLevel::Medium;
        rules.push(ConfidenceRule::MissingDetailCap);
    }

    if !has_vin {
        let lowered = question.to_lowercase();
        if lowered.contains("guarantee") {
            confidence = ConfidenceLevel::Unknown;
            rules.push(ConfidenceRule::GuaranteeNeedsVin);
        } else if lowered.contains("exact fitment") {
            confidence = ConfidenceLevel::Medium;
            rules.push(ConfidenceRule::ExactFitmentNeedsVin);
        }
    }

    gated(confidence, rules)
}
