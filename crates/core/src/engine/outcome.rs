use serde::{Deserialize, Serialize};

use crate::engine::types::{Candidate, EngineState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineAction {
    Call,
    Directions,
    ExpandRadius,
    WatchNotify,
    SwitchResolutionMode,
}

pub const ANSWER_ACTIONS: [EngineAction; 2] = [EngineAction::Call, EngineAction::Directions];

pub const FALLBACK_ACTIONS: [EngineAction; 3] =
    [EngineAction::ExpandRadius, EngineAction::WatchNotify, EngineAction::SwitchResolutionMode];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineOutcome {
    Answer { candidate: Candidate, actions: Vec<EngineAction> },
    Clarify { options: Vec<Candidate> },
    AskLocation,
    Stop { actions: Vec<EngineAction> },
    /// Reserved for routing a conversation to a human; no decision path emits it yet.
    Handoff,
}

impl EngineOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::Clarify { .. } => "clarify",
            Self::AskLocation => "ask_location",
            Self::Stop { .. } => "stop",
            Self::Handoff => "handoff",
        }
    }

    pub(crate) fn stop() -> Self {
        Self::Stop { actions: FALLBACK_ACTIONS.to_vec() }
    }
}

/// Why the engine landed where it did. Several rules are recorded per turn, in the
/// order they fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionRule {
    #[serde(rename = "location.resolved")]
    LocationResolved,
    #[serde(rename = "location.from_input")]
    LocationFromInput,
    #[serde(rename = "location.requested")]
    LocationRequested,
    #[serde(rename = "location.sticky")]
    LocationSticky,
    #[serde(rename = "location.missing")]
    LocationMissing,
    #[serde(rename = "candidates.national_mode")]
    NationalMode,
    #[serde(rename = "candidates.local_filter")]
    LocalFilter,
    #[serde(rename = "candidates.clarification_narrowed")]
    ClarificationNarrowed,
    #[serde(rename = "candidates.empty")]
    NoCandidates,
    #[serde(rename = "rank.single_primary")]
    SinglePrimary,
    #[serde(rename = "rank.tie_broken_by_distance")]
    TieBrokenByDistance,
    #[serde(rename = "rank.tie_unresolved")]
    TieUnresolved,
    #[serde(rename = "outcome.clarification_resolution")]
    ClarificationResolution,
    #[serde(rename = "outcome.high_confidence")]
    HighConfidence,
    #[serde(rename = "outcome.medium_confidence")]
    MediumConfidence,
    #[serde(rename = "outcome.low_confidence")]
    LowConfidence,
    #[serde(rename = "outcome.scope_unconfirmed")]
    ScopeUnconfirmed,
    #[serde(rename = "outcome.clarification_exhausted")]
    ClarificationExhausted,
}

impl DecisionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocationResolved => "location.resolved",
            Self::LocationFromInput => "location.from_input",
            Self::LocationRequested => "location.requested",
            Self::LocationSticky => "location.sticky",
            Self::LocationMissing => "location.missing",
            Self::NationalMode => "candidates.national_mode",
            Self::LocalFilter => "candidates.local_filter",
            Self::ClarificationNarrowed => "candidates.clarification_narrowed",
            Self::NoCandidates => "candidates.empty",
            Self::SinglePrimary => "rank.single_primary",
            Self::TieBrokenByDistance => "rank.tie_broken_by_distance",
            Self::TieUnresolved => "rank.tie_unresolved",
            Self::ClarificationResolution => "outcome.clarification_resolution",
            Self::HighConfidence => "outcome.high_confidence",
            Self::MediumConfidence => "outcome.medium_confidence",
            Self::LowConfidence => "outcome.low_confidence",
            Self::ScopeUnconfirmed => "outcome.scope_unconfirmed",
            Self::ClarificationExhausted => "outcome.clarification_exhausted",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionTrace {
    pub rules_applied: Vec<DecisionRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_score: Option<f64>,
    pub considered_candidates: usize,
}

impl DecisionTrace {
    pub(crate) fn push(&mut self, rule: DecisionRule) {
        self.rules_applied.push(rule);
    }

    pub fn rule_codes(&self) -> Vec<&'static str> {
        self.rules_applied.iter().map(DecisionRule::as_str).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    #[serde(flatten)]
    pub outcome: EngineOutcome,
    pub message: String,
    pub state: EngineState,
    #[serde(default)]
    pub trace: DecisionTrace,
}

impl EngineResponse {
    pub(crate) fn new(
        outcome: EngineOutcome,
        message: impl Into<String>,
        state: EngineState,
        trace: DecisionTrace,
    ) -> Self {
        Self { outcome, message: message.into(), state, trace }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DecisionTrace, EngineOutcome, EngineResponse, FALLBACK_ACTIONS};
    use crate::engine::types::EngineState;

    #[test]
    fn outcome_serializes_as_tagged_variant_beside_message_and_state() {
        let response = EngineResponse::new(
            EngineOutcome::stop(),
            "Not confirmed.",
            EngineState::default(),
            DecisionTrace::default(),
        );

        let value = serde_json::to_value(&response).expect("serialize response");
        assert_eq!(value["type"], "stop");
        assert_eq!(
            value["actions"],
            json!(["expand_radius", "watch_notify", "switch_resolution_mode"])
        );
        assert_eq!(value["message"], "Not confirmed.");
        assert_eq!(value["state"]["mode"], "local");

        let back: EngineResponse = serde_json::from_value(value).expect("deserialize response");
        assert_eq!(back.outcome, EngineOutcome::Stop { actions: FALLBACK_ACTIONS.to_vec() });
    }

    #[test]
    fn ask_location_carries_no_payload() {
        let value = serde_json::to_value(EngineOutcome::AskLocation).expect("serialize outcome");
        assert_eq!(value, json!({ "type": "ask_location" }));
        assert_eq!(EngineOutcome::Handoff.as_str(), "handoff");
    }
}
