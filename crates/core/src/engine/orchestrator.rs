use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::engine::candidates::{collect_candidates, filter_local, narrow_by_clarification};
use crate::engine::location::{resolve_location, LocationResolution};
use crate::engine::outcome::{
    DecisionRule, DecisionTrace, EngineOutcome, EngineResponse, ANSWER_ACTIONS,
};
use crate::engine::ranking::{rank, resolve_tie};
use crate::engine::types::{Candidate, EngineInput, EngineState, SearchMode};

pub const HIGH_CONFIDENCE_SCORE: f64 = 0.8;
pub const MEDIUM_CONFIDENCE_SCORE: f64 = 0.6;
pub const MAX_CLARIFY_OPTIONS: usize = 3;

pub const LOCATION_PROMPT: &str =
    "I don\u{2019}t have your location. What city or ZIP should I search near?";
pub const STOP_MESSAGE: &str =
    "Not confirmed. Next actions: expand radius, watch/notify, or switch resolution mode.";

/// Runs one conversation turn. Pure: the same input always yields the same response,
/// and the returned state is the only thing the caller needs to keep.
pub fn run_engine(input: &EngineInput) -> EngineResponse {
    let prior = &input.state;
    let mut trace = DecisionTrace::default();

    let (location, located) = match resolve_location(input, prior) {
        LocationResolution::AskLocation { state } => {
            trace.push(DecisionRule::LocationRequested);
            return EngineResponse::new(EngineOutcome::AskLocation, LOCATION_PROMPT, state, trace);
        }
        LocationResolution::Unresolved { state } => {
            trace.push(DecisionRule::LocationMissing);
            return stop(state, trace);
        }
        LocationResolution::Resolved { location, state, rule } => {
            trace.push(rule);
            (location, state)
        }
    };

    let mode = if input.allow_national { SearchMode::National } else { located.mode };
    let next_state = EngineState { last_location: Some(location.clone()), mode, ..located };

    let mut candidates = collect_candidates(&input.candidates);
    if next_state.mode == SearchMode::National {
        trace.push(DecisionRule::NationalMode);
    } else {
        candidates = filter_local(candidates);
        trace.push(DecisionRule::LocalFilter);
    }

    let pending_answer =
        if prior.clarification_asked { input.clarification_answer_text() } else { None };
    if let Some(answer) = pending_answer {
        candidates = narrow_by_clarification(candidates, answer);
        trace.push(DecisionRule::ClarificationNarrowed);
    }

    trace.considered_candidates = candidates.len();
    let ranked = rank(&candidates);
    let Some(tie) = resolve_tie(&ranked) else {
        trace.push(DecisionRule::NoCandidates);
        return stop(next_state, trace);
    };
    trace.top_score = Some(tie.top_score);
    trace.push(tie.rule);

    let top_score = tie.top_score;
    let confirmed = tie
        .primary
        .and_then(|primary| confirmed_availability(primary, &location).map(|text| (primary, text)));

    if pending_answer.is_some() {
        trace.push(DecisionRule::ClarificationResolution);
        return match confirmed {
            Some((primary, availability)) if top_score >= HIGH_CONFIDENCE_SCORE => {
                answer(primary, availability, &location, next_state, trace)
            }
            _ => stop(next_state, trace),
        };
    }

    if top_score >= HIGH_CONFIDENCE_SCORE {
        trace.push(DecisionRule::HighConfidence);
        return match confirmed {
            Some((primary, availability)) => {
                answer(primary, availability, &location, next_state, trace)
            }
            None => {
                if tie.primary.is_some() {
                    trace.push(DecisionRule::ScopeUnconfirmed);
                }
                stop(next_state, trace)
            }
        };
    }

    if top_score >= MEDIUM_CONFIDENCE_SCORE {
        trace.push(DecisionRule::MediumConfidence);
        if prior.clarification_asked {
            trace.push(DecisionRule::ClarificationExhausted);
            return stop(next_state, trace);
        }

        let options: Vec<Candidate> = tie
            .tied
            .iter()
            .take(MAX_CLARIFY_OPTIONS)
            .map(|candidate| (*candidate).clone())
            .collect();
        let message = clarification_question(&options);
        return EngineResponse::new(
            EngineOutcome::Clarify { options },
            message,
            EngineState { clarification_asked: true, ..next_state },
            trace,
        );
    }

    trace.push(DecisionRule::LowConfidence);
    stop(next_state, trace)
}

/// A listing is confirmed only with a known location, stated availability, and an
/// explicit open-now signal.
pub fn has_confirmed_scope(candidate: &Candidate, location: &str) -> bool {
    confirmed_availability(candidate, location).is_some()
}

fn confirmed_availability<'a>(candidate: &'a Candidate, location: &str) -> Option<&'a str> {
    if location.trim().is_empty() || candidate.open_now != Some(true) {
        return None;
    }
    candidate.availability_text()
}

fn answer(
    candidate: &Candidate,
    availability: &str,
    location: &str,
    state: EngineState,
    trace: DecisionTrace,
) -> EngineResponse {
    let message = format!(
        "Confirmed: {} has {availability} in {location}. It is open now.",
        candidate.name
    );
    EngineResponse::new(
        EngineOutcome::Answer { candidate: candidate.clone(), actions: ANSWER_ACTIONS.to_vec() },
        message,
        state,
        trace,
    )
}

fn stop(state: EngineState, trace: DecisionTrace) -> EngineResponse {
    EngineResponse::new(EngineOutcome::stop(), STOP_MESSAGE, state, trace)
}

fn clarification_question(options: &[Candidate]) -> String {
    let names: Vec<&str> = options.iter().map(|candidate| candidate.name.as_str()).collect();
    format!("Which one do you mean: {}?", names.join(" or "))
}

/// Entry point for callers that want the engine's decision mirrored to an audit sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, input: &EngineInput) -> EngineResponse {
        run_engine(input)
    }

    pub fn run_with_audit<S>(
        &self,
        input: &EngineInput,
        sink: &S,
        audit: &AuditContext,
    ) -> EngineResponse
    where
        S: AuditSink + ?Sized,
    {
        let response = self.run(input);
        let top_score = response
            .trace
            .top_score
            .map(|score| format!("{score:.3}"))
            .unwrap_or_else(|| "none".to_owned());

        sink.emit(
            audit
                .event("engine.outcome_selected", AuditCategory::Engine, AuditOutcome::Success)
                .with_metadata("outcome", response.outcome.as_str())
                .with_metadata("top_score", top_score)
                .with_metadata("rules", response.trace.rule_codes().join(","))
                .with_metadata(
                    "considered_candidates",
                    response.trace.considered_candidates.to_string(),
                ),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::{has_confirmed_scope, run_engine, DecisionEngine, LOCATION_PROMPT, STOP_MESSAGE};
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::engine::outcome::{DecisionRule, EngineOutcome};
    use crate::engine::types::{
        Candidate, CandidateBuckets, CandidateSource, EngineInput, EngineLocation, EngineState,
    };

    fn store(id: &str, signal: f64, distance: Option<f64>) -> Candidate {
        Candidate {
            id: id.to_owned(),
            name: format!("Store {id}"),
            source: CandidateSource::Provider,
            authority: signal,
            agreement: signal,
            freshness: signal,
            distance_miles: distance,
            availability: Some("in stock".to_owned()),
            open_now: Some(true),
            location_label: None,
        }
    }

    fn located(provider: Vec<Candidate>) -> EngineInput {
        EngineInput {
            intent: "PART_AVAILABILITY_LOCAL".to_owned(),
            location: Some(EngineLocation::resolved("80112")),
            candidates: CandidateBuckets { provider, ..CandidateBuckets::default() },
            ..EngineInput::default()
        }
    }

    #[test]
    fn first_turn_without_location_asks_for_it() {
        let response = run_engine(&EngineInput::default());
        assert_eq!(response.outcome, EngineOutcome::AskLocation);
        assert_eq!(response.message, LOCATION_PROMPT);
        assert!(response.state.location_asked);
        assert_eq!(response.trace.rules_applied, vec![DecisionRule::LocationRequested]);
    }

    #[test]
    fn no_location_after_asking_stops_with_unchanged_state() {
        let input = EngineInput {
            state: EngineState { location_asked: true, ..EngineState::default() },
            allow_national: true,
            ..EngineInput::default()
        };

        let response = run_engine(&input);
        assert_eq!(response.outcome.as_str(), "stop");
        assert_eq!(response.message, STOP_MESSAGE);
        assert_eq!(response.state, input.state);
    }

    #[test]
    fn confirmed_high_score_answers_with_location_in_message() {
        let response = run_engine(&located(vec![store("a", 1.0, Some(2.0))]));

        assert!(matches!(response.outcome, EngineOutcome::Answer { .. }));
        assert_eq!(response.message, "Confirmed: Store a has in stock in 80112. It is open now.");
        assert_eq!(response.trace.top_score, Some(1.0));
        assert_eq!(
            response.trace.rule_codes(),
            vec![
                "location.resolved",
                "candidates.local_filter",
                "rank.single_primary",
                "outcome.high_confidence"
            ]
        );
    }

    #[test]
    fn unknown_open_status_blocks_an_answer() {
        let mut candidate = store("a", 1.0, Some(2.0));
        candidate.open_now = None;

        let response = run_engine(&located(vec![candidate]));
        assert_eq!(response.outcome.as_str(), "stop");
        assert!(response.trace.rules_applied.contains(&DecisionRule::ScopeUnconfirmed));
    }

    #[test]
    fn scope_requires_location_availability_and_open_now() {
        let mut candidate = store("a", 1.0, None);
        assert!(has_confirmed_scope(&candidate, "80112"));
        assert!(!has_confirmed_scope(&candidate, "  "));

        candidate.availability = Some(String::new());
        assert!(!has_confirmed_scope(&candidate, "80112"));

        candidate.availability = None;
        assert!(!has_confirmed_scope(&candidate, "80112"));

        candidate.availability = Some(" ".to_owned());
        assert!(has_confirmed_scope(&candidate, "80112"));

        candidate.availability = Some("2 in stock".to_owned());
        candidate.open_now = Some(false);
        assert!(!has_confirmed_scope(&candidate, "80112"));
    }

    #[test]
    fn low_score_stops() {
        let response = run_engine(&located(vec![store("a", 0.4, Some(1.0))]));
        assert_eq!(response.outcome.as_str(), "stop");
        assert_eq!(response.trace.rules_applied.last(), Some(&DecisionRule::LowConfidence));
    }

    #[test]
    fn medium_band_clarifies_with_at_most_three_options() {
        let response = run_engine(&located(vec![
            store("a", 0.7, Some(1.0)),
            store("b", 0.7, Some(2.0)),
            store("c", 0.7, Some(3.0)),
            store("d", 0.7, Some(4.0)),
        ]));

        match &response.outcome {
            EngineOutcome::Clarify { options } => {
                let ids: Vec<&str> = options.iter().map(|option| option.id.as_str()).collect();
                assert_eq!(ids, vec!["a", "b", "c"]);
            }
            other => panic!("expected clarify, got {other:?}"),
        }
        assert_eq!(response.message, "Which one do you mean: Store a or Store b or Store c?");
        assert!(response.state.clarification_asked);
    }

    #[test]
    fn run_with_audit_emits_outcome_event() {
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some("conv-1".to_owned()), "req-1", "test");

        let response = DecisionEngine::new().run_with_audit(
            &located(vec![store("a", 1.0, Some(2.0))]),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "engine.outcome_selected");
        assert_eq!(events[0].conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(events[0].metadata.get("outcome").map(String::as_str), Some("answer"));
        assert_eq!(events[0].metadata.get("top_score").map(String::as_str), Some("1.000"));
        assert_eq!(response.outcome.as_str(), "answer");
    }
}
