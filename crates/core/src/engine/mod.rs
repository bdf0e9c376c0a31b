//! Deterministic turn-by-turn decision engine.
//!
//! Each turn resolves a location, collects and filters candidate listings, ranks them,
//! and picks exactly one outcome. The engine never performs I/O and never fails; bad
//! data degrades to a `stop` outcome.

pub mod candidates;
pub mod location;
pub mod orchestrator;
pub mod outcome;
pub mod ranking;
pub mod scoring;
pub mod types;

pub use candidates::{
    collect_candidates, filter_local, narrow_by_clarification, MAX_LOCAL_RADIUS_MILES,
};
pub use location::{resolve_location, LocationResolution};
pub use orchestrator::{
    has_confirmed_scope, run_engine, DecisionEngine, HIGH_CONFIDENCE_SCORE, LOCATION_PROMPT,
    MAX_CLARIFY_OPTIONS, MEDIUM_CONFIDENCE_SCORE, STOP_MESSAGE,
};
pub use outcome::{
    DecisionRule, DecisionTrace, EngineAction, EngineOutcome, EngineResponse, ANSWER_ACTIONS,
    FALLBACK_ACTIONS,
};
pub use ranking::{
    rank, resolve_tie, ScoredCandidate, TieResolution, DISTANCE_TIE_BREAK_MILES, TIE_SCORE_DELTA,
};
pub use scoring::{clamp_signal, score, score_with, ScoringWeights, DEFAULT_WEIGHTS};
pub use types::{
    Candidate, CandidateBuckets, CandidateSource, EngineInput, EngineLocation, EngineState,
    LocationStatus, SearchMode,
};
