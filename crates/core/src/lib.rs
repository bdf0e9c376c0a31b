pub mod answer;
pub mod audit;
pub mod config;
pub mod engine;
pub mod errors;

pub use answer::{
    AnswerContext, AnswerDraft, AnswerRequest, AnswerResponse, AnswerTrace, ConfidenceLevel,
    Intent, IntentExtraction,
};
pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use engine::{
    run_engine, Candidate, DecisionEngine, EngineInput, EngineOutcome, EngineResponse,
    EngineState,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
