use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use answer_core::answer::{AnswerContext, AnswerResponse, AnswerTrace, ConfidenceLevel, Intent};
use answer_core::{AuditEvent, EngineState};

pub mod answer_log;
pub mod audit;
pub mod memory;
pub mod session;

pub use answer_log::SqlAnswerLogRepository;
pub use audit::SqlAuditEventRepository;
pub use memory::{
    InMemoryAnswerLogRepository, InMemoryAuditEventRepository, InMemorySessionRepository,
};
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

/// One answered request, as handed to the answer log.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAnswerLog {
    pub question: String,
    pub normalized_question: String,
    pub context: Option<AnswerContext>,
    pub intent: Intent,
    pub entities: Option<AnswerContext>,
    pub answer: String,
    pub confidence: ConfidenceLevel,
    pub reason: String,
    pub next_action: String,
    pub trace: AnswerTrace,
    pub latency_ms: u64,
    pub provider_model: String,
}

impl NewAnswerLog {
    pub fn from_response(
        question: impl Into<String>,
        context: Option<AnswerContext>,
        response: &AnswerResponse,
    ) -> Self {
        Self {
            question: question.into(),
            normalized_question: response.trace.normalized_question.clone(),
            context,
            intent: response.intent,
            entities: response.entities.clone(),
            answer: response.answer.clone(),
            confidence: response.confidence,
            reason: response.reason.clone(),
            next_action: response.next_action.clone(),
            trace: response.trace.clone(),
            latency_ms: response.trace.provider.latency_ms,
            provider_model: response.trace.provider.llm_model.clone(),
        }
    }
}

/// Stored answer log row. Enum columns stay as their wire strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerLogEntry {
    pub id: String,
    pub request_id: String,
    pub question: String,
    pub normalized_question: String,
    pub intent: String,
    pub answer: String,
    pub confidence: String,
    pub reason: String,
    pub next_action: String,
    pub latency_ms: i64,
    pub provider_model: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSession {
    pub conversation_id: String,
    pub state: EngineState,
    pub turn_count: i64,
    pub last_outcome: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait AnswerLogRepository: Send + Sync {
    async fn create(&self, entry: NewAnswerLog) -> Result<AnswerLogEntry, RepositoryError>;

    /// Newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<AnswerLogEntry>, RepositoryError>;
}

/// Engine state keyed by conversation, so callers only send the conversation id.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Result<Option<EngineSession>, RepositoryError>;

    /// Upserts the state and bumps the turn count.
    async fn save(
        &self,
        conversation_id: &str,
        state: &EngineState,
        last_outcome: &str,
    ) -> Result<EngineSession, RepositoryError>;

    async fn delete(&self, conversation_id: &str) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AuditEventRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError>;

    /// Oldest first.
    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}

pub(crate) fn encode_json<T: Serialize + ?Sized>(
    column: &str,
    value: &T,
) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Encode(format!("cannot encode `{column}`: {e}")))
}
