use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use answer_core::{AuditEvent, EngineState};

use super::{
    AnswerLogEntry, AnswerLogRepository, AuditEventRepository, EngineSession, NewAnswerLog,
    RepositoryError, SessionRepository,
};

#[derive(Default)]
pub struct InMemoryAnswerLogRepository {
    entries: RwLock<Vec<AnswerLogEntry>>,
}

#[async_trait::async_trait]
impl AnswerLogRepository for InMemoryAnswerLogRepository {
    async fn create(&self, entry: NewAnswerLog) -> Result<AnswerLogEntry, RepositoryError> {
        let stored = AnswerLogEntry {
            id: format!("ans-{}", Uuid::new_v4()),
            request_id: entry.trace.request_id,
            question: entry.question,
            normalized_question: entry.normalized_question,
            intent: entry.intent.as_str().to_owned(),
            answer: entry.answer,
            confidence: entry.confidence.as_str().to_owned(),
            reason: entry.reason,
            next_action: entry.next_action,
            latency_ms: i64::try_from(entry.latency_ms).unwrap_or(i64::MAX),
            provider_model: entry.provider_model,
            created_at: Utc::now(),
        };
        self.entries.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AnswerLogEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, EngineSession>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, conversation_id: &str) -> Result<Option<EngineSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(conversation_id).cloned())
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &EngineState,
        last_outcome: &str,
    ) -> Result<EngineSession, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let turn_count = sessions.get(conversation_id).map_or(0, |session| session.turn_count) + 1;
        let session = EngineSession {
            conversation_id: conversation_id.to_owned(),
            state: state.clone(),
            turn_count,
            last_outcome: Some(last_outcome.to_owned()),
            updated_at: Utc::now(),
        };
        sessions.insert(conversation_id.to_owned(), session.clone());
        Ok(session)
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(conversation_id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAuditEventRepository {
    events: RwLock<Vec<AuditEvent>>,
}

#[async_trait::async_trait]
impl AuditEventRepository for InMemoryAuditEventRepository {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|event| event.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect())
    }
}
