//! Conversation turns: stored engine state per conversation id, one turn at a time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use answer_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
use answer_core::{ApplicationError, DecisionEngine, DomainError, EngineInput, EngineResponse};
use answer_db::{AuditEventRepository, SessionRepository};

const ACTOR: &str = "turn-service";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub conversation_id: String,
    pub correlation_id: String,
    pub turn: i64,
    #[serde(flatten)]
    pub response: EngineResponse,
}

pub struct TurnService {
    engine: DecisionEngine,
    sessions: Arc<dyn SessionRepository>,
    audit_log: Arc<dyn AuditEventRepository>,
    sink: Arc<dyn AuditSink>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TurnService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        audit_log: Arc<dyn AuditEventRepository>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            engine: DecisionEngine::new(),
            sessions,
            audit_log,
            sink,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one engine turn. A stored session overrides any state the caller sent; the
    /// caller's state only seeds a conversation that has no session yet.
    pub async fn handle_turn(
        &self,
        conversation_id: &str,
        mut input: EngineInput,
    ) -> Result<TurnOutcome, ApplicationError> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(DomainError::InvalidEngineInput(
                "conversation_id: must not be empty".to_owned(),
            )
            .into());
        }

        let lock = self.conversation_lock(conversation_id).await;
        let result = {
            let _turn = lock.lock().await;
            self.run_locked(conversation_id, &mut input).await
        };
        drop(lock);
        self.release_lock(conversation_id).await;
        result
    }

    async fn run_locked(
        &self,
        conversation_id: &str,
        input: &mut EngineInput,
    ) -> Result<TurnOutcome, ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();
        let audit = AuditContext::new(Some(conversation_id.to_owned()), &correlation_id, ACTOR);
        let captured = InMemoryAuditSink::default();

        let stored = self.sessions.load(conversation_id).await.map_err(persistence)?;
        let resumed = stored.is_some();
        if let Some(session) = stored {
            input.state = session.state;
        }

        captured.emit(
            audit
                .event("engine.turn_received", AuditCategory::Ingress, AuditOutcome::Success)
                .with_metadata("resumed", resumed.to_string())
                .with_metadata("candidates", input.candidates.len().to_string()),
        );

        let response = self.engine.run_with_audit(input, &captured, &audit);

        let session = self
            .sessions
            .save(conversation_id, &response.state, response.outcome.as_str())
            .await
            .map_err(persistence)?;
        captured.emit(
            audit
                .event("engine.session_saved", AuditCategory::Persistence, AuditOutcome::Success)
                .with_metadata("turn", session.turn_count.to_string()),
        );

        self.forward(captured.events()).await;

        info!(
            event_name = "engine.turn_completed",
            conversation_id,
            correlation_id = %correlation_id,
            turn = session.turn_count,
            outcome = response.outcome.as_str(),
            rules = %response.trace.rule_codes().join(","),
            considered_candidates = response.trace.considered_candidates,
            "engine turn completed"
        );

        Ok(TurnOutcome {
            conversation_id: conversation_id.to_owned(),
            correlation_id,
            turn: session.turn_count,
            response,
        })
    }

    async fn forward(&self, events: Vec<AuditEvent>) {
        for event in events {
            if let Err(error) = self.audit_log.append(&event).await {
                warn!(
                    event_name = "engine.audit_persist_failed",
                    correlation_id = %event.correlation_id,
                    audit_event = %event.event_type,
                    error = %error,
                    "audit event was not persisted"
                );
            }
            self.sink.emit(event);
        }
    }

    async fn conversation_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(conversation_id.to_owned()).or_default().clone()
    }

    /// Drops the per-conversation lock once no turn holds or awaits it.
    async fn release_lock(&self, conversation_id: &str) {
        let mut locks = self.locks.lock().await;
        if locks.get(conversation_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(conversation_id);
        }
    }

    #[cfg(test)]
    async fn tracked_conversations(&self) -> usize {
        self.locks.lock().await.len()
    }
}

fn persistence(error: answer_db::RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use answer_core::audit::{InMemoryAuditSink, NoopAuditSink};
    use answer_core::engine::{EngineOutcome, EngineState};
    use answer_core::{ApplicationError, EngineInput};
    use answer_db::repositories::{
        InMemoryAuditEventRepository, InMemorySessionRepository, SessionRepository,
    };
    use answer_db::AuditEventRepository;

    use super::TurnService;

    fn service() -> (
        TurnService,
        Arc<InMemorySessionRepository>,
        Arc<InMemoryAuditEventRepository>,
        InMemoryAuditSink,
    ) {
        let sessions = Arc::new(InMemorySessionRepository::default());
        let audit_log = Arc::new(InMemoryAuditEventRepository::default());
        let sink = InMemoryAuditSink::default();
        let service = TurnService::new(sessions.clone(), audit_log.clone(), Arc::new(sink.clone()));
        (service, sessions, audit_log, sink)
    }

    #[tokio::test]
    async fn stored_state_carries_the_location_question_across_turns() {
        let (service, sessions, _, _) = service();

        let first = service.handle_turn("conv-1", EngineInput::default()).await.expect("turn 1");
        assert_eq!(first.response.outcome, EngineOutcome::AskLocation);
        assert_eq!(first.turn, 1);

        let second = service.handle_turn("conv-1", EngineInput::default()).await.expect("turn 2");
        assert_eq!(second.response.outcome.as_str(), "stop");
        assert_eq!(second.turn, 2);

        let stored = sessions.load("conv-1").await.expect("load").expect("session");
        assert!(stored.state.location_asked);
        assert_eq!(stored.last_outcome.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn stored_state_overrides_client_state_but_seeds_new_conversations() {
        let (service, _, _, _) = service();
        let asked = EngineState { location_asked: true, ..EngineState::default() };

        let seeded = service
            .handle_turn(
                "conv-seed",
                EngineInput { state: asked.clone(), ..EngineInput::default() },
            )
            .await
            .expect("seeded turn");
        assert_eq!(seeded.response.outcome.as_str(), "stop");

        service.handle_turn("conv-fresh", EngineInput::default()).await.expect("first turn");
        let overridden = service
            .handle_turn(
                "conv-fresh",
                EngineInput { state: EngineState::default(), ..EngineInput::default() },
            )
            .await
            .expect("second turn");
        assert_eq!(overridden.response.outcome.as_str(), "stop");
    }

    #[tokio::test]
    async fn audit_events_reach_both_sink_and_repository() {
        let (service, _, audit_log, sink) = service();

        let outcome =
            service.handle_turn("conv-audit", EngineInput::default()).await.expect("turn");

        let stored = audit_log.list_for_conversation("conv-audit").await.expect("list");
        let types: Vec<&str> = stored.iter().map(|event| event.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["engine.turn_received", "engine.outcome_selected", "engine.session_saved"]
        );
        assert!(stored.iter().all(|event| event.correlation_id == outcome.correlation_id));
        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            stored[1].metadata.get("outcome").map(String::as_str),
            Some("ask_location")
        );
    }

    #[tokio::test]
    async fn blank_conversation_id_is_rejected() {
        let sessions = Arc::new(InMemorySessionRepository::default());
        let service = TurnService::new(
            sessions,
            Arc::new(InMemoryAuditEventRepository::default()),
            Arc::new(NoopAuditSink),
        );

        let error = service.handle_turn("   ", EngineInput::default()).await.expect_err("rejected");
        assert!(matches!(error, ApplicationError::Domain(_)));
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_conversation_are_serialized() {
        let (service, sessions, _, _) = service();
        let service = Arc::new(service);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.handle_turn("conv-busy", EngineInput::default()).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("turn");
        }

        let stored = sessions.load("conv-busy").await.expect("load").expect("session");
        assert_eq!(stored.turn_count, 8);
        assert_eq!(service.tracked_conversations().await, 0);
    }

    #[tokio::test]
    async fn serialized_turn_wire_format_flattens_the_response() {
        let (service, _, _, _) = service();
        let outcome = service.handle_turn("conv-wire", EngineInput::default()).await.expect("turn");

        let wire = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(wire["conversationId"], "conv-wire");
        assert_eq!(wire["turn"], 1);
        assert_eq!(wire["type"], "ask_location");
        assert_eq!(wire["state"]["locationAsked"], true);
    }
}
