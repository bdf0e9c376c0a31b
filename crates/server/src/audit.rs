use answer_core::audit::{AuditEvent, AuditSink};
use tracing::info;

/// Forwards audit events to the tracing pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = event
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");

        info!(
            event_name = "audit.event",
            audit_event = %event.event_type,
            audit_id = %event.event_id,
            category = event.category.as_str(),
            outcome = event.outcome.as_str(),
            actor = %event.actor,
            correlation_id = %event.correlation_id,
            conversation_id = event.conversation_id.as_deref().unwrap_or("unknown"),
            metadata = %metadata,
            "audit event"
        );
    }
}
