use std::collections::BTreeMap;

use answer_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use super::{encode_json, parse_timestamp, AuditEventRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditEventRepository {
    pool: DbPool,
}

impl SqlAuditEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditEventRepository for SqlAuditEventRepository {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO audit_event (
                id, conversation_id, correlation_id, event_type, category, actor, outcome,
                metadata_json, occurred_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.conversation_id)
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(encode_json("metadata_json", &event.metadata)?)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, correlation_id, event_type, category, actor, outcome,
                   metadata_json, occurred_at
            FROM audit_event
            WHERE conversation_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_event_from_row).collect()
    }
}

fn audit_event_from_row(row: &SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let category: String = row.try_get("category")?;
    let outcome: String = row.try_get("outcome")?;
    let metadata_json: String = row.try_get("metadata_json")?;
    let occurred_at: String = row.try_get("occurred_at")?;

    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid metadata_json: {e}")))?;

    Ok(AuditEvent {
        event_id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        correlation_id: row.try_get("correlation_id")?,
        event_type: row.try_get("event_type")?,
        category: AuditCategory::parse(&category)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid category: {category}")))?,
        actor: row.try_get("actor")?,
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid outcome: {outcome}")))?,
        metadata,
        occurred_at: parse_timestamp("occurred_at", occurred_at)?,
    })
}

#[cfg(test)]
mod tests {
    use answer_core::audit::{AuditCategory, AuditContext, AuditOutcome};

    use super::SqlAuditEventRepository;
    use crate::repositories::AuditEventRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn events_are_listed_per_conversation_in_append_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlAuditEventRepository::new(pool);

        let context = AuditContext::new(Some("conv-1".to_owned()), "req-1", "turn-service");
        let first = context
            .event("engine.turn_received", AuditCategory::Ingress, AuditOutcome::Success)
            .with_metadata("candidates", "2");
        let second = context
            .event("engine.outcome_selected", AuditCategory::Engine, AuditOutcome::Success)
            .with_metadata("outcome", "clarify");
        let other = AuditContext::new(Some("conv-2".to_owned()), "req-2", "turn-service").event(
            "engine.outcome_selected",
            AuditCategory::Engine,
            AuditOutcome::Success,
        );

        for event in [&first, &second, &other] {
            repo.append(event).await.expect("append");
        }

        let events = repo.list_for_conversation("conv-1").await.expect("list");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "engine.turn_received");
        assert_eq!(events[1].metadata.get("outcome").map(String::as_str), Some("clarify"));
        assert_eq!(events[1].category, AuditCategory::Engine);
        assert_eq!(events[0].event_id, first.event_id);
    }
}
