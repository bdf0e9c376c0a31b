use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use answer_core::EngineState;

use super::{encode_json, parse_timestamp, EngineSession, RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load(&self, conversation_id: &str) -> Result<Option<EngineSession>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT conversation_id, state_json, turn_count, last_outcome, updated_at
            FROM engine_session
            WHERE conversation_id = ?
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn save(
        &self,
        conversation_id: &str,
        state: &EngineState,
        last_outcome: &str,
    ) -> Result<EngineSession, RepositoryError> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            r#"
            INSERT INTO engine_session (
                conversation_id, state_json, turn_count, last_outcome, created_at, updated_at
            ) VALUES (?, ?, 1, ?, ?, ?)
            ON CONFLICT(conversation_id) DO UPDATE SET
                state_json = excluded.state_json,
                turn_count = engine_session.turn_count + 1,
                last_outcome = excluded.last_outcome,
                updated_at = excluded.updated_at
            RETURNING conversation_id, state_json, turn_count, last_outcome, updated_at
            "#,
        )
        .bind(conversation_id)
        .bind(encode_json("state_json", state)?)
        .bind(last_outcome)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        session_from_row(&row)
    }

    async fn delete(&self, conversation_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM engine_session WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn session_from_row(row: &SqliteRow) -> Result<EngineSession, RepositoryError> {
    let state_json: String = row.try_get("state_json")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(EngineSession {
        conversation_id: row.try_get("conversation_id")?,
        state: serde_json::from_str(&state_json)
            .map_err(|e| RepositoryError::Decode(format!("invalid state_json: {e}")))?,
        turn_count: row.try_get("turn_count")?,
        last_outcome: row.try_get("last_outcome")?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
    })
}
