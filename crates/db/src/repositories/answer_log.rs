//! SQLite-backed log of every answered request.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::{
    encode_json, parse_timestamp, AnswerLogEntry, AnswerLogRepository, NewAnswerLog,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlAnswerLogRepository {
    pool: DbPool,
}

impl SqlAnswerLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnswerLogRepository for SqlAnswerLogRepository {
    async fn create(&self, entry: NewAnswerLog) -> Result<AnswerLogEntry, RepositoryError> {
        let id = format!("ans-{}", Uuid::new_v4());
        let now = Utc::now();
        let latency_ms = i64::try_from(entry.latency_ms).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO answer_log (
                id, request_id, question, normalized_question, context_json, intent,
                entities_json, answer, confidence, reason, next_action, trace_json,
                latency_ms, provider_model, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&entry.trace.request_id)
        .bind(&entry.question)
        .bind(&entry.normalized_question)
        .bind(encode_json("context_json", &entry.context)?)
        .bind(entry.intent.as_str())
        .bind(encode_json("entities_json", &entry.entities)?)
        .bind(&entry.answer)
        .bind(entry.confidence.as_str())
        .bind(&entry.reason)
        .bind(&entry.next_action)
        .bind(encode_json("trace_json", &entry.trace)?)
        .bind(latency_ms)
        .bind(&entry.provider_model)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AnswerLogEntry {
            id,
            request_id: entry.trace.request_id,
            question: entry.question,
            normalized_question: entry.normalized_question,
            intent: entry.intent.as_str().to_owned(),
            answer: entry.answer,
            confidence: entry.confidence.as_str().to_owned(),
            reason: entry.reason,
            next_action: entry.next_action,
            latency_ms,
            provider_model: entry.provider_model,
            created_at: now,
        })
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AnswerLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, request_id, question, normalized_question, intent, answer, confidence,
                   reason, next_action, latency_ms, provider_model, created_at
            FROM answer_log
            ORDER BY rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(answer_log_from_row).collect()
    }
}

fn answer_log_from_row(row: &SqliteRow) -> Result<AnswerLogEntry, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;

    Ok(AnswerLogEntry {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        question: row.try_get("question")?,
        normalized_question: row.try_get("normalized_question")?,
        intent: row.try_get("intent")?,
        answer: row.try_get("answer")?,
        confidence: row.try_get("confidence")?,
        reason: row.try_get("reason")?,
        next_action: row.try_get("next_action")?,
        latency_ms: row.try_get("latency_ms")?,
        provider_model: row.try_get("provider_model")?,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}
