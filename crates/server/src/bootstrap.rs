use std::sync::Arc;
use std::time::Duration;

use answer_agent::{
    AnswerService, AnswerSettings, LlmClient, ModelSettings, OpenAiCompatibleClient, TurnService,
};
use answer_core::config::{AppConfig, ConfigError, LoadOptions};
use answer_core::ApplicationError;
use answer_db::repositories::{
    SqlAnswerLogRepository, SqlAuditEventRepository, SqlSessionRepository,
};
use answer_db::{
    connect_with_config, migrations, DbPool, InMemoryResponseCache, NullResponseCache,
    ResponseCache,
};
use axum::Router;
use thiserror::Error;
use tracing::info;

use crate::audit::TracingAuditSink;
use crate::auth::{AuthState, RateLimitState};
use crate::health::HealthState;
use crate::routes::{build_router, AppState, RouterSettings};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub answers: Arc<AnswerService>,
    pub turns: Arc<TurnService>,
}

impl Application {
    pub fn router(&self) -> Router {
        build_router(
            AppState { answers: self.answers.clone(), turns: self.turns.clone() },
            HealthState { db_pool: self.db_pool.clone() },
            RouterSettings {
                auth: AuthState::new(self.config.auth.api_key.clone()),
                rate_limit: RateLimitState::per_minute(self.config.server.rate_limit_per_minute),
                cors_origins: self.config.server.cors_origins.clone(),
            },
        )
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    LlmClient(String),
    #[error(transparent)]
    Service(#[from] ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let llm = OpenAiCompatibleClient::from_config(&config.llm)
        .map_err(|error| BootstrapError::LlmClient(format!("{error:#}")))?;
    bootstrap_with_llm(config, Arc::new(llm)).await
}

/// Wires the application around an already built model client.
pub async fn bootstrap_with_llm(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        llm_model = %config.llm.model,
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let cache: Arc<dyn ResponseCache> = if config.cache.enabled {
        Arc::new(InMemoryResponseCache::new(config.cache.max_entries))
    } else {
        Arc::new(NullResponseCache)
    };
    let settings = AnswerSettings {
        model: ModelSettings {
            temperature: config.llm.temperature,
            timeout: Duration::from_millis(config.llm.timeout_ms),
        },
        cache_ttl: Duration::from_secs(config.cache.ttl_secs),
    };

    let answers = AnswerService::new(
        llm,
        Arc::new(SqlAnswerLogRepository::new(db_pool.clone())),
        cache,
        settings,
    )?;
    let turns = TurnService::new(
        Arc::new(SqlSessionRepository::new(db_pool.clone())),
        Arc::new(SqlAuditEventRepository::new(db_pool.clone())),
        Arc::new(TracingAuditSink),
    );

    Ok(Application { config, db_pool, answers: Arc::new(answers), turns: Arc::new(turns) })
}

#[cfg(test)]
mod tests {
    use answer_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_openai_api_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(LlmProvider::OpenAi),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_with_local_provider_migrates_the_database() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with defaults");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('answer_log', 'engine_session', 'audit_event')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables should exist after bootstrap");
        assert_eq!(table_count, 3);
        assert_eq!(app.answers.model(), "llama3.1");

        app.db_pool.close().await;
    }
}
