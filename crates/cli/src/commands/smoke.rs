use std::sync::Arc;
use std::time::Instant;

use answer_agent::TurnService;
use answer_core::audit::NoopAuditSink;
use answer_core::config::{AppConfig, LoadOptions};
use answer_core::engine::{EngineInput, EngineOutcome};
use answer_db::repositories::{SqlAuditEventRepository, SqlSessionRepository};
use answer_db::{connect_with_config, migrations, DbPool, SessionRepository};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::commands::{escape_json, CommandResult, EXIT_CHECKS_FAILED};

const SMOKE_CONVERSATION_ID: &str = "answer-cli-smoke";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            let detail = "configuration loaded and validated";
            checks.push(passed("config_validation", elapsed_ms, detail));
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(failed("config_validation", elapsed_ms, error.to_string()));
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("engine_turn"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(failed(
                "db_connectivity",
                0,
                format!("failed to initialize async runtime: {error}"),
            ));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("engine_turn"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let db_started = Instant::now();
    let db_result = runtime.block_on(connect_with_config(&config.database));
    let pool = match db_result {
        Ok(pool) => {
            checks.push(passed(
                "db_connectivity",
                elapsed_since(db_started),
                format!("connected using `{}`", config.database.url),
            ));
            pool
        }
        Err(error) => {
            checks.push(failed(
                "db_connectivity",
                elapsed_since(db_started),
                format!("failed to connect: {error}"),
            ));
            checks.push(skipped("migration_visibility"));
            checks.push(skipped("engine_turn"));
            return finalize_report(checks, elapsed_since(started));
        }
    };

    let migration_started = Instant::now();
    match runtime.block_on(migrations::run_pending(&pool)) {
        Ok(()) => checks.push(passed(
            "migration_visibility",
            elapsed_since(migration_started),
            "migrations are visible and executable",
        )),
        Err(error) => {
            checks.push(failed(
                "migration_visibility",
                elapsed_since(migration_started),
                format!("migration execution failed: {error}"),
            ));
            checks.push(skipped("engine_turn"));
            runtime.block_on(pool.close());
            return finalize_report(checks, elapsed_since(started));
        }
    }

    let turn_started = Instant::now();
    let turn_check = match run_engine_turn(&runtime, &pool) {
        Ok(message) => passed("engine_turn", elapsed_since(turn_started), message),
        Err(message) => failed("engine_turn", elapsed_since(turn_started), message),
    };
    checks.push(turn_check);
    runtime.block_on(pool.close());

    finalize_report(checks, elapsed_since(started))
}

/// Runs one empty turn through the stored-session path and removes the session afterwards.
fn run_engine_turn(runtime: &Runtime, pool: &DbPool) -> Result<String, String> {
    runtime.block_on(async {
        let sessions = Arc::new(SqlSessionRepository::new(pool.clone()));
        let service = TurnService::new(
            sessions.clone(),
            Arc::new(SqlAuditEventRepository::new(pool.clone())),
            Arc::new(NoopAuditSink),
        );

        let _ = sessions.delete(SMOKE_CONVERSATION_ID).await;
        let outcome = service
            .handle_turn(SMOKE_CONVERSATION_ID, EngineInput::default())
            .await
            .map_err(|error| format!("turn failed: {error}"))?;
        sessions
            .delete(SMOKE_CONVERSATION_ID)
            .await
            .map_err(|error| format!("could not clear smoke session: {error}"))?;

        if outcome.response.outcome != EngineOutcome::AskLocation {
            return Err(format!(
                "expected ask_location for an empty turn, got {}",
                outcome.response.outcome.as_str()
            ));
        }
        Ok(format!("empty turn asked for location (turn {})", outcome.turn))
    })
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((elapsed_since(started), value)),
        Err(error) => Err((elapsed_since(started), error)),
    }
}

fn elapsed_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn passed(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message: message.into() }
}

fn failed(name: &'static str, elapsed_ms: u64, message: impl Into<String>) -> SmokeCheck {
    SmokeCheck { name, status: SmokeStatus::Fail, elapsed_ms, message: message.into() }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due to previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });

    CommandResult {
        exit_code: if failed { EXIT_CHECKS_FAILED } else { 0 },
        output: format!("{human}\n{machine}"),
    }
}
