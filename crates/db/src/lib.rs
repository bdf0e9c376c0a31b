pub mod cache;
pub mod connection;
pub mod migrations;
pub mod repositories;

pub use cache::{InMemoryResponseCache, NullResponseCache, ResponseCache};
pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use repositories::{
    AnswerLogEntry, AnswerLogRepository, AuditEventRepository, EngineSession, NewAnswerLog,
    RepositoryError, SessionRepository,
};
