use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use answer_core::config::{AppConfig, DEFAULT_CONFIG_FILE};
use secrecy::SecretString;
use toml::Value;

use crate::commands::{load_config, CommandResult};

struct ConfigField {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source =
            field_source(&field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let field = |key, env_keys, value: String| ConfigField { key, env_keys, value };
    let origins = if config.server.cors_origins.is_empty() {
        "<none>".to_string()
    } else {
        config.server.cors_origins.join(",")
    };

    vec![
        field("database.url", &["ANSWER_DATABASE_URL"], config.database.url.clone()),
        field(
            "database.max_connections",
            &["ANSWER_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            &["ANSWER_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        field("llm.provider", &["ANSWER_LLM_PROVIDER"], config.llm.provider.as_str().to_string()),
        field("llm.model", &["ANSWER_LLM_MODEL"], config.llm.model.clone()),
        field("llm.base_url", &["ANSWER_LLM_BASE_URL"], config.llm.base_url.clone()),
        field("llm.api_key", &["ANSWER_LLM_API_KEY"], redact(config.llm.api_key.as_ref())),
        field(
            "llm.temperature",
            &["ANSWER_LLM_TEMPERATURE"],
            config.llm.temperature.to_string(),
        ),
        field("llm.timeout_ms", &["ANSWER_LLM_TIMEOUT_MS"], config.llm.timeout_ms.to_string()),
        field(
            "server.bind_address",
            &["ANSWER_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["ANSWER_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.graceful_shutdown_secs",
            &["ANSWER_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field("server.cors_origins", &["ANSWER_SERVER_CORS_ORIGINS"], origins),
        field(
            "server.rate_limit_per_minute",
            &["ANSWER_SERVER_RATE_LIMIT_PER_MINUTE"],
            config.server.rate_limit_per_minute.to_string(),
        ),
        field("auth.api_key", &["ANSWER_AUTH_API_KEY"], redact(config.auth.api_key.as_ref())),
        field("cache.enabled", &["ANSWER_CACHE_ENABLED"], config.cache.enabled.to_string()),
        field("cache.ttl_secs", &["ANSWER_CACHE_TTL_SECS"], config.cache.ttl_secs.to_string()),
        field(
            "cache.max_entries",
            &["ANSWER_CACHE_MAX_ENTRIES"],
            config.cache.max_entries.to_string(),
        ),
        field(
            "logging.level",
            &["ANSWER_LOGGING_LEVEL", "ANSWER_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["ANSWER_LOGGING_FORMAT", "ANSWER_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &ConfigField,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, field.key)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact};
    use secrecy::SecretString;

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: toml::Value = "[llm]\nmodel = \"gpt-4o-mini\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn secrets_never_render_their_value() {
        let secret = SecretString::from("sk-live-123".to_owned());
        assert_eq!(redact(Some(&secret)), "<redacted>");
        assert_eq!(redact(None), "<unset>");
    }
}
