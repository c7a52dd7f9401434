use std::env;
use std::fs;
use std::path::Path;

use bookmatch_core::config::{resolve_config_path, AppConfig};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match load_config("config", config_path) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = resolve_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in rendered_fields(&config) {
        lines.push(render_line(key_path, &value, source(key_path, env_key)));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn rendered_fields(config: &AppConfig) -> Vec<(&'static str, &'static str, String)> {
    vec![
        ("catalog.base_url", "BOOKMATCH_CATALOG_BASE_URL", config.catalog.base_url.clone()),
        ("catalog.client_id", "BOOKMATCH_CATALOG_CLIENT_ID", or_unset(&config.catalog.client_id)),
        (
            "catalog.client_secret",
            "BOOKMATCH_CATALOG_CLIENT_SECRET",
            redact_secret(Some(&config.catalog.client_secret)),
        ),
        (
            "catalog.search_limit",
            "BOOKMATCH_CATALOG_SEARCH_LIMIT",
            config.catalog.search_limit.to_string(),
        ),
        ("catalog.pacing", "BOOKMATCH_CATALOG_PACING", format!("{:?}", config.catalog.pacing)),
        ("catalog.pacing_ms", "BOOKMATCH_CATALOG_PACING_MS", config.catalog.pacing_ms.to_string()),
        (
            "catalog.timeout_secs",
            "BOOKMATCH_CATALOG_TIMEOUT_SECS",
            config.catalog.timeout_secs.to_string(),
        ),
        ("llm.base_url", "BOOKMATCH_LLM_BASE_URL", config.llm.base_url.clone()),
        ("llm.api_key", "BOOKMATCH_LLM_API_KEY", redact_secret(config.llm.api_key.as_ref())),
        ("llm.model", "BOOKMATCH_LLM_MODEL", config.llm.model.clone()),
        (
            "llm.description_model",
            "BOOKMATCH_LLM_DESCRIPTION_MODEL",
            config.llm.description_model.clone(),
        ),
        ("llm.timeout_secs", "BOOKMATCH_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        ("llm.max_retries", "BOOKMATCH_LLM_MAX_RETRIES", config.llm.max_retries.to_string()),
        (
            "matching.title_threshold",
            "BOOKMATCH_MATCHING_TITLE_THRESHOLD",
            config.matching.title_threshold.to_string(),
        ),
        (
            "matching.author_threshold",
            "BOOKMATCH_MATCHING_AUTHOR_THRESHOLD",
            config.matching.author_threshold.to_string(),
        ),
        (
            "matching.max_retries",
            "BOOKMATCH_MATCHING_MAX_RETRIES",
            config.matching.max_retries.to_string(),
        ),
        (
            "matching.min_question_chars",
            "BOOKMATCH_MATCHING_MIN_QUESTION_CHARS",
            config.matching.min_question_chars.to_string(),
        ),
        ("logging.level", "BOOKMATCH_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "BOOKMATCH_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: &str) -> String {
    if value.trim().is_empty() {
        "<unset>".to_string()
    } else {
        value.to_string()
    }
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        _ => "<unset>".to_string(),
    }
}
