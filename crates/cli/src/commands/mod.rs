pub mod config;
pub mod doctor;
pub mod owned;
pub mod recommend;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bookmatch_agent::{LlmRecommender, OpenAiChatClient, RecommenderSettings};
use bookmatch_catalog::NaverCatalogClient;
use bookmatch_core::config::{AppConfig, LoadOptions};
use bookmatch_core::domain::book::OwnedBook;
use bookmatch_core::orchestrator::BookMatcher;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT_FILE: u8 = 3;
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    /// Successful command whose stdout is `value` rendered as JSON.
    pub fn json<T: Serialize>(command: &str, value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_RUNTIME),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str, config_path: Option<&Path>) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        ..LoadOptions::default()
    })
    .map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn load_live_config(
    command: &str,
    config_path: Option<&Path>,
) -> Result<AppConfig, CommandResult> {
    let config = load_config(command, config_path)?;
    config.validate_credentials().map_err(|error| {
        CommandResult::failure(command, "missing_credentials", error.to_string(), EXIT_CONFIG)
    })?;
    Ok(config)
}

/// Reads a JSON array of `{"id","title","author"}` objects.
pub(crate) fn read_owned_books(command: &str, path: &Path) -> Result<Vec<OwnedBook>, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "input_file",
            format!("could not read `{}`: {error}", path.display()),
            EXIT_INPUT_FILE,
        )
    })?;

    serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure(
            command,
            "input_file",
            format!("could not parse `{}`: {error}", path.display()),
            EXIT_INPUT_FILE,
        )
    })
}

pub(crate) fn build_matcher(config: &AppConfig) -> anyhow::Result<BookMatcher> {
    let llm = OpenAiChatClient::from_config(&config.llm).context("failed to build llm client")?;
    let catalog =
        NaverCatalogClient::from_config(&config.catalog).context("failed to build catalog client")?;
    let recommender = LlmRecommender::new(Arc::new(llm), RecommenderSettings::from(&config.llm));

    Ok(BookMatcher::assemble(Arc::new(recommender), Arc::new(catalog), &config.engine_settings()))
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}
