use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orchestrator::EngineSettings;
use crate::pacing::PacingMode;
use crate::resolution::ResolverSettings;
use crate::scoring::MatchThresholds;

pub const DEFAULT_CONFIG_FILE: &str = "bookmatch.toml";
pub const NESTED_CONFIG_FILE: &str = "config/bookmatch.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub llm: LlmConfig,
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub search_limit: usize,
    pub pacing: PacingMode,
    pub pacing_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub description_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchingConfig {
    pub title_threshold: f64,
    pub author_threshold: f64,
    pub max_retries: u32,
    pub min_question_chars: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub catalog_client_id: Option<String>,
    pub catalog_client_secret: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub pacing: Option<PacingMode>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("missing credential `{0}`")]
    MissingCredential(&'static str),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                base_url: "https://openapi.naver.com/v1/search/book.json".to_string(),
                client_id: String::new(),
                client_secret: String::new().into(),
                search_limit: 10,
                pacing: PacingMode::Global,
                pacing_ms: 500,
                timeout_secs: 10,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1/chat/completions".to_string(),
                api_key: None,
                model: "gpt-4o".to_string(),
                description_model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                max_retries: 3,
            },
            matching: MatchingConfig {
                title_threshold: 0.4,
                author_threshold: 0.8,
                max_retries: 3,
                min_question_chars: 4,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl MatchingConfig {
    pub fn thresholds(&self) -> MatchThresholds {
        MatchThresholds { title: self.title_threshold, author: self.author_threshold }
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings { max_retries: self.max_retries }
    }
}

impl From<&MatchingConfig> for ResolverSettings {
    fn from(matching: &MatchingConfig) -> Self {
        matching.resolver_settings()
    }
}

impl CatalogConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file || options.config_path.is_some() {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            thresholds: self.matching.thresholds(),
            resolver: self.matching.resolver_settings(),
            search_limit: self.catalog.search_limit,
            pacing_mode: self.catalog.pacing,
            pacing_delay: self.catalog.pacing_delay(),
            min_question_chars: self.matching.min_question_chars,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(base_url) = catalog.base_url {
                self.catalog.base_url = base_url;
            }
            if let Some(client_id) = catalog.client_id {
                self.catalog.client_id = client_id;
            }
            if let Some(client_secret) = catalog.client_secret {
                self.catalog.client_secret = secret_value(client_secret);
            }
            if let Some(search_limit) = catalog.search_limit {
                self.catalog.search_limit = search_limit;
            }
            if let Some(pacing) = catalog.pacing {
                self.catalog.pacing = pacing;
            }
            if let Some(pacing_ms) = catalog.pacing_ms {
                self.catalog.pacing_ms = pacing_ms;
            }
            if let Some(timeout_secs) = catalog.timeout_secs {
                self.catalog.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(description_model) = llm.description_model {
                self.llm.description_model = description_model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(matching) = patch.matching {
            if let Some(title_threshold) = matching.title_threshold {
                self.matching.title_threshold = title_threshold;
            }
            if let Some(author_threshold) = matching.author_threshold {
                self.matching.author_threshold = author_threshold;
            }
            if let Some(max_retries) = matching.max_retries {
                self.matching.max_retries = max_retries;
            }
            if let Some(min_question_chars) = matching.min_question_chars {
                self.matching.min_question_chars = min_question_chars;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BOOKMATCH_CATALOG_BASE_URL") {
            self.catalog.base_url = value;
        }
        if let Some(value) = read_env("BOOKMATCH_CATALOG_CLIENT_ID") {
            self.catalog.client_id = value;
        }
        if let Some(value) = read_env("BOOKMATCH_CATALOG_CLIENT_SECRET") {
            self.catalog.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("BOOKMATCH_CATALOG_SEARCH_LIMIT") {
            self.catalog.search_limit = parse_env("BOOKMATCH_CATALOG_SEARCH_LIMIT", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_CATALOG_PACING") {
            self.catalog.pacing = parse_env("BOOKMATCH_CATALOG_PACING", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_CATALOG_PACING_MS") {
            self.catalog.pacing_ms = parse_env("BOOKMATCH_CATALOG_PACING_MS", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_CATALOG_TIMEOUT_SECS") {
            self.catalog.timeout_secs = parse_env("BOOKMATCH_CATALOG_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BOOKMATCH_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("BOOKMATCH_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("BOOKMATCH_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("BOOKMATCH_LLM_DESCRIPTION_MODEL") {
            self.llm.description_model = value;
        }
        if let Some(value) = read_env("BOOKMATCH_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("BOOKMATCH_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_env("BOOKMATCH_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("BOOKMATCH_MATCHING_TITLE_THRESHOLD") {
            self.matching.title_threshold =
                parse_env("BOOKMATCH_MATCHING_TITLE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_MATCHING_AUTHOR_THRESHOLD") {
            self.matching.author_threshold =
                parse_env("BOOKMATCH_MATCHING_AUTHOR_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_MATCHING_MAX_RETRIES") {
            self.matching.max_retries = parse_env("BOOKMATCH_MATCHING_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("BOOKMATCH_MATCHING_MIN_QUESTION_CHARS") {
            self.matching.min_question_chars =
                parse_env("BOOKMATCH_MATCHING_MIN_QUESTION_CHARS", &value)?;
        }

        let log_level =
            read_env("BOOKMATCH_LOGGING_LEVEL").or_else(|| read_env("BOOKMATCH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BOOKMATCH_LOGGING_FORMAT").or_else(|| read_env("BOOKMATCH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(client_id) = overrides.catalog_client_id {
            self.catalog.client_id = client_id;
        }
        if let Some(client_secret) = overrides.catalog_client_secret {
            self.catalog.client_secret = secret_value(client_secret);
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(pacing) = overrides.pacing {
            self.catalog.pacing = pacing;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_llm(&self.llm)?;
        validate_matching(&self.matching)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Checks the credentials needed to reach the live catalog and LLM. Kept out
    /// of [`AppConfig::validate`] so inspection commands work without them.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.catalog.client_id.trim().is_empty() {
            return Err(ConfigError::MissingCredential("catalog.client_id"));
        }
        if self.catalog.client_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingCredential("catalog.client_secret"));
        }
        let api_key_missing = self
            .llm
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if api_key_missing {
            return Err(ConfigError::MissingCredential("llm.api_key"));
        }
        Ok(())
    }
}

/// First existing config file: the explicit path, else the default locations.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_http_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    validate_http_url("catalog.base_url", catalog.base_url.trim())?;
    if catalog.search_limit == 0 || catalog.search_limit > 100 {
        return Err(ConfigError::Validation(
            "catalog.search_limit must be in range 1..=100".to_string(),
        ));
    }
    if catalog.pacing_ms == 0 {
        return Err(ConfigError::Validation(
            "catalog.pacing_ms must be at least 1; catalog searches are always paced".to_string(),
        ));
    }
    validate_timeout("catalog.timeout_secs", catalog.timeout_secs)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    validate_http_url("llm.base_url", llm.base_url.trim())?;
    validate_timeout("llm.timeout_secs", llm.timeout_secs)?;

    if llm.model.trim().is_empty() || llm.description_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.model and llm.description_model must not be empty".to_string(),
        ));
    }
    if llm.max_retries == 0 || llm.max_retries > 10 {
        return Err(ConfigError::Validation("llm.max_retries must be in range 1..=10".to_string()));
    }

    Ok(())
}

fn validate_matching(matching: &MatchingConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("matching.title_threshold", matching.title_threshold),
        ("matching.author_threshold", matching.author_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
        }
    }

    if matching.max_retries == 0 || matching.max_retries > 10 {
        return Err(ConfigError::Validation(
            "matching.max_retries must be in range 1..=10".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    llm: Option<LlmPatch>,
    matching: Option<MatchingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    base_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    search_limit: Option<usize>,
    pacing: Option<PacingMode>,
    pacing_ms: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    description_model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchingPatch {
    title_threshold: Option<f64>,
    author_threshold: Option<f64>,
    max_retries: Option<u32>,
    min_question_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::pacing::PacingMode;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_values() -> Result<(), String> {
        let config = AppConfig::default();
        ensure(config.validate().is_ok(), "defaults should validate")?;
        ensure(config.matching.title_threshold == 0.4, "title threshold defaults to 0.4")?;
        ensure(config.matching.author_threshold == 0.8, "author threshold defaults to 0.8")?;
        ensure(config.matching.max_retries == 3, "retry budget defaults to 3")?;
        ensure(config.catalog.search_limit == 10, "search limit defaults to 10")?;
        ensure(config.catalog.pacing == PacingMode::Global, "pacing defaults to global")?;

        let settings = config.engine_settings();
        ensure(settings.pacing_delay == Duration::from_millis(500), "pacing delay is 500ms")?;
        ensure(settings.min_question_chars == 4, "minimum question length is 4")?;
        ensure(
            config.validate_credentials().is_err(),
            "defaults carry no credentials",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_NAVER_CLIENT_ID", "naver-id-from-env");
        env::set_var("TEST_OPENAI_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bookmatch.toml");
            fs::write(
                &path,
                r#"
[catalog]
client_id = "${TEST_NAVER_CLIENT_ID}"
client_secret = "naver-secret"
pacing = "per_call"

[llm]
api_key = "${TEST_OPENAI_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.catalog.client_id == "naver-id-from-env", "client id interpolated")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be loaded from environment",
            )?;
            ensure(config.catalog.pacing == PacingMode::PerCall, "pacing read from file")?;
            ensure(config.validate_credentials().is_ok(), "credentials are complete")?;
            Ok(())
        })();

        clear_vars(&["TEST_NAVER_CLIENT_ID", "TEST_OPENAI_KEY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("bookmatch.toml");
        fs::write(&path, "[llm]\napi_key = \"${BOOKMATCH_TEST_UNSET_VARIABLE}\"\n")
            .map_err(|err| err.to_string())?;

        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or_else(|| "expected interpolation failure".to_string())?;
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "BOOKMATCH_TEST_UNSET_VARIABLE"),
            "error should name the missing variable",
        )
    }

    #[test]
    fn explicit_missing_path_is_an_error() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");

        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or_else(|| "expected missing file failure".to_string())?;
        ensure(matches!(error, ConfigError::MissingConfigFile(_)), "missing file is reported")
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKMATCH_LOG_LEVEL", "warn");
        env::set_var("BOOKMATCH_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["BOOKMATCH_LOG_LEVEL", "BOOKMATCH_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKMATCH_CATALOG_CLIENT_ID", "id-from-env");
        env::set_var("BOOKMATCH_MATCHING_TITLE_THRESHOLD", "0.55");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("bookmatch.toml");
            fs::write(
                &path,
                r#"
[catalog]
client_id = "id-from-file"
search_limit = 20

[matching]
title_threshold = 0.5
max_retries = 5

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    llm_model: Some("gpt-4o-2024-08-06".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.catalog.client_id == "id-from-env", "env should win over file")?;
            ensure(config.catalog.search_limit == 20, "file should win over defaults")?;
            ensure(config.matching.title_threshold == 0.55, "env threshold should win")?;
            ensure(config.matching.resolver_settings().max_retries == 5, "file retry budget")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.llm.model == "gpt-4o-2024-08-06", "override model should win")?;
            Ok(())
        })();

        clear_vars(&["BOOKMATCH_CATALOG_CLIENT_ID", "BOOKMATCH_MATCHING_TITLE_THRESHOLD"]);
        result
    }

    #[test]
    fn invalid_env_values_are_reported_with_their_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BOOKMATCH_CATALOG_PACING", "sometimes");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env parse failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "BOOKMATCH_CATALOG_PACING"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["BOOKMATCH_CATALOG_PACING"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.matching.author_threshold = 1.5;
        let threshold_error = config.validate().err().map(|error| error.to_string());
        ensure(
            threshold_error.is_some_and(|message| message.contains("matching.author_threshold")),
            "threshold validation should mention the key",
        )?;

        let mut config = AppConfig::default();
        config.matching.max_retries = 0;
        ensure(config.validate().is_err(), "zero retry budget is rejected")?;

        let mut config = AppConfig::default();
        config.catalog.search_limit = 101;
        ensure(config.validate().is_err(), "search limit above 100 is rejected")?;

        let mut config = AppConfig::default();
        config.llm.timeout_secs = 0;
        ensure(config.validate().is_err(), "zero timeout is rejected")
    }

    #[test]
    fn pacing_cannot_be_disabled() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.catalog.pacing_ms = 0;
        let message = config.validate().err().map(|error| error.to_string());
        ensure(
            message.is_some_and(|message| message.contains("catalog.pacing_ms")),
            "zero pacing delay is rejected with its key",
        )?;

        config.catalog.pacing_ms = 1;
        ensure(config.validate().is_ok(), "any positive pacing delay is accepted")
    }

    #[test]
    fn credentials_are_checked_separately() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.catalog.client_id = "id".to_string();
        config.catalog.client_secret = "secret".to_string().into();

        let error = config.validate_credentials().err();
        ensure(
            matches!(error, Some(ConfigError::MissingCredential("llm.api_key"))),
            "missing api key is reported",
        )?;

        config.llm.api_key = Some("sk-test".to_string().into());
        ensure(config.validate_credentials().is_ok(), "complete credentials pass")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.catalog.client_secret = "naver-secret-value".to_string().into();
        config.llm.api_key = Some("sk-secret-value".to_string().into());

        let debug = format!("{config:?}");

        ensure(!debug.contains("naver-secret-value"), "debug output should not contain secret")?;
        ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")
    }
}
