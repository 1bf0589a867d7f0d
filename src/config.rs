//! Configuration management for the programming workflow.
//!
//! Configuration is read from environment variables:
//! - `OPENAI_API_KEY` - Required. API key for the chat-completion endpoint.
//! - `OPENAI_BASE_URL` - Optional. Defaults to `https://api.openai.com/v1`.
//! - `OPENAI_ORG_ID` - Optional. Sent as `OpenAI-Organization`.
//! - `DEFAULT_MODEL` - Optional. Defaults to `gpt-4o`.
//! - `MODEL_TEMPERATURE` - Optional. Defaults to `0.1`.
//! - `MAX_TOKENS` - Optional. Output token cap per agent turn.
//! - `REQUEST_TIMEOUT` - Optional. Seconds per HTTP request. Defaults to `60`.
//! - `BASIC_WORKFLOW_MAX_MESSAGES` - Optional. Defaults to `15`.
//! - `ADVANCED_WORKFLOW_MAX_MESSAGES` - Optional. Defaults to `25`.
//! - `ENABLE_PARALLEL_PROCESSING` - Optional. Defaults to `true`.
//! - `ENABLE_MESSAGE_FILTERING` - Optional. Defaults to `true`.
//! - `DEFAULT_LANGUAGE` - Optional. Defaults to `python`.
//! - `RESULTS_DIR` - Optional. Defaults to `results`.
//! - `SAVE_INTERMEDIATE_RESULTS` - Optional. Defaults to `false`.
//!
//! A YAML overrides file (see [`ConfigOverrides`]) can be layered on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::agents::AgentRole;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to read overrides file {path}: {source}")]
    OverridesIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse overrides file {path}: {source}")]
    OverridesParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Limits and switches for the two pipeline variants.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Message cap for the round-robin pipeline (task message included)
    pub basic_max_messages: usize,

    /// Message cap for the graph pipeline (task message included)
    pub advanced_max_messages: usize,

    /// Keywords that end the round-robin pipeline
    pub basic_termination_keywords: Vec<String>,

    /// Keywords that end the graph pipeline
    pub advanced_termination_keywords: Vec<String>,

    /// Run ready graph nodes concurrently
    pub enable_parallel_processing: bool,

    /// Apply per-agent message filters in the graph pipeline
    pub enable_message_filtering: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            basic_max_messages: 15,
            advanced_max_messages: 25,
            basic_termination_keywords: vec!["OPTIMIZATION_COMPLETE".to_string()],
            advanced_termination_keywords: vec!["WORKFLOW_COMPLETE".to_string()],
            enable_parallel_processing: true,
            enable_message_filtering: true,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the chat-completion endpoint
    pub api_key: String,

    /// Base URL of an OpenAI-compatible API
    pub base_url: String,

    /// Optional organization header
    pub org_id: Option<String>,

    /// Model identifier used by every agent
    pub default_model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Output token cap per agent turn
    pub max_tokens: Option<u64>,

    /// Timeout for a single HTTP request
    pub request_timeout: Duration,

    /// Pipeline limits
    pub workflow: WorkflowSettings,

    /// Language used when a task does not name one
    pub default_language: String,

    /// Directory that receives saved outcomes
    pub results_dir: PathBuf,

    /// Also extract code blocks into standalone files
    pub save_intermediate_results: bool,

    /// System prompt replacements keyed by role
    pub prompt_overrides: HashMap<AgentRole, String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` for unparseable numbers or booleans.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let defaults = WorkflowSettings::default();
        let workflow = WorkflowSettings {
            basic_max_messages: parse_or(
                "BASIC_WORKFLOW_MAX_MESSAGES",
                get("BASIC_WORKFLOW_MAX_MESSAGES"),
                defaults.basic_max_messages,
            )?,
            advanced_max_messages: parse_or(
                "ADVANCED_WORKFLOW_MAX_MESSAGES",
                get("ADVANCED_WORKFLOW_MAX_MESSAGES"),
                defaults.advanced_max_messages,
            )?,
            enable_parallel_processing: parse_bool_or(
                "ENABLE_PARALLEL_PROCESSING",
                get("ENABLE_PARALLEL_PROCESSING"),
                true,
            )?,
            enable_message_filtering: parse_bool_or(
                "ENABLE_MESSAGE_FILTERING",
                get("ENABLE_MESSAGE_FILTERING"),
                true,
            )?,
            ..defaults
        };

        let timeout_secs: u64 = parse_or("REQUEST_TIMEOUT", get("REQUEST_TIMEOUT"), 60)?;

        Ok(Self {
            api_key,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id: get("OPENAI_ORG_ID"),
            default_model: get("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or("MODEL_TEMPERATURE", get("MODEL_TEMPERATURE"), 0.1)?,
            max_tokens: get("MAX_TOKENS")
                .map(|v| parse_value("MAX_TOKENS", &v))
                .transpose()?,
            request_timeout: Duration::from_secs(timeout_secs),
            workflow,
            default_language: get("DEFAULT_LANGUAGE").unwrap_or_else(|| "python".to_string()),
            results_dir: get("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("results")),
            save_intermediate_results: parse_bool_or(
                "SAVE_INTERMEDIATE_RESULTS",
                get("SAVE_INTERMEDIATE_RESULTS"),
                false,
            )?,
            prompt_overrides: HashMap::new(),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            org_id: None,
            default_model,
            temperature: 0.1,
            max_tokens: None,
            request_timeout: Duration::from_secs(60),
            workflow: WorkflowSettings::default(),
            default_language: "python".to_string(),
            results_dir: PathBuf::from("results"),
            save_intermediate_results: false,
            prompt_overrides: HashMap::new(),
        }
    }

    /// Apply a YAML overrides file on top of the current values.
    pub fn apply_overrides_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::OverridesIo {
            path: path.to_path_buf(),
            source,
        })?;
        let overrides: ConfigOverrides =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::OverridesParse {
                path: path.to_path_buf(),
                source,
            })?;
        self.apply_overrides(overrides);
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(model) = overrides.model {
            self.default_model = model;
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(n) = overrides.basic_max_messages {
            self.workflow.basic_max_messages = n;
        }
        if let Some(n) = overrides.advanced_max_messages {
            self.workflow.advanced_max_messages = n;
        }
        if let Some(keywords) = overrides.basic_termination_keywords {
            self.workflow.basic_termination_keywords = keywords;
        }
        if let Some(keywords) = overrides.advanced_termination_keywords {
            self.workflow.advanced_termination_keywords = keywords;
        }
        self.prompt_overrides.extend(overrides.prompts);
    }

    /// Check semantic constraints that parsing alone cannot catch.
    ///
    /// Returns every problem found; an empty list means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.api_key.trim().is_empty() {
            errors.push("OPENAI_API_KEY is empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push("MODEL_TEMPERATURE must be between 0 and 2".to_string());
        }
        if self.workflow.basic_max_messages == 0 {
            errors.push("BASIC_WORKFLOW_MAX_MESSAGES must be greater than 0".to_string());
        }
        if self.workflow.advanced_max_messages == 0 {
            errors.push("ADVANCED_WORKFLOW_MAX_MESSAGES must be greater than 0".to_string());
        }
        if self.request_timeout.is_zero() {
            errors.push("REQUEST_TIMEOUT must be greater than 0".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(format!("OPENAI_BASE_URL is not an http(s) URL: {}", self.base_url));
        }
        errors
    }
}

/// Optional YAML file layered over the environment.
///
/// ```yaml
/// model: gpt-4o-mini
/// basic_max_messages: 9
/// advanced_termination_keywords: [WORKFLOW_COMPLETE, SHIP_IT]
/// prompts:
///   code_reviewer: "You are a terse reviewer..."
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub basic_max_messages: Option<usize>,
    pub advanced_max_messages: Option<usize>,
    pub basic_termination_keywords: Option<Vec<String>>,
    pub advanced_termination_keywords: Option<Vec<String>>,
    pub prompts: HashMap<AgentRole, String>,
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e)))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}

fn parse_bool_or(key: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(v) = raw else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("expected a boolean, got '{}'", other),
        )),
    }
}
