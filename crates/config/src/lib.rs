//! Configuration loading, validation, and management for Recast.
//!
//! Loads configuration from `./.recast/config.toml` (project-local) or
//! `~/.recast/config.toml`, with environment variable overrides. Validates
//! all settings at startup.

use recast_core::model::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Google Cloud project hosting the Vertex AI endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Vertex AI region
    #[serde(default = "default_location")]
    pub location_id: String,

    /// Model used when the caller does not pick one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Models offered to the user
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Static bearer token (otherwise obtained from gcloud)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Transport selection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Context gathering
    #[serde(default)]
    pub context: ContextConfig,

    /// System prompt and instructions
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Sampling and timeout settings
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Server-side context cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where responses are written
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_location() -> String {
    "us-central1".into()
}
fn default_model() -> String {
    "gemini-1.5-pro-preview-0514".into()
}
fn default_models() -> Vec<String> {
    vec![
        "gemini-1.5-pro-preview-0514".into(),
        "gemini-1.5-flash-preview-0514".into(),
        "gemini-1.0-pro".into(),
    ]
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("project_id", &self.project_id)
            .field("location_id", &self.location_id)
            .field("default_model", &self.default_model)
            .field("models", &self.models)
            .field("access_token", &redact(&self.access_token))
            .field("backend", &self.backend)
            .field("context", &self.context)
            .field("prompt", &self.prompt)
            .field("generation", &self.generation)
            .field("cache", &self.cache)
            .field("output", &self.output)
            .finish()
    }
}

/// Which transport sends fresh-shape requests.
///
/// Cached-shape requests and cache creation always use the REST transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshTransport {
    #[default]
    Prediction,
    Rest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub fresh_transport: FreshTransport,

    /// Override the regional endpoint (e.g. for a proxy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Glob patterns resolved against the workspace root, in order.
    /// Overlapping patterns are not de-duplicated.
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,
}

fn default_include_patterns() -> Vec<String> {
    vec!["**/*.cs*".into()]
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            include_patterns: default_include_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Prepended to every user request; empty disables it.
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

fn default_system_prompt() -> String {
    "You are an expert .NET developer with extensive experience in migrating applications \
     from .NET Framework to the latest versions of .NET."
        .into()
}

fn default_instructions() -> String {
    [
        "<instructions>",
        "- Thoroughly read the code provided in each file in the context",
        "- Understand the dependencies between each file, developing a dependency tree in your mind",
        "- Establish a deep understanding of what the code does and any external dependencies not provided in the context",
        "- Use all of the files to understand this specific environment and its dependencies",
        "- When responding to the user request, be thorough and return the complete files when asked to migrate even if all the lines have not changed",
        "- When responding in the context of a file return the filename as a clickable hyperlink to the filename in markdown syntax",
        "</instructions>",
    ]
    .join("\n")
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            instructions: default_instructions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_candidate_count")]
    pub candidate_count: u32,

    /// Per-call timeout; repository-level requests take at least 30 seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_output_tokens() -> u32 {
    8192
}
fn default_temperature() -> f32 {
    0.2
}
fn default_top_p() -> f32 {
    1.0
}
fn default_candidate_count() -> u32 {
    1
}
fn default_timeout_secs() -> u64 {
    60
}

/// Bounds for `generation.timeout_secs`.
pub const MIN_TIMEOUT_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 120;

impl GenerationSettings {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            candidate_count: self.candidate_count,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            candidate_count: default_candidate_count(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Relative to the workspace root.
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

fn default_output_directory() -> String {
    "temp".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl AppConfig {
    /// Load configuration for a workspace.
    ///
    /// Uses `{workspace}/.recast/config.toml` when present, otherwise
    /// `~/.recast/config.toml`. Environment variables take priority:
    /// - `RECAST_PROJECT_ID` (else `GOOGLE_CLOUD_PROJECT`)
    /// - `RECAST_LOCATION`
    /// - `RECAST_MODEL`
    /// - `RECAST_ACCESS_TOKEN`
    pub fn load(workspace: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path(workspace))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// The config file that [`AppConfig::load`] reads for a workspace.
    pub fn config_path(workspace: &Path) -> PathBuf {
        let project = workspace.join(".recast").join("config.toml");
        if project.exists() {
            project
        } else {
            Self::config_dir().join("config.toml")
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(project) = lookup("RECAST_PROJECT_ID").or_else(|| lookup("GOOGLE_CLOUD_PROJECT"))
        {
            self.project_id = Some(project);
        }
        if let Some(location) = lookup("RECAST_LOCATION") {
            self.location_id = location;
        }
        if let Some(model) = lookup("RECAST_MODEL") {
            self.default_model = model;
        }
        if let Some(token) = lookup("RECAST_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
    }

    /// Get the global configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".recast")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&generation.top_p) {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be between 0.0 and 1.0".into(),
            ));
        }
        if generation.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_output_tokens must be > 0".into(),
            ));
        }
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&generation.timeout_secs) {
            return Err(ConfigError::ValidationError(format!(
                "generation.timeout_secs must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}"
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be > 0".into(),
            ));
        }
        if self.location_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "location_id must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The project id, which every backend call needs.
    pub fn require_project(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVariable("project_id".into()))
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location_id: default_location(),
            default_model: default_model(),
            models: default_models(),
            access_token: None,
            backend: BackendConfig::default(),
            context: ContextConfig::default(),
            prompt: PromptConfig::default(),
            generation: GenerationSettings::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing configuration variable: {0}")]
    MissingVariable(String),
}

impl From<ConfigError> for recast_core::Error {
    fn from(err: ConfigError) -> Self {
        recast_core::Error::Config {
            message: err.to_string(),
        }
    }
}
