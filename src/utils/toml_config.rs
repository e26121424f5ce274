//! TOML-based configuration for toolscout
//!
//! Everything lives in a single `toolscout.toml`. Every section and every
//! key is optional; missing values fall back to the defaults below, so an
//! empty file is a valid configuration.

use crate::evidence::GatewayLimits;
use crate::llm::Provider;
use crate::types::{AppError, ResearchRequest, Result as AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "toolscout.toml";

/// Root configuration structure loaded from toolscout.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolscoutConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for toolscout's own targets: trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// LLM provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    OpenAI {
        /// Name of the environment variable holding the API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_openai_model")]
        model: String,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl ProviderConfig {
    /// Resolve secrets from the environment and build a [`Provider`]
    pub fn to_provider(&self) -> Result<Provider, ConfigError> {
        match self {
            ProviderConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => {
                let api_key = std::env::var(api_key_env)
                    .map_err(|_| ConfigError::MissingEnvVar(api_key_env.clone()))?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.clone(),
                })
            }
        }
    }
}

/// Search and fetch provider limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: default_max_content_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_max_content_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

impl SearchConfig {
    pub fn limits(&self) -> GatewayLimits {
        GatewayLimits {
            max_content_bytes: self.max_content_bytes,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Limits and bounds for one research run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candidates kept after extraction, most relevant first
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    #[serde(default = "default_max_sources")]
    pub max_sources_per_candidate: usize,

    /// Candidates researched at the same time
    #[serde(default = "default_research_concurrency")]
    pub research_concurrency: usize,

    /// Analysis calls in flight at the same time
    #[serde(default = "default_analyze_concurrency")]
    pub analyze_concurrency: usize,

    /// Deadline for each individual search, fetch or LLM call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for the whole run; when it passes, unfinished candidates are
    /// recorded as failures and the run moves on to aggregation
    #[serde(default)]
    pub global_timeout_ms: Option<u64>,

    /// Appended to the tool name when searching for its evidence
    #[serde(default = "default_search_suffix")]
    pub search_suffix: String,

    /// Articles read before candidate extraction; 0 disables the step
    #[serde(default = "default_extract_context_sources")]
    pub extract_context_sources: usize,

    /// Upper bound on the evidence text handed to one analysis call
    #[serde(default = "default_max_evidence_chars")]
    pub max_evidence_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            max_sources_per_candidate: default_max_sources(),
            research_concurrency: default_research_concurrency(),
            analyze_concurrency: default_analyze_concurrency(),
            timeout_ms: default_timeout_ms(),
            global_timeout_ms: None,
            search_suffix: default_search_suffix(),
            extract_context_sources: default_extract_context_sources(),
            max_evidence_chars: default_max_evidence_chars(),
        }
    }
}

fn default_max_candidates() -> usize {
    4
}

fn default_max_sources() -> usize {
    3
}

fn default_research_concurrency() -> usize {
    4
}

fn default_analyze_concurrency() -> usize {
    2
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_search_suffix() -> String {
    "official site".to_string()
}

fn default_extract_context_sources() -> usize {
    3
}

fn default_max_evidence_chars() -> usize {
    6_000
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn global_timeout(&self) -> Option<Duration> {
        self.global_timeout_ms.map(Duration::from_millis)
    }

    /// Copy of this configuration with the request's overrides applied.
    ///
    /// `concurrency` bounds both worker pools.
    pub fn with_request(&self, request: &ResearchRequest) -> AppResult<Self> {
        let mut config = self.clone();
        if let Some(max) = request.max_candidates {
            config.max_candidates = max;
        }
        if let Some(max) = request.max_sources_per_candidate {
            config.max_sources_per_candidate = max;
        }
        if let Some(concurrency) = request.concurrency {
            config.research_concurrency = concurrency;
            config.analyze_concurrency = concurrency;
        }
        if let Some(timeout_ms) = request.timeout_ms {
            config.timeout_ms = timeout_ms;
        }

        config
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_candidates", self.max_candidates as u64),
            ("max_sources_per_candidate", self.max_sources_per_candidate as u64),
            ("research_concurrency", self.research_concurrency as u64),
            ("analyze_concurrency", self.analyze_concurrency as u64),
            ("timeout_ms", self.timeout_ms),
            ("max_evidence_chars", self.max_evidence_chars as u64),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "pipeline.{} must be greater than 0",
                    key
                )));
            }
        }
        if self.global_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "pipeline.global_timeout_ms must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl ToolscoutConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: ToolscoutConfig = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Like [`ToolscoutConfig::load`], but a missing file at the default
    /// location yields the built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}, got '{}'",
                LEVELS.join(", "),
                self.logging.level
            )));
        }

        match &self.provider {
            ProviderConfig::Ollama { base_url, model }
            | ProviderConfig::OpenAI {
                api_base: base_url,
                model,
                ..
            } => {
                if base_url.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "provider base URL must not be empty".to_string(),
                    ));
                }
                if model.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "provider.model must not be empty".to_string(),
                    ));
                }
            }
        }

        if self.search.max_content_bytes == 0 || self.search.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_content_bytes and search.request_timeout_ms must be greater than 0"
                    .to_string(),
            ));
        }

        self.pipeline.validate()
    }

    /// Render the configuration back to TOML
    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::Internal(format!("failed to serialize configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = ToolscoutConfig::load(file.path()).unwrap();
        assert_eq!(config, ToolscoutConfig::default());
        assert_eq!(config.pipeline.max_candidates, 4);
        assert_eq!(config.pipeline.search_suffix, "official site");
        assert!(config.pipeline.global_timeout().is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let file = write_config(
            r#"
[logging]
level = "debug"
format = "json"

[provider]
type = "openai"
api_key_env = "TOOLSCOUT_TEST_KEY"
model = "gpt-4o"

[search]
max_content_bytes = 1024
request_timeout_ms = 500

[pipeline]
max_candidates = 6
max_sources_per_candidate = 2
research_concurrency = 3
analyze_concurrency = 1
timeout_ms = 10000
global_timeout_ms = 60000
extract_context_sources = 0
"#,
        );
        let config = ToolscoutConfig::load(file.path()).unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.provider,
            ProviderConfig::OpenAI {
                api_key_env: "TOOLSCOUT_TEST_KEY".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o".to_string(),
            }
        );
        assert_eq!(config.search.limits().request_timeout, Duration::from_millis(500));
        assert_eq!(config.pipeline.max_candidates, 6);
        assert_eq!(config.pipeline.global_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.pipeline.extract_context_sources, 0);
    }

    #[test]
    fn test_missing_file() {
        let err = ToolscoutConfig::load("/nonexistent/toolscout.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));

        let err = ToolscoutConfig::load_or_default("/nonexistent/toolscout.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[pipeline\nmax_candidates = ");
        let err = ToolscoutConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_zero_bounds_are_rejected() {
        let file = write_config("[pipeline]\nresearch_concurrency = 0\n");
        let err = ToolscoutConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("research_concurrency"));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let file = write_config("[logging]\nlevel = \"loud\"\n");
        let err = ToolscoutConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_request_overrides() {
        let mut request = ResearchRequest::new("firebase alternatives");
        request.max_candidates = Some(2);
        request.concurrency = Some(1);
        request.timeout_ms = Some(250);

        let config = PipelineConfig::default().with_request(&request).unwrap();
        assert_eq!(config.max_candidates, 2);
        assert_eq!(config.research_concurrency, 1);
        assert_eq!(config.analyze_concurrency, 1);
        assert_eq!(config.call_timeout(), Duration::from_millis(250));
        assert_eq!(config.max_sources_per_candidate, 3);

        request.concurrency = Some(0);
        let err = PipelineConfig::default().with_request(&request).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_openai_provider_requires_key() {
        let config = ProviderConfig::OpenAI {
            api_key_env: "TOOLSCOUT_TEST_UNSET_KEY".to_string(),
            api_base: default_openai_base(),
            model: default_openai_model(),
        };
        let err = config.to_provider().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref name) if name == "TOOLSCOUT_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_default_provider_is_ollama() {
        let provider = ProviderConfig::default().to_provider().unwrap();
        assert_eq!(provider.name(), "Ollama");
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = ToolscoutConfig::default();
        config.pipeline.global_timeout_ms = Some(120_000);
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("type = \"ollama\""));
        let parsed: ToolscoutConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
