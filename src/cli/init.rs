//! Init command implementation
//!
//! Writes a commented toolscout.toml (and a `.env.example` when the chosen
//! provider needs an API key).

use super::output::Output;
use crate::utils::toml_config::DEFAULT_CONFIG_FILE;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// toolscout.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to write into
    pub path: PathBuf,
    /// Overwrite an existing toolscout.toml
    pub force: bool,
    /// LLM provider to configure (ollama or openai)
    pub provider: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.header("Initializing toolscout");

    if !matches!(config.provider.as_str(), "ollama" | "openai") {
        let message = format!(
            "unknown provider '{}', expected 'ollama' or 'openai'",
            config.provider
        );
        output.error(&message);
        return InitResult::Error(message);
    }

    let base_path = &config.path;
    let config_path = base_path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", DEFAULT_CONFIG_FILE));
        output.hint("Use --force to overwrite it");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    let content = generate_toolscout_toml(&config.provider);
    if let Err(e) = write_file(&config_path, &content, config.force) {
        output.error(&format!("Failed to create {}: {}", DEFAULT_CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", DEFAULT_CONFIG_FILE);

    if config.provider == "openai" {
        let env_path = base_path.join(".env.example");
        if env_path.exists() {
            output.skipped(".env.example", "already exists");
        } else if let Err(e) = write_file(&env_path, &generate_env_example(), false) {
            output.warning(&format!("Failed to create .env.example: {}", e));
        } else {
            output.created("env", ".env.example");
        }
    }

    output.complete("toolscout is ready");

    output.header("Next Steps");
    if config.provider == "openai" {
        output.info("Set your API key:");
        output.command("cp .env.example .env  # then edit OPENAI_API_KEY");
    } else {
        output.info("Start Ollama and pull the model:");
        output.command("ollama serve");
        output.command("ollama pull llama3.2");
    }
    output.info("Run a research query:");
    output.command("toolscout research \"open source alternatives to Firebase\"");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_toolscout_toml(provider: &str) -> String {
    let provider_section = if provider == "openai" {
        r#"# OpenAI-compatible API (set OPENAI_API_KEY in .env)
[provider]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-4o-mini"
"#
    } else {
        r#"# Ollama - local inference, no API key required
[provider]
type = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"
"#
    };

    format!(
        r#"# toolscout configuration
# Every key is optional; the values below are the defaults.

[logging]
# trace, debug, info, warn or error (RUST_LOG overrides this)
level = "info"
# pretty or json
format = "pretty"

{provider_section}
[search]
# Pages larger than this are skipped
max_content_bytes = 2097152
# Timeout for a single HTTP request to the search provider
request_timeout_ms = 15000

[pipeline]
# Candidate tools researched per query
max_candidates = 4
# Pages fetched per candidate
max_sources_per_candidate = 3
# Candidates researched at the same time
research_concurrency = 4
# Analysis calls in flight at the same time
analyze_concurrency = 2
# Deadline for each search, fetch or LLM call
timeout_ms = 30000
# Deadline for the whole run; unfinished candidates are reported as failures
# global_timeout_ms = 300000
# Appended to a tool name when searching for its evidence
search_suffix = "official site"
# Comparison articles read before extracting candidates (0 disables)
extract_context_sources = 3
# Evidence characters passed to each analysis call
max_evidence_chars = 6000
"#
    )
}

fn generate_env_example() -> String {
    r#"# toolscout environment
# Copy this file to .env and fill in the values.

OPENAI_API_KEY=

# RUST_LOG=toolscout=debug
"#
    .to_string()
}
