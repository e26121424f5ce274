//! CLI module for toolscout
//!
//! Provides command-line parsing for the toolscout binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::types::ResearchRequest;
use crate::utils::toml_config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// toolscout - developer tool research from the command line
///
/// Finds the tools that answer a question, researches each one on the web
/// and recommends the best fit.
#[derive(Parser, Debug)]
#[command(
    name = "toolscout",
    version,
    about = "Research and compare developer tools",
    long_about = "Extracts candidate tools from a question, gathers web evidence for each one,\n\
                  analyzes pricing, licensing, API and language support, and writes a\n\
                  recommendation.",
    after_help = "EXAMPLES:\n    \
                  toolscout research \"open source alternatives to Firebase\"\n    \
                  toolscout research \"vector databases\" --max-candidates 6 --json\n    \
                  toolscout init                   # Write a toolscout.toml\n    \
                  toolscout config --validate      # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research the developer tools that answer a question
    Research {
        /// The question, e.g. "open source alternatives to Firebase"
        query: String,

        /// Maximum number of candidate tools to research
        #[arg(long)]
        max_candidates: Option<usize>,

        /// Maximum number of pages fetched per candidate
        #[arg(long)]
        max_sources: Option<usize>,

        /// Candidates researched and analyzed at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Deadline for each search, fetch or LLM call, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Deadline for the whole run, in milliseconds
        #[arg(long)]
        global_timeout_ms: Option<u64>,

        /// Print the response as JSON instead of a formatted report
        #[arg(long)]
        json: bool,
    },

    /// Write a commented toolscout.toml
    Init {
        /// Directory to write the configuration to
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing toolscout.toml
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },

    /// Show the effective configuration
    Config {
        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Commands {
    /// Build the request for a `research` invocation
    pub fn research_request(&self) -> Option<ResearchRequest> {
        match self {
            Commands::Research {
                query,
                max_candidates,
                max_sources,
                concurrency,
                timeout_ms,
                ..
            } => Some(ResearchRequest {
                query: query.clone(),
                max_candidates: *max_candidates,
                max_sources_per_candidate: *max_sources,
                concurrency: *concurrency,
                timeout_ms: *timeout_ms,
            }),
            _ => None,
        }
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_research_with_overrides() {
        let cli = Cli::try_parse_from([
            "toolscout",
            "research",
            "firebase alternatives",
            "--max-candidates",
            "2",
            "--concurrency",
            "1",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("toolscout.toml"));
        let request = cli.command.research_request().unwrap();
        assert_eq!(request.query, "firebase alternatives");
        assert_eq!(request.max_candidates, Some(2));
        assert_eq!(request.concurrency, Some(1));
        assert_eq!(request.max_sources_per_candidate, None);
        assert!(matches!(cli.command, Commands::Research { json: true, .. }));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "toolscout",
            "config",
            "--validate",
            "--config",
            "custom.toml",
            "--no-color",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Config { validate: true }));
        assert!(cli.command.research_request().is_none());
    }

    #[test]
    fn test_parse_init_defaults() {
        let cli = Cli::try_parse_from(["toolscout", "init"]).unwrap();
        match cli.command {
            Commands::Init {
                path,
                force,
                provider,
            } => {
                assert_eq!(path, PathBuf::from("."));
                assert!(!force);
                assert_eq!(provider, "ollama");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_research_requires_query() {
        assert!(Cli::try_parse_from(["toolscout", "research"]).is_err());
        assert!(Cli::try_parse_from(["toolscout"]).is_err());
    }
}
