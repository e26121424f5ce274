//! # toolscout - developer tool research
//!
//! Answers questions like *"open source alternatives to Firebase"* by running
//! a four-stage pipeline: extract candidate tools from the query, gather web
//! evidence for each candidate, analyze every candidate's evidence into a
//! structured [`ToolAnalysis`], and aggregate the analyses into a
//! recommendation.
//!
//! Research and analysis fan out per candidate with bounded concurrency. A
//! candidate that fails is recorded as a [`StageFailure`] and never takes the
//! rest of the run down with it.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolscout::{DaedraGateway, PipelineConfig, Provider, ResearchPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = Provider::Ollama {
//!         base_url: "http://localhost:11434".to_string(),
//!         model: "llama3.2".to_string(),
//!     }
//!     .create_client()?;
//!
//!     let pipeline = ResearchPipeline::new(Arc::new(DaedraGateway::default()), llm);
//!     let state = pipeline
//!         .run("open source alternatives to Firebase", &PipelineConfig::default())
//!         .await?;
//!
//!     println!("{}", state.final_report().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI-compatible API support |
//!
//! ## Modules
//!
//! - [`research`] - Pipeline state, stages and driver
//! - [`evidence`] - Web search and page fetch gateway
//! - [`extraction`] - Schema-constrained LLM generation and prompts
//! - [`llm`] - LLM client implementations
//! - [`types`] - Domain types and error handling
//! - [`utils`] - Configuration and logging
//! - [`cli`] - Command-line interface

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line parsing and terminal output.
pub mod cli;
/// Web evidence gathering (search + fetch).
pub mod evidence;
/// Structured generation over LLM clients.
pub mod extraction;
/// LLM provider clients and abstractions.
pub mod llm;
/// Developer tool research pipeline.
pub mod research;
/// Core types (domain records, requests, responses, errors).
pub mod types;
/// Configuration and logging utilities.
pub mod utils;

// Re-export commonly used types
pub use evidence::{DaedraGateway, EvidenceGateway, GatewayLimits};
pub use extraction::{ExtractionService, StructuredOutput};
pub use llm::{LLMClient, Provider};
pub use research::{PipelinePhase, ResearchCoordinator, ResearchPipeline, ResearchState};
pub use types::{
    AppError, CandidateTool, EvidenceError, ExtractionError, PricingModel, ResearchRequest,
    ResearchResponse, Result, Stage, StageFailure, ToolAnalysis,
};
pub use utils::toml_config::{PipelineConfig, ToolscoutConfig};
