//! Developer tool research
//!
//! A research run moves through four stages:
//!
//! 1. **Extract** - turn the query into a ranked list of candidate tools
//! 2. **Research** - search and fetch web evidence for every candidate
//! 3. **Analyze** - turn each candidate's evidence into a [`ToolAnalysis`]
//! 4. **Aggregate** - compare the analyses and write a recommendation
//!
//! Research and Analyze fan out per candidate. A candidate that fails in
//! either stage is recorded as a [`StageFailure`] and the run carries on
//! with the rest; only a failed extraction aborts the run.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use toolscout::evidence::DaedraGateway;
//! use toolscout::research::ResearchPipeline;
//! use toolscout::utils::toml_config::PipelineConfig;
//!
//! let pipeline = ResearchPipeline::new(Arc::new(DaedraGateway::default()), llm);
//! let state = pipeline
//!     .run("open source alternatives to Firebase", &PipelineConfig::default())
//!     .await?;
//!
//! println!("{}", state.final_report().unwrap_or_default());
//! for failure in state.failures() {
//!     println!("- {}", failure);
//! }
//! ```
//!
//! [`ToolAnalysis`]: crate::types::ToolAnalysis
//! [`StageFailure`]: crate::types::StageFailure

/// Stage implementations and the per-candidate fan-out.
pub mod coordinator;
/// Run loop, global deadline and request handling.
pub mod pipeline;
/// Pipeline state and phase transitions.
pub mod state;

pub use coordinator::ResearchCoordinator;
pub use pipeline::ResearchPipeline;
pub use state::{PipelinePhase, ResearchState};
