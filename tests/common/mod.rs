//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod mocks;

use toolscout::PipelineConfig;

/// Pipeline configuration without the article-context pass, so tests only
/// see the calls the stages under test make
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        extract_context_sources: 0,
        ..PipelineConfig::default()
    }
}

pub const FIREBASE_QUERY: &str = "open source alternatives to Firebase";
