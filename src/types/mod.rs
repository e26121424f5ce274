use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============= Research Input =============

/// The free-text research question. Never blank, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResearchQuery(String);

impl ResearchQuery {
    /// Create a query, rejecting blank input
    pub fn new(query: impl Into<String>) -> Result<Self> {
        let query = query.into();
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidInput(
                "research query must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============= Pipeline Records =============

/// A tool or company identified as relevant to the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTool {
    /// Product or company name, e.g. "Supabase"
    pub name: String,
    /// One sentence on why the tool matches the query
    #[serde(default)]
    pub rationale: String,
}

/// One search hit for a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Text of a fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub url: String,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PricingModel {
    Free,
    Freemium,
    Paid,
    #[default]
    Unknown,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::Free => "free",
            PricingModel::Freemium => "freemium",
            PricingModel::Paid => "paid",
            PricingModel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PricingModel {
    type Err = std::convert::Infallible;

    /// Models are inconsistent about casing and wording; anything
    /// unrecognised maps to `Unknown`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "free" | "open source" | "open-source" => PricingModel::Free,
            "freemium" | "free tier" | "free-tier" => PricingModel::Freemium,
            "paid" | "commercial" | "enterprise" | "subscription" => PricingModel::Paid,
            _ => PricingModel::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for PricingModel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        // FromStr is infallible
        Ok(raw.parse().unwrap_or_default())
    }
}

/// Structured analysis of one candidate, produced from its evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnalysis {
    /// Name of the analyzed tool
    pub name: String,
    /// Homepage, taken from the top search hit rather than the model
    #[serde(default)]
    #[schemars(skip)]
    pub website: String,
    /// One sentence on what the tool is
    #[serde(default)]
    pub description: String,
    /// How the tool is priced
    pub pricing_model: PricingModel,
    /// Whether the source code is published under an open source license
    pub is_open_source: bool,
    /// Whether the tool exposes a public API or SDK
    pub api_available: bool,
    /// Programming languages with official SDKs or first-class support
    #[serde(default)]
    pub language_support: BTreeSet<String>,
    /// Languages, frameworks and infrastructure the tool is built on
    #[serde(default)]
    pub tech_stack: BTreeSet<String>,
    /// Short notes on how the tool integrates with other systems
    #[serde(default)]
    pub integration_notes: String,
    /// Confidence in this analysis given the evidence, between 0 and 1
    pub confidence: f32,
}

/// Pipeline stage that recorded a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Research,
    Analyze,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Research => "research",
            Stage::Analyze => "analyze",
            Stage::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Non-fatal failure recorded in the append-only failure log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailure {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    pub reason: String,
}

impl StageFailure {
    pub fn for_candidate(stage: Stage, candidate: &str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            candidate: Some(candidate.to_string()),
            reason: reason.into(),
        }
    }

    pub fn for_stage(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            candidate: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.candidate {
            Some(candidate) => write!(f, "[{}] {}: {}", self.stage, candidate, self.reason),
            None => write!(f, "[{}] {}", self.stage, self.reason),
        }
    }
}

/// Reason recorded when a candidate reaches Analyze without any evidence
pub const NO_EVIDENCE: &str = "no evidence";

// ============= API Request/Response Types =============

/// Inbound research request. Unset limits fall back to the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sources_per_candidate: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_candidates: None,
            max_sources_per_candidate: None,
            concurrency: None,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResponse {
    pub final_report: String,
    pub analyses: Vec<ToolAnalysis>,
    pub failures: Vec<StageFailure>,
}

// ============= Error Types =============

/// Failures surfaced by the search/fetch provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvidenceError {
    #[error("search provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("search provider rate limited the request: {0}")]
    RateLimited(String),

    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("page {url} is {size} bytes, above the {limit} byte limit")]
    ContentTooLarge { url: String, size: usize, limit: usize },
}

/// Failures surfaced by the structured generation call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("generation failed: {reason}")]
    GenerationFailed { reason: String },

    #[error("model output did not match the expected schema: {}", errors.join("; "))]
    SchemaValidationFailed { raw: String, errors: Vec<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The only fatal pipeline error: no candidates means nothing to research
    #[error("candidate extraction failed: {0}")]
    ExtractionFailed(#[source] ExtractionError),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
