//! Research state threaded through the pipeline
//!
//! Stages take a [`ResearchState`] by value and hand back a new one. The
//! mutators are crate-private and only ever append, so a caller holding a
//! terminal state can trust that nothing an earlier stage wrote was undone.

use crate::types::{
    CandidateTool, PageContent, ResearchQuery, ResearchResponse, Stage, StageFailure,
    ToolAnalysis,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Position of the pipeline in its forward-only lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    Init,
    Extracting,
    Researching,
    Analyzing,
    Aggregating,
    Done,
    Failed,
}

impl PipelinePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Failed)
    }

    /// Phase that follows a successful stage.
    ///
    /// Zero candidates and cancellation both skip straight to aggregation:
    /// there is nothing left to fan out over.
    pub fn next(self, state: &ResearchState, cancelled: bool) -> PipelinePhase {
        match self {
            PipelinePhase::Init => PipelinePhase::Extracting,
            PipelinePhase::Extracting if state.candidates().is_empty() || cancelled => {
                PipelinePhase::Aggregating
            }
            PipelinePhase::Extracting => PipelinePhase::Researching,
            PipelinePhase::Researching if cancelled => PipelinePhase::Aggregating,
            PipelinePhase::Researching => PipelinePhase::Analyzing,
            PipelinePhase::Analyzing => PipelinePhase::Aggregating,
            PipelinePhase::Aggregating | PipelinePhase::Done => PipelinePhase::Done,
            PipelinePhase::Failed => PipelinePhase::Failed,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Init => "init",
            PipelinePhase::Extracting => "extracting",
            PipelinePhase::Researching => "researching",
            PipelinePhase::Analyzing => "analyzing",
            PipelinePhase::Aggregating => "aggregating",
            PipelinePhase::Done => "done",
            PipelinePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchState {
    query: ResearchQuery,
    candidates: Vec<CandidateTool>,
    evidence: BTreeMap<String, Vec<PageContent>>,
    analyses: Vec<ToolAnalysis>,
    failures: Vec<StageFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_report: Option<String>,
}

impl ResearchState {
    pub fn new(query: ResearchQuery) -> Self {
        Self {
            query,
            candidates: Vec::new(),
            evidence: BTreeMap::new(),
            analyses: Vec::new(),
            failures: Vec::new(),
            final_report: None,
        }
    }

    pub fn query(&self) -> &ResearchQuery {
        &self.query
    }

    pub fn candidates(&self) -> &[CandidateTool] {
        &self.candidates
    }

    /// Evidence gathered for one candidate; empty if none
    pub fn evidence_for(&self, candidate: &str) -> &[PageContent] {
        self.evidence
            .get(candidate)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn analyses(&self) -> &[ToolAnalysis] {
        &self.analyses
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    pub fn final_report(&self) -> Option<&str> {
        self.final_report.as_deref()
    }

    pub fn has_candidate(&self, name: &str) -> bool {
        self.candidates.iter().any(|c| c.name == name)
    }

    /// Whether a failure at `stage` was already recorded for `candidate`
    pub fn has_failure(&self, stage: Stage, candidate: &str) -> bool {
        self.failures
            .iter()
            .any(|f| f.stage == stage && f.candidate.as_deref() == Some(candidate))
    }

    /// Candidates with at least one per-candidate failure, in candidate order
    pub fn failed_candidates(&self) -> Vec<&str> {
        let failed: BTreeSet<&str> = self
            .failures
            .iter()
            .filter(|f| matches!(f.stage, Stage::Research | Stage::Analyze))
            .filter_map(|f| f.candidate.as_deref())
            .collect();

        self.candidates
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| failed.contains(name))
            .collect()
    }

    /// Number of candidates that ended up either analyzed or in the failure log
    pub fn accounted_candidates(&self) -> usize {
        let failed: BTreeSet<&str> = self.failed_candidates().into_iter().collect();
        self.candidates
            .iter()
            .filter(|c| {
                failed.contains(c.name.as_str()) || self.analyses.iter().any(|a| a.name == c.name)
            })
            .count()
    }

    /// One line explaining partial results, if there are any
    pub fn failure_summary(&self) -> Option<String> {
        let failed = self.failed_candidates().len();
        if failed == 0 {
            return None;
        }
        Some(format!(
            "{} of {} tools could not be researched",
            failed,
            self.candidates.len()
        ))
    }

    /// Project the terminal state onto the public response shape
    pub fn into_response(self) -> ResearchResponse {
        ResearchResponse {
            final_report: self.final_report.unwrap_or_default(),
            analyses: self.analyses,
            failures: self.failures,
        }
    }

    pub(crate) fn with_candidates(mut self, candidates: Vec<CandidateTool>) -> Self {
        debug_assert!(
            self.candidates.is_empty(),
            "candidates are written once by the extract stage"
        );
        self.candidates = candidates;
        self
    }

    pub(crate) fn with_evidence(mut self, candidate: &str, pages: Vec<PageContent>) -> Self {
        debug_assert!(self.has_candidate(candidate));
        self.evidence.entry(candidate.to_string()).or_default().extend(pages);
        self
    }

    pub(crate) fn with_analysis(mut self, analysis: ToolAnalysis) -> Self {
        debug_assert!(self.has_candidate(&analysis.name));
        self.analyses.push(analysis);
        self
    }

    pub(crate) fn with_failure(mut self, failure: StageFailure) -> Self {
        self.failures.push(failure);
        self
    }

    pub(crate) fn with_final_report(mut self, report: String) -> Self {
        debug_assert!(self.final_report.is_none(), "final report is written once");
        self.final_report = Some(report);
        self
    }
}
