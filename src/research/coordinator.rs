//! Stage implementations for the research pipeline
//!
//! Research and Analyze fan out one task per candidate on a [`JoinSet`],
//! bounded by a per-stage [`Semaphore`]. Each task owns its own slot; results
//! are written back into the state in candidate order once the set is
//! drained, so completion order never leaks into the output.

use super::state::{PipelinePhase, ResearchState};
use crate::evidence::{with_timeout, EvidenceGateway};
use crate::extraction::prompts::{CANDIDATE_EXTRACTION, RECOMMENDATION, TOOL_ANALYSIS};
use crate::extraction::{CandidateList, ExtractionService, Recommendation};
use crate::llm::LLMClient;
use crate::types::{
    AppError, CandidateTool, EvidenceError, ExtractionError, PageContent, Result, Stage,
    StageFailure, ToolAnalysis, NO_EVIDENCE,
};
use crate::utils::toml_config::PipelineConfig;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reason recorded for work cut short by cancellation
pub const CANCELLED: &str = "cancelled before completion";

/// Reason recorded for researched candidates the run never got to analyze
pub const NOT_ANALYZED: &str = "cancelled before analysis";

/// Characters of each context article passed to candidate extraction
const CONTEXT_CHARS_PER_ARTICLE: usize = 1500;

/// Drives one research run through its stages
pub struct ResearchCoordinator {
    gateway: Arc<dyn EvidenceGateway>,
    llm: Arc<dyn LLMClient>,
}

impl ResearchCoordinator {
    pub fn new(gateway: Arc<dyn EvidenceGateway>, llm: Arc<dyn LLMClient>) -> Self {
        Self { gateway, llm }
    }

    fn extractor(&self, config: &PipelineConfig) -> ExtractionService {
        ExtractionService::new(Arc::clone(&self.llm), config.call_timeout())
    }

    /// Run the stage that belongs to `phase` and compute the next phase.
    ///
    /// Only extraction can fail; every later stage records its problems in
    /// the state instead.
    pub async fn step(
        &self,
        phase: PipelinePhase,
        state: ResearchState,
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> Result<(PipelinePhase, ResearchState)> {
        let state = match phase {
            PipelinePhase::Init => self.extract(state, config, cancel).await?,
            PipelinePhase::Extracting if !state.candidates().is_empty() => {
                self.research(state, config, cancel).await
            }
            PipelinePhase::Researching => self.analyze(state, config, cancel).await,
            PipelinePhase::Aggregating => self.aggregate(state, config).await,
            _ => state,
        };

        let next = phase.next(&state, cancel.is_cancelled());
        debug!(from = %phase, to = %next, "phase transition");
        Ok((next, state))
    }

    /// Turn the query into a ranked, de-duplicated candidate list
    pub async fn extract(
        &self,
        state: ResearchState,
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> Result<ResearchState> {
        let cancelled = || {
            AppError::ExtractionFailed(ExtractionError::GenerationFailed {
                reason: "pipeline cancelled before candidates were extracted".to_string(),
            })
        };

        info!("extracting candidate tools");

        let (state, context) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            gathered = self.gather_context(state, config) => gathered,
        };

        let inputs = HashMap::from([
            ("query".to_string(), state.query().to_string()),
            (
                "context".to_string(),
                if context.is_empty() {
                    "(no articles available)".to_string()
                } else {
                    context
                },
            ),
        ]);

        let extractor = self.extractor(config);
        let list: CandidateList = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            result = extractor.generate(&CANDIDATE_EXTRACTION, &inputs) => {
                result.map_err(AppError::ExtractionFailed)?
            }
        };

        let candidates = normalize_candidates(list.candidates, config.max_candidates);
        info!(
            count = candidates.len(),
            names = ?candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "candidates extracted"
        );

        Ok(state.with_candidates(candidates))
    }

    /// Read a few comparison articles to ground extraction.
    ///
    /// Problems here are recorded and otherwise ignored.
    async fn gather_context(
        &self,
        mut state: ResearchState,
        config: &PipelineConfig,
    ) -> (ResearchState, String) {
        if config.extract_context_sources == 0 {
            return (state, String::new());
        }

        let query = format!("{} tools comparison best alternatives", state.query());
        let limit = config.call_timeout();
        let hits = match with_timeout(
            format!("search '{}'", query),
            limit,
            self.gateway.search(&query, config.extract_context_sources),
        )
        .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "context search failed");
                let failure = StageFailure::for_stage(Stage::Extract, e.to_string());
                return (state.with_failure(failure), String::new());
            }
        };

        let urls = distinct_urls(
            hits.iter().map(|h| h.url.as_str()),
            config.extract_context_sources,
        );
        let fetches = urls.iter().map(|url| {
            with_timeout(format!("fetch {}", url), limit, self.gateway.fetch(url))
        });
        let pages = futures::future::join_all(fetches).await;

        let mut context = String::new();
        for page in pages {
            match page {
                Ok(page) => {
                    context.push_str(&truncate_chars(&page.text, CONTEXT_CHARS_PER_ARTICLE));
                    context.push_str("\n\n");
                }
                Err(e) => {
                    warn!(error = %e, "context article skipped");
                    state =
                        state.with_failure(StageFailure::for_stage(Stage::Extract, e.to_string()));
                }
            }
        }

        debug!(articles = urls.len(), chars = context.len(), "context gathered");
        (state, context.trim_end().to_string())
    }

    /// Gather web evidence for every candidate in parallel
    pub async fn research(
        &self,
        state: ResearchState,
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> ResearchState {
        let candidates = state.candidates().to_vec();
        info!(
            candidates = candidates.len(),
            concurrency = config.research_concurrency,
            "researching candidates"
        );

        let limiter = Arc::new(Semaphore::new(config.research_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (slot, candidate) in candidates.iter().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            let plan = EvidencePlan {
                query: search_query(&candidate.name, &config.search_suffix),
                max_sources: config.max_sources_per_candidate,
                call_timeout: config.call_timeout(),
            };

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(CANCELLED.to_string()),
                    outcome = async {
                        let _permit = limiter
                            .acquire_owned()
                            .await
                            .map_err(|_| "research pool closed".to_string())?;
                        gather_evidence(gateway.as_ref(), &plan)
                            .await
                            .map_err(|e| e.to_string())
                    } => outcome,
                };
                (slot, outcome)
            });
        }

        let slots = collect_slots(tasks, candidates.len()).await;

        let mut state = state;
        for (candidate, slot) in candidates.iter().zip(slots) {
            let name = candidate.name.as_str();
            match slot {
                Some(Ok(pages)) => {
                    debug!(candidate = name, pages = pages.len(), "evidence gathered");
                    state = state.with_evidence(name, pages);
                }
                Some(Err(reason)) => {
                    warn!(candidate = name, %reason, "research failed");
                    state = state
                        .with_evidence(name, Vec::new())
                        .with_failure(StageFailure::for_candidate(Stage::Research, name, reason));
                }
                None => {
                    state = state.with_evidence(name, Vec::new()).with_failure(
                        StageFailure::for_candidate(Stage::Research, name, "research task aborted"),
                    );
                }
            }
        }

        state
    }

    /// Analyze every researched candidate in parallel
    pub async fn analyze(
        &self,
        state: ResearchState,
        config: &PipelineConfig,
        cancel: &CancellationToken,
    ) -> ResearchState {
        let candidates = state.candidates().to_vec();
        let extractor = self.extractor(config);
        let limiter = Arc::new(Semaphore::new(config.analyze_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (slot, candidate) in candidates.iter().enumerate() {
            let evidence = state.evidence_for(&candidate.name);
            if state.has_failure(Stage::Research, &candidate.name) || evidence.is_empty() {
                continue;
            }

            let inputs = HashMap::from([
                ("name".to_string(), candidate.name.clone()),
                (
                    "evidence".to_string(),
                    evidence_digest(evidence, config.max_evidence_chars),
                ),
            ]);
            let extractor = extractor.clone();
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(CANCELLED.to_string()),
                    outcome = async {
                        let _permit = limiter
                            .acquire_owned()
                            .await
                            .map_err(|_| "analysis pool closed".to_string())?;
                        extractor
                            .generate::<ToolAnalysis>(&TOOL_ANALYSIS, &inputs)
                            .await
                            .map_err(|e| e.to_string())
                    } => outcome,
                };
                (slot, outcome)
            });
        }

        info!(
            analyses = tasks.len(),
            concurrency = config.analyze_concurrency,
            "analyzing candidates"
        );

        let slots = collect_slots(tasks, candidates.len()).await;

        let mut state = state;
        for (candidate, slot) in candidates.iter().zip(slots) {
            let name = candidate.name.as_str();
            if state.has_failure(Stage::Research, name) {
                continue;
            }
            if state.evidence_for(name).is_empty() {
                info!(candidate = name, "no evidence to analyze");
                state = state.with_failure(StageFailure::for_candidate(Stage::Analyze, name, NO_EVIDENCE));
                continue;
            }

            match slot {
                Some(Ok(mut analysis)) => {
                    analysis.name = name.to_string();
                    analysis.website = state
                        .evidence_for(name)
                        .first()
                        .map(|page| page.url.clone())
                        .unwrap_or_default();
                    debug!(candidate = name, confidence = analysis.confidence, "analysis complete");
                    state = state.with_analysis(analysis);
                }
                Some(Err(reason)) => {
                    warn!(candidate = name, %reason, "analysis failed");
                    state = state.with_failure(StageFailure::for_candidate(Stage::Analyze, name, reason));
                }
                None => {
                    state = state.with_failure(StageFailure::for_candidate(
                        Stage::Analyze,
                        name,
                        "analysis task aborted",
                    ));
                }
            }
        }

        state
    }

    /// Produce the final report from whatever analyses survived
    pub async fn aggregate(&self, state: ResearchState, config: &PipelineConfig) -> ResearchState {
        let state = settle_unaccounted(state);

        if state.analyses().is_empty() {
            info!("no analyses available, skipping recommendation call");
            let report = no_results_report(&state);
            return state.with_final_report(report);
        }

        info!(analyses = state.analyses().len(), "aggregating recommendation");

        let inputs = HashMap::from([
            ("query".to_string(), state.query().to_string()),
            ("analyses".to_string(), format_analyses(state.analyses())),
        ]);

        match self
            .extractor(config)
            .generate::<Recommendation>(&RECOMMENDATION, &inputs)
            .await
        {
            Ok(recommendation) => state.with_final_report(recommendation.report.trim().to_string()),
            Err(e) => {
                error!(error = %e, "recommendation failed, falling back to a local summary");
                let report = fallback_report(&state);
                state
                    .with_failure(StageFailure::for_stage(Stage::Aggregate, e.to_string()))
                    .with_final_report(report)
            }
        }
    }
}

/// Inputs for one candidate's evidence gathering
struct EvidencePlan {
    query: String,
    max_sources: usize,
    call_timeout: std::time::Duration,
}

/// Search, then fetch the top hits concurrently.
///
/// Any provider error fails the whole candidate except an oversized page,
/// which is dropped on its own.
async fn gather_evidence(
    gateway: &dyn EvidenceGateway,
    plan: &EvidencePlan,
) -> std::result::Result<Vec<PageContent>, EvidenceError> {
    let hits = with_timeout(
        format!("search '{}'", plan.query),
        plan.call_timeout,
        gateway.search(&plan.query, plan.max_sources),
    )
    .await?;

    let urls = distinct_urls(hits.iter().map(|h| h.url.as_str()), plan.max_sources);
    let fetches = urls.iter().map(|url| {
        with_timeout(format!("fetch {}", url), plan.call_timeout, gateway.fetch(url))
    });
    let results = futures::future::join_all(fetches).await;

    let mut pages = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(page) => pages.push(page),
            Err(EvidenceError::ContentTooLarge { url, size, limit }) => {
                warn!(%url, size, limit, "page too large, skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(pages)
}

/// Drain `tasks` into per-candidate slots; a panicked task leaves `None`
async fn collect_slots<T: Send + 'static>(
    mut tasks: JoinSet<(usize, T)>,
    len: usize,
) -> Vec<Option<T>> {
    let mut slots: Vec<Option<T>> = (0..len).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((slot, outcome)) => {
                if let Some(entry) = slots.get_mut(slot) {
                    *entry = Some(outcome);
                }
            }
            Err(e) => error!("candidate task failed: {}", e),
        }
    }
    slots
}

/// Trim names, drop blanks and case-insensitive duplicates, keep the first `max`
pub fn normalize_candidates(candidates: Vec<CandidateTool>, max: usize) -> Vec<CandidateTool> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|c| {
            let name = c.name.trim().to_string();
            if name.is_empty() || !seen.insert(name.to_lowercase()) {
                return None;
            }
            Some(CandidateTool {
                name,
                rationale: c.rationale.trim().to_string(),
            })
        })
        .take(max)
        .collect()
}

fn search_query(name: &str, suffix: &str) -> String {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, suffix)
    }
}

fn distinct_urls<'a>(urls: impl Iterator<Item = &'a str>, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.map(str::trim)
        .filter(|url| !url.is_empty() && seen.insert(url.to_string()))
        .take(max)
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Evidence pages flattened into prompt text, capped at `max_chars`
fn evidence_digest(pages: &[PageContent], max_chars: usize) -> String {
    let digest = pages
        .iter()
        .map(|page| format!("Source: {}\n{}", page.url, page.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&digest, max_chars)
}

/// Record a failure for every candidate that is neither analyzed nor failed
fn settle_unaccounted(mut state: ResearchState) -> ResearchState {
    let pending: Vec<(String, bool)> = state
        .candidates()
        .iter()
        .filter(|c| {
            !state.failed_candidates().contains(&c.name.as_str())
                && !state.analyses().iter().any(|a| a.name == c.name)
        })
        .map(|c| (c.name.clone(), state.evidence_for(&c.name).is_empty()))
        .collect();

    for (name, no_evidence) in pending {
        let reason = if no_evidence { NO_EVIDENCE } else { NOT_ANALYZED };
        state = state.with_failure(StageFailure::for_candidate(Stage::Analyze, &name, reason));
    }
    state
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Analyses rendered as plain text for the recommendation prompt
fn format_analyses(analyses: &[ToolAnalysis]) -> String {
    analyses
        .iter()
        .map(|a| {
            format!(
                "Tool: {}\nWebsite: {}\nDescription: {}\nPricing model: {}\n\
                 Open source: {}\nAPI available: {}\nTech stack: {}\n\
                 Language support: {}\nIntegration notes: {}\nConfidence: {:.2}",
                a.name,
                or_placeholder(&a.website, "unknown"),
                or_placeholder(&a.description, "none"),
                a.pricing_model,
                yes_no(a.is_open_source),
                yes_no(a.api_available),
                join_or_unknown(&a.tech_stack),
                join_or_unknown(&a.language_support),
                or_placeholder(&a.integration_notes, "none"),
                a.confidence
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn join_or_unknown(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        "unknown".to_string()
    } else {
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn summary_line(analysis: &ToolAnalysis) -> String {
    format!(
        "- **{}**: {} pricing, {}, {}, confidence {:.2}",
        analysis.name,
        analysis.pricing_model,
        if analysis.is_open_source {
            "open source"
        } else {
            "closed source"
        },
        if analysis.api_available {
            "API available"
        } else {
            "no public API"
        },
        analysis.confidence
    )
}

/// Report used when the recommendation call itself failed
fn fallback_report(state: &ResearchState) -> String {
    let mut report = format!(
        "A recommendation could not be generated for \"{}\". Analyzed tools:\n\n",
        state.query()
    );
    report.push_str(
        &state
            .analyses()
            .iter()
            .map(summary_line)
            .collect::<Vec<_>>()
            .join("\n"),
    );
    report
}

/// Report used when nothing could be analyzed
fn no_results_report(state: &ResearchState) -> String {
    if state.candidates().is_empty() {
        return format!(
            "No usable results for \"{}\": no candidate tools were identified.",
            state.query()
        );
    }

    let mut report = format!(
        "No usable results for \"{}\": none of the {} candidate tools could be analyzed.\n",
        state.query(),
        state.candidates().len()
    );
    for failure in state.failures().iter().filter(|f| f.candidate.is_some()) {
        report.push_str(&format!("\n- {}", failure));
    }
    report
}
