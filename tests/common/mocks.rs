//! Scripted LLM client and evidence gateway.
//!
//! Both mocks are driven by per-tool scripts and record every call they
//! receive, so tests can assert on call counts and peak concurrency
//! without touching the network.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use toolscout::extraction::prompts;
use toolscout::types::{AppError, EvidenceError, PageContent, Result, SourceRef};
use toolscout::{EvidenceGateway, LLMClient};

/// What a scripted call does
#[derive(Clone, Debug)]
pub enum Reply {
    Text(String),
    Fail(String),
    /// Never resolves
    Hang,
}

/// Tracks how many calls are running at once
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// JSON a model would return for one tool
pub fn analysis_json(name: &str, pricing: &str, open_source: bool, confidence: f32) -> String {
    serde_json::json!({
        "name": name,
        "description": format!("{} is a hosted backend platform", name),
        "pricingModel": pricing,
        "isOpenSource": open_source,
        "apiAvailable": true,
        "languageSupport": ["JavaScript", "Dart"],
        "techStack": ["PostgreSQL"],
        "integrationNotes": format!("{} integrates over REST", name),
        "confidence": confidence,
    })
    .to_string()
}

/// JSON a model would return for candidate extraction
pub fn candidates_json(names: &[&str]) -> String {
    let candidates: Vec<_> = names
        .iter()
        .map(|name| serde_json::json!({ "name": name, "rationale": format!("{} fits", name) }))
        .collect();
    serde_json::json!({ "candidates": candidates }).to_string()
}

/// LLM client that answers each prompt template from a script
pub struct ScriptedLLMClient {
    candidates: Reply,
    analyses: HashMap<String, Reply>,
    analysis_delay: Duration,
    recommendation: Reply,
    calls: Mutex<Vec<(String, String)>>,
    pub analysis_in_flight: InFlight,
}

impl ScriptedLLMClient {
    /// Extract `names`; every analysis succeeds with a freemium answer
    pub fn new(names: &[&str]) -> Self {
        Self {
            candidates: Reply::Text(candidates_json(names)),
            analyses: HashMap::new(),
            analysis_delay: Duration::ZERO,
            recommendation: Reply::Text(
                r#"{"report": "Supabase is the best fit: Postgres based and open source."}"#
                    .to_string(),
            ),
            calls: Mutex::new(Vec::new()),
            analysis_in_flight: InFlight::default(),
        }
    }

    pub fn with_candidates_reply(mut self, reply: Reply) -> Self {
        self.candidates = reply;
        self
    }

    pub fn with_analysis(mut self, name: &str, reply: Reply) -> Self {
        self.analyses.insert(name.to_string(), reply);
        self
    }

    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    pub fn with_recommendation(mut self, reply: Reply) -> Self {
        self.recommendation = reply;
        self
    }

    /// Template names of every call received, in arrival order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn call_count(&self, template: &str) -> usize {
        self.calls.lock().iter().filter(|(name, _)| name == template).count()
    }

    /// Rendered user prompts sent with `template`, in arrival order
    pub fn prompts_for(&self, template: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == template)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    fn record(&self, template: &str, prompt: &str) {
        self.calls
            .lock()
            .push((template.to_string(), prompt.to_string()));
    }

    async fn answer(reply: Reply) -> Result<String> {
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(reason) => Err(AppError::LLM(reason)),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        if system == prompts::CANDIDATE_EXTRACTION.system {
            self.record(prompts::CANDIDATE_EXTRACTION.name, prompt);
            return Self::answer(self.candidates.clone()).await;
        }

        if system == prompts::RECOMMENDATION.system {
            self.record(prompts::RECOMMENDATION.name, prompt);
            return Self::answer(self.recommendation.clone()).await;
        }

        if system == prompts::TOOL_ANALYSIS.system {
            self.record(prompts::TOOL_ANALYSIS.name, prompt);
            let name = prompt
                .strip_prefix("Tool: ")
                .and_then(|rest| rest.lines().next())
                .unwrap_or_default()
                .to_string();
            let reply = self
                .analyses
                .get(&name)
                .cloned()
                .unwrap_or_else(|| Reply::Text(analysis_json(&name, "freemium", true, 0.8)));

            self.analysis_in_flight.enter();
            tokio::time::sleep(self.analysis_delay).await;
            self.analysis_in_flight.leave();
            return Self::answer(reply).await;
        }

        Err(AppError::LLM(format!("unexpected system prompt: {}", system)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Evidence gateway serving scripted search hits and pages
#[derive(Default)]
pub struct ScriptedGateway {
    sources: HashMap<String, Vec<String>>,
    search_errors: HashMap<String, EvidenceError>,
    search_delays: HashMap<String, Duration>,
    default_search_delay: Duration,
    hanging_searches: Vec<String>,
    fetch_errors: HashMap<String, EvidenceError>,
    hanging_fetches: Vec<String>,
    searches: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
    pub search_in_flight: InFlight,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches for `tool` return these URLs
    pub fn with_sources(mut self, tool: &str, urls: &[&str]) -> Self {
        self.sources.insert(
            tool.to_string(),
            urls.iter().map(|u| u.to_string()).collect(),
        );
        self
    }

    pub fn with_search_error(mut self, tool: &str, err: EvidenceError) -> Self {
        self.search_errors.insert(tool.to_string(), err);
        self
    }

    pub fn with_search_delay(mut self, tool: &str, delay: Duration) -> Self {
        self.search_delays.insert(tool.to_string(), delay);
        self
    }

    pub fn with_default_search_delay(mut self, delay: Duration) -> Self {
        self.default_search_delay = delay;
        self
    }

    pub fn with_hanging_search(mut self, tool: &str) -> Self {
        self.hanging_searches.push(tool.to_string());
        self
    }

    pub fn with_fetch_error(mut self, url: &str, err: EvidenceError) -> Self {
        self.fetch_errors.insert(url.to_string(), err);
        self
    }

    pub fn with_hanging_fetch(mut self, url: &str) -> Self {
        self.hanging_fetches.push(url.to_string());
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }

    /// Script key for a query: the longest tool name the query starts with
    fn tool_for(&self, query: &str) -> Option<String> {
        self.sources
            .keys()
            .chain(self.search_errors.keys())
            .chain(self.search_delays.keys())
            .chain(self.hanging_searches.iter())
            .filter(|tool| query == tool.as_str() || query.starts_with(&format!("{} ", tool)))
            .max_by_key(|tool| tool.len())
            .cloned()
    }
}

pub fn fixed_page(url: &str) -> PageContent {
    PageContent {
        url: url.to_string(),
        text: format!("Documentation and pricing for {}", url),
        fetched_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    }
}

#[async_trait]
impl EvidenceGateway for ScriptedGateway {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<SourceRef>, EvidenceError> {
        self.searches.lock().push(query.to_string());
        let tool = self.tool_for(query);

        self.search_in_flight.enter();
        let delay = tool
            .as_ref()
            .and_then(|t| self.search_delays.get(t))
            .copied()
            .unwrap_or(self.default_search_delay);
        tokio::time::sleep(delay).await;
        self.search_in_flight.leave();

        let Some(tool) = tool else {
            return Ok(Vec::new());
        };
        if self.hanging_searches.contains(&tool) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.search_errors.get(&tool) {
            return Err(err.clone());
        }

        Ok(self
            .sources
            .get(&tool)
            .map(|urls| {
                urls.iter()
                    .take(max_results)
                    .map(|url| SourceRef {
                        url: url.clone(),
                        title: format!("{} - official site", tool),
                        snippet: String::new(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch(&self, url: &str) -> std::result::Result<PageContent, EvidenceError> {
        self.fetches.lock().push(url.to_string());

        if self.hanging_fetches.iter().any(|u| u == url) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.fetch_errors.get(url) {
            return Err(err.clone());
        }
        Ok(fixed_page(url))
    }
}
