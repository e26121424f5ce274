//! Pipeline driver
//!
//! Walks a [`ResearchState`] from `Init` to a terminal phase, one
//! [`ResearchCoordinator::step`] at a time, under an optional global
//! deadline.

use super::coordinator::ResearchCoordinator;
use super::state::{PipelinePhase, ResearchState};
use crate::evidence::EvidenceGateway;
use crate::llm::LLMClient;
use crate::types::{ResearchQuery, ResearchRequest, ResearchResponse, Result};
use crate::utils::toml_config::PipelineConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub struct ResearchPipeline {
    coordinator: ResearchCoordinator,
}

impl ResearchPipeline {
    pub fn new(gateway: Arc<dyn EvidenceGateway>, llm: Arc<dyn LLMClient>) -> Self {
        Self {
            coordinator: ResearchCoordinator::new(gateway, llm),
        }
    }

    /// Research `query` to completion.
    ///
    /// Fails only when the query is blank or candidate extraction fails;
    /// every other problem is recorded in the returned state.
    pub async fn run(&self, query: &str, config: &PipelineConfig) -> Result<ResearchState> {
        self.run_with_cancellation(query, config, CancellationToken::new())
            .await
    }

    /// Like [`ResearchPipeline::run`], stopping early when `cancel` fires.
    ///
    /// Cancellation after extraction still yields a report built from the
    /// work that finished.
    pub async fn run_with_cancellation(
        &self,
        query: &str,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Result<ResearchState> {
        let query = ResearchQuery::new(query)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("research", %run_id, query = %query);

        async move {
            let run_token = cancel.child_token();
            let _deadline = config.global_timeout().map(|limit| {
                let token = run_token.clone();
                AbortOnDropHandle::new(tokio::spawn(async move {
                    tokio::time::sleep(limit).await;
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "global deadline reached, cancelling in-flight work"
                    );
                    token.cancel();
                }))
            });

            let mut phase = PipelinePhase::Init;
            let mut state = ResearchState::new(query);

            while !phase.is_terminal() {
                match self.coordinator.step(phase, state, config, &run_token).await {
                    Ok((next, next_state)) => {
                        phase = next;
                        state = next_state;
                    }
                    Err(e) => {
                        error!(phase = %PipelinePhase::Failed, error = %e, "research run failed");
                        return Err(e);
                    }
                }
            }

            info!(
                candidates = state.candidates().len(),
                analyses = state.analyses().len(),
                failures = state.failures().len(),
                "research complete"
            );
            Ok(state)
        }
        .instrument(span)
        .await
    }

    /// Serve a [`ResearchRequest`], applying its overrides on top of `config`
    pub async fn execute(
        &self,
        request: &ResearchRequest,
        config: &PipelineConfig,
    ) -> Result<ResearchResponse> {
        self.execute_with_cancellation(request, config, CancellationToken::new())
            .await
    }

    pub async fn execute_with_cancellation(
        &self,
        request: &ResearchRequest,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Result<ResearchResponse> {
        let config = config.with_request(request)?;
        self.run_with_cancellation(&request.query, &config, cancel)
            .await
            .map(ResearchState::into_response)
    }
}
