//! Search and fetch implementation using daedra
//!
//! daedra uses DuckDuckGo as the search backend and converts fetched pages
//! to markdown, which is what the analysis prompts want.

use super::{with_timeout, EvidenceGateway};
use crate::types::{EvidenceError, PageContent, SourceRef};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

/// Size and time ceilings applied to every provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayLimits {
    /// Pages larger than this are rejected with `ContentTooLarge`
    pub max_content_bytes: usize,
    /// Upper bound for a single search or fetch request
    pub request_timeout: Duration,
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self {
            max_content_bytes: 2 * 1024 * 1024,
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Web evidence gateway powered by daedra
pub struct DaedraGateway {
    limits: GatewayLimits,
}

impl DaedraGateway {
    pub fn new(limits: GatewayLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> GatewayLimits {
        self.limits
    }
}

impl Default for DaedraGateway {
    fn default() -> Self {
        Self::new(GatewayLimits::default())
    }
}

/// Quota errors are only distinguishable by their message
fn classify_search_error(message: String) -> EvidenceError {
    let lowered = message.to_lowercase();
    if lowered.contains("429") || lowered.contains("rate limit") || lowered.contains("too many") {
        EvidenceError::RateLimited(message)
    } else {
        EvidenceError::ProviderUnavailable(message)
    }
}

fn check_size(url: &str, text: &str, limit: usize) -> Result<(), EvidenceError> {
    if text.len() > limit {
        return Err(EvidenceError::ContentTooLarge {
            url: url.to_string(),
            size: text.len(),
            limit,
        });
    }
    Ok(())
}

#[async_trait]
impl EvidenceGateway for DaedraGateway {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SourceRef>, EvidenceError> {
        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: max_results,
                ..Default::default()
            }),
        };

        let response = with_timeout(
            format!("search '{}'", query),
            self.limits.request_timeout,
            async {
                daedra::tools::search::perform_search(&search_args)
                    .await
                    .map_err(|e| classify_search_error(e.to_string()))
            },
        )
        .await?;

        let hits: Vec<SourceRef> = response
            .data
            .iter()
            .take(max_results)
            .map(|r| SourceRef {
                url: r.url.clone(),
                title: r.title.clone(),
                snippet: r.description.clone(),
            })
            .collect();

        debug!(query, hits = hits.len(), "search completed");
        Ok(hits)
    }

    async fn fetch(&self, url: &str) -> Result<PageContent, EvidenceError> {
        let fetch_args = daedra::VisitPageArgs {
            url: url.to_string(),
            include_images: false,
            selector: None,
        };

        let page = with_timeout(
            format!("fetch {}", url),
            self.limits.request_timeout,
            async {
                daedra::tools::fetch::fetch_page(&fetch_args)
                    .await
                    .map_err(|e| EvidenceError::FetchFailed {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })
            },
        )
        .await?;

        check_size(url, &page.content, self.limits.max_content_bytes)?;

        debug!(url, bytes = page.content.len(), "page fetched");
        Ok(PageContent {
            url: page.url,
            text: page.content,
            fetched_at: Utc::now(),
        })
    }
}
