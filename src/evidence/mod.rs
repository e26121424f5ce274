//! Evidence Gateway
//!
//! A thin, swappable boundary over a web search + page fetch provider.
//! Implementations never retry; every provider problem comes back as an
//! [`EvidenceError`] and the research coordinator decides what to do with it.

/// daedra-backed gateway (DuckDuckGo search, HTML to markdown fetch).
pub mod search;

use crate::types::{EvidenceError, PageContent, SourceRef};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

pub use search::{DaedraGateway, GatewayLimits};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvidenceGateway: Send + Sync {
    /// Search for `query`, returning at most `max_results` hits in rank order.
    ///
    /// An empty result is not an error.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SourceRef>, EvidenceError>;

    /// Fetch a page and return its text content
    async fn fetch(&self, url: &str) -> Result<PageContent, EvidenceError>;
}

/// Run `call` with a deadline, mapping expiry to [`EvidenceError::Timeout`]
pub async fn with_timeout<T, F>(
    operation: impl Into<String>,
    limit: Duration,
    call: F,
) -> Result<T, EvidenceError>
where
    F: Future<Output = Result<T, EvidenceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(EvidenceError::Timeout {
            operation: operation.into(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_maps_elapsed() {
        let result: Result<(), EvidenceError> =
            with_timeout("fetch https://slow.example", Duration::from_millis(250), async {
                std::future::pending().await
            })
            .await;

        assert_eq!(
            result,
            Err(EvidenceError::Timeout {
                operation: "fetch https://slow.example".to_string(),
                timeout_ms: 250,
            })
        );
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let result = with_timeout("search", Duration::from_secs(1), async {
            Err::<(), _>(EvidenceError::RateLimited("429".to_string()))
        })
        .await;
        assert!(matches!(result, Err(EvidenceError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_mock_gateway_records_calls() {
        let mut gateway = MockEvidenceGateway::new();
        gateway
            .expect_search()
            .times(1)
            .returning(|_, _| Ok(vec![]));
        gateway.expect_fetch().never();

        let hits = gateway.search("Supabase official site", 2).await.unwrap();
        assert!(hits.is_empty());
    }
}
