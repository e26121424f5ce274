//! Structured extraction over an [`LLMClient`]
//!
//! [`ExtractionService::generate`] renders a [`PromptTemplate`], appends the
//! JSON schema of the requested output type, calls the model and parses the
//! reply back into that type. The same call shape serves every stage of the
//! research pipeline; only the template and the output type change.

/// Prompt templates for the research stages.
pub mod prompts;

use crate::llm::LLMClient;
use crate::types::{CandidateTool, ExtractionError, ToolAnalysis};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use prompts::PromptTemplate;

/// A type the model can be asked to produce
///
/// The JSON schema comes from `schemars`; `validate` adds the semantic
/// checks a schema cannot express.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send {
    /// Return one message per problem, empty when valid
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Candidate extraction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateList {
    /// Tools in order of relevance to the query, most relevant first
    pub candidates: Vec<CandidateTool>,
}

impl StructuredOutput for CandidateList {}

impl StructuredOutput for ToolAnalysis {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            errors.push(format!(
                "confidence must be between 0 and 1, got {}",
                self.confidence
            ));
        }
        errors
    }
}

/// Final aggregation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Markdown report comparing the tools and recommending one
    pub report: String,
}

impl StructuredOutput for Recommendation {
    fn validate(&self) -> Vec<String> {
        if self.report.trim().is_empty() {
            vec!["report must not be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Typed generation on top of a raw LLM client
#[derive(Clone)]
pub struct ExtractionService {
    llm: Arc<dyn LLMClient>,
    call_timeout: Duration,
}

impl ExtractionService {
    pub fn new(llm: Arc<dyn LLMClient>, call_timeout: Duration) -> Self {
        Self { llm, call_timeout }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Generate a `T` from `template` filled with `inputs`
    pub async fn generate<T: StructuredOutput>(
        &self,
        template: &PromptTemplate,
        inputs: &HashMap<String, String>,
    ) -> Result<T, ExtractionError> {
        let user_prompt = template
            .render(inputs)
            .map_err(|reason| ExtractionError::GenerationFailed { reason })?;
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(T)).map_err(|e| {
            ExtractionError::GenerationFailed {
                reason: format!("failed to render output schema: {}", e),
            }
        })?;
        let prompt = format!(
            "{}\n\nRespond with a single JSON object that conforms to this JSON schema. \
             Do not add any text outside the JSON.\n{}",
            user_prompt, schema
        );

        debug!(
            template = template.name,
            model = self.llm.model_name(),
            "structured generation"
        );

        let raw = match tokio::time::timeout(
            self.call_timeout,
            self.llm.generate_with_system(template.system, &prompt),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                return Err(ExtractionError::GenerationFailed {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ExtractionError::GenerationFailed {
                    reason: format!(
                        "{} call timed out after {}ms",
                        template.name,
                        self.call_timeout.as_millis()
                    ),
                })
            }
        };

        parse_structured(&raw)
    }
}

/// Parse and validate model output as `T`
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T, ExtractionError> {
    let invalid = |errors: Vec<String>| ExtractionError::SchemaValidationFailed {
        raw: raw.to_string(),
        errors,
    };

    let payload = json_payload(raw)
        .ok_or_else(|| invalid(vec!["response does not contain a JSON object".to_string()]))?;
    let value: T = serde_json::from_str(payload).map_err(|e| invalid(vec![e.to_string()]))?;

    let problems = value.validate();
    if !problems.is_empty() {
        return Err(invalid(problems));
    }
    Ok(value)
}

/// Locate the outermost JSON object, ignoring prose and markdown fences
fn json_payload(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppError, PricingModel, Result as AppResult};
    use async_trait::async_trait;
    use rstest::rstest;

    struct CannedClient {
        reply: std::result::Result<String, String>,
        delay: Duration,
    }

    #[async_trait]
    impl LLMClient for CannedClient {
        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> AppResult<String> {
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(AppError::LLM)
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn service(reply: std::result::Result<&str, &str>, delay: Duration) -> ExtractionService {
        ExtractionService::new(
            Arc::new(CannedClient {
                reply: reply.map(str::to_string).map_err(str::to_string),
                delay,
            }),
            Duration::from_secs(5),
        )
    }

    fn query_inputs() -> HashMap<String, String> {
        HashMap::from([
            ("query".to_string(), "open source alternatives to Firebase".to_string()),
            ("context".to_string(), String::new()),
        ])
    }

    #[rstest]
    #[case::bare(r#"{"candidates": []}"#)]
    #[case::fenced("```json\n{\"candidates\": []}\n```")]
    #[case::prose("Here you go:\n{\"candidates\": []}\nLet me know!")]
    fn test_json_payload_variants(#[case] raw: &str) {
        let parsed: CandidateList = parse_structured(raw).unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_structured::<CandidateList>("Supabase\nAppwrite").unwrap_err();
        match err {
            ExtractionError::SchemaValidationFailed { raw, errors } => {
                assert_eq!(raw, "Supabase\nAppwrite");
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_analysis_confidence_is_validated() {
        let raw = r#"{
            "name": "Supabase",
            "pricingModel": "freemium",
            "isOpenSource": true,
            "apiAvailable": true,
            "languageSupport": ["JavaScript", "Dart"],
            "integrationNotes": "Postgres based",
            "confidence": 1.5
        }"#;
        let err = parse_structured::<ToolAnalysis>(raw).unwrap_err();
        assert!(matches!(err, ExtractionError::SchemaValidationFailed { .. }));
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn test_analysis_parses() {
        let raw = r#"{
            "name": "Supabase",
            "pricingModel": "Freemium",
            "isOpenSource": true,
            "apiAvailable": true,
            "languageSupport": ["JavaScript", "Dart", "JavaScript"],
            "confidence": 0.8
        }"#;
        let analysis: ToolAnalysis = parse_structured(raw).unwrap();
        assert_eq!(analysis.pricing_model, PricingModel::Freemium);
        assert_eq!(analysis.language_support.len(), 2);
        assert!(analysis.integration_notes.is_empty());
    }

    #[test]
    fn test_empty_report_is_rejected() {
        let err = parse_structured::<Recommendation>(r#"{"report": "  "}"#).unwrap_err();
        assert!(err.to_string().contains("report must not be empty"));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let service = service(
            Ok(r#"{"candidates": [{"name": "Supabase", "rationale": "Postgres backend"}]}"#),
            Duration::ZERO,
        );
        let list: CandidateList = service
            .generate(&prompts::CANDIDATE_EXTRACTION, &query_inputs())
            .await
            .unwrap();
        assert_eq!(list.candidates[0].name, "Supabase");
    }

    #[tokio::test]
    async fn test_generate_maps_transport_error() {
        let service = service(Err("connection refused"), Duration::ZERO);
        let err = service
            .generate::<CandidateList>(&prompts::CANDIDATE_EXTRACTION, &query_inputs())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ExtractionError::GenerationFailed { ref reason } if reason.contains("connection refused"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_times_out() {
        let service = service(Ok(r#"{"candidates": []}"#), Duration::from_secs(60));
        let err = service
            .generate::<CandidateList>(&prompts::CANDIDATE_EXTRACTION, &query_inputs())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_generate_reports_missing_input() {
        let service = service(Ok(r#"{"candidates": []}"#), Duration::ZERO);
        let err = service
            .generate::<CandidateList>(&prompts::CANDIDATE_EXTRACTION, &HashMap::new())
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("failed to render prompt 'candidate_extraction'"));
    }
}
