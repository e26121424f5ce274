use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};

const DEFAULT_OLLAMA_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let (host, port) = split_base_url(base_url)?;
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }

    /// Structured extraction wants repeatable output, so sampling is greedy
    fn request(&self, messages: Vec<ChatMessage>) -> ChatMessageRequest {
        ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(0.0))
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = self.request(messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

/// Split `scheme://host[:port]` into the host URL and port ollama-rs expects
fn split_base_url(base_url: &str) -> Result<(String, u16)> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", trimmed),
    };
    if rest.is_empty() {
        return Err(AppError::Configuration(format!(
            "invalid Ollama base URL '{}'",
            base_url
        )));
    }

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| {
                AppError::Configuration(format!("invalid port in Ollama base URL '{}'", base_url))
            })?;
            (host, port)
        }
        None => (rest, DEFAULT_OLLAMA_PORT),
    };

    Ok((format!("{}://{}", scheme, host), port))
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing_full() {
        let (host, port) = split_base_url("http://localhost:11434").unwrap();
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_url_parsing_no_port() {
        let (host, port) = split_base_url("https://ollama.internal/").unwrap();
        assert_eq!(host, "https://ollama.internal");
        assert_eq!(port, DEFAULT_OLLAMA_PORT);
    }

    #[test]
    fn test_url_parsing_custom_port_without_scheme() {
        let (host, port) = split_base_url("192.168.1.100:8080").unwrap();
        assert_eq!(host, "http://192.168.1.100");
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_requests_use_zero_temperature() {
        let client = OllamaClient::new("http://localhost:11434", "llama3.2".to_string()).unwrap();
        let request = client.request(vec![ChatMessage::user("hello".to_string())]);

        assert_eq!(request.model_name, "llama3.2");
        let options = serde_json::to_value(&request.options).unwrap();
        assert_eq!(options, serde_json::json!({ "temperature": 0.0 }));
    }

    #[test]
    fn test_url_parsing_rejects_bad_port() {
        assert!(split_base_url("http://localhost:abc").is_err());
        assert!(split_base_url("http://").is_err());
    }
}
