//! LLM Provider Clients and Abstractions
//!
//! The research pipeline only needs one thing from a language model: turn a
//! system prompt and a user prompt into text. [`LLMClient`] captures that
//! contract; the typed, schema-validated layer on top of it lives in
//! [`crate::extraction`].
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use toolscout::llm::Provider;
//!
//! let client = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()?;
//!
//! let response = client
//!     .generate_with_system("Answer tersely.", "What is 2+2?")
//!     .await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider};
