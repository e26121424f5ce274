//! Prompt templates for developer tool research
//!
//! User templates are tera templates rendered with the inputs map as the
//! context. Rendering fails when a template references an input that was not
//! provided.

use std::collections::HashMap;
use std::error::Error as _;
use tera::{Context, Tera};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Short identifier used in logs and timeout messages
    pub name: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Render the user template with `inputs` as the tera context
    pub fn render(&self, inputs: &HashMap<String, String>) -> Result<String, String> {
        let mut context = Context::new();
        for (key, value) in inputs {
            context.insert(key.as_str(), value);
        }

        Tera::one_off(self.user, &context, false).map_err(|e| {
            let mut message = format!("failed to render prompt '{}': {}", self.name, e);
            let mut source = e.source();
            while let Some(cause) = source {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
            message
        })
    }
}

pub const CANDIDATE_EXTRACTION: PromptTemplate = PromptTemplate {
    name: "candidate_extraction",
    system: "You are a technology researcher. Extract specific developer tools, \
             libraries, platforms or services that answer the user's question. \
             Focus on actual products developers can adopt, not general concepts \
             or features.",
    user: "Query: {{ query }}\n\n\
           Article content:\n{{ context }}\n\n\
           List the specific tools or services relevant to the query, most relevant \
           first, each with a one sentence rationale. Use the official product name. \
           If the query does not point at any tool, return an empty list.",
};

pub const TOOL_ANALYSIS: PromptTemplate = PromptTemplate {
    name: "tool_analysis",
    system: "You are analyzing developer tools from the perspective of a software \
             engineer choosing a stack. Only state what the provided evidence supports; \
             use \"unknown\" and a low confidence when it is silent.",
    user: "Tool: {{ name }}\n\n\
           Evidence gathered from the web:\n{{ evidence }}\n\n\
           Describe in one sentence what the tool is. Determine the pricing model \
           (free, freemium, paid or unknown), whether the tool is open source, whether \
           it offers a public API or SDK, the technologies it is built on, which \
           programming languages it supports, and how it integrates with other \
           systems. Rate your confidence between 0 and 1.",
};

pub const RECOMMENDATION: PromptTemplate = PromptTemplate {
    name: "recommendation",
    system: "You are a senior software engineer giving quick, concise tech \
             recommendations. Keep responses brief and actionable.",
    user: "Developer query: {{ query }}\n\n\
           Analyzed tools:\n{{ analyses }}\n\n\
           Rank the tools for this query and recommend one. In three to four short \
           paragraphs cover which tool is best and why, the key cost and pricing \
           trade-offs, and the main technical advantage. Format the report as markdown.",
};
