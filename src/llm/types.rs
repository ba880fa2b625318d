//! Request and response types for LLM calls

use serde::{Deserialize, Serialize};

/// Server-side tools the model may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmTool {
    /// Read URLs mentioned in the prompt
    UrlContext,
    /// Ground the answer with web search
    GoogleSearch,
}

/// A single-turn generation request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub tools: Vec<LlmTool>,
    pub temperature: Option<f64>,
    pub top_k: Option<u32>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            tools: Vec::new(),
            temperature: None,
            top_k: None,
            top_p: None,
            max_output_tokens: None,
        }
    }

    pub fn with_tool(mut self, tool: LlmTool) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }

    pub fn with_sampling(mut self, temperature: f64, top_k: u32, top_p: f64) -> Self {
        self.temperature = Some(temperature);
        self.top_k = Some(top_k);
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

/// Retrieval result for one URL read by the `url_context` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRetrieval {
    pub url: String,
    pub status: String,
}

impl UrlRetrieval {
    pub fn succeeded(&self) -> bool {
        self.status == "URL_RETRIEVAL_STATUS_SUCCESS"
    }
}

/// Model output
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    /// Concatenated text parts of the first candidate
    pub text: String,
    pub finish_reason: Option<String>,
    pub url_retrievals: Vec<UrlRetrieval>,
}
