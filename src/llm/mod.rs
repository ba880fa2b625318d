//! LLM access
//!
//! A thin Gemini `generateContent` client behind the [`LlmClient`] trait,
//! plus the prompts used for URL digestion and scraped-text analysis.

pub mod client;
pub mod prompt;
pub mod types;

pub use client::{GeminiClient, LlmClient};
pub use prompt::{analysis_prompt, url_digestion_prompt, UrlKind};
pub use types::{GenerateRequest, GenerateResponse, LlmTool, UrlRetrieval};
