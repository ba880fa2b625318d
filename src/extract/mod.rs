//! Page content extraction
//!
//! Two ways to get page content:
//! - the LLM reads the URL itself (`url_context` tool), see [`crate::llm`]
//! - direct HTTP GET + HTML parsing ([`PageFetcher`]), optionally followed by
//!   an LLM analysis of the scraped text
//!
//! Either way the result is an [`ExtractedPage`].

pub mod fetcher;
pub mod html;
pub mod metadata;

pub use fetcher::{domain_of, validate_url, PageFetcher, ScrapedPage};
pub use html::{parse_html, ParsedHtml};
pub use metadata::{ContentMetadata, MetadataExtractor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-request extraction options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Scrape only, never call the LLM
    pub skip_ai: bool,
    /// Let the LLM search the web for related context
    pub deep_analysis: bool,
    /// Ask for author, date and keywords
    pub extract_metadata: bool,
    /// Ask for a description of images
    pub extract_images: bool,
    /// Force (true) or forbid (false) native URL reading; config decides when unset
    pub use_url_context: Option<bool>,
}

/// Outcome of an extraction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Content obtained and analyzed
    Success,
    /// Content obtained, analysis degraded
    Partial,
    /// The LLM quota ran out
    QuotaError,
}

/// How the content was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// The LLM read the URL natively
    UrlContext,
    /// Scraped, then analyzed by the LLM
    ScrapeAndAnalyze,
    /// Scraped only
    ScrapeOnly,
}

/// Everything known about a page after extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: String,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    /// Scraped page text (empty for URL-context extraction)
    pub raw_content: String,
    pub meta_description: String,
    pub headers: Vec<String>,
    /// LLM output, or the keyword-only fallback analysis
    pub analysis: String,
    pub extraction_status: ExtractionStatus,
    pub method: ExtractionMethod,
    /// Set when the LLM was tried and failed
    pub ai_error: Option<String>,
}

impl ExtractedPage {
    /// Whether the analysis came from the LLM
    pub fn ai_available(&self) -> bool {
        self.ai_error.is_none() && self.method != ExtractionMethod::ScrapeOnly
    }
}
