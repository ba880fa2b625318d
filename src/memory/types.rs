//! Memory entry data types

use crate::config::ContentType;
use crate::extract::{ExtractionMethod, ExtractionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A processed page stored for a user.
///
/// Entries are created once per successful extraction and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique entry identifier
    pub id: Uuid,
    /// Owner of the entry
    pub user_id: String,
    pub title: String,
    /// Combined text (title, URL, description, headings, analysis, excerpt)
    pub content: String,
    /// LLM or basic analysis
    pub analysis: String,
    /// Scraped page text, empty for URL-context extraction
    pub raw_content: String,
    pub headers: Vec<String>,
    /// Hex SHA-256 of `content`
    pub content_hash: String,
    pub metadata: MemoryMetadata,
    pub created_at: DateTime<Utc>,
}

/// Extraction facts recorded with each entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub url: String,
    pub domain: String,
    /// When the page was extracted
    pub timestamp: DateTime<Utc>,
    pub content_type: ContentType,
    /// Length of `content` in characters
    pub content_length: usize,
    pub extraction_status: ExtractionStatus,
    pub extraction_method: ExtractionMethod,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
}

impl MemoryEntry {
    /// Case-insensitive substring match over content, analysis and raw text.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.content.to_lowercase().contains(needle)
            || self.analysis.to_lowercase().contains(needle)
            || self.raw_content.to_lowercase().contains(needle)
    }
}

/// Result of adding an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored under this id
    Added(Uuid),
    /// Same content already stored for the user under this id
    Duplicate(Uuid),
}

impl AddOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Added(id) | Self::Duplicate(id) => *id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Hex SHA-256 digest used for deduplication
pub fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn test_add_outcome() {
        let id = Uuid::new_v4();
        assert_eq!(AddOutcome::Added(id).id(), id);
        assert!(AddOutcome::Duplicate(id).is_duplicate());
        assert!(!AddOutcome::Added(id).is_duplicate());
    }
}
