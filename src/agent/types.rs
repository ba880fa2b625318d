//! Pipeline result types

use crate::config::ContentType;
use crate::extract::{ExtractionMethod, ExtractionStatus};
use crate::memory::MemoryEntry;
use crate::routing::{HandlerOutcome, Route};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of processing one URL
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// New memory stored
    Processed(Box<ProcessReport>),
    /// Identical content already stored for the user
    Duplicate { existing_memory_id: Uuid },
}

impl ProcessOutcome {
    pub fn memory_id(&self) -> Uuid {
        match self {
            Self::Processed(report) => report.memory_id,
            Self::Duplicate { existing_memory_id } => *existing_memory_id,
        }
    }
}

/// Summary of a newly stored page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    pub url: String,
    pub title: String,
    pub content_type: ContentType,
    pub memory_id: Uuid,
    /// Destination labels
    pub routes: Vec<String>,
    /// Destinations with priority and actions
    pub route_details: Vec<Route>,
    pub content_length: usize,
    pub analysis_preview: String,
    pub raw_content_preview: String,
    pub headers: Vec<String>,
    pub meta_description: String,
    pub ai_available: bool,
    pub method: ExtractionMethod,
    pub extraction_status: ExtractionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_error: Option<String>,
    pub handler: HandlerOutcome,
    pub related_memories: Vec<RelatedMemory>,
}

/// Short reference to an earlier memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedMemory {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub content_type: ContentType,
}

impl From<&MemoryEntry> for RelatedMemory {
    fn from(entry: &MemoryEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            url: entry.metadata.url.clone(),
            content_type: entry.metadata.content_type,
        }
    }
}

/// Per-URL batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    Duplicate,
    Error,
}

/// One line of a batch result, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub url: String,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
