//! Processing agent
//!
//! Ties extraction, classification, memory storage and routing into one
//! pipeline ([`DigestAgent::process`]) and runs batches of URLs with
//! bounded concurrency ([`DigestAgent::process_batch`]).

pub mod pipeline;
pub mod types;

pub use pipeline::{DigestAgent, DigestAgentBuilder};
pub use types::{BatchItem, BatchStatus, ProcessOutcome, ProcessReport, RelatedMemory};
