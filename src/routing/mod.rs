//! Routing of classified content
//!
//! Maps a content type to symbolic destination labels and runs the
//! per-type handler that decides priority and follow-up actions.
//! Nothing is delivered; routes are labels returned to the caller.

pub mod handlers;
pub mod router;

pub use handlers::{freshness_score, handle, HandlerOutcome, Priority};
pub use router::{ContentRouter, Route};
