//! Website Eater - digest web pages into a searchable per-user memory
//!
//! Takes a URL, obtains the page content (the LLM reads the URL natively, or
//! the page is scraped and optionally analyzed by the LLM), classifies it
//! into a coarse content type, routes it to destination labels and stores it
//! as a memory entry with content-hash deduplication.
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────── Gateway (axum) ─────────────────────────┐
//!  HTTP ───▶ │ /api/process  /api/batch  /api/search  /api/memories  /api/classify │
//!            └───────────────────────────────┬─────────────────────────────────┘
//!                                            │
//!            ┌───────────────────────────────▼─────────────────────────────────┐
//!            │                         DigestAgent                             │
//!            │  extract ──▶ classify ──▶ dedup + store ──▶ handle ──▶ route    │
//!            └────┬──────────────┬───────────────┬─────────────────────────────┘
//!                 │              │               │
//!          ┌──────▼─────┐ ┌──────▼─────┐  ┌──────▼──────┐
//!          │ PageFetcher│ │ LlmClient  │  │ MemoryStore │
//!          │ (scraper)  │ │ (Gemini)   │  │ (RwLock)    │
//!          └────────────┘ └────────────┘  └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`agent`]: processing pipeline and batch runner
//! - [`classify`]: keyword-count content classifier and basic analysis
//! - [`config`]: configuration management
//! - [`extract`]: page fetching, HTML parsing, label extraction
//! - [`gateway`]: HTTP API
//! - [`llm`]: Gemini client and prompts
//! - [`memory`]: memory entries and stores
//! - [`routing`]: destination lookup and per-type handlers

pub mod agent;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod llm;
pub mod memory;
pub mod routing;
pub mod text;

pub use config::EaterConfig;
pub use error::{Error, Result};
