//! Content classification
//!
//! Assigns one of six coarse content types to page text by counting
//! keyword occurrences per category, and provides a keyword-only page
//! analysis for when the LLM cannot be reached.

pub mod basic;
pub mod classifier;

pub use basic::basic_analysis;
pub use classifier::{CategoryScore, ClassificationResult, Classifier};
