//! Keyword-count content classifier

use crate::config::{default_routing_rules, ContentType, RoutingRule};
use crate::error::{Error, Result};
use serde::Serialize;

/// Classification result for a piece of text
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    /// Winning content type
    pub content_type: ContentType,
    /// Score per rule, in rule order
    pub scores: Vec<CategoryScore>,
}

impl ClassificationResult {
    /// Score recorded for a content type (0 when it has no rule)
    pub fn score(&self, content_type: ContentType) -> usize {
        self.scores
            .iter()
            .find(|s| s.content_type == content_type)
            .map(|s| s.score)
            .unwrap_or(0)
    }
}

/// Keyword hits for one content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryScore {
    pub content_type: ContentType,
    pub score: usize,
}

/// Scores text against per-category keyword lists
pub struct Classifier {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    content_type: ContentType,
    keywords: Vec<String>,
}

impl CompiledRule {
    fn score(&self, lowered: &str) -> usize {
        self.keywords
            .iter()
            .map(|keyword| lowered.matches(keyword.as_str()).count())
            .sum()
    }
}

impl Classifier {
    /// Create a classifier from routing rules.
    ///
    /// Rule order is the tie-break order. Empty keywords and repeated
    /// content types are rejected.
    pub fn new(rules: Vec<RoutingRule>) -> Result<Self> {
        let mut compiled: Vec<CompiledRule> = Vec::with_capacity(rules.len());

        for rule in rules {
            if compiled.iter().any(|c| c.content_type == rule.content_type) {
                return Err(Error::Config(format!(
                    "Duplicate routing rule for content type '{}'",
                    rule.content_type
                )));
            }
            if let Some(pos) = rule.keywords.iter().position(|k| k.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "Empty keyword at position {} in rule '{}'",
                    pos, rule.content_type
                )));
            }

            compiled.push(CompiledRule {
                content_type: rule.content_type,
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
            });
        }

        Ok(Self { rules: compiled })
    }

    /// Classify text, returning only the winning content type
    pub fn classify(&self, text: &str) -> ContentType {
        self.classify_detailed(text).content_type
    }

    /// Classify text and report the score of every rule.
    ///
    /// Highest score wins; ties go to the earlier rule. All-zero scores
    /// yield `General`.
    pub fn classify_detailed(&self, text: &str) -> ClassificationResult {
        let lowered = text.to_lowercase();

        let scores: Vec<CategoryScore> = self
            .rules
            .iter()
            .map(|rule| CategoryScore {
                content_type: rule.content_type,
                score: rule.score(&lowered),
            })
            .collect();

        let mut best: Option<CategoryScore> = None;
        for candidate in &scores {
            if candidate.score == 0 {
                continue;
            }
            match best {
                Some(current) if current.score >= candidate.score => {}
                _ => best = Some(*candidate),
            }
        }

        ClassificationResult {
            content_type: best.map(|b| b.content_type).unwrap_or(ContentType::General),
            scores,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let rules = default_routing_rules()
            .into_iter()
            .map(|rule| CompiledRule {
                content_type: rule.content_type,
                keywords: rule.keywords,
            })
            .collect();
        Self { rules }
    }
}
