//! Labelled-field extraction from LLM output ("Title: ...", "Author: ...")

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fields recovered from free-form LLM text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publish_date: Option<String>,
    pub keywords: Vec<String>,
}

/// Compiled label patterns
pub struct MetadataExtractor {
    title: Regex,
    author: Regex,
    date: Regex,
    keywords: Regex,
}

impl MetadataExtractor {
    pub fn new() -> Result<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                Error::Internal(format!("Invalid metadata pattern '{}': {}", name, e))
            })
        };

        Ok(Self {
            title: compile("title", r"(?i)(?:Title|Título|Heading):[ \t]*(.+)")?,
            author: compile("author", r"(?i)(?:Author|Autor|\bBy):[ \t]*(.+)")?,
            date: compile("date", r"(?i)(?:Date|Published|Fecha):[ \t]*(.+)")?,
            keywords: compile("keywords", r"(?i)(?:Keywords|Tags):[ \t]*(.+)")?,
        })
    }

    /// Extract labelled fields; absent labels stay `None` / empty
    pub fn extract(&self, text: &str) -> ContentMetadata {
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| clean_value(m.as_str()))
                .filter(|value| !value.is_empty())
        };

        let keywords = capture(&self.keywords)
            .map(|list| {
                list.split(',')
                    .map(clean_value)
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        ContentMetadata {
            title: capture(&self.title),
            author: capture(&self.author),
            publish_date: capture(&self.date),
            keywords,
        }
    }
}

/// Strip whitespace and markdown emphasis around a captured value
fn clean_value(value: &str) -> String {
    value
        .trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '_')
        .to_string()
}
