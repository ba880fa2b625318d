//! HTML parsing for the scraping fallback
//!
//! Pulls the title, meta description, h1-h3 headings and visible text out
//! of a page. Text inside `script`, `style`, `noscript` and `template` is
//! dropped.

use crate::text::{collapse_whitespace, truncate_chars};
use scraper::{ElementRef, Html, Selector};

/// Parsed page parts
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHtml {
    pub title: Option<String>,
    pub meta_description: String,
    pub headers: Vec<String>,
    pub text: String,
}

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Parse an HTML document.
///
/// `max_chars` caps the visible text, `max_headers` the heading list.
pub fn parse_html(html: &str, max_chars: usize, max_headers: usize) -> ParsedHtml {
    let document = Html::parse_document(html);

    ParsedHtml {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        headers: extract_headers(&document, max_headers),
        text: truncate_chars(&visible_text(&document), max_chars).to_string(),
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn extract_title(document: &Html) -> Option<String> {
    select_first(document, "title")
        .map(|el| element_text(&el))
        .filter(|title| !title.is_empty())
}

fn extract_meta_description(document: &Html) -> String {
    ["meta[name='description']", "meta[property='og:description']"]
        .iter()
        .filter_map(|selector| select_first(document, selector))
        .filter_map(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
        .unwrap_or_default()
}

/// Headings grouped by level: every h1, then h2, then h3
fn extract_headers(document: &Html, max_headers: usize) -> Vec<String> {
    let mut headers = Vec::new();

    for level in ["h1", "h2", "h3"] {
        let Ok(selector) = Selector::parse(level) else {
            continue;
        };
        headers.extend(
            document
                .select(&selector)
                .map(|el| element_text(&el))
                .filter(|text| !text.is_empty()),
        );
    }

    headers.truncate(max_headers);
    headers
}

fn visible_text(document: &Html) -> String {
    let chunks: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                    .unwrap_or(false)
            });
            (!hidden).then_some(&**text)
        })
        .collect();

    collapse_whitespace(&chunks.join(" "))
}
