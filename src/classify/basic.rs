//! Keyword-only page analysis used when the LLM is unavailable

use crate::text::truncate_chars;

const NEWS_HINTS: &[&str] = &["news", "breaking", "latest", "update"];
const EDUCATIONAL_HINTS: &[&str] = &["tutorial", "guide", "how to", "documentation"];
const COMMERCIAL_HINTS: &[&str] = &["product", "pricing", "buy", "service"];
const PERSONAL_HINTS: &[&str] = &["blog", "opinion", "thoughts", "personal"];

/// Label for the first hint group present in the text
fn coarse_label(lowered: &str) -> &'static str {
    let any = |hints: &[&str]| hints.iter().any(|h| lowered.contains(h));

    if any(NEWS_HINTS) {
        "News/Updates"
    } else if any(EDUCATIONAL_HINTS) {
        "Educational/Documentation"
    } else if any(COMMERCIAL_HINTS) {
        "Commercial/Product"
    } else if any(PERSONAL_HINTS) {
        "Blog/Personal"
    } else {
        "General Information"
    }
}

/// Build a plain-text analysis of scraped content without the LLM
pub fn basic_analysis(content: &str, header_count: usize, meta_description: &str) -> String {
    let lowered = content.to_lowercase();
    let mut lines = vec![
        format!("Content Type: {}", coarse_label(&lowered)),
        format!("Word Count: {}", content.split_whitespace().count()),
        format!("Headers Found: {}", header_count),
    ];

    if !meta_description.is_empty() {
        lines.push(format!(
            "Meta Description: {}...",
            truncate_chars(meta_description, 100)
        ));
    }

    format!("Basic Analysis (AI unavailable):\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_label_wins_first() {
        let analysis = basic_analysis("Latest pricing update", 2, "");
        assert!(analysis.contains("Content Type: News/Updates"));
        assert!(analysis.contains("Word Count: 3"));
        assert!(analysis.contains("Headers Found: 2"));
        assert!(!analysis.contains("Meta Description"));
    }

    #[test]
    fn test_general_label() {
        let analysis = basic_analysis("Nothing to see here", 0, "A page");
        assert!(analysis.starts_with("Basic Analysis (AI unavailable):"));
        assert!(analysis.contains("Content Type: General Information"));
        assert!(analysis.contains("Meta Description: A page..."));
    }

    #[test]
    fn test_how_to_is_educational() {
        let analysis = basic_analysis("How to bake bread", 0, "");
        assert!(analysis.contains("Educational/Documentation"));
    }
}
