//! Prompt builders

use crate::extract::{ExtractOptions, ScrapedPage};
use crate::text::truncate_chars;

/// Characters of scraped text included in the analysis prompt
const ANALYSIS_PREVIEW_CHARS: usize = 1500;

/// Headings included in the analysis prompt
const ANALYSIS_HEADERS: usize = 5;

/// Kind of page, judged from the URL alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Video,
    Repository,
    Webpage,
}

impl UrlKind {
    pub fn of(url: &str) -> Self {
        let lowered = url.to_lowercase();
        if lowered.contains("youtube.com") || lowered.contains("youtu.be") {
            Self::Video
        } else if lowered.contains("github.com") || lowered.contains("gitlab.com") {
            Self::Repository
        } else {
            Self::Webpage
        }
    }
}

/// Prompt asking the model to read `url` itself with the `url_context` tool
pub fn url_digestion_prompt(url: &str, options: &ExtractOptions) -> String {
    let (subject, points): (&str, [&str; 5]) = match UrlKind::of(url) {
        UrlKind::Video => (
            "Analyze this YouTube video",
            [
                "Video title and channel",
                "Main topics discussed",
                "Key points or takeaways",
                "Video duration and upload date if available",
                "Summary of the content",
            ],
        ),
        UrlKind::Repository => (
            "Analyze this code repository",
            [
                "Repository name and description",
                "Main programming languages used",
                "Purpose of the project",
                "Key features or functionality",
                "README summary if available",
            ],
        ),
        UrlKind::Webpage => (
            "Analyze this webpage",
            [
                "Page title and main topic",
                "Content type (article, documentation, product page, etc.)",
                "Key information or main points",
                "Target audience",
                "Summary of the content",
            ],
        ),
    };

    let mut lines = vec![
        format!("{}: {}", subject, url),
        String::new(),
        "Start your answer with a line of the form \"Title: <title>\".".to_string(),
        "Please provide:".to_string(),
    ];
    lines.extend(
        points
            .iter()
            .enumerate()
            .map(|(i, point)| format!("{}. {}", i + 1, point)),
    );

    let mut next = points.len() + 1;
    if options.extract_metadata {
        lines.push(format!(
            "{}. Extract any metadata as labelled lines: \"Author:\", \"Date:\" and \"Keywords:\" (comma separated)",
            next
        ));
        next += 1;
    }
    if options.extract_images {
        lines.push(format!("{}. Include information about any images found", next));
        next += 1;
    }
    if options.deep_analysis {
        lines.push(format!("{}. Provide deeper insights and related topics", next));
    }

    lines.join("\n")
}

/// Prompt asking the model to analyze text that was already scraped
pub fn analysis_prompt(url: &str, page: &ScrapedPage) -> String {
    let meta = if page.meta_description.is_empty() {
        "None"
    } else {
        page.meta_description.as_str()
    };
    let headers: Vec<&str> = page
        .headers
        .iter()
        .take(ANALYSIS_HEADERS)
        .map(String::as_str)
        .collect();

    [
        format!("Analyze this web content from {}:", url),
        format!("Title: {}", page.title),
        format!("Meta Description: {}", meta),
        format!("Headers: {}", headers.join(", ")),
        format!(
            "Content preview: {}",
            truncate_chars(&page.content, ANALYSIS_PREVIEW_CHARS)
        ),
        String::new(),
        "Provide a comprehensive analysis including:".to_string(),
        "1. Summary of the main content (2-3 sentences)".to_string(),
        "2. Key topics or themes".to_string(),
        "3. Content type classification".to_string(),
        "4. Target audience".to_string(),
        "5. Key takeaways or insights".to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_kind() {
        assert_eq!(UrlKind::of("https://www.youtube.com/watch?v=x"), UrlKind::Video);
        assert_eq!(UrlKind::of("https://youtu.be/x"), UrlKind::Video);
        assert_eq!(UrlKind::of("https://github.com/tokio-rs/axum"), UrlKind::Repository);
        assert_eq!(UrlKind::of("https://example.com/post"), UrlKind::Webpage);
    }

    #[test]
    fn test_url_digestion_prompt_options() {
        let plain = url_digestion_prompt("https://example.com", &ExtractOptions::default());
        assert!(plain.starts_with("Analyze this webpage: https://example.com"));
        assert!(plain.contains("5. Summary of the content"));
        assert!(!plain.contains("6."));

        let options = ExtractOptions {
            extract_metadata: true,
            deep_analysis: true,
            ..Default::default()
        };
        let rich = url_digestion_prompt("https://github.com/a/b", &options);
        assert!(rich.starts_with("Analyze this code repository"));
        assert!(rich.contains("6. Extract any metadata"));
        assert!(rich.contains("7. Provide deeper insights"));
    }

    #[test]
    fn test_analysis_prompt() {
        let page = ScrapedPage {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            meta_description: String::new(),
            headers: (1..=8).map(|i| format!("H{}", i)).collect(),
            content: "x".repeat(2000),
        };

        let prompt = analysis_prompt(&page.url, &page);
        assert!(prompt.contains("Title: Example"));
        assert!(prompt.contains("Meta Description: None"));
        assert!(prompt.contains("Headers: H1, H2, H3, H4, H5\n"));
        assert!(prompt.contains(&format!("Content preview: {}\n", "x".repeat(1500))));
    }
}
