//! Small text helpers shared by extraction and the pipeline

/// First `max_chars` characters of `text`, never splitting a UTF-8 sequence
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncate at a word boundary and append `...` when anything was cut
pub fn truncate_words(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() == text.len() {
        return text.to_string();
    }

    match cut.rfind(' ') {
        Some(last_space) if last_space > 0 => format!("{}...", &cut[..last_space]),
        _ => format!("{}...", cut),
    }
}

/// Collapse all whitespace runs into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
