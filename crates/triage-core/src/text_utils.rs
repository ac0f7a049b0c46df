/// Removes one wrapping fenced code block from a completion.
///
/// The input is trimmed first. When it opens with a backtick fence and spans
/// more than two lines, the first and last lines are dropped.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let lines = trimmed.split('\n').collect::<Vec<_>>();
    if lines.len() <= 2 {
        return trimmed.to_string();
    }
    lines[1..lines.len() - 1].join("\n")
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Collapses any run of three or more newlines down to exactly two.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut collapsed = text.to_string();
    while collapsed.contains("\n\n\n") {
        collapsed = collapsed.replace("\n\n\n", "\n\n");
    }
    collapsed
}

/// Normalizes a markdown completion before it is posted back to GitHub.
///
/// Headings and bold lead-ins get a blank line in front of them so they render
/// as separate blocks.
pub fn clean_markdown_response(raw: &str) -> String {
    let stripped = strip_code_fence(raw);
    let normalized = normalize_line_endings(&stripped)
        .replace("\n##", "\n\n##")
        .replace("\n**", "\n\n**");
    collapse_blank_lines(&normalized).trim().to_string()
}

pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
