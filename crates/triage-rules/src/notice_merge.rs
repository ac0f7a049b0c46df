//! Wraps an automatically fixed issue body in a replaceable notice.
//!
//! The merged body keeps three parts: a collapsible notice listing the fixed
//! violations, the fixed body, and the original body inside its own marked
//! block. Re-merging strips the previous notice and recovers the original from
//! its marked block, so notices never nest and the preserved original is always
//! the content from before the first fix.

pub const AGENT_NOTICE_START: &str = "<!-- 🤖 Agent Modified -->";
pub const AGENT_NOTICE_END: &str = "<!-- /Agent Modified -->";
pub const ORIGINAL_CONTENT_START: &str = "<!-- 🤖 Original Content -->";
pub const ORIGINAL_CONTENT_END: &str = "<!-- /Original Content -->";

/// Builds the body written back after a fix.
pub fn merge_fixed_body(original_body: &str, fixed_body: &str, violations: &[String]) -> String {
    let original = match preserved_original(original_body) {
        Some(preserved) => preserved,
        None => remove_existing_agent_notice(original_body),
    };

    let violation_list = violations
        .iter()
        .map(|violation| format!("- {violation}\n"))
        .collect::<String>();

    format!(
        "{AGENT_NOTICE_START}\n\
<details>\n\
<summary>🤖 <strong>Automatically modified by Agent</strong> - Click to see what changed</summary>\n\
\n\
This issue was automatically updated to comply with format guidelines.\n\
\n\
**Issues fixed:**\n\
{violation_list}\
</details>\n\
{AGENT_NOTICE_END}\n\
\n\
---\n\
\n\
{fixed_body}\n\
\n\
---\n\
\n\
<details>\n\
<summary>📋 Original content (preserved for reference)</summary>\n\
\n\
{ORIGINAL_CONTENT_START}\n\
{original}\n\
{ORIGINAL_CONTENT_END}\n\
\n\
</details>\n"
    )
}

/// Removes the first notice block and re-joins what surrounds it.
///
/// Newlines adjacent to the block are trimmed and the two sides are joined
/// with one blank line. A start marker without a matching end marker leaves
/// the body unchanged.
pub fn remove_existing_agent_notice(body: &str) -> String {
    let Some(start) = body.find(AGENT_NOTICE_START) else {
        return body.to_string();
    };
    let Some(end_offset) = body[start..].find(AGENT_NOTICE_END) else {
        return body.to_string();
    };
    let end = start + end_offset + AGENT_NOTICE_END.len();

    let before = body[..start].trim_end_matches('\n');
    let after = body[end..].trim_start_matches('\n');

    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before}\n\n{after}"),
    }
}

/// Returns the original body recorded by an earlier merge, if any.
pub fn preserved_original(body: &str) -> Option<String> {
    let start = body.find(ORIGINAL_CONTENT_START)? + ORIGINAL_CONTENT_START.len();
    let end = start + body[start..].find(ORIGINAL_CONTENT_END)?;
    let inner = &body[start..end];
    let inner = inner.strip_prefix('\n').unwrap_or(inner);
    let inner = inner.strip_suffix('\n').unwrap_or(inner);
    Some(inner.to_string())
}
