//! Foundational data model and stateless helpers shared across triage crates.
//!
//! Provides the issue model, repository identity parsing, markdown cleanup for
//! model completions, and the date helpers used by digest metrics.

pub mod issue;
pub mod repo_ref;
pub mod text_utils;
pub mod time_utils;

pub use issue::{Issue, IssueState, IssueStateFilter};
pub use repo_ref::RepoRef;
pub use text_utils::{
    clean_markdown_response, collapse_blank_lines, normalize_line_endings, strip_code_fence,
    truncate_for_error,
};
pub use time_utils::{days_since, format_date};
