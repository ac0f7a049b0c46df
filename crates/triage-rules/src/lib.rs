//! Deterministic issue-format rules.
//!
//! - `format_rules`: the schema checker producing ordered violation messages.
//! - `notice_merge`: the idempotent wrapper recording what an automated fix changed.
//! - `guidelines`: parser for the optional markdown guidelines document.

pub mod format_rules;
pub mod guidelines;
pub mod notice_merge;

pub use format_rules::{check_format, FormatRules};
pub use guidelines::{
    load_guidelines, parse_guidelines, GuidelineExample, GuidelineRules, Guidelines,
    LabelRequirement,
};
pub use notice_merge::{
    merge_fixed_body, preserved_original, remove_existing_agent_notice, AGENT_NOTICE_END,
    AGENT_NOTICE_START, ORIGINAL_CONTENT_END, ORIGINAL_CONTENT_START,
};
