//! Keyword classification of natural-language action phrases.
//!
//! Classification is pure: a phrase maps to zero or more [`ActionKind`]s by
//! case-insensitive substring tests, and [`plan_actions`] expands an agent's
//! action list into executable [`ActionStep`]s in list order. Within one
//! phrase the kinds always come out as length gate, generate, comment.

use serde::Serialize;

use crate::PluginAgent;

/// Minimum body length, in characters, before a summary is generated.
pub const DEFAULT_MIN_LENGTH_FOR_SUMMARY: usize = 200;
pub const MIN_LENGTH_CONFIG_KEY: &str = "min_length_for_summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LengthGate,
    Generate,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ActionStep {
    /// Stop the whole plan when the issue body is shorter than `min_length`.
    LengthGate { min_length: usize },
    /// Render `template` (or the inline prompt) and store the completion
    /// under `summary` and `content`.
    Generate { template: String },
    /// Post the stored summary, or a banner-only notice, as a comment.
    Comment,
}

pub fn classify_action(phrase: &str) -> Vec<ActionKind> {
    let phrase = phrase.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| phrase.contains(needle));

    let mut kinds = Vec::new();
    if mentions(&["check"]) && mentions(&["length", "long", "threshold"]) {
        kinds.push(ActionKind::LengthGate);
    }
    if mentions(&["llm", "generate"]) && mentions(&["summary", "content", "text"]) {
        kinds.push(ActionKind::Generate);
    }
    if mentions(&["add"]) && mentions(&["comment"]) {
        kinds.push(ActionKind::Comment);
    }
    kinds
}

pub fn plan_actions(agent: &PluginAgent) -> Vec<ActionStep> {
    let min_length = agent
        .config_i64(MIN_LENGTH_CONFIG_KEY)
        .and_then(|value| usize::try_from(value).ok())
        .unwrap_or(DEFAULT_MIN_LENGTH_FOR_SUMMARY);
    let template = agent.template_name();

    agent
        .actions
        .iter()
        .flat_map(|phrase| classify_action(phrase))
        .map(|kind| match kind {
            ActionKind::LengthGate => ActionStep::LengthGate { min_length },
            ActionKind::Generate => ActionStep::Generate {
                template: template.clone(),
            },
            ActionKind::Comment => ActionStep::Comment,
        })
        .collect()
}
