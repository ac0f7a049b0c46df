use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use triage_core::Issue;

use crate::GuidelineRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Structural requirements every issue body is checked against.
pub struct FormatRules {
    pub required_sections: Vec<String>,
    /// Minimum body length in characters.
    pub min_description_length: usize,
    pub require_labels: bool,
    pub label_prefix: String,
}

impl Default for FormatRules {
    fn default() -> Self {
        Self {
            required_sections: vec!["Description".to_string(), "Acceptance Criteria".to_string()],
            min_description_length: 50,
            require_labels: true,
            label_prefix: "priority:".to_string(),
        }
    }
}

impl FormatRules {
    /// Applies the values a guidelines document states on top of these rules.
    ///
    /// Sections and prefix replace the configured ones when present, a positive
    /// minimum replaces the configured minimum, and labels are required when
    /// either source requires them.
    pub fn with_guidelines(&self, guidelines: &GuidelineRules) -> Self {
        let mut merged = self.clone();
        if !guidelines.required_sections.is_empty() {
            merged.required_sections = guidelines.required_sections.clone();
        }
        if let Some(min_length) = guidelines.min_description_length.filter(|value| *value > 0) {
            merged.min_description_length = min_length;
        }
        merged.require_labels = self.require_labels || guidelines.require_labels;
        if let Some(prefix) = guidelines
            .label_prefix
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
        {
            merged.label_prefix = prefix.to_string();
        }
        merged
    }
}

/// Checks an issue against `rules`.
///
/// Violations come out in a fixed order: body length, then each required
/// section in configured order, then the label requirement. Sections match as
/// case-insensitive substrings of the body, so a bare mention satisfies them.
pub fn check_format(issue: &Issue, rules: &FormatRules) -> Vec<String> {
    let mut violations = Vec::new();

    if issue.body_char_count() < rules.min_description_length {
        violations.push(format!(
            "Description too short (minimum {} characters)",
            rules.min_description_length
        ));
    }

    let body_lower = issue.body.to_lowercase();
    let mut checked = BTreeSet::new();
    for section in &rules.required_sections {
        let section_lower = section.to_lowercase();
        if !checked.insert(section_lower.clone()) {
            continue;
        }
        if !body_lower.contains(&section_lower) {
            violations.push(format!("Missing required section: {section}"));
        }
    }

    if rules.require_labels && !issue.has_label_with_prefix(&rules.label_prefix) {
        violations.push(format!(
            "Missing priority label (should start with '{}')",
            rules.label_prefix
        ));
    }

    violations
}
