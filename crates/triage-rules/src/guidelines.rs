//! Parser for the project guidelines markdown document.
//!
//! Recognized layout:
//!
//! ```markdown
//! ## Format Rules
//! Required Sections:
//! - Description
//! - Acceptance Criteria
//! Minimum description length: 100
//! Label prefix: "priority:"
//!
//! ## Instructions
//! Free text handed to the model verbatim.
//!
//! ## Examples
//! (fenced blocks)
//! ```
//!
//! Every field is optional; absent values leave the configured rules alone.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

const FORMAT_SECTION_TITLES: &[&str] = &["Format Rules", "Format Requirements", "Format"];
const REQUIRED_SECTION_KEYWORDS: &[&str] = &["Required Sections", "Sections"];
const MIN_LENGTH_PATTERNS: &[&str] = &["Minimum.*length", "Min.*length", "Description.*length"];
const LABEL_PREFIX_PATTERNS: &[&str] = &["label.*prefix", "prefix.*label"];
const INSTRUCTION_SECTION_GROUPS: &[&[&str]] = &[
    &["Instructions", "Guidelines", "Guidelines and Rules"],
    &["General", "Overview"],
];
const EXAMPLE_SECTION_TITLES: &[&str] = &["Examples", "Example Tasks", "Good Examples"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Public struct `Guidelines` used across triage components.
pub struct Guidelines {
    pub raw_content: String,
    pub rules: GuidelineRules,
    pub instructions: String,
    pub examples: Vec<GuidelineExample>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Format rules stated by a guidelines document.
pub struct GuidelineRules {
    pub required_sections: Vec<String>,
    pub min_description_length: Option<usize>,
    pub require_labels: bool,
    pub label_prefix: Option<String>,
    pub label_requirements: Vec<LabelRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Public struct `LabelRequirement` used across triage components.
pub struct LabelRequirement {
    /// One of `priority`, `type`, `team`, `status`.
    pub kind: String,
    pub required: bool,
    pub allowed_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Public struct `GuidelineExample` used across triage components.
pub struct GuidelineExample {
    pub description: String,
    pub body: String,
}

pub fn load_guidelines(path: &Path) -> Result<Guidelines> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read guidelines file {}", path.display()))?;
    Ok(parse_guidelines(&content))
}

pub fn parse_guidelines(content: &str) -> Guidelines {
    Guidelines {
        raw_content: content.to_string(),
        rules: extract_format_rules(content),
        instructions: extract_instructions(content),
        examples: extract_examples(content),
    }
}

fn extract_format_rules(content: &str) -> GuidelineRules {
    let mut rules = GuidelineRules::default();
    let Some(section) = extract_section(content, FORMAT_SECTION_TITLES) else {
        return rules;
    };

    rules.required_sections = extract_list_items(&section, REQUIRED_SECTION_KEYWORDS);
    rules.min_description_length =
        extract_int_value(&section, MIN_LENGTH_PATTERNS).filter(|value| *value > 0);

    if section.to_lowercase().contains("label") {
        rules.require_labels = true;
        rules.label_prefix = extract_string_value(&section, LABEL_PREFIX_PATTERNS);
        rules.label_requirements = extract_label_requirements(&section);
    }
    rules
}

fn extract_instructions(content: &str) -> String {
    INSTRUCTION_SECTION_GROUPS
        .iter()
        .filter_map(|titles| extract_section(content, titles))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn extract_examples(content: &str) -> Vec<GuidelineExample> {
    static CODE_BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(section) = extract_section(content, EXAMPLE_SECTION_TITLES) else {
        return Vec::new();
    };
    let Some(code_block) = CODE_BLOCK
        .get_or_init(|| Regex::new(r"```\w*\n([\s\S]*?)```").ok())
        .as_ref()
    else {
        return Vec::new();
    };
    code_block
        .captures_iter(&section)
        .enumerate()
        .map(|(index, captures)| GuidelineExample {
            description: format!("Example {}", index + 1),
            body: captures
                .get(1)
                .map(|body| body.as_str().to_string())
                .unwrap_or_default(),
        })
        .collect()
}

/// Returns the trimmed body under the first `##`-or-deeper heading matching
/// one of `titles`, stopping at the next heading outside a code fence.
fn extract_section(content: &str, titles: &[&str]) -> Option<String> {
    let lines = content.lines().collect::<Vec<_>>();
    for title in titles {
        let Some(header) = case_insensitive(&format!(r"^##+\s*{}\s*$", regex::escape(title)))
        else {
            continue;
        };
        let Some(start) = lines
            .iter()
            .position(|line| header.is_match(line))
            .map(|index| index + 1)
        else {
            continue;
        };
        let mut in_fence = false;
        let end = lines[start..]
            .iter()
            .position(|line| {
                let trimmed = line.trim_start();
                if trimmed.starts_with("```") {
                    in_fence = !in_fence;
                }
                !in_fence && trimmed.starts_with("##")
            })
            .map(|offset| start + offset)
            .unwrap_or(lines.len());
        if start < end {
            let section = lines[start..end].join("\n").trim().to_string();
            if !section.is_empty() {
                return Some(section);
            }
        }
    }
    None
}

fn extract_list_items(section: &str, keywords: &[&str]) -> Vec<String> {
    for keyword in keywords {
        let Some(pattern) = case_insensitive(&format!(
            r"{}[:\s]*\n((?:[-*]\s+.*\n?)+)",
            regex::escape(keyword)
        )) else {
            continue;
        };
        let Some(captures) = pattern.captures(section) else {
            continue;
        };
        return captures
            .get(1)
            .map(|items| {
                items
                    .as_str()
                    .lines()
                    .map(|line| line.trim().trim_start_matches(&['-', '*'][..]).trim())
                    .filter(|line| !line.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
    }
    Vec::new()
}

fn extract_int_value(section: &str, patterns: &[&str]) -> Option<usize> {
    patterns.iter().find_map(|pattern| {
        case_insensitive(&format!(r"{pattern}[:\s]*(\d+)"))?
            .captures(section)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    })
}

fn extract_string_value(section: &str, patterns: &[&str]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let value = case_insensitive(&format!(r#"{pattern}[:\s]*["']?([^"'\n]+)["']?"#))?
            .captures(section)?
            .get(1)?
            .as_str()
            .trim()
            .to_string();
        (!value.is_empty()).then_some(value)
    })
}

fn extract_label_requirements(section: &str) -> Vec<LabelRequirement> {
    static LABEL_REQUIREMENT: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = LABEL_REQUIREMENT
        .get_or_init(|| {
            case_insensitive(
                r"(?:label|tag)[:\s]+(priority|type|team|status)[:\s]+(required|optional)?[:\s]*(.*)",
            )
        })
        .as_ref()
    else {
        return Vec::new();
    };
    pattern
        .captures_iter(section)
        .map(|captures| {
            let kind = captures
                .get(1)
                .map(|kind| kind.as_str().to_lowercase())
                .unwrap_or_default();
            let required = captures
                .get(2)
                .is_some_and(|flag| flag.as_str().eq_ignore_ascii_case("required"));
            let allowed_values = captures
                .get(3)
                .map(|values| {
                    values
                        .as_str()
                        .split(',')
                        .map(str::trim)
                        .filter(|value| !value.is_empty())
                        .map(ToOwned::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            LabelRequirement {
                kind,
                required,
                allowed_values,
            }
        })
        .collect()
}

fn case_insensitive(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){pattern}")) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::warn!(pattern, error = %error, "skipping invalid guidelines pattern");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Task Guidelines

## Overview
Tasks describe user-facing outcomes.

## Format Rules
Required Sections:
- Summary
- Acceptance Criteria
* Test Plan

Minimum description length: 120 characters
Label prefix: \"P\"
Label: priority: required: P0, P1, P2

## Instructions
Keep the author's wording where possible.

## Examples
```markdown
## Summary
Add CSV export
```

```
## Summary
Fix login
```
";

    #[test]
    fn functional_parse_extracts_format_rules() {
        let parsed = parse_guidelines(SAMPLE);
        assert_eq!(
            parsed.rules.required_sections,
            vec!["Summary", "Acceptance Criteria", "Test Plan"]
        );
        assert_eq!(parsed.rules.min_description_length, Some(120));
        assert!(parsed.rules.require_labels);
        assert_eq!(parsed.rules.label_prefix.as_deref(), Some("P"));
        assert_eq!(
            parsed.rules.label_requirements,
            vec![LabelRequirement {
                kind: "priority".to_string(),
                required: true,
                allowed_values: vec!["P0".to_string(), "P1".to_string(), "P2".to_string()],
            }]
        );
        assert_eq!(parsed.raw_content, SAMPLE);
    }

    #[test]
    fn functional_parse_collects_instructions_and_examples() {
        let parsed = parse_guidelines(SAMPLE);
        assert_eq!(
            parsed.instructions,
            "Keep the author's wording where possible.\n\nTasks describe user-facing outcomes."
        );
        assert_eq!(parsed.examples.len(), 2);
        assert_eq!(parsed.examples[0].description, "Example 1");
        assert_eq!(parsed.examples[0].body, "## Summary\nAdd CSV export\n");
    }

    #[test]
    fn unit_document_without_format_section_states_nothing() {
        let parsed = parse_guidelines("# Notes\n\nJust prose, nothing structured.");
        assert_eq!(parsed.rules, GuidelineRules::default());
        assert!(parsed.instructions.is_empty());
        assert!(parsed.examples.is_empty());
    }

    #[test]
    fn unit_section_heading_match_is_case_insensitive_and_accepts_deeper_levels() {
        let content = "### format requirements\nSections:\n- Goal\n";
        let parsed = parse_guidelines(content);
        assert_eq!(parsed.rules.required_sections, vec!["Goal"]);
        assert!(!parsed.rules.require_labels);
        assert_eq!(parsed.rules.min_description_length, None);
    }

    #[test]
    fn regression_zero_minimum_is_treated_as_unstated() {
        let parsed = parse_guidelines("## Format\nMinimum length: 0\n");
        assert_eq!(parsed.rules.min_description_length, None);
    }

    #[test]
    fn integration_load_guidelines_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("task-guidelines.md");
        fs::write(&path, SAMPLE).expect("write");
        let loaded = load_guidelines(&path).expect("load");
        assert_eq!(loaded.rules.min_description_length, Some(120));

        let error = load_guidelines(&dir.path().join("missing.md")).expect_err("missing file");
        assert!(error.to_string().contains("failed to read guidelines file"));
    }
}
