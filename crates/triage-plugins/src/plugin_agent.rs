//! Markdown-defined agents loaded from `<plugins>/core` and `<plugins>/custom`.
//!
//! ```markdown
//! # Agent: Task Summarizer
//! **Purpose**: Summarize long tasks
//!
//! ## Triggers
//! - event: issues.opened
//! - labels: [needs-summary]
//!
//! ## Actions
//! 1. Check if task body is long enough
//! 2. Generate summary using LLM
//! 3. Add summary as a comment
//!
//! ## Configuration
//! (fenced yaml block, e.g. min_length_for_summary: 300)
//!
//! ## Prompt
//! Prompt path: prompts/summarizer.md
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

const NAME_PREFIX: &str = "# Agent:";
const PURPOSE_PREFIX: &str = "**Purpose**:";
const TYPE_PREFIX: &str = "**Type**:";
const MAX_TRIGGER_LINES: usize = 20;
const MAX_ACTION_LINES: usize = 50;
const KNOWN_PROMPT_PREFIXES: &[&str] = &[
    "prompts/",
    ".github/agents/custom/prompts/",
    ".github/agents/core/prompts/",
];
const INFERRED_NAME_STRIPS: &[&str] = &["task-", "executive-", "priority-", "progress-"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// When an agent should run.
pub struct Trigger {
    pub event: Option<String>,
    /// Cron expression.
    pub schedule: Option<String>,
    pub condition: Option<String>,
    pub manual: bool,
    pub labels: Vec<String>,
}

impl Trigger {
    fn is_meaningful(&self) -> bool {
        self.event.is_some() || self.schedule.is_some() || self.manual
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PluginAgent {
    pub name: String,
    /// `core` or `custom` unless the file overrides it.
    pub kind: String,
    pub purpose: String,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<String>,
    pub config: Map<String, Value>,
    pub prompt_path: Option<String>,
    #[serde(skip)]
    pub raw_content: String,
    pub file_path: PathBuf,
}

impl PluginAgent {
    /// Event triggers match on equal event names when every required label is
    /// present; manual triggers match the `manual` event.
    pub fn matches_trigger(&self, event: &str, labels: &[String]) -> bool {
        self.triggers.iter().any(|trigger| {
            let event_match = trigger.event.as_deref() == Some(event)
                && trigger
                    .labels
                    .iter()
                    .all(|required| labels.iter().any(|label| label == required));
            event_match || (trigger.manual && event == "manual")
        })
    }

    pub fn schedule(&self) -> Option<&str> {
        self.triggers
            .iter()
            .find_map(|trigger| trigger.schedule.as_deref())
    }

    /// Prompt template name for this agent.
    ///
    /// A prompt path loses its `.md` suffix, known prompt directory prefixes,
    /// and any remaining directories. Without a path the name is derived from
    /// the agent name.
    pub fn template_name(&self) -> String {
        let Some(path) = self.prompt_path.as_deref().filter(|path| !path.is_empty()) else {
            let mut inferred = self.name.to_lowercase().replace(' ', "-");
            for strip in INFERRED_NAME_STRIPS {
                inferred = inferred.replace(strip, "");
            }
            return inferred;
        };
        let mut name = path.strip_suffix(".md").unwrap_or(path);
        for prefix in KNOWN_PROMPT_PREFIXES {
            name = name.strip_prefix(prefix).unwrap_or(name);
        }
        name.rsplit('/').next().unwrap_or(name).to_string()
    }

    /// Integer configuration value; whole floats are accepted.
    pub fn config_i64(&self, key: &str) -> Option<i64> {
        let value = self.config.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float as i64))
    }
}

/// Loads `core` then `custom` agents beneath `base`.
///
/// Missing directories contribute nothing; files that fail to read or that
/// declare no agent name are logged and skipped.
pub fn load_plugins(base: &Path) -> Result<Vec<PluginAgent>> {
    let mut agents = load_dir(&base.join("core"), "core")?;
    agents.extend(load_dir(&base.join("custom"), "custom")?);
    tracing::debug!(path = %base.display(), agents = agents.len(), "loaded plugin agents");
    Ok(agents)
}

fn load_dir(dir: &Path, kind: &str) -> Result<Vec<PluginAgent>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("failed to read plugin directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("md")
        })
        .collect::<Vec<_>>();
    paths.sort();

    let mut agents = Vec::new();
    for path in paths {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "failed to read plugin agent");
                continue;
            }
        };
        let mut agent = parse_plugin_markdown(&content, kind);
        if agent.name.is_empty() {
            tracing::warn!(path = %path.display(), "plugin file declares no '# Agent:' name, skipping");
            continue;
        }
        agent.file_path = path;
        agents.push(agent);
    }
    Ok(agents)
}

/// Parses one agent definition. Never fails; unrecognized lines are ignored.
pub fn parse_plugin_markdown(content: &str, default_kind: &str) -> PluginAgent {
    let mut agent = PluginAgent {
        kind: default_kind.to_string(),
        raw_content: content.to_string(),
        ..PluginAgent::default()
    };
    let lines = content.lines().collect::<Vec<_>>();
    let mut section = String::new();
    let mut yaml_block: Option<String> = None;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some(block) = yaml_block.as_mut() {
            if trimmed == "```" {
                merge_yaml_config(&mut agent.config, block);
                yaml_block = None;
            } else {
                block.push_str(line);
                block.push('\n');
            }
            continue;
        }
        if trimmed == "```yaml" {
            yaml_block = Some(String::new());
            continue;
        }

        if let Some(name) = line.strip_prefix(NAME_PREFIX) {
            agent.name = name.trim().to_string();
            continue;
        }
        if let Some(purpose) = line.strip_prefix(PURPOSE_PREFIX) {
            agent.purpose = purpose.trim().to_string();
            continue;
        }
        if let Some(kind) = line.strip_prefix(TYPE_PREFIX) {
            agent.kind = kind.trim().to_string();
            continue;
        }
        if let Some(heading) = line.strip_prefix("## ") {
            section = heading.trim().to_lowercase();
            if matches!(section.as_str(), "trigger" | "triggers") {
                agent.triggers = parse_triggers(&lines[index + 1..]);
            }
            continue;
        }

        if section == "actions" && agent.actions.is_empty() && is_list_item(trimmed) {
            agent.actions = parse_list_items(&lines[index..]);
        }

        if section == "actions" || !line.to_lowercase().contains("prompt") {
            continue;
        }
        if let Some((_, path)) = line.split_once("path:") {
            let path = path.trim();
            if !path.is_empty() {
                agent.prompt_path = Some(path.to_string());
            }
        }
    }
    agent
}

fn merge_yaml_config(config: &mut Map<String, Value>, block: &str) {
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Object(parsed)) => config.extend(parsed),
        Ok(_) => tracing::debug!("plugin yaml block is not a mapping, ignoring"),
        Err(error) => tracing::warn!(error = %error, "failed to parse plugin yaml block"),
    }
}

fn parse_triggers(lines: &[&str]) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    let mut current = Trigger::default();

    for line in lines.iter().take(MAX_TRIGGER_LINES).map(|line| line.trim()) {
        if line.is_empty() || line.starts_with("##") {
            if current.is_meaningful() {
                triggers.push(std::mem::take(&mut current));
            }
            if line.starts_with("##") {
                break;
            }
            continue;
        }
        if let Some(event) = line.strip_prefix("- event:") {
            current.event = Some(event.trim().to_string());
        } else if let Some(schedule) = line.strip_prefix("- schedule:") {
            current.schedule = Some(schedule.trim().trim_matches('"').to_string());
        } else if let Some(condition) = line.strip_prefix("- condition:") {
            current.condition = Some(condition.trim().to_string());
        } else if let Some(manual) = line.strip_prefix("- manual:") {
            current.manual = manual.trim().eq_ignore_ascii_case("true");
        } else if let Some(labels) = line.strip_prefix("- labels:") {
            current.labels = parse_string_list(labels);
        }
    }
    if current.is_meaningful() {
        triggers.push(current);
    }
    triggers
}

fn is_list_item(line: &str) -> bool {
    line.starts_with("- ")
        || line.starts_with("* ")
        || (line.len() >= 3 && line.starts_with(|c: char| c.is_ascii_digit()))
}

fn parse_list_items(lines: &[&str]) -> Vec<String> {
    let mut items = Vec::new();
    for line in lines.iter().take(MAX_ACTION_LINES).map(|line| line.trim()) {
        if line.starts_with("##") {
            break;
        }
        let item = if let Some(bullet) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            Some(bullet)
        } else {
            numbered_item(line)
        };
        if let Some(item) = item.map(str::trim).filter(|item| !item.is_empty()) {
            items.push(item.to_string());
        }
    }
    items
}

/// Text after an `N. ` marker.
fn numbered_item(line: &str) -> Option<&str> {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

fn parse_string_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|part| part.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
