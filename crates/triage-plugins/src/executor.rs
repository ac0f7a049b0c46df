//! Runs plugin agents.
//!
//! Agent names that describe a built-in workflow route to it; everything else
//! goes through the action interpreter, which executes the classified steps of
//! the agent's action list against one target issue.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use triage_agents::{
    render_or_fallback, AgentServices, DigestGenerator, DigestKind, DigestReport, MonitorReport,
    ProjectSnapshot, StaleTaskMonitor, Validator, DEFAULT_STALE_THRESHOLD_DAYS, VALIDATED_LABEL,
};
use triage_core::{collapse_blank_lines, format_date, normalize_line_endings, strip_code_fence, Issue};
use triage_rules::{FormatRules, Guidelines};

use crate::classify::{plan_actions, ActionStep};
use crate::PluginAgent;

pub type ResultMap = Map<String, Value>;

const SUMMARY_HEADING: &str = "## Task Summary";
const STALE_THRESHOLD_CONFIG_KEY: &str = "stale_threshold_days";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Built-in behaviour selected by an agent's name.
pub enum AgentRoute {
    Validator,
    Monitor,
    Roaster,
    ExecutiveSummary,
    ProgressReporter,
    Generic,
}

/// First matching rule wins, checked in declaration order.
pub fn route_for(name: &str) -> AgentRoute {
    let lower = name.to_lowercase();
    if lower.contains("validator") {
        AgentRoute::Validator
    } else if lower.contains("monitor") {
        AgentRoute::Monitor
    } else if lower.contains("roaster") {
        AgentRoute::Roaster
    } else if lower.contains("executive summary") {
        AgentRoute::ExecutiveSummary
    } else if lower.contains("progress reporter") {
        AgentRoute::ProgressReporter
    } else {
        AgentRoute::Generic
    }
}

/// Target issue number from `issue_number` or `issue`; positive integers or
/// floats only.
pub fn extract_issue_number(params: &ResultMap) -> Option<u64> {
    ["issue_number", "issue"].iter().find_map(|key| {
        let value = params.get(*key)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|float| *float >= 1.0).map(|float| float as u64))
            .filter(|number| *number > 0)
    })
}

pub struct PluginExecutor {
    services: AgentServices,
    rules: FormatRules,
    guidelines: Option<Guidelines>,
}

impl PluginExecutor {
    pub fn new(services: AgentServices, rules: FormatRules) -> Self {
        Self {
            services,
            rules,
            guidelines: None,
        }
    }

    pub fn with_guidelines(mut self, guidelines: Option<Guidelines>) -> Self {
        self.guidelines = guidelines;
        self
    }

    pub async fn execute(&self, agent: &PluginAgent, params: &ResultMap) -> Result<ResultMap> {
        self.execute_at(agent, params, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        agent: &PluginAgent,
        params: &ResultMap,
        now: DateTime<Utc>,
    ) -> Result<ResultMap> {
        let route = route_for(&agent.name);
        tracing::debug!(agent = %agent.name, route = ?route, "executing plugin agent");
        match route {
            AgentRoute::Validator => self.run_validator(agent, params).await,
            AgentRoute::Monitor => self.run_monitor(agent, params, now).await,
            AgentRoute::Roaster => self.run_digest(agent, DigestKind::Roast, now).await,
            AgentRoute::ExecutiveSummary => {
                self.run_digest(agent, DigestKind::ExecutiveSummary, now).await
            }
            AgentRoute::ProgressReporter => {
                self.run_digest(agent, DigestKind::ProgressReport, now).await
            }
            AgentRoute::Generic => self.run_generic(agent, params, now).await,
        }
    }

    async fn run_validator(&self, agent: &PluginAgent, params: &ResultMap) -> Result<ResultMap> {
        let requested = match extract_issue_number(params) {
            Some(number) => Some(
                self.services
                    .store
                    .get_issue(None, number)
                    .await
                    .with_context(|| format!("failed to get issue #{number}"))?,
            ),
            None => None,
        };

        let mut validator = Validator::new(self.services.clone(), self.rules.clone());
        if let Some(guidelines) = self.guidelines.clone() {
            validator = validator.with_guidelines(guidelines);
        }
        let report = validator.validate_all().await?;

        let mut result = ResultMap::new();
        result.insert("agent".to_string(), json!(agent.name));
        result.insert("status".to_string(), json!("completed"));
        result.insert("total_issues".to_string(), json!(report.total));
        result.insert("validated_count".to_string(), json!(report.validated));
        result.insert("fixed_count".to_string(), json!(report.fixed));
        result.insert("skipped_count".to_string(), json!(report.skipped));
        result.insert("validated_issues".to_string(), serde_json::to_value(&report.outcomes)?);
        result.insert("sentinel_label".to_string(), json!(VALIDATED_LABEL));
        result.insert("message".to_string(), json!(report.summary_message()));
        if let Some(issue) = requested {
            result.insert("requested_issue".to_string(), json!(issue.number));
            result.insert("requested_title".to_string(), json!(issue.title));
        }
        if !report.errors.is_empty() {
            result.insert("error_count".to_string(), json!(report.errors.len()));
            result.insert("errors".to_string(), json!(report.errors));
        }
        Ok(result)
    }

    async fn run_monitor(
        &self,
        agent: &PluginAgent,
        params: &ResultMap,
        now: DateTime<Utc>,
    ) -> Result<ResultMap> {
        let threshold = agent
            .config_i64(STALE_THRESHOLD_CONFIG_KEY)
            .unwrap_or(DEFAULT_STALE_THRESHOLD_DAYS);
        let monitor = StaleTaskMonitor::new(self.services.clone(), threshold)
            .with_banner(agent.name.clone())
            .with_template(agent.template_name());

        let report = match extract_issue_number(params) {
            Some(number) => monitor.check_issue(number, now).await?,
            None => monitor.check_all(now).await?,
        };
        Ok(monitor_result(agent, &report))
    }

    async fn run_digest(
        &self,
        agent: &PluginAgent,
        kind: DigestKind,
        now: DateTime<Utc>,
    ) -> Result<ResultMap> {
        let agent_template = agent.template_name();
        let template = self
            .services
            .prompts
            .has_template(&agent_template)
            .then_some(agent_template.as_str());
        let report = DigestGenerator::new(self.services.clone())
            .generate(kind, template, now)
            .await?;
        Ok(digest_result(agent, &report))
    }

    async fn run_generic(
        &self,
        agent: &PluginAgent,
        params: &ResultMap,
        now: DateTime<Utc>,
    ) -> Result<ResultMap> {
        let mut result = ResultMap::new();
        result.insert("agent".to_string(), json!(agent.name));
        result.insert("type".to_string(), json!(agent.kind));
        result.insert("status".to_string(), json!("executed"));
        result.insert("actions".to_string(), json!(agent.actions));

        let target = extract_issue_number(params);
        if let Some(number) = target {
            result.insert("issue".to_string(), json!(number));
        }
        let mut cached: Option<Issue> = None;

        for step in plan_actions(agent) {
            match step {
                ActionStep::LengthGate { min_length } => {
                    let Some(number) = target else { continue };
                    let issue = self.cached_issue(&mut cached, number).await?;
                    let length = issue.body_char_count();
                    if length < min_length {
                        result.insert("status".to_string(), json!("skipped"));
                        result.insert(
                            "message".to_string(),
                            json!(format!(
                                "Task is too short to summarize ({length} chars, minimum {min_length})"
                            )),
                        );
                        tracing::info!(agent = %agent.name, issue = number, length, min_length, "length gate stopped plugin");
                        return Ok(result);
                    }
                    result.insert("task_length".to_string(), json!(length));
                    result.insert("length_check_passed".to_string(), json!(true));
                }
                ActionStep::Generate { template } => {
                    let Some(number) = target else { continue };
                    let issue = self.cached_issue(&mut cached, number).await?.clone();
                    match self
                        .generate(agent, &template, &issue, params, now)
                        .await
                    {
                        Ok(summary) if !summary.is_empty() => {
                            result.insert("summary".to_string(), json!(summary));
                            result.insert("content".to_string(), json!(summary));
                            result.insert("llm_called".to_string(), json!(true));
                        }
                        Ok(_) => {}
                        Err(error) => {
                            tracing::warn!(agent = %agent.name, error = %error, "plugin generate step failed");
                            result.insert("generate_error".to_string(), json!(format!("{error:#}")));
                        }
                    }
                }
                ActionStep::Comment => {
                    let Some(number) = target else { continue };
                    let issue = self.cached_issue(&mut cached, number).await?.clone();
                    let content = result
                        .get("summary")
                        .and_then(Value::as_str)
                        .filter(|summary| !summary.is_empty())
                        .map(ToOwned::to_owned)
                        .unwrap_or_else(|| format!("🤖 **{}** executed successfully.", agent.name));
                    let comment = format!("🤖 **{}**\n\n{}", agent.name, content.trim());
                    match self
                        .services
                        .store
                        .add_comment(issue.repo_ref().as_ref(), number, &comment)
                        .await
                    {
                        Ok(()) => {
                            result.insert("comment_added".to_string(), json!(true));
                            if result.contains_key("summary") || !result.contains_key("message") {
                                result.insert(
                                    "message".to_string(),
                                    json!(format!(
                                        "Summary generated and added as comment to issue #{number}"
                                    )),
                                );
                            }
                            result.insert("status".to_string(), json!("completed"));
                        }
                        Err(error) => {
                            tracing::warn!(agent = %agent.name, issue = number, error = %error, "plugin comment failed");
                            result.insert("comment_error".to_string(), json!(format!("{error:#}")));
                        }
                    }
                }
            }
        }

        if !result.contains_key("message") {
            result.insert(
                "message".to_string(),
                json!(format!(
                    "Plugin '{}' executed with {} actions",
                    agent.name,
                    agent.actions.len()
                )),
            );
        }
        Ok(result)
    }

    async fn cached_issue<'a>(&self, cached: &'a mut Option<Issue>, number: u64) -> Result<&'a Issue> {
        if cached.is_none() {
            let issue = self
                .services
                .store
                .get_issue(None, number)
                .await
                .with_context(|| format!("failed to get issue #{number}"))?;
            *cached = Some(issue);
        }
        cached
            .as_ref()
            .with_context(|| format!("issue #{number} not cached"))
    }

    async fn generate(
        &self,
        agent: &PluginAgent,
        template: &str,
        issue: &Issue,
        params: &ResultMap,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let mut data = ResultMap::new();
        data.insert("title".to_string(), json!(issue.title));
        data.insert("body".to_string(), json!(issue.body));
        data.insert("labels".to_string(), json!(issue.labels_joined()));
        data.insert("state".to_string(), json!(issue.state.as_str()));
        data.insert(
            "assignee".to_string(),
            json!(issue.assignee.clone().unwrap_or_default()),
        );
        data.insert("number".to_string(), json!(issue.number));
        data.insert("created_at".to_string(), json!(format_date(issue.created_at)));
        data.insert("updated_at".to_string(), json!(format_date(issue.updated_at)));
        if wants_project_stats(&agent.name) {
            match ProjectSnapshot::gather(self.services.store.as_ref(), now).await {
                Ok(snapshot) => data.extend(snapshot.stats_map()),
                Err(error) => {
                    tracing::warn!(agent = %agent.name, error = %error, "project statistics unavailable")
                }
            }
        }
        data.extend(params.iter().map(|(key, value)| (key.clone(), value.clone())));
        let data = Value::Object(data);

        let prompt = render_or_fallback(self.services.prompts.as_ref(), template, &data, || {
            fallback_generate_prompt(issue)
        })?;
        let raw = self
            .services
            .completion
            .complete(&prompt)
            .await
            .context("LLM call failed")?;
        Ok(post_process_summary(&raw))
    }
}

fn wants_project_stats(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["executive", "progress", "summary"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn fallback_generate_prompt(issue: &Issue) -> String {
    format!(
        "You are a helpful assistant. Based on the following GitHub issue, provide a concise summary.\n\
\n\
Title: {}\n\
Body: {}\n\
Labels: {}\n\
State: {}\n\
Assignee: {}\n\
\n\
Provide a clear, concise summary.",
        issue.title,
        issue.body,
        issue.labels_joined(),
        issue.state,
        issue.assignee.as_deref().unwrap_or_default()
    )
}

/// Normalizes a generated summary for posting as a GitHub comment.
///
/// A bare `Summary:` lead-in is rewritten under the task summary heading, and
/// text that mentions an objective without the heading gets it prepended.
pub fn post_process_summary(raw: &str) -> String {
    let mut summary = normalize_line_endings(&strip_code_fence(raw))
        .trim()
        .to_string();

    if let Some(rest) = summary
        .strip_prefix("Summary:")
        .or_else(|| summary.strip_prefix("summary:"))
    {
        summary = format!("{SUMMARY_HEADING}\n\n**Objective**: {}", rest.trim());
    }
    if !summary.starts_with(SUMMARY_HEADING)
        && (summary.contains("Objective") || summary.contains("objective"))
    {
        summary = format!("{SUMMARY_HEADING}\n\n{summary}");
    }

    let spaced = summary
        .replace("\n##", "\n\n##")
        .replace("\n**", "\n\n**")
        .replace("\n\n\n**", "\n\n**");
    collapse_blank_lines(&spaced).trim().to_string()
}

fn monitor_result(agent: &PluginAgent, report: &MonitorReport) -> ResultMap {
    let stale = report.stale_numbers();
    let commented = report.commented_numbers();
    let errors = report.errors();

    let mut result = ResultMap::new();
    result.insert("agent".to_string(), json!(agent.name));
    result.insert("status".to_string(), json!("monitored"));
    result.insert("total_checked".to_string(), json!(report.total_checked));
    result.insert("stale_issues".to_string(), json!(stale));
    result.insert("commented_issues".to_string(), json!(commented));
    result.insert(
        "stale_threshold".to_string(),
        json!(format!("{} days", report.threshold_days)),
    );

    match report.checked_issue {
        Some(number) => {
            result.insert("issue".to_string(), json!(number));
            match report.stale.first() {
                Some(outcome) => {
                    result.insert("title".to_string(), json!(outcome.title));
                    result.insert("is_stale".to_string(), json!(true));
                    result.insert("days_stale".to_string(), json!(outcome.days_stale));
                    result.insert(
                        "message".to_string(),
                        json!(format!("Issue #{number} is stale and has been commented")),
                    );
                }
                None => {
                    result.insert("is_stale".to_string(), json!(false));
                    result.insert(
                        "message".to_string(),
                        json!(format!("Issue #{number} is not stale")),
                    );
                }
            }
        }
        None => {
            result.insert("total_issues".to_string(), json!(report.total_checked));
            result.insert(
                "message".to_string(),
                json!(format!(
                    "Checked {} issues, found {} stale, commented on {}",
                    report.total_checked,
                    stale.len(),
                    commented.len()
                )),
            );
        }
    }

    if !errors.is_empty() {
        result.insert(
            "warning".to_string(),
            json!(format!("Some comments failed: {} errors", errors.len())),
        );
        result.insert("errors".to_string(), json!(errors));
    }
    result
}

fn digest_result(agent: &PluginAgent, report: &DigestReport) -> ResultMap {
    let (text_key, label) = match report.kind {
        DigestKind::ExecutiveSummary => ("summary", "Executive summary"),
        DigestKind::ProgressReport => ("report", "Progress report"),
        DigestKind::Roast => ("roast", "Product roast"),
    };

    let mut result = ResultMap::new();
    result.insert("agent".to_string(), json!(agent.name));
    result.insert("status".to_string(), json!("completed"));
    result.insert("title".to_string(), json!(report.title));
    result.insert(text_key.to_string(), json!(report.text));
    result.insert("metrics".to_string(), report.metrics.clone());
    match &report.created_issue {
        Some(created) => {
            result.insert("issue_created".to_string(), json!(true));
            result.insert("created_issue_number".to_string(), json!(created.number));
            result.insert("created_issue_url".to_string(), json!(created.url));
            result.insert(
                "message".to_string(),
                json!(format!(
                    "{label} generated and issue #{} created",
                    created.number
                )),
            );
        }
        None => {
            result.insert("issue_created".to_string(), json!(false));
            result.insert(
                "message".to_string(),
                json!(format!(
                    "{label} generated successfully (issue creation failed)"
                )),
            );
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_issue_number, post_process_summary, route_for, AgentRoute, ResultMap};

    #[test]
    fn unit_route_for_matches_name_fragments_in_priority_order() {
        assert_eq!(route_for("Task Validator"), AgentRoute::Validator);
        assert_eq!(route_for("Stale Task Monitor"), AgentRoute::Monitor);
        assert_eq!(route_for("Product Roaster"), AgentRoute::Roaster);
        assert_eq!(route_for("Executive Summary Generator"), AgentRoute::ExecutiveSummary);
        assert_eq!(route_for("Weekly Progress Reporter"), AgentRoute::ProgressReporter);
        assert_eq!(route_for("Task Summarizer"), AgentRoute::Generic);
        assert_eq!(route_for("Validator Monitor"), AgentRoute::Validator);
    }

    #[test]
    fn unit_extract_issue_number_accepts_positive_ints_and_floats() {
        let params = |value: serde_json::Value| -> ResultMap {
            json!(value).as_object().cloned().unwrap_or_default()
        };
        assert_eq!(extract_issue_number(&params(json!({"issue_number": 12}))), Some(12));
        assert_eq!(extract_issue_number(&params(json!({"issue": 7.0}))), Some(7));
        assert_eq!(
            extract_issue_number(&params(json!({"issue_number": 0, "issue": 3}))),
            Some(3)
        );
        assert_eq!(extract_issue_number(&params(json!({"issue": -4}))), None);
        assert_eq!(extract_issue_number(&params(json!({"issue": "5"}))), None);
        assert_eq!(extract_issue_number(&ResultMap::new()), None);
    }

    #[test]
    fn unit_post_process_rewrites_bare_summary_prefix() {
        assert_eq!(
            post_process_summary("Summary: ship the exporter"),
            "## Task Summary\n\n**Objective**: ship the exporter"
        );
    }

    #[test]
    fn unit_post_process_strips_fences_and_collapses_blank_lines() {
        let raw = "```markdown\r\n## Task Summary\r\n**Objective**: export\r\n\r\n\r\n\r\nDone\r\n```";
        assert_eq!(
            post_process_summary(raw),
            "## Task Summary\n\n**Objective**: export\n\nDone"
        );
    }

    #[test]
    fn regression_post_process_prepends_heading_when_objective_is_mentioned() {
        assert_eq!(
            post_process_summary("The objective is to ship."),
            "## Task Summary\n\nThe objective is to ship."
        );
        assert_eq!(post_process_summary("  plain text  "), "plain text");
    }
}
