//! Nudges assignees of open issues that have gone quiet.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use triage_core::{days_since, format_date, strip_code_fence, Issue, IssueStateFilter};

use crate::{render_or_fallback, AgentServices};

pub const DEFAULT_STALE_THRESHOLD_DAYS: i64 = 7;

const MONITOR_TEMPLATE: &str = "monitor";
const DEFAULT_BANNER: &str = "Agent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleIssueOutcome {
    pub number: u64,
    pub title: String,
    pub assignee: String,
    pub days_stale: i64,
    /// Posted comment; absent when the comment could not be produced or sent.
    pub comment: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    pub threshold_days: i64,
    pub total_checked: usize,
    pub stale: Vec<StaleIssueOutcome>,
    /// Set when the run targeted one issue.
    pub checked_issue: Option<u64>,
}

impl MonitorReport {
    pub fn stale_numbers(&self) -> Vec<u64> {
        self.stale.iter().map(|outcome| outcome.number).collect()
    }

    pub fn commented_numbers(&self) -> Vec<u64> {
        self.stale
            .iter()
            .filter(|outcome| outcome.comment.is_some())
            .map(|outcome| outcome.number)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.stale
            .iter()
            .filter_map(|outcome| {
                outcome
                    .error
                    .as_ref()
                    .map(|error| format!("issue #{}: {error}", outcome.number))
            })
            .collect()
    }
}

/// Comment used when the model cannot phrase the nudge.
pub fn stale_fallback_message(assignee: &str, days_stale: i64) -> String {
    format!(
        "👋 Hey @{assignee}! This task has been in progress for {days_stale} days. Could you share a quick status update? Thanks! 🙏"
    )
}

pub struct StaleTaskMonitor {
    services: AgentServices,
    threshold_days: i64,
    banner: String,
    template: String,
}

impl StaleTaskMonitor {
    pub fn new(services: AgentServices, threshold_days: i64) -> Self {
        Self {
            services,
            threshold_days,
            banner: DEFAULT_BANNER.to_string(),
            template: MONITOR_TEMPLATE.to_string(),
        }
    }

    /// Name shown in the comment banner.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn threshold_days(&self) -> i64 {
        self.threshold_days
    }

    /// An issue is stale when it has an assignee and its last update is older
    /// than the threshold.
    pub fn is_stale(&self, issue: &Issue, now: DateTime<Utc>) -> bool {
        issue.assignee.is_some() && issue.updated_at < now - Duration::days(self.threshold_days)
    }

    pub async fn check_all(&self, now: DateTime<Utc>) -> Result<MonitorReport> {
        let issues = self
            .services
            .store
            .list_issues(IssueStateFilter::Open)
            .await
            .context("failed to list issues")?;
        let report = self.check_issues(&issues, now, None).await;
        tracing::info!(
            checked = report.total_checked,
            stale = report.stale.len(),
            commented = report.commented_numbers().len(),
            "stale task check complete"
        );
        Ok(report)
    }

    pub async fn check_issue(&self, number: u64, now: DateTime<Utc>) -> Result<MonitorReport> {
        let issue = self
            .services
            .store
            .get_issue(None, number)
            .await
            .with_context(|| format!("failed to get issue #{number}"))?;
        Ok(self
            .check_issues(std::slice::from_ref(&issue), now, Some(number))
            .await)
    }

    async fn check_issues(
        &self,
        issues: &[Issue],
        now: DateTime<Utc>,
        checked_issue: Option<u64>,
    ) -> MonitorReport {
        let mut report = MonitorReport {
            threshold_days: self.threshold_days,
            total_checked: issues.len(),
            checked_issue,
            ..MonitorReport::default()
        };
        for issue in issues.iter().filter(|issue| self.is_stale(issue, now)) {
            report.stale.push(self.nudge(issue, now).await);
        }
        report
    }

    async fn nudge(&self, issue: &Issue, now: DateTime<Utc>) -> StaleIssueOutcome {
        let assignee = issue.assignee.clone().unwrap_or_default();
        let days_stale = days_since(issue.updated_at, now);
        let mut outcome = StaleIssueOutcome {
            number: issue.number,
            title: issue.title.clone(),
            assignee: assignee.clone(),
            days_stale,
            comment: None,
            error: None,
        };

        let message = match self.message(issue, &assignee, days_stale).await {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(issue = issue.number, error = %error, "failed to build stale nudge");
                outcome.error = Some(format!("{error:#}"));
                return outcome;
            }
        };
        let comment = format!("🤖 **{}**: {message}", self.banner);

        match self
            .services
            .store
            .add_comment(issue.repo_ref().as_ref(), issue.number, &comment)
            .await
        {
            Ok(()) => outcome.comment = Some(comment),
            Err(error) => {
                tracing::warn!(issue = issue.number, error = %error, "failed to post stale nudge");
                outcome.error = Some(format!("{error:#}"));
            }
        }
        outcome
    }

    async fn message(&self, issue: &Issue, assignee: &str, days_stale: i64) -> Result<String> {
        let last_updated = format_date(issue.updated_at);
        let data = json!({
            "title": issue.title,
            "number": issue.number,
            "assignee": assignee,
            "last_updated": last_updated,
            "days_stale": days_stale,
            "url": issue.url,
        });
        let prompt = render_or_fallback(
            self.services.prompts.as_ref(),
            &self.template,
            &data,
            || {
                format!(
                    "Generate a friendly but professional message to check on the progress of a GitHub task.\n\
\n\
Task details:\n\
- Title: {title}\n\
- Number: #{number}\n\
- Assigned to: {assignee}\n\
- Last updated: {last_updated} ({days_stale} days ago)\n\
- URL: {url}\n\
\n\
The task has been in progress for {days_stale} days without updates. Ask for a status update in a friendly, non-pushy way. Keep it concise (2-3 sentences). Return ONLY the message text.",
                    title = issue.title,
                    number = issue.number,
                    url = issue.url,
                )
            },
        )?;

        match self.services.completion.complete(&prompt).await {
            Ok(reply) => Ok(strip_code_fence(&reply)),
            Err(error) => {
                tracing::warn!(issue = issue.number, error = %error, "llm nudge failed, using fallback message");
                Ok(stale_fallback_message(assignee, days_stale))
            }
        }
    }
}
