//! Project-wide digests published as new issues.
//!
//! Each digest gathers a [`ProjectSnapshot`], renders its prompt, makes one
//! completion call, cleans the markdown, and files one issue carrying
//! `automated` plus kind-specific labels. Issue creation is best effort: the
//! generated text is returned either way.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use triage_core::{clean_markdown_response, format_date};
use triage_github::NewIssue;

use crate::metrics::{ProjectSnapshot, VELOCITY_WINDOW_DAYS};
use crate::{render_or_fallback, AgentServices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestKind {
    ExecutiveSummary,
    ProgressReport,
    Roast,
}

impl DigestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "executive-summary",
            Self::ProgressReport => "progress-report",
            Self::Roast => "roast",
        }
    }

    pub fn title_prefix(self) -> &'static str {
        match self {
            Self::ExecutiveSummary => "Executive Summary",
            Self::ProgressReport => "Progress Report",
            Self::Roast => "Product Roast",
        }
    }

    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::ExecutiveSummary => &["automated", "executive-summary", "report"],
            Self::ProgressReport => &["automated", "progress-report", "report"],
            Self::Roast => &["automated", "roast"],
        }
    }

    /// Template rendered when the caller does not name one.
    pub fn default_template(self) -> &'static str {
        self.as_str()
    }

    fn prompt_data(self, snapshot: &ProjectSnapshot) -> Value {
        let date = format_date(snapshot.taken_at);
        match self {
            Self::ExecutiveSummary => json!({
                "total_issues": snapshot.open.len(),
                "open_issues": snapshot.open.len(),
                "in_progress": snapshot.in_progress_count(),
                "completed": snapshot.closed.len(),
                "blocked": snapshot.blocked_count(),
                "issues_by_status": format!(
                    "- open: {}\n- closed: {}",
                    snapshot.open.len(),
                    snapshot.closed.len()
                ),
                "recent_issues": snapshot.recent_open_lines(),
                "date": date,
            }),
            Self::ProgressReport => json!({
                "start_date": format_date(snapshot.window_start()),
                "end_date": date,
                "total_tasks": snapshot.total(),
                "completed_tasks": snapshot.closed.len(),
                "completion_rate": format!("{:.1}", snapshot.completion_rate()),
                "in_progress_tasks": snapshot.in_progress_count(),
                "open_tasks": snapshot.open.len(),
                "blocked_tasks": snapshot.blocked_count(),
                "velocity": format!("{:.1}", snapshot.velocity()),
                "recent_activity": snapshot.recent_activity_lines(),
            }),
            Self::Roast => json!({
                "total_issues": snapshot.total(),
                "open_issues": snapshot.open.len(),
                "closed_issues": snapshot.closed.len(),
                "unassigned_issues": snapshot.unassigned_count(),
                "unlabeled_issues": snapshot.unlabeled_count(),
                "blocked_issues": snapshot.blocked_count(),
                "stale_issues": quiet_open_count(snapshot),
                "recent_issues": snapshot.recent_open_lines(),
                "date": date,
            }),
        }
    }

    fn fallback_prompt(self, snapshot: &ProjectSnapshot) -> String {
        match self {
            Self::ExecutiveSummary => format!(
                "Create an executive summary for this project:\n\
\n\
Total Issues: {}\n\
Open: {}\n\
Completed: {}\n\
Blocked: {}\n\
\n\
Provide a high-level strategic overview focusing on business impact, risks, and opportunities.",
                snapshot.open.len(),
                snapshot.open.len(),
                snapshot.closed.len(),
                snapshot.blocked_count()
            ),
            Self::ProgressReport => format!(
                "Create a progress report:\n\
\n\
Period: Last {VELOCITY_WINDOW_DAYS} days\n\
Total Tasks: {}\n\
Completed: {} ({:.1}%)\n\
Blocked: {}\n\
Velocity: {:.1} tasks/day\n\
\n\
Provide a comprehensive progress report with metrics, achievements, risks, and recommendations.",
                snapshot.total(),
                snapshot.closed.len(),
                snapshot.completion_rate(),
                snapshot.blocked_count(),
                snapshot.velocity()
            ),
            Self::Roast => format!(
                "You are a brutally honest but constructive product critic. Roast the state of this project based on its issue tracker:\n\
\n\
Total Issues: {}\n\
Open: {}\n\
Closed: {}\n\
Unassigned: {}\n\
Unlabeled: {}\n\
Blocked: {}\n\
Quiet for more than {VELOCITY_WINDOW_DAYS} days: {}\n\
\n\
Recent open issues:\n\
{}\n\
\n\
Be witty but fair, then finish with concrete recommendations.",
                snapshot.total(),
                snapshot.open.len(),
                snapshot.closed.len(),
                snapshot.unassigned_count(),
                snapshot.unlabeled_count(),
                snapshot.blocked_count(),
                quiet_open_count(snapshot),
                snapshot.recent_open_lines()
            ),
        }
    }

    fn metrics(self, snapshot: &ProjectSnapshot) -> Value {
        match self {
            Self::ExecutiveSummary => json!({
                "total_issues": snapshot.open.len(),
                "open": snapshot.open.len(),
                "completed": snapshot.closed.len(),
                "blocked": snapshot.blocked_count(),
            }),
            Self::ProgressReport => json!({
                "total_tasks": snapshot.total(),
                "completed": snapshot.closed.len(),
                "completion_rate": snapshot.completion_rate(),
                "blocked": snapshot.blocked_count(),
                "velocity": snapshot.velocity(),
            }),
            Self::Roast => json!({
                "total_issues": snapshot.total(),
                "open": snapshot.open.len(),
                "unassigned": snapshot.unassigned_count(),
                "unlabeled": snapshot.unlabeled_count(),
                "blocked": snapshot.blocked_count(),
            }),
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedIssue {
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestReport {
    pub kind: DigestKind,
    pub title: String,
    pub text: String,
    pub metrics: Value,
    pub created_issue: Option<CreatedIssue>,
}

pub struct DigestGenerator {
    services: AgentServices,
}

impl DigestGenerator {
    pub fn new(services: AgentServices) -> Self {
        Self { services }
    }

    /// Generates and files one digest. `template` overrides the kind's
    /// default template name.
    pub async fn generate(
        &self,
        kind: DigestKind,
        template: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DigestReport> {
        let snapshot = ProjectSnapshot::gather(self.services.store.as_ref(), now).await?;
        let template = template.unwrap_or(kind.default_template());
        let prompt = render_or_fallback(
            self.services.prompts.as_ref(),
            template,
            &kind.prompt_data(&snapshot),
            || kind.fallback_prompt(&snapshot),
        )?;
        let raw = self
            .services
            .completion
            .complete(&prompt)
            .await
            .with_context(|| format!("failed to generate {kind}"))?;
        let text = clean_markdown_response(&raw);
        let title = format!("{} - {}", kind.title_prefix(), format_date(now));

        let repo = snapshot
            .open
            .iter()
            .chain(snapshot.closed.iter())
            .find_map(|issue| issue.repo_ref());
        let draft = NewIssue {
            title: title.clone(),
            body: text.clone(),
            labels: kind.labels().iter().map(|label| label.to_string()).collect(),
        };
        let created_issue = match self.services.store.create_issue(repo.as_ref(), draft).await {
            Ok(issue) => {
                tracing::info!(kind = %kind, issue = issue.number, "digest issue created");
                Some(CreatedIssue {
                    number: issue.number,
                    url: issue.url,
                })
            }
            Err(error) => {
                tracing::warn!(kind = %kind, error = %error, "failed to create digest issue");
                None
            }
        };

        Ok(DigestReport {
            kind,
            title,
            text,
            metrics: kind.metrics(&snapshot),
            created_issue,
        })
    }
}

fn quiet_open_count(snapshot: &ProjectSnapshot) -> usize {
    let cutoff = snapshot.taken_at - Duration::days(VELOCITY_WINDOW_DAYS);
    snapshot
        .open
        .iter()
        .filter(|issue| issue.updated_at < cutoff)
        .count()
}
