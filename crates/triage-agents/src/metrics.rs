//! Aggregates over the open and closed issue collections.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use triage_core::{format_date, Issue, IssueStateFilter};
use triage_github::IssueStore;

/// Days of closed-issue activity that count toward velocity.
pub const VELOCITY_WINDOW_DAYS: i64 = 7;

const RECENT_ISSUE_LIMIT: usize = 10;
const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone)]
/// Open and closed issues captured at one instant.
pub struct ProjectSnapshot {
    pub open: Vec<Issue>,
    pub closed: Vec<Issue>,
    pub taken_at: DateTime<Utc>,
}

impl ProjectSnapshot {
    pub async fn gather(store: &dyn IssueStore, taken_at: DateTime<Utc>) -> Result<Self> {
        let open = store
            .list_issues(IssueStateFilter::Open)
            .await
            .context("failed to list open issues")?;
        let closed = store
            .list_issues(IssueStateFilter::Closed)
            .await
            .context("failed to list closed issues")?;
        Ok(Self {
            open,
            closed,
            taken_at,
        })
    }

    pub fn total(&self) -> usize {
        self.open.len() + self.closed.len()
    }

    pub fn blocked_count(&self) -> usize {
        count_matching(&self.open, &["blocked", "blocker"])
    }

    pub fn in_progress_count(&self) -> usize {
        count_matching(&self.open, &["in progress", "in-progress"])
    }

    pub fn risk_count(&self) -> usize {
        count_matching(&self.open, &["risk", "blocker", "critical"])
    }

    pub fn unassigned_count(&self) -> usize {
        self.open.iter().filter(|issue| issue.assignee.is_none()).count()
    }

    pub fn unlabeled_count(&self) -> usize {
        self.open.iter().filter(|issue| issue.labels.is_empty()).count()
    }

    /// Percentage of all issues that are closed; zero for an empty project.
    pub fn completion_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.closed.len() as f64 / total as f64 * 100.0,
        }
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.taken_at - Duration::days(VELOCITY_WINDOW_DAYS)
    }

    /// Issues closed within the velocity window, per day.
    pub fn velocity(&self) -> f64 {
        let window_start = self.window_start();
        let recent = self
            .closed
            .iter()
            .filter(|issue| issue.updated_at > window_start)
            .count();
        recent as f64 / VELOCITY_WINDOW_DAYS as f64
    }

    pub fn recent_open_lines(&self) -> String {
        self.open
            .iter()
            .take(RECENT_ISSUE_LIMIT)
            .map(|issue| format!("- #{}: {}", issue.number, issue.title))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn recent_activity_lines(&self) -> String {
        self.closed
            .iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(|issue| {
                format!(
                    "- #{}: {} (Completed: {})",
                    issue.number,
                    issue.title,
                    format_date(issue.updated_at)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Flat statistics map merged into generic plugin prompt data.
    pub fn stats_map(&self) -> Map<String, Value> {
        let mut stats = Map::new();
        stats.insert("total_open_tasks".to_string(), json!(self.open.len()));
        stats.insert("in_progress_tasks".to_string(), json!(self.in_progress_count()));
        stats.insert("blocked_tasks".to_string(), json!(self.blocked_count()));
        stats.insert("completed_tasks".to_string(), json!(self.closed.len()));
        stats.insert(
            "completion_rate".to_string(),
            json!(format!("{:.1}", self.completion_rate())),
        );
        stats.insert("risk_count".to_string(), json!(self.risk_count()));
        stats
    }
}

fn count_matching(issues: &[Issue], needles: &[&str]) -> usize {
    issues
        .iter()
        .filter(|issue| needles.iter().any(|needle| issue.has_label_containing(needle)))
        .count()
}
