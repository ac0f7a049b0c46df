//! In-process `IssueStore` used by tests and dry runs.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use triage_core::{Issue, IssueState, IssueStateFilter, RepoRef};

use crate::{IssueStore, IssueUpdate, NewIssue, StoreMode};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Comment captured by `InMemoryIssueStore`.
pub struct RecordedComment {
    pub repo: Option<RepoRef>,
    pub number: u64,
    pub body: String,
}

#[derive(Default)]
struct MemoryState {
    issues: Vec<Issue>,
    comments: Vec<RecordedComment>,
    operations: Vec<String>,
    failing: BTreeSet<String>,
}

/// Issue store that keeps everything in memory.
///
/// Issues keep insertion order, which doubles as the configured repository
/// order for multi-repo lookups. Operations can be forced to fail by name
/// (`list_issues`, `get_issue`, `update_issue`, `add_comment`, `create_issue`,
/// `add_label`).
pub struct InMemoryIssueStore {
    mode: StoreMode,
    default_repo: RepoRef,
    state: Mutex<MemoryState>,
}

impl InMemoryIssueStore {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self::with_mode(StoreMode::SingleRepo, issues)
    }

    pub fn with_mode(mode: StoreMode, issues: Vec<Issue>) -> Self {
        let default_repo = issues
            .iter()
            .find_map(Issue::repo_ref)
            .unwrap_or_else(|| RepoRef::new("local", "issues"));
        Self {
            mode,
            default_repo,
            state: Mutex::new(MemoryState {
                issues,
                ..MemoryState::default()
            }),
        }
    }

    pub async fn fail_on(&self, operation: &str) {
        self.state.lock().await.failing.insert(operation.to_string());
    }

    pub async fn issue(&self, number: u64) -> Option<Issue> {
        self.state
            .lock()
            .await
            .issues
            .iter()
            .find(|issue| issue.number == number)
            .cloned()
    }

    pub async fn issues(&self) -> Vec<Issue> {
        self.state.lock().await.issues.clone()
    }

    pub async fn comments(&self) -> Vec<RecordedComment> {
        self.state.lock().await.comments.clone()
    }

    /// Operation log entries such as `get_issue#12` in call order.
    pub async fn operations(&self) -> Vec<String> {
        self.state.lock().await.operations.clone()
    }

    pub async fn operation_count(&self, operation: &str) -> usize {
        let prefix = format!("{operation}#");
        self.state
            .lock()
            .await
            .operations
            .iter()
            .filter(|entry| entry.as_str() == operation || entry.starts_with(&prefix))
            .count()
    }

    fn position(&self, state: &MemoryState, repo: Option<&RepoRef>, number: u64) -> Option<usize> {
        state.issues.iter().position(|issue| {
            issue.number == number
                && match (self.mode, repo) {
                    (StoreMode::MultiRepo, Some(repo)) => issue.repo_ref().as_ref() == Some(repo),
                    _ => true,
                }
        })
    }

    fn begin(state: &mut MemoryState, operation: &str, number: Option<u64>) -> Result<()> {
        let entry = match number {
            Some(number) => format!("{operation}#{number}"),
            None => operation.to_string(),
        };
        state.operations.push(entry);
        if state.failing.contains(operation) {
            bail!("simulated {operation} failure");
        }
        Ok(())
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    fn mode(&self) -> StoreMode {
        self.mode
    }

    async fn list_issues(&self, filter: IssueStateFilter) -> Result<Vec<Issue>> {
        let mut state = self.state.lock().await;
        Self::begin(&mut state, "list_issues", None)?;
        Ok(state
            .issues
            .iter()
            .filter(|issue| filter.matches(issue.state))
            .cloned()
            .collect())
    }

    async fn get_issue(&self, repo: Option<&RepoRef>, number: u64) -> Result<Issue> {
        let mut state = self.state.lock().await;
        Self::begin(&mut state, "get_issue", Some(number))?;
        match self.position(&state, repo, number) {
            Some(index) => Ok(state.issues[index].clone()),
            None => bail!("issue #{number} not found in any repository"),
        }
    }

    async fn update_issue(
        &self,
        repo: Option<&RepoRef>,
        number: u64,
        update: IssueUpdate,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::begin(&mut state, "update_issue", Some(number))?;
        let Some(index) = self.position(&state, repo, number) else {
            bail!("issue #{number} not found in any repository");
        };
        let issue = &mut state.issues[index];
        if let Some(title) = update.title {
            issue.title = title;
        }
        if let Some(body) = update.body {
            issue.body = body;
        }
        issue.updated_at = Utc::now();
        Ok(())
    }

    async fn add_comment(&self, repo: Option<&RepoRef>, number: u64, body: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::begin(&mut state, "add_comment", Some(number))?;
        if self.position(&state, repo, number).is_none() {
            bail!("issue #{number} not found in any repository");
        }
        state.comments.push(RecordedComment {
            repo: repo.cloned(),
            number,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn create_issue(&self, repo: Option<&RepoRef>, draft: NewIssue) -> Result<Issue> {
        let mut state = self.state.lock().await;
        Self::begin(&mut state, "create_issue", None)?;
        let target = match self.mode {
            StoreMode::SingleRepo => self.default_repo.clone(),
            StoreMode::MultiRepo => repo.cloned().unwrap_or_else(|| self.default_repo.clone()),
        };
        let number = state
            .issues
            .iter()
            .map(|issue| issue.number)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let now = Utc::now();
        let issue = Issue {
            number,
            title: draft.title,
            body: draft.body,
            state: IssueState::Open,
            labels: draft.labels.into_iter().collect(),
            assignee: None,
            created_at: now,
            updated_at: now,
            url: format!("https://github.com/{}/issues/{number}", target.as_slug()),
        };
        state.issues.push(issue.clone());
        Ok(issue)
    }

    async fn add_label(&self, repo: Option<&RepoRef>, number: u64, label: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        Self::begin(&mut state, "add_label", Some(number))?;
        let Some(index) = self.position(&state, repo, number) else {
            bail!("issue #{number} not found in any repository");
        };
        state.issues[index].labels.insert(label.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use triage_core::{Issue, IssueState, IssueStateFilter, RepoRef};

    use super::InMemoryIssueStore;
    use crate::{IssueStore, NewIssue, StoreMode};

    fn issue(number: u64, repo: &str, state: IssueState) -> Issue {
        Issue {
            number,
            title: format!("Issue {number}"),
            body: String::new(),
            state,
            labels: Default::default(),
            assignee: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            url: format!("https://github.com/{repo}/issues/{number}"),
        }
    }

    #[tokio::test]
    async fn functional_multi_repo_lookup_prefers_first_configured_match() {
        let store = InMemoryIssueStore::with_mode(
            StoreMode::MultiRepo,
            vec![
                issue(1, "acme/api", IssueState::Open),
                issue(1, "acme/web", IssueState::Open),
            ],
        );
        let found = store.get_issue(None, 1).await.expect("issue");
        assert_eq!(found.url, "https://github.com/acme/api/issues/1");

        let web = RepoRef::new("acme", "web");
        let scoped = store.get_issue(Some(&web), 1).await.expect("scoped");
        assert_eq!(scoped.url, "https://github.com/acme/web/issues/1");
    }

    #[tokio::test]
    async fn functional_list_filters_state_and_create_assigns_next_number() {
        let store = InMemoryIssueStore::new(vec![
            issue(3, "acme/api", IssueState::Open),
            issue(8, "acme/api", IssueState::Closed),
        ]);
        let open = store.list_issues(IssueStateFilter::Open).await.expect("list");
        assert_eq!(open.len(), 1);

        let created = store
            .create_issue(
                None,
                NewIssue {
                    title: "Digest".to_string(),
                    body: "text".to_string(),
                    labels: vec!["automated".to_string()],
                },
            )
            .await
            .expect("create");
        assert_eq!(created.number, 9);
        assert!(created.has_label("automated"));
        assert_eq!(created.url, "https://github.com/acme/api/issues/9");
    }

    #[tokio::test]
    async fn regression_forced_failures_are_logged_and_returned() {
        let store = InMemoryIssueStore::new(vec![issue(2, "acme/api", IssueState::Open)]);
        store.fail_on("add_label").await;
        let error = store
            .add_label(None, 2, "agent-validator")
            .await
            .expect_err("forced failure");
        assert!(error.to_string().contains("simulated add_label failure"));
        assert_eq!(store.operation_count("add_label").await, 1);
        assert!(store.issue(2).await.expect("issue").labels.is_empty());
    }

    #[tokio::test]
    async fn regression_missing_issue_is_an_error_not_a_default() {
        let store = InMemoryIssueStore::new(Vec::new());
        let error = store.get_issue(None, 42).await.expect_err("missing");
        assert!(error.to_string().contains("issue #42 not found"));
    }
}
