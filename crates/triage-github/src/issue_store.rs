use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use triage_core::{Issue, IssueStateFilter, RepoRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Enumerates supported `StoreMode` values.
pub enum StoreMode {
    SingleRepo,
    MultiRepo,
}

impl StoreMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleRepo => "single-repo",
            Self::MultiRepo => "multi-repo",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Partial issue update; `None` fields are left untouched.
pub struct IssueUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl IssueUpdate {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            title: None,
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `NewIssue` used across triage components.
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Read/write access to issues.
///
/// The `repo` argument is optional everywhere. Single-repo stores ignore it;
/// multi-repo stores search the configured repositories in order when it is
/// absent and the first match wins.
#[async_trait]
pub trait IssueStore: Send + Sync {
    fn mode(&self) -> StoreMode;

    async fn list_issues(&self, state: IssueStateFilter) -> Result<Vec<Issue>>;

    async fn get_issue(&self, repo: Option<&RepoRef>, number: u64) -> Result<Issue>;

    async fn update_issue(
        &self,
        repo: Option<&RepoRef>,
        number: u64,
        update: IssueUpdate,
    ) -> Result<()>;

    async fn add_comment(&self, repo: Option<&RepoRef>, number: u64, body: &str) -> Result<()>;

    async fn create_issue(&self, repo: Option<&RepoRef>, issue: NewIssue) -> Result<Issue>;

    /// Adds `label` unless the issue already carries it.
    async fn add_label(&self, repo: Option<&RepoRef>, number: u64, label: &str) -> Result<()>;
}
