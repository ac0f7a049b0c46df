use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use triage_core::{Issue, IssueStateFilter, RepoRef};

use crate::github_api_client::GithubApiClient;
use crate::{IssueStore, IssueUpdate, NewIssue, StoreMode};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Repositories a store operates on.
pub enum RepoScope {
    Single(RepoRef),
    /// Ordered list; lookups without an explicit repository probe it in order.
    Multi(Vec<RepoRef>),
}

#[derive(Debug, Clone)]
/// Public struct `GithubStoreConfig` used across triage components.
pub struct GithubStoreConfig {
    pub api_base: String,
    pub token: String,
    pub scope: RepoScope,
    pub request_timeout_ms: u64,
}

#[derive(Clone)]
/// `IssueStore` backed by the GitHub REST API.
pub struct GithubIssueStore {
    api: GithubApiClient,
    scope: RepoScope,
}

impl GithubIssueStore {
    pub fn new(config: GithubStoreConfig) -> Result<Self> {
        if let RepoScope::Multi(repos) = &config.scope {
            if repos.is_empty() {
                bail!("multi-repo mode requires at least one repository");
            }
        }
        let api = GithubApiClient::new(&config.api_base, &config.token, config.request_timeout_ms)?;
        Ok(Self {
            api,
            scope: config.scope,
        })
    }

    pub fn scope(&self) -> &RepoScope {
        &self.scope
    }

    async fn find_issue_across_repos(&self, repos: &[RepoRef], number: u64) -> Result<Issue> {
        // TODO: keep a number -> repo index if configured repo counts grow beyond a handful.
        for repo in repos {
            match self.api.get_issue(repo, number).await {
                Ok(issue) => return Ok(issue),
                Err(error) => {
                    tracing::debug!(
                        repo = %repo.as_slug(),
                        issue = number,
                        error = %error,
                        "issue lookup missed repository"
                    );
                }
            }
        }
        bail!("issue #{number} not found in any repository")
    }

    /// Resolves the repository an operation on `number` applies to.
    async fn resolve_repo(&self, repo: Option<&RepoRef>, number: u64) -> Result<RepoRef> {
        match (&self.scope, repo) {
            (RepoScope::Single(configured), _) => Ok(configured.clone()),
            (RepoScope::Multi(_), Some(repo)) => Ok(repo.clone()),
            (RepoScope::Multi(repos), None) => {
                let issue = self.find_issue_across_repos(repos, number).await?;
                issue.repo_ref().with_context(|| {
                    format!("could not determine repository for issue #{number}")
                })
            }
        }
    }
}

#[async_trait]
impl IssueStore for GithubIssueStore {
    fn mode(&self) -> StoreMode {
        match self.scope {
            RepoScope::Single(_) => StoreMode::SingleRepo,
            RepoScope::Multi(_) => StoreMode::MultiRepo,
        }
    }

    async fn list_issues(&self, state: IssueStateFilter) -> Result<Vec<Issue>> {
        match &self.scope {
            RepoScope::Single(repo) => self
                .api
                .list_issues(repo, state)
                .await
                .with_context(|| format!("failed to list issues for {}", repo.as_slug())),
            RepoScope::Multi(repos) => {
                let mut issues = Vec::new();
                for repo in repos {
                    match self.api.list_issues(repo, state).await {
                        Ok(rows) => issues.extend(rows),
                        Err(error) => {
                            tracing::warn!(
                                repo = %repo.as_slug(),
                                error = %error,
                                "skipping repository after list failure"
                            );
                        }
                    }
                }
                Ok(issues)
            }
        }
    }

    async fn get_issue(&self, repo: Option<&RepoRef>, number: u64) -> Result<Issue> {
        match (&self.scope, repo) {
            (RepoScope::Single(configured), _) => self
                .api
                .get_issue(configured, number)
                .await
                .with_context(|| format!("failed to get issue #{number}")),
            (RepoScope::Multi(_), Some(repo)) => self
                .api
                .get_issue(repo, number)
                .await
                .with_context(|| format!("failed to get issue {}#{number}", repo.as_slug())),
            (RepoScope::Multi(repos), None) => self.find_issue_across_repos(repos, number).await,
        }
    }

    async fn update_issue(
        &self,
        repo: Option<&RepoRef>,
        number: u64,
        update: IssueUpdate,
    ) -> Result<()> {
        let repo = self.resolve_repo(repo, number).await?;
        self.api
            .update_issue(&repo, number, &update)
            .await
            .with_context(|| format!("failed to update issue {}#{number}", repo.as_slug()))
    }

    async fn add_comment(&self, repo: Option<&RepoRef>, number: u64, body: &str) -> Result<()> {
        let repo = self.resolve_repo(repo, number).await?;
        self.api
            .create_issue_comment(&repo, number, body)
            .await
            .with_context(|| format!("failed to comment on issue {}#{number}", repo.as_slug()))
    }

    async fn create_issue(&self, repo: Option<&RepoRef>, issue: NewIssue) -> Result<Issue> {
        let target = match (&self.scope, repo) {
            (RepoScope::Single(configured), _) => configured.clone(),
            (RepoScope::Multi(_), Some(repo)) => repo.clone(),
            (RepoScope::Multi(repos), None) => repos
                .first()
                .cloned()
                .context("no repositories configured for multi-repo mode")?,
        };
        self.api
            .create_issue(&target, &issue)
            .await
            .with_context(|| format!("failed to create issue in {}", target.as_slug()))
    }

    async fn add_label(&self, repo: Option<&RepoRef>, number: u64, label: &str) -> Result<()> {
        let issue = self.get_issue(repo, number).await?;
        if issue.has_label(label) {
            return Ok(());
        }
        let target = match &self.scope {
            RepoScope::Single(configured) => configured.clone(),
            RepoScope::Multi(_) => match repo {
                Some(repo) => repo.clone(),
                None => issue.repo_ref().with_context(|| {
                    format!("could not determine repository for issue #{number}")
                })?,
            },
        };
        self.api
            .add_labels(&target, number, &[label])
            .await
            .with_context(|| format!("failed to label issue {}#{number}", target.as_slug()))
    }
}
