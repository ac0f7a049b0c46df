use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use triage_core::{truncate_for_error, Issue, IssueState, IssueStateFilter, RepoRef};

use crate::{IssueUpdate, NewIssue};

const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubIssue {
    pub(crate) number: u64,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    pub(crate) state: String,
    #[serde(default)]
    pub(crate) labels: Vec<GithubLabel>,
    #[serde(default)]
    pub(crate) assignee: Option<GithubUser>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) html_url: String,
    #[serde(default)]
    pub(crate) pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubLabel {
    pub(crate) name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubUser {
    pub(crate) login: String,
}

impl From<GithubIssue> for Issue {
    fn from(raw: GithubIssue) -> Self {
        let state = if raw.state.eq_ignore_ascii_case("closed") {
            IssueState::Closed
        } else {
            IssueState::Open
        };
        Issue {
            number: raw.number,
            title: raw.title,
            body: raw.body.unwrap_or_default(),
            state,
            labels: raw.labels.into_iter().map(|label| label.name).collect(),
            assignee: raw.assignee.map(|user| user.login),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            url: raw.html_url,
        }
    }
}

#[derive(Clone)]
pub(crate) struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubApiClient {
    pub(crate) fn new(api_base: &str, token: &str, request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("triage-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn issues_url(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, repo.owner, repo.name)
    }

    pub(crate) async fn list_issues(
        &self,
        repo: &RepoRef,
        state: IssueStateFilter,
    ) -> Result<Vec<Issue>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let per_page = PAGE_SIZE.to_string();
            let chunk: Vec<GithubIssue> = self
                .request_json("list issues", || {
                    self.http.get(self.issues_url(repo)).query(&[
                        ("state", state.as_str()),
                        ("per_page", per_page.as_str()),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(
                chunk
                    .into_iter()
                    .filter(|issue| issue.pull_request.is_none())
                    .map(Issue::from),
            );
            if chunk_len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub(crate) async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue> {
        let issue: GithubIssue = self
            .request_json("get issue", || {
                self.http
                    .get(format!("{}/{number}", self.issues_url(repo)))
            })
            .await?;
        Ok(issue.into())
    }

    pub(crate) async fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<()> {
        let mut payload = serde_json::Map::new();
        if let Some(title) = update.title.as_deref() {
            payload.insert("title".to_string(), json!(title));
        }
        if let Some(body) = update.body.as_deref() {
            payload.insert("body".to_string(), json!(body));
        }
        let _: Value = self
            .request_json("update issue", || {
                self.http
                    .patch(format!("{}/{number}", self.issues_url(repo)))
                    .json(&payload)
            })
            .await?;
        Ok(())
    }

    pub(crate) async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<()> {
        let payload = json!({ "body": body });
        let _: Value = self
            .request_json("create issue comment", || {
                self.http
                    .post(format!("{}/{number}/comments", self.issues_url(repo)))
                    .json(&payload)
            })
            .await?;
        Ok(())
    }

    pub(crate) async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<Issue> {
        let payload = json!({
            "title": issue.title,
            "body": issue.body,
            "labels": issue.labels,
        });
        let created: GithubIssue = self
            .request_json("create issue", || {
                self.http.post(self.issues_url(repo)).json(&payload)
            })
            .await?;
        Ok(created.into())
    }

    pub(crate) async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[&str],
    ) -> Result<()> {
        let payload = json!({ "labels": labels });
        let _: Value = self
            .request_json("add labels", || {
                self.http
                    .post(format!("{}/{number}/labels", self.issues_url(repo)))
                    .json(&payload)
            })
            .await?;
        Ok(())
    }

    async fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> reqwest::RequestBuilder,
    {
        let response = request_builder()
            .send()
            .await
            .with_context(|| format!("github api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "github api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }
}
