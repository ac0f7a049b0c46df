use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RepoRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Enumerates supported `IssueState` values.
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// State filter accepted by issue listing.
pub enum IssueStateFilter {
    Open,
    Closed,
    All,
}

impl IssueStateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }

    pub fn matches(self, state: IssueState) -> bool {
        match self {
            Self::Open => state == IssueState::Open,
            Self::Closed => state == IssueState::Closed,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Public struct `Issue` used across triage components.
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

impl Issue {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn has_label_with_prefix(&self, prefix: &str) -> bool {
        self.labels.iter().any(|label| label.starts_with(prefix))
    }

    /// Case-insensitive substring test over every label.
    pub fn has_label_containing(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.labels
            .iter()
            .any(|label| label.to_ascii_lowercase().contains(&needle))
    }

    pub fn labels_joined(&self) -> String {
        self.labels.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }

    /// Owning repository derived from the canonical issue URL.
    pub fn repo_ref(&self) -> Option<RepoRef> {
        RepoRef::from_issue_url(&self.url)
    }

    pub fn body_char_count(&self) -> usize {
        self.body.chars().count()
    }
}
