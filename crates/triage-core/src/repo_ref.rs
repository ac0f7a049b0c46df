use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Owner and name pair identifying one GitHub repository.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid repository '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid repository '{raw}', expected owner/repo");
        }
        Ok(Self::new(owner, name))
    }

    /// Parses a comma separated `owner/repo` list, ignoring blank entries.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Extracts the owning repository from an issue URL.
    ///
    /// Accepts both `https://github.com/{owner}/{repo}/issues/{n}` and the REST
    /// form `https://api.github.com/repos/{owner}/{repo}/issues/{n}`.
    pub fn from_issue_url(raw: &str) -> Option<Self> {
        let parsed = url::Url::parse(raw.trim()).ok()?;
        let mut segments = parsed
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .peekable();
        if segments.peek() == Some(&"repos") {
            segments.next();
        }
        let owner = segments.next()?;
        let name = segments.next()?;
        Some(Self::new(owner, name))
    }
}
