use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use triage_core::RepoRef;
use triage_github::RepoScope;
use triage_rules::FormatRules;

use crate::{Cli, CliMode};

pub fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Startup checks that clap cannot express on its own.
pub fn validate_cli(cli: &Cli) -> Result<()> {
    if resolve_non_empty_cli_value(cli.github_token.as_deref()).is_none() {
        bail!("--github-token (GITHUB_TOKEN) is required");
    }
    if resolve_non_empty_cli_value(cli.github_owner.as_deref()).is_none() {
        bail!("--github-owner (GITHUB_OWNER) is required");
    }
    resolve_repo_scope(cli)?;

    if cli.mode == CliMode::Monitor && !cli.once && !cli.daemon {
        bail!("--mode monitor requires either --once or --daemon");
    }
    if cli.agent.is_some() && cli.mode != CliMode::Agents {
        bail!("--agent can only be used with --mode agents");
    }
    if let Some(agent) = cli.agent.as_deref() {
        if agent.trim().is_empty() {
            bail!("--agent cannot be empty");
        }
    }
    if cli
        .required_sections
        .iter()
        .any(|section| section.trim().is_empty())
    {
        bail!("--required-sections cannot contain empty entries");
    }
    Ok(())
}

/// Repositories the store operates on.
///
/// A project id selects multi-repository mode, which then needs a non-empty
/// `--github-repos` list; otherwise `--github-owner` and `--github-repo` name
/// the single repository.
pub fn resolve_repo_scope(cli: &Cli) -> Result<RepoScope> {
    if resolve_non_empty_cli_value(cli.github_project_id.as_deref()).is_some() {
        let raw = resolve_non_empty_cli_value(cli.github_repos.as_deref()).with_context(|| {
            "--github-repos (GITHUB_REPOS) is required when --github-project-id is set (format: owner/repo,owner/repo)"
        })?;
        let repos = RepoRef::parse_list(&raw).context("failed to parse --github-repos")?;
        if repos.is_empty() {
            bail!("--github-repos must name at least one owner/repo");
        }
        return Ok(RepoScope::Multi(repos));
    }

    let owner = resolve_non_empty_cli_value(cli.github_owner.as_deref())
        .context("--github-owner (GITHUB_OWNER) is required")?;
    let repo = resolve_non_empty_cli_value(cli.github_repo.as_deref())
        .context("--github-repo (GITHUB_REPO) is required in single-repository mode")?;
    if repo.contains('/') {
        bail!("--github-repo must be a bare repository name, got '{repo}'");
    }
    Ok(RepoScope::Single(RepoRef::new(owner, repo)))
}

pub fn format_rules(cli: &Cli) -> FormatRules {
    FormatRules {
        required_sections: cli
            .required_sections
            .iter()
            .map(|section| section.trim().to_string())
            .collect(),
        min_description_length: cli.min_description_length,
        require_labels: cli.require_labels,
        label_prefix: cli.label_prefix.clone(),
    }
}

/// Template directories in load order: configured paths, then the custom and
/// core prompt folders of the plugin tree.
pub fn prompt_paths(cli: &Cli) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = cli
        .prompts_path
        .iter()
        .filter(|path| !path.as_os_str().is_empty())
        .cloned()
        .collect();
    paths.push(cli.plugins_path.join("custom").join("prompts"));
    paths.push(cli.plugins_path.join("core").join("prompts"));
    paths
}

pub fn llm_timeout_ms(cli: &Cli) -> u64 {
    cli.llm_timeout_seconds.saturating_mul(1_000)
}
