use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use triage_agents::{AgentServices, StaleTaskMonitor, Validator};
use triage_ai::{ChatCompletionsClient, ChatCompletionsConfig};
use triage_cli::{format_rules, llm_timeout_ms, prompt_paths, resolve_repo_scope, Cli};
use triage_github::{GithubIssueStore, GithubStoreConfig, IssueStore, RepoScope};
use triage_plugins::{load_plugins, AgentRegistry, PluginAgent, PluginExecutor};
use triage_prompts::PromptLibrary;
use triage_rules::{load_guidelines, FormatRules, Guidelines};

/// Capabilities and configuration shared by every mode.
pub(crate) struct BotRuntime {
    pub(crate) services: AgentServices,
    pub(crate) rules: FormatRules,
    pub(crate) guidelines: Option<Guidelines>,
    pub(crate) agents: Vec<PluginAgent>,
    pub(crate) stale_threshold_days: i64,
    pub(crate) check_interval: Duration,
}

impl BotRuntime {
    pub(crate) fn from_cli(cli: &Cli) -> Result<Self> {
        let scope = resolve_repo_scope(cli)?;
        match &scope {
            RepoScope::Single(repo) => {
                tracing::info!(repo = %repo.as_slug(), "using single-repository mode")
            }
            RepoScope::Multi(repos) => tracing::info!(
                project = cli.github_project_id.as_deref().unwrap_or_default(),
                repositories = repos.len(),
                "using multi-repository mode"
            ),
        }
        let store: Arc<dyn IssueStore> = Arc::new(
            GithubIssueStore::new(GithubStoreConfig {
                api_base: cli.github_api_base.clone(),
                token: cli.github_token.clone().unwrap_or_default(),
                scope,
                request_timeout_ms: cli.github_request_timeout_ms,
            })
            .context("failed to create GitHub issue store")?,
        );
        let completion = ChatCompletionsClient::new(ChatCompletionsConfig {
            api_base: cli.llm_api_base.clone(),
            model: cli.llm_model.clone(),
            api_key: cli.llm_api_key.clone(),
            request_timeout_ms: llm_timeout_ms(cli),
        })
        .context("failed to create completion client")?;
        let prompts =
            PromptLibrary::load(&prompt_paths(cli)).context("failed to load prompt templates")?;
        tracing::info!(templates = prompts.len(), "loaded prompt templates");

        let services = AgentServices::new(store, Arc::new(completion), Arc::new(prompts));
        let stale_threshold_days = i64::try_from(cli.stale_threshold_days).unwrap_or(i64::MAX);
        let check_interval =
            Duration::from_secs(cli.check_interval_hours.saturating_mul(60 * 60));

        Ok(Self {
            services,
            rules: format_rules(cli),
            guidelines: load_optional_guidelines(&cli.guidelines_path),
            agents: load_optional_plugins(&cli.plugins_path),
            stale_threshold_days,
            check_interval,
        })
    }

    pub(crate) fn validator(&self) -> Validator {
        let validator = Validator::new(self.services.clone(), self.rules.clone());
        match self.guidelines.clone() {
            Some(guidelines) => validator.with_guidelines(guidelines),
            None => validator,
        }
    }

    pub(crate) fn monitor(&self) -> StaleTaskMonitor {
        StaleTaskMonitor::new(self.services.clone(), self.stale_threshold_days)
    }

    pub(crate) fn registry(&self) -> AgentRegistry {
        let executor = PluginExecutor::new(self.services.clone(), self.rules.clone())
            .with_guidelines(self.guidelines.clone());
        AgentRegistry::new(self.agents.clone(), executor)
    }
}

pub(crate) fn load_optional_guidelines(path: &Path) -> Option<Guidelines> {
    if path.as_os_str().is_empty() {
        return None;
    }
    match load_guidelines(path) {
        Ok(guidelines) => {
            tracing::info!(path = %path.display(), "loaded guidelines");
            Some(guidelines)
        }
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{error:#}"),
                "could not load guidelines, using configured format rules"
            );
            None
        }
    }
}

pub(crate) fn load_optional_plugins(path: &Path) -> Vec<PluginAgent> {
    match load_plugins(path) {
        Ok(agents) => {
            tracing::info!(path = %path.display(), agents = agents.len(), "loaded plugin agents");
            for agent in &agents {
                tracing::debug!(agent = %agent.name, kind = %agent.kind, "plugin agent available");
            }
            agents
        }
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{error:#}"),
                "could not load plugin agents, continuing without them"
            );
            Vec::new()
        }
    }
}
