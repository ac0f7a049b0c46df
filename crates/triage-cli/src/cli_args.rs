use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::CliMode;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "triage-bot",
    about = "Issue triage automation: format validation, stale-task nudges, digests, and markdown plugin agents",
    version,
    args_override_self = true
)]
/// Public struct `Cli` used across triage components.
pub struct Cli {
    #[arg(
        long,
        env = "TRIAGE_MODE",
        value_enum,
        default_value = "validate",
        help = "Mode to run: validate, monitor, roast, summary, progress, all, or agents (alias mcp)"
    )]
    pub mode: CliMode,

    #[arg(
        long,
        value_parser = parse_positive_u64,
        help = "Issue number to act on (validate mode, or agents mode with --agent)"
    )]
    pub issue: Option<u64>,

    #[arg(long, help = "Run the stale-task check once and exit (monitor mode)")]
    pub once: bool,

    #[arg(
        long,
        conflicts_with = "once",
        help = "Run the stale-task check now and then every --check-interval-hours (monitor mode)"
    )]
    pub daemon: bool,

    #[arg(long, help = "Plugin agent to execute by exact name (agents mode)")]
    pub agent: Option<String>,

    #[arg(
        long,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token used for REST API calls"
    )]
    pub github_token: Option<String>,

    #[arg(long, env = "GITHUB_OWNER", help = "Owner of the managed repositories")]
    pub github_owner: Option<String>,

    #[arg(
        long,
        env = "GITHUB_REPO",
        help = "Repository name for single-repository mode"
    )]
    pub github_repo: Option<String>,

    #[arg(
        long,
        env = "GITHUB_PROJECT_ID",
        help = "Project identifier; selects multi-repository mode when set"
    )]
    pub github_project_id: Option<String>,

    #[arg(
        long,
        env = "GITHUB_REPOS",
        help = "Comma separated owner/repo list for multi-repository mode"
    )]
    pub github_repos: Option<String>,

    #[arg(
        long,
        env = "GITHUB_BASE_URL",
        default_value = "https://api.github.com",
        help = "Base URL for the GitHub REST API"
    )]
    pub github_api_base: String,

    #[arg(
        long,
        env = "GITHUB_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for one GitHub API request in milliseconds"
    )]
    pub github_request_timeout_ms: u64,

    #[arg(
        long,
        env = "LITELLM_BASE_URL",
        default_value = "http://localhost:4000",
        help = "Base URL of the OpenAI-compatible chat-completions endpoint"
    )]
    pub llm_api_base: String,

    #[arg(
        long,
        env = "LLM_MODEL",
        default_value = "gpt-4",
        help = "Model identifier sent with every completion request"
    )]
    pub llm_model: String,

    #[arg(
        long,
        env = "LLM_API_KEY",
        hide_env_values = true,
        help = "Bearer key for the completion endpoint"
    )]
    pub llm_api_key: Option<String>,

    #[arg(
        long,
        env = "LLM_TIMEOUT_SECONDS",
        default_value_t = 30,
        value_parser = parse_positive_u64,
        help = "Timeout for one completion request in seconds"
    )]
    pub llm_timeout_seconds: u64,

    #[arg(
        long,
        env = "STALE_TASK_THRESHOLD_DAYS",
        default_value_t = 7,
        value_parser = parse_positive_u64,
        help = "Days without an update after which an assigned open issue is stale"
    )]
    pub stale_threshold_days: u64,

    #[arg(
        long,
        env = "CHECK_INTERVAL_HOURS",
        default_value_t = 24,
        value_parser = parse_positive_u64,
        help = "Hours between stale-task checks in daemon mode"
    )]
    pub check_interval_hours: u64,

    #[arg(
        long,
        env = "GUIDELINES_PATH",
        default_value = ".github/task-guidelines.md",
        help = "Optional markdown guidelines document overriding the format rules"
    )]
    pub guidelines_path: PathBuf,

    #[arg(
        long,
        env = "PROMPTS_PATH",
        default_value = "prompts",
        value_delimiter = ',',
        help = "Prompt template directories; later directories override earlier ones"
    )]
    pub prompts_path: Vec<PathBuf>,

    #[arg(
        long,
        env = "PLUGINS_PATH",
        default_value = ".github/agents",
        help = "Directory holding core/ and custom/ markdown agents"
    )]
    pub plugins_path: PathBuf,

    #[arg(
        long,
        env = "REQUIRED_SECTIONS",
        default_value = "Description,Acceptance Criteria",
        value_delimiter = ',',
        help = "Section headings every issue body must mention"
    )]
    pub required_sections: Vec<String>,

    #[arg(
        long,
        env = "MIN_DESCRIPTION_LENGTH",
        default_value_t = 50,
        value_parser = parse_positive_usize,
        help = "Minimum issue body length in characters"
    )]
    pub min_description_length: usize,

    #[arg(
        long,
        env = "REQUIRE_LABELS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Require at least one label carrying --label-prefix"
    )]
    pub require_labels: bool,

    #[arg(
        long,
        env = "LABEL_PREFIX",
        default_value = "priority:",
        help = "Label prefix satisfying the label requirement"
    )]
    pub label_prefix: String,
}
