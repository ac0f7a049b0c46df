//! Command-line surface of the triage bot.
//!
//! Every flag falls back to an environment variable so the bot runs unchanged
//! from a workflow step or a container with only env configuration.

pub mod cli_args;
pub mod cli_types;
pub mod cli_validation;

pub use cli_args::Cli;
pub use cli_types::CliMode;
pub use cli_validation::{
    format_rules, llm_timeout_ms, prompt_paths, resolve_non_empty_cli_value, resolve_repo_scope,
    validate_cli,
};
