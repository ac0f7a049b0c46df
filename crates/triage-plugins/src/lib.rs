//! Markdown plugin agents: loading, action classification, execution, and
//! name-based lookup.

pub mod classify;
pub mod executor;
pub mod plugin_agent;
pub mod registry;

pub use classify::{
    classify_action, plan_actions, ActionKind, ActionStep, DEFAULT_MIN_LENGTH_FOR_SUMMARY,
    MIN_LENGTH_CONFIG_KEY,
};
pub use executor::{
    extract_issue_number, post_process_summary, route_for, AgentRoute, PluginExecutor, ResultMap,
};
pub use plugin_agent::{load_plugins, parse_plugin_markdown, PluginAgent, Trigger};
pub use registry::{AgentRegistry, AgentSummary, RegistryError};
