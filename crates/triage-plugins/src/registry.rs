use serde::Serialize;
use thiserror::Error;

use crate::executor::{PluginExecutor, ResultMap};
use crate::PluginAgent;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Listing entry for one loaded agent.
pub struct AgentSummary {
    pub name: String,
    pub kind: String,
    pub purpose: String,
    pub actions: Vec<String>,
    pub schedule: Option<String>,
}

/// Loaded agents addressable by exact name.
pub struct AgentRegistry {
    agents: Vec<PluginAgent>,
    executor: PluginExecutor,
}

impl AgentRegistry {
    pub fn new(agents: Vec<PluginAgent>, executor: PluginExecutor) -> Self {
        Self { agents, executor }
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|agent| agent.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Result<&PluginAgent, RegistryError> {
        self.agents
            .iter()
            .find(|agent| agent.name == name)
            .ok_or_else(|| RegistryError::AgentNotFound(name.to_string()))
    }

    /// Action phrases the agent declares.
    pub fn capabilities(&self, name: &str) -> Result<&[String], RegistryError> {
        self.find(name).map(|agent| agent.actions.as_slice())
    }

    pub fn listing(&self) -> Vec<AgentSummary> {
        self.agents
            .iter()
            .map(|agent| AgentSummary {
                name: agent.name.clone(),
                kind: agent.kind.clone(),
                purpose: agent.purpose.clone(),
                actions: agent.actions.clone(),
                schedule: agent.schedule().map(ToOwned::to_owned),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, params: &ResultMap) -> Result<ResultMap, RegistryError> {
        let agent = self.find(name)?;
        tracing::info!(agent = name, "executing agent");
        Ok(self.executor.execute(agent, params).await?)
    }
}
