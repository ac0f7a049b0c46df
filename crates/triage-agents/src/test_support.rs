use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Mutex as AsyncMutex;
use triage_ai::{CompletionError, TextCompletion};
use triage_core::{Issue, IssueState};
use triage_github::InMemoryIssueStore;
use triage_prompts::PromptLibrary;

use crate::AgentServices;

/// Completion fake that replays scripted replies and records prompts.
#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    replies: AsyncMutex<VecDeque<Result<String, CompletionError>>>,
    prompts: AsyncMutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub(crate) fn with_replies(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: AsyncMutex::new(replies.into()),
            prompts: AsyncMutex::new(Vec::new()),
        }
    }

    pub(crate) async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::InvalidResponse("no scripted reply".to_string())))
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

pub(crate) fn issue(number: u64, body: &str, labels: &[&str]) -> Issue {
    Issue {
        number,
        title: format!("Task {number}"),
        body: body.to_string(),
        state: IssueState::Open,
        labels: labels.iter().map(|label| label.to_string()).collect(),
        assignee: None,
        created_at: now() - Duration::days(30),
        updated_at: now() - Duration::days(1),
        url: format!("https://github.com/acme/widgets/issues/{number}"),
    }
}

pub(crate) fn services(
    store: Arc<InMemoryIssueStore>,
    completion: Arc<ScriptedCompletion>,
    prompts: PromptLibrary,
) -> AgentServices {
    AgentServices::new(store, completion, Arc::new(prompts))
}
