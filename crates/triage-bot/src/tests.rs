use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use triage_agents::AgentServices;
use triage_ai::{CompletionError, TextCompletion};
use triage_core::{Issue, IssueState};
use triage_github::InMemoryIssueStore;
use triage_prompts::PromptLibrary;
use triage_rules::FormatRules;

use crate::bot_runtime::{load_optional_guidelines, load_optional_plugins, BotRuntime};
use crate::mode_runner::{run_agents, run_all, run_digest, run_monitor_once, run_validate};

#[derive(Default)]
struct ScriptedCompletion {
    replies: AsyncMutex<VecDeque<Result<String, CompletionError>>>,
    calls: AsyncMutex<usize>,
}

impl ScriptedCompletion {
    fn replying(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: AsyncMutex::new(replies.into()),
            calls: AsyncMutex::new(0),
        })
    }

    async fn call_count(&self) -> usize {
        *self.calls.lock().await
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        *self.calls.lock().await += 1;
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::InvalidResponse("no scripted reply".to_string())))
    }
}

const CONFORMING_BODY: &str = "## Description\nShip the exporter with retries and metrics.\n\n## Acceptance Criteria\n- exporter retries";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn issue(number: u64, body: &str, labels: &[&str]) -> Issue {
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

fn runtime(
    store: Arc<InMemoryIssueStore>,
    completion: Arc<ScriptedCompletion>,
    agents_dir: Option<&std::path::Path>,
) -> BotRuntime {
    BotRuntime {
        services: AgentServices::new(store, completion, Arc::new(PromptLibrary::new())),
        rules: FormatRules::default(),
        guidelines: None,
        agents: agents_dir.map(load_optional_plugins).unwrap_or_default(),
        stale_threshold_days: 7,
        check_interval: StdDuration::from_secs(3_600),
    }
}

#[tokio::test]
async fn functional_validate_single_conforming_issue_reports_valid() {
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(
        1,
        CONFORMING_BODY,
        &["priority:high"],
    )]));
    let completion = ScriptedCompletion::replying(Vec::new());
    let runtime = runtime(store.clone(), completion.clone(), None);

    let output = run_validate(&runtime, Some(1)).await.expect("validate");

    assert_eq!(output, "✅ Issue #1 is valid");
    assert_eq!(completion.call_count().await, 0);
    assert_eq!(store.operation_count("update_issue").await, 0);
}

#[tokio::test]
async fn functional_validate_batch_prints_fixed_issues_and_summary() {
    let store = Arc::new(InMemoryIssueStore::new(vec![
        issue(1, CONFORMING_BODY, &["priority:high"]),
        issue(2, "todo", &[]),
        issue(3, "todo", &["agent-validator"]),
    ]));
    let completion = ScriptedCompletion::replying(vec![Ok(format!(
        "```markdown\n{CONFORMING_BODY}\n```"
    ))]);
    let runtime = runtime(store.clone(), completion, None);

    let output = run_validate(&runtime, None).await.expect("validate");

    assert!(output.contains("Fixed issue #2: Task 2"));
    assert!(output.ends_with(
        "✅ Validated 2 issues (1 fixed, 1 already valid), 1 skipped (already validated)"
    ));
    assert_eq!(store.operation_count("add_label").await, 2);
}

#[tokio::test]
async fn regression_validate_single_issue_surfaces_not_found() {
    let store = Arc::new(InMemoryIssueStore::new(Vec::new()));
    let runtime = runtime(store, ScriptedCompletion::replying(Vec::new()), None);

    let error = run_validate(&runtime, Some(99)).await.expect_err("missing issue");
    assert!(format!("{error:#}").contains("#99"));
}

#[tokio::test]
async fn functional_monitor_once_nudges_stale_assigned_issue() {
    let mut stale = issue(4, CONFORMING_BODY, &["priority:low"]);
    stale.assignee = Some("octocat".to_string());
    stale.updated_at = Utc::now() - Duration::days(12);
    let store = Arc::new(InMemoryIssueStore::new(vec![stale]));
    let completion = ScriptedCompletion::replying(vec![Ok("Any update on this one?".to_string())]);
    let runtime = runtime(store.clone(), completion, None);

    let output = run_monitor_once(&runtime, Utc::now()).await.expect("monitor");

    assert!(output.starts_with("Checked 1 open issues (threshold 7 days): 1 stale, 1 nudged"));
    assert!(output.contains("- #4 Task 4 (@octocat, 12 days)"));
    let comments = store.comments().await;
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.contains("Any update on this one?"));
}

#[tokio::test]
async fn functional_roast_digest_prints_title_text_and_created_issue() {
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(
        1,
        CONFORMING_BODY,
        &["priority:high"],
    )]));
    let completion = ScriptedCompletion::replying(vec![Ok("Your backlog is a museum.".to_string())]);
    let runtime = runtime(store.clone(), completion, None);

    let output = run_digest(&runtime, triage_agents::DigestKind::Roast, now())
        .await
        .expect("roast");

    assert!(output.starts_with("# Product Roast - 2024-06-15\n\nYour backlog is a museum."));
    assert!(output.contains("Created issue #2:"));
    assert_eq!(store.operation_count("create_issue").await, 1);
}

#[tokio::test]
async fn regression_run_all_continues_after_each_failed_step() {
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(1, CONFORMING_BODY, &[])]));
    store.fail_on("list_issues").await;
    let completion = ScriptedCompletion::replying(Vec::new());
    let runtime = runtime(store.clone(), completion.clone(), None);

    let output = run_all(&runtime, now()).await;

    assert!(output.is_empty());
    assert_eq!(store.operation_count("list_issues").await, 3);
    assert_eq!(completion.call_count().await, 0);
}

#[tokio::test]
async fn integration_run_all_runs_validate_monitor_and_roast_in_order() {
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(
        1,
        CONFORMING_BODY,
        &["priority:high"],
    )]));
    let completion = ScriptedCompletion::replying(vec![Ok("Roast body".to_string())]);
    let runtime = runtime(store, completion.clone(), None);

    let output = run_all(&runtime, now()).await;

    let validate_at = output.find("✅ Validated 1 issues").expect("validate output");
    let monitor_at = output.find("Checked 1 open issues").expect("monitor output");
    let roast_at = output.find("# Product Roast").expect("roast output");
    assert!(validate_at < monitor_at && monitor_at < roast_at);
    assert_eq!(completion.call_count().await, 1);
}

#[tokio::test]
async fn regression_agents_mode_without_agents_is_an_error() {
    let store = Arc::new(InMemoryIssueStore::new(Vec::new()));
    let runtime = runtime(store, ScriptedCompletion::replying(Vec::new()), None);

    let error = run_agents(&runtime, None, None).await.expect_err("no agents");
    assert!(error.to_string().contains("no plugin agents found"));
}

fn write_agents_dir() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    let core = temp.path().join("core");
    std::fs::create_dir_all(&core).expect("core dir");
    std::fs::write(
        core.join("summarizer.md"),
        "# Agent: Task Summarizer\n**Purpose**: Summarize long tasks\n\n## Actions\n1. Check if task body is long enough\n2. Generate summary using LLM\n3. Add summary as a comment\n\n```yaml\nmin_length_for_summary: 20\n```\n",
    )
    .expect("write agent");
    temp
}

#[tokio::test]
async fn functional_agents_mode_lists_loaded_agents_and_actions() {
    let temp = write_agents_dir();
    let store = Arc::new(InMemoryIssueStore::new(Vec::new()));
    let runtime = runtime(store, ScriptedCompletion::replying(Vec::new()), Some(temp.path()));

    let output = run_agents(&runtime, None, None).await.expect("listing");

    assert!(output.starts_with("Available agents:"));
    assert!(output.contains("- Task Summarizer (core): Summarize long tasks"));
    assert!(output.contains("    * Generate summary using LLM"));
}

#[tokio::test]
async fn integration_agents_mode_executes_named_agent_and_prints_json() {
    let temp = write_agents_dir();
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(
        7,
        CONFORMING_BODY,
        &["priority:high"],
    )]));
    let completion = ScriptedCompletion::replying(vec![Ok("Short summary.".to_string())]);
    let runtime = runtime(store.clone(), completion, Some(temp.path()));

    let output = run_agents(&runtime, Some("Task Summarizer"), Some(7))
        .await
        .expect("execute agent");

    let result: Value = serde_json::from_str(&output).expect("json output");
    assert_eq!(result["agent"], "Task Summarizer");
    assert_eq!(result["issue"], 7);
    assert_eq!(result["comment_added"], true);
    assert_eq!(store.comments().await.len(), 1);
}

#[tokio::test]
async fn regression_agents_mode_unknown_agent_is_not_found() {
    let temp = write_agents_dir();
    let store = Arc::new(InMemoryIssueStore::new(Vec::new()));
    let runtime = runtime(store, ScriptedCompletion::replying(Vec::new()), Some(temp.path()));

    let error = run_agents(&runtime, Some("Nope"), None)
        .await
        .expect_err("unknown agent");
    assert_eq!(error.to_string(), "agent not found: Nope");
}

#[test]
fn unit_missing_guidelines_file_falls_back_to_none() {
    let temp = tempfile::tempdir().expect("tempdir");
    assert!(load_optional_guidelines(&temp.path().join("missing.md")).is_none());
}

#[test]
fn unit_guidelines_file_is_loaded_when_present() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("task-guidelines.md");
    std::fs::write(
        &path,
        "# Guidelines\n\n## Format Rules\n- Required sections: Summary, Tests\n- Minimum description length: 80\n",
    )
    .expect("write guidelines");

    let guidelines = load_optional_guidelines(&path).expect("guidelines");
    assert!(guidelines.raw_content.contains("Format Rules"));
}

#[test]
fn unit_missing_plugins_directory_loads_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    assert!(load_optional_plugins(&temp.path().join("agents")).is_empty());
}
