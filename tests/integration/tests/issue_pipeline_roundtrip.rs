use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use triage_agents::{AgentServices, Validator, VALIDATED_LABEL};
use triage_ai::{CompletionError, TextCompletion};
use triage_core::{Issue, IssueState};
use triage_github::InMemoryIssueStore;
use triage_plugins::{load_plugins, AgentRegistry, PluginExecutor, ResultMap};
use triage_prompts::PromptLibrary;
use triage_rules::{
    check_format, merge_fixed_body, parse_guidelines, preserved_original, FormatRules,
    AGENT_NOTICE_START, ORIGINAL_CONTENT_START,
};

struct ScriptedClient {
    replies: AsyncMutex<VecDeque<Result<String, CompletionError>>>,
    prompts: AsyncMutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: AsyncMutex::new(VecDeque::from(replies)),
            prompts: AsyncMutex::new(Vec::new()),
        })
    }

    async fn request_count(&self) -> usize {
        self.prompts.lock().await.len()
    }

    async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies.lock().await.pop_front().unwrap_or_else(|| {
            Err(CompletionError::InvalidResponse(
                "scripted response queue exhausted".into(),
            ))
        })
    }
}

const REPAIRED_BODY: &str = "## Description\nAdd CSV export to the quarterly finance report page.\n\n## Acceptance Criteria\n- finance can download the CSV";

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
        created_at: now() - Duration::days(10),
        updated_at: now() - Duration::days(1),
        url: format!("https://github.com/acme/widgets/issues/{number}"),
    }
}

fn services(
    store: Arc<InMemoryIssueStore>,
    client: Arc<ScriptedClient>,
    prompts: PromptLibrary,
) -> AgentServices {
    AgentServices::new(store, client, Arc::new(prompts))
}

#[tokio::test]
async fn integration_short_unlabelled_issue_is_repaired_with_four_violations() {
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(12, "todo", &[])]));
    let client = ScriptedClient::new(vec![Ok(format!("```markdown\n{REPAIRED_BODY}\n```"))]);
    let validator = Validator::new(
        services(store.clone(), client.clone(), PromptLibrary::new()),
        FormatRules::default(),
    );

    let outcome = validator
        .validate_issue_number(12)
        .await
        .expect("validate issue");

    assert!(!outcome.already_valid);
    assert_eq!(
        outcome.violations,
        vec![
            "Description too short (minimum 50 characters)".to_string(),
            "Missing required section: Description".to_string(),
            "Missing required section: Acceptance Criteria".to_string(),
            "Missing priority label (should start with 'priority:')".to_string(),
        ]
    );
    assert_eq!(client.request_count().await, 1);

    let updated = store.issue(12).await.expect("issue kept");
    assert!(updated.body.starts_with(AGENT_NOTICE_START));
    assert!(updated.body.contains(REPAIRED_BODY));
    assert_eq!(preserved_original(&updated.body).as_deref(), Some("todo"));

    let comments = store.comments().await;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].number, 12);
    assert_eq!(comments[0].body.matches("\n- ").count(), 4);
}

#[tokio::test]
async fn integration_batch_validation_labels_every_unlabelled_issue_once() {
    let store = Arc::new(InMemoryIssueStore::new(vec![
        issue(1, REPAIRED_BODY, &["priority:high"]),
        issue(2, "todo", &["priority:low"]),
        issue(3, REPAIRED_BODY, &["priority:high", VALIDATED_LABEL]),
        issue(4, "needs work", &["priority:low", VALIDATED_LABEL]),
    ]));
    let client = ScriptedClient::new(vec![Ok(REPAIRED_BODY.to_string())]);
    let validator = Validator::new(
        services(store.clone(), client.clone(), PromptLibrary::new()),
        FormatRules::default(),
    );

    let first = validator.validate_all().await.expect("first batch");
    assert_eq!(first.total, 4);
    assert_eq!(first.validated, 2);
    assert_eq!(first.fixed, 1);
    assert_eq!(first.skipped, 2);
    assert_eq!(store.operation_count("add_label").await, 2);

    let second = validator.validate_all().await.expect("second batch");
    assert_eq!(second.validated, 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(
        second.summary_message(),
        format!("All issues already validated (have '{VALIDATED_LABEL}' label)")
    );
    assert_eq!(client.request_count().await, 1);
}

#[tokio::test]
async fn integration_repeat_repairs_keep_one_notice_and_the_first_original() {
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(5, "first draft", &[])]));
    let client = ScriptedClient::new(vec![
        Ok(REPAIRED_BODY.to_string()),
        Ok(REPAIRED_BODY.to_string()),
    ]);
    let validator = Validator::new(
        services(store.clone(), client, PromptLibrary::new()),
        FormatRules::default(),
    );

    validator.validate_issue_number(5).await.expect("first repair");
    let once = store.issue(5).await.expect("issue").body;
    // The label is still missing, so the issue is repaired again.
    validator.validate_issue_number(5).await.expect("second repair");
    let twice = store.issue(5).await.expect("issue").body;

    assert_eq!(twice.matches(AGENT_NOTICE_START).count(), 1);
    assert_eq!(twice.matches(ORIGINAL_CONTENT_START).count(), 1);
    assert_eq!(preserved_original(&twice).as_deref(), Some("first draft"));
    assert!(once.contains("- Description too short"));
    assert!(!twice.contains("- Description too short"));
}

#[test]
fn integration_merge_is_stable_when_reapplied_to_its_own_output() {
    let violations = vec!["Missing required section: Description".to_string()];
    let merged = merge_fixed_body("raw notes", REPAIRED_BODY, &violations);
    let remerged = merge_fixed_body(&merged, REPAIRED_BODY, &violations);

    assert_eq!(merged, remerged);
    assert_eq!(preserved_original(&remerged).as_deref(), Some("raw notes"));
}

#[tokio::test]
async fn integration_guidelines_rules_override_configured_rules() {
    let guidelines = parse_guidelines(
        "# Task Guidelines\n\n## Format Rules\nRequired Sections:\n- Summary\n- Tests\n\nMinimum description length: 10 characters\n",
    );
    let rules = FormatRules::default().with_guidelines(&guidelines.rules);
    let body = "## Summary\nShort one\n## Tests\n- unit";
    let candidate = issue(8, body, &["priority:high"]);
    assert!(check_format(&candidate, &rules).is_empty());

    let store = Arc::new(InMemoryIssueStore::new(vec![candidate]));
    let client = ScriptedClient::new(Vec::new());
    let validator = Validator::new(
        services(store.clone(), client.clone(), PromptLibrary::new()),
        FormatRules::default(),
    )
    .with_guidelines(guidelines);

    let outcome = validator.validate_issue_number(8).await.expect("validate");
    assert!(outcome.already_valid);
    assert_eq!(client.request_count().await, 0);
    assert_eq!(store.operation_count("update_issue").await, 0);
}

fn write_agent(root: &std::path::Path, kind: &str, file: &str, content: &str) {
    let dir = root.join(kind);
    std::fs::create_dir_all(&dir).expect("agent dir");
    std::fs::write(dir.join(file), content).expect("write agent");
}

const SUMMARIZER: &str = "# Agent: Task Summarizer
**Purpose**: Summarize long tasks

## Triggers
- event: issues.opened
- manual: true

## Actions
1. Check if task body is long enough
2. Generate summary using LLM
3. Add summary as a comment

```yaml
min_length_for_summary: 200
```

Prompt path: prompts/summarizer.md
";

#[tokio::test]
async fn integration_loaded_plugin_skips_short_issue_without_side_effects() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_agent(temp.path(), "core", "summarizer.md", SUMMARIZER);
    let agents = load_plugins(temp.path()).expect("load plugins");
    assert_eq!(agents.len(), 1);
    assert!(agents[0].matches_trigger("manual", &[]));

    let store = Arc::new(InMemoryIssueStore::new(vec![issue(3, REPAIRED_BODY, &[])]));
    let client = ScriptedClient::new(vec![Ok("unused".to_string())]);
    let executor = PluginExecutor::new(
        services(store.clone(), client.clone(), PromptLibrary::new()),
        FormatRules::default(),
    );
    let registry = AgentRegistry::new(agents, executor);

    let mut params = ResultMap::new();
    params.insert("issue_number".to_string(), json!(3));
    let result = registry
        .execute("Task Summarizer", &params)
        .await
        .expect("execute");

    assert_eq!(result["status"], "skipped");
    assert_eq!(client.request_count().await, 0);
    assert!(store.comments().await.is_empty());
}

#[tokio::test]
async fn integration_loaded_plugin_uses_its_prompt_template_and_comments() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_agent(
        temp.path(),
        "custom",
        "summarizer.md",
        &SUMMARIZER.replace("min_length_for_summary: 200", "min_length_for_summary: 20"),
    );
    let agents = load_plugins(temp.path()).expect("load plugins");
    assert_eq!(agents[0].kind, "custom");
    assert_eq!(agents[0].template_name(), "summarizer");

    let mut prompts = PromptLibrary::new();
    prompts
        .insert("summarizer", "Summarize #{{ number }}: {{ title }}")
        .expect("template");
    let store = Arc::new(InMemoryIssueStore::new(vec![issue(9, REPAIRED_BODY, &[])]));
    let client = ScriptedClient::new(vec![Ok("```\nCSV export for finance.\n```".to_string())]);
    let registry = AgentRegistry::new(
        agents,
        PluginExecutor::new(
            services(store.clone(), client.clone(), prompts),
            FormatRules::default(),
        ),
    );

    let mut params = ResultMap::new();
    params.insert("issue".to_string(), json!(9));
    let result = registry
        .execute("Task Summarizer", &params)
        .await
        .expect("execute");

    let prompts = client.prompts().await;
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Summarize #9: Task 9"));
    assert_eq!(result["comment_added"], true);
    let comments = store.comments().await;
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.starts_with("🤖 **Task Summarizer**"));
    assert!(comments[0].body.contains("CSV export for finance."));
}
