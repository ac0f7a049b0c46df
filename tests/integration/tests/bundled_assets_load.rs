use std::path::{Path, PathBuf};

use serde_json::json;
use triage_plugins::{load_plugins, route_for, AgentRoute};
use triage_prompts::{PromptLibrary, PromptRenderer};
use triage_rules::{load_guidelines, FormatRules};

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn integration_bundled_agents_route_to_expected_behaviours() {
    let agents = load_plugins(&repo_root().join(".github/agents")).expect("load bundled agents");
    let routes = agents
        .iter()
        .map(|agent| (agent.name.as_str(), route_for(&agent.name)))
        .collect::<Vec<_>>();

    assert_eq!(
        routes,
        vec![
            ("Executive Summary", AgentRoute::ExecutiveSummary),
            ("Progress Reporter", AgentRoute::ProgressReporter),
            ("Roaster", AgentRoute::Roaster),
            ("Task Monitor", AgentRoute::Monitor),
            ("Task Validator", AgentRoute::Validator),
            ("Task Summarizer", AgentRoute::Generic),
        ]
    );
    let summarizer = &agents[5];
    assert_eq!(summarizer.kind, "custom");
    assert_eq!(summarizer.template_name(), "summarizer");
    assert!(summarizer.matches_trigger("issues.opened", &["needs-summary".to_string()]));
    assert!(!summarizer.matches_trigger("issues.opened", &[]));
}

#[test]
fn integration_bundled_prompts_render_with_agent_data() {
    let root = repo_root();
    let prompts = PromptLibrary::load(&[
        root.join("prompts"),
        root.join(".github/agents/custom/prompts"),
        root.join(".github/agents/core/prompts"),
    ])
    .expect("load bundled prompts");

    for name in [
        "validator",
        "monitor",
        "executive-summary",
        "progress-report",
        "roast",
        "summarizer",
    ] {
        assert!(prompts.has_template(name), "missing template {name}");
    }

    let rendered = prompts
        .render(
            "validator",
            &json!({
                "title": "Export CSV",
                "body": "todo",
                "violations": ["Missing required section: Description"],
                "min_description_length": 50,
                "required_sections": "Description, Acceptance Criteria",
                "label_prefix": "priority:",
                "guidelines": "",
                "instructions": "",
            }),
        )
        .expect("render validator");
    assert!(rendered.contains("- Missing required section: Description"));
    assert!(!rendered.contains("Project guidelines:"));
}

#[test]
fn integration_bundled_guidelines_match_default_rules() {
    let guidelines =
        load_guidelines(&repo_root().join(".github/task-guidelines.md")).expect("guidelines");
    let merged = FormatRules::default().with_guidelines(&guidelines.rules);

    assert_eq!(merged, FormatRules::default());
    assert_eq!(guidelines.examples.len(), 1);
    assert!(guidelines.instructions.contains("acceptance criteria"));
}
