use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use triage_agents::{DigestGenerator, DigestKind};
use triage_cli::{Cli, CliMode};
use triage_plugins::ResultMap;

use crate::bot_runtime::BotRuntime;
use crate::monitor_daemon::run_monitor_daemon;

pub(crate) async fn run_mode(runtime: &BotRuntime, cli: &Cli) -> Result<()> {
    tracing::info!(mode = %cli.mode, "starting");
    let now = Utc::now();
    let output = match cli.mode {
        CliMode::Validate => run_validate(runtime, cli.issue).await?,
        CliMode::Monitor if cli.daemon => return run_monitor_daemon(runtime).await,
        CliMode::Monitor => run_monitor_once(runtime, now).await?,
        CliMode::Roast => run_digest(runtime, DigestKind::Roast, now).await?,
        CliMode::Summary => run_digest(runtime, DigestKind::ExecutiveSummary, now).await?,
        CliMode::Progress => run_digest(runtime, DigestKind::ProgressReport, now).await?,
        CliMode::All => run_all(runtime, now).await,
        CliMode::Agents => run_agents(runtime, cli.agent.as_deref(), cli.issue).await?,
    };
    println!("{output}");
    Ok(())
}

pub(crate) async fn run_validate(runtime: &BotRuntime, issue: Option<u64>) -> Result<String> {
    let validator = runtime.validator();
    if let Some(number) = issue {
        let outcome = validator.validate_issue_number(number).await?;
        if outcome.already_valid {
            return Ok(format!("✅ Issue #{number} is valid"));
        }
        return Ok(format!(
            "⚠️  Issue #{number} was fixed\nComment: {}",
            outcome.comment
        ));
    }

    let report = validator
        .validate_all()
        .await
        .context("failed to validate issues")?;
    let mut output = String::new();
    for outcome in report.outcomes.iter().filter(|outcome| outcome.fixed) {
        let _ = writeln!(output, "Fixed issue #{}: {}", outcome.number, outcome.title);
    }
    for error in &report.errors {
        let _ = writeln!(output, "Error validating {error}");
    }
    let _ = write!(output, "✅ {}", report.summary_message());
    Ok(output)
}

pub(crate) async fn run_monitor_once(runtime: &BotRuntime, now: DateTime<Utc>) -> Result<String> {
    let report = runtime
        .monitor()
        .check_all(now)
        .await
        .context("failed to check stale tasks")?;
    let mut output = format!(
        "Checked {} open issues (threshold {} days): {} stale, {} nudged",
        report.total_checked,
        report.threshold_days,
        report.stale.len(),
        report.commented_numbers().len()
    );
    for outcome in &report.stale {
        let _ = write!(
            output,
            "\n- #{} {} (@{}, {} days)",
            outcome.number, outcome.title, outcome.assignee, outcome.days_stale
        );
    }
    for error in report.errors() {
        let _ = write!(output, "\nError: {error}");
    }
    Ok(output)
}

pub(crate) async fn run_digest(
    runtime: &BotRuntime,
    kind: DigestKind,
    now: DateTime<Utc>,
) -> Result<String> {
    let report = DigestGenerator::new(runtime.services.clone())
        .generate(kind, None, now)
        .await?;
    let mut output = format!("# {}\n\n{}", report.title, report.text);
    if let Some(created) = &report.created_issue {
        let _ = write!(output, "\n\nCreated issue #{}: {}", created.number, created.url);
    }
    Ok(output)
}

/// Validate, monitor once, then roast. A failing step is logged and the next
/// step still runs.
pub(crate) async fn run_all(runtime: &BotRuntime, now: DateTime<Utc>) -> String {
    let mut sections = Vec::new();
    match run_validate(runtime, None).await {
        Ok(output) => sections.push(output),
        Err(error) => tracing::warn!(step = "validate", error = %format!("{error:#}"), "step failed"),
    }
    match run_monitor_once(runtime, now).await {
        Ok(output) => sections.push(output),
        Err(error) => tracing::warn!(step = "monitor", error = %format!("{error:#}"), "step failed"),
    }
    match run_digest(runtime, DigestKind::Roast, now).await {
        Ok(output) => sections.push(output),
        Err(error) => tracing::warn!(step = "roast", error = %format!("{error:#}"), "step failed"),
    }
    sections.join("\n\n")
}

pub(crate) async fn run_agents(
    runtime: &BotRuntime,
    agent: Option<&str>,
    issue: Option<u64>,
) -> Result<String> {
    let registry = runtime.registry();
    if registry.is_empty() {
        bail!("no plugin agents found; create agents in <plugins>/core/ or <plugins>/custom/");
    }

    let Some(name) = agent else {
        let mut output = String::from("Available agents:");
        for summary in registry.listing() {
            let _ = write!(output, "\n- {} ({}): {}", summary.name, summary.kind, summary.purpose);
            if let Some(schedule) = &summary.schedule {
                let _ = write!(output, "\n    schedule: {schedule}");
            }
            for action in &summary.actions {
                let _ = write!(output, "\n    * {action}");
            }
        }
        return Ok(output);
    };

    let mut params = ResultMap::new();
    if let Some(number) = issue {
        params.insert("issue_number".to_string(), Value::from(number));
    }
    let result = registry.execute(name, &params).await?;
    serde_json::to_string_pretty(&result).context("failed to render agent result")
}
