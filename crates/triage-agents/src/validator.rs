//! Check-then-repair workflow for issue bodies.
//!
//! A conforming issue is left alone with no store or model traffic. A failing
//! issue is rewritten by one completion call, wrapped in the replaceable agent
//! notice, written back, and announced with a comment. Batch runs mark every
//! evaluated issue with a sentinel label so later runs skip it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use triage_core::{strip_code_fence, Issue, IssueStateFilter};
use triage_github::IssueUpdate;
use triage_rules::{check_format, merge_fixed_body, FormatRules, Guidelines};

use crate::{render_or_fallback, AgentServices};

/// Sentinel label recording that an issue went through a batch run.
pub const VALIDATED_LABEL: &str = "agent-validator";

const VALIDATOR_TEMPLATE: &str = "validator";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    pub already_valid: bool,
    pub violations: Vec<String>,
    /// Comment announcing the fix; empty for conforming issues.
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueValidation {
    pub number: u64,
    pub title: String,
    pub validated: bool,
    pub fixed: bool,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationBatchReport {
    pub total: usize,
    pub validated: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub outcomes: Vec<IssueValidation>,
    pub errors: Vec<String>,
}

impl ValidationBatchReport {
    pub fn summary_message(&self) -> String {
        if self.validated == 0 && self.errors.is_empty() {
            return format!("All issues already validated (have '{VALIDATED_LABEL}' label)");
        }
        format!(
            "Validated {} issues ({} fixed, {} already valid), {} skipped (already validated)",
            self.validated,
            self.fixed,
            self.validated - self.fixed,
            self.skipped
        )
    }
}

pub struct Validator {
    services: AgentServices,
    rules: FormatRules,
    guidelines: Option<Guidelines>,
}

impl Validator {
    pub fn new(services: AgentServices, rules: FormatRules) -> Self {
        Self {
            services,
            rules,
            guidelines: None,
        }
    }

    /// Attaches a guidelines document; its stated rules override the
    /// configured ones and its text feeds the repair prompt.
    pub fn with_guidelines(mut self, guidelines: Guidelines) -> Self {
        self.rules = self.rules.with_guidelines(&guidelines.rules);
        self.guidelines = Some(guidelines);
        self
    }

    pub fn rules(&self) -> &FormatRules {
        &self.rules
    }

    pub fn check(&self, issue: &Issue) -> Vec<String> {
        check_format(issue, &self.rules)
    }

    pub async fn validate_and_fix(&self, issue: &Issue) -> Result<FixOutcome> {
        let violations = self.check(issue);
        if violations.is_empty() {
            return Ok(FixOutcome {
                already_valid: true,
                violations,
                comment: String::new(),
            });
        }

        let prompt = self.repair_prompt(issue, &violations)?;
        let completion = self
            .services
            .completion
            .complete(&prompt)
            .await
            .with_context(|| format!("failed to fix issue #{} with completion", issue.number))?;
        let fixed_body = strip_code_fence(&completion);
        let merged = merge_fixed_body(&issue.body, &fixed_body, &violations);

        let repo = issue.repo_ref();
        self.services
            .store
            .update_issue(repo.as_ref(), issue.number, IssueUpdate::body(merged))
            .await
            .with_context(|| format!("failed to update issue #{}", issue.number))?;

        let comment = fix_comment(&violations);
        if let Err(error) = self
            .services
            .store
            .add_comment(repo.as_ref(), issue.number, &comment)
            .await
        {
            tracing::warn!(issue = issue.number, error = %error, "failed to add fix comment");
        }

        tracing::info!(
            issue = issue.number,
            violations = violations.len(),
            "issue body repaired"
        );
        Ok(FixOutcome {
            already_valid: false,
            violations,
            comment,
        })
    }

    pub async fn validate_issue_number(&self, number: u64) -> Result<FixOutcome> {
        let issue = self
            .services
            .store
            .get_issue(None, number)
            .await
            .with_context(|| format!("failed to get issue #{number}"))?;
        self.validate_and_fix(&issue).await
    }

    /// Validates every open issue that does not carry the sentinel label.
    ///
    /// Issues are processed one at a time. A failing issue is recorded and
    /// left unlabelled so the next run retries it.
    pub async fn validate_all(&self) -> Result<ValidationBatchReport> {
        let issues = self
            .services
            .store
            .list_issues(IssueStateFilter::Open)
            .await
            .context("failed to list issues")?;

        let mut report = ValidationBatchReport {
            total: issues.len(),
            ..ValidationBatchReport::default()
        };

        for issue in issues.iter().filter(|issue| !issue.has_label(VALIDATED_LABEL)) {
            let outcome = match self.validate_and_fix(issue).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::warn!(issue = issue.number, error = %format!("{error:#}"), "validation failed");
                    report
                        .errors
                        .push(format!("issue #{}: {error:#}", issue.number));
                    continue;
                }
            };

            if let Err(error) = self
                .services
                .store
                .add_label(issue.repo_ref().as_ref(), issue.number, VALIDATED_LABEL)
                .await
            {
                tracing::warn!(
                    issue = issue.number,
                    label = VALIDATED_LABEL,
                    error = %error,
                    "failed to add sentinel label"
                );
            }

            report.validated += 1;
            if !outcome.already_valid {
                report.fixed += 1;
            }
            report.outcomes.push(IssueValidation {
                number: issue.number,
                title: issue.title.clone(),
                validated: outcome.already_valid,
                fixed: !outcome.already_valid,
                comment: outcome.comment,
            });
        }

        report.skipped = report.total - report.validated;
        Ok(report)
    }

    fn repair_prompt(&self, issue: &Issue, violations: &[String]) -> Result<String> {
        let (guidelines_text, instructions) = self
            .guidelines
            .as_ref()
            .map(|guidelines| (guidelines.raw_content.as_str(), guidelines.instructions.as_str()))
            .unwrap_or_default();
        let required_sections = self.rules.required_sections.join(", ");
        let data = json!({
            "title": issue.title,
            "body": issue.body,
            "violations": violations,
            "min_description_length": self.rules.min_description_length,
            "required_sections": required_sections,
            "label_prefix": self.rules.label_prefix,
            "guidelines": guidelines_text,
            "instructions": instructions,
        });

        render_or_fallback(
            self.services.prompts.as_ref(),
            VALIDATOR_TEMPLATE,
            &data,
            || {
                let guidance = match self.guidelines.as_ref() {
                    Some(guidelines) if !guidelines.instructions.is_empty() => {
                        format!("\n\nInstructions:\n{}", guidelines.instructions)
                    }
                    Some(guidelines) => format!("\n\nProject Guidelines:\n{}", guidelines.raw_content),
                    None => String::new(),
                };
                format!(
                    "You are a task format enforcer for a GitHub project. Fix the following task to comply with the format guidelines.{guidance}\n\
\n\
Current task:\n\
Title: {title}\n\
Body: {body}\n\
\n\
Format violations:\n\
{violations}\n\
\n\
Required format:\n\
- Description: At least {min} characters\n\
- Required sections: {required_sections}\n\
- Priority label: Must have a label starting with \"{prefix}\"\n\
\n\
Please rewrite the task body to fix all violations while preserving the original intent and information. Return ONLY the fixed body text, no explanations.",
                    title = issue.title,
                    body = issue.body,
                    violations = violations.join("\n"),
                    min = self.rules.min_description_length,
                    prefix = self.rules.label_prefix,
                )
            },
        )
    }
}

fn fix_comment(violations: &[String]) -> String {
    let bullets = violations
        .iter()
        .map(|violation| format!("- {violation}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🤖 **Agent**: I've updated this task to follow our format guidelines.\n\nIssues fixed:\n{bullets}"
    )
}
