//! Issue workflows built on the store, completion, and prompt capabilities.
//!
//! - `validator`: check-then-repair of issue bodies with sentinel-label batches.
//! - `stale_monitor`: nudges assignees of issues without recent updates.
//! - `digest`: executive summary, progress report, and roast issues.
//! - `metrics`: issue-collection aggregates shared by the digests.
//!
//! Every loop awaits one external call at a time.

pub mod digest;
pub mod metrics;
mod prompting;
pub mod stale_monitor;
pub mod validator;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use triage_ai::TextCompletion;
use triage_github::IssueStore;
use triage_prompts::PromptRenderer;

pub use digest::{CreatedIssue, DigestGenerator, DigestKind, DigestReport};
pub use metrics::{ProjectSnapshot, VELOCITY_WINDOW_DAYS};
pub use prompting::render_or_fallback;
pub use stale_monitor::{
    stale_fallback_message, MonitorReport, StaleIssueOutcome, StaleTaskMonitor,
    DEFAULT_STALE_THRESHOLD_DAYS,
};
pub use validator::{
    FixOutcome, IssueValidation, ValidationBatchReport, Validator, VALIDATED_LABEL,
};

#[derive(Clone)]
/// Capabilities shared by every workflow.
pub struct AgentServices {
    pub store: Arc<dyn IssueStore>,
    pub completion: Arc<dyn TextCompletion>,
    pub prompts: Arc<dyn PromptRenderer>,
}

impl AgentServices {
    pub fn new(
        store: Arc<dyn IssueStore>,
        completion: Arc<dyn TextCompletion>,
        prompts: Arc<dyn PromptRenderer>,
    ) -> Self {
        Self {
            store,
            completion,
            prompts,
        }
    }
}
