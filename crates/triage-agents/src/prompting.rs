use anyhow::Result;
use serde_json::Value;
use triage_prompts::PromptRenderer;

/// Renders `template` when it is registered, otherwise builds the inline
/// prompt. Exactly one of the two is used; render failures are returned.
pub fn render_or_fallback(
    prompts: &dyn PromptRenderer,
    template: &str,
    data: &Value,
    fallback: impl FnOnce() -> String,
) -> Result<String> {
    if !template.is_empty() && prompts.has_template(template) {
        tracing::debug!(template, "rendering prompt template");
        return prompts.render(template, data);
    }
    tracing::debug!(template, "prompt template not registered, using inline prompt");
    Ok(fallback())
}
