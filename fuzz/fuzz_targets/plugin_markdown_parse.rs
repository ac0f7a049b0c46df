#![no_main]

use libfuzzer_sys::fuzz_target;
use triage_plugins::{parse_plugin_markdown, plan_actions};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let agent = parse_plugin_markdown(&raw, "custom");
    assert!(agent.actions.len() <= 50);
    let _ = agent.template_name();
    let _ = agent.schedule();
    let _ = agent.matches_trigger("manual", &[]);
    assert!(plan_actions(&agent).len() <= agent.actions.len() * 3);
});
