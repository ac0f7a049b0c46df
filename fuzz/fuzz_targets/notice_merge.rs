#![no_main]

use libfuzzer_sys::fuzz_target;
use triage_rules::{
    merge_fixed_body, preserved_original, remove_existing_agent_notice, AGENT_NOTICE_START,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let _ = remove_existing_agent_notice(&raw);
    let _ = preserved_original(&raw);

    let violations = vec!["Missing required section: Description".to_string()];
    let merged = merge_fixed_body(&raw, "## Description\nfixed", &violations);
    assert!(merged.starts_with(AGENT_NOTICE_START));
    assert!(merged.contains("## Description\nfixed"));
    assert!(preserved_original(&merged).is_some());
});
