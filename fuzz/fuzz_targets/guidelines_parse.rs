#![no_main]

use libfuzzer_sys::fuzz_target;
use triage_rules::{parse_guidelines, FormatRules};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let parsed = parse_guidelines(&raw);
    assert_eq!(parsed.raw_content, raw);
    assert_ne!(parsed.rules.min_description_length, Some(0));

    let merged = FormatRules::default().with_guidelines(&parsed.rules);
    assert!(merged.require_labels);
    assert!(merged.min_description_length > 0);
});
