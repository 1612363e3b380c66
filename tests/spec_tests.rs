use markweave::{HtmlRenderer, ParseOptions, Parser, RenderOptions};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

const DATA_FILE: &str = "tests/data/tests.json";

/// One entry of the CommonMark reference test suite (`spec.json`).
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct SpecExample {
    markdown: String,
    html: String,
    example: u32,
    start_line: u32,
    end_line: u32,
    section: String,
}

#[derive(Default)]
struct SectionTally {
    passed: usize,
    failed: usize,
}

#[test]
fn commonmark_spec_examples() {
    let _ = env_logger::builder().is_test(true).try_init();

    let Ok(data) = fs::read_to_string(DATA_FILE) else {
        eprintln!("skipping: {DATA_FILE} not present");
        return;
    };
    let examples: Vec<SpecExample> = serde_json::from_str(&data).expect("spec data is valid JSON");

    let parser = Parser::with_options(ParseOptions::commonmark());
    let renderer = HtmlRenderer::with_options(RenderOptions {
        line_breaks: true,
        ..RenderOptions::default()
    });

    let mut sections: BTreeMap<&str, SectionTally> = BTreeMap::new();
    let mut failures = Vec::new();
    for example in &examples {
        let tree = parser.parse(&example.markdown).expect("markdown never fails to parse");
        let tally = sections.entry(example.section.as_str()).or_default();
        if renderer.render(&tree) == example.html {
            tally.passed += 1;
        } else {
            tally.failed += 1;
            failures.push(example);
        }
    }

    for example in failures.iter().take(5) {
        let tree = parser.parse(&example.markdown).expect("markdown never fails to parse");
        eprintln!("\nexample {} failed ({})", example.example, example.section);
        eprintln!("  input:    {:?}", example.markdown);
        eprintln!("  expected: {:?}", example.html);
        eprintln!("  got:      {:?}", renderer.render(&tree));
    }

    eprintln!("\nCommonMark examples by section:");
    for (section, tally) in &sections {
        eprintln!("  {section:<40} {:>3}/{}", tally.passed, tally.passed + tally.failed);
    }
    let passed: usize = sections.values().map(|t| t.passed).sum();
    eprintln!(
        "  total: {passed}/{} ({:.1}%)",
        examples.len(),
        passed as f64 * 100.0 / examples.len().max(1) as f64
    );

    // Tracking only. Individual behaviours are pinned in tests/commonmark_examples.rs
    assert!(passed > 0, "no example rendered as expected");
}
