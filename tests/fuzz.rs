use markweave::{HtmlRenderer, Parser, RenderOptions};

/// Any input parses and renders, in both layouts.
#[test_fuzz::test_fuzz]
fn parse_and_render(markdown: String) {
    let tree = Parser::new()
        .parse(&markdown)
        .expect("markdown never fails to parse");
    HtmlRenderer::new().render(&tree);
    HtmlRenderer::with_options(RenderOptions {
        line_breaks: true,
        ..RenderOptions::default()
    })
    .render(&tree);
}

#[test]
fn pathological_seeds() {
    let seeds = [
        "*".repeat(5000),
        "*a ".repeat(2000),
        "_a".repeat(3000) + &"b_".repeat(3000),
        "[".repeat(4000) + &"]".repeat(4000),
        "[a](".repeat(2000),
        ">".repeat(3000) + " deep",
        "- ".repeat(1000) + "x",
        "`".repeat(1000) + "a" + &"``".repeat(500),
        "<!--".repeat(1000),
        "&#".repeat(1000) + "x;",
        "\t \u{0}\r\n\r".repeat(500),
        "!!! note\n    : x\n    Term\n    : y\n".repeat(200),
    ];
    for seed in seeds {
        parse_and_render(seed);
    }
}

#[test]
fn deeply_nested_tree_serialises_to_json() {
    let depth = 10_000;
    let tree = Parser::new()
        .parse(&(">".repeat(depth) + " a"))
        .unwrap();
    let json = tree.to_json().unwrap();
    assert!(json.starts_with("{\"value\":{\"type\":\"document\"}"));
    assert_eq!(json.matches("\"block_quote\"").count(), depth);
    assert_eq!(json.matches('[').count(), json.matches(']').count());
    assert!(json.ends_with("]}]}"));
}
