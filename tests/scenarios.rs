use markweave::inline::{InlineHandler, Subject};
use markweave::{
    Config, HtmlRenderer, NodeId, NodeValue, ParseOptions, Parser, ParserBuilder, Tree,
};
use pretty_assertions::assert_eq;

fn parse(markdown: &str) -> Tree {
    let _ = env_logger::builder().is_test(true).try_init();
    Parser::new().parse(markdown).unwrap()
}

fn html(markdown: &str) -> String {
    HtmlRenderer::new().render(&parse(markdown))
}

fn children(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    tree.children(node).collect()
}

fn only_child(tree: &Tree, node: NodeId) -> NodeId {
    let kids = children(tree, node);
    assert_eq!(kids.len(), 1, "expected one child of {:?}", tree[node]);
    kids[0]
}

#[test]
fn heading_holds_its_text() {
    let tree = parse("# Hello");
    let heading = only_child(&tree, tree.root());
    assert_eq!(tree[heading], NodeValue::Heading { level: 1 });
    let text = only_child(&tree, heading);
    assert_eq!(tree[text], NodeValue::text("Hello"));
}

#[test]
fn block_quote_holds_a_paragraph() {
    let tree = parse("> quoted");
    let quote = only_child(&tree, tree.root());
    assert_eq!(tree[quote], NodeValue::BlockQuote);
    let para = only_child(&tree, quote);
    assert_eq!(tree[para], NodeValue::Paragraph);
    assert_eq!(tree.text_content(para), "quoted");
}

#[test]
fn fenced_code_keeps_language_and_content() {
    let tree = parse("```js\ncode\n```");
    let code = only_child(&tree, tree.root());
    assert_eq!(
        tree[code],
        NodeValue::CodeBlock {
            info: "js".to_string(),
            language: Some("js".to_string()),
            literal: "code\n".to_string(),
        }
    );
}

#[test]
fn emphasis_nodes_and_their_text() {
    let tree = parse("*a* **b**");
    let para = only_child(&tree, tree.root());
    let inlines = children(&tree, para);
    assert_eq!(inlines.len(), 3);
    assert_eq!(tree[inlines[0]], NodeValue::Emphasis { strength: 1 });
    assert_eq!(tree.text_content(inlines[0]), "a");
    assert_eq!(tree[inlines[1]], NodeValue::text(" "));
    assert_eq!(tree[inlines[2]], NodeValue::Emphasis { strength: 2 });
    assert_eq!(tree.text_content(inlines[2]), "b");
}

#[test]
fn list_tightness_follows_blank_lines() {
    for (input, tight) in [
        ("- one\n- two", true),
        ("- one\n\n- two", false),
        ("1. one\n2. two\n\n", true),
        ("- one\n\n  more\n- two", false),
    ] {
        let tree = parse(input);
        let list = only_child(&tree, tree.root());
        let NodeValue::List(list) = tree[list] else {
            panic!("{input:?} did not produce a list");
        };
        assert_eq!(list.is_tight(), tight, "{input:?}");
        assert_eq!(list.is_tight(), !list.is_loose());
    }
    assert_eq!(html("- one\n- two"), "<ul><li>one</li><li>two</li></ul>");
}

#[test]
fn rendering_is_a_pure_function_of_the_tree() {
    let tree = parse("a < b & \"c\"\n\n<span>raw</span>");
    let renderer = HtmlRenderer::new();
    let first = renderer.render(&tree);
    assert_eq!(first, renderer.render(&tree));
    assert_eq!(first, "<p>a &lt; b &amp; &quot;c&quot;</p><p><span>raw</span></p>");
}

#[test]
fn delimiter_characters_are_conserved() {
    fn emphasis_weight(tree: &Tree, node: NodeId) -> usize {
        let own = match tree[node] {
            NodeValue::Emphasis { strength } => 2 * strength as usize,
            _ => 0,
        };
        own + children(tree, node)
            .into_iter()
            .map(|child| emphasis_weight(tree, child))
            .sum::<usize>()
    }

    for input in [
        "*foo**bar*",
        "***x***",
        "**a*",
        "*a* **b** ***c***",
        "*foo**bar**baz*",
        "**foo*bar*baz**",
        "a * b * c",
    ] {
        let tree = parse(input);
        let literal = tree.text_content(tree.root()).matches('*').count();
        assert_eq!(
            literal + emphasis_weight(&tree, tree.root()),
            input.matches('*').count(),
            "{input:?}"
        );
    }
}

#[test]
fn first_reference_definition_wins() {
    assert_eq!(
        html("[Foo Bar]\n\n[foo  bar]: /one\n[FOO BAR]: /two"),
        "<p><a href=\"/one\">Foo Bar</a></p>"
    );
}

#[test]
fn admonition_titles() {
    assert_eq!(
        html("!!! warning \"Mind the gap\"\n    Careful."),
        "<div class=\"admonition warning\"><p class=\"admonition-title\">Mind the gap</p>\
         <p>Careful.</p></div>"
    );
    assert_eq!(
        html("!!! tip \"\"\n    Quiet."),
        "<div class=\"admonition tip\"><p>Quiet.</p></div>"
    );
}

#[test]
fn admonition_holds_nested_blocks() {
    assert_eq!(
        html("!!! note\n    - a\n    - b\n\n    > q\n\nafter"),
        "<div class=\"admonition note\"><p class=\"admonition-title\">Note</p>\
         <ul><li>a</li><li>b</li></ul><blockquote><p>q</p></blockquote></div><p>after</p>"
    );
}

#[test]
fn definition_lists() {
    assert_eq!(
        html("Term\n: one\n: two"),
        "<dl><dt>Term</dt><dd>one</dd><dd>two</dd></dl>"
    );
    assert_eq!(
        html("Term\n: one\n\n: two"),
        "<dl><dt>Term</dt><dd><p>one</p></dd><dd><p>two</p></dd></dl>"
    );
    assert_eq!(
        html("A\n: a\n\nB\n: b"),
        "<dl><dt>A</dt><dd><p>a</p></dd><dt>B</dt><dd><p>b</p></dd></dl>"
    );
}

#[test]
fn disabled_extensions_fall_back_to_paragraphs() {
    let parser = Parser::with_options(ParseOptions {
        definition_lists: false,
        ..ParseOptions::default()
    });
    let tree = parser.parse("Term\n: def").unwrap();
    assert_eq!(HtmlRenderer::new().render(&tree), "<p>Term\n: def</p>");
}

#[test]
fn raw_html_and_autolinks_can_be_disabled() {
    let parser = Parser::with_options(ParseOptions {
        autolinks: false,
        raw_html: false,
        ..ParseOptions::default()
    });
    let tree = parser.parse("<b> <https://x.org>").unwrap();
    assert_eq!(
        HtmlRenderer::new().render(&tree),
        "<p>&lt;b&gt; &lt;https://x.org&gt;</p>"
    );
}

#[test]
fn full_document_from_config() {
    let config =
        Config::from_json_str(r#"{"render": {"full_document": true, "title": "T"}}"#).unwrap();
    let tree = Parser::with_options(config.parse).parse("# Hi").unwrap();
    assert_eq!(
        HtmlRenderer::with_options(config.render).render(&tree),
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>T</title>\n\
         </head>\n<body>\n<h1>Hi</h1></body>\n</html>\n"
    );
}

/// `@name` becomes a link to a user page.
struct Mention;

impl InlineHandler for Mention {
    fn trigger(&self) -> u8 {
        b'@'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> markweave::Result<usize> {
        let name_len = subject.rest()[1..]
            .bytes()
            .take_while(u8::is_ascii_alphanumeric)
            .count();
        if name_len == 0 {
            return Ok(0);
        }
        let mention = &subject.rest()[..=name_len];
        let link = NodeValue::Link {
            destination: format!("/u/{}", &mention[1..]),
            title: None,
        };
        subject.append_with_text(link, mention)?;
        Ok(mention.len())
    }
}

#[test]
fn custom_inline_handler() {
    let parser = ParserBuilder::default().with_handler(Mention).build();
    let tree = parser.parse("hi @ana! and @ alone").unwrap();
    assert_eq!(
        HtmlRenderer::new().render(&tree),
        "<p>hi <a href=\"/u/ana\">@ana</a>! and @ alone</p>"
    );
}

#[test]
fn tree_serialises_to_json() {
    let tree = parse("> *a*");
    let json: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
    let quote = &json["children"][0];
    assert_eq!(quote["value"]["type"], "block_quote");
    let emphasis = &quote["children"][0]["children"][0];
    assert_eq!(emphasis["value"]["type"], "emphasis");
    assert_eq!(emphasis["value"]["strength"], 1);
}
