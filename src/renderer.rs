/// HTML renderer for the node tree
use crate::ast::{ListKind, NodeId, NodeValue, Tree};
use crate::config::RenderOptions;
use crate::formatter::HtmlFormatter;

pub struct HtmlRenderer {
    options: RenderOptions,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    pub fn with_options(options: RenderOptions) -> Self {
        HtmlRenderer { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the whole tree, as a fragment or a full document per the options.
    pub fn render(&self, tree: &Tree) -> String {
        let mut f = HtmlFormatter::new(self.options.line_breaks);
        if self.options.full_document {
            self.document_head(&mut f);
            self.render_blocks(&mut f, tree, tree.root());
            f.cr();
            f.raw("</body>");
            f.newline();
            f.raw("</html>");
            f.newline();
        } else {
            self.render_blocks(&mut f, tree, tree.root());
        }
        f.finish()
    }

    fn document_head(&self, f: &mut HtmlFormatter) {
        f.raw("<!DOCTYPE html>");
        f.newline();
        f.raw("<html>");
        f.newline();
        f.raw("<head>");
        f.newline();
        f.open("meta", &[("charset", self.options.charset.as_str())]);
        f.newline();
        if let Some(title) = &self.options.title {
            f.open("title", &[]);
            f.text(title);
            f.close("title");
            f.newline();
        }
        for href in &self.options.stylesheets {
            f.open("link", &[("rel", "stylesheet"), ("href", href.as_str())]);
            f.newline();
        }
        f.raw("</head>");
        f.newline();
        f.raw("<body>");
        f.newline();
    }

    /// Walk the subtree at `root` without recursion, so deeply nested input
    /// cannot exhaust the stack.
    fn render_blocks(&self, f: &mut HtmlFormatter, tree: &Tree, root: NodeId) {
        let mut stack = vec![(root, false)];
        while let Some((node, exiting)) = stack.pop() {
            if exiting {
                self.exit(f, tree, node);
                continue;
            }
            if self.enter(f, tree, node) {
                stack.push((node, true));
                let children: Vec<_> = tree.children(node).collect();
                stack.extend(children.into_iter().rev().map(|child| (child, false)));
            }
        }
    }

    /// Emit the opening part of `node`. Returns whether its children and
    /// closing part should follow.
    fn enter(&self, f: &mut HtmlFormatter, tree: &Tree, node: NodeId) -> bool {
        match &tree[node] {
            NodeValue::Document => {}
            NodeValue::BlockQuote => {
                f.cr();
                f.open("blockquote", &[]);
                f.cr();
            }
            NodeValue::Heading { level } => {
                f.cr();
                f.open(&format!("h{level}"), &[]);
            }
            NodeValue::Paragraph => {
                if !in_tight_list(tree, node) {
                    f.cr();
                    f.open("p", &[]);
                }
            }
            NodeValue::List(list) => {
                f.cr();
                match list.kind {
                    ListKind::Unordered { .. } => f.open("ul", &[]),
                    ListKind::Ordered { start: 1, .. } => f.open("ol", &[]),
                    ListKind::Ordered { start, .. } => {
                        let start = start.to_string();
                        f.open("ol", &[("start", start.as_str())])
                    }
                    ListKind::Definition => f.open("dl", &[]),
                }
                f.cr();
            }
            NodeValue::ListItem => f.open("li", &[]),
            NodeValue::Term => {
                f.cr();
                f.open("dt", &[]);
            }
            NodeValue::Definition => {
                f.cr();
                f.open("dd", &[]);
            }
            NodeValue::Admonition { kind, title } => {
                f.cr();
                let class = format!("admonition {kind}");
                f.open("div", &[("class", class.as_str())]);
                f.cr();
                if let Some(title) = title {
                    f.open("p", &[("class", "admonition-title")]);
                    f.text(title);
                    f.close("p");
                    f.cr();
                }
            }
            NodeValue::CodeBlock {
                language, literal, ..
            } => {
                f.cr();
                f.open("pre", &[]);
                match language {
                    Some(language) => {
                        let class = format!("language-{language}");
                        f.open("code", &[("class", class.as_str())])
                    }
                    None => f.open("code", &[]),
                }
                f.text(literal);
                f.close("code");
                f.close("pre");
                f.cr();
                return false;
            }
            NodeValue::HtmlBlock { literal } => {
                f.cr();
                f.raw(literal);
                f.cr();
                return false;
            }
            NodeValue::ThematicBreak => {
                f.cr();
                f.void("hr", &[]);
                f.cr();
                return false;
            }
            NodeValue::Text { literal } => {
                f.text(literal);
                return false;
            }
            NodeValue::CodeSpan { literal } => {
                f.open("code", &[]);
                f.text(literal);
                f.close("code");
                return false;
            }
            NodeValue::HtmlInline { literal } => {
                f.raw(literal);
                return false;
            }
            NodeValue::HardLineBreak => {
                f.void("br", &[]);
                f.newline();
                return false;
            }
            NodeValue::Emphasis { strength } => {
                f.open(emphasis_tag(*strength), &[]);
            }
            NodeValue::Link { destination, title } => {
                let mut attributes = vec![("href", destination.as_str())];
                if let Some(title) = title {
                    attributes.push(("title", title.as_str()));
                }
                f.open("a", &attributes);
            }
            NodeValue::Image { destination, title } => {
                let alt = tree.text_content(node);
                let mut attributes = vec![("src", destination.as_str()), ("alt", alt.as_str())];
                if let Some(title) = title {
                    attributes.push(("title", title.as_str()));
                }
                f.void("img", &attributes);
                return false;
            }
        }
        true
    }

    fn exit(&self, f: &mut HtmlFormatter, tree: &Tree, node: NodeId) {
        match &tree[node] {
            NodeValue::BlockQuote => {
                f.cr();
                f.close("blockquote");
                f.cr();
            }
            NodeValue::Heading { level } => {
                f.close(&format!("h{level}"));
                f.cr();
            }
            NodeValue::Paragraph => {
                if !in_tight_list(tree, node) {
                    f.close("p");
                    f.cr();
                }
            }
            NodeValue::List(list) => {
                f.cr();
                f.close(match list.kind {
                    ListKind::Unordered { .. } => "ul",
                    ListKind::Ordered { .. } => "ol",
                    ListKind::Definition => "dl",
                });
                f.cr();
            }
            NodeValue::ListItem => {
                f.close("li");
                f.cr();
            }
            NodeValue::Term => {
                f.close("dt");
                f.cr();
            }
            NodeValue::Definition => {
                f.close("dd");
                f.cr();
            }
            NodeValue::Admonition { .. } => {
                f.cr();
                f.close("div");
                f.cr();
            }
            NodeValue::Emphasis { strength } => f.close(emphasis_tag(*strength)),
            NodeValue::Link { .. } => f.close("a"),
            _ => {}
        }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn emphasis_tag(strength: u8) -> &'static str {
    if strength >= 2 { "strong" } else { "em" }
}

/// Paragraphs directly inside the items of a tight list render without `<p>`.
fn in_tight_list(tree: &Tree, paragraph: NodeId) -> bool {
    let Some(item) = tree.parent(paragraph) else {
        return false;
    };
    if !matches!(tree[item], NodeValue::ListItem | NodeValue::Definition) {
        return false;
    }
    tree.parent(item)
        .is_some_and(|list| matches!(&tree[list], NodeValue::List(list) if list.is_tight()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::List;
    use pretty_assertions::assert_eq;

    fn tree_with(build: impl FnOnce(&mut Tree, NodeId)) -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        build(&mut tree, root);
        tree
    }

    fn add(tree: &mut Tree, parent: NodeId, value: NodeValue) -> NodeId {
        let node = tree.create(value).unwrap();
        tree.append_child(parent, node).unwrap();
        node
    }

    fn list_tree(tight: bool) -> Tree {
        tree_with(|tree, root| {
            let list = add(
                tree,
                root,
                NodeValue::List(List::new(
                    ListKind::Ordered {
                        start: 3,
                        delimiter: '.',
                    },
                    tight,
                )),
            );
            for word in ["one", "two"] {
                let item = add(tree, list, NodeValue::ListItem);
                let para = add(tree, item, NodeValue::Paragraph);
                add(tree, para, NodeValue::text(word));
            }
        })
    }

    #[test]
    fn test_tight_and_loose_lists() {
        let compact = HtmlRenderer::new();
        assert_eq!(
            compact.render(&list_tree(true)),
            "<ol start=\"3\"><li>one</li><li>two</li></ol>"
        );
        let reference = HtmlRenderer::with_options(RenderOptions {
            line_breaks: true,
            ..RenderOptions::default()
        });
        assert_eq!(
            reference.render(&list_tree(false)),
            "<ol start=\"3\">\n<li>\n<p>one</p>\n</li>\n<li>\n<p>two</p>\n</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_inline_markup() {
        let tree = tree_with(|tree, root| {
            let para = add(tree, root, NodeValue::Paragraph);
            let em = add(tree, para, NodeValue::emphasis(2).unwrap());
            add(tree, em, NodeValue::text("a&b"));
            add(tree, para, NodeValue::HardLineBreak);
            let link = add(
                tree,
                para,
                NodeValue::Link {
                    destination: "/u?x=\"1\"".to_string(),
                    title: Some("T".to_string()),
                },
            );
            add(tree, link, NodeValue::text("l"));
            let image = add(
                tree,
                para,
                NodeValue::Image {
                    destination: "i.png".to_string(),
                    title: None,
                },
            );
            let alt = add(tree, image, NodeValue::emphasis(1).unwrap());
            add(tree, alt, NodeValue::text("alt"));
            add(tree, para, NodeValue::HtmlInline { literal: "<b>".to_string() });
        });
        assert_eq!(
            HtmlRenderer::new().render(&tree),
            "<p><strong>a&amp;b</strong><br />\n<a href=\"/u?x=&quot;1&quot;\" title=\"T\">l</a><img src=\"i.png\" alt=\"alt\" /><b></p>"
        );
    }

    #[test]
    fn test_extension_blocks() {
        let tree = tree_with(|tree, root| {
            let note = add(
                tree,
                root,
                NodeValue::Admonition {
                    kind: "note".to_string(),
                    title: Some("Note".to_string()),
                },
            );
            let para = add(tree, note, NodeValue::Paragraph);
            add(tree, para, NodeValue::text("body"));
            let dl = add(tree, root, NodeValue::List(List::new(ListKind::Definition, true)));
            let term = add(tree, dl, NodeValue::Term);
            add(tree, term, NodeValue::text("t"));
            let def = add(tree, dl, NodeValue::Definition);
            let para = add(tree, def, NodeValue::Paragraph);
            add(tree, para, NodeValue::text("d"));
        });
        assert_eq!(
            HtmlRenderer::new().render(&tree),
            "<div class=\"admonition note\"><p class=\"admonition-title\">Note</p><p>body</p></div><dl><dt>t</dt><dd>d</dd></dl>"
        );
    }

    #[test]
    fn test_full_document() {
        let tree = tree_with(|tree, root| {
            add(tree, root, NodeValue::ThematicBreak);
        });
        let renderer = HtmlRenderer::with_options(RenderOptions {
            full_document: true,
            title: Some("A <b> title".to_string()),
            stylesheets: vec!["site.css".to_string()],
            ..RenderOptions::default()
        });
        assert_eq!(
            renderer.render(&tree),
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>A &lt;b&gt; title</title>\n\
             <link rel=\"stylesheet\" href=\"site.css\">\n</head>\n<body>\n<hr /></body>\n</html>\n"
        );
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let tree = list_tree(true);
        let renderer = HtmlRenderer::new();
        assert_eq!(renderer.render(&tree), renderer.render(&tree));
    }
}
