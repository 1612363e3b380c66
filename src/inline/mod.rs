//! Inline processor.
//!
//! Each raw text run left by the block parser is scanned once, left to
//! right. Bytes with a registered [`InlineHandler`] are offered to it; the
//! rest are copied into a pending text buffer. Emphasis and bracket runs are
//! pushed onto a [`DelimiterStack`] and paired after the scan.

pub mod delimiter;
pub mod handlers;
pub mod link;

use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::refs::LinkDefinitionMap;
pub use delimiter::{Delimiter, DelimiterKind, DelimiterStack};
pub use handlers::standard_handlers;

/// A strategy for inline syntax starting with one ASCII trigger byte.
pub trait InlineHandler: Send + Sync {
    fn trigger(&self) -> u8;

    /// Called with the subject positioned on the trigger byte. Returns the
    /// number of bytes consumed, or 0 to treat the trigger as plain text.
    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize>;
}

/// Several handlers sharing a trigger, tried in registration order.
pub struct CompositeHandler {
    trigger: u8,
    handlers: Vec<Box<dyn InlineHandler>>,
}

impl CompositeHandler {
    pub fn new(trigger: u8, handlers: Vec<Box<dyn InlineHandler>>) -> Self {
        CompositeHandler { trigger, handlers }
    }
}

impl InlineHandler for CompositeHandler {
    fn trigger(&self) -> u8 {
        self.trigger
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        for handler in &self.handlers {
            let consumed = handler.handle(subject)?;
            if consumed > 0 {
                return Ok(consumed);
            }
        }
        Ok(0)
    }
}

/// Handlers indexed by trigger byte.
pub struct InlineHandlers {
    table: Vec<Option<Box<dyn InlineHandler>>>,
}

impl InlineHandlers {
    pub fn new(handlers: Vec<Box<dyn InlineHandler>>) -> Self {
        let mut grouped: Vec<Vec<Box<dyn InlineHandler>>> = (0..128).map(|_| Vec::new()).collect();
        for handler in handlers {
            let trigger = handler.trigger();
            match grouped.get_mut(trigger as usize) {
                Some(slot) => slot.push(handler),
                None => log::warn!("ignoring inline handler with non-ASCII trigger {trigger:#04x}"),
            }
        }
        let table = grouped
            .into_iter()
            .enumerate()
            .map(|(trigger, mut group)| match group.len() {
                0 => None,
                1 => group.pop(),
                _ => Some(Box::new(CompositeHandler::new(trigger as u8, group)) as Box<dyn InlineHandler>),
            })
            .collect();
        InlineHandlers { table }
    }

    pub fn get(&self, byte: u8) -> Option<&dyn InlineHandler> {
        self.table.get(byte as usize)?.as_deref()
    }

    pub fn is_trigger(&self, byte: u8) -> bool {
        self.get(byte).is_some()
    }
}

/// The state of one inline run while it is being scanned.
pub struct Subject<'a> {
    pub(crate) tree: &'a mut Tree,
    pub(crate) refs: &'a LinkDefinitionMap,
    input: &'a str,
    pos: usize,
    pub(crate) parent: NodeId,
    pending: String,
    pub(crate) delimiters: DelimiterStack,
}

impl<'a> Subject<'a> {
    pub fn new(
        tree: &'a mut Tree,
        refs: &'a LinkDefinitionMap,
        input: &'a str,
        parent: NodeId,
    ) -> Self {
        Subject {
            tree,
            refs,
            input,
            pos: 0,
            parent,
            pending: String::new(),
            delimiters: DelimiterStack::new(),
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Byte `offset` positions past the cursor.
    pub fn peek(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    pub fn refs(&self) -> &LinkDefinitionMap {
        self.refs
    }

    /// Literal text, coalesced with neighbouring text until a node is emitted.
    pub fn push_str(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    pub fn pending_mut(&mut self) -> &mut String {
        &mut self.pending
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending);
        let node = self.tree.create(NodeValue::text(text))?;
        self.tree.append_child(self.parent, node)
    }

    /// Appends a node after any pending text.
    pub fn append(&mut self, value: NodeValue) -> Result<NodeId> {
        self.flush()?;
        let node = self.tree.create(value)?;
        self.tree.append_child(self.parent, node)?;
        Ok(node)
    }

    /// Appends a container holding a single text child.
    pub fn append_with_text(&mut self, value: NodeValue, text: &str) -> Result<NodeId> {
        let node = self.append(value)?;
        let child = self.tree.create(NodeValue::text(text))?;
        self.tree.append_child(node, child)?;
        Ok(node)
    }

    /// Appends a separate text node, for delimiter runs that may be cut up later.
    pub fn append_text_node(&mut self, text: &str) -> Result<NodeId> {
        self.append(NodeValue::text(text))
    }

    fn run(&mut self, handlers: &InlineHandlers) -> Result<()> {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() {
            if let Some(handler) = handlers.get(bytes[self.pos]) {
                let consumed = handler.handle(self)?;
                if consumed > 0 {
                    self.pos += consumed;
                    continue;
                }
            }
            let start = self.pos;
            let first_len = self.rest().chars().next().map_or(1, char::len_utf8);
            let mut end = start + first_len;
            // Triggers are ASCII, so this never stops inside a multi-byte character
            while end < bytes.len() && !handlers.is_trigger(bytes[end]) {
                end += 1;
            }
            self.pending.push_str(&self.input[start..end]);
            self.pos = end;
        }
        self.flush()?;
        self.delimiters.process_emphasis(self.tree, None)
    }
}

/// Replace a raw text node with the inline nodes parsed from its content.
///
/// The parsed nodes are appended to the text node's parent, so the raw text
/// node is expected to be that parent's last child.
pub fn parse_inlines(
    tree: &mut Tree,
    refs: &LinkDefinitionMap,
    handlers: &InlineHandlers,
    text: NodeId,
) -> Result<()> {
    let Some(parent) = tree.parent(text) else {
        return Ok(());
    };
    let raw = match &tree[text] {
        NodeValue::Text { literal } => literal.clone(),
        _ => return Ok(()),
    };
    tree.detach(text)?;
    let content = raw.trim_matches([' ', '\t', '\n']);
    let mut subject = Subject::new(tree, refs, content, parent);
    subject.run(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::LinkDefinition;

    fn parse(input: &str, refs: &LinkDefinitionMap) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let para = tree.create(NodeValue::Paragraph).unwrap();
        let root = tree.root();
        tree.append_child(root, para).unwrap();
        let raw = tree.create(NodeValue::text(input)).unwrap();
        tree.append_child(para, raw).unwrap();
        let handlers = InlineHandlers::new(standard_handlers(true, true));
        parse_inlines(&mut tree, refs, &handlers, raw).unwrap();
        (tree, para)
    }

    /// Compact s-expression of the inline tree.
    fn shape(tree: &Tree, node: NodeId) -> String {
        let inner = || {
            tree.children(node)
                .map(|child| shape(tree, child))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match &tree[node] {
            NodeValue::Text { literal } => format!("{literal:?}"),
            NodeValue::CodeSpan { literal } => format!("(code {literal:?})"),
            NodeValue::HtmlInline { literal } => format!("(html {literal:?})"),
            NodeValue::HardLineBreak => "(br)".to_string(),
            NodeValue::Emphasis { strength } => format!("(em{strength} {})", inner()),
            NodeValue::Link { destination, .. } => format!("(link {destination} {})", inner()),
            NodeValue::Image { destination, .. } => format!("(img {destination} {})", inner()),
            _ => format!("({})", inner()),
        }
    }

    fn inline(input: &str) -> String {
        let refs = LinkDefinitionMap::new();
        let (tree, para) = parse(input, &refs);
        shape(&tree, para)
    }

    #[test]
    fn test_plain_text_is_one_node() {
        assert_eq!(inline("hello world"), r#"("hello world")"#);
    }

    #[test]
    fn test_emphasis_and_strong() {
        assert_eq!(
            inline("*a* **b**"),
            r#"((em1 "a") " " (em2 "b"))"#
        );
        assert_eq!(inline("***x***"), r#"((em1 (em2 "x")))"#);
    }

    #[test]
    fn test_rule_of_three() {
        assert_eq!(
            inline("*foo**bar**baz*"),
            r#"((em1 "foo" (em2 "bar") "baz"))"#
        );
        assert_eq!(inline("*foo**bar*"), r#"((em1 "foo" "**" "bar"))"#);
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        assert_eq!(inline("*a"), r#"("*" "a")"#);
        assert_eq!(inline("a_b_c"), r#"("a" "_" "b" "_" "c")"#);
    }

    #[test]
    fn test_code_span() {
        assert_eq!(inline("`` a`b ``"), r#"((code "a`b"))"#);
        assert_eq!(inline("`open"), r#"("`open")"#);
    }

    #[test]
    fn test_inline_link_and_image() {
        assert_eq!(
            inline("[a *b*](/u \"t\")"),
            r#"((link /u "a " (em1 "b")))"#
        );
        assert_eq!(inline("![alt](i.png)"), r#"((img i.png "alt"))"#);
    }

    #[test]
    fn test_links_do_not_nest() {
        assert_eq!(
            inline("[a [b](/in)](/out)"),
            r#"("[" "a " (link /in "b") "](/out)")"#
        );
    }

    #[test]
    fn test_reference_forms() {
        let mut refs = LinkDefinitionMap::new();
        refs.insert(
            "Foo",
            LinkDefinition {
                destination: "/f".to_string(),
                title: None,
            },
        );
        for input in ["[foo]", "[foo][]", "[x][FOO]"] {
            let (tree, para) = parse(input, &refs);
            let first = tree.first_child(para).unwrap();
            assert!(
                matches!(&tree[first], NodeValue::Link { destination, .. } if destination == "/f"),
                "{input}"
            );
        }
        let (tree, para) = parse("[bar]", &refs);
        assert_eq!(shape(&tree, para), r#"("[" "bar]")"#);
    }

    #[test]
    fn test_breaks_and_escapes() {
        assert_eq!(inline("a  \nb"), r#"("a" (br) "b")"#);
        assert_eq!(inline("a\\\nb"), r#"("a" (br) "b")"#);
        assert_eq!(inline("a \n  b"), r#"("a\nb")"#);
        assert_eq!(inline(r"\*x\* &amp; \q"), r#"("*x* & \\q")"#);
    }

    #[test]
    fn test_autolinks_and_raw_html() {
        assert_eq!(
            inline("<https://x.org> <a@b.io>"),
            r#"((link https://x.org "https://x.org") " " (link mailto:a@b.io "a@b.io"))"#
        );
        assert_eq!(
            inline("a <span class=\"x\">b</span>"),
            r#"("a " (html "<span class=\"x\">") "b" (html "</span>"))"#
        );
        assert_eq!(inline("<not a tag"), r#"("<not a tag")"#);
    }

    #[test]
    fn test_composite_handler_falls_through() {
        // both '<' handlers decline, so the byte becomes text
        let handlers = InlineHandlers::new(standard_handlers(true, true));
        assert!(handlers.is_trigger(b'<'));
        assert!(!handlers.is_trigger(b'a'));
        assert_eq!(inline("1 < 2"), r#"("1 < 2")"#);
    }
}
