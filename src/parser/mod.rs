//! Block-structure parser.
//!
//! Lines are fed one at a time. Each open block is represented by a
//! [`BlockBuilder`] on a stack that mirrors the nesting of the final tree.
//! A line first walks the open stack asking every builder whether it
//! continues; the [`BlockMatcher`]s are then tried in precedence order to
//! open new blocks, replace an open paragraph, or interrupt it. Builders turn
//! into nodes when they close, and paragraph-like leaves register their raw
//! text for the inline pass that runs once the whole input is consumed.

pub mod admonition;
pub mod blockquote;
pub mod code;
pub mod definition;
pub mod document;
pub mod heading;
pub mod html_block;
pub mod link_ref_def;
pub mod list;
pub mod paragraph;
pub mod thematic_break;

use crate::ast::{List, ListKind, NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::inline::{InlineHandlers, parse_inlines};
use crate::input::Line;
use crate::refs::LinkDefinitionMap;
use document::DocumentBuilder;
use paragraph::ParagraphBuilder;

pub const BLOCK_QUOTE_PRECEDENCE: u32 = 10;
pub const ATX_HEADING_PRECEDENCE: u32 = 20;
pub const FENCED_CODE_PRECEDENCE: u32 = 30;
pub const HTML_BLOCK_PRECEDENCE: u32 = 40;
pub const ADMONITION_PRECEDENCE: u32 = 45;
pub const SETEXT_HEADING_PRECEDENCE: u32 = 50;
pub const THEMATIC_BREAK_PRECEDENCE: u32 = 60;
pub const LIST_ITEM_PRECEDENCE: u32 = 70;
pub const DEFINITION_PRECEDENCE: u32 = 75;
pub const INDENTED_CODE_PRECEDENCE: u32 = 80;
pub const PARAGRAPH_PRECEDENCE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Document,
    BlockQuote,
    List,
    ListItem,
    Heading,
    ThematicBreak,
    FencedCode,
    IndentedCode,
    HtmlBlock,
    Paragraph,
    Admonition,
    DefinitionList,
    Term,
    Definition,
}

impl BlockKind {
    /// Blocks that may appear directly in documents, quotes, items and the like.
    pub fn is_flow(self) -> bool {
        !matches!(
            self,
            BlockKind::ListItem | BlockKind::Term | BlockKind::Definition
        )
    }
}

/// Outcome of offering a line to an open block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// The line belongs to the block, which stays open.
    Continued,
    /// The line belongs to the block and finishes it.
    Completed,
    /// The line does not belong to the block.
    NotMatched,
    /// A new block started on this line and ended this one.
    Interrupted,
    /// The block was reinterpreted as a different block type.
    Replaced,
}

/// What the matchers can see of the open stack.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext {
    /// Deepest open block that accepted the current line.
    pub container: BlockKind,
    /// Innermost open block, which may lie beyond `container`.
    pub tip: BlockKind,
    /// No open block beyond `container` is waiting to be closed.
    pub all_closed: bool,
}

impl MatchContext {
    /// An unmatched paragraph that the line would lazily continue.
    pub fn lazy_paragraph(&self) -> bool {
        !self.all_closed && self.tip == BlockKind::Paragraph
    }
}

/// A block opened by a matcher. `wrapper`, when set, is the list-like container
/// to open around `builder` unless a compatible one is already open.
pub struct BlockStart {
    pub builder: Box<dyn BlockBuilder>,
    pub wrapper: Option<Box<dyn BlockBuilder>>,
}

impl BlockStart {
    pub fn of(builder: impl BlockBuilder + 'static) -> Self {
        BlockStart {
            builder: Box::new(builder),
            wrapper: None,
        }
    }
}

/// How a matcher reinterprets an open paragraph.
pub enum Replacement {
    /// The paragraph becomes this block.
    Become(Box<dyn BlockBuilder>),
    /// The paragraph becomes `first` inside a new `container`, and `next` opens after it.
    Nest {
        container: Box<dyn BlockBuilder>,
        first: Box<dyn BlockBuilder>,
        next: Box<dyn BlockBuilder>,
    },
}

/// Shared state handed to builders when they turn into nodes.
pub struct BuildContext<'a> {
    pub refs: &'a mut LinkDefinitionMap,
    /// Raw text nodes awaiting inline parsing.
    pub pending_inlines: &'a mut Vec<NodeId>,
}

/// Recognises the start of one block type.
pub trait BlockMatcher: Send + Sync {
    fn precedence(&self) -> u32;

    /// Open block types this matcher may end without a blank line.
    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[]
    }

    /// Open block types this matcher may reinterpret in place.
    fn types_to_replace(&self) -> &'static [BlockKind] {
        &[]
    }

    /// Try to open a block at the cursor. The cursor may only move on success.
    fn new_builder(&self, line: &mut Line<'_>, ctx: &MatchContext) -> Option<BlockStart>;

    /// Like [`BlockMatcher::new_builder`], when the line would otherwise continue
    /// an open block listed in [`BlockMatcher::types_to_interrupt`].
    fn new_interrupting_builder(
        &self,
        line: &mut Line<'_>,
        ctx: &MatchContext,
    ) -> Option<BlockStart> {
        self.new_builder(line, ctx)
    }

    fn replace(
        &self,
        _line: &mut Line<'_>,
        _paragraph: &mut ParagraphBuilder,
        _refs: &mut LinkDefinitionMap,
    ) -> Option<Replacement> {
        None
    }
}

/// State of one open block.
pub trait BlockBuilder {
    fn kind(&self) -> BlockKind;

    /// Decide whether the line continues this block, consuming any markers.
    fn process_line(&mut self, line: &mut Line<'_>, has_children: bool) -> BlockStatus;

    fn is_container(&self) -> bool {
        false
    }

    fn can_contain(&self, _kind: BlockKind) -> bool {
        false
    }

    fn accepts_lines(&self) -> bool {
        false
    }

    fn add_line(&mut self, _line: &Line<'_>) {}

    /// A leaf whose end condition was met by the last added line.
    fn is_finished(&self) -> bool {
        false
    }

    /// Whether other blocks may interrupt or replace this one.
    fn is_interruptible(&self) -> bool {
        false
    }

    fn mark_loose(&mut self) {}

    /// Whether a freshly matched list-like wrapper belongs to this open container.
    fn same_container(&self, _other: &dyn BlockBuilder) -> bool {
        false
    }

    fn list_kind(&self) -> Option<ListKind> {
        None
    }

    fn as_paragraph_mut(&mut self) -> Option<&mut ParagraphBuilder> {
        None
    }

    /// Turn the block into a node owning `children`. `None` drops the block.
    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        ctx: &mut BuildContext<'_>,
        children: Vec<NodeId>,
    ) -> Result<Option<NodeId>>;
}

pub(crate) fn append_children(tree: &mut Tree, node: NodeId, children: Vec<NodeId>) -> Result<()> {
    for child in children {
        tree.append_child(node, child)?;
    }
    Ok(())
}

/// Create a node whose content is parsed as inlines after block parsing.
pub(crate) fn build_inline_leaf(
    tree: &mut Tree,
    ctx: &mut BuildContext<'_>,
    value: NodeValue,
    content: &str,
) -> Result<NodeId> {
    let node = tree.create(value)?;
    if !content.is_empty() {
        let text = tree.create(NodeValue::text(content))?;
        tree.append_child(node, text)?;
        ctx.pending_inlines.push(text);
    }
    Ok(node)
}

/// `s` without its trailing run of newlines and space-only lines.
pub(crate) fn strip_trailing_blank_lines(s: &str) -> &str {
    let mut end = s.len();
    loop {
        let trimmed = s[..end].trim_end_matches(' ');
        if !trimmed.ends_with('\n') {
            return &s[..end];
        }
        end = trimmed.len() - 1;
    }
}

struct OpenBlock {
    builder: Box<dyn BlockBuilder>,
    children: Vec<NodeId>,
    child_count: usize,
    last_line_blank: bool,
    start_line: usize,
}

impl OpenBlock {
    fn new(builder: Box<dyn BlockBuilder>, start_line: usize) -> Self {
        OpenBlock {
            builder,
            children: Vec::new(),
            child_count: 0,
            last_line_blank: false,
            start_line,
        }
    }

    fn kind(&self) -> BlockKind {
        self.builder.kind()
    }
}

enum Found {
    Start(BlockStart),
    Replace(Replacement),
}

/// Parser state for a single document.
pub struct BlockParser<'p> {
    matchers: &'p [Box<dyn BlockMatcher>],
    handlers: &'p InlineHandlers,
    tree: Tree,
    refs: LinkDefinitionMap,
    open: Vec<OpenBlock>,
    pending_inlines: Vec<NodeId>,
    line_number: usize,
}

impl<'p> BlockParser<'p> {
    /// `matchers` must be sorted by precedence.
    pub fn new(matchers: &'p [Box<dyn BlockMatcher>], handlers: &'p InlineHandlers) -> Self {
        BlockParser {
            matchers,
            handlers,
            tree: Tree::new(),
            refs: LinkDefinitionMap::new(),
            open: vec![OpenBlock::new(Box::new(DocumentBuilder), 0)],
            pending_inlines: Vec::new(),
            line_number: 0,
        }
    }

    fn top(&self) -> usize {
        self.open.len() - 1
    }

    /// Process one line of input, without its line terminator.
    pub fn add_line(&mut self, text: &str) -> Result<()> {
        self.line_number += 1;
        log::trace!("line {}: {text:?}", self.line_number);
        let mut line = Line::new(text);

        // Continuation of the open blocks
        let mut matched = 0;
        for index in 1..self.open.len() {
            let has_children = self.open[index].child_count > 0;
            match self.open[index]
                .builder
                .process_line(&mut line, has_children)
            {
                BlockStatus::Continued => matched = index,
                BlockStatus::Completed => {
                    self.close_to(index - 1, BlockStatus::Completed)?;
                    return Ok(());
                }
                _ => break,
            }
        }

        // New block starts
        let mut container = matched;
        // Measured before a leaf start consumes the rest of the line
        let mut blank = line.is_blank();
        while !self.open[container].builder.accepts_lines()
            || self.open[container].builder.is_interruptible()
        {
            blank = line.is_blank();
            let ctx = MatchContext {
                container: self.open[container].kind(),
                tip: self.open[self.top()].kind(),
                all_closed: container == self.top(),
            };
            let Some(found) = self.find_start(&mut line, container, &ctx) else {
                line.advance_next_nonspace();
                break;
            };
            container = match found {
                Found::Start(start) => self.open_start(container, start)?,
                Found::Replace(replacement) => self.apply_replacement(container, replacement)?,
            };
            if !self.open[container].builder.is_container() {
                break;
            }
        }

        let top = self.top();
        if container != top && !blank && self.open[top].builder.is_interruptible() {
            log::trace!("lazy continuation of paragraph");
            self.open[top].builder.add_line(&line);
            return Ok(());
        }

        self.close_to(container, BlockStatus::NotMatched)?;
        let block = &self.open[container];
        let last_line_blank = blank
            && !matches!(block.kind(), BlockKind::BlockQuote | BlockKind::FencedCode)
            && !(matches!(block.kind(), BlockKind::ListItem | BlockKind::Definition)
                && block.child_count == 0
                && block.start_line == self.line_number);
        for open in &mut self.open {
            open.last_line_blank = last_line_blank;
        }

        if self.open[container].builder.accepts_lines() {
            self.open[container].builder.add_line(&line);
            if self.open[container].builder.is_finished() {
                self.close_to(container - 1, BlockStatus::Completed)?;
            }
        }
        Ok(())
    }

    fn find_start(
        &mut self,
        line: &mut Line<'_>,
        container: usize,
        ctx: &MatchContext,
    ) -> Option<Found> {
        let matchers = self.matchers;
        let open = &mut self.open[container];
        let interruptible = open.builder.is_interruptible();
        for matcher in matchers {
            if !interruptible {
                if let Some(start) = matcher.new_builder(line, ctx) {
                    return Some(Found::Start(start));
                }
                continue;
            }
            if matcher.types_to_replace().contains(&ctx.container)
                && let Some(paragraph) = open.builder.as_paragraph_mut()
                && let Some(replacement) = matcher.replace(line, paragraph, &mut self.refs)
            {
                return Some(Found::Replace(replacement));
            }
            if matcher.types_to_interrupt().contains(&ctx.container)
                && let Some(start) = matcher.new_interrupting_builder(line, ctx)
            {
                return Some(Found::Start(start));
            }
        }
        None
    }

    fn open_start(&mut self, container: usize, start: BlockStart) -> Result<usize> {
        self.close_to(container, BlockStatus::NotMatched)?;
        if let Some(wrapper) = start.wrapper {
            let reuse = self.open[container].kind() == wrapper.kind()
                && self.open[container].builder.same_container(wrapper.as_ref());
            if !reuse {
                self.attach(wrapper)?;
            }
        }
        self.attach(start.builder)
    }

    fn apply_replacement(&mut self, container: usize, replacement: Replacement) -> Result<usize> {
        self.close_to(container, BlockStatus::NotMatched)?;
        // The paragraph's content now lives in the replacement builders
        let replaced = self.open.pop();
        if let Some(replaced) = &replaced {
            log::debug!(
                "{:?} from line {}: {:?}",
                replaced.kind(),
                replaced.start_line,
                BlockStatus::Replaced
            );
        }
        match replacement {
            Replacement::Become(builder) => {
                self.open.push(OpenBlock::new(builder, self.line_number));
            }
            Replacement::Nest {
                container,
                first,
                next,
            } => {
                self.open.push(OpenBlock::new(container, self.line_number));
                self.push_child(first);
                self.close_top(BlockStatus::Completed)?;
                self.push_child(next);
            }
        }
        Ok(self.top())
    }

    /// Close blocks until the innermost one can hold `builder`, then open it there.
    fn attach(&mut self, builder: Box<dyn BlockBuilder>) -> Result<usize> {
        let kind = builder.kind();
        while !self.open[self.top()].builder.can_contain(kind) {
            self.close_top(BlockStatus::Interrupted)?;
        }
        let parent = self.top();
        if self.open[parent].child_count > 0 && self.open[parent].last_line_blank {
            // A blank line between two children loosens the enclosing list
            let list = match self.open[parent].kind() {
                BlockKind::ListItem | BlockKind::Definition if parent > 0 => parent - 1,
                _ => parent,
            };
            self.open[list].builder.mark_loose();
        }
        log::debug!("open {kind:?} at line {}", self.line_number);
        self.push_child(builder);
        Ok(self.top())
    }

    fn push_child(&mut self, builder: Box<dyn BlockBuilder>) {
        let top = self.top();
        self.open[top].child_count += 1;
        self.open.push(OpenBlock::new(builder, self.line_number));
    }

    fn close_to(&mut self, index: usize, status: BlockStatus) -> Result<()> {
        while self.top() > index {
            self.close_top(status)?;
        }
        Ok(())
    }

    fn close_top(&mut self, status: BlockStatus) -> Result<()> {
        if self.open.len() < 2 {
            return Ok(());
        }
        let Some(block) = self.open.pop() else {
            return Ok(());
        };
        log::debug!(
            "close {:?} from line {} ({status:?})",
            block.kind(),
            block.start_line
        );
        let kind = block.kind();
        let mut ctx = BuildContext {
            refs: &mut self.refs,
            pending_inlines: &mut self.pending_inlines,
        };
        let built = block.builder.build(&mut self.tree, &mut ctx, block.children)?;
        let top = self.top();
        let parent = &mut self.open[top];
        let Some(node) = built else {
            parent.child_count = parent.child_count.saturating_sub(1);
            return Ok(());
        };

        if kind == BlockKind::DefinitionList
            && let Some(&previous) = parent.children.last()
            && matches!(
                self.tree[previous],
                NodeValue::List(List {
                    kind: ListKind::Definition,
                    ..
                })
            )
        {
            // Definition lists separated only by blank lines form one loose list
            let items: Vec<_> = self.tree.children(node).collect();
            append_children(&mut self.tree, previous, items)?;
            self.tree.set_value(
                previous,
                NodeValue::List(List::new(ListKind::Definition, false)),
            )?;
            parent.child_count = parent.child_count.saturating_sub(1);
            return Ok(());
        }
        parent.children.push(node);
        Ok(())
    }

    /// Close every open block and run the inline pass.
    pub fn finish(mut self) -> Result<Tree> {
        self.close_to(0, BlockStatus::NotMatched)?;
        if let Some(document) = self.open.pop() {
            let mut ctx = BuildContext {
                refs: &mut self.refs,
                pending_inlines: &mut self.pending_inlines,
            };
            document
                .builder
                .build(&mut self.tree, &mut ctx, document.children)?;
        }
        log::debug!(
            "block pass done: {} lines, {} link definitions, {} inline runs",
            self.line_number,
            self.refs.len(),
            self.pending_inlines.len()
        );
        for text in std::mem::take(&mut self.pending_inlines) {
            parse_inlines(&mut self.tree, &self.refs, self.handlers, text)?;
        }
        Ok(self.tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::standard_handlers;

    fn matchers() -> Vec<Box<dyn BlockMatcher>> {
        let mut matchers: Vec<Box<dyn BlockMatcher>> = vec![
            Box::new(blockquote::BlockQuoteMatcher),
            Box::new(heading::AtxHeadingMatcher),
            Box::new(code::FencedCodeMatcher),
            Box::new(html_block::HtmlBlockMatcher),
            Box::new(admonition::AdmonitionMatcher),
            Box::new(heading::SetextHeadingMatcher),
            Box::new(thematic_break::ThematicBreakMatcher),
            Box::new(list::ListItemMatcher),
            Box::new(definition::DefinitionMatcher),
            Box::new(code::IndentedCodeMatcher),
            Box::new(paragraph::ParagraphMatcher),
        ];
        matchers.sort_by_key(|m| m.precedence());
        matchers
    }

    fn parse(input: &str) -> Tree {
        let matchers = matchers();
        let handlers = InlineHandlers::new(standard_handlers(true, true));
        let mut parser = BlockParser::new(&matchers, &handlers);
        for line in input.split('\n') {
            parser.add_line(line).unwrap();
        }
        parser.finish().unwrap()
    }

    /// Block skeleton: kinds nested with parentheses, inline content elided.
    fn skeleton(tree: &Tree, node: NodeId) -> String {
        let name = match &tree[node] {
            NodeValue::Document => "doc".to_string(),
            NodeValue::BlockQuote => "quote".to_string(),
            NodeValue::Heading { level } => format!("h{level}"),
            NodeValue::Paragraph => "p".to_string(),
            NodeValue::List(list) => match list.kind {
                ListKind::Definition => format!("dl{}", if list.is_tight() { "" } else { "*" }),
                ListKind::Ordered { start, .. } => {
                    format!("ol{start}{}", if list.is_tight() { "" } else { "*" })
                }
                ListKind::Unordered { .. } => {
                    format!("ul{}", if list.is_tight() { "" } else { "*" })
                }
            },
            NodeValue::ListItem => "li".to_string(),
            NodeValue::Term => "dt".to_string(),
            NodeValue::Definition => "dd".to_string(),
            NodeValue::Admonition { kind, .. } => format!("!{kind}"),
            NodeValue::CodeBlock { .. } => "code".to_string(),
            NodeValue::HtmlBlock { .. } => "html".to_string(),
            NodeValue::ThematicBreak => "hr".to_string(),
            _ => return String::new(),
        };
        let children: Vec<_> = tree
            .children(node)
            .map(|child| skeleton(tree, child))
            .filter(|s| !s.is_empty())
            .collect();
        if children.is_empty() {
            name
        } else {
            format!("{name}({})", children.join(" "))
        }
    }

    fn shape(input: &str) -> String {
        let tree = parse(input);
        skeleton(&tree, tree.root())
    }

    #[test]
    fn test_nested_containers() {
        assert_eq!(shape("> - a\n>   - b"), "doc(quote(ul(li(p ul(li(p))))))");
        assert_eq!(shape("> a\nlazy"), "doc(quote(p))");
    }

    #[test]
    fn test_interruptions() {
        assert_eq!(shape("a\n***\nb"), "doc(p hr p)");
        assert_eq!(shape("a\n# h"), "doc(p h1)");
        assert_eq!(shape("a\n    not code"), "doc(p)");
        assert_eq!(shape("a\n2. no"), "doc(p)");
        assert_eq!(shape("a\n1. yes"), "doc(p ol1(li(p)))");
        assert_eq!(shape("a\n-"), "doc(h2)");
    }

    #[test]
    fn test_list_tightness() {
        assert_eq!(shape("- a\n- b"), "doc(ul(li(p) li(p)))");
        assert_eq!(shape("- a\n\n- b"), "doc(ul*(li(p) li(p)))");
        assert_eq!(shape("- a\n- b\n\n  c"), "doc(ul*(li(p) li(p p)))");
        assert_eq!(shape("- a\n  - b\n\n    c\n- d"), "doc(ul(li(p ul*(li(p p))) li(p)))");
        assert_eq!(shape("- a\n- b\n\n"), "doc(ul(li(p) li(p)))");
        assert_eq!(shape("- a\n+ b"), "doc(ul(li(p)) ul(li(p)))");
        assert_eq!(shape("- # Foo\n  bar"), "doc(ul(li(h1 p)))");
        assert_eq!(shape("- a\n  ***\n  b"), "doc(ul(li(p hr p)))");
        assert_eq!(shape("- ```\n  x\n  ```\n- b"), "doc(ul(li(code) li(p)))");
        assert_eq!(shape("Term\n: # h\n  c"), "doc(dl(dt dd(h1 p)))");
    }

    #[test]
    fn test_code_blocks() {
        assert_eq!(shape("```\na\n\nb\n```\nc"), "doc(code p)");
        assert_eq!(shape("    a\n\n    b\nc"), "doc(code p)");
    }

    #[test]
    fn test_reference_only_paragraph_is_dropped() {
        let tree = parse("[a]: /u\n\n[a]");
        assert_eq!(skeleton(&tree, tree.root()), "doc(p)");
        let para = tree.first_child(tree.root()).unwrap();
        let link = tree.first_child(para).unwrap();
        assert!(matches!(&tree[link], NodeValue::Link { destination, .. } if destination == "/u"));
    }

    #[test]
    fn test_definition_lists() {
        assert_eq!(shape("Term\n: one\n: two"), "doc(dl(dt dd(p) dd(p)))");
        assert_eq!(shape("Term\n: one\n\n: two"), "doc(dl*(dt dd(p) dd(p)))");
        assert_eq!(shape("A\n: one\n\nB\n: two"), "doc(dl*(dt dd(p) dt dd(p)))");
        assert_eq!(shape("A\nB\n: one"), "doc(p)");
    }

    #[test]
    fn test_admonitions() {
        assert_eq!(shape("!!! note\n    body\nlazy"), "doc(!note(p))");
        assert_eq!(shape("!!! note\n    body\n\n    more\n\nafter"), "doc(!note(p p) p)");
        assert_eq!(shape("para\n!!! tip \"T\"\n    x"), "doc(p !tip(p))");
    }
}
