//! Bullet and ordered lists.
//!
//! A matched marker opens a list item, wrapped in a new list unless the
//! enclosing list uses the same kind of marker. Item content is indented to
//! the column just past the marker and its following spaces; when the marker
//! is followed by five or more spaces, or nothing at all, the content column
//! is one space past the marker.

use super::{
    BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus, BuildContext,
    LIST_ITEM_PRECEDENCE, MatchContext, append_children,
};
use crate::ast::{List, ListKind, NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::{CODE_INDENT, Line, is_space_or_tab};

/// Ordered list numbers have at most nine digits.
const MAX_ORDINAL_DIGITS: usize = 9;

/// Where item content starts, relative to the line's indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContentIndent {
    pub marker_offset: usize,
    pub padding: usize,
}

impl ContentIndent {
    pub fn width(&self) -> usize {
        self.marker_offset + self.padding
    }
}

/// Consume the spaces after a marker of `marker_width` bytes the cursor sits
/// just past, and report the content indentation.
pub(crate) fn consume_padding(line: &mut Line<'_>, marker_offset: usize, marker_width: usize) -> ContentIndent {
    let start_column = line.column();
    let saved = *line;
    loop {
        line.advance_offset(1, true);
        if line.column() - start_column >= 5 || !line.peek().is_some_and(is_space_or_tab) {
            break;
        }
    }
    let blank_item = line.peek().is_none();
    let spaces = line.column() - start_column;
    let padding = if spaces >= 5 || spaces < 1 || blank_item {
        *line = saved;
        if line.peek().is_some_and(is_space_or_tab) {
            line.advance_offset(1, true);
        }
        marker_width + 1
    } else {
        marker_width + spaces
    };
    ContentIndent {
        marker_offset,
        padding,
    }
}

/// Continuation rule shared by list items and definitions.
pub(crate) fn continue_item(line: &mut Line<'_>, indent: ContentIndent, has_children: bool) -> BlockStatus {
    if line.is_blank() {
        if !has_children {
            return BlockStatus::NotMatched;
        }
        line.advance_next_nonspace();
    } else if line.indent() >= indent.width() {
        line.advance_offset(indent.width(), true);
    } else {
        return BlockStatus::NotMatched;
    }
    BlockStatus::Continued
}

/// Parse the list marker at the next non-space character, without moving.
fn parse_marker(line: &Line<'_>, interrupting: bool) -> Option<(ListKind, usize)> {
    let rest = line.rest_from_nonspace();
    let bytes = rest.as_bytes();
    let (kind, width) = match bytes.first()? {
        b @ (b'*' | b'+' | b'-') => (ListKind::Unordered { marker: *b as char }, 1),
        b if b.is_ascii_digit() => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            let delimiter = *bytes.get(digits)?;
            if digits > MAX_ORDINAL_DIGITS || !matches!(delimiter, b'.' | b')') {
                return None;
            }
            let start: u32 = rest[..digits].parse().ok()?;
            if interrupting && start != 1 {
                return None;
            }
            (
                ListKind::Ordered {
                    start,
                    delimiter: delimiter as char,
                },
                digits + 1,
            )
        }
        _ => return None,
    };
    if bytes.get(width).is_some_and(|&b| !is_space_or_tab(b)) {
        return None;
    }
    if interrupting && rest[width..].bytes().all(is_space_or_tab) {
        return None;
    }
    Some((kind, width))
}

fn same_marker(a: &ListKind, b: &ListKind) -> bool {
    match (a, b) {
        (ListKind::Unordered { marker: x }, ListKind::Unordered { marker: y }) => x == y,
        (ListKind::Ordered { delimiter: x, .. }, ListKind::Ordered { delimiter: y, .. }) => x == y,
        _ => false,
    }
}

/// Consume a list marker and its padding.
fn parse_item(line: &mut Line<'_>, interrupting: bool) -> Option<(ListKind, ContentIndent)> {
    let marker_offset = line.indent();
    if marker_offset >= CODE_INDENT {
        return None;
    }
    let (kind, width) = parse_marker(line, interrupting)?;
    line.advance_next_nonspace();
    line.advance_offset(width, true);
    Some((kind, consume_padding(line, marker_offset, width)))
}

pub struct ListItemMatcher;

impl ListItemMatcher {
    fn start(&self, line: &mut Line<'_>, interrupting: bool) -> Option<BlockStart> {
        let (kind, indent) = parse_item(line, interrupting)?;
        Some(BlockStart {
            builder: Box::new(ListItemBuilder { indent }),
            wrapper: Some(Box::new(ListBuilder { kind, tight: true })),
        })
    }
}

impl BlockMatcher for ListItemMatcher {
    fn precedence(&self) -> u32 {
        LIST_ITEM_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        self.start(line, false)
    }

    fn new_interrupting_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        self.start(line, true)
    }
}

pub struct ListBuilder {
    kind: ListKind,
    tight: bool,
}

impl BlockBuilder for ListBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::List
    }

    fn process_line(&mut self, _line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        BlockStatus::Continued
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, kind: BlockKind) -> bool {
        kind == BlockKind::ListItem
    }

    fn mark_loose(&mut self) {
        self.tight = false;
    }

    fn list_kind(&self) -> Option<ListKind> {
        Some(self.kind)
    }

    fn same_container(&self, other: &dyn BlockBuilder) -> bool {
        other
            .list_kind()
            .is_some_and(|kind| same_marker(&self.kind, &kind))
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        let node = tree.create(NodeValue::List(List::new(self.kind, self.tight)))?;
        append_children(tree, node, children)?;
        Ok(Some(node))
    }
}

pub struct ListItemBuilder {
    indent: ContentIndent,
}

impl BlockBuilder for ListItemBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::ListItem
    }

    fn process_line(&mut self, line: &mut Line<'_>, has_children: bool) -> BlockStatus {
        continue_item(line, self.indent, has_children)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, kind: BlockKind) -> bool {
        kind.is_flow()
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        let node = tree.create(NodeValue::ListItem)?;
        append_children(tree, node, children)?;
        Ok(Some(node))
    }
}
