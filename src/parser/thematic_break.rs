use super::{
    BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus, BuildContext, MatchContext,
    THEMATIC_BREAK_PRECEDENCE,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::{CODE_INDENT, Line, is_space_or_tab};

/// Three or more of the same `*`, `-` or `_`, optionally separated by spaces or tabs.
pub fn is_thematic_break(rest: &str) -> bool {
    let Some(&marker) = rest.as_bytes().first() else {
        return false;
    };
    if !matches!(marker, b'*' | b'-' | b'_') {
        return false;
    }
    let mut count = 0;
    for b in rest.bytes() {
        if b == marker {
            count += 1;
        } else if !is_space_or_tab(b) {
            return false;
        }
    }
    count >= 3
}

pub struct ThematicBreakMatcher;

impl BlockMatcher for ThematicBreakMatcher {
    fn precedence(&self) -> u32 {
        THEMATIC_BREAK_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        if line.indent() >= CODE_INDENT || !is_thematic_break(line.rest_from_nonspace()) {
            return None;
        }
        line.advance_to_end();
        Some(BlockStart::of(ThematicBreakBuilder))
    }
}

pub struct ThematicBreakBuilder;

impl BlockBuilder for ThematicBreakBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::ThematicBreak
    }

    fn process_line(&mut self, _line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        BlockStatus::NotMatched
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        _children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        tree.create(NodeValue::ThematicBreak).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_lines() {
        assert!(is_thematic_break("***"));
        assert!(is_thematic_break("- - -"));
        assert!(is_thematic_break("_\t_ _   "));
        assert!(!is_thematic_break("**"));
        assert!(!is_thematic_break("*-*"));
        assert!(!is_thematic_break("--- a"));
        assert!(!is_thematic_break("==="));
    }
}
