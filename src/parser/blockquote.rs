use super::{
    BLOCK_QUOTE_PRECEDENCE, BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus,
    BuildContext, MatchContext, append_children,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::{CODE_INDENT, Line, is_space_or_tab};

/// Consume `>` and one optional following space. The marker may be indented
/// up to three columns.
fn consume_marker(line: &mut Line<'_>) -> bool {
    if line.indent() >= CODE_INDENT || line.peek_nonspace() != Some(b'>') {
        return false;
    }
    line.advance_next_nonspace();
    line.advance_offset(1, false);
    if line.peek().is_some_and(is_space_or_tab) {
        line.advance_offset(1, true);
    }
    true
}

pub struct BlockQuoteMatcher;

impl BlockMatcher for BlockQuoteMatcher {
    fn precedence(&self) -> u32 {
        BLOCK_QUOTE_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        consume_marker(line).then(|| BlockStart::of(BlockQuoteBuilder))
    }
}

pub struct BlockQuoteBuilder;

impl BlockBuilder for BlockQuoteBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::BlockQuote
    }

    fn process_line(&mut self, line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        if consume_marker(line) {
            BlockStatus::Continued
        } else {
            BlockStatus::NotMatched
        }
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
        let node = tree.create(NodeValue::BlockQuote)?;
        append_children(tree, node, children)?;
        Ok(Some(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_consumes_one_space() {
        let mut line = Line::new("   >  a");
        assert!(consume_marker(&mut line));
        assert_eq!(line.rest(), " a");
    }

    #[test]
    fn test_marker_with_tab_keeps_remaining_columns() {
        let mut line = Line::new(">\t\tcode");
        assert!(consume_marker(&mut line));
        assert_eq!(line.content(), "  \tcode");
    }

    #[test]
    fn test_indented_marker_is_not_a_quote() {
        let mut line = Line::new("    > a");
        assert!(!consume_marker(&mut line));
        assert_eq!(line.offset(), 0);
    }
}
