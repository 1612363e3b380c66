//! Definition lists:
//!
//! ```text
//! Term
//! : First definition
//! : Second definition
//! ```
//!
//! A `:` line under a one-line paragraph turns that paragraph into a term and
//! opens the list. While the list is open, further `:` lines add definitions.

use super::list::{ContentIndent, consume_padding, continue_item};
use super::paragraph::ParagraphBuilder;
use super::{
    BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus, BuildContext,
    DEFINITION_PRECEDENCE, MatchContext, Replacement, append_children, build_inline_leaf,
};
use crate::ast::{List, ListKind, NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::{CODE_INDENT, Line, is_space_or_tab};
use crate::refs::LinkDefinitionMap;

/// Consume a `:` marker and its padding.
fn parse_marker(line: &mut Line<'_>) -> Option<ContentIndent> {
    let marker_offset = line.indent();
    if marker_offset >= CODE_INDENT || line.peek_nonspace() != Some(b':') {
        return None;
    }
    let (index, _) = line.next_nonspace();
    if !line.byte_at(index + 1).is_some_and(is_space_or_tab) {
        return None;
    }
    line.advance_next_nonspace();
    line.advance_offset(1, true);
    Some(consume_padding(line, marker_offset, 1))
}

pub struct DefinitionMatcher;

impl BlockMatcher for DefinitionMatcher {
    fn precedence(&self) -> u32 {
        DEFINITION_PRECEDENCE
    }

    fn types_to_replace(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, ctx: &MatchContext) -> Option<BlockStart> {
        if ctx.container != BlockKind::DefinitionList {
            return None;
        }
        let indent = parse_marker(line)?;
        Some(BlockStart::of(DefinitionBuilder { indent }))
    }

    fn replace(
        &self,
        line: &mut Line<'_>,
        paragraph: &mut ParagraphBuilder,
        refs: &mut LinkDefinitionMap,
    ) -> Option<Replacement> {
        let mut lookahead = *line;
        let indent = parse_marker(&mut lookahead)?;
        paragraph.take_reference_definitions(refs);
        if paragraph.is_empty() || paragraph.content().contains('\n') {
            return None;
        }
        *line = lookahead;
        log::trace!("paragraph becomes a definition term");
        Some(Replacement::Nest {
            container: Box::new(DefinitionListBuilder { tight: true }),
            first: Box::new(TermBuilder {
                content: paragraph.take_content(),
            }),
            next: Box::new(DefinitionBuilder { indent }),
        })
    }
}

pub struct DefinitionListBuilder {
    tight: bool,
}

impl BlockBuilder for DefinitionListBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::DefinitionList
    }

    fn process_line(&mut self, _line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        BlockStatus::Continued
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, kind: BlockKind) -> bool {
        matches!(kind, BlockKind::Term | BlockKind::Definition)
    }

    fn mark_loose(&mut self) {
        self.tight = false;
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        let list = List::new(ListKind::Definition, self.tight);
        let node = tree.create(NodeValue::List(list))?;
        append_children(tree, node, children)?;
        Ok(Some(node))
    }
}

pub struct TermBuilder {
    content: String,
}

impl BlockBuilder for TermBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::Term
    }

    fn process_line(&mut self, _line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        BlockStatus::NotMatched
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        ctx: &mut BuildContext<'_>,
        _children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        build_inline_leaf(tree, ctx, NodeValue::Term, &self.content).map(Some)
    }
}

pub struct DefinitionBuilder {
    indent: ContentIndent,
}

impl BlockBuilder for DefinitionBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::Definition
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
        let node = tree.create(NodeValue::Definition)?;
        append_children(tree, node, children)?;
        Ok(Some(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_needs_following_space() {
        let mut line = Line::new(":   body");
        let indent = parse_marker(&mut line).unwrap();
        assert_eq!(indent.width(), 4);
        assert_eq!(line.rest(), "body");
        assert!(parse_marker(&mut Line::new(":body")).is_none());
        assert!(parse_marker(&mut Line::new("    : body")).is_none());
    }

    #[test]
    fn test_replacement_requires_single_line_term() {
        let mut refs = LinkDefinitionMap::new();
        let mut line = Line::new(": def");
        let mut paragraph = ParagraphBuilder::from_text("one\ntwo");
        assert!(
            DefinitionMatcher
                .replace(&mut line, &mut paragraph, &mut refs)
                .is_none()
        );
        assert_eq!(line.offset(), 0);

        let mut paragraph = ParagraphBuilder::from_text("[r]: /r\nTerm");
        assert!(
            DefinitionMatcher
                .replace(&mut line, &mut paragraph, &mut refs)
                .is_some()
        );
        assert_eq!(line.rest(), "def");
        assert!(refs.get("r").is_some());
    }

    #[test]
    fn test_new_definitions_only_inside_a_list() {
        let ctx = |container| MatchContext {
            container,
            tip: container,
            all_closed: true,
        };
        let matcher = DefinitionMatcher;
        assert!(
            matcher
                .new_builder(&mut Line::new(": x"), &ctx(BlockKind::Document))
                .is_none()
        );
        assert!(
            matcher
                .new_builder(&mut Line::new(": x"), &ctx(BlockKind::DefinitionList))
                .is_some()
        );
    }
}
