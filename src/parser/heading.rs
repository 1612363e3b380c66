use super::paragraph::ParagraphBuilder;
use super::{
    ATX_HEADING_PRECEDENCE, BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus,
    BuildContext, MatchContext, Replacement, SETEXT_HEADING_PRECEDENCE, build_inline_leaf,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::{CODE_INDENT, Line, is_space_or_tab};
use crate::refs::LinkDefinitionMap;

/// Heading text with the optional closing `#` sequence removed.
fn strip_closing_sequence(content: &str) -> &str {
    let trimmed = content.trim_end_matches([' ', '\t']);
    let without_hashes = trimmed.trim_end_matches('#');
    if without_hashes.len() == trimmed.len() {
        return trimmed;
    }
    if without_hashes.is_empty() {
        return "";
    }
    // The closing sequence must be preceded by a space
    if without_hashes.ends_with([' ', '\t']) {
        without_hashes.trim_end_matches([' ', '\t'])
    } else {
        trimmed
    }
}

pub struct AtxHeadingMatcher;

impl BlockMatcher for AtxHeadingMatcher {
    fn precedence(&self) -> u32 {
        ATX_HEADING_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        if line.indent() >= CODE_INDENT {
            return None;
        }
        let (start, _) = line.next_nonspace();
        let level = line.count_run(start, b'#');
        if !(1..=6).contains(&level) {
            return None;
        }
        if line.byte_at(start + level).is_some_and(|b| !is_space_or_tab(b)) {
            return None;
        }
        line.advance_next_nonspace();
        line.advance_offset(level, false);
        let content = strip_closing_sequence(line.rest().trim_start_matches([' ', '\t']));
        let builder = HeadingBuilder::new(level as u8, content.to_string());
        line.advance_to_end();
        Some(BlockStart::of(builder))
    }
}

/// `===` or `---` under a paragraph.
pub struct SetextHeadingMatcher;

impl BlockMatcher for SetextHeadingMatcher {
    fn precedence(&self) -> u32 {
        SETEXT_HEADING_PRECEDENCE
    }

    fn types_to_replace(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, _line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        None
    }

    fn replace(
        &self,
        line: &mut Line<'_>,
        paragraph: &mut ParagraphBuilder,
        refs: &mut LinkDefinitionMap,
    ) -> Option<Replacement> {
        if line.indent() >= CODE_INDENT {
            return None;
        }
        let rest = line.rest_from_nonspace();
        let level = match rest.as_bytes().first()? {
            b'=' => 1,
            b'-' => 2,
            _ => return None,
        };
        let marker = rest.as_bytes()[0];
        let run = rest.bytes().take_while(|&b| b == marker).count();
        if !rest[run..].bytes().all(is_space_or_tab) {
            return None;
        }
        paragraph.take_reference_definitions(refs);
        if paragraph.is_empty() {
            return None;
        }
        line.advance_to_end();
        let content = paragraph.take_content();
        log::trace!("paragraph becomes a level {level} heading");
        Some(Replacement::Become(Box::new(HeadingBuilder::new(level, content))))
    }
}

pub struct HeadingBuilder {
    level: u8,
    content: String,
}

impl HeadingBuilder {
    pub fn new(level: u8, content: String) -> Self {
        HeadingBuilder { level, content }
    }
}

impl BlockBuilder for HeadingBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::Heading
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
        let value = NodeValue::heading(self.level)?;
        build_inline_leaf(tree, ctx, value, &self.content).map(Some)
    }
}
