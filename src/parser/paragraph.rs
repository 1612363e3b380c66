use super::link_ref_def::parse_reference;
use super::{
    BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus, BuildContext, MatchContext,
    PARAGRAPH_PRECEDENCE, build_inline_leaf,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::Line;
use crate::refs::LinkDefinitionMap;

/// Catch-all for non-blank lines no other matcher claimed.
pub struct ParagraphMatcher;

impl BlockMatcher for ParagraphMatcher {
    fn precedence(&self) -> u32 {
        PARAGRAPH_PRECEDENCE
    }

    fn new_builder(&self, line: &mut Line<'_>, ctx: &MatchContext) -> Option<BlockStart> {
        // A pending unmatched paragraph takes the line as a lazy continuation
        if line.is_blank() || ctx.lazy_paragraph() {
            return None;
        }
        line.advance_next_nonspace();
        Some(BlockStart::of(ParagraphBuilder::default()))
    }
}

#[derive(Debug, Default)]
pub struct ParagraphBuilder {
    content: String,
    lines: usize,
}

impl ParagraphBuilder {
    pub fn from_text(text: &str) -> Self {
        ParagraphBuilder {
            content: text.to_string(),
            lines: text.lines().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn take_content(&mut self) -> String {
        self.lines = 0;
        std::mem::take(&mut self.content)
    }

    /// Parse link reference definitions from the front of the content into
    /// `refs`, leaving the rest.
    pub fn take_reference_definitions(&mut self, refs: &mut LinkDefinitionMap) {
        let mut consumed = 0;
        while self.content[consumed..].starts_with('[') {
            match parse_reference(&self.content[consumed..], refs) {
                Some(len) => consumed += len,
                None => break,
            }
        }
        if consumed > 0 {
            self.content.drain(..consumed);
            self.lines = self.content.lines().count();
        }
    }
}

impl BlockBuilder for ParagraphBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::Paragraph
    }

    fn process_line(&mut self, line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        if line.is_blank() {
            BlockStatus::NotMatched
        } else {
            BlockStatus::Continued
        }
    }

    fn accepts_lines(&self) -> bool {
        true
    }

    fn add_line(&mut self, line: &Line<'_>) {
        if self.lines > 0 {
            self.content.push('\n');
        }
        self.content.push_str(line.rest_from_nonspace());
        self.lines += 1;
    }

    fn is_interruptible(&self) -> bool {
        true
    }

    fn as_paragraph_mut(&mut self) -> Option<&mut ParagraphBuilder> {
        Some(self)
    }

    fn build(
        mut self: Box<Self>,
        tree: &mut Tree,
        ctx: &mut BuildContext<'_>,
        _children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        self.take_reference_definitions(ctx.refs);
        if self.content.trim().is_empty() {
            return Ok(None);
        }
        build_inline_leaf(tree, ctx, NodeValue::Paragraph, &self.content).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_joined_without_indentation() {
        let mut paragraph = ParagraphBuilder::default();
        paragraph.add_line(&Line::new("  one"));
        paragraph.add_line(&Line::new("\ttwo"));
        assert_eq!(paragraph.content(), "one\ntwo");
    }

    #[test]
    fn test_leading_definitions_are_removed() {
        let mut refs = LinkDefinitionMap::new();
        let mut paragraph = ParagraphBuilder::from_text("[a]: /a\n[b]: /b 'B'\nrest [a]");
        paragraph.take_reference_definitions(&mut refs);
        assert_eq!(paragraph.content(), "rest [a]");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs.get("B").and_then(|d| d.title.as_deref()), Some("B"));
    }

    #[test]
    fn test_stops_at_first_invalid_definition() {
        let mut refs = LinkDefinitionMap::new();
        let mut paragraph = ParagraphBuilder::from_text("[a]: /a\n[b]\n[c]: /c");
        paragraph.take_reference_definitions(&mut refs);
        assert_eq!(paragraph.content(), "[b]\n[c]: /c");
        assert!(refs.get("c").is_none());
    }
}
