use super::{
    BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus, BuildContext,
    FENCED_CODE_PRECEDENCE, INDENTED_CODE_PRECEDENCE, MatchContext, strip_trailing_blank_lines,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::entities::unescape;
use crate::error::Result;
use crate::input::{CODE_INDENT, Line, is_space_or_tab};

const MIN_FENCE: usize = 3;

/// Opening fence: three or more backticks or tildes. A backtick fence's info
/// string may not contain backticks.
fn opening_fence(line: &Line<'_>) -> Option<(u8, usize)> {
    if line.indent() >= CODE_INDENT {
        return None;
    }
    let rest = line.rest_from_nonspace();
    let fence_char = *rest.as_bytes().first()?;
    if fence_char != b'`' && fence_char != b'~' {
        return None;
    }
    let length = rest.bytes().take_while(|&b| b == fence_char).count();
    if length < MIN_FENCE || (fence_char == b'`' && rest[length..].contains('`')) {
        return None;
    }
    Some((fence_char, length))
}

pub struct FencedCodeMatcher;

impl BlockMatcher for FencedCodeMatcher {
    fn precedence(&self) -> u32 {
        FENCED_CODE_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        let (fence_char, fence_length) = opening_fence(line)?;
        let fence_offset = line.indent();
        line.advance_next_nonspace();
        line.advance_offset(fence_length, false);
        Some(BlockStart::of(FencedCodeBuilder {
            fence_char,
            fence_length,
            fence_offset,
            info: None,
            literal: String::new(),
        }))
    }
}

pub struct FencedCodeBuilder {
    fence_char: u8,
    fence_length: usize,
    fence_offset: usize,
    /// Set from the opening line, which is the first line added.
    info: Option<String>,
    literal: String,
}

impl FencedCodeBuilder {
    fn is_closing_fence(&self, line: &Line<'_>) -> bool {
        if line.indent() >= CODE_INDENT || line.peek_nonspace() != Some(self.fence_char) {
            return false;
        }
        let rest = line.rest_from_nonspace();
        let run = rest.bytes().take_while(|&b| b == self.fence_char).count();
        run >= self.fence_length && rest[run..].bytes().all(is_space_or_tab)
    }
}

impl BlockBuilder for FencedCodeBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::FencedCode
    }

    fn process_line(&mut self, line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        if self.is_closing_fence(line) {
            return BlockStatus::Completed;
        }
        // Strip up to the opening fence's indentation
        let mut remaining = self.fence_offset;
        while remaining > 0 && line.peek().is_some_and(is_space_or_tab) {
            line.advance_offset(1, true);
            remaining -= 1;
        }
        BlockStatus::Continued
    }

    fn accepts_lines(&self) -> bool {
        true
    }

    fn add_line(&mut self, line: &Line<'_>) {
        if self.info.is_none() {
            self.info = Some(unescape(line.rest().trim()).into_owned());
        } else {
            self.literal.push_str(&line.content());
            self.literal.push('\n');
        }
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        _children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        let info = self.info.unwrap_or_default();
        let language = info.split_whitespace().next().map(str::to_string);
        let node = tree.create(NodeValue::CodeBlock {
            info,
            language,
            literal: self.literal,
        })?;
        Ok(Some(node))
    }
}

pub struct IndentedCodeMatcher;

impl BlockMatcher for IndentedCodeMatcher {
    fn precedence(&self) -> u32 {
        INDENTED_CODE_PRECEDENCE
    }

    fn new_builder(&self, line: &mut Line<'_>, ctx: &MatchContext) -> Option<BlockStart> {
        if line.indent() < CODE_INDENT || line.is_blank() || ctx.tip == BlockKind::Paragraph {
            return None;
        }
        line.advance_offset(CODE_INDENT, true);
        Some(BlockStart::of(IndentedCodeBuilder::default()))
    }
}

#[derive(Default)]
pub struct IndentedCodeBuilder {
    literal: String,
}

impl BlockBuilder for IndentedCodeBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::IndentedCode
    }

    fn process_line(&mut self, line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        if line.indent() >= CODE_INDENT {
            line.advance_offset(CODE_INDENT, true);
        } else if line.is_blank() {
            line.advance_next_nonspace();
        } else {
            return BlockStatus::NotMatched;
        }
        BlockStatus::Continued
    }

    fn accepts_lines(&self) -> bool {
        true
    }

    fn add_line(&mut self, line: &Line<'_>) {
        self.literal.push_str(&line.content());
        self.literal.push('\n');
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        _children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        // Trailing blank lines are not part of the block
        let mut literal = strip_trailing_blank_lines(&self.literal).to_string();
        literal.push('\n');
        let node = tree.create(NodeValue::CodeBlock {
            info: String::new(),
            language: None,
            literal,
        })?;
        Ok(Some(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(builder: Box<dyn BlockBuilder>) -> NodeValue {
        let mut tree = Tree::new();
        let mut refs = crate::refs::LinkDefinitionMap::new();
        let mut pending = Vec::new();
        let mut ctx = BuildContext {
            refs: &mut refs,
            pending_inlines: &mut pending,
        };
        let node = builder.build(&mut tree, &mut ctx, Vec::new()).unwrap().unwrap();
        tree[node].clone()
    }

    #[test]
    fn test_fence_openers() {
        assert_eq!(opening_fence(&Line::new("```rust")), Some((b'`', 3)));
        assert_eq!(opening_fence(&Line::new("  ~~~~ x`y")), Some((b'~', 4)));
        assert_eq!(opening_fence(&Line::new("``` a`b")), None);
        assert_eq!(opening_fence(&Line::new("``")), None);
        assert_eq!(opening_fence(&Line::new("    ```")), None);
    }

    #[test]
    fn test_fenced_block_content() {
        let mut line = Line::new("  ``` rust  extra");
        let start = FencedCodeMatcher
            .new_builder(
                &mut line,
                &MatchContext {
                    container: BlockKind::Document,
                    tip: BlockKind::Document,
                    all_closed: true,
                },
            )
            .unwrap();
        let mut builder = start.builder;
        builder.add_line(&line);
        for text in ["   indented", "x", "  ````"] {
            let mut line = Line::new(text);
            if builder.process_line(&mut line, false) == BlockStatus::Completed {
                break;
            }
            builder.add_line(&line);
        }
        match build(builder) {
            NodeValue::CodeBlock {
                info,
                language,
                literal,
            } => {
                assert_eq!(info, "rust  extra");
                assert_eq!(language.as_deref(), Some("rust"));
                assert_eq!(literal, " indented\nx\n");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_indented_block_drops_trailing_blank_lines() {
        let mut builder: Box<dyn BlockBuilder> = Box::new(IndentedCodeBuilder::default());
        for text in ["    a", "      b", "", "    "] {
            let mut line = Line::new(text);
            assert_eq!(builder.process_line(&mut line, false), BlockStatus::Continued);
            builder.add_line(&line);
        }
        match build(builder) {
            NodeValue::CodeBlock { literal, .. } => assert_eq!(literal, "a\n  b\n"),
            other => panic!("unexpected {other:?}"),
        }

        let mut builder: Box<dyn BlockBuilder> = Box::new(IndentedCodeBuilder::default());
        builder.add_line(&Line::new("x  "));
        match build(builder) {
            NodeValue::CodeBlock { literal, .. } => assert_eq!(literal, "x  \n"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
