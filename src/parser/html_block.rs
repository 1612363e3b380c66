//! Raw HTML blocks.
//!
//! Seven start conditions are recognised. Conditions 1 to 5 run until a line
//! containing their end marker, conditions 6 and 7 until a blank line.
//! Condition 7, a lone complete tag, may not interrupt a paragraph.

use super::{
    BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus, BuildContext,
    HTML_BLOCK_PRECEDENCE, MatchContext, strip_trailing_blank_lines,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::inline::handlers::{close_tag, open_tag};
use crate::input::{CODE_INDENT, Line};
use regex::Regex;
use std::sync::LazyLock;

const RAW_TEXT_TAGS: [&str; 4] = ["script", "pre", "textarea", "style"];

const BLOCK_TAGS: &str = "address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h[1-6]|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul";

static RAW_TEXT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^<(?:{})(?:\s|>|$)", RAW_TEXT_TAGS.join("|")))
        .expect("raw text tag pattern is valid")
});

static BLOCK_TAG_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^</?(?:{BLOCK_TAGS})(?:\s|/?>|$)"))
        .expect("block tag pattern is valid")
});

static COMPLETE_TAG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:{}|{})\s*$", open_tag(), close_tag()))
        .expect("complete tag pattern is valid")
});

/// Which of the seven start conditions opened the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlBlockType {
    RawText,
    Comment,
    ProcessingInstruction,
    Declaration,
    CData,
    BlockTag,
    CompleteTag,
}

impl HtmlBlockType {
    fn detect(rest: &str, ctx: &MatchContext) -> Option<Self> {
        let bytes = rest.as_bytes();
        if bytes.first() != Some(&b'<') {
            return None;
        }
        if RAW_TEXT_OPEN.is_match(rest) {
            Some(HtmlBlockType::RawText)
        } else if rest.starts_with("<!--") {
            Some(HtmlBlockType::Comment)
        } else if rest.starts_with("<?") {
            Some(HtmlBlockType::ProcessingInstruction)
        } else if rest.starts_with("<![CDATA[") {
            Some(HtmlBlockType::CData)
        } else if rest.starts_with("<!") && bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
            Some(HtmlBlockType::Declaration)
        } else if BLOCK_TAG_OPEN.is_match(rest) {
            Some(HtmlBlockType::BlockTag)
        } else if ctx.container != BlockKind::Paragraph
            && !ctx.lazy_paragraph()
            && COMPLETE_TAG_LINE.is_match(rest)
        {
            Some(HtmlBlockType::CompleteTag)
        } else {
            None
        }
    }

    fn ends_at_blank_line(self) -> bool {
        matches!(self, HtmlBlockType::BlockTag | HtmlBlockType::CompleteTag)
    }

    /// Whether `line` contains this block type's end marker.
    fn closes(self, line: &Line<'_>) -> bool {
        match self {
            HtmlBlockType::RawText => RAW_TEXT_TAGS
                .iter()
                .any(|tag| line.index_of_ignore_case(&format!("</{tag}>")).is_some()),
            HtmlBlockType::Comment => line.rest().contains("-->"),
            HtmlBlockType::ProcessingInstruction => line.rest().contains("?>"),
            HtmlBlockType::Declaration => line.rest().contains('>'),
            HtmlBlockType::CData => line.rest().contains("]]>"),
            HtmlBlockType::BlockTag | HtmlBlockType::CompleteTag => false,
        }
    }
}

pub struct HtmlBlockMatcher;

impl BlockMatcher for HtmlBlockMatcher {
    fn precedence(&self) -> u32 {
        HTML_BLOCK_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, ctx: &MatchContext) -> Option<BlockStart> {
        if line.indent() >= CODE_INDENT {
            return None;
        }
        let block_type = HtmlBlockType::detect(line.rest_from_nonspace(), ctx)?;
        log::trace!("HTML block start condition {block_type:?}");
        Some(BlockStart::of(HtmlBlockBuilder {
            block_type,
            literal: String::new(),
            finished: false,
        }))
    }
}

pub struct HtmlBlockBuilder {
    block_type: HtmlBlockType,
    literal: String,
    finished: bool,
}

impl BlockBuilder for HtmlBlockBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::HtmlBlock
    }

    fn process_line(&mut self, line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        if line.is_blank() && self.block_type.ends_at_blank_line() {
            BlockStatus::NotMatched
        } else {
            BlockStatus::Continued
        }
    }

    fn accepts_lines(&self) -> bool {
        true
    }

    fn add_line(&mut self, line: &Line<'_>) {
        if !self.literal.is_empty() {
            self.literal.push('\n');
        }
        self.literal.push_str(&line.content());
        self.finished = self.block_type.closes(line);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        _children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        let literal = strip_trailing_blank_lines(&self.literal).to_string();
        let node = tree.create(NodeValue::HtmlBlock { literal })?;
        Ok(Some(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(container: BlockKind) -> MatchContext {
        MatchContext {
            container,
            tip: container,
            all_closed: true,
        }
    }

    fn detect(text: &str) -> Option<HtmlBlockType> {
        HtmlBlockType::detect(text, &ctx(BlockKind::Document))
    }

    #[test]
    fn test_start_conditions() {
        assert_eq!(detect("<script type=x>"), Some(HtmlBlockType::RawText));
        assert_eq!(detect("<PRE>"), Some(HtmlBlockType::RawText));
        assert_eq!(detect("<!-- c"), Some(HtmlBlockType::Comment));
        assert_eq!(detect("<?php"), Some(HtmlBlockType::ProcessingInstruction));
        assert_eq!(detect("<!DOCTYPE html>"), Some(HtmlBlockType::Declaration));
        assert_eq!(detect("<![CDATA["), Some(HtmlBlockType::CData));
        assert_eq!(detect("<div class=\"a\""), Some(HtmlBlockType::BlockTag));
        assert_eq!(detect("</td>"), Some(HtmlBlockType::BlockTag));
        assert_eq!(detect("<custom-el attr=1>"), Some(HtmlBlockType::CompleteTag));
        assert_eq!(detect("<custom-el> text"), None);
        assert_eq!(detect("<scripts"), None);
        assert_eq!(detect("<div2>"), Some(HtmlBlockType::CompleteTag));
    }

    #[test]
    fn test_complete_tag_does_not_interrupt_paragraph() {
        assert_eq!(
            HtmlBlockType::detect("<span>", &ctx(BlockKind::Paragraph)),
            None
        );
        assert_eq!(
            HtmlBlockType::detect("<div>", &ctx(BlockKind::Paragraph)),
            Some(HtmlBlockType::BlockTag)
        );
    }

    #[test]
    fn test_end_markers() {
        let mut builder = HtmlBlockBuilder {
            block_type: HtmlBlockType::RawText,
            literal: String::new(),
            finished: false,
        };
        builder.add_line(&Line::new("<pre>"));
        assert!(!builder.is_finished());
        builder.add_line(&Line::new("x</PRE> tail"));
        assert!(builder.is_finished());
        assert!(HtmlBlockType::Comment.closes(&Line::new("a --> b")));
        assert!(!HtmlBlockType::BlockTag.closes(&Line::new("</div>")));
    }
}
