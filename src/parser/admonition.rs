//! Admonitions:
//!
//! ```text
//! !!! warning "Mind the gap"
//!     Body blocks, indented four columns past the marker.
//! ```
//!
//! Without a quoted title the capitalised kind is used; `""` renders no title.

use super::{
    ADMONITION_PRECEDENCE, BlockBuilder, BlockKind, BlockMatcher, BlockStart, BlockStatus,
    BuildContext, MatchContext, append_children,
};
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use crate::input::{CODE_INDENT, Line};
use regex::Regex;
use std::sync::LazyLock;

static OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!!![ \t]+([A-Za-z0-9_-]+)(?:[ \t]+"([^"]*)")?[ \t]*$"#)
        .expect("admonition opener pattern is valid")
});

/// Body indentation, counted from the marker's column.
const BODY_INDENT: usize = 4;

fn capitalise(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Kind and rendered title of an opener line.
fn parse_opener(rest: &str) -> Option<(String, Option<String>)> {
    let captures = OPENER.captures(rest)?;
    let kind = captures[1].to_string();
    let title = match captures.get(2) {
        Some(quoted) if quoted.as_str().is_empty() => None,
        Some(quoted) => Some(quoted.as_str().to_string()),
        None => Some(capitalise(&kind)),
    };
    Some((kind, title))
}

pub struct AdmonitionMatcher;

impl BlockMatcher for AdmonitionMatcher {
    fn precedence(&self) -> u32 {
        ADMONITION_PRECEDENCE
    }

    fn types_to_interrupt(&self) -> &'static [BlockKind] {
        &[BlockKind::Paragraph]
    }

    fn new_builder(&self, line: &mut Line<'_>, _ctx: &MatchContext) -> Option<BlockStart> {
        let marker_offset = line.indent();
        if marker_offset >= CODE_INDENT {
            return None;
        }
        let (kind, title) = parse_opener(line.rest_from_nonspace())?;
        log::trace!("admonition {kind:?} opened");
        line.advance_to_end();
        Some(BlockStart::of(AdmonitionBuilder {
            kind,
            title,
            content_indent: marker_offset + BODY_INDENT,
        }))
    }
}

pub struct AdmonitionBuilder {
    kind: String,
    title: Option<String>,
    content_indent: usize,
}

impl BlockBuilder for AdmonitionBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::Admonition
    }

    fn process_line(&mut self, line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        if line.is_blank() {
            line.advance_next_nonspace();
        } else if line.indent() >= self.content_indent {
            line.advance_offset(self.content_indent, true);
        } else {
            return BlockStatus::NotMatched;
        }
        BlockStatus::Continued
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
        let node = tree.create(NodeValue::Admonition {
            kind: self.kind,
            title: self.title,
        })?;
        append_children(tree, node, children)?;
        Ok(Some(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opener_forms() {
        assert_eq!(
            parse_opener("!!! note"),
            Some(("note".to_string(), Some("Note".to_string())))
        );
        assert_eq!(
            parse_opener("!!! danger \"Hot surface\""),
            Some(("danger".to_string(), Some("Hot surface".to_string())))
        );
        assert_eq!(parse_opener("!!! tip \"\""), Some(("tip".to_string(), None)));
        assert_eq!(parse_opener("!!!note"), None);
        assert_eq!(parse_opener("!!! two words"), None);
    }

    #[test]
    fn test_body_indent_is_relative_to_marker() {
        let mut builder = AdmonitionBuilder {
            kind: "note".to_string(),
            title: None,
            content_indent: 2 + BODY_INDENT,
        };
        let mut line = Line::new("      body");
        assert_eq!(builder.process_line(&mut line, false), BlockStatus::Continued);
        assert_eq!(line.rest(), "body");
        let mut line = Line::new("    body");
        assert_eq!(builder.process_line(&mut line, false), BlockStatus::NotMatched);
    }
}
