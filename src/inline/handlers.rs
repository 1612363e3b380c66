/// Built-in inline handlers
use super::delimiter::{Delimiter, scan_delims};
use super::{InlineHandler, Subject, link};
use crate::ast::NodeValue;
use crate::entities::decode_entity;
use crate::error::Result;
use crate::uri::normalize_uri;
use regex::Regex;
use std::sync::LazyLock;

pub(crate) const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9-]*";
pub(crate) const ATTRIBUTE: &str = r#"(?:\s+[a-zA-Z_:][a-zA-Z0-9:._-]*(?:\s*=\s*(?:[^"'=<>`\x00-\x20]+|'[^']*'|"[^"]*"))?)"#;

pub(crate) fn open_tag() -> String {
    format!(r"<{TAG_NAME}{ATTRIBUTE}*\s*/?>")
}

pub(crate) fn close_tag() -> String {
    format!(r"</{TAG_NAME}\s*>")
}

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    let comment = r"<!-->|<!--->|<!--(?s:.)*?-->";
    let processing = r"<\?(?s:.)*?\?>";
    let declaration = r"<![A-Za-z]+[^>]*>";
    let cdata = r"<!\[CDATA\[(?s:.)*?\]\]>";
    Regex::new(&format!(
        "^(?:{}|{}|{comment}|{processing}|{declaration}|{cdata})",
        open_tag(),
        close_tag()
    ))
    .expect("inline HTML pattern is valid")
});

static EMAIL_AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>",
    )
    .expect("email autolink pattern is valid")
});

static URI_AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([A-Za-z][A-Za-z0-9.+-]{1,31}:[^<>\x00-\x20]*)>")
        .expect("URI autolink pattern is valid")
});

/// The handler set for the given feature toggles, in dispatch order.
pub fn standard_handlers(autolinks: bool, raw_html: bool) -> Vec<Box<dyn InlineHandler>> {
    let mut handlers: Vec<Box<dyn InlineHandler>> = vec![
        Box::new(BackslashLineBreak),
        Box::new(BackslashEscape),
        Box::new(EntityHandler),
        Box::new(CodeSpanHandler),
        Box::new(EmphasisHandler::new(b'*')),
        Box::new(EmphasisHandler::new(b'_')),
        Box::new(OpenBracketHandler),
        Box::new(BangHandler),
        Box::new(CloseBracketHandler),
        Box::new(NewlineHandler),
    ];
    if autolinks {
        handlers.push(Box::new(AutolinkHandler));
    }
    if raw_html {
        handlers.push(Box::new(HtmlInlineHandler));
    }
    handlers
}

/// `\` at the end of a line.
pub struct BackslashLineBreak;

impl InlineHandler for BackslashLineBreak {
    fn trigger(&self) -> u8 {
        b'\\'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        if subject.peek(1) != Some(b'\n') {
            return Ok(0);
        }
        subject.append(NodeValue::HardLineBreak)?;
        Ok(2)
    }
}

pub struct BackslashEscape;

impl InlineHandler for BackslashEscape {
    fn trigger(&self) -> u8 {
        b'\\'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        match subject.peek(1) {
            Some(b) if b.is_ascii_punctuation() => {
                subject.push_str(&subject.rest()[1..2]);
                Ok(2)
            }
            _ => {
                subject.push_str("\\");
                Ok(1)
            }
        }
    }
}

pub struct EntityHandler;

impl InlineHandler for EntityHandler {
    fn trigger(&self) -> u8 {
        b'&'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        match decode_entity(subject.rest()) {
            Some((decoded, len)) => {
                subject.push_str(&decoded);
                Ok(len)
            }
            None => Ok(0),
        }
    }
}

pub struct CodeSpanHandler;

impl InlineHandler for CodeSpanHandler {
    fn trigger(&self) -> u8 {
        b'`'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        let rest = subject.rest();
        let ticks = rest.bytes().take_while(|&b| b == b'`').count();
        let mut search = ticks;
        while let Some(found) = rest[search..].find('`') {
            let run_start = search + found;
            let run = rest[run_start..].bytes().take_while(|&b| b == b'`').count();
            if run == ticks {
                let content = rest[ticks..run_start].replace('\n', " ");
                let literal = if content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && content.bytes().any(|b| b != b' ')
                {
                    content[1..content.len() - 1].to_string()
                } else {
                    content
                };
                subject.append(NodeValue::CodeSpan { literal })?;
                return Ok(run_start + run);
            }
            search = run_start + run;
        }
        // No closing run: the backticks are literal
        subject.push_str(&rest[..ticks]);
        Ok(ticks)
    }
}

/// `*` and `_` runs.
pub struct EmphasisHandler {
    delimiter: u8,
}

impl EmphasisHandler {
    pub fn new(delimiter: u8) -> Self {
        EmphasisHandler { delimiter }
    }
}

impl InlineHandler for EmphasisHandler {
    fn trigger(&self) -> u8 {
        self.delimiter
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        let pos = subject.pos();
        let (run, can_open, can_close) = scan_delims(subject.input(), pos, self.delimiter);
        let node = subject.append_text_node(&subject.input()[pos..pos + run])?;
        if can_open || can_close {
            subject.delimiters.push(Delimiter::emphasis(
                node,
                self.delimiter,
                run,
                can_open,
                can_close,
            ));
        }
        Ok(run)
    }
}

pub struct OpenBracketHandler;

impl InlineHandler for OpenBracketHandler {
    fn trigger(&self) -> u8 {
        b'['
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        let node = subject.append_text_node("[")?;
        subject.delimiters.mark_bracket_after();
        let label_start = subject.pos() + 1;
        subject
            .delimiters
            .push(Delimiter::bracket(node, false, label_start));
        Ok(1)
    }
}

/// `![` opens an image; a lone `!` is text.
pub struct BangHandler;

impl InlineHandler for BangHandler {
    fn trigger(&self) -> u8 {
        b'!'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        if subject.peek(1) != Some(b'[') {
            return Ok(0);
        }
        let node = subject.append_text_node("![")?;
        subject.delimiters.mark_bracket_after();
        let label_start = subject.pos() + 2;
        subject
            .delimiters
            .push(Delimiter::bracket(node, true, label_start));
        Ok(2)
    }
}

pub struct CloseBracketHandler;

impl InlineHandler for CloseBracketHandler {
    fn trigger(&self) -> u8 {
        b']'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        link::close_bracket(subject)
    }
}

/// Line endings inside a paragraph. Two or more trailing spaces make a hard
/// break; otherwise the break stays in the text as `\n`.
pub struct NewlineHandler;

impl InlineHandler for NewlineHandler {
    fn trigger(&self) -> u8 {
        b'\n'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        let pending = subject.pending_mut();
        let kept = pending.trim_end_matches(' ').len();
        let trailing = pending.len() - kept;
        pending.truncate(kept);
        if trailing >= 2 {
            subject.append(NodeValue::HardLineBreak)?;
        } else {
            subject.push_str("\n");
        }
        let indent = subject.rest()[1..].bytes().take_while(|&b| b == b' ').count();
        Ok(1 + indent)
    }
}

pub struct AutolinkHandler;

impl InlineHandler for AutolinkHandler {
    fn trigger(&self) -> u8 {
        b'<'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        let rest = subject.rest();
        let (destination, captures) = if let Some(caps) = EMAIL_AUTOLINK.captures(rest) {
            let address = &caps[1];
            (format!("mailto:{}", normalize_uri(address)), caps)
        } else if let Some(caps) = URI_AUTOLINK.captures(rest) {
            (normalize_uri(&caps[1]), caps)
        } else {
            return Ok(0);
        };
        let text = captures.get(1).map_or("", |m| m.as_str());
        let consumed = captures.get(0).map_or(0, |m| m.end());
        subject.append_with_text(
            NodeValue::Link {
                destination,
                title: None,
            },
            text,
        )?;
        Ok(consumed)
    }
}

pub struct HtmlInlineHandler;

impl InlineHandler for HtmlInlineHandler {
    fn trigger(&self) -> u8 {
        b'<'
    }

    fn handle(&self, subject: &mut Subject<'_>) -> Result<usize> {
        let Some(found) = HTML_TAG.find(subject.rest()) else {
            return Ok(0);
        };
        subject.append(NodeValue::HtmlInline {
            literal: found.as_str().to_string(),
        })?;
        Ok(found.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_tag_pattern() {
        for tag in [
            "<a href=\"x\">",
            "<br/>",
            "<x-y\n  data='1'>",
            "</em >",
            "<!-- c -->",
            "<!-->",
            "<?php echo 1; ?>",
            "<!DOCTYPE html>",
            "<![CDATA[ x ]]>",
        ] {
            assert_eq!(HTML_TAG.find(tag).map(|m| m.as_str()), Some(tag), "{tag}");
        }
        for not_tag in ["<33>", "<a h*#ref>", "</a href>", "<a =x>"] {
            assert!(HTML_TAG.find(not_tag).is_none(), "{not_tag}");
        }
    }

    #[test]
    fn test_autolink_patterns() {
        assert!(URI_AUTOLINK.is_match("<made-up-scheme://foo,bar>"));
        assert!(URI_AUTOLINK.is_match("<a+b+c:d>"));
        assert!(!URI_AUTOLINK.is_match("<m:abc>"));
        assert!(!URI_AUTOLINK.is_match("<https://a b>"));
        assert!(EMAIL_AUTOLINK.is_match("<foo+special@Bar.baz-bar0.com>"));
        assert!(!EMAIL_AUTOLINK.is_match("<foo\\+@bar.example.com>"));
    }
}
