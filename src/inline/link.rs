//! Link syntax scanners and bracket resolution.
//!
//! The scanners take the text starting at the construct and report how many
//! bytes it spans. They are shared by inline links and link reference
//! definitions.

use super::Subject;
use crate::ast::NodeValue;
use crate::entities::unescape;
use crate::error::Result;
use crate::uri::normalize_uri;

/// Label contents are limited to 999 characters.
const MAX_LABEL_CHARS: usize = 999;

/// Spaces and tabs with at most one line ending among them.
pub fn scan_spnl(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = bytes.iter().take_while(|&&b| b == b' ' || b == b'\t').count();
    if bytes.get(i) == Some(&b'\n') {
        i += 1;
        i += bytes[i..]
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
    }
    i
}

/// `[label]` with no unescaped brackets inside. Returns the bytes spanned,
/// brackets included.
pub fn scan_link_label(s: &str) -> Option<usize> {
    if !s.starts_with('[') {
        return None;
    }
    let mut chars = 0;
    let mut iter = s[1..].char_indices();
    while let Some((i, c)) = iter.next() {
        match c {
            ']' => return Some(i + 2),
            '[' => return None,
            '\\' => {
                chars += 1;
                if iter.next().is_some() {
                    chars += 1;
                }
            }
            _ => chars += 1,
        }
        if chars > MAX_LABEL_CHARS {
            return None;
        }
    }
    None
}

pub fn label_fits(label: &str) -> bool {
    label.chars().count() <= MAX_LABEL_CHARS
}

/// A link destination, either `<...>` or a run without spaces and with
/// balanced parentheses. Returns the normalised destination and bytes spanned.
pub fn scan_link_destination(s: &str) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() == Some(&b'<') {
        let mut i = 1;
        while let Some(&b) = bytes.get(i) {
            match b {
                b'>' => {
                    let raw = &s[1..i];
                    return Some((normalize_uri(&unescape(raw)), i + 1));
                }
                b'<' | b'\n' => return None,
                b'\\' if bytes.get(i + 1).is_some_and(|&n| n != b'\n') => i += 2,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = 0;
    let mut open_parens = 0usize;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
            b'(' => {
                open_parens += 1;
                i += 1;
            }
            b')' => {
                if open_parens == 0 {
                    break;
                }
                open_parens -= 1;
                i += 1;
            }
            b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r' => break,
            b if b.is_ascii_control() => return None,
            _ => i += 1,
        }
    }
    if (i == 0 && bytes.get(i) != Some(&b')')) || open_parens != 0 {
        return None;
    }
    Some((normalize_uri(&unescape(&s[..i])), i))
}

/// A `"title"`, `'title'` or `(title)`. Returns the unescaped title and bytes spanned.
pub fn scan_link_title(s: &str) -> Option<(String, usize)> {
    let open = s.chars().next()?;
    let close = match open {
        '"' => '"',
        '\'' => '\'',
        '(' => ')',
        _ => return None,
    };
    let mut iter = s[1..].char_indices();
    while let Some((i, c)) = iter.next() {
        if c == '\\' {
            iter.next();
        } else if c == close {
            let raw = &s[1..i + 1];
            return Some((unescape(raw).into_owned(), i + 2));
        } else if open == '(' && c == '(' {
            return None;
        }
    }
    None
}

/// `(destination "title")` following a closing bracket.
fn scan_inline_link(s: &str) -> Option<(String, Option<String>, usize)> {
    if !s.starts_with('(') {
        return None;
    }
    let mut pos = 1;
    pos += scan_spnl(&s[pos..]);
    let (destination, len) = scan_link_destination(&s[pos..])?;
    pos += len;
    let before_space = pos;
    pos += scan_spnl(&s[pos..]);
    let mut title = None;
    if pos > before_space
        && let Some((text, len)) = scan_link_title(&s[pos..])
    {
        title = Some(text);
        pos += len;
        pos += scan_spnl(&s[pos..]);
    }
    if s.as_bytes().get(pos) != Some(&b')') {
        return None;
    }
    Some((destination, title.filter(|t| !t.is_empty()), pos + 1))
}

/// Handle `]`: match it against the nearest bracket opener and build a link or
/// image when the brackets are followed by a valid target.
pub(crate) fn close_bracket(subject: &mut Subject<'_>) -> Result<usize> {
    let start = subject.pos();
    let after = start + 1;

    let Some(opener) = subject.delimiters.last_bracket() else {
        subject.push_str("]");
        return Ok(1);
    };
    if !subject.delimiters.get(opener).active {
        subject.delimiters.remove(opener);
        subject.push_str("]");
        return Ok(1);
    }

    let input = subject.input();
    let (is_image, label_start, bracket_after, opener_node) = {
        let delimiter = subject.delimiters.get(opener);
        (
            delimiter.kind == super::delimiter::DelimiterKind::Image,
            delimiter.label_start,
            delimiter.bracket_after,
            delimiter.node,
        )
    };

    let mut resolved =
        scan_inline_link(&input[after..]).map(|(dest, title, len)| (dest, title, after + len));
    if resolved.is_none() {
        let rest = &input[after..];
        let label_len = scan_link_label(rest).unwrap_or(0);
        let label = if label_len > 2 {
            Some(&rest[1..label_len - 1])
        } else if !bracket_after {
            Some(&input[label_start..start])
        } else {
            None
        };
        if let Some(label) = label
            && label_fits(label)
        {
            match subject.refs.get(label) {
                Some(definition) => {
                    log::trace!("reference [{label}] resolved to {}", definition.destination);
                    resolved = Some((
                        definition.destination.clone(),
                        definition.title.clone(),
                        after + label_len,
                    ));
                }
                None => log::trace!("reference [{label}] is not defined"),
            }
        }
    }

    let Some((destination, title, end)) = resolved else {
        subject.delimiters.remove(opener);
        subject.push_str("]");
        return Ok(1);
    };

    subject.flush()?;
    let value = if is_image {
        NodeValue::Image { destination, title }
    } else {
        NodeValue::Link { destination, title }
    };
    let tree = &mut *subject.tree;
    let link = tree.create(value)?;
    let mut inner = tree.next_sibling(opener_node);
    while let Some(node) = inner {
        inner = tree.next_sibling(node);
        tree.append_child(link, node)?;
    }
    tree.append_child(subject.parent, link)?;

    let below = subject.delimiters.previous(opener);
    subject.delimiters.process_emphasis(subject.tree, below)?;
    subject.tree.detach(opener_node)?;
    if !is_image {
        subject.delimiters.deactivate_links(below);
    }
    Ok(end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_link_label() {
        assert_eq!(scan_link_label("[foo] bar"), Some(5));
        assert_eq!(scan_link_label(r"[a\]b]"), Some(6));
        assert_eq!(scan_link_label("[a[b]"), None);
        assert_eq!(scan_link_label("[unclosed"), None);
        let long = format!("[{}]", "x".repeat(1000));
        assert_eq!(scan_link_label(&long), None);
    }

    #[test]
    fn test_scan_link_destination() {
        assert_eq!(
            scan_link_destination("/url \"t\""),
            Some(("/url".to_string(), 4))
        );
        assert_eq!(
            scan_link_destination("<my url>"),
            Some(("my%20url".to_string(), 8))
        );
        assert_eq!(
            scan_link_destination("a(b)c)"),
            Some(("a(b)c".to_string(), 5))
        );
        assert_eq!(scan_link_destination("(unbalanced"), None);
        assert_eq!(scan_link_destination(")"), Some((String::new(), 0)));
        assert_eq!(scan_link_destination("<a\nb>"), None);
    }

    #[test]
    fn test_scan_link_title() {
        assert_eq!(
            scan_link_title(r#""say \"hi\"" rest"#),
            Some((r#"say "hi""#.to_string(), 12))
        );
        assert_eq!(scan_link_title("(paren)"), Some(("paren".to_string(), 7)));
        assert_eq!(scan_link_title("(a(b)"), None);
        assert_eq!(scan_link_title("'open"), None);
    }

    #[test]
    fn test_scan_inline_link() {
        assert_eq!(
            scan_inline_link("(/u 'x')"),
            Some(("/u".to_string(), Some("x".to_string()), 8))
        );
        // without whitespace the quote belongs to the destination
        assert_eq!(
            scan_inline_link("(/u'x')"),
            Some(("/u'x'".to_string(), None, 7))
        );
        assert_eq!(scan_inline_link("()rest"), Some((String::new(), None, 2)));
    }
}
