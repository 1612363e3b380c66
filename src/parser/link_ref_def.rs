/// Link reference definitions at the start of paragraph content
use crate::inline::link::{
    label_fits, scan_link_destination, scan_link_label, scan_link_title, scan_spnl,
};
use crate::refs::{LinkDefinition, LinkDefinitionMap, normalize_label};

/// Length of the rest of the line if it holds only spaces and tabs,
/// including the line ending.
fn blank_to_line_end(s: &str) -> Option<usize> {
    let spaces = s.bytes().take_while(|&b| b == b' ' || b == b'\t').count();
    match s.as_bytes().get(spaces) {
        None => Some(spaces),
        Some(b'\n') => Some(spaces + 1),
        Some(_) => None,
    }
}

/// Parse one `[label]: destination "title"` definition from the start of `s`
/// and register it. Returns the bytes consumed, or `None` when `s` does not
/// start with a valid definition.
pub fn parse_reference(s: &str, refs: &mut LinkDefinitionMap) -> Option<usize> {
    let label_len = scan_link_label(s)?;
    let label = &s[1..label_len - 1];
    if !label_fits(label) || normalize_label(label).is_empty() {
        return None;
    }
    let mut pos = label_len;
    if s.as_bytes().get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;
    pos += scan_spnl(&s[pos..]);

    let (destination, len) = scan_link_destination(&s[pos..])?;
    if len == 0 {
        return None;
    }
    pos += len;

    let before_title = pos;
    pos += scan_spnl(&s[pos..]);
    let mut title = None;
    if pos > before_title
        && let Some((text, len)) = scan_link_title(&s[pos..])
        && let Some(end) = blank_to_line_end(&s[pos + len..])
    {
        title = Some(text);
        pos += len + end;
    } else {
        // No usable title: the destination must end its line
        pos = before_title + blank_to_line_end(&s[before_title..])?;
    }

    let inserted = refs.insert(
        label,
        LinkDefinition {
            destination,
            title: title.filter(|t| !t.is_empty()),
        },
    );
    if !inserted {
        log::trace!("duplicate link definition [{label}] ignored");
    }
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> (Option<usize>, LinkDefinitionMap) {
        let mut refs = LinkDefinitionMap::new();
        let consumed = parse_reference(s, &mut refs);
        (consumed, refs)
    }

    #[test]
    fn test_destination_and_title() {
        let (consumed, refs) = parse("[Foo]: /url \"the title\"\nnext");
        assert_eq!(consumed, Some(24));
        let def = refs.get("foo").unwrap();
        assert_eq!(def.destination, "/url");
        assert_eq!(def.title.as_deref(), Some("the title"));
    }

    #[test]
    fn test_title_on_next_line() {
        let (consumed, refs) = parse("[a]:\n  <my dest>\n  'T'");
        assert_eq!(consumed, Some(22));
        assert_eq!(refs.get("a").unwrap().destination, "my%20dest");
        assert_eq!(refs.get("a").unwrap().title.as_deref(), Some("T"));
    }

    #[test]
    fn test_invalid_title_falls_back_to_destination_line() {
        // the title line is not part of the definition
        let (consumed, refs) = parse("[a]: /u\n\"t\" trailing");
        assert_eq!(consumed, Some(8));
        assert_eq!(refs.get("a").unwrap().title, None);

        let (consumed, _) = parse("[a]: /u \"t\" trailing");
        assert_eq!(consumed, None);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(parse("[]: /u").0, None);
        assert_eq!(parse("[ ]: /u").0, None);
        assert_eq!(parse("[a] /u").0, None);
        assert_eq!(parse("[a]:").0, None);
        assert_eq!(parse("[a]: <b").0, None);
    }

    #[test]
    fn test_empty_angle_destination() {
        let (consumed, refs) = parse("[a]: <>");
        assert_eq!(consumed, Some(7));
        assert_eq!(refs.get("a").unwrap().destination, "");
    }
}
