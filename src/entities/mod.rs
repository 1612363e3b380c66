/// Character references and backslash escapes
use std::borrow::Cow;

mod data;

use data::ENTITIES;

/// Exact lookup of a named reference, without the `&` and `;`.
pub fn lookup_entity(name: &str) -> Option<&'static str> {
    ENTITIES
        .binary_search_by(|(entry, _)| entry.cmp(&name))
        .ok()
        .map(|index| ENTITIES[index].1)
}

/// Decode a character reference at the start of `input`.
///
/// Returns the decoded text and the number of bytes consumed. `input` must
/// start with `&`; anything that is not a complete reference yields `None`.
pub fn decode_entity(input: &str) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }

    if bytes.get(1) == Some(&b'#') {
        let (radix, start, max_digits) = match bytes.get(2) {
            Some(b'x' | b'X') => (16, 3, 6),
            _ => (10, 2, 7),
        };
        let digits = bytes[start..]
            .iter()
            .take_while(|b| {
                if radix == 16 {
                    b.is_ascii_hexdigit()
                } else {
                    b.is_ascii_digit()
                }
            })
            .count();
        let end = start + digits;
        if digits == 0 || digits > max_digits || bytes.get(end) != Some(&b';') {
            return None;
        }
        let code_point = u32::from_str_radix(&input[start..end], radix).ok()?;
        // Zero, surrogates and out-of-range values all become U+FFFD
        let ch = match code_point {
            0 => '\u{FFFD}',
            _ => char::from_u32(code_point).unwrap_or('\u{FFFD}'),
        };
        return Some((ch.to_string(), end + 1));
    }

    let name_len = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let end = 1 + name_len;
    // The longest HTML5 entity name is 31 characters
    if name_len == 0 || name_len > 32 || bytes.get(end) != Some(&b';') {
        return None;
    }
    let decoded = lookup_entity(&input[1..end])?;
    Some((decoded.to_string(), end + 1))
}

/// Resolve backslash escapes and character references, as used for link
/// destinations, titles and code fence info strings.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains(['\\', '&']) {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(['\\', '&']) {
        result.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if rest.starts_with('\\') {
            match rest.as_bytes().get(1) {
                Some(b) if b.is_ascii_punctuation() => {
                    result.push(*b as char);
                    rest = &rest[2..];
                }
                _ => {
                    result.push('\\');
                    rest = &rest[1..];
                }
            }
        } else if let Some((decoded, len)) = decode_entity(rest) {
            result.push_str(&decoded);
            rest = &rest[len..];
        } else {
            result.push('&');
            rest = &rest[1..];
        }
    }
    result.push_str(rest);
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_entities() {
        assert_eq!(decode_entity("&amp; rest"), Some(("&".to_string(), 5)));
        assert_eq!(decode_entity("&copy;"), Some(("©".to_string(), 6)));
        assert_eq!(
            decode_entity("&ClockwiseContourIntegral;"),
            Some(("∲".to_string(), 26))
        );
        assert_eq!(decode_entity("&MadeUpEntity;"), None);
        assert_eq!(decode_entity("&amp"), None);
        assert_eq!(decode_entity("&ampx;"), None);
        assert_eq!(decode_entity("&AMP;"), Some(("&".to_string(), 5)));
    }

    #[test]
    fn test_entities_with_two_code_points() {
        assert_eq!(decode_entity("&ngE;"), Some(("\u{2267}\u{338}".to_string(), 5)));
        assert_eq!(
            decode_entity("&NotEqualTilde;"),
            Some(("\u{2242}\u{338}".to_string(), 15))
        );
        assert_eq!(lookup_entity("bne"), Some("=\u{20e5}"));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        assert_eq!(lookup_entity("copy"), Some("\u{a9}"));
        assert_eq!(lookup_entity("COPY"), Some("\u{a9}"));
        assert_eq!(lookup_entity("Copy"), None);
        assert_eq!(lookup_entity("cop"), None);
        assert!(ENTITIES.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(decode_entity("&#35;"), Some(("#".to_string(), 5)));
        assert_eq!(decode_entity("&#X22;"), Some(("\"".to_string(), 6)));
        assert_eq!(decode_entity("&#0;"), Some(("\u{FFFD}".to_string(), 4)));
        assert_eq!(decode_entity("&#87654321;"), None);
        assert_eq!(decode_entity("&#xabcdef0;"), None);
        assert_eq!(decode_entity("&#;"), None);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape(r"\*not\* &auml; \q"), "*not* ä \\q");
        assert_eq!(unescape("a &bogus; b"), "a &bogus; b");
    }
}
