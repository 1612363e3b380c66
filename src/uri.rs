/// Percent-encoding of link destinations
///
/// Existing `%XX` escapes and URI-reserved characters are kept as written;
/// everything else that cannot appear in a URI is percent-encoded as UTF-8.
fn is_uri_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || ";/?:@&=+$,-_.!~*'()#".contains(c)
}

pub fn normalize_uri(uri: &str) -> String {
    let mut result = String::with_capacity(uri.len());
    let bytes = uri.as_bytes();
    let mut buf = [0u8; 4];

    for (i, c) in uri.char_indices() {
        if c == '%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            result.push('%');
        } else if is_uri_safe(c) {
            result.push(c);
        } else {
            result.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }

    result
}
