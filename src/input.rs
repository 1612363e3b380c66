//! A cursor over one source line.
//!
//! Block matchers consume markers from the front of the line while the cursor
//! keeps both a byte offset and a visual column. Tabs advance the column to the
//! next multiple of 4, and a tab that is only partly consumed is remembered so
//! the remaining columns can be restored as spaces when the line is stored.
//! The first non-space character after the cursor is cached, so every open
//! container can ask for its indentation without rescanning the line.

pub const TAB_STOP: usize = 4;

/// Indentation at which a line becomes indented code.
pub const CODE_INDENT: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    text: &'a str,
    offset: usize,
    column: usize,
    partial_tab: bool,
    // First non-space at or after `offset`, and its column
    nonspace: usize,
    nonspace_column: usize,
}

pub fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

impl<'a> Line<'a> {
    /// `text` must not contain the line terminator.
    pub fn new(text: &'a str) -> Self {
        let mut line = Line {
            text,
            offset: 0,
            column: 0,
            partial_tab: false,
            nonspace: 0,
            nonspace_column: 0,
        };
        line.scan_nonspace();
        line
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Unconsumed part of the line. A partly consumed tab is still included.
    pub fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.text.as_bytes().get(index).copied()
    }

    pub fn peek(&self) -> Option<u8> {
        self.byte_at(self.offset)
    }

    /// Byte index and column of the first non-space character at or after the cursor.
    pub fn next_nonspace(&self) -> (usize, usize) {
        (self.nonspace, self.nonspace_column)
    }

    fn scan_nonspace(&mut self) {
        let bytes = self.text.as_bytes();
        let mut index = self.offset;
        let mut column = self.column;
        while let Some(&b) = bytes.get(index) {
            match b {
                b' ' => column += 1,
                b'\t' => column += TAB_STOP - column % TAB_STOP,
                _ => break,
            }
            index += 1;
        }
        self.nonspace = index;
        self.nonspace_column = column;
    }

    /// Only whitespace lies between the cursor and a cached position ahead of
    /// it, so the cache stays valid until the cursor moves past it.
    fn refresh_nonspace(&mut self) {
        if self.offset > self.nonspace {
            self.scan_nonspace();
        }
    }

    /// Columns of whitespace between the cursor and the next non-space character.
    pub fn indent(&self) -> usize {
        self.next_nonspace().1 - self.column
    }

    pub fn is_blank(&self) -> bool {
        self.next_nonspace().0 >= self.text.len()
    }

    pub fn peek_nonspace(&self) -> Option<u8> {
        self.byte_at(self.next_nonspace().0)
    }

    pub fn rest_from_nonspace(&self) -> &'a str {
        &self.text[self.next_nonspace().0..]
    }

    pub fn advance_next_nonspace(&mut self) {
        self.offset = self.nonspace;
        self.column = self.nonspace_column;
        self.partial_tab = false;
    }

    /// Consumes `count` characters, or `count` columns when `columns` is set.
    ///
    /// Counting columns lets a tab be split: the cursor stays on the tab and
    /// the unconsumed columns are kept for [`Line::content`].
    pub fn advance_offset(&mut self, mut count: usize, columns: bool) {
        while count > 0 {
            let Some(c) = self.rest().chars().next() else {
                break;
            };
            if c == '\t' {
                let to_tab = TAB_STOP - self.column % TAB_STOP;
                if columns {
                    self.partial_tab = to_tab > count;
                    let step = to_tab.min(count);
                    self.column += step;
                    if !self.partial_tab {
                        self.offset += 1;
                    }
                    count -= step;
                } else {
                    self.partial_tab = false;
                    self.column += to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partial_tab = false;
                self.offset += c.len_utf8();
                self.column += 1;
                count -= 1;
            }
        }
        self.refresh_nonspace();
    }

    pub fn advance_to_end(&mut self) {
        let remaining = self.rest().chars().count();
        self.advance_offset(remaining, false);
    }

    /// Remaining text as block content, expanding a partly consumed tab.
    pub fn content(&self) -> String {
        if self.partial_tab {
            let fill = TAB_STOP - self.column % TAB_STOP;
            let mut out = " ".repeat(fill);
            out.push_str(&self.text[self.offset + 1..]);
            out
        } else {
            self.rest().to_string()
        }
    }

    /// Number of consecutive `ch` bytes starting at `index`.
    pub fn count_run(&self, index: usize, ch: u8) -> usize {
        self.text.as_bytes()[index.min(self.text.len())..]
            .iter()
            .take_while(|&&b| b == ch)
            .count()
    }

    /// ASCII case-insensitive search for `needle` in the unconsumed text.
    pub fn index_of_ignore_case(&self, needle: &str) -> Option<usize> {
        let haystack = self.rest().as_bytes();
        let needle = needle.as_bytes();
        if needle.is_empty() {
            return Some(self.offset);
        }
        haystack
            .windows(needle.len())
            .position(|window| window.eq_ignore_ascii_case(needle))
            .map(|pos| pos + self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_expands_tabs() {
        let line = Line::new(" \tfoo");
        assert_eq!(line.indent(), 4);
        assert_eq!(line.peek_nonspace(), Some(b'f'));
        assert!(!line.is_blank());
        assert!(Line::new(" \t ").is_blank());
    }

    #[test]
    fn test_partial_tab_restored_as_spaces() {
        let mut line = Line::new(">\t\tfoo");
        line.advance_offset(1, false);
        line.advance_offset(1, true);
        assert_eq!(line.column(), 2);
        assert_eq!(line.content(), "  \tfoo");
    }

    #[test]
    fn test_advance_next_nonspace() {
        let mut line = Line::new("   > a");
        line.advance_next_nonspace();
        assert_eq!(line.column(), 3);
        assert_eq!(line.rest(), "> a");
    }

    #[test]
    fn test_search_helpers() {
        let line = Line::new("<PRE>x</Pre>");
        assert_eq!(line.index_of_ignore_case("</pre>"), Some(6));
        assert_eq!(line.index_of_ignore_case("</script>"), None);
        assert_eq!(Line::new("```` x").count_run(0, b'`'), 4);
    }

    #[test]
    fn test_nonspace_follows_the_cursor() {
        let mut line = Line::new("  \t- a\tb");
        assert_eq!(line.next_nonspace(), (3, 4));
        line.advance_offset(1, false);
        assert_eq!(line.next_nonspace(), (3, 4));
        assert_eq!(line.indent(), 3);
        line.advance_offset(2, true);
        assert_eq!((line.offset(), line.column()), (2, 3));
        assert_eq!(line.next_nonspace(), (3, 4));
        assert_eq!(line.indent(), 1);
        line.advance_offset(2, false);
        assert_eq!(line.next_nonspace(), (5, 6));
        assert_eq!(line.peek_nonspace(), Some(b'a'));
        line.advance_offset(1, false);
        assert_eq!(line.next_nonspace(), (5, 6));
        line.advance_offset(1, true);
        assert_eq!(line.next_nonspace(), (7, 8));
        assert_eq!(line.rest_from_nonspace(), "b");
        line.advance_to_end();
        assert!(line.is_blank());
        assert_eq!(line.next_nonspace(), (8, 9));
    }
}
