/// Delimiter runs and the emphasis pairing pass
use crate::ast::{NodeId, NodeValue, Tree};
use crate::error::Result;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterKind {
    /// `*` or `_` run
    Emphasis(u8),
    /// `[`
    Link,
    /// `![`
    Image,
}

/// One entry on the delimiter stack, anchored to the text node holding its
/// literal characters.
#[derive(Debug)]
pub struct Delimiter {
    pub node: NodeId,
    pub kind: DelimiterKind,
    pub length: usize,
    pub original_length: usize,
    pub can_open: bool,
    pub can_close: bool,
    /// Cleared on link openers once an enclosing link has been formed.
    pub active: bool,
    /// Another bracket opener followed this one.
    pub bracket_after: bool,
    /// Byte offset in the inline input just past the opening bracket.
    pub label_start: usize,
    previous: Option<usize>,
    next: Option<usize>,
}

impl Delimiter {
    pub fn emphasis(node: NodeId, ch: u8, length: usize, can_open: bool, can_close: bool) -> Self {
        Delimiter {
            node,
            kind: DelimiterKind::Emphasis(ch),
            length,
            original_length: length,
            can_open,
            can_close,
            active: true,
            bracket_after: false,
            label_start: 0,
            previous: None,
            next: None,
        }
    }

    pub fn bracket(node: NodeId, image: bool, label_start: usize) -> Self {
        Delimiter {
            node,
            kind: if image {
                DelimiterKind::Image
            } else {
                DelimiterKind::Link
            },
            length: if image { 2 } else { 1 },
            original_length: if image { 2 } else { 1 },
            can_open: true,
            can_close: false,
            active: true,
            bracket_after: false,
            label_start,
            previous: None,
            next: None,
        }
    }

    pub fn is_bracket(&self) -> bool {
        matches!(self.kind, DelimiterKind::Link | DelimiterKind::Image)
    }
}

/// Doubly-linked stack over an append-only arena.
///
/// Entry indices grow with input position, so comparing two indices compares
/// where the runs start in the text.
#[derive(Debug, Default)]
pub struct DelimiterStack {
    entries: Vec<Delimiter>,
    top: Option<usize>,
}

fn above(index: usize, floor: Option<usize>) -> bool {
    floor.is_none_or(|floor| index > floor)
}

impl DelimiterStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut delimiter: Delimiter) -> usize {
        let index = self.entries.len();
        delimiter.previous = self.top;
        delimiter.next = None;
        if let Some(top) = self.top {
            self.entries[top].next = Some(index);
        }
        self.entries.push(delimiter);
        self.top = Some(index);
        index
    }

    pub fn top(&self) -> Option<usize> {
        self.top
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    pub fn get(&self, index: usize) -> &Delimiter {
        &self.entries[index]
    }

    pub fn previous(&self, index: usize) -> Option<usize> {
        self.entries[index].previous
    }

    pub fn remove(&mut self, index: usize) {
        let (previous, next) = (self.entries[index].previous, self.entries[index].next);
        if let Some(previous) = previous {
            self.entries[previous].next = next;
        }
        match next {
            Some(next) => self.entries[next].previous = previous,
            None => self.top = previous,
        }
        self.entries[index].previous = None;
        self.entries[index].next = None;
    }

    /// Nearest bracket opener, searching down from the top.
    pub fn last_bracket(&self) -> Option<usize> {
        let mut cursor = self.top;
        while let Some(index) = cursor {
            if self.entries[index].is_bracket() {
                return Some(index);
            }
            cursor = self.entries[index].previous;
        }
        None
    }

    /// Flags the current bracket opener as being followed by another bracket.
    pub fn mark_bracket_after(&mut self) {
        if let Some(index) = self.last_bracket() {
            self.entries[index].bracket_after = true;
        }
    }

    /// Deactivates every link opener at or below `from`. Image openers stay
    /// usable since an image description may contain a link.
    pub fn deactivate_links(&mut self, from: Option<usize>) {
        let mut cursor = from;
        while let Some(index) = cursor {
            if self.entries[index].kind == DelimiterKind::Link {
                self.entries[index].active = false;
            }
            cursor = self.entries[index].previous;
        }
    }

    /// Pairs emphasis runs above `bottom`, then drops every entry above it.
    pub fn process_emphasis(&mut self, tree: &mut Tree, bottom: Option<usize>) -> Result<()> {
        // (character, closer can open, original length mod 3) -> lowest entry worth scanning to
        let mut openers_bottom: HashMap<(u8, bool, usize), Option<usize>> = HashMap::new();

        let mut closer = None;
        let mut cursor = self.top;
        while let Some(index) = cursor
            && above(index, bottom)
        {
            closer = Some(index);
            cursor = self.entries[index].previous;
        }

        while let Some(c) = closer {
            let DelimiterKind::Emphasis(ch) = self.entries[c].kind else {
                closer = self.entries[c].next;
                continue;
            };
            if !self.entries[c].can_close {
                closer = self.entries[c].next;
                continue;
            }

            let closer_opens = self.entries[c].can_open;
            let closer_original = self.entries[c].original_length;
            let key = (ch, closer_opens, closer_original % 3);
            let floor = bottom.max(openers_bottom.get(&key).copied().flatten());

            let mut found = None;
            let mut cursor = self.entries[c].previous;
            while let Some(o) = cursor
                && above(o, floor)
            {
                let opener = &self.entries[o];
                if opener.kind == DelimiterKind::Emphasis(ch) && opener.can_open {
                    let odd_match = (closer_opens || opener.can_close)
                        && closer_original % 3 != 0
                        && (opener.original_length + closer_original) % 3 == 0;
                    if !odd_match {
                        found = Some(o);
                        break;
                    }
                }
                cursor = opener.previous;
            }

            let Some(o) = found else {
                openers_bottom.insert(key, self.entries[c].previous);
                let next = self.entries[c].next;
                if !closer_opens {
                    self.remove(c);
                }
                closer = next;
                continue;
            };

            let used = if self.entries[c].length >= 2 && self.entries[o].length >= 2 {
                2
            } else {
                1
            };
            self.entries[o].length -= used;
            self.entries[c].length -= used;
            let opener_node = self.entries[o].node;
            let closer_node = self.entries[c].node;
            for node in [opener_node, closer_node] {
                if let Some(literal) = tree.text_mut(node) {
                    let keep = literal.len().saturating_sub(used);
                    literal.truncate(keep);
                }
            }

            let emphasis = tree.create(NodeValue::emphasis(used as u8)?)?;
            let mut inner = tree.next_sibling(opener_node);
            while let Some(node) = inner
                && node != closer_node
            {
                inner = tree.next_sibling(node);
                tree.append_child(emphasis, node)?;
            }
            tree.insert_after(opener_node, emphasis)?;

            // Runs strictly between the pair can no longer match anything
            self.entries[o].next = Some(c);
            self.entries[c].previous = Some(o);

            if self.entries[o].length == 0 {
                tree.detach(opener_node)?;
                self.remove(o);
            }
            if self.entries[c].length == 0 {
                let next = self.entries[c].next;
                tree.detach(closer_node)?;
                self.remove(c);
                closer = next;
            }
        }

        while let Some(top) = self.top
            && above(top, bottom)
        {
            self.remove(top);
        }
        Ok(())
    }
}

/// Unicode punctuation (general categories P and S), as used by the flanking rules.
pub fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    matches!(c as u32,
        0x00A1..=0x00BF | 0x00D7 | 0x00F7
        | 0x02C2..=0x02C5 | 0x02D2..=0x02DF
        | 0x037E | 0x0387 | 0x055A..=0x055F | 0x0589 | 0x05BE | 0x05C0
        | 0x060C | 0x061B | 0x061F | 0x066A..=0x066D | 0x06D4
        | 0x0964 | 0x0965 | 0x0E3F | 0x0E4F | 0x0E5A | 0x0E5B
        | 0x2010..=0x2027 | 0x2030..=0x205E
        | 0x207A..=0x207E | 0x208A..=0x208E
        | 0x20A0..=0x20C0
        | 0x2100..=0x214F
        | 0x2190..=0x23FF
        | 0x2500..=0x2775 | 0x2794..=0x2BFF
        | 0x2E00..=0x2E7F
        | 0x3001..=0x3003 | 0x3008..=0x3011 | 0x3014..=0x301F
        | 0xFE10..=0xFE19 | 0xFE30..=0xFE52 | 0xFE54..=0xFE6B
        | 0xFF01..=0xFF0F | 0xFF1A..=0xFF20 | 0xFF3B..=0xFF40 | 0xFF5B..=0xFF65
        | 0x1F300..=0x1FAFF
    )
}

/// Length of the run at `pos` and whether it may open and/or close emphasis.
pub fn scan_delims(input: &str, pos: usize, ch: u8) -> (usize, bool, bool) {
    let run = input.as_bytes()[pos..]
        .iter()
        .take_while(|&&b| b == ch)
        .count();
    // Line boundaries count as whitespace
    let before = input[..pos].chars().next_back().unwrap_or('\n');
    let after = input[pos + run..].chars().next().unwrap_or('\n');

    let after_space = after.is_whitespace();
    let after_punct = is_punctuation(after);
    let before_space = before.is_whitespace();
    let before_punct = is_punctuation(before);

    let left_flanking = !after_space && (!after_punct || before_space || before_punct);
    let right_flanking = !before_space && (!before_punct || after_space || after_punct);

    if ch == b'_' {
        (
            run,
            left_flanking && (!right_flanking || before_punct),
            right_flanking && (!left_flanking || after_punct),
        )
    } else {
        (run, left_flanking, right_flanking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flanking_star() {
        assert_eq!(scan_delims("*a*", 0, b'*'), (1, true, false));
        assert_eq!(scan_delims("*a*", 2, b'*'), (1, false, true));
        assert_eq!(scan_delims("a * b", 2, b'*'), (1, false, false));
        // both sides alphanumeric: ambivalent
        assert_eq!(scan_delims("a**b", 1, b'*'), (2, true, true));
    }

    #[test]
    fn test_underscore_inside_word_is_inert() {
        assert_eq!(scan_delims("snake_case", 5, b'_'), (1, false, false));
        assert_eq!(scan_delims("_a_", 0, b'_'), (1, true, false));
        assert_eq!(scan_delims("\"_a_\"", 1, b'_'), (1, true, false));
    }

    #[test]
    fn test_punctuation_ranges() {
        assert!(is_punctuation('!'));
        assert!(is_punctuation('€'));
        assert!(is_punctuation('¿'));
        assert!(is_punctuation('。'));
        assert!(!is_punctuation('a'));
        assert!(!is_punctuation('é'));
    }

    #[test]
    fn test_stack_links() {
        let mut tree = Tree::new();
        let node = tree.root();
        let mut stack = DelimiterStack::new();
        let a = stack.push(Delimiter::bracket(node, false, 1));
        let b = stack.push(Delimiter::emphasis(node, b'*', 1, true, false));
        let c = stack.push(Delimiter::bracket(node, true, 3));
        assert_eq!(stack.last_bracket(), Some(c));
        stack.remove(c);
        assert_eq!(stack.last_bracket(), Some(a));
        assert_eq!(stack.top(), Some(b));
        stack.mark_bracket_after();
        assert!(stack.get(a).bracket_after);
        stack.deactivate_links(Some(b));
        assert!(!stack.get(a).active);
    }
}
