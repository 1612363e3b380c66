/// Tag emission for the HTML renderer
use html_escape::encode_double_quoted_attribute;

/// Escape `&`, `<`, `>` and `"`.
pub fn escape_html(text: &str) -> std::borrow::Cow<'_, str> {
    encode_double_quoted_attribute(text)
}

/// Accumulates HTML output. With `line_breaks` unset, [`HtmlFormatter::cr`]
/// is a no-op and block tags run together.
#[derive(Debug, Default)]
pub struct HtmlFormatter {
    out: String,
    line_breaks: bool,
}

impl HtmlFormatter {
    pub fn new(line_breaks: bool) -> Self {
        HtmlFormatter {
            out: String::new(),
            line_breaks,
        }
    }

    fn start_tag(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attributes {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_html(value));
            self.out.push('"');
        }
    }

    pub fn open(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.start_tag(name, attributes);
        self.out.push('>');
    }

    /// A self-closing tag such as `<hr />`.
    pub fn void(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.start_tag(name, attributes);
        self.out.push_str(" />");
    }

    pub fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    pub fn text(&mut self, text: &str) {
        self.out.push_str(&escape_html(text));
    }

    /// Output without escaping.
    pub fn raw(&mut self, html: &str) {
        self.out.push_str(html);
    }

    /// Start a new line unless already at the start of one.
    pub fn cr(&mut self) {
        if self.line_breaks && !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// A line break regardless of layout.
    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_html("plain 'quote'"), "plain 'quote'");
    }

    #[test]
    fn test_tags_and_attributes() {
        let mut f = HtmlFormatter::new(false);
        f.open("a", &[("href", "/q?a=1&b=\"2\"")]);
        f.text("x < y");
        f.close("a");
        f.void("img", &[("src", "i.png"), ("alt", "")]);
        f.cr();
        assert_eq!(
            f.finish(),
            "<a href=\"/q?a=1&amp;b=&quot;2&quot;\">x &lt; y</a><img src=\"i.png\" alt=\"\" />"
        );
    }

    #[test]
    fn test_cr_only_with_line_breaks() {
        let mut f = HtmlFormatter::new(true);
        f.cr();
        f.open("p", &[]);
        f.cr();
        f.cr();
        f.close("p");
        assert_eq!(f.finish(), "<p>\n</p>");
    }
}
