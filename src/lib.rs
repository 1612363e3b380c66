/// A CommonMark Markdown parser with admonitions and definition lists, rendering to HTML
pub mod ast;
pub mod config;
pub mod entities;
pub mod error;
pub mod formatter;
pub mod inline;
pub mod input;
pub mod parser;
pub mod refs;
pub mod renderer;
pub mod uri;

pub use ast::{List, ListKind, NodeId, NodeValue, Tree};
pub use config::{Config, ParseOptions, RenderOptions};
pub use error::{Error, Result};
pub use renderer::HtmlRenderer;

use inline::{InlineHandler, InlineHandlers, standard_handlers};
use parser::{BlockMatcher, BlockParser};
use std::io::BufRead;

/// Assembles the block matchers and inline handlers a [`Parser`] runs with.
pub struct ParserBuilder {
    options: ParseOptions,
    matchers: Vec<Box<dyn BlockMatcher>>,
    handlers: Vec<Box<dyn InlineHandler>>,
}

impl ParserBuilder {
    pub fn new(options: ParseOptions) -> Self {
        ParserBuilder {
            options,
            matchers: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Register an extra block matcher. It is ordered among the standard
    /// ones by its precedence, after any standard matcher with the same value.
    pub fn with_matcher(mut self, matcher: impl BlockMatcher + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Register an extra inline handler. Handlers sharing a trigger are
    /// tried in registration order, standard handlers first.
    pub fn with_handler(mut self, handler: impl InlineHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn build(self) -> Parser {
        use parser::{
            admonition, blockquote, code, definition, heading, html_block, list, paragraph,
            thematic_break,
        };

        let mut matchers: Vec<Box<dyn BlockMatcher>> = vec![
            Box::new(blockquote::BlockQuoteMatcher),
            Box::new(heading::AtxHeadingMatcher),
            Box::new(code::FencedCodeMatcher),
            Box::new(html_block::HtmlBlockMatcher),
            Box::new(heading::SetextHeadingMatcher),
            Box::new(thematic_break::ThematicBreakMatcher),
            Box::new(list::ListItemMatcher),
            Box::new(code::IndentedCodeMatcher),
            Box::new(paragraph::ParagraphMatcher),
        ];
        if self.options.admonitions {
            matchers.push(Box::new(admonition::AdmonitionMatcher));
        }
        if self.options.definition_lists {
            matchers.push(Box::new(definition::DefinitionMatcher));
        }
        matchers.extend(self.matchers);
        matchers.sort_by_key(|matcher| matcher.precedence());

        let mut handlers = standard_handlers(self.options.autolinks, self.options.raw_html);
        handlers.extend(self.handlers);
        log::debug!(
            "parser built with {} block matchers and {} inline handlers",
            matchers.len(),
            handlers.len()
        );
        Parser {
            matchers,
            handlers: InlineHandlers::new(handlers),
        }
    }
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

/// A configured parser. Each call parses one document independently, so one
/// parser can be shared between threads.
pub struct Parser {
    matchers: Vec<Box<dyn BlockMatcher>>,
    handlers: InlineHandlers,
}

impl Parser {
    pub fn new() -> Self {
        ParserBuilder::default().build()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        ParserBuilder::new(options).build()
    }

    pub fn parse(&self, text: &str) -> Result<Tree> {
        self.parse_lines(split_lines(text))
    }

    /// Parse pre-split lines, given without their terminators.
    pub fn parse_lines<I, S>(&self, lines: I) -> Result<Tree>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parser = BlockParser::new(&self.matchers, &self.handlers);
        for line in lines {
            add_line(&mut parser, line.as_ref())?;
        }
        parser.finish()
    }

    pub fn parse_reader(&self, mut reader: impl BufRead) -> Result<Tree> {
        let mut parser = BlockParser::new(&self.matchers, &self.handlers);
        let mut chunk = String::new();
        // read_line stops after '\n', so a CRLF pair never straddles two chunks
        while reader.read_line(&mut chunk)? > 0 {
            for line in split_lines(&chunk) {
                add_line(&mut parser, line)?;
            }
            chunk.clear();
        }
        parser.finish()
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn add_line(parser: &mut BlockParser<'_>, line: &str) -> Result<()> {
    if line.contains('\0') {
        parser.add_line(&line.replace('\0', "\u{FFFD}"))
    } else {
        parser.add_line(line)
    }
}

/// Split at CR, LF and CRLF. A terminator at the very end does not start
/// another line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(end) = rest.find(['\r', '\n']) else {
            return Some(std::mem::take(&mut rest));
        };
        let line = &rest[..end];
        let width = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[end + width..];
        Some(line)
    })
}

/// Parse markdown text and render to HTML
pub fn markdown_to_html(markdown: &str) -> Result<String> {
    let parser = Parser::new();
    let ast = parser.parse(markdown)?;
    let renderer = HtmlRenderer::new();
    Ok(renderer.render(&ast))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn html(markdown: &str) -> String {
        markdown_to_html(markdown).unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(html(""), "");
    }

    #[test]
    fn test_basic_image() {
        assert_eq!(
            html("![foo](/url \"title\")\n"),
            "<p><img src=\"/url\" alt=\"foo\" title=\"title\" /></p>"
        );
    }

    #[test]
    fn test_image_without_title() {
        assert_eq!(html("![bar](/path)\n"), "<p><img src=\"/path\" alt=\"bar\" /></p>");
    }

    #[test]
    fn test_block_scenarios() {
        assert_eq!(html("# Hello"), "<h1>Hello</h1>");
        assert_eq!(html("> quoted"), "<blockquote><p>quoted</p></blockquote>");
        assert_eq!(
            html("```js\ncode\n```"),
            "<pre><code class=\"language-js\">code\n</code></pre>"
        );
        assert_eq!(html("- one\n- two"), "<ul><li>one</li><li>two</li></ul>");
    }

    #[test]
    fn test_reference_link_scenario() {
        let tree = Parser::new().parse("[a][1]\n\n[1]: /url \"t\"").unwrap();
        let root = tree.root();
        let blocks: Vec<_> = tree.children(root).collect();
        assert_eq!(blocks.len(), 1);
        let link = tree.first_child(blocks[0]).unwrap();
        assert_eq!(
            tree[link],
            NodeValue::Link {
                destination: "/url".to_string(),
                title: Some("t".to_string()),
            }
        );
        assert_eq!(tree.text_content(link), "a");
    }

    #[test]
    fn test_emphasis_scenario() {
        assert_eq!(html("*a* **b**"), "<p><em>a</em> <strong>b</strong></p>");
    }

    #[test]
    fn test_first_definition_wins() {
        assert_eq!(
            html("[x]\n\n[X]: /first\n[  x ]: /second"),
            "<p><a href=\"/first\">x</a></p>"
        );
    }

    #[test]
    fn test_line_terminators() {
        let parser = Parser::new();
        for input in ["a\nb\n\nc", "a\r\nb\r\n\r\nc", "a\rb\r\rc"] {
            let tree = parser.parse(input).unwrap();
            assert_eq!(HtmlRenderer::new().render(&tree), "<p>a\nb</p><p>c</p>");
        }
        assert_eq!(split_lines("a\n\n").collect::<Vec<_>>(), vec!["a", ""]);
        assert_eq!(split_lines("").count(), 0);
    }

    #[test]
    fn test_nul_is_replaced() {
        assert_eq!(html("a\0b"), "<p>a\u{FFFD}b</p>");
    }

    #[test]
    fn test_parse_reader_matches_parse() {
        let input = "> a\r\n> b\n\n- x\r- y\n";
        let parser = Parser::new();
        let renderer = HtmlRenderer::new();
        let from_str = renderer.render(&parser.parse(input).unwrap());
        let from_reader = renderer.render(&parser.parse_reader(input.as_bytes()).unwrap());
        assert_eq!(from_reader, from_str);
    }

    #[test]
    fn test_extensions_can_be_disabled() {
        let input = "!!! note\n    body\n\nTerm\n: def";
        assert_eq!(
            html(input),
            "<div class=\"admonition note\"><p class=\"admonition-title\">Note</p><p>body</p></div>\
             <dl><dt>Term</dt><dd>def</dd></dl>"
        );
        let plain = Parser::with_options(ParseOptions::commonmark());
        assert_eq!(
            HtmlRenderer::new().render(&plain.parse(input).unwrap()),
            "<p>!!! note\nbody</p><p>Term\n: def</p>"
        );
    }

    #[test]
    fn test_parser_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Parser>();
    }
}
