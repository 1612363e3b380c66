//! Parse and render options, loadable from a JSON configuration file.
//!
//! ```json
//! {
//!   "parse": { "admonitions": false },
//!   "render": { "full_document": true, "title": "Notes", "stylesheets": ["site.css"] }
//! }
//! ```
//!
//! Every field is optional and falls back to its default.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which syntax extensions the parser recognises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// `!!! kind "title"` blocks.
    pub admonitions: bool,
    /// `Term` / `: definition` lists.
    pub definition_lists: bool,
    /// `<scheme:...>` and `<user@host>` links.
    pub autolinks: bool,
    /// Inline HTML tags, comments and declarations.
    pub raw_html: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            admonitions: true,
            definition_lists: true,
            autolinks: true,
            raw_html: true,
        }
    }
}

impl ParseOptions {
    /// Plain CommonMark, without the extensions.
    pub fn commonmark() -> Self {
        ParseOptions {
            admonitions: false,
            definition_lists: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Wrap the output in a doctype, head and body.
    pub full_document: bool,
    pub title: Option<String>,
    pub stylesheets: Vec<String>,
    pub charset: String,
    /// Put block tags on their own lines, as the CommonMark reference renderer does.
    pub line_breaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            full_document: false,
            title: None,
            stylesheets: Vec::new(),
            charset: "UTF-8".to_string(),
            line_breaks: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parse: ParseOptions,
    pub render: RenderOptions,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_json_str(
            r#"{"parse": {"admonitions": false}, "render": {"line_breaks": true}}"#,
        )
        .unwrap();
        assert!(!config.parse.admonitions);
        assert!(config.parse.definition_lists);
        assert!(config.render.line_breaks);
        assert_eq!(config.render.charset, "UTF-8");
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(matches!(
            Config::from_json_str(r#"{"parse": {"admonitions": "yes"}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{"renderer": {}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::load("/nonexistent/markweave.json"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_commonmark_preset() {
        let options = ParseOptions::commonmark();
        assert!(!options.admonitions && !options.definition_lists);
        assert!(options.autolinks && options.raw_html);
    }
}
