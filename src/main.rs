use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use clap::Parser as _;

use markweave::{Config, HtmlRenderer, ParseOptions, Parser, Result};

/// Convert Markdown to HTML.
#[derive(clap::Parser, Debug)]
#[command(name = "markweave", version, about)]
struct Cli {
    /// Input file (reads stdin when omitted)
    file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Wrap the output in a complete HTML document
    #[arg(long)]
    full_document: bool,

    /// Document title, used with --full-document
    #[arg(long)]
    title: Option<String>,

    /// Stylesheet to link from the document head (repeatable)
    #[arg(long = "stylesheet", value_name = "HREF")]
    stylesheets: Vec<String>,

    /// Put block tags on their own lines
    #[arg(long)]
    line_breaks: bool,

    /// Disable the admonition and definition list extensions
    #[arg(long)]
    commonmark: bool,

    /// Print the parsed tree as JSON instead of HTML
    #[arg(long)]
    ast: bool,
}

impl Cli {
    /// Command-line flags override the configuration file.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => {
                log::debug!("using default configuration");
                Config::default()
            }
        };
        if self.commonmark {
            config.parse = ParseOptions::commonmark();
        }
        let render = &mut config.render;
        render.full_document |= self.full_document;
        render.line_breaks |= self.line_breaks;
        if self.title.is_some() {
            render.title = self.title.clone();
        }
        render.stylesheets.extend(self.stylesheets.iter().cloned());
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config()?;
    let parser = Parser::with_options(config.parse);

    let tree = match &cli.file {
        Some(path) => {
            log::debug!("reading {}", path.display());
            parser.parse_reader(BufReader::new(File::open(path)?))?
        }
        None => parser.parse_reader(io::stdin().lock())?,
    };

    let output = if cli.ast {
        let mut json = tree.to_json()?;
        json.push('\n');
        json
    } else {
        HtmlRenderer::with_options(config.render).render(&tree)
    };
    io::stdout().lock().write_all(output.as_bytes())?;
    Ok(())
}
