//! Errors raised by the node tree, the parser entry points and configuration loading.
//!
//! Malformed Markdown is never an error: it degrades to literal text. Every
//! variant here is either API misuse or a failure upstream of the parser.

use crate::ast::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("heading level {0} is outside 1..=6")]
    InvalidHeadingLevel(u8),
    #[error("emphasis strength {0} is outside 1..=2")]
    InvalidEmphasisStrength(u8),
    #[error("node {0:?} was created by a different tree")]
    ForeignNode(NodeId),
    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),
    #[error("attaching {0:?} there would make it its own ancestor")]
    WouldCycle(NodeId),
    #[error("node {0:?} has no parent to hold a sibling")]
    Orphan(NodeId),
    #[error("failed to read markdown source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
