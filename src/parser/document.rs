use super::{BlockBuilder, BlockKind, BlockStatus, BuildContext, append_children};
use crate::ast::{NodeId, Tree};
use crate::error::Result;
use crate::input::Line;

/// The root block. Always open, and built into the tree's existing root node.
pub struct DocumentBuilder;

impl BlockBuilder for DocumentBuilder {
    fn kind(&self) -> BlockKind {
        BlockKind::Document
    }

    fn process_line(&mut self, _line: &mut Line<'_>, _has_children: bool) -> BlockStatus {
        BlockStatus::Continued
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&self, kind: BlockKind) -> bool {
        kind.is_flow()
    }

    fn build(
        self: Box<Self>,
        tree: &mut Tree,
        _ctx: &mut BuildContext<'_>,
        children: Vec<NodeId>,
    ) -> Result<Option<NodeId>> {
        let root = tree.root();
        append_children(tree, root, children)?;
        Ok(None)
    }
}
