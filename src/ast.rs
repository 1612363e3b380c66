//! AST node types for CommonMark documents
//!
//! Nodes live in an arena owned by a [`Tree`]. Each node keeps parent and
//! sibling links so unlinking is O(1), and each tree hands out ids tagged with
//! its own identity so a node from one tree can never be attached to another.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

/// Handle to a node inside one particular [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: u32,
    index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListKind {
    Unordered { marker: char },
    Ordered { start: u32, delimiter: char },
    Definition,
}

/// List attributes. Tightness is fixed when the block parser builds the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub kind: ListKind,
    tight: bool,
}

impl List {
    pub fn new(kind: ListKind, tight: bool) -> Self {
        List { kind, tight }
    }

    pub fn is_tight(&self) -> bool {
        self.tight
    }

    pub fn is_loose(&self) -> bool {
        !self.tight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeValue {
    Document,
    // Block-level nodes
    BlockQuote,
    Heading {
        level: u8,
    },
    Paragraph,
    List(List),
    ListItem,
    Term,
    Definition,
    Admonition {
        kind: String,
        title: Option<String>,
    },
    CodeBlock {
        info: String,
        language: Option<String>,
        literal: String,
    },
    HtmlBlock {
        literal: String,
    },
    ThematicBreak,
    // Inline nodes
    Text {
        literal: String,
    },
    CodeSpan {
        literal: String,
    },
    Emphasis {
        strength: u8,
    },
    Link {
        destination: String,
        title: Option<String>,
    },
    Image {
        destination: String,
        title: Option<String>,
    },
    HtmlInline {
        literal: String,
    },
    HardLineBreak,
}

impl NodeValue {
    pub fn text(literal: impl Into<String>) -> Self {
        NodeValue::Text {
            literal: literal.into(),
        }
    }

    pub fn heading(level: u8) -> Result<Self> {
        if !(1..=6).contains(&level) {
            return Err(Error::InvalidHeadingLevel(level));
        }
        Ok(NodeValue::Heading { level })
    }

    pub fn emphasis(strength: u8) -> Result<Self> {
        if !(1..=2).contains(&strength) {
            return Err(Error::InvalidEmphasisStrength(strength));
        }
        Ok(NodeValue::Emphasis { strength })
    }

    /// Whether nodes of this kind may own children.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::Heading { .. }
                | NodeValue::Paragraph
                | NodeValue::List(_)
                | NodeValue::ListItem
                | NodeValue::Term
                | NodeValue::Definition
                | NodeValue::Admonition { .. }
                | NodeValue::Emphasis { .. }
                | NodeValue::Link { .. }
                | NodeValue::Image { .. }
        )
    }

    pub fn is_block(&self) -> bool {
        !matches!(
            self,
            NodeValue::Text { .. }
                | NodeValue::CodeSpan { .. }
                | NodeValue::Emphasis { .. }
                | NodeValue::Link { .. }
                | NodeValue::Image { .. }
                | NodeValue::HtmlInline { .. }
                | NodeValue::HardLineBreak
        )
    }

    /// Contract checks shared by every construction path.
    fn validate(&self) -> Result<()> {
        match *self {
            NodeValue::Heading { level } if !(1..=6).contains(&level) => {
                Err(Error::InvalidHeadingLevel(level))
            }
            NodeValue::Emphasis { strength } if !(1..=2).contains(&strength) => {
                Err(Error::InvalidEmphasisStrength(strength))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug)]
struct NodeData {
    value: NodeValue,
    parent: Option<u32>,
    previous: Option<u32>,
    next: Option<u32>,
    first_child: Option<u32>,
    last_child: Option<u32>,
}

/// A document tree and the factory for its nodes.
#[derive(Debug)]
pub struct Tree {
    id: u32,
    nodes: Vec<NodeData>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree holding a lone `Document` root.
    pub fn new() -> Self {
        let mut tree = Tree {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        };
        tree.push(NodeValue::Document);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.id_of(0)
    }

    /// Creates a detached node owned by this tree.
    pub fn create(&mut self, value: NodeValue) -> Result<NodeId> {
        value.validate()?;
        Ok(self.push(value))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.tree == self.id && (id.index as usize) < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeValue> {
        self.contains(id).then(|| &self.nodes[id.index as usize].value)
    }

    /// Replaces the payload of a node, keeping its position.
    ///
    /// A container cannot become a leaf while it still has children.
    pub fn set_value(&mut self, id: NodeId, value: NodeValue) -> Result<()> {
        let index = self.check(id)?;
        value.validate()?;
        if !value.is_container() && self.nodes[index].first_child.is_some() {
            return Err(Error::NotAContainer(id));
        }
        self.nodes[index].value = value;
        Ok(())
    }

    /// Mutable access to the literal of a `Text` node.
    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        if !self.contains(id) {
            return None;
        }
        match &mut self.nodes[id.index as usize].value {
            NodeValue::Text { literal } => Some(literal),
            _ => None,
        }
    }

    // Navigation. These panic on ids from another tree, like indexing does.

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent.map(|i| self.id_of(i))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).first_child.map(|i| self.id_of(i))
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).last_child.map(|i| self.id_of(i))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).next.map(|i| self.id_of(i))
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).previous.map(|i| self.id_of(i))
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Concatenated literal content of every text-bearing descendant.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self[id] {
            NodeValue::Text { literal } | NodeValue::CodeSpan { literal } => out.push_str(literal),
            NodeValue::HtmlInline { literal } => out.push_str(literal),
            NodeValue::HardLineBreak => out.push('\n'),
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    // Mutation. Every operation unlinks the moved node from its old position first.

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let (p, c) = self.check_attach(parent, child)?;
        self.unlink(c);
        let last = self.nodes[p].last_child;
        self.nodes[c].parent = Some(p as u32);
        self.nodes[c].previous = last;
        match last {
            Some(last) => self.nodes[last as usize].next = Some(c as u32),
            None => self.nodes[p].first_child = Some(c as u32),
        }
        self.nodes[p].last_child = Some(c as u32);
        Ok(())
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match self.first_child(parent) {
            Some(first) if first != child => self.insert_before(first, child),
            Some(_) => Ok(()),
            None => self.append_child(parent, child),
        }
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        let (a, n, p) = self.check_sibling(anchor, node)?;
        if a == n {
            return Ok(());
        }
        self.unlink(n);
        let previous = self.nodes[a].previous;
        self.nodes[n].parent = Some(p);
        self.nodes[n].previous = previous;
        self.nodes[n].next = Some(a as u32);
        self.nodes[a].previous = Some(n as u32);
        match previous {
            Some(prev) => self.nodes[prev as usize].next = Some(n as u32),
            None => self.nodes[p as usize].first_child = Some(n as u32),
        }
        Ok(())
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        let (a, n, p) = self.check_sibling(anchor, node)?;
        if a == n {
            return Ok(());
        }
        self.unlink(n);
        let next = self.nodes[a].next;
        self.nodes[n].parent = Some(p);
        self.nodes[n].previous = Some(a as u32);
        self.nodes[n].next = next;
        self.nodes[a].next = Some(n as u32);
        match next {
            Some(next) => self.nodes[next as usize].previous = Some(n as u32),
            None => self.nodes[p as usize].last_child = Some(n as u32),
        }
        Ok(())
    }

    /// Puts `new` where `old` is and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        if old == new {
            self.check(old)?;
            return Ok(());
        }
        self.insert_before(old, new)?;
        self.detach(old)
    }

    /// Unlinks a node (and its subtree) from its parent and siblings.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let index = self.check(id)?;
        self.unlink(index);
        Ok(())
    }

    /// Serialises the document as nested `{ "value", "children" }` objects.
    pub fn to_json(&self) -> Result<String> {
        let mut out = String::new();
        let mut stack = vec![(self.root(), false)];
        while let Some((node, exiting)) = stack.pop() {
            if exiting {
                out.push_str("]}");
                continue;
            }
            // A node directly after a closed sibling
            if out.ends_with('}') {
                out.push(',');
            }
            out.push_str("{\"value\":");
            out.push_str(&serde_json::to_string(&self[node])?);
            out.push_str(",\"children\":[");
            stack.push((node, true));
            let children: Vec<_> = self.children(node).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
        Ok(out)
    }

    fn push(&mut self, value: NodeValue) -> NodeId {
        self.nodes.push(NodeData {
            value,
            parent: None,
            previous: None,
            next: None,
            first_child: None,
            last_child: None,
        });
        self.id_of((self.nodes.len() - 1) as u32)
    }

    fn id_of(&self, index: u32) -> NodeId {
        NodeId {
            tree: self.id,
            index,
        }
    }

    fn data(&self, id: NodeId) -> &NodeData {
        assert_eq!(id.tree, self.id, "node {id:?} belongs to another tree");
        &self.nodes[id.index as usize]
    }

    fn check(&self, id: NodeId) -> Result<usize> {
        if self.contains(id) {
            Ok(id.index as usize)
        } else {
            Err(Error::ForeignNode(id))
        }
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(usize, usize)> {
        let p = self.check(parent)?;
        let c = self.check(child)?;
        if !self.nodes[p].value.is_container() {
            return Err(Error::NotAContainer(parent));
        }
        if self.is_ancestor_or_self(c, p) {
            return Err(Error::WouldCycle(child));
        }
        Ok((p, c))
    }

    fn check_sibling(&self, anchor: NodeId, node: NodeId) -> Result<(usize, usize, u32)> {
        let a = self.check(anchor)?;
        let n = self.check(node)?;
        let p = self.nodes[a].parent.ok_or(Error::Orphan(anchor))?;
        if a != n && self.is_ancestor_or_self(n, p as usize) {
            return Err(Error::WouldCycle(node));
        }
        Ok((a, n, p))
    }

    fn is_ancestor_or_self(&self, ancestor: usize, mut node: usize) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent as usize,
                None => return false,
            }
        }
    }

    fn unlink(&mut self, index: usize) {
        let NodeData {
            parent,
            previous,
            next,
            ..
        } = self.nodes[index];
        match previous {
            Some(prev) => self.nodes[prev as usize].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent as usize].first_child = next;
                }
            }
        }
        match next {
            Some(next_node) => self.nodes[next_node as usize].previous = previous,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent as usize].last_child = previous;
                }
            }
        }
        let node = &mut self.nodes[index];
        node.parent = None;
        node.previous = None;
        node.next = None;
    }
}

impl std::ops::Index<NodeId> for Tree {
    type Output = NodeValue;

    /// # Panics
    ///
    /// Panics when the id was handed out by another tree.
    fn index(&self, id: NodeId) -> &NodeValue {
        &self.data(id).value
    }
}

pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut Tree, s: &str) -> NodeId {
        tree.create(NodeValue::text(s)).unwrap()
    }

    fn assert_links_consistent(tree: &Tree, parent: NodeId) {
        let children: Vec<_> = tree.children(parent).collect();
        if let Some(first) = children.first() {
            assert_eq!(tree.previous_sibling(*first), None);
            assert_eq!(tree.first_child(parent), Some(*first));
        }
        if let Some(last) = children.last() {
            assert_eq!(tree.next_sibling(*last), None);
            assert_eq!(tree.last_child(parent), Some(*last));
        }
        for pair in children.windows(2) {
            assert_eq!(tree.next_sibling(pair[0]), Some(pair[1]));
            assert_eq!(tree.previous_sibling(pair[1]), Some(pair[0]));
        }
        for child in children {
            assert_eq!(tree.parent(child), Some(parent));
        }
    }

    #[test]
    fn test_append_and_insert_keep_links_consistent() {
        let mut tree = Tree::new();
        let para = tree.create(NodeValue::Paragraph).unwrap();
        tree.append_child(tree.root(), para).unwrap();
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        let d = text(&mut tree, "d");
        tree.append_child(para, b).unwrap();
        tree.prepend_child(para, a).unwrap();
        tree.insert_after(b, d).unwrap();
        tree.insert_before(d, c).unwrap();
        assert_eq!(tree.text_content(para), "abcd");
        assert_links_consistent(&tree, para);
    }

    #[test]
    fn test_append_moves_node_from_previous_parent() {
        let mut tree = Tree::new();
        let first = tree.create(NodeValue::Paragraph).unwrap();
        let second = tree.create(NodeValue::Paragraph).unwrap();
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(first, a).unwrap();
        tree.append_child(first, b).unwrap();
        tree.append_child(second, a).unwrap();
        assert_eq!(tree.children(first).collect::<Vec<_>>(), vec![b]);
        assert_eq!(tree.parent(a), Some(second));
        assert_links_consistent(&tree, first);
        assert_links_consistent(&tree, second);
    }

    #[test]
    fn test_replace_and_detach() {
        let mut tree = Tree::new();
        let para = tree.create(NodeValue::Paragraph).unwrap();
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        tree.append_child(para, a).unwrap();
        tree.append_child(para, b).unwrap();
        tree.replace(a, c).unwrap();
        assert_eq!(tree.text_content(para), "cb");
        assert_eq!(tree.parent(a), None);
        tree.detach(b).unwrap();
        assert_eq!(tree.children(para).collect::<Vec<_>>(), vec![c]);
        assert_links_consistent(&tree, para);
    }

    #[test]
    fn test_rejects_nodes_from_other_tree() {
        let mut one = Tree::new();
        let mut other = Tree::new();
        let foreign = other.create(NodeValue::Paragraph).unwrap();
        let root = one.root();
        assert!(matches!(
            one.append_child(root, foreign),
            Err(Error::ForeignNode(_))
        ));
        assert!(one.get(foreign).is_none());
    }

    #[test]
    fn test_rejects_cycles_and_leaf_parents() {
        let mut tree = Tree::new();
        let quote = tree.create(NodeValue::BlockQuote).unwrap();
        let para = tree.create(NodeValue::Paragraph).unwrap();
        tree.append_child(quote, para).unwrap();
        assert!(matches!(
            tree.append_child(para, quote),
            Err(Error::WouldCycle(_))
        ));
        let leaf = text(&mut tree, "x");
        let other = text(&mut tree, "y");
        assert!(matches!(
            tree.append_child(leaf, other),
            Err(Error::NotAContainer(_))
        ));
        assert!(matches!(
            tree.insert_after(leaf, other),
            Err(Error::Orphan(_))
        ));
    }

    #[test]
    fn test_construction_contracts() {
        let mut tree = Tree::new();
        assert!(matches!(
            NodeValue::heading(0),
            Err(Error::InvalidHeadingLevel(0))
        ));
        assert!(matches!(
            tree.create(NodeValue::Heading { level: 7 }),
            Err(Error::InvalidHeadingLevel(7))
        ));
        assert!(matches!(
            NodeValue::emphasis(3),
            Err(Error::InvalidEmphasisStrength(3))
        ));
        assert!(NodeValue::heading(6).is_ok());
    }

    #[test]
    fn test_list_tightness() {
        let list = List::new(ListKind::Unordered { marker: '-' }, true);
        assert!(list.is_tight());
        assert!(!list.is_loose());
    }

    #[test]
    fn test_json_nests_children() {
        let mut tree = Tree::new();
        let heading = tree.create(NodeValue::heading(1).unwrap()).unwrap();
        let hello = text(&mut tree, "Hello");
        tree.append_child(heading, hello).unwrap();
        let root = tree.root();
        tree.append_child(root, heading).unwrap();
        let json: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
        assert_eq!(json["value"]["type"], "document");
        assert_eq!(json["children"][0]["value"]["level"], 1);
        assert_eq!(
            json["children"][0]["children"][0]["value"]["literal"],
            "Hello"
        );
    }
}
