//! General ordered tree of labeled nodes.
//!
//! Nodes live in a flat arena and are linked by index. A node's parent
//! link is a plain index, never an owner, so cloning the arena yields a
//! fully independent tree whose parent links already point into the
//! copy. Removed nodes leave a vacant slot that the next allocation
//! reuses.
//!
//! Children are only created through [`Tree::append_child`], which is
//! what keeps every parent link equal to its actual container.

use termweb_types::{BrowseError, Result};

/// Index into the [`Tree`]'s node arena.
pub type NodeId = usize;

// ------------------------------------------------------------------
// Node types
// ------------------------------------------------------------------

/// What a node is: the synthetic root, a named element, or raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Root,
    Element(String),
    Text,
}

impl Label {
    /// Shorthand for an element label.
    pub fn element(name: impl Into<String>) -> Self {
        Self::Element(name.into())
    }

    /// The element name, or `None` for root and text labels.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Element(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

/// A single `name="value"` pair. Names are unique within a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A single node in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    label: Label,
    attributes: Vec<Attribute>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(label: Label, text: Option<String>, parent: Option<NodeId>) -> Self {
        Self {
            label,
            attributes: Vec::new(),
            text,
            parent,
            children: Vec::new(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Element name, if this node is an element.
    pub fn name(&self) -> Option<&str> {
        self.label.name()
    }

    /// Text payload (set for text nodes, optional for others).
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute value by exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

// ------------------------------------------------------------------
// Tree
// ------------------------------------------------------------------

/// An owned tree. `Clone` is the deep copy; `std::mem::take` is the move.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    slots: Vec<Option<Node>>,
    vacant: Vec<NodeId>,
    root: Option<NodeId>,
}

impl Tree {
    /// Create an empty tree (no root).
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the tree to a single root node, dropping any prior content.
    pub fn create_root(&mut self, label: Label, text: Option<String>) -> NodeId {
        self.slots.clear();
        self.vacant.clear();
        self.slots.push(Some(Node::new(label, text, None)));
        self.root = Some(0);
        0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Get a node by ID, or `None` if the slot is vacant or out of range.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Get a node by ID, failing with `InvalidOperation` when absent.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id)
            .ok_or_else(|| BrowseError::invalid(format!("no node with id {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| BrowseError::invalid(format!("no node with id {id}")))
    }

    /// Create a node as the last child of `parent` and return its ID.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        label: Label,
        text: Option<String>,
    ) -> Result<NodeId> {
        self.node(parent)?;
        let node = Node::new(label, text, Some(parent));
        let id = match self.vacant.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            },
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            },
        };
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Set an attribute, replacing the value if the name already exists.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let node = self.node_mut(id)?;
        let name = name.into();
        let value = value.into();
        match node.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => node.attributes.push(Attribute { name, value }),
        }
        Ok(())
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let node = self.node_mut(id)?;
        let before = node.attributes.len();
        node.attributes.retain(|a| a.name != name);
        Ok(node.attributes.len() != before)
    }

    /// Append to (or set) a node's text payload.
    pub fn push_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        node.text.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    /// Detach `child` from `parent` and drop its whole subtree.
    ///
    /// Fails with `InvalidOperation` if `child` is not a direct child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let pos = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                BrowseError::invalid(format!("node {child} is not a child of node {parent}"))
            })?;
        self.node_mut(parent)?.children.remove(pos);

        let mut doomed = vec![child];
        while let Some(id) = doomed.pop() {
            if let Some(node) = self.slots.get_mut(id).and_then(Option::take) {
                doomed.extend(node.children);
                self.vacant.push(id);
            }
        }
        Ok(())
    }

    /// Parent of `id` (`None` for the root or a vacant slot).
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Children of `id` (empty for a vacant slot).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Attribute lookup shortcut.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attribute(name))
    }

    /// Pre-order iterator over `id` and all its descendants.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = if self.get(id).is_some() { vec![id] } else { Vec::new() };
        Descendants { tree: self, stack }
    }

    /// Pre-order open/close edges over the subtree at `id`.
    pub fn traverse(&self, id: NodeId) -> Traverse<'_> {
        Traverse {
            tree: self,
            walker: TreeWalker::new(id),
        }
    }

    /// Concatenated text payloads of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node_id in self.descendants(id) {
            if let Some(node) = self.get(node_id)
                && node.label.is_text()
                && let Some(text) = node.text()
            {
                out.push_str(text);
            }
        }
        out
    }

    /// Depth-first search for the first element with the given name.
    pub fn find_first(&self, name: &str) -> Option<NodeId> {
        let root = self.root?;
        self.descendants(root)
            .find(|&id| self.get(id).and_then(Node::name) == Some(name))
    }

    /// Copy the subtree at `id` into a new tree whose root is that node.
    pub fn subtree_copy(&self, id: NodeId) -> Result<Tree> {
        let source = self.node(id)?;
        let mut copy = Tree::new();
        let new_root = copy.create_root(source.label.clone(), source.text.clone());
        copy.node_mut(new_root)?.attributes = source.attributes.clone();

        let mut pending = vec![(id, new_root)];
        while let Some((from, to)) = pending.pop() {
            for &child in self.children(from) {
                let src = self.node(child)?;
                let new_id = copy.append_child(to, src.label.clone(), src.text.clone())?;
                copy.node_mut(new_id)?.attributes = src.attributes.clone();
                pending.push((child, new_id));
            }
        }
        Ok(copy)
    }

    /// Check that every live child's parent link names its container.
    pub fn validate(&self) -> Result<()> {
        for (id, slot) in self.slots.iter().enumerate() {
            let Some(node) = slot else { continue };
            for &child in &node.children {
                let child_node = self.get(child).ok_or_else(|| {
                    BrowseError::invalid(format!("node {id} lists vacant child {child}"))
                })?;
                if child_node.parent != Some(id) {
                    return Err(BrowseError::invalid(format!(
                        "node {child} has parent {:?}, expected {id}",
                        child_node.parent
                    )));
                }
            }
            if Some(id) == self.root && node.parent.is_some() {
                return Err(BrowseError::invalid("root has a parent"));
            }
        }
        Ok(())
    }
}

// ------------------------------------------------------------------
// Traversal
// ------------------------------------------------------------------

/// Pre-order iterator returned by [`Tree::descendants`].
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// One step of a depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Open(NodeId),
    Close(NodeId),
}

/// Depth-first walker that holds no borrow of the tree.
///
/// Each call to [`TreeWalker::next`] re-reads the current node's child
/// list, so children appended through [`Tree::append_child`] to a node
/// that has not been closed yet are visited in the same pass.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    start: Option<NodeId>,
    /// `(node, index of next child to visit)`.
    frames: Vec<(NodeId, usize)>,
}

impl TreeWalker {
    pub fn new(start: NodeId) -> Self {
        Self {
            start: Some(start),
            frames: Vec::new(),
        }
    }

    /// Advance the walk.
    pub fn next(&mut self, tree: &Tree) -> Option<Edge> {
        if let Some(start) = self.start.take() {
            tree.get(start)?;
            self.frames.push((start, 0));
            return Some(Edge::Open(start));
        }
        let (id, next_child) = self.frames.last_mut()?;
        let id = *id;
        match tree.children(id).get(*next_child) {
            Some(&child) => {
                *next_child += 1;
                self.frames.push((child, 0));
                Some(Edge::Open(child))
            },
            None => {
                self.frames.pop();
                Some(Edge::Close(id))
            },
        }
    }

    /// Do not descend into the node most recently opened; its `Close`
    /// edge is the next one produced.
    pub fn skip_children(&mut self) {
        if let Some((_, next_child)) = self.frames.last_mut() {
            *next_child = usize::MAX;
        }
    }

    /// Number of currently open nodes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Borrowing iterator adapter over a [`TreeWalker`].
pub struct Traverse<'a> {
    tree: &'a Tree,
    walker: TreeWalker,
}

impl Iterator for Traverse<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        self.walker.next(self.tree)
    }
}

// ------------------------------------------------------------------
// Tests
// ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> div -> (p -> "hello", span)
    fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.create_root(Label::Root, None);
        let div = tree.append_child(root, Label::element("div"), None).unwrap();
        let p = tree.append_child(div, Label::element("p"), None).unwrap();
        tree.append_child(p, Label::Text, Some("hello".into()))
            .unwrap();
        let span = tree.append_child(div, Label::element("span"), None).unwrap();
        (tree, root, div, p, span)
    }

    #[test]
    fn create_root_resets() {
        let (mut tree, ..) = sample();
        assert_eq!(tree.len(), 5);
        let root = tree.create_root(Label::element("html"), None);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), Some(root));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn parent_child_links() {
        let (tree, root, div, p, span) = sample();
        assert_eq!(tree.parent(div), Some(root));
        assert_eq!(tree.parent(p), Some(div));
        assert_eq!(tree.children(div), &[p, span]);
        assert_eq!(tree.parent(root), None);
        tree.validate().unwrap();
    }

    #[test]
    fn append_to_missing_parent_fails() {
        let mut tree = Tree::new();
        let err = tree.append_child(3, Label::Text, None).unwrap_err();
        assert!(matches!(err, BrowseError::InvalidOperation(_)));
    }

    #[test]
    fn set_attribute_keeps_keys_unique() {
        let (mut tree, _, div, ..) = sample();
        tree.set_attribute(div, "class", "a").unwrap();
        tree.set_attribute(div, "id", "main").unwrap();
        tree.set_attribute(div, "class", "b").unwrap();
        let node = tree.node(div).unwrap();
        assert_eq!(node.attributes().len(), 2);
        assert_eq!(node.attribute("class"), Some("b"));
        assert_eq!(node.attributes()[0].name, "class");

        assert!(tree.remove_attribute(div, "class").unwrap());
        assert!(!tree.remove_attribute(div, "class").unwrap());
        assert_eq!(tree.attribute(div, "id"), Some("main"));
    }

    #[test]
    fn remove_child_drops_subtree_and_reuses_slots() {
        let (mut tree, _, div, p, span) = sample();
        tree.remove_child(div, p).unwrap();
        assert_eq!(tree.children(div), &[span]);
        assert_eq!(tree.len(), 3);
        assert!(tree.get(p).is_none());

        let fresh = tree.append_child(span, Label::Text, Some("x".into())).unwrap();
        assert!(fresh < 5, "vacant slot should be reused");
        assert_eq!(tree.parent(fresh), Some(span));
        tree.validate().unwrap();
    }

    #[test]
    fn remove_non_child_is_invalid_operation() {
        let (mut tree, root, _, p, _) = sample();
        let err = tree.remove_child(root, p).unwrap_err();
        assert!(matches!(err, BrowseError::InvalidOperation(_)));
        // Tree unchanged.
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn descendants_are_pre_order() {
        let (tree, root, div, p, span) = sample();
        let order: Vec<NodeId> = tree.descendants(root).collect();
        assert_eq!(order, vec![root, div, p, p + 1, span]);
    }

    #[test]
    fn traverse_emits_open_and_close() {
        let (tree, root, div, p, span) = sample();
        let text = p + 1;
        let edges: Vec<Edge> = tree.traverse(div).collect();
        assert_eq!(
            edges,
            vec![
                Edge::Open(div),
                Edge::Open(p),
                Edge::Open(text),
                Edge::Close(text),
                Edge::Close(p),
                Edge::Open(span),
                Edge::Close(span),
                Edge::Close(div),
            ]
        );
        assert_eq!(tree.traverse(root).count(), 10);
    }

    #[test]
    fn walker_skip_children() {
        let (tree, _, div, p, span) = sample();
        let mut walker = TreeWalker::new(div);
        let mut edges = Vec::new();
        while let Some(edge) = walker.next(&tree) {
            if edge == Edge::Open(p) {
                walker.skip_children();
            }
            edges.push(edge);
        }
        assert_eq!(
            edges,
            vec![
                Edge::Open(div),
                Edge::Open(p),
                Edge::Close(p),
                Edge::Open(span),
                Edge::Close(span),
                Edge::Close(div),
            ]
        );
    }

    #[test]
    fn walker_visits_nodes_appended_mid_walk() {
        let (mut tree, _, div, _, span) = sample();
        let mut walker = TreeWalker::new(div);
        let mut opened = Vec::new();
        let mut added = None;
        while let Some(edge) = walker.next(&tree) {
            if let Edge::Open(id) = edge {
                opened.push(id);
                if id == span && added.is_none() {
                    added = Some(tree.append_child(div, Label::element("em"), None).unwrap());
                }
            }
        }
        assert_eq!(opened.last().copied(), added);
    }

    #[test]
    fn text_content_and_find_first() {
        let (tree, _, div, p, _) = sample();
        assert_eq!(tree.text_content(div), "hello");
        assert_eq!(tree.find_first("p"), Some(p));
        assert_eq!(tree.find_first("table"), None);
    }

    #[test]
    fn clone_is_independent() {
        let (tree, root, div, ..) = sample();
        let mut copy = tree.clone();
        copy.append_child(div, Label::element("b"), None).unwrap();
        copy.set_attribute(root, "lang", "en").unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(copy.len(), 6);
        assert_eq!(tree.children(div).len(), 2);
        assert_eq!(tree.attribute(root, "lang"), None);
        copy.validate().unwrap();
    }

    #[test]
    fn move_leaves_source_empty() {
        let (mut tree, ..) = sample();
        let moved = std::mem::take(&mut tree);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(moved.len(), 5);
    }

    #[test]
    fn subtree_copy_repoints_parents() {
        let (mut tree, _, div, p, _) = sample();
        tree.set_attribute(p, "id", "intro").unwrap();
        let copy = tree.subtree_copy(div).unwrap();
        assert_eq!(copy.len(), 4);
        let new_root = copy.root().unwrap();
        assert_eq!(copy.parent(new_root), None);
        assert_eq!(copy.node(new_root).unwrap().name(), Some("div"));
        let new_p = copy.find_first("p").unwrap();
        assert_eq!(copy.attribute(new_p, "id"), Some("intro"));
        assert_eq!(copy.text_content(new_root), "hello");
        copy.validate().unwrap();
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        /// Build a tree from a list of "attach to the n-th existing node"
        /// choices.
        fn build(shape: &[usize]) -> Tree {
            let mut tree = Tree::new();
            let root = tree.create_root(Label::Root, None);
            let mut ids = vec![root];
            for (i, &pick) in shape.iter().enumerate() {
                let parent = ids[pick % ids.len()];
                let id = tree
                    .append_child(parent, Label::element(format!("n{i}")), None)
                    .unwrap();
                ids.push(id);
            }
            tree
        }

        proptest! {
            #[test]
            fn copy_then_mutate_leaves_original(
                shape in proptest::collection::vec(0usize..64, 0..40),
                pick in 0usize..64,
            ) {
                let original = build(&shape);
                let before: Vec<NodeId> = original.descendants(0).collect();

                let mut copy = original.clone();
                let ids: Vec<NodeId> = copy.descendants(0).collect();
                let target = ids[pick % ids.len()];
                copy.append_child(target, Label::Text, Some("new".into())).unwrap();

                prop_assert_eq!(original.len(), shape.len() + 1);
                prop_assert_eq!(copy.len(), shape.len() + 2);
                prop_assert_eq!(original.descendants(0).collect::<Vec<_>>(), before);
                prop_assert!(copy.validate().is_ok());
                prop_assert!(original.validate().is_ok());
            }

            #[test]
            fn removal_keeps_links_consistent(
                shape in proptest::collection::vec(0usize..64, 1..40),
                pick in 1usize..64,
            ) {
                let mut tree = build(&shape);
                let ids: Vec<NodeId> = tree.descendants(0).skip(1).collect();
                let victim = ids[pick % ids.len()];
                let parent = tree.parent(victim).unwrap();
                let subtree_size = tree.descendants(victim).count();
                let before = tree.len();
                tree.remove_child(parent, victim).unwrap();
                prop_assert_eq!(tree.len(), before - subtree_size);
                prop_assert!(tree.validate().is_ok());
            }
        }
    }
}
