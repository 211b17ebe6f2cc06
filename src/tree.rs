//! Constituency tree data structures
//!
//! A parse is stored as an arena of labeled nodes addressed by `NodeId`.
//! Children are kept in left-to-right bracket order; the parent link is an
//! index back into the same arena, so trees stay acyclic in memory and can
//! be cloned and compared without following back-references.

use regex::Regex;
use std::collections::VecDeque;
use std::fmt;

/// Unique identifier for a node (index into `Tree::nodes`)
pub type NodeId = usize;

/// A node in a constituency tree
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Category label (`"NP"`) or, for leaves, tag and word (`"NN dog"`)
    pub value: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(id: NodeId, value: Option<String>) -> Self {
        Self {
            id,
            value,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Unanchored regex search against the label; unlabeled nodes never match
    #[inline]
    fn matches(&self, pattern: &Regex) -> bool {
        self.value.as_deref().is_some_and(|value| pattern.is_match(value))
    }
}

/// A constituency tree (one sentence)
///
/// There is always exactly one root. The empty tree is a single unlabeled
/// root with no children.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root_id: NodeId,
}

impl Tree {
    /// Tree consisting of one unlabeled root and nothing else
    pub fn empty() -> Self {
        Self::with_root(None)
    }

    /// Single-node tree with the given label
    pub fn leaf(value: &str) -> Self {
        Self::with_root(Some(value.to_string()))
    }

    /// Build a node from a label and an ordered list of child trees
    ///
    /// Each child tree is grafted into the new arena below the new root, in
    /// order, and its root gets the new node as parent.
    pub fn node(value: &str, children: Vec<Tree>) -> Self {
        Self::with_children(Some(value.to_string()), children)
    }

    /// Build a node with no label, like the `( (S ...) )` wrapper
    pub fn unlabeled(children: Vec<Tree>) -> Self {
        Self::with_children(None, children)
    }

    fn with_children(value: Option<String>, children: Vec<Tree>) -> Self {
        let mut tree = Self::with_root(value);
        for child in children {
            tree.graft(tree.root_id, child);
        }
        tree
    }

    pub(crate) fn with_root(value: Option<String>) -> Self {
        Self {
            nodes: vec![Node::new(0, value)],
            root_id: 0,
        }
    }

    /// Add a new node as the last child of `parent`
    pub(crate) fn add_child(&mut self, parent: NodeId, value: Option<String>) -> NodeId {
        let id = self.nodes.len();
        let mut node = Node::new(id, value);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Move every node of `other` into this arena, attaching its root below `parent`
    fn graft(&mut self, parent: NodeId, other: Tree) {
        let offset = self.nodes.len();
        let other_root = other.root_id + offset;
        self.nodes.extend(other.nodes.into_iter().map(|mut node| {
            node.id += offset;
            node.parent = match node.parent {
                Some(p) => Some(p + offset),
                None => Some(parent),
            };
            for child in node.children.iter_mut() {
                *child += offset;
            }
            node
        }));
        self.nodes[parent].children.push(other_root);
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for the unlabeled, childless tree produced from empty input
    pub fn is_blank(&self) -> bool {
        let root = &self.nodes[self.root_id];
        root.value.is_none() && root.children.is_empty()
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.root_id,
        }
    }

    /// Borrowed handle to a node, if the id is in range
    pub fn node_ref(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id < self.nodes.len()).then_some(NodeRef { tree: self, id })
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.root() == other.root()
    }
}

impl Eq for Tree {}

/// A node together with the tree it lives in
///
/// All structural queries go through this handle so that parent and child
/// ids can be resolved against the owning arena.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    #[inline]
    fn node(&self) -> &'a Node {
        &self.tree.nodes[self.id]
    }

    #[inline]
    fn at(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef {
            tree: self.tree,
            id,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn value(&self) -> Option<&'a str> {
        self.node().value.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    /// Number of edges between this node and the root
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |node| node.parent()).count()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'a>> {
        self.node().children.get(index).map(|&id| self.at(id))
    }

    pub fn num_children(&self) -> usize {
        self.node().children.len()
    }

    /// Part-of-speech tag of a leaf (`"VB"` for `"VB Add"`)
    ///
    /// Only `"TAG word"` leaves are tagged; a childless phrase such as the
    /// `VP` in `(S (VP))` or a bare token has no tag.
    pub fn tag(&self) -> Option<&'a str> {
        if !self.is_leaf() {
            return None;
        }
        self.value()
            .and_then(|value| value.split_once(' ').map(|(tag, _)| tag))
    }

    /// Word of a leaf (`"Add"` for `"VB Add"`), if the label has one
    pub fn word(&self) -> Option<&'a str> {
        if !self.is_leaf() {
            return None;
        }
        self.value()
            .and_then(|value| value.split_once(' ').map(|(_, word)| word))
    }

    /// Direct children whose label matches `pattern`, in child order
    pub fn children_with_value(&self, pattern: &Regex) -> Vec<NodeRef<'a>> {
        self.children()
            .filter(|child| child.node().matches(pattern))
            .collect()
    }

    /// All matching descendants at the shallowest depth that has any match
    ///
    /// Breadth-first over the whole subtree below this node (the node itself
    /// is not tested). Once a depth yields a match, that depth is finished
    /// and nothing deeper is examined.
    pub fn highest_level_nodes_with_value(&self, pattern: &Regex) -> Vec<NodeRef<'a>> {
        let mut queue: VecDeque<(NodeId, usize)> =
            self.node().children.iter().map(|&id| (id, 1)).collect();
        let mut found = Vec::new();
        let mut found_depth = None;

        while let Some((id, depth)) = queue.pop_front() {
            if found_depth.is_some_and(|d| depth > d) {
                break;
            }
            let node = &self.tree.nodes[id];
            if node.matches(pattern) {
                found_depth = Some(depth);
                found.push(self.at(id));
            }
            if found_depth.is_none() {
                queue.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }

        found
    }

    /// Pre-order traversal of this node and everything below it
    pub fn subtree(&self) -> SubtreeIter<'a> {
        SubtreeIter {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Leaves of this subtree, left to right
    pub fn leaves(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        self.subtree().filter(|node| node.is_leaf())
    }

    /// Copy this subtree into a standalone tree
    pub fn to_tree(&self) -> Tree {
        let mut tree = Tree::with_root(self.node().value.clone());
        let mut stack = vec![(self.id, tree.root_id)];
        while let Some((source, target)) = stack.pop() {
            for &child in self.tree.nodes[source].children.iter() {
                let copied = tree.add_child(target, self.tree.nodes[child].value.clone());
                stack.push((child, copied));
            }
        }
        tree
    }
}

/// Structural equality: labels and child shape, never ids or parent links
impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
            && self.num_children() == other.num_children()
            && self.children().zip(other.children()).all(|(a, b)| a == b)
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({}, {})", self.id, self)
    }
}

pub struct SubtreeIter<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for SubtreeIter<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        self.stack
            .extend(self.tree.nodes[id].children.iter().rev().copied());
        Some(NodeRef {
            tree: self.tree,
            id,
        })
    }
}

/// Bracket notation. `{}` renders on one line; `{:#}` indents phrasal
/// children on their own lines, as the Stanford tools print trees.
impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bracketed(f, *self, 0, f.alternate())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            return Ok(());
        }
        fmt::Display::fmt(&self.root(), f)
    }
}

fn write_bracketed(
    f: &mut fmt::Formatter<'_>,
    node: NodeRef<'_>,
    indent: usize,
    pretty: bool,
) -> fmt::Result {
    f.write_str("(")?;
    if let Some(value) = node.value() {
        f.write_str(value)?;
    }
    // Leaves stay inline until the first phrasal child breaks the line
    let mut broken = false;
    for child in node.children() {
        broken |= !child.is_leaf();
        if pretty && broken {
            write!(f, "\n{:width$}", "", width = indent + 2)?;
        } else {
            f.write_str(" ")?;
        }
        write_bracketed(f, child, indent + 2, pretty)?;
    }
    f.write_str(")")
}
