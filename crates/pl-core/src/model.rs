//! Core scene-graph data model.
//!
//! The document is an ownership tree stored in a `petgraph` stable-graph
//! arena. Edges go parent → child; a node has at most one incoming edge, so
//! the parent relation is a plain index lookup and never an owning pointer.
//! Child order is kept explicitly per parent, because curve topology depends
//! on segment order.
//!
//! Geometry lives in the leaves (anchor/handle vectors) and in the optional
//! transforms of graphics nodes. Anything that changes either goes through a
//! mutator here, which clears the memoized bounds up the ancestor chain
//! (see `bounds.rs`).

use crate::id::NodeKey;
use crate::matrix::Matrix;
use crate::rect::Rect;
use crate::status::{StatusTag, TagSet};
use crate::vector::Vector;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::cell::Cell;
use std::collections::HashMap;
use std::ops::Index;

// ─── Node kinds ──────────────────────────────────────────────────────────

/// The closed set of node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of a document.
    Doc,
    /// Document name.
    Identifier { name: String },
    /// Top-level drawing surface. `view_box` is the logical drawing area.
    Canvas { view_box: Rect },
    Group,
    /// A drawable path; its children are splines.
    Shape,
    /// An ordered run of segments, optionally closed back to its first one.
    Spline { closed: bool },
    /// One vertex of a spline: an anchor plus up to two handles.
    Segment,
    Anchor { vector: Vector },
    HandleIn { vector: Vector },
    HandleOut { vector: Vector },
    /// Toolbar state: active tool and pointer cursor.
    Tools { active: String, cursor: String },
    /// Names of documents known to persistence.
    Docs { names: Vec<String> },
    /// User-visible message (import errors and the like).
    Message { text: String },
}

impl NodeKind {
    /// The external type tag, used in serialization and rendering.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Identifier { .. } => "identifier",
            NodeKind::Canvas { .. } => "canvas",
            NodeKind::Group => "group",
            NodeKind::Shape => "shape",
            NodeKind::Spline { .. } => "spline",
            NodeKind::Segment => "segment",
            NodeKind::Anchor { .. } => "anchor",
            NodeKind::HandleIn { .. } => "handleIn",
            NodeKind::HandleOut { .. } => "handleOut",
            NodeKind::Tools { .. } => "tools",
            NodeKind::Docs { .. } => "docs",
            NodeKind::Message { .. } => "message",
        }
    }

    /// Canvas, Group and Shape: nodes with a transform and memoized bounds.
    pub fn is_graphics(&self) -> bool {
        matches!(
            self,
            NodeKind::Canvas { .. } | NodeKind::Group | NodeKind::Shape
        )
    }

    /// Anchor or one of the handles.
    pub fn is_control_point(&self) -> bool {
        matches!(
            self,
            NodeKind::Anchor { .. } | NodeKind::HandleIn { .. } | NodeKind::HandleOut { .. }
        )
    }

    /// Transient chrome nodes are never persisted.
    pub fn is_persistent(&self) -> bool {
        !matches!(
            self,
            NodeKind::Tools { .. } | NodeKind::Docs { .. } | NodeKind::Message { .. }
        )
    }

    pub fn vector(&self) -> Option<Vector> {
        match self {
            NodeKind::Anchor { vector }
            | NodeKind::HandleIn { vector }
            | NodeKind::HandleOut { vector } => Some(*vector),
            _ => None,
        }
    }

    /// Whether a node of kind `child` may be mounted directly under `self`.
    pub fn accepts_child(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::Doc => matches!(
                child,
                NodeKind::Identifier { .. }
                    | NodeKind::Canvas { .. }
                    | NodeKind::Tools { .. }
                    | NodeKind::Docs { .. }
                    | NodeKind::Message { .. }
            ),
            NodeKind::Canvas { .. } | NodeKind::Group => {
                matches!(child, NodeKind::Group | NodeKind::Shape)
            }
            NodeKind::Shape => matches!(child, NodeKind::Spline { .. }),
            NodeKind::Spline { .. } => matches!(child, NodeKind::Segment),
            NodeKind::Segment => child.is_control_point(),
            _ => false,
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A single node in the scene graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub key: NodeKey,
    pub kind: NodeKind,
    /// Local-to-parent transform. Only graphics nodes carry one.
    pub transform: Option<Matrix>,
    pub tags: TagSet,
    pub(crate) depth: usize,
    pub(crate) bounds: Cell<Option<Rect>>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self::with_key(NodeKey::mint(&kind), kind)
    }

    pub fn with_key(key: NodeKey, kind: NodeKind) -> Self {
        Self {
            key,
            kind,
            transform: None,
            tags: TagSet::new(),
            depth: 0,
            bounds: Cell::new(None),
        }
    }

    #[must_use]
    pub fn keyed(mut self, key: NodeKey) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn transformed(mut self, transform: Matrix) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn doc() -> Self {
        Self::new(NodeKind::Doc)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Identifier { name: name.into() })
    }

    pub fn canvas(view_box: Rect) -> Self {
        Self::new(NodeKind::Canvas { view_box })
    }

    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    pub fn shape() -> Self {
        Self::new(NodeKind::Shape)
    }

    pub fn spline(closed: bool) -> Self {
        Self::new(NodeKind::Spline { closed })
    }

    pub fn segment() -> Self {
        Self::new(NodeKind::Segment)
    }

    pub fn anchor(vector: Vector) -> Self {
        Self::new(NodeKind::Anchor { vector })
    }

    pub fn handle_in(vector: Vector) -> Self {
        Self::new(NodeKind::HandleIn { vector })
    }

    pub fn handle_out(vector: Vector) -> Self {
        Self::new(NodeKind::HandleOut { vector })
    }

    pub fn tools(active: impl Into<String>, cursor: impl Into<String>) -> Self {
        Self::new(NodeKind::Tools {
            active: active.into(),
            cursor: cursor.into(),
        })
    }

    pub fn docs(names: Vec<String>) -> Self {
        Self::new(NodeKind::Docs { names })
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Message { text: text.into() })
    }

    /// Depth below the root of whatever tree this node is mounted in.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The memoized bounds, if currently cached.
    pub fn cached_bounds(&self) -> Option<Rect> {
        self.bounds.get()
    }
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

/// An arena of nodes forming one ownership tree under `root`.
///
/// Nodes can also sit in the arena detached (freshly created, or unmounted
/// and waiting to be re-mounted elsewhere).
#[derive(Debug, Clone)]
pub struct SceneGraph {
    /// The underlying directed graph.
    pub graph: StableDiGraph<Node, ()>,

    /// The root node index.
    pub root: NodeIndex,

    /// Index from key → NodeIndex for fast lookup.
    key_index: HashMap<NodeKey, NodeIndex>,

    /// Children of each parent, in document order.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl SceneGraph {
    /// Create a graph whose root is `root`.
    #[must_use]
    pub fn new(root: Node) -> Self {
        let mut graph = StableDiGraph::new();
        let key = root.key;
        let root = graph.add_node(root);
        let mut key_index = HashMap::new();
        key_index.insert(key, root);
        Self {
            graph,
            root,
            key_index,
            child_order: HashMap::new(),
        }
    }

    /// A fresh document: `Doc { Identifier, Canvas }`.
    #[must_use]
    pub fn document(name: &str, view_box: Rect) -> Self {
        let mut sg = Self::new(Node::doc());
        let ident = sg.create(Node::identifier(name));
        let canvas = sg.create(Node::canvas(view_box));
        let root = sg.root;
        sg.mount(root, &[ident, canvas]);
        sg
    }

    /// Add a detached node to the arena. A key collision gets a fresh key.
    pub fn create(&mut self, mut node: Node) -> NodeIndex {
        if self.key_index.contains_key(&node.key) {
            let fresh = NodeKey::mint(&node.kind);
            log::debug!("key {} already in use, renamed to {}", node.key, fresh);
            node.key = fresh;
        }
        let key = node.key;
        let idx = self.graph.add_node(node);
        self.key_index.insert(key, idx);
        idx
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.graph.contains_node(idx)
    }

    pub fn kind(&self, idx: NodeIndex) -> Option<&NodeKind> {
        self.get(idx).map(|n| &n.kind)
    }

    pub fn key(&self, idx: NodeIndex) -> Option<NodeKey> {
        self.get(idx).map(|n| n.key)
    }

    pub fn index_of(&self, key: NodeKey) -> Option<NodeIndex> {
        self.key_index.get(&key).copied()
    }

    pub fn get_by_key(&self, key: NodeKey) -> Option<&Node> {
        self.index_of(key).and_then(|idx| self.get(idx))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
    }

    /// Children in document order.
    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.child_order.get(&idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of `child` among its parent's children.
    pub fn child_position(&self, child: NodeIndex) -> Option<usize> {
        let parent = self.parent(child)?;
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Is `node` attached to the tree under `root`?
    pub fn is_mounted(&self, node: NodeIndex) -> bool {
        self.contains(node) && self.ancestors(node).last() == Some(self.root)
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Append `children` to `parent`, detaching each from any previous parent.
    /// A child that is an ancestor of `parent` is skipped.
    pub fn mount(&mut self, parent: NodeIndex, children: &[NodeIndex]) {
        for &child in children {
            let index = self.children(parent).len();
            self.attach(parent, child, index);
        }
    }

    /// Splice `child` into `parent`'s children at `index` (clamped to the end).
    pub fn insert_child(&mut self, parent: NodeIndex, child: NodeIndex, index: usize) {
        self.attach(parent, child, index);
    }

    fn attach(&mut self, parent: NodeIndex, child: NodeIndex, index: usize) {
        if !self.contains(parent) || !self.contains(child) {
            log::debug!("mount skipped: {parent:?} or {child:?} not in arena");
            return;
        }
        if self.ancestors(parent).any(|a| a == child) {
            log::warn!("refusing to mount {child:?} under its own descendant {parent:?}");
            return;
        }
        self.unmount(child);

        let order = self.child_order.entry(parent).or_default();
        let index = index.min(order.len());
        order.insert(index, child);
        self.graph.add_edge(parent, child, ());

        let depth = self.graph[parent].depth + 1;
        self.set_subtree_depth(child, depth);
        self.invalidate(parent);
    }

    /// Detach `child` from its parent. Returns `false` if it had none.
    /// The subtree stays in the arena and may be mounted again.
    pub fn unmount(&mut self, child: NodeIndex) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        if let Some(edge) = self.graph.find_edge(parent, child) {
            self.graph.remove_edge(edge);
        }
        if let Some(order) = self.child_order.get_mut(&parent) {
            order.retain(|&c| c != child);
        }
        self.set_subtree_depth(child, 0);
        self.invalidate(parent);
        true
    }

    /// Detach `child` only if `parent` is actually its parent.
    pub fn unmount_child(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.unmount(child)
    }

    /// Put `new` where `old` is. `old` ends up detached (still in the arena).
    pub fn replace_with(&mut self, old: NodeIndex, new: NodeIndex) -> bool {
        if old == new {
            return false;
        }
        let Some(parent) = self.parent(old) else {
            return false;
        };
        let Some(position) = self.child_position(old) else {
            return false;
        };
        self.unmount(old);
        self.insert_child(parent, new, position);
        true
    }

    /// Unmount `idx` and delete it with its whole subtree from the arena.
    pub fn remove(&mut self, idx: NodeIndex) -> bool {
        if !self.contains(idx) || idx == self.root {
            return false;
        }
        self.unmount(idx);
        for node in self.descendants(idx) {
            self.child_order.remove(&node);
            if let Some(removed) = self.graph.remove_node(node) {
                self.key_index.remove(&removed.key);
            }
        }
        true
    }

    /// Copy the subtree at `src` in `other` into this arena, detached.
    /// Keys are kept unless they collide here.
    pub fn graft(&mut self, other: &SceneGraph, src: NodeIndex) -> Option<NodeIndex> {
        let node = other.get(src)?;
        let mut copy = Node::with_key(node.key, node.kind.clone());
        copy.transform = node.transform;
        copy.tags = node.tags.clone();
        let idx = self.create(copy);
        for &child in other.children(src) {
            if let Some(c) = self.graft(other, child) {
                self.mount(idx, &[c]);
            }
        }
        Some(idx)
    }

    fn set_subtree_depth(&mut self, idx: NodeIndex, depth: usize) {
        self.graph[idx].depth = depth;
        let children = self.children(idx).to_vec();
        for child in children {
            self.set_subtree_depth(child, depth + 1);
        }
    }

    /// Replace a node's kind data. Geometry changes invalidate bounds.
    pub fn set_kind(&mut self, idx: NodeIndex, kind: NodeKind) {
        let Some(node) = self.graph.node_weight_mut(idx) else {
            return;
        };
        node.kind = kind;
        self.invalidate(idx);
    }

    /// Set the vector of an anchor or handle.
    pub fn set_vector(&mut self, idx: NodeIndex, v: Vector) {
        let Some(node) = self.graph.node_weight_mut(idx) else {
            return;
        };
        match &mut node.kind {
            NodeKind::Anchor { vector }
            | NodeKind::HandleIn { vector }
            | NodeKind::HandleOut { vector } => *vector = v,
            _ => return,
        }
        self.invalidate(idx);
    }

    pub fn set_transform(&mut self, idx: NodeIndex, transform: Option<Matrix>) {
        let Some(node) = self.graph.node_weight_mut(idx) else {
            return;
        };
        if !node.kind.is_graphics() {
            return;
        }
        node.transform = transform.filter(|m| !m.is_identity());
        self.invalidate(idx);
    }

    pub fn set_closed(&mut self, spline: NodeIndex, closed: bool) {
        let Some(node) = self.graph.node_weight_mut(spline) else {
            return;
        };
        if let NodeKind::Spline { closed: c } = &mut node.kind {
            *c = closed;
        } else {
            return;
        }
        self.invalidate(spline);
    }

    // ─── Tags (never touch the bounds cache) ─────────────────────────────

    pub fn has_tag(&self, idx: NodeIndex, tag: StatusTag) -> bool {
        self.get(idx).is_some_and(|n| n.tags.contains(tag))
    }

    pub fn add_tag(&mut self, idx: NodeIndex, tag: StatusTag) {
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.tags.insert(tag);
        }
    }

    pub fn remove_tag(&mut self, idx: NodeIndex, tag: StatusTag) {
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.tags.remove(tag);
        }
    }

    /// Remove `tag` from every node in the arena.
    pub fn clear_tag(&mut self, tag: StatusTag) {
        for node in self.graph.node_weights_mut() {
            node.tags.remove(tag);
        }
    }

    /// Every node currently carrying `tag`, in arena order.
    pub fn tagged(&self, tag: StatusTag) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].tags.contains(tag))
            .collect()
    }

    // ─── Traversal ───────────────────────────────────────────────────────

    /// `idx`, its parent, grandparent … up to the root of its tree.
    pub fn ancestors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        std::iter::successors(Some(idx).filter(|&i| self.contains(i)), move |&i| {
            self.parent(i)
        })
    }

    /// Ancestors excluding `idx` itself, nearest first.
    pub fn proper_ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.ancestors(idx).skip(1).collect()
    }

    /// Graphics ancestors including `idx` itself, nearest first.
    pub fn graphics_ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.ancestors(idx)
            .filter(|&a| self.graph[a].kind.is_graphics())
            .collect()
    }

    /// First ancestor (self included, nearest first) matching `pred`.
    pub fn find_ancestor(
        &self,
        idx: NodeIndex,
        mut pred: impl FnMut(&Node) -> bool,
    ) -> Option<NodeIndex> {
        self.ancestors(idx).find(|&a| pred(&self.graph[a]))
    }

    /// All ancestors (self included) matching `pred`, root first.
    pub fn find_ancestors(
        &self,
        idx: NodeIndex,
        mut pred: impl FnMut(&Node) -> bool,
    ) -> Vec<NodeIndex> {
        let mut found: Vec<_> = self
            .ancestors(idx)
            .filter(|&a| pred(&self.graph[a]))
            .collect();
        found.reverse();
        found
    }

    /// `idx` and everything below it, depth-first pre-order.
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        if !self.contains(idx) {
            return out;
        }
        let mut stack = vec![idx];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// First descendant (self included, pre-order) matching `pred`.
    pub fn find_descendant(
        &self,
        idx: NodeIndex,
        mut pred: impl FnMut(&Node) -> bool,
    ) -> Option<NodeIndex> {
        self.descendants(idx)
            .into_iter()
            .find(|&d| pred(&self.graph[d]))
    }

    /// All descendants (self included, pre-order) matching `pred`.
    pub fn find_descendants(
        &self,
        idx: NodeIndex,
        mut pred: impl FnMut(&Node) -> bool,
    ) -> Vec<NodeIndex> {
        self.descendants(idx)
            .into_iter()
            .filter(|&d| pred(&self.graph[d]))
            .collect()
    }

    /// A descendant of `idx` (self included) with the given key.
    pub fn find_descendant_by_key(&self, idx: NodeIndex, key: NodeKey) -> Option<NodeIndex> {
        let found = self.index_of(key)?;
        self.ancestors(found).any(|a| a == idx).then_some(found)
    }

    /// Children restricted to Canvas/Group/Shape.
    pub fn graphics_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.children(idx)
            .iter()
            .copied()
            .filter(|&c| self.graph[c].kind.is_graphics())
            .collect()
    }

    /// The document's canvas (first Canvas under the root).
    pub fn canvas(&self) -> Option<NodeIndex> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&c| matches!(self.graph[c].kind, NodeKind::Canvas { .. }))
    }

    /// First direct child of `parent` matching `pred`.
    pub fn find_child(
        &self,
        parent: NodeIndex,
        mut pred: impl FnMut(&NodeKind) -> bool,
    ) -> Option<NodeIndex> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| pred(&self.graph[c].kind))
    }
}

impl Index<NodeIndex> for SceneGraph {
    type Output = Node;

    fn index(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }
}
