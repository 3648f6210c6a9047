//! Selection, pen, frontier, focus and tip.
//!
//! `Selection` holds the references; the status tags on the scene nodes mirror
//! them so renderers and the persisted document see the same state. Every
//! operation here keeps the two in step:
//!
//! - at most one node is `selected`, at most one is `pen`, never both;
//! - `frontier` is the set of nodes the next click can pick: the siblings of
//!   the active node and the siblings of each of its ancestors below the
//!   canvas, or the canvas children when nothing is active;
//! - `focus` (hover) is always a frontier member;
//! - `tip` marks the control point under a pen drag, `containsTip` its segment.

use pl_core::id::NodeKey;
use pl_core::model::{NodeKind, SceneGraph};
use pl_core::status::StatusTag;
use pl_core::vector::Vector;
use petgraph::graph::NodeIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected: Option<NodeIndex>,
    pub pen: Option<NodeIndex>,
    pub focus: Option<NodeIndex>,
    pub tip: Option<NodeIndex>,
}

impl Selection {
    /// Rebuild from the tags a loaded document carries. Only `selected`
    /// survives; pen/focus/tip are interaction state and are dropped.
    pub fn from_tags(sg: &mut SceneGraph) -> Self {
        for tag in [StatusTag::Pen, StatusTag::Focus, StatusTag::Tip, StatusTag::ContainsTip] {
            sg.clear_tag(tag);
        }
        let mut selection = Selection::default();
        let selected = sg
            .tagged(StatusTag::Selected)
            .into_iter()
            .find(|&n| sg.is_mounted(n) && is_pickable(sg, n));
        match selected {
            Some(node) => selection.select(sg, node),
            None => selection.deselect(sg),
        }
        selection
    }

    /// The node the frontier is computed from: the selection, else the pen.
    pub fn active(&self) -> Option<NodeIndex> {
        self.selected.or(self.pen)
    }

    // ─── Selected / pen ──────────────────────────────────────────────────

    pub fn select(&mut self, sg: &mut SceneGraph, node: NodeIndex) {
        self.drop_active(sg);
        self.selected = Some(node);
        sg.add_tag(node, StatusTag::Selected);
        self.update_frontier(sg);
    }

    pub fn deselect(&mut self, sg: &mut SceneGraph) {
        if let Some(node) = self.selected.take() {
            sg.remove_tag(node, StatusTag::Selected);
        }
        self.update_frontier(sg);
    }

    /// Put the pen on `shape`. Clears any selection.
    pub fn place_pen(&mut self, sg: &mut SceneGraph, shape: NodeIndex) {
        self.drop_active(sg);
        self.pen = Some(shape);
        sg.add_tag(shape, StatusTag::Pen);
        self.update_frontier(sg);
    }

    pub fn remove_pen(&mut self, sg: &mut SceneGraph) {
        if let Some(node) = self.pen.take() {
            sg.remove_tag(node, StatusTag::Pen);
        }
        self.clear_tip(sg);
        self.update_frontier(sg);
    }

    fn drop_active(&mut self, sg: &mut SceneGraph) {
        sg.clear_tag(StatusTag::Selected);
        sg.clear_tag(StatusTag::Pen);
        self.selected = None;
        self.pen = None;
    }

    // ─── Frontier ────────────────────────────────────────────────────────

    /// Recompute the frontier and re-tag it. Drops a focus that fell outside.
    pub fn update_frontier(&mut self, sg: &mut SceneGraph) {
        sg.clear_tag(StatusTag::Frontier);
        for node in frontier_of(sg, self.active()) {
            sg.add_tag(node, StatusTag::Frontier);
        }
        if let Some(focus) = self.focus
            && !sg.has_tag(focus, StatusTag::Frontier)
        {
            self.remove_focus(sg);
        }
    }

    // ─── Focus ───────────────────────────────────────────────────────────

    /// Focus `node` if it is a frontier member; otherwise leave focus unset.
    pub fn focus(&mut self, sg: &mut SceneGraph, node: NodeIndex) {
        self.remove_focus(sg);
        if !sg.has_tag(node, StatusTag::Frontier) {
            log::trace!("focus: {node:?} is not on the frontier");
            return;
        }
        self.focus = Some(node);
        sg.add_tag(node, StatusTag::Focus);
    }

    pub fn remove_focus(&mut self, sg: &mut SceneGraph) {
        if let Some(node) = self.focus.take() {
            sg.remove_tag(node, StatusTag::Focus);
        }
    }

    /// Hover resolution: focus the frontier ancestor of the hovered node,
    /// provided its local bounds contain the pointer.
    pub fn update_focus(&mut self, sg: &mut SceneGraph, key: Option<NodeKey>, point: Vector) {
        let member = key
            .and_then(|k| sg.index_of(k))
            .and_then(|hit| sg.find_ancestor(hit, |n| n.tags.contains(StatusTag::Frontier)));
        let Some(member) = member else {
            self.remove_focus(sg);
            return;
        };
        let inside = sg
            .to_local(member, point)
            .is_some_and(|local| sg.bounds(member).contains(local));
        if inside {
            self.focus(sg, member);
        } else {
            self.remove_focus(sg);
        }
    }

    // ─── Tip ─────────────────────────────────────────────────────────────

    /// Mark `point` (an anchor or handle) as the tip.
    pub fn set_tip(&mut self, sg: &mut SceneGraph, point: NodeIndex) {
        self.clear_tip(sg);
        self.tip = Some(point);
        sg.add_tag(point, StatusTag::Tip);
        if let Some(segment) = sg.parent(point) {
            sg.add_tag(segment, StatusTag::ContainsTip);
        }
    }

    pub fn clear_tip(&mut self, sg: &mut SceneGraph) {
        if self.tip.take().is_some() {
            sg.clear_tag(StatusTag::Tip);
            sg.clear_tag(StatusTag::ContainsTip);
        }
    }

    // ─── Housekeeping ────────────────────────────────────────────────────

    /// Drop everything: no selection, pen, focus or tip, anywhere in `sg`.
    pub fn reset(&mut self, sg: &mut SceneGraph) {
        for tag in [
            StatusTag::Selected,
            StatusTag::Pen,
            StatusTag::Focus,
            StatusTag::Tip,
            StatusTag::ContainsTip,
        ] {
            sg.clear_tag(tag);
        }
        *self = Selection::default();
        self.update_frontier(sg);
    }

    /// Forget references to nodes no longer mounted, then re-tag the frontier.
    /// Call after anything that removes or replaces subtrees.
    pub fn prune(&mut self, sg: &mut SceneGraph) {
        for (slot, tag) in [
            (&mut self.selected, StatusTag::Selected),
            (&mut self.pen, StatusTag::Pen),
            (&mut self.focus, StatusTag::Focus),
        ] {
            if let Some(node) = *slot
                && !sg.is_mounted(node)
            {
                sg.remove_tag(node, tag);
                *slot = None;
            }
        }
        if let Some(tip) = self.tip
            && !sg.is_mounted(tip)
        {
            self.clear_tip(sg);
        }
        self.update_frontier(sg);
    }

    /// Do the tags on `sg` mirror this selection exactly?
    pub fn mirrors(&self, sg: &SceneGraph) -> bool {
        let as_vec = |n: Option<NodeIndex>| n.into_iter().collect::<Vec<_>>();
        sg.tagged(StatusTag::Selected) == as_vec(self.selected)
            && sg.tagged(StatusTag::Pen) == as_vec(self.pen)
            && sg.tagged(StatusTag::Focus) == as_vec(self.focus)
            && sg.tagged(StatusTag::Tip) == as_vec(self.tip)
    }
}

/// Groups and shapes below the canvas can be picked.
fn is_pickable(sg: &SceneGraph, node: NodeIndex) -> bool {
    matches!(sg.kind(node), Some(NodeKind::Group | NodeKind::Shape))
}

/// The frontier for `active`, in document order, without duplicates.
pub fn frontier_of(sg: &SceneGraph, active: Option<NodeIndex>) -> Vec<NodeIndex> {
    let Some(canvas) = sg.canvas() else {
        return Vec::new();
    };
    let Some(mut node) = active.filter(|&a| a != canvas && sg.is_mounted(a)) else {
        return sg.graphics_children(canvas);
    };
    let mut out = Vec::new();
    while let Some(parent) = sg.parent(node) {
        for sibling in sg.graphics_children(parent) {
            if !out.contains(&sibling) {
                out.push(sibling);
            }
        }
        if parent == canvas || parent == sg.root {
            break;
        }
        node = parent;
    }
    out
}
