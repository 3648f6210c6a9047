//! Memoized bounds and transform chains.
//!
//! Each graphics node caches its bounds in its own local space (before its
//! own transform is applied). A geometric change anywhere below a graphics
//! node clears that node's cache and the cache of every graphics ancestor,
//! so the next read recomputes from the leaves.

use crate::matrix::Matrix;
use crate::model::{NodeKind, SceneGraph};
use crate::rect::Rect;
use crate::vector::Vector;
use petgraph::graph::NodeIndex;

impl SceneGraph {
    /// Clear the memoized bounds of `idx` and all its graphics ancestors.
    pub fn invalidate(&self, idx: NodeIndex) {
        for a in self.ancestors(idx) {
            let node = &self[a];
            if node.kind.is_graphics() {
                node.bounds.set(None);
            }
        }
    }

    /// Bounds of `idx` in its own local space. Memoized for graphics nodes.
    pub fn bounds(&self, idx: NodeIndex) -> Rect {
        let Some(node) = self.get(idx) else {
            return Rect::EMPTY;
        };
        match &node.kind {
            NodeKind::Canvas { .. } | NodeKind::Group | NodeKind::Shape => {
                if let Some(cached) = node.bounds.get() {
                    return cached;
                }
                let computed = self.compute_container_bounds(idx);
                node.bounds.set(Some(computed));
                computed
            }
            NodeKind::Spline { .. } => self.spline_bounds(idx),
            NodeKind::Segment => {
                let pts = self.segment_points(idx);
                Rect::enclosing(
                    [pts.anchor, pts.handle_in, pts.handle_out]
                        .into_iter()
                        .flatten()
                        .map(|p| p.1),
                )
                .unwrap_or(Rect::EMPTY)
            }
            NodeKind::Anchor { vector }
            | NodeKind::HandleIn { vector }
            | NodeKind::HandleOut { vector } => Rect::at(*vector),
            NodeKind::Doc
            | NodeKind::Identifier { .. }
            | NodeKind::Tools { .. }
            | NodeKind::Docs { .. }
            | NodeKind::Message { .. } => Rect::EMPTY,
        }
    }

    /// Union of each child's bounds mapped through that child's transform.
    fn compute_container_bounds(&self, idx: NodeIndex) -> Rect {
        self.children(idx)
            .iter()
            .filter_map(|&child| match &self[child].kind {
                k if k.is_graphics() => {
                    Some(self.bounds(child).transform(&self.local_transform(child)))
                }
                NodeKind::Spline { .. } => Some(self.spline_bounds(child)),
                _ => None,
            })
            .reduce(|acc, r| acc.bounding_rect(&r))
            .unwrap_or(Rect::EMPTY)
    }

    fn spline_bounds(&self, spline: NodeIndex) -> Rect {
        self.spline_curves(spline)
            .iter()
            .map(|c| c.curve.bounds())
            .reduce(|acc, r| acc.bounding_rect(&r))
            .unwrap_or(Rect::EMPTY)
    }

    /// The node's own transform, identity when it has none.
    pub fn local_transform(&self, idx: NodeIndex) -> Matrix {
        self.get(idx)
            .and_then(|n| n.transform)
            .unwrap_or(Matrix::IDENTITY)
    }

    /// Local-to-document transform: every graphics ancestor's transform,
    /// composed root first, ending with the node's own.
    pub fn global_transform(&self, idx: NodeIndex) -> Matrix {
        self.find_ancestors(idx, |n| n.kind.is_graphics())
            .into_iter()
            .fold(Matrix::IDENTITY, |acc, a| {
                acc.multiply(&self.local_transform(a))
            })
    }

    /// Transform of the parent space, i.e. the global transform without the
    /// node's own contribution.
    pub fn parent_transform(&self, idx: NodeIndex) -> Matrix {
        self.parent(idx)
            .map(|p| self.global_transform(p))
            .unwrap_or(Matrix::IDENTITY)
    }

    /// Bounds of `idx` in document space.
    pub fn global_bounds(&self, idx: NodeIndex) -> Rect {
        self.bounds(idx).transform(&self.global_transform(idx))
    }

    /// Map a document-space point into the local space of `idx`, `None` when
    /// that space is collapsed.
    pub fn to_local(&self, idx: NodeIndex, point: Vector) -> Option<Vector> {
        let inverse = self.global_transform(idx).invert()?;
        Some(point.transform(&inverse))
    }

    /// Recompute and cache bounds for `idx` and every graphics ancestor.
    pub fn refresh_bounds(&self, idx: NodeIndex) {
        for a in self.graphics_ancestors(idx) {
            let _ = self.bounds(a);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::Matrix;
    use crate::model::{Node, SceneGraph};
    use crate::rect::Rect;
    use crate::vector::Vector;
    use petgraph::graph::NodeIndex;

    fn line_shape(sg: &mut SceneGraph, a: Vector, b: Vector) -> (NodeIndex, NodeIndex) {
        let shape = sg.create(Node::shape());
        let spline = sg.create(Node::spline(false));
        let mut anchors = Vec::new();
        for p in [a, b] {
            let seg = sg.create(Node::segment());
            let anchor = sg.create(Node::anchor(p));
            sg.mount(seg, &[anchor]);
            sg.mount(spline, &[seg]);
            anchors.push(anchor);
        }
        sg.mount(shape, &[spline]);
        (shape, anchors[1])
    }

    #[test]
    fn empty_shape_has_empty_bounds() {
        let mut sg = SceneGraph::document("doc", Rect::EMPTY);
        let canvas = sg.canvas().unwrap();
        let shape = sg.create(Node::shape());
        sg.mount(canvas, &[shape]);
        assert_eq!(sg.bounds(shape), Rect::EMPTY);
    }

    #[test]
    fn group_bounds_apply_child_transform() {
        let mut sg = SceneGraph::document("doc", Rect::EMPTY);
        let canvas = sg.canvas().unwrap();
        let group = sg.create(Node::group());
        let (shape, _) = line_shape(&mut sg, Vector::new(0.0, 0.0), Vector::new(10.0, 10.0));
        sg.mount(canvas, &[group]);
        sg.mount(group, &[shape]);
        sg.set_transform(shape, Some(Matrix::translation(Vector::new(5.0, 0.0))));

        assert_eq!(sg.bounds(shape), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(sg.bounds(group), Rect::new(5.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn deep_vector_edit_invalidates_every_ancestor() {
        let mut sg = SceneGraph::document("doc", Rect::EMPTY);
        let canvas = sg.canvas().unwrap();
        let outer = sg.create(Node::group());
        let inner = sg.create(Node::group());
        let (shape, end_anchor) = line_shape(&mut sg, Vector::ZERO, Vector::new(10.0, 10.0));
        sg.mount(canvas, &[outer]);
        sg.mount(outer, &[inner]);
        sg.mount(inner, &[shape]);
        sg.set_transform(inner, Some(Matrix::scale(2.0, Vector::ZERO)));

        assert_eq!(sg.bounds(outer), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert!(sg[outer].cached_bounds().is_some());

        sg.set_vector(end_anchor, Vector::new(30.0, 5.0));
        for n in [shape, inner, outer, canvas] {
            assert!(sg[n].cached_bounds().is_none(), "stale cache on {n:?}");
        }
        assert_eq!(sg.bounds(outer), Rect::new(0.0, 0.0, 60.0, 10.0));
    }

    #[test]
    fn global_transform_composes_root_first() {
        let mut sg = SceneGraph::document("doc", Rect::EMPTY);
        let canvas = sg.canvas().unwrap();
        let group = sg.create(Node::group().transformed(Matrix::translation(Vector::new(100.0, 0.0))));
        let shape = sg.create(Node::shape().transformed(Matrix::scale(2.0, Vector::ZERO)));
        sg.mount(canvas, &[group]);
        sg.mount(group, &[shape]);

        // scale first (inner), then translate (outer)
        let p = Vector::new(1.0, 1.0).transform(&sg.global_transform(shape));
        assert_eq!(p, Vector::new(102.0, 2.0));
        assert_eq!(sg.to_local(shape, Vector::new(102.0, 2.0)), Some(Vector::new(1.0, 1.0)));
        assert_eq!(
            sg.parent_transform(shape),
            Matrix::translation(Vector::new(100.0, 0.0))
        );
    }
}
