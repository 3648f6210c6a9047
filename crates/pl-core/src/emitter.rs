//! Emitter: SceneGraph → markup text.
//!
//! Writes the same SVG subset the parser reads, so markup round-trips:
//! groups become `<g>`, shapes become `<path d>`, and every element carries
//! its node key as `id`.

use crate::matrix::format_num;
use crate::model::{NodeKind, SceneGraph};
use crate::rect::Rect;
use petgraph::graph::NodeIndex;
use std::fmt::Write;

/// Emit the document's canvas (or the root, if the root is itself a canvas).
#[must_use]
pub fn emit_document(sg: &SceneGraph) -> String {
    let canvas = match sg.kind(sg.root) {
        Some(NodeKind::Canvas { .. }) => Some(sg.root),
        _ => sg.canvas(),
    };
    canvas.map(|c| emit_canvas(sg, c)).unwrap_or_default()
}

/// Emit a canvas subtree as an `<svg>` element.
#[must_use]
pub fn emit_canvas(sg: &SceneGraph, canvas: NodeIndex) -> String {
    let mut out = String::with_capacity(256);
    let Some(node) = sg.get(canvas) else {
        return out;
    };
    let view_box = match node.kind {
        NodeKind::Canvas { view_box } => view_box,
        _ => Rect::EMPTY,
    };
    let _ = write!(
        out,
        "<svg id=\"{}\" viewBox=\"{} {} {} {}\"",
        node.key,
        format_num(view_box.x),
        format_num(view_box.y),
        format_num(view_box.width),
        format_num(view_box.height)
    );
    emit_transform(&mut out, sg, canvas);
    out.push_str(">\n");
    for &child in sg.children(canvas) {
        emit_node(&mut out, sg, child, 1);
    }
    out.push_str("</svg>\n");
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn emit_transform(out: &mut String, sg: &SceneGraph, idx: NodeIndex) {
    if let Some(m) = sg[idx].transform {
        let _ = write!(out, " transform=\"{m}\"");
    }
}

fn emit_node(out: &mut String, sg: &SceneGraph, idx: NodeIndex, depth: usize) {
    let node = &sg[idx];
    match node.kind {
        NodeKind::Group => {
            indent(out, depth);
            let _ = write!(out, "<g id=\"{}\"", node.key);
            emit_transform(out, sg, idx);
            let children = sg.children(idx);
            if children.is_empty() {
                out.push_str("/>\n");
                return;
            }
            out.push_str(">\n");
            for &child in children {
                emit_node(out, sg, child, depth + 1);
            }
            indent(out, depth);
            out.push_str("</g>\n");
        }
        NodeKind::Shape => {
            indent(out, depth);
            let _ = write!(out, "<path id=\"{}\"", node.key);
            emit_transform(out, sg, idx);
            let _ = writeln!(out, " d=\"{}\"/>", sg.path_data(idx));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeKey;
    use crate::matrix::Matrix;
    use crate::model::Node;
    use crate::vector::Vector;
    use pretty_assertions::assert_eq;

    #[test]
    fn emit_nested_document() {
        let mut sg = SceneGraph::new(Node::doc());
        let canvas = sg.create(
            Node::canvas(Rect::new(0.0, 0.0, 200.0, 100.0)).keyed(NodeKey::intern("emit_canvas")),
        );
        let root = sg.root;
        sg.mount(root, &[canvas]);
        let group = sg.create(
            Node::group()
                .keyed(NodeKey::intern("emit_group"))
                .transformed(Matrix::translation(Vector::new(5.0, 0.5))),
        );
        let empty = sg.create(Node::group().keyed(NodeKey::intern("emit_empty")));
        let shape = sg.create(Node::shape().keyed(NodeKey::intern("emit_shape")));
        let spline = sg.create(Node::spline(false));
        for p in [Vector::new(0.0, 0.0), Vector::new(10.0, 0.0)] {
            let seg = sg.create(Node::segment());
            let a = sg.create(Node::anchor(p));
            sg.mount(seg, &[a]);
            sg.mount(spline, &[seg]);
        }
        sg.mount(shape, &[spline]);
        sg.mount(group, &[shape]);
        sg.mount(canvas, &[group, empty]);

        let expected = "\
<svg id=\"emit_canvas\" viewBox=\"0 0 200 100\">
  <g id=\"emit_group\" transform=\"matrix(1 0 0 1 5 0.5)\">
    <path id=\"emit_shape\" d=\"M0 0 L10 0\"/>
  </g>
  <g id=\"emit_empty\"/>
</svg>
";
        assert_eq!(emit_document(&sg), expected);
    }

    #[test]
    fn empty_canvas() {
        let sg = SceneGraph::new(Node::canvas(Rect::new(0.0, 0.0, 1.5, 2.0)).keyed(NodeKey::intern("bare")));
        assert_eq!(emit_document(&sg), "<svg id=\"bare\" viewBox=\"0 0 1.5 2\">\n</svg>\n");
    }
}
