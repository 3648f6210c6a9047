//! Render-ready view of the editor.
//!
//! A small element tree (tag, attributes, class list, children) that a host
//! can turn into DOM or SVG without knowing the scene graph. Elements that
//! accept pointer input carry a hit-target kind and the key the host sends
//! back in input events.

use crate::editor::EditorState;
use crate::gesture::Gesture;
use crate::input::TargetKind;
use crate::machine::State;
use pl_core::id::NodeKey;
use pl_core::matrix::format_num;
use pl_core::model::{NodeKind, SceneGraph};
use pl_core::vector::Vector;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Radius of control-point and transform-handle markers.
const MARKER_RADIUS: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub tag: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<NodeKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetKind>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub class: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            key: None,
            target: None,
            class: String::new(),
            attrs: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.insert(name, value.into());
        self
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    #[must_use]
    pub fn hit(mut self, target: TargetKind, key: Option<NodeKey>) -> Self {
        self.target = Some(target);
        self.key = key;
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: RenderNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search by key.
    pub fn find(&self, key: NodeKey) -> Option<&RenderNode> {
        if self.key == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    /// Every element (self included) of the given hit-target kind.
    pub fn targets(&self, target: TargetKind) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        self.collect_targets(target, &mut out);
        out
    }

    fn collect_targets<'a>(&'a self, target: TargetKind, out: &mut Vec<&'a RenderNode>) {
        if self.target == Some(target) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_targets(target, out);
        }
    }
}

/// Render the whole editor: toolbar, document list, message line and canvas.
pub fn render(st: &EditorState, state: State) -> RenderNode {
    let sg = &st.graph;
    let mut root = RenderNode::new("div")
        .class("editor")
        .attr("data-mode", format!("{:?}", state.mode).to_lowercase())
        .attr("cursor", state.cursor());

    for &chrome in sg.children(sg.root) {
        match &sg[chrome].kind {
            NodeKind::Identifier { name } => {
                root = root.child(RenderNode::new("h1").text(name.clone()));
            }
            NodeKind::Tools { active, .. } => root = root.child(toolbar(active)),
            NodeKind::Docs { names } if !names.is_empty() => {
                let list = names
                    .iter()
                    .fold(RenderNode::new("ul").class("docs"), |ul, name| {
                        ul.child(RenderNode::new("li").text(name.clone()))
                    });
                root = root.child(list);
            }
            NodeKind::Message { text } if !text.is_empty() => {
                root = root.child(RenderNode::new("p").class("message").text(text.clone()));
            }
            _ => {}
        }
    }
    if let Some(canvas) = sg.canvas() {
        root = root.child(render_canvas(st, canvas));
    }
    root
}

fn toolbar(active: &str) -> RenderNode {
    let button = |name: &'static str, target: TargetKind| {
        let node = RenderNode::new("button").hit(target, None).text(name);
        if name == active { node.class("active") } else { node }
    };
    RenderNode::new("nav")
        .class("tools")
        .child(button("select", TargetKind::ToolSelect))
        .child(button("pen", TargetKind::ToolPen))
}

fn render_canvas(st: &EditorState, canvas: NodeIndex) -> RenderNode {
    let sg = &st.graph;
    let node = &sg[canvas];
    let view_box = match node.kind {
        NodeKind::Canvas { view_box } => view_box,
        _ => Default::default(),
    };
    let mut svg = RenderNode::new("svg")
        .hit(TargetKind::Canvas, Some(node.key))
        .class(node.tags.to_class_list())
        .attr(
            "viewBox",
            format!(
                "{} {} {} {}",
                format_num(view_box.x),
                format_num(view_box.y),
                format_num(view_box.width),
                format_num(view_box.height)
            ),
        );
    if let Some(m) = node.transform {
        svg = svg.attr("transform", m.to_string());
    }
    for child in sg.graphics_children(canvas) {
        svg = svg.child(render_graphics(st, child));
    }
    if let Some(selected) = st.selection.selected.filter(|&n| sg.is_mounted(n)) {
        svg = selection_chrome(sg, selected, svg);
    }
    if let Gesture::Splitter(splitter) = st.gesture
        && let Some(shape) = sg.find_ancestor(splitter.spline, |n| matches!(n.kind, NodeKind::Shape))
    {
        let at = splitter.point.transform(&sg.global_transform(shape));
        svg = svg.child(marker(at).class("splitter"));
    }
    svg
}

fn marker(at: Vector) -> RenderNode {
    RenderNode::new("circle")
        .attr("cx", format_num(at.x))
        .attr("cy", format_num(at.y))
        .attr("r", format_num(MARKER_RADIUS))
}

fn render_graphics(st: &EditorState, idx: NodeIndex) -> RenderNode {
    let sg = &st.graph;
    let node = &sg[idx];
    let mut el = match node.kind {
        NodeKind::Group => RenderNode::new("g").hit(TargetKind::Group, Some(node.key)),
        _ => RenderNode::new("g").hit(TargetKind::Shape, Some(node.key)),
    }
    .class(node.tags.to_class_list());
    if let Some(m) = node.transform {
        el = el.attr("transform", m.to_string());
    }
    match node.kind {
        NodeKind::Group => {
            for child in sg.graphics_children(idx) {
                el = el.child(render_graphics(st, child));
            }
        }
        _ => {
            el = el.child(RenderNode::new("path").attr("d", sg.path_data(idx)));
            if st.selection.pen == Some(idx) {
                el = pen_overlay(sg, idx, el);
            }
        }
    }
    el
}

/// Curves and control points of the pen shape, in the shape's local space.
fn pen_overlay(sg: &SceneGraph, shape: NodeIndex, mut el: RenderNode) -> RenderNode {
    for spline in sg.splines(shape) {
        for curve in sg.spline_curves(spline) {
            if curve.to.is_none() {
                continue;
            }
            let mut d = String::new();
            if let (Some(start), Some(end)) = (curve.curve.start, curve.curve.end) {
                d = match (curve.curve.handle_out, curve.curve.handle_in) {
                    (None, None) => format!("M{} L{}", pair(start), pair(end)),
                    (Some(h), None) | (None, Some(h)) => {
                        format!("M{} Q{} {}", pair(start), pair(h), pair(end))
                    }
                    (Some(h1), Some(h2)) => {
                        format!("M{} C{} {} {}", pair(start), pair(h1), pair(h2), pair(end))
                    }
                };
            }
            el = el.child(
                RenderNode::new("path")
                    .hit(TargetKind::Curve, sg.key(curve.from))
                    .class(sg[curve.from].tags.to_class_list())
                    .attr("d", d),
            );
        }
        for segment in sg.segments(spline) {
            let points = sg.segment_points(segment);
            let anchor = points.anchor.map(|a| a.1);
            for (point, target) in [
                (points.handle_in, TargetKind::HandleIn),
                (points.handle_out, TargetKind::HandleOut),
            ] {
                let (Some((node, at)), Some(anchor)) = (point, anchor) else {
                    continue;
                };
                el = el.child(
                    RenderNode::new("line")
                        .class("arm")
                        .attr("x1", format_num(anchor.x))
                        .attr("y1", format_num(anchor.y))
                        .attr("x2", format_num(at.x))
                        .attr("y2", format_num(at.y)),
                );
                el = el.child(
                    marker(at)
                        .hit(target, sg.key(node))
                        .class(sg[node].tags.to_class_list()),
                );
            }
            if let Some((node, at)) = points.anchor {
                el = el.child(
                    marker(at)
                        .hit(TargetKind::Anchor, sg.key(node))
                        .class(sg[node].tags.to_class_list()),
                );
            }
        }
    }
    el
}

fn pair(v: Vector) -> String {
    format!("{} {}", format_num(v.x), format_num(v.y))
}

/// Bounding box outline plus rotate/scale handles around the selection.
fn selection_chrome(sg: &SceneGraph, selected: NodeIndex, mut svg: RenderNode) -> RenderNode {
    let bounds = sg.global_bounds(selected);
    let key = sg.key(selected);
    let (min, max) = (bounds.min(), bounds.max());
    svg = svg.child(
        RenderNode::new("rect")
            .class("bounds")
            .attr("x", format_num(bounds.x))
            .attr("y", format_num(bounds.y))
            .attr("width", format_num(bounds.width))
            .attr("height", format_num(bounds.height)),
    );
    svg = svg.child(
        marker(Vector::new(max.x, min.y))
            .hit(TargetKind::RotateHandle, key)
            .class("rotate"),
    );
    svg.child(marker(max).hit(TargetKind::ScaleHandle, key).class("scale"))
}
