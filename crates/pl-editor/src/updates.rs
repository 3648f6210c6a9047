//! Update procedures named by transition rules.
//!
//! Each procedure gets the mutable editor state and the triggering event.
//! Missing context (no pointer position, unknown key, nothing selected, no
//! pen shape) makes the procedure a no-op, logged at `debug`.

use crate::editor::EditorState;
use crate::gesture::{Gesture, Splitter, TransformGesture, TransformKind};
use crate::input::InputEvent;
use crate::machine::Update;
use crate::selection::Selection;
use pl_core::model::{Node, NodeKind, SceneGraph};
use pl_core::parser::{MarkupError, parse_markup};
use pl_core::serialize::{self, SerializeError};
use pl_core::status::StatusTag;
use pl_core::vector::Vector;
use petgraph::graph::NodeIndex;
use std::f64::consts::PI;
use std::mem::discriminant;
use thiserror::Error;

/// Why an externally supplied document or payload was rejected.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error("document has no canvas")]
    NoCanvas,
    #[error("expected a JSON list of document names: {0}")]
    Docs(serde_json::Error),
}

pub(crate) fn apply(update: Update, st: &mut EditorState, ev: &InputEvent) {
    match update {
        Update::Bootstrap => bootstrap(st),
        Update::Hover => hover(st, ev),
        Update::StartShift => start_shift(st, ev),
        Update::StartRotate => start_handle_drag(st, ev, TransformKind::Rotate),
        Update::StartScale => start_handle_drag(st, ev, TransformKind::Scale),
        Update::Shift | Update::Rotate | Update::Scale => drag_transform(st, ev),
        Update::EndTransform => end_transform(st),
        Update::CancelTransform => cancel_transform(st),
        Update::Deselect => st.selection.deselect(&mut st.graph),
        Update::DeleteSelection => delete_selection(st),
        Update::EnterPen => enter_pen(st),
        Update::ExitPen => exit_pen(st),
        Update::AddSegment => add_segment(st, ev),
        Update::SetHandles => set_handles(st, ev),
        Update::ReleaseHandles | Update::ReleasePoint => release_point(st),
        Update::ProjectSplitter => project_splitter(st, ev),
        Update::ClearSplitter => clear_splitter(st),
        Update::Split => split(st, ev),
        Update::GrabPoint => grab_point(st, ev),
        Update::MovePoint => move_point(st, ev),
        Update::ImportMarkup => import_markup(st, ev),
        Update::Load => load(st, ev),
        Update::SetDocs => set_docs(st, ev),
        Update::Rename => rename(st, ev),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn pointer(ev: &InputEvent, what: &str) -> Option<Vector> {
    let point = ev.point();
    if point.is_none() {
        log::debug!("{what}: event has no pointer position");
    }
    point
}

/// The mounted node the event's key names.
fn resolve(st: &EditorState, ev: &InputEvent, what: &str) -> Option<NodeIndex> {
    let Some(key) = ev.key else {
        log::debug!("{what}: event has no key");
        return None;
    };
    let found = st
        .graph
        .index_of(key)
        .filter(|&n| st.graph.is_mounted(n));
    if found.is_none() {
        log::debug!("{what}: no node `{key}` in the document");
    }
    found
}

fn shape_of(sg: &SceneGraph, idx: NodeIndex) -> Option<NodeIndex> {
    sg.find_ancestor(idx, |n| matches!(n.kind, NodeKind::Shape))
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    In,
    Out,
}

/// Set, create or (with `None`) remove one handle of a segment.
fn set_handle(sg: &mut SceneGraph, segment: NodeIndex, slot: Slot, value: Option<Vector>) {
    let points = sg.segment_points(segment);
    let existing = match slot {
        Slot::In => points.handle_in,
        Slot::Out => points.handle_out,
    };
    match (existing, value) {
        (Some((node, _)), Some(v)) => sg.set_vector(node, v),
        (None, Some(v)) => {
            let node = sg.create(match slot {
                Slot::In => Node::handle_in(v),
                Slot::Out => Node::handle_out(v),
            });
            sg.mount(segment, &[node]);
        }
        (Some((node, _)), None) => {
            sg.remove(node);
        }
        (None, None) => {}
    }
}

fn set_message(st: &mut EditorState, text: &str) {
    let root = st.graph.root;
    let kind = NodeKind::Message {
        text: text.to_string(),
    };
    match st
        .graph
        .find_child(root, |k| matches!(k, NodeKind::Message { .. }))
    {
        Some(node) => st.graph.set_kind(node, kind),
        None => {
            let node = st.graph.create(Node::new(kind));
            st.graph.mount(root, &[node]);
        }
    }
}

fn reject(st: &mut EditorState, what: &str, err: &ImportError) {
    log::warn!("{what} rejected: {err}");
    set_message(st, &err.to_string());
}

// ─── Select mode ─────────────────────────────────────────────────────────

fn bootstrap(st: &mut EditorState) {
    st.selection.update_frontier(&mut st.graph);
    log::debug!(
        "editor ready: {} frontier nodes",
        st.graph.tagged(StatusTag::Frontier).len()
    );
}

fn hover(st: &mut EditorState, ev: &InputEvent) {
    let Some(point) = pointer(ev, "hover") else {
        return;
    };
    st.selection.update_focus(&mut st.graph, ev.key, point);
}

fn begin_transform(
    sg: &SceneGraph,
    target: NodeIndex,
    kind: TransformKind,
    origin: Vector,
) -> Gesture {
    let center = sg
        .bounds(target)
        .center()
        .transform(&sg.global_transform(target));
    Gesture::Transform(TransformGesture {
        target,
        kind,
        origin,
        center,
        initial: sg[target].transform,
    })
}

fn start_shift(st: &mut EditorState, ev: &InputEvent) {
    let Some(point) = pointer(ev, "startShift") else {
        return;
    };
    let Some(hit) = resolve(st, ev, "startShift") else {
        return;
    };
    let Some(member) = st
        .graph
        .find_ancestor(hit, |n| n.tags.contains(StatusTag::Frontier))
    else {
        log::debug!("startShift: {hit:?} is not on or below the frontier");
        return;
    };
    st.selection.select(&mut st.graph, member);
    st.gesture = begin_transform(&st.graph, member, TransformKind::Shift, point);
}

fn start_handle_drag(st: &mut EditorState, ev: &InputEvent, kind: TransformKind) {
    let Some(point) = pointer(ev, "startTransform") else {
        return;
    };
    let Some(target) = st.selection.selected.filter(|&n| st.graph.is_mounted(n)) else {
        log::debug!("{kind:?} handle grabbed with nothing selected");
        return;
    };
    st.gesture = begin_transform(&st.graph, target, kind, point);
}

fn drag_transform(st: &mut EditorState, ev: &InputEvent) {
    let Some(gesture) = st.gesture.transform().copied() else {
        log::debug!("transform drag without a gesture");
        return;
    };
    let Some(point) = pointer(ev, "transform") else {
        return;
    };
    if !st.graph.is_mounted(gesture.target) {
        log::debug!("transform target {:?} is gone", gesture.target);
        st.gesture = Gesture::None;
        return;
    }
    let Some(delta) = gesture.delta(point) else {
        log::debug!("{:?}: degenerate drag to {point:?}", gesture.kind);
        return;
    };
    let parent = st.graph.parent_transform(gesture.target);
    let Some(local) = gesture.compose(&parent, &delta) else {
        log::debug!("{:?}: drag to {point:?} would collapse {:?}", gesture.kind, gesture.target);
        return;
    };
    st.graph.set_transform(gesture.target, Some(local));
}

fn end_transform(st: &mut EditorState) {
    if let Some(gesture) = st.gesture.transform() {
        st.graph.refresh_bounds(gesture.target);
    }
    st.gesture = Gesture::None;
}

fn cancel_transform(st: &mut EditorState) {
    if let Some(gesture) = st.gesture.transform().copied() {
        st.graph.set_transform(gesture.target, gesture.initial);
        st.graph.refresh_bounds(gesture.target);
    }
    st.gesture = Gesture::None;
}

fn delete_selection(st: &mut EditorState) {
    let Some(target) = st.selection.selected else {
        log::debug!("delete with nothing selected");
        return;
    };
    st.selection.deselect(&mut st.graph);
    st.graph.remove(target);
    st.selection.prune(&mut st.graph);
}

// ─── Pen mode ────────────────────────────────────────────────────────────

fn enter_pen(st: &mut EditorState) {
    let shape = st
        .selection
        .selected
        .filter(|&n| matches!(st.graph.kind(n), Some(NodeKind::Shape)));
    match shape {
        Some(shape) => st.selection.place_pen(&mut st.graph, shape),
        None => st.selection.deselect(&mut st.graph),
    }
    st.selection.remove_focus(&mut st.graph);
    st.gesture = Gesture::None;
}

fn exit_pen(st: &mut EditorState) {
    let shape = st.selection.pen;
    st.selection.remove_pen(&mut st.graph);
    st.gesture = Gesture::None;
    match shape.filter(|&s| st.graph.is_mounted(s)) {
        Some(shape) => {
            st.graph.refresh_bounds(shape);
            st.selection.select(&mut st.graph, shape);
        }
        None => st.selection.deselect(&mut st.graph),
    }
}

/// Where a new pen shape goes: inside the group that was clicked, else the canvas.
fn new_shape_parent(st: &EditorState, ev: &InputEvent) -> Option<NodeIndex> {
    ev.key
        .and_then(|k| st.graph.index_of(k))
        .filter(|&n| st.graph.is_mounted(n))
        .and_then(|hit| {
            st.graph
                .find_ancestor(hit, |n| matches!(n.kind, NodeKind::Group | NodeKind::Canvas { .. }))
        })
        .or_else(|| st.graph.canvas())
}

/// `point` in the local space of `shape`.
fn local_point(st: &EditorState, shape: NodeIndex, point: Vector, what: &str) -> Option<Vector> {
    let local = st.graph.to_local(shape, point);
    if local.is_none() {
        log::debug!("{what}: {shape:?} has a singular transform");
    }
    local
}

fn add_segment(st: &mut EditorState, ev: &InputEvent) {
    let Some(point) = pointer(ev, "addSegment") else {
        return;
    };
    let shape = match st.selection.pen.filter(|&s| st.graph.is_mounted(s)) {
        Some(shape) => shape,
        None => {
            let Some(parent) = new_shape_parent(st, ev) else {
                log::debug!("addSegment: document has no canvas");
                return;
            };
            let shape = st.graph.create(Node::shape());
            st.graph.mount(parent, &[shape]);
            st.selection.place_pen(&mut st.graph, shape);
            shape
        }
    };
    let spline = match st.graph.splines(shape).last() {
        Some(&spline) if !st.graph.is_closed(spline) => spline,
        _ => {
            let spline = st.graph.create(Node::spline(false));
            st.graph.mount(shape, &[spline]);
            spline
        }
    };
    let Some(local) = local_point(st, shape, point, "addSegment") else {
        return;
    };
    let segment = st.graph.create(Node::segment());
    let anchor = st.graph.create(Node::anchor(local));
    st.graph.mount(segment, &[anchor]);
    st.graph.mount(spline, &[segment]);
    st.selection.set_tip(&mut st.graph, anchor);
    st.gesture = Gesture::Handles {
        segment,
        anchor: local,
    };
}

fn set_handles(st: &mut EditorState, ev: &InputEvent) {
    let Gesture::Handles { segment, anchor } = st.gesture else {
        log::debug!("setHandles without a placed segment");
        return;
    };
    let Some(point) = pointer(ev, "setHandles") else {
        return;
    };
    let Some(shape) = shape_of(&st.graph, segment) else {
        log::debug!("setHandles: segment {segment:?} is not in a shape");
        return;
    };
    let Some(out) = local_point(st, shape, point, "setHandles") else {
        return;
    };
    set_handle(&mut st.graph, segment, Slot::Out, Some(out));
    set_handle(&mut st.graph, segment, Slot::In, Some(out.rotate(PI, anchor)));
    if let Some((handle, _)) = st.graph.segment_points(segment).handle_out {
        st.selection.set_tip(&mut st.graph, handle);
    }
}

fn release_point(st: &mut EditorState) {
    st.selection.clear_tip(&mut st.graph);
    st.gesture = Gesture::None;
    if let Some(shape) = st.selection.pen {
        st.graph.refresh_bounds(shape);
    }
}

fn grab_point(st: &mut EditorState, ev: &InputEvent) {
    let Some(node) = resolve(st, ev, "grabPoint") else {
        return;
    };
    let Some(pen) = st.selection.pen else {
        log::debug!("grabPoint: no pen shape");
        return;
    };
    let is_point = st.graph[node].kind.is_control_point();
    if !is_point || !st.graph.ancestors(node).any(|a| a == pen) {
        log::debug!("grabPoint: {node:?} is not a control point of the pen shape");
        return;
    }
    if matches!(st.graph[node].kind, NodeKind::Anchor { .. })
        && let Some(segment) = st.graph.parent(node)
        && let Some(spline) = st.graph.parent(segment)
        && !st.graph.is_closed(spline)
    {
        let segments = st.graph.segments(spline);
        if segments.len() >= 3 && segments.first() == Some(&segment) {
            log::debug!("closing spline {spline:?}");
            st.graph.set_closed(spline, true);
        }
    }
    st.selection.set_tip(&mut st.graph, node);
    st.gesture = Gesture::Adjust { point: node };
}

fn move_point(st: &mut EditorState, ev: &InputEvent) {
    let Gesture::Adjust { point: node } = st.gesture else {
        log::debug!("movePoint without a grabbed point");
        return;
    };
    let Some(point) = pointer(ev, "movePoint") else {
        return;
    };
    let Some(shape) = shape_of(&st.graph, node) else {
        log::debug!("movePoint: {node:?} is not in a shape");
        return;
    };
    let Some(local) = local_point(st, shape, point, "movePoint") else {
        return;
    };
    match st.graph.kind(node) {
        Some(&NodeKind::Anchor { vector }) => {
            let delta = local.minus(vector);
            let handles = st
                .graph
                .parent(node)
                .map(|segment| st.graph.segment_points(segment))
                .unwrap_or_default();
            st.graph.set_vector(node, local);
            for (handle, v) in [handles.handle_in, handles.handle_out].into_iter().flatten() {
                st.graph.set_vector(handle, v.add(delta));
            }
        }
        Some(NodeKind::HandleIn { .. } | NodeKind::HandleOut { .. }) => {
            st.graph.set_vector(node, local);
        }
        _ => log::debug!("movePoint: {node:?} is not a control point"),
    }
}

/// The curve a `curve` target names: its spline and the segments it joins.
fn curve_at(st: &EditorState, ev: &InputEvent, what: &str) -> Option<(NodeIndex, NodeIndex, NodeIndex)> {
    let from = resolve(st, ev, what)?;
    if !matches!(st.graph.kind(from), Some(NodeKind::Segment)) {
        log::debug!("{what}: {from:?} is not a segment");
        return None;
    }
    let spline = st.graph.parent(from)?;
    if !st.selection.pen.is_some_and(|pen| st.graph.ancestors(spline).any(|a| a == pen)) {
        log::debug!("{what}: {from:?} is not on the pen shape");
        return None;
    }
    let Some(to) = st.graph.next_segment(spline, from) else {
        log::debug!("{what}: no curve follows {from:?} in an open spline");
        return None;
    };
    Some((spline, from, to))
}

/// Project the document-space `point` onto the curve `from → to`.
fn project(st: &EditorState, spline: NodeIndex, from: NodeIndex, to: NodeIndex, point: Vector) -> Option<(Splitter, f64)> {
    let shape = shape_of(&st.graph, spline)?;
    let local = local_point(st, shape, point, "project")?;
    let projection = st
        .graph
        .curve_between(from, to)
        .project(local, st.config.projection_accuracy)?;
    let on_curve = projection.point.transform(&st.graph.global_transform(shape));
    let splitter = Splitter {
        spline,
        from,
        to,
        t: projection.t,
        point: projection.point,
    };
    Some((splitter, on_curve.minus(point).length()))
}

fn project_splitter(st: &mut EditorState, ev: &InputEvent) {
    let found = pointer(ev, "projectSplitter").and_then(|point| {
        let (spline, from, to) = curve_at(st, ev, "projectSplitter")?;
        project(st, spline, from, to, point)
    });
    st.gesture = match found {
        Some((splitter, distance)) if distance <= st.config.splitter_tolerance => {
            Gesture::Splitter(splitter)
        }
        _ => Gesture::None,
    };
}

fn clear_splitter(st: &mut EditorState) {
    if st.gesture.splitter().is_some() {
        st.gesture = Gesture::None;
    }
}

fn split(st: &mut EditorState, ev: &InputEvent) {
    let Some((spline, from, to)) = curve_at(st, ev, "split") else {
        return;
    };
    let hovered = st
        .gesture
        .splitter()
        .filter(|s| s.from == from && s.to == to)
        .map(|s| s.t);
    let t = match hovered {
        Some(t) => t,
        None => {
            let Some(point) = pointer(ev, "split") else {
                return;
            };
            let Some((splitter, _)) = project(st, spline, from, to, point) else {
                log::debug!("split: degenerate curve");
                return;
            };
            splitter.t
        }
    };
    let Some(halves) = st.graph.curve_between(from, to).split(t) else {
        log::debug!("split: degenerate curve");
        return;
    };
    let Some(index) = st.graph.child_position(from).map(|p| p + 1) else {
        return;
    };

    set_handle(&mut st.graph, from, Slot::Out, halves.left.handle_out);
    set_handle(&mut st.graph, to, Slot::In, halves.right.handle_in);

    let segment = st.graph.create(Node::segment());
    let anchor = st.graph.create(Node::anchor(halves.point));
    st.graph.mount(segment, &[anchor]);
    set_handle(&mut st.graph, segment, Slot::In, halves.left.handle_in);
    set_handle(&mut st.graph, segment, Slot::Out, halves.right.handle_out);
    st.graph.insert_child(spline, segment, index);

    st.selection.set_tip(&mut st.graph, anchor);
    st.gesture = Gesture::Adjust { point: anchor };
}

// ─── Document-level ──────────────────────────────────────────────────────

fn import_markup(st: &mut EditorState, ev: &InputEvent) {
    let Some(text) = ev.text.as_deref() else {
        log::debug!("markup event without text");
        return;
    };
    match parse_markup(text) {
        Ok(scratch) => replace_canvas(st, &scratch),
        Err(err) => reject(st, "markup", &err.into()),
    }
}

/// Swap the live canvas for the canvas of `scratch`, in the same position.
fn replace_canvas(st: &mut EditorState, scratch: &SceneGraph) {
    st.gesture = Gesture::None;
    st.selection.reset(&mut st.graph);
    let root = st.graph.root;
    let old = st.graph.canvas();
    let position = old
        .and_then(|c| st.graph.child_position(c))
        .unwrap_or(st.graph.children(root).len());
    if let Some(old) = old {
        st.graph.remove(old);
    }
    if let Some(canvas) = st.graph.graft(scratch, scratch.root) {
        st.graph.insert_child(root, canvas, position);
    }
    st.selection.prune(&mut st.graph);
    set_message(st, "");
}

fn load(st: &mut EditorState, ev: &InputEvent) {
    let Some(text) = ev.text.as_deref() else {
        log::debug!("load event without text");
        return;
    };
    match load_document(text) {
        Ok(doc) => adopt_document(st, doc),
        Err(err) => reject(st, "load", &err),
    }
}

fn load_document(text: &str) -> Result<SceneGraph, ImportError> {
    let doc = serialize::from_json(text)?;
    if !matches!(doc.kind(doc.root), Some(NodeKind::Doc)) || doc.canvas().is_none() {
        return Err(ImportError::NoCanvas);
    }
    Ok(doc)
}

/// Make `doc` the live document, keeping the chrome nodes it lacks.
fn adopt_document(st: &mut EditorState, mut doc: SceneGraph) {
    let root = doc.root;
    for &chrome in st.graph.children(st.graph.root) {
        let kind = &st.graph[chrome].kind;
        if kind.is_persistent() {
            continue;
        }
        let present = doc
            .find_child(root, |k| discriminant(k) == discriminant(kind))
            .is_some();
        if !present && let Some(copy) = doc.graft(&st.graph, chrome) {
            doc.mount(root, &[copy]);
        }
    }
    st.graph = doc;
    st.gesture = Gesture::None;
    st.selection = Selection::from_tags(&mut st.graph);
    set_message(st, "");
}

fn set_docs(st: &mut EditorState, ev: &InputEvent) {
    let Some(text) = ev.text.as_deref() else {
        log::debug!("docs event without text");
        return;
    };
    let names: Vec<String> = match serde_json::from_str(text) {
        Ok(names) => names,
        Err(err) => {
            reject(st, "docs", &ImportError::Docs(err));
            return;
        }
    };
    let root = st.graph.root;
    match st
        .graph
        .find_child(root, |k| matches!(k, NodeKind::Docs { .. }))
    {
        Some(node) => st.graph.set_kind(node, NodeKind::Docs { names }),
        None => {
            let node = st.graph.create(Node::docs(names));
            st.graph.mount(root, &[node]);
        }
    }
}

fn rename(st: &mut EditorState, ev: &InputEvent) {
    let Some(name) = ev.text.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        log::debug!("rename without a name");
        return;
    };
    let root = st.graph.root;
    let kind = NodeKind::Identifier {
        name: name.to_string(),
    };
    match st
        .graph
        .find_child(root, |k| matches!(k, NodeKind::Identifier { .. }))
    {
        Some(node) => st.graph.set_kind(node, kind),
        None => {
            let node = st.graph.create(Node::new(kind));
            st.graph.insert_child(root, node, 0);
        }
    }
}
