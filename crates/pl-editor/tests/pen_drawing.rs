//! Integration tests: drawing and editing splines with the pen tool.

use pl_core::NodeIndex;
use pl_core::id::NodeKey;
use pl_core::model::NodeKind;
use pl_core::status::StatusTag;
use pl_core::vector::Vector;
use pl_editor::{Editor, EventType, Gesture, InputEvent, Label, Mode, State, TargetKind};
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// A bootstrapped editor in pen mode on an empty canvas.
fn pen_editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut editor = Editor::new().unwrap();
    editor.dispatch(InputEvent::go());
    editor.dispatch(InputEvent::new(EventType::Mousedown).on(TargetKind::ToolPen));
    assert_eq!(editor.state(), pen(Label::Idle));
    editor
}

fn pen(label: Label) -> State {
    State::new(Mode::Pen, label)
}

/// Click (press and release without moving) on empty canvas.
fn click(editor: &mut Editor, x: f64, y: f64) {
    editor.dispatch(InputEvent::mousedown(TargetKind::Canvas, x, y));
    editor.dispatch(InputEvent::mouseup(x, y));
}

fn pen_shape(editor: &Editor) -> NodeIndex {
    editor.selection().pen.expect("expected a pen shape")
}

fn only_spline(editor: &Editor) -> NodeIndex {
    let splines = editor.graph().splines(pen_shape(editor));
    assert_eq!(splines.len(), 1);
    splines[0]
}

fn key(editor: &Editor, idx: NodeIndex) -> NodeKey {
    editor.graph().key(idx).expect("expected a keyed node")
}

fn anchor_of(editor: &Editor, segment: NodeIndex) -> (NodeIndex, Vector) {
    editor
        .graph()
        .segment_points(segment)
        .anchor
        .expect("expected an anchor")
}

fn triangle(editor: &mut Editor) -> NodeIndex {
    click(editor, 0.0, 0.0);
    click(editor, 100.0, 0.0);
    click(editor, 100.0, 100.0);
    only_spline(editor)
}

// ─── Drawing ─────────────────────────────────────────────────────────────

#[test]
fn first_click_creates_shape_spline_segment_anchor() {
    let mut editor = pen_editor();
    let snap = editor.dispatch(InputEvent::mousedown(TargetKind::Canvas, 10.0, 10.0));
    assert_eq!(snap.update, Some("addSegment"));
    assert_eq!(editor.state(), pen(Label::SettingHandles));

    let sg = editor.graph();
    let shape = pen_shape(&editor);
    assert_eq!(sg.kind(shape), Some(&NodeKind::Shape));
    assert_eq!(sg.parent(shape), sg.canvas());
    assert!(sg.has_tag(shape, StatusTag::Pen));

    let spline = only_spline(&editor);
    let segments = sg.segments(spline);
    assert_eq!(segments.len(), 1);
    let (anchor, at) = anchor_of(&editor, segments[0]);
    assert_eq!(at, Vector::new(10.0, 10.0));
    assert_eq!(editor.selection().tip, Some(anchor));
    assert!(sg.has_tag(anchor, StatusTag::Tip));
    assert!(sg.has_tag(segments[0], StatusTag::ContainsTip));
}

#[test]
fn release_clears_tip_and_returns_to_idle() {
    let mut editor = pen_editor();
    click(&mut editor, 10.0, 10.0);
    assert_eq!(editor.state(), pen(Label::Idle));
    assert_eq!(editor.selection().tip, None);
    assert!(editor.graph().tagged(StatusTag::Tip).is_empty());
    assert!(editor.graph().tagged(StatusTag::ContainsTip).is_empty());
}

#[test]
fn clicks_append_line_segments() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    assert_eq!(editor.graph().segments(spline).len(), 3);
    assert_eq!(
        editor.graph().path_data(pen_shape(&editor)),
        "M0 0 L100 0 L100 100"
    );
}

#[test]
fn dragging_sets_symmetric_handles() {
    let mut editor = pen_editor();
    editor.dispatch(InputEvent::mousedown(TargetKind::Canvas, 0.0, 0.0));
    editor.dispatch(InputEvent::mousemove(0.0, 20.0));
    editor.dispatch(InputEvent::mouseup(0.0, 20.0));
    click(&mut editor, 50.0, 0.0);

    let spline = only_spline(&editor);
    let first = editor.graph().segments(spline)[0];
    let points = editor.graph().segment_points(first);
    assert_eq!(points.handle_out.map(|h| h.1), Some(Vector::new(0.0, 20.0)));
    assert!(points.handle_in.unwrap().1.approx_eq(Vector::new(0.0, -20.0), 1e-12));
    assert_eq!(
        editor.graph().path_data(pen_shape(&editor)),
        "M0 0 Q0 20 50 0"
    );
}

#[test]
fn new_shape_goes_into_clicked_group() {
    let mut editor = pen_editor();
    editor.dispatch(InputEvent::escape());
    editor.dispatch(InputEvent::with_payload(
        EventType::Markup,
        r#"<svg id="stage" viewBox="0 0 100 100"><g id="layer" transform="translate(10 10)"><path id="dot" d="M0 0 L5 5"/></g></svg>"#,
    ));
    editor.dispatch(InputEvent::new(EventType::Mousedown).on(TargetKind::ToolPen));
    editor.dispatch(
        InputEvent::mousedown(TargetKind::Shape, 12.0, 12.0).keyed(NodeKey::intern("dot")),
    );

    let shape = pen_shape(&editor);
    let layer = editor.graph().index_of(NodeKey::intern("layer")).unwrap();
    assert_eq!(editor.graph().parent(shape), Some(layer));
    // anchors are stored in the shape's local space
    let segment = editor.graph().segments(only_spline(&editor))[0];
    assert!(anchor_of(&editor, segment).1.approx_eq(Vector::new(2.0, 2.0), 1e-9));
}

#[test]
fn escape_leaves_pen_and_selects_shape() {
    let mut editor = pen_editor();
    triangle(&mut editor);
    let shape = pen_shape(&editor);
    let snap = editor.dispatch(InputEvent::escape());
    assert_eq!(snap.update, Some("exitPen"));
    assert_eq!(editor.state(), State::new(Mode::Select, Label::Idle));
    assert_eq!(editor.selection().pen, None);
    assert_eq!(editor.selection().selected, Some(shape));
    assert_eq!(editor.editor_state().tools(), Some(("select", "default")));
    assert!(snap.markup.contains("d=\"M0 0 L100 0 L100 100\""));
}

#[test]
fn pen_continues_selected_shape() {
    let mut editor = pen_editor();
    triangle(&mut editor);
    let shape = pen_shape(&editor);
    editor.dispatch(InputEvent::escape());
    editor.dispatch(InputEvent::new(EventType::Mousedown).on(TargetKind::ToolPen));
    assert_eq!(editor.selection().pen, Some(shape));
    assert_eq!(editor.selection().selected, None);

    click(&mut editor, 0.0, 100.0);
    assert_eq!(editor.graph().segments(only_spline(&editor)).len(), 4);
}

// ─── Closing ─────────────────────────────────────────────────────────────

#[test]
fn grabbing_first_anchor_closes_spline() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    let (first, _) = anchor_of(&editor, editor.graph().segments(spline)[0]);

    let snap = editor.dispatch(
        InputEvent::mousedown(TargetKind::Anchor, 0.0, 0.0).keyed(key(&editor, first)),
    );
    assert_eq!(snap.update, Some("grabPoint"));
    assert_eq!(editor.state(), pen(Label::AdjustingSegment));
    assert!(editor.graph().is_closed(spline));
    editor.dispatch(InputEvent::mouseup(0.0, 0.0));
    assert_eq!(editor.state(), pen(Label::Idle));

    let d = editor.graph().path_data(pen_shape(&editor));
    assert!(d.starts_with("M0 0 L100 0 L100 100"));
    assert!(d.ends_with('Z'));
}

#[test]
fn click_after_closing_starts_new_spline() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    let (first, _) = anchor_of(&editor, editor.graph().segments(spline)[0]);
    editor.dispatch(InputEvent::mousedown(TargetKind::Anchor, 0.0, 0.0).keyed(key(&editor, first)));
    editor.dispatch(InputEvent::mouseup(0.0, 0.0));

    click(&mut editor, 200.0, 200.0);
    let splines = editor.graph().splines(pen_shape(&editor));
    assert_eq!(splines.len(), 2);
    assert_eq!(editor.graph().segments(splines[1]).len(), 1);
}

#[test]
fn grabbing_first_anchor_of_two_segments_does_not_close() {
    let mut editor = pen_editor();
    click(&mut editor, 0.0, 0.0);
    click(&mut editor, 100.0, 0.0);
    let spline = only_spline(&editor);
    let (first, _) = anchor_of(&editor, editor.graph().segments(spline)[0]);
    editor.dispatch(InputEvent::mousedown(TargetKind::Anchor, 0.0, 0.0).keyed(key(&editor, first)));
    assert!(!editor.graph().is_closed(spline));
}

// ─── Adjusting ───────────────────────────────────────────────────────────

#[test]
fn dragging_anchor_moves_it() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    let segment = editor.graph().segments(spline)[1];
    let (anchor, _) = anchor_of(&editor, segment);

    editor.dispatch(InputEvent::mousedown(TargetKind::Anchor, 100.0, 0.0).keyed(key(&editor, anchor)));
    assert_eq!(editor.editor_state().tools(), Some(("pen", "grabbing")));
    editor.dispatch(InputEvent::mousemove(120.0, -10.0));
    let snap = editor.dispatch(InputEvent::mouseup(120.0, -10.0));
    assert_eq!(snap.update, Some("releasePoint"));
    assert_eq!(anchor_of(&editor, segment).1, Vector::new(120.0, -10.0));
    assert_eq!(
        editor.graph().path_data(pen_shape(&editor)),
        "M0 0 L120 -10 L100 100"
    );
}

#[test]
fn points_of_other_shapes_cannot_be_grabbed() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    let (foreign, _) = anchor_of(&editor, editor.graph().segments(spline)[0]);
    let foreign_key = key(&editor, foreign);
    editor.dispatch(InputEvent::escape());
    editor.dispatch(InputEvent::escape());
    editor.dispatch(InputEvent::new(EventType::Mousedown).on(TargetKind::ToolPen));
    click(&mut editor, 300.0, 300.0);

    editor.dispatch(InputEvent::mousedown(TargetKind::Anchor, 0.0, 0.0).keyed(foreign_key));
    editor.dispatch(InputEvent::mousemove(50.0, 50.0));
    assert_eq!(anchor_of(&editor, editor.graph().segments(spline)[0]).1, Vector::ZERO);
    assert_eq!(editor.selection().tip, None);
}

// ─── Splitting ───────────────────────────────────────────────────────────

#[test]
fn hovering_a_curve_projects_splitter() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    let first = editor.graph().segments(spline)[0];
    let on_curve = InputEvent::mousemove(50.0, 2.0)
        .on(TargetKind::Curve)
        .keyed(key(&editor, first));
    let snap = editor.dispatch(on_curve);
    assert_eq!(snap.update, Some("projectSplitter"));
    let splitter = editor.gesture().splitter().copied().expect("expected a splitter");
    assert!((splitter.t - 0.5).abs() < 1e-6);
    assert!(splitter.point.approx_eq(Vector::new(50.0, 0.0), 1e-6));
    assert!(snap.render.targets(TargetKind::Curve).len() >= 2);

    let snap = editor.dispatch(InputEvent::mousemove(400.0, 400.0).on(TargetKind::Canvas));
    assert_eq!(snap.update, Some("clearSplitter"));
    assert_eq!(*editor.gesture(), Gesture::None);
}

#[test]
fn pressing_a_curve_splits_it_and_grabs_new_anchor() {
    let mut editor = pen_editor();
    let spline = triangle(&mut editor);
    let first = editor.graph().segments(spline)[0];
    let curve_key = key(&editor, first);
    editor.dispatch(InputEvent::mousemove(50.0, 2.0).on(TargetKind::Curve).keyed(curve_key));

    let snap = editor.dispatch(InputEvent::mousedown(TargetKind::Curve, 50.0, 2.0).keyed(curve_key));
    assert_eq!(snap.update, Some("split"));
    assert_eq!(editor.state(), pen(Label::AdjustingSegment));
    let segments = editor.graph().segments(spline);
    assert_eq!(segments.len(), 4);
    let (inserted, at) = anchor_of(&editor, segments[1]);
    assert!(at.approx_eq(Vector::new(50.0, 0.0), 1e-6));
    assert_eq!(editor.selection().tip, Some(inserted));

    editor.dispatch(InputEvent::mousemove(50.0, -10.0));
    editor.dispatch(InputEvent::mouseup(50.0, -10.0));
    assert_eq!(editor.state(), pen(Label::Idle));
    assert_eq!(
        editor.graph().path_data(pen_shape(&editor)),
        "M0 0 L50 -10 L100 0 L100 100"
    );
}

#[test]
fn tool_select_leaves_pen_mode() {
    let mut editor = pen_editor();
    click(&mut editor, 5.0, 5.0);
    let snap = editor.dispatch(InputEvent::new(EventType::Mousedown).on(TargetKind::ToolSelect));
    assert_eq!(snap.update, Some("exitPen"));
    assert_eq!(editor.state(), State::new(Mode::Select, Label::Idle));
    assert!(editor.graph().tagged(StatusTag::Pen).is_empty());
}
