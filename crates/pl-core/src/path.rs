//! Spline topology: segments → curves → SVG path data.

use crate::curve::{Curve, CurveKind};
use crate::matrix::format_num;
use crate::model::{NodeKind, SceneGraph};
use crate::vector::Vector;
use petgraph::graph::NodeIndex;
use std::fmt::Write;

/// The control points of one segment, with the nodes that hold them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentPoints {
    pub anchor: Option<(NodeIndex, Vector)>,
    pub handle_in: Option<(NodeIndex, Vector)>,
    pub handle_out: Option<(NodeIndex, Vector)>,
}

/// A curve of a spline and the segments it runs between.
///
/// `to` is `None` only for the single degenerate curve of a one-segment spline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineCurve {
    pub from: NodeIndex,
    pub to: Option<NodeIndex>,
    pub curve: Curve,
}

impl SceneGraph {
    /// Splines of a shape, in order.
    pub fn splines(&self, shape: NodeIndex) -> Vec<NodeIndex> {
        self.children_of_kind(shape, |k| matches!(k, NodeKind::Spline { .. }))
    }

    /// Segments of a spline, in order.
    pub fn segments(&self, spline: NodeIndex) -> Vec<NodeIndex> {
        self.children_of_kind(spline, |k| matches!(k, NodeKind::Segment))
    }

    fn children_of_kind(&self, idx: NodeIndex, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeIndex> {
        self.children(idx)
            .iter()
            .copied()
            .filter(|&c| pred(&self[c].kind))
            .collect()
    }

    pub fn is_closed(&self, spline: NodeIndex) -> bool {
        matches!(self.kind(spline), Some(NodeKind::Spline { closed: true }))
    }

    pub fn segment_points(&self, segment: NodeIndex) -> SegmentPoints {
        let mut points = SegmentPoints::default();
        for &child in self.children(segment) {
            match self[child].kind {
                NodeKind::Anchor { vector } => points.anchor = Some((child, vector)),
                NodeKind::HandleIn { vector } => points.handle_in = Some((child, vector)),
                NodeKind::HandleOut { vector } => points.handle_out = Some((child, vector)),
                _ => {}
            }
        }
        points
    }

    /// The segment after `segment` in its spline. The last segment of a
    /// closed spline wraps to the first; of an open spline it has none.
    pub fn next_segment(&self, spline: NodeIndex, segment: NodeIndex) -> Option<NodeIndex> {
        let segments = self.segments(spline);
        let pos = segments.iter().position(|&s| s == segment)?;
        match segments.get(pos + 1) {
            Some(&next) => Some(next),
            None if self.is_closed(spline) && segments.len() > 1 => segments.first().copied(),
            None => None,
        }
    }

    /// The curve running from segment `from` to segment `to`.
    pub fn curve_between(&self, from: NodeIndex, to: NodeIndex) -> Curve {
        let a = self.segment_points(from);
        let b = self.segment_points(to);
        Curve::new(
            a.anchor.map(|p| p.1),
            a.handle_out.map(|p| p.1),
            b.handle_in.map(|p| p.1),
            b.anchor.map(|p| p.1),
        )
    }

    /// Every curve of a spline, including the closing one when closed.
    pub fn spline_curves(&self, spline: NodeIndex) -> Vec<SplineCurve> {
        let segments = self.segments(spline);
        match segments.as_slice() {
            [] => Vec::new(),
            [only] => vec![SplineCurve {
                from: *only,
                to: None,
                curve: Curve::new(self.segment_points(*only).anchor.map(|p| p.1), None, None, None),
            }],
            _ => {
                let mut curves: Vec<_> = segments
                    .windows(2)
                    .map(|pair| SplineCurve {
                        from: pair[0],
                        to: Some(pair[1]),
                        curve: self.curve_between(pair[0], pair[1]),
                    })
                    .collect();
                if self.is_closed(spline) {
                    let (last, first) = (segments[segments.len() - 1], segments[0]);
                    curves.push(SplineCurve {
                        from: last,
                        to: Some(first),
                        curve: self.curve_between(last, first),
                    });
                }
                curves
            }
        }
    }

    /// SVG path data for a shape: one subpath per spline.
    pub fn path_data(&self, shape: NodeIndex) -> String {
        let mut out = String::new();
        for spline in self.splines(shape) {
            let segments = self.segments(spline);
            let Some(start) = segments
                .first()
                .and_then(|&s| self.segment_points(s).anchor)
            else {
                continue;
            };
            if !out.is_empty() {
                out.push(' ');
            }
            write_command(&mut out, 'M', &[start.1]);
            if segments.len() > 1 {
                for c in self.spline_curves(spline) {
                    write_curve(&mut out, &c.curve);
                }
            }
            if self.is_closed(spline) {
                out.push_str(" Z");
            }
        }
        out
    }
}

fn write_curve(out: &mut String, curve: &Curve) {
    let Some(end) = curve.end else {
        return;
    };
    match curve.kind() {
        CurveKind::Degenerate => {}
        CurveKind::Line => {
            out.push(' ');
            write_command(out, 'L', &[end]);
        }
        CurveKind::Quadratic => {
            if let Some(h) = curve.handle_out.or(curve.handle_in) {
                out.push(' ');
                write_command(out, 'Q', &[h, end]);
            }
        }
        CurveKind::Cubic => {
            if let (Some(h1), Some(h2)) = (curve.handle_out, curve.handle_in) {
                out.push(' ');
                write_command(out, 'C', &[h1, h2, end]);
            }
        }
    }
}

fn write_command(out: &mut String, cmd: char, points: &[Vector]) {
    out.push(cmd);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{} {}", format_num(p.x), format_num(p.y));
    }
}
