//! A single curve between two adjacent segments of a spline.
//!
//! The curve only knows which control points are present; all Bezier
//! arithmetic (extrema, subdivision, nearest point) is delegated to `kurbo`.

use crate::rect::Rect;
use crate::vector::Vector;
use kurbo::{
    CubicBez, Line, ParamCurve, ParamCurveExtrema, ParamCurveNearest, PathSeg, Point, QuadBez,
};

/// Classification derived purely from which control points are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Fewer than two anchors.
    Degenerate,
    Line,
    Quadratic,
    Cubic,
}

/// Control points of one curve, in the shape's local space.
///
/// `handle_out` belongs to the starting segment, `handle_in` to the ending one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Curve {
    pub start: Option<Vector>,
    pub handle_out: Option<Vector>,
    pub handle_in: Option<Vector>,
    pub end: Option<Vector>,
}

/// Result of a nearest-point projection onto a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub t: f64,
    pub point: Vector,
    pub distance: f64,
}

/// The two halves of a curve split at `t`, plus the split point itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCurve {
    pub t: f64,
    pub point: Vector,
    pub left: Curve,
    pub right: Curve,
}

impl Curve {
    pub fn new(
        start: Option<Vector>,
        handle_out: Option<Vector>,
        handle_in: Option<Vector>,
        end: Option<Vector>,
    ) -> Self {
        Self {
            start,
            handle_out,
            handle_in,
            end,
        }
    }

    pub fn line(start: Vector, end: Vector) -> Self {
        Self::new(Some(start), None, None, Some(end))
    }

    pub fn kind(&self) -> CurveKind {
        if self.start.is_none() || self.end.is_none() {
            return CurveKind::Degenerate;
        }
        match (self.handle_out.is_some(), self.handle_in.is_some()) {
            (false, false) => CurveKind::Line,
            (true, true) => CurveKind::Cubic,
            _ => CurveKind::Quadratic,
        }
    }

    /// The equivalent `kurbo` segment, `None` for a degenerate curve.
    pub fn to_path_seg(&self) -> Option<PathSeg> {
        let (p0, p3) = (Point::from(self.start?), Point::from(self.end?));
        Some(match (self.handle_out, self.handle_in) {
            (None, None) => PathSeg::Line(Line::new(p0, p3)),
            (Some(h), None) | (None, Some(h)) => {
                PathSeg::Quad(QuadBez::new(p0, Point::from(h), p3))
            }
            (Some(h1), Some(h2)) => {
                PathSeg::Cubic(CubicBez::new(p0, Point::from(h1), Point::from(h2), p3))
            }
        })
    }

    /// Build a curve from a `kurbo` segment. A quadratic's control point goes
    /// into `handle_out` unless `quad_in` asks for the incoming slot.
    fn from_path_seg(seg: PathSeg, quad_in: bool) -> Self {
        match seg {
            PathSeg::Line(l) => Curve::line(l.p0.into(), l.p1.into()),
            PathSeg::Quad(q) if quad_in => {
                Curve::new(Some(q.p0.into()), None, Some(q.p1.into()), Some(q.p2.into()))
            }
            PathSeg::Quad(q) => {
                Curve::new(Some(q.p0.into()), Some(q.p1.into()), None, Some(q.p2.into()))
            }
            PathSeg::Cubic(c) => Curve::new(
                Some(c.p0.into()),
                Some(c.p1.into()),
                Some(c.p2.into()),
                Some(c.p3.into()),
            ),
        }
    }

    /// Tight bounds. Lines use their anchors; quadratic and cubic curves use
    /// the curve extrema. A degenerate curve is an empty rectangle at its
    /// only anchor.
    pub fn bounds(&self) -> Rect {
        match self.kind() {
            CurveKind::Degenerate => Rect::at(self.start.or(self.end).unwrap_or(Vector::ZERO)),
            CurveKind::Line => Rect::enclosing(self.start.into_iter().chain(self.end))
                .unwrap_or(Rect::EMPTY),
            CurveKind::Quadratic | CurveKind::Cubic => self
                .to_path_seg()
                .map(|seg| seg.bounding_box().into())
                .unwrap_or(Rect::EMPTY),
        }
    }

    pub fn eval(&self, t: f64) -> Option<Vector> {
        self.to_path_seg().map(|seg| seg.eval(t).into())
    }

    /// Nearest point on the curve to `p`.
    pub fn project(&self, p: Vector, accuracy: f64) -> Option<Projection> {
        let seg = self.to_path_seg()?;
        let nearest = seg.nearest(p.into(), accuracy);
        Some(Projection {
            t: nearest.t,
            point: seg.eval(nearest.t).into(),
            distance: nearest.distance_sq.sqrt(),
        })
    }

    /// Split at parameter `t` (clamped to `[0, 1]`).
    pub fn split(&self, t: f64) -> Option<SplitCurve> {
        let seg = self.to_path_seg()?;
        let t = t.clamp(0.0, 1.0);
        let quad_in = self.handle_out.is_none() && self.handle_in.is_some();
        Some(SplitCurve {
            t,
            point: seg.eval(t).into(),
            left: Curve::from_path_seg(seg.subsegment(0.0..t), quad_in),
            right: Curve::from_path_seg(seg.subsegment(t..1.0), quad_in),
        })
    }
}
