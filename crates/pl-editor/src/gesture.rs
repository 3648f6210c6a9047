//! In-flight pointer gestures.
//!
//! A gesture records what a mousedown started so later mousemove/mouseup
//! events know what to act on. Only one gesture is live at a time.

use pl_core::matrix::Matrix;
use pl_core::vector::Vector;
use petgraph::graph::NodeIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Shift,
    Rotate,
    Scale,
}

/// A select-mode drag applying a transform to one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformGesture {
    pub target: NodeIndex,
    pub kind: TransformKind,
    /// Pointer position at mousedown, document space.
    pub origin: Vector,
    /// Center of the target's bounds, document space.
    pub center: Vector,
    /// The target's local transform before the drag.
    pub initial: Option<Matrix>,
}

impl TransformGesture {
    /// The document-space transform the drag to `pointer` describes, or
    /// `None` when it is degenerate (scaling through the center).
    pub fn delta(&self, pointer: Vector) -> Option<Matrix> {
        match self.kind {
            TransformKind::Shift => Some(Matrix::translation(pointer.minus(self.origin))),
            TransformKind::Rotate => Some(Matrix::rotation(
                self.center.angle(self.origin, pointer),
                self.center,
            )),
            TransformKind::Scale => {
                let from = self.origin.minus(self.center).length();
                let to = pointer.minus(self.center).length();
                let factor = to / from;
                (from > f64::EPSILON && factor.is_finite() && factor >= MIN_SCALE)
                    .then(|| Matrix::scale(factor, self.center))
            }
        }
    }

    /// The target's new local transform: `delta` is expressed in document
    /// space, so it is conjugated by the parent's global transform `parent`.
    ///
    /// `None` when the parent space is singular, or when the result would
    /// shrink the target's global scale below [`MIN_SCALE`].
    pub fn compose(&self, parent: &Matrix, delta: &Matrix) -> Option<Matrix> {
        let initial = self.initial.unwrap_or(Matrix::IDENTITY);
        let local = parent
            .invert()?
            .multiply(delta)
            .multiply(parent)
            .multiply(&initial);
        let global = parent.multiply(&local);
        let before = global_scale(&parent.multiply(&initial));
        let after = global_scale(&global);
        // shifts and rotations keep the scale up to rounding
        let shrinks = after < before * (1.0 - 1e-9);
        (global.is_invertible() && (after >= MIN_SCALE || !shrinks)).then_some(local)
    }
}

/// Smallest scale factor a single drag may apply, and the smallest global
/// scale a drag may shrink a node to.
pub const MIN_SCALE: f64 = 1e-3;

/// Geometric mean of the axis scales.
fn global_scale(m: &Matrix) -> f64 {
    m.determinant().abs().sqrt()
}

/// The projection of the pointer onto a curve of the pen shape, shown as a
/// marker and used by the next mousedown on that curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splitter {
    pub spline: NodeIndex,
    /// Segment the curve starts at.
    pub from: NodeIndex,
    /// Segment the curve ends at.
    pub to: NodeIndex,
    pub t: f64,
    /// Projected point, shape-local space.
    pub point: Vector,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    None,
    Transform(TransformGesture),
    /// Dragging out the handles of a freshly placed segment.
    Handles { segment: NodeIndex, anchor: Vector },
    /// Dragging an existing control point.
    Adjust { point: NodeIndex },
    /// Pen hovering over a curve.
    Splitter(Splitter),
}

impl Gesture {
    pub fn splitter(&self) -> Option<&Splitter> {
        match self {
            Gesture::Splitter(s) => Some(s),
            _ => None,
        }
    }

    pub fn transform(&self) -> Option<&TransformGesture> {
        match self {
            Gesture::Transform(t) => Some(t),
            _ => None,
        }
    }
}
