//! Axis-aligned rectangles.

use crate::matrix::Matrix;
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-size rectangle sitting at `p`.
    pub fn at(p: Vector) -> Self {
        Self::new(p.x, p.y, 0.0, 0.0)
    }

    pub fn from_min_max(min: Vector, max: Vector) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn min(&self) -> Vector {
        Vector::new(self.x, self.y)
    }

    pub fn max(&self) -> Vector {
        Vector::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Vector {
        Vector::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Vector; 4] {
        let (min, max) = (self.min(), self.max());
        [
            min,
            Vector::new(max.x, min.y),
            max,
            Vector::new(min.x, max.y),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Smallest rectangle enclosing both.
    #[must_use]
    pub fn bounding_rect(&self, other: &Rect) -> Rect {
        let min = Vector::new(self.x.min(other.x), self.y.min(other.y));
        let (a, b) = (self.max(), other.max());
        Rect::from_min_max(min, Vector::new(a.x.max(b.x), a.y.max(b.y)))
    }

    /// Smallest rectangle enclosing all the given points. `None` for no points.
    pub fn enclosing(points: impl IntoIterator<Item = Vector>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = Vector::new(min.x.min(p.x), min.y.min(p.y));
            max = Vector::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some(Rect::from_min_max(min, max))
    }

    /// Axis-aligned bounds of this rectangle after mapping through `m`.
    #[must_use]
    pub fn transform(&self, m: &Matrix) -> Rect {
        let [a, b, c, d] = self.corners();
        Rect::enclosing([a, b, c, d].map(|p| p.transform(m))).unwrap_or(*self)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Vector) -> bool {
        let max = self.max();
        p.x >= self.x && p.x <= max.x && p.y >= self.y && p.y <= max.y
    }

    pub fn approx_eq(&self, other: &Rect, eps: f64) -> bool {
        self.min().approx_eq(other.min(), eps) && self.max().approx_eq(other.max(), eps)
    }
}

impl From<kurbo::Rect> for Rect {
    fn from(r: kurbo::Rect) -> Self {
        let r = r.abs();
        Rect::new(r.x0, r.y0, r.width(), r.height())
    }
}
