//! 2D points and displacements.

use crate::matrix::Matrix;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A 2D vector. Used both for positions and for offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y)
    }

    #[must_use]
    pub fn minus(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y)
    }

    /// Component-wise absolute value.
    #[must_use]
    pub fn abs(self) -> Vector {
        Vector::new(self.x.abs(), self.y.abs())
    }

    #[must_use]
    pub fn scale(self, factor: f64) -> Vector {
        Vector::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f64 {
        Vec2::new(self.x, self.y).hypot()
    }

    /// Map this point through an affine transform.
    #[must_use]
    pub fn transform(self, m: &Matrix) -> Vector {
        (Affine::from(*m) * Point::from(self)).into()
    }

    /// Rotate this point by `angle` radians around `pivot`.
    #[must_use]
    pub fn rotate(self, angle: f64, pivot: Vector) -> Vector {
        self.transform(&Matrix::rotation(angle, pivot))
    }

    /// Signed angle swept from `from` to `to`, as seen from this point.
    ///
    /// Normalized to `(-PI, PI]` so a drag across the negative x axis does not
    /// produce a full-turn jump.
    pub fn angle(self, from: Vector, to: Vector) -> f64 {
        let a = to.minus(self);
        let b = from.minus(self);
        normalize_angle(a.y.atan2(a.x) - b.y.atan2(b.x))
    }

    pub fn approx_eq(self, other: Vector, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

fn normalize_angle(mut a: f64) -> f64 {
    while a <= -PI {
        a += 2.0 * PI;
    }
    while a > PI {
        a -= 2.0 * PI;
    }
    a
}

impl From<Point> for Vector {
    fn from(p: Point) -> Self {
        Vector::new(p.x, p.y)
    }
}

impl From<Vector> for Point {
    fn from(v: Vector) -> Self {
        Point::new(v.x, v.y)
    }
}
