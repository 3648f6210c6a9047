//! 2x3 affine transforms.
//!
//! Stored in SVG order `[a b c d e f]`, mapping `(x, y)` to
//! `(a*x + c*y + e, b*x + d*y + f)`. The arithmetic goes through
//! [`kurbo::Affine`], which uses the same coefficient order.

use crate::vector::Vector;
use kurbo::Affine;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(v: Vector) -> Self {
        Affine::translate((v.x, v.y)).into()
    }

    /// Rotation by `angle` radians around `origin`.
    pub fn rotation(angle: f64, origin: Vector) -> Self {
        about(Affine::rotate(angle), origin)
    }

    /// Uniform scale by `factor` around `origin`.
    pub fn scale(factor: f64, origin: Vector) -> Self {
        about(Affine::scale(factor), origin)
    }

    /// Composition `self ∘ other`: the result applies `other` first, then `self`.
    #[must_use]
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        (Affine::from(*self) * Affine::from(*other)).into()
    }

    pub fn determinant(&self) -> f64 {
        Affine::from(*self).determinant()
    }

    /// Whether [`Matrix::invert`] succeeds: finite coefficients and a
    /// determinant that is not negligible next to the column lengths.
    ///
    /// The test is relative, so a tiny uniform scale still inverts while a
    /// matrix whose columns are parallel does not.
    pub fn is_invertible(&self) -> bool {
        let affine = Affine::from(*self);
        if !affine.is_finite() {
            return false;
        }
        let columns = self.a.hypot(self.b) * self.c.hypot(self.d);
        affine.determinant().abs() > 4.0 * f64::EPSILON * columns
    }

    /// Inverse transform, `None` when the matrix collapses the plane.
    #[must_use]
    pub fn invert(&self) -> Option<Matrix> {
        if !self.is_invertible() {
            return None;
        }
        let inv = Affine::from(*self).inverse();
        inv.is_finite().then(|| inv.into())
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn approx_eq(&self, other: &Matrix, eps: f64) -> bool {
        [
            self.a - other.a,
            self.b - other.b,
            self.c - other.c,
            self.d - other.d,
            self.e - other.e,
            self.f - other.f,
        ]
        .iter()
        .all(|d| d.abs() <= eps)
    }
}

/// `T(origin) · m · T(-origin)`.
fn about(m: Affine, origin: Vector) -> Matrix {
    (Affine::translate((origin.x, origin.y)) * m * Affine::translate((-origin.x, -origin.y)))
        .into()
}

impl From<Matrix> for Affine {
    fn from(m: Matrix) -> Self {
        Affine::new([m.a, m.b, m.c, m.d, m.e, m.f])
    }
}

impl From<Affine> for Matrix {
    fn from(a: Affine) -> Self {
        let [a, b, c, d, e, f] = a.as_coeffs();
        Matrix::new(a, b, c, d, e, f)
    }
}

/// SVG `matrix(a b c d e f)` form, as written to markup `transform` attributes.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matrix({} {} {} {} {} {})",
            format_num(self.a),
            format_num(self.b),
            format_num(self.c),
            format_num(self.d),
            format_num(self.e),
            format_num(self.f)
        )
    }
}

/// Shortest decimal form that still round-trips through `f64` parsing.
pub fn format_num(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        // Avoid "-0".
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
