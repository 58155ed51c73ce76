//! Affine transformation matrices.
//!
//! A [`Matrix`] holds an affine transformation as six doubles:
//!
//! ```text
//! | xx xy x0 |
//! | yx yy y0 |
//! |  0  0  1 |
//! ```
//!
//! Points transform as `x' = xx*x + xy*y + x0`, `y' = yx*x + yy*y + y0`.

use crate::error::{Result, Status};

/// An affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::identity()
    }
}

impl Matrix {
    /// Create a matrix from its six components.
    pub fn new(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Matrix { xx, yx, xy, yy, x0, y0 }
    }

    /// The identity transformation.
    pub fn identity() -> Self {
        Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A transformation that translates by `(tx, ty)`.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// A transformation that scales by `(sx, sy)`.
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// A transformation that rotates by `radians` (positive is from the
    /// positive X axis toward the positive Y axis).
    pub fn rotation(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Matrix::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Apply a translation before this transformation.
    ///
    /// The new matrix first translates by `(tx, ty)` and then applies the
    /// original transformation.
    pub fn translate(&mut self, tx: f64, ty: f64) {
        *self = Matrix::multiply(&Matrix::translation(tx, ty), self);
    }

    /// Apply a scale before this transformation.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        *self = Matrix::multiply(&Matrix::scaling(sx, sy), self);
    }

    /// Apply a rotation before this transformation.
    pub fn rotate(&mut self, radians: f64) {
        *self = Matrix::multiply(&Matrix::rotation(radians), self);
    }

    /// Multiply two matrices.
    ///
    /// The result transforms as if by `a` first and then by `b`.
    pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
        Matrix {
            xx: a.xx * b.xx + a.yx * b.xy,
            yx: a.xx * b.yx + a.yx * b.yy,
            xy: a.xy * b.xx + a.yy * b.xy,
            yy: a.xy * b.yx + a.yy * b.yy,
            x0: a.x0 * b.xx + a.y0 * b.xy + b.x0,
            y0: a.x0 * b.yx + a.y0 * b.yy + b.y0,
        }
    }

    /// The determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.yx * self.xy
    }

    /// Whether the matrix has an inverse.
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det != 0.0 && det.is_finite()
    }

    /// Compute the inverse transformation.
    ///
    /// # Returns
    /// `Err(Status::InvalidMatrix)` if the matrix is singular.
    pub fn invert(&self) -> Result<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(Status::InvalidMatrix);
        }

        Ok(Matrix {
            xx: self.yy / det,
            yx: -self.yx / det,
            xy: -self.xy / det,
            yy: self.xx / det,
            x0: (self.xy * self.y0 - self.yy * self.x0) / det,
            y0: (self.yx * self.x0 - self.xx * self.y0) / det,
        })
    }

    /// Transform a point.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.xx * x + self.xy * y + self.x0,
            self.yx * x + self.yy * y + self.y0,
        )
    }

    /// Transform a distance vector, ignoring the translation components.
    pub fn transform_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.xx * dx + self.xy * dy, self.yx * dx + self.yy * dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let m = Matrix::identity();
        assert_eq!(m.transform_point(10.0, 20.0), (10.0, 20.0));
        assert_eq!(m.determinant(), 1.0);
    }

    #[test]
    fn test_translate_then_scale() {
        // Scale the whole plane after translating.
        let mut m = Matrix::scaling(2.0, 2.0);
        m.translate(10.0, 20.0);
        // Translation is applied first, so it is scaled too.
        assert_eq!(m.transform_point(0.0, 0.0), (20.0, 40.0));
    }

    #[test]
    fn test_multiply_order() {
        let t = Matrix::translation(5.0, 0.0);
        let s = Matrix::scaling(2.0, 2.0);

        // Translate first, then scale: origin lands at (10, 0).
        let m = Matrix::multiply(&t, &s);
        assert_eq!(m.transform_point(0.0, 0.0), (10.0, 0.0));

        // Scale first, then translate: origin lands at (5, 0).
        let m = Matrix::multiply(&s, &t);
        assert_eq!(m.transform_point(0.0, 0.0), (5.0, 0.0));
    }

    #[test]
    fn test_rotation() {
        let m = Matrix::rotation(std::f64::consts::FRAC_PI_2);
        let (x, y) = m.transform_point(1.0, 0.0);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invert_round_trip() {
        let mut m = Matrix::translation(7.0, -3.0);
        m.scale(2.0, 4.0);
        m.rotate(0.3);

        let inv = m.invert().unwrap();
        let (x, y) = m.transform_point(12.5, -8.25);
        let (rx, ry) = inv.transform_point(x, y);
        assert!((rx - 12.5).abs() < 1e-9);
        assert!((ry + 8.25).abs() < 1e-9);
    }

    #[test]
    fn test_invert_singular() {
        let m = Matrix::scaling(0.0, 1.0);
        assert!(!m.is_invertible());
        assert_eq!(m.invert(), Err(Status::InvalidMatrix));
    }

    #[test]
    fn test_transform_distance_ignores_translation() {
        let m = Matrix::translation(100.0, 200.0);
        assert_eq!(m.transform_distance(3.0, 4.0), (3.0, 4.0));
    }
}
