//! Symmetric 3x3 matrices.

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use nalgebra::Matrix3;

use super::Vec3d;

/// A symmetric 3x3 matrix storing only its upper triangle.
///
/// ```text
/// | a11 a12 a13 |
/// | a12 a22 a23 |
/// | a13 a23 a33 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SymmetricMatrix {
    /// `[a11, a12, a13, a22, a23, a33]`
    data: [f64; 6],
}

impl SymmetricMatrix {
    /// Construct from the upper triangle.
    #[inline]
    pub fn new(a11: f64, a12: f64, a13: f64, a22: f64, a23: f64, a33: f64) -> Self {
        Self {
            data: [a11, a12, a13, a22, a23, a33],
        }
    }

    /// The zero matrix.
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    /// The identity matrix.
    #[inline]
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 1.0)
    }

    /// Element `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        const MAPPING: [usize; 9] = [0, 1, 2, 1, 3, 4, 2, 4, 5];
        self.data[MAPPING[row * 3 + col]]
    }

    /// Determinant.
    pub fn det(&self) -> f64 {
        let [a11, a12, a13, a22, a23, a33] = self.data;
        a11 * (a22 * a33 - a23 * a23) - a12 * (a12 * a33 - a23 * a13)
            + a13 * (a12 * a23 - a22 * a13)
    }

    /// Inverse of this matrix.
    ///
    /// Returns `None` if `|det| <= threshold`.
    pub fn inverse(&self, threshold: f64) -> Option<SymmetricMatrix> {
        let [a11, a12, a13, a22, a23, a33] = self.data;

        let c11 = a22 * a33 - a23 * a23;
        let c12 = a13 * a23 - a12 * a33;
        let c13 = a12 * a23 - a13 * a22;
        let c22 = a11 * a33 - a13 * a13;
        let c23 = a12 * a13 - a11 * a23;
        let c33 = a11 * a22 - a12 * a12;

        let det = a11 * c11 + a12 * c12 + a13 * c13;
        if det.abs() <= threshold {
            return None;
        }

        let inv_det = 1.0 / det;
        Some(Self::new(c11, c12, c13, c22, c23, c33) * inv_det)
    }

    /// Convert to a general nalgebra matrix.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let [a11, a12, a13, a22, a23, a33] = self.data;
        Matrix3::new(a11, a12, a13, a12, a22, a23, a13, a23, a33)
    }
}

impl Add for SymmetricMatrix {
    type Output = SymmetricMatrix;

    fn add(mut self, rhs: SymmetricMatrix) -> SymmetricMatrix {
        self += rhs;
        self
    }
}

impl AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: SymmetricMatrix) {
        for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a += b;
        }
    }
}

impl Sub for SymmetricMatrix {
    type Output = SymmetricMatrix;

    fn sub(mut self, rhs: SymmetricMatrix) -> SymmetricMatrix {
        self -= rhs;
        self
    }
}

impl SubAssign for SymmetricMatrix {
    fn sub_assign(&mut self, rhs: SymmetricMatrix) {
        for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a -= b;
        }
    }
}

impl Mul<f64> for SymmetricMatrix {
    type Output = SymmetricMatrix;

    fn mul(mut self, rhs: f64) -> SymmetricMatrix {
        self *= rhs;
        self
    }
}

impl Mul<SymmetricMatrix> for f64 {
    type Output = SymmetricMatrix;

    fn mul(self, rhs: SymmetricMatrix) -> SymmetricMatrix {
        rhs * self
    }
}

impl MulAssign<f64> for SymmetricMatrix {
    fn mul_assign(&mut self, rhs: f64) {
        for a in self.data.iter_mut() {
            *a *= rhs;
        }
    }
}

impl Mul<Vec3d> for SymmetricMatrix {
    type Output = Vec3d;

    fn mul(self, v: Vec3d) -> Vec3d {
        let [a11, a12, a13, a22, a23, a33] = self.data;
        Vec3d::new(
            a11 * v.x + a12 * v.y + a13 * v.z,
            a12 * v.x + a22 * v.y + a23 * v.z,
            a13 * v.x + a23 * v.y + a33 * v.z,
        )
    }
}

impl Mul<&Vec3d> for &SymmetricMatrix {
    type Output = Vec3d;

    fn mul(self, v: &Vec3d) -> Vec3d {
        *self * *v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> SymmetricMatrix {
        SymmetricMatrix::new(4.0, 1.0, 0.5, 3.0, -0.25, 2.0)
    }

    #[test]
    fn test_det_matches_nalgebra() {
        let m = sample();
        assert_relative_eq!(m.det(), m.to_matrix().determinant(), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse() {
        let m = sample();
        let inv = m.inverse(1e-12).unwrap();
        let product = m.to_matrix() * inv.to_matrix();
        assert_relative_eq!(product, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_singular() {
        // Rank one matrix.
        let v = Vec3d::new(1.0, 2.0, 3.0);
        let m = crate::math::scaled_projection(&v);
        assert!(m.inverse(1e-8).is_none());
    }

    #[test]
    fn test_get_is_symmetric() {
        let m = sample();
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(m.get(r, c), m.get(c, r));
                assert_eq!(m.get(r, c), m.to_matrix()[(r, c)]);
            }
        }
    }

    #[test]
    fn test_arithmetic() {
        let m = sample();
        let doubled = m + m;
        assert_eq!(doubled, m * 2.0);
        assert_eq!(doubled - m, m);
        assert_eq!(2.0 * m, doubled);

        let v = Vec3d::new(1.0, -1.0, 2.0);
        assert_relative_eq!(m * v, m.to_matrix() * v, epsilon = 1e-12);
    }
}
