//! Boundary constraint quadric.

use std::ops::AddAssign;

use crate::math::{normalize_in_place, scaled_projection, SymmetricMatrix, Vec3d};

/// Face normals must satisfy `| |n|² - 1 | < UNIT_TOLERANCE`.
const UNIT_TOLERANCE: f64 = 1.0e-2;

/// A purely geometric quadric pulling points onto the plane that contains a
/// boundary edge and is perpendicular to its face.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeQuadric {
    pub(crate) c: SymmetricMatrix,
    pub(crate) d0: Vec3d,
    pub(crate) c_scalar: f64,
}

impl EdgeQuadric {
    /// The zero quadric.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build the constraint for the edge `p0 -> p1` of a face with unit
    /// normal `face_normal`, scaled by `weight * |p1 - p0|`.
    ///
    /// Returns the zero quadric for non-unit normals and very short edges.
    pub fn new(p0: &Vec3d, p1: &Vec3d, face_normal: &Vec3d, weight: f64) -> Self {
        if (face_normal.norm_squared() - 1.0).abs() >= UNIT_TOLERANCE {
            return Self::zero();
        }

        let mut edge = p1 - p0;
        let length = edge.norm();
        if length < 1.0e-8 {
            return Self::zero();
        }
        edge /= length;
        let weight = weight * length;

        let mut n = edge.cross(face_normal);
        if n.norm_squared() < 1.0e-8 || !normalize_in_place(&mut n) {
            return Self::zero();
        }

        let dist = -n.dot(p0);
        Self {
            c: scaled_projection(&n) * weight,
            d0: n * (dist * weight),
            c_scalar: dist * dist * weight,
        }
    }

    /// `<p, C p> + 2 <p, d0> + c`.
    pub fn evaluate(&self, p: &Vec3d) -> f64 {
        p.dot(&(self.c * *p)) + 2.0 * p.dot(&self.d0) + self.c_scalar
    }
}

impl AddAssign<&EdgeQuadric> for EdgeQuadric {
    fn add_assign(&mut self, rhs: &EdgeQuadric) {
        self.c += rhs.c;
        self.d0 += rhs.d0;
        self.c_scalar += rhs.c_scalar;
    }
}
