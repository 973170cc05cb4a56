//! Solving an accumulated quadric for its optimal position.

use crate::math::{AttrVector, GradientMatrix, Vec3d};

use super::{EdgeQuadric, Quadric};

/// Threshold on the area, the reduced determinant and the volume constraint.
const THRESHOLD: f64 = 1.0e-12;

/// Accumulates face and edge quadrics and solves for the position that
/// minimizes their sum.
///
/// Eliminating the attribute block of the quadric (see [`Quadric`]) leaves a
/// 3x3 symmetric system for the position alone:
///
/// ```text
/// L = C - (B1 B1ᵀ + B2 B2ᵀ) / γ
/// r = (B1 d1 + B2 d2) / γ - d0
/// p = L⁻¹ r
/// ```
///
/// With volume preservation a Lagrange multiplier enforces the signed volume
/// constraint `<g, p> + v = 0`, and the resulting correction is scaled by
/// the caller's importance factor.
#[derive(Debug, Clone, Default)]
pub struct QuadricOptimizer<D: AttrVector, S: AttrVector> {
    sum: Quadric<D, S>,
}

impl<D: AttrVector, S: AttrVector> QuadricOptimizer<D, S> {
    /// An empty optimizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a (wedge or face) quadric.
    pub fn add_face_quadric(&mut self, quadric: &Quadric<D, S>) {
        self.sum += quadric;
    }

    /// Add the geometric terms of an edge quadric.
    pub fn add_edge_quadric(&mut self, quadric: &EdgeQuadric) {
        self.sum.c += quadric.c;
        self.sum.d0 += quadric.d0;
        self.sum.c_scalar += quadric.c_scalar;
    }

    /// The accumulated quadric.
    pub fn quadric(&self) -> &Quadric<D, S> {
        &self.sum
    }

    /// Solve for the optimal position.
    ///
    /// Returns `None` when the accumulated area or the reduced system is too
    /// small to invert. A volume constraint that cannot be satisfied is
    /// skipped rather than failing the solve.
    pub fn optimize(&self, preserve_volume: bool, volume_importance: f64) -> Option<Vec3d> {
        let q = &self.sum;
        if q.gamma < THRESHOLD {
            return None;
        }
        let inv_gamma = 1.0 / q.gamma;

        let lhs = q.c - (q.b1.outer_product_sum() + q.b2.outer_product_sum()) * inv_gamma;
        let inv_lhs = lhs.inverse(THRESHOLD)?;

        let rhs = (q.b1.mul_vec(&q.d1) + q.b2.mul_vec(&q.d2)) * inv_gamma - q.d0;
        let mut position = inv_lhs * rhs;

        if preserve_volume {
            let inv_lhs_g = inv_lhs * q.vol_grad;
            let g_inv_lhs_g = q.vol_grad.dot(&inv_lhs_g);

            if g_inv_lhs_g.abs() > THRESHOLD {
                let multiplier = (q.vol_dist + q.vol_grad.dot(&position)) / g_inv_lhs_g;
                position += (-multiplier * inv_lhs_g) * volume_importance;
            }
        }

        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SkinnedVertex;
    use crate::quadric::{AttributeWeights, FaceQuadric, FaceQuadricOptimizer};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn face(p: [[f32; 3]; 3], w: &AttributeWeights) -> FaceQuadric {
        let v: Vec<SkinnedVertex> = p
            .iter()
            .map(|c| SkinnedVertex::new(Point3::new(c[0], c[1], c[2])))
            .collect();
        FaceQuadric::from_face(&v[0], &v[1], &v[2], &w.basic, &w.bones)
    }

    #[test]
    fn test_corner_of_three_planes() {
        // Three mutually orthogonal faces meeting at (1, 2, 3).
        let w = AttributeWeights::new(0);
        let mut opt = FaceQuadricOptimizer::new();
        opt.add_face_quadric(&face([[1.0, 2.0, 3.0], [2.0, 2.0, 3.0], [1.0, 3.0, 3.0]], &w));
        opt.add_face_quadric(&face([[1.0, 2.0, 3.0], [1.0, 2.0, 4.0], [2.0, 2.0, 3.0]], &w));
        opt.add_face_quadric(&face([[1.0, 2.0, 3.0], [1.0, 3.0, 3.0], [1.0, 2.0, 4.0]], &w));

        let p = opt.optimize(false, 0.0).unwrap();
        assert_relative_eq!(p, Vec3d::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_single_plane_is_singular() {
        let w = AttributeWeights::new(0);
        let mut opt = FaceQuadricOptimizer::new();
        opt.add_face_quadric(&face([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &w));
        assert!(opt.optimize(false, 0.0).is_none());
    }

    #[test]
    fn test_empty_optimizer_fails() {
        let opt = FaceQuadricOptimizer::new();
        assert!(opt.optimize(true, 1.0).is_none());
    }

    #[test]
    fn test_edge_quadric_completes_rank() {
        // One plane plus two perpendicular edge constraints pin a point.
        let w = AttributeWeights::new(0);
        let mut opt = FaceQuadricOptimizer::new();
        opt.add_face_quadric(&face([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &w));

        let n = Vec3d::new(0.0, 0.0, 1.0);
        opt.add_edge_quadric(&EdgeQuadric::new(&Vec3d::zeros(), &Vec3d::new(1.0, 0.0, 0.0), &n, 1.0));
        opt.add_edge_quadric(&EdgeQuadric::new(&Vec3d::zeros(), &Vec3d::new(0.0, 1.0, 0.0), &n, 1.0));

        let p = opt.optimize(false, 0.0).unwrap();
        assert_relative_eq!(p, Vec3d::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn test_volume_correction_moves_onto_constraint() {
        // An open corner: full volume importance puts the solution on the
        // weighted volume plane.
        let w = AttributeWeights::new(0);
        let mut opt = FaceQuadricOptimizer::new();
        opt.add_face_quadric(&face([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]], &w));
        opt.add_face_quadric(&face([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], &w));
        opt.add_face_quadric(&face([[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]], &w));

        let p = opt.optimize(true, 1.0).unwrap();
        let q = opt.quadric();
        assert_relative_eq!(q.vol_grad.dot(&p) + q.vol_dist, 0.0, epsilon = 1e-9);
    }
}
