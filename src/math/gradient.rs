//! Per-triangle attribute gradient solver.

use nalgebra::Matrix3;

use super::{Vec3d, DET_THRESHOLD};

/// Invert a general 3x3 matrix, failing when `|det| <= threshold`.
pub fn invert_matrix(m: &Matrix3<f64>, threshold: f64) -> Option<Matrix3<f64>> {
    if m.determinant().abs() <= threshold {
        return None;
    }
    m.try_inverse()
}

/// Solves for the linear interpolant of per-vertex scalar data over a triangle.
///
/// Given corners `p0, p1, p2` with unit face normal `n`, each scalar field `s`
/// (one value per corner) has a unique gradient `g` lying in the plane of the
/// triangle and offset `d` with
///
/// ```text
/// <p_i | g> + d = s_i      i = 0, 1, 2
/// <n   | g>     = 0
/// ```
///
/// The system is expressed relative to `p0`, so the matrix to invert has rows
/// `p1 - p0`, `p2 - p0` and `n`. It is singular exactly when the triangle is
/// degenerate, independently of where the triangle sits in space. The inverse
/// is computed once and then reused for every attribute of the triangle.
#[derive(Debug, Clone)]
pub struct InverseGradientProjection {
    inverse: Matrix3<f64>,
    origin: Vec3d,
    valid: bool,
}

impl InverseGradientProjection {
    /// Build the solver for one triangle.
    pub fn new(p0: &Vec3d, p1: &Vec3d, p2: &Vec3d, face_normal: &Vec3d) -> Self {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let m = Matrix3::from_rows(&[e1.transpose(), e2.transpose(), face_normal.transpose()]);

        match invert_matrix(&m, DET_THRESHOLD) {
            Some(inverse) => Self {
                inverse,
                origin: *p0,
                valid: true,
            },
            None => Self {
                inverse: Matrix3::zeros(),
                origin: *p0,
                valid: false,
            },
        }
    }

    /// False if the triangle was too degenerate to invert.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Gradient and offset of the field whose corner values are `per_vertex`.
    ///
    /// Only meaningful when [`is_valid`](Self::is_valid) returns true.
    pub fn compute_gradient(&self, per_vertex: &Vec3d) -> (Vec3d, f64) {
        let rhs = Vec3d::new(
            per_vertex[1] - per_vertex[0],
            per_vertex[2] - per_vertex[0],
            0.0,
        );
        let gradient = self.inverse * rhs;
        let distance = per_vertex[0] - self.origin.dot(&gradient);
        (gradient, distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reproduces_corner_values() {
        let p0 = Vec3d::new(1.0, 0.0, 2.0);
        let p1 = Vec3d::new(3.0, 1.0, 2.0);
        let p2 = Vec3d::new(1.5, 4.0, 2.0);
        let n = Vec3d::new(0.0, 0.0, 1.0);

        let tool = InverseGradientProjection::new(&p0, &p1, &p2, &n);
        assert!(tool.is_valid());

        let s = Vec3d::new(0.25, -1.0, 3.0);
        let (g, d) = tool.compute_gradient(&s);

        assert_relative_eq!(p0.dot(&g) + d, s[0], epsilon = 1e-12);
        assert_relative_eq!(p1.dot(&g) + d, s[1], epsilon = 1e-12);
        assert_relative_eq!(p2.dot(&g) + d, s[2], epsilon = 1e-12);
        assert_relative_eq!(n.dot(&g), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_through_origin_is_valid() {
        let p0 = Vec3d::zeros();
        let p1 = Vec3d::new(1.0, 0.0, 0.0);
        let p2 = Vec3d::new(0.0, 1.0, 0.0);
        let n = Vec3d::new(0.0, 0.0, 1.0);
        let tool = InverseGradientProjection::new(&p0, &p1, &p2, &n);
        assert!(tool.is_valid());

        let (g, d) = tool.compute_gradient(&Vec3d::new(1.0, 2.0, 3.0));
        assert_relative_eq!(g, Vec3d::new(1.0, 2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(d, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_is_invalid() {
        let p0 = Vec3d::zeros();
        let p1 = Vec3d::new(1.0, 0.0, 0.0);
        let p2 = Vec3d::new(2.0, 0.0, 0.0);
        let n = Vec3d::new(0.0, 0.0, 1.0);
        assert!(!InverseGradientProjection::new(&p0, &p1, &p2, &n).is_valid());
    }
}
