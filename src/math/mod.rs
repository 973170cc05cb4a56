//! Double precision linear algebra for the quadric engine.
//!
//! The quadric math mixes two kinds of attribute storage:
//!
//! - **Dense** vectors and gradient matrices ([`DenseVec`], [`DenseGradient`])
//!   for the fixed set of per-vertex attributes (normal, tangent frame, color, UVs).
//! - **Sparse** vectors and gradient matrices ([`SparseVec`], [`SparseGradient`])
//!   for bone weights, where a vertex is only influenced by a handful of bones
//!   out of a potentially large skeleton.
//!
//! Both families implement [`AttrVector`] / [`GradientMatrix`] so the quadric
//! construction code is written once and monomorphized for each storage kind.
//!
//! All arithmetic is performed in `f64` even though mesh attributes are stored
//! as `f32`: quadrics accumulate contributions from many triangles and single
//! precision cancels badly.

mod bbox;
mod dense;
mod gradient;
mod sparse;
mod symmetric;

use std::fmt::Debug;
use std::ops::{AddAssign, MulAssign};

use nalgebra::Vector3;

pub use bbox::UvBox;
pub use dense::{DenseGradient, DenseVec};
pub use gradient::{invert_matrix, InverseGradientProjection};
pub use sparse::{SparseGradient, SparseVec};
pub use symmetric::SymmetricMatrix;

/// Double precision 3-vector.
pub type Vec3d = Vector3<f64>;

/// Determinant threshold used when inverting general 3x3 matrices.
pub const DET_THRESHOLD: f64 = 1.0e-8;

/// A vector of attribute values addressed by attribute slot.
pub trait AttrVector:
    Clone + Debug + Default + for<'a> AddAssign<&'a Self> + MulAssign<f64>
{
    /// The 3xN gradient matrix that pairs with this vector type.
    type Gradient: GradientMatrix<Vector = Self>;

    /// Value at slot `i` (zero for unset sparse slots).
    fn element(&self, i: usize) -> f64;

    /// Overwrite the value at slot `i`.
    fn set_element(&mut self, i: usize, value: f64);

    /// Inner product.
    fn dot(&self, other: &Self) -> f64;

    /// Squared L2 norm.
    fn norm_squared(&self) -> f64;

    /// Reset to the zero vector.
    fn reset(&mut self);

    /// Slots that may hold data in any of `a`, `b` or `c`.
    ///
    /// For dense vectors this is every slot; for sparse vectors it is the union
    /// of the stored keys.
    fn iteration_mask(a: &Self, b: &Self, c: &Self) -> Vec<usize>;

    /// Slots that may hold data in this vector.
    fn support(&self) -> Vec<usize> {
        Self::iteration_mask(self, self, self)
    }
}

/// A matrix with 3 rows and one column per attribute slot.
///
/// Column `i` holds the (negated) spatial gradient of attribute `i`.
pub trait GradientMatrix:
    Clone + Debug + Default + for<'a> AddAssign<&'a Self> + MulAssign<f64>
{
    /// The attribute vector type indexed by this matrix's columns.
    type Vector: AttrVector<Gradient = Self>;

    /// Column `i` (zero for unset sparse columns).
    fn column(&self, i: usize) -> Vec3d;

    /// Overwrite column `i`.
    fn set_column(&mut self, i: usize, column: Vec3d);

    /// `B * s`.
    fn mul_vec(&self, s: &Self::Vector) -> Vec3d;

    /// `Bᵀ * p`.
    fn transpose_mul(&self, p: &Vec3d) -> Self::Vector;

    /// `B * Bᵀ`, the sum of the outer products of the columns.
    fn outer_product_sum(&self) -> SymmetricMatrix;

    /// Visit every stored column.
    fn for_each_column<F: FnMut(usize, &Vec3d)>(&self, f: F);

    /// Reset to the zero matrix.
    fn reset(&mut self);
}

/// `v * vᵀ`: projection onto `v`, scaled by `|v|²`.
#[inline]
pub fn scaled_projection(v: &Vec3d) -> SymmetricMatrix {
    SymmetricMatrix::new(
        v.x * v.x,
        v.x * v.y,
        v.x * v.z,
        v.y * v.y,
        v.y * v.z,
        v.z * v.z,
    )
}

/// Normalize `v` in place, returning `false` (and leaving `v` untouched) if it
/// is too short to normalize.
pub fn normalize_in_place(v: &mut Vec3d) -> bool {
    let len = v.norm();
    if len > DET_THRESHOLD {
        *v /= len;
        true
    } else {
        false
    }
}
