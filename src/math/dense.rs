//! Fixed-size attribute vectors and gradient matrices.

use std::ops::{AddAssign, Index, IndexMut, MulAssign};

use super::{scaled_projection, AttrVector, GradientMatrix, SymmetricMatrix, Vec3d};

/// Fixed length double precision attribute vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseVec<const N: usize>(pub [f64; N]);

impl<const N: usize> DenseVec<N> {
    /// The zero vector.
    #[inline]
    pub fn zeros() -> Self {
        Self([0.0; N])
    }

    /// Number of slots.
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    /// Always false for `N > 0`; provided for clippy's `len_without_is_empty`.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Iterate over the values.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }
}

impl<const N: usize> Default for DenseVec<N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const N: usize> Index<usize> for DenseVec<N> {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl<const N: usize> IndexMut<usize> for DenseVec<N> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.0[i]
    }
}

impl<'a, const N: usize> AddAssign<&'a DenseVec<N>> for DenseVec<N> {
    fn add_assign(&mut self, rhs: &'a DenseVec<N>) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += b;
        }
    }
}

impl<const N: usize> MulAssign<f64> for DenseVec<N> {
    fn mul_assign(&mut self, rhs: f64) {
        for a in self.0.iter_mut() {
            *a *= rhs;
        }
    }
}

impl<const N: usize> AttrVector for DenseVec<N> {
    type Gradient = DenseGradient<N>;

    #[inline]
    fn element(&self, i: usize) -> f64 {
        self.0[i]
    }

    #[inline]
    fn set_element(&mut self, i: usize, value: f64) {
        self.0[i] = value;
    }

    fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    fn norm_squared(&self) -> f64 {
        self.0.iter().map(|a| a * a).sum()
    }

    fn reset(&mut self) {
        self.0 = [0.0; N];
    }

    fn iteration_mask(_a: &Self, _b: &Self, _c: &Self) -> Vec<usize> {
        (0..N).collect()
    }
}

/// A 3xN matrix stored as `N` column vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseGradient<const N: usize>([Vec3d; N]);

impl<const N: usize> Default for DenseGradient<N> {
    fn default() -> Self {
        Self([Vec3d::zeros(); N])
    }
}

impl<'a, const N: usize> AddAssign<&'a DenseGradient<N>> for DenseGradient<N> {
    fn add_assign(&mut self, rhs: &'a DenseGradient<N>) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += b;
        }
    }
}

impl<const N: usize> MulAssign<f64> for DenseGradient<N> {
    fn mul_assign(&mut self, rhs: f64) {
        for a in self.0.iter_mut() {
            *a *= rhs;
        }
    }
}

impl<const N: usize> GradientMatrix for DenseGradient<N> {
    type Vector = DenseVec<N>;

    #[inline]
    fn column(&self, i: usize) -> Vec3d {
        self.0[i]
    }

    #[inline]
    fn set_column(&mut self, i: usize, column: Vec3d) {
        self.0[i] = column;
    }

    fn mul_vec(&self, s: &DenseVec<N>) -> Vec3d {
        self.0
            .iter()
            .zip(s.0.iter())
            .fold(Vec3d::zeros(), |acc, (col, v)| acc + col * *v)
    }

    fn transpose_mul(&self, p: &Vec3d) -> DenseVec<N> {
        let mut result = DenseVec::zeros();
        for (r, col) in result.0.iter_mut().zip(self.0.iter()) {
            *r = col.dot(p);
        }
        result
    }

    fn outer_product_sum(&self) -> SymmetricMatrix {
        self.0
            .iter()
            .fold(SymmetricMatrix::zero(), |acc, col| acc + scaled_projection(col))
    }

    fn for_each_column<F: FnMut(usize, &Vec3d)>(&self, mut f: F) {
        for (i, col) in self.0.iter().enumerate() {
            f(i, col);
        }
    }

    fn reset(&mut self) {
        self.0 = [Vec3d::zeros(); N];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dense_vec_ops() {
        let mut a = DenseVec([1.0, 2.0, 3.0]);
        let b = DenseVec([0.5, 0.5, 0.5]);
        assert_relative_eq!(a.dot(&b), 3.0);
        assert_relative_eq!(a.norm_squared(), 14.0);

        a += &b;
        assert_eq!(a, DenseVec([1.5, 2.5, 3.5]));
        a *= 2.0;
        assert_eq!(a, DenseVec([3.0, 5.0, 7.0]));

        a.reset();
        assert_eq!(a, DenseVec::zeros());
        assert_eq!(DenseVec::<3>::iteration_mask(&a, &a, &a), vec![0, 1, 2]);
    }

    #[test]
    fn test_dense_gradient_products() {
        let mut b = DenseGradient::<2>::default();
        b.set_column(0, Vec3d::new(1.0, 0.0, 0.0));
        b.set_column(1, Vec3d::new(0.0, 2.0, 0.0));

        let s = DenseVec([3.0, 4.0]);
        assert_relative_eq!(b.mul_vec(&s), Vec3d::new(3.0, 8.0, 0.0));

        let p = Vec3d::new(1.0, 1.0, 1.0);
        assert_eq!(b.transpose_mul(&p), DenseVec([1.0, 2.0]));

        let bbt = b.outer_product_sum();
        assert_relative_eq!(bbt.get(0, 0), 1.0);
        assert_relative_eq!(bbt.get(1, 1), 4.0);
        assert_relative_eq!(bbt.get(0, 1), 0.0);
    }
}
