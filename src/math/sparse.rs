//! Sparse attribute vectors and gradient matrices.
//!
//! Storage is a `BTreeMap` so iteration order (and therefore the floating point
//! summation order) is deterministic.

use std::collections::BTreeMap;
use std::ops::{AddAssign, MulAssign};

use super::{scaled_projection, AttrVector, GradientMatrix, SymmetricMatrix, Vec3d};

/// Sparse double precision vector. Unset slots read as zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVec {
    data: BTreeMap<usize, f64>,
}

impl SparseVec {
    /// An empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no slot is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of stored slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Add `value` to slot `i`, creating it if needed.
    pub fn add_to_element(&mut self, i: usize, value: f64) {
        *self.data.entry(i).or_insert(0.0) += value;
    }

    /// Remove slot `i`.
    pub fn remove(&mut self, i: usize) -> Option<f64> {
        self.data.remove(&i)
    }

    /// Sum of all stored values.
    pub fn sum(&self) -> f64 {
        self.data.values().sum()
    }

    /// Iterate over `(slot, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.data.iter().map(|(&k, &v)| (k, v))
    }

    /// Keep only the slots for which `f` returns true.
    pub fn retain<F: FnMut(usize, f64) -> bool>(&mut self, mut f: F) {
        self.data.retain(|&k, v| f(k, *v));
    }
}

impl FromIterator<(usize, f64)> for SparseVec {
    fn from_iter<T: IntoIterator<Item = (usize, f64)>>(iter: T) -> Self {
        let mut v = SparseVec::new();
        for (k, value) in iter {
            v.add_to_element(k, value);
        }
        v
    }
}

impl<'a> AddAssign<&'a SparseVec> for SparseVec {
    fn add_assign(&mut self, rhs: &'a SparseVec) {
        for (&k, &v) in rhs.data.iter() {
            self.add_to_element(k, v);
        }
    }
}

impl MulAssign<f64> for SparseVec {
    fn mul_assign(&mut self, rhs: f64) {
        for v in self.data.values_mut() {
            *v *= rhs;
        }
    }
}

impl AttrVector for SparseVec {
    type Gradient = SparseGradient;

    #[inline]
    fn element(&self, i: usize) -> f64 {
        self.data.get(&i).copied().unwrap_or(0.0)
    }

    #[inline]
    fn set_element(&mut self, i: usize, value: f64) {
        self.data.insert(i, value);
    }

    fn dot(&self, other: &Self) -> f64 {
        // Walk the shorter map.
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .data
            .iter()
            .map(|(k, v)| v * large.element(*k))
            .sum()
    }

    fn norm_squared(&self) -> f64 {
        self.data.values().map(|v| v * v).sum()
    }

    fn reset(&mut self) {
        self.data.clear();
    }

    fn iteration_mask(a: &Self, b: &Self, c: &Self) -> Vec<usize> {
        let mut mask: Vec<usize> = a
            .data
            .keys()
            .chain(b.data.keys())
            .chain(c.data.keys())
            .copied()
            .collect();
        mask.sort_unstable();
        mask.dedup();
        mask
    }
}

/// A 3xN matrix with only a few nonzero columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseGradient {
    columns: BTreeMap<usize, Vec3d>,
}

impl SparseGradient {
    /// Number of stored columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl<'a> AddAssign<&'a SparseGradient> for SparseGradient {
    fn add_assign(&mut self, rhs: &'a SparseGradient) {
        for (&k, v) in rhs.columns.iter() {
            *self.columns.entry(k).or_insert_with(Vec3d::zeros) += v;
        }
    }
}

impl MulAssign<f64> for SparseGradient {
    fn mul_assign(&mut self, rhs: f64) {
        for v in self.columns.values_mut() {
            *v *= rhs;
        }
    }
}

impl GradientMatrix for SparseGradient {
    type Vector = SparseVec;

    #[inline]
    fn column(&self, i: usize) -> Vec3d {
        self.columns.get(&i).copied().unwrap_or_else(Vec3d::zeros)
    }

    #[inline]
    fn set_column(&mut self, i: usize, column: Vec3d) {
        self.columns.insert(i, column);
    }

    fn mul_vec(&self, s: &SparseVec) -> Vec3d {
        self.columns
            .iter()
            .fold(Vec3d::zeros(), |acc, (k, col)| acc + col * s.element(*k))
    }

    fn transpose_mul(&self, p: &Vec3d) -> SparseVec {
        self.columns.iter().map(|(&k, col)| (k, col.dot(p))).collect()
    }

    fn outer_product_sum(&self) -> SymmetricMatrix {
        self.columns
            .values()
            .fold(SymmetricMatrix::zero(), |acc, col| acc + scaled_projection(col))
    }

    fn for_each_column<F: FnMut(usize, &Vec3d)>(&self, mut f: F) {
        for (&k, col) in self.columns.iter() {
            f(k, col);
        }
    }

    fn reset(&mut self) {
        self.columns.clear();
    }
}
