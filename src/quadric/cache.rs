//! Lazily recomputed quadrics keyed by entity handle.

use crate::math::AttrVector;
use crate::mesh::{TriangleId, VertexId};

use super::{EdgeQuadric, Quadric};

/// Memoizes triangle quadrics, per-vertex wedge quadrics (the sum over the
/// vertex's triangles) and per-vertex boundary edge quadrics.
///
/// Storage is allocated once for a fixed number of vertices and triangles.
/// `dirty_*` only clears the valid bit; values are recomputed on the next get.
#[derive(Debug, Clone)]
pub struct QuadricCache<D: AttrVector, S: AttrVector> {
    vert_quadrics: Vec<Quadric<D, S>>,
    vert_valid: Vec<bool>,
    tri_quadrics: Vec<Quadric<D, S>>,
    tri_valid: Vec<bool>,
    edge_quadrics: Vec<EdgeQuadric>,
    edge_valid: Vec<bool>,
}

impl<D: AttrVector, S: AttrVector> QuadricCache<D, S> {
    /// A cache sized for `num_verts` vertices and `num_tris` triangles, with
    /// every entry invalid.
    pub fn new(num_verts: usize, num_tris: usize) -> Self {
        Self {
            vert_quadrics: vec![Quadric::zero(); num_verts],
            vert_valid: vec![false; num_verts],
            tri_quadrics: vec![Quadric::zero(); num_tris],
            tri_valid: vec![false; num_tris],
            edge_quadrics: vec![EdgeQuadric::zero(); num_verts],
            edge_valid: vec![false; num_verts],
        }
    }

    /// The wedge quadric of `v`: the sum of the quadrics of `adjacent`.
    ///
    /// Any invalid triangle quadric is rebuilt with `tri_quadric` first.
    pub fn wedge_quadric<F>(
        &mut self,
        v: VertexId,
        adjacent: &[TriangleId],
        mut tri_quadric: F,
    ) -> &Quadric<D, S>
    where
        F: FnMut(TriangleId) -> Quadric<D, S>,
    {
        let vi = v.index();
        if !self.vert_valid[vi] {
            let mut sum = Quadric::zero();
            for &t in adjacent {
                let ti = t.index();
                if !self.tri_valid[ti] {
                    self.tri_quadrics[ti] = tri_quadric(t);
                    self.tri_valid[ti] = true;
                }
                sum += &self.tri_quadrics[ti];
            }
            self.vert_quadrics[vi] = sum;
            self.vert_valid[vi] = true;
        }
        &self.vert_quadrics[vi]
    }

    /// The boundary edge quadric of `v`, rebuilt with `edge_quadric` if
    /// invalid.
    pub fn edge_quadric<F>(&mut self, v: VertexId, edge_quadric: F) -> &EdgeQuadric
    where
        F: FnOnce() -> EdgeQuadric,
    {
        let vi = v.index();
        if !self.edge_valid[vi] {
            self.edge_quadrics[vi] = edge_quadric();
            self.edge_valid[vi] = true;
        }
        &self.edge_quadrics[vi]
    }

    /// Invalidate the wedge quadric of `v`.
    #[inline]
    pub fn dirty_vert_quadric(&mut self, v: VertexId) {
        self.vert_valid[v.index()] = false;
    }

    /// Invalidate the quadric of triangle `t`.
    #[inline]
    pub fn dirty_tri_quadric(&mut self, t: TriangleId) {
        self.tri_valid[t.index()] = false;
    }

    /// Invalidate the boundary edge quadric of `v`.
    #[inline]
    pub fn dirty_edge_quadric(&mut self, v: VertexId) {
        self.edge_valid[v.index()] = false;
    }

    /// True if the wedge quadric of `v` is cached.
    #[inline]
    pub fn is_vert_valid(&self, v: VertexId) -> bool {
        self.vert_valid[v.index()]
    }

    /// True if the quadric of `t` is cached.
    #[inline]
    pub fn is_tri_valid(&self, t: TriangleId) -> bool {
        self.tri_valid[t.index()]
    }
}
