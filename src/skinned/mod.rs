//! The boundary between a host skeletal-mesh model and the simplifier.
//!
//! - [`convert`] poses a sectioned host LOD model into one flat
//!   [`SkinnedMesh`].
//! - [`reduce`] applies user-facing [`ReductionSettings`] and runs the
//!   simplifier on it.
//! - [`extract`] expands the reduced mesh back into point, wedge, face and
//!   influence arrays for the host's mesh builder.

pub mod convert;
pub mod extract;
pub mod reduce;

pub use convert::{
    convert_to_skinned, ConvertOptions, SourceLodModel, SourceSection, SourceVertex, MAX_INFLUENCES,
};
pub use extract::{
    extract_skeletal_data, MeshFace, MeshWedge, SkeletalMeshBuilder, SkeletalMeshData, VertInfluence,
};
pub use reduce::{
    clamp_uv_bounds, compute_uv_bounds, reduce_lod_model, reduce_lod_model_into, simplify_mesh,
    trim_bones_per_vertex, update_specialized_weights, ImportantBones, ReductionSettings,
    TerminationCriterion, MIN_TRIANGLES, MIN_VERTICES,
};

use crate::mesh::SkinnedVertex;

/// A flat, posed, skinned triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinnedMesh {
    /// Vertex buffer.
    pub vertices: Vec<SkinnedVertex>,
    /// Triangle list into `vertices`.
    pub indices: Vec<u32>,
    /// Number of UV channels in use.
    pub tex_coord_count: usize,
}

impl SkinnedMesh {
    /// A mesh from buffers.
    pub fn new(vertices: Vec<SkinnedVertex>, indices: Vec<u32>, tex_coord_count: usize) -> Self {
        Self {
            vertices,
            indices,
            tex_coord_count,
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices.
    #[inline]
    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_tris(&self) -> usize {
        self.indices.len() / 3
    }

    /// True if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Drop vertices no triangle references and remap the indices.
    ///
    /// Relative vertex order is preserved.
    pub fn compact(&mut self) {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        for &i in &self.indices {
            remap[i as usize] = 0;
        }

        let mut next = 0u32;
        for slot in remap.iter_mut().filter(|r| **r == 0) {
            *slot = next;
            next += 1;
        }

        let mut i = 0;
        self.vertices.retain(|_| {
            let keep = remap[i] != u32::MAX;
            i += 1;
            keep
        });
        for index in self.indices.iter_mut() {
            *index = remap[*index as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_compact() {
        let verts: Vec<SkinnedVertex> = (0..5)
            .map(|i| SkinnedVertex::new(Point3::new(i as f32, 0.0, 0.0)))
            .collect();
        let mut mesh = SkinnedMesh::new(verts, vec![4, 1, 3], 1);
        mesh.compact();

        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.indices, vec![2, 0, 1]);
        assert_eq!(mesh.vertices[0].position.x, 1.0);
        assert_eq!(mesh.vertices[2].position.x, 4.0);
        assert_eq!(mesh.num_tris(), 1);
    }
}
