//! # skinlod
//!
//! Level-of-detail reduction for skinned triangle meshes.
//!
//! skinlod collapses edges in order of a quadric error that measures
//! geometry, shading attributes (normals, tangent frame, color, UVs) and bone
//! weights together, so reduced LODs keep their silhouette, their texture
//! layout and the way they deform.
//!
//! ## Features
//!
//! - **Attribute quadrics**: Garland-Heckbert plane quadrics extended with
//!   dense attribute gradients and sparse bone-weight gradients
//! - **Seam-aware topology**: coincident vertices from UV seams and hard edges
//!   are grouped and collapse together
//! - **Volume preservation**: optional correction of the collapse position
//! - **Skinned pipeline**: pose a sectioned host model, reduce it, and expand
//!   it back into points, wedges, faces and influences
//!
//! ## Quick Start
//!
//! ```
//! use skinlod::prelude::*;
//! use nalgebra::Point3;
//!
//! // A unit cube; vertex i sits at (i & 1, (i >> 1) & 1, (i >> 2) & 1).
//! let vertices: Vec<SkinnedVertex> = (0..8)
//!     .map(|i| SkinnedVertex::new(Point3::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32)))
//!     .collect();
//! let indices = vec![
//!     0, 2, 3, 0, 3, 1, 4, 5, 7, 4, 7, 6, 0, 1, 5, 0, 5, 4,
//!     2, 6, 7, 2, 7, 3, 0, 4, 6, 0, 6, 2, 1, 3, 7, 1, 7, 5,
//! ];
//!
//! let mut simplifier = MeshSimplifier::new(&vertices, &indices, SimplifierOptions::default())?;
//! simplifier.simplify(&Terminator::new(6, 12, 0, 8));
//! let (_, reduced) = simplifier.output();
//! assert_eq!(reduced.len() / 3, 6);
//! # Ok::<(), skinlod::error::ReductionError>(())
//! ```
//!
//! ## Reducing a Skeletal LOD
//!
//! ```
//! use skinlod::prelude::*;
//! use nalgebra::{Matrix4, Point3};
//!
//! # let mut vertices = Vec::new();
//! # for y in 0..5 {
//! #     for x in 0..5 {
//! #         vertices.push(SourceVertex::new(Point3::new(x as f32, y as f32, 0.0)).with_influence(0, 0, 255));
//! #     }
//! # }
//! # let mut indices = Vec::new();
//! # for y in 0..4u32 {
//! #     for x in 0..4u32 {
//! #         let i = y * 5 + x;
//! #         indices.extend_from_slice(&[i, i + 1, i + 6, i, i + 6, i + 5]);
//! #     }
//! # }
//! let section = SourceSection::new(vertices, vec![0], 0, indices.len() / 3);
//! let lod0 = SourceLodModel::new(vec![section], indices, 1);
//!
//! let settings = ReductionSettings::default().with_triangle_percentage(0.5);
//! let lod1 = reduce_lod_model(&[lod0], &[Matrix4::identity()], &settings, &ImportantBones::default(), 1)?;
//! assert!(lod1.faces.len() <= 32);
//! # Ok::<(), skinlod::error::ReductionError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod math;
pub mod mesh;
pub mod quadric;
pub mod skinned;

pub use nalgebra;

/// Prelude module for convenient imports.
///
/// ```
/// use skinlod::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::progress::Progress;
    pub use crate::algo::simplify::{
        simplify, MeshSimplifier, SimplifierOptions, TerminationPolicy, Terminator,
    };
    pub use crate::error::{ReductionError, Result};
    pub use crate::mesh::{EdgeId, MeshManager, SkinnedVertex, TriangleId, VertexId};
    pub use crate::quadric::{AttributeWeights, SparseWeights};
    pub use crate::skinned::{
        convert_to_skinned, extract_skeletal_data, reduce_lod_model, ConvertOptions,
        ImportantBones, ReductionSettings, SkeletalMeshData, SkinnedMesh, SourceLodModel,
        SourceSection, SourceVertex, TerminationCriterion,
    };
}
