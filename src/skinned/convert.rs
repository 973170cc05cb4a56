//! Posing a sectioned host LOD model into one flat [`SkinnedMesh`].
//!
//! Every source vertex is moved into its posed location by linear blend
//! skinning: the bone matrices named by its influences are blended by their
//! byte weights and applied to the position and the tangent frame. Sections
//! hidden at the requested LOD keep their vertices in the buffer but add no
//! triangles, so they drop out when the mesh is compacted.
//!
//! # Example
//!
//! ```
//! use skinlod::skinned::{convert_to_skinned, ConvertOptions, SourceLodModel, SourceSection, SourceVertex};
//! use nalgebra::{Matrix4, Point3, Vector3};
//!
//! let vertices = vec![
//!     SourceVertex::new(Point3::new(0.0, 0.0, 0.0)).with_influence(0, 0, 255),
//!     SourceVertex::new(Point3::new(1.0, 0.0, 0.0)).with_influence(0, 0, 255),
//!     SourceVertex::new(Point3::new(0.0, 1.0, 0.0)).with_influence(0, 0, 255),
//! ];
//! let section = SourceSection::new(vertices, vec![3], 0, 1);
//! let model = SourceLodModel::new(vec![section], vec![0, 1, 2], 1);
//!
//! let mut bones = vec![Matrix4::identity(); 4];
//! bones[3] = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0));
//!
//! let mesh = convert_to_skinned(&model, &bones, 0, &ConvertOptions::default()).unwrap();
//! assert_eq!(mesh.vertices[0].position.z, 2.0);
//! assert_eq!(mesh.vertices[0].dominant_bone(), Some(3));
//! ```

use log::{debug, warn};
use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};
use rayon::prelude::*;

use crate::error::{ReductionError, Result};
use crate::mesh::{BasicAttributes, SkinnedVertex, MAX_UVS};

use super::SkinnedMesh;

/// Influence slots per source vertex.
pub const MAX_INFLUENCES: usize = 8;

/// Byte weights of a well-formed vertex sum to this.
const FULL_INFLUENCE: u32 = 255;

/// Source UVs are clamped into `[-UV_LIMIT, UV_LIMIT]`.
const UV_LIMIT: f32 = 1024.0;

/// A vertex of the host model, in bind pose.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceVertex {
    /// Bind pose position.
    pub position: Point3<f32>,
    /// Tangent.
    pub tangent_x: Vector3<f32>,
    /// Bitangent.
    pub tangent_y: Vector3<f32>,
    /// Normal.
    pub tangent_z: Vector3<f32>,
    /// Linear RGBA color.
    pub color: Vector4<f32>,
    /// Texture coordinates.
    pub uvs: [Vector2<f32>; MAX_UVS],
    /// Section-local bone indices, looked up through the section bone map.
    pub influence_bones: [u16; MAX_INFLUENCES],
    /// Byte weights. A well-formed vertex sums to 255.
    pub influence_weights: [u8; MAX_INFLUENCES],
}

impl Default for SourceVertex {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            tangent_x: Vector3::x(),
            tangent_y: Vector3::y(),
            tangent_z: Vector3::z(),
            color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            uvs: [Vector2::zeros(); MAX_UVS],
            influence_bones: [0; MAX_INFLUENCES],
            influence_weights: [0; MAX_INFLUENCES],
        }
    }
}

impl SourceVertex {
    /// A vertex at `position` with a default frame and no influences.
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set influence `slot` to the section-local `bone` with a byte `weight`.
    pub fn with_influence(mut self, slot: usize, bone: u16, weight: u8) -> Self {
        self.influence_bones[slot] = bone;
        self.influence_weights[slot] = weight;
        self
    }

    /// Set the UV of `channel`.
    pub fn with_uv(mut self, channel: usize, uv: Vector2<f32>) -> Self {
        self.uvs[channel] = uv;
        self
    }

    /// Set the normal.
    pub fn with_normal(mut self, normal: Vector3<f32>) -> Self {
        self.tangent_z = normal;
        self
    }

    fn total_influence(&self) -> u32 {
        self.influence_weights.iter().map(|&w| u32::from(w)).sum()
    }
}

/// A run of triangles sharing one material, with its own vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSection {
    /// The section's vertices. They follow the previous section's vertices in
    /// the model-wide vertex numbering.
    pub vertices: Vec<SourceVertex>,
    /// Section-local bone index to skeleton bone index.
    pub bone_map: Vec<u16>,
    /// Material of every triangle in the section.
    pub material_index: u16,
    /// Offset of the section's first index in the model index buffer.
    pub base_index: usize,
    /// Number of triangles.
    pub num_triangles: usize,
    /// Disabled sections add no triangles.
    pub disabled: bool,
    /// Last LOD that draws this section, or `None` for all of them.
    pub generate_up_to_lod: Option<usize>,
}

impl SourceSection {
    /// An enabled section drawn at every LOD.
    pub fn new(
        vertices: Vec<SourceVertex>,
        bone_map: Vec<u16>,
        base_index: usize,
        num_triangles: usize,
    ) -> Self {
        Self {
            vertices,
            bone_map,
            material_index: 0,
            base_index,
            num_triangles,
            disabled: false,
            generate_up_to_lod: None,
        }
    }

    /// Set the material index.
    pub fn with_material(mut self, material_index: u16) -> Self {
        self.material_index = material_index;
        self
    }

    /// Set the disabled flag.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Set the last LOD that draws this section.
    pub fn with_generate_up_to_lod(mut self, lod: Option<usize>) -> Self {
        self.generate_up_to_lod = lod;
        self
    }

    /// True if the section contributes no triangles at `lod_index`.
    pub fn is_skipped_at(&self, lod_index: usize) -> bool {
        self.disabled || self.generate_up_to_lod.is_some_and(|max| max < lod_index)
    }
}

/// One LOD of a host skeletal mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceLodModel {
    /// Sections in vertex order.
    pub sections: Vec<SourceSection>,
    /// Triangle list over the model-wide vertex numbering.
    pub indices: Vec<u32>,
    /// Number of UV channels in use.
    pub tex_coord_count: usize,
}

impl SourceLodModel {
    /// A model from its parts.
    pub fn new(sections: Vec<SourceSection>, indices: Vec<u32>, tex_coord_count: usize) -> Self {
        Self {
            sections,
            indices,
            tex_coord_count,
        }
    }

    /// Total vertex count over every section.
    pub fn num_vertices(&self) -> usize {
        self.sections.iter().map(|s| s.vertices.len()).sum()
    }

    /// Triangle count over the sections drawn at `lod_index`.
    pub fn num_triangles_at(&self, lod_index: usize) -> usize {
        self.sections
            .iter()
            .filter(|s| !s.is_skipped_at(lod_index))
            .map(|s| s.num_triangles)
            .sum()
    }
}

/// Options for [`convert_to_skinned`].
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ConvertOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Pose `model` with `bone_matrices` and flatten it into one mesh.
///
/// Sections skipped at `lod_index` contribute no triangles. Vertices no kept
/// triangle references are removed.
///
/// # Errors
///
/// - [`ReductionError::InvalidParameter`] if a section's index range lies
///   outside the model index buffer.
/// - [`ReductionError::InvalidVertexIndex`] if a kept triangle references a
///   vertex past the end of the model.
/// - [`ReductionError::EmptyMesh`] if no triangles remain.
pub fn convert_to_skinned(
    model: &SourceLodModel,
    bone_matrices: &[Matrix4<f32>],
    lod_index: usize,
    options: &ConvertOptions,
) -> Result<SkinnedMesh> {
    let tex_coord_count = model.tex_coord_count.min(MAX_UVS);
    if model.tex_coord_count > MAX_UVS {
        warn!(
            "LOD {}: {} UV channels requested, keeping {}",
            lod_index, model.tex_coord_count, MAX_UVS
        );
    }

    let num_vertices = model.num_vertices();
    let mut vertices = Vec::with_capacity(num_vertices);
    for (s, section) in model.sections.iter().enumerate() {
        let skinned = skin_section(section, bone_matrices, tex_coord_count, options.parallel);

        let questionable = section
            .vertices
            .iter()
            .any(|v| v.total_influence() != FULL_INFLUENCE);
        if questionable && !section.is_skipped_at(lod_index) {
            warn!("LOD {}: section {} has questionable vertex weights", lod_index, s);
        }
        vertices.extend(skinned);
    }

    let mut indices = Vec::with_capacity(3 * model.num_triangles_at(lod_index));
    for (s, section) in model.sections.iter().enumerate() {
        if section.is_skipped_at(lod_index) {
            debug!("LOD {}: skipping section {}", lod_index, s);
            continue;
        }
        let end = section.base_index + 3 * section.num_triangles;
        let range = model.indices.get(section.base_index..end).ok_or_else(|| {
            ReductionError::invalid_param(
                "base_index",
                section.base_index,
                "section range exceeds the index buffer",
            )
        })?;
        indices.extend_from_slice(range);
    }

    for (i, &index) in indices.iter().enumerate() {
        if index as usize >= num_vertices {
            return Err(ReductionError::InvalidVertexIndex {
                triangle: i / 3,
                vertex: index as usize,
            });
        }
    }
    if indices.is_empty() {
        return Err(ReductionError::EmptyMesh);
    }

    let mut mesh = SkinnedMesh::new(vertices, indices, tex_coord_count);
    mesh.compact();
    Ok(mesh)
}

fn skin_section(
    section: &SourceSection,
    bone_matrices: &[Matrix4<f32>],
    tex_coord_count: usize,
    parallel: bool,
) -> Vec<SkinnedVertex> {
    let n = section.vertices.len();
    let skin = |i: usize| skin_vertex(&section.vertices[i], section, bone_matrices, tex_coord_count);

    if parallel {
        (0..n).into_par_iter().map(skin).collect()
    } else {
        (0..n).map(skin).collect()
    }
}

/// Blend the bone matrices of `vertex`. Identity when no influence resolves
/// to a bone matrix.
fn skinning_matrix(
    vertex: &SourceVertex,
    section: &SourceSection,
    bone_matrices: &[Matrix4<f32>],
) -> Matrix4<f32> {
    // Relative to the actual total; 255 for well-formed vertices.
    let total = vertex.total_influence() as f32;

    let mut blended = Matrix4::zeros();
    let mut valid = 0;
    for (&bone, &weight) in vertex.influence_bones.iter().zip(vertex.influence_weights.iter()) {
        if weight == 0 {
            continue;
        }
        let matrix = section
            .bone_map
            .get(bone as usize)
            .and_then(|&id| bone_matrices.get(id as usize));
        if let Some(matrix) = matrix {
            blended += *matrix * (f32::from(weight) / total);
            valid += 1;
        }
    }

    if valid == 0 {
        Matrix4::identity()
    } else {
        blended
    }
}

fn skin_vertex(
    vertex: &SourceVertex,
    section: &SourceSection,
    bone_matrices: &[Matrix4<f32>],
    tex_coord_count: usize,
) -> SkinnedVertex {
    let xform = skinning_matrix(vertex, section, bone_matrices);
    let frame = |v: &Vector3<f32>| {
        let moved = xform.transform_vector(v);
        moved.try_normalize(1e-8).unwrap_or(moved)
    };

    let mut uvs = [Vector2::zeros(); MAX_UVS];
    for (dst, src) in uvs.iter_mut().zip(vertex.uvs.iter()).take(tex_coord_count) {
        *dst = src.map(|c| c.clamp(-UV_LIMIT, UV_LIMIT));
    }

    let mut out = SkinnedVertex {
        position: xform.transform_point(&vertex.position),
        attributes: BasicAttributes {
            normal: frame(&vertex.tangent_z),
            tangent: frame(&vertex.tangent_x),
            bitangent: frame(&vertex.tangent_y),
            color: vertex.color,
            uvs,
        },
        material_index: u32::from(section.material_index),
        ..Default::default()
    };

    for (&bone, &weight) in vertex.influence_bones.iter().zip(vertex.influence_weights.iter()) {
        if weight == 0 {
            continue;
        }
        match section.bone_map.get(bone as usize) {
            Some(&id) => out
                .bones
                .add_to_element(id as usize, f64::from(weight) / f64::from(FULL_INFLUENCE)),
            None => debug!("influence bone {} is outside the section bone map", bone),
        }
    }

    out.correct();
    out
}
