//! User-facing reduction settings and the LOD reduction pipeline.
//!
//! [`reduce_lod_model`] runs the whole pipeline for one LOD:
//!
//! 1. pose the source LOD into a flat mesh ([`convert_to_skinned`])
//! 2. add collapse resistance around important bones
//! 3. record the UV bounds, simplify, then clamp the UVs back into the bounds
//! 4. trim bone influences per vertex
//! 5. expand into the host's mesh-builder arrays ([`extract_skeletal_data`])
//!
//! # Example
//!
//! ```
//! use skinlod::skinned::{ReductionSettings, TerminationCriterion};
//!
//! let settings = ReductionSettings::default()
//!     .with_criterion(TerminationCriterion::Triangles)
//!     .with_triangle_percentage(0.25)
//!     .with_max_bones_per_vertex(4);
//! assert!(settings.is_reduction_active());
//! assert_eq!(settings.target_counts(1000, 600), (250, 0));
//! ```

use log::{debug, info, warn};
use nalgebra::Matrix4;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algo::simplify::{simplify, SimplifierOptions, Terminator};
use crate::error::{ReductionError, Result};
use crate::math::UvBox;
use crate::mesh::MAX_UVS;
use crate::quadric::{AttributeWeights, SparseWeights};

use super::convert::{convert_to_skinned, ConvertOptions, SourceLodModel, MAX_INFLUENCES};
use super::extract::{extract_skeletal_data, SkeletalMeshBuilder, SkeletalMeshData};
use super::SkinnedMesh;

/// Fewest triangles a reduction leaves.
pub const MIN_TRIANGLES: usize = 4;

/// Fewest vertices a vertex-driven reduction leaves.
pub const MIN_VERTICES: usize = 6;

/// What the reduction target is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationCriterion {
    /// A fraction of the source triangles.
    #[default]
    Triangles,
    /// A fraction of the source vertices.
    Vertices,
    /// Whichever fraction is reached first.
    TrianglesOrVertices,
    /// An absolute triangle count.
    AbsoluteTriangles,
    /// An absolute vertex count.
    AbsoluteVertices,
    /// Whichever absolute count is reached first.
    AbsoluteTrianglesOrVertices,
}

impl TerminationCriterion {
    /// True for criteria with a triangle percentage.
    pub fn uses_triangle_percentage(self) -> bool {
        matches!(self, Self::Triangles | Self::TrianglesOrVertices)
    }

    /// True for criteria with a vertex percentage.
    pub fn uses_vertex_percentage(self) -> bool {
        matches!(self, Self::Vertices | Self::TrianglesOrVertices)
    }

    /// True for criteria with an absolute triangle count.
    pub fn uses_triangle_count(self) -> bool {
        matches!(self, Self::AbsoluteTriangles | Self::AbsoluteTrianglesOrVertices)
    }

    /// True for criteria with an absolute vertex count.
    pub fn uses_vertex_count(self) -> bool {
        matches!(self, Self::AbsoluteVertices | Self::AbsoluteTrianglesOrVertices)
    }
}

/// How far, and how, to reduce one LOD.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReductionSettings {
    /// Which targets apply.
    pub criterion: TerminationCriterion,
    /// Fraction of triangles to keep, in `[0, 1]`.
    pub triangle_percentage: f32,
    /// Fraction of vertices to keep, in `[0, 1]`.
    pub vertex_percentage: f32,
    /// Absolute triangle target.
    pub max_triangles: usize,
    /// Absolute vertex target.
    pub max_vertices: usize,
    /// Bone influences kept per vertex.
    pub max_bones_per_vertex: usize,
    /// Volume preservation strength in `[0, 2]`.
    pub volume_importance: f32,
    /// Keep open boundaries in place.
    pub lock_edges: bool,
    /// Never merge vertices with different dominant bones.
    pub enforce_bone_boundaries: bool,
    /// Source LOD to reduce from.
    pub base_lod: usize,
}

impl Default for ReductionSettings {
    fn default() -> Self {
        Self {
            criterion: TerminationCriterion::default(),
            triangle_percentage: 0.5,
            vertex_percentage: 0.5,
            max_triangles: 4096,
            max_vertices: 4096,
            max_bones_per_vertex: MAX_INFLUENCES,
            volume_importance: 1.0,
            lock_edges: false,
            enforce_bone_boundaries: false,
            base_lod: 0,
        }
    }
}

impl ReductionSettings {
    /// Set the termination criterion.
    pub fn with_criterion(mut self, criterion: TerminationCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the triangle fraction to keep.
    pub fn with_triangle_percentage(mut self, percentage: f32) -> Self {
        self.triangle_percentage = percentage;
        self
    }

    /// Set the vertex fraction to keep.
    pub fn with_vertex_percentage(mut self, percentage: f32) -> Self {
        self.vertex_percentage = percentage;
        self
    }

    /// Set the absolute triangle target.
    pub fn with_max_triangles(mut self, count: usize) -> Self {
        self.max_triangles = count;
        self
    }

    /// Set the absolute vertex target.
    pub fn with_max_vertices(mut self, count: usize) -> Self {
        self.max_vertices = count;
        self
    }

    /// Set the bone influences kept per vertex.
    pub fn with_max_bones_per_vertex(mut self, count: usize) -> Self {
        self.max_bones_per_vertex = count;
        self
    }

    /// Set the volume importance.
    pub fn with_volume_importance(mut self, importance: f32) -> Self {
        self.volume_importance = importance;
        self
    }

    /// Set whether open boundaries are locked.
    pub fn with_lock_edges(mut self, lock: bool) -> Self {
        self.lock_edges = lock;
        self
    }

    /// Set whether bone boundaries are enforced.
    pub fn with_enforce_bone_boundaries(mut self, enforce: bool) -> Self {
        self.enforce_bone_boundaries = enforce;
        self
    }

    /// Set the source LOD.
    pub fn with_base_lod(mut self, lod: usize) -> Self {
        self.base_lod = lod;
        self
    }

    /// Check the numeric settings.
    ///
    /// # Errors
    ///
    /// Returns [`ReductionError::InvalidParameter`] for non-finite
    /// percentages or volume importance.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("triangle_percentage", self.triangle_percentage),
            ("vertex_percentage", self.vertex_percentage),
            ("volume_importance", self.volume_importance),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ReductionError::invalid_param(name, value, "must be finite"));
            }
        }
        Ok(())
    }

    /// True if running the reduction would change anything: a percentage
    /// criterion keeps less than everything, an absolute criterion is set,
    /// or bones per vertex are limited.
    pub fn is_reduction_active(&self) -> bool {
        let c = self.criterion;
        let by_triangles = c.uses_triangle_percentage() && self.triangle_percentage < 1.0;
        let by_vertices = c.uses_vertex_percentage() && self.vertex_percentage < 1.0;
        let by_count = c.uses_triangle_count() || c.uses_vertex_count();
        by_triangles || by_vertices || by_count || self.max_bones_per_vertex < MAX_INFLUENCES
    }

    /// Triangle and vertex floors for a mesh of `src_tris` triangles and
    /// `src_verts` vertices.
    ///
    /// Percentages round up. The triangle floor is never below
    /// [`MIN_TRIANGLES`]. The vertex floor is zero unless a vertex criterion
    /// applies, and then never below [`MIN_VERTICES`]. An absolute vertex
    /// target keeps one vertex more than `max_vertices`.
    pub fn target_counts(&self, src_tris: usize, src_verts: usize) -> (usize, usize) {
        let c = self.criterion;
        let keep = |ratio: f32, count: usize| {
            let ratio = f64::from(ratio.clamp(0.0, 1.0));
            (ratio * count as f64).ceil() as usize
        };

        let min_tris = if c.uses_triangle_percentage() {
            keep(self.triangle_percentage, src_tris).max(MIN_TRIANGLES)
        } else if c.uses_triangle_count() {
            self.max_triangles.max(MIN_TRIANGLES)
        } else {
            MIN_TRIANGLES
        };

        let min_verts = if c.uses_vertex_percentage() {
            keep(self.vertex_percentage, src_verts).max(MIN_VERTICES)
        } else if c.uses_vertex_count() {
            self.max_vertices.saturating_add(1).max(MIN_VERTICES)
        } else {
            0
        };

        (min_tris, min_verts)
    }

    /// Simplifier options for a mesh with `tex_coord_count` UV channels.
    pub fn simplifier_options(&self, tex_coord_count: usize) -> SimplifierOptions {
        let weights = AttributeWeights::new(tex_coord_count)
            .with_bones(SparseWeights::uniform(AttributeWeights::DEFAULT_BONE));

        SimplifierOptions::default()
            .with_weights(weights)
            .with_volume_importance(f64::from(self.volume_importance))
            .with_lock_boundary(self.lock_edges)
            .with_enforce_bone_boundaries(self.enforce_bone_boundaries)
    }
}

/// Bones whose vertices resist collapse.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImportantBones {
    /// Skeleton bone indices.
    pub ids: Vec<usize>,
    /// Collapse resistance given to their vertices.
    pub weight: f32,
}

impl Default for ImportantBones {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            weight: 1.0,
        }
    }
}

impl ImportantBones {
    /// Important `ids` with resistance `weight`.
    pub fn new(ids: impl IntoIterator<Item = usize>, weight: f32) -> Self {
        let mut ids: Vec<usize> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self { ids, weight }
    }

    /// True if no bone is marked.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True if `bone` is marked.
    pub fn contains(&self, bone: usize) -> bool {
        self.ids.contains(&bone)
    }
}

/// Bounds of every UV channel in use. Unused channels stay empty.
pub fn compute_uv_bounds(mesh: &SkinnedMesh) -> [UvBox; MAX_UVS] {
    let mut bounds = [UvBox::empty(); MAX_UVS];
    let channels = mesh.tex_coord_count.min(MAX_UVS);
    for vertex in &mesh.vertices {
        for (bound, uv) in bounds.iter_mut().zip(vertex.attributes.uvs.iter()).take(channels) {
            bound.expand(uv);
        }
    }
    bounds
}

/// Clamp every UV channel in use into `bounds`.
pub fn clamp_uv_bounds(bounds: &[UvBox; MAX_UVS], mesh: &mut SkinnedMesh) {
    let channels = mesh.tex_coord_count.min(MAX_UVS);
    for vertex in mesh.vertices.iter_mut() {
        for (bound, uv) in bounds.iter().zip(vertex.attributes.uvs.iter_mut()).take(channels) {
            bound.clamp(uv);
        }
    }
}

/// Keep the `max_bones` heaviest influences of every vertex.
pub fn trim_bones_per_vertex(mesh: &mut SkinnedMesh, max_bones: usize) {
    for vertex in mesh.vertices.iter_mut() {
        vertex.limit_bones(max_bones);
    }
}

/// Give vertices dominated by an important bone the bones' collapse
/// resistance. Unskinned vertices get none.
pub fn update_specialized_weights(important: &ImportantBones, mesh: &mut SkinnedMesh) {
    for vertex in mesh.vertices.iter_mut() {
        match vertex.dominant_bone() {
            Some(bone) if important.contains(bone) => vertex.specialized_weight = important.weight,
            Some(_) => {}
            None => vertex.specialized_weight = 0.0,
        }
    }
}

/// Simplify `mesh` in place according to `settings`.
///
/// Returns the largest accepted collapse cost.
///
/// # Errors
///
/// Fails if the settings or the mesh are invalid.
pub fn simplify_mesh(settings: &ReductionSettings, mesh: &mut SkinnedMesh) -> Result<f64> {
    settings.validate()?;

    let src_tris = mesh.num_tris();
    let src_verts = mesh.num_vertices();
    let (min_tris, min_verts) = settings.target_counts(src_tris, src_verts);
    let policy = Terminator::new(min_tris, src_tris, min_verts, src_verts);

    let options = settings.simplifier_options(mesh.tex_coord_count);
    let (vertices, indices, error) = simplify(&mesh.vertices, &mesh.indices, &policy, options)?;

    mesh.vertices = vertices;
    mesh.indices = indices;
    Ok(error)
}

/// Reduce LOD `lod_index` of a skeletal mesh.
///
/// `lods` holds the source models that already exist. `lod_index` may name
/// one of them or the LOD just past the end. The source is
/// `settings.base_lod` when that LOD exists and is not above `lod_index`,
/// and LOD 0 otherwise.
///
/// # Errors
///
/// - [`ReductionError::EmptyMesh`] if there is no source LOD or it has no
///   drawable triangles.
/// - [`ReductionError::MissingLod`] if `lod_index` is past the end by more
///   than one.
/// - Any conversion or simplification error.
pub fn reduce_lod_model(
    lods: &[SourceLodModel],
    bone_matrices: &[Matrix4<f32>],
    settings: &ReductionSettings,
    important: &ImportantBones,
    lod_index: usize,
) -> Result<SkeletalMeshData> {
    if lods.is_empty() {
        return Err(ReductionError::EmptyMesh);
    }
    if lod_index > lods.len() {
        return Err(ReductionError::MissingLod {
            requested: lod_index,
            available: lods.len(),
        });
    }

    let base = if settings.base_lod > 0 {
        if settings.base_lod <= lod_index && settings.base_lod < lods.len() {
            settings.base_lod
        } else {
            warn!(
                "LOD {}: invalid base LOD {}, using LOD 0",
                lod_index, settings.base_lod
            );
            0
        }
    } else {
        0
    };

    let mut mesh = convert_to_skinned(&lods[base], bone_matrices, lod_index, &ConvertOptions::default())?;
    info!(
        "LOD {}: reducing from LOD {} ({} tris, {} verts)",
        lod_index,
        base,
        mesh.num_tris(),
        mesh.num_vertices()
    );

    if settings.is_reduction_active() {
        if !important.is_empty() {
            update_specialized_weights(important, &mut mesh);
        }

        let bounds = compute_uv_bounds(&mesh);
        let error = simplify_mesh(settings, &mut mesh)?;
        clamp_uv_bounds(&bounds, &mut mesh);
        debug!("LOD {}: max collapse cost {:.6e}", lod_index, error);

        let max_bones = settings.max_bones_per_vertex.min(MAX_INFLUENCES);
        if max_bones < MAX_INFLUENCES {
            trim_bones_per_vertex(&mut mesh, max_bones);
        }
    }

    Ok(extract_skeletal_data(&mesh))
}

/// Reduce LOD `lod_index` and hand the result to `builder`.
///
/// # Errors
///
/// See [`reduce_lod_model`].
pub fn reduce_lod_model_into<B: SkeletalMeshBuilder>(
    lods: &[SourceLodModel],
    bone_matrices: &[Matrix4<f32>],
    settings: &ReductionSettings,
    important: &ImportantBones,
    lod_index: usize,
    builder: &mut B,
) -> Result<B::Output> {
    let data = reduce_lod_model(lods, bone_matrices, settings, important, lod_index)?;
    Ok(builder.build_skeletal_mesh(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::AttrVector;
    use crate::mesh::SkinnedVertex;
    use crate::skinned::{SourceSection, SourceVertex};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2};

    /// An `n` by `n` quad grid over `[0, n]^2` with UVs spanning `[0, 1]^2`.
    /// The left half follows bone 0, the right half bone 1, and every vertex
    /// carries two minor influences.
    fn source_grid(n: u32) -> SourceLodModel {
        let mut vertices = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                let uv = Vector2::new(x as f32 / n as f32, y as f32 / n as f32);
                let major = if x * 2 < n { 0 } else { 1 };
                vertices.push(
                    SourceVertex::new(Point3::new(x as f32, y as f32, 0.0))
                        .with_uv(0, uv)
                        .with_influence(0, major, 205)
                        .with_influence(1, 2, 30)
                        .with_influence(2, 3, 20),
                );
            }
        }
        let mut indices = Vec::new();
        let row = n + 1;
        for y in 0..n {
            for x in 0..n {
                let i = y * row + x;
                indices.extend_from_slice(&[i, i + 1, i + row + 1, i, i + row + 1, i + row]);
            }
        }
        let tris = indices.len() / 3;
        let section = SourceSection::new(vertices, vec![0, 1, 2, 3], 0, tris);
        SourceLodModel::new(vec![section], indices, 1)
    }

    fn skinned_grid(n: u32) -> SkinnedMesh {
        convert_to_skinned(&source_grid(n), &[Matrix4::identity(); 4], 0, &ConvertOptions::default())
            .unwrap()
    }

    #[test]
    fn test_target_counts() {
        let s = ReductionSettings::default().with_triangle_percentage(0.5);
        assert_eq!(s.target_counts(12, 8), (6, 0));
        assert_eq!(s.target_counts(5, 8), (4, 0));

        let s = s.with_criterion(TerminationCriterion::Vertices).with_vertex_percentage(0.25);
        assert_eq!(s.target_counts(100, 50), (4, 13));
        assert_eq!(s.target_counts(100, 10), (4, 6));

        let s = s.with_criterion(TerminationCriterion::TrianglesOrVertices);
        assert_eq!(s.target_counts(100, 50), (50, 13));

        let s = ReductionSettings::default()
            .with_criterion(TerminationCriterion::AbsoluteTrianglesOrVertices)
            .with_max_triangles(40)
            .with_max_vertices(2);
        assert_eq!(s.target_counts(100, 50), (40, 6));

        let s = s.with_criterion(TerminationCriterion::AbsoluteTriangles);
        assert_eq!(s.target_counts(100, 50), (40, 0));

        let s = s.with_criterion(TerminationCriterion::AbsoluteVertices).with_max_vertices(20);
        assert_eq!(s.target_counts(100, 50), (4, 21));
        let s = s.with_max_vertices(5);
        assert_eq!(s.target_counts(100, 50), (4, 6));

        // Out-of-range percentages clamp.
        let s = ReductionSettings::default().with_triangle_percentage(3.0);
        assert_eq!(s.target_counts(10, 8), (10, 0));
    }

    #[test]
    fn test_is_reduction_active() {
        let s = ReductionSettings::default();
        assert!(s.is_reduction_active());

        let full = s.clone().with_triangle_percentage(1.0);
        assert!(!full.is_reduction_active());
        assert!(full.clone().with_max_bones_per_vertex(4).is_reduction_active());

        // The vertex percentage is irrelevant to a triangle criterion.
        assert!(!full.clone().with_vertex_percentage(0.1).is_reduction_active());

        assert!(full
            .with_criterion(TerminationCriterion::AbsoluteVertices)
            .is_reduction_active());
    }

    #[test]
    fn test_validate() {
        assert!(ReductionSettings::default().validate().is_ok());
        let s = ReductionSettings::default().with_vertex_percentage(f32::NAN);
        assert!(matches!(
            s.validate(),
            Err(ReductionError::InvalidParameter { name: "vertex_percentage", .. })
        ));
    }

    #[test]
    fn test_simplifier_options() {
        let opts = ReductionSettings::default()
            .with_volume_importance(7.0)
            .with_lock_edges(true)
            .simplifier_options(2);
        assert_eq!(opts.volume_importance, 2.0);
        assert!(opts.lock_boundary);
        assert_eq!(opts.boundary_weight, 128.0);
        assert!(opts.merge_coincident_bones);
        assert_eq!(opts.weights.basic[crate::mesh::slot::UV + 3], AttributeWeights::DEFAULT_UV);
        assert_eq!(opts.weights.basic[crate::mesh::slot::UV + 4], 0.0);
    }

    #[test]
    fn test_uv_bounds_and_clamp() {
        let mut mesh = skinned_grid(2);
        let bounds = compute_uv_bounds(&mesh);
        assert!(bounds[0].is_valid());
        assert!(!bounds[1].is_valid());
        assert_eq!(bounds[0].min(), Vector2::new(0.0, 0.0));
        assert_eq!(bounds[0].max(), Vector2::new(1.0, 1.0));

        mesh.vertices[0].attributes.uvs[0] = Vector2::new(-0.5, 1.5);
        mesh.vertices[1].attributes.uvs[1] = Vector2::new(9.0, 9.0);
        clamp_uv_bounds(&bounds, &mut mesh);
        assert_eq!(mesh.vertices[0].attributes.uvs[0], Vector2::new(0.0, 1.0));
        // Channels past the count are left alone.
        assert_eq!(mesh.vertices[1].attributes.uvs[1], Vector2::new(9.0, 9.0));
    }

    #[test]
    fn test_trim_bones_sum_to_one() {
        let mut mesh = skinned_grid(2);
        assert!(mesh.vertices.iter().all(|v| v.bones.len() == 3));

        trim_bones_per_vertex(&mut mesh, 2);
        for v in &mesh.vertices {
            assert_eq!(v.bones.len(), 2);
            assert_relative_eq!(v.bones.sum(), 1.0, epsilon = 1e-9);
            assert!(v.bones.element(3) == 0.0);
        }
    }

    #[test]
    fn test_update_specialized_weights() {
        let mut mesh = SkinnedMesh::new(
            vec![
                SkinnedVertex::new(Point3::origin()).with_bone(4, 0.7).with_bone(1, 0.3),
                SkinnedVertex::new(Point3::origin()).with_bone(1, 0.7).with_bone(4, 0.3),
                SkinnedVertex {
                    specialized_weight: 3.0,
                    ..SkinnedVertex::new(Point3::origin())
                },
            ],
            vec![],
            1,
        );
        update_specialized_weights(&ImportantBones::new([4, 4, 9], 2.5), &mut mesh);
        assert_eq!(mesh.vertices[0].specialized_weight, 2.5);
        assert_eq!(mesh.vertices[1].specialized_weight, 0.0);
        assert_eq!(mesh.vertices[2].specialized_weight, 0.0);
    }

    #[test]
    fn test_simplify_mesh_respects_floor_and_uvs() {
        let mut mesh = skinned_grid(6);
        let bounds = compute_uv_bounds(&mesh);
        let settings = ReductionSettings::default().with_triangle_percentage(0.25);

        simplify_mesh(&settings, &mut mesh).unwrap();
        clamp_uv_bounds(&bounds, &mut mesh);

        assert!(mesh.num_tris() >= MIN_TRIANGLES);
        assert!(mesh.num_tris() < 72);
        for tri in mesh.indices.chunks_exact(3) {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
        }
        for v in &mesh.vertices {
            let uv = v.attributes.uvs[0];
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y));
        }
    }

    #[test]
    fn test_reduce_lod_model() {
        let lods = vec![source_grid(6)];
        let bones = [Matrix4::identity(); 4];
        let settings = ReductionSettings::default()
            .with_triangle_percentage(0.5)
            .with_max_bones_per_vertex(1);

        let data = reduce_lod_model(&lods, &bones, &settings, &ImportantBones::default(), 1).unwrap();
        assert!(!data.faces.is_empty());
        assert!(data.faces.len() <= 72);
        assert_eq!(data.wedges.len(), 3 * data.faces.len());
        assert_eq!(data.tex_coord_count, 1);
        // One bone per point after trimming.
        assert_eq!(data.influences.len(), data.points.len());
        assert!(data.influences.iter().all(|inf| inf.weight == 1.0));
    }

    #[test]
    fn test_reduce_inactive_keeps_mesh() {
        let lods = vec![source_grid(3)];
        let bones = [Matrix4::identity(); 4];
        let settings = ReductionSettings::default().with_triangle_percentage(1.0);

        let data = reduce_lod_model(&lods, &bones, &settings, &ImportantBones::default(), 0).unwrap();
        assert_eq!(data.faces.len(), 18);
        assert_eq!(data.points.len(), 16);
    }

    #[test]
    fn test_reduce_lod_errors_and_base_fallback() {
        let bones = [Matrix4::identity(); 4];
        let settings = ReductionSettings::default();
        let important = ImportantBones::default();

        assert_eq!(
            reduce_lod_model(&[], &bones, &settings, &important, 0),
            Err(ReductionError::EmptyMesh)
        );

        let lods = vec![source_grid(2)];
        assert_eq!(
            reduce_lod_model(&lods, &bones, &settings, &important, 3),
            Err(ReductionError::MissingLod {
                requested: 3,
                available: 1
            })
        );

        // A base LOD that does not exist falls back to LOD 0.
        let settings = settings.with_base_lod(5);
        assert!(reduce_lod_model(&lods, &bones, &settings, &important, 1).is_ok());
    }

    struct FaceCounter;

    impl SkeletalMeshBuilder for FaceCounter {
        type Output = usize;

        fn build_skeletal_mesh(&mut self, data: &SkeletalMeshData) -> usize {
            data.faces.len()
        }
    }

    #[test]
    fn test_reduce_into_builder() {
        let lods = vec![source_grid(2)];
        let bones = [Matrix4::identity(); 4];
        let settings = ReductionSettings::default().with_triangle_percentage(1.0);
        let faces = reduce_lod_model_into(
            &lods,
            &bones,
            &settings,
            &ImportantBones::default(),
            0,
            &mut FaceCounter,
        )
        .unwrap();
        assert_eq!(faces, 8);
    }
}
