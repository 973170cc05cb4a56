//! The skinned vertex consumed and produced by the simplifier.

use nalgebra::{Point3, Vector2, Vector3, Vector4};

use crate::math::{AttrVector, DenseGradient, DenseVec, SparseVec, Vec3d};

/// Maximum number of UV channels carried per vertex.
pub const MAX_UVS: usize = 4;

/// Number of dense attribute slots: normal, tangent, bitangent, RGBA color and
/// `MAX_UVS` UV pairs.
pub const BASIC_ATTR_COUNT: usize = 13 + 2 * MAX_UVS;

/// Dense attribute vector layout shared by vertices, weights and quadrics.
pub type BasicAttrVec = DenseVec<BASIC_ATTR_COUNT>;

/// Gradient matrix paired with [`BasicAttrVec`].
pub type BasicGradient = DenseGradient<BASIC_ATTR_COUNT>;

/// Slot offsets into [`BasicAttrVec`].
pub mod slot {
    use super::MAX_UVS;

    /// First normal component.
    pub const NORMAL: usize = 0;
    /// First tangent component.
    pub const TANGENT: usize = 3;
    /// First bitangent component.
    pub const BITANGENT: usize = 6;
    /// Red channel; green, blue and alpha follow.
    pub const COLOR: usize = 9;
    /// U of channel 0; channel `c` starts at `UV + 2 * c`.
    pub const UV: usize = 13;
    /// One past the last UV slot.
    pub const END: usize = UV + 2 * MAX_UVS;
}

/// Per-wedge shading attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasicAttributes {
    /// Vertex normal.
    pub normal: Vector3<f32>,
    /// Tangent (U direction).
    pub tangent: Vector3<f32>,
    /// Bitangent (V direction).
    pub bitangent: Vector3<f32>,
    /// Linear RGBA color.
    pub color: Vector4<f32>,
    /// Texture coordinates. Channels past the mesh's channel count are zero.
    pub uvs: [Vector2<f32>; MAX_UVS],
}

impl Default for BasicAttributes {
    fn default() -> Self {
        Self {
            normal: Vector3::z(),
            tangent: Vector3::x(),
            bitangent: Vector3::y(),
            color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            uvs: [Vector2::zeros(); MAX_UVS],
        }
    }
}

impl BasicAttributes {
    /// Pack into the dense double precision layout.
    pub fn to_dense(&self) -> BasicAttrVec {
        let mut v = BasicAttrVec::zeros();
        for k in 0..3 {
            v[slot::NORMAL + k] = f64::from(self.normal[k]);
            v[slot::TANGENT + k] = f64::from(self.tangent[k]);
            v[slot::BITANGENT + k] = f64::from(self.bitangent[k]);
        }
        for k in 0..4 {
            v[slot::COLOR + k] = f64::from(self.color[k]);
        }
        for (c, uv) in self.uvs.iter().enumerate() {
            v[slot::UV + 2 * c] = f64::from(uv.x);
            v[slot::UV + 2 * c + 1] = f64::from(uv.y);
        }
        v
    }

    /// Unpack from the dense layout.
    pub fn set_from_dense(&mut self, v: &BasicAttrVec) {
        for k in 0..3 {
            self.normal[k] = v[slot::NORMAL + k] as f32;
            self.tangent[k] = v[slot::TANGENT + k] as f32;
            self.bitangent[k] = v[slot::BITANGENT + k] as f32;
        }
        for k in 0..4 {
            self.color[k] = v[slot::COLOR + k] as f32;
        }
        for (c, uv) in self.uvs.iter_mut().enumerate() {
            uv.x = v[slot::UV + 2 * c] as f32;
            uv.y = v[slot::UV + 2 * c + 1] as f32;
        }
    }

    /// Re-orthonormalize the tangent frame and clamp color into `[0, 1]`.
    ///
    /// The frame is rebuilt by Gram-Schmidt against the normal. Components that
    /// collapse to zero length are left as they are.
    pub fn correct(&mut self) {
        if let Some(n) = self.normal.try_normalize(1e-8) {
            self.normal = n;
        }
        let n = self.normal;

        let t = self.tangent - n * n.dot(&self.tangent);
        if let Some(t) = t.try_normalize(1e-8) {
            self.tangent = t;
        }
        let t = self.tangent;

        let b = self.bitangent - n * n.dot(&self.bitangent) - t * t.dot(&self.bitangent);
        if let Some(b) = b.try_normalize(1e-8) {
            self.bitangent = b;
        }

        for c in self.color.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }
    }

    /// True if every attribute agrees with `other` within `tolerance`.
    pub fn approx_eq(&self, other: &BasicAttributes, tolerance: f32) -> bool {
        let close3 = |a: &Vector3<f32>, b: &Vector3<f32>| (a - b).amax() <= tolerance;
        close3(&self.normal, &other.normal)
            && close3(&self.tangent, &other.tangent)
            && close3(&self.bitangent, &other.bitangent)
            && (self.color - other.color).amax() <= tolerance
            && self
                .uvs
                .iter()
                .zip(other.uvs.iter())
                .all(|(a, b)| (a - b).amax() <= tolerance)
    }
}

/// A fully posed, skinned vertex.
///
/// Bone weights are stored sparsely (bone index to weight) in double precision
/// so they can participate directly in the attribute quadrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinnedVertex {
    /// Posed position.
    pub position: Point3<f32>,
    /// Shading attributes.
    pub attributes: BasicAttributes,
    /// Bone index to weight.
    pub bones: SparseVec,
    /// Material (section) index.
    pub material_index: u32,
    /// Extra resistance to collapse, added to the edge cost.
    pub specialized_weight: f32,
}

impl Default for SkinnedVertex {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            attributes: BasicAttributes::default(),
            bones: SparseVec::new(),
            material_index: 0,
            specialized_weight: 0.0,
        }
    }
}

impl SkinnedVertex {
    /// A vertex at `position` with default attributes and no bones.
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set the UV of `channel`.
    pub fn with_uv(mut self, channel: usize, uv: Vector2<f32>) -> Self {
        self.attributes.uvs[channel] = uv;
        self
    }

    /// Set the normal.
    pub fn with_normal(mut self, normal: Vector3<f32>) -> Self {
        self.attributes.normal = normal;
        self
    }

    /// Add a bone influence.
    pub fn with_bone(mut self, bone: usize, weight: f64) -> Self {
        self.bones.add_to_element(bone, weight);
        self
    }

    /// Set the material index.
    pub fn with_material(mut self, material_index: u32) -> Self {
        self.material_index = material_index;
        self
    }

    /// Position in double precision.
    #[inline]
    pub fn pos(&self) -> Vec3d {
        self.position.coords.cast::<f64>()
    }

    /// Overwrite the position from double precision.
    #[inline]
    pub fn set_pos(&mut self, p: &Vec3d) {
        self.position = Point3::from(p.cast::<f32>());
    }

    /// Drop non-positive bone weights and rescale the rest to sum to one.
    pub fn normalize_bones(&mut self) {
        self.bones.retain(|_, w| w > 0.0);
        let sum = self.bones.sum();
        if sum > 0.0 {
            self.bones *= 1.0 / sum;
        }
    }

    /// Keep the `max_bones` heaviest influences and renormalize.
    ///
    /// Ties are broken towards the lower bone index.
    pub fn limit_bones(&mut self, max_bones: usize) {
        if self.bones.len() > max_bones {
            let mut ranked: Vec<(usize, f64)> = self.bones.iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            ranked.truncate(max_bones);
            self.bones = ranked.into_iter().collect();
        }
        self.normalize_bones();
    }

    /// The bone with the largest weight, if any.
    pub fn dominant_bone(&self) -> Option<usize> {
        self.bones
            .iter()
            .fold(None, |best: Option<(usize, f64)>, (k, w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((k, w)),
            })
            .map(|(k, _)| k)
    }

    /// Restore invariants after arithmetic on the attributes: orthonormal
    /// tangent frame, clamped color, normalized bone weights.
    pub fn correct(&mut self) {
        self.attributes.correct();
        self.normalize_bones();
    }

    /// True if the vertices can be welded into one output vertex.
    pub fn is_weldable_with(&self, other: &SkinnedVertex, tolerance: f32) -> bool {
        self.material_index == other.material_index
            && (self.position - other.position).amax() <= tolerance
            && self.attributes.approx_eq(&other.attributes, tolerance)
            && bones_close(&self.bones, &other.bones, f64::from(tolerance))
    }
}

fn bones_close(a: &SparseVec, b: &SparseVec, tolerance: f64) -> bool {
    SparseVec::iteration_mask(a, b, b)
        .into_iter()
        .all(|k| (a.element(k) - b.element(k)).abs() <= tolerance)
}
