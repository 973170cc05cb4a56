//! Quadric error metrics with attribute and bone-weight terms.
//!
//! A [`Quadric`] measures, for a candidate vertex state `(position, attributes,
//! bones)`, the sum of squared distances to the planes of the triangles it was
//! accumulated from, extended with Hoppe-style attribute terms: every
//! attribute is modeled as a linear function over each triangle, and the
//! quadric penalizes deviation from that function.
//!
//! The quadric is generic over two attribute vector types: a *dense* block
//! (normal, tangent frame, color, UVs) and a *sparse* block (bone weights).
//! Vertices expose their attributes through [`QuadricVertex`].
//!
//! - [`Quadric::from_face`] builds the per-triangle quadric.
//! - [`EdgeQuadric`] adds a plane constraint along boundary edges.
//! - [`QuadricOptimizer`] accumulates quadrics and solves for the optimal
//!   collapsed position, optionally preserving volume.
//! - [`QuadricCache`] memoizes triangle, wedge and edge quadrics with lazy
//!   invalidation.
//!
//! # References
//!
//! - Garland, M. & Heckbert, P. (1997). "Surface Simplification Using Quadric
//!   Error Metrics." SIGGRAPH '97.
//! - Hoppe, H. (1999). "New Quadric Metric for Simplifying Meshes with
//!   Appearance Attributes." IEEE Visualization '99.

mod cache;
mod edge;
mod face;
mod optimizer;

use std::collections::BTreeMap;

use nalgebra::Vector2;

use crate::math::{AttrVector, DenseVec, SparseVec, Vec3d};
use crate::mesh::{slot, BasicAttrVec, SkinnedVertex, MAX_UVS};

pub use cache::QuadricCache;
pub use edge::EdgeQuadric;
pub use face::Quadric;
pub use optimizer::QuadricOptimizer;

/// Attribute weights below this value switch the attribute off.
pub const MIN_ATTR_WEIGHT: f64 = 1.0e-6;

/// The quadric used for [`SkinnedVertex`] meshes.
pub type FaceQuadric = Quadric<BasicAttrVec, SparseVec>;

/// The optimizer used for [`SkinnedVertex`] meshes.
pub type FaceQuadricOptimizer = QuadricOptimizer<BasicAttrVec, SparseVec>;

/// A vertex that can be measured by a [`Quadric`].
pub trait QuadricVertex {
    /// Dense attribute block.
    type Dense: AttrVector;
    /// Sparse attribute block.
    type Sparse: AttrVector;

    /// Position in double precision.
    fn position(&self) -> Vec3d;

    /// Dense attributes in double precision.
    fn dense_attributes(&self) -> Self::Dense;

    /// Replace the dense attributes.
    fn set_dense_attributes(&mut self, attrs: &Self::Dense);

    /// Sparse attributes.
    fn sparse_attributes(&self) -> &Self::Sparse;

    /// Replace the sparse attributes.
    fn set_sparse_attributes(&mut self, attrs: Self::Sparse);

    /// The UV channel whose support is tracked and clamped.
    fn primary_uv(&self) -> Vector2<f32>;

    /// Mutable access to the tracked UV channel.
    fn primary_uv_mut(&mut self) -> &mut Vector2<f32>;
}

impl QuadricVertex for SkinnedVertex {
    type Dense = BasicAttrVec;
    type Sparse = SparseVec;

    #[inline]
    fn position(&self) -> Vec3d {
        self.pos()
    }

    fn dense_attributes(&self) -> BasicAttrVec {
        self.attributes.to_dense()
    }

    fn set_dense_attributes(&mut self, attrs: &BasicAttrVec) {
        self.attributes.set_from_dense(attrs);
    }

    #[inline]
    fn sparse_attributes(&self) -> &SparseVec {
        &self.bones
    }

    fn set_sparse_attributes(&mut self, attrs: SparseVec) {
        self.bones = attrs;
    }

    #[inline]
    fn primary_uv(&self) -> Vector2<f32> {
        self.attributes.uvs[0]
    }

    #[inline]
    fn primary_uv_mut(&mut self) -> &mut Vector2<f32> {
        &mut self.attributes.uvs[0]
    }
}

/// Per-slot attribute importance.
pub trait WeightLookup {
    /// Weight of slot `i`.
    fn weight(&self, i: usize) -> f64;
}

impl<const N: usize> WeightLookup for DenseVec<N> {
    #[inline]
    fn weight(&self, i: usize) -> f64 {
        self[i]
    }
}

/// Sparse weights: one default for every slot, with optional overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseWeights {
    default: f64,
    overrides: BTreeMap<usize, f64>,
}

impl SparseWeights {
    /// Every slot weighs `default`.
    pub fn uniform(default: f64) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Override the weight of slot `i`.
    pub fn with_override(mut self, i: usize, weight: f64) -> Self {
        self.overrides.insert(i, weight);
        self
    }

    /// The default weight.
    pub fn default_weight(&self) -> f64 {
        self.default
    }
}

impl Default for SparseWeights {
    fn default() -> Self {
        Self::uniform(AttributeWeights::DEFAULT_BONE)
    }
}

impl WeightLookup for SparseWeights {
    #[inline]
    fn weight(&self, i: usize) -> f64 {
        self.overrides.get(&i).copied().unwrap_or(self.default)
    }
}

/// Relative importance of each vertex attribute in the collapse cost.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeWeights {
    /// Weights for the dense attribute block.
    pub basic: BasicAttrVec,
    /// Weights for bone influences.
    pub bones: SparseWeights,
}

impl AttributeWeights {
    /// Default normal weight.
    pub const DEFAULT_NORMAL: f64 = 16.0;
    /// Default tangent weight.
    pub const DEFAULT_TANGENT: f64 = 0.1;
    /// Default bitangent weight.
    pub const DEFAULT_BITANGENT: f64 = 0.1;
    /// Default color weight.
    pub const DEFAULT_COLOR: f64 = 0.1;
    /// Default UV weight.
    pub const DEFAULT_UV: f64 = 0.5;
    /// Default bone weight.
    pub const DEFAULT_BONE: f64 = 0.25;

    /// Default weights for a mesh with `num_uv_channels` used UV channels.
    ///
    /// Unused channels get zero weight so they never influence the cost.
    pub fn new(num_uv_channels: usize) -> Self {
        let mut basic = BasicAttrVec::zeros();
        for k in 0..3 {
            basic[slot::NORMAL + k] = Self::DEFAULT_NORMAL;
            basic[slot::TANGENT + k] = Self::DEFAULT_TANGENT;
            basic[slot::BITANGENT + k] = Self::DEFAULT_BITANGENT;
        }
        for k in 0..4 {
            basic[slot::COLOR + k] = Self::DEFAULT_COLOR;
        }
        for c in 0..num_uv_channels.min(MAX_UVS) {
            basic[slot::UV + 2 * c] = Self::DEFAULT_UV;
            basic[slot::UV + 2 * c + 1] = Self::DEFAULT_UV;
        }
        Self {
            basic,
            bones: SparseWeights::default(),
        }
    }

    /// Set the normal weight.
    pub fn with_normal(mut self, weight: f64) -> Self {
        self.set_range(slot::NORMAL, 3, weight);
        self
    }

    /// Set the tangent and bitangent weights.
    pub fn with_tangent_frame(mut self, weight: f64) -> Self {
        self.set_range(slot::TANGENT, 6, weight);
        self
    }

    /// Set the color weight.
    pub fn with_color(mut self, weight: f64) -> Self {
        self.set_range(slot::COLOR, 4, weight);
        self
    }

    /// Set the weight of one UV channel.
    pub fn with_uv_channel(mut self, channel: usize, weight: f64) -> Self {
        if channel < MAX_UVS {
            self.set_range(slot::UV + 2 * channel, 2, weight);
        }
        self
    }

    /// Set the bone weight.
    pub fn with_bones(mut self, bones: SparseWeights) -> Self {
        self.bones = bones;
        self
    }

    fn set_range(&mut self, start: usize, len: usize, weight: f64) {
        for i in start..start + len {
            self.basic[i] = weight;
        }
    }
}

impl Default for AttributeWeights {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let w = AttributeWeights::new(2);
        assert_eq!(w.basic.weight(slot::NORMAL), 16.0);
        assert_eq!(w.basic.weight(slot::BITANGENT + 2), 0.1);
        assert_eq!(w.basic.weight(slot::UV + 3), 0.5);
        // Third channel unused.
        assert_eq!(w.basic.weight(slot::UV + 4), 0.0);
        assert_eq!(w.bones.weight(1234), 0.25);
    }

    #[test]
    fn test_sparse_override() {
        let w = SparseWeights::uniform(0.25).with_override(3, 2.0);
        assert_eq!(w.weight(3), 2.0);
        assert_eq!(w.weight(4), 0.25);
        assert_eq!(w.default_weight(), 0.25);
    }

    #[test]
    fn test_builders() {
        let w = AttributeWeights::new(1).with_normal(1.0).with_uv_channel(0, 4.0);
        assert_eq!(w.basic.weight(slot::NORMAL + 1), 1.0);
        assert_eq!(w.basic.weight(slot::UV), 4.0);
        assert_eq!(w.basic.weight(slot::UV + 1), 4.0);
    }
}
