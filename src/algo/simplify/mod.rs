//! Edge-collapse simplification of skinned meshes.
//!
//! The driver keeps every edge in a min-heap keyed by its collapse cost,
//! repeatedly collapses the cheapest one, and re-evaluates the costs around
//! the collapse until a [`TerminationPolicy`] says stop.
//!
//! Costs come from attribute quadrics (see [`crate::quadric`]): the error of
//! the optimal collapsed vertex measured against the wedge quadrics of both
//! endpoint groups, plus boundary, collapse-resistance and normal-flip
//! penalties.
//!
//! # Example
//!
//! ```
//! use skinlod::algo::simplify::{simplify, SimplifierOptions, Terminator};
//! use skinlod::mesh::SkinnedVertex;
//! use nalgebra::Point3;
//!
//! // A 4x4 grid of quads.
//! let mut vertices = Vec::new();
//! for y in 0..5 {
//!     for x in 0..5 {
//!         vertices.push(SkinnedVertex::new(Point3::new(x as f32, y as f32, 0.0)));
//!     }
//! }
//! let mut indices = Vec::new();
//! for y in 0..4u32 {
//!     for x in 0..4u32 {
//!         let i = y * 5 + x;
//!         indices.extend_from_slice(&[i, i + 1, i + 6, i, i + 6, i + 5]);
//!     }
//! }
//!
//! let policy = Terminator::new(16, 32, 0, 25);
//! let (_, out_indices, _) = simplify(&vertices, &indices, &policy, SimplifierOptions::default()).unwrap();
//! assert!(out_indices.len() / 3 <= 32);
//! ```
//!
//! # References
//!
//! - Garland, M. & Heckbert, P. (1997). "Surface Simplification Using Quadric
//!   Error Metrics." SIGGRAPH '97.
//! - Hoppe, H. (1999). "New Quadric Metric for Simplifying Meshes with
//!   Appearance Attributes." IEEE Visualization '99.

mod heap;
mod simplifier;
mod terminator;

pub use heap::CostHeap;
pub use simplifier::MeshSimplifier;
pub use terminator::{TerminationPolicy, Terminator};

use crate::error::{ReductionError, Result};
use crate::mesh::SkinnedVertex;
use crate::quadric::AttributeWeights;

/// Options for the simplifier.
#[derive(Debug, Clone)]
pub struct SimplifierOptions {
    /// Importance of each vertex attribute.
    pub weights: AttributeWeights,

    /// Weight of the plane constraints along open edges and UV seams.
    pub boundary_weight: f64,

    /// Cosine of the largest normal rotation a neighbouring triangle may
    /// undergo before the collapse is penalized.
    pub coalignment_limit: f64,

    /// How strongly the collapse position is corrected to preserve volume,
    /// in `[0, 2]`. Values at or below `1e-4` disable the correction.
    pub volume_importance: f64,

    /// Never collapse edges between vertices with different dominant bones.
    pub enforce_bone_boundaries: bool,

    /// Lock the vertices on open boundaries.
    pub lock_boundary: bool,

    /// Give every vertex in a group the averaged bone weights of the group
    /// on output.
    pub merge_coincident_bones: bool,

    /// Vertices closer than this are grouped as one position.
    pub coincident_tolerance: f32,

    /// Weld output vertices of one group whose attributes agree within this
    /// tolerance. `None` disables welding.
    pub weld_tolerance: Option<f32>,
}

impl SimplifierOptions {
    /// Default boundary constraint weight.
    pub const DEFAULT_BOUNDARY_WEIGHT: f64 = 128.0;
    /// Default grouping tolerance.
    pub const DEFAULT_COINCIDENT_TOLERANCE: f32 = 1.0e-5;
    /// Default weld tolerance.
    pub const DEFAULT_WELD_TOLERANCE: f32 = 1.0e-4;

    /// Set the attribute weights.
    pub fn with_weights(mut self, weights: AttributeWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the boundary constraint weight.
    pub fn with_boundary_weight(mut self, weight: f64) -> Self {
        self.boundary_weight = weight;
        self
    }

    /// Set the co-alignment limit from an angle in degrees.
    pub fn with_coalignment_angle(mut self, degrees: f64) -> Self {
        self.coalignment_limit = degrees.to_radians().cos();
        self
    }

    /// Set the volume importance. Clamped to `[0, 2]`.
    pub fn with_volume_importance(mut self, importance: f64) -> Self {
        self.volume_importance = importance.clamp(0.0, 2.0);
        self
    }

    /// Set whether bone boundaries are enforced.
    pub fn with_enforce_bone_boundaries(mut self, enforce: bool) -> Self {
        self.enforce_bone_boundaries = enforce;
        self
    }

    /// Set whether open boundaries are locked.
    pub fn with_lock_boundary(mut self, lock: bool) -> Self {
        self.lock_boundary = lock;
        self
    }

    /// Set whether grouped vertices share bone weights on output.
    pub fn with_merge_coincident_bones(mut self, merge: bool) -> Self {
        self.merge_coincident_bones = merge;
        self
    }

    /// Set the grouping tolerance.
    pub fn with_coincident_tolerance(mut self, tolerance: f32) -> Self {
        self.coincident_tolerance = tolerance;
        self
    }

    /// Set the weld tolerance.
    pub fn with_weld_tolerance(mut self, tolerance: Option<f32>) -> Self {
        self.weld_tolerance = tolerance;
        self
    }

    /// True if the volume correction is active.
    #[inline]
    pub fn preserve_volume(&self) -> bool {
        self.volume_importance > 1.0e-4
    }

    /// Check the numeric options.
    ///
    /// # Errors
    ///
    /// Returns [`ReductionError::InvalidParameter`] for negative or
    /// non-finite weights and tolerances, and for a co-alignment limit
    /// outside `[-1, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.boundary_weight.is_finite() || self.boundary_weight < 0.0 {
            return Err(ReductionError::invalid_param(
                "boundary_weight",
                self.boundary_weight,
                "must be finite and non-negative",
            ));
        }
        if !(-1.0..=1.0).contains(&self.coalignment_limit) {
            return Err(ReductionError::invalid_param(
                "coalignment_limit",
                self.coalignment_limit,
                "must be a cosine in [-1, 1]",
            ));
        }
        if !(0.0..=2.0).contains(&self.volume_importance) {
            return Err(ReductionError::invalid_param(
                "volume_importance",
                self.volume_importance,
                "must be in [0, 2]",
            ));
        }
        if !self.coincident_tolerance.is_finite() || self.coincident_tolerance < 0.0 {
            return Err(ReductionError::invalid_param(
                "coincident_tolerance",
                self.coincident_tolerance,
                "must be finite and non-negative",
            ));
        }
        if let Some(tol) = self.weld_tolerance {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ReductionError::invalid_param(
                    "weld_tolerance",
                    tol,
                    "must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

impl Default for SimplifierOptions {
    fn default() -> Self {
        Self {
            weights: AttributeWeights::default(),
            boundary_weight: Self::DEFAULT_BOUNDARY_WEIGHT,
            coalignment_limit: std::f64::consts::FRAC_1_SQRT_2,
            volume_importance: 1.0,
            enforce_bone_boundaries: false,
            lock_boundary: false,
            merge_coincident_bones: true,
            coincident_tolerance: Self::DEFAULT_COINCIDENT_TOLERANCE,
            weld_tolerance: Some(Self::DEFAULT_WELD_TOLERANCE),
        }
    }
}

/// Simplify a skinned mesh in one call.
///
/// Returns the reduced vertex and index buffers and the largest collapse
/// cost that was accepted, or the largest squared deviation when `policy`
/// limits distance.
///
/// # Errors
///
/// Fails if the options are invalid or the index buffer is malformed.
pub fn simplify<P: TerminationPolicy>(
    vertices: &[SkinnedVertex],
    indices: &[u32],
    policy: &P,
    options: SimplifierOptions,
) -> Result<(Vec<SkinnedVertex>, Vec<u32>, f64)> {
    let mut simplifier = MeshSimplifier::new(vertices, indices, options)?;
    let max_error = simplifier.simplify(policy);
    let (out_vertices, out_indices) = simplifier.output();
    Ok((out_vertices, out_indices, max_error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = SimplifierOptions::default();
        assert!(opts.validate().is_ok());
        assert!(opts.preserve_volume());
        assert!(opts.merge_coincident_bones);
        assert!((opts.coalignment_limit - 45.0f64.to_radians().cos()).abs() < 1e-12);
    }

    #[test]
    fn test_builders() {
        let opts = SimplifierOptions::default()
            .with_volume_importance(5.0)
            .with_coalignment_angle(60.0)
            .with_lock_boundary(true)
            .with_weld_tolerance(None);
        assert_eq!(opts.volume_importance, 2.0);
        assert!((opts.coalignment_limit - 0.5).abs() < 1e-12);
        assert!(opts.lock_boundary);
        assert!(opts.weld_tolerance.is_none());

        assert!(!SimplifierOptions::default().with_volume_importance(0.0).preserve_volume());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let opts = SimplifierOptions::default().with_boundary_weight(-1.0);
        assert!(matches!(
            opts.validate(),
            Err(ReductionError::InvalidParameter { name: "boundary_weight", .. })
        ));

        let opts = SimplifierOptions::default().with_weld_tolerance(Some(f32::NAN));
        assert!(opts.validate().is_err());
    }
}
