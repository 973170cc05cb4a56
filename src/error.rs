//! Error types for skinlod.
//!
//! Only input validation at the API boundary produces errors. Once a mesh has
//! been accepted the simplifier never fails: numerical degeneracies fall back
//! to documented defaults and topological dead ends are skipped.

use thiserror::Error;

/// Result type alias using [`ReductionError`].
pub type Result<T> = std::result::Result<T, ReductionError>;

/// Errors that can occur while preparing a mesh for reduction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReductionError {
    /// The mesh has no triangles, or the source model has no data to reduce.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// A triangle references a vertex outside the vertex buffer.
    #[error("triangle {triangle} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The triangle index.
        triangle: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// The index buffer length is not a multiple of three.
    #[error("index buffer length {0} is not a multiple of 3")]
    InvalidIndexCount(usize),

    /// The requested source LOD does not exist.
    #[error("source LOD {requested} does not exist (model has {available})")]
    MissingLod {
        /// The LOD index that was requested.
        requested: usize,
        /// Number of LODs available.
        available: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl ReductionError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        ReductionError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = ReductionError::InvalidVertexIndex {
            triangle: 3,
            vertex: 99,
        };
        assert_eq!(e.to_string(), "triangle 3 references invalid vertex index 99");

        let e = ReductionError::invalid_param("ratio", 1.5, "must be in [0, 1]");
        assert_eq!(e.to_string(), "invalid parameter: ratio = 1.5 (must be in [0, 1])");
    }
}
