//! Core mesh data structures for simplification.
//!
//! # Overview
//!
//! The primary type is [`MeshManager`], an arena-backed triangle mesh that
//! supports edge collapses while keeping every handle stable. Split vertices
//! (seams, hard edges) are tracked as *vertex groups* so a collapse moves all
//! coincident copies of a position together.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe handles:
//! - [`VertexId`] - Identifies a vertex
//! - [`TriangleId`] - Identifies a triangle
//! - [`EdgeId`] - Identifies an undirected edge
//!
//! # Construction
//!
//! ```
//! use skinlod::mesh::{MeshManager, SkinnedVertex};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     SkinnedVertex::new(Point3::new(0.0, 0.0, 0.0)),
//!     SkinnedVertex::new(Point3::new(1.0, 0.0, 0.0)),
//!     SkinnedVertex::new(Point3::new(0.5, 1.0, 0.0)),
//! ];
//!
//! let mesh = MeshManager::new(&vertices, &[0, 1, 2], 1e-5).unwrap();
//! assert_eq!(mesh.num_tris(), 1);
//! ```

mod index;
mod manager;
mod vertex;

pub use index::{EdgeId, TriangleId, VertexId};
pub use manager::{CollapseRecord, MeshManager, SimpFlags};
pub use vertex::{
    slot, BasicAttrVec, BasicAttributes, BasicGradient, SkinnedVertex, BASIC_ATTR_COUNT, MAX_UVS,
};
