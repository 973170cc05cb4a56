//! Handle types for simplifier entities.
//!
//! Vertices, triangles and edges live in fixed-size arenas owned by the
//! [`MeshManager`](super::MeshManager). Each entity is addressed by a typed
//! `u32` handle handed out at construction; handles stay valid (though the
//! entity may be flagged removed) for the lifetime of the manager.

use std::fmt::{self, Debug};

/// A type-safe vertex handle.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId(u32);

/// A type-safe triangle handle.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TriangleId(u32);

/// A type-safe edge handle.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct EdgeId(u32);

macro_rules! impl_handle_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Sentinel for "no entity".
            pub const INVALID: Self = Self(u32::MAX);

            /// Create a handle from an arena slot.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < u32::MAX as usize, "handle {} too large", index);
                Self(index as u32)
            }

            /// Create an invalid/null handle.
            #[inline]
            pub fn invalid() -> Self {
                Self::INVALID
            }

            /// Arena slot of this handle.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// The raw `u32` value.
            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }

            /// Check if this is a valid (non-null) handle.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.0)
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_handle_type!(VertexId, "V");
impl_handle_type!(TriangleId, "T");
impl_handle_type!(EdgeId, "E");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let v = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert_eq!(v.raw(), 42);
        assert!(v.is_valid());

        assert!(!VertexId::invalid().is_valid());
        assert_eq!(VertexId::default(), VertexId::INVALID);
    }

    #[test]
    fn test_ordering() {
        let a = EdgeId::new(1);
        let b = EdgeId::from(2usize);
        assert!(a < b);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexId::new(42)), "V(42)");
        assert_eq!(format!("{:?}", TriangleId::new(7)), "T(7)");
        assert_eq!(format!("{:?}", EdgeId::invalid()), "E(INVALID)");
    }
}
