//! Mesh reduction algorithms.
//!
//! - **Simplification**: quadric edge collapse with attribute and bone-weight
//!   terms ([`simplify`])
//! - **Progress**: callbacks for long-running reductions ([`progress`])

pub mod progress;
pub mod simplify;
