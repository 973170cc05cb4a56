//! Stopping rules for the collapse loop.

/// Decides when the simplifier stops collapsing edges.
pub trait TerminationPolicy {
    /// Called with the current counts and the cost of the next collapse.
    fn should_stop(&self, num_tris: usize, num_verts: usize, sqr_error: f64) -> bool;

    /// Whether a collapse leaving `num_tris` triangles and `num_verts`
    /// vertices is acceptable. Collapses that are not are skipped.
    fn permits(&self, num_tris: usize, num_verts: usize) -> bool {
        let _ = (num_tris, num_verts);
        true
    }

    /// The triangle count the policy is aiming for, used for progress.
    fn target_tris(&self) -> usize {
        0
    }

    /// Whether the policy limits surface deviation. When it does, the
    /// simplifier measures every collapse and reports the largest squared
    /// distance instead of the largest cost.
    fn limits_distance(&self) -> bool {
        false
    }

    /// Called with the squared distance the next collapse would move the
    /// surface.
    fn should_stop_at_distance(&self, num_tris: usize, num_verts: usize, dist_sqr: f64) -> bool {
        let _ = (num_tris, num_verts, dist_sqr);
        false
    }
}

/// Count floors with an error-driven ceiling.
///
/// Stops once either count reaches its floor. Above the floors it also stops
/// when both counts are below their ceilings and the next collapse would cost
/// more than `max_cost` or move the surface further than `max_dist_sqr`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terminator {
    /// Triangles to retain at least.
    pub min_tris: usize,
    /// Triangle ceiling for the error criterion.
    pub max_tris: usize,
    /// Vertices to retain at least.
    pub min_verts: usize,
    /// Vertex ceiling for the error criterion.
    pub max_verts: usize,
    /// Largest acceptable collapse cost.
    pub max_cost: f64,
    /// Largest acceptable squared distance.
    pub max_dist_sqr: f64,
}

impl Terminator {
    /// Floors and ceilings with no error limit.
    pub fn new(min_tris: usize, max_tris: usize, min_verts: usize, max_verts: usize) -> Self {
        Self {
            min_tris,
            max_tris,
            min_verts,
            max_verts,
            max_cost: f64::MAX,
            max_dist_sqr: f64::MAX,
        }
    }

    /// Set the collapse cost limit.
    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = max_cost;
        self
    }

    /// Set the distance limit.
    pub fn with_max_dist(mut self, max_dist: f64) -> Self {
        self.max_dist_sqr = max_dist * max_dist;
        self
    }
}

impl TerminationPolicy for Terminator {
    fn should_stop(&self, num_tris: usize, num_verts: usize, sqr_error: f64) -> bool {
        if num_tris <= self.min_tris || num_verts <= self.min_verts {
            return true;
        }
        num_tris < self.max_tris && num_verts < self.max_verts && sqr_error > self.max_cost
    }

    fn permits(&self, num_tris: usize, num_verts: usize) -> bool {
        num_tris >= self.min_tris && num_verts >= self.min_verts
    }

    fn target_tris(&self) -> usize {
        self.min_tris
    }

    fn limits_distance(&self) -> bool {
        self.max_dist_sqr < f64::MAX
    }

    fn should_stop_at_distance(&self, num_tris: usize, num_verts: usize, dist_sqr: f64) -> bool {
        num_tris < self.max_tris && num_verts < self.max_verts && dist_sqr > self.max_dist_sqr
    }
}
