//! The edge-collapse driver.

use std::collections::HashSet;

use log::{debug, info, trace};

use crate::algo::progress::Progress;
use crate::error::Result;
use crate::math::{SparseVec, Vec3d};
use crate::mesh::{BasicAttrVec, EdgeId, MeshManager, SkinnedVertex, TriangleId, VertexId};
use crate::quadric::{AttributeWeights, EdgeQuadric, FaceQuadric, FaceQuadricOptimizer, QuadricCache};

use super::{CostHeap, SimplifierOptions, TerminationPolicy};

/// Extra cost for every neighbouring triangle a collapse would flip.
const COALIGNMENT_PENALTY: f64 = 1.0e3;

/// A fully evaluated collapse of one edge group.
#[derive(Debug, Clone)]
struct CollapsePlan {
    /// Vertex group that disappears.
    from_group: Vec<VertexId>,
    /// Vertex group that survives.
    to_group: Vec<VertexId>,
    /// `(edge, from, to)` for every edge joining the two groups.
    pairs: Vec<(EdgeId, VertexId, VertexId)>,
    /// The collapsed state written to both endpoints of each pair.
    new_verts: Vec<SkinnedVertex>,
    position: Vec3d,
    cost: f64,
}

/// Quadric-driven simplifier for a skinned mesh.
///
/// Construct it from flat buffers, optionally lock the boundary, run
/// [`simplify`](Self::simplify) with a [`TerminationPolicy`], then read the
/// reduced mesh back with [`output`](Self::output).
#[derive(Debug)]
pub struct MeshSimplifier {
    mesh: MeshManager,
    cache: QuadricCache<BasicAttrVec, SparseVec>,
    heap: CostHeap,
    options: SimplifierOptions,
    /// Edges stamped with `mark` have been costed in the current pass.
    edge_marks: Vec<u32>,
    mark: u32,
}

fn face_quadric(mesh: &MeshManager, weights: &AttributeWeights, t: TriangleId) -> FaceQuadric {
    let [a, b, c] = mesh.triangle_vertices(t);
    FaceQuadric::from_face(mesh.vertex(a), mesh.vertex(b), mesh.vertex(c), &weights.basic, &weights.bones)
}

/// Plane constraints for the edges of `v` that border exactly one triangle
/// of its one-ring. Such edges lie on open boundaries or UV seams.
fn boundary_quadric(mesh: &MeshManager, v: VertexId, weight: f64) -> EdgeQuadric {
    let mut quadric = EdgeQuadric::zero();
    if weight <= 0.0 {
        return quadric;
    }
    let p = mesh.vertex(v).pos();
    for u in mesh.vertex_neighbors(v) {
        let mut shared = mesh
            .adjacent_triangles(v)
            .iter()
            .copied()
            .filter(|&t| mesh.triangle_vertices(t).contains(&u));
        let (Some(t), None) = (shared.next(), shared.next()) else {
            continue;
        };
        if let Some(n) = mesh.triangle_normal(t) {
            quadric += &EdgeQuadric::new(&p, &mesh.vertex(u).pos(), &n, weight);
        }
    }
    quadric
}

fn unit_normal(a: &Vec3d, b: &Vec3d, c: &Vec3d) -> Option<Vec3d> {
    (b - a).cross(&(c - a)).try_normalize(1.0e-12)
}

impl MeshSimplifier {
    /// Build a simplifier over a copy of the given buffers.
    ///
    /// # Errors
    ///
    /// Fails if the options are invalid or the index buffer is malformed.
    pub fn new(vertices: &[SkinnedVertex], indices: &[u32], options: SimplifierOptions) -> Result<Self> {
        options.validate()?;
        let mut mesh = MeshManager::new(vertices, indices, options.coincident_tolerance)?;
        if options.lock_boundary {
            let locked = mesh.lock_boundary();
            debug!("locked {} boundary edges", locked);
        }

        let cache = QuadricCache::new(mesh.vertex_capacity(), mesh.triangle_capacity());
        let heap = CostHeap::new(mesh.edge_capacity());
        let edge_marks = vec![0; mesh.edge_capacity()];

        Ok(Self {
            mesh,
            cache,
            heap,
            options,
            edge_marks,
            mark: 0,
        })
    }

    /// Lock every vertex on an open boundary.
    ///
    /// Has to be called before [`simplify`](Self::simplify).
    pub fn set_boundary_locked(&mut self) {
        self.mesh.lock_boundary();
    }

    /// The topology being simplified.
    pub fn mesh(&self) -> &MeshManager {
        &self.mesh
    }

    /// Number of active triangles.
    pub fn num_tris(&self) -> usize {
        self.mesh.num_tris()
    }

    /// Number of active vertices.
    pub fn num_verts(&self) -> usize {
        self.mesh.num_verts()
    }

    /// Run the collapse loop. Returns the largest accepted collapse cost, or
    /// the largest squared surface deviation if `policy` limits distance.
    pub fn simplify<P: TerminationPolicy>(&mut self, policy: &P) -> f64 {
        self.simplify_with_progress(policy, &Progress::none())
    }

    /// Run the collapse loop, reporting `(removed triangles, triangles to
    /// remove)` after every collapse.
    pub fn simplify_with_progress<P: TerminationPolicy>(&mut self, policy: &P, progress: &Progress) -> f64 {
        let start_tris = self.mesh.num_tris();
        let to_remove = start_tris.saturating_sub(policy.target_tris()).max(1);
        info!(
            "simplifying {} triangles, {} vertices (target {} triangles)",
            start_tris,
            self.mesh.num_verts(),
            policy.target_tris()
        );

        self.init_costs();

        let limits_distance = policy.limits_distance();
        let mut max_error = 0.0f64;
        let mut max_dist_sqr = 0.0f64;
        let mut collapses = 0usize;

        while let Some((index, cost)) = self.heap.pop() {
            if policy.should_stop(self.mesh.num_tris(), self.mesh.num_verts(), cost) {
                break;
            }
            if !cost.is_finite() {
                // Everything left is uncollapsible.
                break;
            }

            let e = EdgeId::new(index);
            if self.mesh.is_edge_removed(e) {
                continue;
            }

            let group_edges = self.mesh.edge_group(e);
            for dead in self.mesh.remove_if_degenerate_edges(&group_edges) {
                self.heap.remove(dead.index());
            }
            if self.mesh.is_edge_removed(e) {
                continue;
            }

            let Some(plan) = self.plan_collapse(e) else {
                continue;
            };
            if !plan.cost.is_finite() {
                continue;
            }

            let dist_sqr = if limits_distance {
                self.collapse_distance(&plan)
            } else {
                0.0
            };
            if policy.should_stop_at_distance(self.mesh.num_tris(), self.mesh.num_verts(), dist_sqr) {
                break;
            }

            let tris_removed: usize = plan
                .pairs
                .iter()
                .map(|&(pe, _, _)| self.mesh.edge_triangles(pe).len())
                .sum();
            let tris_after = self.mesh.num_tris().saturating_sub(tris_removed);
            let verts_after = self.mesh.num_verts().saturating_sub(plan.pairs.len());
            if !policy.permits(tris_after, verts_after) {
                trace!("collapse of {:?} would cross the floor", e);
                continue;
            }

            self.apply(&plan);

            max_error = max_error.max(cost);
            max_dist_sqr = max_dist_sqr.max(dist_sqr);
            collapses += 1;
            progress.report(
                start_tris.saturating_sub(self.mesh.num_tris()).min(to_remove),
                to_remove,
                "Collapsing edges",
            );
        }

        self.sweep_degenerates();

        info!(
            "simplified to {} triangles, {} vertices after {} collapses (max error {:.6})",
            self.mesh.num_tris(),
            self.mesh.num_verts(),
            collapses,
            max_error
        );
        if limits_distance {
            debug!("max squared deviation {:.6e}", max_dist_sqr);
            max_dist_sqr
        } else {
            max_error
        }
    }

    /// The reduced mesh as flat buffers.
    pub fn output(&self) -> (Vec<SkinnedVertex>, Vec<u32>) {
        self.mesh
            .output(self.options.merge_coincident_bones, self.options.weld_tolerance)
    }

    fn init_costs(&mut self) {
        self.heap.clear();
        let mark = self.next_mark();
        let edges: Vec<EdgeId> = self.mesh.edge_ids().collect();
        for e in edges {
            if self.edge_marks[e.index()] != mark {
                self.update_group_cost(e, mark);
            }
        }
        debug!("queued {} edges", self.heap.len());
    }

    /// A fresh stamp for `edge_marks`.
    fn next_mark(&mut self) -> u32 {
        self.mark = self.mark.wrapping_add(1);
        if self.mark == 0 {
            self.edge_marks.fill(0);
            self.mark = 1;
        }
        self.mark
    }

    /// Cost the group of `e` once and queue every member with that cost.
    fn update_group_cost(&mut self, e: EdgeId, mark: u32) {
        let group = self.mesh.edge_group(e);
        for g in &group {
            self.edge_marks[g.index()] = mark;
        }
        let cost = self.plan_collapse(e).map_or(f64::INFINITY, |p| p.cost);
        for g in group {
            self.heap.add(g.index(), cost);
        }
    }

    fn wedge_quadric(&mut self, v: VertexId) -> FaceQuadric {
        let mesh = &self.mesh;
        let weights = &self.options.weights;
        self.cache
            .wedge_quadric(v, mesh.adjacent_triangles(v), |t| face_quadric(mesh, weights, t))
            .clone()
    }

    fn edge_quadric(&mut self, v: VertexId) -> EdgeQuadric {
        let mesh = &self.mesh;
        let weight = self.options.boundary_weight;
        *self.cache.edge_quadric(v, || boundary_quadric(mesh, v, weight))
    }

    /// Squared distance from the collapse position to the planes around both
    /// groups.
    fn collapse_distance(&mut self, plan: &CollapsePlan) -> f64 {
        let mut planes = FaceQuadric::zero();
        for &v in plan.from_group.iter().chain(&plan.to_group) {
            planes += &self.wedge_quadric(v);
        }
        planes.distance_sqr(&plan.position)
    }

    /// Evaluate the collapse of the group of `e`.
    ///
    /// Returns `None` if the edge may never collapse: both groups locked, or
    /// different dominant bones while bone boundaries are enforced.
    fn plan_collapse(&mut self, e: EdgeId) -> Option<CollapsePlan> {
        let (a, b) = self.mesh.edge_vertices(e);
        if self.mesh.is_vertex_removed(a) || self.mesh.is_vertex_removed(b) {
            return None;
        }

        let mut from_group = self.mesh.vertex_group(a);
        let mut to_group = self.mesh.vertex_group(b);
        let from_locked = from_group.iter().any(|&v| self.mesh.is_vertex_locked(v));
        let to_locked = to_group.iter().any(|&v| self.mesh.is_vertex_locked(v));
        if from_locked && to_locked {
            return None;
        }
        if self.options.enforce_bone_boundaries
            && self.mesh.vertex(a).dominant_bone() != self.mesh.vertex(b).dominant_bone()
        {
            return None;
        }
        if from_locked {
            std::mem::swap(&mut from_group, &mut to_group);
        }
        let pinned = from_locked || to_locked;
        let from_set: HashSet<VertexId> = from_group.iter().copied().collect();
        let to_set: HashSet<VertexId> = to_group.iter().copied().collect();

        let mut pairs = Vec::new();
        for pe in self.mesh.edge_group(e) {
            let (u0, u1) = self.mesh.edge_vertices(pe);
            if from_set.contains(&u0) && to_set.contains(&u1) {
                pairs.push((pe, u0, u1));
            } else if from_set.contains(&u1) && to_set.contains(&u0) {
                pairs.push((pe, u1, u0));
            }
        }
        if pairs.is_empty() {
            return None;
        }

        let p_from = self.mesh.vertex(from_group[0]).pos();
        let p_to = self.mesh.vertex(to_group[0]).pos();

        let mut candidates = Vec::with_capacity(3);
        if pinned {
            candidates.push(p_to);
        } else {
            let mut optimizer = FaceQuadricOptimizer::new();
            for &v in from_group.iter().chain(&to_group) {
                optimizer.add_face_quadric(&self.wedge_quadric(v));
                optimizer.add_edge_quadric(&self.edge_quadric(v));
            }
            match optimizer.optimize(self.options.preserve_volume(), self.options.volume_importance) {
                Some(p) if p.iter().all(|c| c.is_finite()) => candidates.push(p),
                _ => {
                    candidates.push(p_to);
                    candidates.push(p_from);
                    candidates.push((p_from + p_to) * 0.5);
                }
            }
        }

        let mut best: Option<CollapsePlan> = None;
        for position in candidates {
            let (cost, new_verts) = self.evaluate_at(&from_group, &to_group, &from_set, &to_set, &pairs, &position);
            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(CollapsePlan {
                    from_group: from_group.clone(),
                    to_group: to_group.clone(),
                    pairs: pairs.clone(),
                    new_verts,
                    position,
                    cost,
                });
            }
        }
        best
    }

    /// Total cost of collapsing both groups onto `position`, along with the
    /// collapsed state of every pair.
    fn evaluate_at(
        &mut self,
        from_group: &[VertexId],
        to_group: &[VertexId],
        from_set: &HashSet<VertexId>,
        to_set: &HashSet<VertexId>,
        pairs: &[(EdgeId, VertexId, VertexId)],
        position: &Vec3d,
    ) -> (f64, Vec<SkinnedVertex>) {
        let mut cost = 0.0;
        let mut new_verts = Vec::with_capacity(pairs.len());
        let mut paired = HashSet::with_capacity(2 * pairs.len());

        for &(_, from, to) in pairs {
            let mut quadric = self.wedge_quadric(from);
            quadric += &self.wedge_quadric(to);

            let mut vert = self.mesh.vertex(to).clone();
            vert.set_pos(position);
            let weights = &self.options.weights;
            quadric.calc_attributes(&mut vert, &weights.basic, &weights.bones);

            // Bones come from the nearer endpoint rather than the quadric fit.
            let from_vert = self.mesh.vertex(from);
            let to_vert = self.mesh.vertex(to);
            let d_from = (from_vert.pos() - position).norm_squared();
            let d_to = (to_vert.pos() - position).norm_squared();
            vert.bones = if d_from < d_to {
                from_vert.bones.clone()
            } else {
                to_vert.bones.clone()
            };
            vert.correct();

            cost += quadric.evaluate(&vert, &weights.basic, &weights.bones);
            new_verts.push(vert);
            paired.insert(from);
            paired.insert(to);
        }

        let mut boundary = EdgeQuadric::zero();
        let mut specialized = 0.0f64;
        for &v in from_group.iter().chain(to_group) {
            boundary += &self.edge_quadric(v);
            specialized = specialized.max(f64::from(self.mesh.vertex(v).specialized_weight));
            if paired.contains(&v) {
                continue;
            }
            let quadric = self.wedge_quadric(v);
            let mut moved = self.mesh.vertex(v).clone();
            moved.set_pos(position);
            let weights = &self.options.weights;
            cost += quadric.evaluate(&moved, &weights.basic, &weights.bones);
        }
        cost += boundary.evaluate(position);

        let p_from = self.mesh.vertex(from_group[0]).pos();
        let p_to = self.mesh.vertex(to_group[0]).pos();
        let dist_sqr = (p_from - p_to).norm_squared();
        cost += specialized * dist_sqr;
        cost += self.coalignment_penalty(from_group, to_group, from_set, to_set, position, dist_sqr);

        if cost.is_nan() {
            cost = f64::INFINITY;
        }
        (cost, new_verts)
    }

    /// Penalty for neighbouring triangles that would rotate past the
    /// co-alignment limit or collapse to nothing.
    fn coalignment_penalty(
        &self,
        from_group: &[VertexId],
        to_group: &[VertexId],
        from_set: &HashSet<VertexId>,
        to_set: &HashSet<VertexId>,
        position: &Vec3d,
        dist_sqr: f64,
    ) -> f64 {
        let in_from = |v: &VertexId| from_set.contains(v);
        let in_to = |v: &VertexId| to_set.contains(v);

        let mut visited: HashSet<TriangleId> = HashSet::new();
        let mut penalty = 0.0;
        for &g in from_group.iter().chain(to_group) {
            for &t in self.mesh.adjacent_triangles(g) {
                if !visited.insert(t) {
                    continue;
                }

                let corners = self.mesh.triangle_vertices(t);
                if corners.iter().any(in_from) && corners.iter().any(in_to) {
                    // Removed by the collapse.
                    continue;
                }
                let old = corners.map(|v| self.mesh.vertex(v).pos());
                let Some(old_normal) = unit_normal(&old[0], &old[1], &old[2]) else {
                    continue;
                };
                let new = corners.map(|v| {
                    if in_from(&v) || in_to(&v) {
                        *position
                    } else {
                        self.mesh.vertex(v).pos()
                    }
                });
                match unit_normal(&new[0], &new[1], &new[2]) {
                    Some(n) if n.dot(&old_normal) >= self.options.coalignment_limit => {}
                    _ => penalty += dist_sqr * COALIGNMENT_PENALTY,
                }
            }
        }
        penalty
    }

    /// Carry out a planned collapse and refresh the costs around it.
    fn apply(&mut self, plan: &CollapsePlan) {
        let groups: Vec<VertexId> = plan.from_group.iter().chain(&plan.to_group).copied().collect();

        // Everything touched by the collapse, gathered before mutating.
        let mut affected_tris: Vec<TriangleId> = groups
            .iter()
            .flat_map(|&v| self.mesh.adjacent_triangles(v).iter().copied())
            .collect();
        affected_tris.sort_unstable();
        affected_tris.dedup();
        let mut affected: Vec<VertexId> = affected_tris
            .iter()
            .flat_map(|&t| self.mesh.triangle_vertices(t))
            .chain(groups.iter().copied())
            .collect();
        affected.sort_unstable();
        affected.dedup();

        // Write the collapsed state to both ends first, then collapse.
        for (&(_, from, to), vert) in plan.pairs.iter().zip(&plan.new_verts) {
            *self.mesh.vertex_mut(from) = vert.clone();
            *self.mesh.vertex_mut(to) = vert.clone();
        }
        let paired: HashSet<VertexId> = plan.pairs.iter().flat_map(|&(_, from, to)| [from, to]).collect();
        for &v in &groups {
            if !paired.contains(&v) {
                self.mesh.vertex_mut(v).set_pos(&plan.position);
            }
        }

        let mut dead_edges = Vec::new();
        let mut moved_edges = Vec::new();
        for &(pe, from, to) in &plan.pairs {
            if let Some(record) = self.mesh.collapse_edge(pe, from, to) {
                dead_edges.extend(record.removed_edges);
                moved_edges.extend(record.moved_edges);
            }
        }

        let survivors: Vec<VertexId> = groups
            .iter()
            .copied()
            .filter(|&v| !self.mesh.is_vertex_removed(v))
            .collect();
        for w in survivors.windows(2) {
            self.mesh.merge_vertex_groups(w[0], w[1]);
        }

        for &t in &affected_tris {
            self.cache.dirty_tri_quadric(t);
        }
        for &v in &affected {
            self.cache.dirty_vert_quadric(v);
            self.cache.dirty_edge_quadric(v);
        }

        self.mesh.remove_if_degenerate_triangles(&affected_tris);
        dead_edges.extend(self.mesh.remove_if_degenerate_vertices(&affected));
        let mut candidates: Vec<EdgeId> = affected
            .iter()
            .flat_map(|&v| self.mesh.adjacent_edges(v).iter().copied())
            .chain(moved_edges)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        dead_edges.extend(self.mesh.remove_if_degenerate_edges(&candidates));
        for e in dead_edges {
            self.heap.remove(e.index());
        }

        candidates.retain(|&e| !self.mesh.is_edge_removed(e));
        self.mesh.rebuild_edge_link_lists(&candidates);

        // Any edge of a group touching the region may have a new cost.
        let mut seen_groups: HashSet<VertexId> = HashSet::new();
        let mark = self.next_mark();
        for &v in &affected {
            if self.mesh.is_vertex_removed(v) || !seen_groups.insert(v) {
                continue;
            }
            let group = self.mesh.vertex_group(v);
            seen_groups.extend(group.iter().copied());
            for g in group {
                let edges = self.mesh.adjacent_edges(g).to_vec();
                for e in edges {
                    if self.edge_marks[e.index()] != mark {
                        self.update_group_cost(e, mark);
                    }
                }
            }
        }
    }

    /// Remove whatever degenerate triangles and orphaned vertices remain.
    fn sweep_degenerates(&mut self) {
        let tris: Vec<TriangleId> = self.mesh.triangle_ids().collect();
        let removed_tris = self.mesh.remove_if_degenerate_triangles(&tris);
        let verts: Vec<VertexId> = self.mesh.vertex_ids().collect();
        let removed_edges = self.mesh.remove_if_degenerate_vertices(&verts);
        let edges: Vec<EdgeId> = self.mesh.edge_ids().collect();
        let orphaned = self.mesh.remove_if_degenerate_edges(&edges);
        if !removed_tris.is_empty() || !removed_edges.is_empty() || !orphaned.is_empty() {
            debug!(
                "final sweep removed {} triangles, {} edges",
                removed_tris.len(),
                removed_edges.len() + orphaned.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::simplify::Terminator;
    use nalgebra::{Point3, Vector2};

    fn unit_cube() -> (Vec<SkinnedVertex>, Vec<u32>) {
        let verts = (0..8)
            .map(|i| {
                SkinnedVertex::new(Point3::new(
                    (i & 1) as f32,
                    ((i >> 1) & 1) as f32,
                    ((i >> 2) & 1) as f32,
                ))
            })
            .collect();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 3, 0, 3, 1, // z = 0
            4, 5, 7, 4, 7, 6, // z = 1
            0, 1, 5, 0, 5, 4, // y = 0
            2, 6, 7, 2, 7, 3, // y = 1
            0, 4, 6, 0, 6, 2, // x = 0
            1, 3, 7, 1, 7, 5, // x = 1
        ];
        (verts, indices)
    }

    fn bbox(verts: &[SkinnedVertex]) -> (Point3<f32>, Point3<f32>) {
        verts.iter().fold(
            (Point3::new(f32::MAX, f32::MAX, f32::MAX), Point3::new(f32::MIN, f32::MIN, f32::MIN)),
            |(lo, hi), v| (lo.inf(&v.position), hi.sup(&v.position)),
        )
    }

    fn area(verts: &[SkinnedVertex], tri: &[u32]) -> f64 {
        let p = |i: u32| verts[i as usize].pos();
        0.5 * (p(tri[1]) - p(tri[0])).cross(&(p(tri[2]) - p(tri[0]))).norm()
    }

    #[test]
    fn test_cube_half() {
        let (verts, indices) = unit_cube();
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.simplify(&Terminator::new(6, 12, 0, 8));
        assert!(simplifier.mesh().is_valid());

        let (out_verts, out_indices) = simplifier.output();
        assert_eq!(out_indices.len() / 3, 6);
        for tri in out_indices.chunks_exact(3) {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
            assert!(area(&out_verts, tri) > 1e-12);
        }
    }

    #[test]
    fn test_cube_full_is_identity() {
        let (verts, indices) = unit_cube();
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        let error = simplifier.simplify(&Terminator::new(12, 12, 0, 8));
        assert_eq!(error, 0.0);

        let (out_verts, out_indices) = simplifier.output();
        assert_eq!(out_indices.len(), 36);
        assert_eq!(out_verts.len(), 8);
        assert_eq!(bbox(&out_verts), bbox(&verts));
    }

    #[test]
    fn test_lock_boundary_on_closed_mesh() {
        // A closed cube has no boundary, so locking leaves it collapsible.
        let (verts, indices) = unit_cube();
        let options = SimplifierOptions::default().with_lock_boundary(true);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, options).unwrap();
        assert!(simplifier.mesh().vertex_ids().all(|v| !simplifier.mesh().is_vertex_locked(v)));
        simplifier.simplify(&Terminator::new(10, 12, 0, 8));
        assert_eq!(simplifier.num_tris(), 10);
    }

    fn seam_quad(uv_differs: bool) -> (Vec<SkinnedVertex>, Vec<u32>) {
        let offset = if uv_differs { 0.5 } else { 0.0 };
        let p = |x: f32, y: f32| Point3::new(x, y, 0.0);
        let verts = vec![
            SkinnedVertex::new(p(0.0, 0.0)).with_uv(0, Vector2::new(0.0, 0.0)),
            SkinnedVertex::new(p(1.0, 0.0)).with_uv(0, Vector2::new(1.0, 0.0)),
            SkinnedVertex::new(p(1.0, 1.0)).with_uv(0, Vector2::new(1.0, 1.0)),
            SkinnedVertex::new(p(0.0, 0.0)).with_uv(0, Vector2::new(offset, 0.0)),
            SkinnedVertex::new(p(1.0, 1.0)).with_uv(0, Vector2::new(1.0 + offset, 1.0)),
            SkinnedVertex::new(p(0.0, 1.0)).with_uv(0, Vector2::new(offset, 1.0)),
        ];
        (verts, vec![0, 1, 2, 3, 4, 5])
    }

    #[test]
    fn test_seam_quad_at_floor() {
        // Two triangles are already below the floor of four: nothing collapses,
        // and output welding decides how many vertices remain.
        let (verts, indices) = seam_quad(false);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.simplify(&Terminator::new(4, 2, 0, 6));
        let (out_verts, out_indices) = simplifier.output();
        assert_eq!(out_indices.len(), 6);
        assert_eq!(out_verts.len(), 4);

        let (verts, indices) = seam_quad(true);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.simplify(&Terminator::new(4, 2, 0, 6));
        let (out_verts, out_indices) = simplifier.output();
        assert_eq!(out_indices.len(), 6);
        assert_eq!(out_verts.len(), 6);
    }

    fn grid(n: u32) -> (Vec<SkinnedVertex>, Vec<u32>) {
        let mut verts = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                let uv = Vector2::new(x as f32 / n as f32, y as f32 / n as f32);
                let bone = if x < n / 2 { 0 } else { 1 };
                verts.push(
                    SkinnedVertex::new(Point3::new(x as f32, y as f32, 0.0))
                        .with_uv(0, uv)
                        .with_bone(bone, 1.0),
                );
            }
        }
        let mut indices = Vec::new();
        for y in 0..n {
            for x in 0..n {
                let i = y * (n + 1) + x;
                indices.extend_from_slice(&[i, i + 1, i + n + 2, i, i + n + 2, i + n + 1]);
            }
        }
        (verts, indices)
    }

    #[test]
    fn test_grid_reduction_properties() {
        let (verts, indices) = grid(8);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.simplify(&Terminator::new(32, 128, 0, 81));
        assert!(simplifier.mesh().is_valid());
        assert!(simplifier.num_tris() <= 128);

        let (out_verts, out_indices) = simplifier.output();
        assert!(out_indices.len() / 3 <= 128);
        for tri in out_indices.chunks_exact(3) {
            assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
            assert!(tri.iter().all(|&i| (i as usize) < out_verts.len()));
        }
        for v in &out_verts {
            if !v.bones.is_empty() {
                assert!((v.bones.sum() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_locked_boundary_keeps_outline() {
        let (verts, indices) = grid(4);
        let options = SimplifierOptions::default().with_lock_boundary(true);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, options).unwrap();
        simplifier.simplify(&Terminator::new(4, 32, 0, 25));

        // Locked corners keep their exact positions and nothing leaves the outline.
        let (out_verts, _) = simplifier.output();
        for corner in [(0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (4.0, 4.0)] {
            assert!(out_verts
                .iter()
                .any(|v| v.position == Point3::new(corner.0, corner.1, 0.0)));
        }
        for v in &out_verts {
            assert!((-1e-4..=4.0001).contains(&v.position.x));
            assert!((-1e-4..=4.0001).contains(&v.position.y));
        }
    }

    #[test]
    fn test_enforced_bone_boundary_survives() {
        let (verts, indices) = grid(4);
        let options = SimplifierOptions::default().with_enforce_bone_boundaries(true);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, options).unwrap();
        simplifier.simplify(&Terminator::new(4, 32, 0, 25));

        // Both bone regions keep vertices.
        let (out_verts, _) = simplifier.output();
        assert!(out_verts.iter().any(|v| v.dominant_bone() == Some(0)));
        assert!(out_verts.iter().any(|v| v.dominant_bone() == Some(1)));
    }

    #[test]
    fn test_heap_pops_in_cost_order() {
        // Drive real collapses and check the heap top against a full scan of
        // every queued key after each one.
        let (verts, indices) = grid(4);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.init_costs();

        let mut collapses = 0;
        while simplifier.num_tris() > 8 {
            let Some((i, cost)) = simplifier.heap.peek() else {
                break;
            };
            let min = (0..simplifier.mesh.edge_capacity())
                .filter_map(|e| simplifier.heap.key(e))
                .fold(f64::INFINITY, f64::min);
            assert_eq!(cost, min);
            simplifier.heap.pop();
            if !cost.is_finite() {
                break;
            }

            let e = EdgeId::new(i);
            if simplifier.mesh.is_edge_removed(e) {
                continue;
            }
            let group = simplifier.mesh.edge_group(e);
            for dead in simplifier.mesh.remove_if_degenerate_edges(&group) {
                simplifier.heap.remove(dead.index());
            }
            if simplifier.mesh.is_edge_removed(e) {
                continue;
            }
            if let Some(plan) = simplifier.plan_collapse(e) {
                if plan.cost.is_finite() {
                    simplifier.apply(&plan);
                    collapses += 1;
                }
            }
        }

        assert!(collapses > 0);
        assert!(simplifier.mesh().is_valid());
    }

    /// A curved `n` by `n` grid, `z = (x² + y²) / 4` around its center.
    fn bowl(n: u32) -> (Vec<SkinnedVertex>, Vec<u32>) {
        let (mut verts, indices) = grid(n);
        let c = n as f32 / 2.0;
        for v in &mut verts {
            let (x, y) = (v.position.x - c, v.position.y - c);
            v.position.z = 0.25 * (x * x + y * y);
        }
        (verts, indices)
    }

    #[test]
    fn test_distance_limit_stops_early() {
        let (verts, indices) = bowl(6);
        let open = Terminator::new(4, usize::MAX, 0, usize::MAX);

        let mut unlimited = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        unlimited.simplify(&open);

        let mut limited = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        let deviation = limited.simplify(&open.with_max_dist(1.0e-3));

        assert!(limited.num_tris() > unlimited.num_tris());
        assert!(deviation <= 1.0e-6);
        assert!(limited.mesh().is_valid());
    }

    /// An open cone whose apex is split into one wedge per segment, giving a
    /// single vertex group of `segments` coincident vertices.
    fn split_apex_cone(segments: u32) -> (Vec<SkinnedVertex>, Vec<u32>) {
        let mut verts = Vec::new();
        for s in 0..segments {
            let a = std::f32::consts::TAU * s as f32 / segments as f32;
            verts.push(
                SkinnedVertex::new(Point3::new(a.cos(), a.sin(), 0.0))
                    .with_uv(0, Vector2::new(s as f32 / segments as f32, 0.0)),
            );
        }
        for s in 0..segments {
            verts.push(
                SkinnedVertex::new(Point3::new(0.0, 0.0, 1.0))
                    .with_uv(0, Vector2::new((s as f32 + 0.5) / segments as f32, 1.0)),
            );
        }
        let mut indices = Vec::new();
        for s in 0..segments {
            indices.extend_from_slice(&[segments + s, s, (s + 1) % segments]);
        }
        (verts, indices)
    }

    #[test]
    fn test_split_apex_group() {
        let (verts, indices) = split_apex_cone(64);
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        let apex = VertexId::new(64);
        assert_eq!(simplifier.mesh().vertex_group(apex).len(), 64);

        simplifier.simplify(&Terminator::new(16, 64, 0, 128));
        assert!(simplifier.num_tris() < 64);
        assert!(simplifier.mesh().is_valid());

        let (out_verts, out_indices) = simplifier.output();
        assert!(out_indices.iter().all(|&i| (i as usize) < out_verts.len()));
    }

    #[test]
    fn test_edge_marks_wrap() {
        let (verts, indices) = unit_cube();
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.edge_marks.fill(7);
        simplifier.mark = u32::MAX;

        assert_eq!(simplifier.next_mark(), 1);
        assert!(simplifier.edge_marks.iter().all(|&m| m == 0));
        assert_eq!(simplifier.next_mark(), 2);

        // Costing still reaches every edge after the wrap.
        simplifier.init_costs();
        assert_eq!(simplifier.heap.len(), simplifier.mesh().edge_capacity());
    }

    #[test]
    fn test_progress_reports() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let (verts, indices) = unit_cube();
        let mut simplifier = MeshSimplifier::new(&verts, &indices, SimplifierOptions::default()).unwrap();
        simplifier.simplify_with_progress(&Terminator::new(8, 12, 0, 8), &progress);
        assert!(calls.load(Ordering::Relaxed) >= 1);
    }
}
