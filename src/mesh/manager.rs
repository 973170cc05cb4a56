//! The mesh topology manager.
//!
//! [`MeshManager`] owns three fixed arenas (vertices, triangles, edges) sized
//! once from the input mesh. Entities are never deallocated: removal sets the
//! [`SimpFlags::REMOVED`] flag and unlinks the entity from adjacency lists and
//! groups, so handles stay stable for the manager's lifetime.
//!
//! # Groups
//!
//! Split vertices (several vertex instances at one position, e.g. along UV
//! seams or hard edges) are linked into circular *vertex groups* through
//! `next`/`prev` handles. Edges whose endpoints fall into the same pair of
//! vertex groups form circular *edge groups*. A singleton group points at
//! itself.
//!
//! ```text
//!   UV seam            vertex groups        edge group
//!   a ---- b           {a, a'}              {(a, b), (a', b')}
//!   a'---- b'          {b, b'}
//! ```

use std::collections::HashMap;

use bitflags::bitflags;
use log::trace;

use crate::error::{ReductionError, Result};
use crate::math::{SparseVec, Vec3d};

use super::{EdgeId, SkinnedVertex, TriangleId, VertexId};

/// Triangles with less area than this are degenerate.
const DEGENERATE_AREA: f64 = 1.0e-12;

bitflags! {
    /// State flags shared by vertices, triangles and edges.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct SimpFlags: u8 {
        /// The entity has been removed. One way.
        const REMOVED = 0b0000_0001;
        /// The vertex may not move.
        const LOCKED = 0b0000_0010;
    }
}

#[derive(Debug, Clone)]
struct SimpVertex {
    vert: SkinnedVertex,
    flags: SimpFlags,
    next: VertexId,
    prev: VertexId,
    adj_tris: Vec<TriangleId>,
    adj_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, Copy)]
struct SimpTriangle {
    verts: [VertexId; 3],
    flags: SimpFlags,
}

impl SimpTriangle {
    #[inline]
    fn has_vertex(&self, v: VertexId) -> bool {
        self.verts.contains(&v)
    }
}

#[derive(Debug, Clone, Copy)]
struct SimpEdge {
    v0: VertexId,
    v1: VertexId,
    flags: SimpFlags,
    next: EdgeId,
    prev: EdgeId,
}

impl SimpEdge {
    #[inline]
    fn other(&self, v: VertexId) -> VertexId {
        if self.v0 == v {
            self.v1
        } else {
            self.v0
        }
    }
}

/// What a single [`MeshManager::collapse_edge`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapseRecord {
    /// Triangles that contained both endpoints.
    pub removed_triangles: Vec<TriangleId>,
    /// Edges removed: the collapsed edge and edges that became duplicates.
    pub removed_edges: Vec<EdgeId>,
    /// Edges re-targeted from the removed vertex to the surviving one.
    pub moved_edges: Vec<EdgeId>,
}

#[inline]
fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Arena-backed triangle mesh with vertex and edge groups.
#[derive(Debug, Clone)]
pub struct MeshManager {
    verts: Vec<SimpVertex>,
    tris: Vec<SimpTriangle>,
    edges: Vec<SimpEdge>,
    edge_map: HashMap<(VertexId, VertexId), EdgeId>,
    num_active_verts: usize,
    num_active_tris: usize,
}

impl MeshManager {
    /// Build the manager from a vertex buffer and a triangle index buffer.
    ///
    /// Vertices whose positions agree within `coincident_tolerance` are linked
    /// into vertex groups. Triangles that repeat a vertex index are created
    /// removed, as are vertices that no triangle references.
    ///
    /// # Errors
    ///
    /// Returns an error if the index buffer is malformed or holds no usable
    /// triangle.
    pub fn new(vertices: &[SkinnedVertex], indices: &[u32], coincident_tolerance: f32) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(ReductionError::InvalidIndexCount(indices.len()));
        }
        if indices.is_empty() {
            return Err(ReductionError::EmptyMesh);
        }
        for (i, &idx) in indices.iter().enumerate() {
            if idx as usize >= vertices.len() {
                return Err(ReductionError::InvalidVertexIndex {
                    triangle: i / 3,
                    vertex: idx as usize,
                });
            }
        }

        let verts = vertices
            .iter()
            .enumerate()
            .map(|(i, v)| SimpVertex {
                vert: v.clone(),
                flags: SimpFlags::empty(),
                next: VertexId::new(i),
                prev: VertexId::new(i),
                adj_tris: Vec::new(),
                adj_edges: Vec::new(),
            })
            .collect();

        let num_tris = indices.len() / 3;
        let max_edges = edge_capacity_bound(num_tris, vertices.len());
        let mut mesh = Self {
            verts,
            tris: Vec::with_capacity(num_tris),
            edges: Vec::with_capacity(max_edges),
            edge_map: HashMap::with_capacity(max_edges),
            num_active_verts: 0,
            num_active_tris: 0,
        };

        for (t, corners) in indices.chunks_exact(3).enumerate() {
            let tid = TriangleId::new(t);
            let verts = [
                VertexId::new(corners[0] as usize),
                VertexId::new(corners[1] as usize),
                VertexId::new(corners[2] as usize),
            ];
            let repeated = verts[0] == verts[1] || verts[1] == verts[2] || verts[0] == verts[2];
            let flags = if repeated {
                SimpFlags::REMOVED
            } else {
                for v in verts {
                    mesh.verts[v.index()].adj_tris.push(tid);
                }
                mesh.num_active_tris += 1;
                SimpFlags::empty()
            };
            mesh.tris.push(SimpTriangle { verts, flags });
        }

        if mesh.num_active_tris == 0 {
            return Err(ReductionError::EmptyMesh);
        }

        for v in mesh.verts.iter_mut() {
            if v.adj_tris.is_empty() {
                v.flags.insert(SimpFlags::REMOVED);
            } else {
                mesh.num_active_verts += 1;
            }
        }

        mesh.group_coincident_vertices(coincident_tolerance);
        mesh.build_edges();
        mesh.group_edges();

        Ok(mesh)
    }

    fn group_coincident_vertices(&mut self, tolerance: f32) {
        let tol = f64::from(tolerance).max(f64::from(f32::EPSILON));
        let tol_sqr = tol * tol;
        let inv_cell = 1.0 / tol;
        let cell_of = |p: &Vec3d| -> [i64; 3] {
            [
                (p.x * inv_cell).floor() as i64,
                (p.y * inv_cell).floor() as i64,
                (p.z * inv_cell).floor() as i64,
            ]
        };

        let mut grid: HashMap<[i64; 3], Vec<VertexId>> = HashMap::new();
        for i in 0..self.verts.len() {
            if self.verts[i].flags.contains(SimpFlags::REMOVED) {
                continue;
            }
            let v = VertexId::new(i);
            let p = self.verts[i].vert.pos();
            let cell = cell_of(&p);

            let mut found = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                        let Some(bucket) = grid.get(&key) else {
                            continue;
                        };
                        for &u in bucket {
                            if (self.verts[u.index()].vert.pos() - p).norm_squared() <= tol_sqr {
                                found = Some(u);
                                break 'search;
                            }
                        }
                    }
                }
            }

            if let Some(u) = found {
                self.splice_vertex_groups(u, v);
            }
            grid.entry(cell).or_default().push(v);
        }
    }

    fn build_edges(&mut self) {
        for t in 0..self.tris.len() {
            let tri = self.tris[t];
            if tri.flags.contains(SimpFlags::REMOVED) {
                continue;
            }
            for k in 0..3 {
                let key = edge_key(tri.verts[k], tri.verts[(k + 1) % 3]);
                if self.edge_map.contains_key(&key) {
                    continue;
                }
                let eid = EdgeId::new(self.edges.len());
                self.edges.push(SimpEdge {
                    v0: key.0,
                    v1: key.1,
                    flags: SimpFlags::empty(),
                    next: eid,
                    prev: eid,
                });
                self.edge_map.insert(key, eid);
                self.verts[key.0.index()].adj_edges.push(eid);
                self.verts[key.1.index()].adj_edges.push(eid);
            }
        }
    }

    fn group_edges(&mut self) {
        // Representative of each vertex group: its smallest handle.
        let mut rep = vec![VertexId::INVALID; self.verts.len()];
        for i in 0..self.verts.len() {
            if rep[i].is_valid() || self.verts[i].flags.contains(SimpFlags::REMOVED) {
                continue;
            }
            let group = self.vertex_group(VertexId::new(i));
            let min = group.iter().copied().min().unwrap_or(VertexId::new(i));
            for g in group {
                rep[g.index()] = min;
            }
        }

        let mut first_in_group: HashMap<(VertexId, VertexId), EdgeId> = HashMap::new();
        for e in 0..self.edges.len() {
            let eid = EdgeId::new(e);
            let edge = self.edges[e];
            let key = edge_key(rep[edge.v0.index()], rep[edge.v1.index()]);
            match first_in_group.get(&key) {
                Some(&head) => self.splice_edge_groups(head, eid),
                None => {
                    first_in_group.insert(key, eid);
                }
            }
        }
    }

    // ---- counts and accessors

    /// Number of active vertices.
    #[inline]
    pub fn num_verts(&self) -> usize {
        self.num_active_verts
    }

    /// Number of active triangles.
    #[inline]
    pub fn num_tris(&self) -> usize {
        self.num_active_tris
    }

    /// Size of the vertex arena.
    #[inline]
    pub fn vertex_capacity(&self) -> usize {
        self.verts.len()
    }

    /// Size of the triangle arena.
    #[inline]
    pub fn triangle_capacity(&self) -> usize {
        self.tris.len()
    }

    /// Size of the edge arena.
    #[inline]
    pub fn edge_capacity(&self) -> usize {
        self.edges.len()
    }

    /// Vertex data.
    #[inline]
    pub fn vertex(&self, v: VertexId) -> &SkinnedVertex {
        &self.verts[v.index()].vert
    }

    /// Mutable vertex data.
    #[inline]
    pub fn vertex_mut(&mut self, v: VertexId) -> &mut SkinnedVertex {
        &mut self.verts[v.index()].vert
    }

    /// Vertex flags.
    #[inline]
    pub fn vertex_flags(&self, v: VertexId) -> SimpFlags {
        self.verts[v.index()].flags
    }

    /// True if `v` has been removed.
    #[inline]
    pub fn is_vertex_removed(&self, v: VertexId) -> bool {
        self.verts[v.index()].flags.contains(SimpFlags::REMOVED)
    }

    /// True if `v` is locked.
    #[inline]
    pub fn is_vertex_locked(&self, v: VertexId) -> bool {
        self.verts[v.index()].flags.contains(SimpFlags::LOCKED)
    }

    /// Lock every vertex in the group of `v`.
    pub fn lock_vertex_group(&mut self, v: VertexId) {
        for g in self.vertex_group(v) {
            self.verts[g.index()].flags.insert(SimpFlags::LOCKED);
        }
    }

    /// Corners of triangle `t`.
    #[inline]
    pub fn triangle_vertices(&self, t: TriangleId) -> [VertexId; 3] {
        self.tris[t.index()].verts
    }

    /// True if `t` has been removed.
    #[inline]
    pub fn is_triangle_removed(&self, t: TriangleId) -> bool {
        self.tris[t.index()].flags.contains(SimpFlags::REMOVED)
    }

    /// Endpoints of edge `e`.
    #[inline]
    pub fn edge_vertices(&self, e: EdgeId) -> (VertexId, VertexId) {
        let edge = &self.edges[e.index()];
        (edge.v0, edge.v1)
    }

    /// True if `e` has been removed.
    #[inline]
    pub fn is_edge_removed(&self, e: EdgeId) -> bool {
        self.edges[e.index()].flags.contains(SimpFlags::REMOVED)
    }

    /// Active triangles referencing `v`.
    #[inline]
    pub fn adjacent_triangles(&self, v: VertexId) -> &[TriangleId] {
        &self.verts[v.index()].adj_tris
    }

    /// Active edges referencing `v`.
    #[inline]
    pub fn adjacent_edges(&self, v: VertexId) -> &[EdgeId] {
        &self.verts[v.index()].adj_edges
    }

    /// Handles of all active vertices.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.verts.len())
            .map(VertexId::new)
            .filter(move |&v| !self.is_vertex_removed(v))
    }

    /// Handles of all active triangles.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        (0..self.tris.len())
            .map(TriangleId::new)
            .filter(move |&t| !self.is_triangle_removed(t))
    }

    /// Handles of all active edges.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len())
            .map(EdgeId::new)
            .filter(move |&e| !self.is_edge_removed(e))
    }

    /// The edge joining `a` and `b`, if any.
    #[inline]
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edge_map.get(&edge_key(a, b)).copied()
    }

    /// The distinct vertices sharing a triangle with `v`.
    pub fn vertex_neighbors(&self, v: VertexId) -> Vec<VertexId> {
        let mut neighbors: Vec<VertexId> = self.verts[v.index()]
            .adj_tris
            .iter()
            .flat_map(|&t| self.tris[t.index()].verts)
            .filter(|&u| u != v)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Active triangles containing both endpoints of `e`.
    pub fn edge_triangles(&self, e: EdgeId) -> Vec<TriangleId> {
        let edge = &self.edges[e.index()];
        self.shared_triangles(edge.v0, edge.v1)
    }

    fn shared_triangles(&self, a: VertexId, b: VertexId) -> Vec<TriangleId> {
        self.verts[a.index()]
            .adj_tris
            .iter()
            .copied()
            .filter(|&t| self.tris[t.index()].has_vertex(b))
            .collect()
    }

    /// Unit normal of `t`, or `None` if it is degenerate.
    pub fn triangle_normal(&self, t: TriangleId) -> Option<Vec3d> {
        let [a, b, c] = self.tris[t.index()].verts.map(|v| self.verts[v.index()].vert.pos());
        (b - a).cross(&(c - a)).try_normalize(1.0e-12)
    }

    /// Area of `t`.
    pub fn triangle_area(&self, t: TriangleId) -> f64 {
        let [a, b, c] = self.tris[t.index()].verts.map(|v| self.verts[v.index()].vert.pos());
        0.5 * (b - a).cross(&(c - a)).norm()
    }

    // ---- groups

    /// All vertices in the group of `v`, starting with `v`.
    pub fn vertex_group(&self, v: VertexId) -> Vec<VertexId> {
        let mut group = vec![v];
        let mut cur = self.verts[v.index()].next;
        while cur != v && group.len() <= self.verts.len() {
            group.push(cur);
            cur = self.verts[cur.index()].next;
        }
        group
    }

    /// All edges in the group of `e`, starting with `e`.
    pub fn edge_group(&self, e: EdgeId) -> Vec<EdgeId> {
        let mut group = vec![e];
        let mut cur = self.edges[e.index()].next;
        while cur != e && group.len() <= self.edges.len() {
            group.push(cur);
            cur = self.edges[cur.index()].next;
        }
        group
    }

    /// True if `a` and `b` are in the same vertex group.
    pub fn in_same_vertex_group(&self, a: VertexId, b: VertexId) -> bool {
        a == b || self.vertex_group(a).contains(&b)
    }

    /// Merge the groups of `a` and `b`. Locking spreads to the merged group.
    pub fn merge_vertex_groups(&mut self, a: VertexId, b: VertexId) {
        if !self.in_same_vertex_group(a, b) {
            self.splice_vertex_groups(a, b);
        }
        let group = self.vertex_group(a);
        if group.iter().any(|&g| self.is_vertex_locked(g)) {
            for g in group {
                self.verts[g.index()].flags.insert(SimpFlags::LOCKED);
            }
        }
    }

    fn splice_vertex_groups(&mut self, a: VertexId, b: VertexId) {
        let a_next = self.verts[a.index()].next;
        let b_next = self.verts[b.index()].next;
        self.verts[a.index()].next = b_next;
        self.verts[b_next.index()].prev = a;
        self.verts[b.index()].next = a_next;
        self.verts[a_next.index()].prev = b;
    }

    fn prune_vertex(&mut self, v: VertexId) {
        let SimpVertex { next, prev, .. } = self.verts[v.index()];
        self.verts[prev.index()].next = next;
        self.verts[next.index()].prev = prev;
        self.verts[v.index()].next = v;
        self.verts[v.index()].prev = v;
    }

    fn splice_edge_groups(&mut self, a: EdgeId, b: EdgeId) {
        let a_next = self.edges[a.index()].next;
        let b_next = self.edges[b.index()].next;
        self.edges[a.index()].next = b_next;
        self.edges[b_next.index()].prev = a;
        self.edges[b.index()].next = a_next;
        self.edges[a_next.index()].prev = b;
    }

    fn prune_edge(&mut self, e: EdgeId) {
        let SimpEdge { next, prev, .. } = self.edges[e.index()];
        self.edges[prev.index()].next = next;
        self.edges[next.index()].prev = prev;
        self.edges[e.index()].next = e;
        self.edges[e.index()].prev = e;
    }

    /// Re-derive the edge groups of `edges` after their endpoints moved.
    ///
    /// Each edge is unlinked and then joined to any active edge whose
    /// endpoints lie in the same pair of vertex groups.
    pub fn rebuild_edge_link_lists(&mut self, edges: &[EdgeId]) {
        for &e in edges {
            if !self.is_edge_removed(e) {
                self.prune_edge(e);
            }
        }

        for &e in edges {
            if self.is_edge_removed(e) {
                continue;
            }
            let SimpEdge { v0, v1, .. } = self.edges[e.index()];
            let group1 = self.vertex_group(v1);

            let mut partner = None;
            'find: for u in self.vertex_group(v0) {
                for &e2 in &self.verts[u.index()].adj_edges {
                    if e2 == e || self.is_edge_removed(e2) {
                        continue;
                    }
                    if group1.contains(&self.edges[e2.index()].other(u)) {
                        partner = Some(e2);
                        break 'find;
                    }
                }
            }

            if let Some(p) = partner {
                if !self.edge_group(p).contains(&e) {
                    self.splice_edge_groups(p, e);
                }
            }
        }
    }

    // ---- boundary

    /// True if the group of `e` has exactly one adjacent triangle in total.
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        let count: usize = self
            .edge_group(e)
            .into_iter()
            .map(|g| self.edge_triangles(g).len())
            .sum();
        count == 1
    }

    /// Lock both endpoints (with their groups) of every boundary edge.
    ///
    /// Returns the number of boundary edges found.
    pub fn lock_boundary(&mut self) -> usize {
        let boundary: Vec<EdgeId> = self.edge_ids().filter(|&e| self.is_boundary_edge(e)).collect();
        for &e in &boundary {
            let (v0, v1) = self.edge_vertices(e);
            self.lock_vertex_group(v0);
            self.lock_vertex_group(v1);
        }
        boundary.len()
    }

    // ---- removal

    fn remove_triangle(&mut self, t: TriangleId) {
        let tri = &mut self.tris[t.index()];
        tri.flags.insert(SimpFlags::REMOVED);
        let verts = tri.verts;
        for v in verts {
            self.verts[v.index()].adj_tris.retain(|&x| x != t);
        }
        self.num_active_tris -= 1;
    }

    fn remove_edge(&mut self, e: EdgeId) {
        self.edges[e.index()].flags.insert(SimpFlags::REMOVED);
        self.prune_edge(e);
        let SimpEdge { v0, v1, .. } = self.edges[e.index()];
        let key = edge_key(v0, v1);
        if self.edge_map.get(&key) == Some(&e) {
            self.edge_map.remove(&key);
        }
        self.verts[v0.index()].adj_edges.retain(|&x| x != e);
        self.verts[v1.index()].adj_edges.retain(|&x| x != e);
    }

    fn remove_vertex(&mut self, v: VertexId) -> Vec<EdgeId> {
        self.verts[v.index()].flags.insert(SimpFlags::REMOVED);
        self.prune_vertex(v);
        self.num_active_verts -= 1;

        let edges = self.verts[v.index()].adj_edges.clone();
        for &e in &edges {
            self.remove_edge(e);
        }
        edges
    }

    /// Collapse edge `e` by moving `from` onto `to`.
    ///
    /// Triangles containing both endpoints are removed, the remaining
    /// triangles and edges of `from` are re-targeted to `to` (edges that would
    /// duplicate an existing edge of `to` are removed), and `from` is flagged
    /// removed and unlinked from its group. A lock on `from` carries over to
    /// `to`.
    ///
    /// Vertex attributes are not touched; the caller writes the collapsed
    /// state beforehand. Returns `None` and changes nothing if `e` is removed,
    /// does not join `from` and `to`, or is a bridge with no adjacent
    /// triangle.
    pub fn collapse_edge(&mut self, e: EdgeId, from: VertexId, to: VertexId) -> Option<CollapseRecord> {
        if self.is_edge_removed(e) || self.is_vertex_removed(from) || self.is_vertex_removed(to) {
            return None;
        }
        if edge_key(from, to) != self.edge_vertices(e) {
            return None;
        }

        let shared = self.shared_triangles(from, to);
        if shared.is_empty() {
            trace!("skipping bridge edge {:?}", e);
            return None;
        }

        let mut record = CollapseRecord::default();

        for t in shared {
            self.remove_triangle(t);
            record.removed_triangles.push(t);
        }

        let moving = std::mem::take(&mut self.verts[from.index()].adj_tris);
        for t in moving {
            for corner in self.tris[t.index()].verts.iter_mut() {
                if *corner == from {
                    *corner = to;
                }
            }
            self.verts[to.index()].adj_tris.push(t);
        }

        self.remove_edge(e);
        record.removed_edges.push(e);

        let from_edges = std::mem::take(&mut self.verts[from.index()].adj_edges);
        for e2 in from_edges {
            if self.is_edge_removed(e2) {
                continue;
            }
            let other = self.edges[e2.index()].other(from);
            if other == to || self.edge_map.contains_key(&edge_key(to, other)) {
                self.remove_edge(e2);
                record.removed_edges.push(e2);
                continue;
            }

            self.edge_map.remove(&edge_key(from, other));
            let key = edge_key(to, other);
            let edge = &mut self.edges[e2.index()];
            edge.v0 = key.0;
            edge.v1 = key.1;
            self.edge_map.insert(key, e2);
            self.verts[to.index()].adj_edges.push(e2);
            record.moved_edges.push(e2);
        }

        if self.is_vertex_locked(from) {
            self.verts[to.index()].flags.insert(SimpFlags::LOCKED);
        }
        self.verts[from.index()].flags.insert(SimpFlags::REMOVED);
        self.prune_vertex(from);
        self.num_active_verts -= 1;

        Some(record)
    }

    /// True if `t` repeats a corner, has coincident corners, or has
    /// (almost) no area.
    pub fn is_degenerate_triangle(&self, t: TriangleId) -> bool {
        let [a, b, c] = self.tris[t.index()].verts;
        if a == b || b == c || a == c {
            return true;
        }
        let (pa, pb, pc) = (
            self.verts[a.index()].vert.position,
            self.verts[b.index()].vert.position,
            self.verts[c.index()].vert.position,
        );
        if pa == pb || pb == pc || pa == pc {
            return true;
        }
        self.triangle_area(t) < DEGENERATE_AREA
    }

    /// Remove the degenerate active triangles among `tris`, returning them.
    pub fn remove_if_degenerate_triangles(&mut self, tris: &[TriangleId]) -> Vec<TriangleId> {
        let mut removed = Vec::new();
        for &t in tris {
            if !self.is_triangle_removed(t) && self.is_degenerate_triangle(t) {
                self.remove_triangle(t);
                removed.push(t);
            }
        }
        removed
    }

    /// Remove the active vertices among `verts` that no triangle uses.
    ///
    /// Returns the edges removed along with them.
    pub fn remove_if_degenerate_vertices(&mut self, verts: &[VertexId]) -> Vec<EdgeId> {
        let mut removed_edges = Vec::new();
        for &v in verts {
            if !self.is_vertex_removed(v) && self.verts[v.index()].adj_tris.is_empty() {
                removed_edges.extend(self.remove_vertex(v));
            }
        }
        removed_edges
    }

    /// Remove the active edges among `edges` that lost an endpoint or every
    /// adjacent triangle, returning them.
    pub fn remove_if_degenerate_edges(&mut self, edges: &[EdgeId]) -> Vec<EdgeId> {
        let mut removed = Vec::new();
        for &e in edges {
            if self.is_edge_removed(e) {
                continue;
            }
            let (v0, v1) = self.edge_vertices(e);
            let orphaned = self.is_vertex_removed(v0)
                || self.is_vertex_removed(v1)
                || self.shared_triangles(v0, v1).is_empty();
            if orphaned {
                self.remove_edge(e);
                removed.push(e);
            }
        }
        removed
    }

    // ---- validation and output

    /// Check the structural invariants: adjacency is symmetric, groups are
    /// closed circular lists of active entities, the edge map is consistent
    /// and the active counts are correct.
    pub fn is_valid(&self) -> bool {
        let mut tri_count = 0;
        for (i, tri) in self.tris.iter().enumerate() {
            if tri.flags.contains(SimpFlags::REMOVED) {
                continue;
            }
            tri_count += 1;
            let t = TriangleId::new(i);
            let [a, b, c] = tri.verts;
            if a == b || b == c || a == c {
                return false;
            }
            for v in tri.verts {
                let sv = &self.verts[v.index()];
                if sv.flags.contains(SimpFlags::REMOVED) || !sv.adj_tris.contains(&t) {
                    return false;
                }
            }
        }

        let mut vert_count = 0;
        for (i, sv) in self.verts.iter().enumerate() {
            if sv.flags.contains(SimpFlags::REMOVED) {
                continue;
            }
            vert_count += 1;
            let v = VertexId::new(i);
            if self.verts[sv.next.index()].prev != v || self.verts[sv.prev.index()].next != v {
                return false;
            }
            if self.vertex_group(v).iter().any(|&g| self.is_vertex_removed(g)) {
                return false;
            }
            for &t in &sv.adj_tris {
                if self.is_triangle_removed(t) || !self.tris[t.index()].has_vertex(v) {
                    return false;
                }
            }
            for &e in &sv.adj_edges {
                let edge = &self.edges[e.index()];
                if edge.flags.contains(SimpFlags::REMOVED) || (edge.v0 != v && edge.v1 != v) {
                    return false;
                }
            }
        }

        for (i, edge) in self.edges.iter().enumerate() {
            if edge.flags.contains(SimpFlags::REMOVED) {
                continue;
            }
            let e = EdgeId::new(i);
            if self.is_vertex_removed(edge.v0) || self.is_vertex_removed(edge.v1) {
                return false;
            }
            if self.edge_map.get(&edge_key(edge.v0, edge.v1)) != Some(&e) {
                return false;
            }
            if self.edges[edge.next.index()].prev != e || self.edges[edge.prev.index()].next != e {
                return false;
            }
            if self.edge_group(e).iter().any(|&g| self.is_edge_removed(g)) {
                return false;
            }
        }

        tri_count == self.num_active_tris && vert_count == self.num_active_verts
    }

    /// Compact the active mesh into flat vertex and index buffers.
    ///
    /// Only vertices used by an active triangle are emitted. With
    /// `merge_coincident_bones` every vertex of a group receives the
    /// normalized average bone weights of the group. With `weld_tolerance`
    /// vertices of one group that agree in every attribute within the
    /// tolerance share a single output vertex.
    pub fn output(&self, merge_coincident_bones: bool, weld_tolerance: Option<f32>) -> (Vec<SkinnedVertex>, Vec<u32>) {
        let mut remap = vec![u32::MAX; self.verts.len()];
        let mut out_verts: Vec<SkinnedVertex> = Vec::with_capacity(self.num_active_verts);

        for i in 0..self.verts.len() {
            let v = VertexId::new(i);
            if remap[i] != u32::MAX || self.is_vertex_removed(v) || self.verts[i].adj_tris.is_empty() {
                continue;
            }

            let group: Vec<VertexId> = self
                .vertex_group(v)
                .into_iter()
                .filter(|&g| !self.is_vertex_removed(g) && !self.verts[g.index()].adj_tris.is_empty())
                .collect();

            let mut members: Vec<SkinnedVertex> = group.iter().map(|&g| self.vertex(g).clone()).collect();
            if merge_coincident_bones && members.len() > 1 {
                let mut average = SparseVec::new();
                for m in &members {
                    average += &m.bones;
                }
                let sum = average.sum();
                if sum > 0.0 {
                    average *= 1.0 / sum;
                }
                for m in members.iter_mut() {
                    m.bones = average.clone();
                }
            }

            let mut emitted: Vec<u32> = Vec::new();
            for (g, m) in group.into_iter().zip(members) {
                let existing = weld_tolerance.and_then(|tol| {
                    emitted
                        .iter()
                        .copied()
                        .find(|&o| out_verts[o as usize].is_weldable_with(&m, tol))
                });
                remap[g.index()] = match existing {
                    Some(o) => o,
                    None => {
                        let o = out_verts.len() as u32;
                        emitted.push(o);
                        out_verts.push(m);
                        o
                    }
                };
            }
        }

        let mut indices = Vec::with_capacity(self.num_active_tris * 3);
        for tri in self.tris.iter().filter(|t| !t.flags.contains(SimpFlags::REMOVED)) {
            let [a, b, c] = tri.verts.map(|v| remap[v.index()]);
            if a == b || b == c || a == c {
                continue;
            }
            indices.extend_from_slice(&[a, b, c]);
        }

        (out_verts, indices)
    }
}

/// Initial edge arena size: three per triangle, capped at the `3V - 6` edges
/// a manifold over `V` vertices can hold.
fn edge_capacity_bound(num_tris: usize, num_verts: usize) -> usize {
    (3 * num_tris).min((3 * num_verts).saturating_sub(6).max(3))
}
