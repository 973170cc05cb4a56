//! Expanding a reduced [`SkinnedMesh`] into the host's mesh-builder input.
//!
//! The host builds its render sections from four arrays:
//!
//! - **points**: unique positions
//! - **influences**: bone weights per point
//! - **wedges**: one per triangle corner, carrying the point, color and UVs
//! - **faces**: wedge triples with the tangent frame of every corner
//!
//! Vertices at bit-identical positions share a point. A wedge whose normal
//! disagrees with its point's normal gets a copy of the point instead, so the
//! builder does not smooth across hard edges.

use std::collections::HashMap;

use nalgebra::{Point3, Vector2, Vector3, Vector4};

use crate::mesh::{SkinnedVertex, MAX_UVS};

use super::SkinnedMesh;

/// Wedge normals closer than this to their point's normal (in `1 - dot`)
/// share the point.
const NORMAL_TOLERANCE: f32 = 1.0e-4;

/// One bone weight of one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertInfluence {
    /// Weight in `[0, 1]`.
    pub weight: f32,
    /// Index into [`SkeletalMeshData::points`].
    pub point_index: u32,
    /// Skeleton bone index.
    pub bone_index: u16,
}

/// A triangle corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshWedge {
    /// Index into [`SkeletalMeshData::points`].
    pub point_index: u32,
    /// Linear RGBA color.
    pub color: Vector4<f32>,
    /// Texture coordinates.
    pub uvs: [Vector2<f32>; MAX_UVS],
}

/// A triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshFace {
    /// Indices into [`SkeletalMeshData::wedges`].
    pub wedge_index: [u32; 3],
    /// Tangent per corner.
    pub tangent_x: [Vector3<f32>; 3],
    /// Bitangent per corner.
    pub tangent_y: [Vector3<f32>; 3],
    /// Normal per corner.
    pub tangent_z: [Vector3<f32>; 3],
    /// Material of the triangle.
    pub material_index: u16,
}

/// Struct-of-arrays form of a skinned mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletalMeshData {
    /// Unique positions.
    pub points: Vec<Point3<f32>>,
    /// Bone weights, grouped by point in ascending point order.
    pub influences: Vec<VertInfluence>,
    /// Triangle corners. Wedge `3 * f + c` is corner `c` of face `f`.
    pub wedges: Vec<MeshWedge>,
    /// Triangles.
    pub faces: Vec<MeshFace>,
    /// Number of UV channels in use.
    pub tex_coord_count: usize,
}

impl SkeletalMeshData {
    /// Influences of `point`.
    pub fn point_influences(&self, point: u32) -> impl Iterator<Item = &VertInfluence> + '_ {
        self.influences.iter().filter(move |inf| inf.point_index == point)
    }
}

/// Builds host render data from extracted arrays.
///
/// Implemented by the host; the reduction only produces the input.
pub trait SkeletalMeshBuilder {
    /// What the builder produces.
    type Output;

    /// Build from `data`. Normals and tangents are final and must not be
    /// recomputed.
    fn build_skeletal_mesh(&mut self, data: &SkeletalMeshData) -> Self::Output;
}

/// Expand `mesh` into points, influences, wedges and faces.
pub fn extract_skeletal_data(mesh: &SkinnedMesh) -> SkeletalMeshData {
    let num_tris = mesh.num_tris();
    let mut data = SkeletalMeshData {
        points: Vec::with_capacity(mesh.num_vertices()),
        influences: Vec::with_capacity(mesh.num_vertices()),
        wedges: Vec::with_capacity(3 * num_tris),
        faces: Vec::with_capacity(num_tris),
        tex_coord_count: mesh.tex_coord_count,
    };

    let mut points = PointTable::default();
    let mut vertex_point = vec![u32::MAX; mesh.num_vertices()];
    for (v, vertex) in mesh.vertices.iter().enumerate() {
        vertex_point[v] = points.point_for(&mut data, vertex);
    }

    for (f, tri) in mesh.indices.chunks_exact(3).enumerate() {
        let mut face = MeshFace {
            wedge_index: [0; 3],
            tangent_x: [Vector3::zeros(); 3],
            tangent_y: [Vector3::zeros(); 3],
            tangent_z: [Vector3::zeros(); 3],
            material_index: 0,
        };

        for (c, &v) in tri.iter().enumerate() {
            let vertex = &mesh.vertices[v as usize];
            let attrs = &vertex.attributes;
            let normal = attrs.normal.try_normalize(1e-8).unwrap_or(attrs.normal);

            face.tangent_x[c] = attrs.tangent;
            face.tangent_y[c] = attrs.bitangent;
            face.tangent_z[c] = normal;

            let wedge_index = (3 * f + c) as u32;
            face.wedge_index[c] = wedge_index;

            let point_index = points.resolve(&mut data, vertex_point[v as usize], &normal);
            data.wedges.push(MeshWedge {
                point_index,
                color: attrs.color,
                uvs: attrs.uvs,
            });
        }

        face.material_index = mesh.vertices[tri[0] as usize].material_index as u16;
        data.faces.push(face);
    }

    // Copied points append influences out of order.
    data.influences.sort_by_key(|inf| inf.point_index);
    data
}

/// Point bookkeeping during extraction.
#[derive(Default)]
struct PointTable {
    by_position: HashMap<[u32; 3], u32>,
    /// Normal each point was first seen with. Zero until a wedge claims it.
    normals: Vec<Vector3<f32>>,
    /// Next copy of the same position, or `u32::MAX`.
    next_copy: Vec<u32>,
}

impl PointTable {
    fn point_for(&mut self, data: &mut SkeletalMeshData, vertex: &SkinnedVertex) -> u32 {
        let key: [u32; 3] = vertex.position.coords.map(f32::to_bits).into();
        if let Some(&p) = self.by_position.get(&key) {
            return p;
        }

        let p = data.points.len() as u32;
        data.points.push(vertex.position);
        self.normals.push(Vector3::zeros());
        self.next_copy.push(u32::MAX);
        self.by_position.insert(key, p);

        let before = data.influences.len();
        for (bone, weight) in vertex.bones.iter() {
            if weight > 0.0 {
                data.influences.push(VertInfluence {
                    weight: weight as f32,
                    point_index: p,
                    bone_index: bone as u16,
                });
            }
        }
        if data.influences.len() == before {
            data.influences.push(VertInfluence {
                weight: 0.0,
                point_index: p,
                bone_index: 0,
            });
        }
        p
    }

    /// The point a wedge with `normal` at `point` should use, copying the
    /// point when no existing copy agrees.
    fn resolve(&mut self, data: &mut SkeletalMeshData, point: u32, normal: &Vector3<f32>) -> u32 {
        if self.normals[point as usize].norm_squared() < NORMAL_TOLERANCE {
            self.normals[point as usize] = *normal;
            return point;
        }

        let mut at = point;
        loop {
            if self.normals[at as usize].dot(normal) - 1.0 >= -NORMAL_TOLERANCE {
                return at;
            }
            match self.next_copy[at as usize] {
                u32::MAX => break,
                next => at = next,
            }
        }

        let copy = data.points.len() as u32;
        data.points.push(data.points[point as usize]);
        self.normals.push(*normal);
        self.next_copy.push(self.next_copy[point as usize]);
        self.next_copy[point as usize] = copy;

        let copied: Vec<VertInfluence> = data
            .influences
            .iter()
            .filter(|inf| inf.point_index == point)
            .map(|inf| VertInfluence {
                point_index: copy,
                ..*inf
            })
            .collect();
        data.influences.extend(copied);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad(normal_b: Vector3<f32>) -> SkinnedMesh {
        // Two triangles meeting along (0,0)-(1,1), possibly with a crease.
        let a = |x: f32, y: f32| {
            SkinnedVertex::new(Point3::new(x, y, 0.0))
                .with_bone(2, 0.75)
                .with_bone(5, 0.25)
        };
        let b = |x: f32, y: f32| a(x, y).with_normal(normal_b).with_material(1);
        let vertices = vec![
            a(0.0, 0.0),
            a(1.0, 0.0),
            a(1.0, 1.0),
            b(0.0, 0.0),
            b(1.0, 1.0),
            b(0.0, 1.0),
        ];
        SkinnedMesh::new(vertices, vec![0, 1, 2, 3, 4, 5], 1)
    }

    #[test]
    fn test_smooth_seam_shares_points() {
        let data = extract_skeletal_data(&quad(Vector3::z()));

        assert_eq!(data.points.len(), 4);
        assert_eq!(data.wedges.len(), 6);
        assert_eq!(data.faces.len(), 2);
        assert_eq!(data.wedges[3].point_index, data.wedges[0].point_index);
        assert_eq!(data.wedges[4].point_index, data.wedges[2].point_index);
        assert_eq!(data.faces[1].wedge_index, [3, 4, 5]);
        assert_eq!(data.faces[1].material_index, 1);
        assert_eq!(data.influences.len(), 8);
    }

    #[test]
    fn test_crease_duplicates_points_with_influences() {
        let tilted = Vector3::new(0.0, 1.0, 1.0).normalize();
        let data = extract_skeletal_data(&quad(tilted));

        assert_eq!(data.points.len(), 6);
        assert_ne!(data.wedges[3].point_index, data.wedges[0].point_index);
        let copy = data.wedges[3].point_index;
        assert_eq!(data.points[copy as usize], Point3::new(0.0, 0.0, 0.0));

        let weights: Vec<f32> = data.point_influences(copy).map(|inf| inf.weight).collect();
        assert_eq!(weights.len(), 2);
        assert_relative_eq!(weights.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert!(data
            .influences
            .windows(2)
            .all(|w| w[0].point_index <= w[1].point_index));

        assert_relative_eq!(data.faces[1].tangent_z[0].norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unskinned_point_gets_placeholder_bone() {
        let vertices = vec![
            SkinnedVertex::new(Point3::new(0.0, 0.0, 0.0)),
            SkinnedVertex::new(Point3::new(1.0, 0.0, 0.0)),
            SkinnedVertex::new(Point3::new(0.0, 1.0, 0.0)),
        ];
        let data = extract_skeletal_data(&SkinnedMesh::new(vertices, vec![0, 1, 2], 1));

        assert_eq!(data.influences.len(), 3);
        assert!(data
            .influences
            .iter()
            .all(|inf| inf.bone_index == 0 && inf.weight == 0.0));
    }

    struct CountingBuilder;

    impl SkeletalMeshBuilder for CountingBuilder {
        type Output = (usize, usize);

        fn build_skeletal_mesh(&mut self, data: &SkeletalMeshData) -> Self::Output {
            (data.points.len(), data.faces.len())
        }
    }

    #[test]
    fn test_builder_receives_data() {
        let data = extract_skeletal_data(&quad(Vector3::z()));
        assert_eq!(CountingBuilder.build_skeletal_mesh(&data), (4, 2));
    }
}
