//! Benchmarks for skinned mesh reduction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use skinlod::prelude::*;

/// A UV sphere with `rings` latitude bands, skinned to two bones by height.
fn create_sphere(rings: u32) -> (Vec<SkinnedVertex>, Vec<u32>) {
    let segments = 2 * rings;
    let mut vertices = Vec::new();
    for r in 0..=rings {
        let theta = std::f32::consts::PI * r as f32 / rings as f32;
        for s in 0..=segments {
            let phi = 2.0 * std::f32::consts::PI * s as f32 / segments as f32;
            let n = Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            let upper = (n.z * 0.5 + 0.5) as f64;
            vertices.push(
                SkinnedVertex::new(Point3::from(n))
                    .with_normal(n)
                    .with_uv(0, Vector2::new(s as f32 / segments as f32, r as f32 / rings as f32))
                    .with_bone(0, 1.0 - upper)
                    .with_bone(1, upper),
            );
        }
    }

    let row = segments + 1;
    let mut indices = Vec::new();
    for r in 0..rings {
        for s in 0..segments {
            let i = r * row + s;
            // Skip the slivers whose corners meet at a pole.
            if r + 1 < rings {
                indices.extend_from_slice(&[i, i + row, i + row + 1]);
            }
            if r > 0 {
                indices.extend_from_slice(&[i, i + row + 1, i + 1]);
            }
        }
    }
    (vertices, indices)
}

/// A flat grid as a single-section host model.
fn create_source_grid(n: u32) -> SourceLodModel {
    let mut vertices = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            vertices.push(
                SourceVertex::new(Point3::new(x as f32, y as f32, 0.0))
                    .with_uv(0, Vector2::new(x as f32 / n as f32, y as f32 / n as f32))
                    .with_influence(0, 0, 128)
                    .with_influence(1, 1, 127),
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
    let tris = indices.len() / 3;
    SourceLodModel::new(vec![SourceSection::new(vertices, vec![0, 1], 0, tris)], indices, 1)
}

fn bench_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify_sphere_half");
    for rings in [16u32, 32] {
        let (vertices, indices) = create_sphere(rings);
        let tris = indices.len() / 3;
        let policy = Terminator::new(tris / 2, tris, 0, vertices.len());

        group.bench_with_input(BenchmarkId::from_parameter(tris), &rings, |b, _| {
            b.iter(|| {
                simplify(
                    black_box(&vertices),
                    black_box(&indices),
                    &policy,
                    SimplifierOptions::default(),
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let lods = vec![create_source_grid(40)];
    let bones = [Matrix4::identity(), Matrix4::new_translation(&Vector3::z())];
    let settings = ReductionSettings::default()
        .with_triangle_percentage(0.25)
        .with_max_bones_per_vertex(1);

    c.bench_function("reduce_lod_grid_40", |b| {
        b.iter(|| {
            reduce_lod_model(&lods, &bones, &settings, &ImportantBones::default(), 1).unwrap()
        });
    });

    c.bench_function("convert_grid_40", |b| {
        b.iter(|| convert_to_skinned(&lods[0], &bones, 0, &ConvertOptions::default()).unwrap());
    });
}

criterion_group!(benches, bench_simplify, bench_pipeline);
criterion_main!(benches);
