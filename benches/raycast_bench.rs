use criterion::{criterion_group, criterion_main, Criterion};

use radiant_core::math::Vec3;
use radiant_core::options::RenderOptions;
use radiant_core::raycaster::cast;
use radiant_core::scene::builder::SceneBuilder;
use radiant_core::scene::material::Material;
use radiant_core::math::Rgb;
use radiant_core::math::Ray;

fn grid_scene() -> radiant_core::scene::Scene {
    let mut builder = SceneBuilder::new();
    let white = builder.add_material("white", Material::new(Rgb::new(0.7, 0.7, 0.7), Rgb::ZERO, Rgb::ZERO, 1.0));
    for row in 0..8 {
        for col in 0..8 {
            let x = col as f32 * 2.0 - 8.0;
            let z = row as f32 * 2.0 - 8.0;
            let v0 = builder.add_vertex(Vec3::new(x, 0.0, z), (0.0, 0.0));
            let v1 = builder.add_vertex(Vec3::new(x + 1.0, 0.0, z), (1.0, 0.0));
            let v2 = builder.add_vertex(Vec3::new(x + 1.0, 0.0, z + 1.0), (1.0, 1.0));
            let v3 = builder.add_vertex(Vec3::new(x, 0.0, z + 1.0), (0.0, 1.0));
            builder.add_face([v0, v1, v2, v3], white, false).unwrap();
        }
    }
    builder.build(8, 4)
}

fn raycast_grid(c: &mut Criterion) {
    let scene = grid_scene();
    let options = RenderOptions::default();
    c.bench_function("cast against an 8x8 quad grid", |b| {
        b.iter(|| {
            let ray = Ray::new(Vec3::new(0.3, 5.0, 0.2), Vec3::new(0.05, -1.0, 0.05));
            cast(&scene, &ray, &options, true, false)
        })
    });
}

criterion_group!(benches, raycast_grid);
criterion_main!(benches);
