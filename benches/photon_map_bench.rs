use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use radiant_core::kdtree::KdTree;
use radiant_core::math::{Rgb, Vec3};
use radiant_core::options::RenderOptions;
use radiant_core::photon_map::emit_photons;
use radiant_core::scene::builder::SceneBuilder;
use radiant_core::scene::material::Material;

fn cornell_box() -> radiant_core::scene::Scene {
    let mut builder = SceneBuilder::new();
    let white = builder.add_material("white", Material::new(Rgb::new(0.8, 0.8, 0.8), Rgb::ZERO, Rgb::ZERO, 1.0));
    let light = builder.add_material("light", Material::new(Rgb::ZERO, Rgb::ZERO, Rgb::new(10.0, 10.0, 10.0), 1.0));

    let f0 = builder.add_vertex(Vec3::new(-2.0, 0.0, -2.0), (0.0, 0.0));
    let f1 = builder.add_vertex(Vec3::new(2.0, 0.0, -2.0), (1.0, 0.0));
    let f2 = builder.add_vertex(Vec3::new(2.0, 0.0, 2.0), (1.0, 1.0));
    let f3 = builder.add_vertex(Vec3::new(-2.0, 0.0, 2.0), (0.0, 1.0));
    builder.add_face([f0, f1, f2, f3], white, false).unwrap();

    let l0 = builder.add_vertex(Vec3::new(-0.5, 3.9, -0.5), (0.0, 0.0));
    let l1 = builder.add_vertex(Vec3::new(-0.5, 3.9, 0.5), (1.0, 0.0));
    let l2 = builder.add_vertex(Vec3::new(0.5, 3.9, 0.5), (1.0, 1.0));
    let l3 = builder.add_vertex(Vec3::new(0.5, 3.9, -0.5), (0.0, 1.0));
    builder.add_face([l0, l1, l2, l3], light, true).unwrap();

    builder.build(8, 4)
}

fn emit_10k_photons(c: &mut Criterion) {
    let scene = cornell_box();
    let mut options = RenderOptions::default();
    options.num_photons_to_shoot = 10_000;
    options.portal_recursion_depth = 0;

    c.bench_function("emit 10k photons into a kd-tree", |b| {
        b.iter(|| {
            let mut tree = KdTree::new(scene.bounds());
            let mut rng = Xoshiro256StarStar::seed_from_u64(1);
            emit_photons(&scene, &options, &mut rng, &mut tree);
            tree.num_photons()
        })
    });
}

criterion_group!(benches, emit_10k_photons);
criterion_main!(benches);
