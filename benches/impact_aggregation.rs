//! Benchmarks for the impact aggregation and force math hot paths.

use bevy::prelude::{Entity, Vec3};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fracture_link::forces::{radial_impulse, RadialParams};
use fracture_link::impact::collect_impact_targets;
use fracture_link::FractureRegistry;

fn e(n: u32) -> Entity {
    Entity::from_raw(n)
}

/// Registry shaped like a dense debris field: 256 colliders, four colliders
/// per body, half the bodies carrying destructible wrappers.
fn dense_registry() -> FractureRegistry {
    let mut registry = FractureRegistry::default();
    for id in 0u32..256 {
        let body = e(1000 + id / 4);
        registry.register_body_collider(e(id), body);
        if (id / 4) % 2 == 0 {
            registry.register_body_rigid(body, body);
        }
    }
    registry
}

fn bench_aggregation(c: &mut Criterion) {
    let registry = dense_registry();
    let overlaps: Vec<Entity> = (0u32..256).map(e).collect();

    c.bench_function("collect_impact_targets_256", |b| {
        b.iter(|| collect_impact_targets(black_box(&registry), black_box(&overlaps), true))
    });

    c.bench_function("collect_impact_targets_point", |b| {
        b.iter(|| collect_impact_targets(black_box(&registry), black_box(&overlaps[..1]), true))
    });
}

fn bench_radial_impulse(c: &mut Criterion) {
    let params = RadialParams { center: Vec3::ZERO, radius: 8.0, max_force: 20.0, lift: 2.0 };
    let positions: Vec<Vec3> = (0..256)
        .map(|i| {
            let angle = i as f32 * 0.1;
            Vec3::new(angle.cos() * (i % 9) as f32, 0.5, angle.sin() * (i % 9) as f32)
        })
        .collect();

    c.bench_function("radial_impulse_256", |b| {
        b.iter(|| {
            positions
                .iter()
                .map(|&p| radial_impulse(black_box(&params), black_box(p)))
                .fold(Vec3::ZERO, |acc, v| acc + v)
        })
    });
}

criterion_group!(benches, bench_aggregation, bench_radial_impulse);
criterion_main!(benches);
