//! World tick benchmarks for hexwar_core.
//!
//! Run with: `cargo bench -p hexwar_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hexwar_core::config::WorldConfig;
use hexwar_core::hex_grid::HexGrid;
use hexwar_core::math::Vec2Fixed;
use hexwar_core::world::WorldSystem;

fn warmed_world(config: WorldConfig, ticks: u32) -> WorldSystem {
    let mut world = WorldSystem::new(config).expect("bench config is valid");
    for _ in 0..ticks {
        world.tick();
    }
    world
}

/// One tick of a running match at each arena size.
pub fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_tick");
    for (name, config) in [
        ("small", WorldConfig::small()),
        ("standard", WorldConfig::default()),
        ("large", WorldConfig::large()),
    ] {
        let world = warmed_world(config, 200);
        group.bench_function(name, |b| {
            b.iter_batched_ref(
                || WorldSystem::deserialize(&world.serialize().expect("snapshot")).expect("restore"),
                |w| black_box(w.tick()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Point lookup by layout inversion versus a linear scan.
pub fn lookup_benchmark(c: &mut Criterion) {
    let grid = HexGrid::generate(1280, 960, 40);
    let points: Vec<Vec2Fixed> = (0..64).map(|i| Vec2Fixed::from_num(i * 19 % 1280, i * 37 % 960)).collect();

    c.bench_function("coord_at", |b| {
        b.iter(|| {
            for p in &points {
                black_box(grid.coord_at(*p));
            }
        })
    });
    c.bench_function("cell_at_position_scan", |b| {
        b.iter(|| {
            for p in &points {
                black_box(grid.cell_at_position_scan(*p));
            }
        })
    });
}

/// Hashing the full state, done once per tick under debug logging.
pub fn hash_benchmark(c: &mut Criterion) {
    let world = warmed_world(WorldConfig::default(), 200);
    c.bench_function("state_hash", |b| b.iter(|| black_box(world.state_hash())));
}

criterion_group!(benches, tick_benchmark, lookup_benchmark, hash_benchmark);
criterion_main!(benches);
