/*
 * Flock Benchmark
 *
 * Measures the cost of the spatial grid against the brute-force neighbor
 * scan, and of a full simulation tick at several population sizes.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nannou::prelude::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use murmuration::{Flock, SimulationParams, SpatialGrid};

const WIDTH: f32 = 1600.0;
const HEIGHT: f32 = 1200.0;
const RADIUS: f32 = 80.0;

fn random_positions(n: usize) -> Vec<Vec2> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|_| Vec2::new(rng.gen_range(0.0..WIDTH), rng.gen_range(0.0..HEIGHT)))
        .collect()
}

// Rebuild plus one query per agent
fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");

    for num_boids in [100, 500, 1000].iter() {
        let positions = random_positions(*num_boids);
        group.bench_with_input(BenchmarkId::from_parameter(num_boids), &positions, |b, positions| {
            let mut grid = SpatialGrid::new(RADIUS, WIDTH, HEIGHT).unwrap();
            let mut out = Vec::new();
            b.iter(|| {
                grid.clear();
                for (i, &position) in positions.iter().enumerate() {
                    grid.insert(i, position);
                }
                let mut total = 0;
                for (i, &position) in positions.iter().enumerate() {
                    out.clear();
                    grid.query_neighbors_wrapped_into(i, position, RADIUS, &mut out);
                    total += out.len();
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_brute_force(c: &mut Criterion) {
    let mut group = c.benchmark_group("brute_force");

    for num_boids in [100, 500, 1000].iter() {
        let positions = random_positions(*num_boids);
        group.bench_with_input(BenchmarkId::from_parameter(num_boids), &positions, |b, positions| {
            let radius_sq = RADIUS * RADIUS;
            b.iter(|| {
                let mut total = 0;
                for (i, a) in positions.iter().enumerate() {
                    for (j, other) in positions.iter().enumerate() {
                        if i != j && a.distance_squared(*other) < radius_sq {
                            total += 1;
                        }
                    }
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_flock_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("flock_step");
    group.measurement_time(Duration::from_secs(5));

    for &grid in &[true, false] {
        for num_boids in [200, 1000].iter() {
            let label = if grid { "grid" } else { "brute" };
            group.bench_with_input(BenchmarkId::new(label, num_boids), num_boids, |b, &n| {
                let mut params = SimulationParams::default();
                params.num_boids = n;
                params.enable_spatial_grid = grid;
                params.world_width = WIDTH;
                params.world_height = HEIGHT;
                let mut flock = Flock::new(params, 1).unwrap();
                b.iter(|| flock.step(black_box(Duration::from_millis(16))));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_spatial_grid, bench_brute_force, bench_flock_step);
criterion_main!(benches);
