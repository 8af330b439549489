use nannou::prelude::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use murmuration::vecmath::wrapped_delta;
use murmuration::SpatialGrid;

fn brute_force(positions: &[Vec2], index: usize, radius: f32, wrap: Option<(f32, f32)>) -> Vec<usize> {
    let center = positions[index];
    let mut found: Vec<usize> = positions
        .iter()
        .enumerate()
        .filter(|&(j, &other)| {
            let delta = match wrap {
                Some((w, h)) => wrapped_delta(center, other, w, h),
                None => other - center,
            };
            j != index && delta.length_squared() < radius * radius
        })
        .map(|(j, _)| j)
        .collect();
    found.sort_unstable();
    found
}

fn build(positions: &[Vec2], cell: f32, width: f32, height: f32) -> SpatialGrid {
    let mut grid = SpatialGrid::new(cell, width, height).unwrap();
    for (i, &p) in positions.iter().enumerate() {
        grid.insert(i, p);
    }
    grid
}

#[test]
fn grid_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..40 {
        let width = rng.gen_range(100.0..1200.0);
        let height = rng.gen_range(100.0..900.0);
        let cell = rng.gen_range(20.0..150.0);
        let n = rng.gen_range(2..200);
        let positions: Vec<Vec2> = (0..n)
            .map(|_| Vec2::new(rng.gen_range(0.0..width), rng.gen_range(0.0..height)))
            .collect();
        let grid = build(&positions, cell, width, height);

        for index in 0..n {
            let radius = rng.gen_range(1.0..=cell);

            let mut plain = grid.query_neighbors(index, positions[index], radius);
            plain.sort_unstable();
            assert_eq!(plain, brute_force(&positions, index, radius, None));

            let mut wrapped = grid.query_neighbors_wrapped(index, positions[index], radius);
            wrapped.sort_unstable();
            assert_eq!(wrapped, brute_force(&positions, index, radius, Some((width, height))));
        }
    }
}

#[test]
fn rebuilding_from_the_same_positions_gives_the_same_answers() {
    let mut rng = StdRng::seed_from_u64(8);
    let positions: Vec<Vec2> = (0..150)
        .map(|_| Vec2::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0)))
        .collect();

    let mut grid = build(&positions, 80.0, 800.0, 600.0);
    let first: Vec<Vec<usize>> = (0..positions.len())
        .map(|i| grid.query_neighbors_wrapped(i, positions[i], 80.0))
        .collect();

    grid.clear();
    for (i, &p) in positions.iter().enumerate() {
        grid.insert(i, p);
    }
    let second: Vec<Vec<usize>> = (0..positions.len())
        .map(|i| grid.query_neighbors_wrapped(i, positions[i], 80.0))
        .collect();

    assert_eq!(first, second);
    assert_eq!(grid.len(), positions.len());
}

#[test]
fn corner_agents_are_neighbors_only_on_a_torus() {
    let positions = [Vec2::new(1.0, 1.0), Vec2::new(798.0, 598.0)];
    let grid = build(&positions, 80.0, 800.0, 600.0);

    assert_eq!(grid.query_neighbors_wrapped(0, positions[0], 80.0), vec![1]);
    assert_eq!(grid.query_neighbors_wrapped(1, positions[1], 80.0), vec![0]);
    assert!(grid.query_neighbors(0, positions[0], 80.0).is_empty());
}

#[test]
fn positions_outside_the_world_are_still_found() {
    let positions = [Vec2::new(-3.0, 300.0), Vec2::new(5.0, 300.0), Vec2::new(803.0, 300.0)];
    let grid = build(&positions, 80.0, 800.0, 600.0);

    assert_eq!(grid.query_neighbors(1, positions[1], 20.0), vec![0]);
    assert_eq!(grid.query_neighbors(2, positions[2], 20.0), Vec::<usize>::new());
    let mut wrapped = grid.query_neighbors_wrapped(1, positions[1], 20.0);
    wrapped.sort_unstable();
    assert_eq!(wrapped, vec![0, 2]);
}
