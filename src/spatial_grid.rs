/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for efficient neighbor lookups.
 * It divides the world into uniform cells so that a neighbor query only has
 * to look at the 3x3 block of cells around an agent instead of the whole
 * population.
 *
 * Layout:
 * - Cells live in a flat arena indexed by the packed key `cell_x * rows + cell_y`
 * - Each entry carries the agent index and the position it was inserted at,
 *   so queries never need to touch the agent list
 * - The grid is rebuilt every tick: clear() then insert() every agent
 *
 * Queries scan every cell the query circle's bounding box touches. With the
 * cell size equal to the query radius that is the usual 3x3 block; larger
 * radii stay exact and simply scan more cells.
 */

use nannou::prelude::Vec2;
use std::cell::Cell;
use std::ops::RangeInclusive;

use crate::error::GridError;
use crate::vecmath::{is_valid_extent, wrapped_delta};

#[derive(Debug, Clone, Copy)]
struct GridEntry {
    index: usize,
    position: Vec2,
}

#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    width: f32,
    height: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<GridEntry>>,
    len: usize,
    // Diagnostics, reset on clear()
    query_count: Cell<usize>,
    candidate_count: Cell<usize>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, width: f32, height: f32) -> Result<Self, GridError> {
        let (cols, rows) = Self::extents(cell_size, width, height)?;
        Ok(Self {
            cell_size,
            width,
            height,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            len: 0,
            query_count: Cell::new(0),
            candidate_count: Cell::new(0),
        })
    }

    fn extents(cell_size: f32, width: f32, height: f32) -> Result<(usize, usize), GridError> {
        if !is_valid_extent(cell_size) || !is_valid_extent(width) || !is_valid_extent(height) {
            return Err(GridError::InvalidGeometry { cell_size, width, height });
        }
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Ok((cols, rows))
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn query_count(&self) -> usize {
        self.query_count.get()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count.get()
    }

    // Change the cell geometry. Existing entries are dropped rather than
    // rebucketed; callers reinsert before the next query.
    pub fn resize(&mut self, cell_size: f32, width: f32, height: f32) -> Result<(), GridError> {
        if cell_size == self.cell_size && width == self.width && height == self.height {
            return Ok(());
        }
        let (cols, rows) = Self::extents(cell_size, width, height)?;
        log::debug!(
            "Resizing spatial grid: cell {:.1} -> {:.1}, {}x{} -> {}x{} cells",
            self.cell_size,
            cell_size,
            self.cols,
            self.rows,
            cols,
            rows
        );
        self.cell_size = cell_size;
        self.width = width;
        self.height = height;
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![Vec::new(); cols * rows];
        self.len = 0;
        Ok(())
    }

    // Clear the grid, keeping bucket allocations for the next rebuild
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.len = 0;
        self.query_count.set(0);
        self.candidate_count.set(0);
    }

    // Cell coordinates of a position, clamped into the grid
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> (usize, usize) {
        let cx = (position.x / self.cell_size).floor();
        let cy = (position.y / self.cell_size).floor();
        let cx = cx.clamp(0.0, (self.cols - 1) as f32) as usize;
        let cy = cy.clamp(0.0, (self.rows - 1) as f32) as usize;
        (cx, cy)
    }

    #[inline]
    fn key(&self, cx: usize, cy: usize) -> usize {
        cx * self.rows + cy
    }

    // Insert an agent into the grid cell matching its position
    #[inline]
    pub fn insert(&mut self, index: usize, position: Vec2) {
        let (cx, cy) = self.cell_of(position);
        let key = self.key(cx, cy);
        self.cells[key].push(GridEntry { index, position });
        self.len += 1;
    }

    // Agents within `radius` of `position`, excluding `index` itself
    pub fn query_neighbors(&self, index: usize, position: Vec2, radius: f32) -> Vec<usize> {
        let mut result = Vec::new();
        self.query_neighbors_into(index, position, radius, &mut result);
        result
    }

    pub fn query_neighbors_into(&self, index: usize, position: Vec2, radius: f32, out: &mut Vec<usize>) {
        self.query_count.set(self.query_count.get() + 1);
        let radius_sq = radius * radius;
        let reach = radius.max(0.0);
        let xs = axis_cells(position.x - reach, position.x + reach, self.cell_size, self.cols);
        let ys = axis_cells(position.y - reach, position.y + reach, self.cell_size, self.rows);

        for cx in xs {
            for cy in ys.clone() {
                let key = self.key(cx, cy);
                self.scan_cell(key, index, radius_sq, out, |other| other - position);
            }
        }
    }

    // Same as query_neighbors, but on a torus: the scanned span wraps around
    // the grid and distances use the minimum-image delta. An agent is seen
    // once, at its nearest image, even when the radius exceeds half the world.
    pub fn query_neighbors_wrapped(&self, index: usize, position: Vec2, radius: f32) -> Vec<usize> {
        let mut result = Vec::new();
        self.query_neighbors_wrapped_into(index, position, radius, &mut result);
        result
    }

    pub fn query_neighbors_wrapped_into(&self, index: usize, position: Vec2, radius: f32, out: &mut Vec<usize>) {
        self.query_count.set(self.query_count.get() + 1);
        let radius_sq = radius * radius;
        let (width, height) = (self.width, self.height);

        let mut xs = Vec::with_capacity(4);
        let mut ys = Vec::with_capacity(4);
        wrapped_axis_cells(position.x, radius, width, self.cell_size, self.cols, &mut xs);
        wrapped_axis_cells(position.y, radius, height, self.cell_size, self.rows, &mut ys);

        for &cx in &xs {
            for &cy in &ys {
                let key = self.key(cx, cy);
                self.scan_cell(key, index, radius_sq, out, |other| {
                    wrapped_delta(position, other, width, height)
                });
            }
        }
    }

    #[inline]
    fn scan_cell<F>(&self, key: usize, index: usize, radius_sq: f32, out: &mut Vec<usize>, delta: F)
    where
        F: Fn(Vec2) -> Vec2,
    {
        let bucket = &self.cells[key];
        for entry in bucket {
            if entry.index == index {
                continue;
            }
            self.candidate_count.set(self.candidate_count.get() + 1);
            if delta(entry.position).length_squared() < radius_sq {
                out.push(entry.index);
            }
        }
    }
}

// Cells along one axis touched by [lo, hi], clamped into the grid
fn axis_cells(lo: f32, hi: f32, cell_size: f32, count: usize) -> RangeInclusive<usize> {
    let last = (count - 1) as f32;
    let first = (lo / cell_size).floor().clamp(0.0, last) as usize;
    let end = (hi / cell_size).floor().clamp(0.0, last) as usize;
    first..=end
}

// Cells along a wrapped axis of length `extent` touched by the span
// `center ± radius`. Each cell is listed once, even on narrow grids.
fn wrapped_axis_cells(center: f32, radius: f32, extent: f32, cell_size: f32, count: usize, out: &mut Vec<usize>) {
    out.clear();
    let reach = radius.max(0.0).min(extent / 2.0);
    let (lo, hi) = (center - reach, center + reach);

    let mut push = |cells: RangeInclusive<usize>| {
        for cell in cells {
            if !out.contains(&cell) {
                out.push(cell);
            }
        }
    };
    if lo < 0.0 {
        push(axis_cells(lo + extent, extent, cell_size, count));
        push(axis_cells(0.0, hi, cell_size, count));
    } else if hi > extent {
        push(axis_cells(lo, extent, cell_size, count));
        push(axis_cells(0.0, hi - extent, cell_size, count));
    } else {
        push(axis_cells(lo, hi, cell_size, count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(points: &[(f32, f32)]) -> SpatialGrid {
        let mut grid = SpatialGrid::new(80.0, 800.0, 600.0).unwrap();
        for (i, &(x, y)) in points.iter().enumerate() {
            grid.insert(i, Vec2::new(x, y));
        }
        grid
    }

    #[test]
    fn rejects_degenerate_geometry() {
        assert!(SpatialGrid::new(0.0, 800.0, 600.0).is_err());
        assert!(SpatialGrid::new(80.0, -1.0, 600.0).is_err());
        assert!(SpatialGrid::new(f32::NAN, 800.0, 600.0).is_err());
    }

    #[test]
    fn dimensions_cover_the_world() {
        let grid = SpatialGrid::new(80.0, 800.0, 600.0).unwrap();
        assert_eq!(grid.dimensions(), (10, 8));
        assert_eq!(grid.cell_of(Vec2::new(798.0, 598.0)), (9, 7));
        assert_eq!(grid.cell_of(Vec2::new(800.0, 600.0)), (9, 7));
        assert_eq!(grid.cell_of(Vec2::new(-5.0, 10.0)), (0, 0));
    }

    #[test]
    fn query_skips_self_and_far_agents() {
        let grid = grid_with(&[(100.0, 100.0), (120.0, 100.0), (300.0, 300.0)]);
        let neighbors = grid.query_neighbors(0, Vec2::new(100.0, 100.0), 50.0);
        assert_eq!(neighbors, vec![1]);
    }

    #[test]
    fn opposite_corners_only_meet_when_wrapped() {
        let grid = grid_with(&[(1.0, 1.0), (798.0, 598.0)]);
        assert_eq!(grid.query_neighbors_wrapped(0, Vec2::new(1.0, 1.0), 50.0), vec![1]);
        assert_eq!(grid.query_neighbors_wrapped(1, Vec2::new(798.0, 598.0), 50.0), vec![0]);
        assert!(grid.query_neighbors(0, Vec2::new(1.0, 1.0), 50.0).is_empty());
        assert!(grid.query_neighbors(1, Vec2::new(798.0, 598.0), 50.0).is_empty());
    }

    #[test]
    fn narrow_grids_do_not_report_duplicates() {
        let mut grid = SpatialGrid::new(100.0, 150.0, 150.0).unwrap();
        grid.insert(0, Vec2::new(10.0, 10.0));
        grid.insert(1, Vec2::new(20.0, 20.0));
        assert_eq!(grid.dimensions(), (2, 2));
        assert_eq!(grid.query_neighbors_wrapped(0, Vec2::new(10.0, 10.0), 60.0), vec![1]);
    }

    #[test]
    fn resize_drops_entries_and_keeps_geometry_on_error() {
        let mut grid = grid_with(&[(10.0, 10.0), (20.0, 20.0)]);
        assert_eq!(grid.len(), 2);

        grid.resize(50.0, 800.0, 600.0).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.dimensions(), (16, 12));
        assert!(grid.query_neighbors(0, Vec2::new(10.0, 10.0), 50.0).is_empty());

        assert!(grid.resize(-3.0, 800.0, 600.0).is_err());
        assert_eq!(grid.cell_size(), 50.0);
    }

    #[test]
    fn clear_resets_diagnostics() {
        let grid_points = [(10.0, 10.0), (20.0, 20.0)];
        let mut grid = grid_with(&grid_points);
        grid.query_neighbors(0, Vec2::new(10.0, 10.0), 50.0);
        assert_eq!(grid.query_count(), 1);
        assert_eq!(grid.candidate_count(), 1);
        grid.clear();
        assert_eq!(grid.query_count(), 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn wrapped_query_crosses_a_partial_last_row() {
        // 600 / 80 leaves a 40-unit last row, so y=555 and y=20 are two rows apart
        let grid = grid_with(&[(400.0, 555.0), (400.0, 20.0)]);
        assert_eq!(grid.query_neighbors_wrapped(0, Vec2::new(400.0, 555.0), 80.0), vec![1]);
    }

    #[test]
    fn large_radius_scans_beyond_the_adjacent_cells() {
        let grid = grid_with(&[(100.0, 100.0), (290.0, 100.0)]);
        assert_eq!(grid.query_neighbors(0, Vec2::new(100.0, 100.0), 200.0), vec![1]);
        assert_eq!(grid.query_neighbors_wrapped(0, Vec2::new(100.0, 100.0), 200.0), vec![1]);
    }
}
