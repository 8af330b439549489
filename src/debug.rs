/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that contains frame timing and
 * spatial grid metrics to be displayed in the UI.
 *
 * Includes metrics for:
 * - FPS (frames per second) and frame time
 * - Simulation ticks run in the last frame
 * - Grid queries and candidates examined in the last tick
 */

use std::time::Duration;

use crate::flock::Flock;

#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub ticks_this_frame: usize,
    pub grid_queries: usize,
    pub grid_candidates: usize,
    pub grid_cells: (usize, usize),
}

impl DebugInfo {
    // Pull the per-tick grid counters out of the flock
    pub fn observe_grid(&mut self, flock: &Flock) {
        let grid = flock.grid();
        self.grid_queries = grid.query_count();
        self.grid_candidates = grid.candidate_count();
        self.grid_cells = grid.dimensions();
    }

    // Mean candidates examined per neighbor query
    pub fn candidates_per_query(&self) -> f32 {
        if self.grid_queries == 0 {
            0.0
        } else {
            self.grid_candidates as f32 / self.grid_queries as f32
        }
    }
}
