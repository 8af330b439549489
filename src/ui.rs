/*
 * UI Module
 *
 * This module contains the control panel built with nannou_egui. It edits
 * the flock's parameters in place and reports structural requests (reset,
 * mode switches, obstacle commands) back to the app, which applies them
 * between frames. Parameter change detection is handled by the
 * SimulationParams struct.
 */

use nannou_egui::{egui, Egui};

use crate::boid::Species;
use crate::debug::DebugInfo;
use crate::evolution::FitnessSummary;
use crate::flock::Flock;
use crate::mode::{AudioLevels, Mode};
use crate::obstacle::ObstacleKind;
use crate::params::{BoundaryMode, Preset, SimulationParams, VisionMode};
use crate::stats::FlockStats;

// Panel state that is not part of the simulation itself
#[derive(Debug, Clone)]
pub struct UiState {
    pub paint_kind: ObstacleKind,
    pub paint_radius: f32,
    pub follow_obstacle: bool,
    // Manual band levels, used in sound mode when no audio feed is attached
    pub audio: AudioLevels,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            paint_kind: ObstacleKind::Static,
            paint_radius: 20.0,
            follow_obstacle: false,
            audio: AudioLevels::default(),
        }
    }
}

// Requests the app applies after the panel has been drawn
#[derive(Debug, Clone, Default)]
pub struct UiActions {
    pub reset: bool,
    pub population_changed: bool,
    pub switch_mode: Option<Mode>,
    pub generate_maze: bool,
    pub clear_obstacles: bool,
    pub follow_obstacle: Option<bool>,
}

// Read-only figures gathered before the panel borrows the parameters
struct Readout {
    mode: Mode,
    stats: FlockStats,
    kill_count: u64,
    pending_respawns: usize,
    generation: u32,
    fitness: FitnessSummary,
    obstacles: usize,
    selected: Option<SelectedReadout>,
}

struct SelectedReadout {
    species: Species,
    speed: f32,
    neighbors: usize,
    fitness: f32,
    panicking: bool,
}

impl Readout {
    fn gather(flock: &Flock) -> Self {
        Self {
            mode: flock.mode(),
            stats: flock.stats(),
            kill_count: flock.kill_count(),
            pending_respawns: flock.pending_respawns().len(),
            generation: flock.generation(),
            fitness: flock.fitness_summary(),
            obstacles: flock.obstacles().len(),
            selected: flock.selected().map(|boid| SelectedReadout {
                species: boid.species,
                speed: boid.velocity.length(),
                neighbors: boid.neighbor_count,
                fitness: boid.fitness,
                panicking: boid.is_panicking(),
            }),
        }
    }
}

// Draw the control panel and collect the requests it produced
pub fn update_ui(egui: &mut Egui, flock: &mut Flock, state: &mut UiState, debug_info: &DebugInfo) -> UiActions {
    let mut actions = UiActions::default();
    let readout = Readout::gather(flock);

    if readout.mode == Mode::Sound && !flock.modes().has_audio_feed() {
        flock.set_audio_levels(Some(state.audio));
    }

    let params = flock.params_mut();
    // Take a snapshot of current parameter values for change detection
    params.take_snapshot();

    let ctx = egui.begin_frame();

    egui::Window::new("Simulation Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.label("Mode");
            ui.horizontal(|ui| {
                for mode in Mode::ALL {
                    if ui.selectable_label(readout.mode == mode, mode.label()).clicked() && readout.mode != mode {
                        actions.switch_mode = Some(mode);
                    }
                }
            });

            ui.collapsing("Flocking", |ui| {
                ui.add(egui::Slider::new(&mut params.num_boids, SimulationParams::get_num_boids_range()).text("Number of Boids"));
                ui.add(egui::Slider::new(&mut params.max_speed, SimulationParams::get_max_speed_range()).text("Max Speed"));
                ui.add(egui::Slider::new(&mut params.separation_weight, SimulationParams::get_weight_range()).text("Separation Weight"));
                ui.add(egui::Slider::new(&mut params.alignment_weight, SimulationParams::get_weight_range()).text("Alignment Weight"));
                ui.add(egui::Slider::new(&mut params.cohesion_weight, SimulationParams::get_weight_range()).text("Cohesion Weight"));
                ui.add(egui::Slider::new(&mut params.perception_radius, SimulationParams::get_radius_range()).text("Perception Radius"));

                ui.horizontal(|ui| {
                    ui.label("Presets:");
                    for preset in Preset::ALL {
                        if ui.button(preset.name()).clicked() {
                            log::info!("Applying preset {preset}");
                            params.apply_preset(preset);
                        }
                    }
                });
            });

            ui.collapsing("World", |ui| {
                ui.horizontal(|ui| {
                    ui.label("Edges:");
                    ui.radio_value(&mut params.boundary_mode, BoundaryMode::Wrap, "Wrap");
                    ui.radio_value(&mut params.boundary_mode, BoundaryMode::Bounce, "Bounce");
                });
                ui.horizontal(|ui| {
                    ui.label("Vision:");
                    ui.radio_value(&mut params.vision_mode, VisionMode::Omni, "Omni");
                    ui.radio_value(&mut params.vision_mode, VisionMode::Cone, "Cone");
                });
                ui.checkbox(&mut params.two_species, "Two Species");
                ui.checkbox(&mut params.trails_enabled, "Trails");
                ui.checkbox(&mut params.enable_spatial_grid, "Enable Spatial Grid");
            });

            match readout.mode {
                Mode::Predator => {
                    ui.collapsing("Predator", |ui| {
                        ui.add(egui::Slider::new(&mut params.predator_radius, SimulationParams::get_predator_radius_range()).text("Flee Radius"));
                        ui.checkbox(&mut params.predator_follow, "Smooth Follow");
                        ui.checkbox(&mut params.predator_fear_trail, "Fear Trail");
                        ui.label(format!("Kills: {}", readout.kill_count));
                        ui.label(format!("Respawning: {}", readout.pending_respawns));
                    });
                }
                Mode::Painter => {
                    ui.collapsing("Painter", |ui| {
                        ui.horizontal(|ui| {
                            for kind in ObstacleKind::ALL {
                                ui.radio_value(&mut state.paint_kind, kind, kind.label());
                            }
                        });
                        ui.add(egui::Slider::new(&mut state.paint_radius, 5.0..=60.0).text("Brush Radius"));
                        if ui.checkbox(&mut state.follow_obstacle, "Follow Cursor").changed() {
                            actions.follow_obstacle = Some(state.follow_obstacle);
                        }
                        ui.horizontal(|ui| {
                            if ui.button("Generate Maze").clicked() {
                                actions.generate_maze = true;
                            }
                            if ui.button("Clear").clicked() {
                                actions.clear_obstacles = true;
                            }
                        });
                        ui.label(format!("Obstacles: {}", readout.obstacles));
                    });
                }
                Mode::Evolution => {
                    ui.collapsing("Evolution", |ui| {
                        ui.add(egui::Slider::new(&mut params.evolution_interval_secs, SimulationParams::get_evolution_interval_range()).text("Generation (s)"));
                        ui.label(format!("Generation: {}", readout.generation));
                        ui.label(format!("Top fitness: {:.1}", readout.fitness.top));
                        ui.label(format!("Mean fitness: {:.1}", readout.fitness.mean));
                        let bars: Vec<String> = readout.fitness.histogram.iter().map(|count| count.to_string()).collect();
                        ui.label(format!("Histogram: {}", bars.join(" ")));
                    });
                }
                Mode::Sound => {
                    ui.collapsing("Sound", |ui| {
                        ui.add(egui::Slider::new(&mut state.audio.bass, 0.0..=1.0).text("Bass"));
                        ui.add(egui::Slider::new(&mut state.audio.mid, 0.0..=1.0).text("Mid"));
                        ui.add(egui::Slider::new(&mut state.audio.treble, 0.0..=1.0).text("Treble"));
                        ui.label(format!("Intensity: {:.2}", state.audio.intensity()));
                    });
                }
                Mode::Normal => {}
            }

            ui.collapsing("Statistics", |ui| {
                ui.label(format!("Population: {}", readout.stats.population));
                ui.label(format!("Mean speed: {:.2}", readout.stats.mean_speed));
                ui.label(format!("Mean neighbors: {:.1}", readout.stats.mean_neighbors));
                ui.label(format!("Compactness: {:.1}", readout.stats.compactness));
                if let Some(selected) = &readout.selected {
                    ui.separator();
                    ui.label(format!("Selected: {:?}", selected.species));
                    ui.label(format!("Speed: {:.2}", selected.speed));
                    ui.label(format!("Neighbors: {}", selected.neighbors));
                    ui.label(format!("Fitness: {:.1}", selected.fitness));
                    if selected.panicking {
                        ui.label("Panicking");
                    }
                }
            });

            ui.collapsing("Performance", |ui| {
                ui.label(format!("FPS: {:.1}", debug_info.fps));
                ui.label(format!("Frame time: {:.2} ms", debug_info.frame_time.as_secs_f64() * 1000.0));
                ui.label(format!("Ticks this frame: {}", debug_info.ticks_this_frame));
                ui.label(format!("Grid: {}x{} cells", debug_info.grid_cells.0, debug_info.grid_cells.1));
                ui.label(format!("Candidates per query: {:.1}", debug_info.candidates_per_query()));
            });

            ui.separator();
            ui.checkbox(&mut params.show_debug, "Show Debug Info");
            ui.checkbox(&mut params.pause_simulation, "Pause Simulation");
            if ui.button("Reset").clicked() {
                actions.reset = true;
            }
        });

    // Detect parameter changes
    let changes = params.detect_changes();
    actions.population_changed = changes.population;
    if changes.any {
        log::trace!("Parameters changed: {:?}", changes);
    }

    actions
}
