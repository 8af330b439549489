/*
 * Application Module
 *
 * This module defines the main application model for the interactive
 * viewer. It owns the Flock, the egui integration and the fixed-timestep
 * clock that drives the simulation independently of the render rate.
 *
 * nannou builds the model from a plain function pointer, so launch options
 * parsed on the command line are handed over through `configure` before
 * the app starts.
 */

use nannou::prelude::*;
use nannou_egui::Egui;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::debug::DebugInfo;
use crate::flock::Flock;
use crate::input;
use crate::mode::Mode;
use crate::params::SimulationParams;
use crate::renderer;
use crate::ui::{self, UiActions, UiState};

// Simulation ticks per second of wall time
pub const TICK_RATE: f32 = 60.0;
// Frames that fall further behind than this drop the backlog
const MAX_TICKS_PER_FRAME: usize = 5;

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub params: SimulationParams,
    pub seed: u64,
    pub mode: Mode,
}

static LAUNCH: OnceLock<LaunchConfig> = OnceLock::new();

// Hand launch options to `model`. Returns false if already configured.
pub fn configure(config: LaunchConfig) -> bool {
    LAUNCH.set(config).is_ok()
}

// Main model for the application
pub struct Model {
    pub flock: Flock,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    pub ui_state: UiState,
    // Last known cursor position in screen coordinates
    pub mouse_position: Vec2,
    pub painting: bool,
    // Fixed timestep physics variables
    pub physics_accumulator: Duration,
    pub physics_step_size: Duration,
    pub last_update_time: Instant,
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let config = LAUNCH.get().cloned().unwrap_or_else(|| LaunchConfig {
        params: SimulationParams::default(),
        seed: rand::random(),
        mode: Mode::Normal,
    });

    let window_id = app
        .new_window()
        .title("Murmuration")
        .size(config.params.world_width as u32, config.params.world_height as u32)
        .view(renderer::view)
        .mouse_moved(input::mouse_moved)
        .mouse_pressed(input::mouse_pressed)
        .mouse_released(input::mouse_released)
        .mouse_exited(input::mouse_exited)
        .resized(input::resized)
        .raw_event(input::raw_window_event)
        .build()
        .expect("Failed to create window");

    let window = app.window(window_id).expect("Window vanished after creation");
    let egui = Egui::from_window(&window);

    // Launch parameters are validated before the app starts
    let mut flock = Flock::new(config.params, config.seed).expect("Launch parameters were validated");
    if config.mode != Mode::Normal {
        flock.switch_mode(config.mode);
    }

    Model {
        flock,
        egui,
        debug_info: DebugInfo::default(),
        ui_state: UiState::default(),
        mouse_position: Vec2::ZERO,
        painting: false,
        physics_accumulator: Duration::ZERO,
        physics_step_size: Duration::from_secs_f32(1.0 / TICK_RATE),
        last_update_time: Instant::now(),
    }
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    let actions = ui::update_ui(&mut model.egui, &mut model.flock, &mut model.ui_state, &model.debug_info);
    apply_ui_actions(model, actions);

    let current_time = Instant::now();
    let frame_time = current_time.duration_since(model.last_update_time);
    model.last_update_time = current_time;

    if model.flock.params().pause_simulation {
        model.physics_accumulator = Duration::ZERO;
        model.debug_info.ticks_this_frame = 0;
        return;
    }

    model.physics_accumulator += frame_time;
    let mut ticks_this_frame = 0;
    while model.physics_accumulator >= model.physics_step_size {
        model.flock.step(model.physics_step_size);
        model.physics_accumulator -= model.physics_step_size;
        ticks_this_frame += 1;

        if ticks_this_frame == MAX_TICKS_PER_FRAME {
            log::debug!("Dropping {:?} of simulation backlog", model.physics_accumulator);
            model.physics_accumulator = Duration::ZERO;
            break;
        }
    }
    model.debug_info.ticks_this_frame = ticks_this_frame;
    model.debug_info.observe_grid(&model.flock);
}

fn apply_ui_actions(model: &mut Model, actions: UiActions) {
    let flock = &mut model.flock;

    if actions.reset {
        flock.reset();
        model.ui_state.follow_obstacle = false;
        return;
    }
    if let Some(mode) = actions.switch_mode {
        flock.switch_mode(mode);
        model.ui_state.follow_obstacle = false;
        model.painting = false;
    }
    if actions.population_changed {
        flock.adjust_population();
    }
    if actions.clear_obstacles {
        flock.clear_obstacles();
        model.ui_state.follow_obstacle = false;
    }
    if actions.generate_maze {
        flock.generate_maze();
        model.ui_state.follow_obstacle = false;
    }
    if let Some(enabled) = actions.follow_obstacle {
        flock.set_follow_obstacle(enabled);
    }
}
