/*
 * Input Module
 *
 * This module handles user input events for the viewer.
 *
 * Features:
 * - The cursor position drives the predator in predator mode and the
 *   followed obstacle in painter mode
 * - Painter mode: left-drag paints obstacles, right-click removes one
 * - Other modes: left-click selects the nearest boid
 * - Window resizes resize the world
 * - Clicks over the egui panel never reach the simulation
 */

use nannou::prelude::*;
use nannou::winit::event::{MouseButton, WindowEvent};

use crate::app::Model;
use crate::mode::Mode;
use crate::renderer::screen_to_world;

// Cursor position in world coordinates, or None outside the world
fn pointer_in_world(app: &App, model: &Model) -> Option<Vec2> {
    let world = screen_to_world(model.mouse_position, app.window_rect());
    let params = model.flock.params();
    let inside = (0.0..=params.world_width).contains(&world.x) && (0.0..=params.world_height).contains(&world.y);
    inside.then_some(world)
}

// Mouse moved event handler
pub fn mouse_moved(app: &App, model: &mut Model, pos: Point2) {
    model.mouse_position = Vec2::new(pos.x, pos.y);
    let pointer = pointer_in_world(app, model);
    model.flock.set_pointer(pointer);

    if model.painting {
        if let Some(world) = pointer {
            let kind = model.ui_state.paint_kind;
            let radius = model.ui_state.paint_radius;
            model.flock.paint_obstacle(world, radius, kind);
        }
    }
}

// Mouse pressed event handler
pub fn mouse_pressed(app: &App, model: &mut Model, button: MouseButton) {
    // Ignore clicks that land on the UI
    if model.egui.ctx().is_pointer_over_area() {
        return;
    }
    let Some(world) = pointer_in_world(app, model) else {
        return;
    };

    match (model.flock.mode(), button) {
        (Mode::Painter, MouseButton::Left) => {
            model.painting = true;
            let kind = model.ui_state.paint_kind;
            let radius = model.ui_state.paint_radius;
            model.flock.paint_obstacle(world, radius, kind);
        }
        (Mode::Painter, MouseButton::Right) => {
            if model.flock.remove_obstacle_at(world) && model.flock.follow_obstacle().is_none() {
                model.ui_state.follow_obstacle = false;
            }
        }
        (_, MouseButton::Left) => {
            if let Some(id) = model.flock.select_nearest(world) {
                log::debug!("Selected boid {:?}", id);
            }
        }
        _ => {}
    }
}

// Mouse released event handler
pub fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        model.painting = false;
    }
}

// The predator disappears when the cursor leaves the window
pub fn mouse_exited(_app: &App, model: &mut Model) {
    model.flock.set_pointer(None);
    model.painting = false;
}

// The world always matches the window
pub fn resized(_app: &App, model: &mut Model, size: Vec2) {
    // Minimised windows report a zero size, which the flock ignores
    if model.flock.set_world_size(size.x, size.y) {
        log::debug!("Window resized to {:.0}x{:.0}", size.x, size.y);
    }
}

// Handle raw window events for egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &WindowEvent) {
    model.egui.handle_raw_event(event);
}
