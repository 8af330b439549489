/*
 * Renderer Module
 *
 * This module handles the rendering of the simulation: boids, trails,
 * obstacles, predators, the fear trail and an optional debug overlay.
 *
 * The world runs from (0, 0) at the top-left corner of the window to
 * (width, height) at the bottom-right, with y pointing down. nannou puts the
 * origin at the window centre with y pointing up, so every position goes
 * through world_to_screen before drawing.
 */

use nannou::prelude::*;

use crate::app::Model;
use crate::boid::{Boid, Species};
use crate::debug::DebugInfo;
use crate::evolution::EVOLUTION_FLEE_RADIUS;
use crate::flock::Flock;
use crate::mode::{Mode, FEAR_POINT_LIFETIME_MS};
use crate::obstacle::ObstacleKind;
use crate::stats::STATS_HISTORY_LEN;

pub const BOID_SIZE: f32 = 6.0;

pub fn world_to_screen(position: Vec2, window_rect: Rect) -> Vec2 {
    vec2(window_rect.left() + position.x, window_rect.top() - position.y)
}

pub fn screen_to_world(position: Vec2, window_rect: Rect) -> Vec2 {
    vec2(position.x - window_rect.left(), window_rect.top() - position.y)
}

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();
    let flock = &model.flock;
    let params = flock.params();

    if params.trails_enabled {
        draw_trails(&draw, flock, window_rect);
    }
    draw_obstacles(&draw, flock, window_rect);

    let selected = flock.selected_id();
    for boid in flock.boids() {
        draw_boid(&draw, boid, window_rect, selected == Some(boid.id));
    }

    match flock.mode() {
        Mode::Predator => draw_predator(&draw, flock, window_rect),
        Mode::Evolution => {
            for predator in &flock.modes().evolution.predators {
                let screen = world_to_screen(predator.position, window_rect);
                draw.ellipse().xy(screen).radius(8.0).color(rgb(255u8, 140, 0));
                draw.ellipse()
                    .xy(screen)
                    .radius(EVOLUTION_FLEE_RADIUS)
                    .no_fill()
                    .stroke(rgba(1.0, 0.55, 0.0, 0.2))
                    .stroke_weight(1.0);
            }
        }
        Mode::Normal | Mode::Painter | Mode::Sound => {}
    }

    if params.show_debug {
        draw_debug_overlay(&draw, flock, window_rect);
        draw_debug_info(&draw, &model.debug_info, flock, window_rect);
    }

    draw.to_frame(app, &frame).unwrap();

    // Draw the egui UI
    model.egui.draw_to_frame(&frame).unwrap();
}

fn species_color(species: Species) -> Rgb<u8> {
    match species {
        Species::Blue => rgb(110, 170, 255),
        Species::Red => rgb(255, 110, 110),
    }
}

fn draw_boid(draw: &Draw, boid: &Boid, window_rect: Rect, is_selected: bool) {
    let screen = world_to_screen(boid.position, window_rect);
    // Flip the heading because screen y points up
    let angle = (-boid.velocity.y).atan2(boid.velocity.x);

    let color = if boid.is_panicking() {
        rgb(255, 230, 90)
    } else {
        species_color(boid.species)
    };

    let points = [
        pt2(BOID_SIZE, 0.0),
        pt2(-BOID_SIZE, BOID_SIZE / 2.0),
        pt2(-BOID_SIZE, -BOID_SIZE / 2.0),
    ];
    draw.polygon().color(color).points(points).xy(screen).rotate(angle);

    if is_selected {
        draw.ellipse()
            .xy(screen)
            .radius(BOID_SIZE * 2.0)
            .no_fill()
            .stroke(WHITE)
            .stroke_weight(1.5);
    }
}

fn draw_trails(draw: &Draw, flock: &Flock, window_rect: Rect) {
    let params = flock.params();
    let now = flock.clock_ms();
    // Segments longer than this crossed a wrapped edge
    let max_jump = params.world_width.min(params.world_height) / 2.0;

    for boid in flock.boids() {
        let (r, g, b) = match boid.species {
            Species::Blue => (0.43, 0.67, 1.0),
            Species::Red => (1.0, 0.43, 0.43),
        };
        let mut previous: Option<Vec2> = None;
        for point in &boid.trail {
            if let Some(last) = previous {
                if last.distance(point.position) < max_jump {
                    let age = ((now - point.time_ms) / crate::boid::TRAIL_LIFETIME_MS).clamp(0.0, 1.0) as f32;
                    draw.line()
                        .start(world_to_screen(last, window_rect))
                        .end(world_to_screen(point.position, window_rect))
                        .weight(1.0)
                        .color(rgba(r, g, b, 0.5 * (1.0 - age)));
                }
            }
            previous = Some(point.position);
        }
    }
}

fn draw_obstacles(draw: &Draw, flock: &Flock, window_rect: Rect) {
    let followed = flock.follow_obstacle();
    for obstacle in flock.obstacles() {
        let color = match obstacle.kind {
            ObstacleKind::Static => rgba(0.5, 0.5, 0.5, 0.8),
            ObstacleKind::Drift => rgba(0.4, 0.7, 0.5, 0.8),
            ObstacleKind::Repel => rgba(0.8, 0.3, 0.6, 0.8),
        };
        let screen = world_to_screen(obstacle.position, window_rect);
        draw.ellipse().xy(screen).radius(obstacle.radius).color(color);
        if followed == Some(obstacle.id) {
            draw.ellipse()
                .xy(screen)
                .radius(obstacle.radius + 3.0)
                .no_fill()
                .stroke(WHITE)
                .stroke_weight(1.0);
        }
    }
}

fn draw_predator(draw: &Draw, flock: &Flock, window_rect: Rect) {
    let now = flock.clock_ms();
    for point in &flock.modes().predator.fear_points {
        let age = ((now - point.time_ms) / FEAR_POINT_LIFETIME_MS).clamp(0.0, 1.0) as f32;
        draw.ellipse()
            .xy(world_to_screen(point.position, window_rect))
            .radius(4.0)
            .color(rgba(1.0, 0.2, 0.2, 0.4 * (1.0 - age)));
    }

    if let Some(position) = flock.predator_position() {
        let screen = world_to_screen(position, window_rect);
        draw.ellipse().xy(screen).radius(10.0).color(RED);
        draw.ellipse()
            .xy(screen)
            .radius(flock.params().predator_radius)
            .no_fill()
            .stroke(rgba(1.0, 0.0, 0.0, 0.25))
            .stroke_weight(1.0);
    }
}

// Grid lines, the selected boid's perception radius and a stats chart
fn draw_debug_overlay(draw: &Draw, flock: &Flock, window_rect: Rect) {
    let params = flock.params();
    if params.enable_spatial_grid {
        let cell = flock.grid().cell_size();
        let line_color = rgba(0.3, 0.3, 0.3, 0.5);
        let mut x = 0.0;
        while x <= params.world_width {
            draw.line()
                .start(world_to_screen(vec2(x, 0.0), window_rect))
                .end(world_to_screen(vec2(x, params.world_height), window_rect))
                .weight(1.0)
                .color(line_color);
            x += cell;
        }
        let mut y = 0.0;
        while y <= params.world_height {
            draw.line()
                .start(world_to_screen(vec2(0.0, y), window_rect))
                .end(world_to_screen(vec2(params.world_width, y), window_rect))
                .weight(1.0)
                .color(line_color);
            y += cell;
        }
    }

    if let Some(boid) = flock.selected().or_else(|| flock.boids().first()) {
        let screen = world_to_screen(boid.position, window_rect);
        draw.ellipse()
            .xy(screen)
            .radius(params.perception_radius)
            .no_fill()
            .stroke(GREEN)
            .stroke_weight(1.0);
        draw.arrow()
            .start(screen)
            .end(world_to_screen(boid.position + boid.velocity * 5.0, window_rect))
            .color(YELLOW)
            .stroke_weight(2.0);
    }

    // Mean speed history along the bottom edge
    let samples: Vec<f32> = flock.history().samples().map(|stats| stats.mean_speed).collect();
    let top_speed = samples.iter().copied().fold(params.max_speed, f32::max);
    let chart_width = 240.0;
    let chart_height = 60.0;
    let origin = pt2(window_rect.right() - chart_width - 10.0, window_rect.bottom() + 10.0);
    let step = chart_width / STATS_HISTORY_LEN as f32;
    for (i, pair) in samples.windows(2).enumerate() {
        let start = pt2(origin.x + i as f32 * step, origin.y + pair[0] / top_speed * chart_height);
        let end = pt2(origin.x + (i + 1) as f32 * step, origin.y + pair[1] / top_speed * chart_height);
        draw.line().start(start).end(end).weight(1.5).color(STEELBLUE);
    }
}

// Draw debug information on the screen
fn draw_debug_info(draw: &Draw, debug_info: &DebugInfo, flock: &Flock, window_rect: Rect) {
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 220.0;
    let stats = flock.stats();

    let debug_texts = [
        format!("FPS: {:.1}", debug_info.fps),
        format!("Frame time: {:.2} ms", debug_info.frame_time.as_secs_f64() * 1000.0),
        format!("Mode: {}", flock.mode()),
        format!("Boids: {}", stats.population),
        format!("Mean speed: {:.2}", stats.mean_speed),
        format!("Mean neighbors: {:.1}", stats.mean_neighbors),
        format!("Simulated: {:.1} s", flock.clock_ms() / 1000.0),
    ];

    let panel_height = line_height * debug_texts.len() as f32 + margin;
    draw.rect()
        .x_y(window_rect.right() - panel_width / 2.0, window_rect.top() - panel_height / 2.0)
        .w_h(panel_width, panel_height)
        .color(rgba(0.0, 0.0, 0.0, 0.7));

    let text_x = window_rect.right() - panel_width / 2.0;
    let text_y = window_rect.top() - margin;
    for (i, text) in debug_texts.iter().enumerate() {
        draw.text(text)
            .x_y(text_x, text_y - i as f32 * line_height)
            .color(WHITE)
            .font_size(14);
    }
}
