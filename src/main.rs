/*
 * Murmuration
 *
 * This application simulates the flocking behavior of birds (boids) based on three main rules:
 * 1. Separation: Avoid crowding neighbors
 * 2. Alignment: Steer towards the average heading of neighbors
 * 3. Cohesion: Steer towards the average position of neighbors
 *
 * On top of the classic rules it offers a predator chasing the cursor, an
 * obstacle painter, an evolution mode and sound-reactive weights. Run it
 * with a window, or with --headless to simulate a fixed number of ticks and
 * log flock statistics.
 */

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use murmuration::app::{self, LaunchConfig};
use murmuration::{Flock, Mode, Preset, SimulationParams};

#[derive(Parser, Debug)]
#[command(name = "murmuration", version, about = "Boids flocking simulation")]
struct Args {
    /// TOML file with simulation parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter preset applied on top of the configuration
    #[arg(short, long)]
    preset: Option<Preset>,

    /// Interaction mode to start in
    #[arg(short, long, default_value_t = Mode::Normal)]
    mode: Mode,

    /// Seed for the random number generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of boids, overriding the configuration
    #[arg(short = 'n', long)]
    boids: Option<usize>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Ticks to simulate in headless mode
    #[arg(long, default_value_t = 600)]
    ticks: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut params = match &args.config {
        Some(path) => SimulationParams::load(path)
            .with_context(|| format!("Could not load parameters from {}", path.display()))?,
        None => SimulationParams::default(),
    };
    if let Some(preset) = args.preset {
        log::info!("Applying preset {preset}");
        params.apply_preset(preset);
    }
    if let Some(boids) = args.boids {
        params.num_boids = boids;
    }
    params.validate().context("Invalid simulation parameters")?;

    let seed = args.seed.unwrap_or_else(rand::random::<u64>);
    log::info!("Using seed {seed}");

    if args.headless {
        let flock = Flock::new(params, seed).context("Could not create flock")?;
        run_headless(flock, args.mode, args.ticks);
        return Ok(());
    }

    app::configure(LaunchConfig {
        params,
        seed,
        mode: args.mode,
    });
    nannou::app(app::model).update(app::update).run();
    Ok(())
}

// Step the flock at 60 ticks per simulated second and log statistics
fn run_headless(mut flock: Flock, mode: Mode, ticks: u64) {
    let dt = Duration::from_secs_f32(1.0 / app::TICK_RATE);
    if mode != Mode::Normal {
        flock.switch_mode(mode);
    }
    if mode == Mode::Predator {
        // Park the predator in the middle of the world
        let params = flock.params();
        let center = nannou::prelude::Vec2::new(params.world_width / 2.0, params.world_height / 2.0);
        flock.set_pointer(Some(center));
    }

    for tick in 1..=ticks {
        flock.step(dt);
        if tick % 60 == 0 {
            let stats = flock.stats();
            log::info!(
                "tick {tick}: population {}, mean speed {:.2}, mean neighbors {:.1}, compactness {:.1}",
                stats.population,
                stats.mean_speed,
                stats.mean_neighbors,
                stats.compactness
            );
        }
    }

    match mode {
        Mode::Predator => log::info!("Predator caught {} boids", flock.kill_count()),
        Mode::Evolution => {
            let fitness = flock.fitness_summary();
            log::info!(
                "Reached generation {} (top fitness {:.1}, mean {:.1})",
                flock.generation(),
                fitness.top,
                fitness.mean
            );
        }
        Mode::Normal | Mode::Painter | Mode::Sound => {}
    }
    log::info!("Simulated {:.1} s in {} ticks", flock.clock_ms() / 1000.0, flock.tick_count());
}
