use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use glam::Vec4;
use towerdef_assets::{LoadedMap, TuningFile, load_map};
use towerdef_common::EnemyTypeId;
use towerdef_kernel::{SimCommand, Simulation};
use towerdef_render::{
    HeadlessRenderContext, OrthoCamera, RenderContext, RenderQueue, TileSet, queue_enemies,
};
use tracing_subscriber::EnvFilter;

const CLEAR_COLOR: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);

#[derive(Parser)]
#[command(name = "towerdef-cli", about = "Headless tools for the tower-defense flocking demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Tiled JSON map to load
    #[arg(long, default_value = "data/maps/tower_defense.json")]
    map: PathBuf,

    /// JSON file with `flock` and `sim` tuning sections
    #[arg(long)]
    params: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Enemy type to spawn, by name or index
    #[arg(short = 't', long, default_value = "0")]
    enemy_type: String,
    /// Enemies to spawn (0 = the type's units per spawn)
    #[arg(short, long, default_value = "20")]
    count: u32,
    /// Simulated seconds
    #[arg(short, long, default_value = "10")]
    seconds: f32,
    /// Render frames per simulated second
    #[arg(long, default_value = "60")]
    fps: f32,
    /// Override the spawn jitter seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print map contents and crate versions
    Info,
    /// Run the simulation without a window and report per-second stats
    Simulate {
        #[command(flatten)]
        run: RunArgs,
        /// Drop enemies that reached the end of the path once per second
        #[arg(long)]
        despawn_finished: bool,
    },
    /// Run the same scenario twice and compare final state hashes
    Determinism {
        #[command(flatten)]
        run: RunArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let map = load_map(&cli.map).with_context(|| format!("loading map {}", cli.map.display()))?;
    let tuning = TuningFile::load_or_default(cli.params.as_deref())
        .context("loading tuning parameters")?;

    match cli.command {
        Commands::Info => print_info(&cli.map, &map, &tuning),
        Commands::Simulate {
            run,
            despawn_finished,
        } => {
            let outcome = run_scenario(&map, &tuning, &run, despawn_finished, true)?;
            println!(
                "Done: tick={}, enemies={}, finished={}, hash={:#018x}",
                outcome.tick, outcome.enemies, outcome.finished, outcome.hash
            );
        }
        Commands::Determinism { run } => {
            let a = run_scenario(&map, &tuning, &run, false, false)?;
            let b = run_scenario(&map, &tuning, &run, false, false)?;
            println!("Run 1: tick={}, hash={:#018x}", a.tick, a.hash);
            println!("Run 2: tick={}, hash={:#018x}", b.tick, b.hash);
            if a != b {
                bail!("simulation diverged between identical runs");
            }
            println!("Match: OK");
        }
    }

    Ok(())
}

fn print_info(path: &Path, map: &LoadedMap, tuning: &TuningFile) {
    println!("towerdef-cli v{}", env!("CARGO_PKG_VERSION"));
    println!("map: {} ({}x{} tiles)", path.display(), map.width, map.height);
    for layer in &map.layers {
        println!("  layer {:<8} {} tiles", layer.name, layer.occupied());
    }
    let layout = &map.tileset_layout;
    println!(
        "tileset: {} ({} tiles of {}x{}, {} columns)",
        map.tileset_image.display(),
        layout.tile_count,
        layout.tile_width,
        layout.tile_height,
        layout.columns
    );

    let enemy_path = &map.map_data.path;
    println!(
        "path: {} ({} waypoints)",
        enemy_path.name,
        enemy_path.waypoints.len()
    );
    for (i, w) in enemy_path.waypoints.iter().enumerate() {
        println!("  [{i}] ({:.2}, {:.2})", w.x, w.y);
    }

    println!("enemy types:");
    for (i, ty) in map.map_data.enemy_types.iter().enumerate() {
        println!(
            "  [{i}] {:<10} health={:.1} speed={:.2} units_per_spawn={} tile={}",
            ty.name, ty.max_health, ty.speed, ty.units_per_spawn, ty.tile.0
        );
    }

    println!("flock: {:?}", tuning.flock);
    println!("sim: {:?}", tuning.sim);
}

fn resolve_enemy_type(map: &LoadedMap, name_or_index: &str) -> Result<EnemyTypeId> {
    let types = &map.map_data.enemy_types;
    if let Ok(index) = name_or_index.parse::<u32>() {
        if (index as usize) < types.len() {
            return Ok(EnemyTypeId(index));
        }
        bail!("enemy type index {index} out of range (map has {})", types.len());
    }
    types
        .iter()
        .position(|t| t.name.eq_ignore_ascii_case(name_or_index))
        .map(|i| EnemyTypeId(i as u32))
        .with_context(|| format!("no enemy type named `{name_or_index}`"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Outcome {
    tick: u64,
    enemies: usize,
    finished: usize,
    hash: u64,
}

fn run_scenario(
    map: &LoadedMap,
    tuning: &TuningFile,
    run: &RunArgs,
    despawn_finished: bool,
    report: bool,
) -> Result<Outcome> {
    if run.fps <= 0.0 || !run.fps.is_finite() {
        bail!("--fps must be positive, got {}", run.fps);
    }

    let mut config = tuning.sim;
    if let Some(seed) = run.seed {
        config.seed = seed;
    }
    let mut sim = Simulation::new(map.map_data.clone(), tuning.flock, config)
        .context("creating simulation")?;
    let type_id = resolve_enemy_type(map, &run.enemy_type)?;
    sim.queue_command(SimCommand::Spawn {
        type_id,
        count: run.count,
    })?;

    let mut ctx = HeadlessRenderContext::new();
    let texture = ctx.load_texture(&map.tileset_image)?;
    let tileset = TileSet::new(&map.tileset_layout, texture);
    let camera = OrthoCamera::new(1280, 720);
    let mut queue = RenderQueue::new();

    let dt = 1.0 / run.fps;
    let frames = (run.seconds * run.fps).round().max(0.0) as u64;
    let frames_per_report = run.fps.round().max(1.0) as u64;
    let mut skipped = 0u32;

    for frame in 1..=frames {
        let frame_report = sim.advance(dt);
        skipped += frame_report.skipped_steps;

        queue.reset();
        queue.clear_color = CLEAR_COLOR;
        for layer in &map.layers {
            layer.queue_sprites(&mut queue, &tileset);
        }
        queue_enemies(
            &mut queue,
            sim.interpolated(),
            &map.map_data.enemy_types,
            &tileset,
        );
        ctx.clear(queue.clear_color);
        let stats = ctx.submit(&mut queue, &camera, true);
        ctx.present();

        if frame % frames_per_report == 0 {
            let finished = count_finished(&sim);
            if report {
                println!(
                    "t={:>5.1}s tick={:>5} enemies={:>4} finished={:>4} sprites={} draw_calls={} hash={:#018x}",
                    frame as f32 * dt,
                    sim.tick(),
                    sim.enemy_count(),
                    finished,
                    stats.sprite_count,
                    stats.draw_call_count,
                    sim.state_hash()
                );
            }
            if despawn_finished && finished > 0 {
                sim.queue_command(SimCommand::DespawnFinished)?;
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "fixed steps were dropped by the step cap");
    }
    tracing::debug!("\n{}", ctx.describe());

    Ok(Outcome {
        tick: sim.tick(),
        enemies: sim.enemy_count(),
        finished: count_finished(&sim),
        hash: sim.state_hash(),
    })
}

fn count_finished(sim: &Simulation) -> usize {
    let path = &sim.map().path;
    sim.latest()
        .enemies
        .iter()
        .filter(|e| e.reached_end(path))
        .count()
}
