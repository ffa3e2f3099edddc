//! Headless AI simulation
//!
//! Runs autonomous players on a generated meadow map and prints a summary
//! of what each of them built and ordered.

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use colony_ai::core::types::{BuildingType, PlayerId};
use colony_ai::map::point::MapPoint;
use colony_ai::world::sim::SimWorld;
use colony_ai::{AiConfig, AiLevel, AiPlayer, GameWorld};

/// Headless AI simulation - autonomous players on a generated map
#[derive(Parser, Debug)]
#[command(name = "ai_sim")]
#[command(about = "Run autonomous players on a generated map and report their progress")]
struct Args {
    /// Config file (e.g. data/ai_config.toml); defaults are used otherwise
    #[arg(long)]
    config: Option<String>,

    /// Difficulty level, overrides the config file
    #[arg(long)]
    level: Option<AiLevel>,

    /// Number of players, 1 to 4
    #[arg(long, default_value_t = 2)]
    players: u8,

    /// Game frames to simulate
    #[arg(long, default_value_t = 5000)]
    frames: u32,

    /// Building sites are finished every this many frames
    #[arg(long, default_value_t = 50)]
    build_every: u32,

    /// Map width in nodes
    #[arg(long, default_value_t = 64)]
    width: u16,

    /// Map height in nodes
    #[arg(long, default_value_t = 64)]
    height: u16,

    /// Random seed for map generation and agents
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

/// Per-player outcome
#[derive(Serialize)]
struct PlayerReport {
    player: u8,
    defeated: bool,
    buildings: usize,
    military: usize,
    warehouses: usize,
    sites: usize,
    flags: usize,
    commands: usize,
    orders: usize,
}

#[derive(Serialize)]
struct SimReport {
    level: String,
    frames: u32,
    seed: u64,
    players: Vec<PlayerReport>,
}

/// Headquarters positions, one per quadrant
fn start_positions(width: u16, height: u16) -> [MapPoint; 4] {
    let (qx, qy) = (width / 4, height / 4);
    [
        MapPoint::new(qx, qy),
        MapPoint::new(width - qx, height - qy),
        MapPoint::new(width - qx, qy),
        MapPoint::new(qx, height - qy),
    ]
}

fn generate_world(args: &Args, rng: &mut ChaCha8Rng) -> SimWorld {
    let mut world = SimWorld::new(args.width, args.height);
    let starts = start_positions(args.width, args.height);
    for id in 0..args.players {
        let hq = starts[id as usize];
        world.claim(PlayerId(id), hq, 9);
        world.add_building(PlayerId(id), hq, BuildingType::Headquarters);
    }
    // Scatter trees and granite away from the headquarters
    for y in 0..args.height {
        for x in 0..args.width {
            let pt = MapPoint::new(x, y);
            if starts.iter().any(|&hq| world.map_size().distance(pt, hq) < 4) {
                continue;
            }
            let roll: f64 = rng.gen();
            if roll < 0.08 {
                world.place_tree(pt);
            } else if roll < 0.10 {
                world.place_granite(pt);
            }
        }
    }
    world
}

fn report(world: &SimWorld, agents: &[AiPlayer]) -> Vec<PlayerReport> {
    agents
        .iter()
        .map(|ai| {
            let player = ai.player();
            PlayerReport {
                player: player.0,
                defeated: ai.is_defeated(),
                buildings: world.buildings(player).len(),
                military: world.military_buildings(player).len(),
                warehouses: world.warehouses(player).len(),
                sites: world.building_sites(player).len(),
                flags: world.flags(player).len(),
                commands: world.commands_of(player).len(),
                orders: ai.construction().orders().len(),
            }
        })
        .collect()
}

fn main() -> colony_ai::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("colony_ai=info")),
        )
        .init();

    let mut args = Args::parse();
    args.players = args.players.clamp(1, 4);
    let players = args.players;
    let mut config = match &args.config {
        Some(path) => AiConfig::load(path)?,
        None => AiConfig::default(),
    };
    if let Some(level) = args.level {
        config.level = level;
    }
    let seed = args.seed.unwrap_or(config.seed);
    config.seed = seed;

    tracing::info!(
        level = %config.level,
        players,
        frames = args.frames,
        seed,
        "starting simulation"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = generate_world(&args, &mut rng);
    let mut agents = (0..players)
        .map(|id| AiPlayer::new(&world, &config, PlayerId(id)))
        .collect::<colony_ai::Result<Vec<_>>>()?;

    for gf in 0..args.frames {
        let is_nwf = gf % 20 == 0;
        for ai in agents.iter_mut() {
            ai.run_gf(&mut world, gf, is_nwf);
        }
        if args.build_every > 0 && gf % args.build_every == 0 {
            for id in 0..players {
                for site in world.building_sites(PlayerId(id)) {
                    world.complete_site(site.pos);
                }
            }
        }
    }

    let summary = SimReport {
        level: config.level.to_string(),
        frames: args.frames,
        seed,
        players: report(&world, &agents),
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} frames at level {} (seed {})", summary.frames, summary.level, summary.seed);
        for p in &summary.players {
            println!(
                "player {}: {} buildings, {} military, {} warehouses, {} sites, {} flags, \
                 {} commands{}",
                p.player,
                p.buildings,
                p.military,
                p.warehouses,
                p.sites,
                p.flags,
                p.commands,
                if p.defeated { " (defeated)" } else { "" },
            );
        }
    }
    Ok(())
}
