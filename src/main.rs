use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use glam::Vec2;
use tilecraft::config::Settings;
use tilecraft::content::base_registries;
use tilecraft::entity::Player;
use tilecraft::world::{ChunkPersistence, MapType, World, WorldOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MapArg {
    Default,
    Lab,
}

impl From<MapArg> for MapType {
    fn from(arg: MapArg) -> Self {
        match arg {
            MapArg::Default => MapType::Default,
            MapArg::Lab => MapType::Lab,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Save directory
    #[arg(long, default_value = "worlds/default")]
    save: PathBuf,

    /// Seed for a new world (random when omitted)
    #[arg(long)]
    seed: Option<i32>,

    /// Terrain of a new world
    #[arg(long, value_enum, default_value_t = MapArg::Default)]
    map_type: MapArg,

    /// Delete existing world and generate fresh
    #[arg(long)]
    regenerate: bool,

    /// Subticks to simulate (60 per second)
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Chunks to load around the player
    #[arg(long, default_value_t = 2)]
    radius: i32,

    /// Settings file (RON)
    #[arg(long, default_value = "settings.ron")]
    settings: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();
    let settings = Settings::load(&args.settings);

    // Handle --regenerate flag
    if args.regenerate {
        log::info!("--regenerate flag detected, deleting existing world");
        ChunkPersistence::delete_save(&args.save)?;
    }

    let registries = Arc::new(base_registries().context("Failed to register base content")?);

    let existing = ChunkPersistence::new(&args.save)?.load_world_info()?.is_some();
    let mut world = if existing {
        World::open(registries, settings, &args.save)
            .with_context(|| format!("Failed to open world in {:?}", args.save))?
    } else {
        let options = WorldOptions {
            seed: args.seed.unwrap_or_else(rand::random),
            map_type: args.map_type.into(),
            default_gamemode: 0,
        };
        World::create(registries, settings, &args.save, options)
            .with_context(|| format!("Failed to create world in {:?}", args.save))?
    };

    if world.player().is_none() {
        world.spawn_player(Player::new(Vec2::new(8.0, 8.0)));
    }
    let center = world
        .player()
        .map(|player| World::chunk_coord_of(player.position))
        .unwrap_or_default();

    let loaded = world.load_chunks_around(center, args.radius)?;
    log::info!("Loaded {} chunks around ({}, {})", loaded, center.x, center.y);

    for _ in 0..args.ticks {
        world.tick()?;
    }
    world.save().context("Failed to save world")?;

    let clock = world.clock();
    log::info!(
        "Day {} {} (daylight {:.2}), {} chunks, {} entities, seed {}",
        clock.day(),
        clock.clock_text(),
        world.day_factor(),
        world.chunk_count(),
        world.entity_count(),
        world.seed()
    );
    Ok(())
}
