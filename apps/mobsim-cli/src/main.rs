use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mobsim_common::GCoord;
use mobsim_ecs::{EntityKind, EntityWorld, Settings};
use mobsim_kernel::{Environment, TickReport};
use mobsim_persist::WorldStore;
use mobsim_stream::{GridIndex, GridPathfinder, VoxelTerrain};
use mobsim_tools::Inspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mobsim-cli", about = "Run, save and inspect entity simulations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the default settings as YAML
    Info,
    /// Populate a fresh world and simulate it
    Run {
        #[command(flatten)]
        sim: SimArgs,
        /// Number of creatures to spawn
        #[arg(short, long, default_value = "50")]
        creatures: usize,
        /// Number of dropped items to spawn
        #[arg(short, long, default_value = "20")]
        items: usize,
        /// Number of vehicles to spawn
        #[arg(long, default_value = "0")]
        vehicles: usize,
        /// World seed; overrides the config file
        #[arg(short, long)]
        seed: Option<u64>,
        /// Write a snapshot and the event log to this store directory
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Load the latest snapshot from a store, optionally simulate further and save again
    Load {
        /// Store directory
        dir: PathBuf,
        #[command(flatten)]
        sim: SimArgs,
    },
    /// List every entity of the latest snapshot in a store
    Inspect {
        /// Store directory
        dir: PathBuf,
        /// Settings file (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SimArgs {
    /// Number of ticks to simulate
    #[arg(short, long, default_value = "100")]
    ticks: u64,
    /// Settings file (YAML); defaults cover every kind
    #[arg(long)]
    config: Option<PathBuf>,
    /// Height of the liquid surface, if any
    #[arg(long)]
    liquid: Option<i32>,
    /// Print a summary every N ticks (0 disables)
    #[arg(long, default_value = "0")]
    report_every: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Info => {
            println!("mobsim-cli v{}", env!("CARGO_PKG_VERSION"));
            for kind in EntityKind::ALL {
                println!("kind {kind}: tag {}", kind.type_tag());
            }
            print!("{}", Settings::default().to_yaml_string()?);
        }
        Commands::Run {
            sim,
            creatures,
            items,
            vehicles,
            seed,
            save,
        } => {
            let mut settings = load_settings(sim.config.as_deref())?;
            if let Some(seed) = seed {
                settings.sim.seed = seed;
            }
            let mut world = EntityWorld::new(settings.sim.clone(), environment(sim.liquid)?);
            populate(&mut world, &settings, creatures, items, vehicles)?;
            println!("{}", Inspector::summary(&world));

            let totals = simulate(&mut world, sim.ticks, sim.report_every);
            println!("{}", Inspector::summary(&world));
            print_totals(&totals);

            if let Some(dir) = save {
                save_world(&dir, &mut world)?;
            }
        }
        Commands::Load { dir, sim } => {
            let settings = load_settings(sim.config.as_deref())?;
            let mut store = open_store(&dir)?;
            let mut world = store
                .load_latest(&settings, environment(sim.liquid)?)
                .with_context(|| format!("loading {}", dir.display()))?;
            println!("Loaded: {}", Inspector::summary(&world));

            if sim.ticks > 0 {
                let totals = simulate(&mut world, sim.ticks, sim.report_every);
                println!("{}", Inspector::summary(&world));
                print_totals(&totals);
                store.take_snapshot(&world)?;
                store.append_events(&world.drain_events())?;
                println!("Saved snapshot {} to {}", store.meta().snapshot_count, dir.display());
            }
        }
        Commands::Inspect { dir, config } => {
            let settings = load_settings(config.as_deref())?;
            let store = open_store(&dir)?;
            let world = store.load_latest(&settings, environment(None)?)?;
            println!("{}", Inspector::summary(&world));
            for (handle, _) in Inspector::list_entities(&world) {
                if let Some(info) = Inspector::inspect(&world, handle) {
                    println!("  {info}");
                }
            }
            let events = store.events()?;
            println!("Stored events: {}", events.len());
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path).with_context(|| format!("reading {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn environment(liquid: Option<i32>) -> anyhow::Result<Environment> {
    let terrain = match liquid {
        Some(level) => VoxelTerrain::flat(0).with_liquid(level),
        None => VoxelTerrain::flat(0),
    };
    Ok(Environment {
        terrain: Arc::new(terrain),
        spatial: Box::new(GridIndex::new(4.0)?),
        pathfinder: Arc::new(GridPathfinder),
    })
}

/// Lay the population out on a square grid two cells apart, creatures first.
fn populate(
    world: &mut EntityWorld,
    settings: &Settings,
    creatures: usize,
    items: usize,
    vehicles: usize,
) -> anyhow::Result<()> {
    let total = creatures + items + vehicles;
    let side = (total as f64).sqrt().ceil().max(1.0) as usize;
    let kinds = std::iter::repeat_n(EntityKind::Creature, creatures)
        .chain(std::iter::repeat_n(EntityKind::Item, items))
        .chain(std::iter::repeat_n(EntityKind::Vehicle, vehicles));
    for (i, kind) in kinds.enumerate() {
        let coord = GCoord::new((i % side) as i32 * 2, 0, (i / side) as i32 * 2);
        mobsim_persist::initialize(world, settings, kind, coord)
            .with_context(|| format!("spawning {kind} at {coord}"))?;
    }
    tracing::info!(creatures, items, vehicles, "world populated");
    Ok(())
}

fn simulate(world: &mut EntityWorld, ticks: u64, report_every: u64) -> TickReport {
    let mut totals = TickReport::default();
    for _ in 0..ticks {
        let report = world.step();
        totals.tick = report.tick;
        totals.updated += report.updated;
        totals.commands_applied += report.commands_applied;
        totals.expired += report.expired;
        totals.faulted += report.faulted;
        totals.reaped += report.reaped;
        if report_every > 0 && report.tick % report_every == 0 {
            println!("{}", Inspector::summary(world));
        }
    }
    totals
}

fn print_totals(totals: &TickReport) {
    println!(
        "Totals: updates={} commands={} expired={} faulted={} reaped={}",
        totals.updated, totals.commands_applied, totals.expired, totals.faulted, totals.reaped
    );
}

fn open_store(dir: &Path) -> anyhow::Result<WorldStore> {
    let store = WorldStore::open(dir).with_context(|| format!("opening store {}", dir.display()))?;
    store.verify_integrity()?;
    Ok(store)
}

fn save_world(dir: &Path, world: &mut EntityWorld) -> anyhow::Result<()> {
    let mut store = open_store(dir)?;
    let index = store.take_snapshot(world)?;
    store.append_events(&world.drain_events())?;
    println!("Saved snapshot {index} to {}", dir.display());
    Ok(())
}
