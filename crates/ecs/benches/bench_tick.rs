use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use mobsim_common::{EntityId, GCoord};
use mobsim_ecs::{EntityKind, EntityWorld, Payload, Settings, entity_rng};
use mobsim_kernel::{Environment, SimConfig};
use mobsim_stream::{GridIndex, GridPathfinder, VoxelTerrain};

fn make_world(creatures: usize, items: usize, parallel: bool) -> EntityWorld {
    let settings = Settings::default();
    let config = SimConfig {
        parallel,
        arena_capacity: creatures + items + 16,
        ..SimConfig::default()
    };
    let mut world = EntityWorld::new(
        config,
        Environment {
            terrain: Arc::new(VoxelTerrain::flat(0)),
            spatial: Box::new(GridIndex::new(8.0).expect("valid cell size")),
            pathfinder: Arc::new(GridPathfinder),
        },
    );
    let side = ((creatures + items) as f32).sqrt().ceil() as i32;
    let kinds = std::iter::repeat_n(EntityKind::Creature, creatures)
        .chain(std::iter::repeat_n(EntityKind::Item, items));
    for (i, kind) in kinds.enumerate() {
        let coord = GCoord::new(i as i32 % side * 2, 0, i as i32 / side * 2);
        let uid = EntityId::new();
        let payload = Payload::fresh(kind, &settings, coord, entity_rng(world.seed(), uid))
            .expect("default settings cover every kind");
        world
            .spawn(uid, kind.type_tag(), kind.bind(), payload)
            .expect("arena sized for the population");
    }
    world
}

fn bench_step(creatures: usize, items: usize, parallel: bool, iterations: usize) {
    let mut world = make_world(creatures, items, parallel);
    let mode = if parallel { "parallel" } else { "serial" };

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(world.step());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  step {mode} ({creatures} creatures, {items} items, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn main() {
    println!("=== Tick Benchmarks ===\n");

    println!("Creatures only:");
    bench_step(100, 0, false, 1000);
    bench_step(100, 0, true, 1000);
    bench_step(2000, 0, false, 100);
    bench_step(2000, 0, true, 100);

    println!("\nMixed population:");
    bench_step(1000, 1000, false, 100);
    bench_step(1000, 1000, true, 100);

    println!("\n=== Done ===");
}
