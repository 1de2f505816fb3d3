//! Performance guards for the hot paths: brute-force collision sweeps,
//! snapshot serialization and command parsing.

use server::config::ServerSettings;
use server::game::{IdSource, World};
use shared::math::Vec2;
use shared::protocol::CommandSet;
use std::sync::Arc;
use std::time::Instant;

fn crowded_world(ships: u32, projectiles: u32) -> World {
    let mut world = World::new(ServerSettings::default(), Arc::new(IdSource::new()));
    for i in 0..ships {
        let id = world.entity_ids.next();
        world.add_ship(id, format!("pilot{}", i));
        // spread the fleet on a grid clear of the star
        let ship = world.ships.get_mut(&id).unwrap();
        ship.loc = Vec2::new(
            -300.0 + (i % 10) as f64 * 60.0,
            100.0 + (i / 10) as f64 * 60.0,
        );
        ship.velocity = Vec2::ZERO;
    }
    for i in 0..projectiles {
        world.fire(
            9999,
            Vec2::new(-350.0 + (i % 100) as f64 * 7.0, -300.0),
            Vec2::new(0.0, 1.0),
        );
    }
    world
}

/// Benchmarks full ticks over a crowded world; the brute-force collision
/// sweep dominates
#[test]
fn benchmark_world_update() {
    let mut world = crowded_world(40, 500);

    let iterations = 50;
    let start = Instant::now();
    for _ in 0..iterations {
        world.update(&[]);
    }
    let duration = start.elapsed();
    println!(
        "World update: {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Well under the 20ms tick budget even with headroom to spare
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot serialization throughput
#[test]
fn benchmark_snapshot_serialization() {
    let mut world = crowded_world(50, 500);

    let iterations = 200;
    let start = Instant::now();
    let mut bytes = 0usize;
    for _ in 0..iterations {
        bytes += world.serialize().len();
    }
    let duration = start.elapsed();
    println!(
        "Serialization: {} frames ({} bytes total) in {:?}",
        iterations, bytes, duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks command batch parsing
#[test]
fn benchmark_command_parsing() {
    let batch = "FRLT".repeat(16);

    let iterations = 100_000;
    let start = Instant::now();
    for _ in 0..iterations {
        let set = CommandSet::from_letters(&batch);
        assert!(set.fire);
    }
    let duration = start.elapsed();
    println!(
        "Command parsing: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 500);
}

/// Benchmarks the vector rotations behind every turn command
#[test]
fn benchmark_vector_rotation() {
    let mut dir = Vec2::new(0.0, -1.0);

    let iterations = 100_000;
    let start = Instant::now();
    for _ in 0..iterations {
        dir = dir.rotated_deg(3.0);
    }
    let duration = start.elapsed();
    println!(
        "Vector rotation: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(dir.length() > 0.99 && dir.length() < 1.01);
    assert!(duration.as_millis() < 500);
}
