//! Performance benchmarks for the per-tick hot paths

use server::resolver::resolve_batch;
use server::sessions::SessionRegistry;
use server::stash::ActionStash;
use server::visibility::Visibility;
use server::world::{Position, Skeleton, World};
use shared::{ActionKind, CycleId, Direction, PlayerAction, PlayerId, ServerMessage, SkeletonInfo};
use std::time::Instant;

/// Benchmarks fog-of-war window computation
#[test]
fn benchmark_visibility() {
    let world = World::arena();
    let visibility = Visibility::default();
    let viewers = [Position::new(4, 4), Position::new(8, 8), Position::new(14, 3)];

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let _ = visibility.view(&world, viewers[i % viewers.len()]);
    }

    let duration = start.elapsed();
    println!(
        "Visibility: {} views in {:?} ({:.2} μs/view)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks resolving full batches against a crowded arena
#[test]
fn benchmark_resolution() {
    let mut world = World::arena();
    let sessions = SessionRegistry::new(64);
    let cycle = CycleId::mint();
    let kinds = [ActionKind::Move, ActionKind::Defense, ActionKind::Attack];

    let rows = [3, 8, 9];
    let players: Vec<PlayerId> = (0..32)
        .map(|i: i32| {
            let player = PlayerId::from(format!("bench-{}", i).as_str());
            let skeleton =
                Skeleton::from_info(player.clone(), SkeletonInfo::new("bench", 1_000_000, 1));
            let at = Position::new(1 + (i % 15), rows[(i / 15) as usize]);
            let id = world.spawn_skeleton(skeleton, at).unwrap();
            sessions.bind_actor(&player, id);
            player
        })
        .collect();

    let batch: Vec<PlayerAction> = players
        .iter()
        .enumerate()
        .map(|(i, player)| {
            PlayerAction::new(
                player.clone(),
                cycle.clone(),
                kinds[i % kinds.len()],
                Direction::ALL[i % 4],
            )
        })
        .collect();

    let iterations = 5_000;
    let start = Instant::now();

    for _ in 0..iterations {
        resolve_batch(&mut world, &sessions, &batch);
    }

    let duration = start.elapsed();
    println!(
        "Resolution: {} batches of {} in {:?} ({:.2} μs/batch)",
        iterations,
        batch.len(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(world.skeleton_count(), 32);
    assert!(duration.as_secs() < 5);
}

/// Benchmarks stash submission and rotation
#[test]
fn benchmark_stash() {
    let stash = ActionStash::new();
    let mut cycle = CycleId::mint();
    stash.open_cycle(cycle.clone());

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let action = PlayerAction::new(
            PlayerId::from("bench"),
            cycle.clone(),
            ActionKind::Defense,
            Direction::Right,
        );
        stash.submit_action(action);
        if i % 100 == 99 {
            cycle = CycleId::mint();
            assert_eq!(stash.rotate(cycle.clone()).len(), 100);
        }
    }

    let duration = start.elapsed();
    println!(
        "Stash: {} submissions in {:?} ({:.2} ns/submission)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_secs() < 5);
}

/// Benchmarks encoding the full map message sent every tick
#[test]
fn benchmark_map_encoding() {
    let world = World::arena();

    let iterations = 2_000;
    let start = Instant::now();
    let mut bytes = 0;

    for _ in 0..iterations {
        let message = ServerMessage::Map {
            map: world.snapshot(),
        };
        bytes += message.encode().unwrap().len();
    }

    let duration = start.elapsed();
    println!(
        "Map encoding: {} messages ({} bytes) in {:?}",
        iterations, bytes, duration
    );

    assert!(bytes > 0);
    assert!(duration.as_secs() < 5);
}
