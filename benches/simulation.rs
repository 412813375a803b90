//! Simulation throughput benchmarks.
//!
//! The tick loop and the state hash are the per-frame costs every peer
//! pays; snapshot save/restore is the rollback cost.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use lockstep::core::vec3::FpVec3;
use lockstep::sim::entity::UNIT_TYPE_ID;
use lockstep::{Command, Simulation};

fn build_sim(units: usize) -> Simulation {
    let mut sim = Simulation::new(50);
    sim.initialize(12345);
    for owner in 0..units {
        sim.spawn_entity(UNIT_TYPE_ID, owner as i32).unwrap();
    }
    sim
}

fn random_commands(players: usize, tick: i32, rng: &mut impl Rng) -> Vec<Command> {
    (0..players as i32)
        .map(|p| {
            let target = FpVec3::from_ints(
                rng.gen_range(-100..100),
                0,
                rng.gen_range(-100..100),
            );
            Command::move_to(p, tick, target)
        })
        .collect()
}

fn bench_tick(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    for units in [4usize, 64, 512] {
        let mut sim = build_sim(units);
        let commands = random_commands(units, 0, &mut rng);
        c.bench_function(&format!("tick/{units}_units"), |b| {
            b.iter(|| {
                sim.tick(black_box(&commands));
            })
        });
    }
}

fn bench_state_hash(c: &mut Criterion) {
    for units in [4usize, 64, 512] {
        let sim = build_sim(units);
        c.bench_function(&format!("state_hash/{units}_units"), |b| {
            b.iter(|| black_box(sim.state_hash()))
        });
    }
}

fn bench_snapshot_roundtrip(c: &mut Criterion) {
    let mut sim = build_sim(64);
    let mut rng = rand::rngs::StdRng::seed_from_u64(9);
    let commands = random_commands(64, 0, &mut rng);
    sim.tick(&commands);
    sim.save_snapshot();
    for _ in 0..4 {
        sim.tick(&commands);
    }

    c.bench_function("snapshot/save", |b| {
        b.iter(|| sim.save_snapshot())
    });
    c.bench_function("snapshot/rollback_and_restore", |b| {
        b.iter(|| {
            sim.save_snapshot();
            sim.tick(&commands);
            sim.rollback(sim.current_tick() - 1).unwrap();
        })
    });
}

criterion_group!(benches, bench_tick, bench_state_hash, bench_snapshot_roundtrip);
criterion_main!(benches);
