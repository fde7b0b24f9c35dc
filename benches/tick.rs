//! Criterion benchmarks for the run simulation tick.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lane_dash::game::state::RunState;
use lane_dash::game::tick::{tick, RunConfig};
use lane_dash::{Amount, Difficulty};

/// Run already on the road with live traffic.
fn running_state(config: &RunConfig, difficulty: Difficulty) -> RunState {
    let mut state = RunState::new(42, difficulty, config);
    state
        .start_game_with_traps(Amount::from_units(2), Amount::from_units(1000), [])
        .unwrap();
    // Let traffic fill the highways.
    for _ in 0..600 {
        tick(&mut state, config);
    }
    state
}

fn bench_tick_with_traffic(c: &mut Criterion) {
    let config = RunConfig::default();
    let state = running_state(&config, Difficulty::Hard);

    c.bench_function("tick_hard_traffic", |b| {
        b.iter_batched(
            || state.clone(),
            |mut s| {
                for _ in 0..60 {
                    black_box(tick(&mut s, &config));
                }
                s
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_full_crossing(c: &mut Criterion) {
    let config = RunConfig::quiet();

    c.bench_function("full_crossing_quiet", |b| {
        b.iter(|| {
            let mut state = RunState::new(7, Difficulty::Easy, &config);
            state
                .start_game_with_traps(Amount::from_units(2), Amount::from_units(1000), [])
                .unwrap();
            while state.is_in_progress() {
                if !state.player.is_transitioning {
                    let next = state.player.current_lane_index + 1;
                    let _ = state.select_next_lane(next);
                }
                tick(&mut state, &config);
            }
            black_box(state.payout)
        });
    });
}

criterion_group!(benches, bench_tick_with_traffic, bench_full_crossing);
criterion_main!(benches);
