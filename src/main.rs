//! Lane Dash Game Server
//!
//! Authoritative server for Lane Dash.
//! Serves the WebSocket game protocol and the HTTP balance/history routes.

use std::env;
use std::sync::Arc;
use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lane_dash::{
    Amount, Difficulty, TICK_RATE, VERSION,
    game::{
        events::GameEventData,
        state::RunState,
        tick::{tick, RunConfig},
    },
    ledger::{LedgerConfig, SessionLedger},
    network::{http, GameServer, ServerConfig, SessionManager},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Lane Dash Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let server_config = ServerConfig::from_env();
    let ledger_config = LedgerConfig::from_env();
    let run_config = RunConfig::from_env();

    if env::var("LANE_DASH_DEMO").map(|v| v == "1").unwrap_or(false) {
        demo_run(&run_config);
    }

    let ledger = Arc::new(SessionLedger::new(ledger_config));
    let sessions = Arc::new(SessionManager::new(ledger.clone(), run_config));
    let server = Arc::new(GameServer::new(server_config.clone(), sessions));

    let http_handle = tokio::spawn(http::serve(
        server_config.http_addr,
        ledger,
        server.subscribe_shutdown(),
    ));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            signal_server.shutdown();
        }
    });

    server.run().await.context("game server failed")?;

    match http_handle.await {
        Ok(result) => result.context("http server failed")?,
        Err(e) => warn!("http task ended abnormally: {}", e),
    }

    info!("Server stopped");
    Ok(())
}

/// Play one seeded run to the end, crossing a lane whenever the token is
/// idle, then replay it to confirm the outcome is reproducible.
fn demo_run(config: &RunConfig) {
    info!("=== Starting Demo Run ===");

    let seed = 12345u64;
    let bet = Amount::from_units(2);
    let (state, events) = play(seed, Difficulty::Medium, bet, config);

    for event in &events {
        match &event.data {
            GameEventData::CheckpointCollected { lane_index, multiplier, payout } => {
                info!("Tick {}: lane {} reached, {}x, payout {}", event.tick, lane_index, multiplier, payout);
            }
            GameEventData::TrapArmed { lane_index, pattern, vehicles } => {
                info!("Tick {}: {:?} formation armed on lane {} ({} vehicles)",
                      event.tick, pattern, lane_index, vehicles.len());
            }
            GameEventData::Crashed { lane_index, cause } => {
                info!("Tick {}: crashed on lane {} ({:?})", event.tick, lane_index, cause);
            }
            GameEventData::Won { multiplier, payout } => {
                info!("Tick {}: won at {}x, payout {}", event.tick, multiplier, payout);
            }
            _ => {}
        }
    }

    info!("=== Run Result ===");
    info!("Outcome: {:?} after {} ticks", state.outcome(), state.tick);
    info!("Final lane: {}, payout {}", state.player.current_lane_index, state.payout);
    info!("Crash lanes: {:?}", state.traps.keys().collect::<Vec<_>>());

    info!("=== Verifying Determinism ===");
    let (replay, replay_events) = play(seed, Difficulty::Medium, bet, config);
    if replay.tick == state.tick && replay.outcome() == state.outcome() && replay_events == events {
        info!("DETERMINISM VERIFIED: runs match");
    } else {
        warn!("DETERMINISM FAILURE: runs differ");
    }
}

fn play(
    seed: u64,
    difficulty: Difficulty,
    bet: Amount,
    config: &RunConfig,
) -> (RunState, Vec<lane_dash::game::events::GameEvent>) {
    let mut state = RunState::new(seed, difficulty, config);
    let mut events = Vec::new();

    if let Err(e) = state.start_game(bet, Amount::from_units(1000), config) {
        warn!("Demo run rejected: {}", e);
        return (state, events);
    }
    events.extend(state.take_events());

    // Ten minutes of simulated time is far beyond any full crossing.
    for _ in 0..TICK_RATE * 600 {
        if state.is_in_progress() && !state.player.is_transitioning {
            let next = state.player.current_lane_index + 1;
            let _ = state.select_next_lane(next);
        }

        let result = tick(&mut state, config);
        events.extend(result.events);
        if result.settled.is_some() {
            break;
        }
    }

    (state, events)
}
