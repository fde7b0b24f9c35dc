//! Authoritative Simulation Tick
//!
//! One step of a run at 60 Hz. Everything the player sees (traffic,
//! formations, arrival, crashes) is decided here, never by the client.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, fixed_abs, fixed_approach, ARRIVAL_EPSILON, LANE_WIDTH, PLAYER_MOVE_SPEED};
use crate::game::collision::{first_collision, player_bounds};
use crate::game::events::{CrashCause, GameEvent, GameEventData};
use crate::game::lane::{LaneTopology, STANDARD_HIGHWAY_COUNT};
use crate::game::multiplier::MultiplierConfig;
use crate::game::state::{Outcome, RunState};
use crate::game::traffic::{formation_kind, TrafficConfig};
use crate::game::trap::{build_formation, TrapConfig};
use crate::TICK_RATE;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Outcome if the run settled this tick
    pub settled: Option<Outcome>,
    /// Vehicle spawned by regular traffic this tick
    pub spawned: Option<u32>,
}

/// Configuration for run simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Highway lanes between curb and safe lane
    pub highway_count: usize,
    pub lane_width: Fixed,
    pub traffic: TrafficConfig,
    pub traps: TrapConfig,
    pub multipliers: MultiplierConfig,
    /// Ticks after settlement before the run may reset (6 s)
    pub cooldown_ticks: u64,
    /// Token speed while changing lanes
    pub move_speed: Fixed,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            highway_count: STANDARD_HIGHWAY_COUNT,
            lane_width: LANE_WIDTH,
            traffic: TrafficConfig::default(),
            traps: TrapConfig::default(),
            multipliers: MultiplierConfig::default(),
            cooldown_ticks: 6 * TICK_RATE as u64,
            move_speed: PLAYER_MOVE_SPEED,
        }
    }
}

impl RunConfig {
    /// Stock config with multiplier curves read from the environment.
    pub fn from_env() -> Self {
        Self {
            multipliers: MultiplierConfig::from_env(),
            ..Self::default()
        }
    }

    /// No regular traffic and no formations. Crash lanes still apply.
    pub fn quiet() -> Self {
        Self {
            traffic: TrafficConfig::without_traffic(),
            traps: TrapConfig {
                formations_enabled: false,
                ..TrapConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn topology(&self) -> LaneTopology {
        LaneTopology::new(self.highway_count, self.lane_width)
    }
}

/// Simulation time at a tick.
#[inline]
pub fn tick_to_ms(tick: u64) -> u64 {
    tick * 1000 / TICK_RATE as u64
}

/// Run one simulation tick.
///
/// Order:
/// 1. Advance the tick counter
/// 2. Traffic: advance, despawn, spawn attempt
/// 3. Trap formations for lanes being approached
/// 4. Token movement and lane arrival
/// 5. Token-versus-vehicle collision
///
/// Outside `InProgress` only steps 1 and 2 run, so traffic keeps flowing
/// during betting and cooldown.
pub fn tick(state: &mut RunState, config: &RunConfig) -> TickResult {
    let mut result = TickResult::default();

    // 1. Advance tick counter
    state.tick += 1;

    // 2. Traffic
    let now_ms = tick_to_ms(state.tick);
    result.spawned = state.traffic.tick(
        now_ms,
        &mut state.rng,
        &state.topology,
        state.difficulty,
        &config.traffic,
    );

    if state.is_in_progress() {
        // 3. Trap formations
        process_traps(state, config);

        // 4. Movement and arrival
        process_movement(state, config);

        // 5. Collision
        if state.is_in_progress() {
            process_collisions(state);
        }

        if state.is_settled() {
            result.settled = Some(state.outcome());
        }
    }

    result.events = state.take_events();
    result
}

/// Materialize formations for traps two lanes ahead of a moving player.
fn process_traps(state: &mut RunState, config: &RunConfig) {
    if !state.player.is_transitioning {
        return;
    }

    let current = state.player.current_lane_index;
    let due: Vec<usize> = state
        .traps
        .values()
        .filter(|t| t.should_trigger(current, config.traps.trigger_distance))
        .map(|t| t.lane_index)
        .collect();

    let kind = formation_kind(&config.traffic);
    for lane_index in due {
        let Some(trap) = state.traps.get_mut(&lane_index) else {
            continue;
        };
        trap.triggered = true;

        if !config.traps.formations_enabled {
            continue;
        }

        let specs = build_formation(trap, &state.topology, kind, config.traps.formation_speed);
        let ids = state.traffic.inject(&state.topology, specs);
        trap.formation_obstacles = ids.clone();
        let pattern = trap.pattern;

        state.push_event(GameEvent::new(state.tick, GameEventData::TrapArmed {
            lane_index,
            pattern,
            vehicles: ids,
        }));
    }
}

/// Move the token toward its target lane; arrive within one pixel.
fn process_movement(state: &mut RunState, config: &RunConfig) {
    if !state.player.is_transitioning {
        return;
    }
    let Some(target) = state.player.target_lane_index else {
        return;
    };
    let Some(target_x) = state.topology.token_x(target) else {
        return;
    };

    let dx = target_x - state.position.x;
    if fixed_abs(dx) > ARRIVAL_EPSILON {
        state.position.x = fixed_approach(state.position.x, target_x, config.move_speed);
    } else {
        state.position.x = target_x;
        state.arrive(target);
    }
}

fn process_collisions(state: &mut RunState) {
    let bounds = player_bounds(state.position);
    if let Some(obstacle_id) = first_collision(&bounds, state.traffic.obstacles()) {
        state.crash(CrashCause::Collision { obstacle_id });
    }
}

// =============================================================================
// TESTS
// =============================================================================
