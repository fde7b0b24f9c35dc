//! Crash Traps
//!
//! Hidden crash lanes are chosen when a run starts. Reaching one is always
//! a crash. As the player closes in (two lanes short), the trap dresses
//! itself with a vehicle formation so the crash reads as traffic.
//!
//! ## Formations
//!
//! ```text
//!            trap-1      trap      trap+1
//!  wall      y0          y1        y2       yk = -H - k(H+20)
//!  zigzag    y0          y1        y2       yk = -H - k(H+40)
//!  pincer    -H-50       -H-100    -H-50
//! ```
//!
//! Only neighbor lanes that are highways receive a vehicle.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, from_int, VEHICLE_HEIGHT, TRAP_SPEED};
use crate::core::rng::DeterministicRng;
use crate::game::difficulty::Difficulty;
use crate::game::lane::LaneTopology;
use crate::game::traffic::{ObstacleSpec, VehicleKind};

/// Formation shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapPattern {
    Wall,
    Zigzag,
    Pincer,
}

impl TrapPattern {
    pub const ALL: [TrapPattern; 3] = [TrapPattern::Wall, TrapPattern::Zigzag, TrapPattern::Pincer];
}

/// A hidden crash lane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashTrap {
    pub lane_index: usize,
    pub pattern: TrapPattern,
    /// Set once the formation has been materialized
    pub triggered: bool,
    /// Ids of the injected formation vehicles
    pub formation_obstacles: Vec<u32>,
}

impl CrashTrap {
    pub fn new(lane_index: usize, pattern: TrapPattern) -> Self {
        Self {
            lane_index,
            pattern,
            triggered: false,
            formation_obstacles: Vec::new(),
        }
    }

    /// Formation id shared by this trap's vehicles.
    pub fn formation_id(&self) -> u32 {
        self.lane_index as u32
    }

    /// True when a player standing in `current_lane` should see the formation.
    pub fn should_trigger(&self, current_lane: usize, trigger_distance: usize) -> bool {
        !self.triggered && self.lane_index.checked_sub(trigger_distance) == Some(current_lane)
    }
}

/// Trap configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapConfig {
    /// Crash lanes per difficulty, indexed by [`Difficulty::index`]
    pub lane_counts: [usize; 3],
    /// Materialize formations on approach
    pub formations_enabled: bool,
    /// Lanes short of the trap at which the formation appears
    pub trigger_distance: usize,
    /// Downward speed of formation vehicles
    pub formation_speed: Fixed,
}

/// Stock crash lane counts: Easy 1, Medium 2, Hard 5.
pub const DEFAULT_TRAP_COUNTS: [usize; 3] = [1, 2, 5];

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            lane_counts: DEFAULT_TRAP_COUNTS,
            formations_enabled: true,
            trigger_distance: 2,
            formation_speed: TRAP_SPEED,
        }
    }
}

impl TrapConfig {
    pub fn lane_count(&self, difficulty: Difficulty) -> usize {
        self.lane_counts[difficulty.index()]
    }
}

/// Pick the crash lanes for a run: stock count for `difficulty`, drawn
/// uniformly from highway lanes without replacement.
pub fn select_trap_lanes(
    difficulty: Difficulty,
    topology: &LaneTopology,
    rng: &mut DeterministicRng,
) -> BTreeSet<usize> {
    select_n_trap_lanes(DEFAULT_TRAP_COUNTS[difficulty.index()], topology, rng)
}

/// Draw `count` distinct highway lanes. Capped at the number of highways.
pub fn select_n_trap_lanes(
    count: usize,
    topology: &LaneTopology,
    rng: &mut DeterministicRng,
) -> BTreeSet<usize> {
    rng.sample_without_replacement(&topology.highway_indices(), count)
        .into_iter()
        .collect()
}

/// Build the traps for a run, one uniformly chosen pattern per lane.
pub fn generate_traps(
    difficulty: Difficulty,
    topology: &LaneTopology,
    rng: &mut DeterministicRng,
    config: &TrapConfig,
) -> BTreeMap<usize, CrashTrap> {
    let lanes = select_n_trap_lanes(config.lane_count(difficulty), topology, rng);
    traps_for_lanes(lanes, rng)
}

/// Build traps for a known set of lanes.
pub fn traps_for_lanes(
    lanes: impl IntoIterator<Item = usize>,
    rng: &mut DeterministicRng,
) -> BTreeMap<usize, CrashTrap> {
    lanes
        .into_iter()
        .map(|lane| {
            let pattern = rng
                .choose(&TrapPattern::ALL)
                .copied()
                .unwrap_or(TrapPattern::Wall);
            (lane, CrashTrap::new(lane, pattern))
        })
        .collect()
}

/// Vehicles making up a trap's formation.
pub fn build_formation(
    trap: &CrashTrap,
    topology: &LaneTopology,
    kind: VehicleKind,
    speed: Fixed,
) -> Vec<ObstacleSpec> {
    let h = VEHICLE_HEIGHT;
    let trap_lane = trap.lane_index;
    let neighbor = |offset: isize| -> Option<usize> {
        let lane = trap_lane.checked_add_signed(offset)?;
        topology.is_highway(lane).then_some(lane)
    };
    let spec = |lane_index: usize, y: Fixed| ObstacleSpec {
        lane_index,
        y,
        speed,
        kind,
        formation_id: Some(trap.formation_id()),
    };

    match trap.pattern {
        TrapPattern::Wall => (-1..=1)
            .enumerate()
            .filter_map(|(k, offset)| {
                let lane = neighbor(offset)?;
                Some(spec(lane, -h - (k as Fixed) * (h + from_int(20))))
            })
            .collect(),
        TrapPattern::Zigzag => (-1..=1)
            .enumerate()
            .filter_map(|(k, offset)| {
                let lane = neighbor(offset)?;
                Some(spec(lane, -h - (k as Fixed) * (h + from_int(40))))
            })
            .collect(),
        TrapPattern::Pincer => {
            let mut specs: Vec<ObstacleSpec> = [-1, 1]
                .into_iter()
                .filter_map(|offset| neighbor(offset).map(|lane| spec(lane, -h - from_int(50))))
                .collect();
            specs.push(spec(trap_lane, -h - from_int(100)));
            specs
        }
    }
}
