//! Traffic Simulation
//!
//! Spawns, advances and despawns vehicles on highway lanes.
//!
//! ## Spawn Rules
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  1. Global cooldown: one attempt per 300 ms of sim time      │
//! │  2. Pick one highway lane uniformly                          │
//! │  3. Roll the difficulty spawn rate                           │
//! │  4. Spacing: newest vehicle in lane must be ≥ 200 px down    │
//! │  5. Pick archetype by spawn weight (emergency weight = 0)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{
    Fixed, to_fixed, fixed_mul, fixed_max,
    CANVAS_HEIGHT, VEHICLE_WIDTH, VEHICLE_HEIGHT, MIN_VEHICLE_SPACING,
};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::{FixedVec2, Rect};
use crate::game::difficulty::Difficulty;
use crate::game::lane::LaneTopology;

// =============================================================================
// ARCHETYPES
// =============================================================================

/// Vehicle model. Names match the client sprite ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    /// Emergency vehicle, only used in trap formations
    #[serde(rename = "police")]
    Police,
    #[serde(rename = "sedan1")]
    Sedan,
    #[serde(rename = "sports1")]
    Sports,
    #[serde(rename = "sports2")]
    SportsAlt,
    #[serde(rename = "truck")]
    Truck,
}

/// Spawn parameters for one vehicle model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleArchetype {
    pub kind: VehicleKind,
    pub min_speed: Fixed,
    pub max_speed: Fixed,
    /// Relative spawn weight; 0 never spawns from regular traffic
    pub spawn_weight: u32,
    pub emergency: bool,
}

/// The five stock vehicle models.
pub fn default_archetypes() -> Vec<VehicleArchetype> {
    vec![
        VehicleArchetype {
            kind: VehicleKind::Police,
            min_speed: to_fixed(4.0),
            max_speed: to_fixed(6.0),
            spawn_weight: 0,
            emergency: true,
        },
        VehicleArchetype {
            kind: VehicleKind::Sedan,
            min_speed: to_fixed(2.0),
            max_speed: to_fixed(3.5),
            spawn_weight: 35,
            emergency: false,
        },
        VehicleArchetype {
            kind: VehicleKind::Sports,
            min_speed: to_fixed(3.0),
            max_speed: to_fixed(4.5),
            spawn_weight: 25,
            emergency: false,
        },
        VehicleArchetype {
            kind: VehicleKind::SportsAlt,
            min_speed: to_fixed(3.0),
            max_speed: to_fixed(4.5),
            spawn_weight: 25,
            emergency: false,
        },
        VehicleArchetype {
            kind: VehicleKind::Truck,
            min_speed: to_fixed(1.5),
            max_speed: to_fixed(2.5),
            spawn_weight: 15,
            emergency: false,
        },
    ]
}

// =============================================================================
// CONFIG
// =============================================================================

/// Per-difficulty traffic tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultySettings {
    /// Floor applied to every rolled speed. The ceiling comes from the
    /// archetype's own range.
    pub min_speed: Fixed,
    /// Probability of a spawn per eligible attempt (FIXED_ONE = 100%)
    pub spawn_rate: Fixed,
}

/// Base speed floor the difficulty table scales from.
const BASE_MIN_SPEED: Fixed = to_fixed(2.0);

impl DifficultySettings {
    /// Stock tuning for a difficulty.
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                min_speed: BASE_MIN_SPEED,
                spawn_rate: to_fixed(0.15),
            },
            Difficulty::Medium => Self {
                min_speed: BASE_MIN_SPEED * 3 / 2,
                spawn_rate: to_fixed(0.2),
            },
            Difficulty::Hard => Self {
                min_speed: BASE_MIN_SPEED * 2,
                spawn_rate: to_fixed(0.25),
            },
        }
    }
}

/// Traffic configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Settings indexed by [`Difficulty::index`]
    pub settings: [DifficultySettings; 3],
    /// Minimum sim time between spawn attempts
    pub spawn_cooldown_ms: u64,
    /// Minimum travel of the newest vehicle before its lane accepts another
    pub min_spacing: Fixed,
    pub archetypes: Vec<VehicleArchetype>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            settings: Difficulty::ALL.map(DifficultySettings::for_difficulty),
            spawn_cooldown_ms: 300,
            min_spacing: MIN_VEHICLE_SPACING,
            archetypes: default_archetypes(),
        }
    }
}

impl TrafficConfig {
    /// Config with regular traffic switched off. Trap formations still run.
    pub fn without_traffic() -> Self {
        let mut config = Self::default();
        for s in config.settings.iter_mut() {
            s.spawn_rate = 0;
        }
        config
    }

    pub fn settings(&self, difficulty: Difficulty) -> &DifficultySettings {
        &self.settings[difficulty.index()]
    }

    fn emergency_archetype(&self) -> Option<&VehicleArchetype> {
        self.archetypes.iter().find(|a| a.emergency)
    }
}

// =============================================================================
// OBSTACLES
// =============================================================================

/// A moving vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Unique within a run
    pub id: u32,
    pub lane_index: usize,
    /// Top-left corner
    pub position: FixedVec2,
    /// Pixels per tick, downward
    pub speed: Fixed,
    pub width: Fixed,
    pub height: Fixed,
    /// Start offset of the owning lane
    pub lane_offset: Fixed,
    pub kind: VehicleKind,
    pub is_hazard_formation: bool,
    pub formation_id: Option<u32>,
}

impl Obstacle {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.width, self.height)
    }

    /// True once the vehicle has fully left the bottom of the playfield.
    pub fn is_past_bound(&self) -> bool {
        self.position.y > CANVAS_HEIGHT + self.height
    }
}

/// Template for a vehicle about to enter a lane. The simulator assigns ids.
#[derive(Clone, Debug)]
pub struct ObstacleSpec {
    pub lane_index: usize,
    pub y: Fixed,
    pub speed: Fixed,
    pub kind: VehicleKind,
    pub formation_id: Option<u32>,
}

// =============================================================================
// SIMULATOR
// =============================================================================

/// Live traffic for one run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrafficSimulator {
    /// Lane index → vehicles in spawn order
    lanes: BTreeMap<usize, Vec<Obstacle>>,
    last_spawn_ms: u64,
    next_id: u32,
}

impl TrafficSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance every vehicle and drop those past the playfield.
    pub fn advance(&mut self) {
        for obstacles in self.lanes.values_mut() {
            for o in obstacles.iter_mut() {
                o.position.y = o.position.y.wrapping_add(o.speed);
            }
            obstacles.retain(|o| !o.is_past_bound());
        }
        self.lanes.retain(|_, obstacles| !obstacles.is_empty());
    }

    /// Run one spawn attempt if the global cooldown allows it.
    ///
    /// Returns the id of the spawned vehicle, if any.
    pub fn maybe_spawn(
        &mut self,
        now_ms: u64,
        rng: &mut DeterministicRng,
        topology: &LaneTopology,
        difficulty: Difficulty,
        config: &TrafficConfig,
    ) -> Option<u32> {
        if now_ms.saturating_sub(self.last_spawn_ms) < config.spawn_cooldown_ms {
            return None;
        }
        self.last_spawn_ms = now_ms;

        let highways = topology.highway_indices();
        let lane_index = *rng.choose(&highways)?;

        let settings = config.settings(difficulty);
        if !rng.next_bool(settings.spawn_rate) {
            return None;
        }

        if let Some(newest) = self.lanes.get(&lane_index).and_then(|v| v.last()) {
            if newest.position.y < config.min_spacing {
                return None;
            }
        }

        let weights: Vec<u32> = config.archetypes.iter().map(|a| a.spawn_weight).collect();
        let archetype = config.archetypes[rng.weighted_index(&weights)?];

        let rolled = rng.next_fixed_range(archetype.min_speed, archetype.max_speed);
        let speed = fixed_max(
            fixed_mul(rolled, difficulty.speed_factor()),
            settings.min_speed,
        );

        self.insert(
            topology,
            ObstacleSpec {
                lane_index,
                y: -VEHICLE_HEIGHT,
                speed,
                kind: archetype.kind,
                formation_id: None,
            },
        )
    }

    /// Advance, then attempt a spawn.
    pub fn tick(
        &mut self,
        now_ms: u64,
        rng: &mut DeterministicRng,
        topology: &LaneTopology,
        difficulty: Difficulty,
        config: &TrafficConfig,
    ) -> Option<u32> {
        self.advance();
        self.maybe_spawn(now_ms, rng, topology, difficulty, config)
    }

    /// Inject a trap formation, bypassing cooldown and spacing.
    ///
    /// Specs targeting lanes outside the topology are skipped.
    pub fn inject(&mut self, topology: &LaneTopology, formation: Vec<ObstacleSpec>) -> Vec<u32> {
        formation
            .into_iter()
            .filter_map(|spec| self.insert(topology, spec))
            .collect()
    }

    fn insert(&mut self, topology: &LaneTopology, spec: ObstacleSpec) -> Option<u32> {
        let lane = topology.lane_at(spec.lane_index)?;
        let x = topology.obstacle_x(spec.lane_index)?;

        let id = self.next_id;
        self.next_id += 1;

        self.lanes.entry(spec.lane_index).or_default().push(Obstacle {
            id,
            lane_index: spec.lane_index,
            position: FixedVec2::new(x, spec.y),
            speed: spec.speed,
            width: VEHICLE_WIDTH,
            height: VEHICLE_HEIGHT,
            lane_offset: lane.start_offset,
            kind: spec.kind,
            is_hazard_formation: spec.formation_id.is_some(),
            formation_id: spec.formation_id,
        });

        Some(id)
    }

    /// All live vehicles, lane order then spawn order.
    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.lanes.values().flatten()
    }

    pub fn lane_obstacles(&self, lane_index: usize) -> &[Obstacle] {
        self.lanes.get(&lane_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn obstacle_count(&self) -> usize {
        self.lanes.values().map(Vec::len).sum()
    }

    /// Live vehicles belonging to a formation.
    pub fn formation_count(&self, formation_id: u32) -> usize {
        self.obstacles()
            .filter(|o| o.formation_id == Some(formation_id))
            .count()
    }

    pub fn clear(&mut self) {
        self.lanes.clear();
    }
}

/// Kind used for formation vehicles: the emergency archetype, or a sedan
/// when the roster has none.
pub fn formation_kind(config: &TrafficConfig) -> VehicleKind {
    config
        .emergency_archetype()
        .map(|a| a.kind)
        .unwrap_or(VehicleKind::Sedan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{from_int, FIXED_ONE};
    use proptest::prelude::*;

    fn always_spawn() -> TrafficConfig {
        let mut config = TrafficConfig::default();
        for s in config.settings.iter_mut() {
            s.spawn_rate = FIXED_ONE;
        }
        config
    }

    #[test]
    fn test_difficulty_settings() {
        let easy = DifficultySettings::for_difficulty(Difficulty::Easy);
        let hard = DifficultySettings::for_difficulty(Difficulty::Hard);
        assert_eq!(easy.min_speed, from_int(2));
        assert_eq!(hard.min_speed, from_int(4));
        assert!(easy.spawn_rate < hard.spawn_rate);
    }

    #[test]
    fn test_cooldown_gates_attempts() {
        let topo = LaneTopology::standard();
        let config = always_spawn();
        let mut sim = TrafficSimulator::new();
        let mut rng = DeterministicRng::new(1);

        assert!(sim.maybe_spawn(100, &mut rng, &topo, Difficulty::Easy, &config).is_none());
        assert!(sim.maybe_spawn(300, &mut rng, &topo, Difficulty::Easy, &config).is_some());
        assert!(sim.maybe_spawn(500, &mut rng, &topo, Difficulty::Easy, &config).is_none());
        assert_eq!(sim.obstacle_count(), 1);
    }

    #[test]
    fn test_spawn_geometry() {
        let topo = LaneTopology::standard();
        let config = always_spawn();
        let mut sim = TrafficSimulator::new();
        let mut rng = DeterministicRng::new(2);

        sim.maybe_spawn(300, &mut rng, &topo, Difficulty::Medium, &config).unwrap();
        let o = sim.obstacles().next().unwrap();

        assert!(topo.is_highway(o.lane_index));
        assert_eq!(o.position.y, -VEHICLE_HEIGHT);
        assert_eq!(Some(o.position.x), topo.obstacle_x(o.lane_index));
        assert_ne!(o.kind, VehicleKind::Police);
        assert!(!o.is_hazard_formation);
        assert!(o.speed >= config.settings(Difficulty::Medium).min_speed);
    }

    #[test]
    fn test_spawn_speed_between_floor_and_archetype_ceiling() {
        let topo = LaneTopology::standard();
        let config = always_spawn();
        let floor = config.settings(Difficulty::Hard).min_speed;
        let fastest = config
            .archetypes
            .iter()
            .filter(|a| a.spawn_weight > 0)
            .map(|a| a.max_speed)
            .max()
            .unwrap();
        let ceiling = fixed_max(fixed_mul(fastest, Difficulty::Hard.speed_factor()), floor);

        for seed in 0..50 {
            let mut sim = TrafficSimulator::new();
            let mut rng = DeterministicRng::new(seed);
            sim.maybe_spawn(300, &mut rng, &topo, Difficulty::Hard, &config).unwrap();
            let o = sim.obstacles().next().unwrap();
            assert!(o.speed >= floor);
            assert!(o.speed <= ceiling);
        }
    }

    #[test]
    fn test_despawn_past_bound() {
        let topo = LaneTopology::standard();
        let mut sim = TrafficSimulator::new();
        sim.inject(&topo, vec![ObstacleSpec {
            lane_index: 3,
            y: CANVAS_HEIGHT + VEHICLE_HEIGHT - from_int(1),
            speed: from_int(2),
            kind: VehicleKind::Truck,
            formation_id: None,
        }]);

        assert_eq!(sim.obstacle_count(), 1);
        sim.advance();
        assert_eq!(sim.obstacle_count(), 0);
    }

    #[test]
    fn test_spacing_blocks_lane() {
        let topo = LaneTopology::new(1, crate::core::fixed::LANE_WIDTH);
        let config = always_spawn();
        let mut sim = TrafficSimulator::new();
        let mut rng = DeterministicRng::new(3);

        sim.maybe_spawn(300, &mut rng, &topo, Difficulty::Hard, &config).unwrap();
        // Only one highway: the fresh vehicle at y = -120 blocks the next attempt
        assert!(sim.maybe_spawn(600, &mut rng, &topo, Difficulty::Hard, &config).is_none());
        assert_eq!(sim.lane_obstacles(1).len(), 1);
    }

    #[test]
    fn test_inject_skips_unknown_lanes() {
        let topo = LaneTopology::standard();
        let mut sim = TrafficSimulator::new();
        let ids = sim.inject(&topo, vec![
            ObstacleSpec { lane_index: 4, y: 0, speed: 1, kind: VehicleKind::Police, formation_id: Some(9) },
            ObstacleSpec { lane_index: 40, y: 0, speed: 1, kind: VehicleKind::Police, formation_id: Some(9) },
        ]);
        assert_eq!(ids.len(), 1);
        assert_eq!(sim.formation_count(9), 1);
        assert!(sim.obstacles().all(|o| o.is_hazard_formation));
    }

    #[test]
    fn test_without_traffic_never_spawns() {
        let topo = LaneTopology::standard();
        let config = TrafficConfig::without_traffic();
        let mut sim = TrafficSimulator::new();
        let mut rng = DeterministicRng::new(4);

        for tick in 0..6000u64 {
            sim.tick(tick * 1000 / 60, &mut rng, &topo, Difficulty::Hard, &config);
        }
        assert_eq!(sim.obstacle_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_spacing_holds_at_spawn(seed in any::<u64>(), ticks in 60u64..1200) {
            let topo = LaneTopology::standard();
            let config = always_spawn();
            let mut sim = TrafficSimulator::new();
            let mut rng = DeterministicRng::new(seed);

            for tick in 0..ticks {
                if let Some(id) = sim.tick(tick * 1000 / 60, &mut rng, &topo, Difficulty::Hard, &config) {
                    let spawned = sim.obstacles().find(|o| o.id == id).unwrap().clone();
                    let lane = sim.lane_obstacles(spawned.lane_index);
                    if lane.len() >= 2 {
                        let previous = &lane[lane.len() - 2];
                        prop_assert!(previous.position.y >= config.min_spacing);
                    }
                }
            }
        }
    }
}
