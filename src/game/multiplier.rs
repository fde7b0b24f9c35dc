//! Multiplier Table
//!
//! Deterministic payout multiplier per lane:
//!
//! ```text
//!   curb            1.00
//!   highway i       base + increment × i   (2 decimals, capped at tail[0])
//!   last highways   3.30, 3.45, 3.60
//!   safe            4.00
//! ```

use std::env;
use serde::{Serialize, Deserialize};

use crate::core::money::Multiplier;
use crate::game::difficulty::Difficulty;
use crate::game::lane::{LaneKind, LaneTopology};

/// Base and per-lane increment of the multiplier curve for one difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierCurve {
    /// Value before any increment
    pub base: Multiplier,
    /// Added once per lane index
    pub increment: Multiplier,
}

impl MultiplierCurve {
    const fn new(base: u32, increment: u32) -> Self {
        Self {
            base: Multiplier::from_hundredths(base),
            increment: Multiplier::from_hundredths(increment),
        }
    }

    /// Uncapped formula value for a lane index.
    pub fn at(&self, lane_index: usize) -> Multiplier {
        let raw = self.base.hundredths() as u64
            + self.increment.hundredths() as u64 * lane_index as u64;
        Multiplier::from_hundredths(raw.min(u32::MAX as u64) as u32)
    }
}

/// Multiplier configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierConfig {
    /// Curves indexed by [`Difficulty::index`]
    pub curves: [MultiplierCurve; 3],
    /// Value of the start lane
    pub curb: Multiplier,
    /// Value of the finish lane, identical for every difficulty
    pub terminal: Multiplier,
    /// Fixed values of the last highway lanes, in lane order
    pub tail: Vec<Multiplier>,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            curves: [
                MultiplierCurve::new(105, 15),
                MultiplierCurve::new(110, 20),
                MultiplierCurve::new(115, 25),
            ],
            curb: Multiplier::ONE,
            terminal: Multiplier::from_hundredths(400),
            tail: vec![
                Multiplier::from_hundredths(330),
                Multiplier::from_hundredths(345),
                Multiplier::from_hundredths(360),
            ],
        }
    }
}

impl MultiplierConfig {
    /// Load curve overrides from `{EASY,MEDIUM,HARD}_BASE_MULTIPLIER` and
    /// `{EASY,MEDIUM,HARD}_INCREMENT`. Missing or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for difficulty in Difficulty::ALL {
            let prefix = difficulty.as_str().to_ascii_uppercase();
            let curve = &mut config.curves[difficulty.index()];
            if let Some(base) = env_multiplier(&format!("{}_BASE_MULTIPLIER", prefix)) {
                curve.base = base;
            }
            if let Some(increment) = env_multiplier(&format!("{}_INCREMENT", prefix)) {
                curve.increment = increment;
            }
        }
        config
    }

    /// Curve for a difficulty.
    pub fn curve(&self, difficulty: Difficulty) -> MultiplierCurve {
        self.curves[difficulty.index()]
    }
}

fn env_multiplier(key: &str) -> Option<Multiplier> {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(Multiplier::from_decimal)
}

/// Precomputed multipliers for one topology and difficulty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierTable {
    difficulty: Difficulty,
    values: Vec<Multiplier>,
}

impl MultiplierTable {
    /// Compute the value of every lane in `topology`.
    pub fn new(topology: &LaneTopology, difficulty: Difficulty, config: &MultiplierConfig) -> Self {
        let curve = config.curve(difficulty);
        let highways = topology.highway_indices();

        // The last `tail_len` highways take the fixed tail values, aligned right.
        let tail_len = config.tail.len().min(highways.len());
        let tail_values = &config.tail[config.tail.len() - tail_len..];
        let formula_lanes = highways.len() - tail_len;
        let cap = tail_values.first().copied().unwrap_or(config.terminal);

        let values = topology
            .lanes()
            .iter()
            .map(|lane| match lane.kind {
                LaneKind::Curb => config.curb,
                LaneKind::Safe => config.terminal,
                LaneKind::Highway => {
                    let position = highways
                        .iter()
                        .position(|&h| h == lane.index)
                        .unwrap_or(0);
                    if position >= formula_lanes {
                        tail_values[position - formula_lanes]
                    } else {
                        curve.at(lane.index).min(cap)
                    }
                }
            })
            .collect();

        Self { difficulty, values }
    }

    /// Difficulty this table was built for.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Multiplier for a lane.
    ///
    /// # Panics
    ///
    /// Panics if `lane_index` is outside the topology. Lane indices always
    /// come from the same topology the table was built from.
    pub fn multiplier(&self, lane_index: usize) -> Multiplier {
        assert!(
            lane_index < self.values.len(),
            "lane index {} out of range for {} lanes",
            lane_index,
            self.values.len()
        );
        self.values[lane_index]
    }

    /// All values in lane order.
    pub fn values(&self) -> &[Multiplier] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(h: u32) -> Multiplier {
        Multiplier::from_hundredths(h)
    }

    #[test]
    fn test_easy_table() {
        let topo = LaneTopology::standard();
        let table = MultiplierTable::new(&topo, Difficulty::Easy, &MultiplierConfig::default());

        assert_eq!(table.multiplier(0), Multiplier::ONE);
        assert_eq!(table.multiplier(1), m(120));
        assert_eq!(table.multiplier(2), m(135));
        assert_eq!(table.multiplier(12), m(285));
        assert_eq!(table.multiplier(13), m(330));
        assert_eq!(table.multiplier(14), m(345));
        assert_eq!(table.multiplier(15), m(360));
        assert_eq!(table.multiplier(16), m(400));
    }

    #[test]
    fn test_hard_formula_is_capped() {
        let topo = LaneTopology::standard();
        let table = MultiplierTable::new(&topo, Difficulty::Hard, &MultiplierConfig::default());

        // 1.15 + 0.25 × 8 = 3.15, 1.15 + 0.25 × 9 = 3.40 -> 3.30
        assert_eq!(table.multiplier(8), m(315));
        assert_eq!(table.multiplier(9), m(330));
        assert_eq!(table.multiplier(12), m(330));
    }

    #[test]
    fn test_terminal_independent_of_difficulty() {
        let topo = LaneTopology::standard();
        let config = MultiplierConfig::default();
        for d in Difficulty::ALL {
            let table = MultiplierTable::new(&topo, d, &config);
            assert_eq!(table.multiplier(topo.final_index()), m(400));
            assert_eq!(table.difficulty(), d);
        }
    }

    #[test]
    fn test_short_topology_uses_last_tail_values() {
        let topo = LaneTopology::new(2, crate::core::fixed::LANE_WIDTH);
        let table = MultiplierTable::new(&topo, Difficulty::Easy, &MultiplierConfig::default());
        assert_eq!(table.values(), &[m(100), m(345), m(360), m(400)]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_panics() {
        let topo = LaneTopology::standard();
        let table = MultiplierTable::new(&topo, Difficulty::Easy, &MultiplierConfig::default());
        table.multiplier(17);
    }

    proptest! {
        #[test]
        fn prop_non_decreasing(
            highways in 0usize..30,
            base in 100u32..200,
            increment in 0u32..60,
            difficulty in prop::sample::select(Difficulty::ALL.to_vec()),
        ) {
            let topo = LaneTopology::new(highways, crate::core::fixed::LANE_WIDTH);
            let mut config = MultiplierConfig::default();
            config.curves[difficulty.index()] = MultiplierCurve::new(base, increment);
            let table = MultiplierTable::new(&topo, difficulty, &config);

            for pair in table.values().windows(2) {
                prop_assert!(pair[0] <= pair[1], "{:?}", table.values());
            }
            prop_assert_eq!(table.multiplier(topo.final_index()), config.terminal);
        }
    }
}
