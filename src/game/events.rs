//! Game Events
//!
//! Events generated during a run. Drained once per tick and forwarded by
//! the network layer; events that would reveal hidden state are marked
//! private and stay server-side.

use serde::{Serialize, Deserialize};

use crate::core::money::{Amount, Multiplier};
use crate::game::difficulty::Difficulty;
use crate::game::trap::TrapPattern;

/// Why a run crashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrashCause {
    /// Token overlapped a vehicle
    Collision { obstacle_id: u32 },
    /// Token arrived in a hidden crash lane
    CrashLane,
    /// Client reported the crash
    Reported,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventData {
    /// Wager placed, player on the curb
    RunStarted {
        bet: Amount,
        difficulty: Difficulty,
    },

    /// Player left a lane
    TransitionStarted {
        from_lane: usize,
        to_lane: usize,
    },

    /// Player arrived at a lane and took its checkpoint
    CheckpointCollected {
        lane_index: usize,
        multiplier: Multiplier,
        payout: Amount,
    },

    /// Trap formation entered the road
    TrapArmed {
        lane_index: usize,
        pattern: TrapPattern,
        vehicles: Vec<u32>,
    },

    /// Run lost
    Crashed {
        lane_index: usize,
        cause: CrashCause,
    },

    /// Player reached the finish lane
    Won {
        multiplier: Multiplier,
        payout: Amount,
    },

    /// Player banked the current multiplier
    CashedOut {
        lane_index: usize,
        multiplier: Multiplier,
        payout: Amount,
    },

    /// Back to betting after the cooldown
    Reset,
}

/// A game event with timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// True if the event may be shown to the player.
    ///
    /// Trap arming names the crash lane before the player reaches it.
    pub fn is_public(&self) -> bool {
        !matches!(self.data, GameEventData::TrapArmed { .. })
    }

    /// True for the event that ends a run.
    pub fn is_settlement(&self) -> bool {
        matches!(
            self.data,
            GameEventData::Crashed { .. } | GameEventData::Won { .. } | GameEventData::CashedOut { .. }
        )
    }

    /// Create crashed event.
    pub fn crashed(tick: u64, lane_index: usize, cause: CrashCause) -> Self {
        Self::new(tick, GameEventData::Crashed { lane_index, cause })
    }

    /// Create checkpoint collected event.
    pub fn checkpoint_collected(tick: u64, lane_index: usize, multiplier: Multiplier, payout: Amount) -> Self {
        Self::new(
            tick,
            GameEventData::CheckpointCollected { lane_index, multiplier, payout },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_events_are_private() {
        let armed = GameEvent::new(5, GameEventData::TrapArmed {
            lane_index: 6,
            pattern: TrapPattern::Wall,
            vehicles: vec![1, 2, 3],
        });
        assert!(!armed.is_public());
        assert!(GameEvent::crashed(5, 6, CrashCause::CrashLane).is_public());
    }

    #[test]
    fn test_settlement_events() {
        assert!(GameEvent::crashed(1, 2, CrashCause::Reported).is_settlement());
        assert!(!GameEvent::new(1, GameEventData::Reset).is_settlement());
        assert!(!GameEvent::checkpoint_collected(1, 2, Multiplier::ONE, Amount::ZERO).is_settlement());
    }

    #[test]
    fn test_event_json_shape() {
        let event = GameEvent::crashed(42, 6, CrashCause::Collision { obstacle_id: 7 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["tick"], 42);
        assert_eq!(json["data"]["type"], "crashed");
        assert_eq!(json["data"]["cause"]["kind"], "collision");
        assert_eq!(json["data"]["cause"]["obstacle_id"], 7);
    }
}
