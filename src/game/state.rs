//! Run State
//!
//! State of one player's run: topology, checkpoints, hidden traps, live
//! traffic and the player token. Uses BTreeMap for deterministic iteration.
//!
//! ## Lifecycle
//!
//! ```text
//!   Betting ──start_game──▶ InProgress ──┬── arrival at safe lane ──▶ Won
//!      ▲                        │        ├── crash lane / collision ─▶ Crashed
//!      │                        │        └── cash_out ───────────────▶ CashedOut
//!      └────── reset (after cooldown) ◀────────────── Settled ◀──────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{Fixed, PLAYER_Y};
use crate::core::money::{Amount, Multiplier};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::difficulty::Difficulty;
use crate::game::events::{CrashCause, GameEvent, GameEventData};
use crate::game::lane::{LaneKind, LaneTopology};
use crate::game::multiplier::MultiplierTable;
use crate::game::tick::RunConfig;
use crate::game::traffic::TrafficSimulator;
use crate::game::trap::{generate_traps, traps_for_lanes, CrashTrap};

// =============================================================================
// ERRORS
// =============================================================================

/// Rejected player action. State is never modified when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// Wager exceeds the available balance
    #[error("insufficient balance: have {balance}, need {bet}")]
    InsufficientBalance { balance: Amount, bet: Amount },

    /// Wager is zero or negative
    #[error("invalid bet amount: {0}")]
    InvalidBet(Amount),

    /// Target is not the next uncollected lane, or a move is already underway
    #[error("invalid lane transition from {from} to {to}")]
    InvalidLaneTransition { from: usize, to: usize },

    /// Action needs a run in progress
    #[error("no run in progress")]
    NotInProgress,

    /// Action needs the betting phase
    #[error("run already in progress")]
    RunInProgress,

    /// Reset requested before the post-settlement cooldown elapsed
    #[error("cooldown active: {remaining_ticks} ticks remaining")]
    CooldownActive { remaining_ticks: u64 },
}

// =============================================================================
// PLAYER
// =============================================================================

/// How a run ended, or that it has not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    InProgress,
    Won,
    Crashed,
    CashedOut,
}

/// Player progress through the lanes.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerRunState {
    /// Last lane reached. Never decreases within a run.
    pub current_lane_index: usize,
    /// Lane being moved to; always `current_lane_index + 1` while set
    pub target_lane_index: Option<usize>,
    pub is_transitioning: bool,
    pub current_multiplier: Multiplier,
    pub outcome: Outcome,
}

impl PlayerRunState {
    fn fresh() -> Self {
        Self {
            current_lane_index: 0,
            target_lane_index: None,
            is_transitioning: false,
            current_multiplier: Multiplier::ONE,
            outcome: Outcome::InProgress,
        }
    }
}

/// Run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    /// Waiting for a wager
    Betting,
    /// Wager placed, token on the road
    InProgress,
    /// Final outcome recorded
    Settled { outcome: Outcome, settled_tick: u64 },
}

/// Collectible marking progress on a highway or the safe lane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub lane_index: usize,
    pub lane_offset: Fixed,
    pub multiplier: Multiplier,
    pub collected: bool,
    pub collected_tick: Option<u64>,
}

// =============================================================================
// RUN STATE
// =============================================================================

/// Complete state of one run.
#[derive(Clone, Debug)]
pub struct RunState {
    pub difficulty: Difficulty,
    pub topology: LaneTopology,
    pub multipliers: MultiplierTable,
    /// Lane index → checkpoint
    pub checkpoints: BTreeMap<usize, Checkpoint>,
    /// Lane index → hidden crash trap
    pub traps: BTreeMap<usize, CrashTrap>,
    pub traffic: TrafficSimulator,
    pub player: PlayerRunState,
    /// Token top-left corner
    pub position: FixedVec2,
    pub phase: RunPhase,
    pub bet: Amount,
    /// Amount owed if the run settled now
    pub payout: Amount,
    pub tick: u64,
    pub rng: DeterministicRng,
    events: Vec<GameEvent>,
}

impl RunState {
    /// Create a run in the betting phase.
    pub fn new(rng_seed: u64, difficulty: Difficulty, config: &RunConfig) -> Self {
        let topology = config.topology();
        let multipliers = MultiplierTable::new(&topology, difficulty, &config.multipliers);
        let mut state = Self {
            difficulty,
            checkpoints: BTreeMap::new(),
            traps: BTreeMap::new(),
            traffic: TrafficSimulator::new(),
            player: PlayerRunState::default(),
            position: FixedVec2::ZERO,
            phase: RunPhase::Betting,
            bet: Amount::ZERO,
            payout: Amount::ZERO,
            tick: 0,
            rng: DeterministicRng::new(rng_seed),
            events: Vec::new(),
            topology,
            multipliers,
        };
        state.place_on_curb();
        state
    }

    // -------------------------------------------------------------------------
    // Player operations
    // -------------------------------------------------------------------------

    /// Place a wager and start the run with freshly drawn crash lanes.
    pub fn start_game(&mut self, bet: Amount, balance: Amount, config: &RunConfig) -> Result<(), RunError> {
        self.validate_start(bet, balance)?;
        let traps = generate_traps(self.difficulty, &self.topology, &mut self.rng, &config.traps);
        self.begin(bet, traps);
        Ok(())
    }

    /// Start the run with the given crash lanes. Lanes that are not
    /// highways are ignored.
    pub fn start_game_with_traps(
        &mut self,
        bet: Amount,
        balance: Amount,
        trap_lanes: impl IntoIterator<Item = usize>,
    ) -> Result<(), RunError> {
        self.validate_start(bet, balance)?;
        let lanes: BTreeSet<usize> = trap_lanes
            .into_iter()
            .filter(|&l| self.topology.is_highway(l))
            .collect();
        let traps = traps_for_lanes(lanes, &mut self.rng);
        self.begin(bet, traps);
        Ok(())
    }

    fn validate_start(&self, bet: Amount, balance: Amount) -> Result<(), RunError> {
        if self.phase != RunPhase::Betting {
            return Err(RunError::RunInProgress);
        }
        if !bet.is_positive() {
            return Err(RunError::InvalidBet(bet));
        }
        if balance < bet {
            return Err(RunError::InsufficientBalance { balance, bet });
        }
        Ok(())
    }

    fn begin(&mut self, bet: Amount, traps: BTreeMap<usize, CrashTrap>) {
        self.traps = traps;
        self.checkpoints = self
            .topology
            .lanes()
            .iter()
            .filter(|l| l.kind != LaneKind::Curb)
            .map(|l| {
                (l.index, Checkpoint {
                    lane_index: l.index,
                    lane_offset: l.start_offset,
                    multiplier: self.multipliers.multiplier(l.index),
                    collected: false,
                    collected_tick: None,
                })
            })
            .collect();

        self.player = PlayerRunState::fresh();
        self.place_on_curb();
        self.bet = bet;
        self.payout = bet;
        self.phase = RunPhase::InProgress;

        self.push_event(GameEvent::new(self.tick, GameEventData::RunStarted {
            bet,
            difficulty: self.difficulty,
        }));
    }

    /// Begin moving to `target`. Only the next lane is a valid target.
    pub fn select_next_lane(&mut self, target: usize) -> Result<(), RunError> {
        if self.phase != RunPhase::InProgress {
            return Err(RunError::NotInProgress);
        }

        let from = self.player.current_lane_index;
        let invalid = RunError::InvalidLaneTransition { from, to: target };

        if self.player.is_transitioning || target != from + 1 || target > self.topology.final_index() {
            return Err(invalid);
        }
        if self.checkpoints.get(&target).map_or(true, |c| c.collected) {
            return Err(invalid);
        }

        self.player.target_lane_index = Some(target);
        self.player.is_transitioning = true;

        self.push_event(GameEvent::new(self.tick, GameEventData::TransitionStarted {
            from_lane: from,
            to_lane: target,
        }));
        Ok(())
    }

    /// Bank the multiplier currently held. Allowed mid-transition.
    pub fn cash_out(&mut self) -> Result<Amount, RunError> {
        if self.phase != RunPhase::InProgress {
            return Err(RunError::NotInProgress);
        }

        let multiplier = self.player.current_multiplier;
        let payout = self.bet.scale(multiplier);
        self.payout = payout;
        self.player.is_transitioning = false;
        self.player.target_lane_index = None;
        self.settle(Outcome::CashedOut);

        self.push_event(GameEvent::new(self.tick, GameEventData::CashedOut {
            lane_index: self.player.current_lane_index,
            multiplier,
            payout,
        }));
        Ok(payout)
    }

    /// Record a crash reported by the client.
    pub fn forfeit(&mut self) -> Result<(), RunError> {
        if self.phase != RunPhase::InProgress {
            return Err(RunError::NotInProgress);
        }
        self.crash(CrashCause::Reported);
        Ok(())
    }

    /// Ticks left before [`RunState::reset`] is allowed. Zero outside `Settled`.
    pub fn cooldown_remaining(&self, config: &RunConfig) -> u64 {
        match self.phase {
            RunPhase::Settled { settled_tick, .. } => {
                let elapsed = self.tick.saturating_sub(settled_tick);
                config.cooldown_ticks.saturating_sub(elapsed)
            }
            _ => 0,
        }
    }

    /// True once a settled run may go back to betting.
    pub fn can_reset(&self, config: &RunConfig) -> bool {
        matches!(self.phase, RunPhase::Settled { .. }) && self.cooldown_remaining(config) == 0
    }

    /// Return to betting. A no-op while already betting.
    pub fn reset(&mut self, config: &RunConfig) -> Result<(), RunError> {
        match self.phase {
            RunPhase::Betting => Ok(()),
            RunPhase::InProgress => Err(RunError::RunInProgress),
            RunPhase::Settled { .. } => {
                let remaining_ticks = self.cooldown_remaining(config);
                if remaining_ticks > 0 {
                    return Err(RunError::CooldownActive { remaining_ticks });
                }
                self.phase = RunPhase::Betting;
                self.player = PlayerRunState::default();
                self.checkpoints.clear();
                self.traps.clear();
                self.bet = Amount::ZERO;
                self.payout = Amount::ZERO;
                self.place_on_curb();
                self.push_event(GameEvent::new(self.tick, GameEventData::Reset));
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Transitions used by the tick
    // -------------------------------------------------------------------------

    /// End the run as crashed. Multiplier and payout drop to zero.
    pub(crate) fn crash(&mut self, cause: CrashCause) {
        self.player.current_multiplier = Multiplier::ZERO;
        self.player.is_transitioning = false;
        self.player.target_lane_index = None;
        self.payout = Amount::ZERO;
        self.settle(Outcome::Crashed);
        self.push_event(GameEvent::crashed(self.tick, self.player.current_lane_index, cause));
    }

    /// Complete the current transition.
    pub(crate) fn arrive(&mut self, lane_index: usize) {
        self.player.current_lane_index = lane_index;
        self.player.target_lane_index = None;
        self.player.is_transitioning = false;

        if let Some(checkpoint) = self.checkpoints.get_mut(&lane_index) {
            checkpoint.collected = true;
            checkpoint.collected_tick = Some(self.tick);
        }

        if self.traps.contains_key(&lane_index) {
            self.crash(CrashCause::CrashLane);
            return;
        }

        let multiplier = self.multipliers.multiplier(lane_index);
        self.player.current_multiplier = multiplier;
        self.payout = self.bet.scale(multiplier);

        if lane_index == self.topology.final_index() {
            self.settle(Outcome::Won);
            self.push_event(GameEvent::new(self.tick, GameEventData::Won {
                multiplier,
                payout: self.payout,
            }));
        } else {
            self.push_event(GameEvent::checkpoint_collected(self.tick, lane_index, multiplier, self.payout));
        }
    }

    fn settle(&mut self, outcome: Outcome) {
        self.player.outcome = outcome;
        self.phase = RunPhase::Settled { outcome, settled_tick: self.tick };
    }

    fn place_on_curb(&mut self) {
        let x = self.topology.token_x(0).unwrap_or(0);
        self.position = FixedVec2::new(x, PLAYER_Y);
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn is_in_progress(&self) -> bool {
        self.phase == RunPhase::InProgress
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, RunPhase::Settled { .. })
    }

    pub fn outcome(&self) -> Outcome {
        self.player.outcome
    }

    pub fn is_trap_lane(&self, lane_index: usize) -> bool {
        self.traps.contains_key(&lane_index)
    }

    /// Take all pending events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Push an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> RunConfig {
        RunConfig::quiet()
    }

    fn started(difficulty: Difficulty, traps: &[usize]) -> (RunState, RunConfig) {
        let config = quiet_config();
        let mut state = RunState::new(7, difficulty, &config);
        state
            .start_game_with_traps(Amount::from_units(2), Amount::from_units(1000), traps.iter().copied())
            .unwrap();
        (state, config)
    }

    #[test]
    fn test_new_run_is_betting() {
        let config = quiet_config();
        let state = RunState::new(1, Difficulty::Easy, &config);
        assert_eq!(state.phase, RunPhase::Betting);
        assert_eq!(state.position.y, PLAYER_Y);
        assert!(state.checkpoints.is_empty());
    }

    #[test]
    fn test_start_game_insufficient_balance() {
        let config = quiet_config();
        let mut state = RunState::new(1, Difficulty::Easy, &config);
        let err = state
            .start_game(Amount::from_units(10), Amount::from_units(5), &config)
            .unwrap_err();
        assert_eq!(err, RunError::InsufficientBalance {
            balance: Amount::from_units(5),
            bet: Amount::from_units(10),
        });
        assert_eq!(state.phase, RunPhase::Betting);
        assert!(state.traps.is_empty());
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_start_game_sets_up_run() {
        let config = quiet_config();
        let mut state = RunState::new(3, Difficulty::Medium, &config);
        state.start_game(Amount::from_units(2), Amount::from_units(1000), &config).unwrap();

        assert!(state.is_in_progress());
        assert_eq!(state.player.current_lane_index, 0);
        assert_eq!(state.player.current_multiplier, Multiplier::ONE);
        assert_eq!(state.traps.len(), 2);
        assert_eq!(state.checkpoints.len(), 16);
        assert!(state.checkpoints.values().all(|c| !c.collected));
        assert_eq!(state.start_game(Amount::from_units(2), Amount::from_units(1000), &config),
            Err(RunError::RunInProgress));
    }

    #[test]
    fn test_invalid_bet() {
        let config = quiet_config();
        let mut state = RunState::new(3, Difficulty::Easy, &config);
        assert_eq!(
            state.start_game(Amount::ZERO, Amount::from_units(10), &config),
            Err(RunError::InvalidBet(Amount::ZERO))
        );
    }

    #[test]
    fn test_non_highway_trap_lanes_ignored() {
        let (state, _) = started(Difficulty::Easy, &[0, 4, 16, 99]);
        assert_eq!(state.traps.keys().copied().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_select_next_lane_rules() {
        let (mut state, _) = started(Difficulty::Easy, &[]);

        assert_eq!(state.select_next_lane(2), Err(RunError::InvalidLaneTransition { from: 0, to: 2 }));
        assert_eq!(state.select_next_lane(0), Err(RunError::InvalidLaneTransition { from: 0, to: 0 }));
        state.select_next_lane(1).unwrap();
        assert!(state.player.is_transitioning);
        assert_eq!(state.player.target_lane_index, Some(1));
        // Already moving
        assert_eq!(state.select_next_lane(1), Err(RunError::InvalidLaneTransition { from: 0, to: 1 }));
    }

    #[test]
    fn test_select_requires_run() {
        let config = quiet_config();
        let mut state = RunState::new(1, Difficulty::Easy, &config);
        assert_eq!(state.select_next_lane(1), Err(RunError::NotInProgress));
    }

    #[test]
    fn test_cash_out_mid_transition() {
        let (mut state, _) = started(Difficulty::Easy, &[]);
        state.arrive(1);
        state.select_next_lane(2).unwrap();

        let payout = state.cash_out().unwrap();
        // 2.00 × 1.20
        assert_eq!(payout, Amount::from_cents(240));
        assert_eq!(state.outcome(), Outcome::CashedOut);
        assert!(!state.player.is_transitioning);
        assert_eq!(state.cash_out(), Err(RunError::NotInProgress));
    }

    #[test]
    fn test_arrive_in_crash_lane() {
        let (mut state, _) = started(Difficulty::Easy, &[1]);
        state.arrive(1);
        assert_eq!(state.outcome(), Outcome::Crashed);
        assert_eq!(state.player.current_multiplier, Multiplier::ZERO);
        assert_eq!(state.payout, Amount::ZERO);
        assert!(state.checkpoints[&1].collected);
    }

    #[test]
    fn test_forfeit() {
        let (mut state, _) = started(Difficulty::Hard, &[]);
        state.forfeit().unwrap();
        assert_eq!(state.outcome(), Outcome::Crashed);
        let events = state.take_events();
        assert!(matches!(
            events.last().map(|e| &e.data),
            Some(GameEventData::Crashed { cause: CrashCause::Reported, .. })
        ));
        assert_eq!(state.forfeit(), Err(RunError::NotInProgress));
    }

    #[test]
    fn test_reset_cooldown() {
        let (mut state, config) = started(Difficulty::Easy, &[]);
        assert_eq!(state.reset(&config), Err(RunError::RunInProgress));

        state.cash_out().unwrap();
        assert!(!state.can_reset(&config));
        assert_eq!(
            state.reset(&config),
            Err(RunError::CooldownActive { remaining_ticks: config.cooldown_ticks })
        );

        state.tick += config.cooldown_ticks;
        assert!(state.can_reset(&config));
        state.reset(&config).unwrap();
        assert_eq!(state.phase, RunPhase::Betting);
        assert_eq!(state.player.current_lane_index, 0);

        // A second run draws new traps
        state.start_game(Amount::from_units(1), Amount::from_units(10), &config).unwrap();
        assert!(state.is_in_progress());
    }
}
