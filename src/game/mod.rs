//! Game Logic Module
//!
//! All run simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `lane`: Lane topology (curb, highways, safe lane)
//! - `difficulty`: Difficulty levels
//! - `multiplier`: Per-lane payout multipliers
//! - `traffic`: Vehicle spawning, movement and despawning
//! - `trap`: Hidden crash lanes and their formations
//! - `collision`: Token-versus-vehicle overlap
//! - `state`: Run state and player state machine
//! - `tick`: Authoritative simulation loop
//! - `events`: Game events

pub mod lane;
pub mod difficulty;
pub mod multiplier;
pub mod traffic;
pub mod trap;
pub mod collision;
pub mod state;
pub mod tick;
pub mod events;

// Re-export key types
pub use difficulty::Difficulty;
pub use lane::{Lane, LaneKind, LaneTopology};
pub use multiplier::{MultiplierConfig, MultiplierTable};
pub use state::{RunState, RunPhase, RunError, Outcome, PlayerRunState, Checkpoint};
pub use tick::{tick, RunConfig, TickResult};
pub use events::{GameEvent, GameEventData, CrashCause};
