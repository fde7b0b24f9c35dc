//! # Lane Dash Server
//!
//! Authoritative simulation and settlement for Lane Dash, a lane-crossing
//! wager game: a token crosses highways of traffic, each lane raises the
//! payout multiplier, and the player cashes out or loses the wager to a
//! collision or a hidden crash lane.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LANE DASH SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector and bounding boxes              │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── money.rs    - Amounts and multipliers in hundredths     │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── lane.rs     - Lane topology                             │
//! │  ├── traffic.rs  - Vehicle spawning and movement             │
//! │  ├── trap.rs     - Hidden crash lanes and formations         │
//! │  ├── multiplier.rs - Per-lane payout multipliers             │
//! │  ├── state.rs    - Run and player state machine              │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  ledger/         - Balances, sessions, history               │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── http.rs     - Balance and history routes                │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Live run management                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same seed and lane selections at the same ticks, a run
//! produces the same traffic, crash lanes and outcome.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod ledger;
pub mod network;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use core::money::{Amount, Multiplier};
pub use game::difficulty::Difficulty;
pub use game::state::{RunState, RunPhase, Outcome};
pub use ledger::{SessionLedger, LedgerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
