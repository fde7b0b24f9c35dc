//! Core deterministic primitives.
//!
//! Everything in this module is platform-independent: integer geometry,
//! integer money and a seeded PRNG. The simulation in `game/` is built
//! only from these.

pub mod fixed;
pub mod vec2;
pub mod rng;
pub mod money;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::{FixedVec2, Rect};
pub use rng::DeterministicRng;
pub use money::{Amount, Multiplier};
