//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the lane simulation.
//! All operations use integer arithmetic only - no floats in the tick loop.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 pixels                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The whole playfield (17 lanes of 100 px) fits in the integer part
//! with room to spare.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

// =============================================================================
// PLAYFIELD CONSTANTS (pixels, as integer literals - NO float conversion!)
// =============================================================================

/// Visible playfield width: 785 px
pub const CANVAS_WIDTH: Fixed = 785 << FIXED_SCALE;

/// Visible playfield height: 342 px
pub const CANVAS_HEIGHT: Fixed = 342 << FIXED_SCALE;

/// Player token edge length: 60 px (square)
pub const PLAYER_SIZE: Fixed = 60 << FIXED_SCALE;

/// Vehicle footprint width: 60 px
pub const VEHICLE_WIDTH: Fixed = 60 << FIXED_SCALE;

/// Vehicle footprint height: 120 px
pub const VEHICLE_HEIGHT: Fixed = 120 << FIXED_SCALE;

/// Default lane width: 100 px
pub const LANE_WIDTH: Fixed = 100 << FIXED_SCALE;

/// Minimum travel before a lane accepts another vehicle: 200 px
pub const MIN_VEHICLE_SPACING: Fixed = 200 << FIXED_SCALE;

/// Player token horizontal speed: 2 px per tick
pub const PLAYER_MOVE_SPEED: Fixed = 2 << FIXED_SCALE;

/// Downward speed of trap formation vehicles: 3 px per tick
pub const TRAP_SPEED: Fixed = 3 << FIXED_SCALE;

/// Arrival tolerance for lane transitions: 1 px
pub const ARRIVAL_EPSILON: Fixed = FIXED_ONE;

/// Player token vertical position (fixed for the whole run).
///
/// `342 / 2 - 60 / 2 + 20 = 161`
pub const PLAYER_Y: Fixed = (CANVAS_HEIGHT / 2) - (PLAYER_SIZE / 2) + (20 << FIXED_SCALE);

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in tick loop.
///
/// # Example
/// ```
/// use lane_dash::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert an integer pixel count to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0; // Deterministic: don't panic
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Move `from` toward `to` by at most `step`, never overshooting.
#[inline]
pub fn fixed_approach(from: Fixed, to: Fixed, step: Fixed) -> Fixed {
    let delta = to.wrapping_sub(from);
    if fixed_abs(delta) <= step {
        to
    } else if delta > 0 {
        from.wrapping_add(step)
    } else {
        from.wrapping_sub(step)
    }
}

// =============================================================================
// TESTS
// =============================================================================
