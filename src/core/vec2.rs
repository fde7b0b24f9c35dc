//! Fixed-Point 2D Vector and Axis-Aligned Boxes
//!
//! Positions on the playfield are top-left corners in pixel space with
//! `y` growing downward, matching the rendering client.

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

use super::fixed::{Fixed, FIXED_SCALE, to_float};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer pixel components.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Translate vertically.
    #[inline]
    pub fn offset_y(self, dy: Fixed) -> Self {
        Self {
            x: self.x,
            y: self.y.wrapping_add(dy),
        }
    }

    /// Convert to float pair (for rendering ONLY).
    pub fn to_floats(self) -> (f32, f32) {
        (to_float(self.x), to_float(self.y))
    }
}

impl Add for FixedVec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_add(other.x),
            y: self.y.wrapping_add(other.y),
        }
    }
}

impl Sub for FixedVec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(other.x),
            y: self.y.wrapping_sub(other.y),
        }
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.to_floats();
        write!(f, "FixedVec2({:.2}, {:.2})", x, y)
    }
}

// =============================================================================
// AXIS-ALIGNED BOUNDING BOX
// =============================================================================

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub origin: FixedVec2,
    /// Horizontal extent
    pub width: Fixed,
    /// Vertical extent
    pub height: Fixed,
}

impl Rect {
    /// Create a rectangle from its corner and size.
    #[inline]
    pub const fn new(origin: FixedVec2, width: Fixed, height: Fixed) -> Self {
        Self { origin, width, height }
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> Fixed {
        self.origin.x.wrapping_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> Fixed {
        self.origin.y.wrapping_add(self.height)
    }

    /// Strict overlap test. Rectangles that merely share an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.origin.x < other.right()
            && self.right() > other.origin.x
            && self.origin.y < other.bottom()
            && self.bottom() > other.origin.y
    }
}

// =============================================================================
// TESTS
// =============================================================================
