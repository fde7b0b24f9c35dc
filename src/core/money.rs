//! Exact money and multiplier arithmetic.
//!
//! Balances and wagers are integer hundredths of a unit; multipliers are
//! integer hundredths (`4.00` is `400`). Both cross the wire as decimal
//! numbers so clients see `2.00` and `1.45`, never raw integers.

use std::fmt;
use std::ops::{Add, Sub, AddAssign, SubAssign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A balance, wager or payout in hundredths of a unit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    /// Zero units.
    pub const ZERO: Self = Self(0);

    /// Create from hundredths.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Parse a decimal amount, rounding to the nearest hundredth.
    ///
    /// Returns `None` for NaN or infinite input.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self((value * 100.0).round() as i64))
    }

    /// Raw hundredths.
    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Decimal value (display and wire only).
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// True if strictly greater than zero.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Apply a multiplier, rounding half away from zero to the hundredth.
    pub fn scale(self, multiplier: Multiplier) -> Self {
        let product = self.0 as i128 * multiplier.hundredths() as i128;
        let rounded = if product >= 0 {
            (product + 50) / 100
        } else {
            (product - 50) / 100
        };
        Self(rounded as i64)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom("amount must be a finite number"))
    }
}

/// Payout multiplier in hundredths (`1.45` is `145`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Multiplier(u32);

impl Multiplier {
    /// Multiplier of a crashed run.
    pub const ZERO: Self = Self(0);

    /// Starting multiplier (`1.00`).
    pub const ONE: Self = Self(100);

    /// Create from hundredths.
    #[inline]
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Parse a decimal multiplier, rounding to 2 decimals.
    ///
    /// Returns `None` for negative, NaN or infinite input.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self((value * 100.0).round() as u32))
    }

    /// Raw hundredths.
    #[inline]
    pub const fn hundredths(self) -> u32 {
        self.0
    }

    /// Decimal value (display and wire only).
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Debug for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self)
    }
}

impl Serialize for Multiplier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Multiplier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Multiplier::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom("multiplier must be a non-negative number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale() {
        let bet = Amount::from_units(2);
        assert_eq!(bet.scale(Multiplier::from_hundredths(400)), Amount::from_units(8));
        assert_eq!(Amount::from_units(1).scale(Multiplier::from_hundredths(145)), Amount::from_cents(145));
        assert_eq!(bet.scale(Multiplier::ZERO), Amount::ZERO);
        // 0.33 * 1.05 = 0.3465 -> 0.35
        assert_eq!(Amount::from_cents(33).scale(Multiplier::from_hundredths(105)), Amount::from_cents(35));
    }

    #[test]
    fn test_from_decimal() {
        assert_eq!(Amount::from_decimal(2.0), Some(Amount::from_cents(200)));
        assert_eq!(Amount::from_decimal(0.1 + 0.2), Some(Amount::from_cents(30)));
        assert_eq!(Amount::from_decimal(f64::NAN), None);
        assert_eq!(Multiplier::from_decimal(1.05), Some(Multiplier::from_hundredths(105)));
        assert_eq!(Multiplier::from_decimal(-1.0), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_cents(800).to_string(), "8.00");
        assert_eq!(Amount::from_cents(-45).to_string(), "-0.45");
        assert_eq!(Multiplier::from_hundredths(345).to_string(), "3.45");
    }

    #[test]
    fn test_serde_as_decimal() {
        let json = serde_json::to_string(&Amount::from_cents(145)).unwrap();
        assert_eq!(json, "1.45");
        let back: Amount = serde_json::from_str("1.45").unwrap();
        assert_eq!(back, Amount::from_cents(145));

        let m: Multiplier = serde_json::from_str("4").unwrap();
        assert_eq!(m, Multiplier::from_hundredths(400));
        assert!(serde_json::from_str::<Multiplier>("-2.5").is_err());
    }
}
