//! Difficulty levels.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed};

/// Run difficulty. Tunes traffic density, trap count and the multiplier curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// One crash lane, slow sparse traffic
    #[serde(alias = "easy")]
    Easy,
    /// Two crash lanes
    #[default]
    #[serde(alias = "medium")]
    Medium,
    /// Five crash lanes, fast dense traffic
    #[serde(alias = "hard")]
    Hard,
}

impl Difficulty {
    /// All difficulties, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Position in [`Difficulty::ALL`], for per-difficulty tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Scale applied to every rolled vehicle speed.
    pub fn speed_factor(self) -> Fixed {
        match self {
            Difficulty::Easy => to_fixed(0.8),
            Difficulty::Medium => FIXED_ONE,
            Difficulty::Hard => to_fixed(1.2),
        }
    }

    /// Name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("Easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Difficulty::Medium).unwrap(), "\"Medium\"");
        let d: Difficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(d, Difficulty::Hard);
    }

    #[test]
    fn test_speed_factor_ordering() {
        assert!(Difficulty::Easy.speed_factor() < Difficulty::Medium.speed_factor());
        assert!(Difficulty::Medium.speed_factor() < Difficulty::Hard.speed_factor());
    }
}
