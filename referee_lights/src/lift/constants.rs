//! Referee seats, decision tokens, and lift-wide constants.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::errors::{ParseDecisionError, ParsePositionError};

/// The number of referee decisions required for a complete lift.
pub const REQUIRED_REFEREE_COUNT: usize = 3;

/// A referee seat.
///
/// Seats are ordered left to right so that any sequence built from a
/// sorted collection reads the way the lights are mounted.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Chief,
    Right,
}

/// All referee seats in display order.
pub const ALL_POSITIONS: [Position; 3] = [Position::Left, Position::Chief, Position::Right];

impl Position {
    /// Wire token for this seat.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Chief => "chief",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_POSITIONS
            .into_iter()
            .find(|position| position.as_str() == s)
            .ok_or_else(|| ParsePositionError(s.to_string()))
    }
}

/// A referee's verdict on a lift.
///
/// `White` is a good lift; the three colours are distinct no-lift reasons.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    White,
    Red,
    Blue,
    Yellow,
}

/// All decisions, good lift first.
pub const ALL_DECISIONS: [Decision; 4] = [
    Decision::White,
    Decision::Red,
    Decision::Blue,
    Decision::Yellow,
];

impl Decision {
    /// Wire token for this decision.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
        }
    }

    /// Whether this decision passes the lift.
    #[must_use]
    pub const fn is_good_lift(&self) -> bool {
        matches!(self, Self::White)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Decision {
    type Err = ParseDecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_DECISIONS
            .into_iter()
            .find(|decision| decision.as_str() == s)
            .ok_or_else(|| ParseDecisionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_tokens_parse() {
        for position in ALL_POSITIONS {
            assert_eq!(position.as_str().parse::<Position>(), Ok(position));
        }
    }

    #[test]
    fn test_position_parse_is_exact() {
        assert!("LEFT".parse::<Position>().is_err());
        assert!(" left".parse::<Position>().is_err());
        assert!("".parse::<Position>().is_err());
        assert!("center".parse::<Position>().is_err());
    }

    #[test]
    fn test_decision_tokens_parse() {
        for decision in ALL_DECISIONS {
            assert_eq!(decision.to_string().parse::<Decision>(), Ok(decision));
        }
        assert!("green".parse::<Decision>().is_err());
    }

    #[test]
    fn test_only_white_is_good_lift() {
        let good: Vec<_> = ALL_DECISIONS
            .iter()
            .filter(|decision| decision.is_good_lift())
            .collect();
        assert_eq!(good, vec![&Decision::White]);
    }

    #[test]
    fn test_positions_sort_in_seat_order() {
        let mut positions = vec![Position::Right, Position::Left, Position::Chief];
        positions.sort();
        assert_eq!(positions, ALL_POSITIONS.to_vec());
    }

    #[test]
    fn test_serde_uses_wire_tokens() {
        assert_eq!(serde_json::to_string(&Position::Chief).unwrap(), "\"chief\"");
        assert_eq!(serde_json::to_string(&Decision::Yellow).unwrap(), "\"yellow\"");
        let decision: Decision = serde_json::from_str("\"blue\"").unwrap();
        assert_eq!(decision, Decision::Blue);
    }
}
