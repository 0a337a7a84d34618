//! Team identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// One of the two competing teams.
///
/// Team 1 owns negative control levels, team 2 positive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamId {
    /// Team 1, bases in the top-left corner.
    One,
    /// Team 2, bases in the bottom-right corner.
    Two,
}

impl TeamId {
    /// Both teams in evaluation order.
    pub const ALL: [TeamId; 2] = [TeamId::One, TeamId::Two];

    /// Numeric team id (1 or 2).
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            TeamId::One => 1,
            TeamId::Two => 2,
        }
    }

    /// Parse a numeric team id.
    #[must_use]
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(TeamId::One),
            2 => Some(TeamId::Two),
            _ => None,
        }
    }

    /// Zero-based index for per-team arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            TeamId::One => 0,
            TeamId::Two => 1,
        }
    }

    /// The other team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            TeamId::One => TeamId::Two,
            TeamId::Two => TeamId::One,
        }
    }

    /// Sign of this team's control levels.
    #[must_use]
    pub fn sign(self) -> Fixed {
        match self {
            TeamId::One => -Fixed::ONE,
            TeamId::Two => Fixed::ONE,
        }
    }

    /// Team owning a control level, if it exceeds `threshold` in magnitude.
    #[must_use]
    pub fn owning(control: Fixed, threshold: Fixed) -> Option<Self> {
        if control < -threshold {
            Some(TeamId::One)
        } else if control > threshold {
            Some(TeamId::Two)
        } else {
            None
        }
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_round_trip() {
        for team in TeamId::ALL {
            assert_eq!(TeamId::from_number(team.number()), Some(team));
        }
        assert_eq!(TeamId::from_number(3), None);
    }

    #[test]
    fn test_team_one_is_negative() {
        assert!(TeamId::One.sign() < Fixed::ZERO);
        assert!(TeamId::Two.sign() > Fixed::ZERO);
        assert_eq!(TeamId::One.opponent(), TeamId::Two);
    }

    #[test]
    fn test_owning_respects_threshold() {
        let threshold = Fixed::from_num(0.2);
        assert_eq!(TeamId::owning(Fixed::from_num(-0.5), threshold), Some(TeamId::One));
        assert_eq!(TeamId::owning(Fixed::from_num(0.21), threshold), Some(TeamId::Two));
        assert_eq!(TeamId::owning(Fixed::from_num(0.2), threshold), None);
        assert_eq!(TeamId::owning(Fixed::ZERO, threshold), None);
    }
}
