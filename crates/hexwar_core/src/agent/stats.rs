//! Roles, attribute vectors and derived stats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};
use crate::rng::SimRng;

/// Agent specialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Gathers resources; avoids fights while carrying.
    Collector,
    /// Fast, fragile and always curious.
    Explorer,
    /// Slow and tough; orbits its own base.
    Defender,
    /// Hard-hitting; heads for the enemy base.
    Attacker,
}

impl Role {
    /// All roles.
    pub const ALL: [Role; 4] = [Role::Collector, Role::Explorer, Role::Defender, Role::Attacker];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Role::Collector => "collector",
            Role::Explorer => "explorer",
            Role::Defender => "defender",
            Role::Attacker => "attacker",
        }
    }

    /// Attribute vector used when none is supplied.
    #[must_use]
    pub fn default_attributes(self) -> AttributeVector {
        let (speed, health, attack, defense, carry) = match self {
            Role::Collector => (0.6, 0.5, 0.3, 0.5, 0.8),
            Role::Explorer => (0.8, 0.4, 0.4, 0.3, 0.3),
            Role::Defender => (0.3, 0.9, 0.6, 0.9, 0.2),
            Role::Attacker => (0.7, 0.6, 0.9, 0.4, 0.1),
        };
        AttributeVector::from_f64(speed, health, attack, defense, carry)
    }

    /// Vision radius in world units.
    #[must_use]
    pub fn vision_range(self) -> Fixed {
        Fixed::from_num(match self {
            Role::Collector => 120,
            Role::Explorer => 180,
            Role::Defender => 140,
            Role::Attacker => 150,
        })
    }

    /// Body radius in world units.
    #[must_use]
    pub fn radius(self) -> Fixed {
        Fixed::from_num(match self {
            Role::Collector => 14,
            Role::Explorer => 10,
            Role::Defender => 16,
            Role::Attacker => 12,
        })
    }

    /// Roll how long a movement pattern lasts.
    pub fn roll_pattern_duration(self, rng: &mut SimRng) -> Fixed {
        let (min, max) = match self {
            Role::Collector => (15, 25),
            Role::Explorer => (8, 15),
            Role::Defender => (12, 20),
            Role::Attacker => (10, 18),
        };
        rng.range_fixed(Fixed::from_num(min), Fixed::from_num(max))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Normalised attribute vector. Every component lies in `[0.1, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeVector {
    /// Movement speed and attack rate.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Attack power.
    #[serde(with = "fixed_serde")]
    pub attack: Fixed,
    /// Damage mitigation.
    #[serde(with = "fixed_serde")]
    pub defense: Fixed,
    /// Carry capacity.
    #[serde(with = "fixed_serde")]
    pub carry: Fixed,
}

impl AttributeVector {
    /// Lowest allowed component.
    pub const MIN: f64 = 0.1;
    /// Highest allowed component.
    pub const MAX: f64 = 1.0;

    /// Build a vector, clamping each component into range.
    #[must_use]
    pub fn new(speed: Fixed, health: Fixed, attack: Fixed, defense: Fixed, carry: Fixed) -> Self {
        let clamp = |v: Fixed| v.clamp(Fixed::from_num(Self::MIN), Fixed::from_num(Self::MAX));
        Self {
            speed: clamp(speed),
            health: clamp(health),
            attack: clamp(attack),
            defense: clamp(defense),
            carry: clamp(carry),
        }
    }

    /// Build from floats (config and test convenience).
    #[must_use]
    pub fn from_f64(speed: f64, health: f64, attack: f64, defense: f64, carry: f64) -> Self {
        Self::new(
            Fixed::from_num(speed),
            Fixed::from_num(health),
            Fixed::from_num(attack),
            Fixed::from_num(defense),
            Fixed::from_num(carry),
        )
    }

    /// Sum of all components.
    #[must_use]
    pub fn sum(&self) -> Fixed {
        self.speed + self.health + self.attack + self.defense + self.carry
    }
}

/// Map `attr` in `[0, 1]` linearly onto `[min, max]`.
fn lerp_stat(attr: Fixed, min: i32, max: i32) -> Fixed {
    Fixed::from_num(min) + attr * Fixed::from_num(max - min)
}

/// Stats derived once from role and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentStats {
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Health cap.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
    /// Raw damage per hit.
    #[serde(with = "fixed_serde")]
    pub attack_power: Fixed,
    /// Mitigation; a fifth of it is subtracted from every hit.
    #[serde(with = "fixed_serde")]
    pub defense: Fixed,
    /// Vision radius.
    #[serde(with = "fixed_serde")]
    pub vision_range: Fixed,
    /// Body radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Seconds between attacks.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown_max: Fixed,
    /// Resource units carried at most.
    pub capacity: u32,
}

impl AgentStats {
    /// Derive stats for `role` with attributes `attrs`.
    #[must_use]
    pub fn derive(role: Role, attrs: &AttributeVector) -> Self {
        let capacity = lerp_stat(attrs.carry, 1, 10).round().to_num::<u32>();
        Self {
            speed: lerp_stat(attrs.speed, 40, 160),
            max_health: lerp_stat(attrs.health, 50, 150),
            attack_power: lerp_stat(attrs.attack, 4, 24),
            defense: lerp_stat(attrs.defense, 0, 20),
            vision_range: role.vision_range(),
            radius: role.radius(),
            attack_cooldown_max: Fixed::from_num(1.6) - Fixed::from_num(0.8) * attrs.speed,
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_clamped() {
        let attrs = AttributeVector::from_f64(0.0, 2.0, -1.0, 0.5, 1.0);
        assert_eq!(attrs.speed, Fixed::from_num(0.1));
        assert_eq!(attrs.health, Fixed::ONE);
        assert_eq!(attrs.attack, Fixed::from_num(0.1));
        assert_eq!(attrs.defense, Fixed::from_num(0.5));
    }

    #[test]
    fn test_stat_ranges() {
        let max = AgentStats::derive(Role::Attacker, &AttributeVector::from_f64(1.0, 1.0, 1.0, 1.0, 1.0));
        assert_eq!(max.speed, Fixed::from_num(160));
        assert_eq!(max.max_health, Fixed::from_num(150));
        assert_eq!(max.attack_power, Fixed::from_num(24));
        assert_eq!(max.defense, Fixed::from_num(20));
        assert_eq!(max.capacity, 10);
        assert_eq!(max.attack_cooldown_max, Fixed::from_num(0.8));
    }

    #[test]
    fn test_collector_carries_more_than_attacker() {
        let collector = AgentStats::derive(Role::Collector, &Role::Collector.default_attributes());
        let attacker = AgentStats::derive(Role::Attacker, &Role::Attacker.default_attributes());
        assert!(collector.capacity > attacker.capacity);
        assert!(attacker.attack_power > collector.attack_power);
        assert_eq!(collector.radius, Fixed::from_num(14));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("DEFENDER".parse::<Role>(), Ok(Role::Defender));
        assert_eq!(" explorer ".parse::<Role>(), Ok(Role::Explorer));
        assert!("wizard".parse::<Role>().is_err());
    }

    #[test]
    fn test_pattern_duration_in_role_range() {
        let mut rng = SimRng::new(11);
        for _ in 0..50 {
            let d = Role::Explorer.roll_pattern_duration(&mut rng);
            assert!(d >= Fixed::from_num(8) && d < Fixed::from_num(15));
        }
    }
}
