//! Facts a team shares between its agents.
//!
//! Every entry carries a confidence in `[0, 1]`. A sighting resets it to 1,
//! time wears it down, and entries that fall below the eviction threshold
//! are forgotten.

use serde::{Deserialize, Serialize};

use super::perception::Perception;
use crate::hex_grid::ResourceType;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::rng::SimRng;

/// Sightings closer than this to a known entry refresh it instead of
/// adding a new one.
const MERGE_RADIUS: i32 = 50;

/// Smallest pile remembered as a hotspot.
pub const HOTSPOT_MIN_AMOUNT: u32 = 3;

/// A remembered resource pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnownHotspot {
    /// Where it was seen.
    pub position: Vec2Fixed,
    /// Kind.
    pub resource_type: ResourceType,
    /// Amount when last seen.
    pub amount: u32,
    /// Confidence in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub confidence: Fixed,
}

/// A place where enemies were seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DangerZone {
    /// Center of the sighting.
    pub position: Vec2Fixed,
    /// Number of enemies seen.
    pub threat: u32,
    /// Confidence in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub confidence: Fixed,
}

/// Where the enemy base is believed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnownBase {
    /// Believed position.
    pub position: Vec2Fixed,
    /// Confidence in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub confidence: Fixed,
}

/// Shared knowledge of one team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamKnowledge {
    hotspots: Vec<KnownHotspot>,
    danger_zones: Vec<DangerZone>,
    enemy_base: Option<KnownBase>,
}

fn near(a: Vec2Fixed, b: Vec2Fixed) -> bool {
    let radius = Fixed::from_num(MERGE_RADIUS);
    a.distance_squared(b) <= radius * radius
}

impl TeamKnowledge {
    /// Nothing known.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember or refresh a resource pile.
    pub fn record_hotspot(&mut self, position: Vec2Fixed, resource_type: ResourceType, amount: u32) {
        if let Some(entry) = self.hotspots.iter_mut().find(|h| near(h.position, position)) {
            entry.position = position;
            entry.resource_type = resource_type;
            entry.amount = amount;
            entry.confidence = Fixed::ONE;
            return;
        }
        self.hotspots.push(KnownHotspot {
            position,
            resource_type,
            amount,
            confidence: Fixed::ONE,
        });
    }

    /// Remember or refresh a danger zone.
    pub fn record_danger(&mut self, position: Vec2Fixed, threat: u32) {
        if let Some(entry) = self.danger_zones.iter_mut().find(|d| near(d.position, position)) {
            entry.position = position;
            entry.threat = threat;
            entry.confidence = Fixed::ONE;
            return;
        }
        self.danger_zones.push(DangerZone {
            position,
            threat,
            confidence: Fixed::ONE,
        });
    }

    /// Remember where the enemy base is.
    pub fn record_enemy_base(&mut self, position: Vec2Fixed) {
        self.enemy_base = Some(KnownBase {
            position,
            confidence: Fixed::ONE,
        });
    }

    /// Fold one agent's observations into the shared picture.
    pub fn absorb(&mut self, perception: &Perception) {
        for resource in &perception.resources {
            if resource.amount >= HOTSPOT_MIN_AMOUNT {
                self.record_hotspot(resource.position, resource.resource_type, resource.amount);
            }
        }
        if !perception.enemies.is_empty() {
            let count = perception.enemies.len();
            let mut sum = Vec2Fixed::ZERO;
            for enemy in &perception.enemies {
                sum = sum + enemy.position;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let center = sum.scale(Fixed::ONE / Fixed::from_num(count as i32));
            #[allow(clippy::cast_possible_truncation)]
            self.record_danger(center, count as u32);
        }
        if let Some(position) = perception.enemy_base_seen {
            self.record_enemy_base(position);
        }
    }

    /// Lose `rate × dt` confidence everywhere and drop entries below
    /// `evict_below`.
    pub fn decay(&mut self, dt: Fixed, rate: Fixed, evict_below: Fixed) {
        let loss = rate * dt;
        for hotspot in &mut self.hotspots {
            hotspot.confidence = (hotspot.confidence - loss).max(Fixed::ZERO);
        }
        for zone in &mut self.danger_zones {
            zone.confidence = (zone.confidence - loss).max(Fixed::ZERO);
        }
        self.hotspots.retain(|h| h.confidence >= evict_below);
        self.danger_zones.retain(|d| d.confidence >= evict_below);

        if let Some(base) = &mut self.enemy_base {
            base.confidence = (base.confidence - loss).max(Fixed::ZERO);
            if base.confidence < evict_below {
                self.enemy_base = None;
            }
        }
    }

    /// Known piles.
    #[must_use]
    pub fn hotspots(&self) -> &[KnownHotspot] {
        &self.hotspots
    }

    /// Known danger zones.
    #[must_use]
    pub fn danger_zones(&self) -> &[DangerZone] {
        &self.danger_zones
    }

    /// Believed enemy base.
    #[must_use]
    pub fn enemy_base(&self) -> Option<Vec2Fixed> {
        self.enemy_base.map(|b| b.position)
    }

    /// Most promising pile: largest `amount × confidence`, nearest on ties.
    #[must_use]
    pub fn best_hotspot(&self, from: Vec2Fixed) -> Option<Vec2Fixed> {
        self.hotspots
            .iter()
            .max_by(|a, b| {
                let score_a = a.confidence * Fixed::from_num(a.amount);
                let score_b = b.confidence * Fixed::from_num(b.amount);
                score_a
                    .cmp(&score_b)
                    .then_with(|| b.position.distance_squared(from).cmp(&a.position.distance_squared(from)))
            })
            .map(|h| h.position)
    }

    /// A random danger zone.
    pub fn random_danger_zone(&self, rng: &mut SimRng) -> Option<Vec2Fixed> {
        if self.danger_zones.is_empty() {
            return None;
        }
        Some(self.danger_zones[rng.index(self.danger_zones.len())].position)
    }

    /// Whether nothing is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hotspots.is_empty() && self.danger_zones.is_empty() && self.enemy_base.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay_secs(knowledge: &mut TeamKnowledge, secs: i32) {
        let dt = Fixed::ONE / 10;
        for _ in 0..secs * 10 {
            knowledge.decay(dt, Fixed::from_num(0.05), Fixed::from_num(0.2));
        }
    }

    #[test]
    fn test_nearby_sighting_refreshes_entry() {
        let mut knowledge = TeamKnowledge::new();
        knowledge.record_hotspot(Vec2Fixed::from_num(100, 100), ResourceType::Energy, 4);
        knowledge.record_hotspot(Vec2Fixed::from_num(120, 100), ResourceType::Energy, 5);
        knowledge.record_hotspot(Vec2Fixed::from_num(400, 100), ResourceType::Data, 3);
        assert_eq!(knowledge.hotspots().len(), 2);
        assert_eq!(knowledge.hotspots()[0].amount, 5);
    }

    #[test]
    fn test_confidence_decays_and_evicts() {
        let mut knowledge = TeamKnowledge::new();
        knowledge.record_danger(Vec2Fixed::from_num(50, 50), 2);
        knowledge.record_enemy_base(Vec2Fixed::from_num(700, 500));

        decay_secs(&mut knowledge, 10);
        let zone = knowledge.danger_zones()[0];
        assert!(zone.confidence > Fixed::from_num(0.49) && zone.confidence < Fixed::from_num(0.51));

        // 1.0 - 0.05·16 = 0.2 still survives, a little more does not
        decay_secs(&mut knowledge, 7);
        assert!(knowledge.danger_zones().is_empty());
        assert!(knowledge.enemy_base().is_none());
        assert!(knowledge.is_empty());
    }

    #[test]
    fn test_refresh_restores_confidence() {
        let mut knowledge = TeamKnowledge::new();
        knowledge.record_enemy_base(Vec2Fixed::from_num(700, 500));
        decay_secs(&mut knowledge, 10);
        knowledge.record_enemy_base(Vec2Fixed::from_num(700, 500));
        decay_secs(&mut knowledge, 10);
        assert_eq!(knowledge.enemy_base(), Some(Vec2Fixed::from_num(700, 500)));
    }

    #[test]
    fn test_best_hotspot_weighs_amount_and_confidence() {
        let mut knowledge = TeamKnowledge::new();
        knowledge.record_hotspot(Vec2Fixed::from_num(100, 100), ResourceType::Energy, 5);
        decay_secs(&mut knowledge, 10);
        knowledge.record_hotspot(Vec2Fixed::from_num(500, 100), ResourceType::Data, 3);
        // 5 · 0.5 < 3 · 1.0
        assert_eq!(
            knowledge.best_hotspot(Vec2Fixed::ZERO),
            Some(Vec2Fixed::from_num(500, 100))
        );
    }
}
