//! Short-lived combat effects.
//!
//! Effects carry no gameplay weight. They exist so a renderer can show hits
//! and deaths, and they expire on their own.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::team::TeamId;

/// Draw order shared by every effect.
pub const EFFECT_Z_INDEX: i32 = 20;

/// Effect flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// A landed attack.
    Hit,
    /// An agent dying.
    Death,
}

impl EffectKind {
    /// Radius in world units.
    #[must_use]
    pub fn radius(self) -> Fixed {
        match self {
            EffectKind::Hit => Fixed::from_num(20),
            EffectKind::Death => Fixed::from_num(30),
        }
    }

    /// Seconds the effect lives.
    #[must_use]
    pub fn lifetime(self) -> Fixed {
        match self {
            EffectKind::Hit => Fixed::from_num(0.3),
            EffectKind::Death => Fixed::from_num(0.8),
        }
    }
}

/// One live effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatEffect {
    /// Sequence number.
    pub id: u32,
    /// Flavour.
    pub kind: EffectKind,
    /// Where it happened.
    pub position: Vec2Fixed,
    /// Team of the agent that was hit or died.
    pub team: TeamId,
    /// Seconds left.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
}

impl CombatEffect {
    /// Remaining life as a fraction in `[0, 1]`.
    #[must_use]
    pub fn opacity(&self) -> Fixed {
        (self.remaining / self.kind.lifetime()).clamp(Fixed::ZERO, Fixed::ONE)
    }

    /// Radius at the current point of the animation. Effects grow as they
    /// fade.
    #[must_use]
    pub fn current_radius(&self) -> Fixed {
        self.kind.radius() * (Fixed::ONE - self.opacity() / 2)
    }
}

/// Collection of live effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatEffects {
    effects: Vec<CombatEffect>,
    next_id: u32,
}

impl CombatEffects {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(&mut self, kind: EffectKind, position: Vec2Fixed, team: TeamId) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.effects.push(CombatEffect {
            id,
            kind,
            position,
            team,
            remaining: kind.lifetime(),
        });
        id
    }

    /// Record a hit.
    pub fn spawn_hit(&mut self, position: Vec2Fixed, team: TeamId) -> u32 {
        self.spawn(EffectKind::Hit, position, team)
    }

    /// Record a death.
    pub fn spawn_death(&mut self, position: Vec2Fixed, team: TeamId) -> u32 {
        self.spawn(EffectKind::Death, position, team)
    }

    /// Age every effect by `dt` and drop the expired ones.
    pub fn update(&mut self, dt: Fixed) {
        for i in (0..self.effects.len()).rev() {
            self.effects[i].remaining -= dt;
            if self.effects[i].remaining <= Fixed::ZERO {
                self.effects.remove(i);
            }
        }
    }

    /// Live effects, oldest first.
    #[must_use]
    pub fn effects(&self) -> &[CombatEffect] {
        &self.effects
    }

    /// Number of live effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether nothing is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
