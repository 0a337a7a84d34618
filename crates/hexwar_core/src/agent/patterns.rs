//! Procedural waypoint routes.
//!
//! A pattern is regenerated from the agent's current position every time it
//! is selected, so cycling through the same pool never replays a route.
//! Directions come from the 16-way table in [`crate::math::heading`].

use serde::{Deserialize, Serialize};

use super::stats::Role;
use crate::math::{heading, Fixed, Vec2Fixed, HEADING_COUNT};
use crate::rng::SimRng;

/// Geometry facts a pattern generator may need beyond the agent itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternContext {
    /// Play area size; waypoints are clamped into it.
    pub world: Vec2Fixed,
    /// Own base center.
    pub own_base: Option<Vec2Fixed>,
    /// Enemy base center.
    pub enemy_base: Option<Vec2Fixed>,
}

impl PatternContext {
    /// Context without bases.
    #[must_use]
    pub const fn open(world: Vec2Fixed) -> Self {
        Self {
            world,
            own_base: None,
            enemy_base: None,
        }
    }
}

/// Route generator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPattern {
    /// Out-and-back along one heading.
    Patrol,
    /// A handful of short random legs.
    RandomWalk,
    /// Loop around a nearby center.
    Circle,
    /// Long legs biased towards one heading.
    Exploration,
    /// Loop around the own base.
    BaseOrbit,
    /// Legs from here to the enemy base.
    Approach,
}

impl MovementPattern {
    /// Patterns a role cycles through.
    #[must_use]
    pub fn pool(role: Role) -> &'static [MovementPattern] {
        use MovementPattern::{Approach, BaseOrbit, Circle, Exploration, Patrol, RandomWalk};
        match role {
            Role::Collector => &[Patrol, RandomWalk],
            Role::Explorer => &[Patrol, RandomWalk, Circle, Exploration],
            Role::Defender => &[Patrol, RandomWalk, BaseOrbit],
            Role::Attacker => &[Patrol, RandomWalk, Approach],
        }
    }

    /// Whether the route runs back along itself instead of looping.
    #[must_use]
    pub const fn reverses(self) -> bool {
        matches!(self, MovementPattern::Patrol)
    }

    /// Generate waypoints starting from `origin`.
    pub fn generate(self, origin: Vec2Fixed, ctx: &PatternContext, rng: &mut SimRng) -> Vec<Vec2Fixed> {
        let waypoints = match self {
            MovementPattern::Patrol => patrol(origin, rng),
            MovementPattern::RandomWalk => random_walk(origin, rng),
            MovementPattern::Circle => circle(origin, rng),
            MovementPattern::Exploration => exploration(origin, rng),
            MovementPattern::BaseOrbit => {
                let center = ctx.own_base.unwrap_or(origin);
                orbit(center, rng)
            }
            MovementPattern::Approach => match ctx.enemy_base {
                Some(target) => approach(origin, target),
                None => random_walk(origin, rng),
            },
        };
        waypoints.into_iter().map(|p| p.clamp_to(ctx.world)).collect()
    }
}

fn random_heading(rng: &mut SimRng) -> i64 {
    rng.index(HEADING_COUNT) as i64
}

fn roll(rng: &mut SimRng, min: i32, max: i32) -> Fixed {
    rng.range_fixed(Fixed::from_num(min), Fixed::from_num(max))
}

fn patrol(origin: Vec2Fixed, rng: &mut SimRng) -> Vec<Vec2Fixed> {
    let distance = roll(rng, 100, 200);
    let end = origin + heading(random_heading(rng)).scale(distance);
    vec![origin, end]
}

fn random_walk(origin: Vec2Fixed, rng: &mut SimRng) -> Vec<Vec2Fixed> {
    let mut points = vec![origin];
    let mut last = origin;
    for _ in 0..5 {
        let dir = heading(random_heading(rng));
        last = last + dir.scale(roll(rng, 70, 150));
        points.push(last);
    }
    points
}

fn loop_around(center: Vec2Fixed, radius: Fixed) -> Vec<Vec2Fixed> {
    // 8 segments, closing back on the first point
    let step = (HEADING_COUNT / 8) as i64;
    (0..=8)
        .map(|i| center + heading(i * step).scale(radius))
        .collect()
}

fn circle(origin: Vec2Fixed, rng: &mut SimRng) -> Vec<Vec2Fixed> {
    let center = origin + Vec2Fixed::new(roll(rng, -50, 50), roll(rng, -50, 50));
    let radius = roll(rng, 50, 100);
    loop_around(center, radius)
}

fn orbit(center: Vec2Fixed, rng: &mut SimRng) -> Vec<Vec2Fixed> {
    let radius = roll(rng, 80, 140);
    loop_around(center, radius)
}

fn exploration(origin: Vec2Fixed, rng: &mut SimRng) -> Vec<Vec2Fixed> {
    let main = random_heading(rng);
    let mut points = vec![origin];
    let mut last = origin;
    for _ in 0..8 {
        // Two table steps either side is +-45 degrees
        let jitter = rng.index(5) as i64 - 2;
        last = last + heading(main + jitter).scale(roll(rng, 100, 250));
        points.push(last);
    }
    points
}

fn approach(origin: Vec2Fixed, target: Vec2Fixed) -> Vec<Vec2Fixed> {
    let third = Fixed::ONE / 3;
    vec![
        origin,
        origin.lerp(target, third),
        origin.lerp(target, third * 2),
        target,
    ]
}
