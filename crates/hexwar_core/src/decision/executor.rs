//! Turns decisions into agent intent.
//!
//! Planning only reads the [`Perception`]; applying the resulting
//! [`Intent`] is the one place the decision layer touches an agent. Every
//! movement point is clamped into the world.

use super::action::{ActionKind, Decision, TargetDescriptor};
use super::perception::{Perception, SeenAgent, SeenResource};
use crate::agent::{Agent, AgentId};
use crate::math::{heading, Fixed, Vec2Fixed, HEADING_COUNT};
use crate::rng::SimRng;

/// Distance a fleeing agent puts between itself and the nearest enemy.
const FLEE_DISTANCE: i32 = 200;

/// How far towards the far side a scout aims when the enemy base is
/// unknown, as a fraction of the center-to-base vector.
const SCOUT_REACH: f64 = 0.8;

/// What an agent should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Walk to a point.
    MoveTo(Vec2Fixed),
    /// Chase and fight an agent.
    Engage {
        /// Enemy id.
        target: AgentId,
        /// Where the enemy was seen.
        position: Vec2Fixed,
    },
    /// Keep the current behavior.
    Hold,
}

/// Stateless decision interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor;

fn random_offset(rng: &mut SimRng, min: i32, max: i32) -> Vec2Fixed {
    let direction = heading(rng.index(HEADING_COUNT) as i64);
    direction.scale(rng.range_fixed(Fixed::from_num(min), Fixed::from_num(max)))
}

fn weakest(agents: &[SeenAgent]) -> Option<&SeenAgent> {
    // min_by_key keeps the first minimum, which is the nearest on ties
    agents.iter().min_by_key(|a| a.health_fraction)
}

impl ActionExecutor {
    /// Work out the intent for `decision`.
    pub fn plan(decision: &Decision, perception: &Perception, rng: &mut SimRng) -> Intent {
        let me = perception.agent.position;
        let base = perception.own_base;
        let world = perception.world;
        let center = world.scale(Fixed::ONE / 2);
        let to = |point: Vec2Fixed| Intent::MoveTo(point.clamp_to(world));

        match (decision.action, decision.target) {
            (ActionKind::Continue, _) => Intent::Hold,

            (ActionKind::ReturnToBase | ActionKind::Heal, _) => to(base),

            (ActionKind::Explore, TargetDescriptor::ResourceRich) => match perception.knowledge.best_hotspot(me) {
                Some(spot) => to(spot),
                None => to(me + random_offset(rng, 150, 250)),
            },
            (ActionKind::Explore, TargetDescriptor::Unexplored) => to(me + random_offset(rng, 200, 300)),
            (ActionKind::Explore, _) => to(me + random_offset(rng, 100, 200)),

            (ActionKind::Collect, target) => {
                if perception.agent.resource_amount >= perception.agent.capacity {
                    return to(base);
                }
                let chosen = match target {
                    TargetDescriptor::MostValuable => perception
                        .resources
                        .iter()
                        .fold(None, |best: Option<&SeenResource>, r| match best {
                            Some(b) if b.amount >= r.amount => Some(b),
                            _ => Some(r),
                        }),
                    TargetDescriptor::Kind(kind) => perception.resources.iter().find(|r| r.resource_type == kind),
                    _ => perception.resources.first(),
                };
                match chosen {
                    Some(resource) => to(resource.position),
                    None => Self::plan(
                        &Decision::new(ActionKind::Explore, TargetDescriptor::ResourceRich, ""),
                        perception,
                        rng,
                    ),
                }
            }

            (ActionKind::Attack, target) => {
                let enemies = &perception.enemies;
                let chosen = match target {
                    TargetDescriptor::WeakestEnemy => weakest(enemies),
                    TargetDescriptor::ResourceCarrier => {
                        enemies.iter().find(|e| e.is_carrying).or_else(|| enemies.first())
                    }
                    _ => enemies.first(),
                };
                match chosen {
                    Some(enemy) => Intent::Engage {
                        target: enemy.id,
                        position: enemy.position,
                    },
                    None => Self::plan(
                        &Decision::new(ActionKind::ScoutEnemy, TargetDescriptor::EnemyTerritory, ""),
                        perception,
                        rng,
                    ),
                }
            }

            (ActionKind::Flee, TargetDescriptor::FromEnemies) => match perception.enemies.first() {
                Some(enemy) => {
                    let away = (me - enemy.position).normalize();
                    let away = if away == Vec2Fixed::ZERO {
                        heading(rng.index(HEADING_COUNT) as i64)
                    } else {
                        away
                    };
                    to(me + away.scale(Fixed::from_num(FLEE_DISTANCE)))
                }
                None => to(me + random_offset(rng, 100, 200)),
            },
            (ActionKind::Flee, TargetDescriptor::Ally) => match perception.allies.first() {
                Some(ally) => to(ally.position),
                None => to(base),
            },
            (ActionKind::Flee, _) => to(base),

            (ActionKind::ClaimTerritory, TargetDescriptor::Enemy) => {
                let enemy_base = perception
                    .knowledge
                    .enemy_base()
                    .or(perception.enemy_base_seen)
                    .unwrap_or(world - base);
                to(enemy_base)
            }
            (ActionKind::ClaimTerritory, TargetDescriptor::Frontier) => to(base + random_offset(rng, 100, 150)),
            (ActionKind::ClaimTerritory, _) => to(base + random_offset(rng, 150, 300)),

            (ActionKind::ScoutEnemy, TargetDescriptor::DangerZone) => {
                match perception.knowledge.random_danger_zone(rng) {
                    Some(zone) => to(zone),
                    None => to(me + random_offset(rng, 100, 200)),
                }
            }
            (ActionKind::ScoutEnemy, _) => {
                let guess = perception
                    .knowledge
                    .enemy_base()
                    .or(perception.enemy_base_seen)
                    .unwrap_or_else(|| center + (center - base).scale(Fixed::from_num(SCOUT_REACH)));
                to(guess)
            }

            (ActionKind::Defend, TargetDescriptor::Ally) => match weakest(&perception.allies) {
                Some(ally) => to(ally.position),
                None => to(base),
            },
            (ActionKind::Defend, TargetDescriptor::Territory) => to(base + random_offset(rng, 80, 120)),
            (ActionKind::Defend, _) => to(base + random_offset(rng, 30, 50)),
        }
    }

    /// Point the agent at `intent`.
    pub fn apply(intent: Intent, agent: &mut Agent, world: Vec2Fixed) {
        match intent {
            Intent::Hold => {}
            Intent::MoveTo(point) => {
                agent.disengage();
                agent.set_target(point, world);
            }
            Intent::Engage { target, position } => {
                agent.is_attacking = true;
                agent.target = Some(target);
                agent.set_target(position, world);
            }
        }
    }

    /// Plan and apply in one go.
    pub fn execute(decision: &Decision, perception: &Perception, agent: &mut Agent, rng: &mut SimRng) -> Intent {
        let intent = Self::plan(decision, perception, rng);
        Self::apply(intent, agent, perception.world);
        intent
    }
}
