//! Per-agent state machine.
//!
//! An agent is always in one of three overlapping states: following its
//! movement pattern, attacking a target (which suspends the pattern), and
//! healing near its own base. Cross-agent interaction (target acquisition,
//! damage, pickup and deposit) is driven by
//! [`crate::agent_system::AgentSystem`]; this module only mutates the agent
//! itself.

mod patterns;
mod stats;

pub use patterns::{MovementPattern, PatternContext};
pub use stats::{AgentStats, AttributeVector, Role};

use serde::{Deserialize, Serialize};

use crate::collision;
use crate::config::AgentTuning;
use crate::hex_grid::{HexCell, HexGrid, ResourceType};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::rng::SimRng;
use crate::team::TeamId;

/// Unique agent identifier. Never reused within a world.
pub type AgentId = u32;

/// Seconds the hit flash stays visible.
const DAMAGE_FLASH_SECS: f64 = 0.2;

/// Waypoint-following state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Movement {
    /// Current route.
    pub waypoints: Vec<Vec2Fixed>,
    /// Index of the waypoint being approached.
    pub index: usize,
    /// Index into the role's pattern pool.
    pub pattern_index: usize,
    /// Seconds spent on the current pattern.
    #[serde(with = "fixed_serde")]
    pub pattern_time: Fixed,
    /// Seconds before switching to the next pattern.
    #[serde(with = "fixed_serde")]
    pub pattern_duration: Fixed,
    /// Point set by an explicit order, if any.
    pub direct_target: Option<Vec2Fixed>,
}

/// An autonomous agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    /// Identifier.
    pub id: AgentId,
    /// Owning team.
    pub team: TeamId,
    /// Role.
    pub role: Role,
    /// Attributes the stats were derived from.
    pub attributes: AttributeVector,
    /// Derived stats.
    pub stats: AgentStats,
    /// World position.
    pub position: Vec2Fixed,
    /// Current health; the agent is dead at or below zero.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Whether the agent is engaged with [`Self::target`].
    pub is_attacking: bool,
    /// Engaged enemy. Not owning; revalidated every tick.
    pub target: Option<AgentId>,
    /// Seconds until the next attack is allowed.
    #[serde(with = "fixed_serde")]
    pub attack_cooldown: Fixed,
    /// Seconds left on the hit flash.
    #[serde(with = "fixed_serde")]
    pub damage_flash: Fixed,
    /// Kind of resource carried.
    pub carried: Option<ResourceType>,
    /// Units carried; never above `stats.capacity`.
    pub resource_amount: u32,
    /// Whether the agent is inside its base's healing range.
    pub is_healing: bool,
    #[serde(with = "fixed_serde")]
    heal_timer: Fixed,
    /// Route state.
    pub movement: Movement,
}

impl Agent {
    /// Create an agent at `position` and lay out its first route.
    ///
    /// `attributes` defaults to the role's preset.
    pub fn new(
        id: AgentId,
        team: TeamId,
        role: Role,
        position: Vec2Fixed,
        attributes: Option<AttributeVector>,
        ctx: &PatternContext,
        rng: &mut SimRng,
    ) -> Self {
        let attributes = attributes.unwrap_or_else(|| role.default_attributes());
        let stats = AgentStats::derive(role, &attributes);
        let pool = MovementPattern::pool(role);
        let movement = Movement {
            waypoints: Vec::new(),
            index: 0,
            pattern_index: rng.index(pool.len()),
            pattern_time: Fixed::ZERO,
            pattern_duration: role.roll_pattern_duration(rng),
            direct_target: None,
        };
        let mut agent = Self {
            id,
            team,
            role,
            attributes,
            stats,
            position,
            health: stats.max_health,
            is_attacking: false,
            target: None,
            attack_cooldown: Fixed::ZERO,
            damage_flash: Fixed::ZERO,
            carried: None,
            resource_amount: 0,
            is_healing: false,
            heal_timer: Fixed::ZERO,
            movement,
        };
        agent.setup_pattern(ctx, rng);
        agent
    }

    /// Health above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > Fixed::ZERO
    }

    /// Health as a fraction of the maximum.
    #[must_use]
    pub fn health_fraction(&self) -> Fixed {
        if self.stats.max_health == Fixed::ZERO {
            return Fixed::ZERO;
        }
        (self.health / self.stats.max_health).max(Fixed::ZERO)
    }

    /// Whether the agent holds any resource.
    #[must_use]
    pub fn is_carrying(&self) -> bool {
        self.carried.is_some() && self.resource_amount > 0
    }

    /// Pattern currently driving the route.
    #[must_use]
    pub fn current_pattern(&self) -> MovementPattern {
        let pool = MovementPattern::pool(self.role);
        pool[self.movement.pattern_index % pool.len()]
    }

    /// Regenerate the current pattern's route from the current position.
    pub fn setup_pattern(&mut self, ctx: &PatternContext, rng: &mut SimRng) {
        self.movement.waypoints = self.current_pattern().generate(self.position, ctx, rng);
        self.movement.index = 0;
        self.movement.direct_target = None;
    }

    /// Switch to the next pattern in the pool and regenerate.
    pub fn next_pattern(&mut self, ctx: &PatternContext, rng: &mut SimRng) {
        let pool_len = MovementPattern::pool(self.role).len();
        self.movement.pattern_index = (self.movement.pattern_index + 1) % pool_len;
        self.movement.pattern_time = Fixed::ZERO;
        self.setup_pattern(ctx, rng);
    }

    /// Replace the route with a single point.
    pub fn set_target(&mut self, point: Vec2Fixed, world: Vec2Fixed) {
        let point = point.clamp_to(world);
        self.movement.waypoints = vec![point];
        self.movement.index = 0;
        self.movement.direct_target = Some(point);
    }

    /// Forget the explicit target. The route is left as is.
    pub fn clear_target(&mut self) {
        self.movement.direct_target = None;
    }

    /// Advance timers and, unless attacking, follow the route.
    pub fn update(&mut self, dt: Fixed, grid: &HexGrid, ctx: &PatternContext, rng: &mut SimRng) {
        if !self.is_attacking {
            self.update_movement(dt, grid, ctx, rng);
        }

        self.attack_cooldown = (self.attack_cooldown - dt).max(Fixed::ZERO);
        self.damage_flash = (self.damage_flash - dt).max(Fixed::ZERO);

        self.movement.pattern_time += dt;
        if self.movement.pattern_time >= self.movement.pattern_duration {
            self.next_pattern(ctx, rng);
        }
    }

    fn can_move_to(&self, grid: &HexGrid, point: Vec2Fixed) -> bool {
        !collision::check_movement_collision(grid, self.position, point)
    }

    fn update_movement(&mut self, dt: Fixed, grid: &HexGrid, ctx: &PatternContext, rng: &mut SimRng) {
        let Some(&waypoint) = self.movement.waypoints.get(self.movement.index) else {
            return;
        };
        let distance = self.position.distance(waypoint);
        let budget = self.stats.speed * dt;

        if distance <= budget {
            if !self.can_move_to(grid, waypoint) {
                self.next_pattern(ctx, rng);
                return;
            }
            self.position = waypoint;
            self.movement.index += 1;
            if self.movement.index >= self.movement.waypoints.len() {
                if self.current_pattern().reverses() {
                    self.movement.waypoints.reverse();
                }
                self.movement.index = 0;
            }
            return;
        }

        let next = self.position + (waypoint - self.position).scale(budget / distance);
        if self.can_move_to(grid, next) {
            self.position = next;
        } else {
            self.next_pattern(ctx, rng);
        }
    }

    /// Step towards `point`, stopping `stop_distance` short of it. Returns
    /// false when the step is blocked by an obstacle.
    pub fn move_towards(&mut self, point: Vec2Fixed, stop_distance: Fixed, dt: Fixed, grid: &HexGrid) -> bool {
        let distance = self.position.distance(point);
        let gap = distance - stop_distance;
        if gap <= Fixed::ZERO || distance == Fixed::ZERO {
            return true;
        }
        let step = gap.min(self.stats.speed * dt);
        let next = self.position + (point - self.position).scale(step / distance);
        if !self.can_move_to(grid, next) {
            return false;
        }
        self.position = next;
        true
    }

    /// Whether the attack cooldown has run out.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.attack_cooldown <= Fixed::ZERO
    }

    /// Start the attack cooldown.
    pub fn reset_attack_cooldown(&mut self) {
        self.attack_cooldown = self.stats.attack_cooldown_max;
    }

    /// Mitigated damage for a raw hit: `max(1, raw - defense / 5)`.
    #[must_use]
    pub fn mitigated_damage(&self, raw: Fixed) -> Fixed {
        (raw - self.stats.defense / 5).max(Fixed::ONE)
    }

    /// Apply a raw hit. Health stops at zero. Returns the mitigated damage.
    pub fn take_damage(&mut self, raw: Fixed) -> Fixed {
        let damage = self.mitigated_damage(raw);
        self.health = (self.health - damage).max(Fixed::ZERO);
        self.damage_flash = Fixed::from_num(DAMAGE_FLASH_SECS);
        damage
    }

    /// Restore health up to the maximum.
    pub fn heal(&mut self, amount: Fixed) {
        self.health = (self.health + amount).min(self.stats.max_health);
    }

    /// Apply healing steps accumulated over `dt` while `is_healing`.
    /// The accumulator makes the heal rate independent of the tick rate.
    pub fn update_healing(&mut self, dt: Fixed, tuning: &AgentTuning) {
        if !self.is_healing || self.health >= self.stats.max_health {
            self.heal_timer = Fixed::ZERO;
            return;
        }
        let interval = tuning.heal_interval();
        if interval <= Fixed::ZERO {
            return;
        }
        self.heal_timer += dt;
        while self.heal_timer >= interval {
            self.heal_timer -= interval;
            self.heal(tuning.heal_amount());
        }
    }

    /// Take as much of the cell's resource as fits. Only works empty-handed.
    pub fn pick_up(&mut self, cell: &mut HexCell) -> Option<(ResourceType, u32)> {
        if self.is_carrying() {
            return None;
        }
        let (resource_type, amount) = cell.take_resource(self.stats.capacity)?;
        self.carried = Some(resource_type);
        self.resource_amount = amount;
        Some((resource_type, amount))
    }

    /// Empty the agent's hands. Returns what was carried.
    pub fn drop_resources(&mut self) -> Option<(ResourceType, u32)> {
        let resource_type = self.carried.take()?;
        let amount = std::mem::take(&mut self.resource_amount);
        (amount > 0).then_some((resource_type, amount))
    }

    /// Drop the engagement.
    pub fn disengage(&mut self) {
        self.is_attacking = false;
        self.target = None;
    }
}
