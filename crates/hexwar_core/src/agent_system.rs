//! Agent collection and per-tick orchestration.
//!
//! # Update order
//!
//! [`AgentSystem::update`] sweeps the agents once, from the highest index
//! down, and runs every phase for one agent before moving on:
//!
//! 1. dead agents drop what they carry onto their cell and are removed
//! 2. the agent's own update (route, cooldowns, pattern timer)
//! 3. resource pickup
//! 4. deposit and healing near the own base
//! 5. combat
//! 6. territory accrual on the occupied cell
//!
//! Reads of other agents are quasi-synchronous: an agent sees the
//! already-updated state of agents with a higher index and the previous
//! tick's state of agents with a lower index.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, AttributeVector, PatternContext, Role};
use crate::bases::BaseSystem;
use crate::collision;
use crate::config::AgentTuning;
use crate::effects::CombatEffects;
use crate::hex_grid::{HexGrid, ResourceType};
use crate::math::{Fixed, Vec2Fixed};
use crate::rng::SimRng;
use crate::team::TeamId;

/// Something that happened to an agent during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// A new agent entered the world.
    Spawned {
        /// New agent.
        agent: AgentId,
        /// Its team.
        team: TeamId,
        /// Its role.
        role: Role,
    },
    /// Resource picked up from a cell.
    Collected {
        /// Collecting agent.
        agent: AgentId,
        /// Kind.
        resource_type: ResourceType,
        /// Units.
        amount: u32,
    },
    /// Carried resource credited to the team ledger.
    Delivered {
        /// Delivering agent.
        agent: AgentId,
        /// Credited team.
        team: TeamId,
        /// Kind.
        resource_type: ResourceType,
        /// Units.
        amount: u32,
    },
    /// Agent locked onto an enemy.
    Engaged {
        /// Attacker.
        agent: AgentId,
        /// Enemy.
        target: AgentId,
    },
    /// Agent was hit.
    Damaged {
        /// Victim.
        agent: AgentId,
        /// Attacker.
        attacker: AgentId,
        /// Mitigated damage.
        #[serde(with = "crate::math::fixed_serde")]
        amount: Fixed,
    },
    /// A hit brought the victim to zero health.
    Killed {
        /// Victim.
        agent: AgentId,
        /// Victim's team.
        team: TeamId,
        /// Attacker.
        killer: AgentId,
    },
    /// A dead agent left the world.
    Removed {
        /// Removed agent.
        agent: AgentId,
        /// Its team.
        team: TeamId,
        /// Where it died.
        position: Vec2Fixed,
        /// What it dropped onto the grid, if anything landed.
        dropped: Option<(ResourceType, u32)>,
    },
}

/// Mutable references to two distinct slice elements.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Owns every agent in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSystem {
    agents: Vec<Agent>,
    next_id: AgentId,
    tuning: AgentTuning,
}

impl AgentSystem {
    /// Empty system.
    #[must_use]
    pub fn new(tuning: AgentTuning) -> Self {
        Self {
            agents: Vec::new(),
            next_id: 1,
            tuning,
        }
    }

    /// Behavior constants.
    #[must_use]
    pub const fn tuning(&self) -> &AgentTuning {
        &self.tuning
    }

    /// Route context for a team's agents.
    #[must_use]
    pub fn pattern_context(grid: &HexGrid, bases: &BaseSystem, team: TeamId) -> PatternContext {
        PatternContext {
            world: grid.world_size(),
            own_base: Some(bases.base_position(team)),
            enemy_base: Some(bases.base_position(team.opponent())),
        }
    }

    /// Spawn an agent on its team's base.
    pub fn spawn_agent(
        &mut self,
        team: TeamId,
        role: Role,
        attributes: Option<AttributeVector>,
        grid: &HexGrid,
        bases: &BaseSystem,
        rng: &mut SimRng,
    ) -> AgentId {
        let position = bases.base_position(team);
        self.spawn_agent_at(team, role, attributes, position, grid, bases, rng)
    }

    /// Spawn an agent at an explicit position.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_agent_at(
        &mut self,
        team: TeamId,
        role: Role,
        attributes: Option<AttributeVector>,
        position: Vec2Fixed,
        grid: &HexGrid,
        bases: &BaseSystem,
        rng: &mut SimRng,
    ) -> AgentId {
        let id = self.next_id;
        self.next_id += 1;
        let ctx = Self::pattern_context(grid, bases, team);
        let position = position.clamp_to(grid.world_size());
        self.agents
            .push(Agent::new(id, team, role, position, attributes, &ctx, rng));
        tracing::info!(agent = id, team = team.number(), role = %role, "spawned agent");
        id
    }

    /// Remove an agent regardless of health. Callers outside the crate go
    /// through [`crate::world::WorldSystem::remove_agent`] so the decision
    /// layer forgets it too.
    pub(crate) fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        let index = self.index_of(id)?;
        Some(self.agents.remove(index))
    }

    /// Remove every agent.
    pub fn clear(&mut self) {
        self.agents.clear();
    }

    fn index_of(&self, id: AgentId) -> Option<usize> {
        self.agents.iter().position(|a| a.id == id)
    }

    /// All agents in index order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// All agents, mutably.
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Agent by id.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Agent by id, mutably.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Agents of one team.
    pub fn agents_by_team(&self, team: TeamId) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter().filter(move |a| a.team == team)
    }

    /// Live agents of one team.
    #[must_use]
    pub fn live_count(&self, team: TeamId) -> usize {
        self.agents_by_team(team).filter(|a| a.is_alive()).count()
    }

    /// Number of agents, dead ones awaiting removal included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether there are no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run one tick for every agent. See the module docs for the order.
    pub fn update(
        &mut self,
        dt: Fixed,
        grid: &mut HexGrid,
        bases: &mut BaseSystem,
        effects: &mut CombatEffects,
        rng: &mut SimRng,
    ) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        let mut i = self.agents.len();
        while i > 0 {
            i -= 1;
            if !self.agents[i].is_alive() {
                let agent = self.agents.remove(i);
                events.push(Self::remove_dead(agent, grid));
                continue;
            }

            let ctx = Self::pattern_context(grid, bases, self.agents[i].team);
            self.agents[i].update(dt, grid, &ctx, rng);
            self.collect(i, grid, &mut events);
            self.visit_base(i, dt, bases, &mut events);
            self.fight(i, dt, grid, effects, rng, &mut events);
            self.claim_territory(i, dt, grid);
        }
        events
    }

    fn remove_dead(mut agent: Agent, grid: &mut HexGrid) -> AgentEvent {
        let carried = agent.drop_resources();
        let dropped = carried.and_then(|(resource_type, amount)| {
            // An agent caught on an obstacle drops onto the nearest free neighbor
            let spot = collision::constrain_position(grid, agent.position);
            match grid.cell_at_position_mut(spot) {
                Some(cell) if !cell.has_obstacle => {
                    cell.set_resource(resource_type, amount);
                    Some((resource_type, amount))
                }
                _ => {
                    tracing::debug!(
                        agent = agent.id,
                        resource = resource_type.name(),
                        amount,
                        "no free cell for dropped resource"
                    );
                    None
                }
            }
        });
        tracing::debug!(agent = agent.id, team = agent.team.number(), "removed dead agent");
        AgentEvent::Removed {
            agent: agent.id,
            team: agent.team,
            position: agent.position,
            dropped,
        }
    }

    fn collect(&mut self, i: usize, grid: &mut HexGrid, events: &mut Vec<AgentEvent>) {
        let agent = &mut self.agents[i];
        if agent.is_carrying() {
            return;
        }
        let Some(cell) = grid.cell_at_position_mut(agent.position) else {
            return;
        };
        if let Some((resource_type, amount)) = agent.pick_up(cell) {
            events.push(AgentEvent::Collected {
                agent: agent.id,
                resource_type,
                amount,
            });
        }
    }

    fn visit_base(&mut self, i: usize, dt: Fixed, bases: &mut BaseSystem, events: &mut Vec<AgentEvent>) {
        let deposit = self.tuning.deposit_radius();
        let healing = self.tuning.healing_range();
        let agent = &mut self.agents[i];
        let distance_sq = agent.position.distance_squared(bases.base_position(agent.team));

        if distance_sq <= deposit * deposit {
            if let Some((resource_type, amount)) = agent.drop_resources() {
                bases.add_resource(agent.team, resource_type, amount);
                events.push(AgentEvent::Delivered {
                    agent: agent.id,
                    team: agent.team,
                    resource_type,
                    amount,
                });
            }
        }

        agent.is_healing = distance_sq <= healing * healing && agent.health < agent.stats.max_health;
        agent.update_healing(dt, &self.tuning);
    }

    /// First live enemy within combat range, in index order.
    fn scan_enemy(&self, i: usize) -> Option<usize> {
        let agent = &self.agents[i];
        let range = self.tuning.combat_range();
        let range_sq = range * range;
        self.agents.iter().position(|other| {
            other.team != agent.team
                && other.is_alive()
                && other.position.distance_squared(agent.position) <= range_sq
        })
    }

    fn fight(
        &mut self,
        i: usize,
        dt: Fixed,
        grid: &HexGrid,
        effects: &mut CombatEffects,
        rng: &mut SimRng,
        events: &mut Vec<AgentEvent>,
    ) {
        // Target lost since the last tick
        if let Some(target_id) = self.agents[i].target {
            let valid = self
                .index_of(target_id)
                .is_some_and(|j| j != i && self.agents[j].is_alive());
            if !valid {
                self.agents[i].disengage();
            }
        }

        if !self.agents[i].is_attacking {
            let Some(j) = self.scan_enemy(i) else {
                return;
            };
            // Loaded collectors hesitate
            let agent = &self.agents[i];
            let engage = agent.role != Role::Collector
                || !agent.is_carrying()
                || rng.chance(self.tuning.carrier_engage_chance());
            if !engage {
                return;
            }
            let target = self.agents[j].id;
            let agent = &mut self.agents[i];
            agent.is_attacking = true;
            agent.target = Some(target);
            events.push(AgentEvent::Engaged {
                agent: agent.id,
                target,
            });
        }

        let Some(j) = self.agents[i].target.and_then(|id| self.index_of(id)) else {
            self.agents[i].disengage();
            return;
        };
        let padding = self.tuning.engage_padding();
        let (agent, target) = pair_mut(&mut self.agents, i, j);
        let reach = agent.stats.radius + target.stats.radius + padding;
        let distance = agent.position.distance(target.position);

        if distance > agent.stats.vision_range {
            agent.disengage();
            return;
        }
        if distance > reach {
            // Aim one unit inside reach so rounding cannot leave the agent just short
            if !agent.move_towards(target.position, reach - Fixed::ONE, dt, grid) {
                agent.disengage();
            }
            return;
        }
        if !agent.can_attack() {
            return;
        }

        let amount = target.take_damage(agent.stats.attack_power);
        agent.reset_attack_cooldown();
        events.push(AgentEvent::Damaged {
            agent: target.id,
            attacker: agent.id,
            amount,
        });

        if target.is_alive() {
            effects.spawn_hit(target.position, target.team);
        } else {
            effects.spawn_death(target.position, target.team);
            tracing::info!(
                victim = target.id,
                team = target.team.number(),
                killer = agent.id,
                "agent killed"
            );
            events.push(AgentEvent::Killed {
                agent: target.id,
                team: target.team,
                killer: agent.id,
            });
            agent.disengage();
        }
    }

    fn claim_territory(&self, i: usize, dt: Fixed, grid: &mut HexGrid) {
        let agent = &self.agents[i];
        let delta = agent.team.sign() * self.tuning.territory_rate() * dt;
        if let Some(cell) = grid.cell_at_position_mut(agent.position) {
            if !cell.has_obstacle {
                cell.adjust_control(delta);
            }
        }
    }
}
