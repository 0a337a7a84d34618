//! Top-level coordinator.
//!
//! [`WorldSystem`] owns the grid and every subsystem, wires them together
//! through explicit borrows and runs the per-tick order:
//!
//! 1. resource spawning
//! 2. spawn scheduling and the spawn queues
//! 3. decisions whose latency has elapsed are applied
//! 4. [`AgentSystem::update`]
//! 5. combat effects decay
//! 6. new decision requests, then the rate-limited queue is pumped
//! 7. team knowledge and agent memories decay
//! 8. victory evaluation
//!
//! Once a match is decided, ticking is a no-op.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentId};
use crate::agent_system::{AgentEvent, AgentSystem};
use crate::bases::BaseSystem;
use crate::config::WorldConfig;
use crate::decision::{Decision, DecisionContext, DecisionProvider, DecisionSystem, MemoryEvent, Resolution};
use crate::effects::CombatEffects;
use crate::error::{GameError, Result};
use crate::hex_grid::{CellCoord, HexGrid, ResourceType, TerritoryCensus};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::obstacles;
use crate::resources::{ResourceSystem, ResourceTally};
use crate::rng::SimRng;
use crate::spawner::SpawnerSystem;
use crate::team::TeamId;
use crate::victory::{GameOutcome, VictoryScan, VictoryTracker};

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 20;

/// Control added by [`WorldSystem::add_control_at`] when no amount is given.
pub const DEFAULT_CONTROL_STEP: f64 = 0.1;

/// Units placed by [`WorldSystem::add_resource_at`] when no amount is given.
pub const DEFAULT_RESOURCE_AMOUNT: u32 = 3;

/// Fixed tick length, `1 / TICK_RATE` seconds.
#[must_use]
pub fn tick_duration() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Agent events, spawns by the scheduler first.
    pub agents: Vec<AgentEvent>,
    /// Cells that received a resource.
    pub resources_spawned: Vec<CellCoord>,
    /// Decisions acted on.
    pub decisions: Vec<(AgentId, Decision)>,
    /// Set on the tick the match is decided.
    pub outcome: Option<GameOutcome>,
}

impl TickEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.resources_spawned.is_empty() && self.decisions.is_empty() && self.outcome.is_none()
    }
}

/// Aggregate counts for overlays and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Resource cells by type.
    pub resources: ResourceTally,
    /// Ownership counts.
    pub territory: TerritoryCensus,
    /// Obstacle cells.
    pub obstacles: usize,
    /// All cells.
    pub total_cells: usize,
    /// Live agents per team.
    pub live_agents: [usize; 2],
    /// Stored resources per team.
    pub stored: [u32; 2],
}

/// The whole match.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorldSystem {
    config: WorldConfig,
    tick: u64,
    #[serde(with = "fixed_serde")]
    time: Fixed,
    rng: SimRng,
    grid: HexGrid,
    bases: BaseSystem,
    resources: ResourceSystem,
    agents: AgentSystem,
    effects: CombatEffects,
    decisions: DecisionSystem,
    spawner: SpawnerSystem,
    victory: VictoryTracker,
}

impl WorldSystem {
    /// Build a world: grid, bases with their seeded territory, obstacles,
    /// initial resources and the starting roster of both teams.
    ///
    /// # Errors
    ///
    /// [`GameError::Config`] for an invalid config and
    /// [`GameError::NoBaseCell`] when a base cannot be placed.
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = SimRng::new(config.seed);
        let mut grid = HexGrid::generate(config.width, config.height, config.hex_size);
        let bases = BaseSystem::initialize(&mut grid)?;
        let blocked = obstacles::generate(&mut grid, &mut rng, &config.obstacles);
        let placed = ResourceSystem::initial_spawn(&mut grid, &mut rng, config.resources.initial_count);

        let mut agents = AgentSystem::new(config.agents.clone());
        for team in TeamId::ALL {
            for &role in &config.initial_roster {
                agents.spawn_agent(team, role, None, &grid, &bases, &mut rng);
            }
        }

        info!(
            seed = config.seed,
            cells = grid.cell_count(),
            obstacles = blocked,
            resources = placed,
            agents = agents.len(),
            "world created"
        );

        Ok(Self {
            resources: ResourceSystem::new(&config.resources),
            decisions: DecisionSystem::new(&config.decisions),
            spawner: SpawnerSystem::new(&config.spawning),
            victory: VictoryTracker::new(),
            effects: CombatEffects::new(),
            tick: 0,
            time: Fixed::ZERO,
            config,
            rng,
            grid,
            bases,
            agents,
        })
    }

    /// Install a decision provider. Pending requests are kept.
    pub fn set_provider(&mut self, provider: Box<dyn DecisionProvider>) {
        info!(provider = provider.name(), "decision provider installed");
        self.decisions.set_provider(provider);
    }

    /// Advance by one fixed tick.
    pub fn tick(&mut self) -> TickEvents {
        self.update(tick_duration())
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        if self.is_game_over() {
            return events;
        }
        self.time += dt;
        let now = self.time;

        events.resources_spawned = self.resources.update(&mut self.grid, &mut self.rng, dt);

        if self.config.spawning.enabled {
            self.run_spawner(now, dt, &mut events);
        }

        if self.decisions.is_enabled() {
            let ready = self.decisions.collect_ready(now);
            self.apply_decisions(ready, now, &mut events);
        }

        let agent_events = self
            .agents
            .update(dt, &mut self.grid, &mut self.bases, &mut self.effects, &mut self.rng);
        self.remember(&agent_events, now);
        events.agents.extend(agent_events);

        self.effects.update(dt);

        if self.decisions.is_enabled() {
            let ctx = DecisionContext {
                grid: &self.grid,
                bases: &self.bases,
                ownership_threshold: self.config.victory.ownership_threshold(),
                now,
            };
            self.decisions.request_decisions(&ctx, self.agents.agents());
            let expired = self.decisions.pump(now, dt);
            self.apply_decisions(expired, now, &mut events);
            self.decisions.decay(now, dt);
        }

        match VictoryScan::collect(
            &self.grid,
            &self.agents,
            &self.bases,
            self.config.victory.ownership_threshold(),
        ) {
            Ok(scan) => {
                events.outcome = self.victory.evaluate(&scan, now, dt, &self.config.victory);
            }
            Err(err) => warn!(tick = self.tick, error = %err, "victory scan failed"),
        }

        self.tick += 1;
        debug!(tick = self.tick, state_hash = self.state_hash(), "tick");

        #[cfg(feature = "debug-validation")]
        debug_assert!(self.check_territory_invariant(), "territory census out of balance");

        if let Some(outcome) = events.outcome {
            info!(
                tick = self.tick,
                winner = outcome.winner.number(),
                condition = %outcome.condition,
                "game over"
            );
        }
        events
    }

    fn run_spawner(&mut self, now: Fixed, dt: Fixed, events: &mut TickEvents) {
        let live = [self.agents.live_count(TeamId::One), self.agents.live_count(TeamId::Two)];
        let ready = self.spawner.update(
            now,
            dt,
            live,
            &mut self.bases,
            &self.config.spawning,
            &mut self.rng,
        );
        for (team, spec) in ready {
            let agent = self.agents.spawn_agent(
                team,
                spec.role,
                Some(spec.attributes),
                &self.grid,
                &self.bases,
                &mut self.rng,
            );
            events.agents.push(AgentEvent::Spawned {
                agent,
                team,
                role: spec.role,
            });
        }
    }

    fn apply_decisions(&mut self, resolutions: Vec<Resolution>, now: Fixed, events: &mut TickEvents) {
        if resolutions.is_empty() {
            return;
        }
        let ctx = DecisionContext {
            grid: &self.grid,
            bases: &self.bases,
            ownership_threshold: self.config.victory.ownership_threshold(),
            now,
        };
        let applied = self.decisions.apply(resolutions, &ctx, &mut self.agents, &mut self.rng);
        events
            .decisions
            .extend(applied.into_iter().map(|(agent, decision, _)| (agent, decision)));
    }

    fn remember(&mut self, events: &[AgentEvent], now: Fixed) {
        for event in events {
            match *event {
                AgentEvent::Damaged { agent, attacker, amount } => {
                    self.decisions
                        .record_event(agent, now, MemoryEvent::TookDamage { attacker, amount });
                }
                AgentEvent::Collected {
                    agent,
                    resource_type,
                    amount,
                } => {
                    self.decisions
                        .record_event(agent, now, MemoryEvent::Collected { resource_type, amount });
                }
                AgentEvent::Delivered {
                    agent,
                    resource_type,
                    amount,
                    ..
                } => {
                    self.decisions
                        .record_event(agent, now, MemoryEvent::Delivered { resource_type, amount });
                }
                AgentEvent::Removed { agent, .. } => self.decisions.forget_agent(agent),
                AgentEvent::Spawned { .. } | AgentEvent::Engaged { .. } | AgentEvent::Killed { .. } => {}
            }
        }
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation time in seconds.
    #[must_use]
    pub const fn time(&self) -> Fixed {
        self.time
    }

    /// The config the world was built from.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The grid.
    #[must_use]
    pub const fn grid(&self) -> &HexGrid {
        &self.grid
    }

    /// Bases and ledgers.
    #[must_use]
    pub const fn bases(&self) -> &BaseSystem {
        &self.bases
    }

    /// Bases and ledgers, mutably.
    pub fn bases_mut(&mut self) -> &mut BaseSystem {
        &mut self.bases
    }

    /// Every agent.
    #[must_use]
    pub const fn agent_system(&self) -> &AgentSystem {
        &self.agents
    }

    /// Every agent, mutably.
    pub fn agent_system_mut(&mut self) -> &mut AgentSystem {
        &mut self.agents
    }

    /// Live combat effects.
    #[must_use]
    pub const fn effects(&self) -> &CombatEffects {
        &self.effects
    }

    /// Decision layer state.
    #[must_use]
    pub const fn decisions(&self) -> &DecisionSystem {
        &self.decisions
    }

    /// Reinforcement schedulers and queues.
    #[must_use]
    pub const fn spawner(&self) -> &SpawnerSystem {
        &self.spawner
    }

    /// Territory hold timer.
    #[must_use]
    pub const fn victory(&self) -> &VictoryTracker {
        &self.victory
    }

    /// Center of a team's base.
    #[must_use]
    pub const fn get_base_position(&self, team: TeamId) -> Vec2Fixed {
        self.bases.base_position(team)
    }

    /// Agents of one team in index order.
    #[must_use]
    pub fn get_agents_by_team(&self, team: TeamId) -> Vec<&Agent> {
        self.agents.agents_by_team(team).collect()
    }

    /// Agent by id.
    #[must_use]
    pub fn get_agent_by_id(&self, id: AgentId) -> Option<&Agent> {
        self.agents.agent(id)
    }

    /// Agent by id, or [`GameError::AgentNotFound`].
    pub fn require_agent(&self, id: AgentId) -> Result<&Agent> {
        self.agents.agent(id).ok_or(GameError::AgentNotFound(id))
    }

    /// Take an agent out of the world regardless of health. Its pending
    /// decision request, memory and request history go with it.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.agents.remove_agent(id)?;
        self.decisions.forget_agent(id);
        debug!(agent = id, team = agent.team.number(), "agent removed");
        Some(agent)
    }

    /// Push the control of the cell under `point` toward `team` by
    /// `amount`. Returns false off the grid or on an obstacle.
    pub fn add_control_at(&mut self, point: Vec2Fixed, team: TeamId, amount: Fixed) -> bool {
        match self.grid.cell_at_position_mut(point) {
            Some(cell) if !cell.has_obstacle => {
                cell.adjust_control(team.sign() * amount);
                true
            }
            _ => false,
        }
    }

    /// Block the cell under `point`. Returns false off the grid or when the
    /// cell already holds an obstacle or a resource.
    pub fn add_obstacle_at(&mut self, point: Vec2Fixed) -> bool {
        match self.grid.cell_at_position_mut(point) {
            Some(cell) if cell.is_free() => {
                cell.has_obstacle = true;
                true
            }
            _ => false,
        }
    }

    /// Put `amount` units of `resource_type` on the cell under `point`.
    /// Returns false off the grid or when the cell is not free.
    pub fn add_resource_at(&mut self, point: Vec2Fixed, resource_type: ResourceType, amount: u32) -> bool {
        match self.grid.cell_at_position_mut(point) {
            Some(cell) if cell.is_free() && amount > 0 => {
                cell.set_resource(resource_type, amount);
                true
            }
            _ => false,
        }
    }

    /// Clear the resource under `point`. Returns what was there.
    pub fn collect_resource_at(&mut self, point: Vec2Fixed) -> Option<(ResourceType, u32)> {
        let coord = self.grid.coord_at(point)?;
        ResourceSystem::remove_resource(&mut self.grid, coord)
    }

    /// Resource, territory and obstacle counts.
    ///
    /// # Errors
    ///
    /// [`GameError::ScanFailed`] when the census does not add up.
    pub fn debug_info(&self) -> Result<DebugInfo> {
        let scan = VictoryScan::collect(
            &self.grid,
            &self.agents,
            &self.bases,
            self.config.victory.ownership_threshold(),
        )?;
        Ok(DebugInfo {
            resources: ResourceSystem::resource_counts(&self.grid),
            territory: scan.census,
            obstacles: scan.census.obstacles,
            total_cells: scan.census.total,
            live_agents: scan.live,
            stored: scan.resources,
        })
    }

    /// How the match ended, once it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.victory.outcome()
    }

    /// Whether the match is decided.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.victory.outcome().is_some()
    }

    /// Winning team, once decided.
    #[must_use]
    pub fn winner(&self) -> Option<TeamId> {
        self.outcome().map(|o| o.winner)
    }

    /// Owned plus neutral cells equal the non-obstacle cells.
    #[must_use]
    pub fn check_territory_invariant(&self) -> bool {
        let census = self.grid.census(self.config.victory.ownership_threshold());
        census.team1 + census.team2 + census.neutral == census.non_obstacle() && census.is_consistent()
    }

    /// Hash of the simulation state. Two worlds built from the same config
    /// and ticked the same number of times hash identically.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.time.to_bits().hash(&mut hasher);
        self.rng.hash(&mut hasher);
        self.grid.hash(&mut hasher);
        self.bases.hash(&mut hasher);
        self.resources.hash(&mut hasher);
        self.agents.agents().hash(&mut hasher);
        self.effects.hash(&mut hasher);
        self.spawner.hash(&mut hasher);
        self.victory.hash(&mut hasher);
        for team in TeamId::ALL {
            self.decisions.knowledge(team).hash(&mut hasher);
        }
        self.decisions.queue().waiting_len().hash(&mut hasher);
        self.decisions.queue().in_flight_len().hash(&mut hasher);
        hasher.finish()
    }

    /// Snapshot the world with bincode. The decision provider is not part of
    /// the snapshot.
    ///
    /// # Errors
    ///
    /// [`GameError::Snapshot`] if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Snapshot(format!("failed to serialize world: {e}")))
    }

    /// Restore a snapshot made by [`Self::serialize`].
    ///
    /// # Errors
    ///
    /// [`GameError::Snapshot`] if decoding fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| GameError::Snapshot(format!("failed to deserialize world: {e}")))
    }
}
