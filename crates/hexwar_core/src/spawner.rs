//! Scheduled reinforcements.
//!
//! Each team has a [`SpawnScheduler`] deciding *when* to ask for a new
//! agent and a [`SpawnQueue`] deciding when a queued request can actually
//! be paid for and placed. Strategy picks the role; the cost follows from
//! role and attributes.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{AttributeVector, Role};
use crate::bases::{BaseSystem, ResourceCost};
use crate::config::SpawnConfig;
use crate::math::{fixed_serde, Fixed};
use crate::rng::SimRng;
use crate::team::TeamId;

/// Cost of every resource before multipliers.
const BASE_COST: u32 = 10;

/// Probability of the strategy's preferred role.
const PREFERRED_ROLE_CHANCE: f64 = 0.7;

/// High-level team posture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamStrategy {
    /// Attackers, spawned quickly.
    Aggressive,
    /// Any role.
    #[default]
    Balanced,
    /// Defenders, spawned slowly.
    Defensive,
    /// Collectors, spawned rarely.
    Economic,
}

impl TeamStrategy {
    /// Every strategy.
    pub const ALL: [TeamStrategy; 4] = [
        TeamStrategy::Aggressive,
        TeamStrategy::Balanced,
        TeamStrategy::Defensive,
        TeamStrategy::Economic,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TeamStrategy::Aggressive => "aggressive",
            TeamStrategy::Balanced => "balanced",
            TeamStrategy::Defensive => "defensive",
            TeamStrategy::Economic => "economic",
        }
    }

    /// Factor applied to the base spawn interval.
    #[must_use]
    pub fn interval_multiplier(self) -> Fixed {
        match self {
            TeamStrategy::Aggressive => Fixed::from_num(0.7),
            TeamStrategy::Balanced => Fixed::ONE,
            TeamStrategy::Defensive => Fixed::from_num(1.2),
            TeamStrategy::Economic => Fixed::from_num(1.5),
        }
    }

    /// Roll the role of the next agent.
    pub fn choose_role(self, rng: &mut SimRng) -> Role {
        let preferred = Fixed::from_num(PREFERRED_ROLE_CHANCE);
        match self {
            TeamStrategy::Aggressive if rng.chance(preferred) => Role::Attacker,
            TeamStrategy::Aggressive => Role::Explorer,
            TeamStrategy::Defensive if rng.chance(preferred) => Role::Defender,
            TeamStrategy::Defensive => Role::Collector,
            TeamStrategy::Economic if rng.chance(preferred) => Role::Collector,
            TeamStrategy::Economic => Role::Explorer,
            TeamStrategy::Balanced => Role::ALL[rng.index(Role::ALL.len())],
        }
    }
}

impl fmt::Display for TeamStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TeamStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TeamStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

/// Per-resource cost factors of a role, as `(energy, materials, data)`.
fn role_multipliers(role: Role) -> (f64, f64, f64) {
    match role {
        Role::Collector => (0.8, 1.0, 1.2),
        Role::Explorer => (1.0, 0.8, 1.0),
        Role::Defender => (1.2, 1.5, 0.8),
        Role::Attacker => (1.5, 1.2, 1.0),
    }
}

/// Price of an agent: `round(10 × role factor × (0.8 + attribute sum / 5))`
/// per resource.
#[must_use]
pub fn spawn_cost(role: Role, attributes: &AttributeVector) -> ResourceCost {
    let scale = Fixed::from_num(0.8) + attributes.sum() / 5;
    let (energy, materials, data) = role_multipliers(role);
    let price = |factor: f64| -> u32 {
        let raw = Fixed::from_num(BASE_COST) * Fixed::from_num(factor) * scale;
        raw.round().max(Fixed::ZERO).to_num::<u32>()
    };
    ResourceCost::new(price(energy), price(materials), price(data))
}

/// A requested agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Role.
    pub role: Role,
    /// Attribute vector.
    pub attributes: AttributeVector,
    /// Human-readable summary.
    pub description: String,
}

impl AgentSpec {
    /// Role from the strategy; attributes are the role preset with each
    /// value scaled by a random factor in `[0.8, 1.2)`.
    pub fn generate(strategy: TeamStrategy, rng: &mut SimRng) -> Self {
        let role = strategy.choose_role(rng);
        let preset = role.default_attributes();
        let low = Fixed::from_num(0.8);
        let high = Fixed::from_num(1.2);
        let mut jitter = |value: Fixed| value * rng.range_fixed(low, high);
        let attributes = AttributeVector::new(
            jitter(preset.speed),
            jitter(preset.health),
            jitter(preset.attack),
            jitter(preset.defense),
            jitter(preset.carry),
        );
        Self {
            role,
            attributes,
            description: format!("{strategy} {role}"),
        }
    }

    /// What this agent costs.
    #[must_use]
    pub fn cost(&self) -> ResourceCost {
        spawn_cost(self.role, &self.attributes)
    }
}

/// Decides when a team asks for another agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnScheduler {
    /// Team.
    pub team: TeamId,
    /// Posture.
    pub strategy: TeamStrategy,
    #[serde(with = "fixed_serde")]
    next_request_at: Fixed,
}

impl SpawnScheduler {
    /// First check happens at `first_request_at`.
    #[must_use]
    pub const fn new(team: TeamId, strategy: TeamStrategy, first_request_at: Fixed) -> Self {
        Self {
            team,
            strategy,
            next_request_at: first_request_at,
        }
    }

    /// Simulation time of the next check.
    #[must_use]
    pub const fn next_request_at(&self) -> Fixed {
        self.next_request_at
    }

    /// Seconds until the check after this one. Plenty of resources speeds
    /// spawning up; scarcity slows it down.
    #[must_use]
    pub fn interval(&self, total_resources: u32, config: &SpawnConfig) -> Fixed {
        let mut interval = Fixed::from_num(config.base_interval_secs) * self.strategy.interval_multiplier();
        if total_resources > 100 {
            interval *= Fixed::from_num(0.8);
        } else if total_resources < 30 {
            interval *= Fixed::from_num(1.5);
        }
        interval
    }

    /// Whether a request may be made right now.
    #[must_use]
    pub fn should_request(live: usize, queued: usize, total_resources: u32, config: &SpawnConfig) -> bool {
        live + queued < config.max_agents && queued < config.max_queue && total_resources >= config.min_resources
    }

    /// Run the check if it is due. Returns a new spec when one is made.
    pub fn update(
        &mut self,
        now: Fixed,
        live: usize,
        queued: usize,
        total_resources: u32,
        config: &SpawnConfig,
        rng: &mut SimRng,
    ) -> Option<AgentSpec> {
        if now < self.next_request_at {
            return None;
        }
        self.next_request_at = now + self.interval(total_resources, config);
        if !Self::should_request(live, queued, total_resources, config) {
            return None;
        }
        let spec = AgentSpec::generate(self.strategy, rng);
        debug!(team = self.team.number(), role = %spec.role, "requested reinforcement");
        Some(spec)
    }
}

/// Requests waiting to be paid for and placed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnQueue {
    /// Team.
    pub team: TeamId,
    pending: VecDeque<AgentSpec>,
    #[serde(with = "fixed_serde")]
    cooldown: Fixed,
}

impl SpawnQueue {
    /// Empty queue, ready to spawn.
    #[must_use]
    pub fn new(team: TeamId) -> Self {
        Self {
            team,
            pending: VecDeque::new(),
            cooldown: Fixed::ZERO,
        }
    }

    /// Append a request.
    pub fn push(&mut self, spec: AgentSpec) {
        self.pending.push_back(spec);
    }

    /// Number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Next request in line.
    #[must_use]
    pub fn front(&self) -> Option<&AgentSpec> {
        self.pending.front()
    }

    /// Drop every request.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Tick the cooldown and try to pay for the front request. Returns the
    /// spec to place. Unaffordable requests stay at the front; each attempt
    /// restarts the cooldown.
    pub fn update(&mut self, dt: Fixed, live: usize, bases: &mut BaseSystem, config: &SpawnConfig) -> Option<AgentSpec> {
        if self.cooldown > Fixed::ZERO {
            self.cooldown -= dt;
            return None;
        }
        let spec = self.pending.front()?;
        if live >= config.team_cap {
            return None;
        }
        self.cooldown = Fixed::from_num(config.spawn_cooldown_secs);
        let cost = spec.cost();
        if !bases.use_resources(self.team, &cost) {
            debug!(team = self.team.number(), role = %spec.role, "cannot afford reinforcement yet");
            return None;
        }
        self.pending.pop_front()
    }
}

/// Schedulers and queues for both teams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnerSystem {
    schedulers: [SpawnScheduler; 2],
    queues: [SpawnQueue; 2],
}

impl SpawnerSystem {
    /// Spawner from config.
    #[must_use]
    pub fn new(config: &SpawnConfig) -> Self {
        let scheduler = |team: TeamId| {
            SpawnScheduler::new(
                team,
                config.strategies[team.index()],
                Fixed::from_num(config.first_request_secs[team.index()]),
            )
        };
        Self {
            schedulers: [scheduler(TeamId::One), scheduler(TeamId::Two)],
            queues: [SpawnQueue::new(TeamId::One), SpawnQueue::new(TeamId::Two)],
        }
    }

    /// Scheduler of `team`.
    #[must_use]
    pub const fn scheduler(&self, team: TeamId) -> &SpawnScheduler {
        &self.schedulers[team.index()]
    }

    /// Queue of `team`.
    #[must_use]
    pub const fn queue(&self, team: TeamId) -> &SpawnQueue {
        &self.queues[team.index()]
    }

    /// Queue of `team`, mutably.
    pub fn queue_mut(&mut self, team: TeamId) -> &mut SpawnQueue {
        &mut self.queues[team.index()]
    }

    /// Run both teams' schedulers and queues. `live` holds each team's
    /// live agent count. Returns paid-for specs to place, team 1 first.
    pub fn update(
        &mut self,
        now: Fixed,
        dt: Fixed,
        live: [usize; 2],
        bases: &mut BaseSystem,
        config: &SpawnConfig,
        rng: &mut SimRng,
    ) -> Vec<(TeamId, AgentSpec)> {
        let mut ready = Vec::new();
        for team in TeamId::ALL {
            let i = team.index();
            let total = bases.total(team);
            let queued = self.queues[i].len();
            if let Some(spec) = self.schedulers[i].update(now, live[i], queued, total, config, rng) {
                self.queues[i].push(spec);
            }
            if let Some(spec) = self.queues[i].update(dt, live[i], bases, config) {
                info!(team = team.number(), role = %spec.role, "reinforcement paid for");
                ready.push((team, spec));
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_grid::{HexGrid, ResourceType};

    fn bases_with(team: TeamId, energy: u32, materials: u32, data: u32) -> BaseSystem {
        let mut grid = HexGrid::generate(400, 300, 40);
        let mut bases = BaseSystem::initialize(&mut grid).unwrap();
        bases.add_resource(team, ResourceType::Energy, energy);
        bases.add_resource(team, ResourceType::Materials, materials);
        bases.add_resource(team, ResourceType::Data, data);
        bases
    }

    #[test]
    fn test_spawn_cost_of_presets() {
        // Collector preset sums to 2.7, so the scale is 1.34
        let cost = spawn_cost(Role::Collector, &Role::Collector.default_attributes());
        assert_eq!(cost, ResourceCost::new(11, 13, 16));
        // Attacker preset sums to 2.7 as well
        let cost = spawn_cost(Role::Attacker, &Role::Attacker.default_attributes());
        assert_eq!(cost, ResourceCost::new(20, 16, 13));
    }

    #[test]
    fn test_spawn_cost_grows_with_attributes() {
        let weak = AttributeVector::from_f64(0.1, 0.1, 0.1, 0.1, 0.1);
        let strong = AttributeVector::from_f64(1.0, 1.0, 1.0, 1.0, 1.0);
        let cheap = spawn_cost(Role::Explorer, &weak);
        let dear = spawn_cost(Role::Explorer, &strong);
        assert!(dear.total() > cheap.total());
        // 10 · 1.0 · 1.8
        assert_eq!(dear.energy, 18);
    }

    #[test]
    fn test_strategy_role_mix() {
        let mut rng = SimRng::new(21);
        let mut attackers = 0;
        for _ in 0..1000 {
            match TeamStrategy::Aggressive.choose_role(&mut rng) {
                Role::Attacker => attackers += 1,
                Role::Explorer => {}
                other => panic!("unexpected role {other:?}"),
            }
        }
        assert!(attackers > 620 && attackers < 780, "attackers = {attackers}");
    }

    #[test]
    fn test_interval_multipliers() {
        let config = SpawnConfig::default();
        let aggressive = SpawnScheduler::new(TeamId::One, TeamStrategy::Aggressive, Fixed::ZERO);
        let economic = SpawnScheduler::new(TeamId::One, TeamStrategy::Economic, Fixed::ZERO);
        let near = |a: Fixed, b: f64| (a - Fixed::from_num(b)).abs() < Fixed::from_num(0.001);
        assert!(near(aggressive.interval(50, &config), 10.5));
        assert!(near(aggressive.interval(150, &config), 8.4));
        assert!(near(economic.interval(10, &config), 33.75));
    }

    #[test]
    fn test_request_gates() {
        let config = SpawnConfig::default();
        assert!(SpawnScheduler::should_request(5, 1, 15, &config));
        assert!(!SpawnScheduler::should_request(11, 1, 100, &config));
        assert!(!SpawnScheduler::should_request(3, 2, 100, &config));
        assert!(!SpawnScheduler::should_request(3, 0, 14, &config));
    }

    #[test]
    fn test_scheduler_waits_for_first_request() {
        let config = SpawnConfig::default();
        let mut rng = SimRng::new(3);
        let mut scheduler = SpawnScheduler::new(TeamId::Two, TeamStrategy::Balanced, Fixed::from_num(7));
        assert!(scheduler.update(Fixed::from_num(6.9), 4, 0, 50, &config, &mut rng).is_none());
        assert!(scheduler.update(Fixed::from_num(7), 4, 0, 50, &config, &mut rng).is_some());
        assert_eq!(scheduler.next_request_at(), Fixed::from_num(22));
    }

    #[test]
    fn test_unaffordable_request_stays_queued() {
        let config = SpawnConfig::default();
        let mut bases = bases_with(TeamId::One, 5, 100, 100);
        let mut queue = SpawnQueue::new(TeamId::One);
        let mut rng = SimRng::new(4);
        queue.push(AgentSpec::generate(TeamStrategy::Balanced, &mut rng));

        assert!(queue.update(Fixed::ONE / 20, 4, &mut bases, &config).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(bases.ledger(TeamId::One), &ResourceCost::new(5, 100, 100));

        bases.add_resource(TeamId::One, ResourceType::Energy, 100);
        // Still cooling down from the failed attempt
        assert!(queue.update(Fixed::ONE, 4, &mut bases, &config).is_none());
        for _ in 0..5 {
            queue.update(Fixed::ONE, 4, &mut bases, &config);
        }
        assert!(queue.is_empty());
        assert!(bases.total(TeamId::One) < 305);
    }

    #[test]
    fn test_team_cap_blocks_spawning() {
        let config = SpawnConfig::default();
        let mut bases = bases_with(TeamId::Two, 100, 100, 100);
        let mut queue = SpawnQueue::new(TeamId::Two);
        let mut rng = SimRng::new(5);
        queue.push(AgentSpec::generate(TeamStrategy::Defensive, &mut rng));
        assert!(queue.update(Fixed::ONE, config.team_cap, &mut bases, &config).is_none());
        assert!(queue.update(Fixed::ONE, config.team_cap - 1, &mut bases, &config).is_some());
    }
}
