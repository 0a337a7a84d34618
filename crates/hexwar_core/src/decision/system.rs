//! Per-world owner of the decision layer state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::action::Decision;
use super::executor::{ActionExecutor, Intent};
use super::knowledge::TeamKnowledge;
use super::memory::{AgentMemory, MemoryEvent};
use super::perception::{Observer, Perception, WorldView};
use super::provider::{fallback_decision, DecisionProvider, RuleBasedProvider};
use super::queue::{DecisionQueue, DecisionRequest, Resolution};
use crate::agent::{Agent, AgentId};
use crate::agent_system::AgentSystem;
use crate::bases::BaseSystem;
use crate::config::DecisionConfig;
use crate::hex_grid::HexGrid;
use crate::math::{fixed_serde, Fixed};
use crate::rng::SimRng;
use crate::team::TeamId;

fn default_provider() -> Box<dyn DecisionProvider> {
    Box::new(RuleBasedProvider::default())
}

/// Queue, provider, team knowledge and agent memories of one world.
///
/// The provider is not part of snapshots; a restored world answers with
/// [`RuleBasedProvider`] until another provider is installed.
#[derive(Serialize, Deserialize)]
pub struct DecisionSystem {
    config: DecisionConfig,
    queue: DecisionQueue,
    #[serde(skip, default = "default_provider")]
    provider: Box<dyn DecisionProvider>,
    knowledge: [TeamKnowledge; 2],
    memories: BTreeMap<AgentId, AgentMemory>,
    last_request: BTreeMap<AgentId, LastRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LastRequest(#[serde(with = "fixed_serde")] Fixed);

impl fmt::Debug for DecisionSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionSystem")
            .field("enabled", &self.config.enabled)
            .field("provider", &self.provider.name())
            .field("waiting", &self.queue.waiting_len())
            .field("in_flight", &self.queue.in_flight_len())
            .field("memories", &self.memories.len())
            .finish_non_exhaustive()
    }
}

/// Borrowed world parts needed to act on decisions.
pub(crate) struct DecisionContext<'a> {
    pub grid: &'a HexGrid,
    pub bases: &'a BaseSystem,
    pub ownership_threshold: Fixed,
    pub now: Fixed,
}

impl DecisionSystem {
    /// Decision layer with the built-in rule-based provider.
    #[must_use]
    pub fn new(config: &DecisionConfig) -> Self {
        Self::with_provider(config, default_provider())
    }

    /// Decision layer with a custom provider.
    #[must_use]
    pub fn with_provider(config: &DecisionConfig, provider: Box<dyn DecisionProvider>) -> Self {
        Self {
            config: config.clone(),
            queue: DecisionQueue::new(config),
            provider,
            knowledge: [TeamKnowledge::new(), TeamKnowledge::new()],
            memories: BTreeMap::new(),
            last_request: BTreeMap::new(),
        }
    }

    /// Swap the provider. Pending requests are kept.
    pub fn set_provider(&mut self, provider: Box<dyn DecisionProvider>) {
        self.provider = provider;
    }

    /// Name of the active provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether agents consult the provider.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Shared knowledge of `team`.
    #[must_use]
    pub const fn knowledge(&self, team: TeamId) -> &TeamKnowledge {
        &self.knowledge[team.index()]
    }

    /// Memory of one agent.
    #[must_use]
    pub fn memory(&self, agent: AgentId) -> Option<&AgentMemory> {
        self.memories.get(&agent)
    }

    /// The request queue.
    #[must_use]
    pub const fn queue(&self) -> &DecisionQueue {
        &self.queue
    }

    fn memory_mut(&mut self, agent: AgentId) -> &mut AgentMemory {
        let size = self.config.memory_size;
        let ttl = Fixed::from_num(self.config.memory_ttl_secs);
        self.memories
            .entry(agent)
            .or_insert_with(|| AgentMemory::new(size, ttl))
    }

    /// Drop everything held for a removed agent, pending requests included.
    pub fn forget_agent(&mut self, agent: AgentId) {
        if self.queue.cancel(agent) {
            debug!(agent, "cancelled pending decision");
        }
        self.memories.remove(&agent);
        self.last_request.remove(&agent);
    }

    /// Note an event in an agent's memory.
    pub fn record_event(&mut self, agent: AgentId, now: Fixed, event: MemoryEvent) {
        if self.config.enabled {
            self.memory_mut(agent).record_event(now, event);
        }
    }

    /// Answers whose latency has elapsed.
    pub fn collect_ready(&mut self, now: Fixed) -> Vec<Resolution> {
        self.queue.take_ready(now)
    }

    /// Observe every agent that is due, fold the sightings into team
    /// knowledge and enqueue a request for it.
    pub(crate) fn request_decisions(&mut self, ctx: &DecisionContext<'_>, agents: &[Agent]) {
        let min_interval = Fixed::from_num(self.config.min_interval_secs);
        for agent in agents.iter().filter(|a| a.is_alive()) {
            if self.queue.is_pending(agent.id) {
                continue;
            }
            let due = self
                .last_request
                .get(&agent.id)
                .map_or(true, |last| ctx.now - last.0 >= min_interval);
            if !due {
                continue;
            }
            let perception = self.observe(ctx, agents, agent);
            let team = agent.team.index();
            self.knowledge[team].absorb(&perception);
            if let Some(enemy) = perception.enemies.first() {
                let event = MemoryEvent::SpottedEnemy {
                    enemy: enemy.id,
                    position: enemy.position,
                };
                self.memory_mut(agent.id).record_event(ctx.now, event);
            }
            self.queue.enqueue(DecisionRequest {
                agent: agent.id,
                enqueued_at: ctx.now,
                perception,
            });
            self.last_request.insert(agent.id, LastRequest(ctx.now));
        }
    }

    fn observe(&self, ctx: &DecisionContext<'_>, agents: &[Agent], agent: &Agent) -> Perception {
        let view = WorldView {
            grid: ctx.grid,
            agents,
            bases: ctx.bases,
            knowledge: &self.knowledge[agent.team.index()],
            ownership_threshold: ctx.ownership_threshold,
            time: ctx.now,
        };
        Observer::observe(&view, agent)
    }

    /// Refill the bucket and release what it allows. Returns requests that
    /// timed out while waiting.
    pub fn pump(&mut self, now: Fixed, dt: Fixed) -> Vec<Resolution> {
        self.queue.refill(dt);
        self.queue.pump(now, self.provider.as_mut())
    }

    /// Age team knowledge and agent memories.
    pub fn decay(&mut self, now: Fixed, dt: Fixed) {
        let rate = Fixed::from_num(self.config.knowledge_decay_per_sec);
        let evict = Fixed::from_num(self.config.knowledge_evict_below);
        for knowledge in &mut self.knowledge {
            knowledge.decay(dt, rate, evict);
        }
        for memory in self.memories.values_mut() {
            memory.expire(now);
        }
    }

    /// Validate a resolution for `agent`. Failures become the fallback
    /// action; an unknown verb is dropped with a warning.
    #[must_use]
    pub fn resolve(resolution: &Resolution, agent: &Agent) -> Option<Decision> {
        match resolution {
            Resolution::Answered { raw, .. } => match Decision::from_raw(raw) {
                Ok(decision) => Some(decision),
                Err(err) => {
                    warn!(agent = agent.id, action = %raw.action, error = %err, "ignoring decision");
                    None
                }
            },
            Resolution::Failed { error, .. } => {
                warn!(agent = agent.id, error = %error, "decision failed, using fallback");
                Some(fallback_decision(agent.is_carrying(), agent.health_fraction(), error))
            }
        }
    }

    /// Act on resolutions: re-observe, plan against the fresh snapshot and
    /// point the agent. Resolutions for agents that no longer exist are
    /// dropped.
    pub(crate) fn apply(
        &mut self,
        resolutions: Vec<Resolution>,
        ctx: &DecisionContext<'_>,
        agents: &mut AgentSystem,
        rng: &mut SimRng,
    ) -> Vec<(AgentId, Decision, Intent)> {
        let mut applied = Vec::new();
        for resolution in resolutions {
            let id = resolution.agent();
            let Some(agent) = agents.agent(id).filter(|a| a.is_alive()) else {
                continue;
            };
            let Some(decision) = Self::resolve(&resolution, agent) else {
                continue;
            };
            let perception = self.observe(ctx, agents.agents(), agent);
            let Some(agent) = agents.agent_mut(id) else {
                continue;
            };
            let intent = ActionExecutor::execute(&decision, &perception, agent, rng);
            debug!(agent = id, action = %decision.action, target = decision.target.as_str(), "applied decision");
            self.memory_mut(id).record_decision(ctx.now, decision.clone());
            applied.push((id, decision, intent));
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;
    use crate::decision::action::ActionKind;
    use crate::decision::provider::ScriptedProvider;

    fn setup() -> (HexGrid, BaseSystem, AgentSystem, SimRng) {
        let mut grid = HexGrid::generate(800, 600, 40);
        let bases = BaseSystem::initialize(&mut grid).unwrap();
        let mut agents = AgentSystem::new(crate::config::AgentTuning::default());
        let mut rng = SimRng::new(11);
        agents.spawn_agent(TeamId::One, Role::Explorer, None, &grid, &bases, &mut rng);
        agents.spawn_agent(TeamId::Two, Role::Collector, None, &grid, &bases, &mut rng);
        (grid, bases, agents, rng)
    }

    fn ctx<'a>(grid: &'a HexGrid, bases: &'a BaseSystem, now: f64) -> DecisionContext<'a> {
        DecisionContext {
            grid,
            bases,
            ownership_threshold: Fixed::from_num(0.2),
            now: Fixed::from_num(now),
        }
    }

    #[test]
    fn test_requests_respect_min_interval() {
        let (grid, bases, agents, _) = setup();
        let mut system = DecisionSystem::new(&DecisionConfig::default());
        system.request_decisions(&ctx(&grid, &bases, 0.0), agents.agents());
        assert_eq!(system.queue().waiting_len(), 2);

        system.pump(Fixed::ZERO, Fixed::ZERO);
        system.collect_ready(Fixed::from_num(1.0));
        system.request_decisions(&ctx(&grid, &bases, 1.0), agents.agents());
        assert_eq!(system.queue().waiting_len(), 0);
        system.request_decisions(&ctx(&grid, &bases, 2.0), agents.agents());
        assert_eq!(system.queue().waiting_len(), 2);
    }

    #[test]
    fn test_answers_move_agents_and_are_remembered() {
        let (grid, bases, mut agents, mut rng) = setup();
        let provider = ScriptedProvider::new(["ACTION: DEFEND\nTARGET: base", "ACTION: CONTINUE"], Fixed::ZERO);
        let mut system = DecisionSystem::with_provider(&DecisionConfig::default(), Box::new(provider));
        let c = ctx(&grid, &bases, 0.0);
        system.request_decisions(&c, agents.agents());
        system.pump(c.now, Fixed::ZERO);
        let ready = system.collect_ready(c.now);
        assert_eq!(ready.len(), 2);

        let applied = system.apply(ready, &c, &mut agents, &mut rng);
        assert_eq!(applied.len(), 2);
        let explorer = agents.agents()[0].id;
        assert_eq!(applied[0].1.action, ActionKind::Defend);
        assert!(agents.agent(explorer).unwrap().movement.direct_target.is_some());
        assert_eq!(applied[1].2, Intent::Hold);
        assert_eq!(
            system.memory(explorer).unwrap().last_decision().map(|d| d.action),
            Some(ActionKind::Defend)
        );
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let (grid, bases, mut agents, mut rng) = setup();
        let provider = ScriptedProvider::new(["ACTION: DANCE", "ACTION: DANCE"], Fixed::ZERO);
        let mut system = DecisionSystem::with_provider(&DecisionConfig::default(), Box::new(provider));
        let c = ctx(&grid, &bases, 0.0);
        system.request_decisions(&c, agents.agents());
        system.pump(c.now, Fixed::ZERO);
        let ready = system.collect_ready(c.now);
        let applied = system.apply(ready, &c, &mut agents, &mut rng);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_provider_failure_falls_back() {
        let (grid, bases, mut agents, mut rng) = setup();
        let provider = ScriptedProvider::new(Vec::<String>::new(), Fixed::ZERO);
        let mut system = DecisionSystem::with_provider(&DecisionConfig::default(), Box::new(provider));
        let c = ctx(&grid, &bases, 0.0);
        system.request_decisions(&c, agents.agents());
        system.pump(c.now, Fixed::ZERO);
        let ready = system.collect_ready(c.now);
        let applied = system.apply(ready, &c, &mut agents, &mut rng);
        assert_eq!(applied.len(), 2);
        assert!(applied.iter().all(|(_, d, _)| d.action == ActionKind::Explore));
    }

    #[test]
    fn test_forget_agent_cancels_request() {
        let (grid, bases, agents, _) = setup();
        let mut system = DecisionSystem::new(&DecisionConfig::default());
        system.request_decisions(&ctx(&grid, &bases, 0.0), agents.agents());
        let id = agents.agents()[0].id;
        system.forget_agent(id);
        assert!(!system.queue().is_pending(id));
        assert_eq!(system.queue().waiting_len(), 1);
    }
}
