//! Match metrics collection.
//!
//! A [`MetricsCollector`] watches the [`TickEvents`] of one match and turns
//! them into a [`MatchMetrics`] record; [`BatchSummary`] aggregates many of
//! those.

use std::collections::BTreeMap;

use hexwar_core::agent_system::AgentEvent;
use hexwar_core::team::TeamId;
use hexwar_core::world::{TickEvents, WorldSystem};
use serde::{Deserialize, Serialize};

/// Per-team numbers for one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Resource units delivered to the base.
    pub resources_gathered: u64,
    /// Agents spawned after the starting roster.
    pub agents_spawned: u32,
    /// Agents that died.
    pub agents_lost: u32,
    /// Total damage dealt.
    pub damage_dealt: f64,
    /// Stock left in the ledger at the end.
    pub final_stock: u32,
    /// Live agents at the end.
    pub final_agents: usize,
}

/// Territory counts at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerritorySample {
    /// Simulation time in seconds.
    pub time: f64,
    /// Cells held by team 1.
    pub team1: usize,
    /// Cells held by team 2.
    pub team2: usize,
    /// Neutral cells.
    pub neutral: usize,
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Match label.
    pub name: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Game time in seconds.
    pub duration_secs: f64,
    /// Winning team number (None = draw).
    pub winner: Option<u8>,
    /// How the match ended ("timeout" for draws).
    pub condition: String,
    /// Per-team metrics, team 1 first.
    pub teams: [TeamMetrics; 2],
    /// Territory over time.
    pub territory: Vec<TerritorySample>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl MatchMetrics {
    /// Metrics for `team`.
    #[must_use]
    pub fn team(&self, team: TeamId) -> &TeamMetrics {
        &self.teams[team.index()]
    }

    /// Save as pretty JSON.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load from JSON.
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Accumulates metrics while a match runs.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: MatchMetrics,
    sample_every: u64,
    last_sampled: Option<u64>,
    team_of: BTreeMap<u32, TeamId>,
}

impl MetricsCollector {
    /// Start collecting for `world`. Territory is sampled every
    /// `sample_every` ticks.
    #[must_use]
    pub fn new(name: impl Into<String>, world: &WorldSystem, sample_every: u64) -> Self {
        let team_of = world
            .agent_system()
            .agents()
            .iter()
            .map(|a| (a.id, a.team))
            .collect();
        let mut collector = Self {
            metrics: MatchMetrics {
                name: name.into(),
                seed: world.config().seed,
                ..MatchMetrics::default()
            },
            sample_every: sample_every.max(1),
            last_sampled: None,
            team_of,
        };
        collector.sample(world);
        collector
    }

    /// Fold in one tick.
    pub fn record_tick(&mut self, events: &TickEvents, world: &WorldSystem) {
        for event in &events.agents {
            match *event {
                AgentEvent::Spawned { agent, team, .. } => {
                    self.team_of.insert(agent, team);
                    self.metrics.teams[team.index()].agents_spawned += 1;
                }
                AgentEvent::Delivered { team, amount, .. } => {
                    self.metrics.teams[team.index()].resources_gathered += u64::from(amount);
                }
                AgentEvent::Damaged { attacker, amount, .. } => {
                    if let Some(team) = self.team_of.get(&attacker) {
                        self.metrics.teams[team.index()].damage_dealt += amount.to_num::<f64>();
                    }
                }
                AgentEvent::Killed { team, .. } => {
                    self.metrics.teams[team.index()].agents_lost += 1;
                }
                _ => {}
            }
        }
        if world.get_tick() % self.sample_every == 0 {
            self.sample(world);
        }
    }

    fn sample(&mut self, world: &WorldSystem) {
        if self.last_sampled == Some(world.get_tick()) {
            return;
        }
        self.last_sampled = Some(world.get_tick());
        // Scan failures only cost a sample
        if let Ok(info) = world.debug_info() {
            self.metrics.territory.push(TerritorySample {
                time: world.time().to_num::<f64>(),
                team1: info.territory.team1,
                team2: info.territory.team2,
                neutral: info.territory.neutral,
            });
        }
    }

    /// Close the record with the world's final state.
    #[must_use]
    pub fn finish(mut self, world: &WorldSystem) -> MatchMetrics {
        self.sample(world);
        let metrics = &mut self.metrics;
        metrics.ticks = world.get_tick();
        metrics.duration_secs = world.time().to_num::<f64>();
        metrics.final_state_hash = world.state_hash();
        match world.outcome() {
            Some(outcome) => {
                metrics.winner = Some(outcome.winner.number());
                metrics.condition = outcome.condition.to_string();
            }
            None => {
                metrics.winner = None;
                metrics.condition = "timeout".to_string();
            }
        }
        for team in TeamId::ALL {
            let slot = &mut metrics.teams[team.index()];
            slot.final_stock = world.bases().total(team);
            slot.final_agents = world.agent_system().live_count(team);
        }
        self.metrics
    }
}

/// Aggregate over many matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches summarised.
    pub total_matches: usize,
    /// Wins per team, team 1 first.
    pub wins: [usize; 2],
    /// Matches without a winner.
    pub draws: usize,
    /// Matches per ending condition.
    pub by_condition: BTreeMap<String, usize>,
    /// Mean game time in seconds.
    pub mean_duration_secs: f64,
    /// Mean resources gathered per team.
    pub mean_resources_gathered: [f64; 2],
}

impl BatchSummary {
    /// Summarise `matches`.
    #[must_use]
    pub fn from_matches(matches: &[MatchMetrics]) -> Self {
        let mut summary = Self {
            total_matches: matches.len(),
            ..Self::default()
        };
        if matches.is_empty() {
            return summary;
        }
        let count = matches.len() as f64;
        for m in matches {
            match m.winner.and_then(TeamId::from_number) {
                Some(team) => summary.wins[team.index()] += 1,
                None => summary.draws += 1,
            }
            *summary.by_condition.entry(m.condition.clone()).or_insert(0) += 1;
            summary.mean_duration_secs += m.duration_secs / count;
            for team in TeamId::ALL {
                summary.mean_resources_gathered[team.index()] += m.team(team).resources_gathered as f64 / count;
            }
        }
        summary
    }

    /// Fraction of matches won by `team`.
    #[must_use]
    pub fn win_rate(&self, team: TeamId) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        self.wins[team.index()] as f64 / self.total_matches as f64
    }
}
