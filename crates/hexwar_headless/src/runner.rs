//! Headless match runner.
//!
//! Drives a [`WorldSystem`] tick by tick until the match is decided or its
//! time limit runs out, collecting metrics along the way.

use hexwar_core::error::GameError;
use hexwar_core::world::WorldSystem;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::match_config::MatchConfig;
use crate::metrics::{MatchMetrics, MetricsCollector};

/// A finished match.
#[derive(Debug)]
pub struct MatchReport {
    /// Collected metrics.
    pub metrics: MatchMetrics,
    /// The world in its final state.
    pub world: WorldSystem,
}

/// Runs one match to completion.
#[derive(Debug, Clone)]
pub struct MatchRunner {
    config: MatchConfig,
    log_every_ticks: u64,
}

impl MatchRunner {
    /// Runner for `config`.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            log_every_ticks: 0,
        }
    }

    /// Emit a progress line every `ticks` ticks (0 disables it).
    #[must_use]
    pub fn with_progress(mut self, ticks: u64) -> Self {
        self.log_every_ticks = ticks;
        self
    }

    /// The match being run.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Build the world and play it out.
    ///
    /// # Errors
    ///
    /// Propagates world construction failures.
    pub fn run(&self) -> Result<MatchReport, GameError> {
        let world = WorldSystem::new(self.config.world.clone())?;
        Ok(self.run_world(world))
    }

    /// Play out an already built world, for example one restored from a
    /// snapshot.
    #[must_use]
    pub fn run_world(&self, mut world: WorldSystem) -> MatchReport {
        let max_ticks = self.config.max_ticks();
        let mut collector = MetricsCollector::new(self.config.name.clone(), &world, self.config.sample_every_ticks());

        info!(
            name = %self.config.name,
            seed = world.config().seed,
            max_ticks,
            "match started"
        );

        while !world.is_game_over() && world.get_tick() < max_ticks {
            let events = world.tick();
            collector.record_tick(&events, &world);

            if self.log_every_ticks > 0 && world.get_tick() % self.log_every_ticks == 0 {
                debug!(
                    tick = world.get_tick(),
                    team1 = world.agent_system().live_count(hexwar_core::team::TeamId::One),
                    team2 = world.agent_system().live_count(hexwar_core::team::TeamId::Two),
                    "progress"
                );
            }
        }

        let metrics = collector.finish(&world);
        info!(
            name = %metrics.name,
            ticks = metrics.ticks,
            winner = ?metrics.winner,
            condition = %metrics.condition,
            "match finished"
        );
        MatchReport { metrics, world }
    }
}

/// Result of replaying one seed several times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Seed under test.
    pub seed: u64,
    /// Final state hash of every run.
    pub hashes: Vec<u64>,
    /// Tick count of every run.
    pub ticks: Vec<u64>,
}

impl DeterminismReport {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1]) && self.ticks.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run `config` with `seed` `runs` times and compare the final states.
///
/// # Errors
///
/// Propagates world construction failures.
pub fn verify_seed(config: &MatchConfig, seed: u64, runs: u32) -> Result<DeterminismReport, GameError> {
    let runner = MatchRunner::new(config.clone().with_seed(seed));
    let mut report = DeterminismReport {
        seed,
        hashes: Vec::with_capacity(runs as usize),
        ticks: Vec::with_capacity(runs as usize),
    };
    for _ in 0..runs {
        let result = runner.run()?;
        report.hashes.push(result.metrics.final_state_hash);
        report.ticks.push(result.metrics.ticks);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_match(seconds: u32) -> MatchConfig {
        MatchConfig::small().with_max_seconds(seconds)
    }

    #[test]
    fn test_runs_until_time_limit() {
        let report = MatchRunner::new(short_match(5)).run().unwrap();
        assert!(report.metrics.ticks <= 100);
        if report.world.is_game_over() {
            assert!(report.metrics.winner.is_some());
        } else {
            assert_eq!(report.metrics.ticks, 100);
            assert_eq!(report.metrics.condition, "timeout");
        }
    }

    #[test]
    fn test_empty_roster_times_out() {
        let mut config = short_match(60);
        config.world = config.world.with_roster(vec![]).with_spawning(false);
        let report = MatchRunner::new(config).run().unwrap();
        assert_eq!(report.metrics.ticks, 1200);
        assert!(report.metrics.winner.is_none());
    }

    #[test]
    fn test_stops_on_game_over() {
        let config = short_match(60);
        let mut world = WorldSystem::new(config.world.clone().with_spawning(false)).unwrap();
        let doomed: Vec<_> = world
            .get_agents_by_team(hexwar_core::team::TeamId::Two)
            .iter()
            .map(|a| a.id)
            .collect();
        for id in doomed {
            world.remove_agent(id);
        }
        let report = MatchRunner::new(config).run_world(world);
        assert_eq!(report.metrics.ticks, 1);
        assert_eq!(report.metrics.winner, Some(1));
        assert_eq!(report.metrics.condition, "elimination");
    }

    #[test]
    fn test_same_seed_same_result() {
        let report = verify_seed(&short_match(10), 77, 3).unwrap();
        assert_eq!(report.hashes.len(), 3);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = MatchRunner::new(short_match(3).with_seed(1)).run().unwrap();
        let b = MatchRunner::new(short_match(3).with_seed(2)).run().unwrap();
        assert_ne!(a.metrics.final_state_hash, b.metrics.final_state_hash);
    }

    #[test]
    fn test_invalid_world_is_an_error() {
        let mut config = short_match(1);
        config.world.hex_size = 0;
        assert!(MatchRunner::new(config).run().is_err());
    }
}
