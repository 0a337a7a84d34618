//! Win conditions.
//!
//! Checked once per tick against a single [`VictoryScan`], in this order:
//!
//! 1. territory: one team holds more than the threshold fraction of the
//!    non-obstacle cells for the full hold duration without interruption
//! 2. elimination: one team has no live agents while the other has some
//! 3. resources: one team's stock is at least `resource_ratio` times the
//!    other's and above `resource_floor`
//!
//! The first condition that holds ends the match.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent_system::AgentSystem;
use crate::bases::BaseSystem;
use crate::config::VictoryConfig;
use crate::error::{GameError, Result};
use crate::hex_grid::{HexGrid, TerritoryCensus};
use crate::math::{fixed_serde, Fixed};
use crate::team::TeamId;

/// How a match was won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictoryCondition {
    /// Sustained territory dominance.
    Territory,
    /// The other team has no live agents.
    Elimination,
    /// Overwhelming resource stock.
    Resources,
}

impl VictoryCondition {
    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            VictoryCondition::Territory => "territory",
            VictoryCondition::Elimination => "elimination",
            VictoryCondition::Resources => "resources",
        }
    }
}

impl fmt::Display for VictoryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameOutcome {
    /// Winning team.
    pub winner: TeamId,
    /// Condition that ended the match.
    pub condition: VictoryCondition,
    /// Simulation time at which the match ended.
    #[serde(with = "fixed_serde")]
    pub time: Fixed,
}

/// Aggregate world state the conditions are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VictoryScan {
    /// Cell ownership counts.
    pub census: TerritoryCensus,
    /// Live agents per team, indexed by [`TeamId::index`].
    pub live: [usize; 2],
    /// Stored resources per team.
    pub resources: [u32; 2],
}

impl VictoryScan {
    /// Gather the scan from the world parts.
    pub fn collect(
        grid: &HexGrid,
        agents: &AgentSystem,
        bases: &BaseSystem,
        ownership_threshold: Fixed,
    ) -> Result<Self> {
        let census = grid.census(ownership_threshold);
        if !census.is_consistent() {
            return Err(GameError::ScanFailed(format!(
                "census does not add up: {} + {} + {} + {} != {}",
                census.team1, census.team2, census.neutral, census.obstacles, census.total
            )));
        }
        Ok(Self {
            census,
            live: [agents.live_count(TeamId::One), agents.live_count(TeamId::Two)],
            resources: [bases.total(TeamId::One), bases.total(TeamId::Two)],
        })
    }
}

/// Tracks the territory hold timer and the final outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VictoryTracker {
    leader: Option<TeamId>,
    #[serde(with = "fixed_serde")]
    held_for: Fixed,
    outcome: Option<GameOutcome>,
}

impl VictoryTracker {
    /// No leader, no outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Team currently above the territory threshold.
    #[must_use]
    pub const fn leader(&self) -> Option<TeamId> {
        self.leader
    }

    /// Seconds the current leader has held the threshold.
    #[must_use]
    pub const fn held_for(&self) -> Fixed {
        self.held_for
    }

    /// Outcome once the match is decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Team whose fraction strictly exceeds the threshold.
    #[must_use]
    pub fn territory_leader(census: &TerritoryCensus, threshold: Fixed) -> Option<TeamId> {
        TeamId::ALL.into_iter().find(|&team| census.fraction(team) > threshold)
    }

    /// Advance the hold timer by `dt` and evaluate every condition. Returns
    /// the outcome on the tick the match is decided; afterwards the outcome
    /// is frozen.
    pub fn evaluate(&mut self, scan: &VictoryScan, now: Fixed, dt: Fixed, config: &VictoryConfig) -> Option<GameOutcome> {
        if self.outcome.is_some() {
            return None;
        }

        let leader = Self::territory_leader(&scan.census, config.territory_threshold());
        if leader == self.leader {
            if leader.is_some() {
                self.held_for += dt;
            }
        } else {
            if let Some(team) = leader {
                debug!(team = team.number(), "territory leader changed");
            }
            self.leader = leader;
            self.held_for = Fixed::ZERO;
        }

        let decided = self
            .territory_winner(config)
            .map(|team| (team, VictoryCondition::Territory))
            .or_else(|| Self::elimination_winner(scan).map(|team| (team, VictoryCondition::Elimination)))
            .or_else(|| Self::resource_winner(scan, config).map(|team| (team, VictoryCondition::Resources)));

        let (winner, condition) = decided?;
        let outcome = GameOutcome {
            winner,
            condition,
            time: now,
        };
        info!(
            winner = winner.number(),
            condition = %condition,
            time = now.to_num::<f64>(),
            "match decided"
        );
        self.outcome = Some(outcome);
        Some(outcome)
    }

    fn territory_winner(&self, config: &VictoryConfig) -> Option<TeamId> {
        let leader = self.leader?;
        (self.held_for >= config.territory_hold()).then_some(leader)
    }

    fn elimination_winner(scan: &VictoryScan) -> Option<TeamId> {
        match scan.live {
            [0, n] if n > 0 => Some(TeamId::Two),
            [n, 0] if n > 0 => Some(TeamId::One),
            _ => None,
        }
    }

    fn resource_winner(scan: &VictoryScan, config: &VictoryConfig) -> Option<TeamId> {
        TeamId::ALL.into_iter().find(|&team| {
            let own = u64::from(scan.resources[team.index()]);
            let other = u64::from(scan.resources[team.opponent().index()]);
            own > u64::from(config.resource_floor) && own >= other * u64::from(config.resource_ratio)
        })
    }
}
