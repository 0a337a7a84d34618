//! World configuration.
//!
//! Config structs are plain serde data with human-friendly `f64` seconds and
//! distances. The simulation converts them to [`Fixed`] once, through the
//! accessor methods, so loading a config never touches tick arithmetic.

use serde::{Deserialize, Serialize};

use crate::agent::Role;
use crate::error::{GameError, Result};
use crate::math::Fixed;
use crate::spawner::TeamStrategy;

/// Largest accepted play area side. Squared distances across the whole grid
/// must fit in [`Fixed`].
pub const MAX_WORLD_SIDE: u32 = 20_000;

/// Largest accepted hex circumradius.
pub const MAX_HEX_SIZE: u32 = 1_000;

/// Largest accepted number of grid cells, overflow border included.
pub const MAX_CELLS: u64 = 250_000;

/// Top-level configuration for a [`crate::world::WorldSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Play area width in world units.
    pub width: u32,
    /// Play area height in world units.
    pub height: u32,
    /// Hex circumradius in world units.
    pub hex_size: u32,
    /// Seed for every random roll in the match.
    pub seed: u64,
    /// Roles spawned for each team at match start.
    pub initial_roster: Vec<Role>,
    /// Obstacle generation.
    pub obstacles: ObstacleConfig,
    /// Resource spawning.
    pub resources: ResourceConfig,
    /// Agent behavior tuning.
    pub agents: AgentTuning,
    /// Win conditions.
    pub victory: VictoryConfig,
    /// Decision provider plumbing.
    pub decisions: DecisionConfig,
    /// Scheduled reinforcements.
    pub spawning: SpawnConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            hex_size: 40,
            seed: 12345,
            initial_roster: vec![Role::Collector, Role::Explorer, Role::Defender, Role::Attacker],
            obstacles: ObstacleConfig::default(),
            resources: ResourceConfig::default(),
            agents: AgentTuning::default(),
            victory: VictoryConfig::default(),
            decisions: DecisionConfig::default(),
            spawning: SpawnConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Small arena for quick runs and tests.
    #[must_use]
    pub fn small() -> Self {
        Self {
            width: 400,
            height: 300,
            hex_size: 30,
            obstacles: ObstacleConfig {
                random_count: 4,
                walls: 0,
                clusters: 1,
            },
            resources: ResourceConfig {
                initial_count: 8,
                ..ResourceConfig::default()
            },
            ..Default::default()
        }
    }

    /// Large arena.
    #[must_use]
    pub fn large() -> Self {
        Self {
            width: 1280,
            height: 960,
            obstacles: ObstacleConfig {
                random_count: 20,
                walls: 3,
                clusters: 3,
            },
            resources: ResourceConfig {
                initial_count: 30,
                ..ResourceConfig::default()
            },
            ..Default::default()
        }
    }

    /// Load a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the play area and hex size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32, hex_size: u32) -> Self {
        self.width = width;
        self.height = height;
        self.hex_size = hex_size;
        self
    }

    /// Set the roster spawned per team at match start.
    #[must_use]
    pub fn with_roster(mut self, roster: Vec<Role>) -> Self {
        self.initial_roster = roster;
        self
    }

    /// Disable obstacle generation.
    #[must_use]
    pub fn without_obstacles(mut self) -> Self {
        self.obstacles = ObstacleConfig {
            random_count: 0,
            walls: 0,
            clusters: 0,
        };
        self
    }

    /// Disable initial and periodic resource spawning.
    #[must_use]
    pub fn without_resources(mut self) -> Self {
        self.resources.initial_count = 0;
        self.resources.per_wave = 0;
        self.resources.border_spawn = false;
        self
    }

    /// Enable or disable the decision provider.
    #[must_use]
    pub fn with_decisions(mut self, enabled: bool) -> Self {
        self.decisions.enabled = enabled;
        self
    }

    /// Enable or disable scheduled reinforcements.
    #[must_use]
    pub fn with_spawning(mut self, enabled: bool) -> Self {
        self.spawning.enabled = enabled;
        self
    }

    /// Cells the grid will hold, overflow border included.
    #[must_use]
    pub fn estimated_cells(&self) -> u64 {
        let size = f64::from(self.hex_size.max(1));
        let cols = (f64::from(self.width) / (size * 1.5)).ceil() as u64 + 4;
        let rows = (f64::from(self.height) / (size * 3f64.sqrt())).ceil() as u64 + 4;
        cols * rows
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GameError::Config(format!(
                "play area must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_WORLD_SIDE || self.height > MAX_WORLD_SIDE {
            return Err(GameError::Config(format!(
                "play area {}x{} exceeds {MAX_WORLD_SIDE} per side",
                self.width, self.height
            )));
        }
        if self.hex_size == 0 || self.hex_size > MAX_HEX_SIZE {
            return Err(GameError::Config(format!(
                "hex_size {} outside 1..={MAX_HEX_SIZE}",
                self.hex_size
            )));
        }
        let cells = self.estimated_cells();
        if cells > MAX_CELLS {
            return Err(GameError::Config(format!(
                "{}x{} with hex_size {} needs {cells} cells, limit is {MAX_CELLS}",
                self.width, self.height, self.hex_size
            )));
        }
        if !(0.0..=1.0).contains(&self.victory.territory_threshold) {
            return Err(GameError::Config(format!(
                "territory_threshold {} outside [0, 1]",
                self.victory.territory_threshold
            )));
        }
        if self.decisions.requests_per_minute == 0 && self.decisions.enabled {
            return Err(GameError::Config(
                "requests_per_minute must be positive when decisions are enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Obstacle generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Single random obstacles.
    pub random_count: u32,
    /// Straight wall formations.
    pub walls: u32,
    /// Blob formations.
    pub clusters: u32,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            random_count: 12,
            walls: 2,
            clusters: 2,
        }
    }
}

/// Resource spawning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Resources placed at match start.
    pub initial_count: u32,
    /// Seconds between spawn waves.
    pub spawn_interval_secs: f64,
    /// Resources per wave.
    pub per_wave: u32,
    /// Waves are skipped while this many resource cells exist.
    pub max_on_grid: u32,
    /// Add one contested-border spawn to every wave.
    pub border_spawn: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            initial_count: 20,
            spawn_interval_secs: 5.0,
            per_wave: 5,
            max_on_grid: 30,
            border_spawn: false,
        }
    }
}

impl ResourceConfig {
    /// Wave interval as fixed-point seconds.
    #[must_use]
    pub fn spawn_interval(&self) -> Fixed {
        Fixed::from_num(self.spawn_interval_secs)
    }
}

/// Agent behavior constants shared by every agent of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Enemy scan radius used for target acquisition.
    pub combat_range: f64,
    /// Extra gap kept between two agents' radii when attacking.
    pub engage_padding: f64,
    /// Distance from the own base at which carried resources are deposited.
    pub deposit_radius: f64,
    /// Distance from the own base at which healing is active.
    pub healing_range: f64,
    /// Health restored per healing step.
    pub heal_amount: f64,
    /// Seconds per healing step.
    pub heal_interval: f64,
    /// Control gained per second on the occupied cell.
    pub territory_rate: f64,
    /// Probability that a resource-carrying collector engages.
    pub carrier_engage_chance: f64,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            combat_range: 60.0,
            engage_padding: 5.0,
            deposit_radius: 40.0,
            healing_range: 80.0,
            heal_amount: 5.0,
            heal_interval: 0.5,
            territory_rate: 0.2,
            carrier_engage_chance: 0.3,
        }
    }
}

impl AgentTuning {
    /// [`Self::combat_range`] as fixed-point.
    #[must_use]
    pub fn combat_range(&self) -> Fixed {
        Fixed::from_num(self.combat_range)
    }

    /// [`Self::engage_padding`] as fixed-point.
    #[must_use]
    pub fn engage_padding(&self) -> Fixed {
        Fixed::from_num(self.engage_padding)
    }

    /// [`Self::deposit_radius`] as fixed-point.
    #[must_use]
    pub fn deposit_radius(&self) -> Fixed {
        Fixed::from_num(self.deposit_radius)
    }

    /// [`Self::healing_range`] as fixed-point.
    #[must_use]
    pub fn healing_range(&self) -> Fixed {
        Fixed::from_num(self.healing_range)
    }

    /// [`Self::heal_amount`] as fixed-point.
    #[must_use]
    pub fn heal_amount(&self) -> Fixed {
        Fixed::from_num(self.heal_amount)
    }

    /// [`Self::heal_interval`] as fixed-point.
    #[must_use]
    pub fn heal_interval(&self) -> Fixed {
        Fixed::from_num(self.heal_interval)
    }

    /// [`Self::territory_rate`] as fixed-point.
    #[must_use]
    pub fn territory_rate(&self) -> Fixed {
        Fixed::from_num(self.territory_rate)
    }

    /// [`Self::carrier_engage_chance`] as fixed-point.
    #[must_use]
    pub fn carrier_engage_chance(&self) -> Fixed {
        Fixed::from_num(self.carrier_engage_chance)
    }
}

/// Win condition thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryConfig {
    /// Fraction of non-obstacle cells a team must hold.
    pub territory_threshold: f64,
    /// Seconds the fraction must be held without interruption.
    pub territory_hold_secs: f64,
    /// `|control|` above which a cell counts as owned.
    pub ownership_threshold: f64,
    /// Resource ratio for economic domination.
    pub resource_ratio: u32,
    /// Absolute resource total required for economic domination.
    pub resource_floor: u32,
}

impl Default for VictoryConfig {
    fn default() -> Self {
        Self {
            territory_threshold: 0.75,
            territory_hold_secs: 15.0,
            ownership_threshold: 0.2,
            resource_ratio: 10,
            resource_floor: 50,
        }
    }
}

impl VictoryConfig {
    /// [`Self::territory_threshold`] as fixed-point.
    #[must_use]
    pub fn territory_threshold(&self) -> Fixed {
        Fixed::from_num(self.territory_threshold)
    }

    /// [`Self::territory_hold_secs`] as fixed-point.
    #[must_use]
    pub fn territory_hold(&self) -> Fixed {
        Fixed::from_num(self.territory_hold_secs)
    }

    /// [`Self::ownership_threshold`] as fixed-point.
    #[must_use]
    pub fn ownership_threshold(&self) -> Fixed {
        Fixed::from_num(self.ownership_threshold)
    }
}

/// Decision provider plumbing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Whether agents consult the provider at all.
    pub enabled: bool,
    /// Token-bucket cap on provider requests.
    pub requests_per_minute: u32,
    /// Seconds before a queued or in-flight request falls back.
    pub timeout_secs: f64,
    /// Minimum seconds between two decisions for one agent.
    pub min_interval_secs: f64,
    /// Confidence lost per second by team knowledge entries.
    pub knowledge_decay_per_sec: f64,
    /// Entries below this confidence are evicted.
    pub knowledge_evict_below: f64,
    /// Recent decisions kept per agent.
    pub memory_size: usize,
    /// Seconds before a memory entry expires.
    pub memory_ttl_secs: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 30,
            timeout_secs: 5.0,
            min_interval_secs: 2.0,
            knowledge_decay_per_sec: 0.05,
            knowledge_evict_below: 0.2,
            memory_size: 10,
            memory_ttl_secs: 60.0,
        }
    }
}

/// Scheduled reinforcement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Whether the schedulers run.
    pub enabled: bool,
    /// Seconds between spawn requests before multipliers.
    pub base_interval_secs: f64,
    /// Live plus queued agents at which requests stop.
    pub max_agents: usize,
    /// Queue length at which requests stop.
    pub max_queue: usize,
    /// Resource total below which requests stop.
    pub min_resources: u32,
    /// Seconds between two spawns from one queue.
    pub spawn_cooldown_secs: f64,
    /// Live agents at which the queue stops spawning.
    pub team_cap: usize,
    /// Delay before the first request, per team.
    pub first_request_secs: [f64; 2],
    /// Strategy per team.
    pub strategies: [TeamStrategy; 2],
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_interval_secs: 15.0,
            max_agents: 12,
            max_queue: 2,
            min_resources: 15,
            spawn_cooldown_secs: 5.0,
            team_cap: 10,
            first_request_secs: [5.0, 7.0],
            strategies: [TeamStrategy::Balanced, TeamStrategy::Balanced],
        }
    }
}
