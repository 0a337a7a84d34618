//! # Hexwar Core
//!
//! Deterministic simulation core for a two-team hex territory-control game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering (entities expose a [`render::Renderable`] capability)
//! - No IO
//! - No system randomness (everything draws from a seeded [`rng::SimRng`])
//! - No floating-point math inside a tick (uses fixed-point)
//!
//! Two worlds built from the same [`config::WorldConfig`] and ticked the same
//! number of times have identical [`world::WorldSystem::state_hash`] values.
//!
//! ## Crate Structure
//!
//! - [`hex_grid`] - Offset hex tiling, point lookup, adjacency, census
//! - [`obstacles`] / [`resources`] - Populate and replenish cell contents
//! - [`bases`] - Base placement, territory seeding, team ledgers
//! - [`collision`] - Obstacle-aware movement checks
//! - [`agent`] - Per-agent movement, combat and carry state
//! - [`agent_system`] - Per-tick agent orchestration
//! - [`decision`] - Pluggable decision providers behind a rate-limited queue
//! - [`spawner`] - Scheduled reinforcements
//! - [`victory`] - Win conditions
//! - [`world`] - The top-level [`world::WorldSystem`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod agent;
pub mod agent_system;
pub mod bases;
pub mod collision;
pub mod config;
pub mod decision;
pub mod effects;
pub mod error;
pub mod hex_grid;
pub mod math;
pub mod obstacles;
pub mod render;
pub mod resources;
pub mod rng;
pub mod spawner;
pub mod team;
pub mod victory;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{Agent, AgentId, AttributeVector, Role};
    pub use crate::agent_system::{AgentEvent, AgentSystem};
    pub use crate::bases::{BaseSystem, ResourceCost};
    pub use crate::config::{AgentTuning, DecisionConfig, SpawnConfig, VictoryConfig, WorldConfig};
    pub use crate::decision::{ActionKind, Decision, DecisionProvider, Perception, RuleBasedProvider};
    pub use crate::error::{GameError, Result};
    pub use crate::hex_grid::{CellCoord, HexCell, HexGrid, ResourceType};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::rng::SimRng;
    pub use crate::spawner::TeamStrategy;
    pub use crate::team::TeamId;
    pub use crate::victory::{GameOutcome, VictoryCondition};
    pub use crate::world::{TickEvents, WorldSystem, TICK_RATE};
}
