//! Test fixtures and helpers.
//!
//! Pre-built grids, configs and worlds for consistent testing.

use fixed::types::I32F32;
use hexwar_core::agent::{AgentId, AttributeVector, Role};
use hexwar_core::bases::BaseSystem;
use hexwar_core::config::WorldConfig;
use hexwar_core::hex_grid::HexGrid;
use hexwar_core::math::Vec2Fixed;
use hexwar_core::team::TeamId;
use hexwar_core::world::WorldSystem;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A point from integer coordinates.
#[must_use]
pub fn point(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::new(fixed(x), fixed(y))
}

/// Obstacle-free grid roughly ten hexes on a side (hex size 40).
#[must_use]
pub fn small_grid() -> HexGrid {
    HexGrid::generate(600, 600, 40)
}

/// [`small_grid`] with both bases placed.
///
/// # Panics
///
/// Panics if the bases cannot be placed, which would be a bug.
#[must_use]
pub fn grid_with_bases() -> (HexGrid, BaseSystem) {
    let mut grid = small_grid();
    let bases = BaseSystem::initialize(&mut grid).expect("bases fit on an empty grid");
    (grid, bases)
}

/// Small arena with nothing random happening on its own: no obstacles, no
/// resources, no reinforcements and no decision provider.
#[must_use]
pub fn quiet_config() -> WorldConfig {
    WorldConfig::small()
        .without_obstacles()
        .without_resources()
        .with_spawning(false)
        .with_decisions(false)
}

/// A world built from `config`.
///
/// # Panics
///
/// Panics if the config is invalid.
#[must_use]
pub fn world(config: WorldConfig) -> WorldSystem {
    WorldSystem::new(config).expect("fixture config is valid")
}

/// A world from [`quiet_config`] with an empty roster.
#[must_use]
pub fn empty_world() -> WorldSystem {
    world(quiet_config().with_roster(Vec::new()))
}

/// The full default game on the small arena with the given seed.
#[must_use]
pub fn full_world(seed: u64) -> WorldSystem {
    world(WorldConfig::small().with_seed(seed))
}

/// Place an agent at `position` in `world`.
pub fn spawn_at(
    world: &mut WorldSystem,
    team: TeamId,
    role: Role,
    attributes: Option<AttributeVector>,
    position: Vec2Fixed,
) -> AgentId {
    let mut rng = hexwar_core::rng::SimRng::new(u64::from(team.number()));
    let grid = world.grid().clone();
    let bases = world.bases().clone();
    world
        .agent_system_mut()
        .spawn_agent_at(team, role, attributes, position, &grid, &bases, &mut rng)
}
