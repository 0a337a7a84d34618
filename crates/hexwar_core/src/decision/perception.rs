//! Perception snapshots handed to decision providers.
//!
//! A [`Perception`] is plain serde data so a provider behind a wire can
//! receive it as JSON. Every list is sorted nearest-first.

use serde::{Deserialize, Serialize};

use super::knowledge::TeamKnowledge;
use crate::agent::{Agent, AgentId, Role};
use crate::bases::BaseSystem;
use crate::hex_grid::{CellCoord, HexGrid, ResourceType};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::team::TeamId;

/// The observing agent's own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfState {
    /// Agent id.
    pub id: AgentId,
    /// Team.
    pub team: TeamId,
    /// Role.
    pub role: Role,
    /// Position.
    pub position: Vec2Fixed,
    /// Health over max health.
    #[serde(with = "fixed_serde")]
    pub health_fraction: Fixed,
    /// Carried resource kind.
    pub carrying: Option<ResourceType>,
    /// Carried units.
    pub resource_amount: u32,
    /// Carry capacity.
    pub capacity: u32,
    /// Engaged with an enemy.
    pub is_attacking: bool,
    /// Healing at the base.
    pub is_healing: bool,
}

/// Another agent in sight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenAgent {
    /// Agent id.
    pub id: AgentId,
    /// Role.
    pub role: Role,
    /// Position.
    pub position: Vec2Fixed,
    /// Distance from the observer.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
    /// Health over max health.
    #[serde(with = "fixed_serde")]
    pub health_fraction: Fixed,
    /// Whether it carries resources.
    pub is_carrying: bool,
}

/// A resource cell in sight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenResource {
    /// Cell.
    pub coord: CellCoord,
    /// Cell center.
    pub position: Vec2Fixed,
    /// Distance from the observer.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
    /// Kind.
    pub resource_type: ResourceType,
    /// Units on the cell.
    pub amount: u32,
}

/// An obstacle cell in sight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenObstacle {
    /// Cell.
    pub coord: CellCoord,
    /// Cell center.
    pub position: Vec2Fixed,
    /// Distance from the observer.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
}

/// Territory split of the cells in sight, obstacles excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryView {
    /// Non-obstacle cells in sight.
    pub visible_cells: u32,
    /// Fraction held by the observer's team.
    #[serde(with = "fixed_serde")]
    pub own: Fixed,
    /// Fraction held by the enemy.
    #[serde(with = "fixed_serde")]
    pub enemy: Fixed,
    /// Fraction held by nobody.
    #[serde(with = "fixed_serde")]
    pub neutral: Fixed,
}

/// Everything one agent knows at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perception {
    /// Simulation time of the snapshot.
    #[serde(with = "fixed_serde")]
    pub time: Fixed,
    /// The observer.
    pub agent: SelfState,
    /// Own base center.
    pub own_base: Vec2Fixed,
    /// Play area size.
    pub world: Vec2Fixed,
    /// Allies in sight.
    pub allies: Vec<SeenAgent>,
    /// Live enemies in sight.
    pub enemies: Vec<SeenAgent>,
    /// Resource cells in sight.
    pub resources: Vec<SeenResource>,
    /// Obstacle cells in sight.
    pub obstacles: Vec<SeenObstacle>,
    /// Territory split in sight.
    pub territory: TerritoryView,
    /// Enemy base position, when it is in sight.
    pub enemy_base_seen: Option<Vec2Fixed>,
    /// Team knowledge at the time of the snapshot.
    pub knowledge: TeamKnowledge,
}

/// Read-only slice of the world an [`Observer`] needs.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    /// Grid.
    pub grid: &'a HexGrid,
    /// Every agent.
    pub agents: &'a [Agent],
    /// Bases.
    pub bases: &'a BaseSystem,
    /// The observer's team knowledge.
    pub knowledge: &'a TeamKnowledge,
    /// `|control|` above which a cell counts as owned.
    pub ownership_threshold: Fixed,
    /// Current simulation time.
    pub time: Fixed,
}

/// Builds [`Perception`] snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observer;

impl Observer {
    /// Snapshot what `agent` can see.
    #[must_use]
    pub fn observe(view: &WorldView<'_>, agent: &Agent) -> Perception {
        let vision = agent.stats.vision_range;
        let vision_sq = vision * vision;
        let origin = agent.position;

        let mut allies = Vec::new();
        let mut enemies = Vec::new();
        for other in view.agents {
            if other.id == agent.id || !other.is_alive() {
                continue;
            }
            if other.position.distance_squared(origin) > vision_sq {
                continue;
            }
            let seen = SeenAgent {
                id: other.id,
                role: other.role,
                position: other.position,
                distance: other.position.distance(origin),
                health_fraction: other.health_fraction(),
                is_carrying: other.is_carrying(),
            };
            if other.team == agent.team {
                allies.push(seen);
            } else {
                enemies.push(seen);
            }
        }
        allies.sort_by_key(|a| a.distance);
        enemies.sort_by_key(|a| a.distance);

        let mut resources = Vec::new();
        let mut obstacles = Vec::new();
        let mut counts = [0u32; 3];
        for cell in view.grid.cells_within(origin, vision) {
            let distance = cell.center.distance(origin);
            if cell.has_obstacle {
                obstacles.push(SeenObstacle {
                    coord: cell.coord,
                    position: cell.center,
                    distance,
                });
                continue;
            }
            if let (Some(resource_type), true) = (cell.resource_type, cell.has_resource()) {
                resources.push(SeenResource {
                    coord: cell.coord,
                    position: cell.center,
                    distance,
                    resource_type,
                    amount: cell.resource_amount,
                });
            }
            match TeamId::owning(cell.control_level, view.ownership_threshold) {
                Some(team) if team == agent.team => counts[0] += 1,
                Some(_) => counts[1] += 1,
                None => counts[2] += 1,
            }
        }
        resources.sort_by_key(|r| r.distance);
        obstacles.sort_by_key(|o| o.distance);

        let visible_cells = counts.iter().sum::<u32>();
        let fraction = |n: u32| {
            if visible_cells == 0 {
                Fixed::ZERO
            } else {
                Fixed::from_num(n) / Fixed::from_num(visible_cells)
            }
        };
        let territory = TerritoryView {
            visible_cells,
            own: fraction(counts[0]),
            enemy: fraction(counts[1]),
            neutral: fraction(counts[2]),
        };

        let enemy_base = view.bases.base_position(agent.team.opponent());
        let enemy_base_seen = (enemy_base.distance_squared(origin) <= vision_sq).then_some(enemy_base);

        Perception {
            time: view.time,
            agent: SelfState {
                id: agent.id,
                team: agent.team,
                role: agent.role,
                position: origin,
                health_fraction: agent.health_fraction(),
                carrying: agent.carried,
                resource_amount: agent.resource_amount,
                capacity: agent.stats.capacity,
                is_attacking: agent.is_attacking,
                is_healing: agent.is_healing,
            },
            own_base: view.bases.base_position(agent.team),
            world: view.grid.world_size(),
            allies,
            enemies,
            resources,
            obstacles,
            territory,
            enemy_base_seen,
            knowledge: view.knowledge.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PatternContext;
    use crate::rng::SimRng;

    fn setup() -> (HexGrid, BaseSystem) {
        let mut grid = HexGrid::generate(800, 600, 40);
        let bases = BaseSystem::initialize(&mut grid).unwrap();
        (grid, bases)
    }

    fn agent(id: AgentId, team: TeamId, role: Role, x: i32, y: i32, rng: &mut SimRng) -> Agent {
        let ctx = PatternContext::open(Vec2Fixed::from_num(800, 600));
        Agent::new(id, team, role, Vec2Fixed::from_num(x, y), None, &ctx, rng)
    }

    #[test]
    fn test_lists_are_sorted_nearest_first() {
        let (mut grid, bases) = setup();
        let mut rng = SimRng::new(1);
        let observer = agent(1, TeamId::One, Role::Explorer, 400, 300, &mut rng);
        let agents = vec![
            observer.clone(),
            agent(2, TeamId::Two, Role::Attacker, 500, 300, &mut rng),
            agent(3, TeamId::Two, Role::Attacker, 440, 300, &mut rng),
            agent(4, TeamId::One, Role::Collector, 380, 300, &mut rng),
            // Out of sight
            agent(5, TeamId::Two, Role::Attacker, 700, 300, &mut rng),
        ];
        let coord = grid.coord_at(Vec2Fixed::from_num(460, 300)).unwrap();
        grid.cell_mut(coord).unwrap().set_resource(ResourceType::Energy, 4);

        let knowledge = TeamKnowledge::new();
        let view = WorldView {
            grid: &grid,
            agents: &agents,
            bases: &bases,
            knowledge: &knowledge,
            ownership_threshold: Fixed::from_num(0.2),
            time: Fixed::ZERO,
        };
        let perception = Observer::observe(&view, &observer);

        let enemy_ids: Vec<_> = perception.enemies.iter().map(|e| e.id).collect();
        assert_eq!(enemy_ids, vec![3, 2]);
        assert_eq!(perception.allies.len(), 1);
        assert_eq!(perception.allies[0].id, 4);
        assert_eq!(perception.resources.len(), 1);
        assert_eq!(perception.resources[0].amount, 4);
        assert!(perception.enemy_base_seen.is_none());
    }

    #[test]
    fn test_territory_fractions_near_base() {
        let (grid, bases) = setup();
        let mut rng = SimRng::new(2);
        let home = bases.base_position(TeamId::One);
        let observer = agent(1, TeamId::One, Role::Collector, 0, 0, &mut rng);
        let mut observer = observer;
        observer.position = home;
        let agents = vec![observer.clone()];
        let knowledge = TeamKnowledge::new();
        let view = WorldView {
            grid: &grid,
            agents: &agents,
            bases: &bases,
            knowledge: &knowledge,
            ownership_threshold: Fixed::from_num(0.2),
            time: Fixed::ZERO,
        };
        let perception = Observer::observe(&view, &observer);
        let territory = perception.territory;
        assert!(territory.visible_cells > 0);
        assert!(territory.own > Fixed::ZERO);
        assert_eq!(territory.enemy, Fixed::ZERO);
        assert_eq!(perception.own_base, home);
    }

    #[test]
    fn test_perception_serializes_to_json() {
        let (grid, bases) = setup();
        let mut rng = SimRng::new(3);
        let observer = agent(1, TeamId::Two, Role::Defender, 400, 300, &mut rng);
        let agents = vec![observer.clone()];
        let knowledge = TeamKnowledge::new();
        let view = WorldView {
            grid: &grid,
            agents: &agents,
            bases: &bases,
            knowledge: &knowledge,
            ownership_threshold: Fixed::from_num(0.2),
            time: Fixed::ZERO,
        };
        let perception = Observer::observe(&view, &observer);
        let json = serde_json::to_string(&perception).unwrap();
        let back: Perception = serde_json::from_str(&json).unwrap();
        assert_eq!(back, perception);
    }
}
