//! Resource spawning and bookkeeping on the grid.

use serde::{Deserialize, Serialize};

use crate::config::ResourceConfig;
use crate::hex_grid::{CellCoord, HexGrid, ResourceType};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::rng::SimRng;
use crate::team::TeamId;

/// Share of plain spawns that roll energy.
const ENERGY_WEIGHT: f64 = 0.5;
/// Cumulative share that rolls energy or materials.
const MATERIALS_CUMULATIVE: f64 = 0.8;
/// Chance that a border spawn uses a contested cell.
const BORDER_PREFERENCE: f64 = 0.7;
/// Control magnitude above which a neighbor counts as owned.
const BORDER_OWNERSHIP: f64 = 0.2;

/// Per-type resource tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTally {
    /// Energy.
    pub energy: u32,
    /// Materials.
    pub materials: u32,
    /// Data.
    pub data: u32,
}

impl ResourceTally {
    /// Mutable slot for one resource type.
    pub fn slot_mut(&mut self, resource_type: ResourceType) -> &mut u32 {
        match resource_type {
            ResourceType::Energy => &mut self.energy,
            ResourceType::Materials => &mut self.materials,
            ResourceType::Data => &mut self.data,
        }
    }

    /// Value for one resource type.
    #[must_use]
    pub const fn get(&self, resource_type: ResourceType) -> u32 {
        match resource_type {
            ResourceType::Energy => self.energy,
            ResourceType::Materials => self.materials,
            ResourceType::Data => self.data,
        }
    }

    /// Sum over all types.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.energy + self.materials + self.data
    }
}

/// A cell rich enough to be worth a detour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHotspot {
    /// Cell coordinate.
    pub coord: CellCoord,
    /// Cell center.
    pub position: Vec2Fixed,
    /// Resource kind.
    pub resource_type: ResourceType,
    /// Units on the cell.
    pub amount: u32,
}

/// Periodic resource spawner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSystem {
    #[serde(with = "fixed_serde")]
    spawn_timer: Fixed,
    #[serde(with = "fixed_serde")]
    spawn_interval: Fixed,
    per_wave: u32,
    max_on_grid: u32,
    border_spawn: bool,
}

impl ResourceSystem {
    /// Create a spawner from config.
    #[must_use]
    pub fn new(config: &ResourceConfig) -> Self {
        Self {
            spawn_timer: Fixed::ZERO,
            spawn_interval: config.spawn_interval(),
            per_wave: config.per_wave,
            max_on_grid: config.max_on_grid,
            border_spawn: config.border_spawn,
        }
    }

    /// Roll a resource type: energy 50 %, materials 30 %, data 20 %.
    pub fn select_type(rng: &mut SimRng) -> ResourceType {
        let roll = rng.next_fixed();
        if roll < Fixed::from_num(ENERGY_WEIGHT) {
            ResourceType::Energy
        } else if roll < Fixed::from_num(MATERIALS_CUMULATIVE) {
            ResourceType::Materials
        } else {
            ResourceType::Data
        }
    }

    fn free_cells(grid: &HexGrid) -> Vec<CellCoord> {
        grid.cells()
            .iter()
            .filter(|c| c.is_free())
            .map(|c| c.coord)
            .collect()
    }

    /// Put one resource (1-5 units) on a random free cell.
    pub fn spawn_single(grid: &mut HexGrid, rng: &mut SimRng) -> Option<CellCoord> {
        let free = Self::free_cells(grid);
        if free.is_empty() {
            return None;
        }
        let coord = free[rng.index(free.len())];
        let resource_type = Self::select_type(rng);
        let amount = rng.range_inclusive(1, 5);
        grid.cell_mut(coord)?.set_resource(resource_type, amount);
        Some(coord)
    }

    /// Place `count` resources at match start. Returns how many were placed.
    pub fn initial_spawn(grid: &mut HexGrid, rng: &mut SimRng, count: u32) -> u32 {
        (0..count)
            .filter(|_| Self::spawn_single(grid, rng).is_some())
            .count() as u32
    }

    /// Spawn one resource (2-5 units) on a contested cell: an empty cell
    /// whose neighbors include cells owned by both teams. Falls back to a
    /// plain spawn when no such cell exists.
    pub fn spawn_near_borders(grid: &mut HexGrid, rng: &mut SimRng) -> Option<CellCoord> {
        let threshold = Fixed::from_num(BORDER_OWNERSHIP);
        let contested: Vec<CellCoord> = grid
            .cells()
            .iter()
            .filter(|c| c.is_free())
            .filter(|c| {
                let owners: Vec<Option<TeamId>> = grid
                    .neighbors(c.coord)
                    .iter()
                    .filter_map(|n| grid.cell(*n))
                    .map(|n| TeamId::owning(n.control_level, threshold))
                    .collect();
                owners.contains(&Some(TeamId::One)) && owners.contains(&Some(TeamId::Two))
            })
            .map(|c| c.coord)
            .collect();

        if contested.is_empty() {
            return Self::spawn_single(grid, rng);
        }

        let coord = if rng.chance(Fixed::from_num(BORDER_PREFERENCE)) {
            contested[rng.index(contested.len())]
        } else {
            let free = Self::free_cells(grid);
            free[rng.index(free.len())]
        };
        let resource_type = ResourceType::ALL[rng.index(ResourceType::ALL.len())];
        let amount = rng.range_inclusive(2, 5);
        grid.cell_mut(coord)?.set_resource(resource_type, amount);
        Some(coord)
    }

    /// Advance the spawn timer; spawns a wave when it elapses and the grid
    /// holds fewer than the configured maximum. Returns the cells filled.
    pub fn update(&mut self, grid: &mut HexGrid, rng: &mut SimRng, dt: Fixed) -> Vec<CellCoord> {
        self.spawn_timer += dt;
        if self.spawn_timer < self.spawn_interval {
            return Vec::new();
        }
        self.spawn_timer = Fixed::ZERO;

        let mut spawned = Vec::new();
        for _ in 0..self.per_wave {
            if Self::active_count(grid) >= self.max_on_grid {
                break;
            }
            if let Some(coord) = Self::spawn_single(grid, rng) {
                spawned.push(coord);
            }
        }
        if self.border_spawn && Self::active_count(grid) < self.max_on_grid {
            if let Some(coord) = Self::spawn_near_borders(grid, rng) {
                spawned.push(coord);
            }
        }
        if !spawned.is_empty() {
            tracing::debug!(spawned = spawned.len(), "resource wave");
        }
        spawned
    }

    /// Cells currently holding a resource.
    #[must_use]
    pub fn active_count(grid: &HexGrid) -> u32 {
        grid.cells().iter().filter(|c| c.has_resource()).count() as u32
    }

    /// Clear a cell's resource. Returns what was there.
    pub fn remove_resource(grid: &mut HexGrid, coord: CellCoord) -> Option<(ResourceType, u32)> {
        let cell = grid.cell_mut(coord)?;
        let resource_type = cell.resource_type?;
        let amount = cell.resource_amount;
        cell.clear_resource();
        Some((resource_type, amount))
    }

    /// Number of resource cells per type.
    #[must_use]
    pub fn resource_counts(grid: &HexGrid) -> ResourceTally {
        let mut tally = ResourceTally::default();
        for cell in grid.cells() {
            if let Some(resource_type) = cell.resource_type {
                *tally.slot_mut(resource_type) += 1;
            }
        }
        tally
    }

    /// Cells holding at least `min_amount` units.
    #[must_use]
    pub fn hotspots(grid: &HexGrid, min_amount: u32) -> Vec<ResourceHotspot> {
        grid.cells()
            .iter()
            .filter_map(|cell| {
                let resource_type = cell.resource_type?;
                (cell.resource_amount >= min_amount).then_some(ResourceHotspot {
                    coord: cell.coord,
                    position: cell.center,
                    resource_type,
                    amount: cell.resource_amount,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> HexGrid {
        HexGrid::generate(400, 300, 40)
    }

    #[test]
    fn test_initial_spawn_amounts_in_range() {
        let mut grid = grid();
        let mut rng = SimRng::new(5);
        assert_eq!(ResourceSystem::initial_spawn(&mut grid, &mut rng, 12), 12);
        for cell in grid.cells().iter().filter(|c| c.has_resource()) {
            assert!((1..=5).contains(&cell.resource_amount));
            assert!(!cell.has_obstacle);
        }
        assert_eq!(ResourceSystem::active_count(&grid), 12);
    }

    #[test]
    fn test_never_spawns_on_obstacle() {
        let mut grid = grid();
        for cell in grid.cells_mut() {
            cell.has_obstacle = true;
        }
        let mut rng = SimRng::new(6);
        assert_eq!(ResourceSystem::spawn_single(&mut grid, &mut rng), None);
    }

    #[test]
    fn test_wave_waits_for_interval() {
        let mut grid = grid();
        let mut rng = SimRng::new(7);
        let mut system = ResourceSystem::new(&ResourceConfig::default());
        let dt = Fixed::from_num(1);
        for _ in 0..4 {
            assert!(system.update(&mut grid, &mut rng, dt).is_empty());
        }
        assert_eq!(system.update(&mut grid, &mut rng, dt).len(), 5);
    }

    #[test]
    fn test_wave_respects_grid_maximum() {
        let mut grid = grid();
        let mut rng = SimRng::new(8);
        let config = ResourceConfig {
            max_on_grid: 3,
            ..ResourceConfig::default()
        };
        let mut system = ResourceSystem::new(&config);
        system.update(&mut grid, &mut rng, Fixed::from_num(5));
        assert_eq!(ResourceSystem::active_count(&grid), 3);
    }

    #[test]
    fn test_type_distribution_is_weighted() {
        let mut rng = SimRng::new(9);
        let mut tally = ResourceTally::default();
        for _ in 0..2000 {
            *tally.slot_mut(ResourceSystem::select_type(&mut rng)) += 1;
        }
        assert!(tally.energy > tally.materials);
        assert!(tally.materials > tally.data);
    }

    #[test]
    fn test_border_spawn_prefers_contested_cells() {
        let mut grid = grid();
        // Left half team 1, right half team 2, leaving one neutral column.
        for cell in grid.cells_mut() {
            cell.control_level = match cell.coord.col {
                c if c < 3 => Fixed::from_num(-1),
                3 => Fixed::ZERO,
                _ => Fixed::from_num(1),
            };
        }
        let mut rng = SimRng::new(10);
        let mut contested_hits = 0;
        for _ in 0..20 {
            let coord = ResourceSystem::spawn_near_borders(&mut grid, &mut rng).unwrap();
            let amount = grid.cell(coord).unwrap().resource_amount;
            assert!((2..=5).contains(&amount));
            if (2..=4).contains(&coord.col) {
                contested_hits += 1;
            }
            ResourceSystem::remove_resource(&mut grid, coord);
        }
        assert!(contested_hits > 10);
    }

    #[test]
    fn test_hotspots_and_counts() {
        let mut grid = grid();
        grid.cell_mut(CellCoord::new(1, 1))
            .unwrap()
            .set_resource(ResourceType::Energy, 4);
        grid.cell_mut(CellCoord::new(2, 1))
            .unwrap()
            .set_resource(ResourceType::Data, 1);
        let hotspots = ResourceSystem::hotspots(&grid, 3);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].coord, CellCoord::new(1, 1));

        let counts = ResourceSystem::resource_counts(&grid);
        assert_eq!(counts.energy, 1);
        assert_eq!(counts.data, 1);
        assert_eq!(counts.total(), 2);

        assert_eq!(
            ResourceSystem::remove_resource(&mut grid, CellCoord::new(1, 1)),
            Some((ResourceType::Energy, 4))
        );
        assert!(ResourceSystem::hotspots(&grid, 3).is_empty());
    }
}
