//! Obstacle placement.
//!
//! Obstacles only go on cells that are nearly neutral (`|control| < 0.1`),
//! hold no resource and are not already blocked. Placement that finds no
//! eligible cell reports a short count instead of failing.

use crate::config::ObstacleConfig;
use crate::hex_grid::{CellCoord, HexCell, HexGrid};
use crate::math::Fixed;
use crate::rng::SimRng;

/// Control magnitude above which a cell is too contested for an obstacle.
const NEUTRAL_LIMIT: f64 = 0.1;

/// Whether an obstacle may be placed on `cell`.
#[must_use]
pub fn is_eligible(cell: &HexCell) -> bool {
    cell.is_free() && cell.control_level.abs() < Fixed::from_num(NEUTRAL_LIMIT)
}

fn eligible_coords(grid: &HexGrid) -> Vec<CellCoord> {
    grid.cells()
        .iter()
        .filter(|c| is_eligible(c))
        .map(|c| c.coord)
        .collect()
}

/// Block a single cell. Returns false when the cell is missing or not
/// eligible.
pub fn place_obstacle(grid: &mut HexGrid, coord: CellCoord) -> bool {
    match grid.cell_mut(coord) {
        Some(cell) if is_eligible(cell) => {
            cell.has_obstacle = true;
            true
        }
        _ => false,
    }
}

/// Unblock a single cell. Returns false when nothing was removed.
pub fn clear_obstacle(grid: &mut HexGrid, coord: CellCoord) -> bool {
    match grid.cell_mut(coord) {
        Some(cell) if cell.has_obstacle => {
            cell.has_obstacle = false;
            true
        }
        _ => false,
    }
}

/// Scatter up to `count` single obstacles. Returns how many were placed.
pub fn place_random(grid: &mut HexGrid, rng: &mut SimRng, count: u32) -> u32 {
    let mut candidates = eligible_coords(grid);
    let mut placed = 0;
    while placed < count && !candidates.is_empty() {
        let pick = candidates.swap_remove(rng.index(candidates.len()));
        if place_obstacle(grid, pick) {
            placed += 1;
        }
    }
    if placed < count {
        tracing::debug!(requested = count, placed, "ran out of eligible obstacle cells");
    }
    placed
}

/// Place a straight wall of 5-9 cells along one hex direction, stopping
/// early at the grid edge or an ineligible cell.
pub fn place_wall(grid: &mut HexGrid, rng: &mut SimRng) -> u32 {
    let candidates = eligible_coords(grid);
    if candidates.is_empty() {
        return 0;
    }
    let mut current = candidates[rng.index(candidates.len())];
    let direction = rng.index(6);
    let length = rng.range_inclusive(5, 9);

    let mut placed = 0;
    while placed < length {
        if !place_obstacle(grid, current) {
            break;
        }
        placed += 1;
        match grid.neighbor_in_direction(current, direction) {
            Some(next) => current = next,
            None => break,
        }
    }
    placed
}

/// Grow a blob of 4-7 cells outward from a random seed cell.
pub fn place_cluster(grid: &mut HexGrid, rng: &mut SimRng) -> u32 {
    let candidates = eligible_coords(grid);
    if candidates.is_empty() {
        return 0;
    }
    let seed = candidates[rng.index(candidates.len())];
    let size = rng.range_inclusive(4, 7);

    let mut frontier = vec![seed];
    let mut placed = 0;
    while placed < size && !frontier.is_empty() {
        let next = frontier.swap_remove(rng.index(frontier.len()));
        if place_obstacle(grid, next) {
            placed += 1;
            frontier.extend(grid.neighbors(next));
        }
    }
    placed
}

/// Run every obstacle generator named in `config`. Returns the total placed.
pub fn generate(grid: &mut HexGrid, rng: &mut SimRng, config: &ObstacleConfig) -> u32 {
    let mut total = 0;
    for _ in 0..config.walls {
        total += place_wall(grid, rng);
    }
    for _ in 0..config.clusters {
        total += place_cluster(grid, rng);
    }
    total += place_random(grid, rng, config.random_count);
    tracing::debug!(obstacles = total, "generated obstacles");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_grid::ResourceType;

    fn grid() -> HexGrid {
        HexGrid::generate(600, 400, 40)
    }

    fn obstacle_count(grid: &HexGrid) -> usize {
        grid.cells().iter().filter(|c| c.has_obstacle).count()
    }

    #[test]
    fn test_place_random_exact_count() {
        let mut grid = grid();
        let mut rng = SimRng::new(1);
        assert_eq!(place_random(&mut grid, &mut rng, 10), 10);
        assert_eq!(obstacle_count(&grid), 10);
    }

    #[test]
    fn test_never_on_resource_or_contested_cell() {
        let mut grid = grid();
        for cell in grid.cells_mut() {
            if cell.coord.col % 2 == 0 {
                cell.set_resource(ResourceType::Data, 2);
            } else {
                cell.control_level = Fixed::from_num(0.5);
            }
        }
        let mut rng = SimRng::new(2);
        assert_eq!(place_random(&mut grid, &mut rng, 5), 0);
        assert_eq!(place_wall(&mut grid, &mut rng), 0);
        assert_eq!(place_cluster(&mut grid, &mut rng), 0);
        assert_eq!(obstacle_count(&grid), 0);
    }

    #[test]
    fn test_wall_is_bounded() {
        let mut grid = grid();
        let mut rng = SimRng::new(3);
        let placed = place_wall(&mut grid, &mut rng);
        assert!((1..=9).contains(&placed));
        assert_eq!(obstacle_count(&grid), placed as usize);
    }

    #[test]
    fn test_cluster_cells_are_connected() {
        let mut grid = grid();
        let mut rng = SimRng::new(4);
        let placed = place_cluster(&mut grid, &mut rng);
        assert!((1..=7).contains(&placed));

        let blocked: Vec<CellCoord> = grid
            .cells()
            .iter()
            .filter(|c| c.has_obstacle)
            .map(|c| c.coord)
            .collect();
        if blocked.len() > 1 {
            for coord in &blocked {
                let touching = grid
                    .neighbors(*coord)
                    .iter()
                    .any(|n| blocked.contains(n));
                assert!(touching, "{coord:?} is detached from the cluster");
            }
        }
    }

    #[test]
    fn test_clear_obstacle() {
        let mut grid = grid();
        let coord = CellCoord::new(2, 2);
        assert!(place_obstacle(&mut grid, coord));
        assert!(!place_obstacle(&mut grid, coord));
        assert!(clear_obstacle(&mut grid, coord));
        assert!(!clear_obstacle(&mut grid, coord));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let config = ObstacleConfig::default();
        let mut a = grid();
        let mut b = grid();
        generate(&mut a, &mut SimRng::new(77), &config);
        generate(&mut b, &mut SimRng::new(77), &config);
        assert_eq!(a, b);
    }
}
