//! Obstacle-aware movement checks.
//!
//! Movement is validated at the destination only. Agents that would step
//! into an obstacle replan instead of pathfinding around it.

use crate::hex_grid::HexGrid;
use crate::math::Vec2Fixed;

/// Whether `point` lies inside an obstacle cell. Points outside the grid do
/// not collide.
#[must_use]
pub fn is_colliding_with_obstacle(grid: &HexGrid, point: Vec2Fixed) -> bool {
    grid.cell_at_position(point)
        .is_some_and(|cell| cell.has_obstacle)
}

/// Whether a move from `from` to `to` ends in an obstacle.
#[must_use]
pub fn check_movement_collision(grid: &HexGrid, _from: Vec2Fixed, to: Vec2Fixed) -> bool {
    is_colliding_with_obstacle(grid, to)
}

/// Move `point` out of an obstacle onto the center of the nearest free
/// neighboring cell. Points that are already clear, or whose neighbors are
/// all blocked, come back unchanged.
#[must_use]
pub fn constrain_position(grid: &HexGrid, point: Vec2Fixed) -> Vec2Fixed {
    let Some(cell) = grid.cell_at_position(point) else {
        return point;
    };
    if !cell.has_obstacle {
        return point;
    }
    grid.neighbors(cell.coord)
        .into_iter()
        .filter_map(|n| grid.cell(n))
        .filter(|n| !n.has_obstacle)
        .min_by_key(|n| n.center.distance_squared(point))
        .map_or(point, |n| n.center)
}
