//! Hexagonal spatial partition of the play area.
//!
//! Cells use offset coordinates: odd rows are shifted right by half the
//! horizontal spacing. The grid overflows the play area by one cell on every
//! side, so queries near the edge always find a cell.
//!
//! # Lookup
//!
//! [`HexGrid::cell_at_position`] inverts the layout to a 3x3 block of
//! candidate cells and runs the point-in-polygon test only on those, in
//! generation order. [`HexGrid::cell_at_position_scan`] is the full linear
//! scan and always returns the same cell.
//!
//! Flat-top hexes in this layout leave thin slivers between rows that no
//! polygon covers. A point inside the play area that falls in one resolves
//! to the cell with the nearest center (first in generation order on ties),
//! so every point of the play area belongs to exactly one cell.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed, SQRT_3};
use crate::team::TeamId;

/// Offset-row cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column, starting at -1.
    pub col: i32,
    /// Row, starting at -1.
    pub row: i32,
}

impl CellCoord {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Whether this row is shifted right. Row -1 counts as odd.
    #[must_use]
    pub const fn is_odd_row(self) -> bool {
        self.row.rem_euclid(2) == 1
    }
}

/// Neighbor offsets `(dcol, drow)` for even rows.
const EVEN_ROW_NEIGHBORS: [(i32, i32); 6] = [(1, 0), (-1, 0), (-1, -1), (0, -1), (-1, 1), (0, 1)];

/// Neighbor offsets `(dcol, drow)` for odd rows.
const ODD_ROW_NEIGHBORS: [(i32, i32); 6] = [(1, 0), (-1, 0), (0, -1), (1, -1), (0, 1), (1, 1)];

/// Harvestable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    /// Energy.
    Energy,
    /// Materials.
    Materials,
    /// Data.
    Data,
}

impl ResourceType {
    /// All resource kinds.
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Energy,
        ResourceType::Materials,
        ResourceType::Data,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ResourceType::Energy => "energy",
            ResourceType::Materials => "materials",
            ResourceType::Data => "data",
        }
    }
}

/// A single hex cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexCell {
    /// Grid coordinate.
    pub coord: CellCoord,
    /// World-space center.
    pub center: Vec2Fixed,
    /// Corner points, counter-clockwise from +X in 60 degree steps.
    pub vertices: [Vec2Fixed; 6],
    /// Territory control in `[-1, 1]`. Negative is team 1.
    #[serde(with = "fixed_serde")]
    pub control_level: Fixed,
    /// Resource kind, when the cell holds one.
    pub resource_type: Option<ResourceType>,
    /// Resource units left on the cell.
    pub resource_amount: u32,
    /// Obstacles block movement.
    pub has_obstacle: bool,
}

impl HexCell {
    /// Whether the cell holds a harvestable resource.
    #[must_use]
    pub fn has_resource(&self) -> bool {
        self.resource_type.is_some() && self.resource_amount > 0
    }

    /// Whether the cell is empty (no obstacle, no resource).
    #[must_use]
    pub fn is_free(&self) -> bool {
        !self.has_obstacle && self.resource_type.is_none()
    }

    /// Overwrite the resource slot. An amount of zero clears it.
    pub fn set_resource(&mut self, resource_type: ResourceType, amount: u32) {
        if amount == 0 {
            self.clear_resource();
        } else {
            self.resource_type = Some(resource_type);
            self.resource_amount = amount;
        }
    }

    /// Remove any resource from the cell.
    pub fn clear_resource(&mut self) {
        self.resource_type = None;
        self.resource_amount = 0;
    }

    /// Take up to `max` units. Returns what was taken; clears the slot when
    /// the cell runs dry.
    pub fn take_resource(&mut self, max: u32) -> Option<(ResourceType, u32)> {
        let resource_type = self.resource_type?;
        let taken = self.resource_amount.min(max);
        if taken == 0 {
            return None;
        }
        self.resource_amount -= taken;
        if self.resource_amount == 0 {
            self.resource_type = None;
        }
        Some((resource_type, taken))
    }

    /// Nudge control by `delta`, clamped to `[-1, 1]`.
    pub fn adjust_control(&mut self, delta: Fixed) {
        self.control_level = (self.control_level + delta).clamp(-Fixed::ONE, Fixed::ONE);
    }

    /// Ray-casting point-in-polygon test against the six vertices.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if (vi.y > point.y) != (vj.y > point.y) {
                let cross_x = (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x;
                if point.x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Cell counts by owner. Obstacle cells are excluded from the three
/// ownership buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryCensus {
    /// Cells owned by team 1.
    pub team1: usize,
    /// Cells owned by team 2.
    pub team2: usize,
    /// Non-obstacle cells owned by neither team.
    pub neutral: usize,
    /// Obstacle cells.
    pub obstacles: usize,
    /// All cells.
    pub total: usize,
}

impl TerritoryCensus {
    /// Cells held by `team`.
    #[must_use]
    pub const fn held_by(&self, team: TeamId) -> usize {
        match team {
            TeamId::One => self.team1,
            TeamId::Two => self.team2,
        }
    }

    /// Cells that take part in control accounting.
    #[must_use]
    pub const fn non_obstacle(&self) -> usize {
        self.total - self.obstacles
    }

    /// Fraction of non-obstacle cells held by `team`.
    #[must_use]
    pub fn fraction(&self, team: TeamId) -> Fixed {
        let playable = self.non_obstacle();
        if playable == 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(self.held_by(team)) / Fixed::from_num(playable)
    }

    /// `team1 + team2 + neutral == non-obstacle cells`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.team1 + self.team2 + self.neutral + self.obstacles == self.total
    }
}

/// The hex grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexGrid {
    width: u32,
    height: u32,
    #[serde(with = "fixed_serde")]
    hex_size: Fixed,
    #[serde(with = "fixed_serde")]
    horizontal_spacing: Fixed,
    #[serde(with = "fixed_serde")]
    vertical_spacing: Fixed,
    /// Stored columns, overflow included.
    col_count: i32,
    /// Stored rows, overflow included.
    row_count: i32,
    cells: Vec<HexCell>,
}

impl HexGrid {
    /// Tile a `width` x `height` play area with hexes of circumradius
    /// `hex_size`.
    #[must_use]
    pub fn generate(width: u32, height: u32, hex_size: u32) -> Self {
        let size = Fixed::from_num(hex_size.max(1));
        let hex_width = size * 2;
        let hex_height = size * Fixed::from_num(SQRT_3);
        let horizontal_spacing = hex_width * Fixed::from_num(0.75);
        let vertical_spacing = hex_height;

        let cols = (Fixed::from_num(width) / horizontal_spacing)
            .ceil()
            .to_num::<i32>()
            + 2;
        let rows = (Fixed::from_num(height) / vertical_spacing)
            .ceil()
            .to_num::<i32>()
            + 2;

        // Rows and columns run from -1 through `rows`/`cols` inclusive.
        let col_count = cols + 2;
        let row_count = rows + 2;

        let half = Fixed::from_num(0.5);
        let corner_offsets: [Vec2Fixed; 6] = [
            Vec2Fixed::new(size, Fixed::ZERO),
            Vec2Fixed::new(size * half, hex_height * half),
            Vec2Fixed::new(-size * half, hex_height * half),
            Vec2Fixed::new(-size, Fixed::ZERO),
            Vec2Fixed::new(-size * half, -hex_height * half),
            Vec2Fixed::new(size * half, -hex_height * half),
        ];

        let mut cells = Vec::with_capacity((col_count * row_count) as usize);
        for row in -1..=rows {
            for col in -1..=cols {
                let coord = CellCoord::new(col, row);
                let shift = if coord.is_odd_row() {
                    horizontal_spacing * half
                } else {
                    Fixed::ZERO
                };
                let center = Vec2Fixed::new(
                    Fixed::from_num(col) * horizontal_spacing + shift,
                    Fixed::from_num(row) * vertical_spacing,
                );
                let vertices = corner_offsets.map(|offset| center + offset);
                cells.push(HexCell {
                    coord,
                    center,
                    vertices,
                    control_level: Fixed::ZERO,
                    resource_type: None,
                    resource_amount: 0,
                    has_obstacle: false,
                });
            }
        }

        Self {
            width,
            height,
            hex_size: size,
            horizontal_spacing,
            vertical_spacing,
            col_count,
            row_count,
            cells,
        }
    }

    /// Play area width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Play area height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Play area as a vector, for clamping.
    #[must_use]
    pub fn world_size(&self) -> Vec2Fixed {
        Vec2Fixed::from_num(self.width, self.height)
    }

    /// Hex circumradius.
    #[must_use]
    pub const fn hex_size(&self) -> Fixed {
        self.hex_size
    }

    /// Highest column index.
    #[must_use]
    pub const fn max_col(&self) -> i32 {
        self.col_count - 2
    }

    /// Highest row index.
    #[must_use]
    pub const fn max_row(&self) -> i32 {
        self.row_count - 2
    }

    fn index_of(&self, coord: CellCoord) -> Option<usize> {
        let c = coord.col + 1;
        let r = coord.row + 1;
        if c < 0 || r < 0 || c >= self.col_count || r >= self.row_count {
            return None;
        }
        Some((r * self.col_count + c) as usize)
    }

    /// Cell at a coordinate.
    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&HexCell> {
        self.index_of(coord).and_then(|i| self.cells.get(i))
    }

    /// Mutable cell at a coordinate.
    pub fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut HexCell> {
        self.index_of(coord).and_then(|i| self.cells.get_mut(i))
    }

    /// All cells in generation order (row-major, starting at row -1).
    #[must_use]
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    /// All cells, mutably.
    pub fn cells_mut(&mut self) -> &mut [HexCell] {
        &mut self.cells
    }

    /// Number of cells, overflow included.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells without an obstacle.
    #[must_use]
    pub fn non_obstacle_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.has_obstacle).count()
    }

    /// Cell containing `point`, via layout inversion.
    #[must_use]
    pub fn cell_at_position(&self, point: Vec2Fixed) -> Option<&HexCell> {
        self.coord_at(point).and_then(|coord| self.cell(coord))
    }

    /// Mutable cell containing `point`.
    pub fn cell_at_position_mut(&mut self, point: Vec2Fixed) -> Option<&mut HexCell> {
        let coord = self.coord_at(point)?;
        self.cell_mut(coord)
    }

    /// Coordinate of the cell containing `point`.
    #[must_use]
    pub fn coord_at(&self, point: Vec2Fixed) -> Option<CellCoord> {
        let candidates = self.candidates(point);
        if let Some(&coord) = candidates
            .iter()
            .find(|&&coord| self.cell(coord).is_some_and(|cell| cell.contains(point)))
        {
            return Some(coord);
        }
        if !self.in_play_area(point) {
            return None;
        }
        candidates
            .iter()
            .filter_map(|&coord| self.cell(coord))
            .min_by_key(|cell| cell.center.distance_squared(point))
            .map(|cell| cell.coord)
    }

    /// The 3x3 block around the approximate row and column, in generation
    /// order. The nearest center to any point is always inside it.
    fn candidates(&self, point: Vec2Fixed) -> Vec<CellCoord> {
        let half = Fixed::from_num(0.5);
        let approx_row = (point.y / self.vertical_spacing + half).floor().to_num::<i32>();

        let mut coords = Vec::with_capacity(9);
        for row in (approx_row - 1)..=(approx_row + 1) {
            let shift = if CellCoord::new(0, row).is_odd_row() {
                self.horizontal_spacing * half
            } else {
                Fixed::ZERO
            };
            let approx_col = ((point.x - shift) / self.horizontal_spacing + half)
                .floor()
                .to_num::<i32>();
            for col in (approx_col - 1)..=(approx_col + 1) {
                coords.push(CellCoord::new(col, row));
            }
        }
        coords
    }

    /// Whether `point` lies in the `width` x `height` rectangle.
    #[must_use]
    pub fn in_play_area(&self, point: Vec2Fixed) -> bool {
        point.x >= Fixed::ZERO
            && point.y >= Fixed::ZERO
            && point.x <= Fixed::from_num(self.width)
            && point.y <= Fixed::from_num(self.height)
    }

    /// Cell containing `point`, via a linear scan of every cell.
    #[must_use]
    pub fn cell_at_position_scan(&self, point: Vec2Fixed) -> Option<&HexCell> {
        self.cells.iter().find(|cell| cell.contains(point)).or_else(|| {
            if self.in_play_area(point) {
                self.cells
                    .iter()
                    .min_by_key(|cell| cell.center.distance_squared(point))
            } else {
                None
            }
        })
    }

    /// Coordinates of the up to six neighbors of `coord`. Neighbors outside
    /// the grid are omitted.
    #[must_use]
    pub fn neighbors(&self, coord: CellCoord) -> Vec<CellCoord> {
        let offsets = if coord.is_odd_row() {
            &ODD_ROW_NEIGHBORS
        } else {
            &EVEN_ROW_NEIGHBORS
        };
        offsets
            .iter()
            .map(|&(dc, dr)| CellCoord::new(coord.col + dc, coord.row + dr))
            .filter(|&n| self.index_of(n).is_some())
            .collect()
    }

    /// Neighbor of `coord` in direction `dir` (0..6, same order as
    /// [`Self::neighbors`]). Following one direction repeatedly walks a
    /// straight hex line.
    #[must_use]
    pub fn neighbor_in_direction(&self, coord: CellCoord, dir: usize) -> Option<CellCoord> {
        let offsets = if coord.is_odd_row() {
            &ODD_ROW_NEIGHBORS
        } else {
            &EVEN_ROW_NEIGHBORS
        };
        let (dc, dr) = offsets[dir % offsets.len()];
        let next = CellCoord::new(coord.col + dc, coord.row + dr);
        self.index_of(next).map(|_| next)
    }

    /// Cells whose centers lie within `radius` of `point`.
    pub fn cells_within(
        &self,
        point: Vec2Fixed,
        radius: Fixed,
    ) -> impl Iterator<Item = &HexCell> + '_ {
        let radius_sq = radius * radius;
        self.cells
            .iter()
            .filter(move |cell| cell.center.distance_squared(point) <= radius_sq)
    }

    /// Count cells by owner.
    #[must_use]
    pub fn census(&self, ownership_threshold: Fixed) -> TerritoryCensus {
        let mut census = TerritoryCensus {
            total: self.cells.len(),
            ..TerritoryCensus::default()
        };
        for cell in &self.cells {
            if cell.has_obstacle {
                census.obstacles += 1;
                continue;
            }
            match TeamId::owning(cell.control_level, ownership_threshold) {
                Some(TeamId::One) => census.team1 += 1,
                Some(TeamId::Two) => census.team2 += 1,
                None => census.neutral += 1,
            }
        }
        census
    }
}
