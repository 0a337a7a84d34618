//! Team bases and resource ledgers.
//!
//! Each team has exactly one base, placed once at world construction on
//! the free cell nearest to its corner of the play area (top-left for team
//! 1, bottom-right for team 2). Ledger updates are integer arithmetic and
//! spending is all-or-nothing.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::hex_grid::{CellCoord, HexGrid, ResourceType};
use crate::math::{Fixed, Vec2Fixed};
use crate::team::TeamId;

/// Control seeded on a base cell.
const BASE_CONTROL: f64 = 1.0;
/// Control seeded on the first ring around a base.
const RING1_CONTROL: f64 = 0.8;
/// Control seeded on the second ring around a base.
const RING2_CONTROL: f64 = 0.6;

/// Amounts of the three resource kinds. Used both as a ledger and as a
/// price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Energy.
    pub energy: u32,
    /// Materials.
    pub materials: u32,
    /// Data.
    pub data: u32,
}

impl ResourceCost {
    /// Create a cost.
    #[must_use]
    pub const fn new(energy: u32, materials: u32, data: u32) -> Self {
        Self {
            energy,
            materials,
            data,
        }
    }

    /// Nothing.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Amount of one resource kind.
    #[must_use]
    pub const fn get(&self, resource_type: ResourceType) -> u32 {
        match resource_type {
            ResourceType::Energy => self.energy,
            ResourceType::Materials => self.materials,
            ResourceType::Data => self.data,
        }
    }

    /// Sum of all three kinds.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.energy + self.materials + self.data
    }

    /// Whether every kind is at least the matching kind of `cost`.
    #[must_use]
    pub const fn covers(&self, cost: &Self) -> bool {
        self.energy >= cost.energy && self.materials >= cost.materials && self.data >= cost.data
    }
}

impl std::ops::Add for ResourceCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.energy + rhs.energy,
            self.materials + rhs.materials,
            self.data + rhs.data,
        )
    }
}

impl std::ops::AddAssign for ResourceCost {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// A team base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Base {
    /// Owning team.
    pub team: TeamId,
    /// Cell the base sits on.
    pub coord: CellCoord,
    /// Center of that cell.
    pub position: Vec2Fixed,
}

/// Both bases plus their ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseSystem {
    bases: [Base; 2],
    ledgers: [ResourceCost; 2],
}

impl BaseSystem {
    /// Place both bases and seed territory around them.
    ///
    /// # Errors
    ///
    /// [`GameError::NoBaseCell`] when a team has no free cell inside the
    /// play area. Team 2 never shares team 1's cell.
    pub fn initialize(grid: &mut HexGrid) -> Result<Self> {
        let first = Self::find_base_cell(grid, TeamId::One)?;
        let second = Self::nearest_free_cell(grid, TeamId::Two, Some(first))?;

        let mut bases = Vec::with_capacity(2);
        for (team, coord) in [(TeamId::One, first), (TeamId::Two, second)] {
            let position = grid
                .cell(coord)
                .map(|c| c.center)
                .ok_or(GameError::NoBaseCell { team })?;
            Self::establish_territory(grid, coord, team);
            tracing::debug!(team = team.number(), col = coord.col, row = coord.row, "placed base");
            bases.push(Base {
                team,
                coord,
                position,
            });
        }

        // Rings of a close opposing base must not eat into a base cell
        for base in &bases {
            if let Some(cell) = grid.cell_mut(base.coord) {
                cell.control_level = base.team.sign() * Fixed::from_num(BASE_CONTROL);
            }
        }

        Ok(Self {
            bases: [bases[0], bases[1]],
            ledgers: [ResourceCost::ZERO; 2],
        })
    }

    /// Corner a team searches from.
    #[must_use]
    pub fn corner(grid: &HexGrid, team: TeamId) -> Vec2Fixed {
        match team {
            TeamId::One => Vec2Fixed::ZERO,
            TeamId::Two => grid.world_size(),
        }
    }

    /// Closest free cell inside the play area to the team's corner. Ties go
    /// to the cell generated first.
    ///
    /// # Errors
    ///
    /// [`GameError::NoBaseCell`] when no cell qualifies.
    pub fn find_base_cell(grid: &HexGrid, team: TeamId) -> Result<CellCoord> {
        Self::nearest_free_cell(grid, team, None)
    }

    fn nearest_free_cell(grid: &HexGrid, team: TeamId, taken: Option<CellCoord>) -> Result<CellCoord> {
        let corner = Self::corner(grid, team);
        let world = grid.world_size();
        grid.cells()
            .iter()
            .filter(|c| c.is_free() && Some(c.coord) != taken)
            .filter(|c| c.center.clamp_to(world) == c.center)
            .min_by_key(|c| c.center.distance_squared(corner))
            .map(|c| c.coord)
            .ok_or(GameError::NoBaseCell { team })
    }

    /// Seed control around `coord`: the cell itself at full control, the
    /// first ring at 0.8 and the second ring at 0.6, signed for `team`.
    /// Obstacle cells are left untouched.
    pub fn establish_territory(grid: &mut HexGrid, coord: CellCoord, team: TeamId) {
        let sign = team.sign();
        let ring1 = grid.neighbors(coord);
        let mut ring2: Vec<CellCoord> = Vec::new();
        for n in &ring1 {
            for nn in grid.neighbors(*n) {
                if nn != coord && !ring1.contains(&nn) && !ring2.contains(&nn) {
                    ring2.push(nn);
                }
            }
        }

        let mut seed = |c: CellCoord, level: f64| {
            if let Some(cell) = grid.cell_mut(c) {
                if !cell.has_obstacle {
                    cell.control_level = sign * Fixed::from_num(level);
                }
            }
        };
        seed(coord, BASE_CONTROL);
        for c in ring1 {
            seed(c, RING1_CONTROL);
        }
        for c in ring2 {
            seed(c, RING2_CONTROL);
        }
    }

    /// The team's base.
    #[must_use]
    pub const fn base(&self, team: TeamId) -> &Base {
        &self.bases[team.index()]
    }

    /// Both bases.
    #[must_use]
    pub const fn bases(&self) -> &[Base; 2] {
        &self.bases
    }

    /// Center of the team's base.
    #[must_use]
    pub const fn base_position(&self, team: TeamId) -> Vec2Fixed {
        self.bases[team.index()].position
    }

    /// The team's stockpile.
    #[must_use]
    pub const fn ledger(&self, team: TeamId) -> &ResourceCost {
        &self.ledgers[team.index()]
    }

    /// Sum of the team's stockpile.
    #[must_use]
    pub const fn total(&self, team: TeamId) -> u32 {
        self.ledgers[team.index()].total()
    }

    /// Credit `amount` of one resource kind.
    pub fn add_resource(&mut self, team: TeamId, resource_type: ResourceType, amount: u32) {
        let ledger = &mut self.ledgers[team.index()];
        match resource_type {
            ResourceType::Energy => ledger.energy += amount,
            ResourceType::Materials => ledger.materials += amount,
            ResourceType::Data => ledger.data += amount,
        }
    }

    /// Whether the team can afford `cost`.
    #[must_use]
    pub const fn has_resources(&self, team: TeamId, cost: &ResourceCost) -> bool {
        self.ledgers[team.index()].covers(cost)
    }

    /// Deduct `cost` from the team's stockpile. Returns false and leaves the
    /// ledger untouched when any kind is short.
    pub fn use_resources(&mut self, team: TeamId, cost: &ResourceCost) -> bool {
        if !self.has_resources(team, cost) {
            return false;
        }
        let ledger = &mut self.ledgers[team.index()];
        ledger.energy -= cost.energy;
        ledger.materials -= cost.materials;
        ledger.data -= cost.data;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> HexGrid {
        HexGrid::generate(600, 600, 40)
    }

    #[test]
    fn test_bases_sit_in_opposite_corners() {
        let mut grid = grid();
        let bases = BaseSystem::initialize(&mut grid).unwrap();
        let one = bases.base_position(TeamId::One);
        let two = bases.base_position(TeamId::Two);
        assert_eq!(one, Vec2Fixed::ZERO);
        assert!(two.x > Fixed::from_num(500));
        assert!(two.y > Fixed::from_num(500));
    }

    #[test]
    fn test_tiny_world_cannot_host_two_bases() {
        // Only cell (0, 0) has its center inside a 1x1 play area
        let mut grid = HexGrid::generate(1, 1, 40);
        assert_eq!(BaseSystem::find_base_cell(&grid, TeamId::One).unwrap(), CellCoord::new(0, 0));
        assert_eq!(BaseSystem::find_base_cell(&grid, TeamId::Two).unwrap(), CellCoord::new(0, 0));
        assert!(matches!(
            BaseSystem::initialize(&mut grid),
            Err(GameError::NoBaseCell { team: TeamId::Two })
        ));
    }

    #[test]
    fn test_bases_never_share_a_cell() {
        for (width, height) in [(1, 1), (30, 1), (60, 1), (30, 70), (60, 70), (120, 80)] {
            let mut grid = HexGrid::generate(width, height, 40);
            match BaseSystem::initialize(&mut grid) {
                Ok(bases) => {
                    let one = bases.base(TeamId::One).coord;
                    let two = bases.base(TeamId::Two).coord;
                    assert_ne!(one, two, "{width}x{height}");
                    assert_eq!(grid.cell(one).unwrap().control_level, -Fixed::ONE);
                    assert_eq!(grid.cell(two).unwrap().control_level, Fixed::ONE);
                }
                Err(err) => assert!(matches!(err, GameError::NoBaseCell { .. }), "{width}x{height}"),
            }
        }
    }

    #[test]
    fn test_base_skips_blocked_corner() {
        let mut grid = grid();
        grid.cell_mut(CellCoord::new(0, 0)).unwrap().has_obstacle = true;
        let coord = BaseSystem::find_base_cell(&grid, TeamId::One).unwrap();
        assert_ne!(coord, CellCoord::new(0, 0));
    }

    #[test]
    fn test_no_free_cell_fails() {
        let mut grid = grid();
        for cell in grid.cells_mut() {
            cell.has_obstacle = true;
        }
        assert!(matches!(
            BaseSystem::initialize(&mut grid),
            Err(GameError::NoBaseCell { team: TeamId::One })
        ));
    }

    #[test]
    fn test_establish_territory_rings() {
        let mut grid = grid();
        let center = CellCoord::new(4, 4);
        BaseSystem::establish_territory(&mut grid, center, TeamId::One);

        let level = |c: CellCoord| grid.cell(c).unwrap().control_level;
        assert_eq!(level(center), -Fixed::ONE);

        let ring1 = grid.neighbors(center);
        assert_eq!(ring1.len(), 6);
        for c in &ring1 {
            assert_eq!(level(*c), Fixed::from_num(-RING1_CONTROL));
        }

        let seeded_ring2 = grid
            .cells()
            .iter()
            .filter(|c| c.control_level == Fixed::from_num(-RING2_CONTROL))
            .count();
        assert_eq!(seeded_ring2, 12);

        let untouched = grid
            .cells()
            .iter()
            .filter(|c| c.control_level == Fixed::ZERO)
            .count();
        assert_eq!(untouched, grid.cell_count() - 19);
    }

    #[test]
    fn test_team_two_territory_is_positive() {
        let mut grid = grid();
        BaseSystem::establish_territory(&mut grid, CellCoord::new(3, 3), TeamId::Two);
        assert_eq!(grid.cell(CellCoord::new(3, 3)).unwrap().control_level, Fixed::ONE);
    }

    #[test]
    fn test_use_resources_is_all_or_nothing() {
        let mut grid = grid();
        let mut bases = BaseSystem::initialize(&mut grid).unwrap();
        bases.add_resource(TeamId::One, ResourceType::Energy, 5);
        bases.add_resource(TeamId::One, ResourceType::Materials, 100);
        bases.add_resource(TeamId::One, ResourceType::Data, 100);
        let before = *bases.ledger(TeamId::One);

        let cost = ResourceCost::new(10, 5, 5);
        assert!(!bases.has_resources(TeamId::One, &cost));
        assert!(!bases.use_resources(TeamId::One, &cost));
        assert_eq!(*bases.ledger(TeamId::One), before);

        let cheap = ResourceCost::new(5, 5, 5);
        assert!(bases.use_resources(TeamId::One, &cheap));
        assert_eq!(*bases.ledger(TeamId::One), ResourceCost::new(0, 95, 95));
        assert_eq!(bases.total(TeamId::Two), 0);
    }
}
