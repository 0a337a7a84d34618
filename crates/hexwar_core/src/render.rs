//! Drawing capability.
//!
//! The core never rasterises anything. Entities describe themselves to a
//! [`Surface`] through [`Renderable`]; front ends decide what a fill or a
//! marker looks like.

use crate::agent::{Agent, Role};
use crate::bases::Base;
use crate::effects::{CombatEffect, EffectKind, EFFECT_Z_INDEX};
use crate::hex_grid::{HexCell, ResourceType};
use crate::math::{Fixed, Vec2Fixed};
use crate::team::TeamId;

/// Draw order of hex cells.
pub const CELL_Z_INDEX: i32 = 0;
/// Draw order of bases.
pub const BASE_Z_INDEX: i32 = 2;
/// Draw order of agents.
pub const AGENT_Z_INDEX: i32 = 5;

/// Ownership threshold used for territory tinting.
const TINT_THRESHOLD: f64 = 0.2;

/// Semantic paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Territory tint; `team` is `None` for neutral ground.
    Territory {
        /// Owning team.
        team: Option<TeamId>,
        /// `|control|` in `[0, 1]`.
        strength: Fixed,
    },
    /// Impassable cell.
    Obstacle,
    /// Harvestable resource.
    Resource(ResourceType),
    /// Solid team color.
    Team(TeamId),
    /// Fading combat effect.
    Effect {
        /// Team of the affected agent.
        team: TeamId,
        /// Remaining opacity in `[0, 1]`.
        opacity: Fixed,
    },
}

/// Minimal drawing sink.
pub trait Surface {
    /// Fill a hexagon of circumradius `size`.
    fn fill_hex(&mut self, center: Vec2Fixed, size: Fixed, fill: Fill);
    /// Fill a circle.
    fn circle(&mut self, center: Vec2Fixed, radius: Fixed, fill: Fill);
    /// Put a single glyph at a point.
    fn marker(&mut self, position: Vec2Fixed, glyph: char, fill: Fill);
}

/// Something that can draw itself.
pub trait Renderable {
    /// Draw order; higher draws later.
    fn z_index(&self) -> i32;

    /// Invisible items are skipped.
    fn is_visible(&self) -> bool {
        true
    }

    /// Describe the item to `surface`.
    fn draw(&self, surface: &mut dyn Surface);
}

impl Renderable for HexCell {
    fn z_index(&self) -> i32 {
        CELL_Z_INDEX
    }

    fn draw(&self, surface: &mut dyn Surface) {
        let size = self.vertices[0].x - self.center.x;
        if self.has_obstacle {
            surface.fill_hex(self.center, size, Fill::Obstacle);
            return;
        }
        let team = TeamId::owning(self.control_level, Fixed::from_num(TINT_THRESHOLD));
        surface.fill_hex(
            self.center,
            size,
            Fill::Territory {
                team,
                strength: self.control_level.abs(),
            },
        );
        if let Some(resource_type) = self.resource_type {
            let glyph = match resource_type {
                ResourceType::Energy => 'e',
                ResourceType::Materials => 'm',
                ResourceType::Data => 'd',
            };
            surface.marker(self.center, glyph, Fill::Resource(resource_type));
        }
    }
}

impl Renderable for Base {
    fn z_index(&self) -> i32 {
        BASE_Z_INDEX
    }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.marker(self.position, 'B', Fill::Team(self.team));
    }
}

impl Renderable for Agent {
    fn z_index(&self) -> i32 {
        AGENT_Z_INDEX
    }

    fn is_visible(&self) -> bool {
        self.is_alive()
    }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.circle(self.position, self.stats.radius, Fill::Team(self.team));
        let glyph = match self.role {
            Role::Collector => 'c',
            Role::Explorer => 'x',
            Role::Defender => 'd',
            Role::Attacker => 'a',
        };
        // Carriers are drawn in upper case
        let glyph = if self.is_carrying() {
            glyph.to_ascii_uppercase()
        } else {
            glyph
        };
        surface.marker(self.position, glyph, Fill::Team(self.team));
    }
}

impl Renderable for CombatEffect {
    fn z_index(&self) -> i32 {
        EFFECT_Z_INDEX
    }

    fn is_visible(&self) -> bool {
        self.remaining > Fixed::ZERO
    }

    fn draw(&self, surface: &mut dyn Surface) {
        let fill = Fill::Effect {
            team: self.team,
            opacity: self.opacity(),
        };
        surface.circle(self.position, self.current_radius(), fill);
        let glyph = match self.kind {
            EffectKind::Hit => '*',
            EffectKind::Death => '#',
        };
        surface.marker(self.position, glyph, fill);
    }
}

/// Draw every visible item in z order. Items with equal z keep their input
/// order.
pub fn draw_all(items: &mut [&dyn Renderable], surface: &mut dyn Surface) {
    items.sort_by_key(|item| item.z_index());
    for item in items.iter().filter(|item| item.is_visible()) {
        item.draw(surface);
    }
}
