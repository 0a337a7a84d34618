//! ASCII world renderer for terminal review.
//!
//! [`AsciiSurface`] is a character-grid implementation of the core
//! [`Surface`]; [`render_world`] draws a whole [`WorldSystem`] onto one.

use std::fmt::Write as _;

use hexwar_core::math::{Fixed, Vec2Fixed};
use hexwar_core::render::{draw_all, Fill, Renderable, Surface};
use hexwar_core::team::TeamId;
use hexwar_core::world::WorldSystem;

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Width of the viewport in characters.
    pub width: usize,
    /// Height of the viewport in characters.
    pub height: usize,
    /// Show the legend and team counts.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 30,
            show_legend: true,
            use_color: false,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const BLUE: &str = "\x1b[34m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

fn team_color(team: TeamId) -> &'static str {
    match team {
        TeamId::One => colors::BLUE,
        TeamId::Two => colors::YELLOW,
    }
}

fn fill_color(fill: Fill) -> Option<&'static str> {
    match fill {
        Fill::Territory { team: Some(team), .. } | Fill::Team(team) => Some(team_color(team)),
        Fill::Territory { team: None, .. } | Fill::Obstacle => Some(colors::GRAY),
        Fill::Resource(_) => Some(colors::GREEN),
        Fill::Effect { .. } => Some(colors::RED),
    }
}

fn hex_glyph(fill: Fill) -> char {
    match fill {
        Fill::Obstacle => '^',
        Fill::Territory { team: Some(TeamId::One), .. } => '+',
        Fill::Territory { team: Some(TeamId::Two), .. } => '~',
        _ => '.',
    }
}

/// Character grid that world items draw themselves onto.
#[derive(Debug, Clone)]
pub struct AsciiSurface {
    width: usize,
    height: usize,
    scale_x: f64,
    scale_y: f64,
    cells: Vec<(char, Option<&'static str>)>,
}

impl AsciiSurface {
    /// A `width` x `height` grid covering a world of `world_size`.
    #[must_use]
    pub fn new(width: usize, height: usize, world_size: Vec2Fixed) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let world_w = world_size.x.to_num::<f64>().max(1.0);
        let world_h = world_size.y.to_num::<f64>().max(1.0);
        Self {
            width,
            height,
            scale_x: width as f64 / world_w,
            scale_y: height as f64 / world_h,
            cells: vec![(' ', None); width * height],
        }
    }

    /// Glyph at a character position.
    #[must_use]
    pub fn glyph(&self, col: usize, row: usize) -> Option<char> {
        (col < self.width && row < self.height).then(|| self.cells[row * self.width + col].0)
    }

    fn to_char(&self, point: Vec2Fixed) -> Option<(usize, usize)> {
        let col = (point.x.to_num::<f64>() * self.scale_x).floor();
        let row = (point.y.to_num::<f64>() * self.scale_y).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }

    fn put(&mut self, col: usize, row: usize, glyph: char, fill: Fill) {
        self.cells[row * self.width + col] = (glyph, fill_color(fill));
    }

    /// Paint every character whose center lies within `radius` world units
    /// of `center`.
    fn paint_disc(&mut self, center: Vec2Fixed, radius: f64, glyph: char, fill: Fill) {
        let cx = center.x.to_num::<f64>();
        let cy = center.y.to_num::<f64>();
        let min_col = ((cx - radius) * self.scale_x).floor().max(0.0) as usize;
        let max_col = (((cx + radius) * self.scale_x).ceil().max(0.0) as usize).min(self.width);
        let min_row = ((cy - radius) * self.scale_y).floor().max(0.0) as usize;
        let max_row = (((cy + radius) * self.scale_y).ceil().max(0.0) as usize).min(self.height);
        for row in min_row..max_row {
            for col in min_col..max_col {
                let x = (col as f64 + 0.5) / self.scale_x;
                let y = (row as f64 + 0.5) / self.scale_y;
                if (x - cx).hypot(y - cy) <= radius {
                    self.put(col, row, glyph, fill);
                }
            }
        }
    }

    /// Rows joined with newlines, optionally colored.
    #[must_use]
    pub fn to_string_with(&self, use_color: bool) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.cells.chunks(self.width) {
            for &(glyph, color) in row {
                match color {
                    Some(color) if use_color => {
                        out.push_str(color);
                        out.push(glyph);
                        out.push_str(colors::RESET);
                    }
                    _ => out.push(glyph),
                }
            }
            out.push('\n');
        }
        out
    }
}

impl Surface for AsciiSurface {
    fn fill_hex(&mut self, center: Vec2Fixed, size: Fixed, fill: Fill) {
        // Inner radius, so neighbours do not overpaint each other
        let apothem = size.to_num::<f64>() * 0.866;
        self.paint_disc(center, apothem, hex_glyph(fill), fill);
    }

    fn circle(&mut self, center: Vec2Fixed, radius: Fixed, fill: Fill) {
        // Only fading effects are large enough to show as an area
        if let Fill::Effect { opacity, .. } = fill {
            if opacity > Fixed::from_num(0.5) {
                self.paint_disc(center, radius.to_num::<f64>(), '*', fill);
            }
        }
    }

    fn marker(&mut self, position: Vec2Fixed, glyph: char, fill: Fill) {
        if let Some((col, row)) = self.to_char(position) {
            self.put(col, row, glyph, fill);
        }
    }
}

/// Render the whole world as ASCII art.
#[must_use]
pub fn render_world(world: &WorldSystem, config: &AsciiConfig) -> String {
    let grid = world.grid();
    let mut surface = AsciiSurface::new(config.width, config.height, grid.world_size());

    let mut items: Vec<&dyn Renderable> = Vec::new();
    items.extend(grid.cells().iter().map(|c| c as &dyn Renderable));
    items.extend(world.bases().bases().iter().map(|b| b as &dyn Renderable));
    items.extend(world.agent_system().agents().iter().map(|a| a as &dyn Renderable));
    items.extend(world.effects().effects().iter().map(|e| e as &dyn Renderable));
    draw_all(&mut items, &mut surface);

    let (bold, reset) = if config.use_color {
        (colors::BOLD, colors::RESET)
    } else {
        ("", "")
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{bold}== tick {} | t={:.1}s | seed {} =={reset}",
        world.get_tick(),
        world.time().to_num::<f64>(),
        world.config().seed
    );
    out.push_str(&surface.to_string_with(config.use_color));

    if config.show_legend {
        out.push_str("legend: + team 1 ground, ~ team 2 ground, . neutral, ^ obstacle, B base\n");
        out.push_str("        c collector, x explorer, d defender, a attacker (upper case = carrying)\n");
        out.push_str("        e/m/d resource, * hit, # death\n");
        for team in TeamId::ALL {
            let _ = writeln!(
                out,
                "team {}: {} agents, {} stored",
                team.number(),
                world.agent_system().live_count(team),
                world.bases().total(team)
            );
        }
        if let Some(outcome) = world.outcome() {
            let _ = writeln!(
                out,
                "{bold}winner: team {} by {} at {:.1}s{reset}",
                outcome.winner.number(),
                outcome.condition,
                outcome.time.to_num::<f64>()
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> AsciiSurface {
        AsciiSurface::new(20, 10, Vec2Fixed::from_num(200, 100))
    }

    #[test]
    fn test_marker_lands_on_scaled_position() {
        let mut s = surface();
        s.marker(Vec2Fixed::from_num(55, 35), 'a', Fill::Team(TeamId::One));
        assert_eq!(s.glyph(5, 3), Some('a'));
        assert_eq!(s.glyph(0, 0), Some(' '));
    }

    #[test]
    fn test_marker_off_grid_ignored() {
        let mut s = surface();
        s.marker(Vec2Fixed::from_num(500, 500), 'a', Fill::Team(TeamId::Two));
        s.marker(Vec2Fixed::from_num(-5, 5), 'a', Fill::Team(TeamId::Two));
        assert!(s.to_string_with(false).chars().all(|c| c == ' ' || c == '\n'));
    }

    #[test]
    fn test_hex_fill_uses_territory_glyph() {
        let mut s = surface();
        let fill = Fill::Territory {
            team: Some(TeamId::Two),
            strength: Fixed::ONE,
        };
        s.fill_hex(Vec2Fixed::from_num(100, 50), Fixed::from_num(30), fill);
        assert_eq!(s.glyph(10, 5), Some('~'));
        assert_eq!(s.glyph(0, 0), Some(' '));
        s.fill_hex(Vec2Fixed::from_num(100, 50), Fixed::from_num(30), Fill::Obstacle);
        assert_eq!(s.glyph(10, 5), Some('^'));
    }

    #[test]
    fn test_faint_effects_not_painted() {
        let mut s = surface();
        let faint = Fill::Effect {
            team: TeamId::One,
            opacity: Fixed::from_num(0.2),
        };
        s.circle(Vec2Fixed::from_num(100, 50), Fixed::from_num(20), faint);
        assert_eq!(s.glyph(10, 5), Some(' '));
    }

    #[test]
    fn test_color_output_wraps_glyphs() {
        let mut s = surface();
        s.marker(Vec2Fixed::from_num(5, 5), 'B', Fill::Team(TeamId::One));
        let plain = s.to_string_with(false);
        let colored = s.to_string_with(true);
        assert!(plain.starts_with('B'));
        assert!(colored.starts_with(colors::BLUE));
        assert_eq!(plain.lines().count(), 10);
    }

    #[test]
    fn test_render_world_shows_bases_and_agents() {
        let world = WorldSystem::new(hexwar_core::config::WorldConfig::small()).unwrap();
        let text = render_world(&world, &AsciiConfig::default());
        assert!(text.starts_with("== tick 0"));
        assert!(text.contains("team 1: 4 agents"));
        assert!(text.contains("team 2: 4 agents"));

        let map: String = text.lines().skip(1).take(30).collect();
        assert!(map.contains('+'));
        assert!(map.contains('~'));
        assert!(map.chars().any(|c| "cxdaB".contains(c)));
    }
}
