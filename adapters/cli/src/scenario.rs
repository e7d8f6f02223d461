use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, ensure, Context, Result};
use glam::Vec2;
use gridwalk_core::{
    Direction, MapGeometry, MapId, MapMetrics, TileCoord, TileInfo, TileQuery,
    DEFAULT_TILE_SIZE,
};
use gridwalk_system_movement::Config;
use serde::Deserialize;

/// The single map every scenario plays on.
pub(crate) const SCENARIO_MAP: MapId = MapId::new(0);

/// Scripted session loaded from a TOML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) movement: Config,
    pub(crate) map: MapSection,
    #[serde(default, rename = "mover")]
    pub(crate) movers: Vec<MoverSection>,
}

/// `[map]` table: geometry plus the ASCII tile rows.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MapSection {
    #[serde(default = "default_tile_size")]
    pub(crate) tile_size: f32,
    #[serde(default)]
    pub(crate) offset: [f32; 2],
    pub(crate) rows: Vec<String>,
}

/// `[[mover]]` entry: where a mover starts and the directions it walks.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MoverSection {
    pub(crate) start: [i32; 2],
    #[serde(default)]
    pub(crate) facing: Direction,
    pub(crate) speed: Option<f32>,
    #[serde(default)]
    pub(crate) route: Vec<Direction>,
}

impl MoverSection {
    pub(crate) const fn start_tile(&self) -> TileCoord {
        TileCoord::new(self.start[0], self.start[1])
    }
}

const fn default_tile_size() -> f32 {
    DEFAULT_TILE_SIZE
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parses and validates scenario text.
    pub(crate) fn from_toml_str(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text).context("failed to parse scenario")?;
        scenario
            .movement
            .validate()
            .context("invalid [movement] table")?;
        let map = scenario.ascii_map()?;
        for (index, mover) in scenario.movers.iter().enumerate() {
            let tile = mover.start_tile();
            ensure!(
                map.contains(tile),
                "mover {index} starts outside the map at ({}, {})",
                tile.x(),
                tile.y()
            );
            ensure!(
                map.query(SCENARIO_MAP, tile).is_target_walkable,
                "mover {index} starts on a blocked tile at ({}, {})",
                tile.x(),
                tile.y()
            );
            if let Some(speed) = mover.speed {
                ensure!(
                    speed.is_finite() && speed > 0.0,
                    "mover {index} has unusable speed {speed}"
                );
            }
        }
        Ok(scenario)
    }

    /// Builds the tile map described by the `[map]` table.
    pub(crate) fn ascii_map(&self) -> Result<AsciiMap> {
        AsciiMap::parse(&self.map.rows)
    }

    /// Geometry described by the `[map]` table.
    pub(crate) fn metrics(&self) -> FixedMetrics {
        FixedMetrics {
            geometry: MapGeometry::new(
                self.map.tile_size,
                Vec2::new(self.map.offset[0], self.map.offset[1]),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cell {
    Floor,
    Wall,
    Forced(Direction),
    Ledge(Direction),
}

impl Cell {
    fn from_glyph(glyph: char) -> Option<Self> {
        let cell = match glyph {
            '.' => Self::Floor,
            '#' => Self::Wall,
            '^' => Self::Forced(Direction::North),
            '>' => Self::Forced(Direction::East),
            'v' => Self::Forced(Direction::South),
            '<' => Self::Forced(Direction::West),
            'N' => Self::Ledge(Direction::North),
            'E' => Self::Ledge(Direction::East),
            'S' => Self::Ledge(Direction::South),
            'W' => Self::Ledge(Direction::West),
            _ => return None,
        };
        Some(cell)
    }
}

/// Tile map parsed from ASCII rows.
///
/// Tiles past the edge lead to neighbouring maps and read as open floor; the
/// configured boundary tolerance decides how far a mover may step onto them.
#[derive(Clone, Debug)]
pub(crate) struct AsciiMap {
    width: i32,
    height: i32,
    cells: HashMap<TileCoord, Cell>,
}

impl AsciiMap {
    pub(crate) fn parse(rows: &[String]) -> Result<Self> {
        ensure!(!rows.is_empty(), "map has no rows");
        let width = rows[0].chars().count();
        ensure!(width > 0, "map rows are empty");

        let mut cells = HashMap::new();
        for (y, row) in rows.iter().enumerate() {
            ensure!(
                row.chars().count() == width,
                "row {y} is {} tiles wide, expected {width}",
                row.chars().count()
            );
            for (x, glyph) in row.chars().enumerate() {
                let Some(cell) = Cell::from_glyph(glyph) else {
                    bail!("unknown tile {glyph:?} at ({x}, {y})");
                };
                let tile = TileCoord::new(i32::try_from(x)?, i32::try_from(y)?);
                let _ = cells.insert(tile, cell);
            }
        }

        Ok(Self {
            width: i32::try_from(width)?,
            height: i32::try_from(rows.len())?,
            cells,
        })
    }

    pub(crate) const fn width(&self) -> i32 {
        self.width
    }

    pub(crate) const fn height(&self) -> i32 {
        self.height
    }

    fn contains(&self, tile: TileCoord) -> bool {
        self.cells.contains_key(&tile)
    }

    fn cell(&self, tile: TileCoord) -> Cell {
        self.cells.get(&tile).copied().unwrap_or(Cell::Floor)
    }
}

impl TileQuery for AsciiMap {
    fn query(&self, _map: MapId, tile: TileCoord) -> TileInfo {
        match self.cell(tile) {
            Cell::Floor | Cell::Forced(_) => TileInfo::WALKABLE,
            Cell::Wall => TileInfo::BLOCKED,
            Cell::Ledge(direction) => TileInfo::jump(direction),
        }
    }

    fn in_bounds(&self, _map: MapId, tile: TileCoord, tolerance: u32) -> bool {
        let slack = i32::try_from(tolerance).unwrap_or(i32::MAX);
        tile.x() >= -slack
            && tile.y() >= -slack
            && tile.x() < self.width.saturating_add(slack)
            && tile.y() < self.height.saturating_add(slack)
    }

    fn forced_direction(&self, _map: MapId, tile: TileCoord) -> Option<Direction> {
        match self.cell(tile) {
            Cell::Forced(direction) => Some(direction),
            _ => None,
        }
    }
}

/// Map metrics that report the same geometry for every map.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixedMetrics {
    geometry: MapGeometry,
}

impl MapMetrics for FixedMetrics {
    fn tile_size(&self, _map: MapId) -> f32 {
        self.geometry.tile_size()
    }

    fn world_offset(&self, _map: MapId) -> Vec2 {
        self.geometry.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
[movement]
boundary_tolerance = 0

[map]
tile_size = 32.0
offset = [8.0, 0.0]
rows = [
    ".###.",
    "..>E.",
    "...v.",
]

[[mover]]
start = [1, 1]
facing = "east"
route = ["east", "south"]
"#;

    #[test]
    fn parses_the_scenario_tables() {
        let scenario = Scenario::from_toml_str(SCENARIO).expect("scenario parses");

        assert_eq!(scenario.movement.boundary_tolerance(), 0);
        assert_eq!(scenario.movers.len(), 1);
        assert_eq!(scenario.movers[0].start_tile(), TileCoord::new(1, 1));
        assert_eq!(scenario.movers[0].route, vec![Direction::East, Direction::South]);
        assert_eq!(scenario.movers[0].speed, None);

        let metrics = scenario.metrics();
        assert_eq!(metrics.tile_size(SCENARIO_MAP), 32.0);
        assert_eq!(metrics.world_offset(SCENARIO_MAP), Vec2::new(8.0, 0.0));
    }

    #[test]
    fn legend_maps_to_tile_info() {
        let scenario = Scenario::from_toml_str(SCENARIO).expect("scenario parses");
        let map = scenario.ascii_map().expect("map parses");

        assert_eq!((map.width(), map.height()), (5, 3));
        assert_eq!(map.query(SCENARIO_MAP, TileCoord::new(1, 0)), TileInfo::BLOCKED);
        assert_eq!(map.query(SCENARIO_MAP, TileCoord::new(1, 1)), TileInfo::WALKABLE);
        assert_eq!(
            map.query(SCENARIO_MAP, TileCoord::new(3, 1)),
            TileInfo::jump(Direction::East)
        );
        assert_eq!(
            map.forced_direction(SCENARIO_MAP, TileCoord::new(2, 1)),
            Some(Direction::East)
        );
        assert_eq!(
            map.forced_direction(SCENARIO_MAP, TileCoord::new(3, 2)),
            Some(Direction::South)
        );
        assert!(map.in_bounds(SCENARIO_MAP, TileCoord::new(5, 1), 1));
        assert!(!map.in_bounds(SCENARIO_MAP, TileCoord::new(5, 1), 0));
        assert!(!map.in_bounds(SCENARIO_MAP, TileCoord::new(-2, 0), 1));
    }

    #[test]
    fn bundled_scenario_is_valid() {
        let scenario = Scenario::from_toml_str(include_str!("../scenarios/ledges.toml"))
            .expect("bundled scenario parses");
        assert_eq!(scenario.movers.len(), 2);
        assert_eq!(scenario.movers[1].speed, Some(6.0));
    }

    #[test]
    fn rejects_ragged_rows() {
        let rows = vec!["...".to_owned(), "..".to_owned()];
        let error = AsciiMap::parse(&rows).expect_err("ragged map");
        assert!(error.to_string().contains("row 1"));
    }

    #[test]
    fn rejects_unknown_glyphs() {
        let rows = vec![".?.".to_owned()];
        let error = AsciiMap::parse(&rows).expect_err("unknown glyph");
        assert!(error.to_string().contains("'?'"));
    }

    #[test]
    fn rejects_movers_inside_walls() {
        let text = SCENARIO.replace("start = [1, 1]", "start = [1, 0]");
        let error = Scenario::from_toml_str(&text).expect_err("mover in wall");
        assert!(format!("{error:#}").contains("blocked tile"));
    }

    #[test]
    fn rejects_invalid_movement_table() {
        let text = SCENARIO.replace("boundary_tolerance = 0", "event_pool_capacity = 0");
        let error = Scenario::from_toml_str(&text).expect_err("zero capacity");
        assert!(format!("{error:#}").contains("event_pool_capacity"));
    }
}
