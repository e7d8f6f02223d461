#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gridwalk movement engine.
//!
//! This crate defines the vocabulary that connects intent producers, the
//! authoritative world, and the movement system. Producers submit [`Command`]
//! values between ticks, the world executes them via its `apply` entry point
//! and reports [`Event`] values. During a tick the movement system mutates
//! [`MovementState`] in place and notifies observers through the pooled
//! lifecycle payloads [`MovementStarted`], [`MovementBlocked`] and
//! [`MovementCompleted`].
//!
//! Tile data, map metrics and animation playback are owned by external
//! collaborators reached through the [`TileQuery`], [`MapMetrics`] and
//! [`AnimationSink`] traits.

pub mod animation;
mod state;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use state::{MovementRequest, MovementState, RunningState, StepKind};

/// Tile edge length used when a map reports unusable metrics.
pub const DEFAULT_TILE_SIZE: f32 = 16.0;

/// Cardinal directions a mover can face or travel in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward decreasing y.
    North,
    /// Toward increasing x.
    East,
    /// Toward increasing y.
    #[default]
    South,
    /// Toward decreasing x.
    West,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit tile offset travelled by one step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

/// Integer tile coordinate on a map.
///
/// Coordinates are signed: a tile one past the west or north edge of a map is
/// `-1`, which movers may occupy while crossing into a neighbouring map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Adjacent tile in the provided direction.
    #[must_use]
    pub const fn neighbor(self, direction: Direction) -> Self {
        self.offset(direction, 1)
    }

    /// Tile reached by travelling `distance` tiles in the provided direction.
    #[must_use]
    pub const fn offset(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x.saturating_add(dx.saturating_mul(distance)),
            y: self.y.saturating_add(dy.saturating_mul(distance)),
        }
    }
}

/// Identifier of a loaded map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(u32);

impl MapId {
    /// Creates a new map identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a mover, stable for the mover's lifetime.
///
/// The value doubles as the index of the mover's arena slot, so identifiers of
/// despawned movers are handed out again by later spawns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoverId(u32);

impl MoverId {
    /// Creates a new mover identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Pixel layout of a map: tile edge length and world-space origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapGeometry {
    tile_size: f32,
    offset: Vec2,
}

impl MapGeometry {
    /// Creates a geometry description.
    ///
    /// Non-positive or non-finite tile sizes are replaced by
    /// [`DEFAULT_TILE_SIZE`]; use [`MapGeometry::is_usable_tile_size`] to detect
    /// the substitution beforehand.
    #[must_use]
    pub fn new(tile_size: f32, offset: Vec2) -> Self {
        let tile_size = if Self::is_usable_tile_size(tile_size) {
            tile_size
        } else {
            DEFAULT_TILE_SIZE
        };
        Self { tile_size, offset }
    }

    /// Reports whether the tile size can be used for projection.
    #[must_use]
    pub fn is_usable_tile_size(tile_size: f32) -> bool {
        tile_size.is_finite() && tile_size > 0.0
    }

    /// Edge length of a tile in pixels.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// World-space pixel position of tile (0, 0).
    #[must_use]
    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Render projection of a tile: the pixel position of its origin corner.
    #[must_use]
    pub fn project(&self, tile: TileCoord) -> Vec2 {
        self.offset + Vec2::new(tile.x() as f32, tile.y() as f32) * self.tile_size
    }

    /// Tile whose projection is nearest to the provided pixel position.
    #[must_use]
    pub fn tile_at(&self, pixel: Vec2) -> TileCoord {
        let local = ((pixel - self.offset) / self.tile_size).round();
        TileCoord::new(local.x as i32, local.y as i32)
    }
}

/// Walkability and jump data reported for a single tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileInfo {
    /// Whether the tile is a ledge that launches a two-tile jump.
    pub is_jump_tile: bool,
    /// Only direction allowed to initiate the jump, if any.
    pub allowed_jump_direction: Option<Direction>,
    /// Whether a mover may step onto the tile.
    pub is_target_walkable: bool,
}

impl TileInfo {
    /// Ordinary walkable floor.
    pub const WALKABLE: TileInfo = TileInfo {
        is_jump_tile: false,
        allowed_jump_direction: None,
        is_target_walkable: true,
    };

    /// Solid tile that refuses every mover.
    pub const BLOCKED: TileInfo = TileInfo {
        is_jump_tile: false,
        allowed_jump_direction: None,
        is_target_walkable: false,
    };

    /// Ledge that may only be jumped in the provided direction.
    #[must_use]
    pub const fn jump(direction: Direction) -> Self {
        Self {
            is_jump_tile: true,
            allowed_jump_direction: Some(direction),
            is_target_walkable: false,
        }
    }
}

/// Tile collision and terrain data source.
pub trait TileQuery {
    /// Reports jump and walkability data for the tile.
    fn query(&self, map: MapId, tile: TileCoord) -> TileInfo;

    /// Reports whether the tile lies within the map, allowing `tolerance`
    /// tiles past each edge.
    fn in_bounds(&self, map: MapId, tile: TileCoord, tolerance: u32) -> bool;

    /// Direction a mover standing on the tile is forced to travel, if any.
    fn forced_direction(&self, _map: MapId, _tile: TileCoord) -> Option<Direction> {
        None
    }
}

/// Source of per-map pixel metrics.
pub trait MapMetrics {
    /// Edge length of a tile in pixels.
    fn tile_size(&self, map: MapId) -> f32;

    /// World-space pixel position of tile (0, 0).
    fn world_offset(&self, map: MapId) -> Vec2;
}

/// Playback flags passed along with an animation switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackOptions {
    /// Restart the animation even if it is already playing.
    pub force_restart: bool,
    /// Play the animation once and then report completion.
    pub play_once: bool,
}

impl PlaybackOptions {
    /// Looping playback that keeps the current frame when already playing.
    pub const LOOP: PlaybackOptions = PlaybackOptions {
        force_restart: false,
        play_once: false,
    };

    /// Single playback restarted from its first frame.
    pub const ONE_SHOT: PlaybackOptions = PlaybackOptions {
        force_restart: true,
        play_once: true,
    };
}

/// Animation playback engine driven by the movement system.
pub trait AnimationSink {
    /// Switches the mover's animation.
    fn set_animation(&mut self, mover: MoverId, name: &'static str, options: PlaybackOptions);

    /// Name of the animation currently playing for the mover.
    fn current_animation(&self, mover: MoverId) -> Option<&'static str>;

    /// Whether the mover's play-once animation has finished.
    fn is_complete(&self, mover: MoverId) -> bool;
}

/// Reasons a movement request can be rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockReason {
    /// An observer vetoed the pre-validation event.
    Cancelled,
    /// The target lies further than the boundary tolerance outside the map.
    OutOfBounds,
    /// A jump tile was approached from a direction it does not permit.
    WrongJumpDirection,
    /// The tile a jump would land on cannot be entered.
    LandingBlocked,
    /// The target tile is not walkable.
    #[default]
    Collision,
}

/// Pre-validation notification, the only cancellable lifecycle event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovementStarted {
    mover: MoverId,
    map: MapId,
    direction: Direction,
    start_pixel: Vec2,
    target_pixel: Vec2,
    cancelled: bool,
}

impl MovementStarted {
    /// Overwrites the payload and clears the cancellation flag.
    pub fn prepare(
        &mut self,
        mover: MoverId,
        map: MapId,
        direction: Direction,
        start_pixel: Vec2,
        target_pixel: Vec2,
    ) {
        self.mover = mover;
        self.map = map;
        self.direction = direction;
        self.start_pixel = start_pixel;
        self.target_pixel = target_pixel;
        self.cancelled = false;
    }

    /// Mover attempting to move.
    #[must_use]
    pub const fn mover(&self) -> MoverId {
        self.mover
    }

    /// Map the mover stands on.
    #[must_use]
    pub const fn map(&self) -> MapId {
        self.map
    }

    /// Requested direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Pixel position the movement would start from.
    #[must_use]
    pub const fn start_pixel(&self) -> Vec2 {
        self.start_pixel
    }

    /// Pixel position of the adjacent tile in the requested direction.
    #[must_use]
    pub const fn target_pixel(&self) -> Vec2 {
        self.target_pixel
    }

    /// Vetoes the movement.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether an observer vetoed the movement.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Notification that a movement request was rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovementBlocked {
    mover: MoverId,
    map: MapId,
    direction: Direction,
    tile: TileCoord,
    reason: BlockReason,
}

impl MovementBlocked {
    /// Overwrites the payload.
    pub fn prepare(
        &mut self,
        mover: MoverId,
        map: MapId,
        direction: Direction,
        tile: TileCoord,
        reason: BlockReason,
    ) {
        self.mover = mover;
        self.map = map;
        self.direction = direction;
        self.tile = tile;
        self.reason = reason;
    }

    /// Mover whose request was rejected.
    #[must_use]
    pub const fn mover(&self) -> MoverId {
        self.mover
    }

    /// Map the mover stands on.
    #[must_use]
    pub const fn map(&self) -> MapId {
        self.map
    }

    /// Direction of the rejected movement, after any forced override.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Tile the rejected movement targeted.
    #[must_use]
    pub const fn tile(&self) -> TileCoord {
        self.tile
    }

    /// Why the movement was rejected.
    #[must_use]
    pub const fn reason(&self) -> BlockReason {
        self.reason
    }
}

/// Notification that a step or jump finished interpolating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovementCompleted {
    mover: MoverId,
    map: MapId,
    from: TileCoord,
    to: TileCoord,
    direction: Direction,
    kind: StepKind,
    elapsed: Duration,
}

impl MovementCompleted {
    /// Overwrites the payload.
    pub fn prepare(
        &mut self,
        mover: MoverId,
        map: MapId,
        from: TileCoord,
        to: TileCoord,
        direction: Direction,
        kind: StepKind,
        elapsed: Duration,
    ) {
        self.mover = mover;
        self.map = map;
        self.from = from;
        self.to = to;
        self.direction = direction;
        self.kind = kind;
        self.elapsed = elapsed;
    }

    /// Mover that finished moving.
    #[must_use]
    pub const fn mover(&self) -> MoverId {
        self.mover
    }

    /// Map the mover stands on.
    #[must_use]
    pub const fn map(&self) -> MapId {
        self.map
    }

    /// Tile the mover left.
    #[must_use]
    pub const fn from(&self) -> TileCoord {
        self.from
    }

    /// Tile the mover arrived at.
    #[must_use]
    pub const fn to(&self) -> TileCoord {
        self.to
    }

    /// Direction of travel.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the movement was a step or a jump.
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        self.kind
    }

    /// Simulated time spent interpolating.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Commands that express all out-of-tick world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Creates a mover standing idle on a tile.
    SpawnMover {
        /// Map the mover is placed on.
        map: MapId,
        /// Tile the mover occupies.
        tile: TileCoord,
        /// Initial facing and movement direction.
        facing: Direction,
        /// Interpolation speed in tiles per second.
        speed: f32,
    },
    /// Retires a mover and frees its arena slot.
    DespawnMover {
        /// Mover to retire.
        mover: MoverId,
    },
    /// Writes a directional intent into the mover's request slot.
    RequestMove {
        /// Mover receiving the intent.
        mover: MoverId,
        /// Requested direction.
        direction: Direction,
    },
    /// Enters the turn-in-place sub-state when the mover may turn.
    BeginTurn {
        /// Mover attempting to turn.
        mover: MoverId,
        /// Direction to face.
        direction: Direction,
    },
    /// Signals that directional input was released.
    ReleaseIntent {
        /// Mover whose intent ended.
        mover: MoverId,
    },
    /// Sets or clears the external movement veto.
    SetMovementLocked {
        /// Mover to update.
        mover: MoverId,
        /// Whether movement starts are vetoed.
        locked: bool,
    },
    /// Changes the interpolation speed of a mover.
    SetMovementSpeed {
        /// Mover to update.
        mover: MoverId,
        /// Interpolation speed in tiles per second.
        speed: f32,
    },
    /// Places an idle mover on a tile, possibly on another map.
    RelocateMover {
        /// Mover to relocate.
        mover: MoverId,
        /// Destination map.
        map: MapId,
        /// Destination tile.
        tile: TileCoord,
    },
    /// Drops the cached geometry of a map after it was loaded or unloaded.
    InvalidateMap {
        /// Map whose geometry changed.
        map: MapId,
    },
    /// Drops every cached map geometry.
    InvalidateAllMaps,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A mover was created.
    MoverSpawned {
        /// Identifier assigned to the mover.
        mover: MoverId,
        /// Map the mover stands on.
        map: MapId,
        /// Tile the mover occupies.
        tile: TileCoord,
    },
    /// A mover was retired.
    MoverDespawned {
        /// Identifier of the retired mover.
        mover: MoverId,
    },
    /// A request slot received a directional intent.
    MoveRequested {
        /// Mover receiving the intent.
        mover: MoverId,
        /// Requested direction.
        direction: Direction,
    },
    /// A mover entered the turn-in-place sub-state.
    TurnStarted {
        /// Turning mover.
        mover: MoverId,
        /// Direction the mover now faces.
        direction: Direction,
    },
    /// A turn was refused because the mover is moving or already faces the
    /// direction.
    TurnRejected {
        /// Mover that could not turn.
        mover: MoverId,
        /// Requested direction.
        direction: Direction,
    },
    /// A mover's running state returned to idle after input release.
    IntentReleased {
        /// Mover whose intent ended.
        mover: MoverId,
    },
    /// The external movement veto changed.
    MovementLockChanged {
        /// Updated mover.
        mover: MoverId,
        /// Whether movement starts are vetoed.
        locked: bool,
    },
    /// The interpolation speed of a mover changed.
    MovementSpeedChanged {
        /// Updated mover.
        mover: MoverId,
        /// New speed in tiles per second.
        speed: f32,
    },
    /// A mover was placed on a new tile.
    MoverRelocated {
        /// Relocated mover.
        mover: MoverId,
        /// Destination map.
        map: MapId,
        /// Destination tile.
        tile: TileCoord,
    },
    /// Cached geometry was dropped; `None` means every map.
    MapInvalidated {
        /// Map whose geometry was dropped.
        map: Option<MapId>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn offset_walks_multiple_tiles() {
        let origin = TileCoord::new(5, 5);
        assert_eq!(origin.offset(Direction::East, 2), TileCoord::new(7, 5));
        assert_eq!(origin.neighbor(Direction::North), TileCoord::new(5, 4));
        assert_eq!(
            TileCoord::new(0, 0).neighbor(Direction::West),
            TileCoord::new(-1, 0)
        );
    }

    #[test]
    fn opposite_directions_cancel_out() {
        for direction in Direction::ALL {
            let there = TileCoord::new(3, 3).neighbor(direction);
            assert_eq!(there.neighbor(direction.opposite()), TileCoord::new(3, 3));
        }
    }

    #[test]
    fn geometry_projects_and_recovers_tiles() {
        let geometry = MapGeometry::new(16.0, Vec2::new(160.0, -32.0));
        let tile = TileCoord::new(-1, 4);
        let pixel = geometry.project(tile);

        assert_relative_eq!(pixel.x, 144.0);
        assert_relative_eq!(pixel.y, 32.0);
        assert_eq!(geometry.tile_at(pixel), tile);
        assert_eq!(geometry.tile_at(pixel + Vec2::new(0.3, -0.2)), tile);
    }

    #[test]
    fn geometry_falls_back_on_unusable_tile_size() {
        assert_eq!(MapGeometry::new(0.0, Vec2::ZERO).tile_size(), DEFAULT_TILE_SIZE);
        assert_eq!(
            MapGeometry::new(f32::NAN, Vec2::ZERO).tile_size(),
            DEFAULT_TILE_SIZE
        );
        assert_eq!(MapGeometry::new(32.0, Vec2::ZERO).tile_size(), 32.0);
    }

    #[test]
    fn started_event_resets_cancellation() {
        let mut event = MovementStarted::default();
        event.cancel();
        event.prepare(
            MoverId::new(3),
            MapId::new(1),
            Direction::West,
            Vec2::ZERO,
            Vec2::new(-16.0, 0.0),
        );

        assert!(!event.is_cancelled());
        assert_eq!(event.mover(), MoverId::new(3));
        assert_eq!(event.direction(), Direction::West);
    }

    #[test]
    fn directions_deserialize_from_lowercase_names() {
        #[derive(Deserialize)]
        struct Route {
            steps: Vec<Direction>,
        }

        let route: Route = toml::from_str(r#"steps = ["north", "east", "south", "west"]"#)
            .expect("route parses");
        assert_eq!(route.steps, Direction::ALL.to_vec());
    }
}
