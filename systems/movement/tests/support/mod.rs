#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
    time::Duration,
};

use glam::Vec2;
use gridwalk_core::{
    AnimationSink, BlockReason, Command, Direction, Event, MapGeometry, MapId, MapMetrics,
    MoverId, MovementBlocked, MovementCompleted, MovementStarted, PlaybackOptions, StepKind,
    TileCoord, TileInfo, TileQuery,
};
use gridwalk_system_movement::{Config, Movement, MovementObserver};
use gridwalk_world::{self as world, query, World};

pub const MAP: MapId = MapId::new(0);
pub const TILE: f32 = 16.0;
pub const FRAME: Duration = Duration::from_millis(16);

pub fn geometry() -> MapGeometry {
    MapGeometry::new(TILE, Vec2::ZERO)
}

/// Rectangular test map with walls, forced tiles and jump ledges. Tiles past
/// the edge but within tolerance are open floor.
#[derive(Debug, Default)]
pub struct GridTiles {
    width: i32,
    height: i32,
    walls: HashSet<TileCoord>,
    forced: HashMap<TileCoord, Direction>,
    ledges: HashMap<TileCoord, Option<Direction>>,
}

impl GridTiles {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn wall(mut self, tile: TileCoord) -> Self {
        let _ = self.walls.insert(tile);
        self
    }

    pub fn forced(mut self, tile: TileCoord, direction: Direction) -> Self {
        let _ = self.forced.insert(tile, direction);
        self
    }

    pub fn ledge(mut self, tile: TileCoord, allowed: Option<Direction>) -> Self {
        let _ = self.ledges.insert(tile, allowed);
        self
    }
}

impl TileQuery for GridTiles {
    fn query(&self, _map: MapId, tile: TileCoord) -> TileInfo {
        if let Some(allowed) = self.ledges.get(&tile) {
            return TileInfo {
                is_jump_tile: true,
                allowed_jump_direction: *allowed,
                is_target_walkable: false,
            };
        }
        if self.walls.contains(&tile) {
            TileInfo::BLOCKED
        } else {
            TileInfo::WALKABLE
        }
    }

    fn in_bounds(&self, _map: MapId, tile: TileCoord, tolerance: u32) -> bool {
        let slack = i32::try_from(tolerance).unwrap_or(i32::MAX);
        tile.x() >= -slack
            && tile.y() >= -slack
            && tile.x() < self.width + slack
            && tile.y() < self.height + slack
    }

    fn forced_direction(&self, _map: MapId, tile: TileCoord) -> Option<Direction> {
        self.forced.get(&tile).copied()
    }
}

/// Sixteen pixel tiles with the map origin at zero.
#[derive(Debug)]
pub struct FlatMetrics;

impl MapMetrics for FlatMetrics {
    fn tile_size(&self, _map: MapId) -> f32 {
        TILE
    }

    fn world_offset(&self, _map: MapId) -> Vec2 {
        Vec2::ZERO
    }
}

/// Sixteen pixel tiles whose map origin a test can move, standing in for a
/// map transition.
#[derive(Clone, Debug, Default)]
pub struct ShiftingMetrics {
    offset: Rc<Cell<Vec2>>,
}

impl ShiftingMetrics {
    pub fn shift_to(&self, offset: Vec2) {
        self.offset.set(offset);
    }
}

impl MapMetrics for ShiftingMetrics {
    fn tile_size(&self, _map: MapId) -> f32 {
        TILE
    }

    fn world_offset(&self, _map: MapId) -> Vec2 {
        self.offset.get()
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Clip {
    name: Option<&'static str>,
    complete: bool,
}

/// Animation sink whose one-shot clips only finish when a test says so.
#[derive(Debug, Default)]
pub struct Animator {
    clips: HashMap<MoverId, Clip>,
    pub history: Vec<(MoverId, &'static str, PlaybackOptions)>,
}

impl Animator {
    pub fn finish(&mut self, mover: MoverId) {
        if let Some(clip) = self.clips.get_mut(&mover) {
            clip.complete = true;
        }
    }

    pub fn clips_of(&self, mover: MoverId) -> Vec<&'static str> {
        self.history
            .iter()
            .filter(|(id, _, _)| *id == mover)
            .map(|(_, name, _)| *name)
            .collect()
    }
}

impl AnimationSink for Animator {
    fn set_animation(&mut self, mover: MoverId, name: &'static str, options: PlaybackOptions) {
        let _ = self.clips.insert(
            mover,
            Clip {
                name: Some(name),
                complete: false,
            },
        );
        self.history.push((mover, name, options));
    }

    fn current_animation(&self, mover: MoverId) -> Option<&'static str> {
        self.clips.get(&mover).and_then(|clip| clip.name)
    }

    fn is_complete(&self, mover: MoverId) -> bool {
        self.clips.get(&mover).is_some_and(|clip| clip.complete)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Started {
    pub mover: MoverId,
    pub direction: Direction,
    pub start_pixel: Vec2,
    pub target_pixel: Vec2,
    pub grid_at_dispatch: Option<TileCoord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Blocked {
    pub mover: MoverId,
    pub direction: Direction,
    pub tile: TileCoord,
    pub reason: BlockReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Completed {
    pub mover: MoverId,
    pub from: TileCoord,
    pub to: TileCoord,
    pub direction: Direction,
    pub kind: StepKind,
    pub grid_at_dispatch: Option<TileCoord>,
}

/// Everything the recording observer saw.
#[derive(Debug, Default)]
pub struct Journal {
    pub started: Vec<Started>,
    pub blocked: Vec<Blocked>,
    pub completed: Vec<Completed>,
}

impl Journal {
    pub fn blocked_for(&self, reason: BlockReason) -> usize {
        self.blocked
            .iter()
            .filter(|blocked| blocked.reason == reason)
            .count()
    }
}

/// Copies every event it receives into a shared journal.
#[derive(Debug)]
pub struct Recorder {
    journal: Rc<RefCell<Journal>>,
}

impl Recorder {
    pub fn new(journal: Rc<RefCell<Journal>>) -> Self {
        Self { journal }
    }
}

impl MovementObserver for Recorder {
    fn on_started(&mut self, event: &mut MovementStarted, world: &World) {
        self.journal.borrow_mut().started.push(Started {
            mover: event.mover(),
            direction: event.direction(),
            start_pixel: event.start_pixel(),
            target_pixel: event.target_pixel(),
            grid_at_dispatch: query::grid_position(world, event.mover()),
        });
    }

    fn on_blocked(&mut self, event: &MovementBlocked, _world: &World) {
        self.journal.borrow_mut().blocked.push(Blocked {
            mover: event.mover(),
            direction: event.direction(),
            tile: event.tile(),
            reason: event.reason(),
        });
    }

    fn on_completed(&mut self, event: &MovementCompleted, world: &World) {
        self.journal.borrow_mut().completed.push(Completed {
            mover: event.mover(),
            from: event.from(),
            to: event.to(),
            direction: event.direction(),
            kind: event.kind(),
            grid_at_dispatch: query::grid_position(world, event.mover()),
        });
    }
}

/// Vetoes every movement start.
#[derive(Debug)]
pub struct Veto;

impl MovementObserver for Veto {
    fn on_started(&mut self, event: &mut MovementStarted, _world: &World) {
        event.cancel();
    }
}

/// Vetoes a start whose target tile is already committed by another mover.
#[derive(Debug)]
pub struct OccupancyVeto;

impl MovementObserver for OccupancyVeto {
    fn on_started(&mut self, event: &mut MovementStarted, world: &World) {
        let target = geometry().tile_at(event.target_pixel());
        if let Some(occupant) = query::occupant(world, event.map(), target) {
            if occupant != event.mover() {
                event.cancel();
            }
        }
    }
}

/// World, system and fakes wired together for a scripted session.
pub struct Harness {
    pub world: World,
    pub movement: Movement,
    pub tiles: GridTiles,
    pub animations: Animator,
    pub journal: Rc<RefCell<Journal>>,
    pub events: Vec<Event>,
}

impl Harness {
    pub fn new(tiles: GridTiles) -> Self {
        Self::with_config(tiles, Config::default())
    }

    pub fn with_config(tiles: GridTiles, config: Config) -> Self {
        Self::with_metrics(tiles, config, Box::new(FlatMetrics))
    }

    pub fn with_metrics(tiles: GridTiles, config: Config, metrics: Box<dyn MapMetrics>) -> Self {
        let journal = Rc::new(RefCell::new(Journal::default()));
        let mut movement = Movement::new(config);
        movement.subscribe(Box::new(Recorder::new(Rc::clone(&journal))));
        Self {
            world: World::new(metrics),
            movement,
            tiles,
            animations: Animator::default(),
            journal,
            events: Vec::new(),
        }
    }

    pub fn apply(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.events);
    }

    pub fn spawn(&mut self, tile: TileCoord, facing: Direction) -> MoverId {
        let before = self.events.len();
        let speed = self.movement.config().default_speed();
        self.apply(Command::SpawnMover {
            map: MAP,
            tile,
            facing,
            speed,
        });
        self.events[before..]
            .iter()
            .find_map(|event| match event {
                Event::MoverSpawned { mover, .. } => Some(*mover),
                _ => None,
            })
            .expect("mover spawned")
    }

    pub fn request(&mut self, mover: MoverId, direction: Direction) {
        self.apply(Command::RequestMove { mover, direction });
    }

    pub fn tick(&mut self) {
        self.movement
            .tick(&mut self.world, &self.tiles, &mut self.animations, FRAME);
    }

    pub fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Ticks until the mover stops interpolating; panics after a second of
    /// simulated time.
    pub fn settle(&mut self, mover: MoverId) {
        for _ in 0..64 {
            if !self.is_moving(mover) {
                return;
            }
            self.tick();
        }
        panic!("mover {mover:?} never settled");
    }

    pub fn pixel(&self, mover: MoverId) -> Vec2 {
        query::mover(&self.world, mover)
            .map(|view| view.state.pixel_position())
            .expect("mover exists")
    }

    pub fn is_moving(&self, mover: MoverId) -> bool {
        query::mover(&self.world, mover).is_some_and(|view| view.state.is_moving())
    }

    pub fn grid(&self, mover: MoverId) -> TileCoord {
        query::grid_position(&self.world, mover).expect("mover exists")
    }
}
