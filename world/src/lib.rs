#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative mover state for the Gridwalk engine.
//!
//! Movers live in an arena of slots. Each slot owns its [`MovementState`] and
//! [`MovementRequest`] for the mover's whole lifetime; despawning only flags
//! the slot dead so a later spawn can reuse its storage. Out-of-tick changes
//! arrive through [`apply`], the movement system borrows slots in place via
//! [`World::mover_mut`], and everything else reads through [`query`].

mod cache;

use gridwalk_core::{
    Command, Event, MapGeometry, MapId, MapMetrics, MoverId, MovementRequest, MovementState,
};
use log::{debug, info, warn};

pub use cache::PositionCache;

/// Represents the authoritative set of movers and the map geometry they are
/// projected through.
#[derive(Debug)]
pub struct World {
    slots: Vec<MoverSlot>,
    free_slots: Vec<u32>,
    positions: PositionCache,
}

impl World {
    /// Creates an empty world projecting movers through `metrics`.
    #[must_use]
    pub fn new(metrics: Box<dyn MapMetrics>) -> Self {
        Self::with_capacity(metrics, 0)
    }

    /// Creates an empty world with storage reserved for `capacity` movers.
    #[must_use]
    pub fn with_capacity(metrics: Box<dyn MapMetrics>, capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_slots: Vec::with_capacity(capacity),
            positions: PositionCache::new(metrics),
        }
    }

    /// Number of arena slots, live or dead.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Identifier of the live mover stored in the slot at `index`.
    #[must_use]
    pub fn mover_in_slot(&self, index: usize) -> Option<MoverId> {
        let slot = self.slots.get(index)?;
        if !slot.live {
            return None;
        }
        u32::try_from(index).ok().map(MoverId::new)
    }

    /// Borrows a live mover for in-place mutation during a tick.
    pub fn mover_mut(&mut self, mover: MoverId) -> Option<MoverMut<'_>> {
        let slot = self.slot_mut(mover)?;
        Some(MoverMut {
            map: slot.map,
            state: &mut slot.state,
            request: &mut slot.request,
        })
    }

    /// Geometry of the map, memoized by the position cache.
    pub fn geometry(&mut self, map: MapId) -> MapGeometry {
        self.positions.geometry(map)
    }

    /// Read-only access to the position cache.
    #[must_use]
    pub fn positions(&self) -> &PositionCache {
        &self.positions
    }

    fn slot(&self, mover: MoverId) -> Option<&MoverSlot> {
        let index = usize::try_from(mover.get()).ok()?;
        self.slots.get(index).filter(|slot| slot.live)
    }

    fn slot_mut(&mut self, mover: MoverId) -> Option<&mut MoverSlot> {
        let index = usize::try_from(mover.get()).ok()?;
        self.slots.get_mut(index).filter(|slot| slot.live)
    }

    fn spawn(&mut self, map: MapId, state: MovementState) -> Option<MoverId> {
        let slot = MoverSlot {
            live: true,
            map,
            state,
            request: MovementRequest::default(),
        };

        if let Some(index) = self.free_slots.pop() {
            let entry = usize::try_from(index)
                .ok()
                .and_then(|position| self.slots.get_mut(position))?;
            *entry = slot;
            return Some(MoverId::new(index));
        }

        let index = u32::try_from(self.slots.len()).ok()?;
        self.slots.push(slot);
        Some(MoverId::new(index))
    }

    fn despawn(&mut self, mover: MoverId) -> bool {
        let Some(slot) = self.slot_mut(mover) else {
            return false;
        };
        slot.live = false;
        slot.request = MovementRequest::default();
        self.free_slots.push(mover.get());
        true
    }
}

/// Mutable borrow of a live mover's slot.
#[derive(Debug)]
pub struct MoverMut<'a> {
    /// Map the mover stands on.
    pub map: MapId,
    /// Movement state, mutated in place.
    pub state: &'a mut MovementState,
    /// Request slot, toggled in place.
    pub request: &'a mut MovementRequest,
}

#[derive(Clone, Debug)]
struct MoverSlot {
    live: bool,
    map: MapId,
    state: MovementState,
    request: MovementRequest,
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands addressing unknown or despawned movers are ignored.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SpawnMover {
            map,
            tile,
            facing,
            speed,
        } => {
            if !speed.is_finite() || speed <= 0.0 {
                warn!("refusing spawn on map {} with unusable speed {speed}", map.get());
                return;
            }
            let pixel = world.geometry(map).project(tile);
            let state = MovementState::new(tile, pixel, facing, speed);
            let Some(mover) = world.spawn(map, state) else {
                warn!("mover arena is full; spawn on map {} dropped", map.get());
                return;
            };
            info!(
                "spawned mover {} on map {} at ({}, {})",
                mover.get(),
                map.get(),
                tile.x(),
                tile.y()
            );
            out_events.push(Event::MoverSpawned { mover, map, tile });
        }
        Command::DespawnMover { mover } => {
            if world.despawn(mover) {
                info!("despawned mover {}", mover.get());
                out_events.push(Event::MoverDespawned { mover });
            } else {
                ignored(mover, "despawn");
            }
        }
        Command::RequestMove { mover, direction } => match world.slot_mut(mover) {
            Some(slot) => {
                slot.request.submit(direction);
                out_events.push(Event::MoveRequested { mover, direction });
            }
            None => ignored(mover, "move request"),
        },
        Command::BeginTurn { mover, direction } => match world.slot_mut(mover) {
            Some(slot) => {
                if slot.state.begin_turn(direction) {
                    debug!("mover {} turning {direction:?}", mover.get());
                    out_events.push(Event::TurnStarted { mover, direction });
                } else {
                    out_events.push(Event::TurnRejected { mover, direction });
                }
            }
            None => ignored(mover, "turn"),
        },
        Command::ReleaseIntent { mover } => match world.slot_mut(mover) {
            Some(slot) => {
                if slot.state.release_intent() {
                    out_events.push(Event::IntentReleased { mover });
                }
            }
            None => ignored(mover, "intent release"),
        },
        Command::SetMovementLocked { mover, locked } => match world.slot_mut(mover) {
            Some(slot) => {
                slot.state.set_movement_locked(locked);
                out_events.push(Event::MovementLockChanged { mover, locked });
            }
            None => ignored(mover, "movement lock"),
        },
        Command::SetMovementSpeed { mover, speed } => match world.slot_mut(mover) {
            Some(slot) => {
                if slot.state.set_movement_speed(speed) {
                    out_events.push(Event::MovementSpeedChanged { mover, speed });
                } else {
                    debug!("refused speed {speed} for mover {}", mover.get());
                }
            }
            None => ignored(mover, "speed change"),
        },
        Command::RelocateMover { mover, map, tile } => {
            let pixel = world.geometry(map).project(tile);
            match world.slot_mut(mover) {
                Some(slot) => {
                    if slot.state.relocate(tile, pixel) {
                        slot.map = map;
                        out_events.push(Event::MoverRelocated { mover, map, tile });
                    } else {
                        debug!("mover {} is interpolating; relocation ignored", mover.get());
                    }
                }
                None => ignored(mover, "relocation"),
            }
        }
        Command::InvalidateMap { map } => {
            let _ = world.positions.invalidate(map);
            out_events.push(Event::MapInvalidated { map: Some(map) });
        }
        Command::InvalidateAllMaps => {
            let _ = world.positions.invalidate_all();
            out_events.push(Event::MapInvalidated { map: None });
        }
    }
}

fn ignored(mover: MoverId, what: &str) {
    debug!("ignoring {what} for unknown mover {}", mover.get());
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{MoverSlot, World};
    use gridwalk_core::{
        MapGeometry, MapId, MoverId, MovementRequest, MovementState, TileCoord,
    };

    /// Read-only view of a live mover.
    #[derive(Clone, Copy, Debug)]
    pub struct MoverView<'a> {
        /// Identifier of the mover.
        pub id: MoverId,
        /// Map the mover stands on.
        pub map: MapId,
        /// Current movement state.
        pub state: &'a MovementState,
        /// Current request slot.
        pub request: &'a MovementRequest,
    }

    impl<'a> MoverView<'a> {
        fn from_slot(id: MoverId, slot: &'a MoverSlot) -> Self {
            Self {
                id,
                map: slot.map,
                state: &slot.state,
                request: &slot.request,
            }
        }
    }

    /// Captures a view of a single mover.
    #[must_use]
    pub fn mover(world: &World, mover: MoverId) -> Option<MoverView<'_>> {
        world
            .slot(mover)
            .map(|slot| MoverView::from_slot(mover, slot))
    }

    /// Iterates live movers in slot order.
    pub fn movers(world: &World) -> impl Iterator<Item = MoverView<'_>> {
        world
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.live)
            .filter_map(|(index, slot)| {
                let id = MoverId::new(u32::try_from(index).ok()?);
                Some(MoverView::from_slot(id, slot))
            })
    }

    /// Committed logical tile of a mover.
    #[must_use]
    pub fn grid_position(world: &World, mover: MoverId) -> Option<TileCoord> {
        world.slot(mover).map(|slot| slot.state.grid_position())
    }

    /// Live mover whose committed tile is `tile` on `map`, if any.
    #[must_use]
    pub fn occupant(world: &World, map: MapId, tile: TileCoord) -> Option<MoverId> {
        movers(world)
            .find(|view| view.map == map && view.state.grid_position() == tile)
            .map(|view| view.id)
    }

    /// Memoized geometry of a map, if it has been projected since the last
    /// invalidation.
    #[must_use]
    pub fn geometry(world: &World, map: MapId) -> Option<MapGeometry> {
        world.positions.cached(map)
    }

    /// Number of live movers.
    #[must_use]
    pub fn mover_count(world: &World) -> usize {
        world.slots.iter().filter(|slot| slot.live).count()
    }
}
