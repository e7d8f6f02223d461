use std::{fmt, time::Duration};

use glam::Vec2;
use gridwalk_core::{
    BlockReason, Direction, MapId, MoverId, MovementBlocked, MovementCompleted, MovementStarted,
    StepKind, TileCoord,
};
use gridwalk_world::World;
use log::warn;

/// Receives movement lifecycle notifications synchronously during a tick.
///
/// Events are borrowed from a pool and recycled as soon as the call returns,
/// so implementations copy out whatever they need to keep. The world is
/// passed read-only; other movers' committed grid positions are already
/// current when a handler runs.
pub trait MovementObserver {
    /// Called before any state changes. Calling [`MovementStarted::cancel`]
    /// vetoes the movement.
    fn on_started(&mut self, _event: &mut MovementStarted, _world: &World) {}

    /// Called when a request is rejected.
    fn on_blocked(&mut self, _event: &MovementBlocked, _world: &World) {}

    /// Called when a step or jump finishes interpolating.
    fn on_completed(&mut self, _event: &MovementCompleted, _world: &World) {}
}

/// Usage counters of a single event pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of event objects allocated up front.
    pub capacity: usize,
    /// Event objects currently rented.
    pub outstanding: usize,
    /// Highest number of simultaneously rented event objects.
    pub peak_outstanding: usize,
    /// Total successful rentals.
    pub rentals: u64,
    /// Rentals refused because every object was out.
    pub exhaustions: u64,
}

/// Usage counters of the three lifecycle event pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventPoolStats {
    /// Pool backing [`MovementStarted`].
    pub started: PoolStats,
    /// Pool backing [`MovementBlocked`].
    pub blocked: PoolStats,
    /// Pool backing [`MovementCompleted`].
    pub completed: PoolStats,
}

/// Fixed-capacity freelist of reusable event objects.
#[derive(Debug)]
pub(crate) struct EventPool<T> {
    slots: Vec<T>,
    free: Vec<usize>,
    stats: PoolStats,
}

/// Proof of a rental; consumed when the object is returned.
#[derive(Debug)]
#[must_use]
pub(crate) struct Lease {
    index: usize,
}

impl<T: Default> EventPool<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| T::default()).collect(),
            free: (0..capacity).rev().collect(),
            stats: PoolStats {
                capacity,
                ..PoolStats::default()
            },
        }
    }

    pub(crate) fn rent(&mut self) -> Option<Lease> {
        let Some(index) = self.free.pop() else {
            self.stats.exhaustions += 1;
            return None;
        };
        self.stats.rentals += 1;
        self.stats.outstanding += 1;
        self.stats.peak_outstanding = self.stats.peak_outstanding.max(self.stats.outstanding);
        Some(Lease { index })
    }

    pub(crate) fn get_mut(&mut self, lease: &Lease) -> Option<&mut T> {
        self.slots.get_mut(lease.index)
    }

    pub(crate) fn release(&mut self, lease: Lease) {
        self.free.push(lease.index);
        self.stats.outstanding = self.stats.outstanding.saturating_sub(1);
    }

    pub(crate) fn stats(&self) -> PoolStats {
        self.stats
    }
}

/// Synchronous dispatcher of pooled lifecycle events.
pub(crate) struct EventChannel {
    observers: Vec<Box<dyn MovementObserver>>,
    started: EventPool<MovementStarted>,
    blocked: EventPool<MovementBlocked>,
    completed: EventPool<MovementCompleted>,
}

impl EventChannel {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            observers: Vec::new(),
            started: EventPool::new(capacity),
            blocked: EventPool::new(capacity),
            completed: EventPool::new(capacity),
        }
    }

    pub(crate) fn subscribe(&mut self, observer: Box<dyn MovementObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn stats(&self) -> EventPoolStats {
        EventPoolStats {
            started: self.started.stats(),
            blocked: self.blocked.stats(),
            completed: self.completed.stats(),
        }
    }

    /// Dispatches the pre-validation event and reports whether it was
    /// cancelled. An event that cannot be rented counts as cancelled.
    pub(crate) fn emit_started(
        &mut self,
        world: &World,
        mover: MoverId,
        map: MapId,
        direction: Direction,
        start_pixel: Vec2,
        target_pixel: Vec2,
    ) -> bool {
        let Some(lease) = self.started.rent() else {
            warn!("started event pool exhausted; refusing movement of mover {}", mover.get());
            return true;
        };

        let mut cancelled = true;
        if let Some(event) = self.started.get_mut(&lease) {
            event.prepare(mover, map, direction, start_pixel, target_pixel);
            for observer in &mut self.observers {
                observer.on_started(event, world);
            }
            cancelled = event.is_cancelled();
        }
        self.started.release(lease);
        cancelled
    }

    pub(crate) fn emit_blocked(
        &mut self,
        world: &World,
        mover: MoverId,
        map: MapId,
        direction: Direction,
        tile: TileCoord,
        reason: BlockReason,
    ) {
        let Some(lease) = self.blocked.rent() else {
            warn!("blocked event pool exhausted; dropping {reason:?} for mover {}", mover.get());
            return;
        };

        if let Some(event) = self.blocked.get_mut(&lease) {
            event.prepare(mover, map, direction, tile, reason);
            for observer in &mut self.observers {
                observer.on_blocked(event, world);
            }
        }
        self.blocked.release(lease);
    }

    pub(crate) fn emit_completed(&mut self, world: &World, mover: MoverId, map: MapId, step: Step) {
        let Some(lease) = self.completed.rent() else {
            warn!("completed event pool exhausted; dropping completion of mover {}", mover.get());
            return;
        };

        if let Some(event) = self.completed.get_mut(&lease) {
            event.prepare(
                mover,
                map,
                step.from,
                step.to,
                step.direction,
                step.kind,
                step.elapsed,
            );
            for observer in &mut self.observers {
                observer.on_completed(event, world);
            }
        }
        self.completed.release(lease);
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("observers", &self.observers.len())
            .field("started", &self.started)
            .field("blocked", &self.blocked)
            .field("completed", &self.completed)
            .finish()
    }
}

/// Summary of a finished step handed to the completion event.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Step {
    pub(crate) from: TileCoord,
    pub(crate) to: TileCoord,
    pub(crate) direction: Direction,
    pub(crate) kind: StepKind,
    pub(crate) elapsed: Duration,
}
