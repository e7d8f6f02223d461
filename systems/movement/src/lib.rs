#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tile-locked movement state machine for the Gridwalk engine.
//!
//! Each tick services the pending request of every idle mover, validates it
//! against the tile query and either commits a step or reports why it was
//! refused, then advances in-flight interpolations and the turn-in-place
//! sub-state. Lifecycle notifications are dispatched synchronously to
//! subscribed [`MovementObserver`]s through fixed-size event pools.

mod config;
mod events;
mod executor;
mod intake;
mod turn;
mod validator;

use std::time::Duration;

use gridwalk_core::{AnimationSink, TileQuery};
use gridwalk_world::World;
use log::info;

pub use config::{Config, ConfigError};
pub use events::{EventPoolStats, MovementObserver, PoolStats};

use events::EventChannel;

/// Movement system that drives every mover of a [`World`] one tick at a time.
#[derive(Debug)]
pub struct Movement {
    config: Config,
    channel: EventChannel,
}

impl Movement {
    /// Creates a movement system with pools sized by `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        info!(
            "movement system ready: tolerance {} tiles, {} pooled events per kind",
            config.boundary_tolerance(),
            config.event_pool_capacity()
        );
        Self {
            config,
            channel: EventChannel::new(config.event_pool_capacity()),
        }
    }

    /// Configuration the system was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Registers an observer. Observers run in subscription order.
    pub fn subscribe(&mut self, observer: Box<dyn MovementObserver>) {
        self.channel.subscribe(observer);
    }

    /// Usage counters of the event pools.
    #[must_use]
    pub fn pool_stats(&self) -> EventPoolStats {
        self.channel.stats()
    }

    /// Advances every live mover by `dt`.
    ///
    /// Movers are processed in slot order. Idle movers are first snapped to
    /// the current projection of their grid position. A mover's request is
    /// serviced before its interpolation advances, so a step committed this
    /// tick already moves by `dt`.
    pub fn tick<T, A>(&mut self, world: &mut World, tiles: &T, animations: &mut A, dt: Duration)
    where
        T: TileQuery + ?Sized,
        A: AnimationSink + ?Sized,
    {
        let tolerance = self.config.boundary_tolerance();
        for index in 0..world.slot_count() {
            let Some(mover) = world.mover_in_slot(index) else {
                continue;
            };
            executor::resync(world, mover);
            intake::service(world, mover, tiles, &mut self.channel, tolerance);
            executor::advance(world, mover, animations, &mut self.channel, dt);
        }
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
