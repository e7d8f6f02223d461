use glam::Vec2;
use gridwalk_core::{
    BlockReason, Direction, MapId, MoverId, StepKind, TileCoord, TileQuery,
};
use gridwalk_world::{query, World};
use log::{debug, trace};

use crate::events::EventChannel;

/// Validates a requested direction and either commits a step or jump or
/// reports why it was refused.
///
/// Rules apply in order and stop at the first rejection: the observer veto,
/// the map bounds, the forced-direction override, jump resolution and finally
/// walkability. The target tile is queried once; a jump additionally checks
/// its landing tile. Grid position is committed before this returns, so
/// observers of later movers in the same tick see the reservation.
pub(crate) fn validate<T>(
    world: &mut World,
    mover: MoverId,
    requested: Direction,
    tiles: &T,
    channel: &mut EventChannel,
    tolerance: u32,
) where
    T: TileQuery + ?Sized,
{
    let Some((map, origin, start_pixel)) = query::mover(world, mover).map(|view| {
        (
            view.map,
            view.state.grid_position(),
            view.state.pixel_position(),
        )
    }) else {
        return;
    };
    let geometry = world.geometry(map);

    let mut attempt = Attempt {
        mover,
        map,
        direction: requested,
        target: origin.neighbor(requested),
    };

    let target_pixel = geometry.project(attempt.target);
    if channel.emit_started(world, mover, map, requested, start_pixel, target_pixel) {
        attempt.reject(world, channel, BlockReason::Cancelled);
        return;
    }

    if !tiles.in_bounds(map, attempt.target, tolerance) {
        attempt.reject(world, channel, BlockReason::OutOfBounds);
        return;
    }

    if let Some(forced) = tiles.forced_direction(map, origin) {
        if forced != attempt.direction {
            trace!(
                "mover {} forced {forced:?} instead of {:?}",
                mover.get(),
                attempt.direction
            );
            attempt.direction = forced;
            attempt.target = origin.neighbor(forced);
            if !tiles.in_bounds(map, attempt.target, tolerance) {
                attempt.reject(world, channel, BlockReason::OutOfBounds);
                return;
            }
        }
    }

    let info = tiles.query(map, attempt.target);
    if info.is_jump_tile {
        if info.allowed_jump_direction != Some(attempt.direction) {
            attempt.reject(world, channel, BlockReason::WrongJumpDirection);
            return;
        }

        let landing = origin.offset(attempt.direction, 2);
        if !tiles.in_bounds(map, landing, tolerance) || !tiles.query(map, landing).is_target_walkable
        {
            attempt.target = landing;
            attempt.reject(world, channel, BlockReason::LandingBlocked);
            return;
        }

        attempt.target = landing;
        attempt.commit(world, geometry.project(landing), StepKind::Jump);
        return;
    }

    if !info.is_target_walkable {
        attempt.reject(world, channel, BlockReason::Collision);
        return;
    }

    attempt.commit(world, geometry.project(attempt.target), StepKind::Walk);
}

#[derive(Clone, Copy, Debug)]
struct Attempt {
    mover: MoverId,
    map: MapId,
    direction: Direction,
    target: TileCoord,
}

impl Attempt {
    fn reject(&self, world: &World, channel: &mut EventChannel, reason: BlockReason) {
        debug!(
            "mover {} blocked moving {:?} to ({}, {}): {reason:?}",
            self.mover.get(),
            self.direction,
            self.target.x(),
            self.target.y()
        );
        channel.emit_blocked(
            world,
            self.mover,
            self.map,
            self.direction,
            self.target,
            reason,
        );
    }

    fn commit(&self, world: &mut World, target_pixel: Vec2, kind: StepKind) {
        let Some(slot) = world.mover_mut(self.mover) else {
            return;
        };
        slot.state
            .begin_step(self.target, target_pixel, self.direction, kind);
        trace!(
            "mover {} committed {kind:?} {:?} to ({}, {})",
            self.mover.get(),
            self.direction,
            self.target.x(),
            self.target.y()
        );
    }
}
