use gridwalk_core::{MoverId, TileQuery};
use gridwalk_world::World;

use crate::{events::EventChannel, validator};

/// Hands a pending request to the validator when the mover can accept it,
/// then consumes the request regardless of the outcome. A mover that is
/// interpolating, locked or turning keeps its request for a later tick.
pub(crate) fn service<T>(
    world: &mut World,
    mover: MoverId,
    tiles: &T,
    channel: &mut EventChannel,
    tolerance: u32,
) where
    T: TileQuery + ?Sized,
{
    let Some(slot) = world.mover_mut(mover) else {
        return;
    };
    let Some(direction) = slot.request.pending() else {
        return;
    };
    if !slot.state.accepts_requests() {
        return;
    }

    validator::validate(world, mover, direction, tiles, channel, tolerance);

    if let Some(slot) = world.mover_mut(mover) {
        slot.request.consume();
    }
}
