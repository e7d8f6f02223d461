use std::time::Duration;

use gridwalk_core::{animation, AnimationSink, MoverId, PlaybackOptions, RunningState};
use gridwalk_world::{query, World};
use log::trace;

use crate::{
    events::{EventChannel, Step},
    turn,
};

/// Advances one mover by `dt`.
///
/// Moving movers interpolate toward their target and complete in the tick the
/// target is reached; the grid position is then re-derived from the snapped
/// pixel position because the map geometry may have changed while the step
/// was in flight. Idle movers either drive the turn-in-place sub-state or
/// stand idle.
pub(crate) fn advance<A>(
    world: &mut World,
    mover: MoverId,
    animations: &mut A,
    channel: &mut EventChannel,
    dt: Duration,
) where
    A: AnimationSink + ?Sized,
{
    let Some(map) = query::mover(world, mover).map(|view| view.map) else {
        return;
    };
    let geometry = world.geometry(map);
    let Some(slot) = world.mover_mut(mover) else {
        return;
    };
    let state = slot.state;

    if !state.is_moving() {
        if state.running_state() == RunningState::TurnDirection {
            turn::drive(mover, state, animations);
        } else {
            show(animations, mover, animation::idle(state.facing_direction()));
        }
        return;
    }

    if !state.advance(dt) {
        show(animations, mover, animation::walk(state.facing_direction()));
        return;
    }

    state.complete_step(geometry.tile_at(state.pixel_position()));
    let facing = state.facing_direction();
    if slot.request.is_active() {
        show(animations, mover, animation::walk(facing));
    } else {
        show(animations, mover, animation::idle(facing));
    }

    let step = Step {
        from: state.departure_tile(),
        to: state.grid_position(),
        direction: state.movement_direction(),
        kind: state.step_kind(),
        elapsed: state.step_elapsed(),
    };
    trace!(
        "mover {} arrived at ({}, {})",
        mover.get(),
        step.to.x(),
        step.to.y()
    );
    channel.emit_completed(world, mover, map, step);
}

/// Snaps an idle mover onto the projection of its grid position under the
/// current map geometry. Runs before intake so a step never starts from a
/// pixel position left over from an invalidated geometry.
pub(crate) fn resync(world: &mut World, mover: MoverId) {
    let Some(map) = query::mover(world, mover).map(|view| view.map) else {
        return;
    };
    let geometry = world.geometry(map);
    if let Some(slot) = world.mover_mut(mover) {
        let tile = slot.state.grid_position();
        slot.state.snap_pixel(geometry.project(tile));
    }
}

/// Switches to a looping clip unless it is already playing, so a stride in
/// progress is never restarted.
pub(crate) fn show<A>(animations: &mut A, mover: MoverId, clip: &'static str)
where
    A: AnimationSink + ?Sized,
{
    if animations.current_animation(mover) != Some(clip) {
        animations.set_animation(mover, clip, PlaybackOptions::LOOP);
    }
}
