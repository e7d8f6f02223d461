use gridwalk_core::{animation, AnimationSink, MoverId, MovementState, PlaybackOptions};
use log::debug;

use crate::executor::show;

/// Drives a mover in the turn-in-place sub-state.
///
/// The turn clip is restarted from its first frame on entry. Once the sink
/// reports it finished, the mover returns to `NotMoving` and stands idle in
/// its new facing; until then no request is serviced.
pub(crate) fn drive<A>(mover: MoverId, state: &mut MovementState, animations: &mut A)
where
    A: AnimationSink + ?Sized,
{
    let clip = animation::turn(state.facing_direction());
    if animations.current_animation(mover) != Some(clip) {
        animations.set_animation(mover, clip, PlaybackOptions::ONE_SHOT);
        return;
    }

    if animations.is_complete(mover) && state.finish_turn() {
        debug!(
            "mover {} finished turning {:?}",
            mover.get(),
            state.facing_direction()
        );
        show(animations, mover, animation::idle(state.facing_direction()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use gridwalk_core::{Direction, RunningState, TileCoord};

    #[derive(Default)]
    struct Clip {
        name: Option<&'static str>,
        options: PlaybackOptions,
        complete: bool,
    }

    impl AnimationSink for Clip {
        fn set_animation(&mut self, _mover: MoverId, name: &'static str, options: PlaybackOptions) {
            self.name = Some(name);
            self.options = options;
            self.complete = false;
        }

        fn current_animation(&self, _mover: MoverId) -> Option<&'static str> {
            self.name
        }

        fn is_complete(&self, _mover: MoverId) -> bool {
            self.complete
        }
    }

    fn turning_west() -> MovementState {
        let mut state =
            MovementState::new(TileCoord::new(0, 0), Vec2::ZERO, Direction::South, 4.0);
        assert!(state.begin_turn(Direction::West));
        state
    }

    #[test]
    fn entry_restarts_the_turn_clip() {
        let mover = MoverId::new(0);
        let mut state = turning_west();
        let mut clip = Clip {
            name: Some("idle_south"),
            complete: true,
            ..Clip::default()
        };

        drive(mover, &mut state, &mut clip);

        assert_eq!(clip.name, Some("turn_west"));
        assert_eq!(clip.options, PlaybackOptions::ONE_SHOT);
        assert_eq!(state.running_state(), RunningState::TurnDirection);
    }

    #[test]
    fn completion_returns_to_idle() {
        let mover = MoverId::new(0);
        let mut state = turning_west();
        let mut clip = Clip::default();

        drive(mover, &mut state, &mut clip);
        drive(mover, &mut state, &mut clip);
        assert_eq!(state.running_state(), RunningState::TurnDirection);

        clip.complete = true;
        drive(mover, &mut state, &mut clip);

        assert_eq!(state.running_state(), RunningState::NotMoving);
        assert_eq!(clip.name, Some("idle_west"));
        assert_eq!(clip.options, PlaybackOptions::LOOP);
        assert_eq!(state.movement_direction(), Direction::South);
    }
}
