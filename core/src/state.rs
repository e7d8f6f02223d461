use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Direction, TileCoord};

/// Intent-level state of a mover, independent of whether a step is in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunningState {
    /// No directional intent is held.
    #[default]
    NotMoving,
    /// Playing the turn-in-place animation; movement starts are blocked.
    TurnDirection,
    /// Directional intent is held; steps chain without idling.
    Moving,
}

/// Shape of the movement currently or most recently executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Single-tile step.
    #[default]
    Walk,
    /// Two-tile jump over a ledge.
    Jump,
}

/// Grid movement state owned by a single mover.
///
/// `grid_position` is committed the moment a step starts; `pixel_position`
/// trails behind it through interpolation and matches the projection of the
/// grid position whenever no step is in flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementState {
    grid_position: TileCoord,
    pixel_position: Vec2,
    facing_direction: Direction,
    movement_direction: Direction,
    running_state: RunningState,
    is_moving: bool,
    movement_progress: f32,
    start_pixel: Vec2,
    target_pixel: Vec2,
    movement_speed: f32,
    movement_locked: bool,
    departure_tile: TileCoord,
    step_kind: StepKind,
    step_elapsed: Duration,
}

impl MovementState {
    /// Creates an idle state standing on `tile`, rendered at `pixel`.
    #[must_use]
    pub fn new(tile: TileCoord, pixel: Vec2, facing: Direction, speed: f32) -> Self {
        Self {
            grid_position: tile,
            pixel_position: pixel,
            facing_direction: facing,
            movement_direction: facing,
            running_state: RunningState::NotMoving,
            is_moving: false,
            movement_progress: 0.0,
            start_pixel: pixel,
            target_pixel: pixel,
            movement_speed: speed,
            movement_locked: false,
            departure_tile: tile,
            step_kind: StepKind::Walk,
            step_elapsed: Duration::ZERO,
        }
    }

    /// Logical tile, authoritative for collision and occupancy.
    #[must_use]
    pub const fn grid_position(&self) -> TileCoord {
        self.grid_position
    }

    /// Render position.
    #[must_use]
    pub const fn pixel_position(&self) -> Vec2 {
        self.pixel_position
    }

    /// Direction the mover visually faces.
    #[must_use]
    pub const fn facing_direction(&self) -> Direction {
        self.facing_direction
    }

    /// Direction of the last executed step or jump.
    #[must_use]
    pub const fn movement_direction(&self) -> Direction {
        self.movement_direction
    }

    /// Intent-level state.
    #[must_use]
    pub const fn running_state(&self) -> RunningState {
        self.running_state
    }

    /// Whether an interpolation is in flight.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Fraction of the current interpolation completed.
    #[must_use]
    pub const fn movement_progress(&self) -> f32 {
        self.movement_progress
    }

    /// Pixel position the current interpolation started from.
    #[must_use]
    pub const fn start_pixel(&self) -> Vec2 {
        self.start_pixel
    }

    /// Pixel position the current interpolation ends at.
    #[must_use]
    pub const fn target_pixel(&self) -> Vec2 {
        self.target_pixel
    }

    /// Interpolation speed in tiles per second.
    #[must_use]
    pub const fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    /// Whether an external veto blocks movement starts.
    #[must_use]
    pub const fn is_movement_locked(&self) -> bool {
        self.movement_locked
    }

    /// Tile the current or last movement departed from.
    #[must_use]
    pub const fn departure_tile(&self) -> TileCoord {
        self.departure_tile
    }

    /// Shape of the current or last movement.
    #[must_use]
    pub const fn step_kind(&self) -> StepKind {
        self.step_kind
    }

    /// Simulated time spent in the current or last movement.
    #[must_use]
    pub const fn step_elapsed(&self) -> Duration {
        self.step_elapsed
    }

    /// Whether a pending request may be serviced this tick.
    #[must_use]
    pub fn accepts_requests(&self) -> bool {
        !self.is_moving
            && !self.movement_locked
            && self.running_state != RunningState::TurnDirection
    }

    /// Commits a step or jump: the grid position jumps to `destination` at
    /// once and the pixel position starts interpolating toward
    /// `destination_pixel`.
    pub fn begin_step(
        &mut self,
        destination: TileCoord,
        destination_pixel: Vec2,
        direction: Direction,
        kind: StepKind,
    ) {
        self.departure_tile = self.grid_position;
        self.grid_position = destination;
        self.start_pixel = self.pixel_position;
        self.target_pixel = destination_pixel;
        self.movement_direction = direction;
        self.facing_direction = direction;
        self.is_moving = true;
        self.running_state = RunningState::Moving;
        self.movement_progress = 0.0;
        self.step_kind = kind;
        self.step_elapsed = Duration::ZERO;
    }

    /// Advances the interpolation by `dt` and reports whether it reached the
    /// target. On arrival the progress and pixel position snap to the target.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.is_moving {
            return false;
        }

        self.step_elapsed = self.step_elapsed.saturating_add(dt);
        let progress = self.movement_progress + self.movement_speed * dt.as_secs_f32();
        if progress >= 1.0 {
            self.movement_progress = 1.0;
            self.pixel_position = self.target_pixel;
            return true;
        }

        self.movement_progress = progress.max(self.movement_progress);
        self.pixel_position = self
            .start_pixel
            .lerp(self.target_pixel, self.movement_progress);
        false
    }

    /// Finishes an interpolation that reached its target. `grid_position` is
    /// re-derived by the caller from the snapped pixel position. The running
    /// state is left for the intent owner to settle.
    pub fn complete_step(&mut self, grid_position: TileCoord) {
        self.grid_position = grid_position;
        self.is_moving = false;
        self.movement_progress = 0.0;
    }

    /// Forces the render position of an idle mover.
    pub fn snap_pixel(&mut self, pixel: Vec2) {
        if !self.is_moving {
            self.pixel_position = pixel;
        }
    }

    /// Whether facing `direction` calls for a turn-in-place.
    #[must_use]
    pub fn wants_turn(&self, direction: Direction) -> bool {
        !self.is_moving
            && self.running_state == RunningState::NotMoving
            && direction != self.movement_direction
            && direction != self.facing_direction
    }

    /// Enters the turn-in-place sub-state when [`MovementState::wants_turn`]
    /// holds. Never touches the movement direction.
    pub fn begin_turn(&mut self, direction: Direction) -> bool {
        if !self.wants_turn(direction) {
            return false;
        }

        self.running_state = RunningState::TurnDirection;
        self.facing_direction = direction;
        true
    }

    /// Leaves the turn-in-place sub-state.
    pub fn finish_turn(&mut self) -> bool {
        if self.running_state != RunningState::TurnDirection {
            return false;
        }

        self.running_state = RunningState::NotMoving;
        true
    }

    /// Settles a mover whose directional intent ended between steps.
    pub fn release_intent(&mut self) -> bool {
        if self.is_moving || self.running_state != RunningState::Moving {
            return false;
        }

        self.running_state = RunningState::NotMoving;
        true
    }

    /// Sets or clears the external movement veto.
    pub fn set_movement_locked(&mut self, locked: bool) {
        self.movement_locked = locked;
    }

    /// Changes the interpolation speed; refuses non-positive or non-finite
    /// values.
    pub fn set_movement_speed(&mut self, speed: f32) -> bool {
        if !speed.is_finite() || speed <= 0.0 {
            return false;
        }

        self.movement_speed = speed;
        true
    }

    /// Places an idle mover on a new tile. Refused while interpolating.
    pub fn relocate(&mut self, tile: TileCoord, pixel: Vec2) -> bool {
        if self.is_moving {
            return false;
        }

        self.grid_position = tile;
        self.departure_tile = tile;
        self.pixel_position = pixel;
        self.start_pixel = pixel;
        self.target_pixel = pixel;
        true
    }
}

/// Reusable directional request slot owned by a mover.
///
/// The slot lives as long as its mover; the `active` flag is its only
/// lifecycle signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovementRequest {
    direction: Direction,
    active: bool,
}

impl MovementRequest {
    /// Writes a new intent, replacing any unconsumed one.
    pub fn submit(&mut self, direction: Direction) {
        self.direction = direction;
        self.active = true;
    }

    /// Marks the pending intent as serviced. A consumed slot stays inactive
    /// until the next [`submit`](Self::submit).
    pub fn consume(&mut self) {
        self.active = false;
    }

    /// Pending intent without consuming it.
    #[must_use]
    pub const fn pending(&self) -> Option<Direction> {
        if self.active {
            Some(self.direction)
        } else {
            None
        }
    }

    /// Whether the slot holds an unconsumed intent.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Direction last written into the slot.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}
