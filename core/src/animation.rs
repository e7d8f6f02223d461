//! Direction-keyed animation names.
//!
//! Walk, idle and turn clips are looked up independently so an animation set
//! can rename one family without touching the others.

use crate::Direction;

const WALK: [&str; 4] = ["walk_north", "walk_east", "walk_south", "walk_west"];
const IDLE: [&str; 4] = ["idle_north", "idle_east", "idle_south", "idle_west"];
const TURN: [&str; 4] = ["turn_north", "turn_east", "turn_south", "turn_west"];

const fn slot(direction: Direction) -> usize {
    match direction {
        Direction::North => 0,
        Direction::East => 1,
        Direction::South => 2,
        Direction::West => 3,
    }
}

/// Looping locomotion clip for the facing direction.
#[must_use]
pub const fn walk(direction: Direction) -> &'static str {
    WALK[slot(direction)]
}

/// Looping standing clip for the facing direction.
#[must_use]
pub const fn idle(direction: Direction) -> &'static str {
    IDLE[slot(direction)]
}

/// Play-once turn-in-place clip for the new facing direction.
#[must_use]
pub const fn turn(direction: Direction) -> &'static str {
    TURN[slot(direction)]
}
