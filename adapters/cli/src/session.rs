use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};

use anyhow::{Context, Result};
use gridwalk_core::{
    AnimationSink, BlockReason, Command, Direction, Event, MoverId, MovementBlocked,
    MovementCompleted, PlaybackOptions, RunningState, StepKind, TileCoord,
};
use gridwalk_system_movement::{EventPoolStats, Movement, MovementObserver};
use gridwalk_world::{self as world, query, World};
use log::{debug, info};

use crate::scenario::{AsciiMap, Scenario, SCENARIO_MAP};

/// Length of every one-shot clip.
const ONE_SHOT_LENGTH: Duration = Duration::from_millis(250);

/// Animation sink that plays clips against the simulation clock.
#[derive(Debug, Default)]
pub(crate) struct ClockAnimator {
    playing: HashMap<MoverId, Playback>,
}

#[derive(Clone, Copy, Debug)]
struct Playback {
    clip: &'static str,
    play_once: bool,
    elapsed: Duration,
}

impl ClockAnimator {
    pub(crate) fn advance(&mut self, dt: Duration) {
        for playback in self.playing.values_mut() {
            playback.elapsed = playback.elapsed.saturating_add(dt);
        }
    }
}

impl AnimationSink for ClockAnimator {
    fn set_animation(&mut self, mover: MoverId, name: &'static str, options: PlaybackOptions) {
        if let Some(playback) = self.playing.get_mut(&mover) {
            if playback.clip == name && !options.force_restart {
                playback.play_once = options.play_once;
                return;
            }
        }
        let _ = self.playing.insert(
            mover,
            Playback {
                clip: name,
                play_once: options.play_once,
                elapsed: Duration::ZERO,
            },
        );
    }

    fn current_animation(&self, mover: MoverId) -> Option<&'static str> {
        self.playing.get(&mover).map(|playback| playback.clip)
    }

    fn is_complete(&self, mover: MoverId) -> bool {
        self.playing
            .get(&mover)
            .is_some_and(|playback| playback.play_once && playback.elapsed >= ONE_SHOT_LENGTH)
    }
}

/// Plays the role of directional input for one mover: walks its scripted
/// route, turning in place first whenever the next direction calls for it,
/// and releases the intent once the route is exhausted.
#[derive(Clone, Debug)]
struct RouteDriver {
    mover: MoverId,
    route: Vec<Direction>,
    next: usize,
    released: bool,
}

impl RouteDriver {
    fn command(&mut self, world: &World) -> Option<Command> {
        let view = query::mover(world, self.mover)?;
        let state = view.state;
        if state.is_moving()
            || state.running_state() == RunningState::TurnDirection
            || view.request.is_active()
        {
            return None;
        }

        let Some(direction) = self.route.get(self.next).copied() else {
            if self.released {
                return None;
            }
            self.released = true;
            return Some(Command::ReleaseIntent { mover: self.mover });
        };

        if state.wants_turn(direction) {
            return Some(Command::BeginTurn {
                mover: self.mover,
                direction,
            });
        }

        self.next += 1;
        Some(Command::RequestMove {
            mover: self.mover,
            direction,
        })
    }
}

/// Movement outcomes gathered over a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) steps: usize,
    pub(crate) jumps: usize,
    pub(crate) blocked: HashMap<BlockReason, usize>,
}

#[derive(Debug)]
struct TallyObserver {
    tally: Rc<RefCell<Tally>>,
}

impl MovementObserver for TallyObserver {
    fn on_blocked(&mut self, event: &MovementBlocked, _world: &World) {
        *self
            .tally
            .borrow_mut()
            .blocked
            .entry(event.reason())
            .or_insert(0) += 1;
    }

    fn on_completed(&mut self, event: &MovementCompleted, _world: &World) {
        let mut tally = self.tally.borrow_mut();
        match event.kind() {
            StepKind::Walk => tally.steps += 1,
            StepKind::Jump => tally.jumps += 1,
        }
    }
}

/// Final position of a mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MoverReport {
    pub(crate) mover: MoverId,
    pub(crate) tile: TileCoord,
    pub(crate) facing: Direction,
}

/// Summary printed after a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Report {
    pub(crate) ticks: u32,
    pub(crate) map_size: (i32, i32),
    pub(crate) tally: Tally,
    pub(crate) movers: Vec<MoverReport>,
    pub(crate) pools: EventPoolStats,
}

/// Scenario wired to a world, the movement system and the fake collaborators.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    movement: Movement,
    map: AsciiMap,
    animations: ClockAnimator,
    drivers: Vec<RouteDriver>,
    tally: Rc<RefCell<Tally>>,
    events: Vec<Event>,
}

impl Session {
    /// Spawns every mover of the scenario.
    pub(crate) fn new(scenario: &Scenario) -> Result<Self> {
        let map = scenario.ascii_map()?;
        let mut world = World::with_capacity(Box::new(scenario.metrics()), scenario.movers.len());
        let mut movement = Movement::new(scenario.movement);
        let tally = Rc::new(RefCell::new(Tally::default()));
        movement.subscribe(Box::new(TallyObserver {
            tally: Rc::clone(&tally),
        }));

        let mut events = Vec::new();
        let mut drivers = Vec::with_capacity(scenario.movers.len());
        for (index, section) in scenario.movers.iter().enumerate() {
            let before = events.len();
            world::apply(
                &mut world,
                Command::SpawnMover {
                    map: SCENARIO_MAP,
                    tile: section.start_tile(),
                    facing: section.facing,
                    speed: section
                        .speed
                        .unwrap_or(scenario.movement.default_speed()),
                },
                &mut events,
            );
            let mover = events[before..]
                .iter()
                .find_map(|event| match event {
                    Event::MoverSpawned { mover, .. } => Some(*mover),
                    _ => None,
                })
                .with_context(|| format!("mover {index} could not be spawned"))?;
            drivers.push(RouteDriver {
                mover,
                route: section.route.clone(),
                next: 0,
                released: false,
            });
        }
        info!(
            "scenario ready: {}x{} map, {} movers",
            map.width(),
            map.height(),
            drivers.len()
        );

        Ok(Self {
            world,
            movement,
            map,
            animations: ClockAnimator::default(),
            drivers,
            tally,
            events,
        })
    }

    /// Runs one frame: route input first, then the movement tick.
    pub(crate) fn step(&mut self, dt: Duration) {
        for driver in &mut self.drivers {
            if let Some(command) = driver.command(&self.world) {
                debug!("input {command:?}");
                world::apply(&mut self.world, command, &mut self.events);
            }
        }
        self.events.clear();

        self.movement
            .tick(&mut self.world, &self.map, &mut self.animations, dt);
        self.animations.advance(dt);
    }

    /// Runs `ticks` frames of `dt` each and summarises the outcome.
    pub(crate) fn run(mut self, ticks: u32, dt: Duration) -> Report {
        for _ in 0..ticks {
            self.step(dt);
        }

        let movers = query::movers(&self.world)
            .map(|view| MoverReport {
                mover: view.id,
                tile: view.state.grid_position(),
                facing: view.state.facing_direction(),
            })
            .collect();
        let tally = self.tally.borrow().clone();

        Report {
            ticks,
            map_size: (self.map.width(), self.map.height()),
            tally,
            movers,
            pools: self.movement.pool_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn scenario(body: &str) -> Scenario {
        Scenario::from_toml_str(body).expect("scenario parses")
    }

    #[test]
    fn walks_the_scripted_route() {
        let report = Session::new(&scenario(
            r#"
[map]
rows = [
    ".....",
    ".....",
    ".....",
]

[[mover]]
start = [0, 0]
facing = "east"
route = ["east", "east", "south", "south"]
"#,
        ))
        .expect("session starts")
        .run(300, FRAME);

        assert_eq!(report.movers.len(), 1);
        assert_eq!(report.movers[0].tile, TileCoord::new(2, 2));
        assert_eq!(report.movers[0].facing, Direction::South);
        assert_eq!(report.tally.steps, 4);
        assert!(report.tally.blocked.is_empty());
        assert_eq!(report.map_size, (5, 3));
    }

    #[test]
    fn turns_in_place_before_reversing() {
        let report = Session::new(&scenario(
            r#"
[map]
rows = ["...."]

[[mover]]
start = [1, 0]
facing = "east"
route = ["west"]
"#,
        ))
        .expect("session starts")
        .run(120, FRAME);

        assert_eq!(report.movers[0].tile, TileCoord::new(0, 0));
        assert_eq!(report.movers[0].facing, Direction::West);
        assert_eq!(report.tally.steps, 1);
    }

    #[test]
    fn counts_jumps_and_blocks() {
        let report = Session::new(&scenario(
            r#"
[map]
rows = [
    ".#...",
    "..S..",
    ".....",
    ".....",
]

[[mover]]
start = [2, 0]
facing = "south"
route = ["south"]

[[mover]]
start = [0, 0]
facing = "east"
route = ["east"]
"#,
        ))
        .expect("session starts")
        .run(120, FRAME);

        assert_eq!(report.movers[0].tile, TileCoord::new(2, 2));
        assert_eq!(report.movers[1].tile, TileCoord::new(0, 0));
        assert_eq!(report.tally.jumps, 1);
        assert_eq!(report.tally.blocked.get(&BlockReason::Collision), Some(&1));
        assert_eq!(report.pools.started.outstanding, 0);
    }

    #[test]
    fn one_shot_clips_complete_on_the_clock() {
        let mover = MoverId::new(0);
        let mut animations = ClockAnimator::default();
        animations.set_animation(mover, "turn_west", PlaybackOptions::ONE_SHOT);
        assert!(!animations.is_complete(mover));

        animations.advance(ONE_SHOT_LENGTH);
        assert!(animations.is_complete(mover));

        animations.set_animation(mover, "turn_west", PlaybackOptions::ONE_SHOT);
        assert!(!animations.is_complete(mover));
    }
}
