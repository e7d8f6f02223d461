#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a Gridwalk movement scenario headlessly
//! and prints what happened.

mod logging;
mod scenario;
mod session;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Result};
use clap::Parser;
use gridwalk_core::BlockReason;

use crate::{
    scenario::Scenario,
    session::{Report, Session},
};

/// Replays a movement scenario and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "gridwalk", author, version, about, long_about = None)]
struct Args {
    /// Scenario file (TOML) describing the map and its movers.
    #[arg(long)]
    scenario: PathBuf,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Length of a frame in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the Gridwalk command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);
    ensure!(args.tick_ms > 0, "--tick-ms must be at least 1");

    let scenario = Scenario::from_path(&args.scenario)?;
    let report = Session::new(&scenario)?.run(args.ticks, Duration::from_millis(args.tick_ms));
    print_report(&report);
    Ok(())
}

const REASONS: [BlockReason; 5] = [
    BlockReason::Cancelled,
    BlockReason::OutOfBounds,
    BlockReason::WrongJumpDirection,
    BlockReason::LandingBlocked,
    BlockReason::Collision,
];

fn print_report(report: &Report) {
    let (width, height) = report.map_size;
    println!(
        "simulated {} frames on a {width}x{height} map",
        report.ticks
    );
    println!(
        "completed: {} steps, {} jumps",
        report.tally.steps, report.tally.jumps
    );
    for reason in REASONS {
        let count = report.tally.blocked.get(&reason).copied().unwrap_or(0);
        if count > 0 {
            println!("blocked {reason:?}: {count}");
        }
    }
    for mover in &report.movers {
        println!(
            "mover {}: ({}, {}) facing {:?}",
            mover.mover.get(),
            mover.tile.x(),
            mover.tile.y(),
            mover.facing
        );
    }
    let pools = report.pools;
    println!(
        "event pools: started {}/{} blocked {}/{} completed {}/{} (peak/capacity)",
        pools.started.peak_outstanding,
        pools.started.capacity,
        pools.blocked.peak_outstanding,
        pools.blocked.capacity,
        pools.completed.peak_outstanding,
        pools.completed.capacity
    );
}
