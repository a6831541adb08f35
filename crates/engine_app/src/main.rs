//! # engine_app
//!
//! Headless host for the engine's demo game.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line into tick and game configuration.
//! 2. Register component kinds and systems, build the state machine.
//! 3. Set up the initial state and enter the fixed-timestep tick loop.
//!
//! Logging is controlled through `RUST_LOG`; `engine_app=debug` prints
//! every frame.

mod config;
mod demo;
mod frame;
mod input;
mod tick;

use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine_ecs::{EntityManager, SystemRegistry};

use config::Args;
use demo::systems::{CENSUS, CensusSystem};
use input::Autopilot;
use tick::TickLoop;

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    let game = args.game_config();
    info!(?game, "engine demo starting");

    let mut entities = EntityManager::new();
    let mut systems = SystemRegistry::new();
    demo::register(&mut entities, &mut systems, &game);

    let scoreboard = demo::states::SharedScoreboard::default();
    let machine = demo::machine(game, Rc::clone(&scoreboard)).context("building the state machine")?;

    let mut autopilot = Autopilot::new(args.turn_every);
    if let Some(tick) = args.quit_at {
        autopilot = autopilot.quit_at(tick);
    }

    let mut tick_loop = TickLoop::new(
        args.tick_config(),
        entities,
        systems,
        machine,
        Box::new(autopilot),
    );
    tick_loop.start().context("setting up the initial state")?;
    tick_loop.run().context("tick loop failed")?;

    let census = tick_loop.systems().get::<CensusSystem>(CENSUS);
    info!(
        ticks = tick_loop.tick_id(),
        state = tick_loop.machine().active(),
        quit = tick_loop.quit_requested(),
        alive = ?census.map(CensusSystem::alive),
        frame = %tick_loop.frame(),
        "tick loop stopped"
    );

    let scoreboard = scoreboard.borrow();
    info!(
        rounds = scoreboard.rounds,
        victories = scoreboard.victories,
        defeats = scoreboard.defeats,
        timeouts = scoreboard.timeouts,
        "engine demo shut down"
    );
    Ok(())
}
