//! Fixed-timestep host loop.
//!
//! Each tick runs in order:
//!
//! 1. Poll input and hand every event to the active state.
//! 2. Update the active state, transitioning first if it is done.
//! 3. Draw the active state onto a fresh [`Frame`].
//! 4. Advance the tick counter.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use tracing::{debug, info, warn};

use engine_ecs::{EntityManager, SystemRegistry};
use engine_state::{GameStateMachine, StateContext, StateError};

use crate::frame::Frame;
use crate::input::{InputEvent, InputSource};

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl TickConfig {
    /// The time budget of one tick.
    ///
    /// # Errors
    ///
    /// If `tick_rate` is not a positive, finite number.
    pub fn tick_duration(&self) -> Result<Duration> {
        ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick rate must be positive, got {}",
            self.tick_rate
        );
        Duration::try_from_secs_f64(1.0 / self.tick_rate).context("tick rate out of range")
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Owns the world and drives the state machine.
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    entities: EntityManager,
    systems: SystemRegistry,
    machine: GameStateMachine<InputEvent, Frame>,
    input: Box<dyn InputSource>,
    frame: Frame,
    quit: bool,
}

impl TickLoop {
    #[must_use]
    pub fn new(
        config: TickConfig,
        entities: EntityManager,
        systems: SystemRegistry,
        machine: GameStateMachine<InputEvent, Frame>,
        input: Box<dyn InputSource>,
    ) -> Self {
        Self {
            tick_id: 0,
            config,
            entities,
            systems,
            machine,
            input,
            frame: Frame::new(),
            quit: false,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    #[must_use]
    pub fn machine(&self) -> &GameStateMachine<InputEvent, Frame> {
        &self.machine
    }

    /// The frame drawn by the last tick.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Whether a [`InputEvent::Quit`] has been received.
    #[must_use]
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Set up the initial state.
    ///
    /// # Errors
    ///
    /// Whatever the initial state's `setup` returns.
    pub fn start(&mut self) -> Result<(), StateError> {
        let mut ctx = StateContext::new(&mut self.entities, &mut self.systems);
        self.machine.start(&mut ctx)
    }

    /// Run one tick of `dt` seconds.
    ///
    /// # Errors
    ///
    /// Any error from the active state or a transition.
    pub fn tick(&mut self, dt: f64) -> Result<(), StateError> {
        let mut ctx = StateContext::new(&mut self.entities, &mut self.systems);

        for event in self.input.poll(self.tick_id) {
            if event == InputEvent::Quit {
                info!(tick_id = self.tick_id, "quit requested");
                self.quit = true;
            }
            self.machine.handle_event(&mut ctx, &event)?;
        }

        self.machine.update_state(&mut ctx, dt)?;

        self.frame.clear();
        self.machine.draw_state(&mut self.frame, &mut self.systems)?;

        debug!(
            tick_id = self.tick_id,
            dt,
            state = self.machine.active(),
            frame = %self.frame,
            "tick end"
        );
        self.tick_id += 1;
        Ok(())
    }

    /// Run until the configured number of ticks or a quit request.
    ///
    /// This is a blocking loop that sleeps off whatever remains of each
    /// tick's budget.
    ///
    /// # Errors
    ///
    /// An invalid tick rate, or the first tick error; the loop stops there.
    pub fn run(&mut self) -> Result<()> {
        let tick_duration = self.config.tick_duration()?;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            let dt = tick_duration.as_secs_f64();
            self.tick(dt)
                .with_context(|| format!("tick {} failed", self.tick_id))?;

            if self.quit
                || (self.config.max_ticks > 0 && self.tick_id >= self.config.max_ticks)
            {
                info!(ticks = self.tick_id, state = self.machine.active(), "tick loop complete");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}

impl std::fmt::Debug for TickLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLoop")
            .field("tick_id", &self.tick_id)
            .field("config", &self.config)
            .field("machine", &self.machine)
            .field("quit", &self.quit)
            .finish_non_exhaustive()
    }
}
