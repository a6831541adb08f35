//! Raw input fed to the game states each tick.
//!
//! There is no window, so input comes from an [`InputSource`]: the
//! [`Autopilot`] steers the player in a square and can quit at a set tick.
//! Tests use a fixed `Script` of events keyed by tick instead.

#[cfg(test)]
use std::collections::BTreeMap;

/// A direction key on the player's controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(Direction),
    KeyUp(Direction),
    /// Stop the tick loop after the current tick.
    Quit,
}

/// Produces the input events for a tick.
pub trait InputSource {
    fn poll(&mut self, tick: u64) -> Vec<InputEvent>;
}

/// Holds one direction for `turn_every` ticks, then turns left.
#[derive(Debug)]
pub struct Autopilot {
    turn_every: u64,
    held: Option<Direction>,
    quit_at: Option<u64>,
}

impl Autopilot {
    #[must_use]
    pub fn new(turn_every: u64) -> Self {
        Self {
            turn_every: turn_every.max(1),
            held: None,
            quit_at: None,
        }
    }

    /// Send [`InputEvent::Quit`] on `tick`.
    #[must_use]
    pub fn quit_at(mut self, tick: u64) -> Self {
        self.quit_at = Some(tick);
        self
    }

    fn heading(&self, tick: u64) -> Direction {
        match (tick / self.turn_every) % 4 {
            0 => Direction::Right,
            1 => Direction::Up,
            2 => Direction::Left,
            _ => Direction::Down,
        }
    }
}

impl InputSource for Autopilot {
    fn poll(&mut self, tick: u64) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let heading = self.heading(tick);
        if self.held != Some(heading) {
            if let Some(previous) = self.held.replace(heading) {
                events.push(InputEvent::KeyUp(previous));
            }
            events.push(InputEvent::KeyDown(heading));
        }
        if self.quit_at == Some(tick) {
            events.push(InputEvent::Quit);
        }
        events
    }
}

/// A fixed list of events per tick.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Script {
    events: BTreeMap<u64, Vec<InputEvent>>,
}

#[cfg(test)]
impl Script {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(mut self, tick: u64, event: InputEvent) -> Self {
        self.events.entry(tick).or_default().push(event);
        self
    }
}

#[cfg(test)]
impl InputSource for Script {
    fn poll(&mut self, tick: u64) -> Vec<InputEvent> {
        self.events.remove(&tick).unwrap_or_default()
    }
}
