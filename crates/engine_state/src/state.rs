//! The [`GameState`] contract and the pieces every state carries.

use engine_ecs::{EntityManager, System, SystemRegistry};

use crate::error::StateError;

/// The entity store and systems a state drives.
///
/// States receive these as context on every call. They are owned by the
/// host, never by a state or the machine.
#[derive(Debug)]
pub struct StateContext<'a> {
    pub entities: &'a mut EntityManager,
    pub systems: &'a mut SystemRegistry,
}

impl<'a> StateContext<'a> {
    #[must_use]
    pub fn new(entities: &'a mut EntityManager, systems: &'a mut SystemRegistry) -> Self {
        Self { entities, systems }
    }

    /// The system registered as `name`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// [`StateError::UnknownSystem`] if no `T` is registered under `name`.
    pub fn system_mut<T: System>(&mut self, name: &str) -> Result<&mut T, StateError> {
        self.systems
            .get_mut::<T>(name)
            .ok_or_else(|| StateError::UnknownSystem(name.to_string()))
    }
}

/// Completion flag and successor of a state.
///
/// A state finishes by calling [`finish`](Self::finish) with the name of
/// the state that should follow it. The machine resets the control when it
/// leaves the state, so a state is never re-entered already done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateControl {
    done: bool,
    next_state: Option<String>,
}

impl StateControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal completion, handing over to `next`.
    pub fn finish(&mut self, next: impl Into<String>) {
        self.done = true;
        self.next_state = Some(next.into());
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn next_state(&self) -> Option<&str> {
        self.next_state.as_deref()
    }

    /// Clear the completion flag and successor.
    pub fn reset(&mut self) {
        self.done = false;
        self.next_state = None;
    }

    /// Mark done without a successor. The machine rejects the transition.
    pub fn finish_without_successor(&mut self) {
        self.done = true;
        self.next_state = None;
    }
}

/// A discrete phase of the game, sequenced by the state machine.
///
/// `I` is the host's raw input event type and `S` the surface drawn onto.
/// The machine forwards both without inspecting them.
pub trait GameState<I, S> {
    /// The unique name the state is registered under.
    fn name(&self) -> &str;

    fn control(&self) -> &StateControl;

    fn control_mut(&mut self) -> &mut StateControl;

    /// Called when the state becomes active.
    ///
    /// # Errors
    ///
    /// Any error aborts the transition.
    fn setup(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError>;

    /// Called when the state stops being active.
    ///
    /// # Errors
    ///
    /// Any error aborts the transition.
    fn cleanup(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError>;

    /// React to one raw input event from the host.
    ///
    /// # Errors
    ///
    /// Errors are handed back to the host.
    fn handle_event(&mut self, ctx: &mut StateContext<'_>, event: &I) -> Result<(), StateError>;

    /// Advance one tick of `dt` seconds.
    ///
    /// # Errors
    ///
    /// Errors are handed back to the host.
    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f64) -> Result<(), StateError>;

    /// Draw the state onto `surface`.
    ///
    /// # Errors
    ///
    /// Errors are handed back to the host.
    fn draw(&mut self, surface: &mut S, systems: &mut SystemRegistry) -> Result<(), StateError>;
}
