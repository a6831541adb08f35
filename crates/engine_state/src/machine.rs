//! The game state machine.
//!
//! Exactly one state is active at a time. A transition only happens once
//! the active state has finished and named a registered successor, and it
//! runs in a fixed order: `cleanup(old)`, reset `old`'s control, swap,
//! `setup(new)`.

use std::collections::HashMap;

use tracing::{debug, info};

use engine_ecs::SystemRegistry;

use crate::error::StateError;
use crate::state::{GameState, StateContext};

type BoxedState<I, S> = Box<dyn GameState<I, S>>;

/// Sequences named [`GameState`]s.
pub struct GameStateMachine<I, S> {
    states: Vec<BoxedState<I, S>>,
    /// State name → index into `states`.
    index: HashMap<String, usize>,
    active: usize,
}

impl<I, S> GameStateMachine<I, S> {
    /// Build a machine from `states`, starting at `initial`.
    ///
    /// The initial state is not set up here; call [`start`](Self::start)
    /// once the host is ready.
    ///
    /// # Errors
    ///
    /// [`StateError::DuplicateState`] if two states share a name,
    /// [`StateError::UnknownState`] if `initial` is not among them.
    pub fn new(
        states: impl IntoIterator<Item = BoxedState<I, S>>,
        initial: &str,
    ) -> Result<Self, StateError> {
        let states: Vec<BoxedState<I, S>> = states.into_iter().collect();
        let mut index = HashMap::with_capacity(states.len());
        for (i, state) in states.iter().enumerate() {
            if index.insert(state.name().to_string(), i).is_some() {
                return Err(StateError::DuplicateState(state.name().to_string()));
            }
        }
        let active = *index
            .get(initial)
            .ok_or_else(|| StateError::UnknownState(initial.to_string()))?;

        Ok(Self {
            states,
            index,
            active,
        })
    }

    /// Name of the active state.
    #[must_use]
    pub fn active(&self) -> &str {
        self.states[self.active].name()
    }

    /// The active state.
    #[must_use]
    pub fn active_state(&self) -> &dyn GameState<I, S> {
        self.states[self.active].as_ref()
    }

    /// The state registered as `name`, active or not.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&dyn GameState<I, S>> {
        self.index.get(name).map(|&i| self.states[i].as_ref())
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered state names, in registration order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|state| state.name())
    }

    /// Set up the initial state. Call once before the first tick.
    ///
    /// # Errors
    ///
    /// Whatever the state's `setup` returns.
    pub fn start(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        info!(state = self.active(), "starting state machine");
        self.states[self.active].setup(ctx)
    }

    /// Move from the finished active state to its successor.
    ///
    /// The successor is resolved before anything runs, so a bad successor
    /// leaves the active state untouched.
    ///
    /// # Errors
    ///
    /// [`StateError::NotDone`] if the active state has not finished,
    /// [`StateError::MissingSuccessor`] / [`StateError::UnknownState`] if
    /// its successor is absent or unregistered, or any error from
    /// `cleanup` / `setup`.
    pub fn change_state(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let current = &self.states[self.active];
        let control = current.control();
        if !control.is_done() {
            return Err(StateError::NotDone(current.name().to_string()));
        }
        let next_name = control
            .next_state()
            .ok_or_else(|| StateError::MissingSuccessor(current.name().to_string()))?;
        let next = *self
            .index
            .get(next_name)
            .ok_or_else(|| StateError::UnknownState(next_name.to_string()))?;

        let from = self.active;
        self.states[from].cleanup(ctx)?;
        self.states[from].control_mut().reset();
        self.active = next;
        info!(
            from = self.states[from].name(),
            to = self.states[next].name(),
            "changed state"
        );
        self.states[next].setup(ctx)
    }

    /// Transition if the active state is done, then update the active state.
    ///
    /// # Errors
    ///
    /// Any transition error, or whatever the state's `update` returns.
    pub fn update_state(&mut self, ctx: &mut StateContext<'_>, dt: f64) -> Result<(), StateError> {
        if self.states[self.active].control().is_done() {
            self.change_state(ctx)?;
        }
        self.states[self.active].update(ctx, dt)
    }

    /// Forward one raw input event to the active state.
    ///
    /// # Errors
    ///
    /// Whatever the state's `handle_event` returns.
    pub fn handle_event(&mut self, ctx: &mut StateContext<'_>, event: &I) -> Result<(), StateError> {
        self.states[self.active].handle_event(ctx, event)
    }

    /// Draw the active state.
    ///
    /// # Errors
    ///
    /// Whatever the state's `draw` returns.
    pub fn draw_state(&mut self, surface: &mut S, systems: &mut SystemRegistry) -> Result<(), StateError> {
        debug!(state = self.active(), "drawing");
        self.states[self.active].draw(surface, systems)
    }
}

impl<I, S> std::fmt::Debug for GameStateMachine<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameStateMachine")
            .field("states", &self.state_names().collect::<Vec<_>>())
            .field("active", &self.active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use engine_ecs::EntityManager;

    use super::*;
    use crate::state::StateControl;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every call, and finishes after `finish_after` updates.
    struct Scripted {
        name: String,
        control: StateControl,
        next: Option<String>,
        finish_after: Option<usize>,
        updates: usize,
        log: Log,
    }

    impl Scripted {
        fn boxed(name: &str, next: Option<&str>, finish_after: Option<usize>, log: &Log) -> BoxedState<String, Vec<String>> {
            Box::new(Self {
                name: name.to_string(),
                control: StateControl::new(),
                next: next.map(str::to_string),
                finish_after,
                updates: 0,
                log: Rc::clone(log),
            })
        }

        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}.{what}", self.name));
        }
    }

    impl GameState<String, Vec<String>> for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn control(&self) -> &StateControl {
            &self.control
        }

        fn control_mut(&mut self) -> &mut StateControl {
            &mut self.control
        }

        fn setup(&mut self, _: &mut StateContext<'_>) -> Result<(), StateError> {
            self.updates = 0;
            self.record("setup");
            Ok(())
        }

        fn cleanup(&mut self, _: &mut StateContext<'_>) -> Result<(), StateError> {
            self.record("cleanup");
            Ok(())
        }

        fn handle_event(&mut self, _: &mut StateContext<'_>, event: &String) -> Result<(), StateError> {
            self.record(&format!("input({event})"));
            Ok(())
        }

        fn update(&mut self, _: &mut StateContext<'_>, _dt: f64) -> Result<(), StateError> {
            self.updates += 1;
            self.record("update");
            if Some(self.updates) == self.finish_after {
                match &self.next {
                    Some(next) => self.control.finish(next.clone()),
                    None => self.control.finish_without_successor(),
                }
            }
            Ok(())
        }

        fn draw(&mut self, surface: &mut Vec<String>, _: &mut SystemRegistry) -> Result<(), StateError> {
            surface.push(self.name.clone());
            Ok(())
        }
    }

    fn with_ctx<R>(f: impl FnOnce(&mut StateContext<'_>) -> R) -> R {
        let mut entities = EntityManager::new();
        let mut systems = SystemRegistry::new();
        let mut ctx = StateContext::new(&mut entities, &mut systems);
        f(&mut ctx)
    }

    #[test]
    fn test_unknown_initial_state() {
        let log = Log::default();
        let result = GameStateMachine::new([Scripted::boxed("A", None, None, &log)], "B");
        assert!(matches!(result, Err(StateError::UnknownState(ref name)) if name == "B"));
    }

    #[test]
    fn test_duplicate_state_names() {
        let log = Log::default();
        let result = GameStateMachine::new(
            [
                Scripted::boxed("A", None, None, &log),
                Scripted::boxed("A", None, None, &log),
            ],
            "A",
        );
        assert!(matches!(result, Err(StateError::DuplicateState(_))));
    }

    #[test]
    fn test_transition_order() {
        let log = Log::default();
        let mut machine = GameStateMachine::new(
            [
                Scripted::boxed("A", Some("B"), Some(1), &log),
                Scripted::boxed("B", None, None, &log),
            ],
            "A",
        )
        .unwrap();

        with_ctx(|ctx| {
            machine.start(ctx).unwrap();
            machine.update_state(ctx, 0.016).unwrap();
            assert_eq!(machine.active(), "A");
            assert!(machine.active_state().control().is_done());

            machine.update_state(ctx, 0.016).unwrap();
        });

        assert_eq!(machine.active(), "B");
        assert!(!machine.active_state().control().is_done());
        assert_eq!(
            *log.borrow(),
            vec!["A.setup", "A.update", "A.cleanup", "B.setup", "B.update"]
        );
    }

    #[test]
    fn test_outgoing_state_is_reset() {
        let log = Log::default();
        let mut machine = GameStateMachine::new(
            [
                Scripted::boxed("A", Some("B"), Some(1), &log),
                Scripted::boxed("B", Some("A"), Some(1), &log),
            ],
            "A",
        )
        .unwrap();

        with_ctx(|ctx| {
            machine.start(ctx).unwrap();
            machine.update_state(ctx, 0.1).unwrap();
            assert!(machine.state("A").unwrap().control().is_done());

            machine.change_state(ctx).unwrap();
            assert_eq!(machine.active(), "B");
            assert!(!machine.state("A").unwrap().control().is_done());
            assert!(!machine.active_state().control().is_done());

            machine.update_state(ctx, 0.1).unwrap();
            assert!(machine.state("B").unwrap().control().is_done());

            machine.change_state(ctx).unwrap();
            assert_eq!(machine.active(), "A");
            assert!(!machine.active_state().control().is_done());
            assert_eq!(*machine.state("B").unwrap().control(), StateControl::new());
        });
    }

    #[test]
    fn test_change_state_requires_done() {
        let log = Log::default();
        let mut machine =
            GameStateMachine::new([Scripted::boxed("A", None, None, &log)], "A").unwrap();
        let result = with_ctx(|ctx| machine.change_state(ctx));
        assert!(matches!(result, Err(StateError::NotDone(ref name)) if name == "A"));
    }

    #[test]
    fn test_unregistered_successor_is_fatal() {
        let log = Log::default();
        let mut machine =
            GameStateMachine::new([Scripted::boxed("A", Some("Nowhere"), Some(1), &log)], "A")
                .unwrap();

        let result = with_ctx(|ctx| {
            machine.start(ctx).unwrap();
            machine.update_state(ctx, 0.1).unwrap();
            machine.update_state(ctx, 0.1)
        });

        assert!(matches!(result, Err(StateError::UnknownState(ref name)) if name == "Nowhere"));
        assert_eq!(machine.active(), "A");
        assert!(!log.borrow().iter().any(|entry| entry == "A.cleanup"));
    }

    #[test]
    fn test_missing_successor() {
        let log = Log::default();
        let mut machine =
            GameStateMachine::new([Scripted::boxed("A", None, Some(1), &log)], "A").unwrap();
        let result = with_ctx(|ctx| {
            machine.update_state(ctx, 0.1).unwrap();
            machine.update_state(ctx, 0.1)
        });
        assert!(matches!(result, Err(StateError::MissingSuccessor(_))));
    }

    #[test]
    fn test_input_and_draw_go_to_active_state() {
        let log = Log::default();
        let mut machine = GameStateMachine::new(
            [
                Scripted::boxed("A", None, None, &log),
                Scripted::boxed("B", None, None, &log),
            ],
            "B",
        )
        .unwrap();

        with_ctx(|ctx| machine.handle_event(ctx, &"space".to_string())).unwrap();
        let mut surface = Vec::new();
        machine
            .draw_state(&mut surface, &mut SystemRegistry::new())
            .unwrap();

        assert_eq!(*log.borrow(), vec!["B.input(space)"]);
        assert_eq!(surface, vec!["B"]);
    }
}
