//! The demo game's states: `Spawning` → `Combat` → `GameOver` → `Spawning`.

use std::cell::RefCell;
use std::f32::consts::TAU;
use std::fmt;
use std::rc::Rc;

use serde_json::json;
use tracing::{debug, info};

use engine_component::{Aspect, Component, ComponentHandle, EntityId};
use engine_ecs::{EntityManager, SystemRegistry};
use engine_state::{GameState, StateContext, StateControl, StateError};

use crate::config::GameConfig;
use crate::frame::Frame;
use crate::input::InputEvent;

use super::components::{
    Drifting, Health, Homing, Label, MovementFlags, PLAYER_LABEL, Position, Velocity,
};
use super::systems::{HEALTH, HUD, HealthSystem, HudSystem, MOVEMENT, MovementSystem};

pub const SPAWNING: &str = "Spawning";
pub const COMBAT: &str = "Combat";
pub const GAME_OVER: &str = "GameOver";

/// Health an enemy takes off the player on contact.
const CONTACT_DAMAGE: i32 = 1;

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
    Timeout,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Victory => "victory",
            Outcome::Defeat => "defeat",
            Outcome::Timeout => "timeout",
        })
    }
}

/// Results carried across rounds.
#[derive(Debug, Default)]
pub struct Scoreboard {
    pub rounds: u32,
    pub last: Option<Outcome>,
    pub victories: u32,
    pub defeats: u32,
    pub timeouts: u32,
}

impl Scoreboard {
    pub fn record(&mut self, outcome: Outcome) {
        self.last = Some(outcome);
        match outcome {
            Outcome::Victory => self.victories += 1,
            Outcome::Defeat => self.defeats += 1,
            Outcome::Timeout => self.timeouts += 1,
        }
    }
}

pub type SharedScoreboard = Rc<RefCell<Scoreboard>>;

/// Populates the world for a new round, then hands over to combat.
#[derive(Debug)]
pub struct SpawningState {
    control: StateControl,
    config: GameConfig,
    scoreboard: SharedScoreboard,
}

impl SpawningState {
    #[must_use]
    pub fn new(config: GameConfig, scoreboard: SharedScoreboard) -> Self {
        Self {
            control: StateControl::new(),
            config,
            scoreboard,
        }
    }

    fn spawn_player(&self, entities: &mut EntityManager) -> Result<EntityId, StateError> {
        let id = entities.create_entity_instantiated([
            (Position::type_name(), ComponentHandle::new(Position::default())),
            (Velocity::type_name(), ComponentHandle::new(Velocity::default())),
            (
                Label::type_name(),
                ComponentHandle::new(Label {
                    name: PLAYER_LABEL.to_string(),
                }),
            ),
            (
                Health::type_name(),
                ComponentHandle::new(Health::full(self.config.player_health)),
            ),
            (
                MovementFlags::type_name(),
                ComponentHandle::new(MovementFlags {
                    speed: self.config.player_speed,
                    ..MovementFlags::default()
                }),
            ),
        ])?;
        Ok(id)
    }

    /// Enemies sit evenly on a ring around the player. Even ones home in,
    /// odd ones drift around the ring.
    fn spawn_enemy(&self, entities: &mut EntityManager, index: usize) -> Result<EntityId, StateError> {
        let angle = TAU * index as f32 / self.config.enemies.max(1) as f32;
        let (sin, cos) = angle.sin_cos();
        let radius = self.config.spawn_radius;
        let speed = self.config.enemy_speed;

        let (velocity, style) = if index % 2 == 0 {
            (json!({ "x": 0.0, "y": 0.0 }), (Homing::type_name(), json!({ "speed": speed })))
        } else {
            (
                json!({ "x": -sin * speed, "y": cos * speed }),
                (Drifting::type_name(), json!(null)),
            )
        };

        let id = entities.create_entity([
            (Position::type_name(), json!({ "x": cos * radius, "y": sin * radius })),
            (Velocity::type_name(), velocity),
            style,
        ])?;
        Ok(id)
    }
}

impl GameState<InputEvent, Frame> for SpawningState {
    fn name(&self) -> &str {
        SPAWNING
    }

    fn control(&self) -> &StateControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut StateControl {
        &mut self.control
    }

    fn setup(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let round = {
            let mut scoreboard = self.scoreboard.borrow_mut();
            scoreboard.rounds += 1;
            scoreboard.rounds
        };
        let player = self.spawn_player(ctx.entities)?;
        for index in 0..self.config.enemies {
            self.spawn_enemy(ctx.entities, index)?;
        }
        info!(round, %player, enemies = self.config.enemies, "spawned round");
        Ok(())
    }

    fn cleanup(&mut self, _: &mut StateContext<'_>) -> Result<(), StateError> {
        Ok(())
    }

    fn handle_event(&mut self, _: &mut StateContext<'_>, _: &InputEvent) -> Result<(), StateError> {
        Ok(())
    }

    fn update(&mut self, _: &mut StateContext<'_>, _: f64) -> Result<(), StateError> {
        self.control.finish(COMBAT);
        Ok(())
    }

    fn draw(&mut self, surface: &mut Frame, _: &mut SystemRegistry) -> Result<(), StateError> {
        surface.push(format!("Round {} || spawning", self.scoreboard.borrow().rounds));
        Ok(())
    }
}

/// Runs the round until the player dies, the enemies are gone, or time
/// runs out.
#[derive(Debug)]
pub struct CombatState {
    control: StateControl,
    config: GameConfig,
    scoreboard: SharedScoreboard,
    enemies: Aspect,
    elapsed: f64,
}

impl CombatState {
    #[must_use]
    pub fn new(config: GameConfig, scoreboard: SharedScoreboard) -> Self {
        Self {
            control: StateControl::new(),
            config,
            scoreboard,
            enemies: Aspect::with([Position::type_name()])
                .one_of([Homing::type_name(), Drifting::type_name()]),
            elapsed: 0.0,
        }
    }

    fn remaining_enemies(&self, entities: &EntityManager) -> Result<usize, StateError> {
        let pending = entities.pending_removals();
        Ok(entities
            .get_matching_entities(&self.enemies)?
            .keys()
            .filter(|id| !pending.contains(id))
            .count())
    }

    fn outcome(&self, player_alive: bool, enemies: usize) -> Option<Outcome> {
        if !player_alive {
            Some(Outcome::Defeat)
        } else if enemies == 0 {
            Some(Outcome::Victory)
        } else if self.elapsed >= self.config.round_secs {
            Some(Outcome::Timeout)
        } else {
            None
        }
    }
}

impl GameState<InputEvent, Frame> for CombatState {
    fn name(&self) -> &str {
        COMBAT
    }

    fn control(&self) -> &StateControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut StateControl {
        &mut self.control
    }

    fn setup(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.elapsed = 0.0;
        ctx.systems.process_lifecycle(ctx.entities)?;
        Ok(())
    }

    fn cleanup(&mut self, _: &mut StateContext<'_>) -> Result<(), StateError> {
        debug!(elapsed = self.elapsed, "combat over");
        Ok(())
    }

    fn handle_event(&mut self, ctx: &mut StateContext<'_>, event: &InputEvent) -> Result<(), StateError> {
        let movement = ctx.system_mut::<MovementSystem>(MOVEMENT)?;
        match *event {
            InputEvent::KeyDown(direction) => movement.handle_key(direction, true),
            InputEvent::KeyUp(direction) => movement.handle_key(direction, false),
            InputEvent::Quit => {}
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut StateContext<'_>, dt: f64) -> Result<(), StateError> {
        self.elapsed += dt;
        ctx.systems.process_lifecycle(ctx.entities)?;

        let movement = ctx.system_mut::<MovementSystem>(MOVEMENT)?;
        let contacts = movement.apply(dt as f32);
        let player = movement.player();

        let health = ctx.system_mut::<HealthSystem>(HEALTH)?;
        let player_alive = match player {
            Some(player) => {
                for enemy in &contacts {
                    let left = health.damage(player, CONTACT_DAMAGE);
                    debug!(%enemy, health = ?left, "enemy reached player");
                }
                !health.dead().contains(&player)
            }
            None => false,
        };
        for enemy in contacts {
            ctx.entities.queue_removal(enemy)?;
        }

        let enemies = self.remaining_enemies(ctx.entities)?;
        ctx.system_mut::<HudSystem>(HUD)?.refresh(enemies as u64);

        if let Some(outcome) = self.outcome(player_alive, enemies) {
            let mut scoreboard = self.scoreboard.borrow_mut();
            scoreboard.record(outcome);
            info!(round = scoreboard.rounds, %outcome, elapsed = self.elapsed, "round finished");
            self.control.finish(GAME_OVER);
        }
        Ok(())
    }

    fn draw(&mut self, surface: &mut Frame, systems: &mut SystemRegistry) -> Result<(), StateError> {
        let hud = systems
            .get::<HudSystem>(HUD)
            .ok_or_else(|| StateError::UnknownSystem(HUD.to_string()))?;
        for line in hud.lines() {
            surface.push(line.clone());
        }
        let left = (self.config.round_secs - self.elapsed).max(0.0);
        surface.push(format!("Time left || {left:.1}s"));
        Ok(())
    }
}

/// Shows the round's result for a moment, then clears the world.
#[derive(Debug)]
pub struct GameOverState {
    control: StateControl,
    config: GameConfig,
    scoreboard: SharedScoreboard,
    shown_for: f64,
}

impl GameOverState {
    #[must_use]
    pub fn new(config: GameConfig, scoreboard: SharedScoreboard) -> Self {
        Self {
            control: StateControl::new(),
            config,
            scoreboard,
            shown_for: 0.0,
        }
    }
}

impl GameState<InputEvent, Frame> for GameOverState {
    fn name(&self) -> &str {
        GAME_OVER
    }

    fn control(&self) -> &StateControl {
        &self.control
    }

    fn control_mut(&mut self) -> &mut StateControl {
        &mut self.control
    }

    fn setup(&mut self, _: &mut StateContext<'_>) -> Result<(), StateError> {
        self.shown_for = 0.0;
        Ok(())
    }

    /// Removes every entity right away, so the next round starts empty.
    fn cleanup(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let live: Vec<EntityId> = ctx.entities.live_entities().collect();
        for id in &live {
            ctx.entities.remove_entity(*id)?;
        }
        ctx.systems.process_lifecycle(ctx.entities)?;
        debug!(removed = live.len(), "cleared world");
        Ok(())
    }

    fn handle_event(&mut self, _: &mut StateContext<'_>, _: &InputEvent) -> Result<(), StateError> {
        Ok(())
    }

    fn update(&mut self, _: &mut StateContext<'_>, dt: f64) -> Result<(), StateError> {
        self.shown_for += dt;
        if self.shown_for >= self.config.game_over_secs {
            self.control.finish(SPAWNING);
        }
        Ok(())
    }

    fn draw(&mut self, surface: &mut Frame, _: &mut SystemRegistry) -> Result<(), StateError> {
        let scoreboard = self.scoreboard.borrow();
        if let Some(outcome) = scoreboard.last {
            surface.push(format!("Game over || {outcome}"));
        }
        surface.push(format!(
            "Rounds {} || won {} | lost {} | timed out {}",
            scoreboard.rounds, scoreboard.victories, scoreboard.defeats, scoreboard.timeouts
        ));
        Ok(())
    }
}
