//! Command-line configuration.

use clap::Parser;

use crate::tick::TickConfig;

#[derive(Debug, Parser)]
#[command(name = "engine_app", about = "Runs the ECS demo game headless")]
pub struct Args {
    /// Target ticks per second
    #[arg(long, default_value_t = 60.0, value_parser = parse_tick_rate)]
    pub tick_rate: f64,

    /// Stop after this many ticks (0 = run until quit)
    #[arg(long, default_value_t = 600)]
    pub max_ticks: u64,

    /// Enemies spawned per round
    #[arg(short, long, default_value_t = 6)]
    pub enemies: usize,

    /// Seconds before a round ends in a timeout
    #[arg(long, default_value_t = 20.0)]
    pub round_secs: f64,

    /// Player hit points at the start of a round
    #[arg(long, default_value_t = 5)]
    pub player_health: i32,

    /// Ticks the autopilot holds each direction
    #[arg(long, default_value_t = 90)]
    pub turn_every: u64,

    /// Have the autopilot quit at this tick
    #[arg(long)]
    pub quit_at: Option<u64>,
}

fn parse_tick_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("expected a positive number of ticks per second, got {rate}"))
    }
}

impl Args {
    #[must_use]
    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            tick_rate: self.tick_rate,
            max_ticks: self.max_ticks,
        }
    }

    #[must_use]
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            enemies: self.enemies,
            round_secs: self.round_secs,
            player_health: self.player_health,
            ..GameConfig::default()
        }
    }
}

/// Tunables of the demo game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub enemies: usize,
    pub round_secs: f64,
    pub player_health: i32,
    /// Player speed, in units per second.
    pub player_speed: f32,
    pub enemy_speed: f32,
    /// Distance at which an enemy touches the player.
    pub contact_radius: f32,
    /// Radius of the ring enemies spawn on.
    pub spawn_radius: f32,
    /// Seconds the game-over screen stays up.
    pub game_over_secs: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            enemies: 6,
            round_secs: 20.0,
            player_health: 5,
            player_speed: 4.0,
            enemy_speed: 1.5,
            contact_radius: 0.5,
            spawn_radius: 8.0,
            game_over_secs: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["engine_app"]);
        let tick = args.tick_config();
        assert_eq!(tick.tick_rate, 60.0);
        assert_eq!(tick.max_ticks, 600);
        assert_eq!(args.game_config().enemies, 6);
        assert_eq!(args.quit_at, None);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from(["engine_app", "--max-ticks", "0", "-e", "2", "--round-secs", "5"]);
        assert_eq!(args.tick_config().max_ticks, 0);
        let game = args.game_config();
        assert_eq!(game.enemies, 2);
        assert_eq!(game.round_secs, 5.0);
        assert_eq!(game.contact_radius, GameConfig::default().contact_radius);
    }

    #[test]
    fn test_rejects_bad_tick_rate() {
        for rate in ["0", "-5", "NaN", "inf", "fast"] {
            let flag = format!("--tick-rate={rate}");
            assert!(Args::try_parse_from(["engine_app", flag.as_str()]).is_err(), "{rate}");
        }
        let args = Args::try_parse_from(["engine_app", "--tick-rate", "0.5"]).unwrap();
        assert_eq!(args.tick_config().tick_rate, 0.5);
    }
}
