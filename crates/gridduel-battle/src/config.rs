//! Battle session configuration.

use std::time::Duration;

use gridduel_timer::{TimeBudget, TimerConfig};

/// Tunables for every battle session spawned by a registry.
///
/// The defaults are the production rules; tests shrink the budgets to
/// reach timeouts quickly.
#[derive(Debug, Clone)]
pub struct BattleConfig {
    /// Turn time each player starts with.
    pub initial_time: Duration,

    /// Ceiling for a player's turn time after miss bonuses.
    pub max_time: Duration,

    /// Turn time credited to a player whose shot missed.
    pub miss_bonus: Duration,

    /// Countdown granularity while a turn is running.
    pub tick_interval: Duration,

    /// Pause between announcing the coin toss and the first turn, so
    /// clients can animate it.
    pub toss_delay: Duration,

    /// How long a finished session keeps answering (late joins get
    /// `GAME_FINISHED`) before it retires from the registry.
    pub finish_grace: Duration,

    /// How long a timeout waits for the rules service to record the
    /// concede. Past it the game finishes without rewards.
    pub concede_timeout: Duration,

    /// Bound of each session's command channel.
    pub channel_size: usize,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            initial_time: Duration::from_millis(25_000),
            max_time: Duration::from_millis(60_000),
            miss_bonus: Duration::from_millis(3_000),
            tick_interval: Duration::from_millis(250),
            toss_delay: Duration::from_millis(600),
            finish_grace: Duration::from_secs(30),
            concede_timeout: Duration::from_secs(5),
            channel_size: 64,
        }
    }
}

impl BattleConfig {
    /// The turn timer settings derived from this config.
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::with_interval(self.tick_interval)
    }

    /// A fresh per-player budget.
    pub fn budget(&self) -> TimeBudget {
        TimeBudget::new(self.initial_time, self.max_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_starts_at_initial_time() {
        let cfg = BattleConfig::default();

        assert_eq!(cfg.budget().remaining_ms(), 25_000);
    }

    #[test]
    fn test_default_concede_timeout_is_bounded() {
        let cfg = BattleConfig::default();

        assert_eq!(cfg.concede_timeout, Duration::from_secs(5));
        assert!(cfg.concede_timeout < cfg.finish_grace);
    }

    #[test]
    fn test_timer_config_uses_tick_interval() {
        let cfg = BattleConfig {
            tick_interval: Duration::from_millis(100),
            ..BattleConfig::default()
        };

        assert_eq!(cfg.timer_config().tick_interval, Duration::from_millis(100));
    }
}
