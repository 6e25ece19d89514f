//! Turn countdown for gridduel battle sessions.
//!
//! Two pieces:
//!
//! - [`TurnTimer`]: a fixed-interval tick source that only fires while
//!   started. Stopped, [`TurnTimer::wait_for_tick`] pends forever, which
//!   is what a battle actor's `tokio::select!` wants outside turn phases.
//! - [`TimeBudget`]: a player's remaining turn time. Ticks drain it and
//!   miss bonuses credit it up to a maximum.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* join, place, move */ }
//!         tick = timer.wait_for_tick() => {
//!             let left = budgets[active].drain(tick.charge());
//!             if left == Duration::ZERO { timer.stop(); /* timeout */ }
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TurnTimer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Time between ticks; also the amount each tick charges.
    pub tick_interval: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
        }
    }
}

impl TimerConfig {
    /// Shortest interval accepted; anything below is raised to this.
    pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

    /// A config ticking every `interval`.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            tick_interval: interval,
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TurnTimer::new`].
    pub fn validated(mut self) -> Self {
        if self.tick_interval < Self::MIN_TICK_INTERVAL {
            warn!(
                interval_ms = self.tick_interval.as_millis() as u64,
                min_ms = Self::MIN_TICK_INTERVAL.as_millis() as u64,
                "tick_interval below minimum, clamping"
            );
            self.tick_interval = Self::MIN_TICK_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TurnTimer::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number since the last [`TurnTimer::start`] (starts at 1).
    pub tick: u64,
    /// The configured tick interval.
    pub dt: Duration,
    /// `true` if this tick fired more than 10% late.
    pub overrun: bool,
    /// Whole intervals that passed without a tick because of the overrun.
    pub ticks_skipped: u64,
}

impl TickInfo {
    /// Turn time this tick consumes: the interval plus any intervals
    /// skipped while the runtime was stalled.
    pub fn charge(&self) -> Duration {
        let intervals = u32::try_from(1 + self.ticks_skipped).unwrap_or(u32::MAX);
        self.dt.saturating_mul(intervals)
    }
}

/// Counters kept across the timer's whole life.
#[derive(Debug, Clone, Default)]
pub struct TimerMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Ticks that fired late.
    pub total_overruns: u64,
    /// Intervals skipped by late ticks.
    pub total_skipped: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Fixed-interval tick source that can be started and stopped.
///
/// One `TurnTimer` per battle session.
pub struct TurnTimer {
    interval: Duration,
    /// When the next tick fires; `None` while stopped.
    next_tick: Option<Instant>,
    tick_count: u64,
    metrics: TimerMetrics,
}

impl TurnTimer {
    /// Creates a stopped timer.
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.tick_interval.as_millis() as u64,
            "turn timer created"
        );
        Self {
            interval: config.tick_interval,
            next_tick: None,
            tick_count: 0,
            metrics: TimerMetrics::default(),
        }
    }

    /// Starts (or restarts) the countdown. The first tick fires one full
    /// interval from now and the per-turn tick count resets.
    pub fn start(&mut self) {
        self.next_tick = Some(Instant::now() + self.interval);
        self.tick_count = 0;
        debug!("turn timer started");
    }

    /// Stops the countdown. `wait_for_tick` pends until the next `start`.
    ///
    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(ticks = self.tick_count, "turn timer stopped");
        }
    }

    /// Whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Waits until the next tick is due.
    ///
    /// While stopped this future never resolves; `tokio::select!` keeps
    /// servicing its other branches. Dropping the future is harmless:
    /// the schedule only advances once a tick actually fires.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(next) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let dt = self.interval;
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > dt / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / dt.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "turn timer overrun, charging skipped intervals"
            );
        }

        // Schedule from now, not from the missed deadline.
        self.next_tick = Some(now + dt);

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }

        trace!(tick = self.tick_count, overrun, "turn tick");

        TickInfo {
            tick: self.tick_count,
            dt,
            overrun,
            ticks_skipped,
        }
    }

    /// Ticks fired since the last `start`.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Lifetime counters.
    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }
}

// ---------------------------------------------------------------------------
// Time budget
// ---------------------------------------------------------------------------

/// A player's remaining turn time.
///
/// Never negative; never above `max` after a credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    remaining: Duration,
    max: Duration,
}

impl TimeBudget {
    /// A budget starting at `initial` with credits capped at `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            remaining: initial.min(max),
            max,
        }
    }

    /// Subtracts `amount`, flooring at zero. Returns what is left.
    pub fn drain(&mut self, amount: Duration) -> Duration {
        self.remaining = self.remaining.saturating_sub(amount);
        self.remaining
    }

    /// Adds `bonus`, capped at the maximum. Returns the new remainder.
    pub fn credit(&mut self, bonus: Duration) -> Duration {
        self.remaining = (self.remaining + bonus).min(self.max);
        self.remaining
    }

    /// Remaining time.
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Remaining time in whole milliseconds, as shown to clients.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining.as_millis() as u64
    }

    /// Returns `true` once the budget hit zero.
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> TimeBudget {
        TimeBudget::new(Duration::from_millis(25_000), Duration::from_millis(60_000))
    }

    #[test]
    fn test_budget_drain_floors_at_zero() {
        let mut b = TimeBudget::new(Duration::from_millis(300), Duration::from_secs(60));
        assert_eq!(b.drain(Duration::from_millis(250)), Duration::from_millis(50));
        assert_eq!(b.drain(Duration::from_millis(250)), Duration::ZERO);
        assert!(b.is_exhausted());
    }

    #[test]
    fn test_budget_credit_adds_exact_bonus_below_cap() {
        let mut b = budget();
        b.credit(Duration::from_millis(3_000));
        assert_eq!(b.remaining_ms(), 28_000);
    }

    #[test]
    fn test_budget_credit_caps_at_max() {
        let mut b = TimeBudget::new(Duration::from_millis(58_500), Duration::from_millis(60_000));
        b.credit(Duration::from_millis(3_000));
        assert_eq!(b.remaining_ms(), 60_000);
        b.credit(Duration::from_millis(3_000));
        assert_eq!(b.remaining_ms(), 60_000);
    }

    #[test]
    fn test_budget_initial_above_max_is_clamped() {
        let b = TimeBudget::new(Duration::from_secs(90), Duration::from_secs(60));
        assert_eq!(b.remaining(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_validated_clamps_tiny_interval() {
        let cfg = TimerConfig::with_interval(Duration::from_millis(1)).validated();
        assert_eq!(cfg.tick_interval, TimerConfig::MIN_TICK_INTERVAL);
    }

    #[test]
    fn test_tick_info_charge_includes_skipped() {
        let info = TickInfo {
            tick: 3,
            dt: Duration::from_millis(250),
            overrun: true,
            ticks_skipped: 2,
        };
        assert_eq!(info.charge(), Duration::from_millis(750));
    }
}
