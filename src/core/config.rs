//! # Engine configuration.
//!
//! Provides [`Config`], the centralized settings for the engine, and the default constants.
//!
//! ## Sentinel values
//! - `termination_factor = 0` → no overrun watchdog limit
//! - `condition_timeout = 0s` → conditions are awaited without a timeout
//! - `startup_quiet = 0s` → no initial log suppression

use std::time::Duration;

/// Per-condition evaluation timeout.
pub const CONDITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between two "skipped" log lines for the same task.
pub const NOT_MET_LOG_THROTTLE: Duration = Duration::from_secs(60);

/// A run is terminated once it exceeds `INTERVAL_TERMINATION_FACTOR × interval`.
pub const INTERVAL_TERMINATION_FACTOR: u32 = 10;

/// Window after startup during which "skipped" logs are muted.
pub const STARTUP_QUIET: Duration = Duration::from_secs(30);

/// Global configuration for the engine.
///
/// ## Field semantics
/// - `condition_timeout`: timeout applied to each condition individually
/// - `not_met_log_throttle`: per-task spacing of `ConditionsNotMet` / `MicroservicesUnresponsive` logs
/// - `termination_factor`: overrun threshold as a multiple of the task interval (`0` = never terminate)
/// - `startup_quiet`: mute window for skip logs while dependencies come up
/// - `jam_factor`: a locked run older than `jam_factor × interval` reports `Jammed`
/// - `late_factor`: a task never started after `late_factor × interval` reports `Late`
/// - `grace`: maximum wait for in-flight ticks on shutdown
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `log_events`: attach the built-in `LogWriter` (feature `logging`)
#[derive(Clone, Debug)]
pub struct Config {
    /// Timeout applied to each condition.
    pub condition_timeout: Duration,
    /// Spacing between repeated skip logs for one task.
    pub not_met_log_throttle: Duration,
    /// Overrun threshold multiplier.
    pub termination_factor: u32,
    /// Startup window with skip logs muted.
    pub startup_quiet: Duration,
    /// Multiplier after which a running task is reported as jammed.
    pub jam_factor: u32,
    /// Multiplier after which a never-started task is reported as late.
    pub late_factor: u32,
    /// Shutdown grace period.
    pub grace: Duration,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
    /// Whether the engine attaches the built-in log writer.
    pub log_events: bool,
}

impl Config {
    /// Overrun threshold for a task with the given interval.
    ///
    /// - `None` → no limit
    /// - `Some(d)` → `termination_factor × interval`
    #[inline]
    pub fn overrun_limit(&self, interval: Duration) -> Option<Duration> {
        match self.termination_factor {
            0 => None,
            n => Some(interval.saturating_mul(n)),
        }
    }

    /// Condition timeout as an `Option` (`None` = unbounded).
    #[inline]
    pub fn condition_timeout(&self) -> Option<Duration> {
        if self.condition_timeout == Duration::ZERO {
            None
        } else {
            Some(self.condition_timeout)
        }
    }

    /// Age after which a locked run is considered jammed.
    #[inline]
    pub fn jam_threshold(&self, interval: Duration) -> Duration {
        interval.saturating_mul(self.jam_factor.max(1))
    }

    /// Age after which a never-started task is considered late.
    #[inline]
    pub fn late_threshold(&self, interval: Duration) -> Duration {
        interval.saturating_mul(self.late_factor.max(1))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `condition_timeout = 10s`
    /// - `not_met_log_throttle = 60s`
    /// - `termination_factor = 10`
    /// - `startup_quiet = 30s`
    /// - `jam_factor = 2`, `late_factor = 2`
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `log_events = true`
    fn default() -> Self {
        Self {
            condition_timeout: CONDITION_TIMEOUT,
            not_met_log_throttle: NOT_MET_LOG_THROTTLE,
            termination_factor: INTERVAL_TERMINATION_FACTOR,
            startup_quiet: STARTUP_QUIET,
            jam_factor: 2,
            late_factor: 2,
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            log_events: true,
        }
    }
}
