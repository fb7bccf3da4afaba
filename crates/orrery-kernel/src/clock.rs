use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::{SimError, SimResult};

/// Fraction of one step within which two simulated times compare equal.
const TIME_TOLERANCE: f64 = 1e-3;

/// The simulated time reported to entities each tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeInfo {
    /// Current simulated time in seconds.
    pub now: f64,
    /// Simulated seconds since the previous tick: 0.0 on the tick equal
    /// to the start time, the step size otherwise.
    pub elapsed: f64,
}

/// Fixed-step simulation clock with an optional wall-clock pacer.
///
/// The clock owns the simulated timeline: it starts at a configured
/// start time, advances by a fixed step, and reports the run as over
/// once the horizon (start + duration) is reached. Float rounding
/// within a small fraction of a step counts as reaching the horizon.
///
/// With pacing enabled, [`Clock::advance`] blocks until wall-clock time
/// since pacing began catches up with simulated time since the start.
/// The first paced advance only records the wall-clock origin.
#[derive(Debug, Clone)]
pub struct Clock {
    step: f64,
    start: f64,
    duration: f64,
    realtime: bool,
    now: f64,
    pacing_origin: Option<Instant>,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            step: 0.1,
            start: 0.0,
            duration: 10.0,
            realtime: false,
            now: 0.0,
            pacing_origin: None,
        }
    }
}

impl Clock {
    /// A clock with the default schedule: step 0.1, start 0.0,
    /// duration 10.0, no pacing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply any supplied overrides, rewind to the start time, and clear
    /// pacing state. Missing overrides retain their prior values.
    ///
    /// A non-positive step size is rejected before anything changes.
    pub fn reset(&mut self, config: &RunConfig) -> SimResult<()> {
        if let Some(step) = config.step {
            if step <= 0.0 {
                return Err(SimError::NonPositiveStep(step));
            }
            self.step = step;
        }
        if let Some(start) = config.start {
            self.start = start;
        }
        if let Some(duration) = config.duration {
            self.duration = duration;
        }
        if let Some(realtime) = config.realtime {
            self.realtime = realtime;
        }
        self.now = self.start;
        self.pacing_origin = None;
        Ok(())
    }

    /// Advance by one step, pacing against the wall clock when enabled,
    /// and return the resulting time information.
    pub fn advance(&mut self) -> TimeInfo {
        self.now += self.step;
        if self.realtime {
            self.pace();
        }
        self.time_info()
    }

    /// Whether the horizon has been reached.
    pub fn is_over(&self) -> bool {
        self.now >= self.horizon() - self.step * TIME_TOLERANCE
    }

    /// Current time information, without advancing.
    pub fn time_info(&self) -> TimeInfo {
        let at_start = (self.now - self.start).abs() < self.step * TIME_TOLERANCE;
        TimeInfo {
            now: self.now,
            elapsed: if at_start { 0.0 } else { self.step },
        }
    }

    /// Current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Step size in simulated seconds.
    pub fn step_size(&self) -> f64 {
        self.step
    }

    /// Simulated time at which the run begins.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Simulated time at which the run is complete.
    pub fn horizon(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether wall-clock pacing is enabled.
    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    /// Sleep until wall-clock elapsed reaches simulated elapsed. The
    /// sleep is skipped entirely when the wall clock is already ahead,
    /// so the wait is never negative.
    fn pace(&mut self) {
        match self.pacing_origin {
            None => self.pacing_origin = Some(Instant::now()),
            Some(origin) => {
                let sim_elapsed = Duration::from_secs_f64((self.now - self.start).max(0.0));
                if let Some(wait) = sim_elapsed.checked_sub(origin.elapsed()) {
                    std::thread::sleep(wait);
                }
            }
        }
    }
}
