use serde::{Deserialize, Serialize};

/// Clock overrides applied when an environment or clock is reset.
///
/// Every field is optional; a missing field retains the clock's prior
/// value, so a `RunConfig::default()` reset rewinds time without
/// changing the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Step size in simulated seconds. Must be strictly positive.
    pub step: Option<f64>,
    /// Simulated time at which the run begins.
    pub start: Option<f64>,
    /// Run length in simulated seconds; the horizon is start + duration.
    pub duration: Option<f64>,
    /// Pace ticks against the wall clock.
    pub realtime: Option<bool>,
}

impl RunConfig {
    /// Set the step size in simulated seconds.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Set the simulated start time.
    pub fn with_start(mut self, start: f64) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the run duration in simulated seconds.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Enable or disable wall-clock pacing.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = Some(realtime);
        self
    }
}
