//! The canonical delay value and its clamp policy.
//!
//! Only the control hub holds a [`DelayValue`]; workers see plain `f64` copies
//! delivered through `SetDelay` messages.

/// Inclusive bounds for the delay, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayLimits {
    min: f64,
    max: f64,
}

impl DelayLimits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, seconds: f64) -> bool {
        (self.min..=self.max).contains(&seconds)
    }

    /// Pull `seconds` into range. Out-of-range requests are never an error.
    pub fn clamp(&self, seconds: f64) -> f64 {
        if seconds < self.min {
            self.min
        } else if seconds > self.max {
            self.max
        } else {
            seconds
        }
    }
}

/// Current delay; every mutation goes through the limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayValue {
    seconds: f64,
    limits: DelayLimits,
}

impl DelayValue {
    pub fn new(initial: f64, limits: DelayLimits) -> Self {
        Self {
            seconds: limits.clamp(initial),
            limits,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn limits(&self) -> DelayLimits {
        self.limits
    }

    /// Apply a signed change and return the clamped result.
    pub fn adjust(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.seconds = self.limits.clamp(self.seconds + delta);
        }
        self.seconds
    }
}
