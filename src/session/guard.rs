//! Hearing-safety warning for excessive output gain.

use crate::params::{MAX_GAIN, MIN_GAIN};

/// Threshold used when the configured one is unusable.
pub const DEFAULT_HIGH_GAIN_THRESHOLD: f32 = 270.0;

/// Decides when the high-gain warning is raised.
///
/// The guard starts armed.  The first observation above the threshold
/// disarms it and asks for a warning; it re-arms once the gain is seen at or
/// below the threshold again, or on [`reset`](Self::reset) at session start.
#[derive(Debug, Clone)]
pub struct HighGainGuard {
    threshold: f32,
    armed: bool,
    pending: bool,
}

impl HighGainGuard {
    /// A non-finite threshold or one outside the gain range falls back to
    /// [`DEFAULT_HIGH_GAIN_THRESHOLD`].
    pub fn new(threshold: f32) -> Self {
        let threshold = if threshold.is_finite() && (MIN_GAIN..=MAX_GAIN).contains(&threshold) {
            threshold
        } else {
            log::warn!(
                "[controller] high-gain threshold {threshold} unusable, using {DEFAULT_HIGH_GAIN_THRESHOLD}"
            );
            DEFAULT_HIGH_GAIN_THRESHOLD
        };
        Self {
            threshold,
            armed: true,
            pending: false,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Feed the current output gain.  Returns `true` when a warning must be
    /// raised now.
    pub fn observe(&mut self, output_gain: f32) -> bool {
        if output_gain > self.threshold {
            if self.armed {
                self.armed = false;
                self.pending = true;
                return true;
            }
            false
        } else {
            self.armed = true;
            self.pending = false;
            false
        }
    }

    /// Dismiss the pending warning.  Does not re-arm.
    pub fn acknowledge(&mut self) {
        self.pending = false;
    }

    /// A warning was raised and neither acknowledged nor resolved.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Forget all history; used when a new session goes live.
    pub fn reset(&mut self) {
        self.armed = true;
        self.pending = false;
    }
}
