//! Per-sample DSP primitives used by the signal chain stages.
//!
//! * [`PeakingFilter`]: RBJ-cookbook peaking biquad, one state pair per
//!   channel.
//! * [`pan_stereo`]: equal-power stereo panner.
//! * [`percent_to_linear`]: gain slider percentage to linear factor.

use std::f32::consts::{FRAC_PI_2, PI};

/// Quality factor shared by every equalizer band.
pub const EQ_Q: f32 = 1.41;

/// `130.0` → `1.3`.
#[inline]
pub fn percent_to_linear(percent: f32) -> f32 {
    percent / 100.0
}

// ---------------------------------------------------------------------------
// Biquad coefficients
// ---------------------------------------------------------------------------

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Pass-through.
    pub const IDENTITY: BiquadCoefficients = BiquadCoefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Peaking EQ around `frequency` Hz with `gain_db` boost/cut.
    ///
    /// Frequencies at or above Nyquist, or a non-positive sample rate, give
    /// the identity filter.
    pub fn peaking(frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        if sample_rate <= 0.0 || frequency <= 0.0 || frequency >= sample_rate / 2.0 || q <= 0.0 {
            return Self::IDENTITY;
        }

        let omega = 2.0 * PI * frequency / sample_rate;
        let (sn, cs) = omega.sin_cos();
        let alpha = sn / (2.0 * q);
        let a = 10.0f32.powf(gain_db / 40.0);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cs;
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cs;
        let a2 = 1.0 - alpha / a;

        let norm = 1.0 / a0;
        Self {
            b0: b0 * norm,
            b1: b1 * norm,
            b2: b2 * norm,
            a1: a1 * norm,
            a2: a2 * norm,
        }
    }
}

// ---------------------------------------------------------------------------
// PeakingFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl ChannelState {
    #[inline]
    fn process(&mut self, c: &BiquadCoefficients, x: f32) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Stereo peaking filter at a fixed frequency whose gain may change.
///
/// Coefficients are only recomputed when [`set_gain_db`](Self::set_gain_db)
/// receives a different value, so calling it every block is cheap.
#[derive(Debug, Clone)]
pub struct PeakingFilter {
    frequency: f32,
    sample_rate: f32,
    gain_db: f32,
    coeffs: BiquadCoefficients,
    left: ChannelState,
    right: ChannelState,
}

impl PeakingFilter {
    pub fn new(frequency: f32, gain_db: f32, sample_rate: f32) -> Self {
        Self {
            frequency,
            sample_rate,
            gain_db,
            coeffs: BiquadCoefficients::peaking(frequency, EQ_Q, gain_db, sample_rate),
            left: ChannelState::default(),
            right: ChannelState::default(),
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coeffs
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        if gain_db != self.gain_db {
            self.gain_db = gain_db;
            self.coeffs =
                BiquadCoefficients::peaking(self.frequency, EQ_Q, gain_db, self.sample_rate);
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (
            self.left.process(&self.coeffs, left),
            self.right.process(&self.coeffs, right),
        )
    }
}

// ---------------------------------------------------------------------------
// Stereo panner
// ---------------------------------------------------------------------------

/// Equal-power stereo panning of a stereo pair.
///
/// `pan` is in `[-1, 1]`.  At `0` the pair passes through unchanged; panning
/// left folds the right channel into the left, and vice versa.
#[inline]
pub fn pan_stereo(left: f32, right: f32, pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    if pan <= 0.0 {
        let x = (pan + 1.0) * FRAC_PI_2;
        let (gain_r, gain_l) = x.sin_cos();
        (left + right * gain_l, right * gain_r)
    } else {
        let x = pan * FRAC_PI_2;
        let (gain_r, gain_l) = x.sin_cos();
        (left * gain_l, right + left * gain_r)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
