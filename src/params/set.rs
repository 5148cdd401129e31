//! [`ParameterSet`] and the sanitization rules applied on every ingestion
//! path (manual edits, built-in tables, persisted user profiles).
//!
//! | Field        | Range        | Default on missing / non-finite |
//! |--------------|--------------|---------------------------------|
//! | input gain   | 0 – 300 %    | 100                             |
//! | output gain  | 0 – 300 %    | 100                             |
//! | band gain    | -20 – 20 dB  | 0                               |
//! | balance      | -100 – 100   | 0                               |
//!
//! Finite values outside their range are clamped to the nearest bound.

use std::ops::Index;

use super::Band;

/// Lower bound for input/output gain, in percent.
pub const MIN_GAIN: f32 = 0.0;
/// Upper bound for input/output gain, in percent.
pub const MAX_GAIN: f32 = 300.0;
/// Unity gain, in percent.
pub const DEFAULT_GAIN: f32 = 100.0;

/// Lower bound for a band gain, in dB.
pub const MIN_BAND_GAIN: f32 = -20.0;
/// Upper bound for a band gain, in dB.
pub const MAX_BAND_GAIN: f32 = 20.0;

/// Full left.
pub const MIN_BALANCE: i32 = -100;
/// Full right.
pub const MAX_BALANCE: i32 = 100;

// ---------------------------------------------------------------------------
// Field sanitizers
// ---------------------------------------------------------------------------

/// Normalize an input or output gain percentage.
pub fn sanitize_gain(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(MIN_GAIN, MAX_GAIN)
    } else {
        DEFAULT_GAIN
    }
}

/// Normalize a band gain in dB.
pub fn sanitize_band_gain(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(MIN_BAND_GAIN, MAX_BAND_GAIN)
    } else {
        0.0
    }
}

/// Normalize a balance value; fractional input is rounded.
pub fn sanitize_balance(value: f64) -> i32 {
    if value.is_finite() {
        value.round().clamp(MIN_BALANCE as f64, MAX_BALANCE as f64) as i32
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// EqGains
// ---------------------------------------------------------------------------

/// Gain per band.  Backed by a fixed array so every band always has a value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EqGains([f32; Band::COUNT]);

impl EqGains {
    /// Flat response (all bands 0 dB).
    pub const FLAT: EqGains = EqGains([0.0; Band::COUNT]);

    /// Build from gains listed in ascending band order, sanitizing each.
    pub fn from_array(gains: [f32; Band::COUNT]) -> Self {
        Self(gains.map(sanitize_band_gain))
    }

    /// Gain of `band` in dB.
    pub fn get(&self, band: Band) -> f32 {
        self.0[band.index()]
    }

    /// Set the gain of `band`, returning the sanitized value actually stored.
    pub fn set(&mut self, band: Band, db: f32) -> f32 {
        let db = sanitize_band_gain(db);
        self.0[band.index()] = db;
        db
    }

    /// `(band, gain)` pairs in ascending frequency order.
    pub fn iter(&self) -> impl Iterator<Item = (Band, f32)> + '_ {
        Band::ALL.into_iter().map(move |b| (b, self.get(b)))
    }
}

impl Index<Band> for EqGains {
    type Output = f32;

    fn index(&self, band: Band) -> &f32 {
        &self.0[band.index()]
    }
}

// ---------------------------------------------------------------------------
// ParameterSet
// ---------------------------------------------------------------------------

/// A complete snapshot of every adjustable control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    /// Pre-amplification in percent (0 – 300).
    pub input_gain: f32,
    /// Output volume in percent (0 – 300).
    pub output_gain: f32,
    /// Equalizer gain per band in dB.
    pub eq: EqGains,
    /// Stereo balance, -100 (left) … 100 (right).
    pub balance: i32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            input_gain: DEFAULT_GAIN,
            output_gain: DEFAULT_GAIN,
            eq: EqGains::FLAT,
            balance: 0,
        }
    }
}

impl ParameterSet {
    /// Construct a sanitized parameter set.
    ///
    /// ```
    /// use sound_amplifier::params::{Band, ParameterSet};
    ///
    /// let p = ParameterSet::new(130.0, 500.0, [-2.0, -4.0, 0.0, 6.0, 5.0, 3.0], 0);
    /// assert_eq!(p.output_gain, 300.0); // clamped
    /// assert_eq!(p.eq.get(Band::Hz1000), 6.0);
    /// ```
    pub fn new(input_gain: f32, output_gain: f32, eq: [f32; Band::COUNT], balance: i32) -> Self {
        Self {
            input_gain,
            output_gain,
            eq: EqGains(eq),
            balance,
        }
        .sanitized()
    }

    /// Return a copy with every field normalized into its documented range.
    pub fn sanitized(self) -> Self {
        Self {
            input_gain: sanitize_gain(self.input_gain),
            output_gain: sanitize_gain(self.output_gain),
            eq: EqGains(self.eq.0.map(sanitize_band_gain)),
            balance: sanitize_balance(self.balance as f64),
        }
    }

    /// `true` when every field is finite and within range.
    pub fn is_valid(&self) -> bool {
        let gain_ok = |g: f32| g.is_finite() && (MIN_GAIN..=MAX_GAIN).contains(&g);
        gain_ok(self.input_gain)
            && gain_ok(self.output_gain)
            && self
                .eq
                .iter()
                .all(|(_, g)| g.is_finite() && (MIN_BAND_GAIN..=MAX_BAND_GAIN).contains(&g))
            && (MIN_BALANCE..=MAX_BALANCE).contains(&self.balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unity_and_flat() {
        let p = ParameterSet::default();
        assert_eq!(p.input_gain, 100.0);
        assert_eq!(p.output_gain, 100.0);
        assert_eq!(p.balance, 0);
        assert!(p.eq.iter().all(|(_, g)| g == 0.0));
        assert!(p.is_valid());
    }

    #[test]
    fn non_finite_gains_fall_back_to_default() {
        assert_eq!(sanitize_gain(f32::NAN), DEFAULT_GAIN);
        assert_eq!(sanitize_gain(f32::INFINITY), DEFAULT_GAIN);
        assert_eq!(sanitize_band_gain(f32::NEG_INFINITY), 0.0);
        assert_eq!(sanitize_balance(f64::NAN), 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(sanitize_gain(-5.0), 0.0);
        assert_eq!(sanitize_gain(301.0), 300.0);
        assert_eq!(sanitize_band_gain(35.0), 20.0);
        assert_eq!(sanitize_band_gain(-21.0), -20.0);
        assert_eq!(sanitize_balance(150.0), 100);
        assert_eq!(sanitize_balance(-100.4), -100);
        assert_eq!(sanitize_balance(49.6), 50);
    }

    #[test]
    fn sanitized_set_is_always_valid() {
        let raw = ParameterSet {
            input_gain: f32::NAN,
            output_gain: 1e9,
            eq: EqGains([f32::NAN, 99.0, -99.0, 0.0, f32::INFINITY, 3.0]),
            balance: 4000,
        };
        assert!(!raw.is_valid());

        let clean = raw.sanitized();
        assert!(clean.is_valid());
        assert_eq!(clean.input_gain, 100.0);
        assert_eq!(clean.output_gain, 300.0);
        assert_eq!(clean.eq.get(Band::Hz125), 0.0);
        assert_eq!(clean.eq.get(Band::Hz250), 20.0);
        assert_eq!(clean.eq.get(Band::Hz500), -20.0);
        assert_eq!(clean.eq.get(Band::Hz2000), 0.0);
        assert_eq!(clean.eq[Band::Hz4000], 3.0);
        assert_eq!(clean.balance, 100);
    }

    #[test]
    fn eq_set_returns_stored_value() {
        let mut eq = EqGains::FLAT;
        assert_eq!(eq.set(Band::Hz500, 25.0), 20.0);
        assert_eq!(eq.get(Band::Hz500), 20.0);
        assert_eq!(eq.get(Band::Hz250), 0.0);
    }
}
