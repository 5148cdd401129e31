//! Frequency-magnitude analysis of the analysis tap.
//!
//! [`SpectrumAnalyser`] turns the newest `fft_size` samples into
//! `fft_size / 2` byte-scaled magnitude buckets, the way a browser analyser
//! node does:
//!
//! ```text
//! samples ─▶ Blackman window ─▶ FFT ─▶ |X[k]| / N ─▶ time smoothing
//!         ─▶ dB ─▶ map [min_db, max_db] onto 0..=255
//! ```

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::VisualConfig;

/// Smallest FFT size accepted.
pub const MIN_FFT_SIZE: usize = 32;
/// Largest FFT size accepted.
pub const MAX_FFT_SIZE: usize = 4096;

/// Round `size` up to a power of two within `[MIN_FFT_SIZE, MAX_FFT_SIZE]`.
pub fn normalize_fft_size(size: usize) -> usize {
    size.clamp(MIN_FFT_SIZE, MAX_FFT_SIZE).next_power_of_two()
}

// ---------------------------------------------------------------------------
// Spectrum
// ---------------------------------------------------------------------------

/// One frame of byte-scaled magnitudes, lowest frequency first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    pub bins: Vec<u8>,
}

impl Spectrum {
    /// An all-zero frame with `len` buckets.
    pub fn silent(len: usize) -> Self {
        Self { bins: vec![0; len] }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn peak(&self) -> u8 {
        self.bins.iter().copied().max().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// SpectrumAnalyser
// ---------------------------------------------------------------------------

pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl SpectrumAnalyser {
    /// Build an analyser.  `fft_size` is normalized with
    /// [`normalize_fft_size`]; `smoothing` is clamped to `[0, 1)`.
    pub fn new(fft_size: usize, smoothing: f32, min_db: f32, max_db: f32) -> Self {
        let n = normalize_fft_size(fft_size);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        let (min_db, max_db) = if min_db < max_db {
            (min_db, max_db)
        } else {
            (-100.0, -30.0)
        };

        Self {
            fft,
            window: blackman_window(n),
            input: vec![0.0; n],
            spectrum: vec![Complex::default(); n],
            scratch,
            smoothed: vec![0.0; n / 2],
            smoothing: if smoothing.is_finite() {
                smoothing.clamp(0.0, 0.999)
            } else {
                0.8
            },
            min_db,
            max_db,
        }
    }

    pub fn from_config(config: &VisualConfig) -> Self {
        Self::new(config.fft_size, config.smoothing, config.min_db, config.max_db)
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Number of buckets per frame (`fft_size / 2`).
    pub fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Analyse an explicit sample window (zero-padded at the front if short).
    pub fn analyse_samples(&mut self, samples: &[f32]) -> Spectrum {
        let n = self.input.len();
        let take = samples.len().min(n);
        let pad = n - take;
        self.input[..pad].fill(0.0);
        self.input[pad..].copy_from_slice(&samples[samples.len() - take..]);
        self.analyse_window()
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    fn analyse_window(&mut self) -> Spectrum {
        let n = self.input.len();
        for ((out, &x), &w) in self.spectrum.iter_mut().zip(&self.input).zip(&self.window) {
            *out = Complex::new(x * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let scale = 255.0 / (self.max_db - self.min_db);
        let tau = self.smoothing;
        let bins = self
            .smoothed
            .iter_mut()
            .zip(&self.spectrum)
            .map(|(smoothed, c)| {
                let magnitude = c.norm() / n as f32;
                *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
                let db = if *smoothed > 0.0 {
                    20.0 * smoothed.log10()
                } else {
                    f32::NEG_INFINITY
                };
                (scale * (db - self.min_db)).clamp(0.0, 255.0) as u8
            })
            .collect();

        Spectrum { bins }
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn fft_size_is_normalized() {
        assert_eq!(normalize_fft_size(0), MIN_FFT_SIZE);
        assert_eq!(normalize_fft_size(300), 512);
        assert_eq!(normalize_fft_size(1 << 20), MAX_FFT_SIZE);
        assert_eq!(SpectrumAnalyser::new(256, 0.8, -100.0, -30.0).bin_count(), 128);
    }

    #[test]
    fn silence_is_all_zero() {
        let mut a = SpectrumAnalyser::new(256, 0.0, -100.0, -30.0);
        let s = a.analyse_samples(&[0.0; 256]);
        assert_eq!(s.len(), 128);
        assert_eq!(s.peak(), 0);
    }

    #[test]
    fn sine_peaks_in_expected_bucket() {
        let sr = 48_000.0;
        let n = 1024;
        // Bin-centered tone: bucket 64 of 512.
        let freq = 64.0 * sr / n as f32;
        let mut a = SpectrumAnalyser::new(n, 0.0, -100.0, 0.0);
        let s = a.analyse_samples(&sine(freq, sr, n, 0.5));

        let (loudest, _) = s
            .bins
            .iter()
            .enumerate()
            .max_by_key(|&(_, v)| *v)
            .expect("non-empty");
        assert!((63..=65).contains(&loudest), "loudest = {loudest}");
        assert!(s.bins[400] < s.bins[64]);
    }

    #[test]
    fn smoothing_decays_gradually() {
        let sr = 48_000.0;
        let n = 256;
        let tone = sine(32.0 * sr / n as f32, sr, n, 0.5);
        let mut a = SpectrumAnalyser::new(n, 0.8, -100.0, -30.0);

        let loud = a.analyse_samples(&tone).bins[32];
        let after = a.analyse_samples(&[0.0; 256]).bins[32];
        assert!(after > 0, "smoothing should keep some energy");
        assert!(after <= loud);

        a.reset();
        assert_eq!(a.analyse_samples(&[0.0; 256]).peak(), 0);
    }

    #[test]
    fn window_is_symmetric_and_bounded() {
        let w = blackman_window(64);
        assert!(w[0].abs() < 1e-6);
        assert!(w.iter().all(|&v| (-1e-6..=1.0).contains(&v)));
        assert!((w[1] - w[63]).abs() < 1e-5);
    }
}
