//! Bar geometry for the live spectrum display.
//!
//! The egui front end calls [`BarLayout::compute`] on each frame with the
//! newest [`Spectrum`] and the canvas size, then paints one filled rectangle
//! per [`Bar`].  Purely derivative: nothing here feeds back into the chain.
//!
//! # Example
//!
//! ```rust
//! use sound_amplifier::audio::{BarLayout, Spectrum};
//!
//! let spectrum = Spectrum { bins: vec![255; 128] };
//! let layout = BarLayout::compute(&spectrum, 32, 320.0, 100.0);
//! assert_eq!(layout.bars.len(), 32);
//! assert!(layout.bars.iter().all(|b| (b.height - 100.0).abs() < 1e-3));
//! ```

use super::Spectrum;

// ---------------------------------------------------------------------------
// Bar
// ---------------------------------------------------------------------------

/// One bar, in canvas coordinates with the origin at the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub width: f32,
    pub height: f32,
    /// Normalized magnitude in `[0.0, 1.0]`, handy for colouring.
    pub level: f32,
}

// ---------------------------------------------------------------------------
// BarLayout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BarLayout {
    pub bars: Vec<Bar>,
}

impl BarLayout {
    /// Reduce `spectrum` to `bar_count` bars filling a `width` × `height`
    /// canvas.
    ///
    /// Each bar shows the loudest bucket of its equal-width group.  When the
    /// spectrum has fewer buckets than `bar_count`, one bar per bucket is
    /// produced.  A zero `bar_count`, an empty spectrum or a degenerate
    /// canvas give an empty layout.
    pub fn compute(spectrum: &Spectrum, bar_count: usize, width: f32, height: f32) -> Self {
        let count = bar_count.min(spectrum.len());
        if count == 0 || !(width > 0.0) || !(height > 0.0) {
            return Self::default();
        }

        let slot = width / count as f32;
        let group = spectrum.len() as f32 / count as f32;

        let bars = (0..count)
            .map(|i| {
                let start = (i as f32 * group) as usize;
                let end = (((i + 1) as f32 * group) as usize)
                    .max(start + 1)
                    .min(spectrum.len());
                let peak = spectrum.bins[start..end].iter().copied().max().unwrap_or(0);
                let level = peak as f32 / 255.0;
                Bar {
                    x: i as f32 * slot,
                    width: (slot * 0.8).max(1.0),
                    height: level * height,
                    level,
                }
            })
            .collect();

        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
