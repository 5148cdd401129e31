//! Chain construction and the real-time processor.
//!
//! [`SignalChain::build`] is a one-shot operation: it validates the capture
//! format, lays out every stage in the fixed order and returns two halves.
//!
//! * [`SignalChain`] stays with the session.  It owns the [`ChainControls`]
//!   and the [`AnalysisTap`] and hands out weak references to both.
//! * [`ChainProcessor`] moves into the output device's render callback.  It
//!   owns the capture reader and the per-stage DSP state.
//!
//! Either construction succeeds completely or it returns a [`ChainError`]
//! and nothing is left behind.

use std::sync::{Arc, Weak};

use thiserror::Error;

use crate::audio::{pan_stereo, PeakingFilter, SampleReader, StreamFormat};
use crate::params::ParameterSet;

use super::controls::ChainControls;
use super::stage::{StageId, StageKind};
use super::tap::AnalysisTap;

/// Highest sample rate accepted from a capture device.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Backlog kept in the capture ring before old audio is discarded, in ms.
const MAX_BACKLOG_MS: u32 = 20;

// ---------------------------------------------------------------------------
// ChainError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("unsupported input channel count: {0} (expected mono or stereo)")]
    UnsupportedChannels(u16),

    #[error("invalid input sample rate: {0} Hz")]
    InvalidSampleRate(u32),
}

// ---------------------------------------------------------------------------
// SignalChain
// ---------------------------------------------------------------------------

/// Session-side half of a live chain.
#[derive(Debug)]
pub struct SignalChain {
    format: StreamFormat,
    controls: Arc<ChainControls>,
    tap: Arc<AnalysisTap>,
}

impl SignalChain {
    /// Build a chain for `format`, loaded with `params`, reading capture
    /// samples from `reader`.
    ///
    /// `tap_size` is the analysis history length (the FFT size).
    pub fn build(
        params: &ParameterSet,
        format: StreamFormat,
        reader: SampleReader,
        tap_size: usize,
    ) -> Result<(SignalChain, ChainProcessor), ChainError> {
        if !matches!(format.channels, 1 | 2) {
            return Err(ChainError::UnsupportedChannels(format.channels));
        }
        if format.sample_rate == 0 || format.sample_rate > MAX_SAMPLE_RATE {
            return Err(ChainError::InvalidSampleRate(format.sample_rate));
        }

        let params = params.sanitized();
        let controls = Arc::new(ChainControls::new(&params));
        let tap = Arc::new(AnalysisTap::new(tap_size));
        let sample_rate = format.sample_rate as f32;

        let stages = controls
            .stages()
            .map(|(id, kind)| match kind {
                StageKind::InputGain | StageKind::OutputGain => StageProcessor::Gain(id),
                StageKind::AnalysisTap => StageProcessor::Tap,
                StageKind::Equalizer(band) => StageProcessor::Peaking(
                    id,
                    PeakingFilter::new(band.frequency() as f32, controls.value(id), sample_rate),
                ),
                StageKind::Balance => StageProcessor::Balance(id),
            })
            .collect();

        let in_channels = format.channels as usize;
        let max_backlog = (format.sample_rate * MAX_BACKLOG_MS / 1000) as usize * in_channels;
        let tap_capacity = tap_size.max(1);

        let processor = ChainProcessor {
            stages,
            controls: Arc::clone(&controls),
            tap: Arc::clone(&tap),
            reader,
            in_channels,
            max_backlog,
            values: Vec::with_capacity(controls.len()),
            pending: Vec::with_capacity(tap_capacity),
        };

        log::debug!(
            "[chain] built {} stages at {} Hz, {} channel(s)",
            controls.len(),
            format.sample_rate,
            format.channels
        );

        Ok((
            SignalChain {
                format,
                controls,
                tap,
            },
            processor,
        ))
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn controls(&self) -> &Arc<ChainControls> {
        &self.controls
    }

    /// Non-owning reference for the controller; dead once the chain drops.
    pub fn controls_ref(&self) -> Weak<ChainControls> {
        Arc::downgrade(&self.controls)
    }

    /// Non-owning reference for the visualization sampler.
    pub fn tap_ref(&self) -> Weak<AnalysisTap> {
        Arc::downgrade(&self.tap)
    }
}

// ---------------------------------------------------------------------------
// ChainProcessor
// ---------------------------------------------------------------------------

enum StageProcessor {
    Gain(StageId),
    Tap,
    Peaking(StageId, PeakingFilter),
    Balance(StageId),
}

/// Audio-thread half of a live chain, driven by the output device clock.
pub struct ChainProcessor {
    stages: Vec<StageProcessor>,
    controls: Arc<ChainControls>,
    tap: Arc<AnalysisTap>,
    reader: SampleReader,
    in_channels: usize,
    max_backlog: usize,
    values: Vec<f32>,
    pending: Vec<f32>,
}

impl ChainProcessor {
    /// Fill the interleaved `out` buffer of `out_channels` channels.
    ///
    /// Missing capture samples render as silence.  Output is stereo on the
    /// first two channels (downmixed for mono devices, extra channels
    /// silent) and hard-limited to `[-1, 1]`.
    pub fn render(&mut self, out: &mut [f32], out_channels: usize) {
        let out_channels = out_channels.max(1);
        let frames = out.len() / out_channels;

        self.controls.snapshot(&mut self.values);
        for stage in &mut self.stages {
            if let StageProcessor::Peaking(id, filter) = stage {
                filter.set_gain_db(self.values[id.index()]);
            }
        }
        self.drop_backlog(frames);

        for frame in out.chunks_mut(out_channels) {
            let (l, r) = self.next_input_frame();
            let (l, r) = self.process_frame(l, r);
            let (l, r) = (l.clamp(-1.0, 1.0), r.clamp(-1.0, 1.0));
            match frame {
                [mono] => *mono = 0.5 * (l + r),
                [left, right, rest @ ..] => {
                    *left = l;
                    *right = r;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }
        self.flush_tap();
    }

    /// Skip capture audio that piled up beyond the allowed backlog so latency
    /// stays bounded when the input clock runs ahead of the output clock.
    fn drop_backlog(&mut self, frames: usize) {
        let wanted = frames * self.in_channels + self.max_backlog;
        let excess = self.reader.slots().saturating_sub(wanted);
        let excess = excess - excess % self.in_channels;
        if excess > 0 {
            if let Ok(chunk) = self.reader.read_chunk(excess) {
                chunk.commit_all();
            }
        }
    }

    fn next_input_frame(&mut self) -> (f32, f32) {
        if self.reader.slots() < self.in_channels {
            return (0.0, 0.0);
        }
        let first = self.reader.pop().unwrap_or(0.0);
        if self.in_channels == 1 {
            (first, first)
        } else {
            (first, self.reader.pop().unwrap_or(0.0))
        }
    }

    #[inline]
    fn process_frame(&mut self, mut l: f32, mut r: f32) -> (f32, f32) {
        for stage in &mut self.stages {
            match stage {
                StageProcessor::Gain(id) => {
                    let g = self.values[id.index()];
                    l *= g;
                    r *= g;
                }
                StageProcessor::Tap => {
                    if self.pending.len() == self.pending.capacity() {
                        self.tap.write(&self.pending);
                        self.pending.clear();
                    }
                    self.pending.push(0.5 * (l + r));
                }
                StageProcessor::Peaking(_, filter) => (l, r) = filter.process(l, r),
                StageProcessor::Balance(id) => (l, r) = pan_stereo(l, r, self.values[id.index()]),
            }
        }
        (l, r)
    }

    fn flush_tap(&mut self) {
        if !self.pending.is_empty() {
            self.tap.write(&self.pending);
            self.pending.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ParameterPush;
    use crate::params::Band;

    const MONO: StreamFormat = StreamFormat {
        sample_rate: 48_000,
        channels: 1,
    };

    fn ring(samples: &[f32]) -> (rtrb::Producer<f32>, SampleReader) {
        let (mut tx, rx) = rtrb::RingBuffer::new(48_000);
        for &s in samples {
            tx.push(s).expect("capacity");
        }
        (tx, rx)
    }

    fn build(params: &ParameterSet, samples: &[f32]) -> (SignalChain, ChainProcessor) {
        let (_tx, rx) = ring(samples);
        SignalChain::build(params, MONO, rx, 256).expect("valid format")
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    // ---- Construction ------------------------------------------------------

    #[test]
    fn rejects_unsupported_formats() {
        let (_tx, rx) = ring(&[]);
        let format = StreamFormat {
            sample_rate: 48_000,
            channels: 6,
        };
        assert_eq!(
            SignalChain::build(&ParameterSet::default(), format, rx, 256).err(),
            Some(ChainError::UnsupportedChannels(6))
        );

        let (_tx, rx) = ring(&[]);
        let format = StreamFormat {
            sample_rate: 0,
            channels: 1,
        };
        assert_eq!(
            SignalChain::build(&ParameterSet::default(), format, rx, 256).err(),
            Some(ChainError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn weak_references_die_with_the_chain() {
        let (chain, processor) = build(&ParameterSet::default(), &[]);
        let controls = chain.controls_ref();
        let tap = chain.tap_ref();
        assert!(controls.upgrade().is_some());

        drop(chain);
        drop(processor);
        assert!(controls.upgrade().is_none());
        assert!(tap.upgrade().is_none());
    }

    // ---- Rendering ---------------------------------------------------------

    #[test]
    fn mono_input_is_duplicated_and_scaled() {
        let params = ParameterSet::new(200.0, 100.0, [0.0; 6], 0);
        let (_chain, mut p) = build(&params, &[0.25; 8]);

        let mut out = [0.0; 8];
        p.render(&mut out, 2);
        for s in out {
            assert!(approx(s, 0.5), "sample = {s}");
        }
    }

    #[test]
    fn underrun_renders_silence() {
        let (_chain, mut p) = build(&ParameterSet::default(), &[0.5; 2]);
        let mut out = [9.0; 8];
        p.render(&mut out, 2);
        assert!(approx(out[0], 0.5) && approx(out[3], 0.5));
        assert!(out[4..].iter().all(|&s| approx(s, 0.0)));
    }

    #[test]
    fn pushes_apply_on_next_block() {
        let (chain, mut p) = build(&ParameterSet::default(), &[0.4; 8]);
        let mut out = [0.0; 4];
        p.render(&mut out, 2);
        assert!(approx(out[0], 0.4));

        chain.controls().push(ParameterPush::OutputGain(50.0));
        p.render(&mut out, 2);
        assert!(approx(out[0], 0.2));
    }

    #[test]
    fn balance_moves_signal_right() {
        let params = ParameterSet::new(100.0, 100.0, [0.0; 6], 100);
        let (_chain, mut p) = build(&params, &[0.3; 4]);
        let mut out = [0.0; 8];
        p.render(&mut out, 2);
        assert!(approx(out[0], 0.0));
        assert!(approx(out[1], 0.6));
    }

    #[test]
    fn output_is_limited() {
        let params = ParameterSet::new(300.0, 300.0, [0.0; 6], 0);
        let (_chain, mut p) = build(&params, &[0.9; 4]);
        let mut out = [0.0; 8];
        p.render(&mut out, 2);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn mono_and_multichannel_devices() {
        let (_chain, mut p) = build(&ParameterSet::default(), &[0.2; 4]);
        let mut mono = [0.0; 2];
        p.render(&mut mono, 1);
        assert!(approx(mono[0], 0.2) && approx(mono[1], 0.2));

        let mut quad = [9.0; 8];
        p.render(&mut quad, 4);
        assert!(approx(quad[0], 0.2) && approx(quad[1], 0.2));
        assert_eq!(&quad[2..4], &[0.0, 0.0]);
        assert_eq!(&quad[6..8], &[0.0, 0.0]);
    }

    #[test]
    fn stereo_input_keeps_channels() {
        let (_tx, rx) = ring(&[0.1, 0.3, 0.1, 0.3]);
        let format = StreamFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        let (_chain, mut p) =
            SignalChain::build(&ParameterSet::default(), format, rx, 64).expect("valid");
        let mut out = [0.0; 4];
        p.render(&mut out, 2);
        assert!(approx(out[0], 0.1) && approx(out[1], 0.3));
    }

    #[test]
    fn tap_sees_post_input_gain_mix() {
        let params = ParameterSet::new(200.0, 10.0, [0.0; 6], 0);
        let (chain, mut p) = build(&params, &[0.1; 4]);
        let mut out = [0.0; 8];
        p.render(&mut out, 2);

        let tap = chain.tap_ref().upgrade().expect("alive");
        let mut latest = [0.0; 4];
        tap.read_latest(&mut latest);
        for s in latest {
            assert!(approx(s, 0.2), "tap = {s}");
        }
    }

    #[test]
    fn backlog_is_trimmed() {
        let (_chain, mut p) = build(&ParameterSet::default(), &[0.1; 10_000]);
        let mut out = [0.0; 16];
        p.render(&mut out, 2);
        // 20 ms at 48 kHz mono plus the block itself.
        assert_eq!(p.reader.slots(), 960);
    }

    #[test]
    fn band_boost_changes_filter() {
        let (chain, mut p) = build(&ParameterSet::default(), &[]);
        chain.controls().push(ParameterPush::Band(Band::Hz1000, 6.0));
        let mut out = [0.0; 2];
        p.render(&mut out, 2);
        let boosted = p.stages.iter().any(|s| match s {
            StageProcessor::Peaking(_, f) => f.frequency() == 1000.0 && f.gain_db() == 6.0,
            _ => false,
        });
        assert!(boosted);
    }
}
