//! Per-frame spectrum sampling while the session is live.
//!
//! The sampler is a tokio task tied 1:1 to the `Live` state.  It only holds a
//! weak reference to the analysis tap, so it can never keep a torn-down
//! chain alive; once cancelled it publishes one all-zero frame so the display
//! falls silent.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::{Spectrum, SpectrumAnalyser};
use crate::chain::AnalysisTap;
use crate::config::VisualConfig;

/// Shared publisher for spectrum frames.
pub type SpectrumSender = Arc<watch::Sender<Spectrum>>;

pub struct VisualizationSampler {
    /// `true` once cancelled; held while publishing so no frame can follow
    /// the final silent one.
    cancelled: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
    frames: SpectrumSender,
    bins: usize,
}

impl VisualizationSampler {
    /// Spawn the sampling task on the current tokio runtime.
    pub fn spawn(tap: Weak<AnalysisTap>, config: &VisualConfig, frames: SpectrumSender) -> Self {
        let mut analyser = SpectrumAnalyser::from_config(config);
        let bins = analyser.bin_count();
        let period = Duration::from_secs_f64(1.0 / config.frame_rate.clamp(1, 240) as f64);
        let cancelled = Arc::new(Mutex::new(false));

        let task = {
            let cancelled = Arc::clone(&cancelled);
            let frames = Arc::clone(&frames);
            tokio::spawn(async move {
                let mut window = vec![0.0; analyser.fft_size()];
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    ticker.tick().await;
                    let Some(tap) = tap.upgrade() else {
                        log::debug!("[sampler] analysis tap gone, stopping");
                        break;
                    };
                    tap.read_latest(&mut window);
                    drop(tap);

                    let frame = analyser.analyse_samples(&window);
                    {
                        let gate = cancelled.lock();
                        if *gate {
                            break;
                        }
                        frames.send_replace(frame);
                    }
                }
            })
        };

        log::debug!("[sampler] started at {period:?} per frame, {bins} buckets");
        Self {
            cancelled,
            task,
            frames,
            bins,
        }
    }

    /// Stop sampling.  On return no further frame will be published.
    pub fn cancel(self) {
        drop(self);
    }

    fn shutdown(&mut self) {
        {
            let mut cancelled = self.cancelled.lock();
            if *cancelled {
                return;
            }
            *cancelled = true;
            self.frames.send_replace(Spectrum::silent(self.bins));
        }
        self.task.abort();
        log::debug!("[sampler] cancelled");
    }
}

impl Drop for VisualizationSampler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    fn sender() -> (SpectrumSender, watch::Receiver<Spectrum>) {
        let (tx, rx) = watch::channel(Spectrum::default());
        (Arc::new(tx), rx)
    }

    fn loud_tap() -> Arc<AnalysisTap> {
        let tap = Arc::new(AnalysisTap::new(256));
        let tone: Vec<f32> = (0..256)
            .map(|i| 0.5 * (2.0 * PI * 32.0 * i as f32 / 256.0).sin())
            .collect();
        tap.write(&tone);
        tap
    }

    #[tokio::test]
    async fn publishes_frames_while_running() {
        let tap = loud_tap();
        let (tx, rx) = sender();
        let sampler = VisualizationSampler::spawn(Arc::downgrade(&tap), &VisualConfig::default(), tx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let frame = rx.borrow();
            assert_eq!(frame.len(), 128);
            assert!(frame.peak() > 0);
        }
        sampler.cancel();
    }

    #[tokio::test]
    async fn cancel_publishes_silence_and_stops() {
        let tap = loud_tap();
        let (tx, rx) = sender();
        let sampler = VisualizationSampler::spawn(Arc::downgrade(&tap), &VisualConfig::default(), tx);
        tokio::time::sleep(Duration::from_millis(50)).await;

        sampler.cancel();
        assert_eq!(rx.borrow().peak(), 0);
        assert_eq!(rx.borrow().len(), 128);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(rx.borrow().peak(), 0);
    }

    #[tokio::test]
    async fn stops_when_tap_is_dropped() {
        let tap = loud_tap();
        let (tx, _rx) = sender();
        let sampler = VisualizationSampler::spawn(Arc::downgrade(&tap), &VisualConfig::default(), tx);

        drop(tap);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sampler.task.is_finished());
        assert!(!*sampler.cancelled.lock());
    }
}
