//! The analysis tap: a read-only copy of the signal for the spectrum display.

use parking_lot::Mutex;

use crate::audio::SampleHistory;

/// Shared history written by the audio thread and read by the sampler.
///
/// The audio thread only ever `try_lock`s; if the sampler holds the lock,
/// that block is simply not recorded.
#[derive(Debug)]
pub struct AnalysisTap {
    history: Mutex<SampleHistory>,
}

impl AnalysisTap {
    pub fn new(size: usize) -> Self {
        Self {
            history: Mutex::new(SampleHistory::new(size)),
        }
    }

    /// Record a block of mono samples.  Returns `false` when skipped.
    pub fn write(&self, samples: &[f32]) -> bool {
        match self.history.try_lock() {
            Some(mut history) => {
                history.push_slice(samples);
                true
            }
            None => false,
        }
    }

    /// Copy the newest `out.len()` samples, oldest first.
    pub fn read_latest(&self, out: &mut [f32]) {
        self.history.lock().copy_latest(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let tap = AnalysisTap::new(4);
        assert!(tap.write(&[0.1, 0.2, 0.3]));
        let mut out = [9.0; 4];
        tap.read_latest(&mut out);
        assert_eq!(out, [0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn contended_write_is_skipped() {
        let tap = AnalysisTap::new(4);
        let guard = tap.history.lock();
        assert!(!tap.write(&[1.0]));
        drop(guard);
        assert!(tap.write(&[1.0]));
    }
}
