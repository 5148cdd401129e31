//! Fixed-window sample history used by the analysis tap.
//!
//! The audio thread pushes every processed block; the visualization sampler
//! copies out the most recent window for spectrum analysis.  When the buffer
//! is full, new samples **overwrite** the oldest ones, so a read always sees
//! the latest `capacity` samples.
//!
//! # Example
//!
//! ```rust
//! use sound_amplifier::audio::SampleHistory;
//!
//! let mut history = SampleHistory::new(4);
//! history.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]); // oldest sample dropped
//! let mut window = [0.0; 4];
//! history.copy_latest(&mut window);
//! assert_eq!(window, [2.0, 3.0, 4.0, 5.0]);
//! ```

// ---------------------------------------------------------------------------
// SampleHistory
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer of mono `f32` samples.
///
/// Never allocates after construction, so it is safe to write from the
/// real-time callback.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    buf: Vec<f32>,
    /// Index of the *next* write position (wraps around capacity).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ capacity).
    len: usize,
}

impl SampleHistory {
    /// Create a history holding the last `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)],
            write_pos: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        let capacity = self.buf.len();
        self.buf[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
    }

    pub fn push_slice(&mut self, data: &[f32]) {
        for &sample in data {
            self.push(sample);
        }
    }

    /// Copy the newest `out.len()` samples into `out` in chronological order.
    ///
    /// When fewer samples are stored than requested, the front of `out` is
    /// zero-filled so the newest sample always lands in the last slot.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let capacity = self.buf.len();
        let available = self.len.min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);

        // Oldest of the `available` newest samples.
        let start = (self.write_pos + capacity - available) % capacity;
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            *slot = self.buf[(start + i) % capacity];
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn latest(history: &SampleHistory, n: usize) -> Vec<f32> {
        let mut out = vec![f32::NAN; n];
        history.copy_latest(&mut out);
        out
    }

    // ---- Push / read -------------------------------------------------------

    #[test]
    fn read_within_capacity() {
        let mut h = SampleHistory::new(8);
        h.push_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(h.len(), 3);
        assert_eq!(latest(&h, 3), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn short_history_is_zero_padded_at_front() {
        let mut h = SampleHistory::new(8);
        h.push_slice(&[1.0, 2.0]);
        assert_eq!(latest(&h, 4), vec![0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn reading_fewer_than_stored_gives_newest() {
        let mut h = SampleHistory::new(8);
        h.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(latest(&h, 2), vec![4.0, 5.0]);
    }

    #[test]
    fn reading_does_not_consume() {
        let mut h = SampleHistory::new(4);
        h.push_slice(&[1.0, 2.0]);
        let _ = latest(&h, 2);
        assert_eq!(h.len(), 2);
        assert_eq!(latest(&h, 2), vec![1.0, 2.0]);
    }

    // ---- Overflow (oldest sample discarded) --------------------------------

    #[test]
    fn overflow_keeps_newest() {
        let mut h = SampleHistory::new(4);
        h.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(h.len(), 4);
        assert_eq!(latest(&h, 4), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn overflow_across_separate_pushes() {
        let mut h = SampleHistory::new(3);
        h.push_slice(&[1.0, 2.0, 3.0]);
        h.push_slice(&[4.0, 5.0]);
        assert_eq!(latest(&h, 3), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn reading_more_than_capacity_pads() {
        let mut h = SampleHistory::new(2);
        h.push_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(latest(&h, 4), vec![0.0, 0.0, 2.0, 3.0]);
    }

    // ---- Capacity ------------------------------------------------------------

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut h = SampleHistory::new(0);
        assert!(h.is_empty());
        h.push_slice(&[1.0, 2.0]);
        assert_eq!(h.len(), 1);
        assert_eq!(latest(&h, 1), vec![2.0]);
    }
}
