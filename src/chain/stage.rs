//! Stage identity and the lock-free parameter cell each stage reads.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::params::Band;

// ---------------------------------------------------------------------------
// Param
// ---------------------------------------------------------------------------

/// An `f32` shared between the controller (writer) and the audio thread
/// (reader), stored as its bit pattern.
///
/// Writes take effect on the next processed block; there is no ramping.
#[derive(Debug, Default)]
pub struct Param(AtomicU32);

impl Param {
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// StageId / StageKind
// ---------------------------------------------------------------------------

/// Position of a stage in its chain, assigned once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageId(pub(crate) usize);

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a stage does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    InputGain,
    /// Read-only copy of the signal for the spectrum display.
    AnalysisTap,
    Equalizer(Band),
    Balance,
    OutputGain,
}

impl StageKind {
    /// The fixed wiring order of a chain, source side first.
    pub fn chain_order() -> Vec<StageKind> {
        let mut kinds = Vec::with_capacity(Band::COUNT + 4);
        kinds.push(StageKind::InputGain);
        kinds.push(StageKind::AnalysisTap);
        kinds.extend(Band::ALL.into_iter().map(StageKind::Equalizer));
        kinds.push(StageKind::Balance);
        kinds.push(StageKind::OutputGain);
        kinds
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::InputGain => f.write_str("input gain"),
            StageKind::AnalysisTap => f.write_str("analysis tap"),
            StageKind::Equalizer(band) => write!(f, "equalizer {band}"),
            StageKind::Balance => f.write_str("balance"),
            StageKind::OutputGain => f.write_str("output gain"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
