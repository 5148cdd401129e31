//! Audio I/O and DSP: microphone capture, output binding, filters and the
//! spectrum analysis behind the live display.
//!
//! # Signal flow
//!
//! ```text
//! Microphone → cpal callback → rtrb ring → ChainProcessor (output clock)
//!           → cpal output callback → headphones
//!                    │
//!                    └─ analysis tap → SampleHistory → SpectrumAnalyser → BarLayout
//! ```
//!
//! [`AudioBackend`] is the seam between the session and the hardware;
//! [`CpalBackend`] drives real devices.

pub mod analyser;
pub mod backend;
pub mod bars;
pub mod buffer;
pub mod capture;
pub mod cpal_backend;
pub mod dsp;
pub mod playback;

pub use analyser::{normalize_fft_size, Spectrum, SpectrumAnalyser};
pub use backend::{
    AcquisitionError, AudioBackend, CaptureConstraints, InputResource, OutputBinding,
    RenderCallback, SampleReader, StreamFormat,
};
pub use bars::{Bar, BarLayout};
pub use buffer::SampleHistory;
pub use capture::CpalInput;
pub use cpal_backend::CpalBackend;
pub use dsp::{pan_stereo, percent_to_linear, PeakingFilter, EQ_Q};
pub use playback::CpalOutput;

#[cfg(test)]
pub use backend::{MockBackend, MockInput};
