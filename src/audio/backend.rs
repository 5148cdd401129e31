//! Hardware seam: capability acquisition for the microphone and binding of
//! the processed signal to an output device.
//!
//! # Overview
//!
//! [`AudioBackend`] is the interface used by the session lifecycle.  It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn AudioBackend>`.
//!
//! * [`AudioBackend::acquire_input`] is async: on real hardware it may sit
//!   behind a platform permission prompt for an unbounded time.  Dropping the
//!   future cancels the request and releases anything already opened.
//! * [`AudioBackend::bind_output`] hands a [`RenderCallback`] to the output
//!   device; the device clock then pulls processed audio through it.  It is
//!   async as well, since opening the device happens on its stream thread.
//!
//! Both resources are released by dropping the returned box.
//!
//! [`CpalBackend`](super::CpalBackend) is the production implementation.
//! [`MockBackend`] (available under `#[cfg(test)]`) counts live resources and
//! can deny, reject, defer or fail on demand.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// StreamFormat / CaptureConstraints
// ---------------------------------------------------------------------------

/// Sample rate and interleaved channel count of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Platform voice-processing switches requested for the microphone.
///
/// Hearing compensation needs the untouched signal, so the session only ever
/// asks for [`CaptureConstraints::RAW`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    /// Every processing stage disabled.
    pub const RAW: CaptureConstraints = CaptureConstraints {
        echo_cancellation: false,
        noise_suppression: false,
        auto_gain_control: false,
    };

    pub fn is_raw(&self) -> bool {
        *self == Self::RAW
    }
}

// ---------------------------------------------------------------------------
// AcquisitionError
// ---------------------------------------------------------------------------

/// Why an input or output resource could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The user or the platform refused microphone access.
    #[error("microphone access denied: {0}")]
    Denied(String),

    /// The device exists but cannot run the requested configuration.
    #[error("unsupported audio configuration: {0}")]
    Unsupported(String),

    /// No suitable device is present.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The request was abandoned before it completed.
    #[error("audio acquisition cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Lock-free reader for interleaved capture samples.
pub type SampleReader = rtrb::Consumer<f32>;

/// Called from the output device's clock with an interleaved buffer to fill
/// and its channel count.
pub type RenderCallback = Box<dyn FnMut(&mut [f32], usize) + Send + 'static>;

/// A live microphone stream.  Dropping it stops and releases the device.
pub trait InputResource: Send {
    fn format(&self) -> StreamFormat;

    /// Hand out the capture sample reader.  Yields `Some` exactly once.
    fn take_reader(&mut self) -> Option<SampleReader>;
}

/// A live output stream.  Dropping it stops the device and drops the render
/// callback.
pub trait OutputBinding: Send {
    fn format(&self) -> StreamFormat;
}

// ---------------------------------------------------------------------------
// AudioBackend trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Request a microphone stream honouring `constraints`.
    async fn acquire_input(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn InputResource>, AcquisitionError>;

    /// Open the output device at `format.sample_rate` and start pulling audio
    /// through `render`.
    async fn bind_output(
        &self,
        format: StreamFormat,
        render: RenderCallback,
    ) -> Result<Box<dyn OutputBinding>, AcquisitionError>;
}

// Compile-time assertion: Box<dyn AudioBackend> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioBackend>) {}
};

// ---------------------------------------------------------------------------
// MockBackend  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockBackend, MockInput};

#[cfg(test)]
mod mock {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;

    /// What the next [`AudioBackend::acquire_input`] call does.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockInput {
        Grant,
        Deny,
        Unsupported,
        /// Wait for [`MockBackend::release`] and then grant.
        Defer,
    }

    type RenderSlot = Arc<Mutex<Option<RenderCallback>>>;

    /// Hardware-free backend that tracks how many resources are held.
    pub struct MockBackend {
        format: StreamFormat,
        outcome: Mutex<MockInput>,
        fail_output: AtomicBool,
        gate: Notify,
        inputs_live: Arc<AtomicUsize>,
        outputs_live: Arc<AtomicUsize>,
        acquisitions: AtomicUsize,
        producer: Mutex<Option<rtrb::Producer<f32>>>,
        render: RenderSlot,
    }

    impl MockBackend {
        pub fn new(outcome: MockInput) -> Self {
            Self::with_format(
                outcome,
                StreamFormat {
                    sample_rate: 48_000,
                    channels: 1,
                },
            )
        }

        pub fn with_format(outcome: MockInput, format: StreamFormat) -> Self {
            Self {
                format,
                outcome: Mutex::new(outcome),
                fail_output: AtomicBool::new(false),
                gate: Notify::new(),
                inputs_live: Arc::new(AtomicUsize::new(0)),
                outputs_live: Arc::new(AtomicUsize::new(0)),
                acquisitions: AtomicUsize::new(0),
                producer: Mutex::new(None),
                render: Arc::new(Mutex::new(None)),
            }
        }

        pub fn set_outcome(&self, outcome: MockInput) {
            *self.outcome.lock() = outcome;
        }

        pub fn fail_output(&self, fail: bool) {
            self.fail_output.store(fail, Ordering::SeqCst);
        }

        /// Let a deferred acquisition complete.
        pub fn release(&self) {
            self.gate.notify_one();
        }

        pub fn inputs_live(&self) -> usize {
            self.inputs_live.load(Ordering::SeqCst)
        }

        pub fn outputs_live(&self) -> usize {
            self.outputs_live.load(Ordering::SeqCst)
        }

        pub fn acquisitions(&self) -> usize {
            self.acquisitions.load(Ordering::SeqCst)
        }

        /// Push capture samples as if they came from the microphone.
        pub fn feed(&self, samples: &[f32]) -> usize {
            let mut guard = self.producer.lock();
            let Some(producer) = guard.as_mut() else {
                return 0;
            };
            samples
                .iter()
                .take_while(|&&s| producer.push(s).is_ok())
                .count()
        }

        /// Drive the bound render callback once; `false` when nothing is bound.
        pub fn render(&self, out: &mut [f32], channels: usize) -> bool {
            match self.render.lock().as_mut() {
                Some(callback) => {
                    callback(out, channels);
                    true
                }
                None => false,
            }
        }
    }

    struct MockInputResource {
        format: StreamFormat,
        reader: Option<SampleReader>,
        live: Arc<AtomicUsize>,
    }

    impl InputResource for MockInputResource {
        fn format(&self) -> StreamFormat {
            self.format
        }

        fn take_reader(&mut self) -> Option<SampleReader> {
            self.reader.take()
        }
    }

    impl Drop for MockInputResource {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct MockOutput {
        format: StreamFormat,
        live: Arc<AtomicUsize>,
        render: RenderSlot,
    }

    impl OutputBinding for MockOutput {
        fn format(&self) -> StreamFormat {
            self.format
        }
    }

    impl Drop for MockOutput {
        fn drop(&mut self) {
            self.render.lock().take();
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AudioBackend for MockBackend {
        async fn acquire_input(
            &self,
            constraints: &CaptureConstraints,
        ) -> Result<Box<dyn InputResource>, AcquisitionError> {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            if !constraints.is_raw() {
                return Err(AcquisitionError::Unsupported("processing requested".into()));
            }

            let outcome = *self.outcome.lock();
            match outcome {
                MockInput::Deny => return Err(AcquisitionError::Denied("user refused".into())),
                MockInput::Unsupported => {
                    return Err(AcquisitionError::Unsupported("mock device".into()))
                }
                MockInput::Defer => self.gate.notified().await,
                MockInput::Grant => {}
            }

            let (producer, consumer) = rtrb::RingBuffer::new(48_000);
            *self.producer.lock() = Some(producer);
            self.inputs_live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockInputResource {
                format: self.format,
                reader: Some(consumer),
                live: Arc::clone(&self.inputs_live),
            }))
        }

        async fn bind_output(
            &self,
            format: StreamFormat,
            render: RenderCallback,
        ) -> Result<Box<dyn OutputBinding>, AcquisitionError> {
            if self.fail_output.load(Ordering::SeqCst) {
                return Err(AcquisitionError::DeviceUnavailable("no headphones".into()));
            }
            *self.render.lock() = Some(render);
            self.outputs_live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockOutput {
                format: StreamFormat {
                    sample_rate: format.sample_rate,
                    channels: 2,
                },
                live: Arc::clone(&self.outputs_live),
                render: Arc::clone(&self.render),
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
