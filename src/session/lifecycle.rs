//! Session lifecycle: acquisition, chain construction and teardown.
//!
//! [`SessionLifecycle`] is the sole owner of the live chain and of both
//! hardware resources.  It drives the state machine in
//! [`SessionState`](super::SessionState):
//!
//! * `start` moves `Idle → Starting`, awaits the microphone, builds the
//!   chain and binds the output.  Success commits `Live`; any failure drops
//!   whatever the attempt had acquired and returns to `Idle` with a single
//!   [`SessionEvent::StartFailed`].
//! * `stop` tears everything down from any state and is idempotent.
//!
//! Every start attempt carries a generation number.  `stop` bumps it, so an
//! acquisition that completes after a stop finds itself stale and releases
//! its resources instead of going live.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

use crate::audio::{
    normalize_fft_size, AcquisitionError, AudioBackend, CaptureConstraints, InputResource,
    OutputBinding, Spectrum, StreamFormat,
};
use crate::chain::{ChainError, SignalChain};
use crate::config::VisualConfig;

use super::controller::ChainController;
use super::sampler::{SpectrumSender, VisualizationSampler};
use super::state::{EventSender, SessionEvent, SessionState};

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("could not build the signal chain: {0}")]
    Chain(#[from] ChainError),

    /// A stop request overtook this start attempt.
    #[error("start cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Live resources
// ---------------------------------------------------------------------------

/// Everything a live session holds.  Fields drop in declaration order:
/// output first so the render callback stops before its input goes away.
struct LiveChain {
    output: Box<dyn OutputBinding>,
    input: Box<dyn InputResource>,
    chain: SignalChain,
    since: Instant,
}

struct Inner {
    state: SessionState,
    attempt: u64,
    live: Option<LiveChain>,
    sampler: Option<VisualizationSampler>,
}

// ---------------------------------------------------------------------------
// SessionLifecycle
// ---------------------------------------------------------------------------

pub struct SessionLifecycle {
    backend: Arc<dyn AudioBackend>,
    controller: Arc<ChainController>,
    visual: VisualConfig,
    inner: Mutex<Inner>,
    events: EventSender,
    spectrum: SpectrumSender,
}

impl SessionLifecycle {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        controller: Arc<ChainController>,
        visual: VisualConfig,
        events: EventSender,
    ) -> Self {
        let bins = normalize_fft_size(visual.fft_size) / 2;
        let (spectrum, _) = watch::channel(Spectrum::silent(bins));
        Self {
            backend,
            controller,
            visual,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                attempt: 0,
                live: None,
                sampler: None,
            }),
            events,
            spectrum: Arc::new(spectrum),
        }
    }

    pub fn controller(&self) -> &Arc<ChainController> {
        &self.controller
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// When the current session went live.
    pub fn live_since(&self) -> Option<Instant> {
        self.inner.lock().live.as_ref().map(|l| l.since)
    }

    /// Capture and output formats of the live session.
    pub fn live_formats(&self) -> Option<(StreamFormat, StreamFormat)> {
        self.inner
            .lock()
            .live
            .as_ref()
            .map(|l| (l.input.format(), l.output.format()))
    }

    /// Receiver for spectrum frames; all-zero while not live.
    pub fn subscribe_spectrum(&self) -> watch::Receiver<Spectrum> {
        self.spectrum.subscribe()
    }

    // ---- start ---------------------------------------------------------------

    /// Start a session.  A no-op while already starting, live or stopping.
    ///
    /// Dropping the returned future before it resolves abandons the attempt
    /// and returns the session to `Idle`.
    pub async fn start(&self) -> Result<(), SessionError> {
        let attempt = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Idle {
                log::debug!("[session] start ignored while {}", inner.state);
                return Ok(());
            }
            inner.attempt += 1;
            self.transition(&mut inner, SessionState::Starting);
            inner.attempt
        };

        let mut pending = PendingStart {
            lifecycle: self,
            attempt,
            armed: true,
        };
        let result = self.construct(attempt).await;
        pending.armed = false;

        let mut inner = self.inner.lock();
        let current = inner.attempt == attempt && inner.state == SessionState::Starting;

        match result {
            Ok(live) if current => {
                let tap = live.chain.tap_ref();
                let controls = live.chain.controls_ref();
                inner.live = Some(live);
                self.transition(&mut inner, SessionState::Live);
                self.controller.attach(controls);
                inner.sampler = Some(VisualizationSampler::spawn(
                    tap,
                    &self.visual,
                    Arc::clone(&self.spectrum),
                ));
                Ok(())
            }
            Ok(live) => {
                drop(inner);
                drop(live);
                log::info!("[session] start overtaken by stop, resources released");
                Err(SessionError::Cancelled)
            }
            Err(e) => {
                if current {
                    self.transition(&mut inner, SessionState::Idle);
                    log::warn!("[session] start failed: {e}");
                    // Ignore send errors; the receiver may have been dropped.
                    let _ = self.events.send(SessionEvent::StartFailed {
                        message: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    /// Acquire, build and bind.  Anything acquired is released on the error
    /// path by drop.
    async fn construct(&self, attempt: u64) -> Result<LiveChain, SessionError> {
        let mut input = self
            .backend
            .acquire_input(&CaptureConstraints::RAW)
            .await?;

        if !self.is_current(attempt) {
            return Err(SessionError::Cancelled);
        }

        let format = input.format();
        let reader = input.take_reader().ok_or_else(|| {
            AcquisitionError::Unsupported("input stream has no sample reader".into())
        })?;

        let params = self.controller.params();
        let (chain, mut processor) = SignalChain::build(
            &params,
            format,
            reader,
            normalize_fft_size(self.visual.fft_size),
        )?;

        let output = self
            .backend
            .bind_output(format, Box::new(move |out, channels| processor.render(out, channels)))
            .await?;

        Ok(LiveChain {
            output,
            input,
            chain,
            since: Instant::now(),
        })
    }

    fn is_current(&self, attempt: u64) -> bool {
        let inner = self.inner.lock();
        inner.attempt == attempt && inner.state == SessionState::Starting
    }

    // ---- stop ----------------------------------------------------------------

    /// Tear the session down from any state.  Idempotent.
    pub fn stop(&self) {
        let live = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Idle && inner.live.is_none() && inner.sampler.is_none()
            {
                return;
            }
            inner.attempt += 1;
            self.transition(&mut inner, SessionState::Stopping);

            if let Some(sampler) = inner.sampler.take() {
                sampler.cancel();
            }
            self.controller.detach();
            inner.live.take()
        };

        // Joining the stream threads happens outside the lock.
        drop(live);

        let mut inner = self.inner.lock();
        self.transition(&mut inner, SessionState::Idle);
    }

    fn transition(&self, inner: &mut Inner, next: SessionState) {
        if inner.state == next {
            return;
        }
        log::info!("[session] {} -> {}", inner.state, next);
        inner.state = next;
        let _ = self.events.send(SessionEvent::StateChanged(next));
    }
}

impl Drop for SessionLifecycle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Returns the session to `Idle` if a start future is dropped mid-await.
struct PendingStart<'a> {
    lifecycle: &'a SessionLifecycle,
    attempt: u64,
    armed: bool,
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.lifecycle.inner.lock();
        if inner.attempt == self.attempt && inner.state == SessionState::Starting {
            log::info!("[session] start abandoned");
            self.lifecycle.transition(&mut inner, SessionState::Idle);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
