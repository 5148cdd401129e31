//! Session core: lifecycle state machine, chain controller and the
//! visualization sampler.
//!
//! # Architecture
//!
//! ```text
//! UI edit ──▶ ChainController ──▶ ParameterStore
//!                   │
//!                   └─ Weak<ChainControls> ──▶ live stage cells (if Live)
//!
//! start/stop ──▶ SessionLifecycle ── owns ──▶ input, output, SignalChain
//!                   │                          │
//!                   ├─ attach/detach ─▶ ChainController
//!                   └─ spawn/cancel  ─▶ VisualizationSampler ─▶ watch<Spectrum>
//!
//! SessionEvent (mpsc) ──▶ UI notices
//! ```

pub mod controller;
pub mod guard;
pub mod lifecycle;
pub mod sampler;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::ChainController;
pub use guard::{HighGainGuard, DEFAULT_HIGH_GAIN_THRESHOLD};
pub use lifecycle::{SessionError, SessionLifecycle};
pub use sampler::{SpectrumSender, VisualizationSampler};
pub use state::{event_channel, EventReceiver, EventSender, SessionEvent, SessionState};
